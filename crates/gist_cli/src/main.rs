mod location;
mod reader;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use gist_core::{Article, AudioSink, BookmarkStore, Category, ContentModel, Error, Result};
use gist_inference::Config;
use gist_playback::{DeviceSink, PlaybackController, TimedSink};

#[derive(Parser, Debug)]
#[command(author, version, about = "AI news gists in the terminal", long_about = None)]
struct Cli {
    /// Content model. Available models: gemini (default), dummy (offline)
    #[arg(long, default_value = "gemini")]
    model: String,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Bookmark store backend: json (default) or memory
    #[arg(long, default_value = "json")]
    store: String,

    /// Bookmark file for the json store
    #[arg(long)]
    store_path: Option<PathBuf>,

    /// Skip detection and use this location for Home Politics
    #[arg(long)]
    location: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print the current stories for a category
    Fetch {
        #[arg(value_enum)]
        category: Option<Category>,
    },
    /// Narrate a category front to back, one story at a time
    Listen {
        #[arg(value_enum)]
        category: Option<Category>,
    },
    /// Deep analysis of one story, by its position in the batch
    Analyze {
        #[arg(value_enum)]
        category: Option<Category>,
        /// 1-based story position
        #[arg(long, default_value_t = 1)]
        index: usize,
    },
    /// List saved stories
    Bookmarks,
    /// Interactive reader (keys + mouse pull-to-refresh)
    Read,
}

/// Default audio output, or a silent timer when no device exists so the
/// sequencer still paces through the batch.
fn open_sink() -> Arc<dyn AudioSink> {
    match DeviceSink::new() {
        Ok(sink) => Arc::new(sink),
        Err(err) => {
            warn!(error = %err, "audio device unavailable, narration will be silent");
            Arc::new(TimedSink::new())
        }
    }
}

fn default_store_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => Path::new(&home).join(".gist").join("bookmarks_v1.json"),
        None => PathBuf::from("gist_bookmarks_v1.json"),
    }
}

async fn load_articles(
    model: &Arc<dyn ContentModel>,
    store: &Arc<dyn BookmarkStore>,
    category: Category,
    location: &str,
) -> Result<Vec<Article>> {
    if category.is_remote() {
        model.fetch_articles(category, location).await
    } else {
        store.all().await
    }
}

fn print_articles(articles: &[Article]) {
    for (n, article) in articles.iter().enumerate() {
        println!("{}. {} — {}", n + 1, article.title, article.source);
        println!("   {}", article.gist);
        println!("   {}", article.url);
        println!();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = Config {
        api_key: cli.api_key.clone(),
        ..Config::default()
    };
    let model = gist_inference::create_model(&cli.model, config).await?;
    info!("🧠 Content model initialized (using {})", model.name());

    let store_path = cli.store_path.clone().unwrap_or_else(default_store_path);
    let store = gist_storage::create_store(&cli.store, Some(&store_path)).await?;

    let location = match cli.location.clone() {
        Some(location) => location,
        None => location::detect(&reqwest::Client::new()).await,
    };
    info!("📍 Reading news for {}", location);

    match cli.command {
        Commands::Fetch { category } => {
            let category = category.unwrap_or(Category::General);
            info!("📡 Fetching {} stories", category);
            let articles = load_articles(&model, &store, category, &location).await?;
            if articles.is_empty() {
                println!("Unable to find {} news for {}. Please try again later.", category, location);
            } else {
                print_articles(&articles);
            }
        }
        Commands::Listen { category } => {
            let category = category.unwrap_or(Category::General);
            let articles = load_articles(&model, &store, category, &location).await?;
            if articles.is_empty() {
                println!("Nothing to narrate for {}.", category);
                return Ok(());
            }
            listen(model, open_sink(), &articles).await;
        }
        Commands::Analyze { category, index } => {
            let category = category.unwrap_or(Category::General);
            let articles = load_articles(&model, &store, category, &location).await?;
            let article = articles.get(index.wrapping_sub(1)).ok_or_else(|| {
                Error::Inference(format!("no story at position {} (batch has {})", index, articles.len()))
            })?;
            info!("🔍 Analyzing: {}", article.title);
            let analysis = model.analyze(&article.title, &article.gist).await?;
            println!("{}\n", article.title);
            println!("Context\n  {}\n", analysis.context);
            println!("Implications\n  {}\n", analysis.implications);
            println!("Conclusion\n  {}", analysis.conclusion);
        }
        Commands::Bookmarks => {
            let articles = store.all().await?;
            if articles.is_empty() {
                println!("No bookmarks yet. Articles you save will appear here.");
            } else {
                print_articles(&articles);
            }
        }
        Commands::Read => {
            reader::run(model, store, open_sink(), location).await?;
        }
    }

    Ok(())
}

/// Drive one sequential narration pass and report progress until the
/// controller goes idle or the user interrupts.
async fn listen(model: Arc<dyn ContentModel>, sink: Arc<dyn AudioSink>, articles: &[Article]) {
    let controller = PlaybackController::new(model, sink);
    controller.toggle(&articles[0], articles);

    let mut announced: Option<String> = None;
    loop {
        let snapshot = controller.snapshot();
        if snapshot.is_idle() {
            break;
        }
        if !snapshot.is_loading && snapshot.active_article_id != announced {
            if let Some(article) = articles
                .iter()
                .find(|a| Some(&a.id) == snapshot.active_article_id.as_ref())
            {
                println!("▶ {}", article.title);
            }
            announced = snapshot.active_article_id.clone();
        }
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(200)) => {}
            _ = tokio::signal::ctrl_c() => {
                controller.stop();
                break;
            }
        }
    }
}
