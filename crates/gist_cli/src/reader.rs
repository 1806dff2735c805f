use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyCode, KeyEvent, KeyEventKind,
    MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{cursor, execute, queue, style::Print};
use futures::StreamExt;
use tracing::warn;

use gist_core::{Article, AudioSink, BookmarkStore, Category, ContentModel, DeepAnalysis, Result};
use gist_gesture::PullGesture;
use gist_playback::PlaybackController;

use crate::location::FALLBACK_REGION;

/// One terminal row of mouse drag counts as this many touch units, so the
/// damping/threshold defaults tuned for pixels carry over: ~10 rows of pull
/// crosses the 80-unit refresh threshold. Row events quantize the drag into
/// 8-unit damped steps, which already clears the 10-unit raw deadzone on
/// the first reported row; the suppression flag only matters on surfaces
/// with finer pointer resolution.
const ROW_UNITS: f32 = 20.0;

/// Full-article overlay: the gist plus, on demand, the deep analysis.
struct Detail {
    article: Article,
    analysis: Option<DeepAnalysis>,
}

struct Reader {
    model: Arc<dyn ContentModel>,
    store: Arc<dyn BookmarkStore>,
    controller: PlaybackController,
    gesture: PullGesture,
    location: String,
    category_idx: usize,
    articles: Vec<Article>,
    bookmarked: HashSet<String>,
    selected: usize,
    scroll: usize,
    detail: Option<Detail>,
    status: String,
}

pub async fn run(
    model: Arc<dyn ContentModel>,
    store: Arc<dyn BookmarkStore>,
    sink: Arc<dyn AudioSink>,
    location: String,
) -> Result<()> {
    let mut reader = Reader::new(model, store, sink, location);
    reader.reload().await;

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, cursor::Hide)?;
    let result = reader.event_loop(&mut stdout).await;
    // Restore the terminal even when the loop errored.
    let _ = execute!(stdout, cursor::Show, DisableMouseCapture, LeaveAlternateScreen);
    let _ = disable_raw_mode();
    result
}

impl Reader {
    fn new(
        model: Arc<dyn ContentModel>,
        store: Arc<dyn BookmarkStore>,
        sink: Arc<dyn AudioSink>,
        location: String,
    ) -> Self {
        Self {
            controller: PlaybackController::new(Arc::clone(&model), sink),
            model,
            store,
            gesture: PullGesture::default(),
            location,
            category_idx: 0,
            articles: Vec::new(),
            bookmarked: HashSet::new(),
            selected: 0,
            scroll: 0,
            detail: None,
            status: String::new(),
        }
    }

    fn category(&self) -> Category {
        Category::ALL[self.category_idx]
    }

    async fn event_loop(&mut self, out: &mut std::io::Stdout) -> Result<()> {
        let mut events = EventStream::new();
        loop {
            self.draw(out)?;
            tokio::select! {
                maybe_event = events.next() => match maybe_event {
                    Some(Ok(event)) => {
                        if !self.handle_event(event).await? {
                            self.controller.stop();
                            return Ok(());
                        }
                        if self.gesture.is_refreshing() {
                            // the pinned indicator has to be on screen
                            // while the fetch is in flight
                            self.draw(out)?;
                            self.reload().await;
                            self.gesture.settle();
                        }
                    }
                    Some(Err(err)) => return Err(err.into()),
                    None => return Ok(()),
                },
                // periodic repaint so playback markers track the sequencer
                _ = tokio::time::sleep(Duration::from_millis(200)) => {}
            }
        }
    }

    async fn handle_event(&mut self, event: Event) -> Result<bool> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if self.detail.is_some() {
                    self.handle_detail_key(key).await
                } else {
                    self.handle_list_key(key).await
                }
            }
            Event::Mouse(mouse) if self.detail.is_none() => {
                self.handle_mouse(mouse).await;
                Ok(true)
            }
            _ => Ok(true),
        }
    }

    async fn handle_list_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(false),
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                self.scroll = self.scroll.min(self.selected);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.articles.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Left | KeyCode::Char('h') => self.switch_category(false).await,
            KeyCode::Right | KeyCode::Char('l') => self.switch_category(true).await,
            KeyCode::Char(' ') => {
                if let Some(article) = self.articles.get(self.selected).cloned() {
                    self.controller.toggle(&article, &self.articles);
                }
            }
            KeyCode::Char('s') => self.controller.stop(),
            KeyCode::Char('b') => self.toggle_bookmark().await,
            KeyCode::Char('r') => self.reload().await,
            KeyCode::Enter => {
                if let Some(article) = self.articles.get(self.selected).cloned() {
                    // audio never survives opening the article view
                    self.controller.stop();
                    self.detail = Some(Detail {
                        article,
                        analysis: None,
                    });
                }
            }
            _ => {}
        }
        Ok(true)
    }

    async fn handle_detail_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => return Ok(false),
            KeyCode::Esc | KeyCode::Enter => {
                self.controller.stop();
                self.detail = None;
            }
            KeyCode::Char(' ') => {
                if let Some(detail) = &self.detail {
                    let article = detail.article.clone();
                    self.controller.toggle(&article, &self.articles);
                }
            }
            KeyCode::Char('b') => self.toggle_bookmark_detail().await,
            KeyCode::Char('a') => self.load_analysis().await,
            _ => {}
        }
        Ok(true)
    }

    async fn handle_mouse(&mut self, mouse: MouseEvent) {
        let y = mouse.row as f32 * ROW_UNITS;
        match mouse.kind {
            MouseEventKind::Down(_) => {
                self.gesture.begin(y, self.scroll as f32);
            }
            MouseEventKind::Drag(_) => {
                // In a terminal there is no native overscroll to suppress,
                // so the deadzone flag is informational only.
                self.gesture.drag(y, self.scroll as f32);
            }
            MouseEventKind::Up(_) => {
                // on Refresh the event loop draws one frame, reloads, then
                // settles, so the locked indicator is actually visible
                self.gesture.release();
            }
            MouseEventKind::ScrollDown => {
                if self.scroll + 1 < self.articles.len() {
                    self.scroll += 1;
                    self.selected = self.selected.max(self.scroll);
                }
            }
            MouseEventKind::ScrollUp => {
                self.scroll = self.scroll.saturating_sub(1);
            }
            _ => {}
        }
    }

    async fn switch_category(&mut self, forward: bool) {
        let count = Category::ALL.len();
        self.category_idx = if forward {
            (self.category_idx + 1) % count
        } else {
            (self.category_idx + count - 1) % count
        };
        // audio never survives a category change
        self.controller.stop();
        self.selected = 0;
        self.scroll = 0;
        self.reload().await;
    }

    async fn reload(&mut self) {
        let category = self.category();
        self.status = "Updating gist...".to_string();
        let fetched = if category.is_remote() {
            self.model.fetch_articles(category, &self.location).await
        } else {
            self.store.all().await
        };
        match fetched {
            Ok(articles) if articles.is_empty() && category.is_remote() => {
                self.articles = articles;
                self.status = format!(
                    "Unable to find {} news for {}. Please try again later.",
                    category, self.location
                );
            }
            Ok(articles) => {
                self.articles = articles;
                self.status.clear();
            }
            Err(err) => {
                warn!(error = %err, "failed to load {} stories", category);
                self.status = "Something went wrong fetching the latest stories.".to_string();
            }
        }
        self.selected = self.selected.min(self.articles.len().saturating_sub(1));
        self.scroll = self.scroll.min(self.selected);
        self.refresh_bookmarks().await;
    }

    async fn refresh_bookmarks(&mut self) {
        match self.store.all().await {
            Ok(saved) => {
                self.bookmarked = saved.into_iter().map(|a| a.url).collect();
            }
            Err(err) => warn!(error = %err, "failed to read bookmarks"),
        }
    }

    async fn toggle_bookmark(&mut self) {
        if let Some(article) = self.articles.get(self.selected).cloned() {
            self.save_or_forget(&article).await;
        }
    }

    async fn toggle_bookmark_detail(&mut self) {
        if let Some(article) = self.detail.as_ref().map(|d| d.article.clone()) {
            self.save_or_forget(&article).await;
        }
    }

    async fn save_or_forget(&mut self, article: &Article) {
        match self.store.toggle(article).await {
            Ok(true) => self.status = format!("Saved: {}", article.title),
            Ok(false) => self.status = format!("Removed: {}", article.title),
            Err(err) => {
                warn!(error = %err, "bookmark toggle failed");
                self.status = "Could not update bookmarks.".to_string();
            }
        }
        self.refresh_bookmarks().await;
    }

    async fn load_analysis(&mut self) {
        let Some(article) = self.detail.as_ref().map(|d| d.article.clone()) else {
            return;
        };
        self.status = "Running deep analysis...".to_string();
        match self.model.analyze(&article.title, &article.gist).await {
            Ok(analysis) => {
                if let Some(detail) = self.detail.as_mut() {
                    detail.analysis = Some(analysis);
                }
                self.status.clear();
            }
            Err(err) => {
                warn!(error = %err, "deep analysis failed");
                self.status = "Analysis is unavailable right now.".to_string();
            }
        }
    }

    fn draw(&self, out: &mut std::io::Stdout) -> Result<()> {
        let (cols, rows) = terminal::size()?;
        let width = cols as usize;
        queue!(out, Clear(ClearType::All), cursor::MoveTo(0, 0))?;

        let mut lines: Vec<String> = Vec::new();
        let home = if self.location == FALLBACK_REGION {
            String::new()
        } else {
            format!(" · {}", self.location)
        };
        lines.push(format!("Gist ◀ {} ▶{}", self.category(), home));
        lines.push(self.pull_indicator());

        match &self.detail {
            Some(detail) => self.draw_detail(detail, width, &mut lines),
            None => self.draw_list(rows as usize, &mut lines),
        }

        let body_rows = (rows as usize).saturating_sub(2);
        while lines.len() < body_rows {
            lines.push(String::new());
        }
        lines.truncate(body_rows);
        lines.push(self.status.clone());
        lines.push(match self.detail {
            Some(_) => "esc close · space listen · a analysis · b bookmark · q quit".to_string(),
            None => "◀ ▶ category · ⏎ open · space listen · b save · r/drag refresh · q quit"
                .to_string(),
        });

        for (row, line) in lines.iter().enumerate() {
            let text: String = line.chars().take(width).collect();
            queue!(out, cursor::MoveTo(0, row as u16), Print(text))?;
        }
        out.flush()?;
        Ok(())
    }

    fn pull_indicator(&self) -> String {
        if self.gesture.is_refreshing() {
            return "⟳ Updating gist...".to_string();
        }
        let pulled = self.gesture.pulled_distance();
        if pulled <= 0.0 {
            return String::new();
        }
        let bar = "▾".repeat((pulled / 10.0).ceil() as usize);
        if pulled >= 80.0 {
            format!("{} release to refresh", bar)
        } else {
            format!("{} pull to refresh", bar)
        }
    }

    fn draw_list(&self, rows: usize, lines: &mut Vec<String>) {
        let snapshot = self.controller.snapshot();
        let visible = rows.saturating_sub(lines.len() + 6);
        for (idx, article) in self
            .articles
            .iter()
            .enumerate()
            .skip(self.scroll)
            .take(visible.max(1))
        {
            let cursor = if idx == self.selected { '>' } else { ' ' };
            let audio = if snapshot.active_article_id.as_deref() == Some(article.id.as_str()) {
                if snapshot.is_loading {
                    '⏳'
                } else {
                    '♪'
                }
            } else {
                ' '
            };
            let star = if self.bookmarked.contains(&article.url) {
                '★'
            } else {
                ' '
            };
            lines.push(format!(
                "{} {}{} {} — {}",
                cursor, audio, star, article.title, article.source
            ));
        }
        if let Some(article) = self.articles.get(self.selected) {
            lines.push(String::new());
            lines.push("─".repeat(40));
            for line in wrap(&article.gist, 76) {
                lines.push(format!("  {}", line));
            }
        } else if self.category() == Category::Bookmarks && self.articles.is_empty() {
            lines.push(String::new());
            lines.push("  No bookmarks yet. Articles you save will appear here.".to_string());
        }
    }

    fn draw_detail(&self, detail: &Detail, width: usize, lines: &mut Vec<String>) {
        let wrap_width = width.saturating_sub(4).clamp(20, 76);
        lines.push(String::new());
        for line in wrap(&detail.article.title, wrap_width) {
            lines.push(format!("  {}", line));
        }
        lines.push(format!(
            "  {} · {}",
            detail.article.source, detail.article.url
        ));
        lines.push(String::new());
        for line in wrap(&detail.article.gist, wrap_width) {
            lines.push(format!("  {}", line));
        }
        lines.push(String::new());
        match &detail.analysis {
            Some(analysis) => {
                for (heading, body) in [
                    ("Context", &analysis.context),
                    ("Implications", &analysis.implications),
                    ("Conclusion", &analysis.conclusion),
                ] {
                    lines.push(format!("  {}", heading));
                    for line in wrap(body, wrap_width) {
                        lines.push(format!("    {}", line));
                    }
                    lines.push(String::new());
                }
            }
            None => lines.push("  Press 'a' for deep analysis.".to_string()),
        }
    }
}

/// Plain greedy word wrap; long words get hard-broken at the width. Widths
/// count chars, not bytes, so non-ASCII gists never split mid-codepoint.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_len > 0 && current_len + 1 + word_len > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if word_len > width {
            let chars: Vec<char> = word.chars().collect();
            for chunk in chars.chunks(width) {
                if chunk.len() == width {
                    lines.push(chunk.iter().collect());
                } else {
                    current = chunk.iter().collect();
                    current_len = chunk.len();
                }
            }
        } else {
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.push_str(word);
            current_len += word_len;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
