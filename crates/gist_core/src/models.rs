use async_trait::async_trait;

use crate::types::{Article, Category, DeepAnalysis, SpeechClip};
use crate::Result;

/// Generative collaborator behind the client: news batches, narrated
/// summaries, and on-demand deep analysis.
///
/// All three operations are network calls that may be slow, fail, or come
/// back in a different order than they were issued; callers own any
/// staleness checks on completion.
#[async_trait]
pub trait ContentModel: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch the current batch of stories for a category. `location` refines
    /// the Home Politics prompt; other categories may ignore it.
    async fn fetch_articles(&self, category: Category, location: &str) -> Result<Vec<Article>>;

    /// Synthesize narration for one card. `Ok(None)` means the collaborator
    /// succeeded but produced no audio.
    async fn synthesize(&self, title: &str, gist: &str) -> Result<Option<SpeechClip>>;

    /// Request the three-part deep analysis for one story.
    async fn analyze(&self, title: &str, gist: &str) -> Result<DeepAnalysis>;
}
