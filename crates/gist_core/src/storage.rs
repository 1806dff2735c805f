use async_trait::async_trait;

use crate::types::Article;
use crate::Result;

/// Saved-story persistence. Identity is the article URL, not the per-batch
/// id, so a story stays bookmarked across refreshes.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// Add the article if absent, remove it if present. Returns whether the
    /// article is bookmarked afterwards. New bookmarks go to the front.
    async fn toggle(&self, article: &Article) -> Result<bool>;

    async fn contains(&self, url: &str) -> Result<bool>;

    async fn remove(&self, url: &str) -> Result<()>;

    /// All bookmarks, most recently saved first.
    async fn all(&self) -> Result<Vec<Article>>;
}
