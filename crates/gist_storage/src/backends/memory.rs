use async_trait::async_trait;
use tokio::sync::RwLock;

use gist_core::{Article, BookmarkStore, Result};

/// In-memory bookmark list, newest first. Shared by the file-backed store
/// for its working copy.
pub struct MemoryStore {
    articles: RwLock<Vec<Article>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_articles(Vec::new())
    }

    pub fn with_articles(articles: Vec<Article>) -> Self {
        Self {
            articles: RwLock::new(articles),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Toggle an article in a bookmark list; returns whether it is now present.
pub(crate) fn toggle_in(list: &mut Vec<Article>, article: &Article) -> bool {
    if let Some(pos) = list.iter().position(|a| a.url == article.url) {
        list.remove(pos);
        false
    } else {
        list.insert(0, article.clone());
        true
    }
}

#[async_trait]
impl BookmarkStore for MemoryStore {
    async fn toggle(&self, article: &Article) -> Result<bool> {
        let mut articles = self.articles.write().await;
        Ok(toggle_in(&mut articles, article))
    }

    async fn contains(&self, url: &str) -> Result<bool> {
        let articles = self.articles.read().await;
        Ok(articles.iter().any(|a| a.url == url))
    }

    async fn remove(&self, url: &str) -> Result<()> {
        let mut articles = self.articles.write().await;
        articles.retain(|a| a.url != url);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Article>> {
        let articles = self.articles.read().await;
        Ok(articles.clone())
    }
}
