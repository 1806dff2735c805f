use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use gist_core::{Article, BookmarkStore, Result};

use super::memory::toggle_in;

/// Bookmarks persisted as a JSON array, rewritten on every mutation. The
/// shape matches what the original client kept under its localStorage key,
/// so an exported blob drops straight in.
pub struct JsonFileStore {
    path: PathBuf,
    articles: RwLock<Vec<Article>>,
}

impl JsonFileStore {
    /// Open the store at `path`, creating an empty one if the file is
    /// missing. A malformed file is an error, not silent data loss.
    pub async fn open(path: &Path) -> Result<Self> {
        let articles = match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        debug!(path = %path.display(), count = articles.len(), "bookmark store opened");
        Ok(Self {
            path: path.to_path_buf(),
            articles: RwLock::new(articles),
        })
    }

    async fn persist(&self, articles: &[Article]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_vec_pretty(articles)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl BookmarkStore for JsonFileStore {
    async fn toggle(&self, article: &Article) -> Result<bool> {
        let mut articles = self.articles.write().await;
        let bookmarked = toggle_in(&mut articles, article);
        self.persist(&articles).await?;
        Ok(bookmarked)
    }

    async fn contains(&self, url: &str) -> Result<bool> {
        let articles = self.articles.read().await;
        Ok(articles.iter().any(|a| a.url == url))
    }

    async fn remove(&self, url: &str) -> Result<()> {
        let mut articles = self.articles.write().await;
        articles.retain(|a| a.url != url);
        self.persist(&articles).await
    }

    async fn all(&self) -> Result<Vec<Article>> {
        let articles = self.articles.read().await;
        Ok(articles.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gist_core::Category;

    fn article(url: &str) -> Article {
        Article {
            id: format!("id-{}", url),
            title: "A story".to_string(),
            gist: "A gist.".to_string(),
            source: "Test".to_string(),
            url: url.to_string(),
            published_at: Utc::now(),
            category: Category::Science,
            image_url: Some("https://picsum.photos/seed/x/800/450".to_string()),
        }
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bookmarks.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store.toggle(&article("https://example.com/keep")).await.unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let all = reopened.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].url, "https://example.com/keep");
        assert_eq!(all[0].category, Category::Science);
    }

    #[tokio::test]
    async fn missing_file_means_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(&dir.path().join("none.json"))
            .await
            .unwrap();
        assert!(store.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bookmarks.json");
        tokio::fs::write(&path, b"not json").await.unwrap();
        assert!(JsonFileStore::open(&path).await.is_err());
    }

    #[tokio::test]
    async fn untoggle_persists_the_removal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bookmarks.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        let a = article("https://example.com/a");
        store.toggle(&a).await.unwrap();
        store.toggle(&a).await.unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert!(reopened.all().await.unwrap().is_empty());
    }
}
