use std::fmt;

use async_trait::async_trait;
use chrono::Utc;

use gist_core::{Article, Category, ContentModel, DeepAnalysis, Error, Result, SpeechClip};

/// Offline model with canned output. Lets the client run end to end with no
/// API key: six stories per category, a short silent clip per narration.
pub struct DummyModel;

impl DummyModel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DummyModel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

#[async_trait]
impl ContentModel for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn fetch_articles(&self, category: Category, location: &str) -> Result<Vec<Article>> {
        if !category.is_remote() {
            return Err(Error::Inference(
                "bookmarks are served from the local store".to_string(),
            ));
        }
        let scope = match category {
            Category::HomePolitics => location,
            _ => "the world",
        };
        Ok((1..=6)
            .map(|n| Article {
                id: format!("sample-{:?}-{}", category, n),
                title: format!("{} briefing #{}", category, n),
                gist: format!(
                    "Placeholder story {} for {} covering {}. \"Nothing happened \
                     today\", a spokesperson said.",
                    n, category, scope
                ),
                source: "Gist Sample Desk".to_string(),
                url: format!("https://example.com/{:?}/{}", category, n).to_lowercase(),
                published_at: Utc::now(),
                category,
                image_url: None,
            })
            .collect())
    }

    async fn synthesize(&self, _title: &str, _gist: &str) -> Result<Option<SpeechClip>> {
        // 200ms of silence at the TTS sample rate
        Ok(Some(SpeechClip::new(vec![0.0; 4_800], 24_000, 1)))
    }

    async fn analyze(&self, title: &str, gist: &str) -> Result<DeepAnalysis> {
        Ok(DeepAnalysis {
            context: format!("Background on \"{}\": {}", title, gist),
            implications: "None whatsoever; this is sample output.".to_string(),
            conclusion: "Configure a real model for actual analysis.".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn produces_a_full_batch_per_category() {
        let model = DummyModel::new();
        let articles = model
            .fetch_articles(Category::Technology, "your region")
            .await
            .unwrap();
        assert_eq!(articles.len(), 6);
        assert!(articles.iter().all(|a| a.category == Category::Technology));
        // ids within a batch are unique
        let mut ids: Vec<_> = articles.iter().map(|a| a.id.clone()).collect();
        ids.dedup();
        assert_eq!(ids.len(), 6);
    }

    #[tokio::test]
    async fn refuses_the_bookmarks_category() {
        let model = DummyModel::new();
        assert!(model
            .fetch_articles(Category::Bookmarks, "your region")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn narration_is_playable_silence() {
        let model = DummyModel::new();
        let clip = model.synthesize("Title", "Gist").await.unwrap().unwrap();
        assert!(!clip.is_empty());
        assert_eq!(clip.sample_rate, 24_000);
        assert!(clip.samples.iter().all(|s| *s == 0.0));
    }

    #[tokio::test]
    async fn analysis_echoes_the_story() {
        let model = DummyModel::new();
        let analysis = model.analyze("Big News", "Something happened").await.unwrap();
        assert!(analysis.context.contains("Big News"));
        assert!(!analysis.conclusion.is_empty());
    }
}
