pub mod models;
pub mod pcm;

pub use models::create_model;

/// Connection settings for the Gemini-backed model. The three model names
/// match the jobs they do: grounded news search is cheap and fast, TTS has
/// its own model family, analysis gets the heavier reasoning model.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub base_url: String,
    pub news_model: String,
    pub tts_model: String,
    pub analysis_model: String,
    pub voice: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            news_model: "gemini-3-flash-preview".to_string(),
            tts_model: "gemini-2.5-flash-preview-tts".to_string(),
            analysis_model: "gemini-3-pro-preview".to_string(),
            voice: "Charon".to_string(),
        }
    }
}

pub mod prelude {
    pub use super::models::create_model;
    pub use super::Config;
    pub use gist_core::{Article, Category, ContentModel, DeepAnalysis, Error, Result};
}
