use std::sync::Arc;

use gist_core::{ContentModel, Error, Result};

use crate::Config;

pub mod dummy;
pub mod gemini;

pub use dummy::DummyModel;
pub use gemini::GeminiModel;

/// Build a content model by name. Available models: `gemini` (default),
/// `dummy` (offline, canned output).
pub async fn create_model(name: &str, config: Config) -> Result<Arc<dyn ContentModel>> {
    match name {
        "gemini" => Ok(Arc::new(GeminiModel::new(config)?)),
        "dummy" => Ok(Arc::new(DummyModel::new())),
        other => Err(Error::Inference(format!("unknown model: {}", other))),
    }
}
