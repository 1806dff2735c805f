use std::path::Path;
use std::sync::Arc;

use gist_core::{BookmarkStore, Error, Result};

pub mod backends;

pub use backends::{JsonFileStore, MemoryStore};

/// Build a bookmark store by name. `json` persists to `path` (the original
/// client kept bookmarks in browser localStorage; a JSON file is the
/// equivalent here), `memory` forgets on exit.
pub async fn create_store(kind: &str, path: Option<&Path>) -> Result<Arc<dyn BookmarkStore>> {
    match kind {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "json" => {
            let path = path.ok_or_else(|| {
                Error::Storage("the json store needs a file path".to_string())
            })?;
            Ok(Arc::new(JsonFileStore::open(path).await?))
        }
        other => Err(Error::Storage(format!("unknown store: {}", other))),
    }
}
