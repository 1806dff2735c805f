pub mod audio;
pub mod error;
pub mod models;
pub mod storage;
pub mod types;

pub use audio::{AudioSink, PlaybackHandle};
pub use error::Error;
pub use models::ContentModel;
pub use storage::BookmarkStore;
pub use types::{Article, Category, DeepAnalysis, SpeechClip};

pub type Result<T> = std::result::Result<T, Error>;
