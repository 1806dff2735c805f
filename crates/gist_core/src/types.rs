use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single generated news story, as shown on one card.
///
/// `id` identifies a story within one fetched batch; bookmark identity is the
/// canonical `url`, which survives across refreshes while ids do not.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub gist: String,
    pub source: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Article {
    /// Bookmark equality: same canonical URL.
    pub fn same_story(&self, other: &Article) -> bool {
        self.url == other.url
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum Category {
    General,
    HomePolitics,
    InterPolitics,
    Technology,
    Business,
    Science,
    Sports,
    Entertainment,
    Health,
    Bookmarks,
}

impl Category {
    /// Every category a reader can switch to, in display order.
    pub const ALL: [Category; 10] = [
        Category::General,
        Category::HomePolitics,
        Category::InterPolitics,
        Category::Technology,
        Category::Business,
        Category::Science,
        Category::Sports,
        Category::Entertainment,
        Category::Health,
        Category::Bookmarks,
    ];

    /// Bookmarks are served from the local store, never fetched.
    pub fn is_remote(&self) -> bool {
        !matches!(self, Category::Bookmarks)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::General => "General",
            Category::HomePolitics => "Home Politics",
            Category::InterPolitics => "Inter Politics",
            Category::Technology => "Technology",
            Category::Business => "Business",
            Category::Science => "Science",
            Category::Sports => "Sports",
            Category::Entertainment => "Entertainment",
            Category::Health => "Health",
            Category::Bookmarks => "Bookmarks",
        };
        write!(f, "{}", name)
    }
}

/// Decoded narration audio for one article, ready to hand to an [`AudioSink`].
///
/// [`AudioSink`]: crate::audio::AudioSink
#[derive(Debug, Clone)]
pub struct SpeechClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl SpeechClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 || self.channels == 0 {
            return Duration::ZERO;
        }
        let frames = self.samples.len() as u64 / self.channels as u64;
        Duration::from_micros(frames * 1_000_000 / self.sample_rate as u64)
    }
}

/// Three-part breakdown returned by the deep-analysis collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepAnalysis {
    pub context: String,
    pub implications: String,
    pub conclusion: String,
}
