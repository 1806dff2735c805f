use std::sync::Arc;

use async_trait::async_trait;

use crate::types::SpeechClip;
use crate::Result;

/// Running playback of a single clip.
///
/// Exactly one live handle exists per process (the sequencer owns it); the
/// handle outliving its clip is fine, `finished` just resolves immediately.
#[async_trait]
pub trait PlaybackHandle: Send + Sync {
    /// Best-effort stop. Idempotent; stopping an already-finished clip is a
    /// no-op.
    fn stop(&self);

    /// Resolves once the clip has played out or was stopped.
    async fn finished(&self);
}

/// The single audio output of the process.
pub trait AudioSink: Send + Sync {
    /// Begin playing `clip` and return the handle controlling it.
    fn start(&self, clip: SpeechClip) -> Result<Arc<dyn PlaybackHandle>>;
}
