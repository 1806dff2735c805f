use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use gist_core::{AudioSink, PlaybackHandle, Result, SpeechClip};

/// Sink that paces a clip in real time without touching an audio device:
/// the clip "plays" for exactly its sample duration, then completes. Stands
/// in for a device sink on headless builds and in tests.
pub struct TimedSink;

impl TimedSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TimedSink {
    fn default() -> Self {
        Self::new()
    }
}

struct TimedHandle {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

#[async_trait]
impl PlaybackHandle for TimedHandle {
    fn stop(&self) {
        // Receivers outlive the sender here, so this cannot fail; an
        // already-finished clip just re-sends `true`.
        let _ = self.tx.send(true);
    }

    async fn finished(&self) {
        let mut rx = self.rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl AudioSink for TimedSink {
    fn start(&self, clip: SpeechClip) -> Result<Arc<dyn PlaybackHandle>> {
        let (tx, rx) = watch::channel(false);
        let handle = Arc::new(TimedHandle { tx, rx });
        let timer = Arc::clone(&handle);
        let duration = clip.duration();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            timer.stop();
        });
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn clip(frames: usize) -> SpeechClip {
        SpeechClip::new(vec![0.0; frames], 24_000, 1)
    }

    #[tokio::test(start_paused = true)]
    async fn clip_finishes_after_its_duration() {
        let sink = TimedSink::new();
        let started = tokio::time::Instant::now();
        let handle = sink.start(clip(24_000)).unwrap();
        handle.finished().await;
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cuts_playback_short() {
        let sink = TimedSink::new();
        let started = tokio::time::Instant::now();
        let handle = sink.start(clip(24_000 * 3600)).unwrap();
        handle.stop();
        handle.finished().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_after_finish() {
        let sink = TimedSink::new();
        let handle = sink.start(clip(0)).unwrap();
        handle.finished().await;
        handle.stop();
        handle.stop();
        handle.finished().await;
    }
}
