use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use gist_core::{Article, AudioSink, ContentModel, PlaybackHandle};

/// Observable playback state, for rendering the per-card controls.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaybackSnapshot {
    /// Id of the article currently claimed for playback, loading or playing.
    pub active_article_id: Option<String>,
    /// True between claiming an article and its audio actually starting.
    pub is_loading: bool,
}

impl PlaybackSnapshot {
    pub fn is_idle(&self) -> bool {
        self.active_article_id.is_none()
    }
}

struct Session {
    article_id: String,
    loading: bool,
    handle: Option<Arc<dyn PlaybackHandle>>,
}

#[derive(Default)]
struct SessionState {
    /// Bumped on every stop and every new claim. A session task compares its
    /// own generation against this before any state mutation after an await
    /// point; a mismatch means the result is stale and must be dropped.
    generation: u64,
    session: Option<Session>,
}

/// Plays narrated summaries one article at a time.
///
/// `toggle` on the active article stops it; on any other article it stops
/// whatever is live, claims the new one and starts synthesis. When a clip
/// ends the controller advances a cursor through the playlist it was given,
/// so a whole category can be listened to from one tap. One controller per
/// process: it is the sole owner of the audio output.
pub struct PlaybackController {
    model: Arc<dyn ContentModel>,
    sink: Arc<dyn AudioSink>,
    state: Arc<Mutex<SessionState>>,
}

impl PlaybackController {
    pub fn new(model: Arc<dyn ContentModel>, sink: Arc<dyn AudioSink>) -> Self {
        Self {
            model,
            sink,
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let st = lock(&self.state);
        match &st.session {
            Some(session) => PlaybackSnapshot {
                active_article_id: Some(session.article_id.clone()),
                is_loading: session.loading,
            },
            None => PlaybackSnapshot::default(),
        }
    }

    /// Tap on a card's audio control. Must run inside a tokio runtime; the
    /// synthesis and playback work is spawned, the call itself never blocks.
    pub fn toggle(&self, article: &Article, playlist: &[Article]) {
        let generation = {
            let mut st = lock(&self.state);
            if st
                .session
                .as_ref()
                .is_some_and(|s| s.article_id == article.id)
            {
                // Tap-to-stop on the article that is already loading/playing.
                halt(&mut st);
                return;
            }
            halt(&mut st);
            st.session = Some(Session {
                article_id: article.id.clone(),
                loading: true,
                handle: None,
            });
            st.generation
        };

        // Articles toggled outside the visible list (e.g. from the full
        // article view over bookmarks) play standalone, with no advance.
        let (playlist, start) = match playlist.iter().position(|a| a.id == article.id) {
            Some(idx) => (playlist.to_vec(), idx),
            None => (vec![article.clone()], 0),
        };

        let state = Arc::clone(&self.state);
        let model = Arc::clone(&self.model);
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            run_session(state, model, sink, generation, playlist, start).await;
        });
    }

    /// Unconditional stop. Idempotent; called on category switches and when
    /// the article view opens or closes, so audio never survives navigation.
    pub fn stop(&self) {
        let mut st = lock(&self.state);
        halt(&mut st);
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Release the live handle (best effort) and invalidate any pending
/// completions for it.
fn halt(st: &mut SessionState) {
    st.generation += 1;
    if let Some(session) = st.session.take() {
        if let Some(handle) = session.handle {
            handle.stop();
        }
    }
}

/// Drop the session, but only if it still belongs to `generation`.
fn idle_if_current(state: &Mutex<SessionState>, generation: u64) {
    let mut st = lock(state);
    if st.generation == generation {
        st.session = None;
    }
}

/// One playback session: a cursor walk over `playlist` starting at `start`.
/// The claim for `playlist[start]` was already recorded by `toggle`. Every
/// step re-checks the generation after its await points; the first mismatch
/// ends the task without touching state.
async fn run_session(
    state: Arc<Mutex<SessionState>>,
    model: Arc<dyn ContentModel>,
    sink: Arc<dyn AudioSink>,
    generation: u64,
    playlist: Vec<Article>,
    start: usize,
) {
    let mut cursor = start;
    loop {
        let article = &playlist[cursor];
        let clip = match model.synthesize(&article.title, &article.gist).await {
            Ok(Some(clip)) if !clip.is_empty() => clip,
            Ok(_) => {
                debug!(article = %article.id, "synthesis returned no audio");
                idle_if_current(&state, generation);
                return;
            }
            Err(err) => {
                // Swallowed on purpose: the card just falls back to its
                // idle control and the user can re-tap.
                warn!(article = %article.id, error = %err, "speech synthesis failed");
                idle_if_current(&state, generation);
                return;
            }
        };

        let handle = {
            let mut st = lock(&state);
            if st.generation != generation {
                // Stale completion: the user stopped, switched articles or
                // changed category while we were synthesizing.
                debug!(article = %article.id, "discarding stale synthesis result");
                return;
            }
            let handle = match sink.start(clip) {
                Ok(handle) => handle,
                Err(err) => {
                    warn!(article = %article.id, error = %err, "audio output failed to start");
                    st.session = None;
                    return;
                }
            };
            if let Some(session) = st.session.as_mut() {
                session.loading = false;
                session.handle = Some(Arc::clone(&handle));
            }
            handle
        };

        handle.finished().await;

        {
            let mut st = lock(&state);
            if st.generation != generation {
                return;
            }
            cursor += 1;
            if cursor >= playlist.len() {
                st.session = None;
                return;
            }
            // Claim the next article under the same generation; a stop
            // between here and its synthesis completing still wins.
            st.session = Some(Session {
                article_id: playlist[cursor].id.clone(),
                loading: true,
                handle: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::TimedSink;
    use async_trait::async_trait;
    use gist_core::{Category, DeepAnalysis, Error, Result, SpeechClip};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn article(id: &str) -> Article {
        Article {
            id: id.to_string(),
            title: format!("Title {}", id),
            gist: format!("Gist for {}", id),
            source: "Test Wire".to_string(),
            url: format!("https://news.example/{}", id),
            published_at: chrono::Utc::now(),
            category: Category::General,
            image_url: None,
        }
    }

    /// Synthesizer whose completions are held back until the test releases
    /// them, so resolution order can be controlled per article.
    struct GatedSynth {
        gates: Mutex<HashMap<String, Arc<Notify>>>,
        calls: Mutex<Vec<String>>,
        clip_frames: usize,
        gated: bool,
        fail: bool,
        empty: bool,
    }

    impl GatedSynth {
        fn gated(clip_frames: usize) -> Arc<Self> {
            Arc::new(Self {
                gates: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
                clip_frames,
                gated: true,
                fail: false,
                empty: false,
            })
        }

        fn immediate(clip_frames: usize) -> Arc<Self> {
            Arc::new(Self {
                gates: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
                clip_frames,
                gated: false,
                fail: false,
                empty: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                gates: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
                clip_frames: 0,
                gated: false,
                fail: true,
                empty: false,
            })
        }

        fn silent() -> Arc<Self> {
            Arc::new(Self {
                gates: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
                clip_frames: 0,
                gated: false,
                fail: false,
                empty: true,
            })
        }

        fn gate(&self, title: &str) -> Arc<Notify> {
            let mut gates = self.gates.lock().unwrap();
            Arc::clone(gates.entry(title.to_string()).or_default())
        }

        /// Let the pending synthesis for `title` resolve.
        fn release(&self, title: &str) {
            self.gate(title).notify_one();
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ContentModel for GatedSynth {
        fn name(&self) -> &str {
            "gated"
        }

        async fn fetch_articles(&self, _: Category, _: &str) -> Result<Vec<Article>> {
            Err(Error::Inference("not used in playback tests".into()))
        }

        async fn synthesize(&self, title: &str, _gist: &str) -> Result<Option<SpeechClip>> {
            self.calls.lock().unwrap().push(title.to_string());
            if self.gated {
                let gate = self.gate(title);
                gate.notified().await;
            }
            if self.fail {
                return Err(Error::Synthesis("boom".into()));
            }
            if self.empty {
                return Ok(None);
            }
            Ok(Some(SpeechClip::new(
                vec![0.0; self.clip_frames],
                24_000,
                1,
            )))
        }

        async fn analyze(&self, _: &str, _: &str) -> Result<DeepAnalysis> {
            Err(Error::Inference("not used in playback tests".into()))
        }
    }

    /// Counts how many clips actually reached the audio output.
    struct CountingSink {
        inner: TimedSink,
        started: AtomicUsize,
    }

    impl CountingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                inner: TimedSink::new(),
                started: AtomicUsize::new(0),
            })
        }

        fn started(&self) -> usize {
            self.started.load(Ordering::SeqCst)
        }
    }

    impl AudioSink for CountingSink {
        fn start(&self, clip: SpeechClip) -> Result<Arc<dyn PlaybackHandle>> {
            self.started.fetch_add(1, Ordering::SeqCst);
            self.inner.start(clip)
        }
    }

    async fn settle() {
        // Let spawned session tasks run their pending steps.
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn wait_until_idle(controller: &PlaybackController) {
        for _ in 0..1000 {
            if controller.snapshot().is_idle() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("controller never went idle: {:?}", controller.snapshot());
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_same_article_before_resolution_stops() {
        let synth = GatedSynth::gated(240);
        let sink = CountingSink::new();
        let controller = PlaybackController::new(synth.clone(), sink.clone());
        let a = article("a");
        let list = vec![a.clone()];

        controller.toggle(&a, &list);
        settle().await;
        assert_eq!(
            controller.snapshot(),
            PlaybackSnapshot {
                active_article_id: Some("a".into()),
                is_loading: true
            }
        );

        // Second tap stops, even though synthesis has not resolved.
        controller.toggle(&a, &list);
        assert!(controller.snapshot().is_idle());

        // The late result must be discarded: no audio, state untouched.
        synth.release(&a.title);
        settle().await;
        assert!(controller.snapshot().is_idle());
        assert_eq!(sink.started(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_result_never_overrides_newer_claim() {
        // hour-long clips so B is still audibly playing at the end
        let synth = GatedSynth::gated(24_000 * 3600);
        let sink = CountingSink::new();
        let controller = PlaybackController::new(synth.clone(), sink.clone());
        let a = article("a");
        let b = article("b");
        let list = vec![a.clone(), b.clone()];

        controller.toggle(&a, &list);
        settle().await;
        controller.toggle(&b, &list);
        settle().await;

        // A resolves late; B still owns the session.
        synth.release(&a.title);
        settle().await;
        let snap = controller.snapshot();
        assert_eq!(snap.active_article_id.as_deref(), Some("b"));
        assert!(snap.is_loading);
        assert_eq!(sink.started(), 0);

        // B resolves and plays.
        synth.release(&b.title);
        settle().await;
        let snap = controller.snapshot();
        assert_eq!(snap.active_article_id.as_deref(), Some("b"));
        assert!(!snap.is_loading);
        assert_eq!(sink.started(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_advances_through_the_playlist() {
        let synth = GatedSynth::immediate(240);
        let sink = CountingSink::new();
        let controller = PlaybackController::new(synth.clone(), sink.clone());
        let list = vec![article("a"), article("b"), article("c")];

        controller.toggle(&list[0], &list);
        wait_until_idle(&controller).await;

        assert_eq!(synth.calls(), vec!["Title a", "Title b", "Title c"]);
        assert_eq!(sink.started(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn last_article_completion_goes_idle() {
        let synth = GatedSynth::immediate(240);
        let sink = CountingSink::new();
        let controller = PlaybackController::new(synth.clone(), sink.clone());
        let list = vec![article("a"), article("b"), article("c")];

        controller.toggle(&list[2], &list);
        wait_until_idle(&controller).await;

        assert_eq!(synth.calls(), vec!["Title c"]);
        assert_eq!(sink.started(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_playback_prevents_advance() {
        // Hour-long clips: playback only ends via stop.
        let synth = GatedSynth::immediate(24_000 * 3600);
        let sink = CountingSink::new();
        let controller = PlaybackController::new(synth.clone(), sink.clone());
        let list = vec![article("a"), article("b")];

        controller.toggle(&list[0], &list);
        settle().await;
        assert!(!controller.snapshot().is_loading);

        controller.stop();
        assert!(controller.snapshot().is_idle());

        settle().await;
        assert_eq!(synth.calls(), vec!["Title a"]);
        assert_eq!(sink.started(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_when_idle_is_a_noop() {
        let synth = GatedSynth::immediate(240);
        let controller = PlaybackController::new(synth, CountingSink::new());
        controller.stop();
        controller.stop();
        assert!(controller.snapshot().is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn synthesis_failure_resolves_to_idle() {
        let synth = GatedSynth::failing();
        let sink = CountingSink::new();
        let controller = PlaybackController::new(synth, sink.clone());
        let a = article("a");

        controller.toggle(&a, &[a.clone()]);
        settle().await;
        assert!(controller.snapshot().is_idle());
        assert_eq!(sink.started(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_synthesis_result_resolves_to_idle() {
        let synth = GatedSynth::silent();
        let sink = CountingSink::new();
        let controller = PlaybackController::new(synth, sink.clone());
        let a = article("a");

        controller.toggle(&a, &[a.clone()]);
        settle().await;
        assert!(controller.snapshot().is_idle());
        assert_eq!(sink.started(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn article_outside_playlist_plays_standalone() {
        let synth = GatedSynth::immediate(240);
        let sink = CountingSink::new();
        let controller = PlaybackController::new(synth.clone(), sink.clone());
        let list = vec![article("a"), article("b")];
        let lone = article("z");

        controller.toggle(&lone, &list);
        wait_until_idle(&controller).await;

        // No advance into a playlist the article was never part of.
        assert_eq!(synth.calls(), vec!["Title z"]);
        assert_eq!(sink.started(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn switching_articles_mid_playback_restarts() {
        let synth = GatedSynth::immediate(24_000 * 3600);
        let sink = CountingSink::new();
        let controller = PlaybackController::new(synth.clone(), sink.clone());
        let list = vec![article("a"), article("b")];

        controller.toggle(&list[0], &list);
        settle().await;
        assert_eq!(
            controller.snapshot().active_article_id.as_deref(),
            Some("a")
        );

        controller.toggle(&list[1], &list);
        settle().await;
        let snap = controller.snapshot();
        assert_eq!(snap.active_article_id.as_deref(), Some("b"));
        assert!(!snap.is_loading);
        assert_eq!(synth.calls(), vec!["Title a", "Title b"]);
        assert_eq!(sink.started(), 2);
    }
}
