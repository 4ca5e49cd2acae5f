//! Push-to-talk voice session.
//!
//! The command loop calls [`VoiceSession::toggle`] on each key press. From
//! `Idle` this spawns one worker task that runs a full cycle:
//! capture → recognize → retrieve and generate → speak. While that cycle runs
//! the state stays `Capturing` and further toggles are refused with
//! [`ToggleOutcome::AlreadyListening`], so cycles never overlap. Progress and
//! failures are reported on an event channel that the command loop drains.

mod state;

pub use state::{CaptureGuard, ListeningState, SessionState};

use crate::audio::AudioCapture;
use crate::error::{Result, UzhavanError};
use crate::rag::{RagEngine, RagResponse};
use crate::retry::RetryPolicy;
use crate::speech::Speaker;
use crate::transcription::SpeechRecognizer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// Progress of a capture cycle, in the order it happens.
#[derive(Debug)]
pub enum VoiceEvent {
    /// Recording has started.
    Listening,
    /// Recording stopped; recognition is running.
    Recognizing,
    /// The spoken question as text.
    Recognized(String),
    /// The answer, before it is spoken.
    Answered(RagResponse),
    /// The answer finished playing.
    Spoken,
    /// The cycle stopped at this error.
    Failed(UzhavanError),
    /// The session is back to `Idle` and accepts a new toggle.
    Ready,
}

/// Result of a toggle press.
#[derive(Debug)]
pub enum ToggleOutcome {
    /// A new cycle was started on this task.
    Started(JoinHandle<()>),
    /// A cycle is already running; nothing changed.
    AlreadyListening,
    /// The session has been quit; toggles are ignored.
    Closed,
}

/// Everything a cycle needs, shared read-only between cycles.
struct CyclePipeline {
    capture: Arc<dyn AudioCapture>,
    recognizer: Arc<dyn SpeechRecognizer>,
    engine: Arc<RagEngine>,
    speaker: Speaker,
    recognition_retry: RetryPolicy,
}

/// Voice session owning the listening state.
pub struct VoiceSession {
    state: SessionState,
    closed: AtomicBool,
    pipeline: Arc<CyclePipeline>,
    events: UnboundedSender<VoiceEvent>,
}

impl VoiceSession {
    /// `recognition_retry` bounds retries of speech recognition service errors.
    pub fn new(
        capture: Arc<dyn AudioCapture>,
        recognizer: Arc<dyn SpeechRecognizer>,
        engine: Arc<RagEngine>,
        speaker: Speaker,
        recognition_retry: RetryPolicy,
        events: UnboundedSender<VoiceEvent>,
    ) -> Self {
        Self {
            state: SessionState::new(),
            closed: AtomicBool::new(false),
            pipeline: Arc::new(CyclePipeline {
                capture,
                recognizer,
                engine,
                speaker,
                recognition_retry,
            }),
            events,
        }
    }

    pub fn state(&self) -> ListeningState {
        self.state.current()
    }

    /// Handle a toggle press. Must be called from within a Tokio runtime.
    pub fn toggle(&self) -> ToggleOutcome {
        if self.closed.load(Ordering::Acquire) {
            return ToggleOutcome::Closed;
        }

        let Some(guard) = self.state.try_begin_capture() else {
            info!("Toggle ignored, already listening");
            return ToggleOutcome::AlreadyListening;
        };

        let pipeline = Arc::clone(&self.pipeline);
        let events = self.events.clone();
        let span = info_span!("voice_cycle", cycle = %Uuid::new_v4());

        let handle = tokio::spawn(
            async move {
                let guard = CycleGuard {
                    capture: Some(guard),
                    events: events.clone(),
                };
                if let Err(e) = pipeline.run(&events).await {
                    error!("Voice cycle failed: {}", e);
                    let _ = events.send(VoiceEvent::Failed(e));
                }
                drop(guard);
            }
            .instrument(span),
        );

        ToggleOutcome::Started(handle)
    }

    /// Stop accepting toggles. A cycle already running is not interrupted.
    pub fn quit(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Releases the listening state, then announces it.
struct CycleGuard {
    capture: Option<CaptureGuard>,
    events: UnboundedSender<VoiceEvent>,
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        drop(self.capture.take());
        let _ = self.events.send(VoiceEvent::Ready);
    }
}

impl CyclePipeline {
    async fn run(&self, events: &UnboundedSender<VoiceEvent>) -> Result<()> {
        let _ = events.send(VoiceEvent::Listening);
        let audio = self.capture.capture().await?;

        let _ = events.send(VoiceEvent::Recognizing);
        let language = self.speaker.language();
        let text = self
            .recognition_retry
            .run("Speech recognition", || {
                self.recognizer.recognize(&audio, language)
            })
            .await?;
        info!("Recognized question");
        let _ = events.send(VoiceEvent::Recognized(text.clone()));

        let response = self.engine.answer(&text).await?;
        let answer = response.answer.clone();
        let _ = events.send(VoiceEvent::Answered(response));

        self.speaker.speak(&answer).await?;
        let _ = events.send(VoiceEvent::Spoken);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioPlayer, CapturedAudio};
    use crate::corpus::{Chunk, CorpusStore};
    use crate::embedding::Embedder;
    use crate::generation::AnswerGenerator;
    use crate::speech::SpeechSynthesizer;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use tokio::sync::Notify;

    struct GatedCapture {
        calls: AtomicUsize,
        gate: Option<Notify>,
    }

    impl GatedCapture {
        fn immediate() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn gated() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                gate: Some(Notify::new()),
            }
        }
    }

    #[async_trait]
    impl AudioCapture for GatedCapture {
        async fn capture(&self) -> Result<CapturedAudio> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(CapturedAudio::new(vec![1; 512], "capture.wav"))
        }
    }

    struct ScriptedRecognizer {
        text: Option<String>,
    }

    #[async_trait]
    impl SpeechRecognizer for ScriptedRecognizer {
        async fn recognize(&self, _audio: &CapturedAudio, language: &str) -> Result<String> {
            assert_eq!(language, "ta");
            self.text.clone().ok_or(UzhavanError::RecognitionUnintelligible)
        }
    }

    struct UnitEmbedder;

    #[async_trait]
    impl Embedder for UnitEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    struct CountingGenerator {
        calls: AtomicUsize,
        reply: Option<String>,
    }

    #[async_trait]
    impl AnswerGenerator for CountingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .clone()
                .ok_or_else(|| UzhavanError::GenerationFailure("network down".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingSynthesizer {
        texts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SpeechSynthesizer for RecordingSynthesizer {
        async fn synthesize(&self, text: &str, _language: &str) -> Result<PathBuf> {
            self.texts.lock().unwrap().push(text.to_string());
            Ok(PathBuf::from("response.mp3"))
        }
    }

    /// Fails with a service error until `failures` attempts have been made.
    struct FlakyRecognizer {
        attempts: AtomicUsize,
        failures: usize,
    }

    #[async_trait]
    impl SpeechRecognizer for FlakyRecognizer {
        async fn recognize(&self, _audio: &CapturedAudio, _language: &str) -> Result<String> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures {
                Err(UzhavanError::RecognitionServiceError("503".to_string()))
            } else {
                Ok("மழை எப்போது?".to_string())
            }
        }
    }

    #[derive(Default)]
    struct CountingPlayer {
        plays: AtomicUsize,
        broken: bool,
    }

    #[async_trait]
    impl AudioPlayer for CountingPlayer {
        async fn play(&self, _path: &Path) -> Result<()> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            if self.broken {
                return Err(UzhavanError::PlaybackFailure("no output device".to_string()));
            }
            Ok(())
        }
    }

    struct Harness {
        session: VoiceSession,
        events: UnboundedReceiver<VoiceEvent>,
        capture: Arc<GatedCapture>,
        generator: Arc<CountingGenerator>,
        synthesizer: Arc<RecordingSynthesizer>,
        player: Arc<CountingPlayer>,
    }

    fn harness(capture: GatedCapture, recognized: Option<&str>, reply: Option<&str>) -> Harness {
        let recognizer = Arc::new(ScriptedRecognizer {
            text: recognized.map(str::to_string),
        });
        build_harness(
            capture,
            recognizer,
            RetryPolicy::none(),
            reply,
            CountingPlayer::default(),
        )
    }

    fn build_harness(
        capture: GatedCapture,
        recognizer: Arc<dyn SpeechRecognizer>,
        recognition_retry: RetryPolicy,
        reply: Option<&str>,
        player: CountingPlayer,
    ) -> Harness {
        let corpus = Arc::new(
            CorpusStore::new(vec![
                Chunk::new("c1", "Use compost for natural fertilization", vec![1.0, 0.0]).unwrap(),
            ])
            .unwrap(),
        );
        let capture = Arc::new(capture);
        let generator = Arc::new(CountingGenerator {
            calls: AtomicUsize::new(0),
            reply: reply.map(str::to_string),
        });
        let synthesizer = Arc::new(RecordingSynthesizer::default());
        let player = Arc::new(player);

        let engine = Arc::new(
            RagEngine::new(corpus, Arc::new(UnitEmbedder), generator.clone())
                .with_retry(RetryPolicy::none())
                .with_timeout(Duration::from_secs(5)),
        );
        let speaker = Speaker::new(synthesizer.clone(), player.clone(), "ta");

        let (tx, rx) = mpsc::unbounded_channel();
        let session = VoiceSession::new(
            capture.clone(),
            recognizer,
            engine,
            speaker,
            recognition_retry,
            tx,
        );

        Harness {
            session,
            events: rx,
            capture,
            generator,
            synthesizer,
            player,
        }
    }

    fn drain(rx: &mut UnboundedReceiver<VoiceEvent>) -> Vec<VoiceEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    async fn finish(outcome: ToggleOutcome) {
        match outcome {
            ToggleOutcome::Started(handle) => handle.await.unwrap(),
            other => panic!("expected a started cycle, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_full_cycle_speaks_answer() {
        let mut h = harness(GatedCapture::immediate(), Some("உரம் எப்படி?"), Some("பதில்"));

        finish(h.session.toggle()).await;

        assert_eq!(h.session.state(), ListeningState::Idle);
        assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*h.synthesizer.texts.lock().unwrap(), vec!["பதில்".to_string()]);
        assert_eq!(h.player.plays.load(Ordering::SeqCst), 1);

        let events = drain(&mut h.events);
        assert!(matches!(events[0], VoiceEvent::Listening));
        assert!(matches!(events[1], VoiceEvent::Recognizing));
        assert!(matches!(&events[2], VoiceEvent::Recognized(t) if t == "உரம் எப்படி?"));
        assert!(matches!(&events[3], VoiceEvent::Answered(r) if r.answer == "பதில்"));
        assert!(matches!(events[4], VoiceEvent::Spoken));
        assert!(matches!(events[5], VoiceEvent::Ready));
    }

    #[tokio::test]
    async fn test_toggle_while_capturing_is_ignored() {
        let h = harness(GatedCapture::gated(), Some("question"), Some("answer"));

        let first = h.session.toggle();
        assert!(matches!(first, ToggleOutcome::Started(_)));
        assert_eq!(h.session.state(), ListeningState::Capturing);

        let second = h.session.toggle();
        assert!(matches!(second, ToggleOutcome::AlreadyListening));
        assert_eq!(h.session.state(), ListeningState::Capturing);

        h.capture.gate.as_ref().unwrap().notify_one();
        finish(first).await;

        assert_eq!(h.capture.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.session.state(), ListeningState::Idle);
    }

    #[tokio::test]
    async fn test_unintelligible_audio_returns_to_idle_without_generation() {
        let mut h = harness(GatedCapture::immediate(), None, Some("answer"));

        finish(h.session.toggle()).await;

        assert_eq!(h.session.state(), ListeningState::Idle);
        assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);

        let events = drain(&mut h.events);
        assert!(events
            .iter()
            .any(|e| matches!(e, VoiceEvent::Failed(UzhavanError::RecognitionUnintelligible))));
        assert!(matches!(events.last(), Some(VoiceEvent::Ready)));

        // The session accepts a new cycle afterwards.
        assert!(matches!(h.session.toggle(), ToggleOutcome::Started(_)));
    }

    #[tokio::test]
    async fn test_generation_failure_skips_speech() {
        let mut h = harness(GatedCapture::immediate(), Some("question"), None);

        finish(h.session.toggle()).await;

        assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
        assert!(h.synthesizer.texts.lock().unwrap().is_empty());
        assert_eq!(h.player.plays.load(Ordering::SeqCst), 0);

        let events = drain(&mut h.events);
        assert!(events
            .iter()
            .any(|e| matches!(e, VoiceEvent::Failed(UzhavanError::GenerationFailure(_)))));
        assert!(!events.iter().any(|e| matches!(e, VoiceEvent::Answered(_))));
    }

    #[tokio::test]
    async fn test_playback_failure_reported_and_returns_to_idle() {
        let recognizer = Arc::new(ScriptedRecognizer {
            text: Some("question".to_string()),
        });
        let player = CountingPlayer {
            broken: true,
            ..Default::default()
        };
        let mut h = build_harness(
            GatedCapture::immediate(),
            recognizer,
            RetryPolicy::none(),
            Some("பதில்"),
            player,
        );

        finish(h.session.toggle()).await;

        assert_eq!(h.session.state(), ListeningState::Idle);
        assert_eq!(h.player.plays.load(Ordering::SeqCst), 1);

        let events = drain(&mut h.events);
        assert!(events.iter().any(|e| matches!(e, VoiceEvent::Answered(_))));
        assert!(events
            .iter()
            .any(|e| matches!(e, VoiceEvent::Failed(UzhavanError::PlaybackFailure(_)))));
        assert!(!events.iter().any(|e| matches!(e, VoiceEvent::Spoken)));
        assert!(matches!(events.last(), Some(VoiceEvent::Ready)));

        assert!(matches!(h.session.toggle(), ToggleOutcome::Started(_)));
    }

    #[tokio::test]
    async fn test_recognition_retry_comes_from_constructor() {
        let recognizer = Arc::new(FlakyRecognizer {
            attempts: AtomicUsize::new(0),
            failures: 2,
        });
        let mut h = build_harness(
            GatedCapture::immediate(),
            recognizer.clone(),
            RetryPolicy::new(2, Duration::from_millis(1)),
            Some("answer"),
            CountingPlayer::default(),
        );

        finish(h.session.toggle()).await;

        assert_eq!(recognizer.attempts.load(Ordering::SeqCst), 3);
        let events = drain(&mut h.events);
        assert!(events
            .iter()
            .any(|e| matches!(e, VoiceEvent::Recognized(t) if t == "மழை எப்போது?")));
        assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_quit_refuses_new_toggles() {
        let h = harness(GatedCapture::immediate(), Some("question"), Some("answer"));
        h.session.quit();
        assert!(matches!(h.session.toggle(), ToggleOutcome::Closed));
        assert_eq!(h.capture.calls.load(Ordering::SeqCst), 0);
    }
}
