//! Speech capture and synthesis seams
//!
//! Microphone transcription and voice playback are external capabilities;
//! the session only ever sees transcript events and a synthesizer it can
//! hand text to. Console implementations are provided so the client runs
//! without audio hardware.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::Result;

/// Final transcripts shorter than this are discarded as noise
pub const MIN_TRANSCRIPT_CHARS: usize = 2;

/// A transcript event from the capture source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    /// Partial hypothesis, may still change
    Interim(String),
    /// Committed transcript for one utterance
    Final(String),
}

/// Voice parameters for one utterance
#[derive(Debug, Clone)]
pub struct SpeechParams {
    /// Voice identifier, synthesizer-specific
    pub voice: String,
    /// Speaking rate multiplier
    pub rate: f32,
    /// Pitch multiplier
    pub pitch: f32,
    /// Volume in `0.0..=1.0`
    pub volume: f32,
    /// BCP-47 language tag
    pub language: String,
}

impl Default for SpeechParams {
    fn default() -> Self {
        Self {
            voice: "default".to_string(),
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            language: "en-US".to_string(),
        }
    }
}

/// Source of speech transcripts.
///
/// At most one capture session is active at a time; `start` stops any
/// prior session before opening a new one.
pub trait SpeechCapture: Send {
    /// Begin capturing; yields transcript events until stopped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Capture`] when the capability is missing.
    fn start(&mut self) -> Result<mpsc::Receiver<TranscriptEvent>>;

    /// Suspend event delivery without tearing down the session
    fn pause(&mut self);

    /// Resume event delivery after a pause.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Capture`] when capture cannot be resumed.
    fn resume(&mut self) -> Result<()>;

    /// Tear the capture session down
    fn stop(&mut self);
}

/// Sink for synthesized speech.
///
/// At most one utterance plays at a time; `speak` cancels any in-flight
/// utterance before starting and resolves when playback ends.
#[async_trait]
pub trait SpeechSynthesizer: Send {
    /// Speak `text`, resolving when playback ends.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Synthesis`] when playback fails.
    async fn speak(&mut self, text: &str, params: &SpeechParams) -> Result<()>;

    /// Stop any in-flight utterance
    fn cancel(&mut self);
}

/// Reads utterances from stdin, one line per final transcript
pub struct ConsoleCapture {
    paused: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl ConsoleCapture {
    /// Create a console capture source
    #[must_use]
    pub fn new() -> Self {
        Self {
            paused: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }
}

impl Default for ConsoleCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechCapture for ConsoleCapture {
    fn start(&mut self) -> Result<mpsc::Receiver<TranscriptEvent>> {
        self.stop();
        self.paused.store(false, Ordering::Relaxed);

        let (tx, rx) = mpsc::channel(16);
        let paused = Arc::clone(&self.paused);
        let task = tokio::spawn(async move {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut lines = stdin.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                // lines typed while paused belong to no turn
                if paused.load(Ordering::Relaxed) {
                    continue;
                }
                if tx.send(TranscriptEvent::Final(line)).await.is_err() {
                    break;
                }
            }
        });
        self.task = Some(task);
        tracing::debug!("console capture started");
        Ok(rx)
    }

    fn pause(&mut self) {
        self.paused.store(true, Ordering::Relaxed);
    }

    fn resume(&mut self) -> Result<()> {
        self.paused.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("console capture stopped");
        }
    }
}

/// Prints utterances to stdout; reference playback for headless runs
pub struct ConsolePlayback;

impl ConsolePlayback {
    /// Create a console playback sink
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for ConsolePlayback {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSynthesizer for ConsolePlayback {
    async fn speak(&mut self, text: &str, params: &SpeechParams) -> Result<()> {
        tracing::debug!(voice = %params.voice, chars = text.chars().count(), "speaking");
        println!("[{}] {text}", params.voice);
        Ok(())
    }

    fn cancel(&mut self) {}
}
