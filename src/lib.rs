//! Voxchat - voice chat client for locally hosted language models
//!
//! This library provides the core functionality for the voxchat client:
//! - Response sanitization (reasoning spans, markdown, emoji, length bounds)
//! - Validation and bounded retry of malformed model output
//! - Turn-taking orchestration between capture, generation, and playback
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │              Speech capture (seam)              │
//! └───────────────────┬────────────────────────────┘
//!                     │ final transcripts
//! ┌───────────────────▼────────────────────────────┐
//! │                 Session                         │
//! │  history window │ retry controller │ context   │
//! └───────────────────┬────────────────────────────┘
//!                     │ raw model output
//! ┌───────────────────▼────────────────────────────┐
//! │        Validator  →  Sanitizer pipeline         │
//! └───────────────────┬────────────────────────────┘
//!                     │ speech-suitable text
//! ┌───────────────────▼────────────────────────────┐
//! │            Speech synthesis (seam)              │
//! └────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod history;
pub mod sanitize;
pub mod session;
pub mod speech;
pub mod validate;

pub use backend::{Generation, GenerateOptions, GenerateRequest, OllamaClient, TextGenerator};
pub use config::{BackendConfig, Config, VoiceConfig};
pub use error::{Error, Result};
pub use history::{History, Role, Turn};
pub use sanitize::{SanitizeOptions, SpokenLocale, is_speech_suitable, sanitize};
pub use session::{Reply, Session, SessionConfig};
pub use speech::{
    ConsoleCapture, ConsolePlayback, SpeechCapture, SpeechParams, SpeechSynthesizer,
    TranscriptEvent,
};
pub use validate::{IssueKind, Validation, validate};
