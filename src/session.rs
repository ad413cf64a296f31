//! Voice session orchestration
//!
//! Owns the conversation history, the continuation token, and the retry
//! controller. One session spans one call; turn-taking is strict: capture
//! is paused while a generation request is outstanding and while playback
//! runs, and history is appended only once a turn fully completes.

use crate::backend::{ContinuationToken, GenerateOptions, GenerateRequest, TextGenerator};
use crate::config::Config;
use crate::history::History;
use crate::sanitize::{self, SanitizeOptions, SpokenLocale};
use crate::speech::{
    MIN_TRANSCRIPT_CHARS, SpeechCapture, SpeechParams, SpeechSynthesizer, TranscriptEvent,
};
use crate::validate::validate;
use crate::{Error, Result};

/// Fixed reply when the backend cannot be reached
pub const GREETING_FALLBACK: &str =
    "Sorry, I am having trouble reaching the language model right now. Let's try again in a moment.";

/// Fixed reply when the cleaned response is not speakable
pub const APOLOGY_FALLBACK: &str =
    "Sorry, I could not come up with a clear answer to that.";

/// Generation budget for the simplified retry request
const RETRY_NUM_PREDICT: u32 = 64;

/// Session parameters, fixed at call start
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Model identifier
    pub model: String,
    /// Target language tag
    pub language: String,
    /// System prompt prepended to the conversation
    pub system_prompt: String,
    /// Turns included in the prompt window
    pub history_window: usize,
    /// Sampling options for primary requests
    pub options: GenerateOptions,
    /// Voice parameters for playback
    pub speech: SpeechParams,
}

impl From<&Config> for SessionConfig {
    fn from(config: &Config) -> Self {
        Self {
            model: config.backend.model.clone(),
            language: config.language.clone(),
            system_prompt: config.system_prompt.clone(),
            history_window: config.history_window,
            options: config.backend.options.clone(),
            speech: SpeechParams {
                voice: config.voice.voice.clone(),
                rate: config.voice.rate,
                pitch: config.voice.pitch,
                volume: config.voice.volume,
                language: config.language.clone(),
            },
        }
    }
}

/// Outcome of one validated exchange with the backend
#[derive(Debug, Clone)]
pub struct Reply {
    /// Cleaned response text, never empty
    pub text: String,
    /// False when a fallback phrase stands in for a failed call
    pub succeeded: bool,
    /// Whether the bounded retry fired
    pub retried: bool,
}

/// One voice call: history, continuation token, and retry control.
///
/// Constructed at call start, dropped at call end; there is no process-wide
/// state.
pub struct Session<G> {
    backend: G,
    config: SessionConfig,
    history: History,
    context: Option<ContinuationToken>,
    speech_opts: SanitizeOptions,
}

impl<G: TextGenerator> Session<G> {
    /// Create a session over `backend`
    #[must_use]
    pub fn new(backend: G, config: SessionConfig) -> Self {
        let locale = SpokenLocale::for_language(&config.language);
        let history = History::new(config.history_window);
        Self {
            backend,
            config,
            history,
            context: None,
            speech_opts: SanitizeOptions::speech().with_locale(locale),
        }
    }

    /// Conversation history so far
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Current continuation token, if any
    #[must_use]
    pub fn continuation(&self) -> Option<&ContinuationToken> {
        self.context.as_ref()
    }

    /// Clear history and continuation token (session reset)
    pub fn reset(&mut self) {
        self.history.clear();
        self.context = None;
        tracing::debug!("session reset");
    }

    /// Send `message` to the backend and validate the response.
    ///
    /// Explicit two-state flow: Primary, then at most one Retry when the
    /// primary response carries malformed markup or wrong-language leakage.
    /// Truncation alone never retries. Transport failures yield the fixed
    /// fallback greeting; this method itself never fails.
    pub async fn send_with_validation(&mut self, message: &str) -> Reply {
        let primary = GenerateRequest {
            model: self.config.model.clone(),
            prompt: self.compose_prompt(message),
            stream: true,
            options: self.config.options.clone(),
            context: self.context.clone(),
        };

        let generation = match self.backend.generate(primary).await {
            Ok(generation) => generation,
            Err(e) => {
                tracing::warn!(error = %e, "primary generation failed");
                return Reply {
                    text: GREETING_FALLBACK.to_string(),
                    succeeded: false,
                    retried: false,
                };
            }
        };

        let validation = validate(&generation.text, &self.config.language);
        if validation.needs_retry() {
            tracing::info!(issues = ?validation.issues, "malformed generation, retrying once");
            // drop the token so the malformed state cannot leak forward
            self.context = None;
            return self.retry(message).await;
        }

        if !validation.complete {
            tracing::debug!(issues = ?validation.issues, "accepting response with minor issues");
        }
        self.context = generation.context;
        Reply {
            text: validation.cleaned,
            succeeded: true,
            retried: false,
        }
    }

    /// The single bounded retry: shorter stricter prompt, reduced budget,
    /// no conversation window, no continuation token. Its result is
    /// returned regardless of its own issues; its token is discarded.
    async fn retry(&mut self, message: &str) -> Reply {
        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt: format!(
                "Answer in {} with one or two short plain sentences and no internal \
                 reasoning: {message}",
                self.config.language
            ),
            stream: true,
            options: GenerateOptions {
                num_predict: RETRY_NUM_PREDICT,
                ..self.config.options.clone()
            },
            context: None,
        };

        match self.backend.generate(request).await {
            Ok(generation) => {
                let validation = validate(&generation.text, &self.config.language);
                Reply {
                    text: validation.cleaned,
                    succeeded: true,
                    retried: true,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "retry failed");
                Reply {
                    text: GREETING_FALLBACK.to_string(),
                    succeeded: false,
                    retried: true,
                }
            }
        }
    }

    /// Run one full turn: generate, gate for speech suitability, speak,
    /// then record both sides in history.
    ///
    /// # Errors
    ///
    /// Returns error when playback fails or history ordering is violated.
    pub async fn run_turn(
        &mut self,
        transcript: &str,
        synthesizer: &mut dyn SpeechSynthesizer,
    ) -> Result<Reply> {
        let message = transcript.trim();
        let reply = self.send_with_validation(message).await;

        let spoken = if sanitize::is_speech_suitable(&reply.text) {
            sanitize::sanitize(&reply.text, &self.speech_opts)
        } else {
            tracing::debug!("reply unsuitable for speech, substituting apology");
            APOLOGY_FALLBACK.to_string()
        };

        synthesizer.cancel();
        synthesizer.speak(&spoken, &self.config.speech).await?;

        // the turn is complete; record both sides, in order
        self.history.push_user(message)?;
        self.history.push_assistant(reply.text.clone())?;
        Ok(reply)
    }

    /// Drive the conversation loop until the capture source closes.
    ///
    /// Only final transcripts at least [`MIN_TRANSCRIPT_CHARS`] long start
    /// a turn; capture is paused for the whole turn and resumed after
    /// playback ends.
    ///
    /// # Errors
    ///
    /// Returns error when capture or playback becomes unavailable.
    pub async fn converse<C: SpeechCapture>(
        &mut self,
        capture: &mut C,
        synthesizer: &mut dyn SpeechSynthesizer,
    ) -> Result<()> {
        let mut events = capture.start()?;
        tracing::info!(model = %self.config.model, language = %self.config.language, "session started");

        while let Some(event) = events.recv().await {
            let TranscriptEvent::Final(text) = event else {
                continue;
            };
            let text = text.trim().to_string();
            if text.chars().count() < MIN_TRANSCRIPT_CHARS {
                continue;
            }

            capture.pause();
            let reply = self.run_turn(&text, synthesizer).await?;
            tracing::debug!(succeeded = reply.succeeded, retried = reply.retried, "turn complete");
            capture.resume()?;
        }

        capture.stop();
        tracing::info!(turns = self.history.len(), "session ended");
        Ok(())
    }

    fn compose_prompt(&self, message: &str) -> String {
        let mut prompt = String::new();
        if !self.config.system_prompt.is_empty() {
            prompt.push_str(&self.config.system_prompt);
            prompt.push_str("\n\n");
        }
        let window = self.history.prompt_window();
        if !window.is_empty() {
            prompt.push_str(&window);
            prompt.push('\n');
        }
        prompt.push_str("User: ");
        prompt.push_str(message);
        prompt.push_str("\nAssistant:");
        prompt
    }
}

impl<G> Session<G> {
    /// Validate that the session invariants hold after construction
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the window cannot hold a full turn.
    pub fn check(&self) -> Result<()> {
        if self.config.history_window < 2 {
            return Err(Error::Config(
                "history window cannot hold a full turn".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Generation;
    use async_trait::async_trait;

    struct Canned(&'static str);

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, _req: GenerateRequest) -> Result<Generation> {
            Ok(Generation {
                text: self.0.to_string(),
                context: None,
            })
        }
    }

    fn test_config() -> SessionConfig {
        SessionConfig::from(&Config::default())
    }

    #[test]
    fn prompt_includes_system_and_window() {
        let mut session = Session::new(Canned("ok."), test_config());
        session.history.push_user("earlier question").unwrap();
        session.history.push_assistant("earlier answer").unwrap();
        let prompt = session.compose_prompt("new question");
        assert!(prompt.starts_with(crate::config::DEFAULT_SYSTEM_PROMPT));
        assert!(prompt.contains("User: earlier question"));
        assert!(prompt.contains("Assistant: earlier answer"));
        assert!(prompt.ends_with("User: new question\nAssistant:"));
    }

    #[test]
    fn reset_clears_history_and_token() {
        let mut session = Session::new(Canned("ok."), test_config());
        session.history.push_user("hi").unwrap();
        session.context = Some(vec![1, 2]);
        session.reset();
        assert!(session.history().is_empty());
        assert!(session.continuation().is_none());
    }
}
