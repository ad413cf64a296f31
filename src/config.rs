//! Configuration management for the voxchat client

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::backend::GenerateOptions;
use crate::{Error, Result};

/// Default system prompt for new conversations
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a concise voice assistant. Answer briefly in plain spoken language, \
     without markdown or lists.";

/// Voxchat client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generation backend settings
    pub backend: BackendConfig,

    /// Voice output settings
    pub voice: VoiceConfig,

    /// Target language tag (BCP-47); also selects spoken number words
    pub language: String,

    /// Turns included in the backend prompt window
    pub history_window: usize,

    /// System prompt prepended to each conversation
    pub system_prompt: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            voice: VoiceConfig::default(),
            language: "en-US".to_string(),
            history_window: 12,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Generation backend settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the Ollama-compatible server
    pub url: String,

    /// Model identifier
    pub model: String,

    /// Stream NDJSON chunks instead of waiting for the full body
    pub stream: bool,

    /// Sampling options (Ollama wire names)
    pub options: GenerateOptions,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            model: "gemma3".to_string(),
            stream: true,
            options: GenerateOptions::default(),
        }
    }
}

/// Voice output settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Voice identifier, synthesizer-specific
    pub voice: String,

    /// Speaking rate multiplier (0.25 to 4.0)
    pub rate: f32,

    /// Pitch multiplier (0.5 to 2.0)
    pub pitch: f32,

    /// Volume (0.0 to 1.0)
    pub volume: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice: "default".to_string(),
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

impl Config {
    /// Load configuration from `path`, the platform config dir, or
    /// defaults, then apply `VOXCHAT_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns error when the file exists but cannot be read or parsed,
    /// or when a value is out of range.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map_or_else(default_config_path, |p| Some(p.to_path_buf()));

        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(&p)?;
                tracing::debug!(path = %p.display(), "loaded config file");
                toml::from_str(&raw)?
            }
            _ => Self::default(),
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("VOXCHAT_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Ok(model) = std::env::var("VOXCHAT_MODEL") {
            self.backend.model = model;
        }
        if let Ok(language) = std::env::var("VOXCHAT_LANGUAGE") {
            self.language = language;
        }
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if self.backend.url.is_empty() {
            return Err(Error::Config("backend url must not be empty".to_string()));
        }
        if self.backend.model.is_empty() {
            return Err(Error::Config("model must not be empty".to_string()));
        }
        if self.history_window < 2 {
            return Err(Error::Config(
                "history_window must be at least 2".to_string(),
            ));
        }
        if !(0.25..=4.0).contains(&self.voice.rate) {
            return Err(Error::Config(format!(
                "voice rate {} out of range 0.25..=4.0",
                self.voice.rate
            )));
        }
        if !(0.5..=2.0).contains(&self.voice.pitch) {
            return Err(Error::Config(format!(
                "voice pitch {} out of range 0.5..=2.0",
                self.voice.pitch
            )));
        }
        if !(0.0..=1.0).contains(&self.voice.volume) {
            return Err(Error::Config(format!(
                "voice volume {} out of range 0.0..=1.0",
                self.voice.volume
            )));
        }
        Ok(())
    }
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "voxchat", "voxchat").map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            language = "id-ID"

            [backend]
            model = "qwen3:4b"
            "#,
        )
        .unwrap();
        assert_eq!(config.language, "id-ID");
        assert_eq!(config.backend.model, "qwen3:4b");
        assert_eq!(config.backend.url, "http://localhost:11434");
        assert_eq!(config.history_window, 12);
    }

    #[test]
    fn backend_options_parse_wire_names() {
        let config: Config = toml::from_str(
            r#"
            [backend.options]
            num_predict = 64
            temperature = 0.2
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.options.num_predict, 64);
        assert!((config.backend.options.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn out_of_range_voice_rejected() {
        let mut config = Config::default();
        config.voice.rate = 9.0;
        assert!(config.validate().is_err());
        config.voice.rate = 1.0;
        config.voice.volume = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn tiny_history_window_rejected() {
        let mut config = Config::default();
        config.history_window = 1;
        assert!(config.validate().is_err());
    }
}
