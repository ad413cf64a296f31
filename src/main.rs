use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use voxchat::{
    Config, ConsoleCapture, ConsolePlayback, OllamaClient, SanitizeOptions, Session,
    SessionConfig, SpeechParams, SpeechSynthesizer, SpokenLocale, is_speech_suitable, sanitize,
};

/// Voxchat - voice chat client for local language models
#[derive(Parser)]
#[command(name = "voxchat", version, about)]
struct Cli {
    /// Path to config file (defaults to the platform config dir)
    #[arg(short, long, env = "VOXCHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Model override
    #[arg(short, long, env = "VOXCHAT_MODEL")]
    model: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive chat loop (default): stdin transcripts in, spoken
    /// replies out
    Chat,
    /// Sanitize text through a preset and print the result
    Clean {
        /// Sanitizer preset to apply
        #[arg(short, long, value_enum, default_value = "speech")]
        preset: Preset,
        /// Text to sanitize
        text: String,
    },
    /// Speak one sanitized utterance
    Say {
        /// Text to speak
        text: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    /// Every stage on, length bounded
    Speech,
    /// Markup and emoji stripped, wording untouched
    Transcript,
    /// Markup stripped, emoji kept
    Display,
}

impl Preset {
    fn options(self, language: &str) -> SanitizeOptions {
        let locale = SpokenLocale::for_language(language);
        match self {
            Self::Speech => SanitizeOptions::speech().with_locale(locale),
            Self::Transcript => SanitizeOptions::transcript().with_locale(locale),
            Self::Display => SanitizeOptions::display().with_locale(locale),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,voxchat=info",
        1 => "info,voxchat=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(model) = cli.model {
        config.backend.model = model;
    }

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => chat(&config).await,
        Command::Clean { preset, text } => {
            println!("{}", sanitize(&text, &preset.options(&config.language)));
            Ok(())
        }
        Command::Say { text } => say(&config, &text).await,
    }
}

async fn chat(config: &Config) -> anyhow::Result<()> {
    let backend = OllamaClient::new(&config.backend.url, config.backend.stream);
    let mut session = Session::new(backend, SessionConfig::from(config));
    session.check()?;

    let mut capture = ConsoleCapture::new();
    let mut playback = ConsolePlayback::new();

    tracing::info!(
        url = %config.backend.url,
        model = %config.backend.model,
        "starting voice chat; type an utterance and press enter"
    );
    session.converse(&mut capture, &mut playback).await?;
    Ok(())
}

async fn say(config: &Config, text: &str) -> anyhow::Result<()> {
    if !is_speech_suitable(text) {
        anyhow::bail!("text is not suitable for speech output");
    }
    let opts = Preset::Speech.options(&config.language);
    let spoken = sanitize(text, &opts);

    let params = SpeechParams {
        voice: config.voice.voice.clone(),
        rate: config.voice.rate,
        pitch: config.voice.pitch,
        volume: config.voice.volume,
        language: config.language.clone(),
    };
    let mut playback = ConsolePlayback::new();
    playback.speak(&spoken, &params).await?;
    Ok(())
}
