//! Response sanitization pipeline
//!
//! Transforms raw model output into text that is safe, pronounceable, and
//! bounded in length for a speech synthesizer. Stages run in a fixed order:
//! reasoning-span removal, markdown stripping, emoji stripping, number
//! normalization, punctuation normalization, cleanup, length bounding. The
//! first five are independently toggleable per [`SanitizeOptions`]; cleanup
//! always runs; length bounding runs only when a cap is configured.

pub mod reasoning;

use std::sync::LazyLock;

use regex::Regex;

pub use reasoning::strip_reasoning;

/// Default character cap for speech output
pub const SPEECH_MAX_CHARS: usize = 300;

/// Spoken names for numeric glyphs, per output language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpokenLocale {
    /// Spoken word for the `%` glyph
    pub percent: &'static str,
    /// Currency symbol to spoken currency name
    currencies: &'static [(&'static str, &'static str)],
}

impl SpokenLocale {
    /// English number words
    #[must_use]
    pub const fn english() -> Self {
        Self {
            percent: "percent",
            currencies: &[
                ("$", "dollars"),
                ("€", "euros"),
                ("£", "pounds"),
                ("¥", "yen"),
                ("Rp", "rupiah"),
            ],
        }
    }

    /// Indonesian number words
    #[must_use]
    pub const fn indonesian() -> Self {
        Self {
            percent: "persen",
            currencies: &[
                ("Rp", "rupiah"),
                ("$", "dolar"),
                ("€", "euro"),
                ("£", "pound"),
                ("¥", "yen"),
            ],
        }
    }

    /// Pick a locale from a BCP-47 language tag
    #[must_use]
    pub fn for_language(tag: &str) -> Self {
        if tag.to_ascii_lowercase().starts_with("id") {
            Self::indonesian()
        } else {
            Self::english()
        }
    }

    fn currency_word(&self, symbol: &str) -> Option<&'static str> {
        self.currencies
            .iter()
            .find(|(sym, _)| *sym == symbol)
            .map(|(_, word)| *word)
    }
}

impl Default for SpokenLocale {
    fn default() -> Self {
        Self::english()
    }
}

/// Sanitizer stage flags plus an optional length cap.
///
/// Pure data; presets are constructed once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeOptions {
    /// Remove reasoning spans and leaked reasoning lines
    pub strip_reasoning: bool,
    /// Strip markdown syntax down to plain text
    pub strip_markdown: bool,
    /// Remove emoji and ASCII emoticons
    pub strip_emoji: bool,
    /// Rewrite percent and currency glyphs to spoken words
    pub normalize_numbers: bool,
    /// Collapse punctuation runs and expand informal abbreviations
    pub normalize_punctuation: bool,
    /// Maximum output length in characters (sentence-preserving)
    pub max_chars: Option<usize>,
    /// Spoken number words
    pub locale: SpokenLocale,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            strip_reasoning: true,
            strip_markdown: true,
            strip_emoji: true,
            normalize_numbers: true,
            normalize_punctuation: true,
            max_chars: None,
            locale: SpokenLocale::english(),
        }
    }
}

impl SanitizeOptions {
    /// Preset for speech synthesis: every stage on, length bounded
    #[must_use]
    pub fn speech() -> Self {
        Self {
            max_chars: Some(SPEECH_MAX_CHARS),
            ..Self::default()
        }
    }

    /// Preset for conversation-log storage: markup and emoji stripped,
    /// wording left alone
    #[must_use]
    pub fn transcript() -> Self {
        Self {
            normalize_numbers: false,
            normalize_punctuation: false,
            ..Self::default()
        }
    }

    /// Preset for UI display: markup stripped, emoji kept
    #[must_use]
    pub fn display() -> Self {
        Self {
            strip_emoji: false,
            normalize_numbers: false,
            ..Self::default()
        }
    }

    /// Replace the spoken-number locale
    #[must_use]
    pub fn with_locale(mut self, locale: SpokenLocale) -> Self {
        self.locale = locale;
        self
    }
}

/// Run the sanitization pipeline over `text`.
///
/// Pure and deterministic: the same input and options always produce the
/// same output. Never fails; malformed input degrades to a best-effort
/// cleaned string.
#[must_use]
pub fn sanitize(text: &str, opts: &SanitizeOptions) -> String {
    let mut text = text.to_string();
    if opts.strip_reasoning {
        text = reasoning::strip_reasoning(&text);
    }
    if opts.strip_markdown {
        text = strip_markdown(&text);
    }
    if opts.strip_emoji {
        text = strip_emoji(&text);
    }
    if opts.normalize_numbers {
        text = normalize_numbers(&text, &opts.locale);
    }
    if opts.normalize_punctuation {
        text = normalize_punctuation(&text);
    }
    let mut text = cleanup(&text);
    if let Some(max) = opts.max_chars {
        if text.chars().count() > max {
            text = bound_length(&text, max);
        }
    }
    text
}

/// Whether `text` cleans up to something a synthesizer can be handed.
///
/// Fails on empty results and on results where readable characters (word
/// characters, whitespace, `. , ! ?`) are half or less of the cleaned text.
#[must_use]
pub fn is_speech_suitable(text: &str) -> bool {
    let cleaned = sanitize(text, &SanitizeOptions::default());
    if cleaned.trim().is_empty() {
        return false;
    }
    let total = cleaned.chars().count();
    let readable = cleaned
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '.' | ',' | '!' | '?'))
        .count();
    readable * 2 > total
}

// ---- Markdown ----

static FENCED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").expect("valid regex"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s{0,3}#{1,6}\s+").expect("valid regex"));
static BLOCKQUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*>\s?").expect("valid regex"));
static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[-*+]\s+").expect("valid regex"));
static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+[.)]\s+").expect("valid regex"));
static BOLD_STARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid regex"));
static BOLD_UNDERSCORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__([^_]+)__").expect("valid regex"));
static ITALIC_STAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\n]+)\*").expect("valid regex"));
static ITALIC_UNDERSCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b_([^_\n]+)_\b").expect("valid regex"));
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\n]*)`").expect("valid regex"));

fn strip_markdown(text: &str) -> String {
    let text = FENCED_CODE.replace_all(text, " ");
    let text = LINK.replace_all(&text, "$1");
    let text = HEADING.replace_all(&text, "");
    let text = BLOCKQUOTE.replace_all(&text, "");
    let text = BULLET.replace_all(&text, "");
    let text = NUMBERED.replace_all(&text, "");
    let text = BOLD_STARS.replace_all(&text, "$1");
    let text = BOLD_UNDERSCORES.replace_all(&text, "$1");
    let text = ITALIC_STAR.replace_all(&text, "$1");
    let text = ITALIC_UNDERSCORE.replace_all(&text, "$1");
    INLINE_CODE.replace_all(&text, "$1").into_owned()
}

// ---- Emoji ----

static EMOJI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"[\x{1F000}-\x{1F0FF}\x{1F300}-\x{1F5FF}\x{1F600}-\x{1F64F}",
        r"\x{1F680}-\x{1F6FF}\x{1F700}-\x{1F7FF}\x{1F900}-\x{1F9FF}",
        r"\x{1FA00}-\x{1FAFF}\x{2600}-\x{26FF}\x{2700}-\x{27BF}",
        r"\x{2B00}-\x{2BFF}\x{1F1E6}-\x{1F1FF}\x{FE00}-\x{FE0F}",
        r"\x{200D}\x{20E3}]"
    ))
    .expect("valid regex")
});

/// A whitespace-delimited ASCII emoticon token, e.g. `:)` or `:-(`
static EMOTICON_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[:;=8]'?-?[()\[\]DdPpOoSs/\\|]+$").expect("valid regex"));

fn strip_emoji(text: &str) -> String {
    let text = EMOJI.replace_all(text, " ");
    text.split_whitespace()
        .filter(|token| !EMOTICON_TOKEN.is_match(token))
        .collect::<Vec<_>>()
        .join(" ")
}

// ---- Numbers ----

static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d.,]*)\s*%").expect("valid regex"));
static CURRENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(Rp|\$|€|£|¥)\s?(\d[\d.,]*)").expect("valid regex"));

fn normalize_numbers(text: &str, locale: &SpokenLocale) -> String {
    let text = PERCENT.replace_all(text, format!("$1 {}", locale.percent));
    CURRENCY
        .replace_all(&text, |caps: &regex::Captures<'_>| {
            locale.currency_word(&caps[1]).map_or_else(
                || caps[0].to_string(),
                |word| format!("{} {word}", &caps[2]),
            )
        })
        .into_owned()
}

// ---- Punctuation ----

static BANG_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!{2,}").expect("valid regex"));
static QUESTION_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\?{2,}").expect("valid regex"));
static DOT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.{3,}").expect("valid regex"));
static ABBREVIATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(asap|btw|fyi|gonna|gotta|idk|imho|imo|kinda|pls|plz|tbh|thx|ty|u|ur|wanna)\b")
        .expect("valid regex")
});

fn expand_abbreviation(word: &str) -> &'static str {
    match word.to_ascii_lowercase().as_str() {
        "asap" => "as soon as possible",
        "btw" => "by the way",
        "fyi" => "for your information",
        "gonna" => "going to",
        "gotta" => "got to",
        "idk" => "I don't know",
        "imho" => "in my humble opinion",
        "imo" => "in my opinion",
        "pls" | "plz" => "please",
        "tbh" => "to be honest",
        "thx" => "thanks",
        "ty" => "thank you",
        "u" => "you",
        "ur" => "your",
        "wanna" => "want to",
        _ => "kind of", // "kinda", the only remaining alternation arm
    }
}

fn normalize_punctuation(text: &str) -> String {
    let text = BANG_RUN.replace_all(text, "!");
    let text = QUESTION_RUN.replace_all(&text, "?");
    let text = DOT_RUN.replace_all(&text, "...");
    ABBREVIATION
        .replace_all(&text, |caps: &regex::Captures<'_>| {
            expand_abbreviation(&caps[1])
        })
        .into_owned()
}

// ---- Cleanup ----

static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^()]*\)").expect("valid regex"));
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s<>\[\](){}]+").expect("valid regex"));
static QUOTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[\"“”„«»‘’]").expect("valid regex"));
static UNSAFE_SYMBOLS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#*_~`^<>|\\{}\[\]=+()]").expect("valid regex"));
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

fn cleanup(text: &str) -> String {
    let mut text = text.to_string();
    // innermost-out so nested parentheses collapse fully
    while PARENTHESIZED.is_match(&text) {
        text = PARENTHESIZED.replace_all(&text, " ").into_owned();
    }
    let text = URL.replace_all(&text, " ");
    let text = QUOTES.replace_all(&text, "");
    let text = UNSAFE_SYMBOLS.replace_all(&text, " ");
    WHITESPACE_RUN.replace_all(&text, " ").trim().to_string()
}

// ---- Length bounding ----

/// Bound `text` to at most `max` characters, preferring whole sentences,
/// then whole words, then a hard cut. Sentence and word results carry a
/// trailing period which may exceed `max` by one.
fn bound_length(text: &str, max: usize) -> String {
    let mut out = String::new();
    let mut out_chars = 0usize;

    for sentence in text.split(['.', '!', '?']) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        let sep = usize::from(!out.is_empty());
        let added = sentence.chars().count() + 1;
        if out_chars + sep + added > max {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(sentence);
        out.push('.');
        out_chars += sep + added;
    }
    if !out.is_empty() {
        return out;
    }

    for word in text.split_whitespace() {
        let sep = usize::from(!out.is_empty());
        let added = word.chars().count();
        if out_chars + sep + added > max {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
        out_chars += sep + added;
    }
    if !out.is_empty() {
        out.push('.');
        return out;
    }

    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Pipeline ----

    #[test]
    fn reasoning_markdown_and_emoji_removed() {
        let raw = "<think>planning reply</think>**Halo!** Apa kabar? 😊";
        assert_eq!(sanitize(raw, &SanitizeOptions::default()), "Halo! Apa kabar?");
    }

    #[test]
    fn plain_text_passes_through() {
        let text = "Good morning. How can I help?";
        assert_eq!(sanitize(text, &SanitizeOptions::default()), text);
    }

    #[test]
    fn stages_can_be_disabled() {
        let opts = SanitizeOptions {
            strip_markdown: false,
            ..SanitizeOptions::default()
        };
        let out = sanitize("keep your hat on", &opts);
        assert_eq!(out, "keep your hat on");
    }

    #[test]
    fn idempotent_once_clean() {
        let samples = [
            "Halo! Apa kabar?",
            "The total is 50 percent of the budget.",
            "One sentence. Another one follows.",
            "you and your friend, please",
        ];
        for s in samples {
            let once = sanitize(s, &SanitizeOptions::default());
            let twice = sanitize(&once, &SanitizeOptions::default());
            assert_eq!(once, twice, "not idempotent for {s:?}");
        }
    }

    // ---- Markdown ----

    #[test]
    fn fenced_code_removed_entirely() {
        let out = sanitize("Before ```let x = 1;``` after.", &SanitizeOptions::default());
        assert!(!out.contains("let x"));
        assert!(out.contains("Before"));
        assert!(out.contains("after."));
    }

    #[test]
    fn links_keep_text_drop_url() {
        let out = sanitize(
            "See [the docs](https://example.com/docs) for details.",
            &SanitizeOptions::default(),
        );
        assert_eq!(out, "See the docs for details.");
    }

    #[test]
    fn headings_bullets_and_quotes_unwrapped() {
        let raw = "# Title\n- first item\n2. second item\n> quoted line";
        let out = sanitize(raw, &SanitizeOptions::default());
        assert_eq!(out, "Title first item second item quoted line");
    }

    #[test]
    fn emphasis_unwrapped() {
        let out = sanitize("this is **bold** and *italic* and `code`", &SanitizeOptions::default());
        assert_eq!(out, "this is bold and italic and code");
    }

    // ---- Emoji ----

    #[test]
    fn pictographs_removed() {
        let out = sanitize("Great job 🎉🚀 team", &SanitizeOptions::default());
        assert_eq!(out, "Great job team");
    }

    #[test]
    fn ascii_emoticons_removed() {
        let out = sanitize("Sounds good :) see you :-( later", &SanitizeOptions::default());
        assert_eq!(out, "Sounds good see you later");
    }

    #[test]
    fn display_preset_keeps_emoji() {
        let out = sanitize("Nice 😊", &SanitizeOptions::display());
        assert!(out.contains('😊'));
    }

    // ---- Numbers ----

    #[test]
    fn percent_becomes_word() {
        let out = sanitize("50%", &SanitizeOptions::default());
        assert!(out.contains("percent"));
        assert!(!out.contains('%'));
    }

    #[test]
    fn percent_localized() {
        let opts = SanitizeOptions::default().with_locale(SpokenLocale::indonesian());
        assert!(sanitize("harga naik 10%", &opts).contains("persen"));
    }

    #[test]
    fn currency_prefix_becomes_word() {
        let out = sanitize("that costs $25 today", &SanitizeOptions::default());
        assert_eq!(out, "that costs 25 dollars today");
    }

    #[test]
    fn rupiah_prefix() {
        let opts = SanitizeOptions::default().with_locale(SpokenLocale::indonesian());
        assert!(sanitize("Rp5000 saja", &opts).contains("5000 rupiah"));
    }

    // ---- Punctuation ----

    #[test]
    fn punctuation_runs_collapse() {
        let out = sanitize("Wow!!! Really??? Wait....", &SanitizeOptions::default());
        assert_eq!(out, "Wow! Really? Wait...");
    }

    #[test]
    fn abbreviations_expand_word_boundary_safe() {
        let out = sanitize("thx, u r great btw", &SanitizeOptions::default());
        assert!(out.contains("thanks"));
        assert!(out.contains("you"));
        assert!(out.contains("by the way"));
        // "r" and letters inside words stay put
        assert!(out.contains("great"));
    }

    // ---- Cleanup ----

    #[test]
    fn parenthesized_content_removed() {
        let out = sanitize("The plan (which is secret) works.", &SanitizeOptions::default());
        assert_eq!(out, "The plan works.");
    }

    #[test]
    fn urls_stripped() {
        let out = sanitize("read https://example.com/page now", &SanitizeOptions::default());
        assert_eq!(out, "read now");
    }

    #[test]
    fn quotes_and_unsafe_symbols_dropped() {
        let out = sanitize("\"hello\" a|b c<d", &SanitizeOptions::default());
        assert_eq!(out, "hello a b c d");
    }

    #[test]
    fn whitespace_collapsed() {
        let out = sanitize("one\n\ntwo\t three", &SanitizeOptions::default());
        assert_eq!(out, "one two three");
    }

    // ---- Length bounding ----

    #[test]
    fn whole_sentences_preferred() {
        let opts = SanitizeOptions {
            max_chars: Some(30),
            ..SanitizeOptions::default()
        };
        let out = sanitize("First point here. Second point here. Third point here.", &opts);
        assert_eq!(out, "First point here.");
    }

    #[test]
    fn falls_back_to_words() {
        let opts = SanitizeOptions {
            max_chars: Some(12),
            ..SanitizeOptions::default()
        };
        let out = sanitize("an unbroken stream of words with no stops", &opts);
        assert_eq!(out, "an unbroken.");
    }

    #[test]
    fn hard_truncation_last_resort() {
        let opts = SanitizeOptions {
            max_chars: Some(4),
            ..SanitizeOptions::default()
        };
        let out = sanitize("incomprehensibilities", &opts);
        assert_eq!(out, "inco");
    }

    #[test]
    fn bound_holds_across_limits() {
        let text = "Alpha beta gamma. Delta epsilon zeta eta. Theta iota kappa lambda mu nu.";
        for max in 1..=80 {
            let opts = SanitizeOptions {
                max_chars: Some(max),
                ..SanitizeOptions::default()
            };
            let out = sanitize(text, &opts);
            assert!(
                out.chars().count() <= max + 1,
                "limit {max} produced {} chars: {out:?}",
                out.chars().count()
            );
        }
    }

    // ---- Suitability ----

    #[test]
    fn empty_is_unsuitable() {
        assert!(!is_speech_suitable(""));
        assert!(!is_speech_suitable("   \n  "));
    }

    #[test]
    fn pure_reasoning_is_unsuitable() {
        assert!(!is_speech_suitable("<think>only reasoning</think>"));
    }

    #[test]
    fn garbled_symbols_are_unsuitable() {
        assert!(!is_speech_suitable(";;;;----;;;;----;;;;"));
    }

    #[test]
    fn normal_sentences_are_suitable() {
        assert!(is_speech_suitable("This reads just fine, thanks."));
        assert!(is_speech_suitable("Halo! Apa kabar?"));
    }
}
