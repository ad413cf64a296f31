//! Raw response validation
//!
//! Heuristics over raw model output: unterminated reasoning markup, wrong
//! script leakage, and apparent truncation. All checks are independent and
//! any number may fire on the same response. Validation never fails; it
//! always yields a best-effort cleaned string plus issue flags.

use std::sync::LazyLock;

use regex::Regex;

use crate::sanitize::{self, SanitizeOptions, SpokenLocale, reasoning};

/// Minimum raw length before the truncation heuristic applies
pub const TRUNCATION_MIN_CHARS: usize = 50;

/// Fixed reply used when cleanup leaves nothing speakable
pub const CLARIFICATION_FALLBACK: &str =
    "Sorry, I did not catch that. Could you say it again?";

/// A problem detected in raw model output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// More reasoning start markers than end markers
    UnterminatedReasoning,
    /// Characters from a script the target language does not use
    ForeignScript,
    /// Long response that stops mid-sentence with unbalanced markers
    Truncated,
}

/// Outcome of validating one raw response
#[derive(Debug, Clone)]
pub struct Validation {
    /// No issues were detected
    pub complete: bool,
    /// Best-effort cleaned text, never empty
    pub cleaned: String,
    /// Detected issues in detection order
    pub issues: Vec<IssueKind>,
}

impl Validation {
    /// Whether a specific issue was detected
    #[must_use]
    pub fn has(&self, kind: IssueKind) -> bool {
        self.issues.contains(&kind)
    }

    /// Whether the retry controller should fire: malformed markup or
    /// wrong-language leakage, but never truncation alone
    #[must_use]
    pub fn needs_retry(&self) -> bool {
        self.has(IssueKind::UnterminatedReasoning) || self.has(IssueKind::ForeignScript)
    }
}

static CJK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{Han}\p{Hiragana}\p{Katakana}\p{Hangul}]").expect("valid regex")
});

/// A bare role-prefix artifact left behind after cleanup
static ROLE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(assistant|ai|bot|system)\s*:?$").expect("valid regex"));

fn expects_cjk(language: &str) -> bool {
    let lang = language.to_ascii_lowercase();
    ["zh", "ja", "ko"].iter().any(|p| lang.starts_with(p))
}

fn ends_sentence_final(text: &str) -> bool {
    text.trim_end()
        .chars()
        .next_back()
        .is_some_and(|c| matches!(c, '.' | '!' | '?'))
}

/// Validate one raw model response for the given target language tag.
///
/// Detection runs on the raw text; cleanup truncates at the last unmatched
/// reasoning marker (when present) before sanitizing, and substitutes the
/// clarification fallback when nothing speakable remains.
#[must_use]
pub fn validate(raw: &str, language: &str) -> Validation {
    let mut issues = Vec::new();

    let opens = reasoning::open_marker_count(raw);
    let closes = reasoning::close_marker_count(raw);
    if opens > closes {
        issues.push(IssueKind::UnterminatedReasoning);
    }

    if !expects_cjk(language) && CJK.is_match(raw) {
        issues.push(IssueKind::ForeignScript);
    }

    let trimmed = raw.trim();
    if trimmed.chars().count() > TRUNCATION_MIN_CHARS
        && !ends_sentence_final(trimmed)
        && opens != closes
    {
        issues.push(IssueKind::Truncated);
    }

    let pre = if opens > closes {
        reasoning::truncate_unterminated(raw)
    } else {
        raw
    };
    let opts = SanitizeOptions::default().with_locale(SpokenLocale::for_language(language));
    let mut cleaned = sanitize::sanitize(pre, &opts);
    if cleaned.is_empty() || ROLE_PREFIX.is_match(&cleaned) {
        cleaned = CLARIFICATION_FALLBACK.to_string();
    }

    Validation {
        complete: issues.is_empty(),
        cleaned,
        issues,
    }
}
