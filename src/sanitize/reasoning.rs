//! Reasoning-span stripping
//!
//! Local reasoning models leak their internal "thinking" into the response,
//! either wrapped in `<think>`/`<thinking>` marker pairs or as bare prose
//! lines. The marker handling is exact; the line-level checks are tuned
//! pattern matches and live here so they can be swapped without touching
//! the rest of the pipeline.

use std::sync::LazyLock;

use regex::Regex;

static OPEN_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<think(?:ing)?>").expect("valid regex"));

static CLOSE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</think(?:ing)?>").expect("valid regex"));

/// A balanced span: start marker to the nearest following end marker,
/// spanning newlines
static SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think(?:ing)?>.*?</think(?:ing)?>").expect("valid regex"));

/// An unterminated span: start marker with no end marker before end of text
static TRAILING_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think(?:ing)?>.*\z").expect("valid regex"));

/// Lines that read like leaked reasoning prose
static LEAK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:think(?:ing)?\b|okay,.*\blet me\b|i need to\b|first,.*\bthen\b)")
        .expect("valid regex")
});

/// Remove reasoning spans and leaked reasoning lines from `text`.
///
/// Balanced marker pairs are removed with their content; an unmatched start
/// marker removes everything from the marker to the end of the text.
#[must_use]
pub fn strip_reasoning(text: &str) -> String {
    let text = SPAN.replace_all(text, " ");
    let text = TRAILING_SPAN.replace_all(&text, "");
    // a stray end marker with no opener is still markup
    let text = CLOSE_MARKER.replace_all(&text, " ");
    text.lines()
        .filter(|line| !LEAK_LINE.is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Count of reasoning start markers in `text`
#[must_use]
pub fn open_marker_count(text: &str) -> usize {
    OPEN_MARKER.find_iter(text).count()
}

/// Count of reasoning end markers in `text`
#[must_use]
pub fn close_marker_count(text: &str) -> usize {
    CLOSE_MARKER.find_iter(text).count()
}

/// Whether `text` contains more start markers than end markers
#[must_use]
pub fn has_unterminated_span(text: &str) -> bool {
    open_marker_count(text) > close_marker_count(text)
}

/// Cut `text` at the last unmatched start marker.
///
/// Returns the input unchanged when marker counts balance. Interior
/// unmatched markers are left for [`strip_reasoning`] to consume.
#[must_use]
pub fn truncate_unterminated(text: &str) -> &str {
    if !has_unterminated_span(text) {
        return text;
    }
    OPEN_MARKER
        .find_iter(text)
        .last()
        .map_or(text, |m| &text[..m.start()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_span_removed_with_content() {
        let out = strip_reasoning("<think>secret plan</think>Hello there.");
        assert!(!out.contains("secret plan"));
        assert!(out.contains("Hello there."));
    }

    #[test]
    fn span_crosses_newlines() {
        let out = strip_reasoning("<think>line one\nline two</think>Done.");
        assert!(!out.contains("line one"));
        assert_eq!(out.trim(), "Done.");
    }

    #[test]
    fn markers_are_case_insensitive() {
        let out = strip_reasoning("<THINK>loud</THINK>quiet");
        assert!(!out.contains("loud"));
        assert!(out.contains("quiet"));
    }

    #[test]
    fn thinking_variant_recognized() {
        let out = strip_reasoning("<thinking>hmm</thinking>Sure.");
        assert_eq!(out.trim(), "Sure.");
    }

    #[test]
    fn unterminated_span_removes_to_end() {
        let out = strip_reasoning("Before. <think>never closed and on it goes");
        assert_eq!(out.trim(), "Before.");
    }

    #[test]
    fn only_unterminated_span_yields_empty() {
        let out = strip_reasoning("<think>only reasoning here");
        assert!(out.trim().is_empty());
    }

    #[test]
    fn leak_lines_filtered() {
        let text = "Okay, so let me work through this.\nI need to check the date.\nThe answer is four.";
        let out = strip_reasoning(text);
        assert_eq!(out.trim(), "The answer is four.");
    }

    #[test]
    fn plain_text_untouched() {
        let text = "Nothing suspicious here.\nJust two lines.";
        assert_eq!(strip_reasoning(text), text);
    }

    #[test]
    fn stray_close_marker_removed() {
        let out = strip_reasoning("</think>answer text");
        assert_eq!(out.trim(), "answer text");
    }

    #[test]
    fn marker_counting() {
        let raw = "<think>a</think><think>b<think>c";
        assert_eq!(open_marker_count(raw), 3);
        assert_eq!(close_marker_count(raw), 1);
        assert!(has_unterminated_span(raw));
    }

    #[test]
    fn truncate_cuts_at_last_unmatched_marker() {
        let raw = "Hello. <think>dangling";
        assert_eq!(truncate_unterminated(raw), "Hello. ");
    }

    #[test]
    fn truncate_leaves_balanced_text() {
        let raw = "<think>a</think> fine";
        assert_eq!(truncate_unterminated(raw), raw);
    }
}
