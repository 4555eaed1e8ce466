//! # memo-privacy
//!
//! Strips `<private>…</private>` spans from text before it is embedded or
//! stored. Case-insensitive, spans may cross newlines, and stripping is
//! idempotent (the output contains no private spans). Each removed span is
//! replaced by the newlines it contained, so line numbering is preserved —
//! imported chunk spans keep pointing at the right file lines. A text that
//! loses everything to stripping is rejected as fully private.

use std::sync::LazyLock;

use regex::Regex;

use memo_core::{MemoError, MemoResult};

static PRIVATE_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<private>.*?</private>").expect("private-span pattern compiles")
});

/// Result of a strip pass.
#[derive(Debug, Clone, PartialEq)]
pub struct StrippedText {
    pub text: String,
    /// Number of spans removed.
    pub redactions: usize,
}

/// Remove private spans, keeping the newlines they contained so every
/// surviving character stays on its original line.
pub fn strip(text: &str) -> StrippedText {
    let mut redactions = 0;
    let stripped = PRIVATE_SPAN.replace_all(text, |caps: &regex::Captures<'_>| {
        redactions += 1;
        caps[0].chars().filter(|&c| c == '\n').collect::<String>()
    });
    StrippedText {
        text: stripped.into_owned(),
        redactions,
    }
}

/// Strip and reject when nothing survives.
pub fn strip_for_storage(text: &str) -> MemoResult<StrippedText> {
    let out = strip(text);
    if out.text.trim().is_empty() {
        return Err(MemoError::FullyPrivate);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_without_tags() {
        let s = strip("nothing secret here");
        assert_eq!(s.text, "nothing secret here");
        assert_eq!(s.redactions, 0);
    }

    #[test]
    fn removes_inline_span() {
        let s = strip("keep <private>secret</private> this");
        assert_eq!(s.text, "keep  this");
        assert_eq!(s.redactions, 1);
    }

    #[test]
    fn case_insensitive_and_line_preserving() {
        let s = strip("a\n<PRIVATE>line one\nline two</Private>\nb");
        // The span held one newline; line count is unchanged.
        assert_eq!(s.text, "a\n\n\nb");
        assert_eq!(s.text.lines().count(), 4);
        assert_eq!(s.redactions, 1);
    }

    #[test]
    fn multiple_spans() {
        let s = strip("<private>a</private>x<private>b</private>");
        assert_eq!(s.text, "x");
        assert_eq!(s.redactions, 2);
    }

    #[test]
    fn stripping_is_idempotent() {
        let once = strip("k <private>s</private> v");
        let twice = strip(&once.text);
        assert_eq!(twice.text, once.text);
        assert_eq!(twice.redactions, 0);
    }

    #[test]
    fn fully_private_is_rejected() {
        let err = strip_for_storage("<private>everything</private>").unwrap_err();
        assert!(matches!(err, MemoError::FullyPrivate));
    }

    #[test]
    fn fully_private_across_lines_is_rejected() {
        let err = strip_for_storage("<private>a\nb\nc</private>").unwrap_err();
        assert!(matches!(err, MemoError::FullyPrivate));
    }

    #[test]
    fn unclosed_tag_is_left_alone() {
        let s = strip("text with <private> but no close");
        assert_eq!(s.text, "text with <private> but no close");
    }

    #[test]
    fn surviving_lines_keep_their_numbers() {
        let text = "line1\n<private>gone\ngone too</private>\nline4 survives";
        let s = strip(text);
        let lines: Vec<&str> = s.text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "line1");
        assert_eq!(lines[3], "line4 survives");
    }
}
