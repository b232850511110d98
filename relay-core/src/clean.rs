//! Chat reply cleaning.
//!
//! The chat upstream decorates replies with an HTML prefix span and loose
//! markdown. Cleaning strips the span and normalises the text according to
//! the requested mode. Cleaning is total: any input produces some output
//! without panicking.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// `<span class="...-prefix">label</span>:` decorations inserted by the
/// chat upstream ahead of the actual reply.
static PREFIX_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<span class="[^"]*-prefix">[^<]*</span>:"#).expect("prefix span regex")
});

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```.*?```").expect("fenced block regex")
});

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+").expect("whitespace run regex")
});

static TRAILING_LINE_SPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)[ \t]+$").expect("trailing space regex")
});

static HEADING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(#+ .*)").expect("heading regex")
});

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\n|^)(\d+\.|-|\*) +").expect("list marker regex")
});

static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n{3,}").expect("blank run regex")
});

/// How aggressively to normalise a chat reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum CleanMode {
    /// Strip the prefix span and trim.
    Minimal,
    /// Strip, drop trailing whitespace on every line, trim.
    Medium,
    /// Strip, remove fenced code blocks, collapse all whitespace runs.
    Strict,
    /// Strip and reflow markdown: headings and fences on their own lines,
    /// list markers normalised, blank runs collapsed. The default.
    #[default]
    Pretty,
}

impl FromStr for CleanMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "medium" => Ok(Self::Medium),
            "strict" => Ok(Self::Strict),
            "pretty" => Ok(Self::Pretty),
            other => Err(CoreError::UnknownCleanMode { value: other.to_owned() }),
        }
    }
}

/// Clean a raw chat reply according to `mode`.
#[must_use]
pub fn clean_text(input: &str, mode: CleanMode) -> String {
    let stripped = PREFIX_SPAN.replace_all(input, "");

    match mode {
        CleanMode::Minimal => stripped.trim().to_owned(),
        CleanMode::Medium => TRAILING_LINE_SPACE.replace_all(&stripped, "").trim().to_owned(),
        CleanMode::Strict => {
            let no_fences = FENCED_BLOCK.replace_all(&stripped, "");
            WHITESPACE_RUN.replace_all(&no_fences, " ").trim().to_owned()
        }
        CleanMode::Pretty => {
            let headings = HEADING_LINE.replace_all(&stripped, "\n$1\n");
            let lists = LIST_MARKER.replace_all(&headings, "\n$2 ");
            let fences = lists.replace("```", "\n```\n");
            BLANK_RUN.replace_all(&fences, "\n\n").trim().to_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_span_is_stripped_in_every_mode() {
        let input = r#"<span class="bot-prefix">Bot</span>: hello there"#;
        for mode in [CleanMode::Minimal, CleanMode::Medium, CleanMode::Strict, CleanMode::Pretty] {
            let out = clean_text(input, mode);
            assert!(
                !out.contains("prefix"),
                "mode {mode:?} must strip the prefix span, got: {out}"
            );
            assert!(out.contains("hello there"), "reply text must survive: {out}");
        }
    }

    #[test]
    fn minimal_trims_only() {
        let out = clean_text("  keep   inner   spacing  ", CleanMode::Minimal);
        assert_eq!(out, "keep   inner   spacing");
    }

    #[test]
    fn medium_drops_trailing_line_whitespace() {
        let out = clean_text("line one   \nline two\t\n", CleanMode::Medium);
        assert_eq!(out, "line one\nline two");
    }

    #[test]
    fn strict_removes_fenced_blocks_and_collapses_whitespace() {
        let input = "before\n```rust\nlet x = 1;\n```\nafter   words";
        let out = clean_text(input, CleanMode::Strict);
        assert_eq!(out, "before after words");
        assert!(!out.contains("let x"), "fenced code must be removed");
    }

    #[test]
    fn pretty_collapses_blank_runs() {
        let out = clean_text("a\n\n\n\n\nb", CleanMode::Pretty);
        assert_eq!(out, "a\n\nb");
    }

    #[test]
    fn pretty_puts_headings_on_their_own_lines() {
        let out = clean_text("intro ## Section body", CleanMode::Pretty);
        assert!(
            out.contains("\n## Section body"),
            "heading must start on its own line, got: {out}"
        );
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("STRICT".parse::<CleanMode>().ok(), Some(CleanMode::Strict));
        assert_eq!(" pretty ".parse::<CleanMode>().ok(), Some(CleanMode::Pretty));
        assert!(matches!(
            "shiny".parse::<CleanMode>(),
            Err(CoreError::UnknownCleanMode { .. })
        ));
    }

    #[test]
    fn default_mode_is_pretty() {
        assert_eq!(CleanMode::default(), CleanMode::Pretty);
    }

    proptest::proptest! {
        #[test]
        fn proptest_clean_never_panics(input in "\\PC{0,256}") {
            for mode in [CleanMode::Minimal, CleanMode::Medium, CleanMode::Strict, CleanMode::Pretty] {
                let out = clean_text(&input, mode);
                proptest::prop_assert!(!out.starts_with(' '), "output must be trimmed");
                proptest::prop_assert!(!out.ends_with(' '), "output must be trimmed");
            }
        }

        #[test]
        fn proptest_minimal_is_idempotent(input in "\\PC{0,128}") {
            let once = clean_text(&input, CleanMode::Minimal);
            let twice = clean_text(&once, CleanMode::Minimal);
            proptest::prop_assert_eq!(once, twice, "minimal cleaning must be idempotent");
        }
    }
}
