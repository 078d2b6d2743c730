//! Mention detection for `@path` tokens typed into the chat input.
//!
//! Everything in this module is pure: results depend only on the text and
//! cursor handed in, so callers recompute on every keystroke and every cursor
//! movement.
//!
//! # Mention Syntax
//!
//! - An active mention is the span from the nearest `@` before the cursor up
//!   to the cursor, provided it contains no whitespace and no other `@`.
//! - A committed mention token is `@` followed by path characters
//!   (`A-Z a-z 0-9 _ - . /`).
//!
//! # Examples
//!
//! ```
//! use atchat::mention::detect;
//!
//! let state = detect("hello @fo", 9);
//! assert!(state.active);
//! assert_eq!(state.query, "fo");
//! assert_eq!(state.anchor_index, 6);
//! ```

use regex::Regex;
use std::sync::OnceLock;

/// Result of running the detector over `(text, cursor)`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MentionState {
    /// Whether the cursor sits inside an open `@query` span
    pub active: bool,
    /// Text between the anchor `@` and the cursor (empty when inactive)
    pub query: String,
    /// Byte index of the anchor `@` (0 when inactive)
    pub anchor_index: usize,
}

impl MentionState {
    /// The detector's "no mention" answer
    pub fn inactive() -> Self {
        Self::default()
    }
}

/// A `@token` occurrence found in free text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionToken<'a> {
    /// Token text without the leading `@`
    pub path: &'a str,
    /// Byte index of the `@`
    pub start: usize,
}

/// Detect whether the cursor is inside an active `@query` span
///
/// `cursor` is a byte offset; it is clamped to the text length and moved back
/// to the nearest char boundary.
///
/// # Examples
///
/// ```
/// use atchat::mention::detect;
///
/// assert!(detect("hello @fo bar", 9).active);
/// assert!(!detect("hello @fo bar", 13).active);
/// assert!(!detect("no mention here", 5).active);
/// ```
pub fn detect(text: &str, cursor: usize) -> MentionState {
    let cursor = clamp_cursor(text, cursor);
    let before = &text[..cursor];

    let Some(anchor) = before.rfind('@') else {
        return MentionState::inactive();
    };

    let query = &before[anchor + 1..];
    if query.chars().any(|c| c.is_whitespace() || c == '@') {
        return MentionState::inactive();
    }

    MentionState {
        active: true,
        query: query.to_string(),
        anchor_index: anchor,
    }
}

/// Replace the active `@query` span with `@<relative_path> `
///
/// Returns the new text and the cursor position right after the inserted
/// trailing space, or `None` when there is no `@` before the cursor.
///
/// # Examples
///
/// ```
/// use atchat::mention::insert_selection;
///
/// let (text, cursor) = insert_selection("see @ma please", 7, "src/main.rs").unwrap();
/// assert_eq!(text, "see @src/main.rs  please");
/// assert_eq!(cursor, 17);
/// ```
pub fn insert_selection(text: &str, cursor: usize, relative_path: &str) -> Option<(String, usize)> {
    let cursor = clamp_cursor(text, cursor);
    let anchor = text[..cursor].rfind('@')?;

    let mut updated = String::with_capacity(text.len() + relative_path.len() + 1);
    updated.push_str(&text[..=anchor]);
    updated.push_str(relative_path);
    updated.push(' ');
    let new_cursor = updated.len();
    updated.push_str(&text[cursor..]);

    Some((updated, new_cursor))
}

/// Characters allowed inside a mention token
pub fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/')
}

/// True when `rest` (the text right after a token) does not continue it
///
/// A run of `.` followed by a non-token character or the end of the text is
/// sentence punctuation rather than part of the path, matching the dots
/// [`mention_tokens`] trims.
pub fn is_token_boundary(rest: &str) -> bool {
    rest.trim_start_matches('.')
        .chars()
        .next()
        .map_or(true, |c| !is_token_char(c))
}

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"@([A-Za-z0-9_\-./]+)").expect("static regex is valid"))
}

/// Extract every `@token` in `text`, in order of appearance
///
/// Trailing dots are treated as punctuation and left out of the token.
///
/// # Examples
///
/// ```
/// use atchat::mention::mention_tokens;
///
/// let tokens = mention_tokens("check @src/main.rs and @README.md.");
/// let paths: Vec<_> = tokens.iter().map(|t| t.path).collect();
/// assert_eq!(paths, vec!["src/main.rs", "README.md"]);
/// ```
pub fn mention_tokens(text: &str) -> Vec<MentionToken<'_>> {
    token_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let path = caps.get(1)?.as_str().trim_end_matches('.');
            if path.is_empty() {
                return None;
            }
            Some(MentionToken {
                path,
                start: whole.start(),
            })
        })
        .collect()
}

/// Filter candidate relative paths by the active query
///
/// Matching is a case-insensitive substring test; an empty query keeps
/// everything. Input order is preserved.
pub fn filter_candidates<'a, I>(candidates: I, query: &str) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    if query.is_empty() {
        return candidates.into_iter().collect();
    }
    let needle = query.to_lowercase();
    candidates
        .into_iter()
        .filter(|c| c.to_lowercase().contains(&needle))
        .collect()
}

/// Split a path into `(file name, parent folder)` for display
///
/// Backslashes are normalized to forward slashes first.
pub fn split_file_path(path: &str) -> (String, String) {
    let normalized = path.replace('\\', "/");
    match normalized.rsplit_once('/') {
        Some((folder, name)) => (name.to_string(), folder.to_string()),
        None => (normalized, String::new()),
    }
}

fn clamp_cursor(text: &str, cursor: usize) -> usize {
    let mut cursor = cursor.min(text.len());
    while !text.is_char_boundary(cursor) {
        cursor -= 1;
    }
    cursor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_active_at_end_of_query() {
        let state = detect("hello @fo", 9);
        assert_eq!(
            state,
            MentionState {
                active: true,
                query: "fo".to_string(),
                anchor_index: 6,
            }
        );
    }

    #[test]
    fn test_detect_active_with_trailing_text_after_cursor() {
        let state = detect("hello @fo bar", 9);
        assert!(state.active);
        assert_eq!(state.query, "fo");
    }

    #[test]
    fn test_detect_inactive_after_whitespace() {
        assert!(!detect("hello @fo bar", 13).active);
    }

    #[test]
    fn test_detect_inactive_without_at() {
        assert_eq!(detect("hello world", 5), MentionState::inactive());
    }

    #[test]
    fn test_detect_bare_at_has_empty_query() {
        let state = detect("@", 1);
        assert!(state.active);
        assert_eq!(state.query, "");
        assert_eq!(state.anchor_index, 0);
    }

    #[test]
    fn test_detect_uses_nearest_preceding_at() {
        let state = detect("@one.rs and @tw", 15);
        assert!(state.active);
        assert_eq!(state.query, "tw");
        assert_eq!(state.anchor_index, 12);
    }

    #[test]
    fn test_detect_closed_by_second_at() {
        // cursor sits right after "@a@"; the nearest @ is the second one
        let state = detect("@a@b", 4);
        assert_eq!(state.anchor_index, 2);
        assert_eq!(state.query, "b");
    }

    #[test]
    fn test_detect_completed_mention_is_inactive() {
        assert!(!detect("@src/main.rs ", 13).active);
    }

    #[test]
    fn test_detect_cursor_before_at_is_inactive() {
        assert!(!detect("hi @there", 2).active);
    }

    #[test]
    fn test_detect_cursor_beyond_text_is_clamped() {
        let state = detect("@ab", 99);
        assert!(state.active);
        assert_eq!(state.query, "ab");
    }

    #[test]
    fn test_detect_cursor_inside_multibyte_char_is_floored() {
        // "é" is two bytes; cursor 2 falls inside it
        let state = detect("@é", 2);
        assert!(state.active);
        assert_eq!(state.query, "");
    }

    #[test]
    fn test_detect_is_deterministic() {
        let inputs = [("a @b c", 4), ("@x", 2), ("none", 2), ("@a b", 4)];
        for (text, cursor) in inputs {
            assert_eq!(detect(text, cursor), detect(text, cursor));
        }
    }

    #[test]
    fn test_insert_selection_replaces_query() {
        let (text, cursor) = insert_selection("look at @ma", 11, "src/main.rs").unwrap();
        assert_eq!(text, "look at @src/main.rs ");
        assert_eq!(cursor, text.len());
        assert!(!detect(&text, cursor).active);
    }

    #[test]
    fn test_insert_selection_keeps_text_after_cursor() {
        let (text, cursor) = insert_selection("@r tail", 2, "README.md").unwrap();
        assert_eq!(text, "@README.md  tail");
        assert_eq!(&text[cursor..], " tail");
    }

    #[test]
    fn test_insert_selection_without_at_is_none() {
        assert!(insert_selection("plain", 3, "a.rs").is_none());
    }

    #[test]
    fn test_token_boundary_rules() {
        assert!(is_token_boundary(""));
        assert!(is_token_boundary(" and"));
        assert!(is_token_boundary(", then"));
        assert!(is_token_boundary("."));
        assert!(is_token_boundary(". Next"));
        assert!(is_token_boundary("..."));
        assert!(is_token_boundary("... right?"));
        assert!(is_token_boundary("?"));
        assert!(is_token_boundary(")"));
        assert!(!is_token_boundary(".bak"));
        assert!(!is_token_boundary("...bak"));
        assert!(!is_token_boundary("x"));
        assert!(!is_token_boundary("/more"));
    }

    #[test]
    fn test_mention_tokens_positions() {
        let tokens = mention_tokens("a @x.rs b @dir/y.ts");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], MentionToken { path: "x.rs", start: 2 });
        assert_eq!(tokens[1].path, "dir/y.ts");
        assert_eq!(tokens[1].start, 10);
    }

    #[test]
    fn test_mention_tokens_ignores_bare_at() {
        assert!(mention_tokens("mail me @ home").is_empty());
        assert!(mention_tokens("@.").is_empty());
    }

    #[test]
    fn test_filter_candidates_case_insensitive() {
        let files = ["src/Main.rs", "README.md", "docs/main.md"];
        let hits = filter_candidates(files.iter().copied(), "MAIN");
        assert_eq!(hits, vec!["src/Main.rs", "docs/main.md"]);
    }

    #[test]
    fn test_filter_candidates_empty_query_keeps_all() {
        let files = ["b", "a"];
        assert_eq!(filter_candidates(files.iter().copied(), ""), vec!["b", "a"]);
    }

    #[test]
    fn test_split_file_path() {
        assert_eq!(
            split_file_path("src/tools/mod.rs"),
            ("mod.rs".to_string(), "src/tools".to_string())
        );
        assert_eq!(
            split_file_path("README.md"),
            ("README.md".to_string(), String::new())
        );
        assert_eq!(
            split_file_path("src\\win\\a.rs"),
            ("a.rs".to_string(), "src/win".to_string())
        );
    }
}
