//! Attachment registry for the message being composed
//!
//! The registry remembers every mention committed while the current message
//! is composed, keyed by relative path. Membership is sticky: deleting the
//! token text does not remove the entry. At submit time only entries whose
//! `@token` still appears in the input are attached. An explicit
//! [`AttachmentRegistry::remove`] also keeps the typed token from being
//! committed again until the next [`AttachmentRegistry::clear`].

use crate::mention::{is_token_boundary, mention_tokens};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;

/// Outcome of [`AttachmentRegistry::resolve_for_submit`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmitResolution {
    /// Input with every attached `@token` removed
    pub cleaned_text: String,
    /// Absolute paths to read, in order of first appearance in the input
    pub absolute_paths: Vec<PathBuf>,
}

impl SubmitResolution {
    /// Whether any file will be attached
    pub fn has_attachments(&self) -> bool {
        !self.absolute_paths.is_empty()
    }
}

/// Committed mentions: relative path to absolute path
///
/// # Examples
///
/// ```
/// use atchat::attachments::AttachmentRegistry;
///
/// let mut registry = AttachmentRegistry::new();
/// registry.commit("src/main.rs", "/work/src/main.rs");
///
/// let resolution = registry.resolve_for_submit("explain @src/main.rs please");
/// assert_eq!(resolution.cleaned_text, "explain please");
/// assert_eq!(resolution.absolute_paths.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AttachmentRegistry {
    entries: BTreeMap<String, PathBuf>,
    removed: BTreeSet<String>,
}

impl AttachmentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a mention; a later commit for the same relative path wins
    pub fn commit(&mut self, relative_path: impl Into<String>, absolute_path: impl Into<PathBuf>) {
        let relative_path = relative_path.into();
        let absolute_path = absolute_path.into();
        tracing::debug!(relative = %relative_path, "Committing attachment");
        self.removed.remove(&relative_path);
        self.entries.insert(relative_path, absolute_path);
    }

    /// Commit every typed `@token` that `lookup` can resolve
    ///
    /// Tokens already committed, or explicitly removed, are left alone.
    /// Returns how many new entries were added.
    pub fn commit_typed<F>(&mut self, input: &str, lookup: F) -> usize
    where
        F: Fn(&str) -> Option<PathBuf>,
    {
        let mut added = 0;
        for token in mention_tokens(input) {
            if self.entries.contains_key(token.path) || self.removed.contains(token.path) {
                continue;
            }
            if let Some(absolute) = lookup(token.path) {
                self.commit(token.path, absolute);
                added += 1;
            }
        }
        added
    }

    /// Remove a committed mention
    pub fn remove(&mut self, relative_path: &str) -> Option<PathBuf> {
        tracing::debug!(relative = relative_path, "Removing attachment");
        self.removed.insert(relative_path.to_string());
        self.entries.remove(relative_path)
    }

    /// Absolute path committed for `relative_path`
    pub fn get(&self, relative_path: &str) -> Option<&PathBuf> {
        self.entries.get(relative_path)
    }

    /// Iterate committed mentions in relative-path order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PathBuf)> {
        self.entries.iter()
    }

    /// Number of committed mentions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is committed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget everything; called once a message has been submitted
    pub fn clear(&mut self) {
        self.entries.clear();
        self.removed.clear();
    }

    /// Strip attached tokens from `input` and collect their absolute paths
    ///
    /// Every occurrence of every committed `@relativePath` is removed. Entries
    /// whose token no longer appears are skipped silently. When nothing is
    /// removed the input is returned unchanged.
    pub fn resolve_for_submit(&self, input: &str) -> SubmitResolution {
        let mut spans: Vec<(usize, usize, &str)> = Vec::new();
        for relative in self.entries.keys() {
            let needle = format!("@{}", relative);
            for (start, _) in input.match_indices(&needle) {
                let end = start + needle.len();
                if is_token_boundary(&input[end..]) {
                    spans.push((start, end, relative.as_str()));
                }
            }
        }

        if spans.is_empty() {
            return SubmitResolution {
                cleaned_text: input.to_string(),
                absolute_paths: Vec::new(),
            };
        }

        // earliest first, longest first at the same start
        spans.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let mut cleaned = String::with_capacity(input.len());
        let mut absolute_paths = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = 0;

        for (start, end, relative) in spans {
            if start < cursor {
                continue;
            }
            cleaned.push_str(&input[cursor..start]);

            let mut resume = end;
            let after_space = cleaned.chars().last().map_or(true, char::is_whitespace);
            if after_space {
                if let Some(c @ (' ' | '\t')) = input[end..].chars().next() {
                    resume += c.len_utf8();
                }
            }
            cursor = resume;

            if seen.insert(relative) {
                if let Some(absolute) = self.entries.get(relative) {
                    absolute_paths.push(absolute.clone());
                }
            }
        }
        cleaned.push_str(&input[cursor..]);

        SubmitResolution {
            cleaned_text: cleaned.trim().to_string(),
            absolute_paths,
        }
    }
}
