//! Composition state machine
//!
//! [`Composer`] owns the input being typed, the mention dropdown and the
//! attachment registry for the message under composition. It is
//! synchronous and performs no I/O: when a search is needed it hands the
//! query back to the caller, who routes it through the debounced
//! [`WorkspaceIndex`](crate::index::WorkspaceIndex) and later feeds the
//! results in with [`Composer::apply_candidates`].
//!
//! ```text
//! Idle --@query--> MentionActive --search issued--> CandidatesLoading
//!   ^                                                     |
//!   |                                              results applied
//!   |                                                     v
//!   +------------ Enter (commit) / Escape ------- CandidatesReady
//! ```

use crate::attachments::AttachmentRegistry;
use crate::mention::{self, MentionState};
use crate::workspace::WorkspaceFiles;
use std::path::Path;

/// Where the composer is in one composition cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComposerState {
    /// No open mention; dropdown hidden
    #[default]
    Idle,
    /// The cursor sits inside an `@query` span; a search is due
    MentionActive,
    /// A search for the current query has been requested
    CandidatesLoading,
    /// Results arrived; the dropdown is navigable
    CandidatesReady,
}

/// Keys the dropdown reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    /// Move the highlight up (wraps)
    Up,
    /// Move the highlight down (wraps)
    Down,
    /// Commit the highlighted candidate
    Enter,
    /// Close the dropdown
    Escape,
}

/// Effect of a [`NavKey`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The dropdown was not open, or had nothing to act on
    Ignored,
    /// The highlight moved to this index
    Moved(usize),
    /// This relative path was committed and inserted into the input
    Committed(String),
    /// The dropdown was closed
    Closed,
}

/// Input text, cursor, dropdown and attachment registry of one message
#[derive(Debug, Default)]
pub struct Composer {
    text: String,
    cursor: usize,
    mention: MentionState,
    state: ComposerState,
    requested_query: Option<String>,
    candidates: WorkspaceFiles,
    selected: usize,
    registry: AttachmentRegistry,
}

impl Composer {
    /// Empty composer
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the input and cursor (byte offset), re-running mention detection
    ///
    /// Returns the query to search for when a new `@query` span opened or its
    /// text changed.
    ///
    /// # Examples
    ///
    /// ```
    /// use atchat::composer::{Composer, ComposerState};
    ///
    /// let mut composer = Composer::new();
    /// assert_eq!(composer.set_input("see @ma", 7), Some("ma".to_string()));
    /// assert_eq!(composer.state(), ComposerState::MentionActive);
    /// assert_eq!(composer.set_input("see @ma ", 8), None);
    /// assert_eq!(composer.state(), ComposerState::Idle);
    /// ```
    pub fn set_input(&mut self, text: impl Into<String>, cursor: usize) -> Option<String> {
        self.text = text.into();
        self.cursor = cursor.min(self.text.len());
        self.mention = mention::detect(&self.text, self.cursor);

        if !self.mention.active {
            self.close();
            return None;
        }

        let changed = self.requested_query.as_deref() != Some(self.mention.query.as_str());
        if self.state == ComposerState::Idle || changed {
            self.state = ComposerState::MentionActive;
            self.requested_query = Some(self.mention.query.clone());
            self.selected = 0;
            return Some(self.mention.query.clone());
        }
        None
    }

    /// Record that the search for the current query has been handed off
    pub fn mark_loading(&mut self) {
        if self.state == ComposerState::MentionActive {
            self.state = ComposerState::CandidatesLoading;
        }
    }

    /// Replace the candidate set with a fresh search result
    ///
    /// The highlight resets to the first entry. Candidates are kept even when
    /// the dropdown is closed so typed mentions can still be matched at submit.
    pub fn apply_candidates(&mut self, files: WorkspaceFiles) {
        self.candidates = files;
        self.selected = 0;
        if matches!(
            self.state,
            ComposerState::MentionActive | ComposerState::CandidatesLoading
        ) {
            self.state = ComposerState::CandidatesReady;
        }
    }

    /// Candidates matching the active query, in relative-path order
    pub fn filtered(&self) -> Vec<(&str, &Path)> {
        let query = if self.mention.active {
            self.mention.query.as_str()
        } else {
            ""
        };
        mention::filter_candidates(self.candidates.keys().map(String::as_str), query)
            .into_iter()
            .filter_map(|rel| {
                self.candidates
                    .get(rel)
                    .map(|abs| (rel, abs.as_path()))
            })
            .collect()
    }

    /// Handle a navigation key while the dropdown is open
    ///
    /// While a search is pending the keys act on the previous candidate set.
    /// `Ignored` with [`Composer::dropdown_visible`] still true means the
    /// dropdown is open but empty; hosts must not treat that Enter as submit.
    pub fn on_key(&mut self, key: NavKey) -> KeyOutcome {
        if self.state == ComposerState::Idle {
            return KeyOutcome::Ignored;
        }

        if key == NavKey::Escape {
            self.close();
            return KeyOutcome::Closed;
        }

        // while a refresh is pending, navigate the previous result
        let count = self.filtered().len();
        if count == 0 {
            return KeyOutcome::Ignored;
        }
        if self.selected >= count {
            self.selected = 0;
        }

        match key {
            NavKey::Up => {
                self.selected = (self.selected + count - 1) % count;
                KeyOutcome::Moved(self.selected)
            }
            NavKey::Down => {
                self.selected = (self.selected + 1) % count;
                KeyOutcome::Moved(self.selected)
            }
            NavKey::Enter => {
                let relative = self.filtered()[self.selected].0.to_string();
                if self.select(&relative) {
                    KeyOutcome::Committed(relative)
                } else {
                    KeyOutcome::Ignored
                }
            }
            NavKey::Escape => KeyOutcome::Closed,
        }
    }

    /// Commit `relative_path` from the candidate set (e.g. on click)
    ///
    /// Replaces the active `@query` span with `@<relative_path> `, moves the
    /// cursor after the inserted space, records the attachment and closes the
    /// dropdown. Returns `false` when the path is not a candidate or no `@`
    /// precedes the cursor.
    pub fn select(&mut self, relative_path: &str) -> bool {
        let Some(absolute) = self.candidates.get(relative_path).cloned() else {
            return false;
        };
        let Some((text, cursor)) =
            mention::insert_selection(&self.text, self.cursor, relative_path)
        else {
            return false;
        };

        self.text = text;
        self.cursor = cursor;
        self.mention = mention::detect(&self.text, self.cursor);
        self.registry.commit(relative_path, absolute);
        self.close();
        true
    }

    /// Empty the input after a submit; the registry is left to the caller
    pub fn clear_input(&mut self) {
        self.text.clear();
        self.cursor = 0;
        self.mention = MentionState::inactive();
        self.close();
    }

    fn close(&mut self) {
        self.state = ComposerState::Idle;
        self.requested_query = None;
        self.selected = 0;
    }

    /// Current state
    pub fn state(&self) -> ComposerState {
        self.state
    }

    /// Whether the dropdown should be shown
    pub fn dropdown_visible(&self) -> bool {
        self.state != ComposerState::Idle
    }

    /// Input text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Cursor byte offset
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Latest detector result
    pub fn mention(&self) -> &MentionState {
        &self.mention
    }

    /// Highlighted index into [`Composer::filtered`]
    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// Latest candidate set
    pub fn candidates(&self) -> &WorkspaceFiles {
        &self.candidates
    }

    /// Committed attachments
    pub fn registry(&self) -> &AttachmentRegistry {
        &self.registry
    }

    /// Committed attachments, mutable (explicit remove, typed commits)
    pub fn registry_mut(&mut self) -> &mut AttachmentRegistry {
        &mut self.registry
    }
}
