//! Chat session: one composer, one transcript, at most one pending request
//!
//! [`ChatSession`] drives the full composition cycle:
//!
//! 1. Keystrokes go through [`ChatSession::on_input`]; open mentions
//!    schedule a debounced search.
//! 2. Search results come back on the receiver returned by
//!    [`ChatSession::new`] and are applied with
//!    [`ChatSession::on_search_response`].
//! 3. [`ChatSession::begin_submit`] records the user turn, resolves
//!    attachments, resets the composition and hands back a
//!    [`PendingRequest`] that owns the request slot.
//! 4. The host awaits [`PendingRequest::run`] (possibly on another task) and
//!    passes the result to [`ChatSession::complete`], which appends the
//!    assistant turn and frees the slot.
//!
//! A submit while a request is pending is rejected and leaves the input,
//! registry and transcript untouched.

use crate::composer::{Composer, KeyOutcome, NavKey};
use crate::error::Result;
use crate::index::{SearchResponse, WorkspaceIndex};
use crate::orchestrator::{CompletionClient, Reply, RequestSlot, SlotGuard};
use crate::prompt::{assemble, AttachmentBudget, Truncation};
use crate::transcript::Transcript;
use crate::workspace::FileProvider;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Fallback lookup for typed `@path` tokens that are not search candidates
pub type TypedLookup = Box<dyn Fn(&str) -> Option<PathBuf> + Send + Sync>;

/// Something the user should be told outside the transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// No API key is stored; nothing was sent
    MissingCredential,
    /// An attachment was cut down to fit the budget
    Truncated(Truncation),
}

/// Result of a finished request, as recorded in the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Reply appended to the transcript
    pub reply: Reply,
    /// Out-of-band notifications
    pub notices: Vec<Notice>,
}

/// A submitted message waiting for the endpoint
///
/// Holds the request slot until the matching [`CompletedRequest`] is handed
/// back to [`ChatSession::complete`] (or dropped).
pub struct PendingRequest {
    cleaned_text: String,
    attachments: Vec<PathBuf>,
    files: Arc<dyn FileProvider>,
    client: Arc<dyn CompletionClient>,
    budget: AttachmentBudget,
    guard: SlotGuard,
}

/// A request that has been answered (or failed)
#[derive(Debug)]
pub struct CompletedRequest {
    reply: Reply,
    truncations: Vec<Truncation>,
    _guard: SlotGuard,
}

impl PendingRequest {
    /// Build a request directly from cleaned text and attachment paths
    pub fn new(
        cleaned_text: impl Into<String>,
        attachments: Vec<PathBuf>,
        files: Arc<dyn FileProvider>,
        client: Arc<dyn CompletionClient>,
        budget: AttachmentBudget,
        guard: SlotGuard,
    ) -> Self {
        Self {
            cleaned_text: cleaned_text.into(),
            attachments,
            files,
            client,
            budget,
            guard,
        }
    }

    /// Cleaned text that will head the prompt
    pub fn cleaned_text(&self) -> &str {
        &self.cleaned_text
    }

    /// Absolute paths that will be read, in order
    pub fn attachments(&self) -> &[PathBuf] {
        &self.attachments
    }

    /// Read attachments, assemble the prompt and call the endpoint
    pub async fn run(self) -> CompletedRequest {
        let mut resolved = if self.attachments.is_empty() {
            Vec::new()
        } else {
            self.files.read_files(&self.attachments).await
        };
        let truncations = self.budget.apply(&mut resolved);

        let prompt = assemble(&self.cleaned_text, &resolved);
        tracing::info!(
            attachments = resolved.len(),
            chars = prompt.len(),
            "Submitting prompt"
        );
        let reply = self.client.send(&prompt).await;

        CompletedRequest {
            reply,
            truncations,
            _guard: self.guard,
        }
    }
}

impl CompletedRequest {
    /// Reply that will be appended
    pub fn reply(&self) -> &Reply {
        &self.reply
    }

    /// Attachments cut down by the budget
    pub fn truncations(&self) -> &[Truncation] {
        &self.truncations
    }
}

/// Collaborators a session talks to
pub struct SessionDeps {
    /// Workspace search and file reading
    pub files: Arc<dyn FileProvider>,
    /// Completion endpoint
    pub client: Arc<dyn CompletionClient>,
    /// Quiet window for workspace search
    pub debounce: Duration,
    /// Attachment size limits
    pub budget: AttachmentBudget,
}

/// State of one chat session
pub struct ChatSession {
    composer: Composer,
    index: WorkspaceIndex,
    transcript: Transcript,
    files: Arc<dyn FileProvider>,
    client: Arc<dyn CompletionClient>,
    budget: AttachmentBudget,
    slot: RequestSlot,
    typed_lookup: Option<TypedLookup>,
}

impl ChatSession {
    /// Create a session and the receiver its search results arrive on
    pub fn new(deps: SessionDeps) -> (Self, mpsc::UnboundedReceiver<SearchResponse>) {
        let (index, responses) = WorkspaceIndex::new(Arc::clone(&deps.files), deps.debounce);
        let session = Self {
            composer: Composer::new(),
            index,
            transcript: Transcript::new(),
            files: deps.files,
            client: deps.client,
            budget: deps.budget,
            slot: RequestSlot::new(),
            typed_lookup: None,
        };
        (session, responses)
    }

    /// Resolve typed tokens that are not candidates through `lookup`
    pub fn with_typed_lookup(mut self, lookup: TypedLookup) -> Self {
        self.typed_lookup = Some(lookup);
        self
    }

    /// Input changed or the cursor moved
    ///
    /// Must be called from within a Tokio runtime.
    pub fn on_input(&mut self, text: impl Into<String>, cursor: usize) {
        if let Some(query) = self.composer.set_input(text, cursor) {
            self.index.request(&query);
            self.composer.mark_loading();
        } else if !self.composer.dropdown_visible() {
            self.index.cancel_pending();
        }
    }

    /// Replace the whole input without scheduling a search
    ///
    /// For line-based hosts that hand over a finished message; typed
    /// `@path` tokens are still resolved at submit.
    pub fn set_draft(&mut self, text: impl Into<String>) {
        let text = text.into();
        let cursor = text.len();
        self.composer.set_input(text, cursor);
        self.index.cancel_pending();
    }

    /// Apply a search result; returns `false` for stale responses
    pub fn on_search_response(&mut self, response: SearchResponse) -> bool {
        if !self.index.apply(response) {
            return false;
        }
        self.composer
            .apply_candidates(self.index.candidates().clone());
        true
    }

    /// Dropdown navigation
    pub fn on_key(&mut self, key: NavKey) -> KeyOutcome {
        let outcome = self.composer.on_key(key);
        if matches!(outcome, KeyOutcome::Committed(_) | KeyOutcome::Closed) {
            self.index.cancel_pending();
        }
        outcome
    }

    /// Commit a candidate picked with the mouse
    pub fn select(&mut self, relative_path: &str) -> bool {
        let committed = self.composer.select(relative_path);
        if committed {
            self.index.cancel_pending();
        }
        committed
    }

    /// Drop a committed attachment
    pub fn remove_attachment(&mut self, relative_path: &str) -> Option<PathBuf> {
        self.composer.registry_mut().remove(relative_path)
    }

    /// Start submitting the current input
    ///
    /// Returns `Ok(None)` when the input is blank.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::AtchatError::RequestInFlight`] when a request
    /// is still pending; nothing is changed in that case.
    pub fn begin_submit(&mut self) -> Result<Option<PendingRequest>> {
        let input = self.composer.text().trim().to_string();
        if input.is_empty() {
            return Ok(None);
        }

        let guard = match self.slot.try_acquire() {
            Ok(guard) => guard,
            Err(err) => {
                tracing::warn!("Submit rejected: {}", err);
                return Err(err.into());
            }
        };

        self.transcript.append_user(input.as_str());

        let candidates = self.composer.candidates().clone();
        let fallback = self.typed_lookup.as_ref();
        let typed = self.composer.registry_mut().commit_typed(&input, |token| {
            candidates
                .get(token)
                .cloned()
                .or_else(|| fallback.and_then(|lookup| lookup(token)))
        });
        if typed > 0 {
            tracing::debug!(typed, "Committed typed mentions");
        }

        let resolution = self.composer.registry().resolve_for_submit(&input);
        self.composer.registry_mut().clear();
        self.composer.clear_input();
        self.index.cancel_pending();

        Ok(Some(PendingRequest::new(
            resolution.cleaned_text,
            resolution.absolute_paths,
            Arc::clone(&self.files),
            Arc::clone(&self.client),
            self.budget,
            guard,
        )))
    }

    /// Record a finished request and free the slot
    pub fn complete(&mut self, done: CompletedRequest) -> Outcome {
        let CompletedRequest {
            reply,
            truncations,
            _guard,
        } = done;

        self.transcript.append_assistant(reply.content.as_str());

        let mut notices: Vec<Notice> = truncations.into_iter().map(Notice::Truncated).collect();
        if reply.is_missing_credential() {
            notices.push(Notice::MissingCredential);
        }

        Outcome { reply, notices }
    }

    /// Submit and wait for the reply in one step
    ///
    /// Returns `Ok(None)` when the input is blank.
    pub async fn submit(&mut self) -> Result<Option<Outcome>> {
        let Some(pending) = self.begin_submit()? else {
            return Ok(None);
        };
        let done = pending.run().await;
        Ok(Some(self.complete(done)))
    }

    /// Whether a request currently holds the slot
    pub fn is_busy(&self) -> bool {
        self.slot.is_busy()
    }

    /// The composer
    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// The transcript
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }
}
