//! Debounced workspace search client
//!
//! [`WorkspaceIndex`] turns the stream of `@query` edits into outbound
//! searches against a [`FileProvider`]:
//!
//! 1. Every call to [`WorkspaceIndex::request`] restarts a quiet-window timer;
//!    only the query present when the window elapses is searched.
//! 2. A search that has already been issued is never cancelled.
//! 3. Each issued search gets a sequence number. [`WorkspaceIndex::apply`]
//!    drops responses older than the latest issued search, so a slow stale
//!    response cannot overwrite fresher candidates.
//!
//! Responses are delivered through an unbounded channel handed out by
//! [`WorkspaceIndex::new`]; the owner feeds them back into `apply`.

use crate::workspace::{FileProvider, WorkspaceFiles};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default quiet window between the last keystroke and the search
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Result of one issued search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResponse {
    /// Sequence number assigned when the search was issued
    pub seq: u64,
    /// Query that was searched
    pub query: String,
    /// Matching files (empty on provider failure)
    pub files: WorkspaceFiles,
}

/// Debounced, sequence-tagged search client
pub struct WorkspaceIndex {
    provider: Arc<dyn FileProvider>,
    debounce: Duration,
    issued: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<SearchResponse>,
    candidates: WorkspaceFiles,
    applied_seq: u64,
}

impl WorkspaceIndex {
    /// Create a client and the receiver its responses arrive on
    pub fn new(
        provider: Arc<dyn FileProvider>,
        debounce: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<SearchResponse>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let index = Self {
            provider,
            debounce,
            issued: Arc::new(AtomicU64::new(0)),
            pending: None,
            tx,
            candidates: WorkspaceFiles::new(),
            applied_seq: 0,
        };
        (index, rx)
    }

    /// Schedule a search for `query` once the quiet window elapses
    ///
    /// Must be called from within a Tokio runtime. Any timer still waiting
    /// from a previous call is cancelled.
    pub fn request(&mut self, query: &str) {
        self.cancel_pending();

        let provider = Arc::clone(&self.provider);
        let issued = Arc::clone(&self.issued);
        let tx = self.tx.clone();
        let debounce = self.debounce;
        let query = query.to_string();

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;

            let seq = issued.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::debug!(seq, query = %query, "Issuing workspace search");

            // Detached so that a later keystroke aborting the timer task
            // cannot cancel a search that is already in flight.
            tokio::spawn(async move {
                let files = match provider.search_files(&query).await {
                    Ok(files) => files,
                    Err(e) => {
                        tracing::warn!("Workspace search for '{}' failed: {}", query, e);
                        WorkspaceFiles::new()
                    }
                };
                if tx.send(SearchResponse { seq, query, files }).is_err() {
                    tracing::debug!(seq, "Search result dropped; nobody is listening");
                }
            });
        }));
    }

    /// Drop a waiting timer without issuing its search
    pub fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Apply a response, replacing the candidate set wholesale
    ///
    /// Returns `false` (and leaves the candidates untouched) when a newer
    /// search has been issued since this one.
    pub fn apply(&mut self, response: SearchResponse) -> bool {
        let latest = self.issued.load(Ordering::SeqCst);
        if response.seq < latest || response.seq < self.applied_seq {
            tracing::debug!(
                seq = response.seq,
                latest,
                "Dropping stale workspace search response"
            );
            return false;
        }
        self.applied_seq = response.seq;
        self.candidates = response.files;
        true
    }

    /// Current candidate set
    pub fn candidates(&self) -> &WorkspaceFiles {
        &self.candidates
    }

    /// Number of searches issued so far
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}

impl Drop for WorkspaceIndex {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
