//! atchat - `@`-mention file attachment and request orchestration
//!
//! This library resolves `@path` mentions in a chat message to workspace
//! files, attaches their contents to the prompt and sends it to a Gemini
//! `generateContent` endpoint, one request at a time.
//!
//! # Architecture
//!
//! - `mention`: Detecting the mention under the cursor and inserting selections
//! - `workspace`: Workspace file search and reading (`FileProvider`)
//! - `index`: Debounced, sequenced search requests
//! - `composer`: Input state machine with candidate dropdown
//! - `attachments`: Registry of committed mentions and submit-time cleanup
//! - `prompt`: Prompt assembly and attachment size budget
//! - `orchestrator`: Endpoint client, response classification, request slot
//! - `credentials`: API key storage (system keyring, environment)
//! - `session`: Ties the pieces together for one chat
//! - `protocol` / `bridge`: Newline-delimited JSON channel to an external UI
//! - `config`, `cli`, `commands`, `error`: Application plumbing
//!
//! # Example
//!
//! ```no_run
//! use atchat::attachments::AttachmentRegistry;
//! use atchat::prompt;
//! use atchat::workspace::ResolvedFile;
//!
//! let mut registry = AttachmentRegistry::new();
//! registry.commit("src/lib.rs", "/work/src/lib.rs");
//! let resolution = registry.resolve_for_submit("review @src/lib.rs");
//!
//! let files = vec![ResolvedFile::text("src/lib.rs", "pub fn f() {}")];
//! let prompt = prompt::assemble(&resolution.cleaned_text, &files);
//! assert!(prompt.contains("review"));
//! ```

pub mod attachments;
pub mod bridge;
pub mod cli;
pub mod commands;
pub mod composer;
pub mod config;
pub mod credentials;
pub mod error;
pub mod index;
pub mod mention;
pub mod orchestrator;
pub mod prompt;
pub mod protocol;
pub mod session;
pub mod transcript;
pub mod workspace;

// Re-export commonly used types
pub use attachments::{AttachmentRegistry, SubmitResolution};
pub use bridge::Bridge;
pub use config::Config;
pub use error::{AtchatError, RequestError, Result};
pub use orchestrator::{CompletionClient, Reply, RequestOrchestrator};
pub use session::{ChatSession, Outcome, SessionDeps};
pub use workspace::{FileProvider, LocalWorkspace, WorkspaceFiles};

#[cfg(test)]
pub mod test_utils;
