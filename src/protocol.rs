//! Message channel between the chat UI and the host
//!
//! Messages are JSON objects tagged by `type`. Both directions are
//! fire-and-forget; the optional `id` lets a UI correlate a reply with its
//! request and is echoed back verbatim. When absent it is left off the wire.
//!
//! | direction | type | payload |
//! |---|---|---|
//! | UI → host | `user-message` | `content`, `attachments` |
//! | UI → host | `get-workspace-files` | `query` |
//! | host → UI | `assistant-reply` | `content` |
//! | host → UI | `workspace-files` | `files` |
//! | host → UI | `set-theme` | `theme` |

use crate::error::{AtchatError, Result};
use crate::workspace::WorkspaceFiles;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// UI → host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiMessage {
    /// A submitted message with its resolved attachments
    UserMessage {
        /// Cleaned user text
        content: String,
        /// Absolute paths to attach, in order
        #[serde(default)]
        attachments: Vec<PathBuf>,
        /// Correlation id
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    /// Workspace search request
    GetWorkspaceFiles {
        /// Query; empty for a shallow listing
        #[serde(default)]
        query: String,
        /// Correlation id
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
}

/// Host → UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HostMessage {
    /// Assistant answer or failure placeholder
    AssistantReply {
        /// Displayable text
        content: String,
        /// Id of the `user-message` being answered
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    /// Search result
    WorkspaceFiles {
        /// Relative path to absolute path
        files: WorkspaceFiles,
        /// Id of the `get-workspace-files` being answered
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    /// Highlighter theme for the UI
    SetTheme {
        /// Theme name
        theme: String,
    },
}

impl UiMessage {
    /// Decode one line of the channel
    ///
    /// # Errors
    ///
    /// Returns [`AtchatError::Protocol`] when the line is not a known message
    pub fn from_line(line: &str) -> Result<Self> {
        serde_json::from_str(line.trim())
            .map_err(|e| AtchatError::Protocol(format!("invalid message: {}", e)).into())
    }

    /// Correlation id, if any
    pub fn id(&self) -> Option<&str> {
        match self {
            UiMessage::UserMessage { id, .. } | UiMessage::GetWorkspaceFiles { id, .. } => {
                id.as_deref()
            }
        }
    }
}

impl HostMessage {
    /// Encode as one line (no trailing newline)
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
