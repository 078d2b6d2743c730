//! Host side of the message channel over newline-delimited JSON
//!
//! [`Bridge::serve`] reads [`UiMessage`]s, one JSON object per line, and
//! writes [`HostMessage`]s the same way. It lets a UI running in another
//! process (an editor webview, a test harness) drive the engine through
//! `atchat serve`.
//!
//! - `get-workspace-files` runs a search and answers with `workspace-files`.
//! - `user-message` reads the attachments, assembles the prompt, calls the
//!   endpoint and answers with `assistant-reply`. While one is pending,
//!   further `user-message`s are dropped.
//! - Lines that do not decode are logged and skipped.
//!
//! Replies carry the request's `id` when it had one. On end of input the
//! bridge waits for outstanding work, writes the remaining replies and
//! returns.

use crate::error::Result;
use crate::orchestrator::{CompletionClient, RequestSlot};
use crate::prompt::AttachmentBudget;
use crate::protocol::{HostMessage, UiMessage};
use crate::session::PendingRequest;
use crate::workspace::{FileProvider, WorkspaceFiles};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Serves one UI over a byte stream pair
pub struct Bridge {
    files: Arc<dyn FileProvider>,
    client: Arc<dyn CompletionClient>,
    budget: AttachmentBudget,
    slot: RequestSlot,
}

impl Bridge {
    /// Create a bridge over the given collaborators
    pub fn new(
        files: Arc<dyn FileProvider>,
        client: Arc<dyn CompletionClient>,
        budget: AttachmentBudget,
    ) -> Self {
        Self {
            files,
            client,
            budget,
            slot: RequestSlot::new(),
        }
    }

    /// Run until `input` reaches end of stream
    ///
    /// When `theme` is given, a `set-theme` message is written first.
    ///
    /// # Errors
    ///
    /// Returns error if reading `input` or writing `output` fails
    pub async fn serve<R, W>(&self, input: R, mut output: W, theme: Option<String>) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        if let Some(theme) = theme {
            write_message(&mut output, &HostMessage::SetTheme { theme }).await?;
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<HostMessage>();
        let mut lines = BufReader::new(input).lines();
        let mut tasks: JoinSet<()> = JoinSet::new();
        let mut input_open = true;

        while input_open || !tasks.is_empty() {
            tokio::select! {
                line = lines.next_line(), if input_open => match line? {
                    Some(line) => self.dispatch(&line, &tx, &mut tasks),
                    None => {
                        tracing::debug!("Bridge input closed");
                        input_open = false;
                    }
                },
                Some(message) = rx.recv() => write_message(&mut output, &message).await?,
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!("Bridge task failed: {}", e);
                    }
                }
            }
        }

        while let Ok(message) = rx.try_recv() {
            write_message(&mut output, &message).await?;
        }
        Ok(())
    }

    fn dispatch(
        &self,
        line: &str,
        tx: &mpsc::UnboundedSender<HostMessage>,
        tasks: &mut JoinSet<()>,
    ) {
        if line.trim().is_empty() {
            return;
        }

        let message = match UiMessage::from_line(line) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Skipping line: {}", e);
                return;
            }
        };

        match message {
            UiMessage::GetWorkspaceFiles { query, id } => {
                tracing::debug!(query = %query, "Workspace search requested");
                let files = Arc::clone(&self.files);
                let tx = tx.clone();
                tasks.spawn(async move {
                    let files = match files.search_files(&query).await {
                        Ok(files) => files,
                        Err(e) => {
                            tracing::warn!("Workspace search for '{}' failed: {}", query, e);
                            WorkspaceFiles::new()
                        }
                    };
                    let _ = tx.send(HostMessage::WorkspaceFiles { files, id });
                });
            }
            UiMessage::UserMessage {
                content,
                attachments,
                id,
            } => {
                let guard = match self.slot.try_acquire() {
                    Ok(guard) => guard,
                    Err(e) => {
                        tracing::warn!("Dropping user-message: {}", e);
                        return;
                    }
                };
                tracing::info!(attachments = attachments.len(), "User message received");

                let pending = PendingRequest::new(
                    content,
                    attachments,
                    Arc::clone(&self.files),
                    Arc::clone(&self.client),
                    self.budget,
                    guard,
                );
                let tx = tx.clone();
                tasks.spawn(async move {
                    let done = pending.run().await;
                    if done.reply().is_missing_credential() {
                        tracing::warn!("No API key stored; run `atchat auth` to set one");
                    }
                    let _ = tx.send(HostMessage::AssistantReply {
                        content: done.reply().content.clone(),
                        id,
                    });
                });
            }
        }
    }
}

async fn write_message<W>(output: &mut W, message: &HostMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = message.to_line()?;
    line.push('\n');
    output.write_all(line.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}
