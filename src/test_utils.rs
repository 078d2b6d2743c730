//! Test utilities for atchat
//!
//! In-memory fakes shared by the unit tests of several modules.

use crate::error::{AtchatError, RequestError, Result};
use crate::orchestrator::{CompletionClient, Reply};
use crate::workspace::{FileContent, FileProvider, ResolvedFile, WorkspaceFiles};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// [`FileProvider`] that serves a fixed file set and records every call
#[derive(Default)]
pub struct RecordingProvider {
    files: WorkspaceFiles,
    contents: HashMap<PathBuf, String>,
    fail_searches: bool,
    searches: Mutex<Vec<String>>,
    reads: Mutex<Vec<PathBuf>>,
}

impl RecordingProvider {
    /// Provider whose every search returns `files`
    pub fn with_files(files: WorkspaceFiles) -> Self {
        Self {
            files,
            ..Self::default()
        }
    }

    /// Provider whose searches always fail
    pub fn failing() -> Self {
        Self {
            fail_searches: true,
            ..Self::default()
        }
    }

    /// Register readable content for an absolute path
    pub fn with_content(mut self, path: &str, content: &str) -> Self {
        self.contents.insert(PathBuf::from(path), content.to_string());
        self
    }

    /// Queries searched so far, in order
    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }

    /// Paths read so far, in order
    pub fn reads(&self) -> Vec<PathBuf> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileProvider for RecordingProvider {
    async fn search_files(&self, query: &str) -> Result<WorkspaceFiles> {
        self.searches.lock().unwrap().push(query.to_string());
        if self.fail_searches {
            return Err(AtchatError::Search("provider offline".to_string()).into());
        }
        Ok(self.files.clone())
    }

    async fn read_files(&self, paths: &[PathBuf]) -> Vec<ResolvedFile> {
        self.reads.lock().unwrap().extend(paths.iter().cloned());
        paths
            .iter()
            .map(|path| {
                let relative_path = self
                    .files
                    .iter()
                    .find(|(_, abs)| *abs == path)
                    .map(|(rel, _)| rel.clone())
                    .unwrap_or_else(|| path.display().to_string());
                let content = match self.contents.get(path) {
                    Some(text) => FileContent::Text(text.clone()),
                    None => FileContent::Unreadable("No such file or directory".to_string()),
                };
                ResolvedFile {
                    relative_path,
                    absolute_path: path.clone(),
                    content,
                }
            })
            .collect()
    }
}

/// [`CompletionClient`] that answers every prompt with a fixed reply
pub struct ScriptedClient {
    reply: Reply,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    /// Client answering with `text`
    pub fn answering(text: &str) -> Self {
        Self::with_reply(Reply::from_result(Ok(text.to_string())))
    }

    /// Client failing every call with `err`
    pub fn failing(err: RequestError) -> Self {
        Self::with_reply(Reply::from_result(Err(err)))
    }

    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, in order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn send(&self, prompt: &str) -> Reply {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone()
    }
}
