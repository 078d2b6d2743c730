//! Workspace file index and attachment reading
//!
//! The core engine never touches the filesystem directly; it talks to a
//! [`FileProvider`]. [`LocalWorkspace`] is the provider used by the CLI and
//! the stdio bridge: it walks a workspace root with the `ignore` crate,
//! skipping a fixed denylist of build, dependency and version-control
//! directories.

use crate::error::{AtchatError, Result};
use async_trait::async_trait;
use ignore::{DirEntry, WalkBuilder};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Maximum entries returned for the shallow listing (empty query)
pub const DEFAULT_SHALLOW_LIMIT: usize = 100;

/// Maximum entries returned for a targeted search
pub const DEFAULT_TARGETED_LIMIT: usize = 200;

/// Directory names never descended into during search
pub const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "out",
    "target",
    ".next",
    ".vercel",
    ".turbo",
    ".cache",
    ".vscode",
    "test",
    "tests",
    "coverage",
    "__pycache__",
];

/// Search result: relative path (forward slashes) to absolute path
pub type WorkspaceFiles = BTreeMap<String, PathBuf>;

/// One candidate in the workspace index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceEntry {
    /// Path relative to the workspace root, always `/`-separated
    pub relative_path: String,
    /// Absolute path on the host
    pub absolute_path: PathBuf,
}

impl WorkspaceEntry {
    /// Flatten a search result into entries, sorted by relative path
    pub fn from_files(files: &WorkspaceFiles) -> Vec<Self> {
        files
            .iter()
            .map(|(rel, abs)| Self {
                relative_path: rel.clone(),
                absolute_path: abs.clone(),
            })
            .collect()
    }
}

/// Content of an attachment after resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// File read successfully
    Text(String),
    /// File could not be read; holds the failure detail
    Unreadable(String),
}

/// A resolved attachment ready for prompt assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Relative name shown to the model
    pub relative_path: String,
    /// Path that was read
    pub absolute_path: PathBuf,
    /// File body or failure detail
    pub content: FileContent,
}

impl ResolvedFile {
    /// Convenience constructor for a successfully read file
    pub fn text(relative_path: impl Into<String>, content: impl Into<String>) -> Self {
        let relative_path = relative_path.into();
        Self {
            absolute_path: PathBuf::from(&relative_path),
            relative_path,
            content: FileContent::Text(content.into()),
        }
    }

    /// Whether the read failed
    pub fn is_unreadable(&self) -> bool {
        matches!(self.content, FileContent::Unreadable(_))
    }

    /// Text substituted into the prompt for this file
    ///
    /// Unreadable files become an inline bracketed error so the model still
    /// sees a visible gap instead of the request being aborted.
    pub fn prompt_text(&self) -> Cow<'_, str> {
        match &self.content {
            FileContent::Text(text) => Cow::Borrowed(text),
            FileContent::Unreadable(details) => Cow::Owned(format!(
                "[Error: Could not read file '{}'. Full path attempted: {}. Details: {}]",
                self.relative_path,
                self.absolute_path.display(),
                details
            )),
        }
    }
}

/// Source of workspace files for the chat engine
///
/// Implementations must normalize relative paths to forward slashes.
#[async_trait]
pub trait FileProvider: Send + Sync {
    /// Search the workspace
    ///
    /// An empty query returns a shallow listing (root and one level down);
    /// anything else is a recursive, case-insensitive match on the last
    /// path segment(s).
    async fn search_files(&self, query: &str) -> Result<WorkspaceFiles>;

    /// Read attachments in the given order
    ///
    /// Never fails as a whole: unreadable files are reported per entry.
    async fn read_files(&self, paths: &[PathBuf]) -> Vec<ResolvedFile>;
}

/// Filesystem-backed [`FileProvider`] rooted at a workspace directory
///
/// # Examples
///
/// ```no_run
/// use atchat::workspace::{FileProvider, LocalWorkspace};
///
/// # async fn example() -> atchat::error::Result<()> {
/// let workspace = LocalWorkspace::new("/project".into());
/// let files = workspace.search_files("main").await?;
/// for (relative, absolute) in &files {
///     println!("{}\t{}", relative, absolute.display());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalWorkspace {
    root: PathBuf,
    shallow_limit: usize,
    targeted_limit: usize,
}

impl LocalWorkspace {
    /// Create a provider with the default result caps
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            shallow_limit: DEFAULT_SHALLOW_LIMIT,
            targeted_limit: DEFAULT_TARGETED_LIMIT,
        }
    }

    /// Override the result caps
    pub fn with_limits(mut self, shallow_limit: usize, targeted_limit: usize) -> Self {
        self.shallow_limit = shallow_limit;
        self.targeted_limit = targeted_limit;
        self
    }

    /// Workspace root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Synchronous search, used directly by line-editor completion
    pub fn search_blocking(&self, query: &str) -> Result<WorkspaceFiles> {
        let (max_depth, limit) = if query.is_empty() {
            (Some(2), self.shallow_limit)
        } else {
            (None, self.targeted_limit)
        };
        let pattern = (!query.is_empty()).then(|| query_pattern(query));

        let mut builder = WalkBuilder::new(&self.root);
        builder
            .standard_filters(false)
            .max_depth(max_depth)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(|entry| !is_excluded(entry));

        let mut files = WorkspaceFiles::new();
        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!("Error while walking workspace: {}", err);
                    continue;
                }
            };
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }

            let relative = self.relative_name(entry.path());
            if let Some(pattern) = &pattern {
                if !glob_match::glob_match(pattern, &relative.to_lowercase()) {
                    continue;
                }
            }

            files.insert(relative, entry.path().to_path_buf());
            if files.len() >= limit {
                tracing::debug!(limit, "Workspace search hit result cap");
                break;
            }
        }

        tracing::debug!(query, results = files.len(), "Workspace search finished");
        Ok(files)
    }

    /// Resolve a typed relative path to an existing file inside the root
    ///
    /// Absolute paths and `..` components are rejected.
    pub fn resolve_relative(&self, relative: &str) -> Option<PathBuf> {
        let candidate = Path::new(relative);
        if candidate.is_absolute()
            || candidate
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::RootDir))
        {
            return None;
        }
        let path = self.root.join(candidate);
        path.is_file().then_some(path)
    }

    /// Path relative to the root with forward slashes
    ///
    /// Paths outside the root are returned whole, normalized the same way.
    pub fn relative_name(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative.to_string_lossy().replace('\\', "/")
    }
}

#[async_trait]
impl FileProvider for LocalWorkspace {
    async fn search_files(&self, query: &str) -> Result<WorkspaceFiles> {
        let workspace = self.clone();
        let query = query.to_string();
        tokio::task::spawn_blocking(move || workspace.search_blocking(&query))
            .await
            .map_err(|e| AtchatError::Search(format!("search task failed: {}", e)))?
    }

    async fn read_files(&self, paths: &[PathBuf]) -> Vec<ResolvedFile> {
        let mut resolved = Vec::with_capacity(paths.len());
        for path in paths {
            let relative_path = self.relative_name(path);
            let content = match tokio::fs::read(path).await {
                Ok(bytes) => FileContent::Text(String::from_utf8_lossy(&bytes).into_owned()),
                Err(e) => {
                    let err = AtchatError::FileRead {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    };
                    tracing::warn!("{}", err);
                    FileContent::Unreadable(e.to_string())
                }
            };
            resolved.push(ResolvedFile {
                relative_path,
                absolute_path: path.clone(),
                content,
            });
        }
        resolved
    }
}

fn is_excluded(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().map(|t| t.is_dir()).unwrap_or(false)
        && entry
            .file_name()
            .to_str()
            .map(|name| EXCLUDED_DIRS.contains(&name))
            .unwrap_or(false)
}

/// Lowercased `**/*query*` glob; glob syntax in the query is honoured
fn query_pattern(query: &str) -> String {
    format!("**/*{}*", query.to_lowercase())
}
