//! Prompt assembly
//!
//! Merges the cleaned user request with resolved attachment contents into
//! the single text sent to the model. Without attachments the cleaned text
//! is sent verbatim.

use crate::workspace::{FileContent, ResolvedFile};
use serde::{Deserialize, Serialize};

/// Combine the cleaned request and file contents into the final prompt
///
/// Files are emitted in the order given, each under a label naming its
/// relative path and fenced so code is distinguishable from prose.
///
/// # Examples
///
/// ```
/// use atchat::prompt::assemble;
/// use atchat::workspace::ResolvedFile;
///
/// assert_eq!(assemble("hello", &[]), "hello");
///
/// let prompt = assemble("do X", &[ResolvedFile::text("a.ts", "code")]);
/// assert!(prompt.find("do X").unwrap() < prompt.find("code").unwrap());
/// ```
pub fn assemble(cleaned_text: &str, files: &[ResolvedFile]) -> String {
    if files.is_empty() {
        return cleaned_text.to_string();
    }

    let file_context = files
        .iter()
        .map(|file| {
            format!(
                "Here is the content of the file '{}':\n```\n{}\n```",
                file.relative_path,
                file.prompt_text()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "The user's request is: \"{}\"\n\nPlease use the following file content to fulfill the request:\n\n{}",
        cleaned_text, file_context
    )
}

/// Optional size limits applied to attachment content before assembly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentBudget {
    /// Maximum bytes kept per file
    #[serde(default)]
    pub max_file_bytes: Option<usize>,
    /// Maximum bytes kept across all files
    #[serde(default)]
    pub max_total_bytes: Option<usize>,
}

/// Record of one file cut down by the budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncation {
    /// File that was cut
    pub relative_path: String,
    /// Bytes kept
    pub kept_bytes: usize,
    /// Original size in bytes
    pub original_bytes: usize,
}

impl AttachmentBudget {
    /// Whether no limit is configured
    pub fn is_unlimited(&self) -> bool {
        self.max_file_bytes.is_none() && self.max_total_bytes.is_none()
    }

    /// Cut readable file contents down to the budget
    ///
    /// Cuts happen on UTF-8 boundaries and append a marker naming how much
    /// was kept. Unreadable entries are left alone. Returns the truncations
    /// so the caller can tell the user.
    pub fn apply(&self, files: &mut [ResolvedFile]) -> Vec<Truncation> {
        if self.is_unlimited() {
            return Vec::new();
        }

        let mut remaining = self.max_total_bytes.unwrap_or(usize::MAX);
        let mut truncations = Vec::new();

        for file in files.iter_mut() {
            let FileContent::Text(text) = &mut file.content else {
                continue;
            };

            let original_bytes = text.len();
            let allowed = self
                .max_file_bytes
                .unwrap_or(usize::MAX)
                .min(remaining);

            if original_bytes > allowed {
                let cut = floor_char_boundary(text, allowed);
                text.truncate(cut);
                text.push_str(&format!(
                    "\n[... truncated: showing {} of {} bytes]",
                    cut, original_bytes
                ));
                tracing::warn!(
                    file = %file.relative_path,
                    kept = cut,
                    original = original_bytes,
                    "Attachment truncated to fit budget"
                );
                truncations.push(Truncation {
                    relative_path: file.relative_path.clone(),
                    kept_bytes: cut,
                    original_bytes,
                });
                remaining = remaining.saturating_sub(cut);
            } else {
                remaining = remaining.saturating_sub(original_bytes);
            }
        }

        truncations
    }
}

fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
