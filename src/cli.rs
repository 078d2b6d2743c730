//! Command-line interface definition for atchat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, one-shot questions, workspace
//! search, the stdio bridge and credential setup.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// atchat - chat with a language model about files in your workspace
///
/// Mention workspace files with `@path` and their contents are attached
/// to the request.
#[derive(Parser, Debug, Clone)]
#[command(name = "atchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/atchat.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Workspace root (defaults to the current directory)
    #[arg(short, long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Override the model from config
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for atchat
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start interactive chat; Tab completes `@` mentions
    Chat,

    /// Send a single prompt and print the reply
    Ask {
        /// Prompt text; `@path` mentions of workspace files are attached
        #[arg(short, long)]
        prompt: String,
    },

    /// List workspace files matching a query
    Search {
        /// Query; omit for a shallow listing
        query: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Serve the chat message channel as newline-delimited JSON on stdio
    Serve {
        /// Theme announced to the UI at startup
        #[arg(long)]
        theme: Option<String>,
    },

    /// Store the API key in the system keyring
    Auth {
        /// Remove the stored key instead
        #[arg(long)]
        delete: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Workspace root: `--workspace` or the current directory
    pub fn workspace_root(&self) -> std::io::Result<PathBuf> {
        match &self.workspace {
            Some(path) => Ok(path.clone()),
            None => std::env::current_dir(),
        }
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/atchat.yaml".to_string()),
            verbose: false,
            json_logs: false,
            workspace: None,
            model: None,
            command: Commands::Chat,
        }
    }
}
