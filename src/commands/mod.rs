/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `chat`: Interactive chat with `@` completion
- `ask`: Send one prompt and print the reply
- `search`: Print the workspace index for a query
- `serve`: Run the message channel over stdio
- `auth`: Store or delete the API key

The handlers are thin: they build the library components from `Config`
and hand control to them.
*/

use crate::config::Config;
use crate::credentials::{CredentialStore, EnvStore, KeyringStore};
use crate::error::{AtchatError, Result};
use crate::orchestrator::RequestOrchestrator;
use crate::session::{ChatSession, Notice, Outcome, SessionDeps};
use crate::workspace::{FileProvider, LocalWorkspace};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

/// Credential store selected by the configuration
fn credential_store(config: &Config) -> Arc<dyn CredentialStore> {
    match &config.credentials.env_var {
        Some(variable) => {
            tracing::debug!(variable = %variable, "Reading API key from environment");
            Arc::new(EnvStore::new(variable.clone()))
        }
        None => Arc::new(KeyringStore::new(config.credentials.service.clone())),
    }
}

fn local_workspace(config: &Config, root: PathBuf) -> LocalWorkspace {
    LocalWorkspace::new(root).with_limits(config.search.shallow_limit, config.search.targeted_limit)
}

fn orchestrator(config: &Config) -> Result<Arc<RequestOrchestrator>> {
    Ok(Arc::new(RequestOrchestrator::new(
        &config.endpoint,
        credential_store(config),
        config.credentials.secret_name.clone(),
    )?))
}

/// Session over a local workspace; typed `@path` tokens naming existing
/// files are attached even without a prior search
fn local_session(config: &Config, workspace: &LocalWorkspace) -> Result<ChatSession> {
    let files: Arc<dyn FileProvider> = Arc::new(workspace.clone());
    // input arrives through `set_draft`, so the index never searches
    let (session, _responses) = ChatSession::new(SessionDeps {
        files,
        client: orchestrator(config)?,
        debounce: config.search.debounce(),
        budget: config.attachments,
    });
    let lookup = workspace.clone();
    Ok(session.with_typed_lookup(Box::new(move |token: &str| {
        lookup.resolve_relative(token)
    })))
}

fn print_notices(outcome: &Outcome) {
    for notice in &outcome.notices {
        match notice {
            Notice::MissingCredential => eprintln!(
                "{}",
                "No API key is stored. Run `atchat auth` to set one.".yellow()
            ),
            Notice::Truncated(cut) => eprintln!(
                "{}",
                format!(
                    "Note: {} was truncated to {} of {} bytes",
                    cut.relative_path, cut.kept_bytes, cut.original_bytes
                )
                .yellow()
            ),
        }
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Runs a readline loop where each line is one message. Tab completes
    //! the `@query` under the cursor from the workspace.

    use super::*;
    use crate::mention;
    use rustyline::completion::{Completer, Pair};
    use rustyline::error::ReadlineError;
    use rustyline::highlight::Highlighter;
    use rustyline::hint::Hinter;
    use rustyline::history::DefaultHistory;
    use rustyline::validate::Validator;
    use rustyline::{Context, Editor, Helper};

    /// Line-editor helper completing `@` mentions
    pub struct MentionHelper {
        workspace: LocalWorkspace,
    }

    impl MentionHelper {
        /// Helper searching `workspace`
        pub fn new(workspace: LocalWorkspace) -> Self {
            Self { workspace }
        }
    }

    impl Helper for MentionHelper {}

    impl Completer for MentionHelper {
        type Candidate = Pair;

        fn complete(
            &self,
            line: &str,
            pos: usize,
            _ctx: &Context<'_>,
        ) -> rustyline::Result<(usize, Vec<Pair>)> {
            let state = mention::detect(line, pos);
            if !state.active {
                return Ok((pos, Vec::new()));
            }

            let files = match self.workspace.search_blocking(&state.query) {
                Ok(files) => files,
                Err(e) => {
                    tracing::debug!("Completion search failed: {}", e);
                    return Ok((pos, Vec::new()));
                }
            };

            let candidates = mention::filter_candidates(files.keys().map(String::as_str), &state.query)
                .into_iter()
                .map(|relative| Pair {
                    display: relative.to_string(),
                    replacement: format!("{} ", relative),
                })
                .collect();
            Ok((state.anchor_index + 1, candidates))
        }
    }

    impl Highlighter for MentionHelper {}

    impl Hinter for MentionHelper {
        type Hint = String;
    }

    impl Validator for MentionHelper {}

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `root` - Workspace root
    pub async fn run_chat(config: Config, root: PathBuf) -> Result<()> {
        tracing::info!(root = %root.display(), "Starting interactive chat mode");

        let workspace = local_workspace(&config, root);
        let mut session = local_session(&config, &workspace)?;

        let mut rl: Editor<MentionHelper, DefaultHistory> = Editor::new()?;
        rl.set_helper(Some(MentionHelper::new(workspace.clone())));

        print_welcome_banner(&config, &workspace);

        loop {
            match rl.readline(&format!("{} ", "you>".green().bold())) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(trimmed)?;

                    match trimmed {
                        "/exit" | "/quit" => break,
                        "/help" => {
                            print_help();
                            continue;
                        }
                        _ => {}
                    }
                    if let Some(query) = trimmed.strip_prefix("/files") {
                        print_files(&workspace, query.trim());
                        continue;
                    }

                    session.set_draft(trimmed);
                    match session.submit().await {
                        Ok(Some(outcome)) => {
                            print_notices(&outcome);
                            print_reply(&outcome);
                        }
                        Ok(None) => {}
                        Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(
            messages = session.transcript().len(),
            "Chat session finished"
        );
        Ok(())
    }

    fn print_reply(outcome: &Outcome) {
        let label = "assistant>".cyan().bold();
        if outcome.reply.is_success() {
            println!("{} {}\n", label, outcome.reply.content);
        } else {
            println!("{} {}\n", label, outcome.reply.content.red());
        }
    }

    fn print_files(workspace: &LocalWorkspace, query: &str) {
        match workspace.search_blocking(query) {
            Ok(files) if files.is_empty() => println!("{}", "No matching files".dimmed()),
            Ok(files) => {
                for relative in files.keys() {
                    let (name, folder) = mention::split_file_path(relative);
                    println!("  {} {}", name.bold(), folder.dimmed());
                }
            }
            Err(e) => eprintln!("{}", format!("Search failed: {}", e).red()),
        }
    }

    fn print_welcome_banner(config: &Config, workspace: &LocalWorkspace) {
        println!("{}", "atchat".bold());
        println!(
            "model: {}  workspace: {}",
            config.endpoint.model.cyan(),
            workspace.root().display()
        );
        println!(
            "{}\n",
            "Mention files with @path (Tab completes). /help for commands.".dimmed()
        );
    }

    fn print_help() {
        println!("{}", "Commands".bold());
        println!("  /files [query]   list workspace files");
        println!("  /help            show this help");
        println!("  /exit            leave chat");
        println!();
        println!("Type @ followed by part of a file name and press Tab to complete it.");
        println!("Mentioned files are attached to the message and removed from its text.\n");
    }
}

// One-shot prompt handler
pub mod ask {
    use super::*;

    /// Send `prompt` once and print the reply on stdout
    ///
    /// # Errors
    ///
    /// Returns error if the request failed; the placeholder is still printed
    pub async fn run_ask(config: Config, root: PathBuf, prompt: String) -> Result<()> {
        let workspace = local_workspace(&config, root);
        let mut session = local_session(&config, &workspace)?;

        session.set_draft(prompt.as_str());
        let Some(outcome) = session.submit().await? else {
            return Err(AtchatError::Config("prompt cannot be empty".to_string()).into());
        };

        print_notices(&outcome);
        println!("{}", outcome.reply.content);

        match outcome.reply.failure {
            None => Ok(()),
            Some(err) => Err(AtchatError::from(err).into()),
        }
    }
}

// Workspace search handler
pub mod search {
    use super::*;

    /// Print the files matching `query` (shallow listing when `None`)
    pub async fn run_search(
        config: Config,
        root: PathBuf,
        query: Option<String>,
        json: bool,
    ) -> Result<()> {
        let workspace = local_workspace(&config, root);
        let query = query.unwrap_or_default();
        let files = workspace.search_files(&query).await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&files)?);
        } else {
            for (relative, absolute) in &files {
                println!("{}\t{}", relative, absolute.display());
            }
        }
        Ok(())
    }
}

// Stdio bridge handler
pub mod serve {
    use super::*;
    use crate::bridge::Bridge;

    /// Serve the message channel on stdin/stdout until stdin closes
    pub async fn run_serve(config: Config, root: PathBuf, theme: Option<String>) -> Result<()> {
        tracing::info!(root = %root.display(), "Serving message channel on stdio");
        let workspace = local_workspace(&config, root);
        let bridge = Bridge::new(Arc::new(workspace), orchestrator(&config)?, config.attachments);
        bridge
            .serve(tokio::io::stdin(), tokio::io::stdout(), theme)
            .await
    }
}

// Credential setup handler
pub mod auth {
    use super::*;
    use rustyline::completion::Completer;
    use rustyline::config::Configurer;
    use rustyline::highlight::Highlighter;
    use rustyline::hint::Hinter;
    use rustyline::history::DefaultHistory;
    use rustyline::validate::Validator;
    use rustyline::{ColorMode, Editor, Helper};
    use std::borrow::Cow;
    use std::io::{BufRead, IsTerminal};

    /// Echoes `*` instead of the typed characters
    struct MaskingHelper;

    impl Helper for MaskingHelper {}

    impl Completer for MaskingHelper {
        type Candidate = String;
    }

    impl Hinter for MaskingHelper {
        type Hint = String;
    }

    impl Validator for MaskingHelper {}

    impl Highlighter for MaskingHelper {
        fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
            Cow::Owned("*".repeat(line.chars().count()))
        }

        fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
            true
        }
    }

    fn read_key() -> Result<String> {
        if !std::io::stdin().is_terminal() {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            return Ok(line.trim().to_string());
        }

        let mut rl: Editor<MaskingHelper, DefaultHistory> = Editor::new()?;
        rl.set_helper(Some(MaskingHelper));
        rl.set_color_mode(ColorMode::Forced);
        rl.set_auto_add_history(false);
        Ok(rl.readline("API key: ")?.trim().to_string())
    }

    /// Store (or with `delete`, remove) the API key in the keyring
    ///
    /// When stdin is not a terminal the key is read from its first line.
    pub async fn authenticate(config: Config, delete: bool) -> Result<()> {
        let store = KeyringStore::new(config.credentials.service.clone());
        let name = config.credentials.secret_name.as_str();

        if delete {
            store.delete_secret(name)?;
            println!("API key '{}' removed from the keyring.", name);
            return Ok(());
        }

        let key = read_key()?;
        if key.is_empty() {
            println!("{}", "API key not set.".yellow());
            return Ok(());
        }

        store.set_secret(name, &key)?;
        println!("{}", "API key saved in the system keyring.".green());
        Ok(())
    }
}
