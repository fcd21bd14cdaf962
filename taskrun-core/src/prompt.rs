//! # Interactive approval
//!
//! The human side of the policy engine: when no cached rule covers a
//! command, the gate blocks on a 4-way terminal choice. The prompt sits
//! behind a trait so the orchestrator and its tests never touch a real TTY.

use crate::policy::{Decision, PolicyStore};
use std::io::{BufRead, Write};
use taskrun_error::{Error, Result};

/// Source of interactive approval decisions.
///
/// Implementations block until the human answers. An unreadable prompt
/// (closed stdin, no TTY) is an error, which callers treat as fatal.
pub trait ApprovalPrompt: Send {
    /// Ask the human to decide on `command`; `description` says why the
    /// model wants it.
    fn ask(&mut self, command: &str, description: &str) -> Result<Decision>;
}

/// Blocking stdin/stdout prompt
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl StdinPrompt {
    pub fn new() -> Self {
        Self
    }
}

impl ApprovalPrompt for StdinPrompt {
    fn ask(&mut self, command: &str, description: &str) -> Result<Decision> {
        let stdin = std::io::stdin();
        let mut lines = stdin.lock().lines();

        println!();
        println!("The model wants to run:");
        println!("    {}", command);
        if !description.is_empty() {
            println!("Reason: {}", description);
        }
        println!("[1] allow once  [2] always allow  [3] never allow  [4] skip");

        loop {
            print!("> ");
            std::io::stdout()
                .flush()
                .map_err(|e| Error::prompt_failed(e.to_string()).set_source(e))?;

            let line = match lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    return Err(Error::prompt_failed(e.to_string())
                        .with_operation("prompt::ask")
                        .set_source(e));
                }
                None => {
                    return Err(Error::prompt_failed("stdin closed before a choice was made")
                        .with_operation("prompt::ask"));
                }
            };

            match parse_choice(&line) {
                Some(decision) => return Ok(decision),
                None => println!("Please answer 1-4 (or once/always/never/skip)."),
            }
        }
    }
}

/// Map one line of input to a decision, if recognizable.
fn parse_choice(line: &str) -> Option<Decision> {
    match line.trim().to_ascii_lowercase().as_str() {
        "1" | "o" | "once" | "y" | "yes" => Some(Decision::Once),
        "2" | "a" | "always" => Some(Decision::Always),
        "3" | "n" | "never" | "no" => Some(Decision::Never),
        "4" | "s" | "skip" => Some(Decision::Skip),
        _ => None,
    }
}

/// The approval engine: cached rules first, the human otherwise.
pub struct PolicyGate {
    store: PolicyStore,
    prompt: Box<dyn ApprovalPrompt>,
}

impl PolicyGate {
    /// Create a gate over a store with a custom prompt
    pub fn new(store: PolicyStore, prompt: Box<dyn ApprovalPrompt>) -> Self {
        Self { store, prompt }
    }

    /// Create a gate that prompts on stdin
    pub fn with_stdin(store: PolicyStore) -> Self {
        Self::new(store, Box::new(StdinPrompt::new()))
    }

    /// Decide whether `command` may execute.
    ///
    /// Order: global override, then cached rules (first match wins), then
    /// the interactive prompt. "Always"/"never" answers persist a rule for
    /// the exact command string; "once"/"skip" leave the store untouched.
    pub fn approve(&mut self, command: &str, description: &str) -> Result<Decision> {
        if self.store.always_allow() {
            return Ok(Decision::Always);
        }

        if let Some(decision) = self.store.match_command(command) {
            tracing::debug!(command, %decision, "approval served from cached rule");
            return Ok(decision);
        }

        let decision = self.prompt.ask(command, description)?;
        match decision {
            Decision::Always | Decision::Never => {
                self.store.add(command, decision);
            }
            Decision::Once | Decision::Skip => {}
        }
        Ok(decision)
    }

    /// The underlying store
    pub fn store(&self) -> &PolicyStore {
        &self.store
    }

    /// Mutable access to the underlying store
    pub fn store_mut(&mut self) -> &mut PolicyStore {
        &mut self.store
    }

    /// Take the store back out of the gate
    pub fn into_store(self) -> PolicyStore {
        self.store
    }
}
