//! # Action dispatch
//!
//! A registry maps an action's `type` string to a handler. Handlers own all
//! side effects and call the policy gate themselves before mutating state;
//! the orchestrator never touches the filesystem or spawns processes.
//!
//! Execution failures (non-zero exit codes, missing files, bad patterns) are
//! rendered into the observation text so the model can adapt - only
//! infrastructure failures (an unreadable approval prompt) surface as
//! errors.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use taskrun_core::action::Action;
use taskrun_core::prompt::PolicyGate;
use taskrun_error::{Error, Result};

/// Byte budget per captured output stream in shell observations
const MAX_CAPTURE: usize = 4000;

/// Executes one action type, producing observation text
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// The action `type` string this handler serves
    fn name(&self) -> &'static str;

    /// Execute the action.
    ///
    /// Returns observation text on both success and ordinary failure; only
    /// infrastructure errors (approval prompt unreadable) are `Err`.
    async fn execute(&self, action: &Action, gate: &mut PolicyGate) -> Result<String>;
}

/// Registry mapping action type strings to handlers
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Box<dyn ActionHandler>>,
}

impl HandlerRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self { handlers: HashMap::new() }
    }

    /// The built-in handler set
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ListFilesHandler));
        registry.register(Box::new(ReadFileHandler));
        registry.register(Box::new(SearchFilesHandler));
        registry.register(Box::new(ShellHandler));
        registry
    }

    /// Register a handler under its name, replacing any previous one
    pub fn register(&mut self, handler: Box<dyn ActionHandler>) {
        self.handlers.insert(handler.name(), handler);
    }

    /// Look up the handler for an action type
    pub fn get(&self, name: &str) -> Option<&dyn ActionHandler> {
        self.handlers.get(name).map(|h| h.as_ref())
    }

    /// Registered action type names
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

// =============================================================================
// list_files
// =============================================================================

pub struct ListFilesHandler;

#[async_trait]
impl ActionHandler for ListFilesHandler {
    fn name(&self) -> &'static str {
        "list_files"
    }

    async fn execute(&self, action: &Action, _gate: &mut PolicyGate) -> Result<String> {
        let Action::ListFiles { path, depth } = action else {
            return Err(Error::exec_failed("list_files", "wrong action variant"));
        };

        let base = PathBuf::from(path);
        let mut entries = Vec::new();
        if let Err(e) = walk_listing(&base, &base, *depth, &mut entries) {
            return Ok(format!("error: cannot list {}: {}", path, e));
        }
        entries.sort();

        if entries.is_empty() {
            Ok(format!("{} is empty", path))
        } else {
            Ok(format!("{} entries under {}:\n{}", entries.len(), path, entries.join("\n")))
        }
    }
}

fn walk_listing(base: &Path, dir: &Path, depth: u32, out: &mut Vec<String>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let relative = path.strip_prefix(base).unwrap_or(&path).display().to_string();

        if path.is_dir() {
            out.push(format!("{}/", relative));
            if depth > 0 {
                walk_listing(base, &path, depth - 1, out)?;
            }
        } else {
            out.push(relative);
        }
    }
    Ok(())
}

// =============================================================================
// read_file
// =============================================================================

pub struct ReadFileHandler;

#[async_trait]
impl ActionHandler for ReadFileHandler {
    fn name(&self) -> &'static str {
        "read_file"
    }

    async fn execute(&self, action: &Action, _gate: &mut PolicyGate) -> Result<String> {
        let Action::ReadFile { path, max_bytes } = action else {
            return Err(Error::exec_failed("read_file", "wrong action variant"));
        };

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => return Ok(format!("error: cannot read {}: {}", path, e)),
        };

        let total = bytes.len() as u64;
        let keep = total.min(*max_bytes) as usize;
        let mut text = String::from_utf8_lossy(&bytes[..keep]).into_owned();
        if total > *max_bytes {
            text.push_str(&format!(
                "\n... (truncated at {} bytes; file is {} bytes)",
                max_bytes, total
            ));
        }
        Ok(text)
    }
}

// =============================================================================
// search_files
// =============================================================================

pub struct SearchFilesHandler;

#[async_trait]
impl ActionHandler for SearchFilesHandler {
    fn name(&self) -> &'static str {
        "search_files"
    }

    async fn execute(&self, action: &Action, _gate: &mut PolicyGate) -> Result<String> {
        let Action::SearchFiles { pattern, path, max_results, case_sensitive } = action else {
            return Err(Error::exec_failed("search_files", "wrong action variant"));
        };

        let regex = match regex::RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
        {
            Ok(regex) => regex,
            Err(e) => return Ok(format!("error: invalid pattern {:?}: {}", pattern, e)),
        };

        let mut matches = Vec::new();
        search_dir(Path::new(path), &regex, *max_results, &mut matches);

        if matches.is_empty() {
            Ok(format!("no matches for {:?} under {}", pattern, path))
        } else {
            let mut out = format!("{} match(es):\n{}", matches.len(), matches.join("\n"));
            if matches.len() >= *max_results {
                out.push_str("\n(stopped at max_results)");
            }
            Ok(out)
        }
    }
}

fn search_dir(dir: &Path, regex: &regex::Regex, max_results: usize, out: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    let mut entries: Vec<_> = entries.flatten().collect();
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        if out.len() >= max_results {
            return;
        }
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if path.is_dir() {
            // Hidden directories (.git and friends) are skipped.
            if !name.starts_with('.') {
                search_dir(&path, regex, max_results, out);
            }
            continue;
        }

        // Non-UTF-8 (binary) files are skipped.
        let Ok(content) = std::fs::read_to_string(&path) else { continue };
        for (lineno, line) in content.lines().enumerate() {
            if out.len() >= max_results {
                return;
            }
            if regex.is_match(line) {
                out.push(format!("{}:{}: {}", path.display(), lineno + 1, line.trim_end()));
            }
        }
    }
}

// =============================================================================
// shell
// =============================================================================

pub struct ShellHandler;

#[async_trait]
impl ActionHandler for ShellHandler {
    fn name(&self) -> &'static str {
        "shell"
    }

    async fn execute(&self, action: &Action, gate: &mut PolicyGate) -> Result<String> {
        let Action::Shell { shell, command, cwd, reason } = action else {
            return Err(Error::exec_failed("shell", "wrong action variant"));
        };

        // Approval first; prompt failures propagate and abort the task.
        let decision = gate.approve(command, reason.as_deref().unwrap_or(""))?;
        match decision {
            taskrun_core::Decision::Never => {
                return Ok("command denied by policy; do not propose it again".to_string());
            }
            taskrun_core::Decision::Skip => {
                return Ok("command skipped by the user".to_string());
            }
            taskrun_core::Decision::Once | taskrun_core::Decision::Always => {}
        }

        let mut cmd = tokio::process::Command::new(shell.program());
        cmd.arg(shell.command_flag()).arg(command);
        if let Some(cwd) = cwd {
            cmd.current_dir(cwd);
        }

        let output = match cmd.output().await {
            Ok(output) => output,
            Err(e) => return Ok(format!("error: failed to start {}: {}", shell.program(), e)),
        };

        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = truncate_stream(&output.stdout);
        let stderr = truncate_stream(&output.stderr);

        let mut observation = format!("exit code: {}", exit_code);
        if !stdout.is_empty() {
            observation.push_str(&format!("\nstdout:\n{}", stdout));
        }
        if !stderr.is_empty() {
            observation.push_str(&format!("\nstderr:\n{}", stderr));
        }
        Ok(observation)
    }
}

fn truncate_stream(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_end();
    if text.len() <= MAX_CAPTURE {
        return text.to_string();
    }
    let cut = text
        .char_indices()
        .take_while(|(i, _)| *i < MAX_CAPTURE)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    format!("{}\n... (output truncated)", &text[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskrun_core::policy::PolicyStore;
    use taskrun_core::prompt::ApprovalPrompt;
    use taskrun_core::{Decision, ShellKind};

    struct FixedPrompt(Decision);

    impl ApprovalPrompt for FixedPrompt {
        fn ask(&mut self, _command: &str, _description: &str) -> Result<Decision> {
            Ok(self.0)
        }
    }

    fn open_gate() -> PolicyGate {
        let mut store = PolicyStore::new();
        store.set_always_allow(true);
        PolicyGate::new(store, Box::new(FixedPrompt(Decision::Once)))
    }

    fn fixture_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha\nBeta line\n").unwrap();
        std::fs::write(dir.path().join("b.rs"), "fn main() {}\n").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/c.txt"), "beta again\n").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_list_files_depth_zero() {
        let dir = fixture_tree();
        let action = Action::ListFiles { path: dir.path().display().to_string(), depth: 0 };

        let obs = ListFilesHandler.execute(&action, &mut open_gate()).await.unwrap();
        assert!(obs.contains("a.txt"));
        assert!(obs.contains("sub/"));
        assert!(!obs.contains("c.txt"));
    }

    #[tokio::test]
    async fn test_list_files_recurses_with_depth() {
        let dir = fixture_tree();
        let action = Action::ListFiles { path: dir.path().display().to_string(), depth: 1 };

        let obs = ListFilesHandler.execute(&action, &mut open_gate()).await.unwrap();
        assert!(obs.contains("c.txt"));
    }

    #[tokio::test]
    async fn test_list_files_missing_dir_is_observation() {
        let action = Action::ListFiles { path: "/no/such/dir".to_string(), depth: 0 };
        let obs = ListFilesHandler.execute(&action, &mut open_gate()).await.unwrap();
        assert!(obs.starts_with("error:"));
    }

    #[tokio::test]
    async fn test_read_file_truncates_at_budget() {
        let dir = fixture_tree();
        let path = dir.path().join("a.txt").display().to_string();
        let action = Action::ReadFile { path, max_bytes: 5 };

        let obs = ReadFileHandler.execute(&action, &mut open_gate()).await.unwrap();
        assert!(obs.starts_with("alpha"));
        assert!(obs.contains("truncated at 5 bytes"));
    }

    #[tokio::test]
    async fn test_read_file_missing_is_observation() {
        let action = Action::ReadFile { path: "/no/such/file".to_string(), max_bytes: 100 };
        let obs = ReadFileHandler.execute(&action, &mut open_gate()).await.unwrap();
        assert!(obs.starts_with("error:"));
    }

    #[tokio::test]
    async fn test_search_files_case_insensitive_by_default() {
        let dir = fixture_tree();
        let action = Action::SearchFiles {
            pattern: "beta".to_string(),
            path: dir.path().display().to_string(),
            max_results: 50,
            case_sensitive: false,
        };

        let obs = SearchFilesHandler.execute(&action, &mut open_gate()).await.unwrap();
        assert!(obs.contains("a.txt:2"));
        assert!(obs.contains("c.txt:1"));
    }

    #[tokio::test]
    async fn test_search_files_case_sensitive_and_capped() {
        let dir = fixture_tree();
        let action = Action::SearchFiles {
            pattern: "beta".to_string(),
            path: dir.path().display().to_string(),
            max_results: 1,
            case_sensitive: true,
        };

        let obs = SearchFilesHandler.execute(&action, &mut open_gate()).await.unwrap();
        assert!(obs.contains("1 match(es)"));
        assert!(obs.contains("(stopped at max_results)"));
    }

    #[tokio::test]
    async fn test_search_files_bad_pattern_is_observation() {
        let action = Action::SearchFiles {
            pattern: "(unclosed".to_string(),
            path: ".".to_string(),
            max_results: 10,
            case_sensitive: false,
        };
        let obs = SearchFilesHandler.execute(&action, &mut open_gate()).await.unwrap();
        assert!(obs.starts_with("error: invalid pattern"));
    }

    #[tokio::test]
    async fn test_shell_captures_exit_code_and_output() {
        let action = Action::Shell {
            shell: ShellKind::Sh,
            command: "echo out; echo err >&2; exit 3".to_string(),
            cwd: None,
            reason: None,
        };

        let obs = ShellHandler.execute(&action, &mut open_gate()).await.unwrap();
        assert!(obs.contains("exit code: 3"));
        assert!(obs.contains("stdout:\nout"));
        assert!(obs.contains("stderr:\nerr"));
    }

    #[tokio::test]
    async fn test_shell_respects_cwd() {
        let dir = fixture_tree();
        let action = Action::Shell {
            shell: ShellKind::Sh,
            command: "pwd".to_string(),
            cwd: Some(dir.path().display().to_string()),
            reason: None,
        };

        let obs = ShellHandler.execute(&action, &mut open_gate()).await.unwrap();
        let canonical = dir.path().canonicalize().unwrap().display().to_string();
        assert!(obs.contains(&canonical) || obs.contains(&dir.path().display().to_string()));
    }

    #[tokio::test]
    async fn test_shell_denied_and_skipped_do_not_run() {
        let action = Action::Shell {
            shell: ShellKind::Sh,
            command: "echo should-not-run".to_string(),
            cwd: None,
            reason: None,
        };

        let mut gate =
            PolicyGate::new(PolicyStore::new(), Box::new(FixedPrompt(Decision::Never)));
        let obs = ShellHandler.execute(&action, &mut gate).await.unwrap();
        assert!(obs.contains("denied"));

        let mut gate =
            PolicyGate::new(PolicyStore::new(), Box::new(FixedPrompt(Decision::Skip)));
        let obs = ShellHandler.execute(&action, &mut gate).await.unwrap();
        assert!(obs.contains("skipped"));
    }

    #[tokio::test]
    async fn test_shell_prompt_failure_propagates() {
        struct FailingPrompt;
        impl ApprovalPrompt for FailingPrompt {
            fn ask(&mut self, _command: &str, _description: &str) -> Result<Decision> {
                Err(Error::prompt_failed("stdin closed"))
            }
        }

        let action = Action::Shell {
            shell: ShellKind::Sh,
            command: "echo hi".to_string(),
            cwd: None,
            reason: None,
        };

        let mut gate = PolicyGate::new(PolicyStore::new(), Box::new(FailingPrompt));
        let err = ShellHandler.execute(&action, &mut gate).await.unwrap_err();
        assert_eq!(err.kind(), taskrun_error::ErrorKind::PromptFailed);
    }

    #[test]
    fn test_builtin_registry_covers_all_dispatchable_types() {
        let registry = HandlerRegistry::builtin();
        assert_eq!(registry.names(), vec!["list_files", "read_file", "search_files", "shell"]);
        assert!(registry.get("shell").is_some());
        assert!(registry.get("done").is_none());
    }
}
