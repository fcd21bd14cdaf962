//! # Agent Actions
//!
//! The structured instructions decoded from model responses. The model emits
//! one JSON object per turn with a `type` tag plus type-specific fields; the
//! parser in [`crate::parse`] turns unreliable free text into exactly one of
//! these variants.
//!
//! ## Design Philosophy
//! - Exactly one variant per value (serde tagged union)
//! - Every field that has a documented default carries it via serde
//! - Bounds are validated at parse time, never silently clamped

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum directory recursion depth for `list_files`
pub const MAX_LIST_DEPTH: u32 = 3;

/// Default byte budget for `read_file`
pub const DEFAULT_READ_BYTES: u64 = 4000;

/// Maximum byte budget for `read_file`
pub const MAX_READ_BYTES: u64 = 200_000;

/// Default result cap for `search_files`
pub const DEFAULT_SEARCH_RESULTS: usize = 50;

/// An action proposed by the model - the instruction set of the agent loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// List directory contents up to a bounded depth
    ListFiles {
        /// Directory to list
        #[serde(default = "default_path")]
        path: String,
        /// Recursion depth, 0 = the directory itself
        #[serde(default)]
        depth: u32,
    },

    /// Read a file's contents, bounded by a byte budget
    ReadFile {
        /// Path to the file
        path: String,
        /// Maximum bytes to return
        #[serde(default = "default_read_bytes", alias = "maxBytes")]
        max_bytes: u64,
    },

    /// Search for a pattern in files under a directory
    SearchFiles {
        /// Pattern to search for (regular expression)
        pattern: String,
        /// Directory to search in
        #[serde(default = "default_path")]
        path: String,
        /// Maximum number of matches to return
        #[serde(default = "default_search_results", alias = "maxResults")]
        max_results: usize,
        /// Whether matching is case sensitive
        #[serde(default, alias = "caseSensitive")]
        case_sensitive: bool,
    },

    /// Execute a shell command (approval-gated)
    Shell {
        /// Shell to run the command under
        #[serde(default)]
        shell: ShellKind,
        /// The command line to execute
        command: String,
        /// Working directory for the command
        #[serde(default)]
        cwd: Option<String>,
        /// Why the model wants to run this (shown at the approval prompt)
        #[serde(default)]
        reason: Option<String>,
    },

    /// Terminal action - the task is finished
    Done {
        /// Final answer reported to the user
        #[serde(default)]
        result: String,
    },
}

fn default_path() -> String {
    ".".to_string()
}

fn default_read_bytes() -> u64 {
    DEFAULT_READ_BYTES
}

fn default_search_results() -> usize {
    DEFAULT_SEARCH_RESULTS
}

impl Action {
    /// The wire name of this action's type tag
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::ListFiles { .. } => "list_files",
            Action::ReadFile { .. } => "read_file",
            Action::SearchFiles { .. } => "search_files",
            Action::Shell { .. } => "shell",
            Action::Done { .. } => "done",
        }
    }

    /// Check if this action terminates the task
    pub fn is_terminal(&self) -> bool {
        matches!(self, Action::Done { .. })
    }

    /// Check if this action requires command approval before execution
    pub fn needs_approval(&self) -> bool {
        matches!(self, Action::Shell { .. })
    }

    /// Format action into (name, details) for progress printing
    pub fn format_parts(&self) -> (&'static str, String) {
        match self {
            Action::ListFiles { path, depth } => ("list_files", format!("{} (depth {})", path, depth)),
            Action::ReadFile { path, max_bytes } => ("read_file", format!("{} (≤{} bytes)", path, max_bytes)),
            Action::SearchFiles { pattern, path, .. } => {
                ("search_files", format!("/{}/ in {}", truncate(pattern, 30), path))
            }
            Action::Shell { command, .. } => ("shell", format!("`{}`", truncate(command, 50))),
            Action::Done { result } => ("done", format!("\"{}\"", truncate(result, 40))),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, details) = self.format_parts();
        if details.is_empty() {
            write!(f, "{}", name)
        } else {
            write!(f, "{} {}", name, details)
        }
    }
}

/// The shells a command may run under - a closed set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellKind {
    Sh,
    Bash,
    Zsh,
    Fish,
    Powershell,
    Cmd,
}

impl ShellKind {
    /// The default shell on the current platform
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            ShellKind::Powershell
        } else {
            ShellKind::Bash
        }
    }

    /// The shell's executable name
    pub fn program(&self) -> &'static str {
        match self {
            ShellKind::Sh => "sh",
            ShellKind::Bash => "bash",
            ShellKind::Zsh => "zsh",
            ShellKind::Fish => "fish",
            ShellKind::Powershell => "powershell",
            ShellKind::Cmd => "cmd",
        }
    }

    /// The flag that introduces an inline command string
    pub fn command_flag(&self) -> &'static str {
        match self {
            ShellKind::Powershell => "-Command",
            ShellKind::Cmd => "/C",
            _ => "-c",
        }
    }

    /// Parse a wire name into a shell kind
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sh" => Some(ShellKind::Sh),
            "bash" => Some(ShellKind::Bash),
            "zsh" => Some(ShellKind::Zsh),
            "fish" => Some(ShellKind::Fish),
            "powershell" | "pwsh" => Some(ShellKind::Powershell),
            "cmd" => Some(ShellKind::Cmd),
            _ => None,
        }
    }
}

impl Default for ShellKind {
    fn default() -> Self {
        Self::platform_default()
    }
}

impl fmt::Display for ShellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program())
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let cut = s
            .char_indices()
            .take_while(|(i, _)| *i < max.saturating_sub(1))
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}…", &s[..cut])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_serialization() {
        let action = Action::Shell {
            shell: ShellKind::Bash,
            command: "ls -la".to_string(),
            cwd: None,
            reason: Some("inspect workspace".to_string()),
        };

        let json = serde_json::to_string_pretty(&action).unwrap();
        assert!(json.contains("\"type\": \"shell\""));
        assert!(json.contains("\"shell\": \"bash\""));

        let parsed: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(action, parsed);
    }

    #[test]
    fn test_defaults_applied_on_decode() {
        let action: Action = serde_json::from_str(r#"{"type": "list_files"}"#).unwrap();
        assert_eq!(
            action,
            Action::ListFiles { path: ".".to_string(), depth: 0 }
        );

        let action: Action = serde_json::from_str(r#"{"type": "read_file", "path": "a.rs"}"#).unwrap();
        assert_eq!(
            action,
            Action::ReadFile { path: "a.rs".to_string(), max_bytes: DEFAULT_READ_BYTES }
        );
    }

    #[test]
    fn test_camel_case_aliases() {
        let action: Action =
            serde_json::from_str(r#"{"type": "read_file", "path": "a.rs", "maxBytes": 100}"#)
                .unwrap();
        assert_eq!(action, Action::ReadFile { path: "a.rs".to_string(), max_bytes: 100 });

        let action: Action = serde_json::from_str(
            r#"{"type": "search_files", "pattern": "fn main", "maxResults": 5, "caseSensitive": true}"#,
        )
        .unwrap();
        match action {
            Action::SearchFiles { max_results, case_sensitive, .. } => {
                assert_eq!(max_results, 5);
                assert!(case_sensitive);
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_is_terminal() {
        assert!(Action::Done { result: "ok".to_string() }.is_terminal());
        assert!(!Action::ListFiles { path: ".".to_string(), depth: 0 }.is_terminal());
    }

    #[test]
    fn test_needs_approval() {
        let shell = Action::Shell {
            shell: ShellKind::Sh,
            command: "echo hi".to_string(),
            cwd: None,
            reason: None,
        };
        assert!(shell.needs_approval());
        assert!(!Action::ReadFile { path: "a".to_string(), max_bytes: 1 }.needs_approval());
    }

    #[test]
    fn test_shell_kind_names() {
        assert_eq!(ShellKind::from_name("BASH"), Some(ShellKind::Bash));
        assert_eq!(ShellKind::from_name("pwsh"), Some(ShellKind::Powershell));
        assert_eq!(ShellKind::from_name("ksh"), None);
        assert_eq!(ShellKind::Cmd.command_flag(), "/C");
    }
}
