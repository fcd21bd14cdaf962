//! # Command approval policy
//!
//! Cached approval rules for model-proposed commands. A store holds an
//! ordered list of `*`-wildcard rules plus a runtime-only "always allow"
//! override; the first rule whose pattern matches the command wins.
//!
//! First-match is a deliberate quirk callers must keep in mind: with
//! overlapping patterns, rule order - not specificity - decides.
//!
//! Persistence is a pretty-printed JSON array at a caller-chosen path. There
//! is no autosave; the embedding program loads once at start and saves once
//! at shutdown.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use taskrun_error::{Error, ErrorKind, Result};

/// The outcome of an approval check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Allow this one invocation; nothing is cached
    Once,
    /// Allow, and cache a rule for the exact command
    Always,
    /// Deny, and cache a rule for the exact command
    Never,
    /// Skip this invocation; nothing is cached
    Skip,
}

impl Decision {
    /// Whether the gated command may run under this decision
    pub fn allows_execution(&self) -> bool {
        matches!(self, Decision::Once | Decision::Always)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Decision::Once => "once",
            Decision::Always => "always",
            Decision::Never => "never",
            Decision::Skip => "skip",
        };
        write!(f, "{}", s)
    }
}

/// A cached approval rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Command pattern; `*` matches any substring, everything else is literal
    pub pattern: String,
    /// Cached decision for matching commands
    pub decision: Decision,
}

/// Ordered rule list plus the global allow override.
///
/// Owned by the embedding process and handed to the agent by reference for
/// the duration of a task; not designed for concurrent mutation.
#[derive(Debug, Clone, Default)]
pub struct PolicyStore {
    rules: Vec<Rule>,
    always_allow: bool,
}

impl PolicyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from disk.
    ///
    /// A missing file yields an empty store; a malformed file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(Error::from(e)
                    .with_operation("policy::load")
                    .with_context("path", path.display().to_string()));
            }
        };

        let rules: Vec<Rule> = serde_json::from_str(&content).map_err(|e| {
            Error::new(ErrorKind::SerializationFailed, e.to_string())
                .with_operation("policy::load")
                .with_context("path", path.display().to_string())
                .set_source(e)
        })?;

        Ok(Self { rules, always_allow: false })
    }

    /// Save the rule list to disk, preserving insertion order.
    ///
    /// The `always_allow` override is runtime state and is not persisted.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::from(e)
                        .with_operation("policy::save")
                        .with_context("path", path.display().to_string())
                })?;
            }
        }

        let content = serde_json::to_string_pretty(&self.rules).map_err(|e| {
            Error::new(ErrorKind::SerializationFailed, e.to_string())
                .with_operation("policy::save")
                .set_source(e)
        })?;

        std::fs::write(path, content).map_err(|e| {
            Error::from(e)
                .with_operation("policy::save")
                .with_context("path", path.display().to_string())
        })?;
        Ok(())
    }

    /// Add a rule, overwriting any existing rule with the identical pattern.
    pub fn add(&mut self, pattern: impl Into<String>, decision: Decision) {
        let pattern = pattern.into();
        if let Some(existing) = self.rules.iter_mut().find(|r| r.pattern == pattern) {
            existing.decision = decision;
        } else {
            self.rules.push(Rule { pattern, decision });
        }
    }

    /// Find the cached decision for a command, if any.
    ///
    /// Rules are scanned in insertion order; the first match wins.
    pub fn match_command(&self, command: &str) -> Option<Decision> {
        self.rules
            .iter()
            .find(|rule| compile_pattern(&rule.pattern).is_match(command))
            .map(|rule| rule.decision)
    }

    /// Set the global allow override
    pub fn set_always_allow(&mut self, always_allow: bool) {
        self.always_allow = always_allow;
    }

    /// Whether the global allow override is set
    pub fn always_allow(&self) -> bool {
        self.always_allow
    }

    /// The stored rules, in match order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Number of stored rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the store has no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Compile a `*`-wildcard pattern into an anchored regex.
///
/// Everything except `*` is matched literally; `*` becomes `.*`. Escaping
/// makes the compiled expression always valid.
fn compile_pattern(pattern: &str) -> Regex {
    let escaped = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    let anchored = format!("^{}$", escaped);
    Regex::new(&anchored).expect("escaped pattern is always a valid regex")
}
