//! # Action Schema for the Model
//!
//! A structured description of the agent's action set that is rendered into
//! the system prompt. The model uses this to emit valid action objects; the
//! CLI renders the same table for humans via `schema_summary`.

/// Specification of one action for prompt rendering
pub struct ActionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [&'static str],
    pub example: &'static str,
}

/// The action set, in the order it is presented to the model
pub fn action_specs() -> &'static [ActionSpec] {
    &[
        ActionSpec {
            name: "list_files",
            description: "List directory contents",
            params: &["path?: string (default \".\")", "depth?: number (0-3, default 0)"],
            example: r#"{"type": "list_files", "path": "src", "depth": 1}"#,
        },
        ActionSpec {
            name: "read_file",
            description: "Read a file's contents",
            params: &["path: string", "max_bytes?: number (1-200000, default 4000)"],
            example: r#"{"type": "read_file", "path": "Cargo.toml"}"#,
        },
        ActionSpec {
            name: "search_files",
            description: "Search for a regex pattern in files",
            params: &[
                "pattern: string",
                "path?: string (default \".\")",
                "max_results?: number (default 50)",
                "case_sensitive?: bool (default false)",
            ],
            example: r#"{"type": "search_files", "pattern": "fn main", "path": "src"}"#,
        },
        ActionSpec {
            name: "shell",
            description: "Run a shell command (requires human approval)",
            params: &[
                "command: string",
                "shell?: sh|bash|zsh|fish|powershell|cmd",
                "cwd?: string",
                "reason?: string (shown at the approval prompt)",
            ],
            example: r#"{"type": "shell", "command": "cargo check", "reason": "verify build"}"#,
        },
        ActionSpec {
            name: "done",
            description: "Finish the task and report the result",
            params: &["result?: string"],
            example: r#"{"type": "done", "result": "The package has 4 dependencies."}"#,
        },
    ]
}

/// Render the system prompt given to the model at the start of every task.
pub fn system_prompt() -> String {
    let mut out = String::new();

    out.push_str(
        "You are a command-line agent. You solve the user's task step by step \
         by emitting actions; after each action you receive an observation \
         with its result.\n\n",
    );
    out.push_str(
        "Reply with EXACTLY ONE JSON object per turn - no prose, no markdown. \
         The object has a \"type\" field plus the fields of that action:\n\n",
    );

    for spec in action_specs() {
        out.push_str(&format!("- **{}**: {}\n", spec.name, spec.description));
        out.push_str(&format!("  - Params: {}\n", spec.params.join(", ")));
        out.push_str(&format!("  - Example: `{}`\n", spec.example));
    }

    out.push_str(
        "\nObservations arrive as messages of the form \
         `observation:<type>` followed by the payload. Command failures \
         (non-zero exit codes, missing files) come back as observations too - \
         read them and adapt.\n\n\
         When the task is complete, emit a `done` action with the final \
         answer in `result`.\n",
    );

    out
}

/// Human-readable action reference for the CLI
pub fn schema_summary() -> String {
    let mut out = String::new();
    out.push_str("Actions the model may emit:\n\n");
    for spec in action_specs() {
        out.push_str(&format!("{} - {}\n", spec.name, spec.description));
        for param in spec.params {
            out.push_str(&format!("    {}\n", param));
        }
        out.push_str(&format!("    e.g. {}\n\n", spec.example));
    }
    out
}
