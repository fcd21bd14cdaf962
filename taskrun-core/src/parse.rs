//! # Action parsing and normalization
//!
//! Turns raw model text into a validated [`Action`]. The pipeline is:
//! candidate extraction ([`crate::extract`]) -> generic JSON decode ->
//! normalization (alias remap, then ordered type-inference rules over the
//! untyped map) -> per-type validation with bounded defaulting. The first
//! candidate that survives the whole pipeline wins; a candidate failing
//! validation is rejected, not fatal.
//!
//! Normalization runs over a `serde_json::Map` view on purpose: each rule is
//! a small pure function that can be tested on its own, and the strongly
//! typed `Action` is only produced after all rules have run.

use crate::action::{Action, MAX_LIST_DEPTH, MAX_READ_BYTES};
use crate::extract;
use serde_json::{Map, Value};
use taskrun_error::{Error, ErrorKind, Result};

/// Parse raw model output into a validated action.
///
/// Pure function over text: no side effects, no state.
pub fn parse_action(raw: &str) -> Result<Action> {
    let candidates = extract::decode_candidates(raw);
    let mut rejected = 0usize;

    for candidate in &candidates {
        let Ok(value) = serde_json::from_str::<Value>(candidate) else {
            continue;
        };
        let Value::Object(map) = value else {
            continue;
        };
        match normalize_and_validate(map) {
            Ok(action) => return Ok(action),
            Err(_) => rejected += 1,
        }
    }

    Err(Error::parse_failed("no valid action found")
        .with_operation("parse::parse_action")
        .with_context("candidates", candidates.len().to_string())
        .with_context("rejected", rejected.to_string()))
}

/// Run normalization then validation on one decoded candidate.
pub fn normalize_and_validate(mut map: Map<String, Value>) -> Result<Action> {
    remap_type_alias(&mut map);
    if !map.contains_key("type") {
        infer_type(&mut map);
    }
    validate(map)
}

// =============================================================================
// Normalization rules (ordered, each independently testable)
// =============================================================================

/// Rule 1: remap legacy/alternate type names onto the canonical set.
pub fn remap_type_alias(map: &mut Map<String, Value>) {
    let Some(type_name) = map.get("type").and_then(Value::as_str) else {
        return;
    };

    let canonical = match type_name {
        "list-files" | "listfiles" | "list_dir" | "list-dir" => Some("list_files"),
        "get-file" | "get_file" | "read-file" | "readfile" | "cat" => Some("read_file"),
        "search-files" | "searchfiles" | "grep" | "find" => Some("search_files"),
        "run-command" | "run_command" | "exec" | "execute" | "command" => Some("shell"),
        "result" | "finish" | "complete" | "final" => Some("done"),
        _ => None,
    };

    let Some(canonical) = canonical else { return };
    map.insert("type".to_string(), Value::String(canonical.to_string()));

    // "result"-style replies carry the answer under `text` or `result`.
    if canonical == "done" && !map.contains_key("result") {
        if let Some(text) = map.get("text").cloned() {
            map.insert("result".to_string(), text);
        }
    }
}

/// Rule 2: infer `shell` from a `command` field.
pub fn infer_shell(map: &Map<String, Value>) -> bool {
    map.get("command").map(|v| !v.is_null()).unwrap_or(false)
}

/// Rule 3: infer `done` from a `result` field.
pub fn infer_done(map: &Map<String, Value>) -> bool {
    map.get("result").map(|v| !v.is_null()).unwrap_or(false)
}

/// Rule 4: infer `read_file` vs `list_files` from a `path` field.
///
/// A path is file-like when it has a trailing extension, an interior dot, or
/// is accompanied by a byte budget field.
pub fn infer_from_path(map: &Map<String, Value>) -> Option<&'static str> {
    let path = map.get("path")?.as_str()?;
    let has_budget = map.contains_key("max_bytes") || map.contains_key("maxBytes");
    if has_budget || path_looks_file_like(path) {
        Some("read_file")
    } else {
        Some("list_files")
    }
}

/// Apply the inference rules in order, writing the winner into `type`.
pub fn infer_type(map: &mut Map<String, Value>) {
    let inferred = if infer_shell(map) {
        Some("shell")
    } else if infer_done(map) {
        Some("done")
    } else {
        infer_from_path(map)
    };

    if let Some(type_name) = inferred {
        map.insert("type".to_string(), Value::String(type_name.to_string()));
    }
}

/// Heuristic for "this path names a file, not a directory".
///
/// True when the final component carries an extension, or any component has
/// a dot that is neither leading nor trailing.
pub fn path_looks_file_like(path: &str) -> bool {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let Some(dot) = name.rfind('.') else {
        return false;
    };
    dot > 0 && dot < name.len() - 1
}

// =============================================================================
// Validation
// =============================================================================

/// Decode the normalized map into a typed action and enforce bounds.
///
/// Out-of-range values are errors, never clamped.
pub fn validate(map: Map<String, Value>) -> Result<Action> {
    let action: Action = serde_json::from_value(Value::Object(map)).map_err(|e| {
        Error::validation_failed(e.to_string()).with_operation("parse::validate")
    })?;

    match &action {
        Action::ListFiles { path, depth } => {
            if path.is_empty() {
                return Err(field_error("list_files", "path must not be empty"));
            }
            if *depth > MAX_LIST_DEPTH {
                return Err(field_error(
                    "list_files",
                    format!("depth {} out of range 0..={}", depth, MAX_LIST_DEPTH),
                ));
            }
        }
        Action::ReadFile { path, max_bytes } => {
            if path.is_empty() {
                return Err(field_error("read_file", "path must not be empty"));
            }
            if *max_bytes < 1 || *max_bytes > MAX_READ_BYTES {
                return Err(field_error(
                    "read_file",
                    format!("max_bytes {} out of range 1..={}", max_bytes, MAX_READ_BYTES),
                ));
            }
        }
        Action::SearchFiles { pattern, .. } => {
            if pattern.is_empty() {
                return Err(field_error("search_files", "pattern must not be empty"));
            }
        }
        Action::Shell { command, .. } => {
            if command.trim().is_empty() {
                return Err(field_error("shell", "command must not be empty"));
            }
        }
        Action::Done { .. } => {}
    }

    Ok(action)
}

fn field_error(action: &'static str, message: impl Into<String>) -> Error {
    Error::new(ErrorKind::ValidationFailed, message)
        .with_operation("parse::validate")
        .with_context("action_type", action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ShellKind, DEFAULT_READ_BYTES};
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {:?}", other),
        }
    }

    // ------------------------------------------------------------------
    // parse_action end to end
    // ------------------------------------------------------------------

    #[test]
    fn test_bare_json_object() {
        let action = parse_action(r#"{"type": "shell", "command": "echo hi"}"#).unwrap();
        match action {
            Action::Shell { command, .. } => assert_eq!(command, "echo hi"),
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_fenced_block_with_prose() {
        let raw = "Sure! ```json\n{\"type\":\"shell\",\"command\":\"ls\",\"shell\":\"bash\"}\n```";
        let action = parse_action(raw).unwrap();
        assert_eq!(
            action,
            Action::Shell {
                shell: ShellKind::Bash,
                command: "ls".to_string(),
                cwd: None,
                reason: None,
            }
        );
    }

    #[test]
    fn test_prose_wrapped_object_fields_unchanged() {
        let raw = r#"Let me read that file first: {"type": "read_file", "path": "src/main.rs", "max_bytes": 1234} ok?"#;
        let action = parse_action(raw).unwrap();
        assert_eq!(
            action,
            Action::ReadFile { path: "src/main.rs".to_string(), max_bytes: 1234 }
        );
    }

    #[test]
    fn test_no_valid_action() {
        let err = parse_action("I'm not sure what to do next.").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailed);
        assert!(err.message().contains("no valid action found"));
    }

    #[test]
    fn test_invalid_candidate_skipped_for_later_valid_one() {
        // The first brace pair spans both objects and fails to decode; the
        // scan still reaches the valid inner object.
        let raw = r#"{"type": "bogus_action"} but really: {"type": "done", "result": "42"}"#;
        let action = parse_action(raw).unwrap();
        assert_eq!(action, Action::Done { result: "42".to_string() });
    }

    // ------------------------------------------------------------------
    // Alias remap
    // ------------------------------------------------------------------

    #[test]
    fn test_alias_list_files() {
        let mut map = obj(json!({"type": "list-files", "path": "src"}));
        remap_type_alias(&mut map);
        assert_eq!(map["type"], json!("list_files"));
    }

    #[test]
    fn test_alias_run_command_gets_default_shell() {
        let action = parse_action(r#"{"type": "run-command", "command": "make"}"#).unwrap();
        match action {
            Action::Shell { shell, command, .. } => {
                assert_eq!(shell, ShellKind::platform_default());
                assert_eq!(command, "make");
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_alias_result_pulls_text_field() {
        let action = parse_action(r#"{"type": "result", "text": "all done"}"#).unwrap();
        assert_eq!(action, Action::Done { result: "all done".to_string() });
    }

    #[test]
    fn test_alias_result_prefers_result_field() {
        let action =
            parse_action(r#"{"type": "result", "result": "a", "text": "b"}"#).unwrap();
        assert_eq!(action, Action::Done { result: "a".to_string() });
    }

    // ------------------------------------------------------------------
    // Type inference rules
    // ------------------------------------------------------------------

    #[test]
    fn test_infer_shell_from_command() {
        let action = parse_action(r#"{"command": "echo hi"}"#).unwrap();
        match action {
            Action::Shell { shell, command, .. } => {
                assert_eq!(command, "echo hi");
                assert_eq!(shell, ShellKind::platform_default());
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_infer_done_from_result() {
        let action = parse_action(r#"{"result": "finished"}"#).unwrap();
        assert_eq!(action, Action::Done { result: "finished".to_string() });
    }

    #[test]
    fn test_infer_read_file_from_file_like_path() {
        let action = parse_action(r#"{"path": "test.go"}"#).unwrap();
        assert_eq!(
            action,
            Action::ReadFile { path: "test.go".to_string(), max_bytes: DEFAULT_READ_BYTES }
        );
    }

    #[test]
    fn test_infer_list_files_from_directory_path() {
        let action = parse_action(r#"{"path": "./src"}"#).unwrap();
        assert_eq!(action, Action::ListFiles { path: "./src".to_string(), depth: 0 });
    }

    #[test]
    fn test_infer_read_file_from_byte_budget() {
        let action = parse_action(r#"{"path": "Makefile2", "maxBytes": 100}"#).unwrap();
        assert_eq!(action, Action::ReadFile { path: "Makefile2".to_string(), max_bytes: 100 });
    }

    #[test]
    fn test_null_command_does_not_infer_shell() {
        let action = parse_action(r#"{"command": null, "result": "done"}"#).unwrap();
        assert_eq!(action, Action::Done { result: "done".to_string() });
    }

    #[test]
    fn test_command_wins_over_result() {
        let action = parse_action(r#"{"command": "ls", "result": "x"}"#).unwrap();
        assert_eq!(action.type_name(), "shell");
    }

    #[test]
    fn test_path_file_likeness() {
        assert!(path_looks_file_like("main.rs"));
        assert!(path_looks_file_like("src/lib.rs"));
        assert!(path_looks_file_like("a.b.c"));
        assert!(!path_looks_file_like("./src"));
        assert!(!path_looks_file_like(".hidden"));
        assert!(!path_looks_file_like("trailing."));
        assert!(!path_looks_file_like("src/bin"));
    }

    // ------------------------------------------------------------------
    // Validation bounds
    // ------------------------------------------------------------------

    #[test]
    fn test_depth_out_of_range_is_error_not_clamped() {
        let err = validate(obj(json!({"type": "list_files", "depth": 4}))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert!(err.message().contains("depth"));
    }

    #[test]
    fn test_max_bytes_out_of_range_is_error_not_clamped() {
        let err = validate(obj(json!({"type": "read_file", "path": "a", "max_bytes": 0})))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);

        let err = validate(obj(json!({"type": "read_file", "path": "a", "max_bytes": 200_001})))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    }

    #[test]
    fn test_missing_required_field_rejected() {
        assert!(validate(obj(json!({"type": "read_file"}))).is_err());
        assert!(validate(obj(json!({"type": "shell"}))).is_err());
        assert!(validate(obj(json!({"type": "search_files", "path": "src"}))).is_err());
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(validate(obj(json!({"type": "copy_file", "src": "a", "dst": "b"}))).is_err());
    }

    #[test]
    fn test_search_defaults() {
        let action =
            validate(obj(json!({"type": "search_files", "pattern": "TODO"}))).unwrap();
        assert_eq!(
            action,
            Action::SearchFiles {
                pattern: "TODO".to_string(),
                path: ".".to_string(),
                max_results: 50,
                case_sensitive: false,
            }
        );
    }

    #[test]
    fn test_done_result_defaults_to_empty() {
        let action = validate(obj(json!({"type": "done"}))).unwrap();
        assert_eq!(action, Action::Done { result: String::new() });
    }

    #[test]
    fn test_unknown_shell_kind_rejected() {
        assert!(validate(obj(json!({"type": "shell", "command": "ls", "shell": "ksh"})))
            .is_err());
    }
}
