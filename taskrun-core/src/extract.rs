//! # Best-effort JSON extraction from model text
//!
//! Model output is adversarial input: the JSON object we need may arrive
//! bare, wrapped in prose, inside a markdown fence, or surrounded by junk on
//! both sides. This module builds an ordered list of decode candidates and
//! leaves the deciding to the parser - it never judges validity itself.
//!
//! Candidate order:
//! 1. the trimmed raw text
//! 2. the body of the first fenced code block (```json or bare ```)
//! 3. every `{..}` substring formed by pairing each open-brace position
//!    (scanned forward) with each later close-brace position (scanned
//!    backward)

use std::collections::HashSet;

/// Build the ordered, deduplicated list of JSON decode candidates for `raw`.
pub fn decode_candidates(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    let mut push = |s: &str| {
        let s = s.trim();
        if !s.is_empty() && seen.insert(s.to_string()) {
            out.push(s.to_string());
        }
    };

    push(raw);

    if let Some(block) = fenced_block(raw) {
        push(&block);
    }

    // Brace-scan cross product. Braces are single ASCII bytes, so slicing at
    // their byte offsets is always on a char boundary.
    let opens: Vec<usize> = raw.match_indices('{').map(|(i, _)| i).collect();
    let closes: Vec<usize> = raw.match_indices('}').map(|(i, _)| i).collect();

    for &open in &opens {
        for &close in closes.iter().rev() {
            if close > open {
                push(&raw[open..=close]);
            }
        }
    }

    out
}

/// Extract the body of the first fenced code block, if any.
///
/// Accepts ```json and plain ``` fences; a language tag on the opening line
/// is stripped.
pub fn fenced_block(raw: &str) -> Option<String> {
    let body = if let Some(rest) = raw.split("```json").nth(1) {
        rest.split("```").next()?
    } else {
        raw.split("```").nth(1)?
    };

    let body = body.trim();
    let body = body.strip_prefix("json").map(str::trim_start).unwrap_or(body);
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_object_is_first_candidate() {
        let candidates = decode_candidates(r#"{"type": "done"}"#);
        assert_eq!(candidates[0], r#"{"type": "done"}"#);
    }

    #[test]
    fn test_fenced_json_block() {
        let raw = "Sure! ```json\n{\"type\": \"shell\", \"command\": \"ls\"}\n```";
        let block = fenced_block(raw).unwrap();
        assert_eq!(block, "{\"type\": \"shell\", \"command\": \"ls\"}");
    }

    #[test]
    fn test_fenced_block_without_language_tag() {
        let raw = "```\n{\"a\": 1}\n```";
        assert_eq!(fenced_block(raw).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_brace_scan_recovers_wrapped_object() {
        let raw = "I'll run that now: {\"type\": \"shell\", \"command\": \"ls\"} - let me know!";
        let candidates = decode_candidates(raw);
        assert!(candidates
            .iter()
            .any(|c| c == "{\"type\": \"shell\", \"command\": \"ls\"}"));
    }

    #[test]
    fn test_brace_scan_covers_nested_objects() {
        let raw = r#"prefix {"outer": {"inner": 1}} suffix"#;
        let candidates = decode_candidates(raw);
        assert!(candidates.iter().any(|c| c == r#"{"outer": {"inner": 1}}"#));
        assert!(candidates.iter().any(|c| c == r#"{"inner": 1}}"#));
        assert!(candidates.iter().any(|c| c == r#"{"inner": 1}"#));
    }

    #[test]
    fn test_no_braces_yields_raw_only() {
        let candidates = decode_candidates("just some prose, no json here");
        assert_eq!(candidates, vec!["just some prose, no json here".to_string()]);
    }

    #[test]
    fn test_empty_input() {
        assert!(decode_candidates("").is_empty());
        assert!(decode_candidates("   \n  ").is_empty());
    }

    #[test]
    fn test_candidates_are_deduplicated() {
        let raw = r#"{"a": 1}"#;
        let candidates = decode_candidates(raw);
        // trimmed raw and the single brace pair are identical
        assert_eq!(candidates.len(), 1);
    }

    // The scan is the recovery path for adversarial input - exercise it with
    // shapes models actually produce.
    #[test]
    fn test_adversarial_inputs_never_panic() {
        let cases = [
            "}{",
            "{{{{",
            "}}}}",
            "{\"unterminated\": ",
            "text } before { reversed",
            "multi {\"a\":1} and {\"b\":2} objects",
            "🦀 {\"emoji\": \"🚀\"} 🦀",
            "``` ```",
            "```json```",
            "{\"nested\": {\"deep\": {\"deeper\": {}}}}",
        ];
        for case in cases {
            let _ = decode_candidates(case);
            let _ = fenced_block(case);
        }
    }

    #[test]
    fn test_multiple_objects_both_recoverable() {
        let raw = r#"first {"a": 1} then {"b": 2}"#;
        let candidates = decode_candidates(raw);
        assert!(candidates.iter().any(|c| c == r#"{"a": 1}"#));
        assert!(candidates.iter().any(|c| c == r#"{"b": 2}"#));
    }
}
