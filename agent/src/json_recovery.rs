//! Heuristic recovery of malformed LLM JSON output.
//!
//! Documented, feature-flagged (see `Agent::json_recovery`), pinned by the
//! tests below. Not a general JSON fixer: it assumes the model was asked for
//! one JSON object and got cut off or fenced, not that it emitted garbage.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JsonRecoveryError {
    #[error("no JSON object found in response")]
    NoJson,
}

/// Strips Markdown code fences and an optional leading `json` language tag.
fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let after_lang = after_open.strip_prefix("json").unwrap_or(after_open);
    let after_lang = after_lang.trim_start_matches(['\n', '\r']);
    match after_lang.rfind("```") {
        Some(end) => after_lang[..end].trim(),
        None => after_lang.trim(),
    }
}

/// Truncates after the last complete field — the last `,` that precedes the
/// last `"` — then appends closing braces/brackets to balance what was
/// opened, producing the longest valid JSON prefix.
fn apply_common_issue_fix(s: &str) -> String {
    let last_quote = s.rfind('"');
    let cut_at = last_quote.and_then(|q| s[..q].rfind(',')).unwrap_or(0);
    let truncated = if cut_at > 0 { &s[..cut_at] } else { s };
    let mut out = truncated.trim_end().trim_end_matches(',').to_string();

    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for c in out.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => stack.push('}'),
            '[' if !in_string => stack.push(']'),
            '}' | ']' if !in_string => {
                stack.pop();
            }
            _ => {}
        }
    }
    if in_string {
        out.push('"');
    }
    while let Some(close) = stack.pop() {
        out.push(close);
    }
    out
}

/// Recovers a best-effort JSON object slice from raw model output.
/// Idempotent on input that is already a complete, balanced JSON object.
pub fn recover_json(raw: &str) -> Result<String, JsonRecoveryError> {
    let stripped = strip_code_fences(raw);
    let first = stripped.find('{').ok_or(JsonRecoveryError::NoJson)?;
    let last = stripped.rfind('}').ok_or(JsonRecoveryError::NoJson)?;
    if last < first {
        return Err(JsonRecoveryError::NoJson);
    }

    let candidate = stripped[first..].trim_end();
    if candidate.ends_with('}') {
        return Ok(candidate.to_string());
    }
    Ok(apply_common_issue_fix(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_valid_json_unchanged() {
        let input = r#"{"file_path":"a.go","has_issues":false,"comments":[]}"#;
        assert_eq!(recover_json(input).unwrap(), input);
    }

    #[test]
    fn is_idempotent_on_valid_json() {
        let input = r#"{"a":1,"b":[1,2,3]}"#;
        let once = recover_json(input).unwrap();
        let twice = recover_json(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn strips_markdown_fences_with_json_tag() {
        let input = "```json\n{\"a\":1}\n```";
        assert_eq!(recover_json(input).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn strips_bare_fences() {
        let input = "```\n{\"a\":1}\n```";
        assert_eq!(recover_json(input).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn no_braces_is_no_json() {
        assert_eq!(recover_json("sure, here you go").unwrap_err(), JsonRecoveryError::NoJson);
    }

    #[test]
    fn recovers_truncated_object_from_scenario_e() {
        let input = r#"{"file":"a.go","comments":[{"line":10,"title":"x""#;
        let recovered = recover_json(input).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&recovered).unwrap();
        assert_eq!(parsed["file"], "a.go");
        assert_eq!(parsed["comments"][0]["line"], 10);
    }

    #[test]
    fn reverse_brace_order_is_no_json() {
        assert_eq!(recover_json("} malformed {").unwrap_err(), JsonRecoveryError::NoJson);
    }
}
