//! Skill token normalization and the loose skill matcher.
//!
//! Every place that compares skills (job creation, job update, job listing and
//! quiz matching) goes through [`normalize`] and [`matches`], so a token means
//! the same thing everywhere.

use std::collections::HashSet;

use serde_json::Value;

/// Lowercases `token` and drops every character outside `[a-z0-9]`.
pub fn normalize(token: &str) -> String {
    token
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit())
        .collect()
}

/// Normalizes a token set, dropping empties and duplicates while keeping the
/// first-seen order.
pub fn normalize_set<I, S>(tokens: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    tokens
        .into_iter()
        .map(|token| normalize(token.as_ref()))
        .filter(|token| !token.is_empty() && seen.insert(token.clone()))
        .collect()
}

/// True when some requested token contains, or is contained in, some candidate
/// token after normalization. "react" matches "ReactJS" and "java" matches
/// "JavaScript"; the match trades precision for recall.
pub fn matches<R, C>(requested: R, candidate: C) -> bool
where
    R: IntoIterator,
    R::Item: AsRef<str>,
    C: IntoIterator,
    C::Item: AsRef<str>,
{
    let requested = normalize_set(requested);
    if requested.is_empty() {
        return false;
    }
    let candidate = normalize_set(candidate);
    matches_normalized(&requested, &candidate)
}

/// [`matches`] for token sets that already went through [`normalize_set`].
pub fn matches_normalized(requested: &[String], candidate: &[String]) -> bool {
    requested.iter().any(|req| {
        candidate
            .iter()
            .any(|cand| cand.contains(req.as_str()) || req.contains(cand.as_str()))
    })
}

/// Turns free-text skill input into display tokens.
///
/// Accepts a JSON array of values, a JSON-encoded array inside a string, or a
/// comma-separated string. Tokens are trimmed; tokens that normalize to nothing
/// and exact duplicates are dropped.
pub fn skill_tokens(raw: &Value) -> Vec<String> {
    let mut tokens = Vec::new();
    collect_tokens(raw, &mut tokens, true);

    let mut seen = HashSet::new();
    tokens
        .into_iter()
        .filter(|token| !normalize(token).is_empty() && seen.insert(token.clone()))
        .collect()
}

/// Splits a comma-separated string into skill tokens.
pub fn split_skills(raw: &str) -> Vec<String> {
    skill_tokens(&Value::String(raw.to_string()))
}

fn collect_tokens(raw: &Value, out: &mut Vec<String>, top_level: bool) {
    match raw {
        Value::Array(items) if top_level => {
            for item in items {
                collect_tokens(item, out, false);
            }
        }
        Value::String(text) if top_level => {
            if let Ok(parsed @ Value::Array(_)) = serde_json::from_str::<Value>(text) {
                collect_tokens(&parsed, out, true);
                return;
            }
            out.extend(
                text.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(str::to_string),
            );
        }
        Value::String(text) => {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        }
        Value::Number(number) => out.push(number.to_string()),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("Node.js"), "nodejs");
        assert_eq!(normalize("  C++ "), "c");
        assert_eq!(normalize("!!!"), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn substring_containment_is_symmetric() {
        assert!(matches(["react"], ["reactjs"]));
        assert!(matches(["ReactJS"], ["react"]));
        assert!(matches(["java"], ["javascript"]));
        assert!(matches(["React"], ["ReactJS", "MongoDB"]));
        assert!(!matches(["python"], ["rust", "go"]));
    }

    #[test]
    fn empty_requested_set_never_matches() {
        assert!(!matches(Vec::<String>::new(), ["react"]));
        assert!(!matches(["  ", "!!"], ["react"]));
    }

    #[test]
    fn normalize_set_dedupes_after_normalization() {
        let set = normalize_set(["React", "react", "Re-act", ""]);
        assert_eq!(set, vec!["react".to_string()]);
    }

    #[test]
    fn skill_tokens_accept_every_input_shape() {
        assert_eq!(
            skill_tokens(&json!("React, Node.js ,,")),
            vec!["React", "Node.js"]
        );
        assert_eq!(skill_tokens(&json!(["Rust", " SQL ", 42])), vec!["Rust", "SQL", "42"]);
        assert_eq!(skill_tokens(&json!("[\"Go\",\"Kafka\"]")), vec!["Go", "Kafka"]);
        assert!(skill_tokens(&json!(null)).is_empty());
        assert!(skill_tokens(&json!({"skill": "x"})).is_empty());
    }

    #[test]
    fn skill_tokens_drop_unmatchable_and_duplicate_tokens() {
        assert_eq!(skill_tokens(&json!(["???", "Rust", "Rust"])), vec!["Rust"]);
    }
}
