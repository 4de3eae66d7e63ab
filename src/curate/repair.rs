// src/curate/repair.rs
//! Best-effort JSON extraction from free-form model output.
//!
//! Known limitation: the bare-key and quote fixes are regex based and can
//! rewrite prose inside string values that happens to look like `word:`.
//! They only run after a direct parse has failed.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::Value;

fn re(cell: &'static OnceCell<Regex>, pat: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pat).unwrap())
}

/// Parse `text` as JSON, repairing the usual model-output defects when a
/// direct parse fails: code fences, leading/trailing prose, smart quotes,
/// trailing commas, bare keys, single-quoted values, missing commas between
/// adjacent objects. Returns `None` when nothing JSON-like can be recovered.
pub fn repair_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return Some(v);
    }

    let body = extract_json_span(&strip_fences(trimmed))?;

    static RE_TRAILING: OnceCell<Regex> = OnceCell::new();
    static RE_BARE_KEY: OnceCell<Regex> = OnceCell::new();
    let mut s = body
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    s = re(&RE_TRAILING, r",\s*([}\]])")
        .replace_all(&s, "$1")
        .into_owned();
    s = re(&RE_BARE_KEY, r"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:")
        .replace_all(&s, "$1\"$2\":")
        .into_owned();
    if let Ok(v) = serde_json::from_str::<Value>(&s) {
        return Some(v);
    }

    // second pass
    static RE_SINGLE_KEY: OnceCell<Regex> = OnceCell::new();
    static RE_SINGLE_VAL: OnceCell<Regex> = OnceCell::new();
    static RE_MISSING_COMMA: OnceCell<Regex> = OnceCell::new();
    s = re(&RE_SINGLE_KEY, r"([{,]\s*)'([A-Za-z0-9_]+)'\s*:")
        .replace_all(&s, "$1\"$2\":")
        .into_owned();
    s = re(&RE_SINGLE_VAL, r":\s*'([^']*)'")
        .replace_all(&s, ":\"$1\"")
        .into_owned();
    s = re(&RE_MISSING_COMMA, r"([}\]])(\s*[{\[])")
        .replace_all(&s, "$1,$2")
        .into_owned();
    match serde_json::from_str::<Value>(&s) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::debug!(error = %e, "json repair gave up");
            None
        }
    }
}

fn strip_fences(s: &str) -> String {
    static RE_FENCE: OnceCell<Regex> = OnceCell::new();
    let fence = re(&RE_FENCE, r"(?s)```(?:json|JSON)?\s*(.*?)\s*```");
    match fence.captures(s).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().to_string(),
        None => s.to_string(),
    }
}

/// From the first `{`/`[` to the last `}`/`]`.
fn extract_json_span(s: &str) -> Option<String> {
    let start = s.find(['{', '['])?;
    let end = s.rfind(['}', ']'])?;
    if end < start {
        return None;
    }
    Some(s[start..=end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_json_passes_through() {
        assert_eq!(repair_json(r#"{"a": 1}"#), Some(json!({"a": 1})));
    }

    #[test]
    fn fenced_output_with_trailing_commas() {
        let raw = "```json\n{\"brief\": \"x\", \"bullets\": [\"a\", \"b\",],}\n```";
        assert_eq!(
            repair_json(raw),
            Some(json!({"brief": "x", "bullets": ["a", "b"]}))
        );
    }

    #[test]
    fn bare_keys_and_single_quotes_inside_prose() {
        let raw = "Sure! Here it is: {brief: 'Markets calm', bullets: []} Hope that helps.";
        assert_eq!(
            repair_json(raw),
            Some(json!({"brief": "Markets calm", "bullets": []}))
        );
    }

    #[test]
    fn smart_quotes_are_straightened() {
        let raw = "{\u{201C}brief\u{201D}: \u{201C}ok\u{201D}}";
        assert_eq!(repair_json(raw), Some(json!({"brief": "ok"})));
    }

    #[test]
    fn missing_comma_between_objects() {
        let raw = r#"{"links": [{"url": "a"} {"url": "b"}]}"#;
        assert_eq!(
            repair_json(raw),
            Some(json!({"links": [{"url": "a"}, {"url": "b"}]}))
        );
    }

    #[test]
    fn prose_is_rejected() {
        assert_eq!(repair_json("I cannot help with that."), None);
        assert_eq!(repair_json(""), None);
        assert_eq!(repair_json("} backwards {"), None);
    }
}
