//! Pulling structured output out of a completion's free-form reasoning text.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

static ANSWER_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<answer>(.*?)</answer>").expect("static regex is valid"));

/// The structured answer is whatever sits inside the *last* `<answer>…</answer>`
/// pair (dot-matches-newline), trimmed. Models sometimes emit a draft answer
/// during reasoning and a corrected one at the end; taking the last match
/// favors the corrected one. Falls back to the raw completion, trimmed, if
/// no tag pair is present — best-effort per the planner's liberal-parsing
/// contract.
pub fn extract_answer(completion: &str) -> String {
    match ANSWER_TAG.captures_iter(completion).last() {
        Some(captures) => captures[1].trim().to_string(),
        None => completion.trim().to_string(),
    }
}

static SINGLE_QUOTED_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"'([^']*)'\s*:").expect("static regex is valid"));
static SINGLE_QUOTED_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r":\s*'([^']*)'").expect("static regex is valid"));

/// Parse an LLM-produced argument mapping. Accepts a JSON object literal
/// directly; failing that, makes one best-effort pass rewriting a
/// Python-dict-flavored literal (single-quoted keys/values) into JSON before
/// retrying. Any remaining failure yields an empty mapping so schema
/// validation — not this parser — is what surfaces the problem to the user.
pub fn parse_argument_mapping(text: &str) -> HashMap<String, String> {
    if let Ok(map) = serde_json::from_str::<HashMap<String, String>>(text) {
        return map;
    }

    let normalized = SINGLE_QUOTED_VALUE.replace_all(text, r#": "$1""#);
    let normalized = SINGLE_QUOTED_KEY.replace_all(&normalized, r#""$1":"#);
    serde_json::from_str::<HashMap<String, String>>(&normalized).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_answer_takes_the_last_tag_pair() {
        let completion = "<answer>draft</answer> more reasoning <answer>final</answer>";
        assert_eq!(extract_answer(completion), "final");
    }

    #[test]
    fn extract_answer_spans_newlines() {
        let completion = "<answer>\nline one\nline two\n</answer>";
        assert_eq!(extract_answer(completion), "line one\nline two");
    }

    #[test]
    fn extract_answer_falls_back_to_raw_text_without_tags() {
        assert_eq!(extract_answer("  just text  "), "just text");
    }

    #[test]
    fn parse_argument_mapping_accepts_plain_json() {
        let map = parse_argument_mapping(r#"{"find_pattern": "world", "replace_text": "earth"}"#);
        assert_eq!(map.get("find_pattern"), Some(&"world".to_string()));
    }

    #[test]
    fn parse_argument_mapping_accepts_python_dict_literal() {
        let map = parse_argument_mapping("{'find_pattern': 'world', 'replace_text': 'earth'}");
        assert_eq!(map.get("replace_text"), Some(&"earth".to_string()));
    }

    #[test]
    fn parse_argument_mapping_falls_back_to_empty_on_garbage() {
        let map = parse_argument_mapping("not a mapping at all");
        assert!(map.is_empty());
    }
}
