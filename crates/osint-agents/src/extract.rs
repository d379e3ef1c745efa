use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Only this many leading characters are scanned for balanced spans.
pub const BALANCED_SCAN_LIMIT: usize = 20_000;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[ \t]*([A-Za-z0-9_+-]*)[ \t]*\r?\n?(.*?)```").expect("valid regex")
});
static GREEDY_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));
static GREEDY_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("valid regex"));

/// No candidate in the upstream text parsed as JSON. The text itself is not kept.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("PARSE_ERROR: no valid JSON found in upstream response ({candidates} candidates, length={length})")]
pub struct ExtractError {
    pub candidates: usize,
    pub length: usize,
}

/// Recover the most plausible JSON value from free text returned by a model.
///
/// Handles common response formats:
/// - Clean JSON: `{"key": "value"}` or `[1, 2]`
/// - Markdown-wrapped: ```json\n{"key": "value"}\n```
/// - Prose around the payload: `Here is the analysis:\n{"key": "value"} Hope this helps!`
/// - Valid JSON followed by a broken tail: `{"a": 1} {"b":`
pub fn extract_json(text: &str) -> Result<Value, ExtractError> {
    let candidates = candidates(text);
    for candidate in &candidates {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            return Ok(value);
        }
    }

    Err(ExtractError {
        candidates: candidates.len(),
        length: text.len(),
    })
}

/// Every candidate substring, deduplicated, in the order they are tried.
fn candidates(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    let mut ordered = Vec::new();

    ordered.push(trimmed.to_string());

    if let Some(block) = first_json_fence(trimmed) {
        ordered.push(block);
    }

    if let Some(m) = GREEDY_OBJECT.find(trimmed) {
        ordered.push(m.as_str().to_string());
    }
    if let Some(m) = GREEDY_ARRAY.find(trimmed) {
        ordered.push(m.as_str().to_string());
    }

    ordered.extend(
        FENCED_BLOCK
            .captures_iter(trimmed)
            .filter_map(|c| c.get(2))
            .map(|m| m.as_str().trim().to_string()),
    );

    ordered.extend(balanced_spans(trimmed, BALANCED_SCAN_LIMIT));

    let mut seen = HashSet::new();
    ordered
        .into_iter()
        .filter(|c| !c.is_empty() && seen.insert(c.clone()))
        .collect()
}

/// Content of the first fenced block tagged `json` or left unlabeled.
fn first_json_fence(text: &str) -> Option<String> {
    FENCED_BLOCK.captures_iter(text).find_map(|c| {
        let tag = c.get(1).map(|m| m.as_str()).unwrap_or_default();
        if tag.is_empty() || tag.eq_ignore_ascii_case("json") {
            c.get(2).map(|m| m.as_str().trim().to_string())
        } else {
            None
        }
    })
}

/// Every top-level balanced `{...}` / `[...]` span within the first `limit` chars.
///
/// String literals are tracked only inside a span, so quotes in surrounding prose
/// cannot desynchronise the scan. A mismatched closer abandons the current span.
fn balanced_spans(text: &str, limit: usize) -> Vec<String> {
    let end = text
        .char_indices()
        .nth(limit)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let window = &text[..end];

    let mut spans = Vec::new();
    let mut stack: Vec<char> = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in window.char_indices() {
        if stack.is_empty() {
            if ch == '{' || ch == '[' {
                start = i;
                stack.push(ch);
                in_string = false;
                escape_next = false;
            }
            continue;
        }

        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => stack.push(ch),
            '}' | ']' if !in_string => {
                let opener = if ch == '}' { '{' } else { '[' };
                if stack.last() == Some(&opener) {
                    stack.pop();
                    if stack.is_empty() {
                        spans.push(window[start..=i].to_string());
                    }
                } else {
                    stack.clear();
                }
            }
            _ => {}
        }
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_clean_json() {
        let input = r#"{"confidence": 0.75, "reasoning": "test"}"#;
        assert_eq!(
            extract_json(input).unwrap(),
            json!({"confidence": 0.75, "reasoning": "test"})
        );
    }

    #[test]
    fn extract_clean_array() {
        assert_eq!(extract_json("  [1, 2, 3]\n").unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn extract_from_markdown() {
        let input = "Here is my analysis:\n```json\n{\"summary\": \"x\"}\n```\nDone.";
        assert_eq!(extract_json(input).unwrap(), json!({"summary": "x"}));
    }

    #[test]
    fn extract_from_markdown_no_lang() {
        let input = "Result:\n```\n[{\"title\": \"a\"}]\n```";
        assert_eq!(extract_json(input).unwrap(), json!([{"title": "a"}]));
    }

    #[test]
    fn json_fence_preferred_over_other_braces_in_prose() {
        let input = "Note {draft} and [citation needed].\n```json\n{\"leads\": [\"a\"]}\n```\nAlso {x}.";
        assert_eq!(extract_json(input).unwrap(), json!({"leads": ["a"]}));
    }

    #[test]
    fn later_fence_used_when_first_is_not_json() {
        let input = "```python\nprint('hi')\n```\nthen\n```yaml\n{\"ok\": true}\n```";
        assert_eq!(extract_json(input).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn extract_with_prefix_and_suffix_text() {
        let input = "Based on my research, here it is: {\"summary\": \"bullish\"} Let me know!";
        assert_eq!(extract_json(input).unwrap(), json!({"summary": "bullish"}));
    }

    #[test]
    fn valid_json_followed_by_garbage_with_braces() {
        let input = "{\"a\": 1} and then {\"b\": oops}";
        assert_eq!(extract_json(input).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn array_inside_apology_text() {
        let input = "Sorry. [{\"id\": \"1\"}, {\"id\": \"2\"}] I hope that {helps}";
        assert_eq!(
            extract_json(input).unwrap(),
            json!([{"id": "1"}, {"id": "2"}])
        );
    }

    #[test]
    fn greedy_object_is_tried_before_greedy_array() {
        let input = "Sorry for the delay. [{\"id\": \"1\"}] I hope that {helps";
        assert_eq!(extract_json(input).unwrap(), json!({"id": "1"}));
    }

    #[test]
    fn braces_inside_strings_do_not_break_scan() {
        let input = r#"Intro text {"reasoning": "went from {low} to {high]", "n": 2} trailing }"#;
        assert_eq!(
            extract_json(input).unwrap(),
            json!({"reasoning": "went from {low} to {high]", "n": 2})
        );
    }

    #[test]
    fn escaped_quotes_inside_strings() {
        let input = r#"prefix {"quote": "she said \"{no}\"", "ok": true} suffix {"#;
        assert_eq!(
            extract_json(input).unwrap(),
            json!({"quote": "she said \"{no}\"", "ok": true})
        );
    }

    #[test]
    fn truncated_json_is_a_parse_error() {
        let err = extract_json("{\"summary\": \"cut off here").unwrap_err();
        assert!(err.to_string().starts_with("PARSE_ERROR"));
    }

    #[test]
    fn extract_no_json() {
        let input = "This is just plain text with no JSON at all.";
        let err = extract_json(input).unwrap_err();
        assert_eq!(err.length, input.len());
    }

    #[test]
    fn empty_input_is_a_parse_error() {
        assert!(extract_json("   ").is_err());
    }

    #[test]
    fn balanced_scan_respects_limit() {
        let padding = "x".repeat(BALANCED_SCAN_LIMIT);
        let input = format!("{padding} {{\"late\": true}}");
        assert!(balanced_spans(&input, BALANCED_SCAN_LIMIT).is_empty());
        // The greedy match still sees the whole text.
        assert_eq!(extract_json(&input).unwrap(), json!({"late": true}));
    }

    #[test]
    fn balanced_scan_handles_multibyte_text() {
        let input = "Résumé – «notes» {\"naïve\": \"café\"} ✓";
        assert_eq!(
            balanced_spans(input, BALANCED_SCAN_LIMIT),
            vec!["{\"naïve\": \"café\"}".to_string()]
        );
    }

    #[test]
    fn candidates_are_deduplicated() {
        let list = candidates("```json\n{\"a\": 1}\n```");
        let fenced: Vec<_> = list.iter().filter(|c| c.as_str() == "{\"a\": 1}").collect();
        assert_eq!(fenced.len(), 1);
    }

    #[test]
    fn fenced_json_with_surrounding_prose_is_returned_exactly() {
        let payloads = [
            json!({"summary": "X", "entities": []}),
            json!([{"title": "t", "riskLevel": "HIGH"}]),
            json!({"nested": {"deep": [1, {"k": "}"}]}}),
        ];
        let wrappers = [
            ("Sure! ", " Anything else?"),
            ("I apologise {sic}: ", "\n[1] footnote"),
            ("", ""),
        ];
        for payload in &payloads {
            for (before, after) in &wrappers {
                let text = format!(
                    "{before}\n```json\n{}\n```\n{after}",
                    serde_json::to_string_pretty(payload).unwrap()
                );
                assert_eq!(&extract_json(&text).unwrap(), payload, "input: {text}");
            }
        }
    }
}
