//! Defensive extraction of JSON objects from free-form model output.
//!
//! Completion services routinely wrap payloads in prose or code fences;
//! strict schema parsing is the wrong tool here. We locate the first balanced
//! `{...}` window and parse that.

use serde_json::Value;

/// Extract and parse the first balanced JSON object embedded in `raw`.
///
/// Returns `None` when no balanced object exists or the window does not
/// parse; never panics on malformed input.
#[must_use]
pub fn extract_json_object(raw: &str) -> Option<Value> {
    let bytes = raw.as_bytes();
    let start = raw.find('{')?;

    let mut depth = 0_i32;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let window = &raw[start..=start + offset];
                    return serde_json::from_str(window).ok();
                }
            }
            _ => {}
        }
    }
    None
}

/// String field lookup over an extracted payload, trimming whitespace and
/// rejecting empty values.
#[must_use]
pub fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_object() {
        let value = extract_json_object(r#"{"title": "Housing"}"#).unwrap();
        assert_eq!(value["title"], "Housing");
    }

    #[test]
    fn extracts_object_from_surrounding_prose() {
        let raw = "Sure! Here is the JSON:\n```json\n{\"title\": \"Zoning\", \"n\": 2}\n```\nHope that helps.";
        let value = extract_json_object(raw).unwrap();
        assert_eq!(value["n"], 2);
    }

    #[test]
    fn handles_nested_objects_and_braces_in_strings() {
        let raw = r#"prefix {"outer": {"inner": "a } brace"}, "k": 1} suffix"#;
        let value = extract_json_object(raw).unwrap();
        assert_eq!(value["outer"]["inner"], "a } brace");
        assert_eq!(value["k"], 1);
    }

    #[test]
    fn malformed_input_yields_none() {
        assert!(extract_json_object("no json here").is_none());
        assert!(extract_json_object("{unterminated").is_none());
        assert!(extract_json_object("{not: valid json}").is_none());
    }

    #[test]
    fn non_empty_str_trims_and_rejects_blank() {
        let value = extract_json_object(r#"{"a": "  x ", "b": "   "}"#).unwrap();
        assert_eq!(non_empty_str(&value, "a"), Some("x"));
        assert_eq!(non_empty_str(&value, "b"), None);
        assert_eq!(non_empty_str(&value, "missing"), None);
    }
}
