//! Diff generation for audit logging

use serde_json::Value;

/// Bookkeeping fields that change on every write and are left out of diffs
const IGNORED_FIELDS: [&str; 2] = ["updated_at", "created_at"];

/// Generate a human-readable diff between two JSON values
///
/// Only top-level fields are compared. Returns `None` when nothing but
/// bookkeeping timestamps changed.
pub fn generate_diff(before: &Value, after: &Value) -> Option<String> {
    match (before, after) {
        (Value::Object(before_obj), Value::Object(after_obj)) => {
            let mut changes = Vec::new();

            for (key, before_val) in before_obj {
                if IGNORED_FIELDS.contains(&key.as_str()) {
                    continue;
                }
                match after_obj.get(key) {
                    Some(after_val) if after_val != before_val => changes.push(format!(
                        "{}: {} -> {}",
                        key,
                        format_value(before_val),
                        format_value(after_val)
                    )),
                    Some(_) => {}
                    None => changes.push(format!(
                        "{}: {} -> (removed)",
                        key,
                        format_value(before_val)
                    )),
                }
            }

            for (key, after_val) in after_obj {
                if !before_obj.contains_key(key) && !IGNORED_FIELDS.contains(&key.as_str()) {
                    changes.push(format!("{}: (added) -> {}", key, format_value(after_val)));
                }
            }

            if changes.is_empty() {
                None
            } else {
                Some(changes.join(", "))
            }
        }
        _ if before != after => Some(format!(
            "{} -> {}",
            format_value(before),
            format_value(after)
        )),
        _ => None,
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => {
            if s.chars().count() > 50 {
                let head: String = s.chars().take(47).collect();
                format!("\"{}...\"", head)
            } else {
                format!("\"{}\"", s)
            }
        }
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_change() {
        let before = json!({"title": "Rent", "amount": 80000});
        let after = json!({"title": "Rent", "amount": 85000});
        assert_eq!(
            generate_diff(&before, &after),
            Some("amount: 80000 -> 85000".to_string())
        );
    }

    #[test]
    fn test_timestamps_ignored() {
        let before = json!({"title": "Rent", "updated_at": "2025-01-01T00:00:00Z"});
        let after = json!({"title": "Rent", "updated_at": "2025-02-01T00:00:00Z"});
        assert_eq!(generate_diff(&before, &after), None);
    }

    #[test]
    fn test_added_and_removed() {
        let before = json!({"color": "red"});
        let after = json!({"icon": "Car"});
        let diff = generate_diff(&before, &after).unwrap();
        assert!(diff.contains("color: \"red\" -> (removed)"));
        assert!(diff.contains("icon: (added) -> \"Car\""));
    }

    #[test]
    fn test_null_to_value() {
        let before = json!({"parent_id": null});
        let after = json!({"parent_id": "abc"});
        assert_eq!(
            generate_diff(&before, &after),
            Some("parent_id: null -> \"abc\"".to_string())
        );
    }

    #[test]
    fn test_long_string_truncation() {
        let long = "é".repeat(60);
        let formatted = format_value(&json!(long));
        assert!(formatted.ends_with("...\""));
        assert_eq!(formatted.chars().count(), 47 + 5);
    }
}
