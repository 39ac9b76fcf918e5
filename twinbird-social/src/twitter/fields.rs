//! Structural comparison of two JSON values by the field paths they expose.
//!
//! Values are ignored; only shape matters. Arrays are sampled through their
//! first element, which is enough to catch a provider that drops or renames a
//! field on every entity.
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Every dotted path present in `value`.
///
/// ```
/// use serde_json::json;
/// use twinbird_social::twitter::fields::extract_fields;
///
/// let paths = extract_fields(&json!({
///     "data": [{"id": "1", "public_metrics": {"like_count": 0}}],
///     "meta": {"result_count": 1}
/// }));
/// assert!(paths.contains("data[0].public_metrics.like_count"));
/// assert!(paths.contains("meta.result_count"));
/// ```
pub fn extract_fields(value: &Value) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    walk(value, "", &mut out);
    out
}

fn walk(value: &Value, prefix: &str, out: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                walk(child, &path, out);
                out.insert(path);
            }
        }
        Value::Array(items) => {
            if let Some(first @ Value::Object(_)) = items.first() {
                walk(first, &format!("{prefix}[0]"), out);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}

/// Paths present on one side only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldDiff {
    pub only_in_a: BTreeSet<String>,
    pub only_in_b: BTreeSet<String>,
}

impl FieldDiff {
    pub fn is_match(&self) -> bool {
        self.only_in_a.is_empty() && self.only_in_b.is_empty()
    }
}

pub fn diff(a: &Value, b: &Value) -> FieldDiff {
    let fa = extract_fields(a);
    let fb = extract_fields(b);
    FieldDiff {
        only_in_a: fa.difference(&fb).cloned().collect(),
        only_in_b: fb.difference(&fa).cloned().collect(),
    }
}

impl fmt::Display for FieldDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_match() {
            return writeln!(f, "schemas match");
        }
        for (label, paths) in [("only in a", &self.only_in_a), ("only in b", &self.only_in_b)] {
            if paths.is_empty() {
                continue;
            }
            writeln!(f, "{label} ({}):", paths.len())?;
            for p in paths {
                writeln!(f, "  {p}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_first_array_element_is_sampled() {
        let v = json!({"items": [{"a": 1}, {"b": 2}], "tags": ["x", "y"], "empty": []});
        let paths: Vec<String> = extract_fields(&v).into_iter().collect();
        assert_eq!(paths, vec!["empty", "items", "items[0].a", "tags"]);
    }

    #[test]
    fn top_level_array_uses_bare_index() {
        let paths = extract_fields(&json!([{"id": 1}]));
        assert!(paths.contains("[0].id"));
        assert!(extract_fields(&json!("scalar")).is_empty());
        assert!(extract_fields(&json!({})).is_empty());
    }

    #[test]
    fn extraction_is_idempotent_and_order_free() {
        let a = json!({"x": {"y": 1}, "z": [{"w": true}]});
        let b = json!({"z": [{"w": false}], "x": {"y": 2}});
        assert_eq!(extract_fields(&a), extract_fields(&a));
        assert_eq!(extract_fields(&a), extract_fields(&b));
    }

    #[test]
    fn diff_reports_both_sides() {
        let d = diff(
            &json!({"data": {"id": "1", "lang": "en"}}),
            &json!({"data": {"id": "1", "attachments": {"media_keys": ["k"]}}}),
        );
        assert!(!d.is_match());
        assert_eq!(d.only_in_a.iter().collect::<Vec<_>>(), vec!["data.lang"]);
        assert_eq!(
            d.only_in_b.iter().collect::<Vec<_>>(),
            vec!["data.attachments", "data.attachments.media_keys"]
        );
        let report = d.to_string();
        assert!(report.contains("only in a (1):"));
        assert!(report.contains("  data.attachments.media_keys"));
    }

    #[test]
    fn identical_values_match() {
        let v = json!({"data": [], "meta": {"result_count": 0}});
        let d = diff(&v, &v);
        assert!(d.is_match());
        assert_eq!(d.to_string(), "schemas match\n");
    }
}
