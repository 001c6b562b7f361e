//! Tag expand/flatten helpers shared by every taggable resource.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::schema::Diagnostic;

/// Resource tags as stored in state.
pub type Tags = BTreeMap<String, String>;

const MAX_TAG_COUNT: usize = 50;
const MAX_TAG_KEY_LENGTH: usize = 512;
const MAX_TAG_VALUE_LENGTH: usize = 256;

/// Convert a configured `tags` value into the map ARM expects.
///
/// Missing or null tags become an empty map so a PUT clears tags removed
/// from configuration.
pub fn expand_tags(value: Option<&Value>) -> Tags {
    let mut tags = Tags::new();
    if let Some(Value::Object(map)) = value {
        for (key, val) in map {
            if let Some(s) = val.as_str() {
                tags.insert(key.clone(), s.to_string());
            }
        }
    }
    tags
}

/// Convert the `tags` field of an ARM response into a state value.
pub fn flatten_tags(value: Option<&Value>) -> Value {
    let mut out = serde_json::Map::new();
    if let Some(Value::Object(map)) = value {
        for (key, val) in map {
            if let Some(s) = val.as_str() {
                out.insert(key.clone(), Value::String(s.to_string()));
            }
        }
    }
    Value::Object(out)
}

/// Validator enforcing ARM's tag limits.
pub fn validate_tags(value: &Value, path: &str) -> Vec<Diagnostic> {
    let map = match value.as_object() {
        Some(map) => map,
        None => {
            return vec![
                Diagnostic::error(format!("{} must be a map of strings", path)).with_attribute(path),
            ];
        },
    };

    let mut diags = Vec::new();
    if map.len() > MAX_TAG_COUNT {
        diags.push(
            Diagnostic::error(format!(
                "a maximum of {} tags can be applied, got {}",
                MAX_TAG_COUNT,
                map.len()
            ))
            .with_attribute(path),
        );
    }
    for (key, val) in map {
        if key.len() > MAX_TAG_KEY_LENGTH {
            diags.push(
                Diagnostic::error(format!(
                    "tag key {:?} exceeds the {} character limit",
                    key, MAX_TAG_KEY_LENGTH
                ))
                .with_attribute(path),
            );
        }
        match val.as_str() {
            Some(s) if s.len() > MAX_TAG_VALUE_LENGTH => {
                diags.push(
                    Diagnostic::error(format!(
                        "the value of tag {:?} exceeds the {} character limit",
                        key, MAX_TAG_VALUE_LENGTH
                    ))
                    .with_attribute(path),
                );
            },
            Some(_) => {},
            None => {
                diags.push(
                    Diagnostic::error(format!("the value of tag {:?} must be a string", key))
                        .with_attribute(path),
                );
            },
        }
    }
    diags
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expand_handles_missing_and_present_tags() {
        assert!(expand_tags(None).is_empty());
        assert!(expand_tags(Some(&Value::Null)).is_empty());

        let tags = expand_tags(Some(&json!({"env": "prod", "team": "infra"})));
        assert_eq!(tags.get("env").map(String::as_str), Some("prod"));
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn flatten_always_yields_an_object() {
        assert_eq!(flatten_tags(None), json!({}));
        assert_eq!(
            flatten_tags(Some(&json!({"env": "prod"}))),
            json!({"env": "prod"})
        );
    }

    #[test]
    fn tag_limits_are_enforced() {
        assert!(validate_tags(&json!({"env": "prod"}), "tags").is_empty());

        let long_value = "v".repeat(MAX_TAG_VALUE_LENGTH + 1);
        let diags = validate_tags(&json!({"env": long_value}), "tags");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("character limit"));

        let diags = validate_tags(&json!({"env": 7}), "tags");
        assert_eq!(diags.len(), 1);

        let diags = validate_tags(&json!("nope"), "tags");
        assert_eq!(diags.len(), 1);
    }
}
