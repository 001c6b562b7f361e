//! Configuration validation against a [`Schema`].
//!
//! Checks required attributes, value types, nested block constraints, and
//! runs any per-attribute validators. Resources call the small `expect_*`
//! helpers from their own validator functions.

use crate::schema::{
    Attribute, AttributeType, Block, Diagnostic, NestedBlock, NestingMode, Schema,
};
use serde_json::Value;

/// Validate a configuration value against a schema.
///
/// An empty result means the configuration is valid. Computed-only attributes
/// are skipped; the provider owns those.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// [`validate`] as a `Result`, for callers that only care about pass/fail.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        // Null is acceptable for an omitted optional block.
        Value::Null => return,
        other => {
            diagnostics.push(anchored(
                Diagnostic::error("expected an object")
                    .with_detail(format!("got {}", type_name(other))),
                path,
            ));
            return;
        },
    };

    for (name, attr) in &block.attributes {
        validate_attribute(attr, obj.get(name), &join(path, name), diagnostics);
    }

    for (name, nested) in &block.blocks {
        validate_nested(nested, obj.get(name), &join(path, name), diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Computed-only attributes are filled in by the provider.
    if attr.computed && !attr.required && !attr.optional {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.required {
                diagnostics.push(
                    Diagnostic::error(format!("missing required attribute {:?}", path))
                        .with_attribute(path),
                );
            }
        },
        Some(v) => {
            validate_type(&attr.kind, v, path, diagnostics);
            if let Some(validator) = attr.validator {
                diagnostics.extend(validator(v, path));
            }
        },
    }
}

fn validate_type(kind: &AttributeType, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    match kind {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_mismatch(path, "string", value));
            }
        },
        AttributeType::Int => {
            let ok = match value.as_f64() {
                Some(f) => f.fract() == 0.0,
                None => false,
            };
            if !ok {
                diagnostics.push(type_mismatch(path, "int", value));
            }
        },
        AttributeType::Float => {
            if !value.is_number() {
                diagnostics.push(type_mismatch(path, "float", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_mismatch(path, "bool", value));
            }
        },
        AttributeType::List(element) | AttributeType::Set(element) => {
            match value.as_array() {
                Some(items) => {
                    for (i, item) in items.iter().enumerate() {
                        validate_type(element, item, &format!("{}.{}", path, i), diagnostics);
                    }
                },
                None => diagnostics.push(type_mismatch(path, "list", value)),
            }
        },
        AttributeType::Map(element) => match value.as_object() {
            Some(entries) => {
                for (key, item) in entries {
                    validate_type(element, item, &format!("{}.{}", path, key), diagnostics);
                }
            },
            None => diagnostics.push(type_mismatch(path, "map", value)),
        },
    }
}

fn validate_nested(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match nested.mode {
        NestingMode::Single => match value {
            None | Some(Value::Null) => {
                if nested.min_items > 0 {
                    diagnostics.push(
                        Diagnostic::error(format!("missing required block {:?}", path))
                            .with_attribute(path),
                    );
                }
            },
            Some(v) => validate_block(&nested.block, v, path, diagnostics),
        },
        NestingMode::List | NestingMode::Set => match value {
            None | Some(Value::Null) => {
                if nested.min_items > 0 {
                    diagnostics.push(
                        Diagnostic::error(format!(
                            "block {:?} requires at least {} item(s)",
                            path, nested.min_items
                        ))
                        .with_attribute(path),
                    );
                }
            },
            Some(Value::Array(items)) => {
                check_item_count(nested, items.len(), path, diagnostics);
                for (i, item) in items.iter().enumerate() {
                    validate_block(&nested.block, item, &format!("{}.{}", path, i), diagnostics);
                }
            },
            Some(other) => diagnostics.push(anchored(
                Diagnostic::error(format!("expected a list of blocks for {:?}", path))
                    .with_detail(format!("got {}", type_name(other))),
                path,
            )),
        },
        NestingMode::Map => match value {
            None | Some(Value::Null) => {
                if nested.min_items > 0 {
                    diagnostics.push(
                        Diagnostic::error(format!(
                            "block {:?} requires at least {} item(s)",
                            path, nested.min_items
                        ))
                        .with_attribute(path),
                    );
                }
            },
            Some(Value::Object(entries)) => {
                check_item_count(nested, entries.len(), path, diagnostics);
                for (key, item) in entries {
                    validate_block(&nested.block, item, &format!("{}.{}", path, key), diagnostics);
                }
            },
            Some(other) => diagnostics.push(anchored(
                Diagnostic::error(format!("expected a map of blocks for {:?}", path))
                    .with_detail(format!("got {}", type_name(other))),
                path,
            )),
        },
    }
}

fn check_item_count(nested: &NestedBlock, len: usize, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let len = len as u32;
    if len < nested.min_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "block {:?} requires at least {} item(s), got {}",
                path, nested.min_items, len
            ))
            .with_attribute(path),
        );
    }
    if nested.max_items > 0 && len > nested.max_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "block {:?} allows at most {} item(s), got {}",
                path, nested.max_items, len
            ))
            .with_attribute(path),
        );
    }
}

// ---------------------------------------------------------------------------
// Value-check helpers used by resource validators.
// ---------------------------------------------------------------------------

/// Expect a string drawn from a fixed set of values.
pub fn expect_one_of(value: &Value, path: &str, allowed: &[&str]) -> Vec<Diagnostic> {
    match value.as_str() {
        Some(s) if allowed.contains(&s) => Vec::new(),
        Some(s) => vec![Diagnostic::error(format!(
            "{:?} is not a valid value for {:?}; expected one of {}",
            s,
            path,
            allowed.join(", ")
        ))
        .with_attribute(path)],
        None => vec![type_mismatch(path, "string", value)],
    }
}

/// Expect a number within an inclusive range.
pub fn expect_float_between(value: &Value, path: &str, min: f64, max: f64) -> Vec<Diagnostic> {
    match value.as_f64() {
        Some(f) if f >= min && f <= max => Vec::new(),
        Some(f) => vec![Diagnostic::error(format!(
            "{} is out of range for {:?}; expected between {} and {}",
            f, path, min, max
        ))
        .with_attribute(path)],
        None => vec![type_mismatch(path, "float", value)],
    }
}

/// Expect a non-empty string.
pub fn expect_nonempty_string(value: &Value, path: &str) -> Vec<Diagnostic> {
    match value.as_str() {
        Some(s) if !s.trim().is_empty() => Vec::new(),
        Some(_) => {
            vec![Diagnostic::error(format!("{:?} must not be empty", path)).with_attribute(path)]
        },
        None => vec![type_mismatch(path, "string", value)],
    }
}

/// Expect a string containing well-formed JSON.
pub fn expect_json_string(value: &Value, path: &str) -> Vec<Diagnostic> {
    match value.as_str() {
        Some(s) => match serde_json::from_str::<Value>(s) {
            Ok(_) => Vec::new(),
            Err(err) => vec![Diagnostic::error(format!("{:?} contains invalid JSON", path))
                .with_detail(err.to_string())
                .with_attribute(path)],
        },
        None => vec![type_mismatch(path, "string", value)],
    }
}

fn type_mismatch(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("invalid type for attribute {:?}", path))
        .with_detail(format!("expected {}, got {}", expected, type_name(got)))
        .with_attribute(path)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn anchored(diag: Diagnostic, path: &str) -> Diagnostic {
    if path.is_empty() {
        diag
    } else {
        diag.with_attribute(path)
    }
}
