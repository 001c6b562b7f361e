//! Wire types for the provider plugin protocol.
//!
//! The protocol is owned by the Hemmer host; this module only pulls in the
//! generated types and converts between them and the crate's own schema and
//! diagnostic types. Attribute values cross the wire as JSON-encoded bytes.
//! The generated messages shadow several crate type names (`Diagnostic`,
//! `Schema`, `Block`, `AttributeChange`), so the crate side is spelled out
//! with full paths here.

tonic::include_proto!("hemmer.provider.v1");

impl From<crate::schema::Diagnostic> for Diagnostic {
    fn from(d: crate::schema::Diagnostic) -> Self {
        Self {
            severity: match d.severity {
                crate::schema::DiagnosticSeverity::Error => diagnostic::Severity::Error as i32,
                crate::schema::DiagnosticSeverity::Warning => diagnostic::Severity::Warning as i32,
            },
            summary: d.summary,
            detail: d.detail.unwrap_or_default(),
            attribute: d.attribute.unwrap_or_default(),
        }
    }
}

impl From<&crate::schema::Schema> for Schema {
    fn from(schema: &crate::schema::Schema) -> Self {
        Self {
            version: schema.version as i64,
            block: Some(block_to_proto(&schema.block)),
        }
    }
}

fn block_to_proto(block: &crate::schema::Block) -> Block {
    Block {
        attributes: block
            .attributes
            .iter()
            .map(|(name, attr)| Attribute {
                name: name.clone(),
                r#type: serde_json::to_vec(&attr.kind).unwrap_or_default(),
                required: attr.required,
                optional: attr.optional,
                computed: attr.computed,
                sensitive: attr.sensitive,
                description: attr.description.clone().unwrap_or_default(),
                force_new: attr.force_new,
                default_value: attr
                    .default
                    .as_ref()
                    .map(|v| serde_json::to_vec(v).unwrap_or_default())
                    .unwrap_or_default(),
            })
            .collect(),
        block_types: block
            .blocks
            .iter()
            .map(|(name, nested)| NestedBlock {
                type_name: name.clone(),
                block: Some(block_to_proto(&nested.block)),
                nesting_mode: match nested.mode {
                    crate::schema::NestingMode::Single => nested_block::NestingMode::Single as i32,
                    crate::schema::NestingMode::List => nested_block::NestingMode::List as i32,
                    crate::schema::NestingMode::Set => nested_block::NestingMode::Set as i32,
                    crate::schema::NestingMode::Map => nested_block::NestingMode::Map as i32,
                },
                min_items: nested.min_items as i32,
                max_items: nested.max_items as i32,
            })
            .collect(),
        description: block.description.clone().unwrap_or_default(),
    }
}

impl From<crate::types::AttributeChange> for AttributeChange {
    fn from(change: crate::types::AttributeChange) -> Self {
        Self {
            path: change.path,
            before: change
                .before
                .map(|v| serde_json::to_vec(&v).unwrap_or_default())
                .unwrap_or_default(),
            after: change
                .after
                .map(|v| serde_json::to_vec(&v).unwrap_or_default())
                .unwrap_or_default(),
        }
    }
}

impl From<AttributeChange> for crate::types::AttributeChange {
    fn from(proto: AttributeChange) -> Self {
        Self {
            path: proto.path,
            before: if proto.before.is_empty() {
                None
            } else {
                serde_json::from_slice(&proto.before).ok()
            },
            after: if proto.after.is_empty() {
                None
            } else {
                serde_json::from_slice(&proto.after).ok()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    #[test]
    fn diagnostic_conversion_fills_optional_fields() {
        let diag = schema::Diagnostic::error("boom")
            .with_detail("details")
            .with_attribute("name");
        let wire: Diagnostic = diag.into();
        assert_eq!(wire.severity, diagnostic::Severity::Error as i32);
        assert_eq!(wire.summary, "boom");
        assert_eq!(wire.detail, "details");
        assert_eq!(wire.attribute, "name");
    }

    #[test]
    fn schema_conversion_carries_flags() {
        let source = schema::Schema::v0()
            .with_attribute("name", schema::Attribute::string().required().force_new())
            .with_attribute("id", schema::Attribute::string().computed());
        let wire: Schema = (&source).into();
        let block = wire.block.expect("block");
        let name = block.attributes.iter().find(|a| a.name == "name").expect("name attr");
        assert!(name.required);
        assert!(name.force_new);
        let id = block.attributes.iter().find(|a| a.name == "id").expect("id attr");
        assert!(id.computed);
    }

    #[test]
    fn attribute_change_round_trips() {
        let change = crate::types::AttributeChange::modified(
            "location",
            serde_json::json!("westus"),
            serde_json::json!("eastus"),
        );
        let wire: AttributeChange = change.clone().into();
        let back: crate::types::AttributeChange = wire.into();
        assert_eq!(back, change);
    }
}
