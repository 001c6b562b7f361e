//! Schema types describing provider, resource, and data source structure.
//!
//! A schema is the contract between the host and a resource implementation:
//! which attributes exist, which are required or computed, which force
//! replacement when changed, and how nested blocks are shaped. Attributes may
//! also carry a validator function, mirroring the per-field `ValidateFunc`
//! idiom of classic providers.

use serde::Serialize;
use std::collections::BTreeMap;

/// The type of an attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// A UTF-8 string.
    String,
    /// A 64-bit integer.
    Int,
    /// A 64-bit float.
    Float,
    /// A boolean.
    Bool,
    /// An ordered list of a single element type.
    List(Box<AttributeType>),
    /// An unordered collection of unique elements.
    Set(Box<AttributeType>),
    /// String keys to values of a single type.
    Map(Box<AttributeType>),
}

impl AttributeType {
    /// A list of the given element type.
    pub fn list(element: AttributeType) -> Self {
        Self::List(Box::new(element))
    }

    /// A set of the given element type.
    pub fn set(element: AttributeType) -> Self {
        Self::Set(Box::new(element))
    }

    /// A map with values of the given type.
    pub fn map(value: AttributeType) -> Self {
        Self::Map(Box::new(value))
    }
}

/// A validator run against a configured attribute value.
///
/// Receives the value and the attribute path, returns any diagnostics. Only
/// invoked when the value is present and non-null.
pub type ValidatorFn = fn(&serde_json::Value, &str) -> Vec<Diagnostic>;

/// A single attribute in a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// The value type.
    pub kind: AttributeType,
    /// Must be set in configuration.
    pub required: bool,
    /// May be set in configuration.
    pub optional: bool,
    /// Set by the provider; read-only for configuration.
    pub computed: bool,
    /// Redacted in host output.
    pub sensitive: bool,
    /// Changing the value forces resource replacement.
    pub force_new: bool,
    /// Human-readable description.
    pub description: Option<String>,
    /// Default applied when the configuration omits the value.
    pub default: Option<serde_json::Value>,
    /// Optional value validator.
    pub validator: Option<ValidatorFn>,
}

impl Attribute {
    /// Create an attribute of the given type with no flags set.
    pub fn new(kind: AttributeType) -> Self {
        Self {
            kind,
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            force_new: false,
            description: None,
            default: None,
            validator: None,
        }
    }

    /// A string attribute.
    pub fn string() -> Self {
        Self::new(AttributeType::String)
    }

    /// An integer attribute.
    pub fn int() -> Self {
        Self::new(AttributeType::Int)
    }

    /// A float attribute.
    pub fn float() -> Self {
        Self::new(AttributeType::Float)
    }

    /// A boolean attribute.
    pub fn bool() -> Self {
        Self::new(AttributeType::Bool)
    }

    /// A map of strings, the shape used for tags.
    pub fn string_map() -> Self {
        Self::new(AttributeType::map(AttributeType::String))
    }

    /// A list of strings.
    pub fn string_list() -> Self {
        Self::new(AttributeType::list(AttributeType::String))
    }

    /// Mark required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Mark computed.
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    /// Mark both optional and computed (configurable with a provider default).
    pub fn optional_computed(mut self) -> Self {
        self.optional = true;
        self.computed = true;
        self
    }

    /// Mark sensitive.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Changing this attribute forces replacement.
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Set the description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Attach a validator.
    pub fn with_validator(mut self, validator: ValidatorFn) -> Self {
        self.validator = Some(validator);
        self
    }
}

/// How a nested block repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NestingMode {
    /// At most one block, represented as an object.
    #[default]
    Single,
    /// Zero or more ordered blocks, represented as an array.
    List,
    /// Zero or more unordered blocks, represented as an array.
    Set,
    /// Blocks keyed by string, represented as an object of objects.
    Map,
}

/// A nested block with repetition constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedBlock {
    /// The block body.
    pub block: Block,
    /// How the block repeats.
    pub mode: NestingMode,
    /// Minimum number of blocks required.
    pub min_items: u32,
    /// Maximum number of blocks allowed; zero means unlimited.
    pub max_items: u32,
}

impl NestedBlock {
    /// A single (0 or 1) nested block.
    pub fn single(block: Block) -> Self {
        Self {
            block,
            mode: NestingMode::Single,
            min_items: 0,
            max_items: 1,
        }
    }

    /// A list of nested blocks.
    pub fn list(block: Block) -> Self {
        Self {
            block,
            mode: NestingMode::List,
            min_items: 0,
            max_items: 0,
        }
    }

    /// A set of nested blocks.
    pub fn set(block: Block) -> Self {
        Self {
            block,
            mode: NestingMode::Set,
            min_items: 0,
            max_items: 0,
        }
    }

    /// A map of nested blocks.
    pub fn map(block: Block) -> Self {
        Self {
            block,
            mode: NestingMode::Map,
            min_items: 0,
            max_items: 0,
        }
    }

    /// Require at least `min` blocks.
    pub fn min_items(mut self, min: u32) -> Self {
        self.min_items = min;
        self
    }

    /// Allow at most `max` blocks.
    pub fn max_items(mut self, max: u32) -> Self {
        self.max_items = max;
        self
    }
}

/// A block of attributes and nested blocks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    /// Attributes by name.
    pub attributes: BTreeMap<String, Attribute>,
    /// Nested blocks by name.
    pub blocks: BTreeMap<String, NestedBlock>,
    /// Human-readable description.
    pub description: Option<String>,
}

impl Block {
    /// An empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Add a nested block.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.blocks.insert(name.into(), block);
        self
    }

    /// Set the description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Schema for one resource, data source, or the provider configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    /// Schema version, bumped when state needs upgrading.
    pub version: u64,
    /// The root block.
    pub block: Block,
}

impl Schema {
    /// A schema at the given version.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            block: Block::new(),
        }
    }

    /// A schema at version 0.
    pub fn v0() -> Self {
        Self::new(0)
    }

    /// Add a root attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.block.attributes.insert(name.into(), attr);
        self
    }

    /// Add a root nested block.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.block.blocks.insert(name.into(), block);
        self
    }

    /// Look up a root attribute.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.get(name)
    }

    /// Whether changing the named root attribute forces replacement.
    pub fn forces_new(&self, name: &str) -> bool {
        self.block
            .attributes
            .get(name)
            .map(|a| a.force_new)
            .unwrap_or(false)
    }
}

/// The complete schema the provider reports to the host.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProviderSchema {
    /// Provider configuration schema.
    pub provider: Schema,
    /// Resource schemas by type name.
    pub resources: BTreeMap<String, Schema>,
    /// Data source schemas by type name.
    pub data_sources: BTreeMap<String, Schema>,
}

impl ProviderSchema {
    /// An empty provider schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider configuration schema.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Add a resource schema.
    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }

    /// Add a data source schema.
    pub fn with_data_source(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.data_sources.insert(name.into(), schema);
        self
    }
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    /// Fails the operation.
    Error,
    /// Reported without failing the operation.
    Warning,
}

/// A message surfaced to the host, optionally anchored to an attribute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity.
    pub severity: DiagnosticSeverity,
    /// Short summary.
    pub summary: String,
    /// Longer description.
    pub detail: Option<String>,
    /// Attribute path the diagnostic refers to.
    pub attribute: Option<String>,
}

impl Diagnostic {
    /// An error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// A warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Attach detail text.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Anchor to an attribute path.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Whether this diagnostic is an error.
    pub fn is_error(&self) -> bool {
        matches!(self.severity, DiagnosticSeverity::Error)
    }
}

/// Whether any diagnostic in the slice is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn attribute_builder_sets_flags() {
        let attr = Attribute::string()
            .required()
            .force_new()
            .describe("resource name");
        assert_eq!(attr.kind, AttributeType::String);
        assert!(attr.required && attr.force_new);
        assert!(!attr.optional && !attr.computed);
        assert_eq!(attr.description.as_deref(), Some("resource name"));
    }

    #[test]
    fn optional_computed_sets_both_flags() {
        let attr = Attribute::string().optional_computed();
        assert!(attr.optional && attr.computed);
    }

    #[test]
    fn attribute_default_value() {
        let attr = Attribute::string().optional().with_default(json!("Monthly"));
        assert_eq!(attr.default, Some(json!("Monthly")));
    }

    #[test]
    fn schema_forces_new_consults_attributes() {
        let schema = Schema::v0()
            .with_attribute("name", Attribute::string().required().force_new())
            .with_attribute("tags", Attribute::string_map().optional());
        assert!(schema.forces_new("name"));
        assert!(!schema.forces_new("tags"));
        assert!(!schema.forces_new("missing"));
    }

    #[test]
    fn nested_block_constraints() {
        let nested = NestedBlock::set(
            Block::new().with_attribute("threshold", Attribute::float().required()),
        )
        .min_items(1)
        .max_items(5);
        assert_eq!(nested.mode, NestingMode::Set);
        assert_eq!(nested.min_items, 1);
        assert_eq!(nested.max_items, 5);
    }

    #[test]
    fn provider_schema_collects_types() {
        let schema = ProviderSchema::new()
            .with_provider_config(
                Schema::v0().with_attribute("subscription_id", Attribute::string().required()),
            )
            .with_resource("azurerm_resource_group", Schema::v0())
            .with_data_source("azurerm_subscription", Schema::v0());
        assert!(schema.resources.contains_key("azurerm_resource_group"));
        assert!(schema.data_sources.contains_key("azurerm_subscription"));
        assert!(schema.provider.block.attributes.contains_key("subscription_id"));
    }

    #[test]
    fn attribute_type_serializes_for_the_wire() {
        let kind = AttributeType::map(AttributeType::String);
        let encoded = serde_json::to_value(&kind).unwrap();
        assert_eq!(encoded, json!({"map": "string"}));
    }

    #[test]
    fn diagnostics_helpers() {
        let diags = vec![
            Diagnostic::warning("deprecated"),
            Diagnostic::error("missing name").with_attribute("name"),
        ];
        assert!(has_errors(&diags));
        assert!(!has_errors(&diags[..1]));
    }
}
