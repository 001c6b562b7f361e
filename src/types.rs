//! Plan and metadata types exchanged with the host.

use serde::{Deserialize, Serialize};

/// A change to a single top-level attribute produced by a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// Attribute path.
    pub path: String,
    /// Value before the change; `None` when the attribute is being added.
    pub before: Option<serde_json::Value>,
    /// Value after the change; `None` when the attribute is being removed.
    pub after: Option<serde_json::Value>,
}

impl AttributeChange {
    /// An attribute being set for the first time.
    pub fn added(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            path: path.into(),
            before: None,
            after: Some(value),
        }
    }

    /// An attribute being removed.
    pub fn removed(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            path: path.into(),
            before: Some(value),
            after: None,
        }
    }

    /// An attribute changing value.
    pub fn modified(
        path: impl Into<String>,
        before: serde_json::Value,
        after: serde_json::Value,
    ) -> Self {
        Self {
            path: path.into(),
            before: Some(before),
            after: Some(after),
        }
    }
}

/// The outcome of planning a resource change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The state the resource will have after apply.
    pub planned_state: serde_json::Value,
    /// Per-attribute changes.
    pub changes: Vec<AttributeChange>,
    /// Whether the change requires destroying and recreating the resource.
    pub requires_replace: bool,
}

impl PlanResult {
    /// A plan with no changes.
    pub fn no_change(state: serde_json::Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// A plan carrying changes.
    pub fn with_changes(
        planned_state: serde_json::Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }
}

/// A resource state produced by an import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type the state belongs to.
    pub resource_type: String,
    /// The imported state.
    pub state: serde_json::Value,
}

impl ImportedResource {
    /// Wrap an imported state.
    pub fn new(resource_type: impl Into<String>, state: serde_json::Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Provider metadata returned by GetMetadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Resource type names.
    pub resources: Vec<String>,
    /// Data source type names.
    pub data_sources: Vec<String>,
    /// Capability flags.
    pub capabilities: ServerCapabilities,
}

/// Server capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// Whether the provider plans destroy operations.
    pub plan_destroy: bool,
}

/// Protocol version announced in the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// Prefix of the handshake line written to stdout.
pub const HANDSHAKE_PREFIX: &str = "HEMMER_PROVIDER";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn change_constructors() {
        let added = AttributeChange::added("location", json!("westus"));
        assert!(added.before.is_none());
        assert_eq!(added.after, Some(json!("westus")));

        let removed = AttributeChange::removed("tags", json!({"env": "prod"}));
        assert!(removed.after.is_none());

        let modified = AttributeChange::modified("amount", json!(100.0), json!(250.0));
        assert_eq!(modified.before, Some(json!(100.0)));
        assert_eq!(modified.after, Some(json!(250.0)));
    }

    #[test]
    fn plan_result_no_change() {
        let plan = PlanResult::no_change(json!({"id": "/subscriptions/sub/resourceGroups/rg"}));
        assert!(plan.changes.is_empty());
        assert!(!plan.requires_replace);
    }

    #[test]
    fn handshake_constants() {
        assert_eq!(PROTOCOL_VERSION, 1);
        assert_eq!(HANDSHAKE_PREFIX, "HEMMER_PROVIDER");
    }
}
