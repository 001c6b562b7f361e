//! Azure resource ID parsing and formatting.
//!
//! ARM identifies every resource with a REST-style path:
//!
//! ```text
//! /subscriptions/{id}/resourceGroups/{name}/providers/{namespace}/{type}/{name}
//! ```
//!
//! [`ResourceId`] performs the mechanical pairwise segment extraction over
//! that grammar; the typed IDs below wrap it for the resource kinds this
//! provider manages. Static segment keys are matched case-insensitively so
//! user-pasted import IDs still parse; values keep their original casing.

use std::fmt;
use thiserror::Error;

/// Errors produced while parsing a resource ID string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    /// The string does not follow the ARM ID grammar.
    #[error("ID {id:?} is not a valid Azure resource ID: {reason}")]
    Malformed {
        /// The offending input.
        id: String,
        /// Why it failed to parse.
        reason: String,
    },

    /// A required segment was absent.
    #[error("ID {id:?} is missing the {segment:?} element")]
    MissingSegment {
        /// The offending input.
        id: String,
        /// The segment key that was expected.
        segment: String,
    },

    /// A segment key was present with an empty value.
    #[error("ID {id:?} has an empty value for the {segment:?} element")]
    EmptySegment {
        /// The offending input.
        id: String,
        /// The segment key whose value was empty.
        segment: String,
    },
}

/// A parsed, untyped ARM resource ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    /// The subscription the resource lives in.
    pub subscription_id: String,
    /// The resource group, when the ID is group-scoped.
    pub resource_group: Option<String>,
    /// The resource provider namespace, when present.
    pub provider: Option<String>,
    segments: Vec<(String, String)>,
    raw: String,
}

impl ResourceId {
    /// Parse an ID string into its segments.
    pub fn parse(input: &str) -> Result<Self, IdError> {
        let raw = input.trim();
        let malformed = |reason: &str| IdError::Malformed {
            id: raw.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = raw
            .strip_prefix('/')
            .ok_or_else(|| malformed("expected a leading '/'"))?;
        if trimmed.is_empty() {
            return Err(malformed("the ID contains no segments"));
        }

        let parts: Vec<&str> = trimmed.trim_end_matches('/').split('/').collect();
        if parts.len() % 2 != 0 {
            return Err(malformed("the number of path segments is not divisible by 2"));
        }

        let mut subscription_id = None;
        let mut resource_group = None;
        let mut provider = None;
        let mut segments = Vec::new();

        for pair in parts.chunks(2) {
            let (key, value) = (pair[0], pair[1]);
            if key.is_empty() {
                return Err(malformed("an ID segment key is empty"));
            }
            if value.is_empty() {
                return Err(IdError::EmptySegment {
                    id: raw.to_string(),
                    segment: key.to_string(),
                });
            }

            if key.eq_ignore_ascii_case("subscriptions") {
                subscription_id = Some(value.to_string());
            } else if key.eq_ignore_ascii_case("resourcegroups") {
                resource_group = Some(value.to_string());
            } else if key.eq_ignore_ascii_case("providers") {
                provider = Some(value.to_string());
            } else {
                segments.push((key.to_string(), value.to_string()));
            }
        }

        let subscription_id = subscription_id.ok_or_else(|| IdError::MissingSegment {
            id: raw.to_string(),
            segment: "subscriptions".to_string(),
        })?;

        Ok(Self {
            subscription_id,
            resource_group,
            provider,
            segments,
            raw: raw.to_string(),
        })
    }

    /// The value of the named segment, matched case-insensitively.
    pub fn segment(&self, key: &str) -> Result<&str, IdError> {
        self.segments
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| IdError::MissingSegment {
                id: self.raw.clone(),
                segment: key.to_string(),
            })
    }

    /// The resource type path under the provider namespace, e.g.
    /// `storageAccounts` or `storageAccounts/blobServices` for nested types.
    pub fn type_path(&self) -> Option<String> {
        if self.segments.is_empty() {
            return None;
        }
        Some(
            self.segments
                .iter()
                .map(|(k, _)| k.as_str())
                .collect::<Vec<_>>()
                .join("/"),
        )
    }

    /// The resource group, or an error when the ID is not group-scoped.
    pub fn require_resource_group(&self) -> Result<&str, IdError> {
        self.resource_group
            .as_deref()
            .ok_or_else(|| IdError::MissingSegment {
                id: self.raw.clone(),
                segment: "resourceGroups".to_string(),
            })
    }

    /// Error unless the ID's provider namespace matches `namespace`.
    pub fn require_provider(&self, namespace: &str) -> Result<(), IdError> {
        match &self.provider {
            Some(p) if p.eq_ignore_ascii_case(namespace) => Ok(()),
            _ => Err(IdError::MissingSegment {
                id: self.raw.clone(),
                segment: format!("providers/{}", namespace),
            }),
        }
    }
}

/// The ID of a resource group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGroupId {
    /// Subscription the group lives in.
    pub subscription_id: String,
    /// Group name.
    pub name: String,
}

impl ResourceGroupId {
    /// Build an ID from its parts.
    pub fn new(subscription_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            name: name.into(),
        }
    }

    /// Parse a resource group ID string.
    pub fn parse(input: &str) -> Result<Self, IdError> {
        let id = ResourceId::parse(input)?;
        let name = id.require_resource_group()?.to_string();
        Ok(Self {
            subscription_id: id.subscription_id,
            name,
        })
    }
}

impl fmt::Display for ResourceGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, self.name
        )
    }
}

/// The ID of a consumption budget, at subscription or resource group scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetId {
    /// Subscription the budget applies to.
    pub subscription_id: String,
    /// Resource group, when the budget is group-scoped.
    pub resource_group: Option<String>,
    /// Budget name.
    pub name: String,
}

impl BudgetId {
    /// A subscription-scoped budget ID.
    pub fn subscription(subscription_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: None,
            name: name.into(),
        }
    }

    /// A resource-group-scoped budget ID.
    pub fn resource_group(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: Some(resource_group.into()),
            name: name.into(),
        }
    }

    /// Parse a budget ID string of either scope.
    pub fn parse(input: &str) -> Result<Self, IdError> {
        let id = ResourceId::parse(input)?;
        id.require_provider("Microsoft.Consumption")?;
        let name = id.segment("budgets")?.to_string();
        Ok(Self {
            subscription_id: id.subscription_id,
            resource_group: id.resource_group,
            name,
        })
    }

    /// The ARM scope the budget is attached to.
    pub fn scope(&self) -> String {
        match &self.resource_group {
            Some(rg) => format!(
                "/subscriptions/{}/resourceGroups/{}",
                self.subscription_id, rg
            ),
            None => format!("/subscriptions/{}", self.subscription_id),
        }
    }
}

impl fmt::Display for BudgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/providers/Microsoft.Consumption/budgets/{}",
            self.scope(),
            self.name
        )
    }
}

/// The ID of a template deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentId {
    /// Subscription the deployment ran in.
    pub subscription_id: String,
    /// Resource group the deployment targets.
    pub resource_group: String,
    /// Deployment name.
    pub name: String,
}

impl DeploymentId {
    /// Build an ID from its parts.
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            name: name.into(),
        }
    }

    /// Parse a deployment ID string.
    pub fn parse(input: &str) -> Result<Self, IdError> {
        let id = ResourceId::parse(input)?;
        id.require_provider("Microsoft.Resources")?;
        let resource_group = id.require_resource_group()?.to_string();
        let name = id.segment("deployments")?.to_string();
        Ok(Self {
            subscription_id: id.subscription_id,
            resource_group,
            name,
        })
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Resources/deployments/{}",
            self.subscription_id, self.resource_group, self.name
        )
    }
}
