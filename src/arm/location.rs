//! Azure location handling.
//!
//! Locations come back from the API in display form ("West Europe") and are
//! configured in all sorts of casings, so comparisons go through
//! [`normalize_location`]. When enhanced validation is on, the provider
//! fetches the subscription's location catalog at configure time and
//! validates `location` attributes against it.

use serde_json::Value;

use crate::arm::client::{ArmApi, ArmError};
use crate::schema::Diagnostic;

const LOCATIONS_API_VERSION: &str = "2020-06-01";

/// Canonical form used for storage and comparison: lowercased, spaces
/// removed. "West Europe" and "westeurope" normalize identically.
pub fn normalize_location(location: &str) -> String {
    location
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Fetch the normalized names of every location the subscription can use.
pub async fn fetch_locations(
    api: &dyn ArmApi,
    subscription_id: &str,
) -> Result<Vec<String>, ArmError> {
    let response = api
        .get(
            &format!("/subscriptions/{}/locations", subscription_id),
            LOCATIONS_API_VERSION,
        )
        .await?;

    let mut names: Vec<String> = response
        .body
        .get("value")
        .and_then(Value::as_array)
        .map(|locations| {
            locations
                .iter()
                .filter_map(|l| l.get("name").and_then(Value::as_str))
                .map(normalize_location)
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names.dedup();
    Ok(names)
}

/// Validate a `location` attribute value.
///
/// Without a catalog only emptiness is checked; with one, the value must
/// name a location the subscription can actually deploy to.
pub fn validate_location(value: &Value, path: &str, known: Option<&[String]>) -> Vec<Diagnostic> {
    let location = match value.as_str() {
        Some(s) => s,
        None => {
            return vec![
                Diagnostic::error(format!("{} must be a string", path)).with_attribute(path),
            ];
        },
    };
    if location.trim().is_empty() {
        return vec![Diagnostic::error(format!("{} must not be empty", path)).with_attribute(path)];
    }

    if let Some(known) = known {
        let normalized = normalize_location(location);
        if !known.iter().any(|k| *k == normalized) {
            return vec![Diagnostic::error(format!(
                "{:?} is not a valid location for this subscription",
                location
            ))
            .with_detail(format!("known locations: {}", known.join(", ")))
            .with_attribute(path)];
        }
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalization_strips_spaces_and_case() {
        assert_eq!(normalize_location("West Europe"), "westeurope");
        assert_eq!(normalize_location("westeurope"), "westeurope");
        assert_eq!(normalize_location("UK South"), "uksouth");
    }

    #[test]
    fn location_must_be_a_nonempty_string() {
        assert!(validate_location(&json!("westeurope"), "location", None).is_empty());
        assert!(!validate_location(&json!(""), "location", None).is_empty());
        assert!(!validate_location(&json!(42), "location", None).is_empty());
    }

    #[test]
    fn catalog_membership_is_checked_after_normalization() {
        let known = vec!["westeurope".to_string(), "uksouth".to_string()];

        assert!(validate_location(&json!("West Europe"), "location", Some(&known)).is_empty());
        let diags = validate_location(&json!("Mars North"), "location", Some(&known));
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("not a valid location"));
    }
}
