//! Error types for the provider.

use thiserror::Error;

use crate::arm::id::IdError;
use crate::arm::ArmError;

/// Errors surfaced by provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The remote resource does not exist.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Configuration failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// The provider has not been configured, or the configuration is unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is not registered.
    #[error("unknown resource type: {0}")]
    UnknownResource(String),

    /// A call to the Azure Resource Manager API failed.
    #[error("Azure Resource Manager request failed: {0}")]
    Api(#[from] ArmError),

    /// A resource ID string could not be parsed.
    #[error("parsing resource ID: {0}")]
    Id(#[from] IdError),

    /// State or configuration could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The gRPC transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// The operation exceeded its configured timeout.
    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// The operation is not supported by this resource type.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl ProviderError {
    /// Whether the error ultimately means the remote resource is gone.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Api(err) => err.is_not_found(),
            _ => false,
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::DeadlineExceeded(msg) => tonic::Status::deadline_exceeded(msg),
            ProviderError::Unsupported(msg) => tonic::Status::unimplemented(msg),
            err @ ProviderError::Serialization(_) => {
                tonic::Status::invalid_argument(err.to_string())
            },
            err @ ProviderError::Id(_) => tonic::Status::invalid_argument(err.to_string()),
            err @ ProviderError::Transport(_) => tonic::Status::unavailable(err.to_string()),
            err @ ProviderError::Api(_) => tonic::Status::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = ProviderError::NotFound("Resource Group \"example\"".to_string());
        assert_eq!(
            err.to_string(),
            "resource not found: Resource Group \"example\""
        );

        let err = ProviderError::UnknownResource("azurerm_widget".to_string());
        assert_eq!(err.to_string(), "unknown resource type: azurerm_widget");
    }

    #[test]
    fn status_codes_match_variants() {
        let status: tonic::Status = ProviderError::NotFound("x".into()).into();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let status: tonic::Status = ProviderError::Validation("x".into()).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status: tonic::Status = ProviderError::Configuration("x".into()).into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let status: tonic::Status = ProviderError::DeadlineExceeded("x".into()).into();
        assert_eq!(status.code(), tonic::Code::DeadlineExceeded);

        let status: tonic::Status = ProviderError::Unsupported("x".into()).into();
        assert_eq!(status.code(), tonic::Code::Unimplemented);
    }

    #[test]
    fn not_found_detection_covers_api_errors() {
        let err = ProviderError::Api(ArmError::api(404, "ResourceGroupNotFound", "gone"));
        assert!(err.is_not_found());

        let err = ProviderError::Api(ArmError::api(403, "AuthorizationFailed", "denied"));
        assert!(!err.is_not_found());
    }
}
