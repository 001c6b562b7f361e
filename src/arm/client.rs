//! The outbound Azure Resource Manager REST seam.
//!
//! [`ArmApi`] is the trait resources call; [`ArmClient`] is the reqwest-backed
//! implementation used in production. Tests swap in the in-memory mock from
//! [`crate::testing`]. The client stays deliberately thin: path + api-version
//! in, JSON body out, with error bodies decoded into [`ArmError`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::arm::auth::TokenCredential;

/// A known Azure cloud environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    /// Environment name as configured.
    pub name: &'static str,
    /// Resource Manager endpoint.
    pub management: &'static str,
    /// AAD login endpoint.
    pub login: &'static str,
}

/// The worldwide public cloud.
pub const PUBLIC: Environment = Environment {
    name: "public",
    management: "https://management.azure.com",
    login: "https://login.microsoftonline.com",
};

/// The US Government cloud.
pub const US_GOVERNMENT: Environment = Environment {
    name: "usgovernment",
    management: "https://management.usgovcloudapi.net",
    login: "https://login.microsoftonline.us",
};

/// The China cloud operated by 21Vianet.
pub const CHINA: Environment = Environment {
    name: "china",
    management: "https://management.chinacloudapi.cn",
    login: "https://login.chinacloudapi.cn",
};

impl Environment {
    /// Look up an environment by its configured name.
    pub fn from_name(name: &str) -> Option<Environment> {
        match name.to_ascii_lowercase().as_str() {
            "public" => Some(PUBLIC),
            "usgovernment" => Some(US_GOVERNMENT),
            "china" => Some(CHINA),
            _ => None,
        }
    }
}

/// A decoded ARM response.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmResponse {
    /// HTTP status code.
    pub status: u16,
    /// Decoded JSON body; `Null` when the response had none.
    pub body: Value,
    /// Polling URL from the `Azure-AsyncOperation` or `Location` header,
    /// present when the operation completes asynchronously.
    pub async_operation: Option<String>,
}

impl ArmResponse {
    /// A synchronous success response, mostly useful in tests.
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body,
            async_operation: None,
        }
    }

    /// The `properties.provisioningState` field, when the body carries one.
    pub fn provisioning_state(&self) -> Option<&str> {
        self.body
            .get("properties")
            .and_then(|p| p.get("provisioningState"))
            .and_then(Value::as_str)
    }
}

/// Errors from the ARM REST seam.
#[derive(Debug, Error)]
pub enum ArmError {
    /// The API answered with a non-success status.
    #[error("status {status} ({code}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Azure error code, e.g. `ResourceGroupNotFound`.
        code: String,
        /// Azure error message.
        message: String,
    },

    /// The request never produced a response.
    #[error("sending request: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the JSON we expected.
    #[error("decoding response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Token acquisition failed.
    #[error("acquiring token: {0}")]
    Auth(String),

    /// A long-running operation reported failure.
    #[error("operation failed: {0}")]
    OperationFailed(String),

    /// A wait loop ran out of time.
    #[error("timed out waiting for {what} after {seconds}s (last state {last_state:?})")]
    WaitTimeout {
        /// What was being waited on.
        what: String,
        /// The configured timeout in seconds.
        seconds: u64,
        /// The last observed state.
        last_state: String,
    },

    /// A wait loop observed a state outside its pending set.
    #[error("unexpected state {state:?} while waiting for {what}")]
    UnexpectedState {
        /// The state that was observed.
        state: String,
        /// What was being waited on.
        what: String,
    },
}

impl ArmError {
    /// Construct an API error.
    pub fn api(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether the error means the resource does not exist.
    ///
    /// The equivalent of checking for a 404 before clearing state on Read.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

/// The REST operations resources perform against ARM.
#[async_trait]
pub trait ArmApi: Send + Sync {
    /// GET a resource by its ID path.
    async fn get(&self, path: &str, api_version: &str) -> Result<ArmResponse, ArmError>;

    /// PUT (create or update) a resource.
    async fn put(&self, path: &str, api_version: &str, body: Value)
        -> Result<ArmResponse, ArmError>;

    /// POST an action, optionally with a body.
    async fn post(
        &self,
        path: &str,
        api_version: &str,
        body: Option<Value>,
    ) -> Result<ArmResponse, ArmError>;

    /// DELETE a resource by its ID path.
    async fn delete(&self, path: &str, api_version: &str) -> Result<ArmResponse, ArmError>;

    /// GET an absolute URL, used to poll async operation endpoints.
    async fn get_url(&self, url: &str) -> Result<ArmResponse, ArmError>;
}

/// The production [`ArmApi`] implementation over HTTPS.
pub struct ArmClient {
    http: reqwest::Client,
    credential: Arc<dyn TokenCredential>,
    environment: Environment,
    user_agent: String,
}

impl ArmClient {
    /// Build a client for the given environment.
    pub fn new(credential: Arc<dyn TokenCredential>, environment: Environment) -> Self {
        Self {
            http: reqwest::Client::new(),
            credential,
            environment,
            user_agent: format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ),
        }
    }

    /// Append a `pid-` partner attribution marker to the User-Agent.
    pub fn with_partner_id(mut self, partner_id: &str) -> Self {
        self.user_agent = format!("{} pid-{}", self.user_agent, partner_id);
        self
    }

    fn url_for(&self, path: &str, api_version: &str) -> String {
        format!(
            "{}{}?api-version={}",
            self.environment.management, path, api_version
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<ArmResponse, ArmError> {
        let token = self.credential.token().await?;
        let response = request
            .bearer_auth(&token.token)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await?;

        let status = response.status().as_u16();
        let async_operation = ["azure-asyncoperation", "location"]
            .iter()
            .find_map(|h| response.headers().get(*h))
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };

        if !(200..300).contains(&status) {
            let code = body
                .pointer("/error/code")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string();
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("the Azure API returned an error without a message")
                .to_string();
            return Err(ArmError::api(status, code, message));
        }

        Ok(ArmResponse {
            status,
            body,
            async_operation,
        })
    }
}

#[async_trait]
impl ArmApi for ArmClient {
    async fn get(&self, path: &str, api_version: &str) -> Result<ArmResponse, ArmError> {
        debug!(path, api_version, "GET");
        self.send(self.http.get(self.url_for(path, api_version))).await
    }

    async fn put(
        &self,
        path: &str,
        api_version: &str,
        body: Value,
    ) -> Result<ArmResponse, ArmError> {
        debug!(path, api_version, "PUT");
        self.send(self.http.put(self.url_for(path, api_version)).json(&body))
            .await
    }

    async fn post(
        &self,
        path: &str,
        api_version: &str,
        body: Option<Value>,
    ) -> Result<ArmResponse, ArmError> {
        debug!(path, api_version, "POST");
        let mut request = self.http.post(self.url_for(path, api_version));
        if let Some(body) = body {
            request = request.json(&body);
        } else {
            // ARM rejects POSTs without a Content-Length.
            request = request.header(reqwest::header::CONTENT_LENGTH, 0);
        }
        self.send(request).await
    }

    async fn delete(&self, path: &str, api_version: &str) -> Result<ArmResponse, ArmError> {
        debug!(path, api_version, "DELETE");
        self.send(self.http.delete(self.url_for(path, api_version)))
            .await
    }

    async fn get_url(&self, url: &str) -> Result<ArmResponse, ArmError> {
        debug!(url, "GET (absolute)");
        self.send(self.http.get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn environment_lookup_is_case_insensitive() {
        assert_eq!(Environment::from_name("Public"), Some(PUBLIC));
        assert_eq!(Environment::from_name("USGovernment"), Some(US_GOVERNMENT));
        assert_eq!(Environment::from_name("germany"), None);
    }

    #[test]
    fn not_found_detection() {
        assert!(ArmError::api(404, "NotFound", "gone").is_not_found());
        assert!(!ArmError::api(500, "InternalError", "boom").is_not_found());
        assert!(!ArmError::OperationFailed("x".into()).is_not_found());
    }

    #[test]
    fn provisioning_state_extraction() {
        let rsp = ArmResponse::ok(json!({
            "properties": {"provisioningState": "Succeeded"}
        }));
        assert_eq!(rsp.provisioning_state(), Some("Succeeded"));

        let rsp = ArmResponse::ok(json!({"name": "example"}));
        assert_eq!(rsp.provisioning_state(), None);
    }

    #[test]
    fn api_error_display_carries_code_and_message() {
        let err = ArmError::api(409, "Conflict", "already exists");
        assert_eq!(err.to_string(), "status 409 (Conflict): already exists");
    }

    #[test]
    fn partner_id_is_appended_to_the_user_agent() {
        let credential = Arc::new(crate::arm::auth::StaticCredential("t".into()));
        let client = ArmClient::new(credential.clone(), PUBLIC);
        assert!(client.user_agent.starts_with("hemmer-provider-azurerm/"));
        assert!(!client.user_agent.contains("pid-"));

        let client = ArmClient::new(credential, PUBLIC)
            .with_partner_id("6d3ac68c-5f28-4f66-8a0f-a86b1e94a274");
        assert!(client
            .user_agent
            .ends_with(" pid-6d3ac68c-5f28-4f66-8a0f-a86b1e94a274"));
    }
}
