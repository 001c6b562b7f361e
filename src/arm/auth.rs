//! Token acquisition for the ARM client.
//!
//! One flow is enough for a provider: OAuth2 client credentials against the
//! AAD tenant's token endpoint, with the token cached until shortly before
//! expiry. [`StaticCredential`] exists for tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::arm::client::{ArmError, Environment};

/// Tokens are refreshed this long before they actually expire.
const EXPIRY_SLACK_SECONDS: i64 = 300;

/// A bearer token with its expiry.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// The raw bearer token.
    pub token: String,
    /// When the token stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        self.expires_at - Duration::seconds(EXPIRY_SLACK_SECONDS) > Utc::now()
    }
}

/// Something that can mint ARM bearer tokens.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Return a token valid for the Resource Manager audience.
    async fn token(&self) -> Result<AccessToken, ArmError>;
}

/// OAuth2 client-credentials flow against AAD.
pub struct ClientSecretCredential {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    environment: Environment,
    http: reqwest::Client,
    cached: Mutex<Option<AccessToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    // AAD's v1 endpoint returns this as a string of seconds.
    expires_in: serde_json::Value,
}

impl ClientSecretCredential {
    /// Build a credential for a service principal.
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        environment: Environment,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            environment,
            http: reqwest::Client::new(),
            cached: Mutex::new(None),
        }
    }

    async fn request_token(&self) -> Result<AccessToken, ArmError> {
        let url = format!("{}/{}/oauth2/token", self.environment.login, self.tenant_id);
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("resource", self.environment.management),
        ];

        let response = self.http.post(&url).form(&params).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ArmError::Auth(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let decoded: TokenResponse = serde_json::from_str(&body)
            .map_err(|err| ArmError::Auth(format!("decoding token response: {}", err)))?;
        let expires_in = match &decoded.expires_in {
            serde_json::Value::String(s) => s.parse::<i64>().unwrap_or(0),
            serde_json::Value::Number(n) => n.as_i64().unwrap_or(0),
            _ => 0,
        };

        debug!(expires_in, "acquired ARM token");
        Ok(AccessToken {
            token: decoded.access_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        })
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn token(&self) -> Result<AccessToken, ArmError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_fresh() {
                return Ok(token.clone());
            }
        }

        let token = self.request_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}

/// A fixed token that never expires; test use only.
pub struct StaticCredential(pub String);

#[async_trait]
impl TokenCredential for StaticCredential {
    async fn token(&self) -> Result<AccessToken, ArmError> {
        Ok(AccessToken {
            token: self.0.clone(),
            expires_at: Utc::now() + Duration::days(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freshness_respects_the_slack_window() {
        let fresh = AccessToken {
            token: "t".into(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        assert!(fresh.is_fresh());

        let nearly_expired = AccessToken {
            token: "t".into(),
            expires_at: Utc::now() + Duration::seconds(60),
        };
        assert!(!nearly_expired.is_fresh());
    }

    #[tokio::test]
    async fn static_credential_returns_its_token() {
        let cred = StaticCredential("fixed".into());
        let token = cred.token().await.unwrap();
        assert_eq!(token.token, "fixed");
        assert!(token.is_fresh());
    }
}
