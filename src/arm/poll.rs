//! Waiting on the Azure control plane.
//!
//! Two flavors: [`StateWaiter`] polls a refresh closure until a resource
//! reports a target state, and [`wait_for_operation`] follows the
//! `Azure-AsyncOperation`/`Location` URL a long-running operation hands back
//! until it settles.

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use crate::arm::client::{ArmApi, ArmError, ArmResponse};

/// How often async operation endpoints are polled.
const OPERATION_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Polls a refresh function until a target state is observed.
///
/// States outside both the pending and target sets fail the wait
/// immediately; resources use that to surface `Failed` provisioning states.
#[derive(Debug, Clone)]
pub struct StateWaiter {
    pending: Vec<String>,
    target: Vec<String>,
    delay: Duration,
    interval: Duration,
    timeout: Duration,
}

impl StateWaiter {
    /// A waiter moving from `pending` states to `target` states.
    pub fn new<S: Into<String> + Clone>(pending: &[S], target: &[S]) -> Self {
        Self {
            pending: pending.iter().cloned().map(Into::into).collect(),
            target: target.iter().cloned().map(Into::into).collect(),
            delay: Duration::ZERO,
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(30 * 60),
        }
    }

    /// Sleep this long before the first refresh. Some APIs take a moment
    /// before the new state becomes visible at all.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Time between refreshes.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Total time budget for the wait.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Poll `refresh` until a target state appears.
    ///
    /// Returns the value the final refresh produced.
    pub async fn wait<F, Fut>(&self, what: &str, mut refresh: F) -> Result<Value, ArmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(Value, String), ArmError>>,
    {
        let started = Instant::now();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut last_state = String::new();
        loop {
            if started.elapsed() > self.timeout {
                return Err(ArmError::WaitTimeout {
                    what: what.to_string(),
                    seconds: self.timeout.as_secs(),
                    last_state,
                });
            }

            let (value, state) = refresh().await?;
            debug!(what, state = %state, "state refresh");

            if self.target.iter().any(|t| t == &state) {
                return Ok(value);
            }
            if !self.pending.iter().any(|p| p == &state) {
                return Err(ArmError::UnexpectedState {
                    state,
                    what: what.to_string(),
                });
            }

            last_state = state;
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Wait until the async operation behind `response` settles.
///
/// Responses without a polling URL completed synchronously and return at
/// once. Otherwise the URL is polled until its body reports `Succeeded`,
/// or the wait fails on `Failed`/`Canceled` or the timeout.
pub async fn wait_for_operation(
    api: &dyn ArmApi,
    response: &ArmResponse,
    what: &str,
    timeout: Duration,
) -> Result<(), ArmError> {
    let url = match &response.async_operation {
        Some(url) => url.clone(),
        None => return Ok(()),
    };

    let started = Instant::now();
    let mut last_state = String::from("InProgress");
    loop {
        if started.elapsed() > timeout {
            return Err(ArmError::WaitTimeout {
                what: what.to_string(),
                seconds: timeout.as_secs(),
                last_state,
            });
        }

        let poll = api.get_url(&url).await?;
        let state = poll
            .body
            .get("status")
            .and_then(Value::as_str)
            // A 200 with no status body means the operation finished and the
            // URL now serves the resource itself.
            .unwrap_or("Succeeded")
            .to_string();
        debug!(what, state = %state, "operation poll");

        match state.as_str() {
            "Succeeded" => return Ok(()),
            "Failed" | "Canceled" => {
                let message = poll
                    .body
                    .pointer("/error/message")
                    .and_then(Value::as_str)
                    .unwrap_or(&state)
                    .to_string();
                return Err(ArmError::OperationFailed(format!("{}: {}", what, message)));
            },
            _ => {
                last_state = state;
                tokio::time::sleep(OPERATION_POLL_INTERVAL).await;
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn waiter_reaches_the_target_state() {
        let calls = AtomicU32::new(0);
        let waiter = StateWaiter::new(&["Creating", "Updating"], &["Succeeded"])
            .interval(Duration::from_millis(1));

        let value = waiter
            .wait("deployment", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                let state = if n < 2 { "Creating" } else { "Succeeded" };
                Ok((json!({"n": n}), state.to_string()))
            })
            .await
            .unwrap();

        assert_eq!(value["n"], 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn waiter_fails_on_unexpected_states() {
        let waiter =
            StateWaiter::new(&["Creating"], &["Succeeded"]).interval(Duration::from_millis(1));

        let err = waiter
            .wait("deployment", || async {
                Ok((Value::Null, "Failed".to_string()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ArmError::UnexpectedState { state, .. } if state == "Failed"));
    }

    #[tokio::test]
    async fn waiter_times_out() {
        let waiter = StateWaiter::new(&["Creating"], &["Succeeded"])
            .interval(Duration::from_millis(1))
            .timeout(Duration::from_millis(5));

        let err = waiter
            .wait("deployment", || async {
                Ok((Value::Null, "Creating".to_string()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ArmError::WaitTimeout { last_state, .. } if last_state == "Creating"));
    }

    #[tokio::test]
    async fn synchronous_responses_need_no_polling() {
        // No ArmApi calls expected; a panicking mock proves it.
        struct NoApi;
        #[async_trait::async_trait]
        impl ArmApi for NoApi {
            async fn get(&self, _: &str, _: &str) -> Result<ArmResponse, ArmError> {
                unreachable!()
            }
            async fn put(&self, _: &str, _: &str, _: Value) -> Result<ArmResponse, ArmError> {
                unreachable!()
            }
            async fn post(
                &self,
                _: &str,
                _: &str,
                _: Option<Value>,
            ) -> Result<ArmResponse, ArmError> {
                unreachable!()
            }
            async fn delete(&self, _: &str, _: &str) -> Result<ArmResponse, ArmError> {
                unreachable!()
            }
            async fn get_url(&self, _: &str) -> Result<ArmResponse, ArmError> {
                unreachable!()
            }
        }

        let response = ArmResponse::ok(json!({}));
        wait_for_operation(&NoApi, &response, "delete", Duration::from_secs(1))
            .await
            .unwrap();
    }
}
