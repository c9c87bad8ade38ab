//! Resilient request execution.
//!
//! [`RequestExecutor`] issues authenticated calls through an
//! [`EngineSession`], lazily re-authenticating an inactive session and
//! retrying a call exactly once when the engine answers 401. The bound is
//! strict: a second 401, or any non-401 failure, surfaces immediately, so
//! permanently invalid credentials can never loop.

use crate::engine::session::{EngineSession, SessionLifecycle};
use crate::engine::transport::{EngineRequest, EngineTransport};
use crate::engine::types::{EngineError, FailureKind};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

pub struct RequestExecutor {
    transport: Arc<dyn EngineTransport>,
    lifecycle: SessionLifecycle,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn EngineTransport>) -> Self {
        let lifecycle = SessionLifecycle::new(transport.clone());
        Self {
            transport,
            lifecycle,
        }
    }

    pub fn lifecycle(&self) -> &SessionLifecycle {
        &self.lifecycle
    }

    /// Executes one logical call against the engine.
    ///
    /// At most two upstream attempts are made: the original call, plus one
    /// retry after a 401 triggers a re-login. A successful re-login mutates
    /// the passed session in place, so callers observe the refreshed tokens
    /// after this returns. An empty 2xx body parses to an empty JSON object.
    pub async fn execute(
        &self,
        session: &mut EngineSession,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value, EngineError> {
        if !session.is_active() {
            debug!(path, "session inactive, authenticating before the request");
            self.lifecycle.refresh(session).await?;
        }

        let mut retried = false;
        loop {
            let request = EngineRequest {
                method: method.clone(),
                path,
                query,
                body,
            };
            let response = self
                .transport
                .send(request, session)
                .await
                .map_err(|err| {
                    error!(path, error = %err, "network failure talking to the engine");
                    EngineError::Request {
                        status: FailureKind::Network,
                        message: err.to_string(),
                    }
                })?;

            if (200..300).contains(&response.status) {
                return parse_body(response.status, &response.body);
            }

            if response.status == 401 && !retried {
                info!(path, "session expired, re-authenticating and retrying once");
                retried = true;
                self.lifecycle.refresh(session).await?;
                continue;
            }

            error!(
                path,
                status = response.status,
                "engine returned an error response"
            );
            return Err(EngineError::Request {
                status: FailureKind::Http(response.status),
                message: response.body,
            });
        }
    }
}

fn parse_body(status: u16, body: &str) -> Result<Value, EngineError> {
    if body.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(body).map_err(|err| EngineError::Request {
        status: FailureKind::Http(status),
        message: format!("engine returned an unparseable body: {err}"),
    })
}
