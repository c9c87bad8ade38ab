//! Transport seam between the engine integration and the wire.
//!
//! [`EngineTransport`] is the trait the lifecycle manager and request
//! executor are written against; [`HttpTransport`] is the reqwest-backed
//! production implementation. Tests substitute a scripted transport so the
//! retry and re-authentication logic can be exercised without a real HTTP
//! stack.
//!
//! Session state is explicit: the HTTP client carries no cookie store.
//! Login responses are scanned for the session and anti-forgery cookies,
//! and every subsequent request replays them from the [`EngineSession`]
//! passed alongside the request.

use crate::engine::session::{Credentials, EngineSession};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Cookie holding the engine session identifier.
pub const SESSION_COOKIE: &str = "JSESSIONID";
/// Cookie and request header carrying the anti-forgery token.
pub const API_TOKEN_HEADER: &str = "X-Bonita-API-Token";

/// One upstream request, as handed to the transport by the executor.
#[derive(Debug, Clone)]
pub struct EngineRequest<'a> {
    pub method: Method,
    pub path: &'a str,
    pub query: &'a [(String, String)],
    pub body: Option<&'a Value>,
}

/// Raw upstream response. Non-success statuses are returned here, not as
/// errors; classifying them is the executor's job.
#[derive(Debug, Clone)]
pub struct EngineResponse {
    pub status: u16,
    pub body: String,
}

/// Result of a login attempt that produced an HTTP response.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub status: u16,
    pub session_token: Option<String>,
    pub api_token: Option<String>,
}

/// A transport-level failure: no HTTP response was received.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(format!("request to the engine timed out: {err}"))
        } else {
            Self::new(format!("network error reaching the engine: {err}"))
        }
    }
}

/// Wire access used by the session lifecycle and the request executor.
#[async_trait]
pub trait EngineTransport: Send + Sync {
    /// Form-post to the login endpoint. Any HTTP response, success or not,
    /// comes back as a [`LoginOutcome`]; `Err` means no response at all.
    async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, TransportError>;

    /// Best-effort logout. Returns the upstream status when one was received.
    async fn logout(&self, session: &EngineSession) -> Result<u16, TransportError>;

    /// Issue an API call carrying the session's tokens.
    async fn send(
        &self,
        request: EngineRequest<'_>,
        session: &EngineSession,
    ) -> Result<EngineResponse, TransportError>;
}

/// Production transport over reqwest.
#[derive(Debug)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
    login_timeout: Duration,
    request_timeout: Duration,
}

impl HttpTransport {
    pub fn new(
        base_url: Url,
        login_timeout: Duration,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        // Redirects are disabled: the login contract uses redirect=false and
        // the Set-Cookie headers must stay visible on the login response.
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("failed to build the engine HTTP client")?;

        Ok(Self {
            http,
            base_url,
            login_timeout,
            request_timeout,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    fn apply_session(
        &self,
        mut builder: reqwest::RequestBuilder,
        session: &EngineSession,
    ) -> reqwest::RequestBuilder {
        if let Some(token) = session.session_token() {
            let mut cookie = format!("{SESSION_COOKIE}={token}");
            if let Some(api_token) = session.api_token() {
                cookie.push_str(&format!("; {API_TOKEN_HEADER}={api_token}"));
            }
            builder = builder.header(header::COOKIE, cookie);
        }
        if let Some(api_token) = session.api_token() {
            builder = builder.header(API_TOKEN_HEADER, api_token);
        }
        builder
    }
}

#[async_trait]
impl EngineTransport for HttpTransport {
    async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, TransportError> {
        let response = self
            .http
            .post(self.endpoint("/loginservice"))
            .timeout(self.login_timeout)
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
                ("redirect", "false"),
            ])
            .send()
            .await?;

        let status = response.status().as_u16();
        let mut session_token = None;
        let mut api_token = None;
        for value in response.headers().get_all(header::SET_COOKIE) {
            if let Ok(raw) = value.to_str()
                && let Some((name, cookie_value)) = parse_set_cookie(raw)
            {
                match name {
                    SESSION_COOKIE => session_token = Some(cookie_value.to_string()),
                    API_TOKEN_HEADER => api_token = Some(cookie_value.to_string()),
                    _ => {}
                }
            }
        }

        Ok(LoginOutcome {
            status,
            session_token,
            api_token,
        })
    }

    async fn logout(&self, session: &EngineSession) -> Result<u16, TransportError> {
        let builder = self
            .http
            .get(self.endpoint("/logoutservice"))
            .timeout(self.login_timeout)
            .query(&[("redirect", "false")]);
        let response = self.apply_session(builder, session).send().await?;
        Ok(response.status().as_u16())
    }

    async fn send(
        &self,
        request: EngineRequest<'_>,
        session: &EngineSession,
    ) -> Result<EngineResponse, TransportError> {
        let mut builder = self
            .http
            .request(request.method, self.endpoint(request.path))
            .timeout(self.request_timeout)
            .query(&request.query);
        if let Some(body) = request.body {
            builder = builder.json(body);
        }
        let response = self.apply_session(builder, session).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(EngineResponse { status, body })
    }
}

/// Extracts `name=value` from the leading segment of a Set-Cookie header.
fn parse_set_cookie(raw: &str) -> Option<(&str, &str)> {
    let pair = raw.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    Some((name.trim(), value.trim()))
}
