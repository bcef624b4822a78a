//! Authorized REST calls to the vault API.
//!
//! Client-side (csr): real HTTP calls via `gloo-net`.
//! Native builds: requests fail with [`ApiError::Transport`] since there is
//! no browser fetch to send them through.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every request carries `Authorization: Bearer <token>` taken fresh from the
//! auth machine, so an expired token is refreshed by the gateway before use.
//! A blank token never goes on the wire; the call short-circuits to
//! [`ApiError::Unauthenticated`] instead.

#![allow(clippy::unused_async)]

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::state::auth::AuthMachine;

/// Failure of an authorized API call.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("no active session")]
    Unauthenticated,
    #[error("session rejected by the API")]
    Unauthorized,
    #[error("request failed ({status}): {message}")]
    Status { status: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// `Bearer` header value for `token`, or `None` when there is no token.
#[must_use]
pub fn bearer_header(token: &str) -> Option<String> {
    let token = token.trim();
    (!token.is_empty()).then(|| format!("Bearer {token}"))
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Human-readable message from an error body, preferring `{"error": ..}` or
/// `{"message": ..}` JSON fields.
fn error_message(status: u16, body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let field = parsed.as_ref().and_then(|value| {
        ["error", "message"]
            .iter()
            .find_map(|key| value.get(*key).and_then(serde_json::Value::as_str))
            .map(str::to_owned)
    });
    match field {
        Some(message) => message,
        None if body.trim().is_empty() => format!("status {status}"),
        None => body.trim().to_owned(),
    }
}

fn classify_status(status: u16, body: &str) -> Result<(), ApiError> {
    match status {
        200..=299 => Ok(()),
        401 => Err(ApiError::Unauthorized),
        _ => Err(ApiError::Status { status, message: error_message(status, body) }),
    }
}

fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Method {
    Get,
    Post,
}

/// HTTP client for the vault API, authorized through the auth machine.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    machine: Rc<AuthMachine>,
}

impl ApiClient {
    pub fn new(machine: Rc<AuthMachine>) -> Self {
        Self { base_url: machine.config().api_url.clone(), machine }
    }

    /// `GET {api_url}/{path}` decoded as JSON.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = self.send(Method::Get, path, None).await?;
        decode_body(&body)
    }

    /// `POST {api_url}/{path}` with a JSON body, response decoded as JSON.
    ///
    /// # Errors
    ///
    /// See [`ApiError`].
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, payload: &B) -> Result<T, ApiError> {
        let json = serde_json::to_string(payload).map_err(|e| ApiError::Decode(e.to_string()))?;
        let body = self.send(Method::Post, path, Some(json)).await?;
        decode_body(&body)
    }

    async fn send(&self, method: Method, path: &str, json: Option<String>) -> Result<String, ApiError> {
        let token = self.machine.access_token().await.unwrap_or_default();
        let Some(authorization) = bearer_header(&token) else {
            log::debug!("skipping {method:?} {path}: no access token");
            return Err(ApiError::Unauthenticated);
        };
        let url = endpoint(&self.base_url, path);
        let (status, body) = transmit(method, &url, &authorization, json).await?;
        if let Err(err) = classify_status(status, &body) {
            if err == ApiError::Unauthorized {
                log::warn!("API rejected the session token for {url}; re-checking session");
                self.machine.refresh_session();
            } else {
                log::warn!("{method:?} {url} failed: {err}");
            }
            return Err(err);
        }
        Ok(body)
    }
}

async fn transmit(method: Method, url: &str, authorization: &str, json: Option<String>) -> Result<(u16, String), ApiError> {
    #[cfg(feature = "csr")]
    {
        use gloo_net::http::Request;

        let builder = match method {
            Method::Get => Request::get(url),
            Method::Post => Request::post(url),
        }
        .header("Authorization", authorization);
        let request = match json {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(json)
                .map_err(|e| ApiError::Transport(e.to_string()))?,
            None => builder.build().map_err(|e| ApiError::Transport(e.to_string()))?,
        };
        let resp = request.send().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok((status, body))
    }
    #[cfg(not(feature = "csr"))]
    {
        let _ = (method, authorization, json);
        Err(ApiError::Transport(format!("{url}: not available outside the browser")))
    }
}
