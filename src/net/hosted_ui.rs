//! Hosted-UI (OAuth 2.0 authorization code + PKCE) identity gateway.
//!
//! SYSTEM CONTEXT
//! ==============
//! Talks to a Cognito-style hosted UI: `/oauth2/authorize` for sign-in,
//! `/oauth2/token` for code exchange and refresh, `/oauth2/revoke` and
//! `/logout` for sign-out. Tokens are kept as JSON in `localStorage`; the
//! in-flight `state` nonce and PKCE verifier are kept in `sessionStorage`.
//!
//! EVENTS
//! ======
//! Publishes `token-refresh` / `token-refresh-failure` when `fetch_session`
//! has to refresh an expired token set, and `signed-out` after a completed
//! remote sign-out. Sign-in success and failure are published by the
//! callback handler, not here.
//!
//! Network calls go through `gloo-net` in browser builds; elsewhere they fail
//! with `ProviderUnavailable`.

#![allow(clippy::unused_async)]

#[cfg(test)]
#[path = "hosted_ui_test.rs"]
mod hosted_ui_test;

use std::rc::Rc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::form_urlencoded;

use super::claims::decode_claims;
use super::gateway::{AuthError, IdentityGateway, TokenSet};
use crate::config::{AuthConfig, with_query};
use crate::state::events::{AuthBus, AuthEvent};
use crate::util::clock::now_epoch_secs;
use crate::util::navigate::Navigator;
use crate::util::storage::SessionStore;

/// `localStorage` key holding the serialized [`TokenSet`].
pub const TOKENS_KEY: &str = "vault.auth.tokens";
const FLOW_KEY: &str = "vault.auth.flow";
const EXPIRY_SKEW_SECS: i64 = 60;

/// `state` nonce and PKCE verifier for the sign-in attempt in progress.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct SignInFlow {
    state: String,
    verifier: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    id_token: Option<String>,
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Token endpoint failure, split by whether the provider answered at all.
#[derive(Debug, PartialEq, Eq)]
enum EndpointError {
    Transport(String),
    Rejected { status: u16, body: String },
}

impl EndpointError {
    fn into_exchange_error(self) -> AuthError {
        match self {
            Self::Transport(message) => AuthError::ProviderUnavailable(message),
            Self::Rejected { status, body } => AuthError::CodeExchangeFailed(rejection_message(status, &body)),
        }
    }
}

/// Production [`IdentityGateway`] for the hosted UI.
pub struct HostedUiGateway {
    config: Rc<AuthConfig>,
    tokens: Rc<dyn SessionStore>,
    flow: Rc<dyn SessionStore>,
    bus: AuthBus,
    navigator: Rc<dyn Navigator>,
}

impl HostedUiGateway {
    /// `tokens` should be shared across tabs (`localStorage`); `flow` should
    /// be per-tab (`sessionStorage`).
    pub fn new(
        config: Rc<AuthConfig>,
        tokens: Rc<dyn SessionStore>,
        flow: Rc<dyn SessionStore>,
        bus: AuthBus,
        navigator: Rc<dyn Navigator>,
    ) -> Self {
        Self { config, tokens, flow, bus, navigator }
    }

    /// Hosted sign-in URL for one attempt.
    #[must_use]
    pub fn authorize_url(&self, state: &str, code_challenge: &str) -> String {
        let scope = self.config.scopes.join(" ");
        with_query(
            &self.config.authorize_endpoint(),
            &[
                ("client_id", self.config.client_id.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("redirect_uri", self.config.redirect_sign_in.as_str()),
                ("state", state),
                ("code_challenge_method", "S256"),
                ("code_challenge", code_challenge),
            ],
        )
    }

    fn load_tokens(&self) -> Option<TokenSet> {
        let raw = self.tokens.get(TOKENS_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(tokens) => Some(tokens),
            Err(err) => {
                log::warn!("discarding unreadable stored tokens: {err}");
                self.tokens.remove(TOKENS_KEY);
                None
            }
        }
    }

    fn save_tokens(&self, tokens: &TokenSet) {
        match serde_json::to_string(tokens) {
            Ok(raw) => self.tokens.set(TOKENS_KEY, &raw),
            Err(err) => log::error!("failed to serialize tokens: {err}"),
        }
    }

    fn clear_tokens(&self) {
        self.tokens.remove(TOKENS_KEY);
    }

    fn take_flow(&self) -> Option<SignInFlow> {
        let raw = self.flow.get(FLOW_KEY)?;
        self.flow.remove(FLOW_KEY);
        serde_json::from_str(&raw).ok()
    }

    async fn refresh(&self, current: &TokenSet, refresh_token: &str) -> Result<Option<TokenSet>, AuthError> {
        let body = form(&[
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token),
        ]);
        match self.post_token(body).await {
            Ok(response) => {
                let refreshed = token_set_from_response(response, Some(current), now_epoch_secs())
                    .map_err(|e| AuthError::MalformedToken(e.to_string()))?;
                self.save_tokens(&refreshed);
                log::info!("session tokens refreshed");
                self.bus.publish(AuthEvent::TokenRefresh);
                Ok(Some(refreshed))
            }
            Err(EndpointError::Transport(message)) => Err(AuthError::ProviderUnavailable(message)),
            Err(EndpointError::Rejected { status, body }) => {
                let reason = rejection_message(status, &body);
                log::warn!("token refresh rejected: {reason}");
                self.clear_tokens();
                self.bus.publish(AuthEvent::TokenRefreshFailure(reason));
                Ok(None)
            }
        }
    }

    async fn post_token(&self, body: String) -> Result<TokenResponse, EndpointError> {
        let (status, text) = post_form(&self.config.token_endpoint(), body).await?;
        if !(200..300).contains(&status) {
            return Err(EndpointError::Rejected { status, body: text });
        }
        serde_json::from_str(&text).map_err(|e| EndpointError::Rejected { status, body: format!("unexpected token response: {e}") })
    }

    async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError> {
        let body = form(&[("token", refresh_token), ("client_id", self.config.client_id.as_str())]);
        match post_form(&self.config.revoke_endpoint(), body).await {
            Ok((status, _)) if (200..300).contains(&status) => Ok(()),
            Ok((status, text)) => {
                log::warn!("refresh token revocation rejected: {}", rejection_message(status, &text));
                Ok(())
            }
            Err(EndpointError::Transport(message)) => Err(AuthError::ProviderUnavailable(message)),
            Err(EndpointError::Rejected { status, body }) => {
                log::warn!("refresh token revocation rejected: {}", rejection_message(status, &body));
                Ok(())
            }
        }
    }
}

#[async_trait(?Send)]
impl IdentityGateway for HostedUiGateway {
    async fn fetch_session(&self) -> Result<Option<TokenSet>, AuthError> {
        let Some(tokens) = self.load_tokens() else {
            return Ok(None);
        };
        if !tokens.is_expired(now_epoch_secs(), EXPIRY_SKEW_SECS) {
            return Ok(Some(tokens));
        }
        let Some(refresh_token) = tokens.refresh_token.clone() else {
            log::info!("stored session expired and cannot be refreshed");
            self.clear_tokens();
            return Ok(None);
        };
        self.refresh(&tokens, &refresh_token).await
    }

    fn begin_sign_in(&self) {
        let flow = SignInFlow { state: nonce(), verifier: format!("{}{}", nonce(), nonce()) };
        match serde_json::to_string(&flow) {
            Ok(raw) => self.flow.set(FLOW_KEY, &raw),
            Err(err) => log::error!("failed to persist sign-in flow state: {err}"),
        }
        let url = self.authorize_url(&flow.state, &pkce_challenge(&flow.verifier));
        log::info!("redirecting to hosted sign-in");
        self.navigator.redirect(&url);
    }

    async fn exchange_code(&self, code: &str, state: Option<&str>) -> Result<(), AuthError> {
        let flow = self
            .take_flow()
            .ok_or_else(|| AuthError::CodeExchangeFailed("no sign-in in progress in this tab".to_owned()))?;
        if state != Some(flow.state.as_str()) {
            return Err(AuthError::CodeExchangeFailed("state parameter mismatch".to_owned()));
        }

        let body = form(&[
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_sign_in.as_str()),
            ("code_verifier", flow.verifier.as_str()),
        ]);
        let response = self.post_token(body).await.map_err(EndpointError::into_exchange_error)?;
        let tokens = token_set_from_response(response, None, now_epoch_secs())?;
        self.save_tokens(&tokens);
        log::info!("authorization code exchanged");
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let refresh_token = self.load_tokens().and_then(|tokens| tokens.refresh_token);
        self.clear_tokens();
        self.flow.remove(FLOW_KEY);

        if let Some(refresh_token) = refresh_token {
            self.revoke(&refresh_token).await?;
        }

        self.bus.publish(AuthEvent::SignedOut);
        self.navigator.redirect(&self.config.logout_url());
        Ok(())
    }
}

/// RFC 7636 `S256` challenge for `verifier`.
#[must_use]
pub fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn nonce() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn form(pairs: &[(&str, &str)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Build the stored token set from a token endpoint response.
///
/// A refresh response may omit the id and refresh tokens; those carry over
/// from `previous`. Without `expires_in` the id token's `exp` claim sets the
/// expiry, so the refresh token is still used once it lapses.
fn token_set_from_response(response: TokenResponse, previous: Option<&TokenSet>, now: i64) -> Result<TokenSet, AuthError> {
    let id_token = response
        .id_token
        .or_else(|| previous.map(|tokens| tokens.id_token.clone()))
        .ok_or_else(|| AuthError::CodeExchangeFailed("token response carried no id_token".to_owned()))?;
    let expires_at = match response.expires_in {
        Some(secs) => Some(now + secs),
        None => decode_claims(&id_token).ok().and_then(|claims| claims.exp),
    };
    Ok(TokenSet {
        id_token,
        access_token: response.access_token,
        refresh_token: response
            .refresh_token
            .or_else(|| previous.and_then(|tokens| tokens.refresh_token.clone())),
        expires_at,
    })
}

/// Short reason from an OAuth error body (`{"error": ...}`) or the status.
fn rejection_message(status: u16, body: &str) -> String {
    #[derive(Deserialize)]
    struct OAuthErrorBody {
        error: String,
        #[serde(default)]
        error_description: Option<String>,
    }

    match serde_json::from_str::<OAuthErrorBody>(body) {
        Ok(OAuthErrorBody { error, error_description: Some(description) }) => format!("{status} {error}: {description}"),
        Ok(OAuthErrorBody { error, .. }) => format!("{status} {error}"),
        Err(_) => format!("token endpoint returned {status}"),
    }
}

async fn post_form(url: &str, body: String) -> Result<(u16, String), EndpointError> {
    #[cfg(feature = "csr")]
    {
        let response = gloo_net::http::Request::post(url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .map_err(|e| EndpointError::Transport(e.to_string()))?
            .send()
            .await
            .map_err(|e| EndpointError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        Ok((status, text))
    }
    #[cfg(not(feature = "csr"))]
    {
        let _ = body;
        Err(EndpointError::Transport(format!("no browser transport for {url}")))
    }
}
