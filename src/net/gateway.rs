//! Identity-provider capability consumed by the auth state machine.
//!
//! SYSTEM CONTEXT
//! ==============
//! The state machine, route guard, and callback handler only talk to the
//! provider through [`IdentityGateway`], so a different provider can be
//! substituted without touching them. [`HostedUiGateway`] is the production
//! implementation.
//!
//! ERROR HANDLING
//! ==============
//! "No session" is `Ok(None)`, not an error. Every [`AuthError`] is caught by
//! the caller and turned into a state transition; none reach rendering.
//!
//! [`HostedUiGateway`]: super::hosted_ui::HostedUiGateway

#[cfg(test)]
#[path = "gateway_test.rs"]
mod gateway_test;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::claims::{self, Claims};

/// Failures talking to or interpreting the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Transport failure; treated as signed out and retried on the next check.
    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Token could not be decoded; treated as signed out.
    #[error("malformed token: {0}")]
    MalformedToken(String),
    /// The callback's authorization code was rejected or unusable.
    #[error("authorization code exchange failed: {0}")]
    CodeExchangeFailed(String),
}

/// Tokens held for the current browser session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub id_token: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expiry of the id/access tokens in seconds since the Unix epoch.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl TokenSet {
    /// True once `now` is within `skew_secs` of the expiry time.
    #[must_use]
    pub fn is_expired(&self, now: i64, skew_secs: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at - skew_secs <= now)
    }
}

/// Remote identity provider as seen by the browser.
#[async_trait(?Send)]
pub trait IdentityGateway {
    /// Current token set, refreshing it when needed. `Ok(None)` when the
    /// user has no valid tokens.
    async fn fetch_session(&self) -> Result<Option<TokenSet>, AuthError>;

    /// Decode the claims carried by an identity token.
    fn decode_claims(&self, id_token: &str) -> Result<Claims, AuthError> {
        claims::decode_claims(id_token)
    }

    /// Navigate away to the hosted sign-in page. Nothing after this call is
    /// expected to observe the page again.
    fn begin_sign_in(&self);

    /// Trade the callback's authorization code for tokens and store them.
    async fn exchange_code(&self, code: &str, state: Option<&str>) -> Result<(), AuthError>;

    /// Invalidate the remote session and navigate to the provider's logout.
    ///
    /// On error the caller still clears local state and performs the manual
    /// logout redirect.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Access token for outbound API calls; empty when there is no session.
    async fn access_token(&self) -> String {
        match self.fetch_session().await {
            Ok(Some(tokens)) => tokens.access_token,
            Ok(None) => String::new(),
            Err(err) => {
                log::warn!("access token unavailable: {err}");
                String::new()
            }
        }
    }
}
