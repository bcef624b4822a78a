//! Identity-token claims and their decoding.
//!
//! DESIGN
//! ======
//! Decoding only parses the payload segment. Signature verification is the
//! provider's and the API's job; the browser trusts tokens it received
//! directly from the token endpoint.

#[cfg(test)]
#[path = "claims_test.rs"]
mod claims_test;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Deserializer, Serialize};

use super::gateway::AuthError;

/// Decoded identity-token claims.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawClaims")]
pub struct Claims {
    /// Subject (stable user id).
    pub sub: String,
    pub email: Option<String>,
    pub email_verified: bool,
    #[serde(rename = "cognito:username")]
    pub username: Option<String>,
    /// Group memberships; an absent or `null` claim is an empty list.
    #[serde(rename = "cognito:groups")]
    pub groups: Vec<String>,
    /// Expiry in seconds since the Unix epoch.
    pub exp: Option<i64>,
}

/// Wire shape of the payload. Cognito and generic OIDC key names may both
/// be present; the `cognito:` ones win.
#[derive(Deserialize)]
struct RawClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    email_verified: bool,
    #[serde(default, rename = "cognito:username")]
    cognito_username: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default, rename = "cognito:groups")]
    cognito_groups: Option<Vec<String>>,
    #[serde(default)]
    groups: Option<Vec<String>>,
    #[serde(default)]
    exp: Option<i64>,
}

impl From<RawClaims> for Claims {
    fn from(raw: RawClaims) -> Self {
        Self {
            sub: raw.sub,
            email: raw.email,
            email_verified: raw.email_verified,
            username: raw.cognito_username.or(raw.username),
            groups: raw.cognito_groups.or(raw.groups).unwrap_or_default(),
            exp: raw.exp,
        }
    }
}

impl Claims {
    #[must_use]
    pub fn is_member_of(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.exp.is_some_and(|exp| exp <= now)
    }

    /// Best label for the signed-in user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.email
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or(&self.sub)
    }
}

/// Parse the payload of a compact JWT.
///
/// # Errors
///
/// Returns [`AuthError::MalformedToken`] unless the token has three
/// dot-separated segments whose middle one is base64url JSON claims.
pub fn decode_claims(id_token: &str) -> Result<Claims, AuthError> {
    let mut segments = id_token.trim().split('.');
    let (Some(header), Some(payload), Some(_signature), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return Err(AuthError::MalformedToken("expected three dot-separated segments".to_owned()));
    };
    if header.is_empty() || payload.is_empty() {
        return Err(AuthError::MalformedToken("empty header or payload segment".to_owned()));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::MalformedToken(format!("payload is not base64url: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| AuthError::MalformedToken(format!("payload is not a claims object: {e}")))
}

fn deserialize_lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Bool(flag)) => flag,
        Some(serde_json::Value::String(raw)) => raw.eq_ignore_ascii_case("true"),
        _ => false,
    })
}
