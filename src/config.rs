//! Build-time configuration for hosted sign-in and the vault API.
//!
//! SYSTEM CONTEXT
//! ==============
//! A WASM bundle has no process environment at runtime, so every value is
//! captured with `option_env!` when the bundle is compiled. Parsing goes
//! through a lookup closure so tests can feed values without touching the
//! build.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::str::FromStr;
use std::time::Duration;

use url::form_urlencoded;

const DEFAULT_SCOPES: &str = "email openid profile";
const DEFAULT_REFRESH_MINUTES: u64 = 50;

/// Configuration loading failure.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing build variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// What the callback page does when the authorization code exchange fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CallbackFailurePolicy {
    /// Stay on the callback route and render an error view.
    #[default]
    ShowError,
    /// Start hosted sign-in again (once per browser session).
    RetrySignIn,
}

impl FromStr for CallbackFailurePolicy {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "error" | "show-error" => Ok(Self::ShowError),
            "sign-in" | "retry" => Ok(Self::RetrySignIn),
            _ => Err(()),
        }
    }
}

/// Hosted sign-in and API settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthConfig {
    /// Hosted-UI domain without scheme, e.g. `auth.example.com`.
    pub domain: String,
    /// OAuth client id registered with the identity provider.
    pub client_id: String,
    /// Absolute URL of the callback route.
    pub redirect_sign_in: String,
    /// Absolute URL the provider returns to after logout.
    pub redirect_sign_out: String,
    pub scopes: Vec<String>,
    /// Group name that grants access to the vault.
    pub required_group: String,
    /// Base URL of the vault API.
    pub api_url: String,
    pub callback_failure: CallbackFailurePolicy,
    /// Interval between background session refreshes while signed in.
    pub refresh_interval: Duration,
    /// Route to land on after sign-in when no pending redirect exists.
    pub default_landing: String,
    /// In-app path of the OAuth redirect target.
    pub callback_path: String,
}

impl AuthConfig {
    /// Load from the variables captured when the bundle was compiled.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a value
    /// cannot be parsed.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        Self::from_lookup(build_var)
    }

    /// Load from an arbitrary key lookup. Empty values count as missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required key is missing or a value cannot
    /// be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let get = |key: &'static str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let domain = normalize_domain(&require("VAULT_AUTH_DOMAIN")?);
        if domain.is_empty() || url::Url::parse(&format!("https://{domain}")).is_err() {
            return Err(ConfigError::Invalid { key: "VAULT_AUTH_DOMAIN", value: domain });
        }

        let redirect_sign_in = require("VAULT_REDIRECT_SIGN_IN")?;
        let callback_path = url::Url::parse(&redirect_sign_in)
            .map(|url| url.path().to_owned())
            .map_err(|_| ConfigError::Invalid { key: "VAULT_REDIRECT_SIGN_IN", value: redirect_sign_in.clone() })?;

        let scopes = get("VAULT_AUTH_SCOPES")
            .unwrap_or_else(|| DEFAULT_SCOPES.to_owned())
            .split([' ', ','])
            .filter(|scope| !scope.is_empty())
            .map(str::to_owned)
            .collect();

        let callback_failure = match get("VAULT_CALLBACK_FAILURE") {
            Some(raw) => raw
                .parse()
                .map_err(|()| ConfigError::Invalid { key: "VAULT_CALLBACK_FAILURE", value: raw.clone() })?,
            None => CallbackFailurePolicy::default(),
        };

        let refresh_secs = match get("VAULT_REFRESH_MINUTES") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|minutes| *minutes > 0)
                .and_then(|minutes| minutes.checked_mul(60))
                .ok_or(ConfigError::Invalid { key: "VAULT_REFRESH_MINUTES", value: raw.clone() })?,
            None => DEFAULT_REFRESH_MINUTES * 60,
        };

        Ok(Self {
            domain,
            client_id: require("VAULT_CLIENT_ID")?,
            redirect_sign_in,
            redirect_sign_out: require("VAULT_REDIRECT_SIGN_OUT")?,
            scopes,
            required_group: require("VAULT_REQUIRED_GROUP")?,
            api_url: require("VAULT_API_URL")?,
            callback_failure,
            refresh_interval: Duration::from_secs(refresh_secs),
            default_landing: "/".to_owned(),
            callback_path,
        })
    }

    /// `https://{domain}/oauth2/authorize`.
    #[must_use]
    pub fn authorize_endpoint(&self) -> String {
        self.endpoint("/oauth2/authorize")
    }

    /// `https://{domain}/oauth2/token`.
    #[must_use]
    pub fn token_endpoint(&self) -> String {
        self.endpoint("/oauth2/token")
    }

    /// `https://{domain}/oauth2/revoke`.
    #[must_use]
    pub fn revoke_endpoint(&self) -> String {
        self.endpoint("/oauth2/revoke")
    }

    /// Hosted logout URL carrying the client id and post-logout redirect.
    ///
    /// Also used as the manual fallback when the remote sign-out call fails.
    #[must_use]
    pub fn logout_url(&self) -> String {
        with_query(
            &self.endpoint("/logout"),
            &[("client_id", self.client_id.as_str()), ("logout_uri", self.redirect_sign_out.as_str())],
        )
    }

    fn endpoint(&self, path: &str) -> String {
        format!("https://{}{path}", self.domain)
    }
}

/// Append form-encoded query pairs to `base`.
pub(crate) fn with_query(base: &str, pairs: &[(&str, &str)]) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("{base}?{query}")
}

fn normalize_domain(raw: &str) -> String {
    raw.trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_owned()
}

fn build_var(key: &'static str) -> Option<String> {
    let value = match key {
        "VAULT_AUTH_DOMAIN" => option_env!("VAULT_AUTH_DOMAIN"),
        "VAULT_CLIENT_ID" => option_env!("VAULT_CLIENT_ID"),
        "VAULT_REDIRECT_SIGN_IN" => option_env!("VAULT_REDIRECT_SIGN_IN"),
        "VAULT_REDIRECT_SIGN_OUT" => option_env!("VAULT_REDIRECT_SIGN_OUT"),
        "VAULT_REQUIRED_GROUP" => option_env!("VAULT_REQUIRED_GROUP"),
        "VAULT_API_URL" => option_env!("VAULT_API_URL"),
        "VAULT_AUTH_SCOPES" => option_env!("VAULT_AUTH_SCOPES"),
        "VAULT_CALLBACK_FAILURE" => option_env!("VAULT_CALLBACK_FAILURE"),
        "VAULT_REFRESH_MINUTES" => option_env!("VAULT_REFRESH_MINUTES"),
        _ => None,
    };
    value.map(str::to_owned)
}
