use std::collections::HashMap;

use super::*;

fn vars(overrides: &[(&'static str, &str)]) -> HashMap<&'static str, String> {
    let mut map: HashMap<&'static str, String> = [
        ("VAULT_AUTH_DOMAIN", "auth.example.com"),
        ("VAULT_CLIENT_ID", "client-123"),
        ("VAULT_REDIRECT_SIGN_IN", "https://vault.example.com/callback"),
        ("VAULT_REDIRECT_SIGN_OUT", "https://vault.example.com/"),
        ("VAULT_REQUIRED_GROUP", "vault-users"),
        ("VAULT_API_URL", "https://api.example.com"),
    ]
    .into_iter()
    .map(|(k, v)| (k, v.to_owned()))
    .collect();
    for (key, value) in overrides {
        map.insert(*key, (*value).to_owned());
    }
    map
}

fn load(map: &HashMap<&'static str, String>) -> Result<AuthConfig, ConfigError> {
    AuthConfig::from_lookup(|key| map.get(key).cloned())
}

#[test]
fn loads_required_values_with_defaults() {
    let config = load(&vars(&[])).unwrap();
    assert_eq!(config.domain, "auth.example.com");
    assert_eq!(config.scopes, vec!["email", "openid", "profile"]);
    assert_eq!(config.callback_failure, CallbackFailurePolicy::ShowError);
    assert_eq!(config.refresh_interval, Duration::from_secs(50 * 60));
    assert_eq!(config.callback_path, "/callback");
    assert_eq!(config.default_landing, "/");
}

#[test]
fn missing_required_value_is_reported_by_key() {
    let mut map = vars(&[]);
    map.remove("VAULT_REQUIRED_GROUP");
    assert_eq!(load(&map), Err(ConfigError::Missing("VAULT_REQUIRED_GROUP")));
}

#[test]
fn blank_value_counts_as_missing() {
    let map = vars(&[("VAULT_CLIENT_ID", "   ")]);
    assert_eq!(load(&map), Err(ConfigError::Missing("VAULT_CLIENT_ID")));
}

#[test]
fn domain_scheme_and_trailing_slash_are_stripped() {
    let config = load(&vars(&[("VAULT_AUTH_DOMAIN", "https://auth.example.com/")])).unwrap();
    assert_eq!(config.domain, "auth.example.com");
    assert_eq!(config.token_endpoint(), "https://auth.example.com/oauth2/token");
}

#[test]
fn optional_values_are_parsed() {
    let config = load(&vars(&[
        ("VAULT_AUTH_SCOPES", "openid,email"),
        ("VAULT_CALLBACK_FAILURE", "sign-in"),
        ("VAULT_REFRESH_MINUTES", "5"),
    ]))
    .unwrap();
    assert_eq!(config.scopes, vec!["openid", "email"]);
    assert_eq!(config.callback_failure, CallbackFailurePolicy::RetrySignIn);
    assert_eq!(config.refresh_interval, Duration::from_secs(300));
}

#[test]
fn zero_refresh_interval_is_invalid() {
    let err = load(&vars(&[("VAULT_REFRESH_MINUTES", "0")])).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "VAULT_REFRESH_MINUTES", .. }));
}

#[test]
fn overflowing_refresh_interval_is_invalid() {
    let huge = u64::MAX.to_string();
    let err = load(&vars(&[("VAULT_REFRESH_MINUTES", huge.as_str())])).unwrap_err();
    assert_eq!(err, ConfigError::Invalid { key: "VAULT_REFRESH_MINUTES", value: huge });
}

#[test]
fn unknown_failure_policy_is_invalid() {
    let err = load(&vars(&[("VAULT_CALLBACK_FAILURE", "explode")])).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "VAULT_CALLBACK_FAILURE", .. }));
}

#[test]
fn relative_sign_in_redirect_is_invalid() {
    let err = load(&vars(&[("VAULT_REDIRECT_SIGN_IN", "/callback")])).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "VAULT_REDIRECT_SIGN_IN", .. }));
}

#[test]
fn logout_url_encodes_client_and_return_uri() {
    let config = load(&vars(&[])).unwrap();
    assert_eq!(
        config.logout_url(),
        "https://auth.example.com/logout?client_id=client-123&logout_uri=https%3A%2F%2Fvault.example.com%2F"
    );
}

#[test]
fn failure_policy_parses_case_insensitively() {
    assert_eq!("ERROR".parse(), Ok(CallbackFailurePolicy::ShowError));
    assert_eq!(" retry ".parse(), Ok(CallbackFailurePolicy::RetrySignIn));
}
