use super::*;

#[test]
fn token_removal_is_sign_out() {
    assert_eq!(classify_storage_change(Some(TOKENS_KEY), None), Some(AuthEvent::SignedOut));
}

#[test]
fn token_write_is_refresh() {
    assert_eq!(classify_storage_change(Some(TOKENS_KEY), Some("{}")), Some(AuthEvent::TokenRefresh));
}

#[test]
fn storage_clear_is_sign_out() {
    assert_eq!(classify_storage_change(None, None), Some(AuthEvent::SignedOut));
}

#[test]
fn unrelated_keys_are_ignored() {
    assert_eq!(classify_storage_change(Some("theme"), Some("dark")), None);
}

#[cfg(not(feature = "csr"))]
#[test]
fn watch_is_unavailable_off_browser() {
    assert!(watch_other_tabs(AuthBus::new()).is_none());
}
