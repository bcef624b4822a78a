//! Cross-tab session sync through `localStorage` change events.
//!
//! SYSTEM CONTEXT
//! ==============
//! Browsers fire `storage` on every *other* tab when the shared token key
//! changes. Removal means another tab signed out; a new value means another
//! tab signed in or refreshed. Both are republished on the local auth bus so
//! the state machine reacts exactly as it would to a local event.

#[cfg(test)]
#[path = "cross_tab_test.rs"]
mod cross_tab_test;

use super::hosted_ui::TOKENS_KEY;
use crate::state::events::{AuthBus, AuthEvent};

/// Map a storage change to the auth event it implies, if any.
///
/// `key == None` is a `storage.clear()` from another tab.
#[must_use]
pub fn classify_storage_change(key: Option<&str>, new_value: Option<&str>) -> Option<AuthEvent> {
    match key {
        None => Some(AuthEvent::SignedOut),
        Some(TOKENS_KEY) => Some(match new_value {
            None => AuthEvent::SignedOut,
            Some(_) => AuthEvent::TokenRefresh,
        }),
        Some(_) => None,
    }
}

/// Live `storage` listener; removed from the window when dropped.
pub struct StorageWatch {
    #[cfg(feature = "csr")]
    listener: wasm_bindgen::closure::Closure<dyn FnMut(web_sys::StorageEvent)>,
}

/// Start republishing other tabs' token changes on `bus`.
///
/// Returns `None` outside the browser or when the listener cannot be
/// attached.
#[must_use]
pub fn watch_other_tabs(bus: AuthBus) -> Option<StorageWatch> {
    #[cfg(feature = "csr")]
    {
        use wasm_bindgen::JsCast;

        let window = web_sys::window()?;
        let listener = wasm_bindgen::closure::Closure::<dyn FnMut(web_sys::StorageEvent)>::new(
            move |event: web_sys::StorageEvent| {
                let key = event.key();
                let new_value = event.new_value();
                if let Some(auth_event) = classify_storage_change(key.as_deref(), new_value.as_deref()) {
                    log::debug!("another tab changed the session: {}", auth_event.name());
                    bus.publish(auth_event);
                }
            },
        );
        window
            .add_event_listener_with_callback("storage", listener.as_ref().unchecked_ref())
            .ok()?;
        Some(StorageWatch { listener })
    }
    #[cfg(not(feature = "csr"))]
    {
        let _ = bus;
        None
    }
}

impl Drop for StorageWatch {
    fn drop(&mut self) {
        #[cfg(feature = "csr")]
        {
            use wasm_bindgen::JsCast;

            if let Some(window) = web_sys::window() {
                let _ = window.remove_event_listener_with_callback("storage", self.listener.as_ref().unchecked_ref());
            }
        }
    }
}
