//! Pending-redirect path kept across the hosted sign-in round-trip.
//!
//! SYSTEM CONTEXT
//! ==============
//! Written right before navigating out to sign in, read and cleared exactly
//! once when the callback completes. A second sign-in attempt overwrites it.
//! Only same-origin absolute paths are accepted, and the callback route is
//! never stored since resuming there would loop.

#[cfg(test)]
#[path = "redirect_test.rs"]
mod redirect_test;

use std::rc::Rc;

use super::storage::SessionStore;

pub const PENDING_REDIRECT_KEY: &str = "oauth_redirect";

/// Handle over the single pending-redirect slot in the session store.
#[derive(Clone)]
pub struct PendingRedirect {
    store: Rc<dyn SessionStore>,
    callback_path: String,
}

impl PendingRedirect {
    pub fn new(store: Rc<dyn SessionStore>, callback_path: impl Into<String>) -> Self {
        Self { store, callback_path: callback_path.into() }
    }

    /// Remember `path` as the post-sign-in destination.
    ///
    /// Returns `false` (leaving any previous value untouched) when `path` is
    /// not a resumable in-app location.
    pub fn save(&self, path: &str) -> bool {
        if !is_resumable(path, &self.callback_path) {
            log::debug!("not storing non-resumable redirect {path:?}");
            return false;
        }
        self.store.set(PENDING_REDIRECT_KEY, path);
        true
    }

    #[must_use]
    pub fn peek(&self) -> Option<String> {
        self.store.get(PENDING_REDIRECT_KEY)
    }

    /// Read and clear the pending path.
    pub fn take(&self) -> Option<String> {
        let path = self.peek()?;
        self.store.remove(PENDING_REDIRECT_KEY);
        is_resumable(&path, &self.callback_path).then_some(path)
    }

    pub fn clear(&self) {
        self.store.remove(PENDING_REDIRECT_KEY);
    }

    /// Underlying session store, shared with other flow bookkeeping.
    pub(crate) fn store(&self) -> &Rc<dyn SessionStore> {
        &self.store
    }
}

fn is_resumable(path: &str, callback_path: &str) -> bool {
    if !path.starts_with('/') || path.starts_with("//") || path.starts_with("/\\") {
        return false;
    }
    let route = path.split(['?', '#']).next().unwrap_or(path);
    route != callback_path
}
