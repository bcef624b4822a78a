//! Route-guard policy shared by protected routes.
//!
//! SYSTEM CONTEXT
//! ==============
//! Protected routes render from the auth state alone. The only side effect is
//! starting hosted sign-in for a signed-out visitor, and that happens once
//! per guard instance no matter how many times the route re-renders, and
//! never while a sign-out is heading to the provider's logout page.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::cell::Cell;
use std::rc::Rc;

use crate::state::auth::{AuthMachine, AuthState};

/// What a protected route should show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardView {
    Loading,
    /// Sign-in has been (or is being) started; render nothing meaningful.
    Redirecting,
    AccessDenied,
    Content,
}

/// Render decision for `state`, without side effects.
#[must_use]
pub fn decide(state: &AuthState) -> GuardView {
    if state.is_loading() {
        GuardView::Loading
    } else if !state.is_authenticated() {
        GuardView::Redirecting
    } else if !state.has_access() {
        GuardView::AccessDenied
    } else {
        GuardView::Content
    }
}

/// In-app location string (`/path?query#hash`) to resume after sign-in.
#[must_use]
pub fn location_path(pathname: &str, search: &str, hash: &str) -> String {
    let mut location = if pathname.is_empty() { "/".to_owned() } else { pathname.to_owned() };
    let search = search.trim_start_matches('?');
    if !search.is_empty() {
        location.push('?');
        location.push_str(search);
    }
    let hash = hash.trim_start_matches('#');
    if !hash.is_empty() {
        location.push('#');
        location.push_str(hash);
    }
    location
}

/// Guard for one mounted protected route.
pub struct RouteGuard {
    machine: Rc<AuthMachine>,
    redirect_started: Cell<bool>,
}

impl RouteGuard {
    pub fn new(machine: Rc<AuthMachine>) -> Self {
        Self { machine, redirect_started: Cell::new(false) }
    }

    /// Decide what to render at `location`, starting sign-in the first time
    /// the visitor is found signed out.
    pub fn evaluate(&self, state: &AuthState, location: &str) -> GuardView {
        let view = decide(state);
        if view != GuardView::Redirecting {
            return view;
        }
        if self.machine.is_signing_out() {
            log::debug!("sign-out in progress; not starting sign-in at {location}");
            return view;
        }
        if !self.redirect_started.replace(true) {
            log::info!("signed out at {location}; starting sign-in");
            self.machine.sign_in(Some(location));
        }
        view
    }
}
