//! Completion of the hosted sign-in redirect round-trip.
//!
//! SYSTEM CONTEXT
//! ==============
//! The provider sends the browser back to the callback route with `code`
//! and `state` (or `error`) in the query. [`CallbackHandler`] exchanges the
//! code through the gateway, announces `signed-in` on the auth bus, and waits
//! for the state machine to finish its check before leaving the page. It
//! never navigates on the exchange result alone.
//!
//! FAILURE POLICY
//! ==============
//! Every path ends in a navigation or a visible failure. With
//! [`CallbackFailurePolicy::RetrySignIn`] the first failure of a browser
//! session restarts hosted sign-in; later failures show the error view.

#[cfg(test)]
#[path = "callback_test.rs"]
mod callback_test;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::auth::{AuthMachine, AuthState};
use super::events::AuthEvent;
use crate::config::CallbackFailurePolicy;
use crate::util::bus::{EventBus, Subscription};
use crate::util::navigate::Navigator;

/// Session-store key marking that an automatic retry was already spent.
const RETRY_MARKER_KEY: &str = "vault.auth.callback_retry";

/// Query parameters the provider appends to the callback URL.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parse a URL query string, with or without the leading `?`.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_ref() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            *slot = Some(value.into_owned());
        }
        params
    }
}

/// Progress of one callback page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackStatus {
    Pending,
    Exchanging,
    /// Code exchanged; waiting for the session check.
    Finalizing,
    Redirected(String),
    RetryingSignIn,
    Failed,
}

/// Drives one callback page. Create one per page mount.
pub struct CallbackHandler {
    machine: Rc<AuthMachine>,
    navigator: Rc<dyn Navigator>,
    processing: Cell<bool>,
    status: RefCell<CallbackStatus>,
    observers: EventBus<CallbackStatus>,
    session_watch: RefCell<Option<Subscription>>,
    this: Weak<CallbackHandler>,
}

impl CallbackHandler {
    pub fn new(machine: Rc<AuthMachine>, navigator: Rc<dyn Navigator>) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            machine,
            navigator,
            processing: Cell::new(false),
            status: RefCell::new(CallbackStatus::Pending),
            observers: EventBus::new(),
            session_watch: RefCell::new(None),
            this: this.clone(),
        })
    }

    #[must_use]
    pub fn status(&self) -> CallbackStatus {
        self.status.borrow().clone()
    }

    #[must_use = "dropping the subscription stops observation"]
    pub fn watch_status(&self, observer: impl Fn(&CallbackStatus) + 'static) -> Subscription {
        self.observers.subscribe(observer)
    }

    /// Process the callback once. Calls made while a previous one is still
    /// in flight, or after it succeeded, are ignored.
    pub async fn handle(&self, params: CallbackParams) {
        if self.processing.replace(true) {
            log::debug!("callback already being processed");
            return;
        }

        if let Some(error) = params.error {
            let detail = params.error_description.unwrap_or_default();
            self.fail(&format!("provider returned {error}: {detail}"));
            return;
        }
        let Some(code) = params.code else {
            self.fail("callback has no authorization code");
            return;
        };

        self.set_status(CallbackStatus::Exchanging);
        match self.machine.gateway().exchange_code(&code, params.state.as_deref()).await {
            Ok(()) => {
                self.set_status(CallbackStatus::Finalizing);
                self.await_session();
                self.machine.bus().publish(AuthEvent::SignedIn);
            }
            Err(err) => self.fail(&err.to_string()),
        }
    }

    /// Start hosted sign-in again from the error view.
    pub fn retry(&self) {
        self.set_status(CallbackStatus::RetryingSignIn);
        self.machine.sign_in(None);
    }

    fn await_session(&self) {
        let this = self.this.clone();
        let subscription = self.machine.watch(move |state| {
            if let Some(handler) = this.upgrade() {
                handler.on_session(state);
            }
        });
        *self.session_watch.borrow_mut() = Some(subscription);
    }

    fn on_session(&self, state: &AuthState) {
        if state.is_loading() {
            return;
        }
        let watch = self.session_watch.borrow_mut().take();
        drop(watch);

        if !state.is_authenticated() {
            self.fail("no session after code exchange");
            return;
        }

        let redirects = self.machine.redirects();
        redirects.store().remove(RETRY_MARKER_KEY);
        let target = redirects.take().unwrap_or_else(|| self.machine.config().default_landing.clone());
        log::info!("sign-in complete, resuming at {target}");
        self.set_status(CallbackStatus::Redirected(target.clone()));
        self.navigator.navigate(&target);
    }

    fn fail(&self, reason: &str) {
        log::error!("sign-in callback failed: {reason}");
        self.machine.bus().publish(AuthEvent::SignInFailure(reason.to_owned()));
        self.processing.set(false);

        let store = self.machine.redirects().store();
        let may_retry = self.machine.config().callback_failure == CallbackFailurePolicy::RetrySignIn
            && store.get(RETRY_MARKER_KEY).is_none();
        if may_retry {
            store.set(RETRY_MARKER_KEY, "1");
            self.retry();
        } else {
            self.set_status(CallbackStatus::Failed);
        }
    }

    fn set_status(&self, next: CallbackStatus) {
        *self.status.borrow_mut() = next.clone();
        self.observers.publish(next);
    }
}
