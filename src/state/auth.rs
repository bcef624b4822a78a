//! Auth-session state machine for the current browser user.
//!
//! SYSTEM CONTEXT
//! ==============
//! [`AuthMachine`] owns the in-memory [`AuthState`], rebuilds it from the
//! identity gateway on every check, and reacts to lifecycle events on the
//! auth bus. Route guards, the callback page, and the API client read and act
//! through it; components observe it via [`AuthMachine::watch`].
//!
//! STATES
//! ======
//! `Checking` (initial mount or a boundary-changing re-check), then
//! `Unauthenticated` or `Authenticated`, the latter split into `Authorized`
//! and `Unauthorized` by group membership.
//!
//! LOADING POLICY
//! ==============
//! Only checks that can move the authenticated/unauthenticated boundary show
//! `is_loading`: the mount check, `signed-in`, and refreshes while signed
//! out. A `token-refresh` for an already-authenticated user re-checks in the
//! background without hiding protected content.
//!
//! CONCURRENCY
//! ===========
//! Checks may overlap. Each gets a monotonically increasing id and only the
//! most recent one may apply its result; sign-out and stop also advance the
//! id so slower in-flight checks are discarded rather than aborted.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};

use futures::task::{LocalSpawn, LocalSpawnExt};

use super::events::{AuthBus, AuthEvent};
use crate::config::AuthConfig;
use crate::net::claims::Claims;
use crate::net::gateway::IdentityGateway;
use crate::util::bus::{EventBus, Subscription};
use crate::util::clock::now_epoch_secs;
use crate::util::navigate::Navigator;
use crate::util::redirect::PendingRedirect;

/// Snapshot of the current user's authentication.
///
/// Fields are only set together through the constructors, so
/// `has_access` never holds without `is_authenticated`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthState {
    is_authenticated: bool,
    is_loading: bool,
    has_access: bool,
    user: Option<Claims>,
}

impl Default for AuthState {
    fn default() -> Self {
        Self::checking()
    }
}

impl AuthState {
    /// No result yet; a check is in flight.
    #[must_use]
    pub fn checking() -> Self {
        Self { is_authenticated: false, is_loading: true, has_access: false, user: None }
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self { is_authenticated: false, is_loading: false, has_access: false, user: None }
    }

    #[must_use]
    pub fn authenticated(user: Claims, has_access: bool) -> Self {
        Self { is_authenticated: true, is_loading: false, has_access, user: Some(user) }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    #[must_use]
    pub fn has_access(&self) -> bool {
        self.has_access
    }

    #[must_use]
    pub fn user(&self) -> Option<&Claims> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn phase(&self) -> AuthPhase {
        match (self.is_loading, self.is_authenticated, self.has_access) {
            (true, _, _) => AuthPhase::Checking,
            (false, false, _) => AuthPhase::Unauthenticated,
            (false, true, true) => AuthPhase::Authorized,
            (false, true, false) => AuthPhase::Unauthorized,
        }
    }

    fn loading(mut self) -> Self {
        self.is_loading = true;
        self
    }
}

/// Coarse state derived from an [`AuthState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthPhase {
    Checking,
    Unauthenticated,
    Authorized,
    Unauthorized,
}

/// What started a session check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckTrigger {
    Mount,
    SignedIn,
    TokenRefresh,
}

impl CheckTrigger {
    fn shows_loading(self, current: &AuthState) -> bool {
        match self {
            Self::Mount | Self::SignedIn => true,
            Self::TokenRefresh => !current.is_authenticated(),
        }
    }
}

/// Collaborators the machine acts through.
pub struct AuthServices {
    pub gateway: Rc<dyn IdentityGateway>,
    pub bus: AuthBus,
    pub spawner: Rc<dyn LocalSpawn>,
    pub navigator: Rc<dyn Navigator>,
    pub redirects: PendingRedirect,
}

/// The auth session state machine. Create with [`AuthMachine::new`], then
/// call [`AuthMachine::start`] once the app mounts.
pub struct AuthMachine {
    config: Rc<AuthConfig>,
    services: AuthServices,
    state: RefCell<AuthState>,
    latest_check: Cell<u64>,
    running: Cell<bool>,
    signing_out: Cell<bool>,
    observers: EventBus<AuthState>,
    this: Weak<AuthMachine>,
}

impl AuthMachine {
    pub fn new(config: Rc<AuthConfig>, services: AuthServices) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            config,
            services,
            state: RefCell::new(AuthState::checking()),
            latest_check: Cell::new(0),
            running: Cell::new(false),
            signing_out: Cell::new(false),
            observers: EventBus::new(),
            this: this.clone(),
        })
    }

    /// Subscribe to the auth bus and begin the mount check.
    ///
    /// The returned handle is the teardown: dropping it unsubscribes and
    /// discards any check still in flight.
    #[must_use = "dropping the handle stops the state machine"]
    pub fn start(&self) -> AuthHandle {
        self.running.set(true);
        self.apply(AuthState::checking());

        let this = self.this.clone();
        let subscription = self.services.bus.subscribe(move |event| {
            if let Some(machine) = this.upgrade() {
                machine.handle_event(event);
            }
        });
        self.spawn_check(CheckTrigger::Mount);

        AuthHandle { machine: self.this.clone(), subscription: Some(subscription) }
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Call `observer` with every subsequent state change.
    #[must_use = "dropping the subscription stops observation"]
    pub fn watch(&self, observer: impl Fn(&AuthState) + 'static) -> Subscription {
        self.observers.subscribe(observer)
    }

    /// Re-run the session check without a loading indicator for a signed-in
    /// user.
    pub fn refresh_session(&self) {
        if self.running.get() {
            self.spawn_check(CheckTrigger::TokenRefresh);
        }
    }

    /// Remember `from` as the post-sign-in destination, then hand off to
    /// hosted sign-in.
    pub fn sign_in(&self, from: Option<&str>) {
        if let Some(path) = from {
            self.services.redirects.save(path);
        }
        self.services.gateway.begin_sign_in();
    }

    /// Clear local state, then sign out remotely.
    ///
    /// Local state is authoritative: when the remote call fails the user is
    /// still signed out here and sent to the constructed logout URL.
    ///
    /// While this runs [`AuthMachine::is_signing_out`] is true so route
    /// guards reacting to the cleared state do not start a new sign-in.
    pub async fn sign_out(&self) {
        log::info!("signing out");
        self.signing_out.set(true);
        self.clear();
        if let Err(err) = self.services.gateway.sign_out().await {
            log::error!("remote sign-out failed, redirecting manually: {err}");
            self.services.navigator.redirect(&self.config.logout_url());
        }
    }

    /// True from the start of [`AuthMachine::sign_out`] until the next
    /// `signed-in` event. The page is expected to leave for the provider's
    /// logout in between.
    #[must_use]
    pub fn is_signing_out(&self) -> bool {
        self.signing_out.get()
    }

    /// Fresh membership check against the gateway's current tokens.
    pub async fn check_access(&self) -> bool {
        match self.services.gateway.fetch_session().await {
            Ok(Some(tokens)) => match self.services.gateway.decode_claims(&tokens.id_token) {
                Ok(claims) => claims.is_member_of(&self.config.required_group),
                Err(err) => {
                    log::warn!("access check could not decode id token: {err}");
                    false
                }
            },
            Ok(None) => false,
            Err(err) => {
                log::warn!("access check failed: {err}");
                false
            }
        }
    }

    /// Bearer token for API calls, or `None` when there is no session.
    pub async fn access_token(&self) -> Option<String> {
        let token = self.services.gateway.access_token().await;
        (!token.trim().is_empty()).then_some(token)
    }

    /// Run `action` only for an authenticated user; otherwise remember
    /// `location` and start sign-in.
    pub async fn with_auth<T, F, Fut>(&self, location: &str, action: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if !self.state().is_authenticated() {
            self.sign_in(Some(location));
            return None;
        }
        Some(action().await)
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn gateway(&self) -> &Rc<dyn IdentityGateway> {
        &self.services.gateway
    }

    pub(crate) fn bus(&self) -> &AuthBus {
        &self.services.bus
    }

    pub(crate) fn redirects(&self) -> &PendingRedirect {
        &self.services.redirects
    }

    fn handle_event(&self, event: &AuthEvent) {
        log::debug!("auth event: {}", event.name());
        match event {
            AuthEvent::SignedIn => {
                self.signing_out.set(false);
                self.spawn_check(CheckTrigger::SignedIn);
            }
            AuthEvent::TokenRefresh => self.spawn_check(CheckTrigger::TokenRefresh),
            AuthEvent::SignedOut => self.clear(),
            AuthEvent::TokenRefreshFailure(reason) => {
                log::warn!("token refresh failed: {reason}");
                self.clear();
            }
            AuthEvent::SignInFailure(reason) => log::error!("sign-in failed: {reason}"),
        }
    }

    fn spawn_check(&self, trigger: CheckTrigger) {
        let check_id = self.latest_check.get() + 1;
        self.latest_check.set(check_id);

        let current = self.state();
        if trigger.shows_loading(&current) && !current.is_loading() {
            self.apply(current.loading());
        }

        let Some(this) = self.this.upgrade() else { return };
        let spawned = self.services.spawner.spawn_local(async move {
            let next = this.evaluate().await;
            this.resolve(check_id, next);
        });
        if let Err(err) = spawned {
            log::error!("could not spawn session check: {err}");
            self.resolve(check_id, AuthState::signed_out());
        }
    }

    async fn evaluate(&self) -> AuthState {
        let tokens = match self.services.gateway.fetch_session().await {
            Ok(Some(tokens)) => tokens,
            Ok(None) => return AuthState::signed_out(),
            Err(err) => {
                log::warn!("session check failed: {err}");
                return AuthState::signed_out();
            }
        };
        match self.services.gateway.decode_claims(&tokens.id_token) {
            Ok(claims) if claims.is_expired(now_epoch_secs()) => {
                log::info!("identity token expired");
                AuthState::signed_out()
            }
            Ok(claims) => {
                let has_access = claims.is_member_of(&self.config.required_group);
                if !has_access {
                    log::info!("user {} lacks group {}", claims.sub, self.config.required_group);
                }
                AuthState::authenticated(claims, has_access)
            }
            Err(err) => {
                log::warn!("discarding session with undecodable id token: {err}");
                AuthState::signed_out()
            }
        }
    }

    fn resolve(&self, check_id: u64, next: AuthState) {
        if !self.running.get() || check_id != self.latest_check.get() {
            log::debug!("discarding superseded session check {check_id}");
            return;
        }
        self.apply(next);
    }

    fn clear(&self) {
        self.latest_check.set(self.latest_check.get() + 1);
        self.apply(AuthState::signed_out());
    }

    fn apply(&self, next: AuthState) {
        {
            let mut state = self.state.borrow_mut();
            if *state == next {
                return;
            }
            *state = next.clone();
        }
        self.observers.publish(next);
    }

    fn stop(&self) {
        self.running.set(false);
        self.latest_check.set(self.latest_check.get() + 1);
    }
}

/// Lifecycle handle returned by [`AuthMachine::start`].
#[derive(Debug)]
pub struct AuthHandle {
    machine: Weak<AuthMachine>,
    subscription: Option<Subscription>,
}

impl AuthHandle {
    /// Unsubscribe from the bus and discard in-flight checks.
    pub fn stop(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            if let Some(machine) = self.machine.upgrade() {
                machine.stop();
            }
        }
    }
}

impl Drop for AuthHandle {
    fn drop(&mut self) {
        self.release();
    }
}
