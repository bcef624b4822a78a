//! Shared fakes for unit tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use futures::channel::oneshot;
use futures::executor::LocalPool;

use crate::config::{AuthConfig, CallbackFailurePolicy};
use crate::net::gateway::{AuthError, IdentityGateway, TokenSet};
use crate::state::auth::{AuthMachine, AuthServices};
use crate::state::events::AuthBus;
use crate::util::navigate::Navigator;
use crate::util::redirect::PendingRedirect;
use crate::util::storage::MemoryStore;

pub const REQUIRED_GROUP: &str = "vault-users";
pub const FAR_FUTURE: i64 = 4_102_444_800;

pub fn config() -> AuthConfig {
    AuthConfig {
        domain: "auth.example.com".to_owned(),
        client_id: "client-123".to_owned(),
        redirect_sign_in: "https://vault.example.com/callback".to_owned(),
        redirect_sign_out: "https://vault.example.com/".to_owned(),
        scopes: vec!["email".to_owned(), "openid".to_owned(), "profile".to_owned()],
        required_group: REQUIRED_GROUP.to_owned(),
        api_url: "https://api.example.com".to_owned(),
        callback_failure: CallbackFailurePolicy::ShowError,
        refresh_interval: Duration::from_secs(50 * 60),
        default_landing: "/".to_owned(),
        callback_path: "/callback".to_owned(),
    }
}

/// Unsigned compact JWT carrying `claims`.
pub fn encode_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

pub fn tokens_with(groups: &[&str], exp: i64) -> TokenSet {
    TokenSet {
        id_token: encode_token(&serde_json::json!({
            "sub": "user-1",
            "email": "ada@example.com",
            "cognito:groups": groups,
            "exp": exp,
        })),
        access_token: "access-token-1".to_owned(),
        refresh_token: Some("refresh-token-1".to_owned()),
        expires_at: Some(exp),
    }
}

pub fn member_tokens() -> TokenSet {
    tokens_with(&[REQUIRED_GROUP], FAR_FUTURE)
}

pub fn outsider_tokens() -> TokenSet {
    tokens_with(&["other"], FAR_FUTURE)
}

type FetchResult = Result<Option<TokenSet>, AuthError>;

/// Scripted [`IdentityGateway`].
#[derive(Default)]
pub struct FakeGateway {
    pub tokens: RefCell<Option<TokenSet>>,
    pub fetch_error: RefCell<Option<AuthError>>,
    /// Fetches that resolve only when the paired sender fires.
    pub held_fetches: RefCell<VecDeque<oneshot::Receiver<FetchResult>>>,
    pub exchange_error: RefCell<Option<AuthError>>,
    /// Tokens stored by a successful exchange.
    pub exchange_tokens: RefCell<Option<TokenSet>>,
    pub held_exchange: RefCell<Option<oneshot::Receiver<()>>>,
    pub sign_out_error: RefCell<Option<AuthError>>,
    pub fetch_calls: Cell<usize>,
    pub sign_in_calls: Cell<usize>,
    pub exchange_calls: Cell<usize>,
    pub sign_out_calls: Cell<usize>,
}

impl FakeGateway {
    pub fn hold_next_fetch(&self) -> oneshot::Sender<FetchResult> {
        let (tx, rx) = oneshot::channel();
        self.held_fetches.borrow_mut().push_back(rx);
        tx
    }

    pub fn hold_exchange(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.held_exchange.borrow_mut() = Some(rx);
        tx
    }
}

#[async_trait(?Send)]
impl IdentityGateway for FakeGateway {
    async fn fetch_session(&self) -> Result<Option<TokenSet>, AuthError> {
        self.fetch_calls.set(self.fetch_calls.get() + 1);
        let held = self.held_fetches.borrow_mut().pop_front();
        if let Some(rx) = held {
            return rx
                .await
                .unwrap_or_else(|_| Err(AuthError::ProviderUnavailable("held fetch dropped".to_owned())));
        }
        if let Some(err) = self.fetch_error.borrow().clone() {
            return Err(err);
        }
        Ok(self.tokens.borrow().clone())
    }

    fn begin_sign_in(&self) {
        self.sign_in_calls.set(self.sign_in_calls.get() + 1);
    }

    async fn exchange_code(&self, _code: &str, _state: Option<&str>) -> Result<(), AuthError> {
        self.exchange_calls.set(self.exchange_calls.get() + 1);
        let held = self.held_exchange.borrow_mut().take();
        if let Some(rx) = held {
            let _ = rx.await;
        }
        if let Some(err) = self.exchange_error.borrow().clone() {
            return Err(err);
        }
        let issued = self.exchange_tokens.borrow().clone();
        if issued.is_some() {
            *self.tokens.borrow_mut() = issued;
        }
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.sign_out_calls.set(self.sign_out_calls.get() + 1);
        *self.tokens.borrow_mut() = None;
        match self.sign_out_error.borrow().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Navigator that records every call.
#[derive(Default)]
pub struct RecordingNavigator {
    pub routes: RefCell<Vec<String>>,
    pub redirects: RefCell<Vec<String>>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.routes.borrow_mut().push(path.to_owned());
    }

    fn redirect(&self, url: &str) {
        self.redirects.borrow_mut().push(url.to_owned());
    }
}

/// A machine wired to fakes and driven by a local executor.
pub struct Harness {
    pub pool: LocalPool,
    pub gateway: Rc<FakeGateway>,
    pub bus: AuthBus,
    pub navigator: Rc<RecordingNavigator>,
    pub store: Rc<MemoryStore>,
    pub machine: Rc<AuthMachine>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(config())
    }

    pub fn with_config(config: AuthConfig) -> Self {
        let pool = LocalPool::new();
        let gateway = Rc::new(FakeGateway::default());
        let bus = AuthBus::new();
        let navigator = Rc::new(RecordingNavigator::default());
        let store = Rc::new(MemoryStore::new());
        let redirects = PendingRedirect::new(store.clone(), config.callback_path.clone());
        let machine = AuthMachine::new(
            Rc::new(config),
            AuthServices {
                gateway: gateway.clone(),
                bus: bus.clone(),
                spawner: Rc::new(pool.spawner()),
                navigator: navigator.clone(),
                redirects,
            },
        );
        Self { pool, gateway, bus, navigator, store, machine }
    }

    pub fn run(&mut self) {
        self.pool.run_until_stalled();
    }
}
