//! Root application component with routing and the auth module lifecycle.
//!
//! SYSTEM CONTEXT
//! ==============
//! `App` builds the single auth module instance (gateway, bus, machine),
//! starts it, and mirrors its state into a signal for the view layer. The
//! lifecycle handle, cross-tab listener and background refresh loop are torn
//! down when the root owner is cleaned up.

use std::rc::Rc;

use leptos::prelude::*;
use leptos_meta::{Title, provide_meta_context};
use leptos_router::components::{Redirect, Route, Router, Routes};
use leptos_router::hooks::use_location;
use leptos_router::StaticSegment;

use crate::components::protected_route::ProtectedRoute;
use crate::config::AuthConfig;
use crate::net::api::ApiClient;
use crate::net::cross_tab::watch_other_tabs;
use crate::net::hosted_ui::HostedUiGateway;
use crate::pages::{access_denied::AccessDeniedPage, callback::CallbackPage, home::HomePage};
use crate::state::auth::{AuthMachine, AuthServices, AuthState};
use crate::state::events::AuthBus;
use crate::util::navigate::{BrowserNavigator, Navigator};
use crate::util::redirect::PendingRedirect;
use crate::util::spawn::LeptosSpawner;
use crate::util::storage::{StorageArea, browser_store};

/// Auth handles shared with every route through context.
#[derive(Clone, Copy)]
pub struct AuthContext {
    /// Mirror of the machine's state for reactive views.
    pub state: RwSignal<AuthState>,
    machine: StoredValue<Rc<AuthMachine>, LocalStorage>,
}

impl AuthContext {
    pub fn machine(&self) -> Rc<AuthMachine> {
        self.machine.get_value()
    }

    pub fn api(&self) -> ApiClient {
        ApiClient::new(self.machine())
    }
}

/// Root application component.
///
/// Renders a configuration error instead of the app when the build
/// variables are missing or invalid.
#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();

    let config = match AuthConfig::from_build_env() {
        Ok(config) => Rc::new(config),
        Err(err) => {
            log::error!("auth configuration invalid: {err}");
            return view! {
                <Title text="Vault"/>
                <div class="config-error">
                    <h1>"Vault is not configured"</h1>
                    <p>{err.to_string()}</p>
                </div>
            }
            .into_any();
        }
    };
    let callback_path = config.callback_path.clone();
    provide_context(install_auth(config));

    view! {
        <Title text="Vault"/>

        <Router>
            <Routes fallback=move || fallback_view(&callback_path)>
                <Route path=StaticSegment("") view=ProtectedHome/>
                <Route path=StaticSegment("callback") view=CallbackPage/>
                <Route path=StaticSegment("access-denied") view=AccessDeniedPage/>
                <Route path=StaticSegment("logout") view=|| view! { <Redirect path="/"/> }/>
            </Routes>
        </Router>
    }
    .into_any()
}

#[component]
fn ProtectedHome() -> impl IntoView {
    view! {
        <ProtectedRoute>
            <HomePage/>
        </ProtectedRoute>
    }
}

/// Unmatched routes, except a callback path configured away from
/// `/callback`, which still completes sign-in.
fn fallback_view(callback_path: &str) -> AnyView {
    if use_location().pathname.get_untracked() == callback_path {
        view! { <CallbackPage/> }.into_any()
    } else {
        view! { <p class="not-found">"Page not found."</p> }.into_any()
    }
}

fn install_auth(config: Rc<AuthConfig>) -> AuthContext {
    let bus = AuthBus::new();
    let navigator: Rc<dyn Navigator> = Rc::new(BrowserNavigator);
    let flow = browser_store(StorageArea::Session);
    let gateway = HostedUiGateway::new(
        Rc::clone(&config),
        browser_store(StorageArea::Local),
        Rc::clone(&flow),
        bus.clone(),
        Rc::clone(&navigator),
    );
    let redirects = PendingRedirect::new(flow, config.callback_path.clone());
    #[cfg(feature = "csr")]
    let refresh_interval = config.refresh_interval;

    let machine = AuthMachine::new(
        config,
        AuthServices {
            gateway: Rc::new(gateway),
            bus: bus.clone(),
            spawner: Rc::new(LeptosSpawner),
            navigator,
            redirects,
        },
    );

    let state = RwSignal::new(machine.state());
    let mirror = machine.watch(move |next| state.set(next.clone()));
    let handle = machine.start();
    let other_tabs = watch_other_tabs(bus);

    let lifecycle = StoredValue::new_local((handle, mirror, other_tabs));
    on_cleanup(move || {
        log::debug!("tearing down auth module");
        lifecycle.dispose();
    });

    #[cfg(feature = "csr")]
    {
        let refresh_alive = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true));
        let refresh_alive_task = refresh_alive.clone();
        let refresh_machine = Rc::clone(&machine);
        leptos::task::spawn_local(async move {
            loop {
                gloo_timers::future::sleep(refresh_interval).await;
                if !refresh_alive_task.load(std::sync::atomic::Ordering::Relaxed) {
                    break;
                }
                if refresh_machine.state().is_authenticated() {
                    refresh_machine.refresh_session();
                }
            }
        });
        on_cleanup(move || refresh_alive.store(false, std::sync::atomic::Ordering::Relaxed));
    }

    AuthContext { state, machine: StoredValue::new_local(machine) }
}
