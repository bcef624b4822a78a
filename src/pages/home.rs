//! Landing page for authorized members.
//!
//! SYSTEM CONTEXT
//! ==============
//! Rendered only inside `ProtectedRoute`. Pings the vault API once on mount
//! so a broken API or rejected token is visible right away.

use leptos::prelude::*;

use crate::app::AuthContext;
use crate::components::header::Header;
use crate::net::api::ApiError;

#[component]
pub fn HomePage() -> impl IntoView {
    let auth = expect_context::<AuthContext>();
    let api_status = RwSignal::new("Checking vault API...".to_owned());

    let api = auth.api();
    leptos::task::spawn_local(async move {
        let message = match api.get_json::<serde_json::Value>("/health").await {
            Ok(_) => "Vault API reachable.".to_owned(),
            Err(ApiError::Unauthenticated | ApiError::Unauthorized) => "Session expired, re-checking...".to_owned(),
            Err(err) => {
                log::warn!("vault API health check failed: {err}");
                "Vault API unavailable.".to_owned()
            }
        };
        api_status.set(message);
    });

    let email = move || {
        auth.state
            .get()
            .user()
            .and_then(|user| user.email.clone())
            .unwrap_or_default()
    };

    view! {
        <Header/>
        <main class="home">
            <h1>"Welcome to the vault"</h1>
            <p class="home__email">{email}</p>
            <p class="home__api-status">{move || api_status.get()}</p>
        </main>
    }
}
