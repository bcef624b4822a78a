//! Top bar with the signed-in user and a sign-out action.

use leptos::prelude::*;

use crate::app::AuthContext;

#[component]
pub fn Header() -> impl IntoView {
    let auth = expect_context::<AuthContext>();
    let busy = RwSignal::new(false);

    let display_name = move || {
        auth.state
            .get()
            .user()
            .map(|user| user.display_name().to_owned())
            .unwrap_or_default()
    };

    let on_sign_out = move |_| {
        if busy.get() {
            return;
        }
        busy.set(true);
        let machine = auth.machine();
        leptos::task::spawn_local(async move {
            machine.sign_out().await;
            busy.set(false);
        });
    };

    view! {
        <header class="vault-header">
            <span class="vault-header__title">"Vault"</span>
            <span class="vault-header__user">{display_name}</span>
            <button class="vault-header__sign-out" on:click=on_sign_out disabled=move || busy.get()>
                "Sign out"
            </button>
        </header>
    }
}
