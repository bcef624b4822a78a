//! Shown to signed-in users outside the required group.

use leptos::prelude::*;

use crate::app::AuthContext;
use crate::components::header::Header;

#[component]
pub fn AccessDeniedPage() -> impl IntoView {
    let auth = expect_context::<AuthContext>();
    let signed_in = move || auth.state.get().is_authenticated();
    let group = auth.machine().config().required_group.clone();

    view! {
        <Show when=signed_in>
            <Header/>
        </Show>
        <main class="access-denied">
            <h1>"Access denied"</h1>
            <p>"Your account is not a member of the " <code>{group}</code> " group."</p>
            <p>"Ask an administrator for access, then sign in again."</p>
        </main>
    }
}
