//! OAuth redirect target that completes hosted sign-in.

use std::rc::Rc;

use leptos::prelude::*;
use leptos_router::hooks::{use_location, use_navigate};

use crate::app::AuthContext;
use crate::state::callback::{CallbackHandler, CallbackParams, CallbackStatus};
use crate::util::navigate::{Navigator, RouterNavigator};

/// Runs the callback flow once per mount and renders its progress.
#[component]
pub fn CallbackPage() -> impl IntoView {
    let auth = expect_context::<AuthContext>();
    let location = use_location();
    let navigator: Rc<dyn Navigator> = Rc::new(RouterNavigator::new(use_navigate()));

    let handler = CallbackHandler::new(auth.machine(), navigator);
    let status = RwSignal::new(handler.status());
    let status_watch = handler.watch_status(move |next| status.set(next.clone()));

    let params = CallbackParams::from_query(&location.search.get_untracked());
    let task = Rc::clone(&handler);
    leptos::task::spawn_local(async move { task.handle(params).await });

    let page = StoredValue::new_local((handler, status_watch));
    on_cleanup(move || page.dispose());

    let on_retry = move |_| page.with_value(|(handler, _)| handler.retry());

    move || match status.get() {
        CallbackStatus::Failed => view! {
            <main class="callback callback--failed">
                <h1>"Sign-in could not be completed"</h1>
                <p>"Something went wrong while finishing sign-in."</p>
                <button class="callback__retry" on:click=on_retry>"Try again"</button>
            </main>
        }
        .into_any(),
        CallbackStatus::RetryingSignIn => view! { <main class="callback">"Restarting sign-in..."</main> }.into_any(),
        CallbackStatus::Redirected(_) => view! { <main class="callback">"Redirecting..."</main> }.into_any(),
        CallbackStatus::Pending | CallbackStatus::Exchanging | CallbackStatus::Finalizing => {
            view! { <main class="callback">"Completing sign-in..."</main> }.into_any()
        }
    }
}
