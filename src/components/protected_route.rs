//! Wrapper that renders its children only for authorized members.

use leptos::prelude::*;
use leptos_router::hooks::use_location;

use crate::app::AuthContext;
use crate::pages::access_denied::AccessDeniedPage;
use crate::util::auth::{GuardView, RouteGuard, decide, location_path};

/// Route guard component.
///
/// Shows a placeholder while the session is checked, starts sign-in (once
/// per mount) for signed-out visitors, and shows the access-denied view to
/// users outside the required group.
#[component]
pub fn ProtectedRoute(children: ChildrenFn) -> impl IntoView {
    let auth = expect_context::<AuthContext>();
    let location = use_location();
    let guard = StoredValue::new_local(RouteGuard::new(auth.machine()));

    Effect::new(move || {
        let state = auth.state.get();
        let here = location_path(
            &location.pathname.get_untracked(),
            &location.search.get_untracked(),
            &location.hash.get_untracked(),
        );
        guard.with_value(|guard| guard.evaluate(&state, &here));
    });

    let view_kind = Memo::new(move |_| decide(&auth.state.get()));

    move || match view_kind.get() {
        GuardView::Loading => view! { <div class="auth-pending">"Checking your session..."</div> }.into_any(),
        GuardView::Redirecting => view! { <div class="auth-pending">"Redirecting to sign in..."</div> }.into_any(),
        GuardView::AccessDenied => view! { <AccessDeniedPage/> }.into_any(),
        GuardView::Content => children().into_any(),
    }
}
