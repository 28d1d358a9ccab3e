//! Role Gate
//!
//! Wraps a screen: spinner while the stored token is checked, redirect to
//! the sign-in screen when signed out, placeholder when the role is not
//! allowed.

use leptos::*;
use leptos_router::Redirect;

use crate::components::loading::Loading;
use crate::state::{authorize, Access, GlobalState, Msg, Screen};

#[component]
pub fn RoleGate(screen: Screen, children: ChildrenFn) -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");

    move || {
        let lang = state.lang();
        match authorize(&state.session.get(), screen.allowed()) {
            Access::Pending => view! { <Loading /> }.into_view(),
            Access::RedirectToLogin => view! { <Redirect path="/login" /> }.into_view(),
            Access::Denied => view! {
                <div class="bg-gray-800 rounded-lg p-12 text-center">
                    <div class="text-5xl mb-4">"🔒"</div>
                    <h2 class="text-xl font-semibold text-white mb-2">{Msg::AccessDenied.text(lang)}</h2>
                    <p class="text-gray-400">{Msg::AccessDeniedDetail.text(lang)}</p>
                </div>
            }
            .into_view(),
            Access::Granted => children().into_view(),
        }
    }
}
