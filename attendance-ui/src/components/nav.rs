//! Navigation Component
//!
//! Header bar with the screens the signed-in role may open.

use leptos::*;
use leptos_router::*;

use crate::api;
use crate::state::{visible_screens, GlobalState, Msg, SessionState};

/// Navigation header component
#[component]
pub fn Nav() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");

    let navigate = use_navigate();

    let on_sign_out = {
        let state = state.clone();
        move |_| {
            let state = state.clone();
            let navigate = navigate.clone();
            let token = state.token();
            spawn_local(async move {
                if let Some(token) = token {
                    if let Err(e) = api::sign_out(&token).await {
                        web_sys::console::warn_1(&format!("Sign-out request failed: {}", e).into());
                    }
                }
                state.sign_out();
                state.show_success(Msg::SignedOut);
                navigate("/login", Default::default());
            });
        }
    };

    let links = {
        let state = state.clone();
        move || {
            let lang = state.lang();
            state
                .role()
                .map(visible_screens)
                .unwrap_or_default()
                .into_iter()
                .map(|screen| view! { <NavLink href=screen.path() label=screen.label(lang) /> })
                .collect_view()
        }
    };

    let user_box = {
        let state = state.clone();
        move || match state.session.get() {
            SessionState::SignedIn(session) => {
                let lang = state.lang();
                let show_avatar = state.prefs.get().display.show_avatar;
                let initial = session
                    .user
                    .display_name
                    .chars()
                    .next()
                    .map(|c| c.to_uppercase().to_string())
                    .unwrap_or_default();
                view! {
                    <div class="flex items-center space-x-3">
                        {show_avatar.then(|| view! {
                            <div class="w-8 h-8 rounded-full bg-blue-600 flex items-center justify-center text-white text-sm font-bold">
                                {initial}
                            </div>
                        })}
                        <div class="hidden md:block text-right">
                            <div class="text-sm text-white">{session.user.display_name.clone()}</div>
                            <div class="text-xs text-gray-400">{session.user.role.label(lang)}</div>
                        </div>
                        <button
                            class="px-3 py-2 rounded-lg text-sm text-gray-300 hover:text-white hover:bg-gray-700 transition-colors"
                            on:click=on_sign_out.clone()
                        >
                            {Msg::SignOut.text(lang)}
                        </button>
                    </div>
                }
                .into_view()
            }
            _ => view! {}.into_view(),
        }
    };

    let live_dot = move || {
        if state.ws_connected.get() {
            "w-2 h-2 rounded-full bg-green-500"
        } else {
            "w-2 h-2 rounded-full bg-gray-500"
        }
    };

    view! {
        <nav class="bg-gray-800 border-b border-gray-700">
            <div class="container mx-auto px-4">
                <div class="flex items-center justify-between h-16">
                    <A href="/" class="flex items-center space-x-3">
                        <span class="text-2xl">"🏫"</span>
                        <span class="text-xl font-bold text-white">"Attendance"</span>
                        <span class=live_dot />
                    </A>

                    <div class="flex items-center space-x-1 overflow-x-auto">
                        {links}
                    </div>

                    {user_box}
                </div>
            </div>
        </nav>
    }
}

#[component]
fn NavLink(href: &'static str, label: &'static str) -> impl IntoView {
    view! {
        <A
            href=href
            exact=true
            class="px-4 py-2 rounded-lg text-gray-300 hover:text-white hover:bg-gray-700 transition-colors"
            active_class="bg-gray-700 text-white"
        >
            {label}
        </A>
    }
}
