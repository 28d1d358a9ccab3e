//! App Root Component
//!
//! Routing, global providers and session restore.

use leptos::*;
use leptos_router::*;

use crate::api;
use crate::components::{Nav, RoleGate, Toast};
use crate::pages::{Attendance, Dashboard, Login, Reports, Settings, Students, Users};
use crate::state::global::{provide_global_state, stored_token, GlobalState};
use crate::state::websocket::init_websocket;
use crate::state::{Msg, Screen, Session, SessionState};

/// Root application component
#[component]
pub fn App() -> impl IntoView {
    provide_global_state();

    let state = use_context::<GlobalState>().expect("GlobalState not found");
    restore_session(state.clone());
    init_websocket(state, api::get_api_base());

    view! {
        <Router>
            <div class="min-h-screen bg-gray-900 text-white flex flex-col">
                <Nav />

                <main class="flex-1 container mx-auto px-4 py-8 pb-24">
                    <Routes>
                        <Route path="/login" view=Login />
                        <Route path="/" view=|| view! { <RoleGate screen=Screen::Dashboard><Dashboard /></RoleGate> } />
                        <Route path="/students" view=|| view! { <RoleGate screen=Screen::Students><Students /></RoleGate> } />
                        <Route path="/attendance" view=|| view! { <RoleGate screen=Screen::Attendance><Attendance /></RoleGate> } />
                        <Route path="/reports" view=|| view! { <RoleGate screen=Screen::Reports><Reports /></RoleGate> } />
                        <Route path="/users" view=|| view! { <RoleGate screen=Screen::Users><Users /></RoleGate> } />
                        <Route path="/settings" view=|| view! { <RoleGate screen=Screen::Settings><Settings /></RoleGate> } />
                        <Route path="/*any" view=NotFound />
                    </Routes>
                </main>

                <Footer />
                <Toast />
            </div>
        </Router>
    }
}

/// Resolve a stored token into a session, or drop it
fn restore_session(state: GlobalState) {
    if state.session.get_untracked() != SessionState::Loading {
        return;
    }
    let Some(token) = stored_token() else {
        state.session.set(SessionState::SignedOut);
        return;
    };

    spawn_local(async move {
        match api::current_user(&token).await {
            Ok(user) => state.sign_in(Session { token, user }),
            Err(e) => {
                web_sys::console::warn_1(&format!("Stored session rejected: {}", e).into());
                state.sign_out();
            }
        }
    });
}

/// Footer showing the live connection status
#[component]
fn Footer() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let prefs = state.prefs;
    let lang = move || prefs.get().language;

    view! {
        <footer class="fixed bottom-0 left-0 right-0 bg-gray-800 border-t border-gray-700 py-3 px-4">
            <div class="container mx-auto flex items-center justify-between text-sm">
                <div class="flex items-center space-x-2">
                    {move || {
                        if state.ws_connected.get() {
                            view! {
                                <span class="flex items-center space-x-1 text-green-400">
                                    <span class="w-2 h-2 bg-green-400 rounded-full pulse" />
                                    <span>{Msg::Connected.text(lang())}</span>
                                </span>
                            }.into_view()
                        } else {
                            view! {
                                <span class="flex items-center space-x-1 text-red-400">
                                    <span class="w-2 h-2 bg-red-400 rounded-full" />
                                    <span>{Msg::Disconnected.text(lang())}</span>
                                </span>
                            }.into_view()
                        }
                    }}
                </div>

                <div class="text-gray-400">
                    {move || {
                        state.last_sync.get()
                            .and_then(chrono::DateTime::from_timestamp_millis)
                            .map(|dt| format!(
                                "{}: {}",
                                lang().pick("Cập nhật", "Last update"),
                                dt.with_timezone(&chrono::Local).format("%H:%M:%S")
                            ))
                            .unwrap_or_default()
                    }}
                </div>
            </div>
        </footer>
    }
}

#[component]
fn NotFound() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let lang = state.lang();

    view! {
        <div class="flex flex-col items-center justify-center min-h-[60vh] text-center">
            <div class="text-6xl mb-4">"🔍"</div>
            <h1 class="text-3xl font-bold mb-2">{lang.pick("Không tìm thấy trang", "Page not found")}</h1>
            <A
                href="/"
                class="px-6 py-3 bg-primary-600 hover:bg-primary-700 rounded-lg font-medium transition-colors"
            >
                {lang.pick("Về trang tổng quan", "Go to dashboard")}
            </A>
        </div>
    }
}
