//! Login Page
//!
//! Email and password sign-in plus a password reset request.

use leptos::*;
use leptos_router::*;

use crate::api;
use crate::state::{GlobalState, Msg, Session, SessionState};

#[component]
pub fn Login() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let navigate = use_navigate();

    let (email, set_email) = create_signal(String::new());
    let (password, set_password) = create_signal(String::new());
    let (submitting, set_submitting) = create_signal(false);
    let (reset_mode, set_reset_mode) = create_signal(false);

    // Already signed in: go to the dashboard
    let session = state.session;
    create_effect(move |_| {
        if matches!(session.get(), SessionState::SignedIn(_)) {
            navigate("/", Default::default());
        }
    });

    let state_for_submit = state.clone();
    let on_submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        let state = state_for_submit.clone();
        let email = email.get().trim().to_string();
        let password = password.get();

        if email.is_empty() || (!reset_mode.get() && password.is_empty()) {
            state.show_error(Msg::RequiredFields, "");
            return;
        }

        set_submitting.set(true);
        let resetting = reset_mode.get();
        spawn_local(async move {
            if resetting {
                match api::request_password_reset(&email).await {
                    Ok(()) => {
                        state.show_success(Msg::ResetSent);
                        set_reset_mode.set(false);
                    }
                    Err(e) => state.show_error(Msg::LoadFailed, &e),
                }
            } else {
                match api::sign_in(&email, &password).await {
                    Ok(response) => {
                        state.sign_in(Session {
                            token: response.token,
                            user: response.user,
                        });
                        state.show_success(Msg::SignedIn);
                    }
                    Err(e) => state.show_error(Msg::SignInFailed, &e),
                }
            }
            set_submitting.set(false);
        });
    };

    let prefs = state.prefs;
    let lang = move || prefs.get().language;

    view! {
        <div class="flex items-center justify-center min-h-[70vh]">
            <form on:submit=on_submit class="bg-gray-800 rounded-xl p-8 w-full max-w-md space-y-6">
                <div class="text-center">
                    <div class="text-5xl mb-2">"🏫"</div>
                    <h1 class="text-2xl font-bold">
                        {
                            move || if reset_mode.get() {
                                lang().pick("Quên mật khẩu", "Forgot password")
                            } else {
                                Msg::SignIn.text(lang())
                            }
                        }
                    </h1>
                </div>

                <div>
                    <label class="block text-sm text-gray-400 mb-2">
                        {move || Msg::Email.text(lang())}
                    </label>
                    <input
                        type="email"
                        prop:value=move || email.get()
                        on:input=move |ev| set_email.set(event_target_value(&ev))
                        class="w-full bg-gray-700 rounded-lg px-4 py-3 border border-gray-600 focus:border-primary-500 focus:outline-none"
                    />
                </div>

                <Show when=move || !reset_mode.get()>
                    <div>
                        <label class="block text-sm text-gray-400 mb-2">
                            {move || Msg::Password.text(lang())}
                        </label>
                        <input
                            type="password"
                            prop:value=move || password.get()
                            on:input=move |ev| set_password.set(event_target_value(&ev))
                            class="w-full bg-gray-700 rounded-lg px-4 py-3 border border-gray-600 focus:border-primary-500 focus:outline-none"
                        />
                    </div>
                </Show>

                <button
                    type="submit"
                    disabled=move || submitting.get()
                    class="w-full py-3 bg-primary-600 hover:bg-primary-700 disabled:bg-gray-700 rounded-lg font-medium transition-colors"
                >
                    {
                        move || {
                            if submitting.get() {
                                Msg::Loading.text(lang())
                            } else if reset_mode.get() {
                                lang().pick("Gửi liên kết đặt lại", "Send reset link")
                            } else {
                                Msg::SignIn.text(lang())
                            }
                        }
                    }
                </button>

                <button
                    type="button"
                    on:click=move |_| set_reset_mode.update(|m| *m = !*m)
                    class="w-full text-sm text-gray-400 hover:text-white"
                >
                    {
                        move || if reset_mode.get() {
                            lang().pick("Quay lại đăng nhập", "Back to sign in")
                        } else {
                            lang().pick("Quên mật khẩu?", "Forgot password?")
                        }
                    }
                </button>
            </form>
        </div>
    }
}
