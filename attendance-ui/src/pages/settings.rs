//! Settings Page
//!
//! Profile, password, appearance, notification and display preferences,
//! and the API connection.

use leptos::*;

use crate::api;
use crate::state::settings::{Preferences, Theme};
use crate::state::{GlobalState, Lang, Msg, Session, SessionState};

/// Settings page component
#[component]
pub fn Settings() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let prefs = state.prefs;
    let lang = move || prefs.get().language;

    view! {
        <div class="space-y-8">
            <div>
                <h1 class="text-3xl font-bold">{move || lang().pick("Cài đặt", "Settings")}</h1>
            </div>

            <ProfileSettings />
            <PasswordSettings />
            <AppearanceSettings />
            <ToggleSettings />
            <ApiSettings />
            <ResetSection />
        </div>
    }
}

#[component]
fn Section(#[prop(into)] title: Signal<&'static str>, children: Children) -> impl IntoView {
    view! {
        <section class="bg-gray-800 rounded-xl p-6">
            <h2 class="text-xl font-semibold mb-4">{move || title.get()}</h2>
            <div class="space-y-4">{children()}</div>
        </section>
    }
}

/// Display name of the signed-in account
#[component]
fn ProfileSettings() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let prefs = state.prefs;
    let lang = move || prefs.get().language;

    let current = match state.session.get_untracked() {
        SessionState::SignedIn(session) => Some(session),
        _ => None,
    };
    let (name, set_name) = create_signal(
        current.as_ref().map(|s| s.user.display_name.clone()).unwrap_or_default(),
    );
    let email = current.as_ref().map(|s| s.user.email.clone()).unwrap_or_default();

    let save = move |_| {
        let state = state.clone();
        let Some(Session { token, user }) = current.clone() else {
            return;
        };
        let display_name = name.get().trim().to_string();
        if display_name.is_empty() {
            state.show_error(Msg::RequiredFields, "");
            return;
        }
        spawn_local(async move {
            match api::update_display_name(&token, &user.uid, &display_name).await {
                Ok(updated) => {
                    state.sign_in(Session { token, user: updated });
                    state.show_success(Msg::Saved);
                }
                Err(e) => state.show_error(Msg::SaveFailed, &e),
            }
        });
    };

    view! {
        <Section title=Signal::derive(move || lang().pick("Hồ sơ", "Profile"))>
            <div class="text-sm text-gray-400">{email}</div>
            <div class="flex space-x-2">
                <input
                    type="text"
                    prop:value=move || name.get()
                    on:input=move |ev| set_name.set(event_target_value(&ev))
                    class="flex-1 bg-gray-700 rounded-lg px-4 py-3 border border-gray-600 focus:border-primary-500 focus:outline-none"
                />
                <button
                    on:click=save
                    class="px-4 py-3 bg-primary-600 hover:bg-primary-700 rounded-lg font-medium transition-colors"
                >
                    {move || lang().pick("Lưu", "Save")}
                </button>
            </div>
        </Section>
    }
}

#[component]
fn PasswordSettings() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let prefs = state.prefs;
    let lang = move || prefs.get().language;

    let (current, set_current) = create_signal(String::new());
    let (new, set_new) = create_signal(String::new());
    let (confirm, set_confirm) = create_signal(String::new());

    let submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        let state = state.clone();
        let (cur, next, again) = (current.get(), new.get(), confirm.get());
        if cur.is_empty() || next.is_empty() {
            state.show_error(Msg::RequiredFields, "");
            return;
        }
        if next != again {
            state.show_error(Msg::PasswordMismatch, "");
            return;
        }
        let Some(token) = state.token() else {
            return;
        };
        spawn_local(async move {
            match api::change_password(&token, &cur, &next, &again).await {
                Ok(()) => {
                    set_current.set(String::new());
                    set_new.set(String::new());
                    set_confirm.set(String::new());
                    state.show_success(Msg::PasswordChanged);
                }
                Err(e) => state.show_error(Msg::SaveFailed, &e),
            }
        });
    };

    let input_class = "w-full bg-gray-700 rounded-lg px-4 py-3 border border-gray-600 focus:border-primary-500 focus:outline-none";

    view! {
        <Section title=Signal::derive(move || lang().pick("Đổi mật khẩu", "Change password"))>
            <form on:submit=submit class="space-y-3 max-w-md">
                <input type="password" class=input_class
                    placeholder=move || lang().pick("Mật khẩu hiện tại", "Current password")
                    prop:value=move || current.get()
                    on:input=move |ev| set_current.set(event_target_value(&ev)) />
                <input type="password" class=input_class
                    placeholder=move || lang().pick("Mật khẩu mới", "New password")
                    prop:value=move || new.get()
                    on:input=move |ev| set_new.set(event_target_value(&ev)) />
                <input type="password" class=input_class
                    placeholder=move || lang().pick("Xác nhận mật khẩu", "Confirm password")
                    prop:value=move || confirm.get()
                    on:input=move |ev| set_confirm.set(event_target_value(&ev)) />
                <button type="submit" class="px-4 py-3 bg-primary-600 hover:bg-primary-700 rounded-lg font-medium transition-colors">
                    {move || lang().pick("Cập nhật", "Update")}
                </button>
            </form>
        </Section>
    }
}

fn theme_label(theme: Theme, lang: Lang) -> &'static str {
    match theme {
        Theme::Light => lang.pick("Sáng", "Light"),
        Theme::Dark => lang.pick("Tối", "Dark"),
        Theme::Auto => lang.pick("Tự động", "Auto"),
    }
}

/// Theme and language
#[component]
fn AppearanceSettings() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let prefs = state.prefs;
    let lang = move || prefs.get().language;

    let state_for_theme = state.clone();
    let set_theme = move |theme: Theme| state_for_theme.update_prefs(|p| p.theme = theme);
    let set_lang = move |language: Lang| state.update_prefs(|p| p.language = language);

    let pill = |active: bool| {
        let base = "px-3 py-2 rounded-lg text-sm font-medium transition-colors";
        if active {
            format!("{} bg-primary-600 text-white", base)
        } else {
            format!("{} bg-gray-700 text-gray-400 hover:bg-gray-600", base)
        }
    };

    view! {
        <Section title=Signal::derive(move || lang().pick("Giao diện", "Appearance"))>
            <div>
                <label class="block text-sm text-gray-400 mb-2">{move || lang().pick("Chủ đề", "Theme")}</label>
                <div class="flex flex-wrap gap-2">
                    {[Theme::Light, Theme::Dark, Theme::Auto].into_iter().map(|theme| {
                        let set_theme = set_theme.clone();
                        view! {
                            <button
                                on:click=move |_| set_theme(theme)
                                class=move || pill(prefs.get().theme == theme)
                            >
                                {move || theme_label(theme, lang())}
                            </button>
                        }
                    }).collect_view()}
                </div>
            </div>
            <div>
                <label class="block text-sm text-gray-400 mb-2">{move || lang().pick("Ngôn ngữ", "Language")}</label>
                <div class="flex flex-wrap gap-2">
                    {[(Lang::Vi, "Tiếng Việt"), (Lang::En, "English")].into_iter().map(|(l, name)| {
                        let set_lang = set_lang.clone();
                        view! {
                            <button
                                on:click=move |_| set_lang(l)
                                class=move || pill(lang() == l)
                            >
                                {name}
                            </button>
                        }
                    }).collect_view()}
                </div>
            </div>
        </Section>
    }
}

/// Notification and display toggles
#[component]
fn ToggleSettings() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let prefs = state.prefs;
    let lang = move || prefs.get().language;

    type Getter = fn(&Preferences) -> bool;
    type Setter = fn(&mut Preferences, bool);
    let toggles: [(&'static str, &'static str, Getter, Setter); 7] = [
        ("Thông báo email", "Email notifications", |p| p.notifications.email, |p, v| p.notifications.email = v),
        ("Thông báo đẩy", "Push notifications", |p| p.notifications.push, |p, v| p.notifications.push = v),
        ("Thông báo điểm danh", "Attendance notifications", |p| p.notifications.attendance, |p, v| p.notifications.attendance = v),
        ("Thông báo báo cáo", "Report notifications", |p| p.notifications.reports, |p, v| p.notifications.reports = v),
        ("Chế độ thu gọn", "Compact mode", |p| p.display.compact_mode, |p, v| p.display.compact_mode = v),
        ("Hiện ảnh đại diện", "Show avatar", |p| p.display.show_avatar, |p, v| p.display.show_avatar = v),
        ("Hiệu ứng chuyển động", "Animations", |p| p.display.animations_enabled, |p, v| p.display.animations_enabled = v),
    ];

    view! {
        <Section title=Signal::derive(move || lang().pick("Thông báo và hiển thị", "Notifications and display"))>
            {toggles.into_iter().map(|(vi, en, get, set)| {
                let state = state.clone();
                view! {
                    <label class="flex items-center justify-between p-3 bg-gray-700 rounded-lg cursor-pointer">
                        <span>{move || lang().pick(vi, en)}</span>
                        <input
                            type="checkbox"
                            prop:checked=move || get(&prefs.get())
                            on:change=move |ev| {
                                let checked = event_target_checked(&ev);
                                state.update_prefs(|p| set(p, checked));
                            }
                            class="w-5 h-5"
                        />
                    </label>
                }
            }).collect_view()}
        </Section>
    }
}

/// API connection settings
#[component]
fn ApiSettings() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let prefs = state.prefs;
    let lang = move || prefs.get().language;

    let (api_url, set_api_url) = create_signal(api::get_api_base());
    let (testing, set_testing) = create_signal(false);
    let (test_result, set_test_result) = create_signal(None::<bool>);

    let state_for_test = state.clone();
    let test_connection = move |_| {
        set_testing.set(true);
        set_test_result.set(None);
        api::set_api_base(&api_url.get());

        let state = state_for_test.clone();
        spawn_local(async move {
            match api::check_health().await {
                Ok(_) => {
                    set_test_result.set(Some(true));
                    state.show_success(Msg::Connected);
                }
                Err(e) => {
                    set_test_result.set(Some(false));
                    state.show_error(Msg::Disconnected, &e);
                }
            }
            set_testing.set(false);
        });
    };

    let state_for_save = state.clone();
    let save_url = move |_| {
        api::set_api_base(&api_url.get());
        state_for_save.show_success(Msg::Saved);
    };

    let ws_connected = state.ws_connected;

    view! {
        <Section title=Signal::derive(move || lang().pick("Kết nối API", "API connection"))>
            <div class="flex space-x-2">
                <input
                    type="text"
                    prop:value=move || api_url.get()
                    on:input=move |ev| set_api_url.set(event_target_value(&ev))
                    class="flex-1 bg-gray-700 rounded-lg px-4 py-3 border border-gray-600 focus:border-primary-500 focus:outline-none"
                />
                <button
                    on:click=test_connection
                    disabled=move || testing.get()
                    class="px-4 py-3 bg-gray-600 hover:bg-gray-500 disabled:bg-gray-700 rounded-lg font-medium transition-colors"
                >
                    {move || if testing.get() { Msg::Loading.text(lang()) } else { lang().pick("Kiểm tra", "Test") }}
                </button>
                <button
                    on:click=save_url
                    class="px-4 py-3 bg-primary-600 hover:bg-primary-700 rounded-lg font-medium transition-colors"
                >
                    {move || lang().pick("Lưu", "Save")}
                </button>
            </div>
            <div class="flex items-center space-x-4 text-sm">
                {move || match test_result.get() {
                    Some(true) => view! { <span class="text-green-400">{format!("✓ {}", Msg::Connected.text(lang()))}</span> }.into_view(),
                    Some(false) => view! { <span class="text-red-400">{format!("✕ {}", Msg::Disconnected.text(lang()))}</span> }.into_view(),
                    None => view! {}.into_view(),
                }}
                <span class="text-gray-400">
                    {move || format!(
                        "WebSocket: {}",
                        if ws_connected.get() { Msg::Connected.text(lang()) } else { Msg::Disconnected.text(lang()) }
                    )}
                </span>
            </div>
        </Section>
    }
}

#[component]
fn ResetSection() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let prefs = state.prefs;
    let lang = move || prefs.get().language;

    let reset = move |_| {
        state.update_prefs(|p| *p = Preferences::default());
        state.show_success(Msg::SettingsReset);
    };

    view! {
        <Section title=Signal::derive(move || lang().pick("Khôi phục", "Reset"))>
            <div class="flex items-center justify-between">
                <p class="text-sm text-gray-400">
                    {move || lang().pick("Đưa mọi cài đặt về mặc định.", "Restore every setting to its default.")}
                </p>
                <button
                    on:click=reset
                    class="px-4 py-2 bg-red-700 hover:bg-red-600 rounded-lg font-medium transition-colors"
                >
                    {move || lang().pick("Khôi phục mặc định", "Restore defaults")}
                </button>
            </div>
            <p class="text-xs text-gray-500">{format!("attendance-ui v{}", env!("CARGO_PKG_VERSION"))}</p>
        </Section>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_labels() {
        assert_eq!(theme_label(Theme::Dark, Lang::En), "Dark");
        assert_eq!(theme_label(Theme::Auto, Lang::Vi), "Tự động");
    }
}
