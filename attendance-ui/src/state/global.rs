//! Global Application State
//!
//! Reactive state management using Leptos signals.

use leptos::*;

use super::guard::{Session, SessionState};
use super::i18n::{Lang, Msg};
use super::settings::{self, Preferences};
use crate::api::types::{AttendanceRecord, Role};

/// `localStorage` key of the bearer token
const TOKEN_KEY: &str = "attendance_token";

/// Global application state provided to all components
#[derive(Clone)]
pub struct GlobalState {
    pub session: RwSignal<SessionState>,
    /// Settings blob, mirrored to `localStorage`
    pub prefs: RwSignal<Preferences>,
    /// Live mirror of today's records
    pub today_records: RwSignal<Vec<AttendanceRecord>>,
    /// Live mirror of the latest records
    pub recent_records: RwSignal<Vec<AttendanceRecord>>,
    pub ws_connected: RwSignal<bool>,
    /// Time of the last live snapshot
    pub last_sync: RwSignal<Option<i64>>,
    pub loading: RwSignal<bool>,
    pub error: RwSignal<Option<String>>,
    pub success: RwSignal<Option<String>>,
}

/// Provide global state to the component tree
pub fn provide_global_state() {
    let prefs = settings::load_settings();
    settings::apply_theme(prefs.theme);

    let session = if stored_token().is_some() {
        SessionState::Loading
    } else {
        SessionState::SignedOut
    };

    let state = GlobalState {
        session: create_rw_signal(session),
        prefs: create_rw_signal(prefs),
        today_records: create_rw_signal(Vec::new()),
        recent_records: create_rw_signal(Vec::new()),
        ws_connected: create_rw_signal(false),
        last_sync: create_rw_signal(None),
        loading: create_rw_signal(false),
        error: create_rw_signal(None),
        success: create_rw_signal(None),
    };

    provide_context(state);
}

pub fn stored_token() -> Option<String> {
    web_sys::window()?
        .local_storage()
        .ok()??
        .get_item(TOKEN_KEY)
        .ok()?
}

fn store_token(token: Option<&str>) {
    let Some(storage) = web_sys::window().and_then(|w| w.local_storage().ok().flatten()) else {
        return;
    };
    let _ = match token {
        Some(t) => storage.set_item(TOKEN_KEY, t),
        None => storage.remove_item(TOKEN_KEY),
    };
}

impl GlobalState {
    pub fn lang(&self) -> Lang {
        self.prefs.get().language
    }

    pub fn t(&self, msg: Msg) -> &'static str {
        msg.text(self.lang())
    }

    pub fn token(&self) -> Option<String> {
        match self.session.get_untracked() {
            SessionState::SignedIn(session) => Some(session.token),
            _ => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.session.get().role()
    }

    pub fn sign_in(&self, session: Session) {
        store_token(Some(&session.token));
        self.session.set(SessionState::SignedIn(session));
    }

    pub fn sign_out(&self) {
        store_token(None);
        self.today_records.set(Vec::new());
        self.recent_records.set(Vec::new());
        self.session.set(SessionState::SignedOut);
    }

    /// Write the whole blob back
    pub fn update_prefs(&self, change: impl FnOnce(&mut Preferences)) {
        let mut next = self.prefs.get_untracked();
        change(&mut next);
        settings::apply_theme(next.theme);
        match settings::save_settings(&next) {
            Ok(()) => self.show_success(Msg::SettingsSaved),
            Err(e) => {
                web_sys::console::error_1(&format!("Failed to save settings: {}", e).into());
                self.show_error(Msg::SaveFailed, &e);
            }
        }
        self.prefs.set(next);
    }

    /// Show a success message (auto-clears after timeout)
    pub fn show_success(&self, msg: Msg) {
        self.success.set(Some(msg.text(self.prefs.get_untracked().language).to_string()));

        let success_signal = self.success;
        gloo_timers::callback::Timeout::new(3000, move || {
            success_signal.set(None);
        })
        .forget();
    }

    /// Show an error message (auto-clears after timeout)
    pub fn show_error(&self, msg: Msg, detail: &str) {
        let text = msg.text(self.prefs.get_untracked().language);
        web_sys::console::error_1(&format!("{}: {}", text, detail).into());
        let message = if detail.is_empty() {
            text.to_string()
        } else {
            format!("{}: {}", text, detail)
        };
        self.error.set(Some(message));

        let error_signal = self.error;
        gloo_timers::callback::Timeout::new(5000, move || {
            error_signal.set(None);
        })
        .forget();
    }
}
