//! Save/delete/sign-in feedback, stacked in the bottom-right corner
//!
//! `GlobalState::show_success` and `show_error` fill the signals and clear
//! them after a few seconds; the close button clears them early.

use leptos::*;

use crate::state::global::GlobalState;
use crate::state::i18n::Lang;

#[component]
pub fn Toast() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let prefs = state.prefs;
    let animated = move || prefs.get().display.animations_enabled;
    let lang = move || prefs.get().language;
    let success = state.success;
    let error = state.error;

    view! {
        <div class="fixed bottom-6 right-6 z-50 flex flex-col gap-2 w-80 max-w-[90vw]">
            {move || success.get().map(|message| view! {
                <Notice message=message kind=Kind::Done shown=success animated=animated() lang=lang() />
            })}
            {move || error.get().map(|message| view! {
                <Notice message=message kind=Kind::Failed shown=error animated=animated() lang=lang() />
            })}
        </div>
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Kind {
    Done,
    Failed,
}

impl Kind {
    /// Icon, colour classes, ARIA role
    fn style(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Kind::Done => ("✅", "bg-emerald-700 border-emerald-500", "status"),
            Kind::Failed => ("⚠️", "bg-rose-800 border-rose-500", "alert"),
        }
    }
}

#[component]
fn Notice(
    message: String,
    kind: Kind,
    shown: RwSignal<Option<String>>,
    animated: bool,
    lang: Lang,
) -> impl IntoView {
    let (icon, colours, role) = kind.style();
    let motion = if animated { "animate-slide-in" } else { "" };

    view! {
        <div
            role=role
            class=format!(
                "flex items-start gap-3 border-l-4 {} text-white px-4 py-3 rounded-md shadow-xl {}",
                colours, motion
            )
        >
            <span class="text-base leading-5">{icon}</span>
            <p class="flex-1 text-sm leading-5">{message}</p>
            <button
                class="text-white/70 hover:text-white text-sm"
                title=lang.pick("Đóng", "Dismiss")
                on:click=move |_| shown.set(None)
            >
                "×"
            </button>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_are_announced_as_alerts() {
        assert_eq!(Kind::Failed.style().2, "alert");
        assert_eq!(Kind::Done.style().2, "status");
    }
}
