//! Placeholders shown while a page waits on the API

use leptos::*;

use crate::state::global::GlobalState;
use crate::state::i18n::Msg;

/// Spinner with the localized "loading" caption, used while the session
/// is being restored and by role-gated routes
#[component]
pub fn Loading() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let prefs = state.prefs;

    view! {
        <div class="flex flex-col items-center justify-center gap-3 py-16" role="status">
            <div class="loading-spinner w-10 h-10" />
            <span class="text-sm text-gray-400">
                {move || Msg::Loading.text(prefs.get().language)}
            </span>
        </div>
    }
}

/// Same footprint as a dashboard `StatCard`
#[component]
pub fn CardSkeleton() -> impl IntoView {
    view! {
        <div class="bg-gray-800 rounded-lg p-4 animate-pulse">
            <div class="flex items-center justify-between mb-3">
                <div class="h-3 bg-gray-700 rounded w-24" />
                <div class="h-7 w-7 bg-gray-700 rounded-full" />
            </div>
            <div class="h-8 bg-gray-700 rounded w-16 mb-2" />
            <div class="h-3 bg-gray-700 rounded w-20" />
        </div>
    }
}

/// Placeholder rows for the student, attendance and user tables:
/// avatar, name, class and a status pill
#[component]
pub fn ListSkeleton(#[prop(default = 6)] rows: usize) -> impl IntoView {
    view! {
        <div class="divide-y divide-gray-700 animate-pulse">
            {(0..rows).map(|i| view! {
                <div class="flex items-center gap-3 py-3">
                    <div class="h-8 w-8 bg-gray-700 rounded-full shrink-0" />
                    <div class=format!("h-3 bg-gray-700 rounded {}", name_width(i)) />
                    <div class="h-3 bg-gray-700 rounded w-12 ml-auto" />
                    <div class="h-5 bg-gray-700 rounded-full w-16" />
                </div>
            }).collect_view()}
        </div>
    }
}

/// Ragged name column so the placeholder does not read as a grid
fn name_width(row: usize) -> &'static str {
    const WIDTHS: [&str; 3] = ["w-40", "w-28", "w-32"];
    WIDTHS[row % WIDTHS.len()]
}
