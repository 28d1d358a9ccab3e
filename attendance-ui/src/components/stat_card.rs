//! Stat Card Component
//!
//! Headline number with a label and an optional rate.

use leptos::*;

#[component]
pub fn StatCard(
    #[prop(into)] label: MaybeSignal<String>,
    #[prop(into)] value: MaybeSignal<String>,
    #[prop(optional, into)] detail: Option<MaybeSignal<String>>,
    #[prop(default = "text-white")] accent: &'static str,
    #[prop(default = "📋")] icon: &'static str,
) -> impl IntoView {
    view! {
        <div class="bg-gray-800 rounded-lg p-4 hover:bg-gray-750 transition-colors">
            <div class="flex items-center justify-between mb-2">
                <span class="text-gray-400 text-sm">{move || label.get()}</span>
                <span class="text-2xl">{icon}</span>
            </div>
            <div class=format!("text-3xl font-bold {}", accent)>{move || value.get()}</div>
            {detail.map(|d| view! { <div class="text-sm text-gray-500 mt-1">{move || d.get()}</div> })}
        </div>
    }
}

/// Format a percentage with one decimal
pub fn format_rate(rate: f64) -> String {
    format!("{:.1}%", rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(0.0), "0.0%");
        assert_eq!(format_rate(66.666), "66.7%");
    }
}
