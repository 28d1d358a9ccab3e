//! Attendance Page
//!
//! Browse records by date, class and status with pagination. The current
//! page refetches whenever a live snapshot arrives.

use leptos::*;

use crate::api;
use crate::api::client::AttendanceFilter;
use crate::api::types::{AttendancePage, AttendanceStatus};
use crate::components::{format_rate, ListSkeleton, StatCard};
use crate::state::{GlobalState, Msg};

fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[component]
pub fn Attendance() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let prefs = state.prefs;
    let lang = move || prefs.get().language;
    let compact = move || prefs.get().display.compact_mode;

    let filter = create_rw_signal(AttendanceFilter {
        date: Some(today()),
        page: 1,
        ..Default::default()
    });
    let page = create_rw_signal(None::<AttendancePage>);
    let last_sync = state.last_sync;

    let state_for_load = state.clone();
    create_effect(move |_| {
        let current = filter.get();
        let _ = last_sync.get();
        let state = state_for_load.clone();
        let Some(token) = state.token() else {
            return;
        };
        spawn_local(async move {
            match api::fetch_attendance(&token, &current).await {
                Ok(result) => page.set(Some(result)),
                Err(e) => state.show_error(Msg::LoadFailed, &e),
            }
        });
    });

    let counts = move || page.get().map(|p| p.counts).unwrap_or_default();

    view! {
        <div class="space-y-6">
            <div>
                <h1 class="text-3xl font-bold">{move || lang().pick("Điểm danh", "Attendance")}</h1>
            </div>

            <div class="flex flex-wrap items-end gap-4 bg-gray-800 rounded-xl p-4">
                <div>
                    <label class="block text-sm text-gray-400 mb-1">{move || lang().pick("Ngày", "Date")}</label>
                    <input
                        type="date"
                        prop:value=move || filter.get().date.unwrap_or_default()
                        on:change=move |ev| filter.update(|f| {
                            f.date = non_empty(event_target_value(&ev));
                            f.page = 1;
                        })
                        class="bg-gray-700 rounded-lg px-3 py-2 border border-gray-600"
                    />
                </div>
                <div>
                    <label class="block text-sm text-gray-400 mb-1">{move || lang().pick("Lớp", "Class")}</label>
                    <input
                        type="text"
                        placeholder=move || Msg::AllClasses.text(lang())
                        on:change=move |ev| filter.update(|f| {
                            f.class = non_empty(event_target_value(&ev));
                            f.page = 1;
                        })
                        class="bg-gray-700 rounded-lg px-3 py-2 border border-gray-600"
                    />
                </div>
                <div>
                    <label class="block text-sm text-gray-400 mb-1">{move || lang().pick("Trạng thái", "Status")}</label>
                    <select
                        on:change=move |ev| filter.update(|f| {
                            f.status = AttendanceStatus::all()
                                .iter()
                                .copied()
                                .find(|s| s.as_str() == event_target_value(&ev));
                            f.page = 1;
                        })
                        class="bg-gray-700 rounded-lg px-3 py-2 border border-gray-600"
                    >
                        <option value="">{move || Msg::AllStatuses.text(lang())}</option>
                        {move || AttendanceStatus::all().iter().map(|s| view! {
                            <option value=s.as_str()>{s.label(lang())}</option>
                        }).collect_view()}
                    </select>
                </div>
            </div>

            <div class="grid grid-cols-2 md:grid-cols-5 gap-4">
                {move || {
                    let l = lang();
                    let c = counts();
                    let rate = page.get().map(|p| p.rate).unwrap_or(0.0);
                    view! {
                        <StatCard label=AttendanceStatus::Present.label(l).to_string() value=c.present.to_string() accent="text-green-400" icon="✅" />
                        <StatCard label=AttendanceStatus::Absent.label(l).to_string() value=c.absent.to_string() accent="text-red-400" icon="❌" />
                        <StatCard label=AttendanceStatus::Late.label(l).to_string() value=c.late.to_string() accent="text-yellow-400" icon="⏰" />
                        <StatCard label=AttendanceStatus::Excused.label(l).to_string() value=c.excused.to_string() icon="📝" />
                        <StatCard label=l.pick("Tỷ lệ có mặt", "Attendance rate").to_string() value=format_rate(rate) icon="📈" />
                    }
                }}
            </div>

            <section class="bg-gray-800 rounded-xl p-6">
                {move || match page.get() {
                    None => view! { <ListSkeleton /> }.into_view(),
                    Some(p) if p.records.is_empty() => view! {
                        <p class="text-gray-400">{Msg::NoData.text(lang())}</p>
                    }.into_view(),
                    Some(p) => {
                        let l = lang();
                        let row_class = if compact() { "border-t border-gray-700 text-sm" } else { "border-t border-gray-700" };
                        let cell = if compact() { "py-1" } else { "py-3" };
                        view! {
                            <table class="w-full text-left">
                                <thead class="text-gray-400 text-sm">
                                    <tr>
                                        <th class="py-2">{l.pick("Giờ", "Time")}</th>
                                        <th>{l.pick("Mã", "Code")}</th>
                                        <th>{l.pick("Họ tên", "Name")}</th>
                                        <th>{l.pick("Lớp", "Class")}</th>
                                        <th>{l.pick("Trạng thái", "Status")}</th>
                                        <th>{l.pick("Ghi chú", "Note")}</th>
                                    </tr>
                                </thead>
                                <tbody>
                                    {p.records.into_iter().map(|r| view! {
                                        <tr class=row_class>
                                            <td class=cell>{r.timestamp.with_timezone(&chrono::Local).format("%d/%m %H:%M").to_string()}</td>
                                            <td class="font-mono text-sm">{r.student_code}</td>
                                            <td>{r.student_name}</td>
                                            <td>{r.class}</td>
                                            <td>
                                                <span class=format!("px-2 py-1 rounded text-xs {}", r.status.badge_class())>
                                                    {r.status.label(l)}
                                                </span>
                                            </td>
                                            <td class="text-gray-400 text-sm">{r.note.unwrap_or_default()}</td>
                                        </tr>
                                    }).collect_view()}
                                </tbody>
                            </table>
                            <div class="flex items-center justify-between mt-4 text-sm">
                                <span class="text-gray-400">
                                    {format!("{} / {} · {}", p.page, p.total_pages.max(1), p.total)}
                                </span>
                                <div class="space-x-2">
                                    <button
                                        disabled={p.page <= 1}
                                        on:click=move |_| filter.update(|f| f.page = f.page.saturating_sub(1).max(1))
                                        class="px-3 py-1 bg-gray-700 hover:bg-gray-600 disabled:opacity-50 rounded"
                                    >
                                        {Msg::Previous.text(l)}
                                    </button>
                                    <button
                                        disabled={p.page >= p.total_pages}
                                        on:click=move |_| filter.update(|f| f.page += 1)
                                        class="px-3 py-1 bg-gray-700 hover:bg-gray-600 disabled:opacity-50 rounded"
                                    >
                                        {Msg::Next.text(l)}
                                    </button>
                                </div>
                            </div>
                        }.into_view()
                    }
                }}
            </section>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty("  ".to_string()), None);
        assert_eq!(non_empty(" 10A1 ".to_string()), Some("10A1".to_string()));
    }
}
