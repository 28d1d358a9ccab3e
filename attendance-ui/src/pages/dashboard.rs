//! Dashboard Page
//!
//! Headline statistics, today's live check-ins and per-class activity.

use leptos::*;

use crate::api;
use crate::api::types::{AttendanceRecord, AttendanceStatus, ClassActivity, Dashboard as DashboardData};
use crate::components::{format_rate, CardSkeleton, StatCard};
use crate::state::{GlobalState, Msg};

/// Dashboard page component
#[component]
pub fn Dashboard() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let data = create_rw_signal(None::<DashboardData>);

    let state_for_effect = state.clone();
    create_effect(move |_| {
        // Refetch whenever a live snapshot lands
        let _ = state_for_effect.last_sync.get();
        let state = state_for_effect.clone();
        let Some(token) = state.token() else {
            return;
        };
        spawn_local(async move {
            match api::fetch_dashboard(&token).await {
                Ok(dashboard) => data.set(Some(dashboard)),
                Err(e) => state.show_error(Msg::LoadFailed, &e),
            }
        });
    });

    let prefs = state.prefs;
    let lang = move || prefs.get().language;

    let stats = move || data.get().map(|d| d.stats);

    view! {
        <div class="space-y-8">
            <div class="flex items-center justify-between">
                <div>
                    <h1 class="text-3xl font-bold">{move || lang().pick("Tổng quan", "Dashboard")}</h1>
                    <p class="text-gray-400 mt-1">
                        {move || data.get().map(|d| d.date.format("%d/%m/%Y").to_string()).unwrap_or_default()}
                    </p>
                </div>
            </div>

            <section>
                {
                    move || match stats() {
                        None => view! {
                            <div class="grid grid-cols-2 md:grid-cols-4 gap-4">
                                <CardSkeleton /><CardSkeleton /><CardSkeleton /><CardSkeleton />
                            </div>
                        }.into_view(),
                        Some(s) => {
                            let l = lang();
                            view! {
                                <div class="grid grid-cols-2 md:grid-cols-4 gap-4">
                                    <StatCard
                                        label=l.pick("Tổng học sinh", "Total students").to_string()
                                        value=s.total_students.to_string()
                                        icon="👥"
                                    />
                                    <StatCard
                                        label=l.pick("Có mặt hôm nay", "Present today").to_string()
                                        value=s.today.present.to_string()
                                        detail=format_rate(s.today.rate)
                                        accent="text-green-400"
                                        icon="✅"
                                    />
                                    <StatCard
                                        label=l.pick("Tuần này", "This week").to_string()
                                        value=s.week.present.to_string()
                                        detail=format_rate(s.week.rate)
                                        icon="📅"
                                    />
                                    <StatCard
                                        label=l.pick("Tháng này", "This month").to_string()
                                        value=s.month.present.to_string()
                                        detail=format_rate(s.month.rate)
                                        icon="🗓"
                                    />
                                </div>
                                <div class="grid grid-cols-2 gap-4 mt-4">
                                    <StatCard
                                        label=AttendanceStatus::Absent.label(l).to_string()
                                        value=s.today.absent.to_string()
                                        accent="text-red-400"
                                        icon="❌"
                                    />
                                    <StatCard
                                        label=AttendanceStatus::Late.label(l).to_string()
                                        value=s.today.late.to_string()
                                        accent="text-yellow-400"
                                        icon="⏰"
                                    />
                                </div>
                            }.into_view()
                        }
                    }
                }
            </section>

            <div class="grid md:grid-cols-2 gap-8">
                <section class="bg-gray-800 rounded-xl p-6">
                    <h2 class="text-xl font-semibold mb-4">
                        {move || lang().pick("Hoạt động theo lớp", "Class activity")}
                    </h2>
                    {
                        move || {
                            let activity = data.get().map(|d| d.class_activity).unwrap_or_default();
                            if activity.is_empty() {
                                view! { <p class="text-gray-400">{Msg::NoData.text(lang())}</p> }.into_view()
                            } else {
                                activity.into_iter().map(|a| view! { <ClassActivityRow activity=a /> }).collect_view()
                            }
                        }
                    }
                </section>

                <section class="bg-gray-800 rounded-xl p-6">
                    <h2 class="text-xl font-semibold mb-4">
                        {move || lang().pick("Điểm danh gần đây", "Recent check-ins")}
                    </h2>
                    <RecentCheckIns />
                </section>
            </div>
        </div>
    }
}

#[component]
fn ClassActivityRow(activity: ClassActivity) -> impl IntoView {
    let percent = if activity.total == 0 {
        0.0
    } else {
        activity.present as f64 / activity.total as f64 * 100.0
    };

    view! {
        <div class="py-3 border-b border-gray-700 last:border-0">
            <div class="flex items-center justify-between mb-1">
                <span class="font-medium">
                    {activity.class.clone()}
                    {activity.is_new.then(|| view! {
                        <span class="ml-2 px-2 py-0.5 text-xs rounded bg-blue-600">"NEW"</span>
                    })}
                </span>
                <span class="text-sm text-gray-400">
                    {format!("{}/{} · {}", activity.present, activity.total, activity.latest.format("%H:%M"))}
                </span>
            </div>
            <div class="h-2 bg-gray-700 rounded">
                <div class="h-2 bg-green-500 rounded" style=format!("width: {:.0}%", percent) />
            </div>
        </div>
    }
}

/// Live list fed by the `attendance.recent` subscription
#[component]
fn RecentCheckIns() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let records = state.recent_records;

    move || {
        let lang = state.lang();
        let items: Vec<AttendanceRecord> = records.get().into_iter().take(10).collect();
        if items.is_empty() {
            return view! { <p class="text-gray-400">{Msg::NoData.text(lang)}</p> }.into_view();
        }
        view! {
            <ul class="divide-y divide-gray-700">
                {items.into_iter().map(|r| view! {
                    <li class="py-2 flex items-center justify-between">
                        <div>
                            <div class="font-medium">{r.student_name.clone()}</div>
                            <div class="text-xs text-gray-400">{format!("{} · {}", r.student_code, r.class)}</div>
                        </div>
                        <div class="text-right">
                            <span class=format!("px-2 py-1 rounded text-xs {}", r.status.badge_class())>
                                {r.status.label(lang)}
                            </span>
                            <div class="text-xs text-gray-500 mt-1">{r.timestamp.format("%H:%M:%S").to_string()}</div>
                        </div>
                    </li>
                }).collect_view()}
            </ul>
        }
        .into_view()
    }
}
