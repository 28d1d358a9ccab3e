//! Reports Page
//!
//! Period and class selectors, daily and per-class bar charts, status
//! distribution, summary figures and spreadsheet export.

use leptos::*;
use wasm_bindgen::JsCast;
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Url};

use crate::api;
use crate::api::client::ExportFile;
use crate::api::types::{AttendanceStatus, ClassSeries, DailySeries, Report, ReportPeriod};
use crate::components::{
    format_rate, BarChart, BarSeries, ListSkeleton, PieChart, Slice, StatCard,
};
use crate::components::chart::{ABSENT_COLOR, LATE_COLOR, PRESENT_COLOR};
use crate::state::{GlobalState, Lang, Msg};

/// Name used when the response carries no `Content-Disposition`
pub fn export_file_name(period: ReportPeriod, date: chrono::NaiveDate, ext: &str) -> String {
    format!(
        "attendance_report_{}_{}.{}",
        period.as_str(),
        date.format("%Y%m%d"),
        ext
    )
}

fn status_series(lang: Lang, present: Vec<usize>, absent: Vec<usize>, late: Vec<usize>) -> Vec<BarSeries> {
    vec![
        BarSeries {
            name: AttendanceStatus::Present.label(lang).to_string(),
            color: PRESENT_COLOR,
            values: present,
        },
        BarSeries {
            name: AttendanceStatus::Absent.label(lang).to_string(),
            color: ABSENT_COLOR,
            values: absent,
        },
        BarSeries {
            name: AttendanceStatus::Late.label(lang).to_string(),
            color: LATE_COLOR,
            values: late,
        },
    ]
}

pub fn daily_bars(lang: Lang, daily: &[DailySeries]) -> (Vec<String>, Vec<BarSeries>) {
    let labels = daily.iter().map(|d| d.label.clone()).collect();
    let series = status_series(
        lang,
        daily.iter().map(|d| d.present).collect(),
        daily.iter().map(|d| d.absent).collect(),
        daily.iter().map(|d| d.late).collect(),
    );
    (labels, series)
}

pub fn class_bars(lang: Lang, classes: &[ClassSeries]) -> (Vec<String>, Vec<BarSeries>) {
    let labels = classes.iter().map(|c| c.class.clone()).collect();
    let series = status_series(
        lang,
        classes.iter().map(|c| c.present).collect(),
        classes.iter().map(|c| c.absent).collect(),
        classes.iter().map(|c| c.late).collect(),
    );
    (labels, series)
}

/// Hand the bytes to the browser as a file download
fn download(file: &ExportFile, name: &str) -> Result<(), String> {
    let parts = js_sys::Array::new();
    parts.push(&js_sys::Uint8Array::from(file.bytes.as_slice()).buffer());

    let props = BlobPropertyBag::new();
    props.set_type(&file.content_type);
    let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &props)
        .map_err(|e| format!("{:?}", e))?;
    let url = Url::create_object_url_with_blob(&blob).map_err(|e| format!("{:?}", e))?;

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or("document unavailable")?;
    let anchor: HtmlAnchorElement = document
        .create_element("a")
        .map_err(|e| format!("{:?}", e))?
        .dyn_into()
        .map_err(|_| "not an anchor".to_string())?;
    anchor.set_href(&url);
    anchor.set_download(name);
    anchor.click();

    let _ = Url::revoke_object_url(&url);
    Ok(())
}

#[component]
pub fn Reports() -> impl IntoView {
    let state = use_context::<GlobalState>().expect("GlobalState not found");
    let prefs = state.prefs;
    let lang = move || prefs.get().language;

    let period = create_rw_signal(ReportPeriod::Week);
    let class = create_rw_signal(None::<String>);
    let report = create_rw_signal(None::<Report>);
    let (exporting, set_exporting) = create_signal(false);

    let state_for_load = state.clone();
    create_effect(move |_| {
        let period = period.get();
        let class = class.get();
        let state = state_for_load.clone();
        let Some(token) = state.token() else {
            return;
        };
        report.set(None);
        spawn_local(async move {
            match api::fetch_report(&token, period, class).await {
                Ok(r) => report.set(Some(r)),
                Err(e) => state.show_error(Msg::LoadFailed, &e),
            }
        });
    });

    let state_for_export = state.clone();
    let export = move |format: &'static str| {
        let state = state_for_export.clone();
        let Some(token) = state.token() else {
            return;
        };
        let period = period.get_untracked();
        let class = class.get_untracked();
        set_exporting.set(true);
        spawn_local(async move {
            let result = api::export_report(&token, period, class, format).await.and_then(|file| {
                let today = chrono::Local::now().date_naive();
                let name = file
                    .file_name
                    .clone()
                    .unwrap_or_else(|| export_file_name(period, today, format));
                download(&file, &name)
            });
            match result {
                Ok(()) => state.show_success(Msg::ExportDone),
                Err(e) => state.show_error(Msg::ExportFailed, &e),
            }
            set_exporting.set(false);
        });
    };
    let export_xlsx = export.clone();
    let export_csv = export;

    let daily = Signal::derive(move || {
        daily_bars(lang(), &report.get().map(|r| r.daily).unwrap_or_default())
    });
    let by_class = Signal::derive(move || {
        class_bars(
            lang(),
            &report.get().and_then(|r| r.by_class).unwrap_or_default(),
        )
    });
    let slices = Signal::derive(move || {
        let l = lang();
        report
            .get()
            .map(|r| r.distribution)
            .unwrap_or_default()
            .into_iter()
            .map(|s| Slice {
                label: s.status.label(l).to_string(),
                color: s.color,
                value: s.count,
            })
            .collect::<Vec<_>>()
    });
    let no_data = Signal::derive(move || Msg::NoData.text(lang()).to_string());

    view! {
        <div class="space-y-6">
            <div class="flex flex-wrap items-center justify-between gap-4">
                <h1 class="text-3xl font-bold">{move || lang().pick("Báo cáo", "Reports")}</h1>
                <div class="flex flex-wrap items-center gap-2">
                    {move || ReportPeriod::all().iter().map(|p| {
                        let p = *p;
                        view! {
                            <button
                                on:click=move |_| period.set(p)
                                class=move || {
                                    let base = "px-3 py-2 rounded-lg text-sm font-medium transition-colors";
                                    if period.get() == p {
                                        format!("{} bg-primary-600 text-white", base)
                                    } else {
                                        format!("{} bg-gray-700 text-gray-400 hover:bg-gray-600", base)
                                    }
                                }
                            >
                                {p.label(lang())}
                            </button>
                        }
                    }).collect_view()}
                    <input
                        type="text"
                        placeholder=move || Msg::AllClasses.text(lang())
                        on:change=move |ev| {
                            let value = event_target_value(&ev).trim().to_string();
                            class.set((!value.is_empty()).then_some(value));
                        }
                        class="bg-gray-700 rounded-lg px-3 py-2 border border-gray-600 w-32"
                    />
                    <button
                        disabled=move || exporting.get()
                        on:click=move |_| export_xlsx("xlsx")
                        class="px-3 py-2 bg-green-700 hover:bg-green-600 disabled:bg-gray-700 rounded-lg text-sm"
                    >
                        "Excel"
                    </button>
                    <button
                        disabled=move || exporting.get()
                        on:click=move |_| export_csv("csv")
                        class="px-3 py-2 bg-gray-600 hover:bg-gray-500 disabled:bg-gray-700 rounded-lg text-sm"
                    >
                        "CSV"
                    </button>
                </div>
            </div>

            {move || match report.get() {
                None => view! { <ListSkeleton rows=3 /> }.into_view(),
                Some(r) => {
                    let l = lang();
                    view! {
                        <div class="grid grid-cols-2 md:grid-cols-4 gap-4">
                            <StatCard label=l.pick("Tổng lượt", "Total records").to_string() value=r.summary.total_records.to_string() icon="🧾" />
                            <StatCard label=l.pick("Số buổi", "Sessions").to_string() value=r.summary.total_sessions.to_string() icon="📅" />
                            <StatCard label=l.pick("Tỷ lệ trung bình", "Average rate").to_string() value=format_rate(r.summary.avg_rate) icon="📈" />
                            <StatCard label=l.pick("Số lớp", "Classes").to_string() value=r.summary.classes.len().to_string() icon="🏫" />
                        </div>
                        <p class="text-sm text-gray-400">
                            {format!("{} → {}", r.start.format("%d/%m/%Y"), r.end.format("%d/%m/%Y"))}
                        </p>
                    }.into_view()
                }
            }}

            <section class="bg-gray-800 rounded-xl p-6">
                <h2 class="text-xl font-semibold mb-4">{move || lang().pick("Theo ngày", "By day")}</h2>
                <BarChart
                    labels=Signal::derive(move || daily.get().0)
                    series=Signal::derive(move || daily.get().1)
                    empty_text=no_data
                />
            </section>

            <div class="grid md:grid-cols-2 gap-8">
                <Show when=move || report.get().map_or(false, |r| r.by_class.is_some())>
                    <section class="bg-gray-800 rounded-xl p-6">
                        <h2 class="text-xl font-semibold mb-4">{move || lang().pick("Theo lớp", "By class")}</h2>
                        <BarChart
                            labels=Signal::derive(move || by_class.get().0)
                            series=Signal::derive(move || by_class.get().1)
                            empty_text=no_data
                        />
                    </section>
                </Show>

                <section class="bg-gray-800 rounded-xl p-6">
                    <h2 class="text-xl font-semibold mb-4">{move || lang().pick("Phân bố trạng thái", "Status distribution")}</h2>
                    <PieChart slices=slices empty_text=no_data />
                </section>
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_export_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            export_file_name(ReportPeriod::Month, date, "xlsx"),
            "attendance_report_month_20240309.xlsx"
        );
    }

    #[test]
    fn test_daily_bars_align_with_labels() {
        let day = DailySeries {
            date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
            label: "09/03".to_string(),
            present: 7,
            absent: 2,
            late: 1,
        };
        let (labels, series) = daily_bars(Lang::En, &[day]);
        assert_eq!(labels, vec!["09/03".to_string()]);
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].values, vec![7]);
        assert_eq!(series[1].values, vec![2]);
        assert_eq!(series[2].values, vec![1]);
        assert_eq!(series[0].name, "Present");
    }
}
