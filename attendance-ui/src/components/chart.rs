//! Chart Components
//!
//! Grouped bar chart and status pie drawn on HTML5 Canvas.

use leptos::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

pub const PRESENT_COLOR: &str = "#4CAF50";
pub const ABSENT_COLOR: &str = "#F44336";
pub const LATE_COLOR: &str = "#FF9800";

/// One colored series of a bar chart
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub name: String,
    pub color: &'static str,
    pub values: Vec<usize>,
}

/// One pie slice
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub label: String,
    pub color: String,
    pub value: usize,
}

/// Grouped bar chart, one group per label
#[component]
pub fn BarChart(
    #[prop(into)] labels: Signal<Vec<String>>,
    #[prop(into)] series: Signal<Vec<BarSeries>>,
    #[prop(into)] empty_text: Signal<String>,
) -> impl IntoView {
    let canvas_ref = create_node_ref::<html::Canvas>();

    create_effect(move |_| {
        let labels = labels.get();
        let series = series.get();
        let empty = empty_text.get();
        if let Some(canvas) = canvas_ref.get() {
            draw_bars(&canvas, &labels, &series, &empty);
        }
    });

    view! {
        <div class="relative">
            <canvas
                node_ref=canvas_ref
                width="800"
                height="320"
                class="w-full h-64 md:h-80 rounded-lg"
            />
            <div class="flex justify-center flex-wrap gap-4 mt-4">
                {move || series.get().into_iter().map(|s| view! {
                    <div class="flex items-center space-x-2">
                        <div class="w-3 h-3 rounded-full" style=format!("background-color: {}", s.color) />
                        <span class="text-sm text-gray-300">{s.name}</span>
                    </div>
                }).collect_view()}
            </div>
        </div>
    }
}

/// Status distribution pie
#[component]
pub fn PieChart(
    #[prop(into)] slices: Signal<Vec<Slice>>,
    #[prop(into)] empty_text: Signal<String>,
) -> impl IntoView {
    let canvas_ref = create_node_ref::<html::Canvas>();

    create_effect(move |_| {
        let slices = slices.get();
        let empty = empty_text.get();
        if let Some(canvas) = canvas_ref.get() {
            draw_pie(&canvas, &slices, &empty);
        }
    });

    view! {
        <div class="flex flex-col items-center">
            <canvas node_ref=canvas_ref width="320" height="320" class="w-64 h-64" />
            <div class="flex justify-center flex-wrap gap-4 mt-4">
                {move || slices.get().into_iter().map(|s| view! {
                    <div class="flex items-center space-x-2">
                        <div class="w-3 h-3 rounded-full" style=format!("background-color: {}", s.color) />
                        <span class="text-sm text-gray-300">{format!("{} ({})", s.label, s.value)}</span>
                    </div>
                }).collect_view()}
            </div>
        </div>
    }
}

fn context(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
    canvas.get_context("2d").ok()??.dyn_into().ok()
}

/// Round the axis maximum up to a multiple of 5
pub fn axis_max(series: &[BarSeries]) -> usize {
    let max = series
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .max()
        .unwrap_or(0);
    (max.div_ceil(5) * 5).max(5)
}

/// Start angles and sweeps in radians
pub fn slice_angles(slices: &[Slice]) -> Vec<(f64, f64)> {
    let total: usize = slices.iter().map(|s| s.value).sum();
    if total == 0 {
        return Vec::new();
    }
    let mut start = -std::f64::consts::FRAC_PI_2;
    slices
        .iter()
        .map(|s| {
            let sweep = s.value as f64 / total as f64 * std::f64::consts::TAU;
            let angles = (start, sweep);
            start += sweep;
            angles
        })
        .collect()
}

fn draw_empty(ctx: &CanvasRenderingContext2d, width: f64, height: f64, text: &str) {
    ctx.set_fill_style(&"#6b7280".into());
    ctx.set_font("16px sans-serif");
    let _ = ctx.fill_text(text, width / 2.0 - 60.0, height / 2.0);
}

fn draw_bars(canvas: &HtmlCanvasElement, labels: &[String], series: &[BarSeries], empty: &str) {
    let Some(ctx) = context(canvas) else {
        return;
    };

    let width = canvas.width() as f64;
    let height = canvas.height() as f64;

    let margin_left = 40.0;
    let margin_right = 20.0;
    let margin_top = 20.0;
    let margin_bottom = 40.0;

    let chart_width = width - margin_left - margin_right;
    let chart_height = height - margin_top - margin_bottom;

    ctx.set_fill_style(&"#1f2937".into()); // gray-800
    ctx.fill_rect(0.0, 0.0, width, height);

    if labels.is_empty() {
        draw_empty(&ctx, width, height, empty);
        return;
    }

    let max = axis_max(series) as f64;

    // Grid and y labels
    ctx.set_stroke_style(&"#374151".into()); // gray-700
    ctx.set_line_width(1.0);
    ctx.set_font("12px sans-serif");
    for i in 0..=5 {
        let y = margin_top + (i as f64 / 5.0) * chart_height;
        ctx.begin_path();
        ctx.move_to(margin_left, y);
        ctx.line_to(width - margin_right, y);
        ctx.stroke();

        let value = max - (i as f64 / 5.0) * max;
        ctx.set_fill_style(&"#9ca3af".into()); // gray-400
        let _ = ctx.fill_text(&format!("{:.0}", value), 5.0, y + 4.0);
    }

    let group_width = chart_width / labels.len() as f64;
    let bar_width = (group_width * 0.8) / series.len().max(1) as f64;

    for (g, label) in labels.iter().enumerate() {
        let group_x = margin_left + g as f64 * group_width + group_width * 0.1;

        for (s, bars) in series.iter().enumerate() {
            let value = bars.values.get(g).copied().unwrap_or(0) as f64;
            let bar_height = value / max * chart_height;
            ctx.set_fill_style(&bars.color.into());
            ctx.fill_rect(
                group_x + s as f64 * bar_width,
                margin_top + chart_height - bar_height,
                bar_width - 2.0,
                bar_height,
            );
        }

        ctx.set_fill_style(&"#9ca3af".into());
        let _ = ctx.fill_text(label, group_x, height - 15.0);
    }
}

fn draw_pie(canvas: &HtmlCanvasElement, slices: &[Slice], empty: &str) {
    let Some(ctx) = context(canvas) else {
        return;
    };

    let width = canvas.width() as f64;
    let height = canvas.height() as f64;
    ctx.clear_rect(0.0, 0.0, width, height);

    let angles = slice_angles(slices);
    if angles.is_empty() {
        draw_empty(&ctx, width, height, empty);
        return;
    }

    let (cx, cy) = (width / 2.0, height / 2.0);
    let radius = width.min(height) / 2.0 - 10.0;

    for (slice, (start, sweep)) in slices.iter().zip(angles) {
        ctx.set_fill_style(&slice.color.as_str().into());
        ctx.begin_path();
        ctx.move_to(cx, cy);
        let _ = ctx.arc(cx, cy, radius, start, start + sweep);
        ctx.close_path();
        ctx.fill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(values: Vec<usize>) -> BarSeries {
        BarSeries {
            name: "present".to_string(),
            color: PRESENT_COLOR,
            values,
        }
    }

    #[test]
    fn test_axis_max() {
        assert_eq!(axis_max(&[]), 5);
        assert_eq!(axis_max(&[bars(vec![3, 11])]), 15);
        assert_eq!(axis_max(&[bars(vec![10])]), 10);
    }

    #[test]
    fn test_slice_angles_cover_circle() {
        let slices = vec![
            Slice { label: "a".into(), color: "#000".into(), value: 1 },
            Slice { label: "b".into(), color: "#fff".into(), value: 3 },
        ];
        let angles = slice_angles(&slices);
        let total: f64 = angles.iter().map(|(_, sweep)| sweep).sum();
        assert!((total - std::f64::consts::TAU).abs() < 1e-9);
        assert!((angles[1].1 - 3.0 * std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_slice_angles_empty() {
        assert!(slice_angles(&[]).is_empty());
    }
}
