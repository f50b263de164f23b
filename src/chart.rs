//! ==============================================================================
//! chart.rs - multi-series trend chart
//! ==============================================================================
//!
//! purpose:
//!     plots temperature, humidity and gas from the history window as three
//!     overlaid polylines on one fixed-size surface.
//!
//! scaling:
//!     all three series share a single vertical scale. the range always spans
//!     at least [0, 1], so raw values of very different magnitude stay
//!     directly comparable and a flat series never collapses the range.
//!
//!     ┌──────────────────────────────── width ─┐
//!     │ caption                                │
//!     │    ┌─────────── plot area ─────────┐   │
//!     │    │ max ─ y = margin              │   │
//!     │    │                               │   │
//!     │    │ min ─ y = margin + plot_h     │   │
//!     │    └───────────────────────────────┘   │
//!     └────────────────────────────────────────┘
//!
//! relationships:
//!     - used by: dashboard.rs (redraws on every successful history fetch)
//!     - reads: config.rs (ChartConfig geometry)
//!
//! ==============================================================================

use crate::config::ChartConfig;
use crate::domain::Reading;
use serde::Serialize;
use std::fmt::Write as _;

/// caption drawn once per frame
pub const CAPTION: &str = "Temp / Hum / Gas (raw)";
const CAPTION_POS: (f64, f64) = (10.0, 14.0);
const CAPTION_FONT: &str = "12px sans-serif";
const CAPTION_COLOR: &str = "#333";

// ==============================================================================
// drawing surface
// ==============================================================================

/// the 2d primitives the chart needs from a drawing surface
pub trait Canvas {
    fn width(&self) -> f64;
    fn height(&self) -> f64;
    /// wipe the whole surface
    fn clear(&mut self);
    fn stroke_polyline(&mut self, points: &[(f64, f64)], color: &str, width: f32);
    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: &str, font: &str);
}

/// canvas that renders to an svg document
pub struct SvgCanvas {
    width: f64,
    height: f64,
    elements: Vec<String>,
}

impl SvgCanvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height, elements: Vec::new() }
    }

    pub fn to_svg(&self) -> String {
        let mut out = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        );
        for el in &self.elements {
            out.push_str(el);
        }
        out.push_str("</svg>");
        out
    }
}

impl Canvas for SvgCanvas {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn clear(&mut self) {
        self.elements.clear();
    }

    fn stroke_polyline(&mut self, points: &[(f64, f64)], color: &str, width: f32) {
        if points.is_empty() {
            return;
        }
        let mut coords = String::new();
        for (i, (x, y)) in points.iter().enumerate() {
            if i > 0 {
                coords.push(' ');
            }
            let _ = write!(coords, "{:.2},{:.2}", x, y);
        }
        self.elements.push(format!(
            r#"<polyline fill="none" stroke="{}" stroke-width="{}" stroke-linejoin="round" points="{}"/>"#,
            color, width, coords
        ));
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: &str, font: &str) {
        self.elements.push(format!(
            r#"<text x="{}" y="{}" fill="{}" style="font: {}">{}</text>"#,
            x,
            y,
            color,
            font,
            xml_escape(text)
        ));
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ==============================================================================
// series and scale
// ==============================================================================

#[derive(Clone, Copy, Debug)]
pub struct SeriesStyle {
    pub label: &'static str,
    pub color: &'static str,
    pub width: f32,
}

pub const TEMPERATURE_STYLE: SeriesStyle = SeriesStyle { label: "Temperature", color: "#d9480f", width: 2.0 };
pub const HUMIDITY_STYLE: SeriesStyle = SeriesStyle { label: "Humidity", color: "#1c7ed6", width: 2.0 };
pub const GAS_STYLE: SeriesStyle = SeriesStyle { label: "Gas", color: "#2b8a3e", width: 2.0 };

/// one metric's values across the history window
#[derive(Clone, Debug)]
pub struct Series {
    pub style: SeriesStyle,
    pub values: Vec<f64>,
}

/// split the last `window` readings into the three plotted series
pub fn extract_series(history: &[Reading], window: usize) -> [Series; 3] {
    let start = history.len().saturating_sub(window);
    let recent = &history[start..];
    [
        Series { style: TEMPERATURE_STYLE, values: recent.iter().map(|r| r.temperature).collect() },
        Series { style: HUMIDITY_STYLE, values: recent.iter().map(|r| r.humidity).collect() },
        Series { style: GAS_STYLE, values: recent.iter().map(|r| r.gas).collect() },
    ]
}

/// shared mapping from (index, value) to surface coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChartScale {
    pub min: f64,
    pub max: f64,
    margin: f64,
    plot_w: f64,
    plot_h: f64,
}

impl ChartScale {
    /// fit one range over every series, never narrower than [0, 1]
    pub fn fit(series: &[Series], width: f64, height: f64, margin: f64) -> Self {
        let values = series.iter().flat_map(|s| s.values.iter().copied());
        let (min, max) = values.fold((0.0_f64, 1.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Self {
            min,
            max,
            margin,
            plot_w: (width - margin * 2.0).max(0.0),
            plot_h: (height - margin * 2.0).max(0.0),
        }
    }

    /// horizontal position of sample `i` out of `n`
    pub fn x(&self, i: usize, n: usize) -> f64 {
        let denom = n.saturating_sub(1).max(1) as f64;
        self.margin + (i as f64 / denom) * self.plot_w
    }

    /// vertical position; larger values sit higher on screen
    pub fn y(&self, value: f64) -> f64 {
        let range = self.max - self.min;
        let range = if range == 0.0 { 1.0 } else { range };
        self.margin + (1.0 - (value - self.min) / range) * self.plot_h
    }

    pub fn points(&self, values: &[f64]) -> Vec<(f64, f64)> {
        let n = values.len();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (self.x(i, n), self.y(*v)))
            .collect()
    }
}

// ==============================================================================
// rendering
// ==============================================================================

/// the last rendered chart, kept in dashboard state for the view
#[derive(Clone, Debug, Serialize)]
pub struct ChartFrame {
    pub svg: String,
    /// number of samples per series in this frame
    pub samples: usize,
}

/// full redraw of the chart from a history slice
pub fn draw_chart<C: Canvas>(canvas: &mut C, history: &[Reading], config: &ChartConfig) -> usize {
    let series = extract_series(history, config.window);
    let scale = ChartScale::fit(&series, canvas.width(), canvas.height(), config.margin);

    canvas.clear();
    for s in &series {
        if s.values.is_empty() {
            continue;
        }
        let points = scale.points(&s.values);
        canvas.stroke_polyline(&points, s.style.color, s.style.width);
    }
    canvas.fill_text(CAPTION, CAPTION_POS.0, CAPTION_POS.1, CAPTION_COLOR, CAPTION_FONT);

    series[0].values.len()
}

/// draw onto a fresh svg surface sized from config
pub fn render_svg(history: &[Reading], config: &ChartConfig) -> ChartFrame {
    let mut canvas = SvgCanvas::new(config.width as f64, config.height as f64);
    let samples = draw_chart(&mut canvas, history, config);
    ChartFrame { svg: canvas.to_svg(), samples }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Op {
        Clear,
        Line(Vec<(f64, f64)>, String),
        Text(String),
    }

    struct RecordingCanvas {
        w: f64,
        h: f64,
        ops: Vec<Op>,
    }

    impl RecordingCanvas {
        fn new() -> Self {
            Self { w: 800.0, h: 300.0, ops: Vec::new() }
        }

        fn lines(&self) -> Vec<&Vec<(f64, f64)>> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Line(p, _) => Some(p),
                    _ => None,
                })
                .collect()
        }
    }

    impl Canvas for RecordingCanvas {
        fn width(&self) -> f64 {
            self.w
        }
        fn height(&self) -> f64 {
            self.h
        }
        fn clear(&mut self) {
            self.ops.push(Op::Clear);
        }
        fn stroke_polyline(&mut self, points: &[(f64, f64)], color: &str, _width: f32) {
            self.ops.push(Op::Line(points.to_vec(), color.to_string()));
        }
        fn fill_text(&mut self, text: &str, _x: f64, _y: f64, _color: &str, _font: &str) {
            self.ops.push(Op::Text(text.to_string()));
        }
    }

    fn reading(t: f64, h: f64, g: f64) -> Reading {
        Reading { temperature: t, humidity: h, gas: g, timestamp: None, prediction: None }
    }

    fn all_finite(points: &[(f64, f64)]) -> bool {
        points.iter().all(|(x, y)| x.is_finite() && y.is_finite())
    }

    #[test]
    fn empty_history_clears_and_captions_only() {
        let mut canvas = RecordingCanvas::new();
        let n = draw_chart(&mut canvas, &[], &ChartConfig::default());
        assert_eq!(n, 0);
        assert_eq!(canvas.ops, vec![Op::Clear, Op::Text(CAPTION.to_string())]);
    }

    #[test]
    fn single_sample_sits_at_left_margin() {
        let mut canvas = RecordingCanvas::new();
        draw_chart(&mut canvas, &[reading(20.0, 50.0, 300.0)], &ChartConfig::default());
        let lines = canvas.lines();
        assert_eq!(lines.len(), 3);
        for line in lines {
            assert_eq!(line.len(), 1);
            assert_eq!(line[0].0, 40.0);
            assert!(all_finite(line));
        }
    }

    #[test]
    fn identical_readings_draw_three_flat_overlapping_lines() {
        let history = vec![reading(5.0, 5.0, 5.0); 3];
        let mut canvas = RecordingCanvas::new();
        draw_chart(&mut canvas, &history, &ChartConfig::default());
        let lines = canvas.lines();
        assert_eq!(lines.len(), 3);
        let y = lines[0][0].1;
        for line in &lines {
            assert!(line.iter().all(|(_, py)| *py == y));
            assert_eq!(*line, lines[0]);
        }
        // 5 is the top of the [0, 5] range
        assert_eq!(y, 40.0);
    }

    #[test]
    fn keeps_only_last_window_of_samples() {
        let history: Vec<_> = (0..80).map(|i| reading(i as f64, 0.0, 0.0)).collect();
        let mut canvas = RecordingCanvas::new();
        let n = draw_chart(&mut canvas, &history, &ChartConfig::default());
        assert_eq!(n, 50);
        let series = extract_series(&history, 50);
        assert_eq!(series[0].values.first(), Some(&30.0));
        assert_eq!(series[0].values.last(), Some(&79.0));
        let lines = canvas.lines();
        assert_eq!(lines[0].len(), 50);
        assert_eq!(lines[0].first().unwrap().0, 40.0);
        assert_eq!(lines[0].last().unwrap().0, 760.0);
        assert!(lines.iter().all(|l| all_finite(l)));
    }

    #[test]
    fn scale_shares_range_and_inverts_y() {
        let series = extract_series(&[reading(20.0, 60.0, 400.0), reading(-5.0, 10.0, 100.0)], 50);
        let scale = ChartScale::fit(&series, 800.0, 300.0, 40.0);
        assert_eq!(scale.min, -5.0);
        assert_eq!(scale.max, 400.0);
        assert_eq!(scale.y(400.0), 40.0);
        assert_eq!(scale.y(-5.0), 260.0);
        assert!(scale.y(100.0) > scale.y(400.0));
    }

    #[test]
    fn range_floor_applies_to_small_values() {
        let series = extract_series(&[reading(0.5, 0.5, 0.5)], 50);
        let scale = ChartScale::fit(&series, 800.0, 300.0, 40.0);
        assert_eq!((scale.min, scale.max), (0.0, 1.0));
        assert_eq!(scale.y(0.5), 150.0);
    }

    #[test]
    fn svg_frame_contains_series_and_caption() {
        let frame = render_svg(&[reading(1.0, 2.0, 3.0), reading(2.0, 3.0, 4.0)], &ChartConfig::default());
        assert_eq!(frame.samples, 2);
        assert!(frame.svg.starts_with("<svg"));
        assert_eq!(frame.svg.matches("<polyline").count(), 3);
        assert!(frame.svg.contains(CAPTION));
        assert!(frame.svg.contains(TEMPERATURE_STYLE.color));
    }

    #[test]
    fn svg_clear_discards_previous_frame() {
        let mut canvas = SvgCanvas::new(100.0, 100.0);
        canvas.stroke_polyline(&[(0.0, 0.0), (1.0, 1.0)], "#000", 1.0);
        canvas.clear();
        canvas.fill_text("a < b", 0.0, 0.0, "#000", CAPTION_FONT);
        let svg = canvas.to_svg();
        assert!(!svg.contains("polyline"));
        assert!(svg.contains("a &lt; b"));
    }
}
