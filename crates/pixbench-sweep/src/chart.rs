//! SVG line charts of sweep and saturation results.
//!
//! Documents are built with the [`svg`] crate; rendering is pure and
//! returns a `String`. [`write_charts`] and [`write_saturation_chart`] do
//! the file I/O.

use std::path::{Path, PathBuf};

use pixbench_pool::Strategy;
use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Element, Line, Path as SvgPath, Rectangle, Title};
use svg::node::{Node, Text};

use crate::error::StoreError;
use crate::record::AggregatedStat;
use crate::saturation::SaturationOutcome;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 500.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 160.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 60.0;
const TICKS: usize = 5;

const PALETTE: [&str; 8] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
];

/// One named line.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Legend entry.
    pub label: String,
    /// Points in data coordinates, drawn in order.
    pub points: Vec<(f64, f64)>,
}

impl Series {
    /// A series from a label and points.
    #[must_use]
    pub fn new(label: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Self {
            label: label.into(),
            points,
        }
    }
}

/// A titled chart with one line per series and an optional dashed
/// reference line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    /// Heading drawn above the plot area.
    pub title: String,
    /// X axis caption.
    pub x_label: String,
    /// Y axis caption.
    pub y_label: String,
    /// Measured lines.
    pub series: Vec<Series>,
    /// Ideal line drawn dashed in gray.
    pub reference: Option<Series>,
}

#[derive(Debug, Clone, Copy)]
struct Range {
    min: f64,
    max: f64,
}

impl Range {
    fn span(self) -> f64 {
        self.max - self.min
    }
}

impl LineChart {
    /// A chart with no lines yet.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            series: Vec::new(),
            reference: None,
        }
    }

    fn all_points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.series
            .iter()
            .chain(&self.reference)
            .flat_map(|s| s.points.iter().copied())
            .filter(|(x, y)| x.is_finite() && y.is_finite())
    }

    fn ranges(&self) -> (Range, Range) {
        let mut x = Range {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        };
        let mut y_max = 0.0_f64;
        for (px, py) in self.all_points() {
            x.min = x.min.min(px);
            x.max = x.max.max(px);
            y_max = y_max.max(py);
        }
        if !x.min.is_finite() {
            x = Range { min: 0.0, max: 1.0 };
        } else if x.span() <= 0.0 {
            x = Range {
                min: x.min - 0.5,
                max: x.max + 0.5,
            };
        }
        let y = Range {
            min: 0.0,
            max: if y_max > 0.0 { y_max * 1.1 } else { 1.0 },
        };
        (x, y)
    }

    /// Render to an SVG document string.
    #[must_use]
    pub fn to_svg(&self) -> String {
        let (xr, yr) = self.ranges();
        let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let sx = |x: f64| MARGIN_LEFT + (x - xr.min) / xr.span() * plot_w;
        let sy = |y: f64| MARGIN_TOP + plot_h - (y - yr.min) / yr.span() * plot_h;

        let mut doc = Document::new()
            .set("width", WIDTH)
            .set("height", HEIGHT)
            .set("viewBox", format!("0 0 {WIDTH} {HEIGHT}"))
            .add(Title::new(self.title.as_str()))
            .add(
                Rectangle::new()
                    .set("width", WIDTH)
                    .set("height", HEIGHT)
                    .set("fill", "white"),
            )
            .add(text(WIDTH / 2.0, MARGIN_TOP / 2.0 + 6.0, "middle", 16, &self.title));

        doc = doc
            .add(axis_line(MARGIN_LEFT, sy(yr.min), MARGIN_LEFT + plot_w, sy(yr.min)))
            .add(axis_line(MARGIN_LEFT, MARGIN_TOP, MARGIN_LEFT, sy(yr.min)));

        for i in 0..=TICKS {
            #[allow(clippy::cast_precision_loss)]
            let fraction = i as f64 / TICKS as f64;
            let xv = xr.min + fraction * xr.span();
            let yv = yr.min + fraction * yr.span();
            doc = doc
                .add(text(sx(xv), sy(yr.min) + 18.0, "middle", 11, &tick_label(xv)))
                .add(text(MARGIN_LEFT - 8.0, sy(yv) + 4.0, "end", 11, &tick_label(yv)));
        }

        doc = doc
            .add(text(
                MARGIN_LEFT + plot_w / 2.0,
                HEIGHT - 15.0,
                "middle",
                13,
                &self.x_label,
            ))
            .add({
                let mut caption = text(18.0, MARGIN_TOP + plot_h / 2.0, "middle", 13, &self.y_label);
                caption.assign(
                    "transform",
                    format!("rotate(-90 18 {})", MARGIN_TOP + plot_h / 2.0),
                );
                caption
            });

        if let Some(reference) = &self.reference
            && let Some(path) = polyline(reference, sx, sy, "#999999")
        {
            doc = doc.add(path.set("stroke-dasharray", "6 4"));
        }

        let legend_x = WIDTH - MARGIN_RIGHT + 15.0;
        for (i, series) in self.series.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            if let Some(path) = polyline(series, sx, sy, color) {
                doc = doc.add(path);
            }
            #[allow(clippy::cast_precision_loss)]
            let ly = MARGIN_TOP + 10.0 + i as f64 * 20.0;
            doc = doc
                .add(
                    Line::new()
                        .set("x1", legend_x)
                        .set("y1", ly)
                        .set("x2", legend_x + 20.0)
                        .set("y2", ly)
                        .set("stroke", color)
                        .set("stroke-width", 2),
                )
                .add(text(legend_x + 26.0, ly + 4.0, "start", 12, &series.label));
        }

        doc.to_string()
    }
}

fn text(x: f64, y: f64, anchor: &str, size: u32, content: &str) -> Element {
    let mut el = Element::new("text");
    el.assign("x", x);
    el.assign("y", y);
    el.assign("text-anchor", anchor);
    el.assign("font-size", size);
    el.assign("font-family", "sans-serif");
    el.append(Text::new(content));
    el
}

fn axis_line(x1: f64, y1: f64, x2: f64, y2: f64) -> Line {
    Line::new()
        .set("x1", x1)
        .set("y1", y1)
        .set("x2", x2)
        .set("y2", y2)
        .set("stroke", "black")
}

fn polyline(
    series: &Series,
    sx: impl Fn(f64) -> f64,
    sy: impl Fn(f64) -> f64,
    color: &str,
) -> Option<SvgPath> {
    let mut points = series
        .points
        .iter()
        .filter(|(x, y)| x.is_finite() && y.is_finite());
    let &(x0, y0) = points.next()?;
    let mut data = Data::new().move_to((sx(x0), sy(y0)));
    for &(x, y) in points {
        data = data.line_to((sx(x), sy(y)));
    }
    Some(
        SvgPath::new()
            .set("d", data)
            .set("fill", "none")
            .set("stroke", color)
            .set("stroke-width", 2),
    )
}

fn tick_label(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn worker_series(
    stats: &[AggregatedStat],
    image_count: usize,
    strategies: &[Strategy],
    value: impl Fn(&AggregatedStat) -> Option<f64>,
) -> Vec<Series> {
    strategies
        .iter()
        .map(|&strategy| {
            #[allow(clippy::cast_precision_loss)]
            let points = stats
                .iter()
                .filter(|s| s.image_count == image_count && s.strategy == strategy)
                .filter_map(|s| value(s).map(|v| (s.worker_count as f64, v)))
                .collect();
            Series::new(strategy.label(), points)
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn worker_axis(stats: &[AggregatedStat], image_count: usize) -> Vec<f64> {
    let mut workers: Vec<usize> = stats
        .iter()
        .filter(|s| s.image_count == image_count)
        .map(|s| s.worker_count)
        .collect();
    workers.sort_unstable();
    workers.dedup();
    workers.into_iter().map(|w| w as f64).collect()
}

/// Mean time against worker count, one line per strategy.
#[must_use]
pub fn time_chart(stats: &[AggregatedStat], image_count: usize, strategies: &[Strategy]) -> LineChart {
    let mut chart = LineChart::new(
        format!("Execution time ({image_count} images)"),
        "Workers",
        "Time (s)",
    );
    chart.series = worker_series(stats, image_count, strategies, |s| Some(s.mean_duration));
    chart
}

/// Speedup against worker count with the ideal linear speedup dashed.
#[must_use]
pub fn speedup_chart(
    stats: &[AggregatedStat],
    image_count: usize,
    strategies: &[Strategy],
) -> LineChart {
    let mut chart = LineChart::new(format!("Speedup ({image_count} images)"), "Workers", "Speedup");
    chart.series = worker_series(stats, image_count, strategies, |s| s.speedup);
    let ideal = worker_axis(stats, image_count)
        .into_iter()
        .map(|w| (w, w))
        .collect();
    chart.reference = Some(Series::new("Ideal", ideal));
    chart
}

/// Efficiency in percent against worker count with 100 % dashed.
#[must_use]
pub fn efficiency_chart(
    stats: &[AggregatedStat],
    image_count: usize,
    strategies: &[Strategy],
) -> LineChart {
    let mut chart = LineChart::new(
        format!("Efficiency ({image_count} images)"),
        "Workers",
        "Efficiency (%)",
    );
    chart.series = worker_series(stats, image_count, strategies, |s| {
        s.efficiency.map(|e| e * 100.0)
    });
    let full = worker_axis(stats, image_count)
        .into_iter()
        .map(|w| (w, 100.0))
        .collect();
    chart.reference = Some(Series::new("100%", full));
    chart
}

/// Mean time against image count, one line per strategy and worker count.
#[must_use]
pub fn scalability_chart(stats: &[AggregatedStat], strategies: &[Strategy]) -> LineChart {
    let mut workers: Vec<usize> = stats.iter().map(|s| s.worker_count).collect();
    workers.sort_unstable();
    workers.dedup();

    let mut chart = LineChart::new("Scalability", "Images", "Time (s)");
    for &strategy in strategies {
        for &w in &workers {
            #[allow(clippy::cast_precision_loss)]
            let points: Vec<_> = stats
                .iter()
                .filter(|s| s.strategy == strategy && s.worker_count == w)
                .map(|s| (s.image_count as f64, s.mean_duration))
                .collect();
            if !points.is_empty() {
                chart
                    .series
                    .push(Series::new(format!("{} w={w}", strategy.label()), points));
            }
        }
    }
    chart
}

/// Best speedup per strategy against dataset size.
#[must_use]
pub fn saturation_chart(outcome: &SaturationOutcome, strategies: &[Strategy]) -> LineChart {
    let mut chart = LineChart::new(
        format!("Speedup vs dataset size ({} workers)", outcome.worker_count),
        "Images",
        "Speedup",
    );
    chart.series = strategies
        .iter()
        .map(|&strategy| {
            #[allow(clippy::cast_precision_loss)]
            let points = outcome
                .steps
                .iter()
                .filter_map(|step| {
                    step.stats
                        .iter()
                        .find(|s| s.strategy == strategy)
                        .and_then(|s| s.speedup)
                        .map(|v| (step.image_count as f64, v))
                })
                .collect();
            Series::new(strategy.label(), points)
        })
        .collect();
    chart
}

fn save(dir: &Path, name: &str, chart: &LineChart) -> Result<PathBuf, StoreError> {
    let path = dir.join(name);
    std::fs::write(&path, chart.to_svg()).map_err(|source| StoreError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Write time, speedup and efficiency charts for every image count, plus
/// a scalability chart when more than one image count was measured.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if a file cannot be written.
pub fn write_charts(
    dir: &Path,
    stats: &[AggregatedStat],
    image_counts: &[usize],
    strategies: &[Strategy],
) -> Result<Vec<PathBuf>, StoreError> {
    let mut written = Vec::new();
    for &n in image_counts {
        written.push(save(dir, &format!("time_{n}.svg"), &time_chart(stats, n, strategies))?);
        written.push(save(
            dir,
            &format!("speedup_{n}.svg"),
            &speedup_chart(stats, n, strategies),
        )?);
        written.push(save(
            dir,
            &format!("efficiency_{n}.svg"),
            &efficiency_chart(stats, n, strategies),
        )?);
    }
    if image_counts.len() > 1 {
        written.push(save(dir, "scalability.svg", &scalability_chart(stats, strategies))?);
    }
    tracing::debug!(charts = written.len(), dir = %dir.display(), "charts written");
    Ok(written)
}

/// Write the saturation chart.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if the file cannot be written.
pub fn write_saturation_chart(
    dir: &Path,
    outcome: &SaturationOutcome,
    strategies: &[Strategy],
) -> Result<PathBuf, StoreError> {
    save(dir, "saturation.svg", &saturation_chart(outcome, strategies))
}
