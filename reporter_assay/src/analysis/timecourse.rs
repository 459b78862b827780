use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use plotters::prelude::{
    BitMapBackend, ChartBuilder, Circle, Color, IntoDrawingArea, LineSeries, Palette, Palette99,
    PathElement, SeriesLabelPosition, BLACK, WHITE,
};
use polars::prelude::{DataFrame, DataType};
use tracing::{debug, info};

use crate::config::AssayConfig;
use crate::errors::{AssayError, AssayResult};
use crate::helper_functions::safe_file_name;

/// Which report columns end up on the y axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DisplayMode {
    /// Fold change to the control sample.
    Fold,
    /// Blank-subtracted luminescence.
    Reads,
}

impl DisplayMode {
    fn column(self, config: &AssayConfig, condition: &str) -> String {
        match self {
            DisplayMode::Fold => config.fold_col(condition),
            DisplayMode::Reads => config.minus_blank_col(condition),
        }
    }

    fn y_desc(self, config: &AssayConfig) -> String {
        match self {
            DisplayMode::Fold => format!("Fold change to {}", config.control_sample),
            DisplayMode::Reads => "Luminescence minus blank".to_string(),
        }
    }
}

/// One line: x = hours, y = value (missing when `None` or not finite).
pub type Line = Vec<(f64, Option<f64>)>;

/// All lines of one sample, one per configured condition.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSeries {
    pub sample: String,
    pub lines: Vec<(String, Line)>,
}

/// Pull the plotted columns out of a wide report, grouped by sample (sorted)
/// and by time within each sample.
pub fn collect_series(
    report: &DataFrame,
    mode: DisplayMode,
    config: &AssayConfig,
) -> AssayResult<Vec<SampleSeries>> {
    let times = report.column("time_h")?.cast(&DataType::Float64)?;
    let times = times.f64()?;
    let samples = report.column("sample")?.cast(&DataType::String)?;
    let samples = samples.str()?;

    let mut values = Vec::with_capacity(config.conditions.len());
    for cond in &config.conditions {
        values.push(report.column(&mode.column(config, cond))?.cast(&DataType::Float64)?);
    }

    let mut by_sample: BTreeMap<String, Vec<(String, Line)>> = BTreeMap::new();
    for i in 0..report.height() {
        let (Some(sample), Some(t)) = (samples.get(i), times.get(i)) else {
            continue;
        };
        let lines = by_sample.entry(sample.to_string()).or_insert_with(|| {
            config
                .conditions
                .iter()
                .map(|c| (c.clone(), Vec::new()))
                .collect()
        });
        for ((_, line), column) in lines.iter_mut().zip(&values) {
            line.push((t, column.f64()?.get(i)));
        }
    }

    Ok(by_sample
        .into_iter()
        .map(|(sample, mut lines)| {
            for (_, line) in &mut lines {
                line.sort_by(|a, b| a.0.total_cmp(&b.0));
            }
            SampleSeries { sample, lines }
        })
        .collect())
}

/// Samples named in `display_order` first (in that order), the rest after them.
pub fn order_samples(series: Vec<SampleSeries>, display_order: &[String]) -> Vec<SampleSeries> {
    let mut remaining: BTreeMap<String, SampleSeries> =
        series.into_iter().map(|s| (s.sample.clone(), s)).collect();
    let mut ordered: Vec<SampleSeries> = display_order
        .iter()
        .filter_map(|name| remaining.remove(name))
        .collect();
    ordered.extend(remaining.into_values());
    ordered
}

/// Split a line at missing or non-finite points so gaps are not bridged.
pub fn segments(line: &Line) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for &(x, y) in line {
        match y.filter(|v| v.is_finite()) {
            Some(y) => current.push((x, y)),
            None if !current.is_empty() => out.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// One chart per sample plus one overview per condition. Returns the written files.
pub fn make_timecourse_plots(
    report: &DataFrame,
    out_dir: &Path,
    mode: DisplayMode,
    display_order: &[String],
    config: &AssayConfig,
) -> AssayResult<Vec<PathBuf>> {
    create_dir_all(out_dir)?;
    let series = order_samples(collect_series(report, mode, config)?, display_order);
    let y_desc = mode.y_desc(config);
    let mut written = Vec::new();

    for s in &series {
        let path = out_dir.join(format!("{}_timecourse.png", safe_file_name(&s.sample)));
        draw_timecourse(&path, &s.sample, &y_desc, &s.lines)?;
        written.push(path);
    }

    for (idx, cond) in config.conditions.iter().enumerate() {
        let lines: Vec<(String, Line)> = series
            .iter()
            .map(|s| (s.sample.clone(), s.lines[idx].1.clone()))
            .collect();
        let path = out_dir.join(format!("overview_{}.png", safe_file_name(cond)));
        draw_timecourse(&path, cond, &y_desc, &lines)?;
        written.push(path);
    }

    info!("Wrote {} charts to {}", written.len(), out_dir.display());
    Ok(written)
}

fn plot_err(path: &Path, e: impl Display) -> AssayError {
    AssayError::Plot {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

fn axis_ranges(lines: &[(String, Line)]) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let xs = lines.iter().flat_map(|(_, l)| l.iter().map(|p| p.0));
    let (x_min, x_max) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
        (lo.min(x), hi.max(x))
    });
    let ys = lines
        .iter()
        .flat_map(|(_, l)| l.iter().filter_map(|p| p.1))
        .filter(|y| y.is_finite());
    let (y_min, y_max) = ys.fold((0.0_f64, f64::NEG_INFINITY), |(lo, hi), y| {
        (lo.min(y), hi.max(y))
    });

    let x_range = if !x_min.is_finite() {
        0.0..1.0
    } else if x_min == x_max {
        (x_min - 1.0)..(x_max + 1.0)
    } else {
        x_min..x_max
    };
    let y_range = if !y_max.is_finite() || y_max <= y_min {
        y_min..(y_min + 1.0)
    } else {
        y_min..(y_max + 0.1 * (y_max - y_min))
    };
    (x_range, y_range)
}

fn draw_timecourse(
    path: &Path,
    caption: &str,
    y_desc: &str,
    lines: &[(String, Line)],
) -> AssayResult<()> {
    debug!("Drawing {}", path.display());
    let (x_range, y_range) = axis_ranges(lines);

    let root = BitMapBackend::new(path, (900, 650)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| plot_err(path, e))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 26))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range)
        .map_err(|e| plot_err(path, e))?;

    chart
        .configure_mesh()
        .x_desc("Hours post transfection")
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 20))
        .draw()
        .map_err(|e| plot_err(path, e))?;

    for (idx, (name, line)) in lines.iter().enumerate() {
        let colour = Palette99::pick(idx).to_rgba();
        let parts = segments(line);

        for part in &parts {
            chart
                .draw_series(LineSeries::new(part.iter().copied(), colour.stroke_width(3)))
                .map_err(|e| plot_err(path, e))?;
        }
        chart
            .draw_series(
                parts
                    .iter()
                    .flatten()
                    .map(|&p| Circle::new(p, 4, colour.filled())),
            )
            .map_err(|e| plot_err(path, e))?
            .label(name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 25, y)], colour.stroke_width(3)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperLeft)
        .draw()
        .map_err(|e| plot_err(path, e))?;

    root.present().map_err(|e| plot_err(path, e))?;
    Ok(())
}
