//! SVG line charts from extracted burst CSVs.
//!
//! The x column is plotted against each requested y column on a shared axis
//! whose ceiling is derived from the configured bottleneck bandwidth.

use plotters::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default x axis column
pub const DEFAULT_X_COLUMN: &str = "time(s)";

/// Default y axis columns
pub const DEFAULT_Y_COLUMNS: &[&str] = &["qdelay", "txed(kbps)", "topo(kbps)"];

/// Chart size in pixels
const CHART_SIZE: (u32, u32) = (1600, 800);

/// Series colors, in series order
const SERIES_COLORS: [RGBColor; 6] = [
    RGBColor(0x00, 0x64, 0x00),
    RGBColor(0x00, 0x22, 0xAA),
    RGBColor(0xFF, 0x11, 0x11),
    RGBColor(0xDC, 0x14, 0x3C),
    RGBColor(0x64, 0x95, 0xED),
    RGBColor(0xD2, 0x69, 0x1E),
];

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while rendering a chart
#[derive(Debug, Error)]
pub enum ChartError {
    /// CSV could not be opened or decoded
    #[error("Failed to read {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A requested column is not in the CSV header
    #[error("Column '{column}' not found in {}", .path.display())]
    MissingColumn { column: String, path: PathBuf },

    /// Nothing to plot
    #[error("No y columns requested")]
    NoSeries,

    /// Drawing backend failure
    #[error("Failed to render chart: {0}")]
    Render(String),
}

// ============================================================================
// Requests and Series
// ============================================================================

/// What to plot and where
#[derive(Clone, Debug)]
pub struct ChartRequest {
    pub csv: PathBuf,
    pub output: PathBuf,
    pub title: String,
    pub x_column: String,
    pub y_columns: Vec<String>,
    /// Bottleneck bandwidth, used for the y range
    pub kbps: u32,
}

impl ChartRequest {
    /// Request with the default columns
    pub fn new(csv: impl Into<PathBuf>, output: impl Into<PathBuf>, title: &str, kbps: u32) -> Self {
        Self {
            csv: csv.into(),
            output: output.into(),
            title: title.to_string(),
            x_column: DEFAULT_X_COLUMN.to_string(),
            y_columns: DEFAULT_Y_COLUMNS.iter().map(|c| c.to_string()).collect(),
            kbps,
        }
    }
}

/// One named line series
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

/// Upper bound of the y axis for a bottleneck bandwidth
pub fn y_axis_ceiling(kbps: u32) -> f64 {
    let kbps = f64::from(kbps);
    if kbps >= 2000.0 {
        2400.0
    } else if kbps >= 1000.0 {
        kbps * 1.5
    } else {
        kbps * 2.0
    }
}

/// Load the x column against each y column.
///
/// Rows where either cell is empty or not numeric are skipped for that series.
pub fn load_series(path: &Path, x_column: &str, y_columns: &[String]) -> Result<Vec<Series>, ChartError> {
    let csv_error = |source| ChartError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
    let headers = reader.headers().map_err(csv_error)?.clone();

    let column_index = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| ChartError::MissingColumn {
                column: name.to_string(),
                path: path.to_path_buf(),
            })
    };

    let x_index = column_index(x_column)?;
    let y_indices = y_columns
        .iter()
        .map(|name| column_index(name.as_str()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut series: Vec<Series> = y_columns
        .iter()
        .map(|name| Series {
            name: name.clone(),
            points: Vec::new(),
        })
        .collect();

    for row in reader.records() {
        let row = row.map_err(csv_error)?;
        let cell = |i: usize| row.get(i).and_then(|v| v.trim().parse::<f64>().ok());

        let Some(x) = cell(x_index) else {
            continue;
        };
        for (s, &yi) in series.iter_mut().zip(&y_indices) {
            if let Some(y) = cell(yi) {
                s.points.push((x, y));
            }
        }
    }

    Ok(series)
}

/// Render the chart described by `request` as SVG.
///
/// Returns the total number of plotted points.
pub fn render_chart(request: &ChartRequest) -> Result<usize, ChartError> {
    if request.y_columns.is_empty() {
        return Err(ChartError::NoSeries);
    }

    let series = load_series(&request.csv, &request.x_column, &request.y_columns)?;
    let (x_min, x_max) = x_range(&series);
    let y_max = y_axis_ceiling(request.kbps);

    let root = SVGBackend::new(&request.output, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&request.title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, 0.0..y_max)
        .map_err(render_error)?;

    chart
        .configure_mesh()
        .x_desc(request.x_column.as_str())
        .draw()
        .map_err(render_error)?;

    for (i, s) in series.iter().enumerate() {
        let color = SERIES_COLORS[i % SERIES_COLORS.len()];
        chart
            .draw_series(LineSeries::new(s.points.iter().copied(), &color))
            .map_err(render_error)?
            .label(s.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(render_error)?;

    root.present().map_err(render_error)?;

    let points = series.iter().map(|s| s.points.len()).sum();
    tracing::info!(
        "Rendered {} ({} series, {} points)",
        request.output.display(),
        series.len(),
        points
    );
    Ok(points)
}

fn render_error<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Render(e.to_string())
}

/// X extent over all series, widened when empty or degenerate
fn x_range(series: &[Series]) -> (f64, f64) {
    let (min, max) = series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.0))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)));

    if !min.is_finite() || !max.is_finite() {
        (0.0, 1.0)
    } else if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    }
}
