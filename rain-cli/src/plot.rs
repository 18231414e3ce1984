//! ROC curve image output.

use std::{fmt::Display, path::Path};

use anyhow::{Context, anyhow};
use plotters::prelude::*;
use rain_core::metrics::RocPoint;

const IMAGE_SIZE: (u32, u32) = (640, 640);

fn drawn<T, E: Display>(result: Result<T, E>) -> anyhow::Result<T> {
    result.map_err(|e| anyhow!("Failed to draw ROC curve: {e}"))
}

/// Render `points` as a PNG over the unit square: a light grid, the chance
/// diagonal, then the curve itself. Nothing textual is drawn, so no system
/// fonts are required.
pub fn roc_curve_png(path: &Path, points: &[RocPoint]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let root = BitMapBackend::new(path, IMAGE_SIZE).into_drawing_area();
    drawn(root.fill(&WHITE))?;

    let unit = 0.0_f64..1.0_f64;
    let mut builder = ChartBuilder::on(&root);
    let mut chart = drawn(builder.margin(24).build_cartesian_2d(unit.clone(), unit))?;

    let mut line = |coords: Vec<(f64, f64)>, style: ShapeStyle| {
        drawn(chart.draw_series(LineSeries::new(coords, style))).map(|_| ())
    };

    let grid = ShapeStyle::from(BLACK.mix(0.1));
    for i in 1..10 {
        let v = f64::from(i) / 10.0;
        line(vec![(v, 0.0), (v, 1.0)], grid)?;
        line(vec![(0.0, v), (1.0, v)], grid)?;
    }

    let frame = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)];
    line(frame, BLACK.into())?;
    line(vec![(0.0, 0.0), (1.0, 1.0)], BLACK.mix(0.4).into())?;

    let curve = points.iter().map(|p| (p.fpr, p.tpr)).collect();
    line(curve, BLUE.stroke_width(3))?;

    drawn(root.present())?;
    tracing::debug!(path = %path.display(), points = points.len(), "Wrote ROC curve");
    Ok(())
}
