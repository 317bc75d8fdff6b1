//! Loss curve chart

use std::path::Path;

use plotters::prelude::*;

use crate::error::{Result, WganError};
use crate::training::LossHistory;

const CHART_SIZE: (u32, u32) = (800, 500);

fn plot_err<E: std::fmt::Display>(e: E) -> WganError {
    WganError::Plot(e.to_string())
}

/// Draw critic and generator loss against epoch as an SVG file
///
/// Non-finite values are left out of the series. An empty history still
/// produces an (empty) chart.
pub fn plot_losses<P: AsRef<Path>>(history: &LossHistory, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let critic = finite_points(&history.critic_losses);
    let generator = finite_points(&history.gen_losses);

    let (y_min, y_max) = value_range(critic.iter().chain(generator.iter()).map(|&(_, y)| y));
    let x_max = history.num_epochs().max(2) as f64;

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("WGAN-GP training loss", ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(1.0..x_max, y_min..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Epoch")
        .y_desc("Loss")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(critic, &RED))
        .map_err(plot_err)?
        .label("D loss")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    chart
        .draw_series(LineSeries::new(generator, &BLUE))
        .map_err(plot_err)?
        .label("G loss")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// (epoch, value) pairs with 1-based epochs, skipping NaN and infinities
fn finite_points(values: &[f64]) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, &v)| ((i + 1) as f64, v))
        .collect()
}

/// Padded y range; falls back to [-1, 1] when there is nothing to show
fn value_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() || !hi.is_finite() {
        return (-1.0, 1.0);
    }
    let pad = ((hi - lo) * 0.05).max(1e-3);
    (lo - pad, hi + pad)
}
