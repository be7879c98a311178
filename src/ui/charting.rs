use crate::progress::{ProgressPoint, TrendLine};

/// X (solve number) and Y (milliseconds) bounds for the progress chart
pub fn compute_chart_params(points: &[ProgressPoint]) -> ([f64; 2], [f64; 2]) {
    let first = points.first().map(|p| p.solve_number as f64).unwrap_or(1.0);
    let mut last = points.last().map(|p| p.solve_number as f64).unwrap_or(1.0);
    if last <= first {
        last = first + 1.0;
    }

    let mut lowest = f64::INFINITY;
    let mut highest = 0.0;
    for p in points {
        if p.elapsed_ms > highest {
            highest = p.elapsed_ms;
        }
        if p.elapsed_ms < lowest {
            lowest = p.elapsed_ms;
        }
    }
    if !lowest.is_finite() {
        lowest = 0.0;
    }

    // pad by a tenth of the range so extremes don't sit on the border
    let pad = ((highest - lowest) * 0.1).max(100.0);
    ([first, last], [(lowest - pad).max(0.0), highest + pad])
}

/// Endpoints of the trend line in chart coordinates
pub fn trend_segment(points: &[ProgressPoint], trend: &TrendLine) -> Vec<(f64, f64)> {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) => vec![
            (first.solve_number as f64, trend.at(0.0)),
            (last.solve_number as f64, trend.at((points.len() - 1) as f64)),
        ],
        _ => Vec::new(),
    }
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
