use std::cmp::Ordering;

/// Shown wherever a duration has no value yet.
pub const PLACEHOLDER: &str = "--";

pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

pub fn median(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let len = sorted.len();
    if len % 2 == 0 {
        Some((sorted[len / 2 - 1] + sorted[len / 2]) / 2.0)
    } else {
        Some(sorted[len / 2])
    }
}

/// Format a duration in milliseconds as `M:SS.CC`, or `S.CC` under a minute.
///
/// Missing, NaN, infinite and negative inputs render as [`PLACEHOLDER`].
pub fn format_time(milliseconds: Option<f64>) -> String {
    let ms = match milliseconds {
        Some(v) if v.is_finite() && v >= 0.0 => v,
        _ => return PLACEHOLDER.to_string(),
    };

    let total_ms = ms.floor() as u64;
    let minutes = total_ms / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let centiseconds = (total_ms % 1000) / 10;

    if minutes > 0 {
        format!("{minutes}:{seconds:02}.{centiseconds:02}")
    } else {
        format!("{seconds}.{centiseconds:02}")
    }
}
