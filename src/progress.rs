use crate::solve::Solve;

/// Number of recent solves shown on the progress chart
pub const DEFAULT_PROGRESS_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressPoint {
    /// 1-based position in chronological order across the whole log
    pub solve_number: usize,
    pub elapsed_ms: f64,
    /// Faster than every solve recorded before it
    pub personal_best: bool,
}

impl ProgressPoint {
    pub fn new(solve_number: usize, elapsed_ms: f64, personal_best: bool) -> Self {
        Self {
            solve_number,
            elapsed_ms,
            personal_best,
        }
    }
}

impl From<ProgressPoint> for (f64, f64) {
    fn from(p: ProgressPoint) -> Self {
        (p.solve_number as f64, p.elapsed_ms)
    }
}

/// The `limit` most recent solves, oldest first.
pub fn progress_series(log: &[Solve], limit: usize) -> Vec<ProgressPoint> {
    let mut fastest = f64::INFINITY;
    let all: Vec<ProgressPoint> = log
        .iter()
        .rev()
        .enumerate()
        .map(|(i, solve)| {
            let personal_best = solve.elapsed_ms < fastest;
            if personal_best {
                fastest = solve.elapsed_ms;
            }
            ProgressPoint::new(i + 1, solve.elapsed_ms, personal_best)
        })
        .collect();

    let skip = all.len().saturating_sub(limit);
    all.into_iter().skip(skip).collect()
}

/// Least-squares line through the points, x being the position in the slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
}

impl TrendLine {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Negative slope means times are coming down.
    pub fn is_improving(&self) -> bool {
        self.slope < 0.0
    }
}

pub fn trend_line(points: &[ProgressPoint]) -> Option<TrendLine> {
    let n = points.len() as f64;
    if points.len() < 2 {
        return None;
    }

    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
    for (i, p) in points.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += p.elapsed_ms;
        sum_xy += x * p.elapsed_ms;
        sum_xx += x * x;
    }

    let denom = n * sum_xx - sum_x * sum_x;
    if denom == 0.0 {
        return None;
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;
    Some(TrendLine { slope, intercept })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    // newest first, like the session log
    fn log_of(values: &[f64]) -> Vec<Solve> {
        let at = Utc::now();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Solve::new((values.len() - i) as u64, v, at))
            .collect()
    }

    #[test]
    fn series_is_chronological_with_pb_flags() {
        // chronological: 30, 20, 25, 10
        let log = log_of(&[10.0, 25.0, 20.0, 30.0]);
        let series = progress_series(&log, DEFAULT_PROGRESS_LIMIT);

        assert_eq!(
            series,
            vec![
                ProgressPoint::new(1, 30.0, true),
                ProgressPoint::new(2, 20.0, true),
                ProgressPoint::new(3, 25.0, false),
                ProgressPoint::new(4, 10.0, true),
            ]
        );
    }

    #[test]
    fn ties_are_not_personal_bests() {
        let log = log_of(&[20.0, 20.0]);
        let series = progress_series(&log, 10);
        assert!(series[0].personal_best);
        assert!(!series[1].personal_best);
    }

    #[test]
    fn series_keeps_most_recent_and_global_pb_history() {
        // chronological: 5, 50, 40, 45
        let log = log_of(&[45.0, 40.0, 50.0, 5.0]);
        let series = progress_series(&log, 2);

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].solve_number, 3);
        // 40 beats 50 but not the earlier 5
        assert!(!series[0].personal_best);
        assert_eq!(series[1].solve_number, 4);
    }

    #[test]
    fn empty_log_has_empty_series() {
        assert!(progress_series(&[], 50).is_empty());
    }

    #[test]
    fn trend_line_fits_exact_line() {
        let points: Vec<ProgressPoint> = [30.0, 25.0, 20.0, 15.0]
            .iter()
            .enumerate()
            .map(|(i, &v)| ProgressPoint::new(i + 1, v, false))
            .collect();
        let trend = trend_line(&points).unwrap();

        assert!((trend.slope + 5.0).abs() < 1e-9);
        assert!((trend.intercept - 30.0).abs() < 1e-9);
        assert!(trend.is_improving());
        assert!((trend.at(3.0) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn trend_line_needs_two_points() {
        assert!(trend_line(&[]).is_none());
        assert!(trend_line(&[ProgressPoint::new(1, 10.0, true)]).is_none());
    }
}
