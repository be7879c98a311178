//! Rolling statistics over the solve log.
//!
//! Everything here is recomputed from the full log. The only state that
//! outlives a recomputation is [`BestAverages`], which remembers the lowest
//! trimmed average ever seen per window size even after the solves that
//! produced it are deleted.

use crate::solve::{elapsed_values, Solve};
use crate::util::{mean, median};
use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Window sizes tracked for current and best averages
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
pub enum WindowSize {
    #[serde(rename = "ao5")]
    #[strum(serialize = "Ao5")]
    Ao5,
    #[serde(rename = "ao12")]
    #[strum(serialize = "Ao12")]
    Ao12,
    #[serde(rename = "ao25")]
    #[strum(serialize = "Ao25")]
    Ao25,
    #[serde(rename = "ao50")]
    #[strum(serialize = "Ao50")]
    Ao50,
    #[serde(rename = "ao100")]
    #[strum(serialize = "Ao100")]
    Ao100,
}

impl WindowSize {
    pub const ALL: [WindowSize; 5] = [
        WindowSize::Ao5,
        WindowSize::Ao12,
        WindowSize::Ao25,
        WindowSize::Ao50,
        WindowSize::Ao100,
    ];

    pub fn count(self) -> usize {
        match self {
            WindowSize::Ao5 => 5,
            WindowSize::Ao12 => 12,
            WindowSize::Ao25 => 25,
            WindowSize::Ao50 => 50,
            WindowSize::Ao100 => 100,
        }
    }
}

/// Mean after dropping the single fastest and single slowest value.
///
/// Needs exactly `n` values and `n >= 3`. Windows of 3 or 4 are averaged
/// without trimming.
pub fn trimmed_average(values: &[f64], n: usize) -> Option<f64> {
    if n < 3 || values.len() != n {
        return None;
    }
    if n < 5 {
        return mean(values);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    trimmed_from_sorted(&sorted)
}

fn trimmed_from_sorted(sorted: &[f64]) -> Option<f64> {
    mean(&sorted[1..sorted.len() - 1])
}

/// Trimmed average of the `n` most recent solves.
pub fn current_window_average(log: &[Solve], n: usize) -> Option<f64> {
    if log.len() < n {
        return None;
    }
    let recent: Vec<f64> = log.iter().take(n).map(|s| s.elapsed_ms).collect();
    trimmed_average(&recent, n)
}

/// Lowest trimmed average over every contiguous window of `n` solves.
///
/// Slides a sorted copy of the window across the log, replacing one value
/// per step by binary search instead of re-sorting.
pub fn best_window_average(log: &[Solve], n: usize) -> Option<f64> {
    if n < 3 || log.len() < n {
        return None;
    }

    let values = elapsed_values(log);
    if n < 5 {
        return values
            .windows(n)
            .filter_map(|w| trimmed_average(w, n))
            .min_by(|a, b| a.total_cmp(b));
    }

    let mut window = values[..n].to_vec();
    window.sort_by(|a, b| a.total_cmp(b));
    let mut best = trimmed_from_sorted(&window);

    for start in 1..=values.len() - n {
        let outgoing = values[start - 1];
        let at = window.partition_point(|v| v.total_cmp(&outgoing).is_lt());
        window.remove(at);

        let incoming = values[start + n - 1];
        let at = window.partition_point(|v| v.total_cmp(&incoming).is_lt());
        window.insert(at, incoming);

        best = lower_of(best, trimmed_from_sorted(&window));
    }

    best
}

fn lower_of(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

/// Stored best only ever moves down, and never to "no value".
pub fn update_best_average(existing: Option<f64>, candidate: Option<f64>) -> Option<f64> {
    match (existing, candidate) {
        (Some(old), Some(new)) if new < old => Some(new),
        (None, Some(new)) => Some(new),
        (old, _) => old,
    }
}

/// Best trimmed average ever achieved per window size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BestAverages(BTreeMap<WindowSize, Option<f64>>);

impl Default for BestAverages {
    fn default() -> Self {
        Self(WindowSize::ALL.iter().map(|&size| (size, None)).collect())
    }
}

impl BestAverages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, size: WindowSize) -> Option<f64> {
        self.0.get(&size).copied().flatten()
    }

    /// Offer a candidate; returns true if the stored best changed.
    pub fn offer(&mut self, size: WindowSize, candidate: Option<f64>) -> bool {
        let existing = self.get(size);
        let updated = update_best_average(existing, candidate);
        self.0.insert(size, updated);
        updated != existing
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn iter(&self) -> impl Iterator<Item = (WindowSize, Option<f64>)> + '_ {
        WindowSize::ALL.iter().map(|&size| (size, self.get(size)))
    }

    /// Fill in any sizes missing from a partially persisted record.
    pub fn normalized(mut self) -> Self {
        for size in WindowSize::ALL {
            let kept = self.get(size).filter(|v| v.is_finite() && *v >= 0.0);
            self.0.insert(size, kept);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub size: WindowSize,
    pub current: Option<f64>,
    pub best: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSnapshot {
    pub total_solves: usize,
    pub best: Option<f64>,
    pub worst: Option<f64>,
    pub median: Option<f64>,
    pub mean: Option<f64>,
    pub windows: Vec<WindowStats>,
}

impl AggregateSnapshot {
    pub fn window(&self, size: WindowSize) -> Option<&WindowStats> {
        self.windows.iter().find(|w| w.size == size)
    }
}

/// Recompute every aggregate from `log`, folding each window's best into
/// `best_averages` first so the snapshot reports the updated record.
pub fn aggregate_snapshot(log: &[Solve], best_averages: &mut BestAverages) -> AggregateSnapshot {
    let values = elapsed_values(log);

    let (best, worst) = match values.iter().copied().minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::NoElements => (None, None),
        MinMaxResult::OneElement(v) => (Some(v), Some(v)),
        MinMaxResult::MinMax(lo, hi) => (Some(lo), Some(hi)),
    };

    let windows = WindowSize::ALL
        .iter()
        .map(|&size| {
            if best_averages.offer(size, best_window_average(log, size.count())) {
                tracing::info!(%size, best = ?best_averages.get(size), "new best average");
            }
            WindowStats {
                size,
                current: current_window_average(log, size.count()),
                best: best_averages.get(size),
            }
        })
        .collect();

    AggregateSnapshot {
        total_solves: log.len(),
        best,
        worst,
        median: median(&values),
        mean: mean(&values),
        windows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn log_of(values: &[f64]) -> Vec<Solve> {
        let at = Utc::now();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Solve::new(i as u64 + 1, v, at))
            .collect()
    }

    #[test]
    fn trimmed_average_drops_one_min_and_one_max() {
        assert_eq!(trimmed_average(&[10.0, 20.0, 30.0, 40.0, 50.0], 5), Some(30.0));
        assert_eq!(trimmed_average(&[50.0, 10.0, 40.0, 20.0, 30.0], 5), Some(30.0));
    }

    #[test]
    fn trimmed_average_keeps_duplicate_extremes() {
        // only one copy of each extreme goes
        assert_eq!(trimmed_average(&[10.0, 10.0, 20.0, 50.0, 50.0], 5), Some(80.0 / 3.0));
    }

    #[test]
    fn trimmed_average_small_windows_are_plain_means() {
        assert_eq!(trimmed_average(&[1.0, 2.0, 6.0], 3), Some(3.0));
        assert_eq!(trimmed_average(&[1.0, 2.0, 3.0, 10.0], 4), Some(4.0));
    }

    #[test]
    fn trimmed_average_is_not_a_percentage_trim() {
        // 5% per side would drop 1 value each for n=12 as well, but for
        // n=25 it would drop 2; we always drop exactly one.
        let values: Vec<f64> = (1..=25).map(f64::from).collect();
        let expected = (2..=24).map(f64::from).sum::<f64>() / 23.0;
        assert_eq!(trimmed_average(&values, 25), Some(expected));
    }

    #[test]
    fn trimmed_average_rejects_wrong_sizes() {
        assert_eq!(trimmed_average(&[1.0, 2.0], 2), None);
        assert_eq!(trimmed_average(&[1.0, 2.0, 3.0, 4.0], 5), None);
        assert_eq!(trimmed_average(&[], 0), None);
    }

    #[test]
    fn current_window_uses_newest_entries() {
        let log = log_of(&[10.0, 20.0, 30.0, 40.0, 50.0, 1000.0]);
        assert_eq!(current_window_average(&log, 5), Some(30.0));
        assert_eq!(current_window_average(&log, 12), None);
    }

    #[test]
    fn best_window_finds_minimum_over_all_windows() {
        let log = log_of(&[90.0, 90.0, 90.0, 10.0, 20.0, 30.0, 40.0, 50.0, 90.0]);
        assert_eq!(best_window_average(&log, 5), Some(30.0));
        assert_eq!(current_window_average(&log, 5), Some(200.0 / 3.0));
    }

    #[test]
    fn best_window_matches_brute_force() {
        let values = [
            12.1, 9.8, 15.2, 11.0, 10.4, 13.3, 8.9, 14.7, 9.9, 12.0, 10.1, 16.4, 11.5, 9.2,
        ];
        let log = log_of(&values);
        for n in 3..=values.len() {
            let brute = values
                .windows(n)
                .filter_map(|w| trimmed_average(w, n))
                .min_by(|a, b| a.total_cmp(b));
            let fast = best_window_average(&log, n).unwrap();
            assert!((fast - brute.unwrap()).abs() < 1e-9, "n = {n}");
        }
    }

    #[test]
    fn best_window_needs_enough_solves() {
        let log = log_of(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(best_window_average(&log, 5), None);
        assert_eq!(best_window_average(&log, 2), None);
    }

    #[test]
    fn update_best_only_moves_down() {
        assert_eq!(update_best_average(None, Some(5.0)), Some(5.0));
        assert_eq!(update_best_average(Some(5.0), Some(4.0)), Some(4.0));
        assert_eq!(update_best_average(Some(5.0), Some(6.0)), Some(5.0));
        assert_eq!(update_best_average(Some(5.0), Some(5.0)), Some(5.0));
        assert_eq!(update_best_average(Some(5.0), None), Some(5.0));
        assert_eq!(update_best_average(None, None), None);
    }

    #[test]
    fn best_averages_offer_reports_changes() {
        let mut best = BestAverages::new();
        assert!(best.offer(WindowSize::Ao5, Some(30.0)));
        assert!(!best.offer(WindowSize::Ao5, Some(31.0)));
        assert!(!best.offer(WindowSize::Ao5, None));
        assert_eq!(best.get(WindowSize::Ao5), Some(30.0));

        best.reset();
        assert_eq!(best.get(WindowSize::Ao5), None);
    }

    #[test]
    fn best_averages_serialize_as_keyed_map() {
        let mut best = BestAverages::new();
        best.offer(WindowSize::Ao12, Some(11.5));
        let json = serde_json::to_value(&best).unwrap();

        assert_eq!(json["ao12"], 11.5);
        assert!(json["ao5"].is_null());
        assert!(json["ao100"].is_null());
    }

    #[test]
    fn partial_best_averages_are_normalized() {
        let loaded: BestAverages = serde_json::from_str(r#"{"ao5": 12.5}"#).unwrap();
        let loaded = loaded.normalized();
        assert_eq!(loaded.get(WindowSize::Ao5), Some(12.5));
        assert_eq!(loaded.iter().count(), 5);
        assert_eq!(loaded, {
            let mut b = BestAverages::new();
            b.offer(WindowSize::Ao5, Some(12.5));
            b
        });
    }

    #[test]
    fn snapshot_of_empty_log_has_no_values() {
        let mut best = BestAverages::new();
        let snap = aggregate_snapshot(&[], &mut best);

        assert_eq!(snap.total_solves, 0);
        assert_eq!(snap.best, None);
        assert_eq!(snap.worst, None);
        assert_eq!(snap.median, None);
        assert_eq!(snap.mean, None);
        assert!(snap.windows.iter().all(|w| w.current.is_none() && w.best.is_none()));
    }

    #[test]
    fn snapshot_of_single_solve() {
        let mut best = BestAverages::new();
        let snap = aggregate_snapshot(&log_of(&[12345.0]), &mut best);

        assert_eq!(snap.total_solves, 1);
        assert_eq!(snap.best, Some(12345.0));
        assert_eq!(snap.worst, Some(12345.0));
        assert_eq!(snap.median, Some(12345.0));
        assert_eq!(snap.mean, Some(12345.0));
        assert_eq!(snap.windows.len(), WindowSize::ALL.len());
        assert!(snap.windows.iter().all(|w| w.current.is_none()));
    }

    #[test]
    fn snapshot_updates_best_record() {
        let mut best = BestAverages::new();
        let snap = aggregate_snapshot(&log_of(&[10.0, 20.0, 30.0, 40.0, 50.0]), &mut best);

        let ao5 = snap.window(WindowSize::Ao5).unwrap();
        assert_eq!(ao5.current, Some(30.0));
        assert_eq!(ao5.best, Some(30.0));
        assert_eq!(best.get(WindowSize::Ao5), Some(30.0));
        assert_eq!(snap.window(WindowSize::Ao12).unwrap().best, None);
    }

    #[test]
    fn snapshot_keeps_historical_best() {
        let mut best = BestAverages::new();
        best.offer(WindowSize::Ao5, Some(5.0));
        let snap = aggregate_snapshot(&log_of(&[10.0, 20.0, 30.0, 40.0, 50.0]), &mut best);

        assert_eq!(snap.window(WindowSize::Ao5).unwrap().best, Some(5.0));
    }

    #[test]
    fn window_size_labels() {
        assert_eq!(WindowSize::Ao12.to_string(), "Ao12");
        assert_eq!(WindowSize::Ao100.count(), 100);
    }
}
