use crate::error::{CubikError, CubikResult};
use crate::progress::{progress_series, ProgressPoint};
use crate::solve::Solve;
use crate::stats::{aggregate_snapshot, AggregateSnapshot, BestAverages};
use crate::store::{Store, BEST_AVERAGES_KEY, SOLVES_KEY};
use crate::util::format_time;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::io::Write;

/// Owns the solve log and the best-average record, and writes both back to
/// the store after every mutation.
pub struct Session<S: Store> {
    store: S,
    solves: Vec<Solve>,
    best_averages: BestAverages,
    snapshot: AggregateSnapshot,
}

#[derive(Debug, Serialize)]
struct CsvRow {
    id: u64,
    elapsed_ms: f64,
    formatted: String,
    recorded_at: String,
}

impl<S: Store> Session<S> {
    /// Load both records, falling back to empty ones when missing or unreadable.
    pub fn load(store: S) -> Self {
        let solves = load_solves(&store);
        let mut best_averages = load_best_averages(&store);
        let snapshot = aggregate_snapshot(&solves, &mut best_averages);

        tracing::info!(solves = solves.len(), "session loaded");
        Self {
            store,
            solves,
            best_averages,
            snapshot,
        }
    }

    pub fn record_solve(&mut self, elapsed_ms: f64) -> CubikResult<&AggregateSnapshot> {
        self.record_solve_at(elapsed_ms, Utc::now())
    }

    /// Negative durations are stored as zero. NaN or infinite ones are
    /// rejected and leave the log untouched.
    pub fn record_solve_at(
        &mut self,
        elapsed_ms: f64,
        recorded_at: DateTime<Utc>,
    ) -> CubikResult<&AggregateSnapshot> {
        if !elapsed_ms.is_finite() {
            tracing::warn!(elapsed_ms, "refusing to record non-finite time");
            return Err(CubikError::InvalidTime(elapsed_ms));
        }
        let solve = Solve::new(self.next_id(recorded_at), elapsed_ms.max(0.0), recorded_at);
        tracing::info!(id = solve.id, elapsed_ms = solve.elapsed_ms, "recording solve");

        self.solves.insert(0, solve);
        self.refresh()?;
        Ok(&self.snapshot)
    }

    /// Returns false when no solve has that id.
    pub fn delete_solve(&mut self, id: u64) -> CubikResult<bool> {
        let Some(pos) = self.solves.iter().position(|s| s.id == id) else {
            tracing::debug!(id, "delete of unknown solve ignored");
            return Ok(false);
        };

        self.solves.remove(pos);
        tracing::info!(id, remaining = self.solves.len(), "deleted solve");
        self.refresh()?;
        Ok(true)
    }

    /// Drop every solve and every recorded best. Callers confirm first.
    pub fn clear_all(&mut self) -> CubikResult<()> {
        tracing::info!(solves = self.solves.len(), "clearing all solves and bests");
        self.solves.clear();
        self.best_averages.reset();
        self.refresh()
    }

    pub fn snapshot(&self) -> &AggregateSnapshot {
        &self.snapshot
    }

    /// Newest first
    pub fn solves(&self) -> &[Solve] {
        &self.solves
    }

    pub fn best_averages(&self) -> &BestAverages {
        &self.best_averages
    }

    pub fn progress(&self, limit: usize) -> Vec<ProgressPoint> {
        progress_series(&self.solves, limit)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Write the log oldest first as CSV. The header is written even when empty.
    pub fn export_csv<W: Write>(&self, writer: W) -> CubikResult<()> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        wtr.write_record(["id", "elapsed_ms", "formatted", "recorded_at"])?;
        for solve in self.solves.iter().rev() {
            wtr.serialize(CsvRow {
                id: solve.id,
                elapsed_ms: solve.elapsed_ms,
                formatted: format_time(Some(solve.elapsed_ms)),
                recorded_at: solve.recorded_at.to_rfc3339(),
            })?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn next_id(&self, recorded_at: DateTime<Utc>) -> u64 {
        let stamp = u64::try_from(recorded_at.timestamp_millis()).unwrap_or(0);
        let floor = self.solves.iter().map(|s| s.id + 1).max().unwrap_or(0);
        stamp.max(floor)
    }

    fn refresh(&mut self) -> CubikResult<()> {
        self.snapshot = aggregate_snapshot(&self.solves, &mut self.best_averages);
        self.persist()
    }

    fn persist(&mut self) -> CubikResult<()> {
        self.store
            .set(SOLVES_KEY, &serde_json::to_value(&self.solves)?)?;
        self.store
            .set(BEST_AVERAGES_KEY, &serde_json::to_value(&self.best_averages)?)?;
        Ok(())
    }
}

fn load_solves<S: Store>(store: &S) -> Vec<Solve> {
    let value = match store.get(SOLVES_KEY) {
        Ok(Some(v)) => v,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!(error = %e, "could not read solve log, starting empty");
            return Vec::new();
        }
    };

    let entries: Vec<Value> = match serde_json::from_value(value) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "corrupt solve log, starting empty");
            return Vec::new();
        }
    };

    // one unreadable entry only costs that entry
    let mut seen = HashSet::new();
    let before = entries.len();
    let solves: Vec<Solve> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<Solve>(entry).ok())
        .filter(|s| s.is_valid() && seen.insert(s.id))
        .collect();
    if solves.len() != before {
        tracing::warn!(dropped = before - solves.len(), "dropped invalid or duplicate solves");
    }
    solves
}

fn load_best_averages<S: Store>(store: &S) -> BestAverages {
    match store.get(BEST_AVERAGES_KEY) {
        Ok(Some(value)) => match serde_json::from_value::<BestAverages>(value) {
            Ok(best) => best.normalized(),
            Err(e) => {
                tracing::warn!(error = %e, "corrupt best averages, starting empty");
                BestAverages::new()
            }
        },
        Ok(None) => BestAverages::new(),
        Err(e) => {
            tracing::warn!(error = %e, "could not read best averages, starting empty");
            BestAverages::new()
        }
    }
}
