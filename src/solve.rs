use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed timed attempt. Never mutated once in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solve {
    pub id: u64,
    pub elapsed_ms: f64,
    pub recorded_at: DateTime<Utc>,
}

impl Solve {
    pub fn new(id: u64, elapsed_ms: f64, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id,
            elapsed_ms,
            recorded_at,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.elapsed_ms.is_finite() && self.elapsed_ms >= 0.0
    }
}

/// Elapsed values in log order (newest first).
pub fn elapsed_values(log: &[Solve]) -> Vec<f64> {
    log.iter().map(|s| s.elapsed_ms).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn serializes_with_camel_case_keys() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let solve = Solve::new(7, 12345.5, at);
        let value = serde_json::to_value(&solve).unwrap();

        assert_eq!(value["id"], 7);
        assert_eq!(value["elapsedMs"], 12345.5);
        assert_eq!(value["recordedAt"], "2024-03-01T12:00:00Z");
    }

    #[test]
    fn negative_or_nan_is_invalid() {
        let at = Utc::now();
        assert!(Solve::new(1, 0.0, at).is_valid());
        assert!(!Solve::new(1, -1.0, at).is_valid());
        assert!(!Solve::new(1, f64::NAN, at).is_valid());
    }
}
