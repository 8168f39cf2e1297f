// src/series/mod.rs

pub mod classify;
pub mod collapse;
pub mod pivot;

pub use classify::{classify_columns, classify_record, classify_records, ClassifiedRecord};
pub use collapse::{collapse_columns, extract_metric};
pub use pivot::pivot_metric;

/// Entity assigned to records that carry neither an explicit module nor a
/// `metric:entity` name, i.e. an unscoped/aggregate series.
pub const UNSCOPED_ENTITY: &str = "ALL";

/// LastWins: among multiple candidate values for the same key, the one
/// encountered last in input order is kept. This single policy decides which
/// duplicate column wins during collapse and which duplicate record wins
/// during pivoting; do not re-derive it ad hoc.
pub fn last_wins(candidates: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    candidates.into_iter().flatten().last()
}

/// Canonical per-metric table: one ascending time axis, one column per entity.
/// Invariant: exactly one cell per (time, entity); missing cells are explicit
/// `None`s, never absent rows.
#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    pub metric: String,
    /// Strictly ascending, deduplicated time axis.
    pub times: Vec<f64>,
    /// Entity column names, sorted for deterministic output.
    pub entities: Vec<String>,
    /// Column-major cells: `values[e][t]` pairs `entities[e]` with `times[t]`.
    pub values: Vec<Vec<Option<f64>>>,
}

impl WideTable {
    pub fn empty(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            times: Vec::new(),
            entities: Vec::new(),
            values: Vec::new(),
        }
    }

    /// A table with no entities or no sampled instants carries no data.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() || self.times.is_empty()
    }

    pub fn entity_index(&self, entity: &str) -> Option<usize> {
        self.entities.iter().position(|e| e == entity)
    }

    pub fn column(&self, entity: &str) -> Option<&[Option<f64>]> {
        self.entity_index(entity).map(|i| self.values[i].as_slice())
    }
}

/// Sort + dedup a set of finite time stamps into an axis.
pub(crate) fn build_time_axis(mut times: Vec<f64>) -> Vec<f64> {
    times.sort_by(f64::total_cmp);
    times.dedup();
    times
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_wins_keeps_the_final_non_missing_candidate() {
        assert_eq!(last_wins([Some(1.0), Some(2.0)]), Some(2.0));
        assert_eq!(last_wins([Some(1.0), None]), Some(1.0));
        assert_eq!(last_wins([None, None]), None);
        assert_eq!(last_wins([]), None);
    }

    #[test]
    fn time_axis_is_sorted_and_deduplicated() {
        assert_eq!(
            build_time_axis(vec![2.0, 0.0, 1.0, 2.0, 0.0]),
            vec![0.0, 1.0, 2.0]
        );
    }
}
