// src/series/collapse.rs

use anyhow::Result;
use tracing::{debug, warn};

use crate::ingest::{coerce_numeric, WideSnapshot};

use super::classify::{available_metrics_wide, classify_columns};
use super::{build_time_axis, last_wins, WideTable};

/// Collapse duplicate columns for one entity onto the shared row axis.
///
/// Columns are scanned in their given order and the last non-missing value
/// per row wins (rightmost wins). With a single column the values pass
/// through unchanged. This order decides which duplicate instrumentation
/// source is kept when sources disagree, so callers must preserve it.
pub fn collapse_columns(columns: &[Vec<Option<f64>>]) -> Vec<Option<f64>> {
    let rows = columns.first().map_or(0, Vec::len);
    (0..rows)
        .map(|row| last_wins(columns.iter().map(|col| col[row])))
        .collect()
}

/// Extract one metric from a wide snapshot into a canonical table.
///
/// Matching columns are grouped per entity, coerced to numbers, and collapsed
/// rightmost-wins; rows with an uncoercible time are dropped; duplicate time
/// stamps collapse LastWins per cell. An absent metric yields an empty table
/// and a diagnostic naming the metrics that are present, not an error.
pub fn extract_metric(snapshot: &WideSnapshot, metric: &str) -> Result<WideTable> {
    let colmap = classify_columns(&snapshot.headers, metric)?;
    if colmap.is_empty() {
        warn!(
            metric,
            available = ?available_metrics_wide(&snapshot.headers, snapshot.time_col),
            "no columns for metric"
        );
        return Ok(WideTable::empty(metric));
    }

    // Row times, coerced once; None rows fall out of the axis entirely.
    let row_times: Vec<Option<f64>> = snapshot
        .rows
        .iter()
        .map(|row| row.get(snapshot.time_col).map(String::as_str).and_then(coerce_numeric))
        .collect();

    let times = build_time_axis(row_times.iter().flatten().copied().collect());

    let mut entities = Vec::with_capacity(colmap.len());
    let mut values = Vec::with_capacity(colmap.len());
    for (entity, col_indices) in &colmap {
        let columns: Vec<Vec<Option<f64>>> = col_indices
            .iter()
            .map(|&c| {
                snapshot
                    .rows
                    .iter()
                    .map(|row| row.get(c).map(String::as_str).and_then(coerce_numeric))
                    .collect()
            })
            .collect();
        let collapsed = collapse_columns(&columns);

        let mut cells = vec![None; times.len()];
        for (row, value) in collapsed.into_iter().enumerate() {
            let Some(time) = row_times[row] else { continue };
            let slot = times
                .binary_search_by(|probe| probe.total_cmp(&time))
                .expect("row time must be on the axis");
            if value.is_some() {
                cells[slot] = value;
            }
        }

        entities.push(entity.clone());
        values.push(cells);
    }

    debug!(
        metric,
        entities = entities.len(),
        instants = times.len(),
        "extracted metric from wide snapshot"
    );

    Ok(WideTable {
        metric: metric.to_string(),
        times,
        entities,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(headers: &[&str], rows: &[&[&str]]) -> WideSnapshot {
        WideSnapshot {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
            time_col: 0,
        }
    }

    #[test]
    fn rightmost_non_missing_wins_per_row() {
        let columns = vec![vec![Some(10.0), None], vec![None, Some(20.0)]];
        assert_eq!(collapse_columns(&columns), vec![Some(10.0), Some(20.0)]);

        let disagreeing = vec![vec![Some(1.0)], vec![Some(2.0)]];
        assert_eq!(collapse_columns(&disagreeing), vec![Some(2.0)]);
    }

    #[test]
    fn single_column_passes_through() {
        let columns = vec![vec![Some(1.0), None, Some(3.0)]];
        assert_eq!(collapse_columns(&columns), vec![Some(1.0), None, Some(3.0)]);
    }

    #[test]
    fn extract_collapses_duplicate_columns() -> Result<()> {
        let snap = snapshot(
            &["time", "m:A", "m:A"],
            &[&["0", "10", ""], &["1", "", "20"]],
        );
        let table = extract_metric(&snap, "m")?;
        assert_eq!(table.entities, vec!["A"]);
        assert_eq!(table.column("A").unwrap(), &[Some(10.0), Some(20.0)]);
        Ok(())
    }

    #[test]
    fn extract_drops_rows_with_bad_time_and_keeps_bad_cells_missing() -> Result<()> {
        let snap = snapshot(
            &["time", "m:A"],
            &[&["junk", "99"], &["0", "1"], &["1", "oops"]],
        );
        let table = extract_metric(&snap, "m")?;
        assert_eq!(table.times, vec![0.0, 1.0]);
        assert_eq!(table.column("A").unwrap(), &[Some(1.0), None]);
        Ok(())
    }

    #[test]
    fn duplicate_time_rows_collapse_last_wins() -> Result<()> {
        let snap = snapshot(
            &["time", "m:A"],
            &[&["0", "1"], &["0", "2"], &["0", ""]],
        );
        let table = extract_metric(&snap, "m")?;
        assert_eq!(table.times, vec![0.0]);
        assert_eq!(table.column("A").unwrap(), &[Some(2.0)]);
        Ok(())
    }

    #[test]
    fn missing_metric_yields_empty_table() -> Result<()> {
        let snap = snapshot(&["time", "other:A"], &[&["0", "1"]]);
        let table = extract_metric(&snap, "m")?;
        assert!(table.is_empty());
        assert_eq!(table.metric, "m");
        Ok(())
    }
}
