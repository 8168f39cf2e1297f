// src/series/pivot.rs

use std::collections::BTreeSet;
use tracing::{debug, warn};

use super::{build_time_axis, ClassifiedRecord, WideTable};

/// Pivot classified records for one metric into a canonical table: rows =
/// time (ascending), columns = entity, cell = last recorded value at that
/// instant (LastWins over original record order, matching the collapse
/// policy). No records for the metric yields an empty table plus a warning
/// naming the metrics that are available.
pub fn pivot_metric(records: &[ClassifiedRecord], metric: &str) -> WideTable {
    let sub: Vec<&ClassifiedRecord> = records
        .iter()
        .filter(|r| r.metric.eq_ignore_ascii_case(metric))
        .collect();

    if sub.is_empty() {
        let available: BTreeSet<&str> = records.iter().map(|r| r.metric.as_str()).collect();
        warn!(metric, available = ?available, "no records for metric");
        return WideTable::empty(metric);
    }

    let times = build_time_axis(sub.iter().map(|r| r.time).collect());
    let entities: Vec<String> = sub
        .iter()
        .map(|r| r.entity.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut values = vec![vec![None; times.len()]; entities.len()];
    for record in &sub {
        let entity = entities
            .binary_search(&record.entity)
            .expect("entity must be indexed");
        let slot = times
            .binary_search_by(|probe| probe.total_cmp(&record.time))
            .expect("record time must be on the axis");
        // Record order is original export order, so plain overwrite is LastWins.
        values[entity][slot] = Some(record.value);
    }

    debug!(
        metric,
        entities = entities.len(),
        instants = times.len(),
        "pivoted long records"
    );

    WideTable {
        metric: metric.to_string(),
        times,
        entities,
        values,
    }
}
