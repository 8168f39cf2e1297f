// src/align/mod.rs

use tracing::debug;

use crate::series::WideTable;

/// Carry each series forward onto `axis`. At every axis point the most recent
/// non-missing observation at or before that point is used; points before the
/// first observation stay missing. Never interpolates.
fn fill_onto(axis: &[f64], times: &[f64], values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(axis.len());
    let mut next = 0;
    let mut last = None;
    for &t in axis {
        while next < times.len() && times[next] <= t {
            if values[next].is_some() {
                last = values[next];
            }
            next += 1;
        }
        out.push(last);
    }
    out
}

/// Forward-fill a table onto its own time axis, so every missing cell after
/// an entity's first observation carries the most recent value. Idempotent:
/// filling an already-filled table changes nothing.
pub fn forward_fill(table: &WideTable) -> WideTable {
    let values = table
        .values
        .iter()
        .map(|col| fill_onto(&table.times, &table.times, col))
        .collect();
    WideTable {
        metric: table.metric.clone(),
        times: table.times.clone(),
        entities: table.entities.clone(),
        values,
    }
}

/// Two operand tables aligned onto one shared axis: entities present in both
/// inputs only, times the sorted union of both input axes, each side
/// forward-filled independently.
#[derive(Debug, Clone)]
pub struct AlignedPair {
    pub times: Vec<f64>,
    pub entities: Vec<String>,
    pub numer: Vec<Vec<Option<f64>>>,
    pub denom: Vec<Vec<Option<f64>>>,
}

/// Align a numerator and denominator table. Entities present on only one
/// side are excluded, since a ratio is undefined without both operands. The output
/// axis is exactly the sorted union of the two input axes; no timestamp is
/// invented and no value is fabricated before its first occurrence.
pub fn align(numer: &WideTable, denom: &WideTable) -> AlignedPair {
    let entities: Vec<String> = numer
        .entities
        .iter()
        .filter(|e| denom.entity_index(e).is_some())
        .cloned()
        .collect();
    debug!(
        numer = %numer.metric,
        denom = %denom.metric,
        shared = ?entities,
        "aligning operand tables"
    );

    let mut times: Vec<f64> = numer
        .times
        .iter()
        .chain(denom.times.iter())
        .copied()
        .collect();
    times.sort_by(f64::total_cmp);
    times.dedup();

    let fill_side = |table: &WideTable| -> Vec<Vec<Option<f64>>> {
        entities
            .iter()
            .map(|e| fill_onto(&times, &table.times, table.column(e).unwrap_or(&[])))
            .collect()
    };

    let numer_filled = fill_side(numer);
    let denom_filled = fill_side(denom);

    AlignedPair {
        times,
        entities,
        numer: numer_filled,
        denom: denom_filled,
    }
}

/// Guarded elementwise ratio: defined only where the denominator is present
/// and strictly positive. A zero or absent denominator means "no events yet",
/// so the result is missing, never zero and never a fault.
pub fn ratio(numer: Option<f64>, denom: Option<f64>) -> Option<f64> {
    match (numer, denom) {
        (Some(n), Some(d)) if d > 0.0 => Some(n / d),
        _ => None,
    }
}

/// Derive a named ratio metric from aligned cumulative counters.
pub fn ratio_table(name: &str, numer: &WideTable, denom: &WideTable) -> WideTable {
    if numer.is_empty() || denom.is_empty() {
        return WideTable::empty(name);
    }

    let aligned = align(numer, denom);
    let values = aligned
        .numer
        .iter()
        .zip(&aligned.denom)
        .map(|(n_col, d_col)| {
            n_col
                .iter()
                .zip(d_col)
                .map(|(&n, &d)| ratio(n, d))
                .collect()
        })
        .collect();

    WideTable {
        metric: name.to_string(),
        times: aligned.times,
        entities: aligned.entities,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(metric: &str, times: &[f64], cols: &[(&str, &[Option<f64>])]) -> WideTable {
        WideTable {
            metric: metric.into(),
            times: times.to_vec(),
            entities: cols.iter().map(|(e, _)| e.to_string()).collect(),
            values: cols.iter().map(|(_, v)| v.to_vec()).collect(),
        }
    }

    #[test]
    fn union_axis_is_exactly_the_sorted_union() {
        let a = table("n", &[0.0, 2.0], &[("A", &[Some(1.0), Some(2.0)])]);
        let b = table("d", &[1.0, 2.0, 3.0], &[("A", &[Some(1.0), Some(1.0), Some(2.0)])]);
        let aligned = align(&a, &b);
        assert_eq!(aligned.times, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn forward_fill_carries_but_never_fabricates_before_first_observation() {
        let t = table("m", &[0.0, 1.0, 2.0], &[("A", &[None, Some(5.0), None])]);
        let filled = forward_fill(&t);
        assert_eq!(filled.column("A").unwrap(), &[None, Some(5.0), Some(5.0)]);
    }

    #[test]
    fn forward_fill_is_idempotent() {
        let t = table("m", &[0.0, 1.0], &[("A", &[None, Some(2.0)]), ("B", &[Some(1.0), Some(1.0)])]);
        let once = forward_fill(&t);
        let twice = forward_fill(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn align_on_identical_axes_returns_tables_unchanged() {
        let a = table("n", &[0.0, 1.0], &[("A", &[Some(1.0), Some(2.0)])]);
        let b = table("d", &[0.0, 1.0], &[("A", &[Some(4.0), Some(8.0)])]);
        let aligned = align(&a, &b);
        assert_eq!(aligned.times, a.times);
        assert_eq!(aligned.numer[0], a.values[0]);
        assert_eq!(aligned.denom[0], b.values[0]);
    }

    #[test]
    fn entities_on_one_side_only_are_excluded() {
        let a = table("n", &[0.0], &[("A", &[Some(1.0)]), ("B", &[Some(1.0)])]);
        let b = table("d", &[0.0], &[("B", &[Some(2.0)]), ("C", &[Some(2.0)])]);
        let aligned = align(&a, &b);
        assert_eq!(aligned.entities, vec!["B"]);
    }

    #[test]
    fn ratio_is_guarded_on_missing_or_nonpositive_denominator() {
        assert_eq!(ratio(Some(10.0), Some(4.0)), Some(2.5));
        assert_eq!(ratio(Some(10.0), Some(0.0)), None);
        assert_eq!(ratio(Some(10.0), Some(-1.0)), None);
        assert_eq!(ratio(Some(10.0), None), None);
        assert_eq!(ratio(None, Some(4.0)), None);
    }

    #[test]
    fn ratio_table_forward_fills_cumulative_counters() {
        // Counters sampled at disjoint instants: gas at 0 and 2, sent at 1 and 2.
        let gas = table("gasUsed", &[0.0, 2.0], &[("A", &[Some(100.0), Some(300.0)])]);
        let sent = table("sent", &[1.0, 2.0], &[("A", &[Some(2.0), Some(3.0)])]);
        let per_sub = ratio_table("gasPerSubmission", &gas, &sent);

        assert_eq!(per_sub.times, vec![0.0, 1.0, 2.0]);
        // t=0: no submissions yet -> missing, not zero or a fault.
        assert_eq!(per_sub.column("A").unwrap(), &[None, Some(50.0), Some(100.0)]);
    }

    #[test]
    fn ratio_table_with_empty_operand_is_empty() {
        let gas = table("gasUsed", &[0.0], &[("A", &[Some(1.0)])]);
        let empty = WideTable::empty("sent");
        assert!(ratio_table("r", &gas, &empty).is_empty());
        assert!(ratio_table("r", &empty, &gas).is_empty());
    }
}
