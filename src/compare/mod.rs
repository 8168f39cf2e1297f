// src/compare/mod.rs

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::series::WideTable;

/// Which two entities a head-to-head comparison should prefer, and how the
/// selected columns are labelled in comparison exports. Passed explicitly so
/// selection stays testable independent of the process environment.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompareConfig {
    pub baseline: String,
    pub candidate: String,
    pub baseline_label: String,
    pub candidate_label: String,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            baseline: "DemoNet.b".to_string(),
            candidate: "DemoNet.a".to_string(),
            baseline_label: "Baseline".to_string(),
            candidate_label: "Candidate".to_string(),
        }
    }
}

/// Choose exactly two entities for comparison, in (baseline, candidate)
/// order when both preferred names are available. Otherwise falls back to the
/// two lexicographically-smallest identifiers in ascending order, a
/// documented convenience rather than a contract. Fewer than two entities skips the
/// comparison with a warning.
pub fn select_pair(available: &[String], cfg: &CompareConfig) -> Option<(String, String)> {
    if available.len() < 2 {
        warn!(
            available = ?available,
            "fewer than two entities, skipping comparison"
        );
        return None;
    }

    let has = |name: &str| available.iter().any(|e| e == name);
    if has(&cfg.baseline) && has(&cfg.candidate) {
        return Some((cfg.baseline.clone(), cfg.candidate.clone()));
    }

    let mut sorted: Vec<&String> = available.iter().collect();
    sorted.sort();
    let (baseline, candidate) = (sorted[0].clone(), sorted[1].clone());
    debug!(
        %baseline,
        %candidate,
        "preferred entities absent, falling back to smallest identifiers"
    );
    Some((baseline, candidate))
}

/// Restrict a table to the selected pair, baseline column first. Columns are
/// relabelled with the configured display labels only when the preferred pair
/// was actually selected; fallback pairs keep their own names.
pub fn pair_table(table: &WideTable, cfg: &CompareConfig) -> Option<WideTable> {
    let (baseline, candidate) = select_pair(&table.entities, cfg)?;

    let preferred = baseline == cfg.baseline && candidate == cfg.candidate;
    let labels = if preferred {
        vec![cfg.baseline_label.clone(), cfg.candidate_label.clone()]
    } else {
        vec![baseline.clone(), candidate.clone()]
    };

    let values = vec![
        table.column(&baseline)?.to_vec(),
        table.column(&candidate)?.to_vec(),
    ];

    Some(WideTable {
        metric: table.metric.clone(),
        times: table.times.clone(),
        entities: labels,
        values,
    })
}

/// One line of the summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub label: String,
    pub baseline: Option<f64>,
    pub candidate: Option<f64>,
    pub delta: Option<f64>,
    pub percent_change: Option<f64>,
}

/// Mean over the non-missing samples; no samples is an undefined mean, not
/// zero.
pub fn mean(values: &[Option<f64>]) -> Option<f64> {
    let samples: Vec<f64> = values.iter().flatten().copied().collect();
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Value at the greatest time index that is non-missing.
pub fn last_valid(values: &[Option<f64>]) -> Option<f64> {
    values.iter().rev().flatten().copied().next()
}

/// `100 * (candidate - baseline) / baseline`, missing when the baseline is
/// zero or either operand is missing, never infinite.
pub fn percent_change(baseline: Option<f64>, candidate: Option<f64>) -> Option<f64> {
    match (baseline, candidate) {
        (Some(b), Some(c)) if b != 0.0 => Some(100.0 * (c - b) / b),
        _ => None,
    }
}

fn summary_row(label: String, baseline: Option<f64>, candidate: Option<f64>) -> SummaryRow {
    SummaryRow {
        label,
        baseline,
        candidate,
        delta: baseline.zip(candidate).map(|(b, c)| c - b),
        percent_change: percent_change(baseline, candidate),
    }
}

/// Reduce one metric's selected pair to its summary rows: a mean row and a
/// final (last valid) row.
pub fn summarize_pair(table: &WideTable, cfg: &CompareConfig) -> Vec<SummaryRow> {
    let Some((baseline, candidate)) = select_pair(&table.entities, cfg) else {
        return Vec::new();
    };
    let base_col = table.column(&baseline).unwrap_or(&[]);
    let cand_col = table.column(&candidate).unwrap_or(&[]);

    vec![
        summary_row(
            format!("Mean {}", table.metric),
            mean(base_col),
            mean(cand_col),
        ),
        summary_row(
            format!("Final {}", table.metric),
            last_valid(base_col),
            last_valid(cand_col),
        ),
    ]
}
