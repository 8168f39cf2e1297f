// src/series/classify.rs

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::ingest::{coerce_numeric, LongRecord};

use super::UNSCOPED_ENTITY;

/// Map column names of the form `<metric>:<entity>` to the entity token.
///
/// The metric comparison is case-insensitive and anchored: only the literal
/// `metric:` prefix matches, never a substring. The remainder after the colon
/// is the entity token, surrounding whitespace trimmed. Returns entity →
/// matching header indices, with each entity's index list in header order.
pub fn classify_columns(headers: &[String], metric: &str) -> Result<BTreeMap<String, Vec<usize>>> {
    let pattern = Regex::new(&format!(r"(?i)^\s*{}:(.*)$", regex::escape(metric)))
        .with_context(|| format!("building column pattern for metric {:?}", metric))?;

    let mut colmap: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (idx, header) in headers.iter().enumerate() {
        if let Some(caps) = pattern.captures(header) {
            let entity = caps[1].trim();
            if !entity.is_empty() {
                colmap.entry(entity.to_string()).or_default().push(idx);
            }
        }
    }
    Ok(colmap)
}

/// The metric names present in a wide header row, for missing-metric
/// diagnostics. Columns without a `:` count as their own metric.
pub fn available_metrics_wide(headers: &[String], time_col: usize) -> Vec<String> {
    let mut metrics = BTreeSet::new();
    for (idx, header) in headers.iter().enumerate() {
        if idx == time_col {
            continue;
        }
        let metric = match header.split_once(':') {
            Some((m, _)) => m.trim(),
            None => header.trim(),
        };
        if !metric.is_empty() {
            metrics.insert(metric.to_string());
        }
    }
    metrics.into_iter().collect()
}

/// A long-format record after classification: numeric time and value, and a
/// resolved (metric, entity) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRecord {
    pub metric: String,
    pub entity: String,
    pub time: f64,
    pub value: f64,
}

/// Split one raw record into (metric, entity, time, value).
///
/// The name splits at the first `:`; an explicit non-empty `module` overrides
/// the entity parsed from the name; both empty resolves to the unscoped
/// sentinel. Returns `None` when time or value fail numeric coercion; such
/// records are expected noise in exported traces, not errors.
pub fn classify_record(record: &LongRecord) -> Option<ClassifiedRecord> {
    let time = coerce_numeric(&record.vectime)?;
    let value = coerce_numeric(&record.vecvalue)?;

    let (metric, from_name) = match record.name.split_once(':') {
        Some((metric, rest)) => (metric.trim(), rest.trim()),
        None => (record.name.trim(), ""),
    };

    let module = record.module.trim();
    let entity = if !module.is_empty() { module } else { from_name };
    let entity = if entity.is_empty() {
        UNSCOPED_ENTITY
    } else {
        entity
    };

    Some(ClassifiedRecord {
        metric: metric.to_string(),
        entity: entity.to_string(),
        time,
        value,
    })
}

/// Classify a whole export, dropping unparseable records silently.
pub fn classify_records(records: &[LongRecord]) -> Vec<ClassifiedRecord> {
    let classified: Vec<ClassifiedRecord> =
        records.iter().filter_map(classify_record).collect();
    let dropped = records.len() - classified.len();
    if dropped > 0 {
        debug!(dropped, kept = classified.len(), "dropped non-numeric records");
    }
    classified
}
