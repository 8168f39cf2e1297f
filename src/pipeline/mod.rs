// src/pipeline/mod.rs

use anyhow::Result;
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::align::{forward_fill, ratio_table};
use crate::compare::{pair_table, summarize_pair, SummaryRow};
use crate::config::{RatioSpec, RunConfig};
use crate::ingest::{LongRecord, WideSnapshot};
use crate::series::{classify_records, extract_metric, pivot_metric, ClassifiedRecord, WideTable};

/// A loaded export snapshot, either shape.
#[derive(Debug)]
pub enum Export {
    Wide(WideSnapshot),
    Long(Vec<LongRecord>),
}

/// Everything one run produces, still in memory. Transforms stay pure; the
/// writer stage in `export` is the only place artifacts touch the filesystem.
#[derive(Debug, Default)]
pub struct RunArtifacts {
    /// Aligned per-metric tables, in configured metric order. Empty tables
    /// (missing metrics) are kept so consumers see the full request.
    pub metrics: Vec<WideTable>,
    /// Derived ratio tables, in configured order.
    pub ratios: Vec<WideTable>,
    /// Two-column baseline/candidate comparisons for every non-empty table.
    pub pairs: Vec<WideTable>,
    /// Mean/final rows for the selected pair, in computation order.
    pub summary: Vec<SummaryRow>,
}

enum Classified {
    Wide(WideSnapshot),
    Long(Vec<ClassifiedRecord>),
}

impl Classified {
    fn table(&self, metric: &str) -> Result<WideTable> {
        match self {
            Classified::Wide(snapshot) => extract_metric(snapshot, metric),
            Classified::Long(records) => Ok(pivot_metric(records, metric)),
        }
    }
}

/// Run the whole post-processing pipeline over one export snapshot.
///
/// Each metric's extraction and alignment is independent, so metrics fan out
/// across threads; outputs are keyed by metric name and collected back in
/// configured order.
#[instrument(level = "info", skip(export, cfg))]
pub fn run(export: Export, cfg: &RunConfig) -> Result<RunArtifacts> {
    let classified = match export {
        Export::Wide(snapshot) => Classified::Wide(snapshot),
        Export::Long(records) => Classified::Long(classify_records(&records)),
    };

    let metrics: Vec<WideTable> = cfg
        .metrics
        .par_iter()
        .map(|metric| classified.table(metric).map(|t| forward_fill(&t)))
        .collect::<Result<_>>()?;

    let ratios: Vec<WideTable> = cfg
        .ratios
        .iter()
        .map(|spec| derive_ratio(&classified, &metrics, spec))
        .collect::<Result<_>>()?;

    let mut pairs = Vec::new();
    let mut summary = Vec::new();
    for table in metrics.iter().chain(ratios.iter()) {
        if table.is_empty() {
            // The extraction stage already warned about the missing metric.
            debug!(metric = %table.metric, "skipping comparison for empty table");
            continue;
        }
        if let Some(pair) = pair_table(table, &cfg.compare) {
            pairs.push(pair);
            summary.extend(summarize_pair(table, &cfg.compare));
        }
    }

    info!(
        metrics = metrics.len(),
        ratios = ratios.len(),
        pairs = pairs.len(),
        summary_rows = summary.len(),
        "pipeline complete"
    );

    Ok(RunArtifacts {
        metrics,
        ratios,
        pairs,
        summary,
    })
}

/// Resolve one configured ratio. A precomputed metric that already carries
/// entity columns short-circuits the division; otherwise the numerator and
/// denominator counters are aligned and divided under the ratio guard.
fn derive_ratio(
    classified: &Classified,
    computed: &[WideTable],
    spec: &RatioSpec,
) -> Result<WideTable> {
    if let Some(ready_metric) = &spec.precomputed {
        let ready = lookup_or_extract(classified, computed, ready_metric)?;
        if !ready.is_empty() {
            debug!(ratio = %spec.name, metric = %ready_metric, "using precomputed ratio metric");
            let mut table = forward_fill(&ready);
            table.metric = spec.name.clone();
            return Ok(table);
        }
    }

    let numer = lookup_or_extract(classified, computed, &spec.numerator)?;
    let denom = lookup_or_extract(classified, computed, &spec.denominator)?;
    Ok(ratio_table(&spec.name, &numer, &denom))
}

fn lookup_or_extract(
    classified: &Classified,
    computed: &[WideTable],
    metric: &str,
) -> Result<WideTable> {
    if let Some(table) = computed.iter().find(|t| t.metric.eq_ignore_ascii_case(metric)) {
        return Ok(table.clone());
    }
    classified.table(metric)
}
