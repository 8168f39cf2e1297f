//! Post-processing for simulation vector exports: extract per-entity metric
//! series from wide or long CSV snapshots, align them onto a shared time axis,
//! derive guarded ratio metrics, and reduce a baseline/candidate comparison
//! into a summary table.

pub mod align;
pub mod compare;
pub mod config;
pub mod export;
pub mod ingest;
pub mod pipeline;
pub mod series;
