// src/export/mod.rs
//
// The single writer stage: every transform upstream returns in-memory tables,
// and only this module touches the output directory.

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info};

use crate::compare::SummaryRow;
use crate::pipeline::RunArtifacts;
use crate::series::WideTable;

/// Build the Arrow representation of a canonical table: a non-null `time`
/// column plus one nullable Float64 column per entity.
pub fn table_to_batch(table: &WideTable) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(table.entities.len() + 1);
    fields.push(Field::new("time", DataType::Float64, false));
    for entity in &table.entities {
        fields.push(Field::new(entity, DataType::Float64, true));
    }

    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(fields.len());
    arrays.push(Arc::new(Float64Array::from(table.times.clone())));
    for column in &table.values {
        arrays.push(Arc::new(Float64Array::from(column.clone())));
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
        .with_context(|| format!("building record batch for {}", table.metric))
}

fn summary_to_batch(rows: &[SummaryRow]) -> Result<RecordBatch> {
    let schema = Schema::new(vec![
        Field::new("label", DataType::Utf8, false),
        Field::new("baseline", DataType::Float64, true),
        Field::new("candidate", DataType::Float64, true),
        Field::new("delta", DataType::Float64, true),
        Field::new("percent_change", DataType::Float64, true),
    ]);

    let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
    let column = |f: fn(&SummaryRow) -> Option<f64>| -> ArrayRef {
        Arc::new(Float64Array::from(
            rows.iter().map(f).collect::<Vec<Option<f64>>>(),
        ))
    };

    RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(StringArray::from(labels)),
            column(|r| r.baseline),
            column(|r| r.candidate),
            column(|r| r.delta),
            column(|r| r.percent_change),
        ],
    )
    .context("building summary record batch")
}

fn write_batch_csv(batch: &RecordBatch, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer
        .write(batch)
        .with_context(|| format!("writing CSV {}", path.display()))?;
    Ok(())
}

fn write_batch_parquet(batch: &RecordBatch, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .with_context(|| format!("creating parquet writer for {}", path.display()))?;
    writer
        .write(batch)
        .with_context(|| format!("writing parquet {}", path.display()))?;
    writer
        .close()
        .with_context(|| format!("closing parquet writer for {}", path.display()))?;
    Ok(())
}

/// Keep output filenames derived from metric names filesystem-safe.
fn file_stem(metric: &str) -> String {
    metric
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn fmt_cell(value: Option<f64>) -> String {
    match value {
        None => "-".to_string(),
        Some(v) => {
            let s = format!("{:.4}", v);
            let s = s.trim_end_matches('0').trim_end_matches('.');
            if s.is_empty() || s == "-" {
                "0".to_string()
            } else {
                s.to_string()
            }
        }
    }
}

/// Render the summary as a plain, fixed-width text table.
pub fn render_summary_text(rows: &[SummaryRow]) -> String {
    const HEADERS: [&str; 5] = ["Metric", "Baseline", "Candidate", "Delta", "% Change"];

    let cells: Vec<[String; 5]> = rows
        .iter()
        .map(|r| {
            [
                r.label.clone(),
                fmt_cell(r.baseline),
                fmt_cell(r.candidate),
                fmt_cell(r.delta),
                fmt_cell(r.percent_change),
            ]
        })
        .collect();

    let widths: Vec<usize> = (0..HEADERS.len())
        .map(|col| {
            cells
                .iter()
                .map(|row| row[col].len())
                .chain([HEADERS[col].len()])
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = format!("generated {}\n", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
    let line = |row: &[String]| -> String {
        row.iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header_row: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    out.push_str(&line(&header_row));
    out.push('\n');
    out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * (widths.len() - 1)));
    out.push('\n');
    for row in &cells {
        out.push_str(&line(row));
        out.push('\n');
    }
    out
}

fn write_table_pair(table: &WideTable, out_dir: &Path, suffix: &str) -> Result<PathBuf> {
    let stem = file_stem(&table.metric);
    let batch = table_to_batch(table)?;
    let csv_path = out_dir.join(format!("{}{}.csv", stem, suffix));
    write_batch_csv(&batch, &csv_path)?;
    Ok(csv_path)
}

/// Write every artifact of a run under `out_dir`: per-metric and per-ratio
/// tables as CSV + Parquet, two-column comparisons as CSV, and the summary as
/// CSV, Parquet, JSON, and a text rendering. Empty tables are skipped; the
/// pipeline already reported why they are empty.
pub fn write_artifacts(artifacts: &RunArtifacts, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    for table in artifacts.metrics.iter().chain(artifacts.ratios.iter()) {
        if table.is_empty() {
            debug!(metric = %table.metric, "nothing to write for empty table");
            continue;
        }
        let stem = file_stem(&table.metric);
        let batch = table_to_batch(table)?;
        let csv_path = out_dir.join(format!("{}.csv", stem));
        write_batch_csv(&batch, &csv_path)?;
        write_batch_parquet(&batch, &out_dir.join(format!("{}.parquet", stem)))?;
        info!(path = %csv_path.display(), entities = table.entities.len(), "wrote table");
    }

    for pair in &artifacts.pairs {
        let path = write_table_pair(pair, out_dir, "_pair")?;
        info!(path = %path.display(), "wrote comparison");
    }

    if artifacts.summary.is_empty() {
        debug!("no summary rows to write");
        return Ok(());
    }

    let batch = summary_to_batch(&artifacts.summary)?;
    write_batch_csv(&batch, &out_dir.join("summary.csv"))?;
    write_batch_parquet(&batch, &out_dir.join("summary.parquet"))?;

    let json_path = out_dir.join("summary.json");
    let json_file = File::create(&json_path)
        .with_context(|| format!("creating {}", json_path.display()))?;
    serde_json::to_writer_pretty(json_file, &artifacts.summary)
        .context("writing summary JSON")?;

    fs::write(
        out_dir.join("summary.txt"),
        render_summary_text(&artifacts.summary),
    )
    .context("writing summary text rendering")?;

    info!(rows = artifacts.summary.len(), "wrote summary table");
    Ok(())
}
