// src/ingest/long.rs

use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

use super::{clean_str, read_export_buffers};

/// One row of a long-format export, still raw. `name` optionally encodes
/// `metric:entity`; `module` is an explicit entity override when non-empty.
/// Time/value stay strings here so that coercion failures can be dropped
/// silently during classification rather than failing the load.
#[derive(Debug, Clone)]
pub struct LongRecord {
    pub name: String,
    pub module: String,
    pub vectime: String,
    pub vecvalue: String,
}

/// Positions of the long-format columns within one member's header row.
struct LongLayout {
    name: usize,
    module: Option<usize>,
    vectime: usize,
    vecvalue: usize,
}

impl LongLayout {
    fn from_headers(headers: &[String]) -> Option<Self> {
        let find = |want: &str| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(want))
        };
        Some(Self {
            name: find("name")?,
            module: find("module"),
            vectime: find("vectime")?,
            vecvalue: find("vecvalue")?,
        })
    }
}

/// Whether a header row carries the long-format columns.
pub fn is_long_format(headers: &[String]) -> bool {
    LongLayout::from_headers(headers).is_some()
}

/// Load a long export (`name`, optional `module`, `vectime`, `vecvalue`) from
/// a CSV file or ZIP bundle. Members missing the required columns are skipped
/// with a warning; the load fails only when no member is usable.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_long<P: AsRef<Path>>(path: P) -> Result<Vec<LongRecord>> {
    let path = path.as_ref();
    let buffers = read_export_buffers(path)?;

    let mut records = Vec::new();
    let mut usable_members = 0usize;

    for (member, data) in buffers {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(Cursor::new(data));

        let mut layout: Option<LongLayout> = None;
        for (idx, result) in rdr.records().enumerate() {
            let record = result
                .with_context(|| format!("CSV parse error in {} at record {}", member, idx))?;

            match &layout {
                None => {
                    let headers: Vec<String> = record.iter().map(clean_str).collect();
                    match LongLayout::from_headers(&headers) {
                        Some(l) => {
                            layout = Some(l);
                            usable_members += 1;
                        }
                        None => {
                            warn!(member = %member, "missing name/vectime/vecvalue columns, skipping member");
                            break;
                        }
                    }
                }
                Some(l) => {
                    let field = |i: usize| record.get(i).map(clean_str).unwrap_or_default();
                    records.push(LongRecord {
                        name: field(l.name),
                        module: match l.module {
                            Some(i) => field(i),
                            None => String::new(),
                        },
                        vectime: field(l.vectime),
                        vecvalue: field(l.vecvalue),
                    });
                }
            }
        }
    }

    if usable_members == 0 {
        return Err(anyhow!(
            "no member of {} has the long-format columns",
            path.display()
        ));
    }

    debug!(records = records.len(), "loaded long records");
    Ok(records)
}
