// src/ingest/wide.rs

use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

use super::{clean_str, read_export_buffers};

/// Names accepted as the time axis, checked case-insensitively against the
/// header row. Falls back to the first column when none match.
const TIME_COLUMN_NAMES: [&str; 3] = ["time", "t", "vectime"];

/// A wide-format export: one header row, then one row per sampled instant.
/// Metric columns are named `metric:entity`; cells stay raw strings until a
/// metric is extracted (coercion failures become missing, not errors).
#[derive(Debug, Clone)]
pub struct WideSnapshot {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Index of the time column within `headers`.
    pub time_col: usize,
}

impl WideSnapshot {
    pub fn time_column_name(&self) -> &str {
        &self.headers[self.time_col]
    }
}

/// Load a wide export from a CSV file or a ZIP bundle of CSV members.
/// Members whose header row differs from the first member's are skipped with
/// a warning; matching members have their data rows concatenated in order.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_wide<P: AsRef<Path>>(path: P) -> Result<WideSnapshot> {
    let path = path.as_ref();
    let buffers = read_export_buffers(path)?;

    let mut headers: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<String>> = Vec::new();

    for (member, data) in buffers {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(Cursor::new(data));

        let mut member_headers: Option<Vec<String>> = None;
        for (idx, result) in rdr.records().enumerate() {
            let record = result
                .with_context(|| format!("CSV parse error in {} at record {}", member, idx))?;
            let fields: Vec<String> = record.iter().map(clean_str).collect();

            match &member_headers {
                None => member_headers = Some(fields),
                Some(h) => match &headers {
                    None => rows.push(fields),
                    // Only members that agree with the first header row merge.
                    Some(first) if h == first => rows.push(fields),
                    Some(_) => break,
                },
            }
        }

        match (&headers, member_headers) {
            (None, Some(h)) if !h.is_empty() => headers = Some(h),
            (None, _) => warn!(member = %member, "member has no header row, skipping"),
            (Some(first), Some(h)) if &h != first => {
                warn!(member = %member, "header row differs from first member, skipping");
            }
            _ => {}
        }
    }

    let headers = headers.ok_or_else(|| {
        anyhow!("no parseable table found in {}", path.display())
    })?;

    let time_col = headers
        .iter()
        .position(|h| TIME_COLUMN_NAMES.iter().any(|t| h.eq_ignore_ascii_case(t)))
        .unwrap_or_else(|| {
            debug!("no time-like column name, defaulting to first column");
            0
        });

    let time_column = headers[time_col].as_str();
    debug!(
        columns = headers.len(),
        rows = rows.len(),
        time_column,
        "loaded wide snapshot"
    );

    Ok(WideSnapshot {
        headers,
        rows,
        time_col,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn picks_time_like_column_case_insensitively() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = write_csv(&dir, "w.csv", "x:A,VecTime,y:B\n1,0,2\n");
        let snap = load_wide(&path)?;
        assert_eq!(snap.time_col, 1);
        assert_eq!(snap.time_column_name(), "VecTime");
        Ok(())
    }

    #[test]
    fn falls_back_to_first_column_without_time_name() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = write_csv(&dir, "w.csv", "tick,x:A\n0,1\n1,2\n");
        let snap = load_wide(&path)?;
        assert_eq!(snap.time_col, 0);
        assert_eq!(snap.rows.len(), 2);
        Ok(())
    }

    #[test]
    fn empty_file_is_fatal() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = write_csv(&dir, "w.csv", "");
        assert!(load_wide(&path).is_err());
        Ok(())
    }
}
