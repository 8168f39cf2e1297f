// src/ingest/mod.rs

use anyhow::{anyhow, Context, Result};
use glob::glob;
use std::{
    fs::{self, File},
    io::Read,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};
use zip::ZipArchive;

pub mod long;
pub mod wide;

pub use long::{is_long_format, load_long, LongRecord};
pub use wide::{load_wide, WideSnapshot};

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Coerce a raw cell to a finite number. Exported traces carry header/footer
/// junk in data positions, so any failure is "missing", never an error.
pub fn coerce_numeric(raw: &str) -> Option<f64> {
    clean_str(raw).parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Read an export into one or more named CSV buffers. A `.zip` bundle yields
/// every `.csv` member in archive order; anything else is a single buffer.
pub fn read_export_buffers(path: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let is_zip = path
        .extension()
        .and_then(|s| s.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("zip"));

    if !is_zip {
        let buf =
            fs::read(path).with_context(|| format!("reading export {}", path.display()))?;
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        return Ok(vec![(name, buf)]);
    }

    let file = File::open(path)
        .with_context(|| format!("opening export bundle {}", path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("reading ZIP archive {}", path.display()))?;

    let mut buffers = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("accessing ZIP entry #{} in {}", i, path.display()))?;
        let name = entry.name().to_string();
        if entry.is_file() && name.to_lowercase().ends_with(".csv") {
            let mut buf = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut buf)
                .with_context(|| format!("reading {} into memory", name))?;
            buffers.push((name, buf));
        } else {
            debug!(member = %name, "skipping non-CSV ZIP member");
        }
    }

    if buffers.is_empty() {
        return Err(anyhow!("no CSV members in {}", path.display()));
    }
    Ok(buffers)
}

/// Find export files under `dir` matching `pattern`, sorted for determinism.
/// Used when no explicit input file is configured.
pub fn discover_exports(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = format!("{}/{}", dir.display(), pattern);
    let mut found = Vec::new();
    for entry in glob(&full).with_context(|| format!("bad glob pattern {:?}", full))? {
        match entry {
            Ok(path) if path.is_file() => found.push(path),
            Ok(_) => {}
            Err(e) => warn!("skipping unreadable path while scanning {}: {}", full, e),
        }
    }
    found.sort();
    Ok(found)
}
