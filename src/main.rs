use anyhow::{anyhow, Result};
use simpost::{
    config::{ExportFormat, RunConfig},
    export, ingest,
    pipeline::{self, Export},
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) load configuration ───────────────────────────────────────
    // One optional argument: a YAML config, or an input export override.
    let arg = std::env::args().nth(1).map(PathBuf::from);
    let is_config = |p: &PathBuf| {
        p.extension()
            .and_then(|s| s.to_str())
            .map_or(false, |ext| {
                ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml")
            })
    };

    let mut cfg = match &arg {
        Some(path) if is_config(path) => RunConfig::load(Some(path))?,
        _ => RunConfig::load(None)?,
    };
    if let Some(path) = arg.filter(|p| !is_config(p)) {
        cfg.input = Some(path);
    }

    // ─── 3) resolve the input export ─────────────────────────────────
    let input = match &cfg.input {
        Some(path) => path.clone(),
        None => {
            let found = ingest::discover_exports(&cfg.results_dir, &cfg.pattern)?;
            match found.as_slice() {
                [] => {
                    return Err(anyhow!(
                        "no export matching {:?} under {}",
                        cfg.pattern,
                        cfg.results_dir.display()
                    ))
                }
                [only] => only.clone(),
                [first, ..] => {
                    warn!(
                        count = found.len(),
                        using = %first.display(),
                        "multiple exports found, using the first"
                    );
                    first.clone()
                }
            }
        }
    };
    info!(input = %input.display(), "processing export");

    // ─── 4) load + post-process ──────────────────────────────────────
    let export = load_export(&input, cfg.format)?;
    let artifacts = pipeline::run(export, &cfg)?;

    // ─── 5) write output artifacts ───────────────────────────────────
    export::write_artifacts(&artifacts, &cfg.out_dir)?;

    info!(out_dir = %cfg.out_dir.display(), "all done");
    Ok(())
}

/// Load the export in the configured shape, sniffing the header row when no
/// shape was forced.
fn load_export(path: &Path, format: Option<ExportFormat>) -> Result<Export> {
    let format = match format {
        Some(f) => f,
        None => {
            let snapshot = ingest::load_wide(path)?;
            if ingest::is_long_format(&snapshot.headers) {
                ExportFormat::Long
            } else {
                info!("detected wide-format export");
                return Ok(Export::Wide(snapshot));
            }
        }
    };

    match format {
        ExportFormat::Wide => Ok(Export::Wide(ingest::load_wide(path)?)),
        ExportFormat::Long => {
            info!("detected long-format export");
            Ok(Export::Long(ingest::load_long(path)?))
        }
    }
}
