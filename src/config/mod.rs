// src/config/mod.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{env, fs, path::Path, path::PathBuf};
use tracing::{debug, info};

use crate::compare::CompareConfig;

/// Environment overrides for the preferred comparison entities. These names
/// predate this tool; existing run scripts already export them.
pub const BASELINE_ENV: &str = "BASE_SERIES";
pub const CANDIDATE_ENV: &str = "AI_SERIES";

const DEFAULT_CONFIG_PATH: &str = "simpost.yaml";

/// Shape of the input export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// One row per instant, `metric:entity` columns.
    Wide,
    /// One row per sample: name/module/vectime/vecvalue.
    Long,
}

/// A derived ratio metric over two cumulative counters.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RatioSpec {
    pub name: String,
    pub numerator: String,
    pub denominator: String,
    /// Metric the model may already emit as a ready ratio; when its table has
    /// entity columns it is used directly and the division is skipped.
    #[serde(default)]
    pub precomputed: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Explicit input export; when unset, exports are discovered by glob.
    pub input: Option<PathBuf>,
    pub results_dir: PathBuf,
    pub pattern: String,
    pub out_dir: PathBuf,
    /// Forced input shape; inferred from the header row when unset.
    pub format: Option<ExportFormat>,
    pub metrics: Vec<String>,
    pub ratios: Vec<RatioSpec>,
    pub compare: CompareConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input: None,
            results_dir: PathBuf::from("results"),
            pattern: "*.csv".to_string(),
            out_dir: PathBuf::from("results/post"),
            format: None,
            metrics: vec![
                "successRate".to_string(),
                "gasUsed".to_string(),
                "sent".to_string(),
            ],
            ratios: vec![
                RatioSpec {
                    name: "successRatio".to_string(),
                    numerator: "successRate".to_string(),
                    denominator: "sent".to_string(),
                    precomputed: Some("successRate".to_string()),
                },
                RatioSpec {
                    name: "gasPerSubmission".to_string(),
                    numerator: "gasUsed".to_string(),
                    denominator: "sent".to_string(),
                    precomputed: None,
                },
            ],
            compare: CompareConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load the run config: an explicit path must parse, the default path is
    /// used when present, otherwise built-in defaults apply. Environment
    /// overrides for the preferred entities are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.is_file() {
                    Self::from_file(default)?
                } else {
                    debug!("no config file, using built-in defaults");
                    Self::default()
                }
            }
        };
        cfg.override_entities(env::var(BASELINE_ENV).ok(), env::var(CANDIDATE_ENV).ok());
        Ok(cfg)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        info!(path = %path.display(), "loaded run config");
        Ok(cfg)
    }

    fn override_entities(&mut self, baseline: Option<String>, candidate: Option<String>) {
        if let Some(b) = baseline.filter(|s| !s.trim().is_empty()) {
            debug!(baseline = %b, "entity override from environment");
            self.compare.baseline = b;
        }
        if let Some(c) = candidate.filter(|s| !s.trim().is_empty()) {
            debug!(candidate = %c, "entity override from environment");
            self.compare.candidate = c;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_standard_metrics() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.metrics, vec!["successRate", "gasUsed", "sent"]);
        assert_eq!(cfg.ratios.len(), 2);
        assert_eq!(cfg.ratios[0].precomputed.as_deref(), Some("successRate"));
        assert_eq!(cfg.compare.baseline, "DemoNet.b");
        assert_eq!(cfg.compare.candidate, "DemoNet.a");
    }

    #[test]
    fn yaml_overrides_selected_fields_only() -> Result<()> {
        let yaml = r#"
metrics: [latency]
ratios:
  - name: costPerOp
    numerator: cost
    denominator: ops
compare:
  baseline: Node.base
  candidate: Node.cand
"#;
        let cfg: RunConfig = serde_yaml::from_str(yaml)?;
        assert_eq!(cfg.metrics, vec!["latency"]);
        assert_eq!(cfg.ratios.len(), 1);
        assert_eq!(cfg.ratios[0].precomputed, None);
        assert_eq!(cfg.compare.baseline, "Node.base");
        // Untouched fields keep their defaults.
        assert_eq!(cfg.pattern, "*.csv");
        assert_eq!(cfg.compare.baseline_label, "Baseline");
        Ok(())
    }

    #[test]
    fn environment_overrides_win_but_ignore_blanks() {
        let mut cfg = RunConfig::default();
        cfg.override_entities(Some("Net.x".into()), Some("  ".into()));
        assert_eq!(cfg.compare.baseline, "Net.x");
        assert_eq!(cfg.compare.candidate, "DemoNet.a");
    }
}
