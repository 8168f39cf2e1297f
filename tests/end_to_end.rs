// Whole-pipeline checks: raw export file in, written artifacts out.

use anyhow::Result;
use simpost::{
    config::{RatioSpec, RunConfig},
    export::write_artifacts,
    ingest::{load_long, load_wide},
    pipeline::{run, Export},
};
use std::fs;
use tempfile::TempDir;

fn cfg_for(baseline: &str, candidate: &str) -> RunConfig {
    let mut cfg = RunConfig::default();
    cfg.compare.baseline = baseline.to_string();
    cfg.compare.candidate = candidate.to_string();
    cfg
}

#[test]
fn wide_export_to_artifacts_on_disk() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("all_series.csv");
    fs::write(
        &input,
        "time,successRate:Base,successRate:Cand,gasUsed:Base,sent:Base,gasUsed:Cand,sent:Cand\n\
         0,0.5,0.6,100,1,90,1\n\
         1,,0.8,300,3,150,2\n\
         2,0.9,,600,6,240,3\n",
    )?;

    let mut cfg = cfg_for("Base", "Cand");
    cfg.metrics = vec![
        "successRate".to_string(),
        "gasUsed".to_string(),
        "sent".to_string(),
    ];
    cfg.ratios = vec![RatioSpec {
        name: "gasPerSubmission".to_string(),
        numerator: "gasUsed".to_string(),
        denominator: "sent".to_string(),
        precomputed: None,
    }];

    let snapshot = load_wide(&input)?;
    let artifacts = run(Export::Wide(snapshot), &cfg)?;

    // Forward-fill on missing cells only.
    let success = &artifacts.metrics[0];
    assert_eq!(success.times, vec![0.0, 1.0, 2.0]);
    assert_eq!(
        success.column("Base").unwrap(),
        &[Some(0.5), Some(0.5), Some(0.9)]
    );
    assert_eq!(
        success.column("Cand").unwrap(),
        &[Some(0.6), Some(0.8), Some(0.8)]
    );

    // Cumulative counters divide to a flat per-submission cost here.
    let per_sub = &artifacts.ratios[0];
    assert_eq!(per_sub.column("Base").unwrap(), &[Some(100.0); 3]);
    assert_eq!(per_sub.column("Cand").unwrap(), &[Some(90.0), Some(75.0), Some(80.0)]);

    let out = dir.path().join("post");
    write_artifacts(&artifacts, &out)?;
    for name in [
        "successRate.csv",
        "successRate.parquet",
        "successRate_pair.csv",
        "gasPerSubmission.csv",
        "summary.csv",
        "summary.json",
        "summary.txt",
    ] {
        assert!(out.join(name).is_file(), "missing {}", name);
    }

    // Comparison exports carry the configured display labels.
    let pair_csv = fs::read_to_string(out.join("successRate_pair.csv"))?;
    assert_eq!(pair_csv.lines().next(), Some("time,Baseline,Candidate"));
    Ok(())
}

#[test]
fn long_export_with_entity_fallback() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("vectors.csv");
    fs::write(
        &input,
        "name,module,vectime,vecvalue\n\
         successRate:Zeta,,0,0.3\n\
         successRate,Alpha,0,0.5\n\
         successRate,Mid,1,0.7\n\
         successRate:Zeta,,1,0.4\n\
         garbage,,x,y\n",
    )?;

    // Preferred entities absent: the two smallest identifiers are compared.
    let mut cfg = cfg_for("NoSuch.a", "NoSuch.b");
    cfg.metrics = vec!["successRate".to_string()];
    cfg.ratios.clear();

    let records = load_long(&input)?;
    let artifacts = run(Export::Long(records), &cfg)?;

    assert_eq!(
        artifacts.metrics[0].entities,
        vec!["Alpha", "Mid", "Zeta"]
    );
    let pair = &artifacts.pairs[0];
    assert_eq!(pair.entities, vec!["Alpha", "Mid"]);

    // Summary rows appear in computation order: mean first, then final.
    assert_eq!(artifacts.summary[0].label, "Mean successRate");
    assert_eq!(artifacts.summary[1].label, "Final successRate");
    Ok(())
}
