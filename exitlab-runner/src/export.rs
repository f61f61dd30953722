//! Result export: CSV tables and versioned JSON reports.
//!
//! JSON reports carry a `schema_version`; versions newer than this build
//! understands are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use exitlab_core::domain::{EpisodeOutcome, PolicyParameters, TraceRow};
use exitlab_core::PolicyKind;

use crate::config::RunId;
use crate::simulator::{Objective, RunResult, RunStats};
use crate::sweep::{GridSearchResult, PivotTable, SweepOptions};

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

// ─── Reports ────────────────────────────────────────────────────────

/// Summary of one simulator run. The per-step trace goes to CSV instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub schema_version: u32,
    #[serde(default)]
    pub run_id: Option<RunId>,
    pub seed: u64,
    pub policy: PolicyKind,
    pub parameters: PolicyParameters,
    pub n_episodes: usize,
    pub objective_kind: Objective,
    pub objective: f64,
    pub stats: RunStats,
    pub outcomes: Vec<EpisodeOutcome>,
}

impl RunReport {
    pub fn new(result: &RunResult, seed: u64, run_id: Option<RunId>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            run_id,
            seed,
            policy: result.policy,
            parameters: result.parameters.clone(),
            n_episodes: result.n_episodes,
            objective_kind: result.objective_kind,
            objective: result.objective,
            stats: result.stats,
            outcomes: result.outcomes.clone(),
        }
    }
}

/// A grid search result plus the options it ran under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridReport {
    pub schema_version: u32,
    #[serde(default)]
    pub run_id: Option<RunId>,
    pub policy: PolicyKind,
    pub options: SweepOptions,
    pub result: GridSearchResult,
}

impl GridReport {
    pub fn new(
        result: GridSearchResult,
        policy: PolicyKind,
        options: SweepOptions,
        run_id: Option<RunId>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            run_id,
            policy,
            options,
            result,
        }
    }
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_run_json(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize RunReport to JSON")
}

pub fn import_run_json(json: &str) -> Result<RunReport> {
    let report: RunReport =
        serde_json::from_str(json).context("failed to deserialize RunReport from JSON")?;
    check_schema(report.schema_version)?;
    Ok(report)
}

pub fn export_grid_json(report: &GridReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize GridReport to JSON")
}

pub fn import_grid_json(json: &str) -> Result<GridReport> {
    let report: GridReport =
        serde_json::from_str(json).context("failed to deserialize GridReport from JSON")?;
    check_schema(report.schema_version)?;
    Ok(report)
}

fn check_schema(version: u32) -> Result<()> {
    if version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            version,
            SCHEMA_VERSION
        );
    }
    Ok(())
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: episode_index, time_step, price, action
pub fn export_trace_csv(rows: &[TraceRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["episode_index", "time_step", "price", "action"])?;
    for r in rows {
        wtr.write_record([
            &r.episode_index.to_string(),
            &r.time_step.to_string(),
            &format!("{:.6}", r.price),
            r.action.as_str(),
        ])?;
    }
    finish(wtr)
}

/// One column per swept parameter, then `performance` and `status`.
///
/// Invalid combinations print their sentinel performance as `-inf`.
pub fn export_grid_csv(result: &GridSearchResult) -> Result<String> {
    let names = result.axis_names();
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header: Vec<&str> = names.clone();
    header.extend(["performance", "status"]);
    wtr.write_record(&header)?;

    for run in &result.all_runs {
        let mut record: Vec<String> = names
            .iter()
            .map(|n| {
                run.parameters
                    .get(n)
                    .map(|v| v.to_string())
                    .unwrap_or_default()
            })
            .collect();
        record.push(format!("{:.6}", run.performance));
        record.push(if run.is_valid() { "valid" } else { "invalid" }.to_string());
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

/// Two-axis matrix; the corner cell names both axes, missing cells are blank.
pub fn export_pivot_csv(pivot: &PivotTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec![format!("{}\\{}", pivot.row_axis, pivot.col_axis)];
    header.extend(pivot.col_values.iter().map(|v| v.to_string()));
    wtr.write_record(&header)?;

    for (rv, cells) in pivot.row_values.iter().zip(&pivot.cells) {
        let mut record = vec![rv.to_string()];
        record.extend(
            cells
                .iter()
                .map(|c| c.map(|p| format!("{p:.6}")).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `trace.csv` and `run.json` under `output_dir`.
pub fn save_run_artifacts(
    result: &RunResult,
    report: &RunReport,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    create_dir(output_dir)?;
    let trace = write(output_dir, "trace.csv", &export_trace_csv(&result.rows)?)?;
    let json = write(output_dir, "run.json", &export_run_json(report)?)?;
    info!(dir = %output_dir.display(), rows = result.rows.len(), "saved run artifacts");
    Ok(vec![trace, json])
}

/// Write `grid.csv`, `grid.json` and, for two swept axes, `pivot.csv`.
pub fn save_sweep_artifacts(report: &GridReport, output_dir: &Path) -> Result<Vec<PathBuf>> {
    create_dir(output_dir)?;
    let mut written = vec![
        write(output_dir, "grid.csv", &export_grid_csv(&report.result)?)?,
        write(output_dir, "grid.json", &export_grid_json(report)?)?,
    ];
    if let [row, col] = report.result.axis_names().as_slice() {
        let pivot = report.result.pivot(row, col)?;
        written.push(write(output_dir, "pivot.csv", &export_pivot_csv(&pivot)?)?);
    }
    info!(dir = %output_dir.display(), files = written.len(), "saved sweep artifacts");
    Ok(written)
}

/// Load a grid report back from an artifact directory.
pub fn load_grid_report(dir: &Path) -> Result<GridReport> {
    let path = dir.join("grid.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_grid_json(&json)
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create artifact dir: {}", dir.display()))
}

fn write(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, contents)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::{GridAxis, GridRun, RunStatus};
    use exitlab_core::Action;

    fn params(low: f64, high: f64) -> PolicyParameters {
        PolicyParameters::new()
            .with("theta_low", low)
            .with("theta_high", high)
    }

    fn sample_grid() -> GridSearchResult {
        let run = |low, high, perf, status| GridRun {
            parameters: params(low, high),
            performance: perf,
            status,
        };
        GridSearchResult {
            axes: vec![
                GridAxis::new("theta_low", vec![10.0, 15.0]),
                GridAxis::new("theta_high", vec![25.0, 30.0]),
            ],
            best_parameters: params(10.0, 30.0),
            best_performance: 21.5,
            all_runs: vec![
                run(10.0, 25.0, 20.0, RunStatus::Valid),
                run(10.0, 30.0, 21.5, RunStatus::Valid),
                run(15.0, 25.0, 19.0, RunStatus::Valid),
                run(
                    15.0,
                    30.0,
                    f64::NEG_INFINITY,
                    RunStatus::Invalid {
                        reason: "bad".into(),
                    },
                ),
            ],
            n_episodes: 10,
            seed: 42,
        }
    }

    #[test]
    fn trace_csv_columns() {
        let rows = vec![
            TraceRow {
                episode_index: 0,
                time_step: 0,
                price: 20.0,
                action: Action::Hold,
            },
            TraceRow {
                episode_index: 0,
                time_step: 1,
                price: 14.5,
                action: Action::Sell,
            },
        ];
        let csv = export_trace_csv(&rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "episode_index,time_step,price,action");
        assert_eq!(lines[1], "0,0,20.000000,hold");
        assert_eq!(lines[2], "0,1,14.500000,sell");
    }

    #[test]
    fn grid_csv_has_one_row_per_run() {
        let csv = export_grid_csv(&sample_grid()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "theta_low,theta_high,performance,status");
        assert_eq!(lines[1], "10,25,20.000000,valid");
        assert_eq!(lines[4], "15,30,-inf,invalid");
    }

    #[test]
    fn pivot_csv_matrix() {
        let pivot = sample_grid().pivot("theta_low", "theta_high").unwrap();
        let csv = export_pivot_csv(&pivot).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "theta_low\\theta_high,25,30");
        assert_eq!(lines[1], "10,20.000000,21.500000");
        assert_eq!(lines[2], "15,19.000000,-inf");
    }

    #[test]
    fn grid_json_roundtrip_keeps_sentinel() {
        let report = GridReport::new(
            sample_grid(),
            PolicyKind::HighLow,
            SweepOptions::default(),
            Some("abc".into()),
        );
        let json = export_grid_json(&report).unwrap();
        assert!(json.contains("\"schema_version\": 1"));
        let back = import_grid_json(&json).unwrap();
        assert_eq!(back, report);
        assert_eq!(back.result.all_runs[3].performance, f64::NEG_INFINITY);
    }

    #[test]
    fn newer_schema_rejected() {
        let mut report = GridReport::new(
            sample_grid(),
            PolicyKind::HighLow,
            SweepOptions::default(),
            None,
        );
        report.schema_version = SCHEMA_VERSION + 1;
        let json = serde_json::to_string(&report).unwrap();
        let err = import_grid_json(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn json_keeps_full_float_precision() {
        let mut grid = sample_grid();
        grid.all_runs[0].performance = 22.809946932426502;
        grid.best_performance = 22.809946932426502;
        let report = GridReport::new(grid, PolicyKind::HighLow, SweepOptions::default(), None);
        let back = import_grid_json(&export_grid_json(&report).unwrap()).unwrap();
        assert_eq!(back.result.all_runs[0].performance.to_bits(), 22.809946932426502f64.to_bits());
        assert_eq!(back, report);
    }
}
