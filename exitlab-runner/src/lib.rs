//! ExitLab Runner: Monte-Carlo simulation, grid search, configuration, export.
//!
//! This crate builds on `exitlab-core` to provide:
//! - The simulator that runs a policy over many seeded episodes
//! - Exhaustive grid search over policy parameters
//! - TOML experiment configuration with run fingerprinting
//! - Historical trajectory loading from CSV
//! - CSV and versioned JSON export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod simulator;
pub mod sweep;

pub use config::{
    ConfigError, ExperimentConfig, ModelConfig, ProcessConfig, RunId, SimulationConfig,
    SweepConfig,
};
pub use data_loader::{load_trajectories, read_trajectories, LoadError};
pub use export::{
    export_grid_csv, export_grid_json, export_pivot_csv, export_run_json, export_trace_csv,
    import_grid_json, import_run_json, load_grid_report, save_run_artifacts,
    save_sweep_artifacts, GridReport, RunReport, SCHEMA_VERSION,
};
pub use simulator::{percentile_sorted, Objective, RunResult, RunStats, Simulator};
pub use sweep::{
    select_best, GridAxis, GridRun, GridSearch, GridSearchResult, InvalidCombination,
    ParamGrid, PivotTable, RunStatus, SweepOptions,
};
