//! Historical trajectory loading.
//!
//! Reads the `episode_index,time_step,price` table handed over by the data
//! preparation step and validates it into a [`TrajectoryTable`].

use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use exitlab_core::data::{TrajectoryRow, TrajectoryTable};
use exitlab_core::SimError;

/// Errors from the trajectory loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read trajectory table '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("trajectory table '{}' is invalid: {source}", path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: SimError,
    },
}

/// Load and validate a trajectory table from a CSV file.
pub fn load_trajectories(path: &Path) -> Result<TrajectoryTable, LoadError> {
    let file = std::fs::File::open(path).map_err(|e| LoadError::Csv {
        path: path.to_path_buf(),
        source: csv::Error::from(e),
    })?;
    let table = read_trajectories(file, path)?;
    info!(
        path = %path.display(),
        trajectories = table.len(),
        min_len = table.min_len(),
        "loaded historical trajectories"
    );
    Ok(table)
}

/// Parse a trajectory table from any reader; `origin` labels errors.
pub fn read_trajectories<R: Read>(reader: R, origin: &Path) -> Result<TrajectoryTable, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let rows = rdr
        .deserialize::<TrajectoryRow>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| LoadError::Csv {
            path: origin.to_path_buf(),
            source: e,
        })?;
    TrajectoryTable::from_rows(rows).map_err(|e| LoadError::Table {
        path: origin.to_path_buf(),
        source: e,
    })
}
