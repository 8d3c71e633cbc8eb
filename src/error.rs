//! Error types for loading the dataset and answering queries.

use std::path::PathBuf;

/// Failures while building the [`DatasetTable`](crate::dataset::DatasetTable).
///
/// Every variant is fatal at startup: a process that cannot load its dataset
/// never becomes ready to serve queries.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read dataset source {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch dataset from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to decompress dataset: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("malformed CSV in dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataset loader task failed: {0}")]
    LoaderTask(#[from] tokio::task::JoinError),

    #[error("dataset is missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },
}

/// Rejected query arguments. These are caller errors and never leave the
/// shared table in a different state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("invalid date {0:?}, expected e.g. 2021-09-29")]
    InvalidDate(String),

    #[error("unknown zone {0:?}, expected one of all, 1, 2, 3")]
    UnknownZone(String),

    #[error("unknown person group {0:?}, expected one of all, adults, children")]
    UnknownGroup(String),
}
