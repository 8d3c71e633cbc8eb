//! Shares one loaded [`DatasetTable`] between concurrent queries.
//!
//! The table is published through a `watch` channel once the loader has
//! finished. Queries issued earlier wait for it, so nobody ever reads a
//! partially built table.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{Instrument, error, info, info_span};

use crate::dataset::{self, DatasetSource, DatasetTable};
use crate::error::{DatasetError, QueryError};
use crate::query::{self, HourlyRecord, LocationGroup};

#[derive(Debug, Clone)]
pub enum LoadState {
    Loading,
    Ready(Arc<DatasetTable>),
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("dataset failed to load: {0}")]
    Load(String),

    #[error("dataset loader stopped before publishing a table")]
    Closed,

    #[error(transparent)]
    Query(#[from] QueryError),
}

fn settled(state: &LoadState) -> Option<Result<Arc<DatasetTable>, ServiceError>> {
    match state {
        LoadState::Loading => None,
        LoadState::Ready(table) => Some(Ok(Arc::clone(table))),
        LoadState::Failed(reason) => Some(Err(ServiceError::Load(reason.clone()))),
    }
}

/// Cheap to clone; every clone sees the same table.
#[derive(Debug, Clone)]
pub struct DatasetService {
    state: watch::Receiver<LoadState>,
}

impl DatasetService {
    /// Starts loading `source` in the background.
    pub fn spawn(source: DatasetSource) -> Self {
        Self::from_loader(async move { dataset::load(&source).await })
    }

    /// Runs `loader` on the runtime and publishes whatever it produces.
    pub fn from_loader<F>(loader: F) -> Self
    where
        F: Future<Output = Result<DatasetTable, DatasetError>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(LoadState::Loading);

        tokio::spawn(
            async move {
                let state = match loader.await {
                    Ok(table) => {
                        info!(rows = table.len(), "Dataset ready");
                        LoadState::Ready(Arc::new(table))
                    }
                    Err(e) => {
                        error!(error = %e, "Dataset load failed");
                        LoadState::Failed(e.to_string())
                    }
                };
                let _ = tx.send(state);
            }
            .instrument(info_span!("dataset_load")),
        );

        Self { state: rx }
    }

    /// A service over an already loaded table.
    pub fn from_table(table: DatasetTable) -> Self {
        let (_tx, rx) = watch::channel(LoadState::Ready(Arc::new(table)));
        Self { state: rx }
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.state.borrow(), LoadState::Ready(_))
    }

    /// Waits for the load to finish and returns the shared table.
    pub async fn table(&self) -> Result<Arc<DatasetTable>, ServiceError> {
        let current = settled(&self.state.borrow());
        if let Some(result) = current {
            return result;
        }

        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|s| !matches!(s, LoadState::Loading))
            .await
            .map_err(|_| ServiceError::Closed)?;
        settled(&state).unwrap_or(Err(ServiceError::Closed))
    }

    pub async fn pedestrian_data(
        &self,
        location: &str,
        date: &str,
        zone: &str,
    ) -> Result<Vec<HourlyRecord>, ServiceError> {
        let table = self.table().await?;
        Ok(query::pedestrian_data(&table, location, date, zone)?)
    }

    pub async fn locations(&self, date: &str) -> Result<Vec<LocationGroup>, ServiceError> {
        let table = self.table().await?;
        Ok(query::locations(&table, date)?)
    }
}
