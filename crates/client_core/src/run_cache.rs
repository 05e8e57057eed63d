//! Every mutation is confirm-then-apply: the remote call completes first and
//! local state changes only on success. The lock is never held across a
//! remote call, so overlapping operations apply in completion order.

use std::collections::HashSet;

use shared::{domain::RunId, protocol::RunRecord};
use tokio::sync::Mutex;
use tracing::info;

use crate::{error::RequestFailure, remote::SimulationApi};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkDeleteOutcome {
    NothingToDelete,
    Deleted {
        /// Count reported by the server; authoritative.
        deleted_count: u64,
        predicted: usize,
    },
}

pub struct RunCache {
    api: SimulationApi,
    runs: Mutex<Option<Vec<RunRecord>>>,
}

impl RunCache {
    pub fn new(api: SimulationApi) -> Self {
        Self {
            api,
            runs: Mutex::new(None),
        }
    }

    /// Replaces the cache with the server's full list. On failure any prior
    /// cache is kept as is.
    pub async fn load(&self) -> Result<Vec<RunRecord>, RequestFailure> {
        let fetched = self.api.list_runs().await?;
        let mut seen = HashSet::new();
        let runs = fetched
            .into_iter()
            .filter(|run| seen.insert(run.id))
            .collect::<Vec<_>>();
        info!(count = runs.len(), "runs: cache loaded");
        *self.runs.lock().await = Some(runs.clone());
        Ok(runs)
    }

    pub async fn set_starred(&self, id: RunId, starred: bool) -> Result<(), RequestFailure> {
        self.api.set_run_starred(id, starred).await?;
        if let Some(runs) = self.runs.lock().await.as_mut() {
            if let Some(run) = runs.iter_mut().find(|run| run.id == id) {
                run.starred = starred;
            }
        }
        info!(run_id = %id, starred, "runs: star updated");
        Ok(())
    }

    pub async fn delete(&self, id: RunId) -> Result<(), RequestFailure> {
        self.api.delete_run(id).await?;
        if let Some(runs) = self.runs.lock().await.as_mut() {
            runs.retain(|run| run.id != id);
        }
        info!(run_id = %id, "runs: run deleted");
        Ok(())
    }

    pub async fn delete_all_unstarred(&self) -> Result<BulkDeleteOutcome, RequestFailure> {
        let predicted = self.unstarred_count().await;
        if predicted == 0 {
            return Ok(BulkDeleteOutcome::NothingToDelete);
        }

        let response = self.api.delete_unstarred_runs().await?;
        if let Some(runs) = self.runs.lock().await.as_mut() {
            runs.retain(|run| run.starred);
        }
        if response.deleted_count != predicted as u64 {
            info!(
                predicted,
                deleted_count = response.deleted_count,
                "runs: server deleted a different number of runs than cached"
            );
        }
        info!(deleted_count = response.deleted_count, "runs: unstarred runs deleted");
        Ok(BulkDeleteOutcome::Deleted {
            deleted_count: response.deleted_count,
            predicted,
        })
    }

    pub async fn snapshot(&self) -> Option<Vec<RunRecord>> {
        self.runs.lock().await.clone()
    }

    pub async fn get(&self, id: RunId) -> Option<RunRecord> {
        self.runs
            .lock()
            .await
            .as_ref()
            .and_then(|runs| runs.iter().find(|run| run.id == id).cloned())
    }

    pub async fn unstarred_count(&self) -> usize {
        self.runs
            .lock()
            .await
            .as_ref()
            .map(|runs| runs.iter().filter(|run| !run.starred).count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "tests/run_cache_tests.rs"]
mod tests;
