//! # Repository
//!
//! Read side of the board. Records are fetched through a [`LedgerReader`]
//! supplied by the caller and decoded with [`crate::codec`]. Nothing is
//! cached: every query goes back to the ledger.
//!
//! ## Listing policy
//!
//! [`TaskRepository::get_all_tasks`] reads the contract's `task_counter` and
//! then fetches ids `1..=counter`. A record that is missing, corrupt or fails
//! to load is logged and reported in [`TaskListing::failures`]; the rest of
//! the listing still comes back. Only failing to read the counter itself is
//! fatal.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use crate::address::Address;
use crate::codec::{self, task_box_name, TASK_COUNTER_KEY};
use crate::errors::{BoardError, Result};
use crate::types::{ContractInfo, Task, TaskStatus};

/// Default number of box reads in flight during a listing.
pub const DEFAULT_LISTING_CONCURRENCY: usize = 8;

/// A value in the application's global key/value state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GlobalValue {
    Uint(u64),
    Bytes(Vec<u8>),
}

pub type GlobalState = HashMap<Vec<u8>, GlobalValue>;

/// Read access to application storage.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Raw box contents, or `None` when the box does not exist.
    async fn read_box(&self, app_id: u64, name: &[u8]) -> Result<Option<Vec<u8>>>;

    async fn read_global_state(&self, app_id: u64) -> Result<GlobalState>;
}

#[async_trait]
impl<T: LedgerReader + ?Sized> LedgerReader for Arc<T> {
    async fn read_box(&self, app_id: u64, name: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).read_box(app_id, name).await
    }

    async fn read_global_state(&self, app_id: u64) -> Result<GlobalState> {
        (**self).read_global_state(app_id).await
    }
}

/// A task id skipped during a listing, and why.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ListingFailure {
    pub task_id: u64,
    pub reason: String,
}

/// Result of a listing pass: what decoded, plus what didn't.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TaskListing {
    pub tasks: Vec<Task>,
    pub failures: Vec<ListingFailure>,
}

impl TaskListing {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Keep only tasks matching `keep`; failures are carried over.
    pub fn filter(self, keep: impl Fn(&Task) -> bool) -> TaskListing {
        TaskListing {
            tasks: self.tasks.into_iter().filter(|t| keep(t)).collect(),
            failures: self.failures,
        }
    }
}

pub struct TaskRepository<R> {
    contract: ContractInfo,
    reader: R,
    concurrency: usize,
}

impl<R: LedgerReader> TaskRepository<R> {
    pub fn new(contract: ContractInfo, reader: R) -> Self {
        TaskRepository {
            contract,
            reader,
            concurrency: DEFAULT_LISTING_CONCURRENCY,
        }
    }

    /// Bound the number of concurrent box reads while listing (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn contract(&self) -> &ContractInfo {
        &self.contract
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// `Ok(None)` when the task's box does not exist.
    pub async fn get_task(&self, task_id: u64) -> Result<Option<Task>> {
        let name = task_box_name(task_id);
        let Some(bytes) = self.reader.read_box(self.contract.app_id, &name).await? else {
            debug!("Task {task_id} has no box");
            return Ok(None);
        };
        codec::decode(task_id, &bytes).map(Some)
    }

    /// Number of tasks ever created; `0` when the counter was never written.
    pub async fn task_count(&self) -> Result<u64> {
        let state = self.reader.read_global_state(self.contract.app_id).await?;
        match state.get(TASK_COUNTER_KEY) {
            None => Ok(0),
            Some(GlobalValue::Uint(n)) => Ok(*n),
            Some(GlobalValue::Bytes(_)) => Err(BoardError::Ledger(
                "task_counter holds bytes instead of an integer".to_string(),
            )),
        }
    }

    pub async fn get_all_tasks(&self) -> Result<TaskListing> {
        let count = self.task_count().await?;
        debug!("Listing {count} tasks (concurrency {})", self.concurrency);

        let results: Vec<(u64, Result<Option<Task>>)> = stream::iter(1..=count)
            .map(|id| async move { (id, self.get_task(id).await) })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut listing = TaskListing::default();
        for (task_id, result) in results {
            match result {
                Ok(Some(task)) => listing.tasks.push(task),
                Ok(None) => {
                    warn!("Skipping task {task_id}: box not found");
                    listing.failures.push(ListingFailure {
                        task_id,
                        reason: "box not found".to_string(),
                    });
                }
                Err(e) => {
                    warn!("Skipping task {task_id}: {e}");
                    listing.failures.push(ListingFailure {
                        task_id,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(listing)
    }

    pub async fn get_tasks_by_status(&self, status: TaskStatus) -> Result<TaskListing> {
        Ok(self.get_all_tasks().await?.filter(|t| t.status == status))
    }

    pub async fn get_tasks_by_client(&self, client: &Address) -> Result<TaskListing> {
        Ok(self.get_all_tasks().await?.filter(|t| t.is_client(client)))
    }

    /// Never matches unassigned tasks, even when asked for the zero address.
    pub async fn get_tasks_by_freelancer(&self, freelancer: &Address) -> Result<TaskListing> {
        Ok(self
            .get_all_tasks()
            .await?
            .filter(|t| t.is_freelancer(freelancer)))
    }
}
