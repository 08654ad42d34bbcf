//! # Workflow
//!
//! End-to-end lifecycle calls: read the task, check the action is legal,
//! build the operations, hand them to the submitter, then read the task back.
//!
//! The wallet, the node and the submitter are all injected, so the same flow
//! runs against a live network or an in-memory fake.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::address::Address;
use crate::errors::{BoardError, Result};
use crate::events::created_task_id;
use crate::lifecycle::{self, Action};
use crate::repository::{LedgerReader, TaskRepository};
use crate::transactions::{ActionRequest, Operation, SuggestedParams, TaskDraft, TransactionBuilder};
use crate::types::Task;

/// Source of the network's current fee and validity window.
#[async_trait]
pub trait ParamsSource: Send + Sync {
    async fn suggested_params(&self) -> Result<SuggestedParams>;
}

/// Outcome of a confirmed submission. Only the logs are interpreted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    /// Opaque reference (e.g. the first transaction id).
    pub reference: String,
    pub confirmed_round: Option<u64>,
    pub logs: Vec<Vec<u8>>,
}

/// Signs and submits operations, waiting for confirmation.
#[async_trait]
pub trait OperationSubmitter: Send + Sync {
    async fn submit(&self, operations: &[Operation]) -> Result<Confirmation>;
}

#[async_trait]
impl<T: ParamsSource + ?Sized> ParamsSource for Arc<T> {
    async fn suggested_params(&self) -> Result<SuggestedParams> {
        (**self).suggested_params().await
    }
}

#[async_trait]
impl<T: OperationSubmitter + ?Sized> OperationSubmitter for Arc<T> {
    async fn submit(&self, operations: &[Operation]) -> Result<Confirmation> {
        (**self).submit(operations).await
    }
}

/// What a lifecycle call did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub confirmation: Confirmation,
    /// The task as re-read after confirmation; `None` if it could not be found.
    pub task: Option<Task>,
}

pub struct TaskWorkflow<R, P, S> {
    repository: TaskRepository<R>,
    builder: TransactionBuilder,
    params: P,
    submitter: S,
}

impl<R, P, S> TaskWorkflow<R, P, S>
where
    R: LedgerReader,
    P: ParamsSource,
    S: OperationSubmitter,
{
    pub fn new(repository: TaskRepository<R>, params: P, submitter: S) -> Self {
        let builder = TransactionBuilder::new(repository.contract().clone());
        TaskWorkflow {
            repository,
            builder,
            params,
            submitter,
        }
    }

    pub fn repository(&self) -> &TaskRepository<R> {
        &self.repository
    }

    /// Fund and create a task. The new id is read from the contract's log.
    pub async fn create_task(&self, sender: &Address, draft: &TaskDraft, now: u64) -> Result<Outcome> {
        let params = self.params.suggested_params().await?;
        let group = self.builder.build_create(sender, draft, now, &params)?;
        info!("Submitting create group {}", group.group_id());

        let confirmation = self.submitter.submit(group.operations()).await?;
        let task = match created_task_id(&confirmation.logs) {
            Some(id) => self.repository.get_task(id).await?,
            None => {
                warn!("Create confirmed without a task_created log");
                None
            }
        };
        Ok(Outcome { confirmation, task })
    }

    /// Perform a lifecycle action on an existing task.
    pub async fn perform(
        &self,
        sender: &Address,
        task_id: u64,
        request: &ActionRequest,
        now: u64,
    ) -> Result<Outcome> {
        let task = self
            .repository
            .get_task(task_id)
            .await?
            .ok_or(BoardError::TaskNotFound(task_id))?;
        let action: Action = request.action();
        let expected = lifecycle::check(&task, sender, now, action)?;

        let params = self.params.suggested_params().await?;
        let operation = self.builder.build(sender, task_id, request, &params)?;
        info!("Submitting {action:?} for task {task_id} (expecting {expected})");

        let confirmation = self.submitter.submit(std::slice::from_ref(&operation)).await?;
        let task = self.repository.get_task(task_id).await?;
        Ok(Outcome { confirmation, task })
    }
}
