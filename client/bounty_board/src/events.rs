//! Log events emitted by the BountyBoard contract.
//!
//! Every successful entry point logs `"<kind>:"` followed by the task id as
//! an 8-byte big-endian integer.

use serde::{Deserialize, Serialize};

use crate::lifecycle::Action;

/// All recognised event kinds from the BountyBoard contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A task was funded and created (`task_created`).
    TaskCreated,
    /// A freelancer claimed a task (`task_claimed`).
    TaskClaimed,
    /// Proof of work was submitted (`work_submitted`).
    WorkSubmitted,
    /// The client approved and escrow was paid out (`task_approved`).
    TaskApproved,
    /// The client rejected the submission (`task_rejected`).
    TaskRejected,
    /// Escrow went back to the client (`task_refunded`).
    TaskRefunded,
    /// A well-formed log line we don't recognise yet.
    Unknown,
}

impl EventKind {
    /// Parse the log prefix (without the trailing `:`) into an [`EventKind`].
    pub fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "task_created" => Self::TaskCreated,
            "task_claimed" => Self::TaskClaimed,
            "work_submitted" => Self::WorkSubmitted,
            "task_approved" => Self::TaskApproved,
            "task_rejected" => Self::TaskRejected,
            "task_refunded" => Self::TaskRefunded,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskCreated => "task_created",
            Self::TaskClaimed => "task_claimed",
            Self::WorkSubmitted => "work_submitted",
            Self::TaskApproved => "task_approved",
            Self::TaskRejected => "task_rejected",
            Self::TaskRefunded => "task_refunded",
            Self::Unknown => "unknown",
        }
    }

    /// The event a confirmed `action` is expected to log.
    pub fn for_action(action: Action) -> Self {
        match action {
            Action::Create => Self::TaskCreated,
            Action::Claim => Self::TaskClaimed,
            Action::SubmitWork => Self::WorkSubmitted,
            Action::Approve => Self::TaskApproved,
            Action::Reject => Self::TaskRejected,
            Action::Refund => Self::TaskRefunded,
        }
    }
}

/// A decoded contract log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEvent {
    pub kind: EventKind,
    pub prefix: String,
    pub task_id: u64,
}

impl ContractEvent {
    /// `None` for anything that isn't `<ascii prefix> ':' <8 bytes>`.
    pub fn decode(log: &[u8]) -> Option<Self> {
        if log.len() < 10 {
            return None;
        }
        let (head, id) = log.split_at(log.len() - 8);
        let prefix = head.strip_suffix(b":")?;
        if prefix.is_empty() || !prefix.iter().all(|b| b.is_ascii_graphic()) {
            return None;
        }
        let prefix = std::str::from_utf8(prefix).ok()?.to_string();
        let task_id = u64::from_be_bytes(id.try_into().ok()?);

        Some(ContractEvent {
            kind: EventKind::from_prefix(&prefix),
            prefix,
            task_id,
        })
    }
}

/// Decode every recognisable line of a confirmation's logs.
pub fn decode_logs(logs: &[Vec<u8>]) -> Vec<ContractEvent> {
    logs.iter().filter_map(|l| ContractEvent::decode(l)).collect()
}

/// Id assigned by the contract to a freshly created task.
pub fn created_task_id(logs: &[Vec<u8>]) -> Option<u64> {
    decode_logs(logs)
        .into_iter()
        .find(|e| e.kind == EventKind::TaskCreated)
        .map(|e| e.task_id)
}
