//! # Types
//!
//! Shared data structures used across all modules of the BountyBoard client.
//!
//! ## Design decisions
//!
//! ### Explicit assignee
//!
//! On the ledger an unclaimed task stores the all-zero address in its
//! freelancer slot. In memory that slot is an [`Assignee`], so "nobody" can
//! never be compared equal to a real caller by accident. The codec maps
//! between the two representations.
//!
//! ### Status as a Finite-State Machine
//!
//! [`TaskStatus`] follows the contract's forward-only lifecycle:
//!
//! ```text
//! Open ──► Claimed ──► Submitted ──► Approved
//!   │         ▲  │          │
//!   │         │  │          ▼
//!   │         └──┼───── Rejected
//!   ▼            ▼
//! Refunded ◄─────┘
//! ```
//!
//! `Approved` and `Refunded` are terminal. The legal moves live in
//! [`crate::lifecycle`].

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::errors::{BoardError, Result};

/// Lifecycle status of a task, with the contract's byte values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TaskStatus {
    /// Funded and waiting for a freelancer.
    Open = 0,
    /// A freelancer has claimed it.
    Claimed = 1,
    /// Proof of work is awaiting the client's review.
    Submitted = 2,
    /// Escrow paid out to the freelancer.
    Approved = 3,
    /// Work was turned down; the freelancer may resubmit.
    Rejected = 4,
    /// Escrow returned to the client.
    Refunded = 5,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::Open,
        TaskStatus::Claimed,
        TaskStatus::Submitted,
        TaskStatus::Approved,
        TaskStatus::Rejected,
        TaskStatus::Refunded,
    ];

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(TaskStatus::Open),
            1 => Ok(TaskStatus::Claimed),
            2 => Ok(TaskStatus::Submitted),
            3 => Ok(TaskStatus::Approved),
            4 => Ok(TaskStatus::Rejected),
            5 => Ok(TaskStatus::Refunded),
            other => Err(BoardError::InvalidStatus(other)),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Approved | TaskStatus::Refunded)
    }

    /// Lower-case name, matching the serde form.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::Claimed => "claimed",
            TaskStatus::Submitted => "submitted",
            TaskStatus::Approved => "approved",
            TaskStatus::Rejected => "rejected",
            TaskStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who holds the task. Serialized as the address, or `null` when unassigned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Assignee {
    #[default]
    Unassigned,
    /// Never the zero address, which is the wire form of `Unassigned`. Build
    /// from ledger data with [`Assignee::from_wire`].
    Assigned(Address),
}

impl Assignee {
    /// Map the wire sentinel (all-zero address) to `Unassigned`.
    pub fn from_wire(address: Address) -> Self {
        if address.is_zero() {
            Assignee::Unassigned
        } else {
            Assignee::Assigned(address)
        }
    }

    pub fn to_wire(self) -> Address {
        match self {
            Assignee::Unassigned => Address::ZERO,
            Assignee::Assigned(address) => address,
        }
    }

    pub fn address(&self) -> Option<&Address> {
        match self {
            Assignee::Unassigned => None,
            Assignee::Assigned(address) => Some(address),
        }
    }

    /// True only for a real assignment to `who`; never for `Unassigned`.
    pub fn is(&self, who: &Address) -> bool {
        matches!(self, Assignee::Assigned(address) if address == who)
    }
}

impl Serialize for Assignee {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.address().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Assignee {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(Option::<Address>::deserialize(deserializer)?
            .map(Assignee::from_wire)
            .unwrap_or_default())
    }
}

/// One escrowed work item, as read back from its storage box.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Assigned by the contract's counter; never reused.
    pub task_id: u64,
    /// Creator and funder.
    pub client: Address,
    pub freelancer: Assignee,
    /// Escrowed reward in minor units.
    pub amount: u64,
    /// Unix timestamp (seconds).
    pub deadline: u64,
    pub status: TaskStatus,
    pub title: String,
    pub description: String,
    /// URL or content hash of the delivered work; empty until submitted.
    pub proof_hash: String,
}

impl Task {
    pub fn is_client(&self, who: &Address) -> bool {
        &self.client == who
    }

    pub fn is_freelancer(&self, who: &Address) -> bool {
        self.freelancer.is(who)
    }

    /// Strictly after the deadline, like the contract's timestamp check.
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.deadline
    }
}

/// Static binding to one deployed BountyBoard application.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractInfo {
    pub app_id: u64,
    /// Custody address holding escrowed funds.
    pub app_address: Address,
    pub network: String,
}

impl ContractInfo {
    /// Parse the `contract.json` deployment artifact. Unknown keys are ignored.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| BoardError::Config(format!("invalid contract info: {e}")))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BoardError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }
}
