//! # BountyBoard client
//!
//! Client-side mirror of the **BountyBoard** escrow contract: a client posts a
//! task with an escrowed reward, a freelancer claims and completes it, and the
//! client approves (releasing funds) or rejects it, or the task is refunded.
//!
//! | Phase        | Entry Point(s)                                              |
//! |--------------|-------------------------------------------------------------|
//! | Reading      | [`TaskRepository::get_task`], [`TaskRepository::get_all_tasks`] and the `get_tasks_by_*` filters |
//! | Deciding     | [`lifecycle::legal_actions`], [`lifecycle::check`]           |
//! | Building     | [`TransactionBuilder`] (`build_create`, `build_claim`, …)   |
//! | Submitting   | [`TaskWorkflow`] over an injected [`OperationSubmitter`]    |
//!
//! ## Architecture
//!
//! Byte layouts live in [`codec`] and [`address`]. The contract's rules live
//! in [`lifecycle`]. Network access is never performed here: reads go
//! through [`LedgerReader`], fee parameters through [`ParamsSource`] and
//! submission through [`OperationSubmitter`], all supplied by the caller.

pub mod address;
pub mod codec;
pub mod display;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod repository;
pub mod transactions;
pub mod types;
pub mod workflow;

#[cfg(test)]
mod memory_ledger;
#[cfg(test)]
mod test_lifecycle;
#[cfg(test)]
mod test_listing;

pub use address::Address;
pub use errors::{BoardError, Result};
pub use events::{ContractEvent, EventKind};
pub use lifecycle::{Action, ActionSet};
pub use repository::{
    GlobalState, GlobalValue, LedgerReader, ListingFailure, TaskListing, TaskRepository,
};
pub use transactions::{
    ActionRequest, AtomicGroup, BoxRef, GroupId, Operation, OperationKind, SuggestedParams,
    TaskDraft, TransactionBuilder,
};
pub use types::{Assignee, ContractInfo, Task, TaskStatus};
pub use workflow::{Confirmation, OperationSubmitter, Outcome, ParamsSource, TaskWorkflow};
