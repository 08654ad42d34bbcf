//! # Lifecycle
//!
//! Client-side replica of the contract's task state machine. Everything here
//! is a pure function of `(task, caller, now)`, so the same check can run
//! when rendering the available buttons and again right before building a
//! transaction.
//!
//! | From                | Action       | Caller                       | To        |
//! |---------------------|--------------|------------------------------|-----------|
//! | Open                | `claim`      | not the client               | Claimed   |
//! | Claimed             | `submitWork` | the freelancer               | Submitted |
//! | Submitted           | `approve`    | the client                   | Approved  |
//! | Submitted           | `reject`     | the client                   | Rejected  |
//! | Open, Claimed       | `refund`     | the client, or deadline past | Refunded  |
//!
//! `Rejected` means "claimed, awaiting new proof": the freelancer may submit
//! again. Refund is not available from `Rejected`; the contract only refunds
//! `Open` and `Claimed` tasks.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::errors::{BoardError, Result};
use crate::types::{Task, TaskStatus};

/// A contract entry point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Claim,
    SubmitWork,
    Approve,
    Reject,
    Refund,
}

impl Action {
    /// Actions that operate on an existing task.
    pub const TASK_ACTIONS: [Action; 5] = [
        Action::Claim,
        Action::SubmitWork,
        Action::Approve,
        Action::Reject,
        Action::Refund,
    ];

    /// First application argument the contract routes on.
    pub fn method_tag(self) -> &'static str {
        match self {
            Action::Create => "create_task",
            Action::Claim => "claim_task",
            Action::SubmitWork => "submit_work",
            Action::Approve => "approve_task",
            Action::Reject => "reject_task",
            Action::Refund => "refund_task",
        }
    }

    pub fn from_method_tag(tag: &str) -> Option<Self> {
        [Action::Create]
            .into_iter()
            .chain(Action::TASK_ACTIONS)
            .find(|a| a.method_tag() == tag)
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Create => "create",
            Action::Claim => "claim",
            Action::SubmitWork => "submit work on",
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Refund => "refund",
        };
        f.write_str(name)
    }
}

/// Small set of [`Action`]s.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ActionSet(u8);

impl ActionSet {
    pub const EMPTY: ActionSet = ActionSet(0);

    pub fn insert(&mut self, action: Action) {
        self.0 |= action.bit();
    }

    pub fn contains(&self, action: Action) -> bool {
        self.0 & action.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = Action> + '_ {
        Action::TASK_ACTIONS
            .into_iter()
            .filter(move |a| self.contains(*a))
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        let mut set = ActionSet::EMPTY;
        for action in iter {
            set.insert(action);
        }
        set
    }
}

impl fmt::Debug for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Serialize for ActionSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl TaskStatus {
    /// Bare transition graph, ignoring who calls and when.
    pub fn next(self, action: Action) -> Option<TaskStatus> {
        use TaskStatus::*;
        match (self, action) {
            (Open, Action::Claim) => Some(Claimed),
            (Claimed | Rejected, Action::SubmitWork) => Some(Submitted),
            (Submitted, Action::Approve) => Some(Approved),
            (Submitted, Action::Reject) => Some(Rejected),
            (Open | Claimed, Action::Refund) => Some(Refunded),
            _ => None,
        }
    }
}

/// Why `caller` may not perform `action` on `task` right now, if anything.
fn denial(task: &Task, caller: &Address, now: u64, action: Action) -> Option<String> {
    if task.status.is_terminal() {
        return Some(format!("task is {} (terminal)", task.status));
    }
    if task.status.next(action).is_none() {
        return Some(format!("not allowed while task is {}", task.status));
    }
    match action {
        Action::Claim if task.is_client(caller) => {
            Some("the client cannot claim their own task".to_string())
        }
        Action::SubmitWork if !task.is_freelancer(caller) => {
            Some("only the assigned freelancer can submit work".to_string())
        }
        Action::Approve | Action::Reject if !task.is_client(caller) => {
            Some("only the client can review submitted work".to_string())
        }
        Action::Refund if !task.is_client(caller) && !task.is_expired(now) => {
            Some("only the client can refund before the deadline".to_string())
        }
        _ => None,
    }
}

/// Every action `caller` may take on `task` at time `now`.
pub fn legal_actions(task: &Task, caller: &Address, now: u64) -> ActionSet {
    Action::TASK_ACTIONS
        .into_iter()
        .filter(|a| denial(task, caller, now, *a).is_none())
        .collect()
}

/// Validate one action and return the status the contract will move to.
pub fn check(task: &Task, caller: &Address, now: u64, action: Action) -> Result<TaskStatus> {
    if let Some(reason) = denial(task, caller, now, action) {
        return Err(BoardError::precondition(action, Some(task.task_id), reason));
    }
    task.status
        .next(action)
        .ok_or_else(|| BoardError::precondition(action, Some(task.task_id), "no transition"))
}
