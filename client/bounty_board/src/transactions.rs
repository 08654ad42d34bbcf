//! # Transactions
//!
//! Builds the unsigned operations each lifecycle action needs. Builders are
//! pure: the network parameters they stamp on every operation are fetched by
//! the caller, and signing and submission happen elsewhere.
//!
//! ## Argument encoding
//!
//! Application arguments are positional byte strings. Argument 0 is the
//! method tag from [`Action::method_tag`]; integers are 8-byte big-endian;
//! text is UTF-8.
//!
//! | Action      | Args                                                  |
//! |-------------|-------------------------------------------------------|
//! | create      | `create_task, title, description, u64(deadline)`      |
//! | claim       | `claim_task, u64(id)`                                 |
//! | submit work | `submit_work, u64(id), proof`                         |
//! | approve     | `approve_task, u64(id)`                               |
//! | reject      | `reject_task, u64(id)`                                |
//! | refund      | `refund_task, u64(id)`                                |
//!
//! ## Atomic create
//!
//! Creating a task is a payment into escrow followed by the application call,
//! committed as one group. Both members carry the same [`GroupId`], derived
//! from the ordered member digests, so neither can land alone.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest, Sha512_256};

use crate::address::Address;
use crate::codec::{checked_text, task_box_name};
use crate::errors::{BoardError, Result};
use crate::lifecycle::Action;
use crate::types::ContractInfo;

const GROUP_DOMAIN: &[u8] = b"TG";

/// Fee and validity window supplied by the network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedParams {
    pub fee: u64,
    pub min_fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    /// Base64 as reported by the node.
    pub genesis_hash: String,
}

/// Box an application call needs access to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoxRef {
    pub app_id: u64,
    pub name: Vec<u8>,
}

/// Identifier shared by every member of an atomic group.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId([u8; 32]);

impl GroupId {
    /// Digest of the domain tag followed by each member's digest, in order.
    pub fn compute(operations: &[Operation]) -> Self {
        let mut hasher = Sha512_256::new();
        hasher.update(GROUP_DOMAIN);
        for op in operations {
            hasher.update(op.digest());
        }
        GroupId(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({self})")
    }
}

impl Serialize for GroupId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Payment {
        receiver: Address,
        amount: u64,
    },
    AppCall {
        app_id: u64,
        action: Action,
        args: Vec<Vec<u8>>,
        boxes: Vec<BoxRef>,
    },
}

/// One unsigned ledger operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operation {
    pub sender: Address,
    pub params: SuggestedParams,
    pub kind: OperationKind,
    pub group: Option<GroupId>,
}

impl Operation {
    pub fn action(&self) -> Option<Action> {
        match &self.kind {
            OperationKind::AppCall { action, .. } => Some(*action),
            OperationKind::Payment { .. } => None,
        }
    }

    pub fn args(&self) -> &[Vec<u8>] {
        match &self.kind {
            OperationKind::AppCall { args, .. } => args,
            OperationKind::Payment { .. } => &[],
        }
    }

    /// Deterministic byte form of everything except the group id.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(128);
        let params = &self.params;
        match &self.kind {
            OperationKind::Payment { .. } => out.push(b'P'),
            OperationKind::AppCall { .. } => out.push(b'A'),
        }
        out.extend_from_slice(self.sender.as_bytes());
        out.extend_from_slice(&params.fee.to_be_bytes());
        out.extend_from_slice(&params.first_valid.to_be_bytes());
        out.extend_from_slice(&params.last_valid.to_be_bytes());
        push_prefixed(&mut out, params.genesis_id.as_bytes());
        push_prefixed(&mut out, params.genesis_hash.as_bytes());
        match &self.kind {
            OperationKind::Payment { receiver, amount } => {
                out.extend_from_slice(receiver.as_bytes());
                out.extend_from_slice(&amount.to_be_bytes());
            }
            OperationKind::AppCall {
                app_id, args, boxes, ..
            } => {
                out.extend_from_slice(&app_id.to_be_bytes());
                out.extend_from_slice(&(args.len() as u32).to_be_bytes());
                for arg in args {
                    push_prefixed(&mut out, arg);
                }
                out.extend_from_slice(&(boxes.len() as u32).to_be_bytes());
                for b in boxes {
                    out.extend_from_slice(&b.app_id.to_be_bytes());
                    push_prefixed(&mut out, &b.name);
                }
            }
        }
        out
    }

    pub fn digest(&self) -> [u8; 32] {
        Sha512_256::digest(self.canonical_bytes()).into()
    }
}

fn push_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

/// Ordered operations that commit or fail together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtomicGroup {
    group_id: GroupId,
    operations: Vec<Operation>,
}

impl AtomicGroup {
    /// Stamp every member with the id derived from the ordered members.
    pub fn new(mut operations: Vec<Operation>) -> Self {
        let group_id = GroupId::compute(&operations);
        for op in &mut operations {
            op.group = Some(group_id);
        }
        AtomicGroup {
            group_id,
            operations,
        }
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }

    /// True when every member still carries the id its current contents hash to.
    pub fn is_consistent(&self) -> bool {
        GroupId::compute(&self.operations) == self.group_id
            && self.operations.iter().all(|op| op.group == Some(self.group_id))
    }
}

/// Inputs for a new task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    /// Escrow in minor units.
    pub amount: u64,
    /// Unix seconds.
    pub deadline: u64,
}

/// A lifecycle action on an existing task, with its extra arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionRequest {
    Claim,
    SubmitWork { proof: String },
    Approve,
    Reject,
    Refund,
}

impl ActionRequest {
    pub fn action(&self) -> Action {
        match self {
            ActionRequest::Claim => Action::Claim,
            ActionRequest::SubmitWork { .. } => Action::SubmitWork,
            ActionRequest::Approve => Action::Approve,
            ActionRequest::Reject => Action::Reject,
            ActionRequest::Refund => Action::Refund,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TransactionBuilder {
    contract: ContractInfo,
}

impl TransactionBuilder {
    pub fn new(contract: ContractInfo) -> Self {
        TransactionBuilder { contract }
    }

    pub fn contract(&self) -> &ContractInfo {
        &self.contract
    }

    /// Escrow payment plus `create_task` call, grouped.
    pub fn build_create(
        &self,
        sender: &Address,
        draft: &TaskDraft,
        now: u64,
        params: &SuggestedParams,
    ) -> Result<AtomicGroup> {
        if draft.amount == 0 {
            return Err(BoardError::precondition(
                Action::Create,
                None,
                "amount must be greater than zero",
            ));
        }
        if draft.deadline <= now {
            return Err(BoardError::precondition(
                Action::Create,
                None,
                format!("deadline {} is not after now ({now})", draft.deadline),
            ));
        }
        let title = checked_text("title", &draft.title)?;
        let description = checked_text("description", &draft.description)?;

        let payment = Operation {
            sender: *sender,
            params: params.clone(),
            kind: OperationKind::Payment {
                receiver: self.contract.app_address,
                amount: draft.amount,
            },
            group: None,
        };
        let call = self.app_call(
            sender,
            Action::Create,
            vec![
                title.to_vec(),
                description.to_vec(),
                draft.deadline.to_be_bytes().to_vec(),
            ],
            Vec::new(),
            params,
        );
        Ok(AtomicGroup::new(vec![payment, call]))
    }

    pub fn build_claim(&self, sender: &Address, task_id: u64, params: &SuggestedParams) -> Operation {
        self.task_call(sender, Action::Claim, task_id, Vec::new(), params)
    }

    pub fn build_submit_work(
        &self,
        sender: &Address,
        task_id: u64,
        proof: &str,
        params: &SuggestedParams,
    ) -> Result<Operation> {
        let proof = checked_text("proof", proof)?;
        Ok(self.task_call(sender, Action::SubmitWork, task_id, vec![proof.to_vec()], params))
    }

    pub fn build_approve(&self, sender: &Address, task_id: u64, params: &SuggestedParams) -> Operation {
        self.task_call(sender, Action::Approve, task_id, Vec::new(), params)
    }

    pub fn build_reject(&self, sender: &Address, task_id: u64, params: &SuggestedParams) -> Operation {
        self.task_call(sender, Action::Reject, task_id, Vec::new(), params)
    }

    pub fn build_refund(&self, sender: &Address, task_id: u64, params: &SuggestedParams) -> Operation {
        self.task_call(sender, Action::Refund, task_id, Vec::new(), params)
    }

    /// Dispatch on a request instead of calling the per-action builder.
    pub fn build(
        &self,
        sender: &Address,
        task_id: u64,
        request: &ActionRequest,
        params: &SuggestedParams,
    ) -> Result<Operation> {
        match request {
            ActionRequest::Claim => Ok(self.build_claim(sender, task_id, params)),
            ActionRequest::SubmitWork { proof } => {
                self.build_submit_work(sender, task_id, proof, params)
            }
            ActionRequest::Approve => Ok(self.build_approve(sender, task_id, params)),
            ActionRequest::Reject => Ok(self.build_reject(sender, task_id, params)),
            ActionRequest::Refund => Ok(self.build_refund(sender, task_id, params)),
        }
    }

    fn task_call(
        &self,
        sender: &Address,
        action: Action,
        task_id: u64,
        extra: Vec<Vec<u8>>,
        params: &SuggestedParams,
    ) -> Operation {
        let mut args = Vec::with_capacity(1 + extra.len());
        args.push(task_id.to_be_bytes().to_vec());
        args.extend(extra);
        let boxes = vec![BoxRef {
            app_id: self.contract.app_id,
            name: task_box_name(task_id).to_vec(),
        }];
        self.app_call(sender, action, args, boxes, params)
    }

    fn app_call(
        &self,
        sender: &Address,
        action: Action,
        args: Vec<Vec<u8>>,
        boxes: Vec<BoxRef>,
        params: &SuggestedParams,
    ) -> Operation {
        let mut all_args = Vec::with_capacity(args.len() + 1);
        all_args.push(action.method_tag().as_bytes().to_vec());
        all_args.extend(args);
        Operation {
            sender: *sender,
            params: params.clone(),
            kind: OperationKind::AppCall {
                app_id: self.contract.app_id,
                action,
                args: all_args,
                boxes,
            },
            group: None,
        }
    }
}
