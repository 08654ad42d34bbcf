//! In-memory stand-in for the node and the contract, used by the scenario
//! tests. It applies submitted operations with the contract's own rules, so a
//! round trip through [`TaskWorkflow`](crate::TaskWorkflow) exercises the same
//! bytes a real network would see.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::address::Address;
use crate::codec::{self, task_box_name, TASK_COUNTER_KEY};
use crate::errors::{BoardError, Result};
use crate::lifecycle::Action;
use crate::repository::{GlobalState, GlobalValue, LedgerReader};
use crate::transactions::{GroupId, Operation, OperationKind, SuggestedParams};
use crate::types::{Assignee, ContractInfo, Task, TaskStatus};
use crate::workflow::{Confirmation, OperationSubmitter, ParamsSource};

#[derive(Default)]
struct State {
    counter: u64,
    boxes: HashMap<Vec<u8>, Vec<u8>>,
    failing_reads: HashSet<Vec<u8>>,
    round: u64,
    submissions: usize,
}

pub struct MemoryLedger {
    contract: ContractInfo,
    now: Mutex<u64>,
    state: Mutex<State>,
}

pub fn contract() -> ContractInfo {
    ContractInfo {
        app_id: 1001,
        app_address: Address::from_bytes([0xc0; 32]),
        network: "localnet".to_string(),
    }
}

impl MemoryLedger {
    pub fn new(now: u64) -> Self {
        MemoryLedger {
            contract: contract(),
            now: Mutex::new(now),
            state: Mutex::new(State::default()),
        }
    }

    pub fn set_now(&self, now: u64) {
        *self.now.lock().unwrap() = now;
    }

    pub fn submissions(&self) -> usize {
        self.state.lock().unwrap().submissions
    }

    pub fn task_count(&self) -> u64 {
        self.state.lock().unwrap().counter
    }

    /// Store a task directly, bumping the counter to cover its id.
    pub fn put_task(&self, task: &Task) {
        let bytes = codec::encode(task).unwrap();
        self.put_raw(task.task_id, bytes);
    }

    pub fn put_raw(&self, task_id: u64, bytes: Vec<u8>) {
        let mut state = self.state.lock().unwrap();
        state.boxes.insert(task_box_name(task_id).to_vec(), bytes);
        state.counter = state.counter.max(task_id);
    }

    pub fn set_counter(&self, counter: u64) {
        self.state.lock().unwrap().counter = counter;
    }

    pub fn fail_reads_for(&self, task_id: u64) {
        self.state
            .lock()
            .unwrap()
            .failing_reads
            .insert(task_box_name(task_id).to_vec());
    }

    fn apply(&self, state: &mut State, operations: &[Operation]) -> Result<Vec<Vec<u8>>> {
        let now = *self.now.lock().unwrap();
        match operations {
            [payment, call] => self.apply_create(state, payment, call, GroupId::compute(operations)),
            [call] => self.apply_call(state, call, now),
            _ => Err(rejected("unsupported group shape")),
        }
    }

    fn apply_create(
        &self,
        state: &mut State,
        payment: &Operation,
        call: &Operation,
        expected_group: GroupId,
    ) -> Result<Vec<Vec<u8>>> {
        if payment.group != Some(expected_group) || call.group != Some(expected_group) {
            return Err(rejected("group id mismatch"));
        }
        let amount = match &payment.kind {
            OperationKind::Payment { receiver, amount }
                if *receiver == self.contract.app_address && *amount > 0 =>
            {
                *amount
            }
            _ => return Err(rejected("first member must pay the application")),
        };
        let args = match &call.kind {
            OperationKind::AppCall { app_id, args, .. }
                if *app_id == self.contract.app_id && args.len() == 4 =>
            {
                args
            }
            _ => return Err(rejected("second member must call create_task")),
        };
        if args[0] != Action::Create.method_tag().as_bytes() {
            return Err(rejected("unknown method"));
        }

        let task_id = state.counter + 1;
        let task = Task {
            task_id,
            client: call.sender,
            freelancer: Assignee::Unassigned,
            amount,
            deadline: u64_arg(&args[3])?,
            status: TaskStatus::Open,
            title: String::from_utf8(args[1].clone()).map_err(|_| rejected("title"))?,
            description: String::from_utf8(args[2].clone()).map_err(|_| rejected("description"))?,
            proof_hash: String::new(),
        };
        state.counter = task_id;
        state
            .boxes
            .insert(task_box_name(task_id).to_vec(), codec::encode(&task)?);
        Ok(vec![log("task_created", task_id)])
    }

    fn apply_call(&self, state: &mut State, call: &Operation, now: u64) -> Result<Vec<Vec<u8>>> {
        let (action, args) = match &call.kind {
            OperationKind::AppCall {
                app_id,
                action,
                args,
                ..
            } if *app_id == self.contract.app_id && args.len() >= 2 => (*action, args),
            _ => return Err(rejected("not an application call")),
        };
        let task_id = u64_arg(&args[1])?;
        let name = task_box_name(task_id).to_vec();
        let bytes = state.boxes.get(&name).ok_or_else(|| rejected("no such task"))?;
        let mut task = codec::decode(task_id, bytes)?;
        let sender = call.sender;

        let event = match action {
            Action::Claim if task.status == TaskStatus::Open && sender != task.client => {
                task.freelancer = Assignee::Assigned(sender);
                task.status = TaskStatus::Claimed;
                "task_claimed"
            }
            Action::SubmitWork
                if matches!(task.status, TaskStatus::Claimed | TaskStatus::Rejected)
                    && task.freelancer.is(&sender)
                    && args.len() == 3 =>
            {
                task.proof_hash = String::from_utf8(args[2].clone()).map_err(|_| rejected("proof"))?;
                task.status = TaskStatus::Submitted;
                "work_submitted"
            }
            Action::Approve if task.status == TaskStatus::Submitted && sender == task.client => {
                task.status = TaskStatus::Approved;
                "task_approved"
            }
            Action::Reject if task.status == TaskStatus::Submitted && sender == task.client => {
                task.status = TaskStatus::Rejected;
                "task_rejected"
            }
            Action::Refund
                if matches!(task.status, TaskStatus::Open | TaskStatus::Claimed)
                    && (sender == task.client || now > task.deadline) =>
            {
                task.status = TaskStatus::Refunded;
                "task_refunded"
            }
            _ => return Err(rejected("assertion failed")),
        };
        state.boxes.insert(name, codec::encode(&task)?);
        Ok(vec![log(event, task_id)])
    }
}

fn rejected(reason: &str) -> BoardError {
    BoardError::Ledger(format!("transaction rejected: {reason}"))
}

fn u64_arg(arg: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = arg.try_into().map_err(|_| rejected("bad integer argument"))?;
    Ok(u64::from_be_bytes(raw))
}

fn log(prefix: &str, task_id: u64) -> Vec<u8> {
    let mut out = format!("{prefix}:").into_bytes();
    out.extend_from_slice(&task_id.to_be_bytes());
    out
}

#[async_trait]
impl LedgerReader for MemoryLedger {
    async fn read_box(&self, app_id: u64, name: &[u8]) -> Result<Option<Vec<u8>>> {
        assert_eq!(app_id, self.contract.app_id);
        let state = self.state.lock().unwrap();
        if state.failing_reads.contains(name) {
            return Err(BoardError::Ledger("connection reset".to_string()));
        }
        Ok(state.boxes.get(name).cloned())
    }

    async fn read_global_state(&self, app_id: u64) -> Result<GlobalState> {
        assert_eq!(app_id, self.contract.app_id);
        let state = self.state.lock().unwrap();
        let mut global = GlobalState::new();
        global.insert(TASK_COUNTER_KEY.to_vec(), GlobalValue::Uint(state.counter));
        Ok(global)
    }
}

#[async_trait]
impl ParamsSource for MemoryLedger {
    async fn suggested_params(&self) -> Result<SuggestedParams> {
        let round = self.state.lock().unwrap().round;
        Ok(SuggestedParams {
            fee: 0,
            min_fee: 1000,
            first_valid: round,
            last_valid: round + 1000,
            genesis_id: "localnet".to_string(),
            genesis_hash: "bG9jYWxuZXQ=".to_string(),
        })
    }
}

#[async_trait]
impl OperationSubmitter for MemoryLedger {
    async fn submit(&self, operations: &[Operation]) -> Result<Confirmation> {
        let mut state = self.state.lock().unwrap();
        state.submissions += 1;
        let logs = self.apply(&mut state, operations)?;
        state.round += 1;
        Ok(Confirmation {
            reference: format!("round-{}", state.round),
            confirmed_round: Some(state.round),
            logs,
        })
    }
}
