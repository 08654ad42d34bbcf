use std::sync::Arc;

use crate::address::Address;
use crate::errors::BoardError;
use crate::invariants::{
    assert_all_task_invariants, assert_task_immutable_fields, assert_valid_status_transition,
};
use crate::lifecycle::{legal_actions, Action};
use crate::memory_ledger::{contract, MemoryLedger};
use crate::repository::TaskRepository;
use crate::transactions::{ActionRequest, TaskDraft};
use crate::types::{Assignee, Task, TaskStatus};
use crate::workflow::TaskWorkflow;

const NOW: u64 = 1_700_000_000;

type Workflow = TaskWorkflow<Arc<MemoryLedger>, Arc<MemoryLedger>, Arc<MemoryLedger>>;

fn setup() -> (Arc<MemoryLedger>, Workflow) {
    let ledger = Arc::new(MemoryLedger::new(NOW));
    let repo = TaskRepository::new(contract(), ledger.clone());
    let workflow = TaskWorkflow::new(repo, ledger.clone(), ledger.clone());
    (ledger, workflow)
}

fn client() -> Address {
    Address::from_bytes([0x01; 32])
}

fn freelancer() -> Address {
    Address::from_bytes([0x02; 32])
}

fn outsider() -> Address {
    Address::from_bytes([0x03; 32])
}

fn draft() -> TaskDraft {
    TaskDraft {
        title: "Fix bug".to_string(),
        description: "Crash when the list is empty".to_string(),
        amount: 5_000_000,
        deadline: NOW + 86_400,
    }
}

async fn create(workflow: &Workflow) -> Task {
    workflow
        .create_task(&client(), &draft(), NOW)
        .await
        .unwrap()
        .task
        .expect("created task should be readable")
}

async fn step(workflow: &Workflow, who: Address, task_id: u64, request: ActionRequest) -> Task {
    let before = workflow.repository().get_task(task_id).await.unwrap().unwrap();
    let after = workflow
        .perform(&who, task_id, &request, NOW)
        .await
        .unwrap()
        .task
        .unwrap();
    assert_valid_status_transition(before.status, after.status);
    assert_task_immutable_fields(&before, &after);
    assert_all_task_invariants(&after);
    after
}

#[tokio::test]
async fn test_create_assigns_sequential_ids() {
    let (ledger, workflow) = setup();

    let first = create(&workflow).await;
    let second = create(&workflow).await;

    assert_eq!(first.task_id, 1);
    assert_eq!(second.task_id, 2);
    assert_eq!(ledger.task_count(), 2);
    assert_eq!(first.client, client());
    assert_eq!(first.freelancer, Assignee::Unassigned);
    assert_eq!(first.amount, 5_000_000);
    assert_eq!(first.status, TaskStatus::Open);
    assert_all_task_invariants(&first);
}

#[tokio::test]
async fn test_happy_path_to_approval() {
    let (_ledger, workflow) = setup();
    let task = create(&workflow).await;

    let claimed = step(&workflow, freelancer(), task.task_id, ActionRequest::Claim).await;
    assert_eq!(claimed.freelancer, Assignee::Assigned(freelancer()));

    let submitted = step(
        &workflow,
        freelancer(),
        task.task_id,
        ActionRequest::SubmitWork {
            proof: "https://github.com/org/repo/pull/7".to_string(),
        },
    )
    .await;
    assert_eq!(submitted.proof_hash, "https://github.com/org/repo/pull/7");

    let approved = step(&workflow, client(), task.task_id, ActionRequest::Approve).await;
    assert_eq!(approved.status, TaskStatus::Approved);
    assert!(legal_actions(&approved, &client(), NOW).is_empty());
}

#[tokio::test]
async fn test_reject_then_resubmit() {
    let (_ledger, workflow) = setup();
    let id = create(&workflow).await.task_id;

    step(&workflow, freelancer(), id, ActionRequest::Claim).await;
    step(
        &workflow,
        freelancer(),
        id,
        ActionRequest::SubmitWork { proof: "v1".to_string() },
    )
    .await;
    let rejected = step(&workflow, client(), id, ActionRequest::Reject).await;
    assert_eq!(rejected.status, TaskStatus::Rejected);
    assert!(legal_actions(&rejected, &freelancer(), NOW).contains(Action::SubmitWork));

    let resubmitted = step(
        &workflow,
        freelancer(),
        id,
        ActionRequest::SubmitWork { proof: "v2".to_string() },
    )
    .await;
    assert_eq!(resubmitted.status, TaskStatus::Submitted);
    assert_eq!(resubmitted.proof_hash, "v2");
}

#[tokio::test]
async fn test_rejected_task_cannot_be_refunded() {
    let (ledger, workflow) = setup();
    let id = create(&workflow).await.task_id;
    step(&workflow, freelancer(), id, ActionRequest::Claim).await;
    step(
        &workflow,
        freelancer(),
        id,
        ActionRequest::SubmitWork { proof: "v1".to_string() },
    )
    .await;
    step(&workflow, client(), id, ActionRequest::Reject).await;
    let submissions = ledger.submissions();

    let later = NOW + 86_401;
    ledger.set_now(later);
    for (who, now) in [(client(), NOW), (client(), later), (outsider(), later)] {
        let refund = workflow.perform(&who, id, &ActionRequest::Refund, now).await;
        assert!(matches!(
            refund,
            Err(BoardError::PreconditionViolation { action: Action::Refund, .. })
        ));
    }
    assert_eq!(ledger.submissions(), submissions);

    let task = workflow.repository().get_task(id).await.unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Rejected);
}

#[tokio::test]
async fn test_client_refunds_open_task() {
    let (_ledger, workflow) = setup();
    let id = create(&workflow).await.task_id;

    let refunded = step(&workflow, client(), id, ActionRequest::Refund).await;
    assert_eq!(refunded.status, TaskStatus::Refunded);
}

#[tokio::test]
async fn test_anyone_refunds_after_deadline() {
    let (ledger, workflow) = setup();
    let id = create(&workflow).await.task_id;
    step(&workflow, freelancer(), id, ActionRequest::Claim).await;

    let early = workflow.perform(&outsider(), id, &ActionRequest::Refund, NOW).await;
    assert!(matches!(early, Err(BoardError::PreconditionViolation { .. })));

    let later = NOW + 86_401;
    ledger.set_now(later);
    let outcome = workflow
        .perform(&outsider(), id, &ActionRequest::Refund, later)
        .await
        .unwrap();
    assert_eq!(outcome.task.unwrap().status, TaskStatus::Refunded);
}

#[tokio::test]
async fn test_illegal_actions_never_reach_the_network() {
    let (ledger, workflow) = setup();
    let id = create(&workflow).await.task_id;
    let submissions = ledger.submissions();

    let own_claim = workflow.perform(&client(), id, &ActionRequest::Claim, NOW).await;
    assert!(matches!(
        own_claim,
        Err(BoardError::PreconditionViolation { action: Action::Claim, .. })
    ));

    let early_approve = workflow.perform(&client(), id, &ActionRequest::Approve, NOW).await;
    assert!(matches!(early_approve, Err(BoardError::PreconditionViolation { .. })));

    let missing = workflow.perform(&client(), 42, &ActionRequest::Refund, NOW).await;
    assert_eq!(missing, Err(BoardError::TaskNotFound(42)));

    assert_eq!(ledger.submissions(), submissions);
}

#[tokio::test]
async fn test_terminal_task_rejects_everything() {
    let (_ledger, workflow) = setup();
    let id = create(&workflow).await.task_id;
    step(&workflow, client(), id, ActionRequest::Refund).await;

    for request in [
        ActionRequest::Claim,
        ActionRequest::Refund,
        ActionRequest::Approve,
        ActionRequest::Reject,
    ] {
        for who in [client(), freelancer(), outsider()] {
            assert!(workflow.perform(&who, id, &request, NOW + 999_999).await.is_err());
        }
    }
}

#[tokio::test]
async fn test_invalid_create_is_not_submitted() {
    let (ledger, workflow) = setup();
    let zero = TaskDraft { amount: 0, ..draft() };
    assert!(workflow.create_task(&client(), &zero, NOW).await.is_err());
    let past = TaskDraft { deadline: NOW - 1, ..draft() };
    assert!(workflow.create_task(&client(), &past, NOW).await.is_err());
    assert_eq!(ledger.submissions(), 0);
    assert_eq!(ledger.task_count(), 0);
}
