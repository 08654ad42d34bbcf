use std::sync::Arc;

use crate::address::Address;
use crate::codec;
use crate::invariants::{assert_all_task_invariants, assert_sequential_ids};
use crate::memory_ledger::{contract, MemoryLedger};
use crate::repository::TaskRepository;
use crate::types::{Assignee, Task, TaskStatus};

const NOW: u64 = 1_700_000_000;

fn setup() -> (Arc<MemoryLedger>, TaskRepository<Arc<MemoryLedger>>) {
    let ledger = Arc::new(MemoryLedger::new(NOW));
    let repo = TaskRepository::new(contract(), ledger.clone());
    (ledger, repo)
}

fn addr(byte: u8) -> Address {
    Address::from_bytes([byte; 32])
}

fn task(task_id: u64, client: Address, freelancer: Assignee, status: TaskStatus) -> Task {
    Task {
        task_id,
        client,
        freelancer,
        amount: 1_000_000 * task_id,
        deadline: NOW + 86_400,
        status,
        title: format!("Task #{task_id}"),
        description: "Write the docs".to_string(),
        proof_hash: if status == TaskStatus::Submitted {
            "ipfs://proof".to_string()
        } else {
            String::new()
        },
    }
}

fn seed_board(ledger: &MemoryLedger) {
    ledger.put_task(&task(1, addr(1), Assignee::Unassigned, TaskStatus::Open));
    ledger.put_task(&task(2, addr(1), Assignee::Assigned(addr(2)), TaskStatus::Claimed));
    ledger.put_task(&task(3, addr(3), Assignee::Assigned(addr(2)), TaskStatus::Submitted));
    ledger.put_task(&task(4, addr(3), Assignee::Unassigned, TaskStatus::Open));
}

#[tokio::test]
async fn test_get_task_found_and_missing() {
    let (ledger, repo) = setup();
    seed_board(&ledger);

    let found = repo.get_task(2).await.unwrap().expect("task 2 should exist");
    assert_eq!(found.status, TaskStatus::Claimed);
    assert_eq!(found.freelancer, Assignee::Assigned(addr(2)));

    assert_eq!(repo.get_task(99).await.unwrap(), None);
}

#[tokio::test]
async fn test_get_task_propagates_decode_errors() {
    let (ledger, repo) = setup();
    ledger.put_raw(1, vec![0u8; 10]);
    assert!(repo.get_task(1).await.unwrap_err().is_codec_error());
}

#[tokio::test]
async fn test_empty_board_lists_nothing() {
    let (_ledger, repo) = setup();
    let listing = repo.get_all_tasks().await.unwrap();
    assert!(listing.tasks.is_empty());
    assert!(listing.is_complete());
}

#[tokio::test]
async fn test_listing_returns_tasks_in_id_order() {
    let (ledger, repo) = setup();
    seed_board(&ledger);

    let listing = repo.with_concurrency(3).get_all_tasks().await.unwrap();
    assert!(listing.is_complete());
    assert_sequential_ids(&listing.tasks);
    for t in &listing.tasks {
        assert_all_task_invariants(t);
    }
}

#[tokio::test]
async fn test_listing_skips_truncated_record() {
    let (ledger, repo) = setup();
    ledger.put_task(&task(1, addr(1), Assignee::Unassigned, TaskStatus::Open));
    let full = codec::encode(&task(2, addr(1), Assignee::Unassigned, TaskStatus::Open)).unwrap();
    ledger.put_raw(2, full[..full.len() - 3].to_vec());
    ledger.put_task(&task(3, addr(1), Assignee::Unassigned, TaskStatus::Open));

    let listing = repo.get_all_tasks().await.unwrap();
    let ids: Vec<u64> = listing.tasks.iter().map(|t| t.task_id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(listing.failures.len(), 1);
    assert_eq!(listing.failures[0].task_id, 2);
    assert!(listing.failures[0].reason.contains("Truncated"));
}

#[tokio::test]
async fn test_listing_skips_missing_and_unreadable_records() {
    let (ledger, repo) = setup();
    seed_board(&ledger);
    ledger.set_counter(6);
    ledger.fail_reads_for(3);

    let listing = repo.get_all_tasks().await.unwrap();
    let ids: Vec<u64> = listing.tasks.iter().map(|t| t.task_id).collect();
    assert_eq!(ids, vec![1, 2, 4]);
    let failed: Vec<u64> = listing.failures.iter().map(|f| f.task_id).collect();
    assert_eq!(failed, vec![3, 5, 6]);
}

#[tokio::test]
async fn test_filter_by_status() {
    let (ledger, repo) = setup();
    seed_board(&ledger);

    let open = repo.get_tasks_by_status(TaskStatus::Open).await.unwrap();
    let ids: Vec<u64> = open.tasks.iter().map(|t| t.task_id).collect();
    assert_eq!(ids, vec![1, 4]);

    let approved = repo.get_tasks_by_status(TaskStatus::Approved).await.unwrap();
    assert!(approved.tasks.is_empty());
}

#[tokio::test]
async fn test_filter_by_client() {
    let (ledger, repo) = setup();
    seed_board(&ledger);

    let mine = repo.get_tasks_by_client(&addr(3)).await.unwrap();
    let ids: Vec<u64> = mine.tasks.iter().map(|t| t.task_id).collect();
    assert_eq!(ids, vec![3, 4]);
}

#[tokio::test]
async fn test_filter_by_freelancer_excludes_sentinel() {
    let (ledger, repo) = setup();
    seed_board(&ledger);

    let working = repo.get_tasks_by_freelancer(&addr(2)).await.unwrap();
    let ids: Vec<u64> = working.tasks.iter().map(|t| t.task_id).collect();
    assert_eq!(ids, vec![2, 3]);

    let nobody = repo.get_tasks_by_freelancer(&Address::ZERO).await.unwrap();
    assert!(nobody.tasks.is_empty());
}

#[tokio::test]
async fn test_filters_keep_failures() {
    let (ledger, repo) = setup();
    seed_board(&ledger);
    ledger.put_raw(2, vec![1, 2, 3]);

    let open = repo.get_tasks_by_status(TaskStatus::Open).await.unwrap();
    assert_eq!(open.tasks.len(), 2);
    assert_eq!(open.failures.len(), 1);
}
