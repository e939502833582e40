use std::sync::Arc;
use std::time::Duration;

use sortq::scheduler::{Enqueued, JobQueue, JobStatus, SortJob};
use uuid::Uuid;

fn ids(jobs: &[SortJob]) -> Vec<Uuid> {
    jobs.iter().map(|j| j.id).collect()
}

#[tokio::test]
async fn test_enqueue_keeps_arrival_order() {
    let queue = JobQueue::new();
    let a = queue.enqueue(SortJob::new(vec![3, 1, 2])).await;
    let b = queue.enqueue(SortJob::new(vec![9])).await;
    let c = queue.enqueue(SortJob::new(vec![])).await;

    let jobs = queue.list().await;
    assert_eq!(ids(&jobs), vec![a.id, b.id, c.id]);
    assert!(jobs.iter().all(|j| j.status == JobStatus::Pending));
    assert_eq!(queue.len().await, 3);
}

#[tokio::test]
async fn test_duplicate_enqueue_is_a_noop() {
    let queue = JobQueue::new();
    let id = Uuid::new_v4();
    let first = SortJob::with_id(id, vec![1, 2]);
    let second = SortJob::with_id(id, vec![5, 4, 3]);

    assert!(queue.try_enqueue(first.clone()).await.is_added());

    // enqueue hands back what it was given, even when ignored
    let returned = queue.enqueue(second.clone()).await;
    assert_eq!(returned, second);

    let jobs = queue.list().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0], first);
}

#[tokio::test]
async fn test_try_enqueue_reports_existing_job() {
    let queue = JobQueue::new();
    let id = Uuid::new_v4();
    queue.enqueue(SortJob::with_id(id, vec![1])).await;

    match queue.try_enqueue(SortJob::with_id(id, vec![2])).await {
        Enqueued::Existing(job) => assert_eq!(job.input, vec![1]),
        Enqueued::Added(_) => panic!("duplicate id should not be added"),
    }
}

#[tokio::test]
async fn test_get_by_id() {
    let queue = JobQueue::new();
    let job = queue.enqueue(SortJob::new(vec![7, 6])).await;

    assert_eq!(queue.get(&job.id).await, Some(job));
    assert!(queue.get(&Uuid::new_v4()).await.is_none());
}

#[tokio::test]
async fn test_peek_and_dequeue() {
    let queue = JobQueue::new();
    assert!(queue.peek().await.is_none());
    assert!(queue.dequeue().await.is_none());

    let a = queue.enqueue(SortJob::new(vec![1])).await;
    let b = queue.enqueue(SortJob::new(vec![2])).await;

    assert_eq!(queue.peek().await.map(|j| j.id), Some(a.id));
    assert_eq!(queue.len().await, 2);

    assert_eq!(queue.dequeue().await.map(|j| j.id), Some(a.id));
    assert_eq!(queue.peek().await.map(|j| j.id), Some(b.id));
    assert_eq!(queue.len().await, 1);
}

#[tokio::test]
async fn test_rotate_moves_front_to_back() {
    let queue = JobQueue::new();
    assert!(queue.rotate().await.is_none());

    let a = queue.enqueue(SortJob::new(vec![1])).await;
    let b = queue.enqueue(SortJob::new(vec![2])).await;

    assert_eq!(queue.rotate().await.map(|j| j.id), Some(a.id));
    assert_eq!(ids(&queue.list().await), vec![b.id, a.id]);
}

#[tokio::test]
async fn test_requeue_result_replaces_entry_at_back() {
    let queue = JobQueue::new();
    let a = queue.enqueue(SortJob::new(vec![2, 1])).await;
    let b = queue.enqueue(SortJob::new(vec![4, 3])).await;

    let done = a.completed(vec![1, 2], Duration::from_millis(1));
    queue.requeue_result(done.clone()).await;

    let jobs = queue.list().await;
    assert_eq!(ids(&jobs), vec![b.id, a.id]);
    assert_eq!(jobs[1], done);
    assert_eq!(queue.first_pending().await.map(|j| j.id), Some(b.id));
}

#[tokio::test]
async fn test_update_in_place() {
    let queue = JobQueue::new();
    let a = queue.enqueue(SortJob::new(vec![1])).await;
    let b = queue.enqueue(SortJob::new(vec![2])).await;

    assert!(queue.update(a.with_status(JobStatus::Processing)).await);
    let jobs = queue.list().await;
    assert_eq!(ids(&jobs), vec![a.id, b.id]);
    assert_eq!(jobs[0].status, JobStatus::Processing);

    assert!(!queue.update(SortJob::new(vec![0])).await);
    assert_eq!(queue.len().await, 2);
}

#[tokio::test]
async fn test_pending_lookups() {
    let queue = JobQueue::new();
    assert!(!queue.has_pending().await);
    assert!(queue.first_pending().await.is_none());

    let done = SortJob::new(vec![1]).completed(vec![1], Duration::ZERO);
    queue.enqueue(done).await;
    assert!(!queue.has_pending().await);

    let pending = queue.enqueue(SortJob::new(vec![3, 2])).await;
    assert!(queue.has_pending().await);
    assert_eq!(queue.first_pending().await.map(|j| j.id), Some(pending.id));
}

#[tokio::test]
async fn test_list_is_a_snapshot() {
    let queue = JobQueue::new();
    queue.enqueue(SortJob::new(vec![1])).await;

    let snapshot = queue.list().await;
    queue.enqueue(SortJob::new(vec![2])).await;

    assert_eq!(snapshot.len(), 1);
    assert_eq!(queue.len().await, 2);
}

#[tokio::test]
async fn test_events_follow_status_changes() {
    let queue = JobQueue::new();
    let mut events = queue.subscribe();

    let job = queue.enqueue(SortJob::new(vec![2, 1])).await;
    queue.update(job.with_status(JobStatus::Processing)).await;
    queue
        .requeue_result(job.completed(vec![1, 2], Duration::ZERO))
        .await;

    let statuses: Vec<_> = [
        events.recv().await.unwrap(),
        events.recv().await.unwrap(),
        events.recv().await.unwrap(),
    ]
    .into_iter()
    .map(|e| {
        assert_eq!(e.job_id, job.id);
        e.status
    })
    .collect();

    assert_eq!(
        statuses,
        vec![JobStatus::Pending, JobStatus::Processing, JobStatus::Completed]
    );
}

#[tokio::test]
async fn test_duplicate_enqueue_publishes_nothing() {
    let queue = JobQueue::new();
    let job = queue.enqueue(SortJob::new(vec![1])).await;

    let mut events = queue.subscribe();
    queue.enqueue(job.clone()).await;

    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_submission_wakes_waiter() {
    let queue = Arc::new(JobQueue::new());

    let waiter = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.wait_for_submission().await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());

    queue.enqueue(SortJob::new(vec![1])).await;
    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter should wake on submission")
        .unwrap();
}

#[tokio::test]
async fn test_submission_before_wait_is_remembered() {
    let queue = JobQueue::new();
    queue.enqueue(SortJob::new(vec![1])).await;

    tokio::time::timeout(Duration::from_millis(100), queue.wait_for_submission())
        .await
        .expect("earlier submission should not be lost");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producers_never_duplicate_ids() {
    let queue = Arc::new(JobQueue::new());
    let shared_ids: Vec<Uuid> = (0..20).map(|_| Uuid::new_v4()).collect();

    let mut handles = Vec::new();
    for producer in 0..8 {
        let queue = queue.clone();
        let shared_ids = shared_ids.clone();
        handles.push(tokio::spawn(async move {
            for (i, id) in shared_ids.into_iter().enumerate() {
                queue
                    .enqueue(SortJob::with_id(id, vec![producer, i as i64]))
                    .await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let jobs = queue.list().await;
    assert_eq!(jobs.len(), shared_ids.len());
    for id in &shared_ids {
        assert_eq!(jobs.iter().filter(|j| j.id == *id).count(), 1);
    }
}
