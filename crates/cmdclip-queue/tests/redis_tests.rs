//! Redis queue integration tests.
//!
//! Run with `cargo test -- --ignored` against a local Redis.

use cmdclip_models::{ProcessVideoJob, Side};
use cmdclip_queue::JobQueue;

fn sample_job() -> ProcessVideoJob {
    ProcessVideoJob {
        filename: "integration-test.mp4".to_string(),
        trim_start: 0.0,
        trim_end: 5.0,
        character: "ryu".to_string(),
        position: Side::Left,
        email: "test@example.com".to_string(),
    }
}

/// Test Redis connection and basic operations.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_redis_connection() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let len = queue.len().await.expect("Failed to get queue length");
    println!("Queue length: {}", len);
}

/// Test job enqueue, consume, and ack cycle.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_job_enqueue_consume_ack() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let job = sample_job();
    queue.enqueue(&job).await.expect("Failed to enqueue job");

    let jobs = queue
        .consume("integration-test-consumer", 1000, 1)
        .await
        .expect("Failed to consume");
    assert!(!jobs.is_empty(), "Expected at least one job");

    let (message_id, consumed) = &jobs[0];
    assert_eq!(consumed.filename, job.filename);
    assert_eq!(consumed.position, Side::Left);

    queue.ack(message_id).await.expect("Failed to ack job");
}

/// Test publishing a job outcome to the result stream.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_publish_result() {
    use cmdclip_models::JobResult;

    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("Failed to create queue");

    let result = JobResult::success("test@example.com", "processed/integration-test.mp4");
    let message_id = queue
        .publish_result(&result)
        .await
        .expect("Failed to publish result");
    println!("Published result as {}", message_id);
}
