//! Job queue using Redis Streams.
//!
//! Job messages are read through a consumer group and stay pending until the
//! worker acknowledges them, which happens only after the job has reached a
//! terminal outcome. A crash before the ack leaves the message claimable,
//! giving at-least-once delivery with a full job rerun.

use redis::AsyncCommands;
use tracing::{debug, info, warn};

use cmdclip_models::{JobResult, ProcessVideoJob};

use crate::error::{QueueError, QueueResult};

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream carrying job requests
    pub job_stream: String,
    /// Stream carrying job outcomes
    pub result_stream: String,
    /// Consumer group name
    pub consumer_group: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            job_stream: "video-process".to_string(),
            result_stream: "video-result".to_string(),
            consumer_group: "cmdclip:workers".to_string(),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            job_stream: std::env::var("QUEUE_JOB_STREAM")
                .unwrap_or_else(|_| "video-process".to_string()),
            result_stream: std::env::var("QUEUE_RESULT_STREAM")
                .unwrap_or_else(|_| "video-result".to_string()),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or_else(|_| "cmdclip:workers".to_string()),
        }
    }
}

/// Job queue client.
pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    /// Create a new job queue.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Initialize the queue (create consumer group if not exists).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.job_stream)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!(
                    "Consumer group already exists: {}",
                    self.config.consumer_group
                );
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    /// Enqueue a job request (used by producers and integration tests).
    pub async fn enqueue(&self, job: &ProcessVideoJob) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(job)?;
        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.job_stream)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .query_async(&mut conn)
            .await?;

        info!("Enqueued job {} with message ID {}", job.job_id(), message_id);
        Ok(message_id)
    }

    /// Acknowledge a job (mark as completed and drop it from the stream).
    pub async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        redis::cmd("XACK")
            .arg(&self.config.job_stream)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&self.config.job_stream)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        debug!("Acknowledged job message: {}", message_id);
        Ok(())
    }

    /// Publish a job outcome to the result stream.
    pub async fn publish_result(&self, result: &JobResult) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(result)?;
        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.result_stream)
            .arg("*")
            .arg("result")
            .arg(&payload)
            .query_async(&mut conn)
            .await?;

        debug!("Published result for {}: {}", result.email(), message_id);
        Ok(message_id)
    }

    /// Consume job requests from the queue.
    ///
    /// Returns (message_id, job) pairs. Malformed payloads are acknowledged
    /// and logged so they cannot wedge the stream.
    pub async fn consume(
        &self,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, ProcessVideoJob)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.job_stream)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let mut jobs = Vec::new();

        for stream_key in result.keys {
            for entry in stream_key.ids {
                let message_id = entry.id.clone();

                if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
                    let payload_str = String::from_utf8_lossy(payload);
                    match serde_json::from_str::<ProcessVideoJob>(&payload_str) {
                        Ok(job) => {
                            debug!("Consumed job {} from stream", job.job_id());
                            jobs.push((message_id, job));
                        }
                        Err(e) => {
                            warn!("Failed to parse job payload: {}", e);
                            self.ack(&message_id).await.ok();
                        }
                    }
                }
            }
        }

        Ok(jobs)
    }

    /// Claim pending jobs that have been idle for too long.
    /// This handles jobs from crashed workers.
    ///
    /// Scans the pending entries list from the beginning with `XAUTOCLAIM`,
    /// which atomically reassigns matching messages to this consumer.
    pub async fn claim_pending(
        &self,
        consumer_name: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, ProcessVideoJob)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let reply: redis::streams::StreamAutoClaimReply = self
            .autoclaim_cmd(consumer_name, min_idle_ms, count)
            .query_async(&mut conn)
            .await?;

        let mut jobs = Vec::new();

        for entry in reply.claimed {
            let message_id = entry.id.clone();

            if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
                let payload_str = String::from_utf8_lossy(&payload);
                match serde_json::from_str::<ProcessVideoJob>(&payload_str) {
                    Ok(job) => {
                        info!("Claimed pending job {} from stream", job.job_id());
                        jobs.push((message_id, job));
                    }
                    Err(e) => {
                        warn!("Failed to parse claimed job payload: {}", e);
                        self.ack(&message_id).await.ok();
                    }
                }
            }
        }

        Ok(jobs)
    }

    /// Build the `XAUTOCLAIM` scan for idle pending messages.
    fn autoclaim_cmd(&self, consumer_name: &str, min_idle_ms: u64, count: usize) -> redis::Cmd {
        let mut cmd = redis::cmd("XAUTOCLAIM");
        cmd.arg(&self.config.job_stream)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(min_idle_ms)
            .arg("0-0")
            .arg("COUNT")
            .arg(count);
        cmd
    }

    /// Get queue length.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.job_stream).await?;
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_streams() {
        let config = QueueConfig::default();
        assert_eq!(config.job_stream, "video-process");
        assert_eq!(config.result_stream, "video-result");
    }

    // XCLAIM takes explicit message ids and has no COUNT option; the idle
    // scan must go through XAUTOCLAIM or Redis rejects the command and
    // crashed-worker messages are never redelivered.
    #[test]
    fn test_claim_scan_uses_xautoclaim() {
        let queue = JobQueue::new(QueueConfig::default()).unwrap();
        let cmd = queue.autoclaim_cmd("worker-1", 300_000, 5);

        let args: Vec<Vec<u8>> = cmd
            .args_iter()
            .map(|arg| match arg {
                redis::Arg::Simple(bytes) => bytes.to_vec(),
                redis::Arg::Cursor => Vec::new(),
            })
            .collect();

        let expected: Vec<&[u8]> = vec![
            b"XAUTOCLAIM",
            b"video-process",
            b"cmdclip:workers",
            b"worker-1",
            b"300000",
            b"0-0",
            b"COUNT",
            b"5",
        ];
        assert_eq!(args, expected);
    }
}
