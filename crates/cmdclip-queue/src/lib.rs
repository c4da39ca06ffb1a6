//! Redis Streams job queue.
//!
//! This crate provides:
//! - Durable job intake via a consumer group (ack only after the job is done)
//! - Result publishing to a separate stream
//! - Pending-message claim for crash recovery

pub mod error;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use queue::{JobQueue, QueueConfig};
