//! Motion command overlay worker.
//!
//! This crate provides:
//! - Job executor over the Redis Streams queue
//! - The five-stage job pipeline (download, cut, analyze, render, upload)
//! - Motion command recognition over the pose stream
//! - Graceful shutdown

pub mod analysis;
pub mod config;
pub mod error;
pub mod executor;
pub mod overlay;
pub mod processor;
pub mod recognizer;
pub mod workspace;

pub use config::WorkerConfig;
pub use error::{JobError, WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use processor::{process_job, run_pipeline, JobStages, ProcessingContext};
pub use recognizer::MotionRecognizer;
pub use workspace::JobWorkspace;
