//! S3 object storage client.
//!
//! This crate provides:
//! - Blob download/upload by key
//! - Object existence checks
//! - Startup connectivity check

pub mod client;
pub mod error;

pub use client::{S3Client, S3Config};
pub use error::{StorageError, StorageResult};
