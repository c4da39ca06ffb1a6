//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Infrastructure errors that prevent a job outcome from being reported.
///
/// A job whose stages fail produces a [`JobError`] and still yields a
/// published failure result; `WorkerError` is reserved for faults around
/// that contract, like losing the queue connection.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    Storage(#[from] cmdclip_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] cmdclip_media::MediaError),

    #[error("Queue error: {0}")]
    Queue(#[from] cmdclip_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

/// Stage-level job failure, mapped to the failure code published with the
/// job outcome.
///
/// Both the trim and the overlay render report `CUT_FAILED`; the detail
/// message distinguishes them.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("{0}")]
    Download(String),

    #[error("{0}")]
    Cut(String),

    #[error("{0}")]
    Analyze(String),

    #[error("no motion command recognized in the clip")]
    NoCommand,

    #[error("{0}")]
    Render(String),

    #[error("{0}")]
    Upload(String),
}

impl JobError {
    /// Stable failure code for the published outcome.
    pub fn code(&self) -> &'static str {
        match self {
            JobError::Download(_) => "DOWNLOAD_FAILED",
            JobError::Cut(_) => "CUT_FAILED",
            JobError::Analyze(_) => "ANALYZE_FAILED",
            JobError::NoCommand => "NO_SUBTITLE",
            JobError::Render(_) => "CUT_FAILED",
            JobError::Upload(_) => "UPLOAD_FAILED",
        }
    }

    /// Code-tagged detail string published to the result stream.
    pub fn detail(&self) -> String {
        format!("{}: {}", self.code(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_error_codes() {
        assert_eq!(JobError::Download("timeout".into()).code(), "DOWNLOAD_FAILED");
        assert_eq!(JobError::Cut("bad range".into()).code(), "CUT_FAILED");
        assert_eq!(JobError::Render("filter".into()).code(), "CUT_FAILED");
        assert_eq!(JobError::NoCommand.code(), "NO_SUBTITLE");
    }

    #[test]
    fn test_detail_is_code_tagged() {
        let detail = JobError::Upload("connection reset".into()).detail();
        assert_eq!(detail, "UPLOAD_FAILED: connection reset");
    }
}
