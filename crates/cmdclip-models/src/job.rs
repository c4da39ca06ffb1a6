//! Queue message bodies: job requests and job results.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::side::Side;

/// Storage prefix for raw uploaded videos.
pub const ORIGINAL_PREFIX: &str = "original";

/// Storage prefix for processed videos.
pub const PROCESSED_PREFIX: &str = "processed";

/// Job request consumed from the `video-process` stream.
///
/// Immutable once received; one job is handled per delivered message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessVideoJob {
    /// Source file name under the original prefix, e.g. `clip.mp4`
    pub filename: String,
    /// Trim start in seconds
    pub trim_start: f64,
    /// Trim end in seconds
    pub trim_end: f64,
    /// Character identifier selecting the command table
    pub character: String,
    /// Screen side of the subject to analyze
    pub position: Side,
    /// Recipient notified with the job outcome
    pub email: String,
}

impl ProcessVideoJob {
    /// Job id derived from the file name stem.
    ///
    /// Used to name the job workspace and tag log lines.
    pub fn job_id(&self) -> String {
        Path::new(&self.filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.filename.clone())
    }

    /// File extension without the dot, defaulting to `mp4`.
    pub fn extension(&self) -> String {
        Path::new(&self.filename)
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mp4".to_string())
    }

    /// Storage key of the source object.
    pub fn original_key(&self) -> String {
        format!("{}/{}", ORIGINAL_PREFIX, self.filename)
    }

    /// Storage key of the processed object.
    pub fn processed_key(&self) -> String {
        format!("{}/{}", PROCESSED_PREFIX, self.filename)
    }
}

/// Job outcome published to the `video-result` stream.
///
/// Exactly one outcome is published per job, regardless of how many stages
/// ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobResult {
    /// The processed video was uploaded under `key`.
    Success { email: String, key: String },
    /// The job failed; `detail` is the stage-tagged error code plus message.
    Failure { email: String, detail: String },
}

impl JobResult {
    pub fn success(email: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Success {
            email: email.into(),
            key: key.into(),
        }
    }

    pub fn failure(email: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Failure {
            email: email.into(),
            detail: detail.into(),
        }
    }

    /// Recipient of the notification.
    pub fn email(&self) -> &str {
        match self {
            JobResult::Success { email, .. } => email,
            JobResult::Failure { email, .. } => email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_request_wire_format() {
        let json = r#"{
            "filename": "clip.mp4",
            "trimStart": 0,
            "trimEnd": 5,
            "character": "A",
            "position": "left",
            "email": "u@x.com"
        }"#;

        let job: ProcessVideoJob = serde_json::from_str(json).unwrap();
        assert_eq!(job.filename, "clip.mp4");
        assert_eq!(job.trim_start, 0.0);
        assert_eq!(job.trim_end, 5.0);
        assert_eq!(job.position, Side::Left);
        assert_eq!(job.email, "u@x.com");
    }

    #[test]
    fn test_storage_keys() {
        let job = ProcessVideoJob {
            filename: "clip.mp4".to_string(),
            trim_start: 0.0,
            trim_end: 5.0,
            character: "A".to_string(),
            position: Side::Left,
            email: "u@x.com".to_string(),
        };
        assert_eq!(job.original_key(), "original/clip.mp4");
        assert_eq!(job.processed_key(), "processed/clip.mp4");
        assert_eq!(job.job_id(), "clip");
        assert_eq!(job.extension(), "mp4");
    }

    #[test]
    fn test_result_wire_format() {
        let ok = JobResult::success("u@x.com", "processed/clip.mp4");
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["email"], "u@x.com");
        assert_eq!(json["key"], "processed/clip.mp4");
        assert!(json.get("detail").is_none());

        let err = JobResult::failure("u@x.com", "NO_SUBTITLE: no motion command recognized");
        let json = serde_json::to_value(&err).unwrap();
        assert!(json.get("key").is_none());
        assert!(json["detail"].as_str().unwrap().starts_with("NO_SUBTITLE"));
    }
}
