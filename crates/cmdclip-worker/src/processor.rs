//! Job pipeline orchestration.
//!
//! A linear state machine over the five stages: download, cut, analyze,
//! render, upload. The first stage error short-circuits straight to the
//! failure notification; exactly one outcome is published per job either
//! way.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, info};

use cmdclip_media::{IconComposer, PersonDetector, PoseEstimator};
use cmdclip_models::{JobResult, OverlayEntry, ProcessVideoJob};
use cmdclip_queue::JobQueue;
use cmdclip_storage::S3Client;

use crate::analysis::run_analysis;
use crate::config::WorkerConfig;
use crate::error::{JobError, WorkerResult};
use crate::workspace::JobWorkspace;

/// Shared state for job processing.
///
/// Built once at startup; the ONNX sessions are loaded here and shared
/// across all jobs.
pub struct ProcessingContext {
    pub config: WorkerConfig,
    pub storage: S3Client,
    pub queue: Arc<JobQueue>,
    pub detector: Arc<PersonDetector>,
    pub estimator: Arc<PoseEstimator>,
    pub composer: IconComposer,
    /// Bounds concurrent blocking analysis passes
    pub analysis_semaphore: Arc<Semaphore>,
}

impl ProcessingContext {
    /// Create a new processing context.
    pub async fn new(config: WorkerConfig, queue: Arc<JobQueue>) -> WorkerResult<Self> {
        let storage = S3Client::from_env().await?;
        let detector = Arc::new(PersonDetector::from_env()?);
        let estimator = Arc::new(PoseEstimator::from_env()?);
        let analysis_semaphore = Arc::new(Semaphore::new(config.max_analysis_parallel));

        Ok(Self {
            config,
            storage,
            queue,
            detector,
            estimator,
            composer: IconComposer::default(),
            analysis_semaphore,
        })
    }
}

/// The five pipeline stages behind a seam, so the orchestrator's
/// short-circuit behavior is testable without S3, Redis, or ffmpeg.
#[allow(async_fn_in_trait)]
pub trait JobStages {
    async fn download(&self, job: &ProcessVideoJob, dest: &Path) -> Result<(), JobError>;
    async fn cut(
        &self,
        job: &ProcessVideoJob,
        input: &Path,
        output: &Path,
    ) -> Result<(), JobError>;
    async fn analyze(
        &self,
        job: &ProcessVideoJob,
        input: &Path,
        job_dir: &Path,
    ) -> Result<Vec<OverlayEntry>, JobError>;
    async fn render(
        &self,
        input: &Path,
        output: &Path,
        overlays: &[OverlayEntry],
    ) -> Result<(), JobError>;
    /// Upload the rendered file; returns the storage key on success.
    async fn upload(&self, job: &ProcessVideoJob, path: &Path) -> Result<String, JobError>;
}

/// Run the pipeline stages in order inside `workspace`.
pub async fn run_pipeline<S: JobStages>(
    stages: &S,
    job: &ProcessVideoJob,
    workspace: &JobWorkspace,
) -> Result<String, JobError> {
    let ext = job.extension();
    let raw = workspace.file(&format!("raw.{ext}"));
    let trimmed = workspace.file(&format!("cut.{ext}"));
    let rendered = workspace.file(&format!("final.{ext}"));

    stages.download(job, &raw).await?;
    stages.cut(job, &raw, &trimmed).await?;
    let overlays = stages.analyze(job, &trimmed, workspace.path()).await?;
    stages.render(&trimmed, &rendered, &overlays).await?;
    stages.upload(job, &rendered).await
}

/// Process one job to a terminal outcome.
///
/// Both success and stage failure publish a result and return `Ok`, which
/// lets the executor ack the message. Only faults that prevent reaching the
/// pipeline at all (like failing to create the workspace) bubble up as
/// errors, leaving the message pending for redelivery.
pub async fn process_job(ctx: &Arc<ProcessingContext>, job: &ProcessVideoJob) -> WorkerResult<()> {
    let job_id = job.job_id();
    info!(job_id, filename = %job.filename, character = %job.character, "Processing job");

    let workspace = JobWorkspace::create(&ctx.config.work_dir, &job_id)?;
    let stages = WorkerStages {
        ctx: Arc::clone(ctx),
    };

    let outcome = match run_pipeline(&stages, job, &workspace).await {
        Ok(key) => {
            info!(job_id, key, "Job completed");
            JobResult::success(job.email.clone(), key)
        }
        Err(e) => {
            error!(job_id, code = e.code(), error = %e, "Job failed");
            JobResult::failure(job.email.clone(), e.detail())
        }
    };

    // Outcome delivery is best effort; the job still reaches Done
    if let Err(e) = ctx.queue.publish_result(&outcome).await {
        error!(job_id, error = %e, "Failed to publish job outcome");
    }

    Ok(())
}

/// Production stages backed by S3, ffmpeg, and the ONNX models.
struct WorkerStages {
    ctx: Arc<ProcessingContext>,
}

impl JobStages for WorkerStages {
    async fn download(&self, job: &ProcessVideoJob, dest: &Path) -> Result<(), JobError> {
        self.ctx
            .storage
            .download_file(&job.original_key(), dest)
            .await
            .map_err(|e| JobError::Download(e.to_string()))
    }

    async fn cut(
        &self,
        job: &ProcessVideoJob,
        input: &Path,
        output: &Path,
    ) -> Result<(), JobError> {
        cmdclip_media::cut(input, output, job.trim_start, job.trim_end)
            .await
            .map_err(|e| JobError::Cut(e.to_string()))
    }

    async fn analyze(
        &self,
        job: &ProcessVideoJob,
        input: &Path,
        job_dir: &Path,
    ) -> Result<Vec<OverlayEntry>, JobError> {
        let _permit = self
            .ctx
            .analysis_semaphore
            .acquire()
            .await
            .map_err(|_| JobError::Analyze("analysis pool closed".to_string()))?;

        let detector = Arc::clone(&self.ctx.detector);
        let estimator = Arc::clone(&self.ctx.estimator);
        let composer = self.ctx.composer.clone();
        let video = input.to_path_buf();
        let job_dir = job_dir.to_path_buf();
        let character = job.character.clone();
        let side = job.position;

        tokio::task::spawn_blocking(move || {
            run_analysis(
                &video,
                &character,
                side,
                detector.as_ref(),
                estimator.as_ref(),
                &composer,
                &job_dir,
            )
        })
        .await
        .map_err(|e| JobError::Analyze(format!("analysis task panicked: {e}")))?
    }

    async fn render(
        &self,
        input: &Path,
        output: &Path,
        overlays: &[OverlayEntry],
    ) -> Result<(), JobError> {
        cmdclip_media::overlay_images(input, output, overlays)
            .await
            .map_err(|e| JobError::Render(e.to_string()))
    }

    async fn upload(&self, job: &ProcessVideoJob, path: &Path) -> Result<String, JobError> {
        let key = job.processed_key();
        self.ctx
            .storage
            .upload_file(path, &key, "video/mp4")
            .await
            .map_err(|e| JobError::Upload(e.to_string()))?;
        Ok(key)
    }
}
