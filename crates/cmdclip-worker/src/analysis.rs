//! Blocking per-job analysis pass.

use std::path::Path;

use tracing::info;

use cmdclip_media::{
    DetectPersons, EstimatePose, FrameReader, IconComposer, VideoAnalyzer,
};
use cmdclip_models::{OverlayEntry, Side};

use crate::error::JobError;
use crate::overlay::accumulate_overlays;
use crate::recognizer::MotionRecognizer;

/// Run the full frame analysis for one clip.
///
/// CPU bound; the caller runs this on a blocking thread. A fresh recognizer
/// is built per call so no state leaks between jobs.
pub fn run_analysis<D, P>(
    video: &Path,
    character: &str,
    side: Side,
    detector: &D,
    estimator: &P,
    composer: &IconComposer,
    job_dir: &Path,
) -> Result<Vec<OverlayEntry>, JobError>
where
    D: DetectPersons,
    P: EstimatePose,
{
    info!(video = %video.display(), character, ?side, "Starting frame analysis");

    let frames = FrameReader::open(video).map_err(|e| JobError::Analyze(e.to_string()))?;

    let mut recognizer = MotionRecognizer::new(character, side);
    let analyzer = VideoAnalyzer::new(detector, estimator, side);
    let stream = analyzer.analyze(frames, |pose| recognizer.extract(pose));

    accumulate_overlays(stream, composer, job_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreadable_video_is_analyze_failure() {
        struct NoDetect;
        impl DetectPersons for NoDetect {
            fn detect(
                &self,
                _frame: &cmdclip_media::Mat,
                _max_persons: usize,
            ) -> cmdclip_media::MediaResult<Vec<cmdclip_models::BoundingBox>> {
                Ok(Vec::new())
            }
        }

        struct NoPose;
        impl EstimatePose for NoPose {
            fn estimate(
                &self,
                _frame: &cmdclip_media::Mat,
                _bbox: &cmdclip_models::BoundingBox,
            ) -> cmdclip_media::MediaResult<Vec<cmdclip_models::Pose>> {
                Ok(Vec::new())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let err = run_analysis(
            Path::new("/nonexistent/cut.mp4"),
            "ryu",
            Side::Left,
            &NoDetect,
            &NoPose,
            &IconComposer::default(),
            dir.path(),
        );

        assert!(matches!(err, Err(JobError::Analyze(_))));
    }
}
