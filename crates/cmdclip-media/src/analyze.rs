//! Frame-by-frame analysis pipeline.
//!
//! Walks a video source one frame at a time: detect people, pick the
//! tracked player by screen side, estimate the pose, and hand the pose
//! to a caller-supplied recognizer. The stream is lazy; no frame is
//! decoded before the consumer asks for it.

use opencv::core::Mat;
use tracing::{debug, trace};

use cmdclip_models::{BoundingBox, Command, FrameAnalysis, Pose, Side};

use crate::detection::{DetectPersons, EstimatePose};
use crate::error::MediaResult;
use crate::frames::FrameSource;

/// Cap on person candidates considered per frame.
pub const MAX_PERSONS_PER_FRAME: usize = 2;

/// Pick the tracked player's box by horizontal screen position.
///
/// A single candidate is always accepted, regardless of where it sits.
/// With several, `Left` takes the smallest box center and `Right` the
/// largest; on an exact tie the earlier candidate wins.
pub fn select_target(boxes: &[BoundingBox], side: Side) -> Option<&BoundingBox> {
    match boxes {
        [] => None,
        [only] => Some(only),
        many => match side {
            Side::Left => many.iter().reduce(|best, b| {
                if b.center_x() < best.center_x() {
                    b
                } else {
                    best
                }
            }),
            Side::Right => many.iter().reduce(|best, b| {
                if b.center_x() > best.center_x() {
                    b
                } else {
                    best
                }
            }),
        },
    }
}

/// Per-frame analyzer binding a detector and a pose estimator to one
/// tracked screen side.
pub struct VideoAnalyzer<'a, D, P> {
    detector: &'a D,
    estimator: &'a P,
    side: Side,
}

impl<'a, D, P> VideoAnalyzer<'a, D, P>
where
    D: DetectPersons,
    P: EstimatePose,
{
    pub fn new(detector: &'a D, estimator: &'a P, side: Side) -> Self {
        Self {
            detector,
            estimator,
            side,
        }
    }

    /// Lazily analyze `frames`, feeding each tracked pose to `recognize`.
    ///
    /// Frame indices are assigned in decode order starting at 0; a frame
    /// with no detection, no usable pose, or no recognized command still
    /// occupies its index with `command: None`.
    pub fn analyze<S, R>(&self, frames: S, recognize: R) -> AnalysisStream<'_, D, P, S, R>
    where
        S: FrameSource,
        R: FnMut(&Pose) -> Option<Command>,
    {
        AnalysisStream {
            detector: self.detector,
            estimator: self.estimator,
            side: self.side,
            frames,
            recognize,
            next_idx: 0,
            done: false,
        }
    }
}

/// Lazy iterator of per-frame analysis results.
///
/// The first decode or inference error ends the stream; `frame_idx` is
/// strictly increasing across the yielded items.
pub struct AnalysisStream<'a, D, P, S, R> {
    detector: &'a D,
    estimator: &'a P,
    side: Side,
    frames: S,
    recognize: R,
    next_idx: u64,
    done: bool,
}

impl<D, P, S, R> AnalysisStream<'_, D, P, S, R>
where
    D: DetectPersons,
    P: EstimatePose,
    R: FnMut(&Pose) -> Option<Command>,
{
    fn analyze_frame(&mut self, frame: &Mat) -> MediaResult<Option<Command>> {
        let boxes = self.detector.detect(frame, MAX_PERSONS_PER_FRAME)?;
        let Some(target) = select_target(&boxes, self.side) else {
            trace!(frame_idx = self.next_idx, "No person detected");
            return Ok(None);
        };

        let poses = self.estimator.estimate(frame, target)?;
        let Some(pose) = poses.first() else {
            trace!(frame_idx = self.next_idx, "No usable pose");
            return Ok(None);
        };

        Ok((self.recognize)(pose))
    }
}

impl<D, P, S, R> Iterator for AnalysisStream<'_, D, P, S, R>
where
    D: DetectPersons,
    P: EstimatePose,
    S: FrameSource,
    R: FnMut(&Pose) -> Option<Command>,
{
    type Item = MediaResult<FrameAnalysis>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let frame = match self.frames.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.done = true;
                debug!(frames = self.next_idx, "Analysis stream exhausted");
                return None;
            }
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        let result = match self.analyze_frame(&frame) {
            Ok(command) => {
                let analysis = FrameAnalysis {
                    frame_idx: self.next_idx,
                    command,
                };
                self.next_idx += 1;
                Ok(analysis)
            }
            Err(e) => {
                self.done = true;
                Err(e)
            }
        };

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedFrames {
        remaining: usize,
    }

    impl FrameSource for ScriptedFrames {
        fn next_frame(&mut self) -> MediaResult<Option<Mat>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            Ok(Some(Mat::default()))
        }
    }

    struct ScriptedDetector {
        // one entry per frame, cycled by call count
        per_frame: Vec<Vec<BoundingBox>>,
        calls: AtomicUsize,
    }

    impl DetectPersons for ScriptedDetector {
        fn detect(&self, _frame: &Mat, max_persons: usize) -> MediaResult<Vec<BoundingBox>> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            let mut boxes = self.per_frame[i % self.per_frame.len()].clone();
            boxes.truncate(max_persons);
            Ok(boxes)
        }
    }

    struct FixedPose;

    impl EstimatePose for FixedPose {
        fn estimate(&self, _frame: &Mat, _bbox: &BoundingBox) -> MediaResult<Vec<Pose>> {
            use cmdclip_models::{pose::keypoint, Keypoint};
            let keypoints = vec![Keypoint::new(0.0, 0.0, 0.9); keypoint::COUNT];
            Ok(vec![Pose::new(keypoints)])
        }
    }

    fn boxes_at(centers: &[f32]) -> Vec<BoundingBox> {
        centers
            .iter()
            .map(|&cx| BoundingBox::new(cx - 10.0, 0.0, cx + 10.0, 100.0))
            .collect()
    }

    #[test]
    fn test_select_target_empty() {
        assert!(select_target(&[], Side::Left).is_none());
    }

    #[test]
    fn test_select_target_single_candidate_any_side() {
        let boxes = boxes_at(&[1800.0]);
        assert!(select_target(&boxes, Side::Left).is_some());
        assert!(select_target(&boxes, Side::Right).is_some());
    }

    #[test]
    fn test_select_target_picks_by_side() {
        let boxes = boxes_at(&[400.0, 1500.0]);
        let left = select_target(&boxes, Side::Left).unwrap();
        let right = select_target(&boxes, Side::Right).unwrap();
        assert!((left.center_x() - 400.0).abs() < 1e-4);
        assert!((right.center_x() - 1500.0).abs() < 1e-4);
    }

    #[test]
    fn test_select_target_tie_keeps_first() {
        let boxes = boxes_at(&[800.0, 800.0]);
        let picked = select_target(&boxes, Side::Left).unwrap();
        assert!(std::ptr::eq(picked, &boxes[0]));
        let picked = select_target(&boxes, Side::Right).unwrap();
        assert!(std::ptr::eq(picked, &boxes[0]));
    }

    #[test]
    fn test_stream_indices_are_strictly_increasing() {
        let detector = ScriptedDetector {
            per_frame: vec![boxes_at(&[500.0])],
            calls: AtomicUsize::new(0),
        };
        let estimator = FixedPose;
        let analyzer = VideoAnalyzer::new(&detector, &estimator, Side::Left);

        let frames = ScriptedFrames { remaining: 5 };
        let results: Vec<_> = analyzer
            .analyze(frames, |_pose| None)
            .collect::<MediaResult<Vec<_>>>()
            .unwrap();

        let indices: Vec<u64> = results.iter().map(|a| a.frame_idx).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_stream_empty_frame_keeps_its_index() {
        // frame 0 has a person, frame 1 has nobody, frame 2 has a person
        let detector = ScriptedDetector {
            per_frame: vec![boxes_at(&[500.0]), vec![], boxes_at(&[500.0])],
            calls: AtomicUsize::new(0),
        };
        let estimator = FixedPose;
        let analyzer = VideoAnalyzer::new(&detector, &estimator, Side::Left);

        let frames = ScriptedFrames { remaining: 3 };
        let results: Vec<_> = analyzer
            .analyze(frames, |_pose| Some(Command::new("qcf_punch", Vec::new())))
            .collect::<MediaResult<Vec<_>>>()
            .unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].command.is_some());
        assert!(results[1].command.is_none());
        assert_eq!(results[1].frame_idx, 1);
        assert!(results[2].command.is_some());
    }

    #[test]
    fn test_stream_stops_after_decode_error() {
        struct FailingFrames {
            yielded: bool,
        }

        impl FrameSource for FailingFrames {
            fn next_frame(&mut self) -> MediaResult<Option<Mat>> {
                if self.yielded {
                    return Err(crate::error::MediaError::InvalidVideo(
                        "truncated stream".to_string(),
                    ));
                }
                self.yielded = true;
                Ok(Some(Mat::default()))
            }
        }

        let detector = ScriptedDetector {
            per_frame: vec![boxes_at(&[500.0])],
            calls: AtomicUsize::new(0),
        };
        let estimator = FixedPose;
        let analyzer = VideoAnalyzer::new(&detector, &estimator, Side::Left);

        let mut stream = analyzer.analyze(FailingFrames { yielded: false }, |_| None);
        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().unwrap().is_err());
        assert!(stream.next().is_none());
    }
}
