//! Scoped per-frame video decode.

use std::path::Path;

use opencv::core::Mat;
use opencv::prelude::{MatTraitConst, VideoCaptureTrait, VideoCaptureTraitConst};
use opencv::videoio::{VideoCapture, CAP_ANY};
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Source of decoded frames in strict source order.
///
/// Implemented by [`FrameReader`]; the analysis pipeline is generic over
/// this seam so it can be driven by scripted frames in tests.
pub trait FrameSource {
    /// Decode the next frame, or `None` when the source is exhausted.
    fn next_frame(&mut self) -> MediaResult<Option<Mat>>;
}

/// Forward-only frame reader over an OpenCV `VideoCapture` handle.
///
/// Frames are decoded one at a time in source order; the reader never
/// buffers the whole video. The capture handle is released explicitly on
/// exhaustion and again from `Drop`, so early termination on the consumer
/// side cannot leak the decoder.
pub struct FrameReader {
    cap: VideoCapture,
    released: bool,
}

impl FrameReader {
    /// Open a video file for sequential decoding.
    pub fn open(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| MediaError::InvalidVideo(format!("Non-UTF8 path: {:?}", path)))?;

        let cap = VideoCapture::from_file(path_str, CAP_ANY)
            .map_err(|e| MediaError::InvalidVideo(format!("Failed to open video: {}", e)))?;

        if !cap.is_opened().unwrap_or(false) {
            return Err(MediaError::InvalidVideo(format!(
                "Failed to open video file: {}",
                path.display()
            )));
        }

        debug!("Opened video for frame decode: {}", path.display());
        Ok(Self {
            cap,
            released: false,
        })
    }

    /// Decode the next frame, or `None` when the source is exhausted.
    ///
    /// The underlying handle is released as soon as exhaustion is observed.
    pub fn next_frame(&mut self) -> MediaResult<Option<Mat>> {
        if self.released {
            return Ok(None);
        }

        let mut frame = Mat::default();
        let read = self
            .cap
            .read(&mut frame)
            .map_err(|e| MediaError::InvalidVideo(format!("Failed to read frame: {}", e)))?;

        if !read || frame.empty() {
            self.release();
            return Ok(None);
        }

        Ok(Some(frame))
    }

    /// Release the capture handle. Idempotent.
    pub fn release(&mut self) {
        if !self.released {
            self.cap.release().ok();
            self.released = true;
        }
    }
}

impl FrameSource for FrameReader {
    fn next_frame(&mut self) -> MediaResult<Option<Mat>> {
        FrameReader::next_frame(self)
    }
}

impl Drop for FrameReader {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file_fails() {
        let err = FrameReader::open("/nonexistent/clip.mp4");
        assert!(err.is_err());
    }

    #[test]
    fn test_release_before_exhaustion_stops_reads() {
        // a consumer dropping the stream early must leave no live handle
        let mut reader = FrameReader {
            cap: VideoCapture::default().unwrap(),
            released: false,
        };

        reader.release();
        assert!(reader.released);
        assert!(matches!(reader.next_frame(), Ok(None)));

        // second release is a no-op; Drop performs it again on unwind
        reader.release();
    }

    #[test]
    fn test_unreadable_capture_releases_on_exhaustion() {
        let mut reader = FrameReader {
            cap: VideoCapture::default().unwrap(),
            released: false,
        };

        assert!(matches!(reader.next_frame(), Ok(None)));
        assert!(reader.released);
    }
}
