//! Overlay accumulation over the analysis stream.

use std::path::Path;

use tracing::info;

use cmdclip_media::{IconComposer, MediaResult};
use cmdclip_models::{FrameAnalysis, OverlayEntry};

use crate::error::JobError;

/// Drain the analysis stream, rendering one icon per recognized command.
///
/// Icons land in `job_dir` as `<frame_idx>.png` and the returned entries
/// preserve frame order. A clip with zero recognized commands is a
/// business-rule failure, not an empty success.
pub fn accumulate_overlays(
    results: impl Iterator<Item = MediaResult<FrameAnalysis>>,
    composer: &IconComposer,
    job_dir: &Path,
) -> Result<Vec<OverlayEntry>, JobError> {
    let mut entries = Vec::new();
    let mut frames: u64 = 0;

    for result in results {
        let analysis = result.map_err(|e| JobError::Analyze(e.to_string()))?;
        frames += 1;

        let Some(command) = analysis.command else {
            continue;
        };

        let image = job_dir.join(format!("{}.png", analysis.frame_idx));
        composer
            .compose(&command.inputs, &image)
            .map_err(|e| JobError::Analyze(e.to_string()))?;

        info!(
            frame = analysis.frame_idx,
            command = %command,
            "Rendered command icon"
        );
        entries.push(OverlayEntry::new(analysis.frame_idx, image));
    }

    if entries.is_empty() {
        return Err(JobError::NoCommand);
    }

    info!(frames, overlays = entries.len(), "Analysis complete");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdclip_models::{Command, Input};

    fn analysis(frame_idx: u64, command: Option<Command>) -> MediaResult<FrameAnalysis> {
        Ok(FrameAnalysis { frame_idx, command })
    }

    fn punch() -> Command {
        Command::new("qcf_punch", vec![Input::Down, Input::Forward, Input::Punch])
    }

    #[test]
    fn test_accumulate_writes_icons_in_frame_order() {
        let dir = tempfile::tempdir().unwrap();
        let composer = IconComposer::default();

        let results = vec![
            analysis(0, None),
            analysis(1, Some(punch())),
            analysis(2, None),
            analysis(3, Some(punch())),
        ];

        let entries =
            accumulate_overlays(results.into_iter(), &composer, dir.path()).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].frame, 1);
        assert_eq!(entries[1].frame, 3);
        assert!(entries[0].image.exists());
        assert!(entries[1].image.exists());
    }

    #[test]
    fn test_no_commands_is_a_typed_failure() {
        let dir = tempfile::tempdir().unwrap();
        let composer = IconComposer::default();

        let results = vec![analysis(0, None), analysis(1, None)];
        let err = accumulate_overlays(results.into_iter(), &composer, dir.path());

        assert!(matches!(err, Err(JobError::NoCommand)));
    }

    #[test]
    fn test_stream_error_maps_to_analyze_failure() {
        let dir = tempfile::tempdir().unwrap();
        let composer = IconComposer::default();

        let results = vec![
            analysis(0, Some(punch())),
            Err(cmdclip_media::MediaError::InvalidVideo("truncated".into())),
        ];
        let err = accumulate_overlays(results.into_iter(), &composer, dir.path());

        assert!(matches!(err, Err(JobError::Analyze(_))));
    }
}
