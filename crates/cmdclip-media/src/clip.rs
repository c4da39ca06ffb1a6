//! Video trim and overlay-render operations.

use std::path::Path;

use tracing::info;

use cmdclip_models::OverlayEntry;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// How many frames each command icon stays on screen.
pub const OVERLAY_HOLD_FRAMES: u64 = 30;

/// Trim a segment out of a video file without re-encoding.
pub async fn cut<P: AsRef<Path>>(input: P, output: P, start: f64, end: f64) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    if end <= start {
        return Err(MediaError::InvalidVideo(format!(
            "Invalid trim range: {} to {}",
            start, end
        )));
    }

    info!(
        "Cutting {} -> {} ({:.2}s to {:.2}s)",
        input.display(),
        output.display(),
        start,
        end
    );

    let cmd = FfmpegCommand::new(input, output)
        .seek(start)
        .duration(end - start)
        .codec_copy();

    FfmpegRunner::new().run(&cmd).await
}

/// Burn command icons into a video.
///
/// Each overlay entry becomes an `overlay` filter gated with
/// `enable='between(n, frame, frame + hold)'`, so the icon appears at its
/// recognized frame and stays up for a short hold window. Entries must be in
/// frame order; the filter graph chains them in that order.
pub async fn overlay_images<P: AsRef<Path>>(
    input: P,
    output: P,
    overlays: &[OverlayEntry],
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    if overlays.is_empty() {
        return Err(MediaError::InvalidVideo(
            "No overlay entries to render".to_string(),
        ));
    }

    info!(
        "Rendering {} overlays: {} -> {}",
        overlays.len(),
        input.display(),
        output.display()
    );

    let mut cmd = FfmpegCommand::new(input, output);
    for entry in overlays {
        cmd = cmd.extra_input(&entry.image);
    }

    let filter = build_overlay_filter(overlays);
    let cmd = cmd
        .filter_complex(filter)
        .output_args(["-map", &format!("[v{}]", overlays.len())])
        .output_args(["-map", "0:a?"])
        .video_codec("libx264")
        .audio_codec("copy");

    FfmpegRunner::new().run(&cmd).await
}

/// Build the `-filter_complex` graph chaining one `overlay` per entry.
///
/// Icons are placed bottom-center with a fixed margin. Input index `i + 1`
/// corresponds to entry `i` (input 0 is the video).
fn build_overlay_filter(overlays: &[OverlayEntry]) -> String {
    let mut parts = Vec::with_capacity(overlays.len());
    let mut src = "[0:v]".to_string();

    for (i, entry) in overlays.iter().enumerate() {
        let dst = format!("[v{}]", i + 1);
        parts.push(format!(
            "{}[{}:v]overlay=x=(W-w)/2:y=H-h-40:enable='between(n,{},{})'{}",
            src,
            i + 1,
            entry.frame,
            entry.frame + OVERLAY_HOLD_FRAMES,
            dst
        ));
        src = dst;
    }

    parts.join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_filter_single() {
        let overlays = vec![OverlayEntry::new(10, "/job/10.png")];
        let filter = build_overlay_filter(&overlays);
        assert_eq!(
            filter,
            "[0:v][1:v]overlay=x=(W-w)/2:y=H-h-40:enable='between(n,10,40)'[v1]"
        );
    }

    #[test]
    fn test_overlay_filter_chains_in_frame_order() {
        let overlays = vec![
            OverlayEntry::new(10, "/job/10.png"),
            OverlayEntry::new(40, "/job/40.png"),
        ];
        let filter = build_overlay_filter(&overlays);
        let parts: Vec<&str> = filter.split(';').collect();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].starts_with("[0:v][1:v]"));
        assert!(parts[0].ends_with("[v1]"));
        assert!(parts[1].starts_with("[v1][2:v]"));
        assert!(parts[1].ends_with("[v2]"));
        assert!(parts[1].contains("between(n,40,70)"));
    }

    #[tokio::test]
    async fn test_cut_rejects_inverted_range() {
        let err = cut("in.mp4", "out.mp4", 5.0, 2.0).await.unwrap_err();
        assert!(matches!(err, MediaError::InvalidVideo(_)));
    }
}
