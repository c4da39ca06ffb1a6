//! Command icon rasterization.
//!
//! Draws a horizontal strip of input tiles (arrows for directions, colored
//! buttons for attacks) into an RGBA PNG that ffmpeg later burns into the
//! clip. Icons are rendered in player-1 orientation: `Forward` points
//! right regardless of which side the tracked player is on.

use std::path::Path;

use image::{Rgba, RgbaImage};
use tracing::debug;

use cmdclip_models::Input;

use crate::error::{MediaError, MediaResult};

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 160]);
const ARROW: Rgba<u8> = Rgba([255, 255, 255, 255]);
const PUNCH: Rgba<u8> = Rgba([220, 60, 60, 255]);
const KICK: Rgba<u8> = Rgba([70, 120, 230, 255]);

/// Renders command input strips as PNG images.
#[derive(Debug, Clone)]
pub struct IconComposer {
    /// Side length of one input tile in pixels
    tile_size: u32,
}

impl Default for IconComposer {
    fn default() -> Self {
        Self { tile_size: 64 }
    }
}

impl IconComposer {
    pub fn new(tile_size: u32) -> Self {
        Self { tile_size }
    }

    /// Render `inputs` left to right into a PNG at `path`.
    pub fn compose(&self, inputs: &[Input], path: &Path) -> MediaResult<()> {
        if inputs.is_empty() {
            return Err(MediaError::internal("Cannot compose icon with no inputs"));
        }

        let tile = self.tile_size;
        let margin = tile / 8;
        let width = tile * inputs.len() as u32 + margin * 2;
        let height = tile + margin * 2;

        let mut img = RgbaImage::from_pixel(width, height, BACKGROUND);

        for (i, input) in inputs.iter().enumerate() {
            let x0 = margin + tile * i as u32;
            match direction_vector(input) {
                Some((dx, dy)) => draw_arrow(&mut img, x0, margin, tile, dx, dy),
                None => {
                    let color = if *input == Input::Punch { PUNCH } else { KICK };
                    draw_button(&mut img, x0, margin, tile, color);
                }
            }
        }

        img.save(path)
            .map_err(|e| MediaError::Io(std::io::Error::other(e)))?;

        debug!(path = %path.display(), inputs = inputs.len(), "Composed command icon");
        Ok(())
    }
}

/// Unit-ish direction for an arrow tile, screen coordinates (y grows down).
fn direction_vector(input: &Input) -> Option<(f32, f32)> {
    const D: f32 = std::f32::consts::FRAC_1_SQRT_2;
    match input {
        Input::Up => Some((0.0, -1.0)),
        Input::Down => Some((0.0, 1.0)),
        Input::Back => Some((-1.0, 0.0)),
        Input::Forward => Some((1.0, 0.0)),
        Input::DownBack => Some((-D, D)),
        Input::DownForward => Some((D, D)),
        Input::UpBack => Some((-D, -D)),
        Input::UpForward => Some((D, -D)),
        Input::Punch | Input::Kick => None,
    }
}

/// Fill an isoceles triangle pointing along `(dx, dy)`, centered in the tile.
fn draw_arrow(img: &mut RgbaImage, x0: u32, y0: u32, tile: u32, dx: f32, dy: f32) {
    let t = tile as f32;
    let cx = x0 as f32 + t / 2.0;
    let cy = y0 as f32 + t / 2.0;

    let apex = (cx + dx * t * 0.38, cy + dy * t * 0.38);
    let base = (cx - dx * t * 0.22, cy - dy * t * 0.22);
    // perpendicular half-width of the base
    let (px, py) = (-dy * t * 0.26, dx * t * 0.26);
    let b1 = (base.0 + px, base.1 + py);
    let b2 = (base.0 - px, base.1 - py);

    for y in y0..y0 + tile {
        for x in x0..x0 + tile {
            let p = (x as f32 + 0.5, y as f32 + 0.5);
            if point_in_triangle(p, apex, b1, b2) {
                img.put_pixel(x, y, ARROW);
            }
        }
    }
}

/// Fill a filled circle button centered in the tile.
fn draw_button(img: &mut RgbaImage, x0: u32, y0: u32, tile: u32, color: Rgba<u8>) {
    let t = tile as f32;
    let cx = x0 as f32 + t / 2.0;
    let cy = y0 as f32 + t / 2.0;
    let r = t * 0.36;

    for y in y0..y0 + tile {
        for x in x0..x0 + tile {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            if dx * dx + dy * dy <= r * r {
                img.put_pixel(x, y, color);
            }
        }
    }
}

fn point_in_triangle(p: (f32, f32), a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> bool {
    fn sign(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
        (p.0 - b.0) * (a.1 - b.1) - (a.0 - b.0) * (p.1 - b.1)
    }

    let d1 = sign(p, a, b);
    let d2 = sign(p, b, c);
    let d3 = sign(p, c, a);

    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_compose_writes_decodable_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("236p.png");

        let composer = IconComposer::default();
        let inputs = [Input::Down, Input::DownForward, Input::Forward, Input::Punch];
        composer.compose(&inputs, &path).unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!(img.width(), 64 * 4 + 16);
        assert_eq!(img.height(), 64 + 16);
    }

    #[test]
    fn test_compose_rejects_empty_inputs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.png");

        let composer = IconComposer::default();
        assert!(composer.compose(&[], &path).is_err());
        assert!(!path.exists());
    }
}
