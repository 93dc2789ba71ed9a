//! Nearest-cell sampling of a panorama frame
//!
//! No filtering: every element takes the color of exactly one cell, so
//! elements that quantize to the same address always render identically.

use crate::frame::TextureFrame;
use crate::models::{Color, PixelAddress, BLACK};

/// Color of the cell at `address`, clamping out-of-range coordinates to
/// the frame edge.
///
/// Only a frame with no cells at all (which [`TextureFrame::from_image`]
/// refuses to build) yields black.
pub fn sample(frame: &TextureFrame, address: PixelAddress) -> Color {
    let px = address.px.min(frame.width().saturating_sub(1));
    let py = address.py.min(frame.height().saturating_sub(1));
    frame.get(px, py).unwrap_or(BLACK)
}

/// Sample every address; output is index-aligned with `addresses`.
pub fn sample_all(frame: &TextureFrame, addresses: &[PixelAddress]) -> Vec<Color> {
    addresses.iter().map(|&address| sample(frame, address)).collect()
}
