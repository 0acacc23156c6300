//! Morphological refinement of the binary foreground mask.
//!
//! Erosion removes isolated noise pixels and narrow spurs; dilation
//! restores the blob and bridges small gaps. The pass counts and the
//! erode/dilate order are configuration ([`MorphOrder`]); the capture
//! scripts this crate replaces disagreed on the order between variants,
//! so it is exposed rather than hardcoded.
//!
//! Structuring elements map onto [`imageproc::morphology`] norms:
//! a cross of size `2k+1` is the L1 ball of radius `k`, a rectangle the
//! L∞ ball.

use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, erode};

use crate::types::{KernelShape, MorphOrder, PipelineConfig};

/// Distance norm whose unit ball matches the structuring element shape.
#[must_use]
pub const fn structuring_norm(shape: KernelShape) -> Norm {
    match shape {
        KernelShape::Cross => Norm::L1,
        KernelShape::Rect => Norm::LInf,
    }
}

/// Structuring element radius for a nominal odd kernel size.
///
/// Sizes of 1 or less give radius 0, which disables the operation.
fn kernel_radius(size: u32) -> u8 {
    u8::try_from(size.saturating_sub(1) / 2).unwrap_or(u8::MAX)
}

/// Apply `iterations` erosion passes with the given structuring element.
#[must_use = "returns the eroded mask"]
pub fn erode_mask(mask: &GrayImage, shape: KernelShape, size: u32, iterations: u32) -> GrayImage {
    let radius = kernel_radius(size);
    if radius == 0 || iterations == 0 {
        return mask.clone();
    }
    let norm = structuring_norm(shape);
    let mut out = erode(mask, norm, radius);
    for _ in 1..iterations {
        out = erode(&out, norm, radius);
    }
    out
}

/// Apply `iterations` dilation passes with the given structuring element.
#[must_use = "returns the dilated mask"]
pub fn dilate_mask(mask: &GrayImage, shape: KernelShape, size: u32, iterations: u32) -> GrayImage {
    let radius = kernel_radius(size);
    if radius == 0 || iterations == 0 {
        return mask.clone();
    }
    let norm = structuring_norm(shape);
    let mut out = dilate(mask, norm, radius);
    for _ in 1..iterations {
        out = dilate(&out, norm, radius);
    }
    out
}

/// Refine a binary mask with the configured erosion/dilation sequence.
#[must_use = "returns the refined mask"]
pub fn refine(mask: &GrayImage, config: &PipelineConfig) -> GrayImage {
    let shape = config.morph_kernel_shape;
    let size = config.morph_kernel_size;
    match config.morph_order {
        MorphOrder::ErodeThenDilate => {
            let eroded = erode_mask(mask, shape, size, config.erode_iterations);
            dilate_mask(&eroded, shape, size, config.dilate_iterations)
        }
        MorphOrder::DilateThenErode => {
            let dilated = dilate_mask(mask, shape, size, config.dilate_iterations);
            erode_mask(&dilated, shape, size, config.erode_iterations)
        }
    }
}
