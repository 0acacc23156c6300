//! Canny edge extraction from the refined foreground mask.
//!
//! Wraps [`imageproc::edges::canny`]. Returns a binary image where
//! white pixels (255) are edges and black pixels (0) are background;
//! on a clean binary mask this yields thin one-pixel boundary curves.

use image::GrayImage;

/// Minimum allowed Canny threshold.
///
/// A low threshold of zero treats every pixel with any gradient as a
/// potential edge, producing a dense edge map that drowns contour
/// selection in noise.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Detect edges using the Canny algorithm.
///
/// Internally performs Sobel gradient computation, non-maximum
/// suppression, and hysteresis thresholding. Pixels with gradient
/// magnitude above `high_threshold` are definite edges; those between
/// the thresholds are edges only if connected to a definite edge.
///
/// Both thresholds are clamped to a minimum of [`MIN_THRESHOLD`] and
/// `low_threshold` is clamped to be at most `high_threshold`.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let high = high_threshold.max(MIN_THRESHOLD);
    let low = low_threshold.max(MIN_THRESHOLD).min(high);
    imageproc::edges::canny(image, low, high)
}
