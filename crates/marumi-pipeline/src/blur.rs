//! Gaussian smoothing for noise reduction before segmentation.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`]. The pipeline is
//! configured with an odd window size rather than a sigma, matching the
//! convention of the capture tooling this crate replaces; the window
//! size is mapped to a sigma before filtering.

use image::GrayImage;

/// Sigma for a given odd Gaussian window size.
///
/// Uses the OpenCV convention `0.3·((k−1)·0.5 − 1) + 0.8`, so a 3x3
/// window maps to sigma 0.8. Window sizes of 1 or less map to 0.0
/// (no smoothing).
#[must_use]
pub fn sigma_for_kernel(kernel_size: u32) -> f32 {
    if kernel_size <= 1 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let k = kernel_size as f32;
    0.3f32.mul_add((k - 1.0).mul_add(0.5, -1.0), 0.8)
}

/// Apply Gaussian smoothing with the given window size.
///
/// Window sizes of 1 or less return the image unchanged, since the
/// underlying filter panics on non-positive sigma.
#[must_use = "returns the smoothed image"]
pub fn gaussian_blur(image: &GrayImage, kernel_size: u32) -> GrayImage {
    let sigma = sigma_for_kernel(kernel_size);
    if sigma <= 0.0 {
        return image.clone();
    }

    imageproc::filter::gaussian_blur_f32(image, sigma)
}
