//! Background-referenced segmentation: blur, subtract, threshold.
//!
//! The subject is imaged against a known empty-scene reference. Both
//! grids are smoothed, the subject is subtracted from the background
//! with saturation (the object is darker than the empty scene, so only
//! positive differences carry signal), and a fixed cutoff turns the
//! difference into a binary foreground mask.

use image::{GrayImage, Luma};
use imageproc::contrast::{ThresholdType, threshold};

use crate::types::{Dimensions, PipelineConfig, PipelineError};

/// Pixel-wise saturating `background − subject`.
///
/// Subject pixels darker than the background survive as positive
/// differences; brighter pixels clamp to zero.
///
/// # Errors
///
/// Returns [`PipelineError::DimensionMismatch`] if the two images have
/// different dimensions.
pub fn subtract_background(
    subject: &GrayImage,
    background: &GrayImage,
) -> Result<GrayImage, PipelineError> {
    if subject.dimensions() != background.dimensions() {
        return Err(PipelineError::DimensionMismatch {
            subject: Dimensions::of(subject),
            background: Dimensions::of(background),
        });
    }

    Ok(GrayImage::from_fn(
        subject.width(),
        subject.height(),
        |x, y| {
            let b = background.get_pixel(x, y).0[0];
            let s = subject.get_pixel(x, y).0[0];
            Luma([b.saturating_sub(s)])
        },
    ))
}

/// Fixed-cutoff binary threshold: 255 where the value exceeds `cutoff`,
/// else 0.
#[must_use = "returns the binary mask"]
pub fn threshold_mask(difference: &GrayImage, cutoff: u8) -> GrayImage {
    threshold(difference, cutoff, ThresholdType::Binary)
}

/// Produce the binary foreground mask for a subject/background pair.
///
/// Smooths both inputs with the configured window, subtracts, and
/// thresholds at `config.threshold_cutoff`.
///
/// # Errors
///
/// Returns [`PipelineError::DimensionMismatch`] if the two images have
/// different dimensions.
pub fn foreground_mask(
    subject: &GrayImage,
    background: &GrayImage,
    config: &PipelineConfig,
) -> Result<GrayImage, PipelineError> {
    let blurred_subject = crate::blur::gaussian_blur(subject, config.blur_kernel_size);
    let blurred_background = crate::blur::gaussian_blur(background, config.blur_kernel_size);
    let difference = subtract_background(&blurred_subject, &blurred_background)?;
    Ok(threshold_mask(&difference, config.threshold_cutoff))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn uniform(width: u32, height: u32, value: u8) -> GrayImage {
        GrayImage::from_fn(width, height, |_, _| Luma([value]))
    }

    #[test]
    fn subtraction_saturates_at_zero() {
        let subject = uniform(4, 4, 200);
        let background = uniform(4, 4, 100);
        let diff = subtract_background(&subject, &background).unwrap();
        // Subject brighter than background: everything clamps to zero.
        assert!(diff.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn subtraction_keeps_positive_differences() {
        let subject = uniform(4, 4, 40);
        let background = uniform(4, 4, 100);
        let diff = subtract_background(&subject, &background).unwrap();
        assert!(diff.pixels().all(|p| p.0[0] == 60));
    }

    #[test]
    fn mismatched_dimensions_rejected() {
        let subject = uniform(4, 4, 0);
        let background = uniform(5, 4, 0);
        let result = subtract_background(&subject, &background);
        assert!(matches!(
            result,
            Err(PipelineError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn mismatch_error_reports_both_sizes() {
        let subject = uniform(4, 6, 0);
        let background = uniform(5, 4, 0);
        match subtract_background(&subject, &background) {
            Err(PipelineError::DimensionMismatch {
                subject: s,
                background: b,
            }) => {
                assert_eq!(s.width, 4);
                assert_eq!(s.height, 6);
                assert_eq!(b.width, 5);
                assert_eq!(b.height, 4);
            }
            other => panic!("expected DimensionMismatch, got {other:?}"),
        }
    }

    #[test]
    fn threshold_is_strictly_greater_than_cutoff() {
        let diff = GrayImage::from_fn(3, 1, |x, _| Luma([match x {
            0 => 9,
            1 => 10,
            _ => 11,
        }]));
        let mask = threshold_mask(&diff, 10);
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(mask.get_pixel(1, 0).0[0], 0);
        assert_eq!(mask.get_pixel(2, 0).0[0], 255);
    }

    #[test]
    fn dark_square_on_bright_background_becomes_foreground() {
        let background = uniform(20, 20, 200);
        let subject = GrayImage::from_fn(20, 20, |x, y| {
            if (5..15).contains(&x) && (5..15).contains(&y) {
                Luma([30])
            } else {
                Luma([200])
            }
        });
        let mask = foreground_mask(&subject, &background, &PipelineConfig::default())
            .unwrap();

        // Interior of the square is foreground, far corners are not.
        assert_eq!(mask.get_pixel(10, 10).0[0], 255);
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(mask.get_pixel(19, 19).0[0], 0);
        // Binary output only.
        assert!(mask.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn identical_subject_and_background_yield_empty_mask() {
        let background = uniform(16, 16, 255);
        let mask = foreground_mask(&background.clone(), &background, &PipelineConfig::default())
            .unwrap();
        assert!(mask.pixels().all(|p| p.0[0] == 0));
    }
}
