//! Shared types for the marumi shape-metrics pipeline.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::contour::{ContourId, ContourSet};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of a grayscale image.
    #[must_use]
    pub fn of(image: &GrayImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total pixel count (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Structuring element shape for morphological operations.
///
/// `Cross` matches a diamond (L1-ball) neighborhood, `Rect` a square
/// (L∞-ball) neighborhood of the same nominal size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KernelShape {
    /// Cross / diamond structuring element.
    #[default]
    Cross,
    /// Full rectangular structuring element.
    Rect,
}

/// Order in which erosion and dilation passes are applied.
///
/// The order is configuration rather than a fixed property of the
/// pipeline: erode-first removes speckle noise before re-growing the
/// blob, dilate-first closes gaps in a fragmented foreground before
/// trimming it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MorphOrder {
    /// All erosion passes, then all dilation passes.
    #[default]
    ErodeThenDilate,
    /// All dilation passes, then all erosion passes.
    DilateThenErode,
}

/// Configuration for the shape-metrics pipeline.
///
/// All parameters are explicit; there is no global or implicit state.
/// Fields are public for direct construction, but
/// [`builder`](Self::builder) provides validated construction that
/// rejects invalid combinations with [`PipelineError::InvalidConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Gaussian blur window size in pixels (odd). A kernel of 1 or less
    /// disables smoothing.
    pub blur_kernel_size: u32,

    /// Fixed binary threshold applied to the background-minus-subject
    /// difference image. Differences above this value become foreground.
    pub threshold_cutoff: u8,

    /// Structuring element shape for erosion and dilation.
    pub morph_kernel_shape: KernelShape,

    /// Structuring element size in pixels (odd). Sizes below 3 disable
    /// morphological refinement.
    pub morph_kernel_size: u32,

    /// Whether erosion passes run before or after dilation passes.
    pub morph_order: MorphOrder,

    /// Number of erosion passes.
    pub erode_iterations: u32,

    /// Number of dilation passes.
    pub dilate_iterations: u32,

    /// Canny low threshold. Gradient magnitudes between `canny_low` and
    /// `canny_high` are edges only if connected to a strong edge.
    ///
    /// Must be at least [`edge::MIN_THRESHOLD`](crate::edge::MIN_THRESHOLD)
    /// and at most `canny_high`; [`edge::canny`](crate::edge::canny) clamps
    /// out-of-range values.
    pub canny_low: f32,

    /// Canny high threshold. Gradient magnitudes above this value are
    /// definite edges.
    pub canny_high: f32,
}

impl PipelineConfig {
    /// Default Gaussian blur window size.
    pub const DEFAULT_BLUR_KERNEL_SIZE: u32 = 3;
    /// Default difference-image threshold.
    pub const DEFAULT_THRESHOLD_CUTOFF: u8 = 10;
    /// Default structuring element shape.
    pub const DEFAULT_MORPH_KERNEL_SHAPE: KernelShape = KernelShape::Cross;
    /// Default structuring element size.
    pub const DEFAULT_MORPH_KERNEL_SIZE: u32 = 3;
    /// Default morphological operation order.
    pub const DEFAULT_MORPH_ORDER: MorphOrder = MorphOrder::ErodeThenDilate;
    /// Default erosion pass count.
    pub const DEFAULT_ERODE_ITERATIONS: u32 = 2;
    /// Default dilation pass count.
    pub const DEFAULT_DILATE_ITERATIONS: u32 = 2;
    /// Default Canny low threshold.
    pub const DEFAULT_CANNY_LOW: f32 = 50.0;
    /// Default Canny high threshold.
    pub const DEFAULT_CANNY_HIGH: f32 = 150.0;

    /// Start building a validated configuration from the defaults.
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the offending
    /// field when a kernel size is even, a Canny threshold is not
    /// finite, or `canny_low > canny_high`.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.blur_kernel_size % 2 == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "blur_kernel_size must be odd, got {}",
                self.blur_kernel_size,
            )));
        }
        if self.morph_kernel_size % 2 == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "morph_kernel_size must be odd, got {}",
                self.morph_kernel_size,
            )));
        }
        if !self.canny_low.is_finite() || !self.canny_high.is_finite() {
            return Err(PipelineError::InvalidConfig(
                "canny thresholds must be finite".to_string(),
            ));
        }
        if self.canny_low > self.canny_high {
            return Err(PipelineError::InvalidConfig(format!(
                "canny_low ({}) must not exceed canny_high ({})",
                self.canny_low, self.canny_high,
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            blur_kernel_size: Self::DEFAULT_BLUR_KERNEL_SIZE,
            threshold_cutoff: Self::DEFAULT_THRESHOLD_CUTOFF,
            morph_kernel_shape: Self::DEFAULT_MORPH_KERNEL_SHAPE,
            morph_kernel_size: Self::DEFAULT_MORPH_KERNEL_SIZE,
            morph_order: Self::DEFAULT_MORPH_ORDER,
            erode_iterations: Self::DEFAULT_ERODE_ITERATIONS,
            dilate_iterations: Self::DEFAULT_DILATE_ITERATIONS,
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
        }
    }
}

/// Builder for [`PipelineConfig`] with construction-time validation.
#[derive(Debug, Clone)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the Gaussian blur window size.
    #[must_use]
    pub const fn blur_kernel_size(mut self, size: u32) -> Self {
        self.config.blur_kernel_size = size;
        self
    }

    /// Set the difference-image threshold.
    #[must_use]
    pub const fn threshold_cutoff(mut self, cutoff: u8) -> Self {
        self.config.threshold_cutoff = cutoff;
        self
    }

    /// Set the structuring element shape.
    #[must_use]
    pub const fn morph_kernel_shape(mut self, shape: KernelShape) -> Self {
        self.config.morph_kernel_shape = shape;
        self
    }

    /// Set the structuring element size.
    #[must_use]
    pub const fn morph_kernel_size(mut self, size: u32) -> Self {
        self.config.morph_kernel_size = size;
        self
    }

    /// Set the morphological operation order.
    #[must_use]
    pub const fn morph_order(mut self, order: MorphOrder) -> Self {
        self.config.morph_order = order;
        self
    }

    /// Set the erosion pass count.
    #[must_use]
    pub const fn erode_iterations(mut self, iterations: u32) -> Self {
        self.config.erode_iterations = iterations;
        self
    }

    /// Set the dilation pass count.
    #[must_use]
    pub const fn dilate_iterations(mut self, iterations: u32) -> Self {
        self.config.dilate_iterations = iterations;
        self
    }

    /// Set the Canny low threshold.
    #[must_use]
    pub const fn canny_low(mut self, threshold: f32) -> Self {
        self.config.canny_low = threshold;
        self
    }

    /// Set the Canny high threshold.
    #[must_use]
    pub const fn canny_high(mut self, threshold: f32) -> Self {
        self.config.canny_high = threshold;
        self
    }

    /// Validate and produce the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if any invariant checked
    /// by [`PipelineConfig::validate`] fails.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Shape metrics for one selected contour and its convex hull.
///
/// Fully determined by the contour/hull pair that produced it; never
/// mutated after computation. Circularity is `2·sqrt(π·A)/P`, which is
/// 1.0 for an ideal circle and strictly less for any other simple
/// closed curve (isoperimetric inequality).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeMetrics {
    /// Shoelace area enclosed by the selected contour.
    pub area_original: f64,
    /// Closed-loop Euclidean perimeter of the selected contour.
    pub perimeter_original: f64,
    /// Circularity of the selected contour, in (0, 1].
    pub circularity_original: f64,
    /// Shoelace area enclosed by the convex hull.
    pub area_hull: f64,
    /// Closed-loop Euclidean perimeter of the convex hull.
    pub perimeter_hull: f64,
    /// Circularity of the convex hull, in (0, 1].
    pub circularity_hull: f64,
    /// `area_hull / area_original`; at least 1.0.
    pub area_ratio: f64,
    /// `circularity_hull / circularity_original`.
    pub circularity_ratio: f64,
}

/// Final output of one pipeline invocation: metrics plus the wall-clock
/// duration of the processing span (preprocessing through metric
/// computation, excluding any caller I/O).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusReport {
    /// Shape metrics of the selected contour and its hull.
    pub metrics: ShapeMetrics,
    /// Dimensions of the input images.
    pub dimensions: Dimensions,
    /// Wall-clock processing time, serialized as fractional seconds.
    #[serde(with = "crate::diagnostics::duration_serde")]
    pub elapsed: Duration,
}

/// Result of running the pipeline with all intermediate stage outputs
/// preserved.
///
/// Each field captures the output of one logical pipeline stage, for
/// callers that inspect or visualize intermediates (threshold masks,
/// refined masks, edge maps) alongside the metrics.
///
/// Does not derive `PartialEq` because `GrayImage` does not implement it.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Binary foreground mask from blur + subtraction + threshold.
    pub mask: GrayImage,
    /// Mask after morphological refinement.
    pub refined: GrayImage,
    /// Canny edge map of the refined mask.
    pub edges: GrayImage,
    /// All external contours traced from the edge map.
    pub contours: ContourSet,
    /// Handle of the largest-area contour within `contours`.
    pub selected: ContourId,
    /// Convex hull of the selected contour, counter-clockwise, open
    /// (last point does not repeat the first).
    pub hull: Vec<Point>,
    /// Metrics computed from the selected contour and `hull`.
    pub metrics: ShapeMetrics,
    /// Dimensions of the input images.
    pub dimensions: Dimensions,
    /// Wall-clock duration of the processing span.
    pub elapsed: Duration,
}

impl StagedResult {
    /// The selected contour's point sequence.
    #[must_use]
    pub fn selected_contour(&self) -> &[Point] {
        self.contours.get(self.selected)
    }

    /// Collapse to the final [`FocusReport`], discarding intermediates.
    #[must_use]
    pub fn into_report(self) -> FocusReport {
        FocusReport {
            metrics: self.metrics,
            dimensions: self.dimensions,
            elapsed: self.elapsed,
        }
    }
}

/// Errors that can occur during pipeline processing.
///
/// All failure modes are explicit result values; in particular the
/// metric divisions are guarded so a degenerate contour surfaces as
/// [`DegenerateContour`](Self::DegenerateContour) rather than an
/// infinity or NaN.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// Subject and background images have different dimensions. Fatal
    /// for the invocation; retrying with the same inputs cannot succeed.
    #[error("subject dimensions {subject} do not match background dimensions {background}")]
    DimensionMismatch {
        /// Subject image dimensions.
        subject: Dimensions,
        /// Background image dimensions.
        background: Dimensions,
    },

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// The edge map contains no closed boundary. Recoverable: the
    /// caller may skip the image or flag it as unusable.
    #[error("no contour found in the edge map")]
    NoContourFound,

    /// The selected contour (or its hull) encloses no area or has
    /// fewer than three distinct points. Recoverable measurement
    /// failure for this image.
    #[error("selected contour is degenerate")]
    DegenerateContour,
}
