//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::process_staged`] which runs the whole pipeline in
//! one call, [`Pipeline`] lets the caller drive execution one step at
//! a time:
//!
//! ```rust
//! # use marumi_pipeline::{GrayImage, Pipeline, PipelineConfig, PipelineError};
//! # fn run(subject: GrayImage, background: GrayImage) -> Result<(), PipelineError> {
//! let config = PipelineConfig::default();
//! let measured = Pipeline::new(subject, background, config)
//!     .preprocess()?
//!     .refine()
//!     .detect_edges()
//!     .trace_contours()?
//!     .measure()?;
//!
//! let staged = measured.into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline
//! state (or `Result` for fallible stages), carrying all previously
//! computed intermediates. Accessor methods expose the current stage's
//! output for inspection between steps.
//!
//! The wall clock starts when [`Pipeline::preprocess`] is entered and
//! stops when [`ContoursTraced::measure`] finishes, so the recorded
//! span covers exactly the processing stages and none of the caller's
//! I/O — inspection time between stages is included, which is the
//! price of driving the pipeline incrementally.

use std::time::Instant;

use crate::contour::{ContourId, ContourSet};
use crate::types::{
    Dimensions, GrayImage, PipelineConfig, PipelineError, Point, StagedResult,
};

/// Entry point for incremental pipeline execution.
///
/// Owns the subject and background images and the configuration. Call
/// [`preprocess`](Self::preprocess) to start processing.
#[must_use = "pipeline stages are consumed by advancing — call .preprocess() to continue"]
pub struct Pipeline {
    config: PipelineConfig,
    subject: GrayImage,
    background: GrayImage,
}

impl Pipeline {
    /// Stage a subject/background pair for processing.
    pub const fn new(subject: GrayImage, background: GrayImage, config: PipelineConfig) -> Self {
        Self {
            config,
            subject,
            background,
        }
    }

    /// Blur, subtract, and threshold into a binary foreground mask,
    /// advancing to [`Masked`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DimensionMismatch`] if the subject and
    /// background differ in size.
    pub fn preprocess(self) -> Result<Masked, PipelineError> {
        let started = Instant::now();
        let dimensions = Dimensions::of(&self.subject);
        let mask = crate::preprocess::foreground_mask(&self.subject, &self.background, &self.config)?;
        Ok(Masked {
            config: self.config,
            dimensions,
            mask,
            started,
        })
    }
}

/// Pipeline state holding the binary foreground mask.
#[must_use = "pipeline stages are consumed by advancing — call .refine() to continue"]
pub struct Masked {
    config: PipelineConfig,
    dimensions: Dimensions,
    mask: GrayImage,
    started: Instant,
}

impl Masked {
    /// The binary foreground mask.
    #[must_use]
    pub const fn mask(&self) -> &GrayImage {
        &self.mask
    }

    /// Apply the configured morphological sequence, advancing to
    /// [`Refined`].
    pub fn refine(self) -> Refined {
        let refined = crate::morphology::refine(&self.mask, &self.config);
        Refined {
            config: self.config,
            dimensions: self.dimensions,
            mask: self.mask,
            refined,
            started: self.started,
        }
    }
}

/// Pipeline state holding the morphologically refined mask.
#[must_use = "pipeline stages are consumed by advancing — call .detect_edges() to continue"]
pub struct Refined {
    config: PipelineConfig,
    dimensions: Dimensions,
    mask: GrayImage,
    refined: GrayImage,
    started: Instant,
}

impl Refined {
    /// The refined binary mask.
    #[must_use]
    pub const fn refined(&self) -> &GrayImage {
        &self.refined
    }

    /// Run Canny edge extraction, advancing to [`EdgesDetected`].
    pub fn detect_edges(self) -> EdgesDetected {
        let edges = crate::edge::canny(&self.refined, self.config.canny_low, self.config.canny_high);
        EdgesDetected {
            dimensions: self.dimensions,
            mask: self.mask,
            refined: self.refined,
            edges,
            started: self.started,
        }
    }
}

/// Pipeline state holding the binary edge map.
#[must_use = "pipeline stages are consumed by advancing — call .trace_contours() to continue"]
pub struct EdgesDetected {
    dimensions: Dimensions,
    mask: GrayImage,
    refined: GrayImage,
    edges: GrayImage,
    started: Instant,
}

impl EdgesDetected {
    /// The binary edge map.
    #[must_use]
    pub const fn edges(&self) -> &GrayImage {
        &self.edges
    }

    /// Trace external contours and select the largest, advancing to
    /// [`ContoursTraced`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoContourFound`] if the edge map
    /// contains no closed boundary.
    pub fn trace_contours(self) -> Result<ContoursTraced, PipelineError> {
        let contours = crate::contour::find_external(&self.edges);
        let Some(selected) = crate::contour::select_largest(&contours) else {
            return Err(PipelineError::NoContourFound);
        };
        Ok(ContoursTraced {
            dimensions: self.dimensions,
            mask: self.mask,
            refined: self.refined,
            edges: self.edges,
            contours,
            selected,
            started: self.started,
        })
    }
}

/// Pipeline state holding the traced contours and the selection.
#[must_use = "pipeline stages are consumed by advancing — call .measure() to continue"]
pub struct ContoursTraced {
    dimensions: Dimensions,
    mask: GrayImage,
    refined: GrayImage,
    edges: GrayImage,
    contours: ContourSet,
    selected: ContourId,
    started: Instant,
}

impl ContoursTraced {
    /// All traced external contours.
    #[must_use]
    pub const fn contours(&self) -> &ContourSet {
        &self.contours
    }

    /// The selected (largest-area) contour's points.
    #[must_use]
    pub fn selected_contour(&self) -> &[Point] {
        self.contours.get(self.selected)
    }

    /// Compute the convex hull and shape metrics, stopping the clock
    /// and advancing to [`Measured`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DegenerateContour`] if the selected
    /// contour or its hull encloses no measurable area.
    pub fn measure(self) -> Result<Measured, PipelineError> {
        let hull = crate::metrics::convex_hull(self.contours.get(self.selected));
        let metrics = crate::metrics::compute_with_hull(self.contours.get(self.selected), &hull)?;
        let elapsed = self.started.elapsed();
        Ok(Measured {
            staged: StagedResult {
                mask: self.mask,
                refined: self.refined,
                edges: self.edges,
                contours: self.contours,
                selected: self.selected,
                hull,
                metrics,
                dimensions: self.dimensions,
                elapsed,
            },
        })
    }
}

/// Terminal pipeline state holding the complete [`StagedResult`].
#[must_use = "call .into_result() to consume the final stage"]
pub struct Measured {
    staged: StagedResult,
}

impl Measured {
    /// Borrow the staged result.
    #[must_use]
    pub const fn result(&self) -> &StagedResult {
        &self.staged
    }

    /// Consume the final stage, yielding the staged result.
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        self.staged
    }
}
