//! marumi-pipeline: background-referenced shape metrics (sans-IO).
//!
//! Judges how circular/convex a segmented object is, as a proxy for
//! optical focus quality in an inspection workflow:
//! Gaussian smoothing -> background subtraction -> binary threshold ->
//! morphological cleanup -> Canny edges -> external contour selection ->
//! convex hull -> circularity and area-ratio metrics.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! [`GrayImage`] grids and returns structured data. File loading,
//! display, and batch directory iteration live in `marumi-cli`.

pub mod blur;
pub mod contour;
pub mod diagnostics;
pub mod edge;
pub mod metrics;
pub mod morphology;
pub mod pipeline;
pub mod preprocess;
pub mod types;

use std::time::Instant;

pub use contour::{ContourId, ContourSet};
pub use diagnostics::{PipelineDiagnostics, StageDiagnostics, StageMetrics, process_with_diagnostics};
pub use pipeline::Pipeline;
pub use types::{
    Dimensions, FocusReport, GrayImage, KernelShape, MorphOrder, PipelineConfig,
    PipelineConfigBuilder, PipelineError, Point, ShapeMetrics, StagedResult,
};

/// Run the full pipeline and return metrics plus elapsed time.
///
/// Takes a subject image and a same-sized background reference of the
/// empty scene. The wall-clock span covers preprocessing through
/// metric computation; decode and any caller I/O are excluded.
///
/// Each invocation is independent and side-effect-free on its inputs,
/// so batch callers may process many subjects against one shared
/// background concurrently without coordination.
///
/// # Errors
///
/// Returns [`PipelineError::DimensionMismatch`] if the images differ
/// in size, [`PipelineError::NoContourFound`] if the edge map contains
/// no closed boundary, and [`PipelineError::DegenerateContour`] if the
/// selected contour (or its hull) encloses no measurable area.
pub fn process(
    subject: &GrayImage,
    background: &GrayImage,
    config: &PipelineConfig,
) -> Result<FocusReport, PipelineError> {
    process_staged(subject, background, config).map(StagedResult::into_report)
}

/// Run the full pipeline, retaining every intermediate stage output.
///
/// Like [`process`] but keeps the threshold mask, refined mask, edge
/// map, the traced contour set, the selected contour handle, and the
/// convex hull alongside the metrics, for inspection or visualization
/// layers.
///
/// # Errors
///
/// Same conditions as [`process`].
pub fn process_staged(
    subject: &GrayImage,
    background: &GrayImage,
    config: &PipelineConfig,
) -> Result<StagedResult, PipelineError> {
    let started = Instant::now();

    // 1. Blur both inputs, subtract, threshold.
    let mask = preprocess::foreground_mask(subject, background, config)?;

    // 2. Morphological cleanup in the configured order.
    let refined = morphology::refine(&mask, config);

    // 3. Canny edge extraction.
    let edges = edge::canny(&refined, config.canny_low, config.canny_high);

    // 4. External contours; largest enclosed area wins.
    let contours = contour::find_external(&edges);
    let Some(selected) = contour::select_largest(&contours) else {
        return Err(PipelineError::NoContourFound);
    };

    // 5. Convex hull and shape metrics.
    let hull = metrics::convex_hull(contours.get(selected));
    let shape = metrics::compute_with_hull(contours.get(selected), &hull)?;

    let elapsed = started.elapsed();

    Ok(StagedResult {
        mask,
        refined,
        edges,
        contours,
        selected,
        hull,
        metrics: shape,
        dimensions: Dimensions::of(subject),
        elapsed,
    })
}
