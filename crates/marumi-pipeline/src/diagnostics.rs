//! Pipeline diagnostics: timing, counts, and per-stage metrics.
//!
//! Permanent instrumentation intended for parameter tuning against
//! reference image sets — which threshold cutoff, morphology order,
//! and Canny band best separate in-focus from defocused captures.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::types::{
    Dimensions, GrayImage, PipelineConfig, PipelineError, StagedResult,
};

/// Serde support for `std::time::Duration` as fractional seconds.
pub(crate) mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: blur + background subtraction + threshold.
    pub preprocess: StageDiagnostics,
    /// Stage 2: morphological refinement.
    pub morphology: StageDiagnostics,
    /// Stage 3: Canny edge extraction.
    pub edge_detection: StageDiagnostics,
    /// Stage 4: contour tracing and selection.
    pub contour_tracing: StageDiagnostics,
    /// Stage 5: convex hull and shape metrics.
    pub metrics: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics (counts, parameters).
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Blur + subtraction + threshold metrics.
    Preprocess {
        /// Gaussian window size used.
        blur_kernel_size: u32,
        /// Binary threshold cutoff.
        threshold_cutoff: u8,
        /// Foreground pixels (value == 255) in the mask.
        foreground_pixel_count: u64,
        /// Total pixel count for computing mask density.
        total_pixel_count: u64,
    },
    /// Morphological refinement metrics.
    Morphology {
        /// Structuring element shape.
        kernel_shape: String,
        /// Structuring element size.
        kernel_size: u32,
        /// Erosion passes applied.
        erode_iterations: u32,
        /// Dilation passes applied.
        dilate_iterations: u32,
        /// Foreground pixels before refinement.
        foreground_before: u64,
        /// Foreground pixels after refinement.
        foreground_after: u64,
    },
    /// Canny edge extraction metrics.
    EdgeDetection {
        /// Low threshold (after clamping).
        low_threshold: f32,
        /// High threshold (after clamping).
        high_threshold: f32,
        /// Edge pixels (value == 255) in the output.
        edge_pixel_count: u64,
        /// Total pixel count for computing edge density.
        total_pixel_count: u64,
    },
    /// Contour tracing and selection metrics.
    ContourTracing {
        /// Number of external contours found.
        contour_count: usize,
        /// Total points across all contours.
        total_point_count: usize,
        /// Points in the selected contour.
        selected_point_count: usize,
    },
    /// Shape metric computation results.
    Metrics {
        /// Points in the convex hull.
        hull_point_count: usize,
        /// Circularity of the selected contour.
        circularity_original: f64,
        /// Circularity of its convex hull.
        circularity_hull: f64,
        /// Hull/original area ratio.
        area_ratio: f64,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Number of external contours found.
    pub contour_count: usize,
    /// Circularity of the selected contour.
    pub circularity_original: f64,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<18} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages: [(&str, &StageDiagnostics); 5] = [
            ("Preprocess", &self.preprocess),
            ("Morphology", &self.morphology),
            ("Edge Detection", &self.edge_detection),
            ("Contour Tracing", &self.contour_tracing),
            ("Shape Metrics", &self.metrics),
        ];

        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<18} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Contours: {}  |  Circularity: {:.6}",
            self.summary.contour_count, self.summary.circularity_original,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Preprocess {
            blur_kernel_size,
            threshold_cutoff,
            foreground_pixel_count,
            total_pixel_count,
        } => {
            format!(
                "kernel={blur_kernel_size} cutoff={threshold_cutoff} fg={foreground_pixel_count} ({:.1}%)",
                density(*foreground_pixel_count, *total_pixel_count),
            )
        }
        StageMetrics::Morphology {
            kernel_shape,
            kernel_size,
            erode_iterations,
            dilate_iterations,
            foreground_before,
            foreground_after,
        } => {
            format!(
                "{kernel_shape} {kernel_size}x{kernel_size} erode={erode_iterations} dilate={dilate_iterations} fg={foreground_before}->{foreground_after}",
            )
        }
        StageMetrics::EdgeDetection {
            low_threshold,
            high_threshold,
            edge_pixel_count,
            total_pixel_count,
        } => {
            format!(
                "low={low_threshold:.1} high={high_threshold:.1} edges={edge_pixel_count} ({:.1}%)",
                density(*edge_pixel_count, *total_pixel_count),
            )
        }
        StageMetrics::ContourTracing {
            contour_count,
            total_point_count,
            selected_point_count,
        } => {
            format!(
                "{contour_count} contours, {total_point_count} pts (selected={selected_point_count})",
            )
        }
        StageMetrics::Metrics {
            hull_point_count,
            circularity_original,
            circularity_hull,
            area_ratio,
        } => {
            format!(
                "hull={hull_point_count} pts circ={circularity_original:.4} hull_circ={circularity_hull:.4} area_ratio={area_ratio:.4}",
            )
        }
    }
}

/// Percentage of `count` over `total`, 0.0 when `total` is zero.
#[allow(clippy::cast_precision_loss)]
fn density(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}

/// Count pixels with value 255 in a binary image.
pub(crate) fn count_foreground_pixels(image: &GrayImage) -> u64 {
    image
        .pixels()
        .map(|p| u64::from(u8::from(p.0[0] == 255)))
        .sum()
}

/// Run the pipeline, collecting per-stage diagnostics alongside the
/// staged result.
///
/// # Errors
///
/// Same conditions as [`crate::process_staged`].
pub fn process_with_diagnostics(
    subject: &GrayImage,
    background: &GrayImage,
    config: &PipelineConfig,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    let dimensions = Dimensions::of(subject);
    let total_start = Instant::now();

    let stage_start = Instant::now();
    let mask = crate::preprocess::foreground_mask(subject, background, config)?;
    let foreground_before = count_foreground_pixels(&mask);
    let preprocess = StageDiagnostics {
        duration: stage_start.elapsed(),
        metrics: StageMetrics::Preprocess {
            blur_kernel_size: config.blur_kernel_size,
            threshold_cutoff: config.threshold_cutoff,
            foreground_pixel_count: foreground_before,
            total_pixel_count: dimensions.pixel_count(),
        },
    };

    let stage_start = Instant::now();
    let refined = crate::morphology::refine(&mask, config);
    let morphology = StageDiagnostics {
        duration: stage_start.elapsed(),
        metrics: StageMetrics::Morphology {
            kernel_shape: format!("{:?}", config.morph_kernel_shape),
            kernel_size: config.morph_kernel_size,
            erode_iterations: config.erode_iterations,
            dilate_iterations: config.dilate_iterations,
            foreground_before,
            foreground_after: count_foreground_pixels(&refined),
        },
    };

    let stage_start = Instant::now();
    let edges = crate::edge::canny(&refined, config.canny_low, config.canny_high);
    let edge_detection = StageDiagnostics {
        duration: stage_start.elapsed(),
        metrics: StageMetrics::EdgeDetection {
            low_threshold: config.canny_low,
            high_threshold: config.canny_high,
            edge_pixel_count: count_foreground_pixels(&edges),
            total_pixel_count: dimensions.pixel_count(),
        },
    };

    let stage_start = Instant::now();
    let contours = crate::contour::find_external(&edges);
    let Some(selected) = crate::contour::select_largest(&contours) else {
        return Err(PipelineError::NoContourFound);
    };
    let contour_tracing = StageDiagnostics {
        duration: stage_start.elapsed(),
        metrics: StageMetrics::ContourTracing {
            contour_count: contours.len(),
            total_point_count: contours.total_points(),
            selected_point_count: contours.get(selected).len(),
        },
    };

    let stage_start = Instant::now();
    let hull = crate::metrics::convex_hull(contours.get(selected));
    let shape = crate::metrics::compute_with_hull(contours.get(selected), &hull)?;
    let metrics_stage = StageDiagnostics {
        duration: stage_start.elapsed(),
        metrics: StageMetrics::Metrics {
            hull_point_count: hull.len(),
            circularity_original: shape.circularity_original,
            circularity_hull: shape.circularity_hull,
            area_ratio: shape.area_ratio,
        },
    };

    let total_duration = total_start.elapsed();

    let diagnostics = PipelineDiagnostics {
        preprocess,
        morphology,
        edge_detection,
        contour_tracing,
        metrics: metrics_stage,
        total_duration,
        summary: PipelineSummary {
            image_width: dimensions.width,
            image_height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
            contour_count: contours.len(),
            circularity_original: shape.circularity_original,
        },
    };

    let staged = StagedResult {
        mask,
        refined,
        edges,
        contours,
        selected,
        hull,
        metrics: shape,
        dimensions,
        elapsed: total_duration,
    };

    Ok((staged, diagnostics))
}
