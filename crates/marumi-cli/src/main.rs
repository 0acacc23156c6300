//! marumi: CLI for background-referenced shape metrics.
//!
//! Evaluates how circular/convex a segmented object is relative to an
//! empty-scene background reference, as a focus-quality proxy. Runs on
//! a single image or, with `--batch`, on every supported raster in a
//! directory against one shared background.
//!
//! # Usage
//!
//! ```text
//! marumi --background empty.png subject.png
//! marumi --background empty.png --batch captures/ --json
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use marumi_pipeline::{
    FocusReport, GrayImage, KernelShape, MorphOrder, PipelineConfig, PipelineDiagnostics,
};
use serde::Serialize;

/// Background-referenced shape metrics for inspection images.
///
/// Computes circularity and convex-hull ratios of the dominant
/// segmented object in a subject image, measured against a background
/// reference of the empty scene.
#[derive(Parser)]
#[command(name = "marumi", version)]
struct Cli {
    /// Path to the subject image, or to a directory with `--batch`.
    subject: PathBuf,

    /// Path to the background reference image (empty scene, same size).
    #[arg(long)]
    background: PathBuf,

    /// Treat the subject path as a directory and process every
    /// supported raster inside it. The background file itself is
    /// skipped if it lives in the same directory.
    #[arg(long)]
    batch: bool,

    /// Gaussian blur window size in pixels (odd; 1 disables).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_BLUR_KERNEL_SIZE)]
    blur_kernel_size: u32,

    /// Binary threshold on the background-minus-subject difference.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_THRESHOLD_CUTOFF)]
    threshold_cutoff: u8,

    /// Structuring element shape for morphological refinement.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_SHAPE)]
    morph_kernel_shape: Shape,

    /// Structuring element size in pixels (odd; below 3 disables).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_MORPH_KERNEL_SIZE)]
    morph_kernel_size: u32,

    /// Order of erosion and dilation passes.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_ORDER)]
    morph_order: Order,

    /// Number of erosion passes.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_ERODE_ITERATIONS)]
    erode_iterations: u32,

    /// Number of dilation passes.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_DILATE_ITERATIONS)]
    dilate_iterations: u32,

    /// Canny low threshold.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_CANNY_LOW)]
    canny_low: f32,

    /// Canny high threshold.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_CANNY_HIGH)]
    canny_high: f32,

    /// Print per-stage diagnostics alongside the metrics.
    #[arg(long)]
    staged: bool,

    /// Output results as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// The JSON must be a valid `PipelineConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Structuring element shape selection.
#[derive(Clone, Copy, ValueEnum)]
enum Shape {
    /// Cross / diamond structuring element.
    Cross,
    /// Full rectangular structuring element.
    Rect,
}

/// Morphological operation order selection.
#[derive(Clone, Copy, ValueEnum)]
enum Order {
    /// All erosion passes, then all dilation passes.
    ErodeFirst,
    /// All dilation passes, then all erosion passes.
    DilateFirst,
}

/// Maps a [`KernelShape`] to the local CLI [`Shape`] enum.
const fn shape_from_pipeline(shape: KernelShape) -> Shape {
    match shape {
        KernelShape::Cross => Shape::Cross,
        KernelShape::Rect => Shape::Rect,
    }
}

/// Maps a [`MorphOrder`] to the local CLI [`Order`] enum.
const fn order_from_pipeline(order: MorphOrder) -> Order {
    match order {
        MorphOrder::ErodeThenDilate => Order::ErodeFirst,
        MorphOrder::DilateThenErode => Order::DilateFirst,
    }
}

/// CLI defaults derived from the pipeline consts so the two cannot
/// silently diverge.
const CLI_DEFAULT_SHAPE: Shape = shape_from_pipeline(PipelineConfig::DEFAULT_MORPH_KERNEL_SHAPE);
const CLI_DEFAULT_ORDER: Order = order_from_pipeline(PipelineConfig::DEFAULT_MORPH_ORDER);

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags and validated.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        let config: PipelineConfig =
            serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?;
        config.validate().map_err(|e| e.to_string())?;
        return Ok(config);
    }

    let config = PipelineConfig {
        blur_kernel_size: cli.blur_kernel_size,
        threshold_cutoff: cli.threshold_cutoff,
        morph_kernel_shape: match cli.morph_kernel_shape {
            Shape::Cross => KernelShape::Cross,
            Shape::Rect => KernelShape::Rect,
        },
        morph_kernel_size: cli.morph_kernel_size,
        morph_order: match cli.morph_order {
            Order::ErodeFirst => MorphOrder::ErodeThenDilate,
            Order::DilateFirst => MorphOrder::DilateThenErode,
        },
        erode_iterations: cli.erode_iterations,
        dilate_iterations: cli.dilate_iterations,
        canny_low: cli.canny_low,
        canny_high: cli.canny_high,
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Load an image file and convert it to 8-bit grayscale.
fn load_gray(path: &Path) -> Result<GrayImage, String> {
    let image = image::open(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    Ok(image.to_luma8())
}

/// Raster extensions accepted in batch mode.
const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.iter().any(|s| e.eq_ignore_ascii_case(s)))
}

/// Outcome of one image in batch mode, for JSON output.
#[derive(Serialize)]
struct BatchRecord {
    /// Path of the processed image.
    path: String,
    #[serde(flatten)]
    outcome: BatchOutcome,
}

/// Combined `--staged --json` output: final metrics plus the per-stage
/// diagnostics that produced them.
#[derive(Serialize)]
struct StagedReport {
    report: FocusReport,
    diagnostics: PipelineDiagnostics,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum BatchOutcome {
    /// Metrics for a successfully processed image.
    Report(FocusReport),
    /// Failure message for an image that could not be measured.
    Error(String),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let background = match load_gray(&cli.background) {
        Ok(image) => image,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    if cli.batch {
        run_batch(&cli, &config, &background)
    } else {
        run_single(&cli, &config, &background)
    }
}

/// Process one subject image and print its report.
fn run_single(cli: &Cli, config: &PipelineConfig, background: &GrayImage) -> ExitCode {
    let subject = match load_gray(&cli.subject) {
        Ok(image) => image,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    if cli.staged {
        match marumi_pipeline::process_with_diagnostics(&subject, background, config) {
            Ok((staged, diagnostics)) => {
                if cli.json {
                    return print_json(&StagedReport {
                        report: staged.into_report(),
                        diagnostics,
                    });
                }
                println!("{}", diagnostics.report());
                println!();
                print_report(&cli.subject, &staged.into_report());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}: {e}", cli.subject.display());
                ExitCode::FAILURE
            }
        }
    } else {
        match marumi_pipeline::process(&subject, background, config) {
            Ok(report) => {
                if cli.json {
                    return print_json(&report);
                }
                print_report(&cli.subject, &report);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}: {e}", cli.subject.display());
                ExitCode::FAILURE
            }
        }
    }
}

/// Process every supported raster in the subject directory against the
/// shared background, accumulating failures without aborting.
fn run_batch(cli: &Cli, config: &PipelineConfig, background: &GrayImage) -> ExitCode {
    let entries = match std::fs::read_dir(&cli.subject) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Error reading directory {}: {e}", cli.subject.display());
            return ExitCode::FAILURE;
        }
    };

    let background_file = cli.background.canonicalize().ok();
    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_supported_extension(path))
        .filter(|path| {
            // Skip the background reference if it sits in the batch dir.
            match (&background_file, path.canonicalize().ok()) {
                (Some(bg), Some(p)) => p != *bg,
                _ => true,
            }
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        eprintln!("No supported images found in {}", cli.subject.display());
        return ExitCode::FAILURE;
    }

    let mut records = Vec::with_capacity(paths.len());
    let mut elapsed_total = Duration::ZERO;
    let mut succeeded: usize = 0;

    for path in &paths {
        let result = load_gray(path)
            .and_then(|subject| {
                marumi_pipeline::process(&subject, background, config).map_err(|e| e.to_string())
            });
        match result {
            Ok(report) => {
                elapsed_total += report.elapsed;
                succeeded += 1;
                if !cli.json {
                    print_report(path, &report);
                    println!();
                }
                records.push(BatchRecord {
                    path: path.display().to_string(),
                    outcome: BatchOutcome::Report(report),
                });
            }
            Err(msg) => {
                if !cli.json {
                    eprintln!("{}: {msg}", path.display());
                }
                records.push(BatchRecord {
                    path: path.display().to_string(),
                    outcome: BatchOutcome::Error(msg),
                });
            }
        }
    }

    if cli.json {
        match serde_json::to_string_pretty(&records) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing results: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        let failed = paths.len() - succeeded;
        println!("Processed {} images ({failed} failed)", paths.len());
        if succeeded > 0 {
            #[allow(clippy::cast_precision_loss)]
            let mean_ms = elapsed_total.as_secs_f64() * 1000.0 / succeeded as f64;
            println!("Mean processing time: {mean_ms:.3}ms");
        }
    }

    if succeeded == 0 {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Serialize a value as pretty JSON to stdout.
fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error serializing results: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Print a human-readable metrics report for one image.
fn print_report(path: &Path, report: &FocusReport) {
    let m = &report.metrics;
    println!("{} ({})", path.display(), report.dimensions);
    println!(
        "  area:        original {:>12.2}  hull {:>12.2}  ratio {:.4}",
        m.area_original, m.area_hull, m.area_ratio,
    );
    println!(
        "  perimeter:   original {:>12.2}  hull {:>12.2}",
        m.perimeter_original, m.perimeter_hull,
    );
    println!(
        "  circularity: original {:>12.6}  hull {:>12.6}  ratio {:.4}",
        m.circularity_original, m.circularity_hull, m.circularity_ratio,
    );
    println!(
        "  elapsed:     {:.3}ms",
        report.elapsed.as_secs_f64() * 1000.0,
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_flags_match_pipeline_defaults() {
        let cli = Cli::parse_from(["marumi", "--background", "bg.png", "subject.png"]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "marumi",
            "--background",
            "bg.png",
            "--threshold-cutoff",
            "25",
            "--morph-order",
            "dilate-first",
            "--canny-low",
            "30",
            "--canny-high",
            "90",
            "subject.png",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.threshold_cutoff, 25);
        assert_eq!(config.morph_order, MorphOrder::DilateThenErode);
        assert!((config.canny_low - 30.0).abs() < f32::EPSILON);
        assert!((config.canny_high - 90.0).abs() < f32::EPSILON);
    }

    #[test]
    fn config_json_takes_precedence() {
        let json = serde_json::to_string(&PipelineConfig {
            threshold_cutoff: 42,
            ..PipelineConfig::default()
        })
        .unwrap();
        let cli = Cli::parse_from([
            "marumi",
            "--background",
            "bg.png",
            "--threshold-cutoff",
            "7",
            "--config-json",
            &json,
            "subject.png",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.threshold_cutoff, 42);
    }

    #[test]
    fn invalid_flag_combination_is_rejected() {
        let cli = Cli::parse_from([
            "marumi",
            "--background",
            "bg.png",
            "--blur-kernel-size",
            "4",
            "subject.png",
        ]);
        assert!(config_from_cli(&cli).is_err());
    }

    #[test]
    fn staged_json_carries_report_and_diagnostics() {
        let background = GrayImage::from_fn(96, 96, |_, _| image::Luma([220]));
        let subject = GrayImage::from_fn(96, 96, |x, y| {
            let dx = f64::from(x) - 48.0;
            let dy = f64::from(y) - 48.0;
            if dx.hypot(dy) <= 30.0 {
                image::Luma([30])
            } else {
                image::Luma([220])
            }
        });
        let (staged, diagnostics) = marumi_pipeline::process_with_diagnostics(
            &subject,
            &background,
            &PipelineConfig::default(),
        )
        .unwrap();

        let combined = StagedReport {
            report: staged.into_report(),
            diagnostics,
        };
        let json = serde_json::to_value(&combined).unwrap();
        assert!(
            json.get("report").and_then(|r| r.get("metrics")).is_some(),
            "staged JSON must include the final metrics report",
        );
        assert!(
            json.get("diagnostics")
                .and_then(|d| d.get("summary"))
                .is_some(),
            "staged JSON must include the per-stage diagnostics",
        );
    }

    #[test]
    fn supported_extensions_are_case_insensitive() {
        assert!(has_supported_extension(Path::new("a/b/capture.PNG")));
        assert!(has_supported_extension(Path::new("scan.tiff")));
        assert!(!has_supported_extension(Path::new("notes.txt")));
        assert!(!has_supported_extension(Path::new("no_extension")));
    }
}
