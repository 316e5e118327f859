mod exit;
mod logging;

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};

use zenglitch::{
    Pass, Pipeline, ReorderConfig, ReorderMode, ResourceLimits, SortAlgorithm, SortKey, Traversal,
};

use crate::exit::{CliError, CliResult, glitch_error, io_error};
use crate::logging::{LogFormat, LogLevel, init_logging};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum TraversalArg {
    Hilbert,
    Gilbert,
    Rows,
    Columns,
    HorizontalLines,
    VerticalLines,
    Diagonal,
    Rays,
    Circles,
    Spiral,
    SquareSpiral,
    RectSpiral,
}

impl TraversalArg {
    fn with_angle(self, degrees: i32) -> Traversal {
        match self {
            TraversalArg::Hilbert => Traversal::Hilbert,
            TraversalArg::Gilbert => Traversal::Gilbert,
            TraversalArg::Rows => Traversal::Rows,
            TraversalArg::Columns => Traversal::Columns,
            TraversalArg::HorizontalLines => Traversal::HorizontalLines,
            TraversalArg::VerticalLines => Traversal::VerticalLines,
            TraversalArg::Diagonal => Traversal::Diagonal(degrees),
            TraversalArg::Rays => Traversal::Rays,
            TraversalArg::Circles => Traversal::Circles,
            TraversalArg::Spiral => Traversal::Spiral,
            TraversalArg::SquareSpiral => Traversal::SquareSpiral,
            TraversalArg::RectSpiral => Traversal::RectSpiral,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Remap,
    Unmap,
    Sort,
}

impl From<ModeArg> for ReorderMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Remap => ReorderMode::Remap,
            ModeArg::Unmap => ReorderMode::Unmap,
            ModeArg::Sort => ReorderMode::Sort,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum KeyArg {
    Luminance,
    Hue,
    Saturation,
}

impl From<KeyArg> for SortKey {
    fn from(arg: KeyArg) -> Self {
        match arg {
            KeyArg::Luminance => SortKey::Luminance,
            KeyArg::Hue => SortKey::Hue,
            KeyArg::Saturation => SortKey::Saturation,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum AlgorithmArg {
    Stable,
    Glitch,
    Comb,
}

impl From<AlgorithmArg> for SortAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Stable => SortAlgorithm::Stable,
            AlgorithmArg::Glitch => SortAlgorithm::Glitch,
            AlgorithmArg::Comb => SortAlgorithm::Comb,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Preset {
    HilbertGlitch,
}

/// `key:min:max` selector for threshold segments.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Threshold {
    key: KeyArg,
    min: u16,
    max: u16,
}

fn parse_threshold(s: &str) -> Result<Threshold, String> {
    let mut parts = s.splitn(3, ':');
    let (Some(key), Some(min), Some(max)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected key:min:max, got {s:?}"));
    };
    let key = KeyArg::from_str(key, true)?;
    let min = min.parse().map_err(|e| format!("bad minimum {min:?}: {e}"))?;
    let max = max.parse().map_err(|e| format!("bad maximum {max:?}: {e}"))?;
    Ok(Threshold { key, min, max })
}

#[derive(Parser, Debug)]
#[command(
    name = "zenglitch",
    version,
    about = "Reorder PPM pixels along space-filling curves"
)]
struct Cli {
    /// Input P6 image.
    input: PathBuf,

    /// Output path [default: <input-stem>.glitch.ppm next to the input].
    output: Option<PathBuf>,

    /// Run a built-in multi-pass preset instead of a single pass.
    #[arg(long, value_name = "PRESET", conflicts_with_all = ["traversal", "angle", "mode", "segment", "threshold", "full", "random", "order", "reverse"])]
    preset: Option<Preset>,

    /// How the image is walked.
    #[arg(long, value_name = "TRAVERSAL", default_value = "hilbert")]
    traversal: TraversalArg,

    /// Tilt of `--traversal diagonal`, in degrees from vertical.
    #[arg(long, value_name = "DEGREES", default_value_t = 45, allow_negative_numbers = true)]
    angle: i32,

    /// What happens along the walk.
    #[arg(long, value_name = "MODE", default_value = "sort")]
    mode: ModeArg,

    /// Fixed segment length for sort mode.
    #[arg(long, value_name = "PIXELS", conflicts_with_all = ["threshold", "full", "random"])]
    segment: Option<usize>,

    /// Sort only runs whose key lies in min..=max, e.g. `luminance:40:200`.
    #[arg(long, value_name = "KEY:MIN:MAX", value_parser = parse_threshold, conflicts_with_all = ["full", "random"])]
    threshold: Option<Threshold>,

    /// Sort every line of the traversal as one segment.
    #[arg(long, conflicts_with = "random")]
    full: bool,

    /// Random segments shorter than MAX pixels.
    #[arg(long, value_name = "MAX")]
    random: Option<usize>,

    /// Seed for random segments, including the preset's.
    #[arg(long, value_name = "SEED", default_value_t = 0)]
    seed: u64,

    /// Key segments are sorted by.
    #[arg(long, value_name = "KEY", default_value = "luminance")]
    key: KeyArg,

    /// Segment sort algorithm.
    #[arg(long, value_name = "ALGORITHM", default_value = "stable")]
    algorithm: AlgorithmArg,

    /// Explicit Hilbert curve order.
    #[arg(long, value_name = "ORDER")]
    order: Option<u32>,

    /// Walk the traversal back to front.
    #[arg(long)]
    reverse: bool,

    /// Reject images wider than this.
    #[arg(long, value_name = "PIXELS")]
    max_width: Option<u64>,

    /// Reject images taller than this.
    #[arg(long, value_name = "PIXELS")]
    max_height: Option<u64>,

    /// Reject images with more pixels than this.
    #[arg(long, value_name = "PIXELS")]
    max_pixels: Option<u64>,

    /// Reject runs whose estimated working memory exceeds this.
    #[arg(long, value_name = "BYTES")]
    max_memory: Option<u64>,

    /// Reject input files larger than this.
    #[arg(long, value_name = "BYTES")]
    max_file_size: Option<u64>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr) [default: RUST_LOG, else warn].
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<LogLevel>,
}

impl Cli {
    fn pipeline(&self) -> Pipeline {
        let pipeline = match self.preset {
            Some(Preset::HilbertGlitch) => Pipeline::hilbert_glitch(self.seed),
            None => Pipeline::single(self.pass()),
        };
        pipeline.with_limits(self.limits())
    }

    fn limits(&self) -> ResourceLimits {
        let mut limits = ResourceLimits::none();
        if let Some(max) = self.max_width {
            limits = limits.with_max_width(max);
        }
        if let Some(max) = self.max_height {
            limits = limits.with_max_height(max);
        }
        if let Some(max) = self.max_pixels {
            limits = limits.with_max_pixels(max);
        }
        if let Some(bytes) = self.max_memory {
            limits = limits.with_max_memory(bytes);
        }
        if let Some(bytes) = self.max_file_size {
            limits = limits.with_max_file_size(bytes);
        }
        limits
    }

    fn pass(&self) -> Pass {
        let mut reorder = ReorderConfig::new()
            .with_mode(self.mode.into())
            .with_key(self.key.into())
            .with_algorithm(self.algorithm.into())
            .with_seed(self.seed);
        if let Some(length) = self.segment {
            reorder = reorder.with_segment_length(length);
        }
        if let Some(t) = self.threshold {
            reorder = reorder.with_threshold(t.key.into(), t.min, t.max);
        }
        if self.full {
            reorder = reorder.with_full_lines();
        }
        if let Some(max) = self.random {
            reorder = reorder.with_random_spans(max);
        }
        let mut pass = Pass::new(reorder)
            .with_traversal(self.traversal.with_angle(self.angle))
            .with_reverse(self.reverse);
        if let Some(order) = self.order {
            pass = pass.with_order(order);
        }
        pass
    }

    fn output_path(&self) -> CliResult<PathBuf> {
        match &self.output {
            Some(path) => Ok(path.clone()),
            None => default_output(&self.input),
        }
    }
}

fn default_output(input: &Path) -> CliResult<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| CliError::usage(format!("{}: not a file path", input.display())))?;
    let mut name = stem.to_os_string();
    name.push(".glitch.ppm");
    Ok(input.with_file_name(name))
}

fn run(cli: &Cli) -> CliResult<i32> {
    let output = cli.output_path()?;
    let pipeline = cli.pipeline();

    let data = std::fs::read(&cli.input)
        .map_err(|err| io_error(&format!("read {}", cli.input.display()), err))?;
    tracing::info!(input = %cli.input.display(), bytes = data.len(), passes = pipeline.passes().len(), "processing");

    let encoded = pipeline
        .process_ppm(&data)
        .map_err(|err| glitch_error(&cli.input.display().to_string(), err))?;

    std::fs::write(&output, encoded)
        .map_err(|err| io_error(&format!("write {}", output.display()), err))?;
    tracing::info!(output = %output.display(), "wrote image");
    Ok(exit::SUCCESS)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zenglitch::Segmenter;

    #[test]
    fn defaults_to_a_hilbert_luminance_sort() {
        let cli = Cli::try_parse_from(["zenglitch", "in.ppm"]).expect("minimal args should parse");
        let pass = cli.pass();
        assert_eq!(pass.traversal, Traversal::Hilbert);
        assert_eq!(pass.reorder.mode, ReorderMode::Sort);
        assert_eq!(pass.reorder.key.name(), "luminance");
        assert!(!pass.reverse);
        assert_eq!(cli.log_level, None);
        assert_eq!(cli.pipeline().limits(), &ResourceLimits::none());
    }

    #[test]
    fn default_output_sits_next_to_input() {
        let cli = Cli::try_parse_from(["zenglitch", "shots/lock.ppm"]).expect("args should parse");
        assert_eq!(
            cli.output_path().expect("path should resolve"),
            PathBuf::from("shots/lock.glitch.ppm")
        );
        let cli = Cli::try_parse_from(["zenglitch", "a.ppm", "b.ppm"]).expect("args should parse");
        assert_eq!(cli.output_path().expect("path should resolve"), PathBuf::from("b.ppm"));
    }

    #[test]
    fn parses_threshold_selector() {
        let cli = Cli::try_parse_from([
            "zenglitch",
            "in.ppm",
            "--threshold",
            "hue:30:90",
            "--algorithm",
            "glitch",
            "--traversal",
            "gilbert",
        ])
        .expect("threshold args should parse");
        let pass = cli.pass();
        assert_eq!(pass.traversal, Traversal::Gilbert);
        assert_eq!(pass.reorder.algorithm, SortAlgorithm::Glitch);
        assert!(matches!(
            pass.reorder.segmenter,
            Segmenter::Threshold { min: 30, max: 90, .. }
        ));
    }

    #[test]
    fn rejects_malformed_threshold() {
        let err = Cli::try_parse_from(["zenglitch", "in.ppm", "--threshold", "hue:30"])
            .expect_err("incomplete threshold should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(parse_threshold("chroma:1:2").is_err());
        assert!(parse_threshold("hue:1:x").is_err());
    }

    #[test]
    fn preset_conflicts_with_pass_flags() {
        let err = Cli::try_parse_from([
            "zenglitch",
            "in.ppm",
            "--preset",
            "hilbert-glitch",
            "--segment",
            "8",
        ])
        .expect_err("preset and segment should conflict");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);

        let cli = Cli::try_parse_from(["zenglitch", "in.ppm", "--preset", "hilbert-glitch"])
            .expect("preset should parse");
        assert_eq!(cli.pipeline().passes().len(), 2);
    }

    #[test]
    fn limit_flags_set_limits() {
        let cli = Cli::try_parse_from([
            "zenglitch",
            "in.ppm",
            "--max-pixels",
            "100",
            "--max-width",
            "20",
            "--max-height",
            "30",
            "--max-memory",
            "4096",
            "--max-file-size",
            "512",
        ])
        .expect("args should parse");
        let limits = *cli.pipeline().limits();
        assert_eq!(limits.max_pixels, Some(100));
        assert_eq!(limits.max_width, Some(20));
        assert_eq!(limits.max_height, Some(30));
        assert_eq!(limits.max_memory_bytes, Some(4096));
        assert_eq!(limits.max_file_size, Some(512));
    }

    #[test]
    fn diagonal_takes_the_angle() {
        let cli = Cli::try_parse_from([
            "zenglitch",
            "in.ppm",
            "--traversal",
            "diagonal",
            "--angle",
            "-30",
            "--random",
            "25",
            "--seed",
            "7",
            "--algorithm",
            "comb",
        ])
        .expect("diagonal args should parse");
        let pass = cli.pass();
        assert_eq!(pass.traversal, Traversal::Diagonal(-30));
        assert_eq!(pass.reorder.algorithm, SortAlgorithm::Comb);
        assert_eq!(pass.reorder.seed, 7);
        assert!(matches!(pass.reorder.segmenter, Segmenter::Random { max: 25 }));
    }

    #[test]
    fn segment_selectors_are_exclusive() {
        let err = Cli::try_parse_from(["zenglitch", "in.ppm", "--full", "--random", "9"])
            .expect_err("full and random should conflict");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
        let cli = Cli::try_parse_from(["zenglitch", "in.ppm", "--traversal", "rays", "--full"])
            .expect("full should parse");
        assert!(matches!(cli.pass().reorder.segmenter, Segmenter::Full));
    }

    #[test]
    fn preset_takes_the_seed() {
        let cli = Cli::try_parse_from(["zenglitch", "in.ppm", "--preset", "hilbert-glitch", "--seed", "42"])
            .expect("preset should parse");
        assert_eq!(cli.pipeline().passes()[0].reorder.seed, 42);
    }
}
