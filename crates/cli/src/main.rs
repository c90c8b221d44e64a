use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;

use content_guard_core::analysis::content_analyser::ContentAnalyser;
use content_guard_core::inference::inference_pool::InferencePool;
use content_guard_core::inference::infrastructure::ort_session::OrtSessionLoader;
use content_guard_core::models::infrastructure::http_asset_provisioner::HttpAssetProvisioner;
use content_guard_core::pipeline::scan_media_use_case::{MediaKind, ScanMediaUseCase, ScanReport};
use content_guard_core::pipeline::scan_stream_use_case::ScanStreamUseCase;
use content_guard_core::shared::config::{AnalyserConfig, ContentPolicy};
use content_guard_core::video::domain::vision_reader::VisionReader;
use content_guard_core::video::infrastructure::ffmpeg_vision_reader::FfmpegVisionReader;

/// NSFW screening for images and videos.
#[derive(Parser)]
#[command(name = "content-guard")]
struct Cli {
    /// Image or video files to screen.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run the detector for frame and video verdicts.
    #[arg(long)]
    enforce: bool,

    /// Maximum concurrent inference calls.
    #[arg(long)]
    execution_threads: Option<usize>,

    /// Worker threads for scanning inputs.
    #[arg(long, default_value = "1")]
    jobs: usize,

    /// First video frame to analyse.
    #[arg(long, default_value = "0")]
    trim_start: usize,

    /// Video frame to stop before (default: end of video).
    #[arg(long)]
    trim_end: Option<usize>,

    /// Scan videos as live streams (one sampled frame per second).
    #[arg(long)]
    stream: bool,

    /// Print raw detector scores for images instead of verdicts.
    #[arg(long)]
    scores: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = build_config(&cli)?;
    log::info!("Content policy: {}", config.policy);

    let reader: Arc<dyn VisionReader> = Arc::new(FfmpegVisionReader::new());
    let analyser = Arc::new(build_analyser(config, reader.clone()));

    if !analyser.pre_check() {
        return Err("NSFW model assets could not be provisioned".into());
    }
    eprintln!();

    let result = if cli.scores {
        print_scores(&analyser, &*reader, &cli.inputs)
    } else if cli.stream {
        scan_streams(&analyser, reader, &cli)
    } else {
        scan_media(&analyser, &cli);
        Ok(())
    };

    analyser.clear_inference_pool();
    result
}

fn build_config(cli: &Cli) -> Result<AnalyserConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => AnalyserConfig::load(path)?,
        None => AnalyserConfig::default(),
    };
    if cli.enforce {
        config.policy = ContentPolicy::Enforced;
    }
    if cli.execution_threads.is_some() {
        config.execution_thread_count = cli.execution_threads;
    }
    Ok(config)
}

fn build_analyser(config: AnalyserConfig, reader: Arc<dyn VisionReader>) -> ContentAnalyser {
    let pool = Arc::new(InferencePool::new(Box::new(OrtSessionLoader::default())));
    let provisioner =
        Arc::new(HttpAssetProvisioner::new().with_progress(Box::new(download_progress)));

    ContentAnalyser::new(config, pool, provisioner, reader).with_video_progress(Box::new(
        |done, total| {
            eprint!("\rScanning frame {done}/{total}");
        },
    ))
}

fn scan_media(analyser: &Arc<ContentAnalyser>, cli: &Cli) {
    let use_case =
        ScanMediaUseCase::new(analyser.clone(), cli.jobs).with_trim(cli.trim_start, cli.trim_end);
    let reports = use_case.execute(&cli.inputs);
    eprintln!();

    for report in &reports {
        println!("{}", format_report(report));
    }
}

fn scan_streams(
    analyser: &Arc<ContentAnalyser>,
    reader: Arc<dyn VisionReader>,
    cli: &Cli,
) -> Result<(), Box<dyn std::error::Error>> {
    let use_case = ScanStreamUseCase::new(analyser.clone(), reader);
    for input in &cli.inputs {
        if MediaKind::of(input) == MediaKind::Image {
            println!("{}\tskipped (not a video)", input.display());
            continue;
        }
        match use_case.execute(input) {
            Ok(report) => println!(
                "{}\t{}/{} sampled frames unsafe ({} frames)",
                input.display(),
                report.unsafe_frames,
                report.sampled,
                report.frames
            ),
            Err(e) => println!("{}\terror: {e}", input.display()),
        }
    }
    Ok(())
}

fn print_scores(
    analyser: &ContentAnalyser,
    reader: &dyn VisionReader,
    inputs: &[PathBuf],
) -> Result<(), Box<dyn std::error::Error>> {
    for input in inputs {
        if MediaKind::of(input) != MediaKind::Image {
            println!("{}\tskipped (not an image)", input.display());
            continue;
        }
        let frame = reader.read_image(input)?;
        let scores = analyser.detect_nsfw(&frame)?;
        let formatted: Vec<String> = scores.iter().map(|s| format!("{s:.3}")).collect();
        println!("{}\t[{}]", input.display(), formatted.join(", "));
    }
    Ok(())
}

fn format_report(report: &ScanReport) -> String {
    let outcome = match &report.verdict {
        Ok(true) => "UNSAFE".to_string(),
        Ok(false) => "safe".to_string(),
        Err(e) => format!("error: {e}"),
    };
    format!("{}\t{}\t{outcome}", report.path.display(), report.kind)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(missing) = cli.inputs.iter().find(|p| !p.exists()) {
        return Err(format!("Input file not found: {}", missing.display()).into());
    }
    if let Some(config) = cli.config.as_deref().filter(|p| !p.exists()) {
        return Err(format!("Config file not found: {}", config.display()).into());
    }
    if cli.jobs == 0 {
        return Err("Jobs must be at least 1".into());
    }
    if cli.execution_threads == Some(0) {
        return Err("Execution threads must be at least 1".into());
    }
    if let Some(end) = cli.trim_end {
        if end <= cli.trim_start {
            return Err(format!(
                "Trim end must be greater than trim start, got {}..{end}",
                cli.trim_start
            )
            .into());
        }
    }
    if cli.scores && cli.stream {
        return Err("--scores and --stream are mutually exclusive".into());
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading NSFW detection model... {pct}%");
    } else {
        eprint!("\rDownloading NSFW detection model... {downloaded} bytes");
    }
}
