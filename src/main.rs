// simscrape: find and download images similar to a local picture
//
// Uploads the picture to Yandex Images, walks the "similar images" listing
// and saves up to --depth distinct images next to it.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use simscrape::{
    DedupMode, DownloadOutcome, LocateConfig, LocateError, ProgressReporter, ResolutionFailure,
    SimilarityThresholds, locate_similar_until,
};

#[derive(Parser, Debug)]
#[command(name = "simscrape")]
#[command(about = "Download images visually similar to a local picture", long_about = None)]
struct Args {
    /// Source image (JPEG, PNG or GIF)
    image: PathBuf,

    /// Number of distinct images to download
    #[arg(short, long, default_value_t = 4)]
    depth: usize,

    /// Destination directory (default: <IMAGE>_images)
    #[arg(short = 'o', long)]
    save_folder: Option<PathBuf>,

    /// Duplicate detection: off, fast or full
    #[arg(long, default_value = "full")]
    dedup: DedupMode,

    /// Max normalised hash distance treated as a duplicate
    #[arg(long)]
    hash_threshold: Option<f32>,

    /// Max structural (SSIM) distance treated as a duplicate
    #[arg(long)]
    ssim_threshold: Option<f32>,

    /// Max colour-histogram distance treated as a duplicate
    #[arg(long)]
    histogram_threshold: Option<f32>,

    /// Overall crawl deadline in seconds (0 disables it)
    #[arg(long)]
    timeout: Option<u64>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Verbose logging
    #[arg(long)]
    debug: bool,

    /// Print the full crawl report as JSON
    #[arg(long)]
    json: bool,
}

/// Logs lifecycle events for interactive runs
struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report_uploaded(&self, search_url: &str) {
        info!("Image uploaded: {search_url}");
    }

    fn report_browser_launched(&self) {
        info!("Browser ready");
    }

    fn report_candidates_found(&self, count: usize) {
        info!("{count} similar-image candidates");
    }

    fn report_resolved(&self, _candidate: &str, _image_url: &str) {}

    fn report_resolution_failed(&self, candidate: &str, failure: &ResolutionFailure) {
        warn!("Dropped {candidate}: {failure}");
    }

    fn report_download(&self, outcome: &DownloadOutcome) {
        if let DownloadOutcome::Accepted { filename, .. } = outcome {
            info!("Saved {filename}");
        }
    }

    fn report_cleanup_started(&self) {}

    fn report_completed(&self, accepted: usize) {
        info!("Done: {accepted} images saved");
    }

    fn report_error(&self, error: &str) {
        error!("{error}");
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let filter = ["chromiumoxide::handler=off", "chromiumoxide::conn=off"]
        .into_iter()
        .filter_map(|directive| directive.parse().ok())
        .fold(filter, tracing_subscriber::EnvFilter::add_directive);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(debug))
        .init();
}

fn build_config(args: &Args) -> anyhow::Result<LocateConfig> {
    let defaults = SimilarityThresholds::default();
    let thresholds = SimilarityThresholds {
        hash: args.hash_threshold.unwrap_or(defaults.hash),
        structural: args.ssim_threshold.unwrap_or(defaults.structural),
        histogram: args.histogram_threshold.unwrap_or(defaults.histogram),
        exact: defaults.exact,
    };

    let mut builder = LocateConfig::builder()
        .source_image(&args.image)
        .depth(args.depth)
        .dedup_mode(args.dedup)
        .thresholds(thresholds)
        .debug(args.debug)
        .headless(!args.headed);

    if let Some(folder) = &args.save_folder {
        builder = builder.save_folder(folder);
    }
    if let Some(secs) = args.timeout {
        builder = builder.crawl_timeout_secs((secs > 0).then_some(secs));
    }

    builder.build()
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.debug);

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(2);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    match locate_similar_until(&config, Arc::new(LogProgress), shutdown).await {
        Ok(report) => {
            if args.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("error: failed to serialize report: {e}");
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                for image in &report.accepted {
                    println!("{}", config.save_folder().join(&image.filename).display());
                }
            }
            ExitCode::SUCCESS
        }
        Err(LocateError::Cancelled) => {
            eprintln!("cancelled");
            ExitCode::from(130)
        }
        Err(e) => {
            eprintln!("error: {e}");
            if e.is_input_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
