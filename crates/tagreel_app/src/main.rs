mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use pipeline_logging::{pipeline_error, pipeline_info, pipeline_warn};
use tagreel_core::{EventLevel, JobRequest, JobSummary, ProgressEvent};
use tagreel_engine::{EngineConfig, EngineEvent, EngineHandle};

use logging::LogDestination;

const DEFAULT_DRIVER_URL: &str = "http://localhost:9515";

#[derive(Parser)]
#[command(
    name = "tagreel",
    about = "Pulls new videos for a hashtag, mirrors and crops them, and records what it has seen"
)]
struct Cli {
    /// Hashtag to pull from, without the leading '#'.
    hashtag: String,
    /// Number of new videos to process.
    #[arg(short = 'n', long, default_value_t = 3)]
    count: usize,
    /// Directory the videos/, edited_videos/ and data/ folders live under.
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Endpoint of a running WebDriver server (chromedriver or similar).
    #[arg(long, default_value = DEFAULT_DRIVER_URL)]
    driver_url: String,
    /// Percent to trim from each edge of the frame.
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..50))]
    crop_percent: u8,
    /// Skip the horizontal mirror.
    #[arg(long)]
    no_mirror: bool,
    /// Show the browser window instead of running headless.
    #[arg(long)]
    no_headless: bool,
    /// Where log lines go.
    #[arg(long, value_enum, default_value_t = LogDestination::Terminal)]
    log: LogDestination,
    /// Log debug detail as well.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(cli.log, cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Runs one job to completion. `Ok(true)` means the job finished on its
/// own; `Ok(false)` means it was cut short by a fatal error.
fn run(cli: &Cli) -> anyhow::Result<bool> {
    let request = JobRequest::new(&cli.hashtag, cli.count)?;

    let mut config = EngineConfig::with_root(&cli.root);
    config.driver.endpoint = cli.driver_url.clone();
    config.driver.headless = !cli.no_headless;
    config.transform.crop_percent = cli.crop_percent;
    config.transform.mirror = !cli.no_mirror;

    let engine = EngineHandle::new(config);
    engine.submit(request).context("could not start the job")?;

    while let Some(event) = engine.recv() {
        match event {
            EngineEvent::Progress(progress) => report(&progress),
            EngineEvent::JobFinished { summary, fatal } => {
                render_summary(&summary);
                return Ok(fatal.is_none());
            }
        }
    }
    anyhow::bail!("engine stopped without finishing the job");
}

fn report(event: &ProgressEvent) {
    let message = match event.progress {
        Some(progress) => format!("{} [{}/{}]", event.message, progress.current, progress.total),
        None => event.message.clone(),
    };
    match event.level {
        EventLevel::Info => pipeline_info!("{message}"),
        EventLevel::Warning => pipeline_warn!("{message}"),
        EventLevel::Error => pipeline_error!("{message}"),
    }
}

fn render_summary(summary: &JobSummary) {
    let mut message = format!(
        "Process finished for hashtag '{}'. Successfully edited: {}/{}. Failed/Skipped: {}.",
        summary.hashtag,
        summary.succeeded,
        summary.discovered,
        summary.failed_total()
    );
    if summary.failed_total() > 0 {
        message.push_str(" Check the log for details on failures.");
    }
    pipeline_info!("{message}");
}
