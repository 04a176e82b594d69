mod cli;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command, DetectArgs, DetectorArgs};
use freightcam_cv::{
    detection::SystemClock,
    overlay::{OverlayRenderer, Presenter, SnapshotPresenter},
    utils::ImageUtils,
    AcquisitionLoop, DualDetector, HttpFrameSource, QuitSignal,
};
use std::io::BufRead;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("freightcam=info,freightcam_cv=info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => server::run(server::ServerConfig { bind: args.bind }).await,
        Command::Watch(args) => watch(args).await,
        Command::Detect(args) => detect(args),
    }
}

fn renderer(args: &DetectorArgs) -> Result<OverlayRenderer> {
    match &args.font {
        Some(path) => OverlayRenderer::new().with_font_file(path),
        None => Ok(OverlayRenderer::new()),
    }
}

async fn watch(args: DetectorArgs) -> Result<()> {
    let config = args.resolve()?;
    let presenter = SnapshotPresenter::new(renderer(&args)?, config.output.clone());
    let detector = DualDetector::from_config(&config);
    if detector.active_labels().is_empty() {
        warn!("No templates loaded; frames will be fetched but nothing can be counted");
    }

    let quit = QuitSignal::new();
    {
        let quit = quit.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, stopping after the current cycle");
                quit.raise();
            }
        });
    }
    {
        // Typing `q` + Enter stands in for the viewer's quit key
        let quit = quit.clone();
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines().map_while(std::io::Result::ok) {
                if line.trim().eq_ignore_ascii_case("q") {
                    quit.raise();
                    break;
                }
            }
        });
    }

    let source = HttpFrameSource::new(config.camera_url.clone(), config.fetch_timeout());
    info!("Starting camera tracker on {}... Type 'q' + Enter or press Ctrl-C to exit.", source.url());
    info!("Latest annotated frame: {:?}", config.output);

    let backoff = config.backoff();
    let counts = tokio::task::spawn_blocking(move || {
        AcquisitionLoop::new(source, SystemClock, presenter, detector, backoff).run(&quit)
    })
    .await
    .context("Camera loop panicked")?;

    info!("Final counts: A={}, B={}", counts.a, counts.b);
    Ok(())
}

fn detect(args: DetectArgs) -> Result<()> {
    let config = args.detector.resolve()?;
    let mut detector = DualDetector::from_config(&config);

    let frame = ImageUtils::load(&args.image)?;
    let report = detector.process(&frame.to_luma8(), Instant::now());

    let mut presenter = SnapshotPresenter::new(renderer(&args.detector)?, config.output.clone());
    presenter.present(&frame.to_rgb8(), &report)?;
    info!("Visualization saved: {:?}", presenter.output());

    for detection in &report.detections {
        match &detection.result {
            Some(result) => info!(
                "Object {}: score {:.3} at {:?} (scale {:.2}) -> {:?}",
                detection.label, result.score, result.location, result.scale, detection.decision
            ),
            None => info!("Object {}: template does not fit the image", detection.label),
        }
    }
    info!(
        "Counts: A={}, B={} ({}ms)",
        report.counts.a, report.counts.b, report.processing_time_ms
    );

    if let Some(path) = &args.report {
        DualDetector::export_json(&report, path)?;
        info!("Report written to {:?}", path);
    }

    Ok(())
}
