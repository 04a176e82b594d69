//! Command line interface

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use freightcam_cv::WatchConfig;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Camera object counter and freight emissions API", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the route optimization and emissions HTTP API
    Serve(ServeArgs),
    /// Poll the camera and count objects A and B until interrupted
    Watch(DetectorArgs),
    /// Run detection once on a local image
    Detect(DetectArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:5001")]
    pub bind: SocketAddr,
}

#[derive(Args, Debug, Default)]
pub struct DetectorArgs {
    /// JSON configuration file; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Camera snapshot URL
    #[arg(long)]
    pub camera_url: Option<String>,

    /// Minimum match score to count a detection
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Seconds before the same object can be counted again
    #[arg(long)]
    pub cooldown_secs: Option<f64>,

    /// Reference image for object A
    #[arg(long)]
    pub template_a: Option<PathBuf>,

    /// Reference image for object B
    #[arg(long)]
    pub template_b: Option<PathBuf>,

    /// Where the annotated frame is written
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// TrueType font used to draw the counters on the overlay
    #[arg(long)]
    pub font: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Image to run detection on
    #[arg(long)]
    pub image: PathBuf,

    /// Write the detection report as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    #[command(flatten)]
    pub detector: DetectorArgs,
}

impl DetectorArgs {
    /// Defaults, then the config file, then individual flags
    pub fn resolve(&self) -> Result<WatchConfig> {
        let mut config = match &self.config {
            Some(path) => WatchConfig::load(path)?,
            None => WatchConfig::default(),
        };

        if let Some(url) = &self.camera_url {
            config.camera_url = url.clone();
        }
        if let Some(threshold) = self.threshold {
            config.counter.threshold = threshold;
        }
        if let Some(cooldown) = self.cooldown_secs {
            config.counter.cooldown_secs = cooldown;
        }
        if let Some(path) = &self.template_a {
            config.template_a = path.clone();
        }
        if let Some(path) = &self.template_b {
            config.template_b = path.clone();
        }
        if let Some(path) = &self.output {
            config.output = path.clone();
        }

        config.validate().context("Invalid detector configuration")?;
        Ok(config)
    }
}
