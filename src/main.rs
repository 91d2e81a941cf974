//! Command line front end for replaying recorded enrollment sessions.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use pose_enrollment::{
    config::{Config, EXAMPLE_CONFIG},
    constants::ENROLLMENT_IMAGE_COUNT,
    frame_loop::{FrameLoop, SessionObserver, SessionOutcome, StatusReport},
    landmarks::Detection,
    replay::{LandmarkScript, ScriptedDetector, StaticFrameSource},
    scheduler::CancelToken,
    sequencer::CapturedImage,
};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the classification of every scripted frame
    Classify {
        /// Landmark script to classify
        #[arg(short, long)]
        script: PathBuf,
    },

    /// Replay a landmark script through a full enrollment session
    Enroll {
        /// Landmark script to replay
        #[arg(short, long)]
        script: PathBuf,

        /// Directory for the captured images
        #[arg(short, long, default_value = "enrollment")]
        output: PathBuf,

        /// Width of the placeholder frame
        #[arg(long, default_value = "640")]
        width: u32,

        /// Height of the placeholder frame
        #[arg(long, default_value = "480")]
        height: u32,
    },

    /// Print an example configuration file
    ExampleConfig,
}

/// Prints progress and keeps the final images
#[derive(Default)]
struct ConsoleObserver {
    last_line: String,
    images: Option<[CapturedImage; ENROLLMENT_IMAGE_COUNT]>,
}

impl SessionObserver for ConsoleObserver {
    fn on_status(&mut self, status: &StatusReport<'_>) {
        let pose = status.pose().map_or("-", |p| p.as_str());
        let line = match status.error {
            Some(e) => format!("[{}] {e}", status.step),
            None => format!(
                "[{}] pose={pose} stable={} captured={}/{ENROLLMENT_IMAGE_COUNT}",
                status.step, status.stable_count, status.captured
            ),
        };
        // Only print changes
        if line != self.last_line {
            println!("{line}");
            self.last_line = line;
        }
    }

    fn on_session_complete(&mut self, images: [CapturedImage; ENROLLMENT_IMAGE_COUNT]) {
        self.images = Some(images);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path).with_context(|| format!("Failed to load config {}", path.display()))?
        }
        None => Config::default(),
    };
    config.validate()?;
    Ok(config)
}

fn classify(config: &Config, script_path: &Path) -> Result<()> {
    let script = LandmarkScript::from_file(script_path)?;
    let mut classifier_config = config.clone();
    classifier_config.classifier.layout = script.layout;
    let classifier = classifier_config.classifier();

    for (index, detection) in script.detections()?.iter().enumerate() {
        match detection {
            Detection::Single(frame) => match classifier.classify(frame) {
                Ok(result) => println!(
                    "{index:4}: {:5} confidence={:.2} offset={:+.3} eye_ratio={:.2} skew={:.3}",
                    result.pose,
                    result.confidence,
                    result.metrics.combined_offset,
                    result.metrics.eye_ratio,
                    result.metrics.face_skew
                ),
                Err(e) => println!("{index:4}: {e}"),
            },
            Detection::Multiple(count) => println!("{index:4}: {count} faces"),
            Detection::None => println!("{index:4}: no face"),
        }
    }
    Ok(())
}

async fn enroll(config: &Config, script_path: &Path, output: &Path, width: u32, height: u32) -> Result<()> {
    let script = LandmarkScript::from_file(script_path)?;
    info!("Replaying {} frames from {}", script.frame_count()?, script_path.display());

    let mut config = config.clone();
    config.classifier.layout = script.layout;

    let cancel = CancelToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut frame_loop = FrameLoop::new(
        config.session(),
        StaticFrameSource::blank(width, height),
        ScriptedDetector::from_script(&script)?,
        config.encoder(),
        ConsoleObserver::default(),
    )
    .with_scheduler(Box::new(config.scheduler()))
    .with_settle_delay(config.settle_delay())
    .with_cancel_token(cancel);

    let outcome = frame_loop.run().await?;
    let step = frame_loop.session().step();
    let observer = frame_loop.into_observer();

    match (outcome, observer.images) {
        (SessionOutcome::Completed, Some(images)) => {
            std::fs::create_dir_all(output)
                .with_context(|| format!("Failed to create output directory {}", output.display()))?;
            for image in images {
                let path = output.join(format!("{}.{}", image.position(), config.capture.format.extension()));
                std::fs::write(&path, image.image_data())
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("Saved {}", path.display());
            }
        }
        (SessionOutcome::Completed, None) => warn!("Session completed without images"),
        (SessionOutcome::Cancelled, _) => warn!("Enrollment cancelled at step {step}"),
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    match args.command {
        Command::ExampleConfig => {
            print!("{EXAMPLE_CONFIG}");
            Ok(())
        }
        Command::Classify { script } => {
            let config = load_config(args.config.as_deref())?;
            classify(&config, &script)
        }
        Command::Enroll {
            script,
            output,
            width,
            height,
        } => {
            let config = load_config(args.config.as_deref())?;
            enroll(&config, &script, &output, width, height).await
        }
    }
}
