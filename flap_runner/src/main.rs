//! flap_runner: interactive entry point.

use std::path::PathBuf;

use clap::Parser;
use flap_runner::app::run;
use flap_runner::config::{PoseSourceKind, RunnerConfig};

#[derive(Debug, Parser)]
#[command(name = "flap_runner")]
#[command(about = "Motion-controlled side-scrolling runner")]
struct Cli {
    /// JSON config file; missing keys keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start with keyboard controls instead of gestures.
    #[arg(long)]
    keyboard: bool,

    /// Seed for obstacles, particles and the simulated skeleton.
    #[arg(long)]
    seed: Option<u64>,

    /// Run without any pose source (keyboard only).
    #[arg(long)]
    no_camera: bool,

    /// Keep thresholds and high score in memory only.
    #[arg(long)]
    no_save: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut cfg = match cli.config.as_deref() {
        Some(path) => RunnerConfig::load(path).unwrap_or_else(|e| {
            log::warn!("{e}; using defaults");
            RunnerConfig::default()
        }),
        None => RunnerConfig::default(),
    };
    if cli.keyboard {
        cfg.manual_input = true;
    }
    if let Some(seed) = cli.seed {
        cfg.seed = seed;
    }
    if cli.no_camera {
        cfg.pose_source = PoseSourceKind::None;
    }
    if cli.no_save {
        cfg.store_path = None;
    }

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║            Flap Runner — motion-controlled runner            ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    match cfg.pose_source {
        PoseSourceKind::Simulated => println!("  Pose source: simulated skeleton (J/W/X move the arm)"),
        PoseSourceKind::None      => println!("  Pose source: none (keyboard only)"),
    }
    println!();

    if let Err(e) = run(cfg) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
