//! stigmergy - CLI Entry Point
//!
//! Headless driver for the stigmergic raster simulation.

use clap::{Parser, Subcommand};
use stigmergy::config::PRESETS;
use stigmergy::{benchmark, Config, SimulationState};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "stigmergy")]
#[command(version)]
#[command(about = "Stigmergic multi-agent raster simulation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a headless simulation
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Start from a named preset instead of a file
        #[arg(short, long, conflicts_with = "config")]
        preset: Option<String>,

        /// Number of frames to simulate
        #[arg(short, long, default_value = "1000")]
        frames: u64,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Write the stats history as JSON
        #[arg(long)]
        stats_out: Option<PathBuf>,

        /// Write the final field as raw row-major RGBA8 bytes
        #[arg(long)]
        dump: Option<PathBuf>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of frames
        #[arg(short, long, default_value = "500")]
        frames: u64,

        /// Population size
        #[arg(short, long, default_value = "10000")]
        agents: usize,
    },

    /// Generate a configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,

        /// Preset to write instead of the defaults
        #[arg(short, long)]
        preset: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            preset,
            frames,
            seed,
            stats_out,
            dump,
            quiet,
        } => {
            let config = load_config(config, preset)?;
            init_logging(&config.logging.log_level);
            run_simulation(config, frames, seed, stats_out, dump, quiet)
        }

        Commands::Benchmark { frames, agents } => {
            init_logging("warn");
            run_benchmark(frames, agents)
        }

        Commands::Init { output, preset } => {
            init_logging("info");
            generate_config(output, preset)
        }
    }
}

/// `RUST_LOG` wins over the configured level
fn init_logging(default_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn load_config(
    path: PathBuf,
    preset: Option<String>,
) -> Result<Config, Box<dyn std::error::Error>> {
    let config = match preset {
        Some(name) => {
            println!("Using preset: {}", name);
            Config::preset(&name)?
        }
        None if path.exists() => {
            println!("Loading config from: {:?}", path);
            Config::from_file(&path)?
        }
        None => {
            println!("Using default configuration");
            Config::default()
        }
    };
    Ok(config)
}

fn run_simulation(
    config: Config,
    frames: u64,
    seed: Option<u64>,
    stats_out: Option<PathBuf>,
    dump: Option<PathBuf>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut sim = match seed {
        Some(s) => SimulationState::new_with_seed(config.clone(), s)?,
        None => SimulationState::new(config.clone())?,
    };

    println!("Starting simulation");
    println!("  Agents: {}", sim.population().len());
    println!("  Field: {}x{}", config.field.width, config.field.height);
    println!("  Substeps: {}", config.simulation.substeps);
    println!("  Seed: {}", sim.seed());
    println!("  Frames: {}", frames);
    println!();

    let start = Instant::now();
    let stats_interval = config.logging.stats_interval;

    sim.run_with_callback(frames, |sim, _| {
        if !quiet && sim.frame_count() % stats_interval == 0 {
            log::info!("{}", sim.stats.summary());
        }
    });

    let elapsed = start.elapsed();
    let frames_per_sec = frames as f64 / elapsed.as_secs_f64();

    println!();
    println!("=== Simulation Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Frames: {}", sim.frame_count());
    println!("Speed: {:.1} frames/s", frames_per_sec);
    println!("Mean intensity: {:.2}", sim.stats.mean_intensity);
    println!("Coverage: {:.1}%", sim.stats.coverage * 100.0);
    let peak = |series: Vec<(u64, f32)>| {
        series
            .into_iter()
            .fold((0, 0.0f32), |best, s| if s.1 > best.1 { s } else { best })
    };
    let (frame, intensity) = peak(sim.stats_history.intensity_series());
    println!("Peak mean intensity: {:.2} (frame {})", intensity, frame);
    let (frame, coverage) = peak(sim.stats_history.coverage_series());
    println!("Peak coverage: {:.1}% (frame {})", coverage * 100.0, frame);
    let anomalies = sim.stats_history.total_anomalies();
    if anomalies > 0 {
        println!("Corrective resets (sampled frames): {}", anomalies);
    }

    if let Some(path) = stats_out {
        sim.stats_history.save(&path)?;
        println!("Stats history: {:?}", path);
    }

    if let Some(path) = dump {
        std::fs::write(&path, sim.field().to_rgba8())?;
        println!(
            "Field dump ({}x{} RGBA8): {:?}",
            sim.field().width(),
            sim.field().height(),
            path
        );
    }

    Ok(())
}

fn run_benchmark(frames: u64, agents: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("Running benchmark: {} frames, {} agents", frames, agents);
    println!();

    let result = benchmark(frames, agents)?;
    println!("{}", result);

    Ok(())
}

fn generate_config(
    output: PathBuf,
    preset: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match preset.as_deref() {
        Some(name) => Config::preset(name)?,
        None => Config::default(),
    };
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    println!("Available presets: {}", PRESETS.join(", "));
    Ok(())
}
