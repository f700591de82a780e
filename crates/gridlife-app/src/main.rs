//! Headless CLI runner: drives the simulation worker for a fixed number of
//! generations and logs each generation's statistics.

use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossfire::TryRecvError;
use tracing::{info, warn};

use gridlife_app::{SimCommand, SimEvent, SimHost};
use gridlife_core::SimConfig;

#[derive(Parser, Debug)]
#[command(name = "gridlife", version, about = "Grid-world evolution simulator")]
struct Cli {
    /// JSON configuration file layered under the command-line overrides.
    #[arg(long)]
    config: Option<PathBuf>,

    /// PRNG seed; omit for an entropy seed.
    #[arg(long)]
    seed: Option<u32>,

    /// Number of generations to run.
    #[arg(long, default_value_t = 10)]
    generations: u32,

    /// Agents per generation.
    #[arg(long)]
    population: Option<u16>,

    /// Steps per generation.
    #[arg(long)]
    steps: Option<u32>,

    /// Square grid edge length.
    #[arg(long)]
    size: Option<u16>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = compose_config(&cli)?;
    config
        .validate()
        .context("rejected configuration")?;

    info!(
        size_x = config.size_x,
        size_y = config.size_y,
        population = config.population,
        steps_per_generation = config.steps_per_generation,
        seed = ?config.rng_seed,
        "starting simulation"
    );

    let (host, events) = SimHost::launch(Some(config)).context("launch simulation worker")?;

    for _ in 0..cli.generations {
        host.send(SimCommand::StepGeneration)?;
        let stats = wait_for_generation(&events)?;
        info!(
            generation = stats.generation,
            population = stats.population,
            survivors = stats.survivors,
            survival_rate = stats.survival_rate,
            diversity = stats.genetic_diversity,
            genome_length_avg = stats.genome_length_avg,
            kill_deaths = stats.kill_deaths,
            "generation complete"
        );
    }

    host.shutdown()?;
    info!("simulation finished");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn compose_config(cli: &Cli) -> Result<SimConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("read config file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parse config file {}", path.display()))?
        }
        None => SimConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.rng_seed = Some(seed);
    }
    if let Some(population) = cli.population {
        config.population = population;
    }
    if let Some(steps) = cli.steps {
        config.steps_per_generation = steps;
    }
    if let Some(size) = cli.size {
        config.size_x = size;
        config.size_y = size;
    }
    Ok(config)
}

fn wait_for_generation(
    events: &gridlife_app::EventReceiver,
) -> Result<gridlife_core::GenerationStats> {
    let deadline = Instant::now() + Duration::from_secs(600);
    loop {
        match events.try_recv() {
            Ok(SimEvent::GenerationComplete { stats }) => return Ok(stats),
            Ok(SimEvent::Error { message }) => bail!("simulation error: {message}"),
            Ok(_) => {}
            Err(TryRecvError::Empty) => {
                if Instant::now() >= deadline {
                    bail!("timed out waiting for the generation to complete");
                }
                thread::sleep(Duration::from_millis(1));
            }
            Err(TryRecvError::Disconnected) => {
                warn!("event channel closed before the generation completed");
                bail!("simulation worker exited early");
            }
        }
    }
}
