use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use signal_sim::simulation::{parse_spawn_policy, ControlMode, SimConfig, SimWorld};

#[derive(Parser)]
#[command(name = "signal_sim")]
#[command(about = "Four-way intersection simulation with fixed-timer or MDP signal control")]
struct Cli {
    /// Signal control mode: ft (fixed timer), pi (policy iteration) or vi (value iteration)
    #[arg(long, default_value = "ft")]
    mode: String,

    /// Simulated seconds to run
    #[arg(long, default_value = "60")]
    seconds: u64,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Window width in world units
    #[arg(long, default_value = "1000")]
    width: f32,

    /// Window height in world units
    #[arg(long, default_value = "1000")]
    height: f32,

    /// Seconds between spawn attempts
    #[arg(long, default_value = "1.5")]
    spawn_frequency: f32,

    /// Spawn rules and their relative weights
    #[arg(long, default_value = "all_directions:2,up_down:1,left_right:1,none:1")]
    spawn_policy: String,

    /// Green ticks before the fixed timer switches
    #[arg(long, default_value = "300")]
    green_ticks: u32,

    /// Minimum green ticks before the adaptive controller may switch
    #[arg(long, default_value = "150")]
    min_green_ticks: u32,

    /// Print a summary every N simulated seconds
    #[arg(long, default_value = "10")]
    summary_every: u64,

    /// Write per-second statistics to this CSV file
    #[arg(long)]
    stats_csv: Option<PathBuf>,
}

impl Cli {
    fn to_config(&self) -> Result<SimConfig> {
        let mode: ControlMode = self.mode.parse()?;
        let spawn_policy = parse_spawn_policy(&self.spawn_policy)?;
        Ok(SimConfig {
            width: self.width,
            height: self.height,
            car_spawn_frequency: self.spawn_frequency,
            simulation_duration: self.seconds as f32,
            spawn_policy,
            green_duration: self.green_ticks,
            min_green_ticks: self.min_green_ticks,
            mode,
            seed: self.seed,
            ..SimConfig::default()
        })
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.to_config().context("Invalid simulation configuration")?;

    // Ctrl-C ends the run between ticks so the results still get written
    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || handler_stop.store(true, Ordering::Relaxed))
        .context("Failed to install Ctrl-C handler")?;

    run_headless(
        config,
        cli.seconds,
        cli.summary_every,
        cli.stats_csv.as_deref(),
        &stop,
    )
}

/// Run the simulation without any graphics
fn run_headless(
    config: SimConfig,
    seconds: u64,
    summary_every: u64,
    stats_csv: Option<&Path>,
    stop: &AtomicBool,
) -> Result<()> {
    let ticks_per_second = config.ticks_per_second as u64;
    let mode = config.mode;
    let mut world = SimWorld::new(config)?;

    info!("Running intersection simulation in {} mode", mode);
    info!("Seconds: {}, ticks per second: {}", seconds, ticks_per_second);
    info!("{}", world.summary());

    for second in 1..=seconds {
        let ran = world.run(ticks_per_second, stop);
        if ran < ticks_per_second {
            info!(
                "Stop requested at {:.1}s of {}s, finishing early",
                world.elapsed_secs(),
                seconds
            );
            break;
        }
        if summary_every > 0 && second % summary_every == 0 {
            info!("{}", world.summary());
        }
    }

    world.stats().log_summary(mode, world.elapsed_secs());

    if let Some(path) = stats_csv {
        world.stats().write_csv(path)?;
        info!("Wrote statistics to {}", path.display());
    }

    Ok(())
}
