use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use traffic_junction::simulation::{SimConfig, SimWorld};

#[derive(Parser)]
#[command(name = "traffic_junction")]
#[command(about = "Headless simulation of vehicles crossing signalled intersections")]
struct Cli {
    /// Number of vehicles driving through the grid
    #[arg(long, default_value = "6")]
    vehicles: usize,

    /// Width and height of the intersection grid
    #[arg(long, default_value = "2")]
    grid: usize,

    /// Wall-clock seconds to run before shutting down
    #[arg(long, default_value = "10")]
    seconds: f64,

    /// Length of one time unit in milliseconds (lights hold a phase for 4-6 units)
    #[arg(long, default_value = "1000")]
    unit_ms: u64,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,traffic_junction=info"),
    )
    .init();

    let cli = Cli::parse();
    let run_for = Duration::try_from_secs_f64(cli.seconds)
        .with_context(|| format!("Invalid run time of {} seconds", cli.seconds))?;
    let config = SimConfig {
        vehicles: cli.vehicles,
        grid_size: cli.grid,
        run_for,
        unit: Duration::from_millis(cli.unit_ms.max(1)),
        seed: cli.seed,
    };

    let mut world = SimWorld::new(config)?;
    world.run()?;
    Ok(())
}
