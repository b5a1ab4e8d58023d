//! Headless sandbox driving the Terraflow engine
//!
//! Runs a scripted scenario (sources, brush strokes) for a fixed number
//! of ticks and reports mass and perf summaries. Doubles as a usage
//! example of the engine API and as a profiling harness.

mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use terraflow_core::{Engine, EngineConfig, SharedPerfHistory, TerrainGenerator};

use crate::scenario::Scenario;

#[derive(Parser)]
#[command(name = "terraflow-sandbox", about = "Headless Terraflow simulation runner")]
struct Args {
    /// Number of ticks to simulate
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Grid resolution, cells per axis (power of two)
    #[arg(long, default_value_t = 256)]
    resolution: usize,

    /// Terrain seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Engine config preset in RON format
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scripted scenario to run
    #[arg(long, value_enum, default_value = "springs")]
    scenario: ScenarioArg,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScenarioArg {
    /// Two water springs on high ground
    Springs,
    /// A lava vent beside a water spring
    Volcano,
    /// Scripted pickup/deposit brush strokes, no sources
    Sculpt,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            ron::from_str::<EngineConfig>(&text).context("parsing engine config")?
        }
        None => EngineConfig::default(),
    };
    config.default_resolution = args.resolution;

    let mut engine = Engine::new(config)?;
    engine.generate_terrain(&TerrainGenerator::new(args.seed));

    let history = SharedPerfHistory::new(240);
    engine.add_perf_sink(Box::new(history.clone()));

    let mut scenario: Scenario = match args.scenario {
        ScenarioArg::Springs => Scenario::springs(&mut engine),
        ScenarioArg::Volcano => Scenario::volcano(&mut engine),
        ScenarioArg::Sculpt => Scenario::sculpt(&engine),
    };

    log::info!(
        "running {ticks} ticks at {res}x{res}",
        ticks = args.ticks,
        res = args.resolution
    );

    let tick_dt = engine.config().tick_dt;
    for tick in 0..args.ticks {
        scenario.drive(&mut engine, tick);
        engine.update(tick_dt);
    }

    report(&mut engine, &history, args.ticks);
    Ok(())
}

fn report(engine: &mut Engine, history: &SharedPerfHistory, ticks: u64) {
    let grid = engine.grid();
    println!("-- terraflow-sandbox report --");
    println!("ticks:          {ticks}");
    println!("grid:           {res}x{res}", res = grid.resolution());
    println!("water total:    {:.3}", grid.total_water());
    println!("lava total:     {:.3}", grid.total_lava());
    println!("soil total:     {:.3}", grid.total_soil());
    println!("sediment total: {:.3}", grid.total_sediment());
    println!("hand carried:   {:.3}", engine.hand().carried());
    println!("mean tick cpu:  {:.3} ms", history.mean_cpu_ms());
    if let Some(sample) = history.latest() {
        println!(
            "grid memory:    {:.1} MiB",
            sample.grid_bytes as f64 / (1024.0 * 1024.0)
        );
    }
    let rejections = engine.take_rejections();
    if !rejections.is_empty() {
        println!("brush ops rejected: {}", rejections.len());
    }
}
