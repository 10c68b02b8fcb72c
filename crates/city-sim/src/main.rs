//! City consciousness simulation runner.
//!
//! Wakes a city (or resumes a saved one), weaves any requested threads, and
//! runs it until the tick limit or Ctrl-C.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use city_model::{City, ThreadCategory};
use city_sim::{
    default_config_toml, CityStore, ContentLibrary, JsonDirStore, MemoryStore, RunOutcome,
    SimConfig, SimError, SimulationEngine,
};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "city_sim")]
#[command(about = "Runs a city that slowly becomes aware of itself")]
struct Args {
    /// Random seed for reproducibility (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum number of ticks to run (overrides the config file)
    #[arg(long)]
    ticks: Option<u32>,

    /// Delay between ticks in milliseconds (overrides the config file)
    #[arg(long)]
    tick_delay_ms: Option<u64>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extra content directory merged over the built-in content
    #[arg(long)]
    content_dir: Option<PathBuf>,

    /// Directory for JSON saves; saves stay in memory without it
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Resume the saved city with this id
    #[arg(long)]
    resume: Option<String>,

    /// Name for a new city
    #[arg(long, default_value = "Nameless City")]
    name: String,

    /// Thread categories to weave before the run starts
    #[arg(long, num_args = 1..)]
    weave: Vec<ThreadCategory>,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", default_config_toml());
        return ExitCode::SUCCESS;
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), SimError> {
    let mut config = match &args.config {
        Some(path) => SimConfig::from_file(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    if let Some(ticks) = args.ticks {
        config.simulation.max_ticks = ticks;
    }
    if let Some(delay) = args.tick_delay_ms {
        config.simulation.tick_delay_ms = delay;
    }

    let mut content = ContentLibrary::builtin()?;
    if let Some(dir) = &args.content_dir {
        content.merge_dir(dir)?;
        content.validate()?;
    }
    info!(
        "Loaded {} moments, {} dialogue fragments, {} emergence rules, {} story beats",
        content.moments.moments.len(),
        content.dialogue.len(),
        content.rules.len(),
        content.beats.len()
    );

    let store: Box<dyn CityStore + Send> = match &args.save_dir {
        Some(dir) => Box::new(JsonDirStore::open(dir)?),
        None => Box::new(MemoryStore::new()),
    };
    let mut engine = SimulationEngine::new(config, content).with_store(store);

    let mut city = match &args.resume {
        Some(id) => match engine.load_city(id)? {
            Some(city) => {
                info!("Resuming {} ({})", city.name, city.id);
                city
            }
            None => {
                warn!("No saved city {}; waking a new one", id);
                City::new(args.name.clone(), Utc::now()).with_id(id.clone())
            }
        },
        None => City::new(args.name.clone(), Utc::now()),
    };

    for category in &args.weave {
        engine.weave_thread(&mut city, *category);
    }

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted; finishing the current tick");
            let _ = cancel_tx.send(true);
        }
    });

    let outcome = engine.run(&mut city, cancel_rx).await;
    match &outcome {
        RunOutcome::Completed { ticks, .. } => println!("Ran {} ticks.", ticks),
        RunOutcome::Cancelled { ticks, .. } => println!("Stopped after {} ticks.", ticks),
        RunOutcome::AlreadyRunning => println!("{} is already running.", city.name),
    }
    if let Some(conclusion) = outcome.conclusion() {
        println!();
        println!("{}", conclusion);
    }

    let snapshot = engine.snapshot(&city);
    println!();
    println!("City:        {} ({})", snapshot.name, snapshot.city_id);
    println!("Mood:        {}", snapshot.mood);
    println!("Threads:     {}", snapshot.thread_count);
    println!("Emergences:  {}", snapshot.emergent_properties.len());
    println!("Unanswered:  {}", snapshot.unanswered_requests);
    let beats = engine.beats_for(&city);
    let occurred = beats.iter().filter(|b| b.has_occurred).count();
    println!("Story beats: {}/{}", occurred, beats.len());

    if let Some(line) = engine.farewell() {
        println!();
        println!("{}", line);
    }
    Ok(())
}
