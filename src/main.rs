use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser, Subcommand};
use lore_galaxy::{AnalysisBatch, ClusterForce, EngineConfig, FetchOutcome, GraphSnapshot, Session};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Engine settings in TOML.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for system anchor placement.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Graph snapshot loaded before the command and rewritten after a change.
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Leave the snapshot file untouched.
    #[arg(long, global = true)]
    dry_run: bool,

    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Merge analysis batch files into the graph.
    Merge {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Layout ticks to run after merging.
        #[arg(long, default_value_t = 0)]
        ticks: usize,
    },
    /// Remove a system and every node that only belonged to it.
    Prune { system: String },
    /// Drop the whole graph and all systems.
    Purge,
    /// Run the force layout until it cools.
    Layout {
        #[arg(long, default_value_t = 300)]
        ticks: usize,
    },
    /// Print the shell around each system.
    Shells,
    /// Print registered systems with their member counts.
    Systems,
    /// Fuzzy search over node ids.
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print one node with its links and layout state.
    Inspect { id: String },
    /// Print graph totals.
    Stats,
}

#[derive(Default)]
struct Effect {
    mutated: bool,
    failed_fetches: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.registry.seed = Some(seed);
    }

    let mut session = Session::new(config);
    if let Some(path) = &args.snapshot
        && path.exists()
    {
        let snapshot = GraphSnapshot::read_from(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?;
        session.replace(snapshot);
    }

    let effect = run_command(&mut session, args.command)?;

    if effect.mutated
        && !args.dry_run
        && let Some(path) = &args.snapshot
    {
        session
            .snapshot()
            .write_to(path)
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;
        info!(path = %path.display(), "saved snapshot");
    }

    if effect.failed_fetches > 0 {
        return Err(anyhow!(
            "{} batch file(s) could not be merged",
            effect.failed_fetches
        ));
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_command(session: &mut Session, command: Command) -> Result<Effect> {
    let mut effect = Effect::default();

    match command {
        Command::Merge { files, ticks } => {
            for path in files {
                session.spawn_fetch(move || AnalysisBatch::read_from(&path));
            }

            let mut reports = Vec::new();
            for outcome in session.wait_for_fetches(FETCH_TIMEOUT) {
                match outcome {
                    FetchOutcome::Merged { report, .. } => {
                        effect.mutated |= report.changed();
                        reports.push(json!({ "ok": true, "report": report }));
                    }
                    FetchOutcome::Failed { error, .. } => {
                        effect.failed_fetches += 1;
                        reports.push(json!({ "ok": false, "error": error.to_string() }));
                    }
                }
            }
            effect.failed_fetches += session.pending_fetches();

            if ticks > 0 {
                let ran = session.run(ticks);
                info!(ticks = ran, alpha = session.simulation().alpha(), "ran layout");
                effect.mutated = true;
            }
            print_json(&reports)?;
        }
        Command::Prune { system } => {
            if !session.registry().contains(&system) {
                warn!(%system, "system is not registered");
            }
            let report = session.prune_system(&system);
            effect.mutated = true;
            print_json(&report)?;
        }
        Command::Purge => {
            session.purge();
            effect.mutated = true;
            print_json(&json!({ "purged": true }))?;
        }
        Command::Layout { ticks } => {
            session.simulation_mut().reheat();
            let ran = session.run(ticks);
            effect.mutated = true;
            print_json(&json!({
                "ticks": ran,
                "alpha": session.simulation().alpha(),
                "settled": !session.simulation().is_hot(),
            }))?;
        }
        Command::Shells => print_json(&session.shells())?,
        Command::Systems => {
            let systems = session
                .registry()
                .iter()
                .map(|record| {
                    json!({
                        "name": record.name,
                        "color": record.color,
                        "center": record.center,
                        "members": session.store().members_of(&record.name).count(),
                    })
                })
                .collect::<Vec<_>>();
            print_json(&systems)?;
        }
        Command::Search { query, limit } => print_json(&session.search(&query, limit))?,
        Command::Inspect { id } => {
            let node = session
                .store()
                .node(&id)
                .ok_or_else(|| anyhow!("no node with id {id:?}"))?;
            let links = session.store().neighbors(&id).collect::<Vec<_>>();
            let body = session.simulation().body(&id);
            print_json(&json!({
                "node": node,
                "links": links,
                "centroid": ClusterForce::centroid(node, session.registry()),
                "position": body.map(|body| body.position),
                "velocity": body.map(|body| body.velocity),
            }))?;
        }
        Command::Stats => {
            let store = session.store();
            let shared = store
                .nodes()
                .iter()
                .filter(|node| node.systems.len() > 1)
                .count();
            let dangling = store
                .edges()
                .iter()
                .filter(|edge| !store.contains_node(&edge.source) || !store.contains_node(&edge.target))
                .count();
            print_json(&json!({
                "nodes": store.node_count(),
                "links": store.edge_count(),
                "systems": session.registry().len(),
                "shared_nodes": shared,
                "dangling_links": dangling,
                "alpha": session.simulation().alpha(),
            }))?;
        }
    }

    Ok(effect)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}
