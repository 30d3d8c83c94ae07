#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a Delve dungeon from a line script.
//!
//! Commands are read from stdin one per line; after each one the current
//! projection is printed to stdout as a single JSON line. Rejected commands
//! print an error object instead and the session carries on. Logs go to
//! stderr.

mod script;

use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use delve_core::{Config, DungeonLayout};
use delve_world::{self as world, persistence::SaveStore, query, World};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use script::Request;

/// Plays a Delve dungeon from commands read on stdin.
#[derive(Debug, Parser)]
#[command(name = "delve", version)]
struct Args {
    /// Dungeon layout file (JSON).
    #[arg(long)]
    dungeon: PathBuf,
    /// Tuning file (JSON); missing keys fall back to defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed for every random decision in the dungeon.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Directory holding named saves.
    #[arg(long, default_value = "saves")]
    saves: PathBuf,
}

/// Entry point for the Delve command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let layout: DungeonLayout = read_json(&args.dungeon)?;
    let config: Config = match &args.config {
        Some(path) => read_json(path)?,
        None => Config::default(),
    };
    let mut world = World::new(&layout, config, args.seed)
        .with_context(|| format!("failed to create dungeon from {}", args.dungeon.display()))?;
    let store = SaveStore::new(&args.saves);
    info!(dungeon = %args.dungeon.display(), seed = args.seed, "session started");

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    print_view(&mut stdout, &world)?;

    for line in stdin.lock().lines() {
        let line = line.context("failed to read command")?;
        let request = match script::parse_line(&line) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(error) => {
                warn!(%error, line = %line, "command not understood");
                print_error(&mut stdout, &error.to_string())?;
                continue;
            }
        };

        match execute(&mut world, &store, request) {
            Ok(()) => print_view(&mut stdout, &world)?,
            Err(error) => {
                warn!(error = %format!("{error:#}"), "command rejected");
                print_error(&mut stdout, &format!("{error:#}"))?;
            }
        }
    }

    info!(tick = query::tick(&world), "session finished");
    Ok(())
}

fn execute(world: &mut World, store: &SaveStore, request: Request) -> Result<()> {
    match request {
        Request::Apply(command) => {
            let mut events = Vec::new();
            world::apply(world, command, &mut events)?;
            for event in &events {
                debug!(?event, "event");
            }
        }
        Request::Save(name) => {
            let path = store.save(&name, world)?;
            info!(name = %name, path = %path.display(), "saved");
        }
        Request::Load(name) => *world = store.load(&name)?,
        Request::View => {}
    }
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_view(out: &mut impl Write, world: &World) -> Result<()> {
    serde_json::to_writer(&mut *out, &query::view(world)).context("failed to encode view")?;
    writeln!(out).context("failed to write view")?;
    out.flush().context("failed to flush stdout")
}

fn print_error(out: &mut impl Write, message: &str) -> Result<()> {
    serde_json::to_writer(&mut *out, &serde_json::json!({ "error": message }))
        .context("failed to encode error")?;
    writeln!(out).context("failed to write error")?;
    out.flush().context("failed to flush stdout")
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}
