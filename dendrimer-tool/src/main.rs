mod config;
mod error;
mod replay;
mod store;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dendrimer_core::{SnapshotKey, save_trie};
use dendrimer_state::Session;
use tracing_subscriber::EnvFilter;

use crate::config::{load_config, resolve_store_path};
use crate::replay::{format_branch, format_path, parse_token, read_events, replay};
use crate::store::{load_existing, open_store, restore_trie};

#[derive(Parser)]
#[command(name = "dmr")]
#[command(about = "Replay and inspect branching conversation histories", long_about = None)]
struct Cli {
    /// Path to the snapshot store
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a JSON-lines event log and save the resulting trie
    Replay {
        /// Event log, one event per line
        events: PathBuf,

        /// Start from a stored trie (snapshot key)
        #[arg(long)]
        from: Option<String>,
    },
    /// Print every committed conversation in a stored trie
    Show {
        /// Snapshot key
        key: String,
    },
    /// Print the continuations recorded after a prefix
    Branches {
        /// Snapshot key
        key: String,

        /// Prefix tokens as source:text
        prefix: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env("DMR_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config()?;
    let store = open_store(resolve_store_path(cli.store, &config))?;

    match cli.command {
        Command::Replay { events, from } => {
            let mut session = match from {
                Some(key) => Session::with_trie(restore_trie(&store, &key.parse::<SnapshotKey>()?)?),
                None => Session::new(),
            };
            let events = read_events(BufReader::new(File::open(&events)?))?;
            replay(&mut session, events)?;

            let state = session.state();
            let key = save_trie(&store, state.trie())?;
            for (source, text) in state.transcript() {
                println!("{source}: {text}");
            }
            if state.is_generating() {
                println!("(generation pending, not committed)");
            }
            println!(
                "{} paths, {} nodes",
                state.trie().root_count(),
                state.trie().node_count()
            );
            println!("{key}");
        }
        Command::Show { key } => {
            let trie = load_existing(&store, &key.parse()?)?;
            for (n, path) in trie.paths().iter().enumerate() {
                let count = trie.node(path).map_or(0, |node| node.occurrence_count());
                println!("#{} (x{count})", n + 1);
                println!("{}", format_path(path));
            }
        }
        Command::Branches { key, prefix } => {
            let trie = load_existing(&store, &key.parse()?)?;
            let prefix = prefix
                .iter()
                .map(|arg| parse_token(arg))
                .collect::<Result<Vec<_>, _>>()?;
            let branches = trie.branch_lookup(&prefix);
            if branches.is_empty() {
                println!("no continuations recorded");
            }
            for branch in &branches {
                println!("{}", format_branch(branch));
            }
        }
    }

    Ok(())
}
