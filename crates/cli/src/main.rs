//! CHRONOS CLI - record and inspect cognitive telemetry.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use chronos_core::{format_stamp, format_timestamp, SessionId, StampFields};
use chronos_storage::JsonStorage;
use chronos_sync::client::{DEFAULT_MAX_BATCH_BYTES, DEFAULT_SERVER_URL};
use chronos_sync::SyncClient;
use chronos_tracker::config::DEFAULT_AGENT;
use chronos_tracker::{EventLog, QueryFilter, SequenceStore, SessionStore, TrackerConfig};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chronos")]
#[command(about = "Cognitive state tracking with CHRONOS stamps", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Working directory to track
    #[arg(short, long, default_value = ".", global = true)]
    dir: PathBuf,

    /// Agent name
    #[arg(short, long, default_value = DEFAULT_AGENT, env = "CHRONOS_AGENT", global = true)]
    agent: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize tracking in the working directory
    Init,
    /// Record a cognitive state
    Record {
        /// Cognitive state
        #[arg(default_value = "Unknown")]
        state: String,
        /// Action type
        #[arg(default_value = "event")]
        action: String,
        /// Description
        description: Vec<String>,
    },
    /// Print the latest recorded stamp
    Latest,
    /// List recent stamps
    List {
        /// How many to show
        #[arg(default_value = "10")]
        limit: usize,
        /// Case-insensitive state substring
        #[arg(long)]
        state: Option<String>,
        /// Exact action
        #[arg(long)]
        action: Option<String>,
    },
    /// Show statistics
    Stats,
    /// Export to CSV
    Export {
        /// Output file
        #[arg(default_value = "cognitive-states.csv")]
        file: PathBuf,
    },
    /// Render a stamp without recording it
    Stamp {
        /// Cognitive state
        #[arg(long, default_value = "Unknown")]
        state: String,
        /// Action type
        #[arg(long, default_value = "event")]
        action: String,
        /// Description
        #[arg(long, default_value = "")]
        description: String,
        /// Tick to use instead of advancing the counter
        #[arg(long)]
        tick: Option<u64>,
        /// Session to use instead of the working directory's
        #[arg(long)]
        session: Option<String>,
        /// Print JSON instead of the bare stamp
        #[arg(long)]
        json: bool,
    },
    /// Push recorded states to an aggregator
    Sync {
        /// Aggregator URL
        #[arg(long, default_value = DEFAULT_SERVER_URL, env = "CHRONOS_SERVER")]
        server: String,
        /// Largest request body sent per batch
        #[arg(long, default_value_t = DEFAULT_MAX_BATCH_BYTES)]
        batch_bytes: usize,
    },
}

fn init_logging() {
    // stdout carries command output; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_dir(dir: &Path) -> Result<PathBuf> {
    let absolute = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()?.join(dir)
    };
    Ok(std::fs::canonicalize(&absolute).unwrap_or(absolute))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = TrackerConfig::new(resolve_dir(&cli.dir)?).with_agent(cli.agent);
    let mut log = EventLog::open(config.clone());

    match cli.command {
        Commands::Init => {
            let outcome = log.init().await?;
            print_json(&json!({ "success": true, "sessionId": outcome.session_id }))?;
        }
        Commands::Record { state, action, description } => {
            let recorded = log.record(&state, &action, &description.join(" ")).await?;
            print_json(&json!({
                "success": true,
                "duplicate": recorded.duplicate,
                "record": recorded.record,
            }))?;
        }
        Commands::Latest => match log.latest().await? {
            Some(record) => println!("{}", record.stamp),
            None => println!("No states recorded"),
        },
        Commands::List { limit, state, action } => {
            let filter = QueryFilter {
                state,
                action,
                limit: Some(limit),
            };
            for record in log.query(&filter).await? {
                println!("{}", record.stamp);
            }
        }
        Commands::Stats => {
            print_json(&log.stats().await?)?;
        }
        Commands::Export { file } => {
            let outcome = log.export_csv(&file).await?;
            print_json(&json!({
                "success": true,
                "file": outcome.file,
                "count": outcome.count,
            }))?;
        }
        Commands::Stamp { state, action, description, tick, session, json } => {
            let storage = Arc::new(JsonStorage::new(config.state_dir()));
            let session_id = match session {
                Some(id) => SessionId::from(id),
                None => SessionStore::new(storage.clone(), config.agent_name.clone())
                    .get_or_create()
                    .await,
            };
            let sequence = match tick {
                Some(tick) => tick,
                None => SequenceStore::new(storage).next().await,
            };
            let working_context = config.working_context();
            let fields = StampFields {
                agent_name: &config.agent_name,
                state: &state,
                sequence,
                session_id: &session_id,
                working_context: &working_context,
                action: &action,
                description: &description,
                timestamp: chrono::Utc::now(),
            };
            let stamp = format_stamp(&fields);
            if json {
                print_json(&json!({
                    "stamp": stamp,
                    "tick": sequence,
                    "timestamp": format_timestamp(&fields.timestamp),
                    "agent": config.agent_name,
                    "state": state,
                    "session": session_id,
                    "workingContext": working_context,
                    "action": action,
                    "description": description,
                }))?;
            } else {
                println!("{}", stamp);
            }
        }
        Commands::Sync { server, batch_bytes } => {
            let session_id = log.init().await?.session_id;
            let records = log.records().await?;
            let client = SyncClient::new(server).with_max_batch_bytes(batch_bytes);
            let outcome = client
                .push(&session_id, &config.agent_name, records)
                .await
                .with_context(|| format!("sync to {} failed", client.base_url()))?;
            info!(server = %client.base_url(), added = outcome.added, "synced");
            print_json(&json!({
                "success": true,
                "server": client.base_url(),
                "receivedCount": outcome.received,
                "addedCount": outcome.added,
                "duplicateCount": outcome.duplicates,
            }))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_joins_description_words() {
        let cli = Cli::try_parse_from([
            "chronos", "record", "Thinking", "tool-completion", "Read", "file:", "main.js",
        ])
        .unwrap();
        match cli.command {
            Commands::Record { state, action, description } => {
                assert_eq!(state, "Thinking");
                assert_eq!(action, "tool-completion");
                assert_eq!(description.join(" "), "Read file: main.js");
            }
            _ => panic!("Wrong command"),
        }
    }

    #[test]
    fn test_list_defaults() {
        let cli = Cli::try_parse_from(["chronos", "list", "--state", "think"]).unwrap();
        match cli.command {
            Commands::List { limit, state, action } => {
                assert_eq!(limit, 10);
                assert_eq!(state.as_deref(), Some("think"));
                assert!(action.is_none());
            }
            _ => panic!("Wrong command"),
        }
    }

    #[test]
    fn test_global_dir_flag() {
        let cli = Cli::try_parse_from(["chronos", "stats", "--dir", "/tmp/work"]).unwrap();
        assert_eq!(cli.dir, PathBuf::from("/tmp/work"));
        assert!(matches!(cli.command, Commands::Stats));
    }

    #[test]
    fn test_sync_batch_bytes() {
        let cli = Cli::try_parse_from(["chronos", "sync", "--batch-bytes", "65536"]).unwrap();
        match cli.command {
            Commands::Sync { batch_bytes, .. } => assert_eq!(batch_bytes, 65536),
            _ => panic!("Wrong command"),
        }
    }

    #[test]
    fn test_resolve_dir_is_absolute() {
        assert!(resolve_dir(Path::new(".")).unwrap().is_absolute());
    }
}
