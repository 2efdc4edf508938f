use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rank_center::{RankCenter, RankedEntry};
use rank_shard::ShardEngine;
use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// RankDB command-line tool: loads score events into local shards and
/// answers leaderboard queries against the merged board.
#[derive(Parser)]
#[command(name = "rankctl", author, version, about = "RankDB CLI Tool", long_about = None)]
struct Cli {
    /// JSON file holding an array of score events
    /// ({"player_id", "score", "timestamp"}).
    #[arg(long = "events")]
    events: PathBuf,

    /// Number of shards to partition players across.
    #[arg(long, default_value_t = 2)]
    shards: u64,

    /// Rank capacity per shard (shard i serves ranks
    /// i*capacity+1 ..= (i+1)*capacity).
    #[arg(long, default_value_t = 10_000)]
    capacity: u64,

    /// Enable JSON file logging into this directory.
    #[arg(long = "log-dir")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the top N entries of the merged board.
    Top {
        #[arg(default_value_t = 10)]
        n: i64,
    },

    /// Print the entries ranked around a player (n before, n after).
    Around {
        player: String,
        #[arg(default_value_t = 2)]
        n: i64,
    },

    /// Print a player's entry and owning shard.
    Player { player: String },

    /// Print the first shard holding an exact score.
    Score { score: i64 },

    /// Print the registered shard ranges.
    Shards,
}

/// One score event from the input file.
#[derive(Debug, Deserialize)]
struct ScoreEvent {
    player_id: String,
    score: i64,
    timestamp: i64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(dir) = &cli.log_dir {
        rank_log::init(&dir.to_string_lossy(), tracing::Level::DEBUG)?;
    }

    let content = fs::read_to_string(&cli.events)
        .with_context(|| format!("reading events from {}", cli.events.display()))?;
    let events: Vec<ScoreEvent> = serde_json::from_str(&content).context("parsing events")?;

    let center = load_board(&events, cli.shards, cli.capacity)?;

    match cli.command {
        Commands::Top { n } => {
            for entry in center.get_top_n(n) {
                print_entry(&entry);
            }
        }

        Commands::Around { player, n } => {
            for entry in center.get_rank_around(&player, n) {
                print_entry(&entry);
            }
        }

        Commands::Player { player } => match center.get_player_entry(&player) {
            Some(entry) => {
                print_entry(entry);
                // 0 is the historical "no shard" sentinel.
                let shard = center.get_shard_id_for_player(&player).unwrap_or(0);
                println!("shard={}", shard);
            }
            None => println!("player {} not found", player),
        },

        Commands::Score { score } => {
            println!("shard={}", center.get_shard_id_for_score(score).unwrap_or(0));
        }

        Commands::Shards => {
            for shard_id in 0..cli.shards {
                if let Some(range) = center.get_range(shard_id) {
                    println!(
                        "shard={} min_rank={} max_rank={}",
                        range.shard_id, range.min_rank, range.max_rank
                    );
                }
            }
        }
    }

    Ok(())
}

/// Partition events across shard engines by player-id hash, recompute each
/// engine, and publish every shard into a fresh coordinator.
fn load_board(events: &[ScoreEvent], shards: u64, capacity: u64) -> Result<RankCenter> {
    anyhow::ensure!(shards > 0, "--shards must be positive");
    anyhow::ensure!(capacity > 0, "--capacity must be positive");

    let mut center = RankCenter::new();
    let mut engines: Vec<ShardEngine> = (0..shards).map(|_| ShardEngine::new()).collect();

    for event in events {
        let shard = shard_for_player(&event.player_id, shards);
        engines[shard as usize].upsert(&*event.player_id, event.score, event.timestamp);
    }

    for (shard_id, engine) in engines.iter_mut().enumerate() {
        let shard_id = shard_id as u64;
        let min_rank = shard_id * capacity + 1;
        center
            .set_range(shard_id, min_rank, min_rank + capacity - 1)
            .context("registering shard range")?;
        engine.recompute();
        rank_sync::publish(engine, shard_id, &mut center).context("publishing shard")?;
    }

    Ok(center)
}

fn shard_for_player(player_id: &str, shards: u64) -> u64 {
    let mut h = DefaultHasher::new();
    player_id.hash(&mut h);
    h.finish() % shards
}

fn print_entry(entry: &RankedEntry) {
    println!(
        "rank={} player={} score={} timestamp={}",
        entry.rank, entry.player_id, entry.score, entry.timestamp
    );
}
