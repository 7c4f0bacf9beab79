//! Player database inspection binary
//!
//! Read-only dump of one player record or a leaderboard, for operators.

use clap::{Parser, Subcommand};
use minestars::{
    config::StorageConfig,
    leaderboard::LeaderboardMetric,
    player::PlayerId,
    player_store::{PlayerStore, RocksPlayerStore},
};

#[derive(Parser, Debug)]
#[command(name = "inspect_players")]
#[command(about = "Inspect a minestars player database", long_about = None)]
struct Args {
    /// Database directory
    #[arg(long, default_value = "./DB/minestars_data")]
    db_path: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the stored record of one player
    Player { id: PlayerId },
    /// Print a ranked board
    Leaderboard {
        /// `rubies` or `mining`
        #[arg(long, default_value = "rubies")]
        metric: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print a stored payment receipt
    Payment { payment_ref: String },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let store = RocksPlayerStore::open(&StorageConfig {
        data_directory: args.db_path.clone(),
        clear_on_start: false,
        ..Default::default()
    })?;

    match args.command {
        Command::Player { id } => match store.load(id)? {
            Some(player) => println!("{}", serde_json::to_string_pretty(&player)?),
            None => println!("Player {} not found in {}", id, args.db_path),
        },
        Command::Leaderboard { metric, limit } => {
            let metric: LeaderboardMetric = metric.parse()?;
            println!("{:>4}  {:>20}  {:>12}  name", "rank", "player", metric.to_string());
            for entry in store.top(metric, limit)? {
                let name = entry.profile.username.as_deref().unwrap_or("-");
                println!("{:>4}  {:>20}  {:>12}  {}", entry.rank, entry.player_id, entry.value, name);
            }
        }
        Command::Payment { payment_ref } => match store.payment_receipt(&payment_ref)? {
            Some(receipt) => println!("{}", serde_json::to_string_pretty(&receipt)?),
            None => println!("No receipt for {}", payment_ref),
        },
    }

    Ok(())
}
