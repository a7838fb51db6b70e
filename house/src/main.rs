//! House oracle for single-player blackjack.
//!
//! Usage:
//!   blackjack-house --config house.yaml deal --game <GAME_ID> [--creation-digest <DIGEST>]
//!   blackjack-house --config house.yaml hit --game <GAME_ID>
//!   blackjack-house --config house.yaml stand --game <GAME_ID>
//!   blackjack-house --config house.yaml public-key

use anyhow::{Context, Result};
use blackjack_house::{
    ledger::RpcLedger, oracle::HouseOracle, submitter::Outcome, Config, ValidatedConfig,
};
use blackjack_house_client::{Client, SponsorClient};
use blackjack_house_types::{Move, ObjectId};
use clap::{Parser, Subcommand};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Signs and submits the house's moves in blackjack games")]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deal the opening hand of a newly created game.
    Deal {
        #[arg(short, long)]
        game: ObjectId,
        /// Digest of the transaction that created the game; waited for before dealing.
        #[arg(long)]
        creation_digest: Option<String>,
    },
    /// Answer a player's hit request.
    Hit {
        #[arg(short, long)]
        game: ObjectId,
    },
    /// Answer a player's stand request.
    Stand {
        #[arg(short, long)]
        game: ObjectId,
    },
    /// Print the house's BLS public key (hex) for the house data object.
    PublicKey,
}

fn load_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read config file {}", path.display()))?;
    Config::from_yaml(&contents).context("Could not parse config file")
}

fn build_oracle(config: &ValidatedConfig) -> Result<HouseOracle<RpcLedger, SponsorClient>> {
    let client = Client::with_timeout(&config.rpc_url, config.request_timeout)
        .context("Failed to create ledger client")?
        .with_retry_policy(config.retry_policy.clone());
    let ledger = RpcLedger::new(
        client,
        config.owned_objects_page_size,
        config.transaction_wait_timeout,
        config.transaction_poll_interval,
    );
    let sponsor = config
        .sponsor_url
        .as_deref()
        .map(|url| SponsorClient::new(url, config.request_timeout))
        .transpose()
        .context("Failed to create sponsor client")?;
    if sponsor.is_none() {
        info!("no sponsor configured, house pays gas for every move");
    }
    Ok(HouseOracle::new(ledger, sponsor, config.oracle_config()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args.config)?;
    let log_level = tracing::Level::from_str(&config.log_level).unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt().with_max_level(log_level).init();
    info!(config = ?config.redacted_debug(), "loaded config file");
    let config = config.validate().context("Invalid config")?;

    let oracle = build_oracle(&config)?;
    info!(
        house = %oracle.house_address(),
        package = %config.contract.package,
        module = %config.contract.module,
        "house oracle ready"
    );

    let result = match args.command {
        Command::Deal {
            game,
            creation_digest,
        } => oracle.deal(&game, creation_digest.as_deref()).await,
        Command::Hit { game } => oracle.play(&game, Move::Hit).await,
        Command::Stand { game } => oracle.play(&game, Move::Stand).await,
        Command::PublicKey => {
            println!("{}", oracle.public_key_hex());
            return Ok(());
        }
    };

    let outcome: Outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(error = %err, "house move failed");
            return Err(err.into());
        }
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&outcome).context("Could not encode outcome")?
    );
    Ok(())
}
