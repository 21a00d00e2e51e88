mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rps")]
#[command(about = "Commit-reveal Rock-Paper-Scissors against the Somnia game hub")]
#[command(version)]
struct Cli {
    /// Data directory for game storage
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage local player accounts
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Create a new game, staking the entry fee
    Create {
        /// Account name to play as
        account: String,
        /// Entry fee in STT, e.g. 0.01
        fee: String,
    },
    /// Join an existing game with the same entry fee
    Join {
        /// Account name to play as
        account: String,
        /// Session id to join
        session: u64,
        /// Entry fee in STT, must match the creator's
        fee: String,
    },
    /// Commit a move (the move itself never goes on chain)
    Commit {
        /// Account name to play as
        account: String,
        /// Session id
        session: u64,
        /// rock, paper or scissors
        #[arg(value_name = "MOVE")]
        mv: String,
    },
    /// Reveal the committed move
    Reveal {
        /// Account name to play as
        account: String,
        /// Session id
        session: u64,
    },
    /// Force resolution once the reveal deadline has passed
    ForceResolve {
        /// Account name to play as
        account: String,
        /// Session id
        session: u64,
    },
    /// Claim any pull-payment balance the hub holds for the account
    Withdraw {
        /// Account name
        account: String,
    },
    /// Show a game's status
    Status {
        /// Session id
        session: u64,
    },
    /// List all games
    List,
    /// Show an account's balances
    Balance {
        /// Account name
        account: String,
    },
    /// Delete all local game data
    Reset,
    /// Play a complete two-player game in-process
    Demo,
}

#[derive(Subcommand)]
enum AccountAction {
    /// Generate a new account, funded from the local faucet
    New {
        /// Account name
        name: String,
    },
    /// List accounts and balances
    List,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "rps={},somnia_rps={}",
            log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Get data directory
    let data_dir = cli.data_dir.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("somnia-rps")
    });

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir).await?;

    // Execute command
    let result = match cli.command {
        Commands::Account { action } => match action {
            AccountAction::New { name } => commands::account_new(&data_dir, &name).await,
            AccountAction::List => commands::account_list(&data_dir).await,
        },
        Commands::Create { account, fee } => commands::create_game(&data_dir, &account, &fee).await,
        Commands::Join {
            account,
            session,
            fee,
        } => commands::join_game(&data_dir, &account, session, &fee).await,
        Commands::Commit {
            account,
            session,
            mv,
        } => commands::commit_move(&data_dir, &account, session, &mv).await,
        Commands::Reveal { account, session } => {
            commands::reveal_move(&data_dir, &account, session).await
        }
        Commands::ForceResolve { account, session } => {
            commands::force_resolve(&data_dir, &account, session).await
        }
        Commands::Withdraw { account } => commands::withdraw(&data_dir, &account).await,
        Commands::Status { session } => commands::show_status(&data_dir, session).await,
        Commands::List => commands::list_games(&data_dir).await,
        Commands::Balance { account } => commands::show_balance(&data_dir, &account).await,
        Commands::Reset => commands::reset(&data_dir).await,
        Commands::Demo => commands::demo().await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
