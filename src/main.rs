use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rolo::api::ApiServer;
use rolo::db::{self, UserRepo};
use rolo::Config;

/// Rolo - Contacts API with JWT authentication and birthday reminders
#[derive(Parser)]
#[command(name = "rolo", version, about)]
struct Cli {
    /// Port to listen on (overrides config)
    #[arg(long, env = "ROLO_PORT")]
    port: Option<u16>,

    /// Data directory for the database and avatars (overrides config)
    #[arg(long, env = "ROLO_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Mark a user's email as verified directly in the database
    ///
    /// Operator escape hatch for deployments without SMTP configured.
    VerifyUser {
        /// Email address of the account
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,rolo=info",
        1 => "info,rolo=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.data_dir)?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    std::fs::create_dir_all(&config.data_dir)?;

    // Handle subcommands
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::VerifyUser { email } => verify_user(&config, &email),
        };
    }

    tracing::info!(
        port = config.server.port,
        database = %config.database_path.display(),
        "starting rolo"
    );

    let pool = db::init(&config.database_path)?;

    let server = ApiServer::new(&config, pool)?;
    server.run().await?;

    Ok(())
}

/// Mark a user's email as verified
fn verify_user(config: &Config, email: &str) -> anyhow::Result<()> {
    let pool = db::init(&config.database_path)?;
    let user_repo = UserRepo::new(pool);

    if user_repo.mark_verified(email)? {
        println!("Marked {email} as verified");
    } else {
        anyhow::bail!("no account found for {email}");
    }

    Ok(())
}
