use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use odoodash::crypto::SecretCipher;
use odoodash::database::{establish_connection, get_database_url, setup_database};
use odoodash::server::{self, MigrateDirection};
use odoodash::services::ExtractionService;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(short, long, global = true, default_value = "odoodash.db")]
    database: String,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (admin API, trigger endpoint, dashboard reads)
    Serve {
        #[clap(short, long, default_value = "3000")]
        port: u16,
        #[clap(long)]
        cors_origin: Option<String>,
    },
    /// Run one extraction pass over all configured clients and exit
    Fetch,
    /// Run database migrations
    Migrate {
        #[clap(subcommand)]
        direction: MigrateDirection,
    },
    /// Print a fresh base64 encryption key for ODOODASH_SECRET_KEY
    Keygen,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    match args.command {
        Command::Serve { port, cors_origin } => {
            let cipher = cipher_from_env()?;
            let scheduler_token = std::env::var("ODOODASH_SCHEDULER_TOKEN").ok();
            info!("Starting server on port {}", port);
            server::start_server(
                port,
                &args.database,
                cors_origin.as_deref(),
                cipher,
                scheduler_token,
            )
            .await?;
        }
        Command::Fetch => {
            let cipher = cipher_from_env()?;
            let database_url = get_database_url(Some(&args.database));
            let db = establish_connection(&database_url).await?;
            setup_database(&db).await?;

            let report = ExtractionService::new(db, cipher).run().await?;
            info!(
                processed = report.clients_processed,
                failed = report.clients_failed,
                rows = report.rows_written,
                "extraction finished"
            );
        }
        Command::Migrate { direction } => {
            server::migrate_database(&args.database, direction).await?;
        }
        Command::Keygen => {
            println!("{}", SecretCipher::generate_key());
        }
    }

    Ok(())
}

fn cipher_from_env() -> Result<SecretCipher> {
    let key = std::env::var("ODOODASH_SECRET_KEY")
        .context("ODOODASH_SECRET_KEY is not set; generate one with `odoodash keygen`")?;
    SecretCipher::from_key(&key).context("invalid ODOODASH_SECRET_KEY")
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("sqlx=warn,{}", log_level)))
        .init();
}
