use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{parse_unused_key_policy, sync};

#[derive(Parser)]
#[command(name = "sheetsync")]
#[command(about = "Spreadsheet to Postgres order sync", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> local...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Sync commands
    Sync {
        #[command(subcommand)]
        cmd: SyncCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    /// Connectivity, schema presence and stored order count.
    Status,

    /// Apply SQL migrations.
    Migrate,
}

#[derive(Subcommand)]
enum SyncCmd {
    /// Run one full sync and print the report.
    Once {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// What to do with config keys nothing reads: warn | fail
        #[arg(long = "unused-keys", default_value = "warn")]
        unused_keys: String,

        /// Print the report as JSON instead of key=value lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Sync forever, sleeping `sync.crawl_period_sec` between runs.
    Run {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// What to do with config keys nothing reads: warn | fail
        #[arg(long = "unused-keys", default_value = "warn")]
        unused_keys: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = sheetsync_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = sheetsync_db::status(&pool).await?;
                    let n = sheetsync_db::count_orders(&pool).await?;
                    println!(
                        "db_ok={} has_orders_table={} orders={}",
                        s.ok, s.has_orders_table, n
                    );
                }
                DbCmd::Migrate => {
                    sheetsync_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = sheetsync_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Sync { cmd } => match cmd {
            SyncCmd::Once {
                config_paths,
                unused_keys,
                json,
            } => {
                let policy = parse_unused_key_policy(&unused_keys)?;
                sync::sync_once(&config_paths, policy, json).await?;
            }
            SyncCmd::Run {
                config_paths,
                unused_keys,
            } => {
                let policy = parse_unused_key_policy(&unused_keys)?;
                sync::sync_forever(&config_paths, policy).await?;
            }
        },
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
