mod config;
mod serve;
#[cfg(test)]
mod test_util;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use impactree_core::auth;
use impactree_core::media::MediaStore;
use impactree_db::pool;

use config::ImpactreeConfig;

#[derive(Parser)]
#[command(name = "impactree", about = "Personal philanthropy impact plan server")]
struct Cli {
    /// Database URL (overrides IMPACTREE_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Media root for uploaded images (overrides IMPACTREE_MEDIA_ROOT env var)
    #[arg(long, global = true)]
    media_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an impactree config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/impactree")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the database if needed and apply migrations
    DbInit,
    /// Create a privileged (staff) account
    CreateStaff {
        username: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Serve the JSON API
    Serve {
        /// Address to bind (defaults to the config file, then 127.0.0.1)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (defaults to the config file, then 8000)
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Execute `impactree init`: write the config file.
fn cmd_init(db_url: &str, media_root: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        server: config::ServerSection::default(),
        media: media_root
            .map(|root| config::MediaSection {
                root: root.to_path_buf(),
            })
            .unwrap_or_default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  server = {}:{}", cfg.server.bind, cfg.server.port);
    println!("  media.root = {}", cfg.media.root.display());
    println!();
    println!("Next: run `impactree db-init` to create and migrate the database.");

    Ok(())
}

/// Execute `impactree db-init`: create the database and run migrations.
async fn cmd_db_init(resolved: &ImpactreeConfig) -> anyhow::Result<()> {
    println!("Initializing impactree database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("impactree db-init complete.");
    Ok(())
}

async fn cmd_create_staff(
    resolved: &ImpactreeConfig,
    username: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    let result = auth::create_staff(&db_pool, username, email, password).await;
    db_pool.close().await;
    let session = result?;
    println!("Staff user {} created (id {}).", session.user.username, session.user.id);
    println!("  token = {}", session.token);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, cli.media_root.as_deref(), force)?;
        }
        Commands::DbInit => {
            let resolved =
                ImpactreeConfig::resolve(cli.database_url.as_deref(), cli.media_root.as_deref())?;
            cmd_db_init(&resolved).await?;
        }
        Commands::CreateStaff {
            username,
            email,
            password,
        } => {
            let resolved =
                ImpactreeConfig::resolve(cli.database_url.as_deref(), cli.media_root.as_deref())?;
            cmd_create_staff(&resolved, &username, &email, &password).await?;
        }
        Commands::Serve { bind, port } => {
            let resolved =
                ImpactreeConfig::resolve(cli.database_url.as_deref(), cli.media_root.as_deref())?;
            let bind = bind.unwrap_or_else(|| resolved.server.bind.clone());
            let port = port.unwrap_or(resolved.server.port);

            let db_pool = pool::create_pool(&resolved.db_config).await?;
            pool::run_migrations(&db_pool).await?;
            let state = serve::AppState {
                pool: db_pool.clone(),
                media: MediaStore::new(&resolved.media_root),
            };
            let result = serve::run_serve(state, &bind, port).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
