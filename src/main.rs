// Main entry point
use clap::Parser;
use colored::Colorize;
use leadboard::infrastructure::config::{self, load_config, Config};
use leadboard::infrastructure::storage::db::{init_database, table_counts};
use leadboard::interfaces::cli::Cli;
use leadboard::interfaces::http::create_router;
use leadboard::migration::seed::seed_database;
use leadboard::state::AppState;
use std::path::PathBuf;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.generate_config {
        config::generate_config_sample(cli.config.as_deref())?;
        return Ok(());
    }

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(bind) = &cli.bind {
        config.bind = bind.clone();
    }

    // Initialize logging
    if config.logging.enable {
        init_logging(&config.logging)?;
    }

    // Setup database path (from config or default)
    let db_path = config::get_database_path(&config);
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let db_conn = init_database(&db_path).await?;

    if cli.status {
        print_status(&db_conn, &db_path, &config).await?;
        return Ok(());
    }

    if cli.seed {
        let seed_dir = cli
            .seed_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.seed_dir));
        // Use select! so Ctrl-C drops the transaction instead of half-loading
        tokio::select! {
            result = seed_database(&db_conn, &seed_dir) => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "seed failed");
                    eprintln!("{}", format!("Seed failed: {e}").red());
                    return Err(e.into());
                }
                println!("{}", "Seed complete!".green());
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("Seed interrupted");
            }
        }
        return Ok(());
    }

    serve(db_conn, config).await
}

async fn serve(db: tokio_rusqlite::Connection, config: Config) -> anyhow::Result<()> {
    let bind = config.bind.clone();
    let state = AppState::new(db, config)?;
    let app = create_router(state);

    let listener = TcpListener::bind(&bind).await?;
    tracing::info!("leadboard listening on http://{bind}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("leadboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        // Without a signal handler the server runs until killed
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize logging with path and level configuration
fn init_logging(logging: &config::Logging) -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    let level = match logging.level.to_uppercase().as_str() {
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARN" => "warn",
        "ERROR" => "error",
        _ => "info",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if let Some(path) = logging.path.as_deref().filter(|p| !p.is_empty()) {
        // Log to file
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file)
            .with_ansi(false)
            .init();
        return Ok(());
    }

    // Log to stderr (default)
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

async fn print_status(
    db: &tokio_rusqlite::Connection,
    db_path: &std::path::Path,
    config: &Config,
) -> anyhow::Result<()> {
    println!("{}", "leadboard Status".green().bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("Database: {}", db_path.display());
    for (table, count) in table_counts(db).await? {
        println!("  {:<16} {}", table, count.to_string().cyan());
    }

    println!(
        "Config: {}",
        config::get_config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "Not found".to_string())
    );
    println!("Bind: {}", config.bind);
    println!("Seed dir: {}", config.seed_dir);
    println!("Cache TTL: {} ms", config.cache.ttl_ms);

    let webhook = |url: &str| {
        if url.is_empty() {
            "Not configured".yellow().to_string()
        } else {
            "Configured".to_string()
        }
    };
    println!("Contact webhook: {}", webhook(&config.webhook.contact_url));
    println!("New-lead webhook: {}", webhook(&config.webhook.new_lead_url));

    Ok(())
}
