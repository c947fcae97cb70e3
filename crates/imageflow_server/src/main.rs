//! Headless API server entrypoint.

use imageflow_server::sweep::{run_maintenance, spawn_sweeper};
use imageflow_server::{
    config::{env_flag_enabled, Config},
    db::Database,
    serve_router, AppState, BlobStore, FilesystemBlobStore, DEFAULT_PORT,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliFlags {
    help: bool,
    cleanup: bool,
    add_api_key: Option<String>,
}

fn parse_cli_flags(args: &[String]) -> anyhow::Result<CliFlags> {
    let mut flags = CliFlags::default();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" => flags.help = true,
            "--cleanup" => flags.cleanup = true,
            "--add-api-key" => {
                let Some(key) = iter.next().filter(|key| !key.trim().is_empty()) else {
                    anyhow::bail!("--add-api-key requires a key value");
                };
                flags.add_api_key = Some(key.trim().to_string());
            }
            value if value.starts_with('-') => {
                anyhow::bail!(
                    "Unknown option: '{}'. Use --help to see supported options.",
                    value
                );
            }
            value => {
                anyhow::bail!(
                    "Unexpected positional argument: '{}'. Use --help to see supported options.",
                    value
                );
            }
        }
    }
    Ok(flags)
}

fn runs_maintenance_mode(flags: &CliFlags) -> bool {
    flags.cleanup || flags.add_api_key.is_some()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imageflow=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli_flags = parse_cli_flags(&args)?;

    if cli_flags.help {
        print_help();
        return Ok(());
    }

    let config = Config::from_env();
    let database = Database::new(&config)?;
    let blobs: Arc<dyn BlobStore> = Arc::new(FilesystemBlobStore::new(&config.blob_dir).await?);
    tracing::info!(
        "Metadata store: {} ({}), blobs: {} ({})",
        database.kv.backend_name(),
        config.db_path,
        blobs.backend_name(),
        config.blob_dir
    );

    if let Some(key) = &cli_flags.add_api_key {
        if database.api_keys.add(key).await? {
            println!("API key registered");
        } else {
            println!("API key already registered");
        }
    }

    if cli_flags.cleanup {
        run_maintenance(&database, blobs.as_ref(), config.cleanup_item_timeout()).await;
    }

    if runs_maintenance_mode(&cli_flags) {
        return Ok(());
    }

    if config.api_keys.is_empty() && database.api_keys.list().await?.is_empty() {
        tracing::warn!(
            "No API keys configured; management routes will reject every request. Set API_KEYS or run with --add-api-key"
        );
    }

    let state = AppState::new(config.clone(), database, blobs.clone());

    let allow_public = env_flag_enabled("ALLOW_PUBLIC_ACCESS");
    if allow_public {
        tracing::warn!("Public access enabled - server will accept requests from any origin");
    }

    let bind_addr = imageflow_server::resolve_bind_address(&config, allow_public);
    if !bind_addr.ip().is_loopback() {
        tracing::warn!(
            "Binding to non-localhost address: {} - ensure proper security measures are in place",
            bind_addr
        );
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweeper = config.cleanup_interval().map(|interval| {
        tracing::info!(
            interval_secs = interval.as_secs(),
            "Expiry sweeper scheduled"
        );
        spawn_sweeper(
            state.db.clone(),
            blobs,
            interval,
            config.cleanup_item_timeout(),
            shutdown_rx,
        )
    });

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let actual_addr = listener.local_addr().unwrap_or(bind_addr);
    tracing::info!("ImageFlow running at http://{}", actual_addr);

    let serve_result = serve_router(listener, state, allow_public, shutdown_signal()).await;

    let _ = shutdown_tx.send(true);
    if let Some(sweeper) = sweeper {
        if let Err(err) = sweeper.await {
            tracing::error!("Expiry sweeper task failed: {}", err);
        }
    }

    serve_result?;

    Ok(())
}

fn print_help() {
    println!("ImageFlow Server\n");
    println!("Usage: imageflow [OPTIONS]\n");
    println!("Options:");
    println!("  --add-api-key <KEY>  Register an API key and exit");
    println!("  --cleanup            Remove expired images, repair indexes and exit");
    println!("  --help               Show this help message");
    println!("\nEnvironment variables:");
    println!("  DB_PATH              Metadata directory (default: ~/.local/share/imageflow/db)");
    println!("  BLOB_DIR             Image directory (default: ~/.local/share/imageflow/blobs)");
    println!(
        "  PORT                 Server port (default: {})",
        DEFAULT_PORT
    );
    println!("  API_KEYS             Comma-separated API keys accepted in addition to stored ones");
    println!("  PUBLIC_BASE_URL      Origin used in image URLs (default: request origin)");
    println!("  MAX_FILE_SIZE        Maximum upload size in bytes (default: 10MB)");
    println!("  MAX_UPLOAD_COUNT     Maximum files per upload (default: 20)");
    println!("  IMAGE_QUALITY        Quality hint for CDN variants (default: 80)");
    println!("  CDN_IMAGE_PROXY      Derive WebP/AVIF URLs through /cdn-cgi/image/");
    println!("  TAG_RENAME_POLICY    overwrite | merge (default: overwrite)");
    println!("  CLEANUP_INTERVAL_SECS      Expiry sweep interval, 0 disables (default: 3600)");
    println!("  CLEANUP_ITEM_TIMEOUT_SECS  Per-image sweep timeout (default: 30)");
    println!("  ALLOW_PUBLIC_ACCESS  Allow CORS from any origin");
    println!(
        "  BIND                 Override bind address (e.g. 0.0.0.0:{})",
        DEFAULT_PORT
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
