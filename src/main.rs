use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gateway::config::{self, Config, LogFormat};
use gateway::middleware::auth::Authenticator;
use gateway::proxy::forward::ForwardingEngine;
use gateway::proxy::upstream::UpstreamClient;
use gateway::store::{ExportOutcome, SqliteStore, StoreError, TokenStore};
use gateway::{api, cli, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let cfg = config::load()?;
    init_tracing(&cfg);

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(cli::Commands::Token { command }) => {
            let store = SqliteStore::open(&cfg.token_db_path).await?;
            handle_token_command(command, &store).await
        }
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

fn init_tracing(cfg: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "ollama_gateway={lvl},gateway={lvl},tower_http={lvl}",
            lvl = cfg.log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    match cfg.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

async fn run_server(cfg: Config, port: u16) -> anyhow::Result<()> {
    tracing::info!(path = %cfg.token_db_path.display(), "Opening token database...");
    let store: Arc<dyn TokenStore> = Arc::new(SqliteStore::open(&cfg.token_db_path).await?);

    let upstream_client = UpstreamClient::new(cfg.connect_timeout, cfg.read_timeout)?;
    let engine = ForwardingEngine::new(upstream_client, cfg.ollama_base_url.clone(), cfg.stream_buffer);

    let state = Arc::new(AppState {
        auth: Authenticator::new(store),
        engine,
    });

    let app = api::router(state, &cfg.base_path);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        upstream = %cfg.ollama_base_url,
        base_path = %cfg.base_path,
        "Ollama gateway listening on {}",
        addr
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn handle_token_command(cmd: cli::TokenCommands, store: &dyn TokenStore) -> anyhow::Result<()> {
    match cmd {
        cli::TokenCommands::Create {
            user,
            api_name,
            expires_at,
        } => match store.issue(&user, &api_name, expires_at).await {
            Ok(token) => {
                println!(
                    "Generated token for {} with API {}:\n  Token: {}\n  Use:   Authorization: Bearer {}",
                    user, api_name, token, token
                );
            }
            Err(e @ StoreError::DuplicateCredential { .. }) | Err(e @ StoreError::InvalidInput(_)) => {
                anyhow::bail!("{}", e);
            }
            Err(e) => return Err(e.into()),
        },
        cli::TokenCommands::List => {
            let records = store.list().await?;
            if records.is_empty() {
                println!("No users found.");
            } else {
                println!(
                    "{:<38} {:<20} {:<20} {:<26} EXPIRES",
                    "USER ID", "USER", "API KEY NAME", "CREATED"
                );
                for r in records {
                    println!(
                        "{:<38} {:<20} {:<20} {:<26} {}",
                        r.user_id,
                        r.user,
                        r.api_name,
                        r.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                        r.expires_at
                            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                            .unwrap_or_else(|| "-".into())
                    );
                }
            }
        }
        cli::TokenCommands::Revoke { user, api_name } => {
            match store.revoke(&user, &api_name).await {
                Ok(()) => println!("Deleted token for {} with API {}.", user, api_name),
                Err(e @ StoreError::NotFound { .. }) => anyhow::bail!("{}", e),
                Err(e) => return Err(e.into()),
            }
        }
        cli::TokenCommands::Export { output } => match store.export(&output).await? {
            ExportOutcome::Empty => {
                println!("No users found; wrote header only to {}.", output.display());
            }
            ExportOutcome::Written(n) => {
                println!("Exported {} record(s) to {}.", n, output.display());
            }
        },
    }
    Ok(())
}
