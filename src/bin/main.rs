use std::net::SocketAddr;

use anyhow::Result;
use authgate::config::GatewayConfig;
use authgate::db::DatabaseConfig;
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "authgate")]
#[command(about = "Authentication gateway with rate limiting and an internal proxy")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway HTTP server
    Serve {
        #[arg(short, long, default_value = "8000")]
        port: u16,
        /// Bind address for the public listener
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,
        #[arg(long, default_value = "memory", env = "AUTHGATE_DB_URL")]
        db_url: String,
        /// Base URL of the internal intel upstream
        #[arg(long, env = "UPSTREAM_BASE_URL")]
        upstream_base_url: String,
        /// Shared secret sent on every upstream request
        #[arg(long, env = "PROXY_SHARED_SECRET", hide_env_values = true)]
        proxy_secret: String,
    },
    /// Initialize the database schema and exit
    Init {
        #[arg(long, default_value = "memory", env = "AUTHGATE_DB_URL")]
        db_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("authgate=info".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            bind,
            db_url,
            upstream_base_url,
            proxy_secret,
        } => {
            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Using database url: {}", db_config.url);
            info!("Proxy upstream: {}", upstream_base_url);

            let state = authgate::create_gateway(
                db_config,
                GatewayConfig::new(upstream_base_url, proxy_secret),
            )
            .await?;
            let app = authgate::api::create_router(state);

            let listener = tokio::net::TcpListener::bind(format!("{}:{}", bind, port)).await?;
            info!("Gateway listening on http://{}:{}", bind, port);

            // ConnectInfo gives the rate-limit gate its peer-address fallback.
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await?;
        }
        Commands::Init { db_url } => {
            let db_config = DatabaseConfig {
                url: db_url,
                ..Default::default()
            };
            info!("Initializing schema at {}", db_config.url);

            let db = authgate::db::create_connection(db_config).await?;
            authgate::db::ensure_schema(&db).await?;
            info!("Schema initialized");
        }
    }

    Ok(())
}
