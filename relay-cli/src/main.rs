mod config;

use anyhow::Result;
use clap::Parser;
use relay_http::{start_server, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{Args, Backend};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let runtime = args.build_runtime()?;
    match args.backend {
        Backend::Mock => info!("Using in-process mock runtime"),
        _ => info!("Using {} backend at {}", runtime.kind(), args.runtime_url()),
    }

    let config = ServerConfig::new(args.address()).with_cors_origins(args.cors_origins());
    start_server(config, runtime)
        .await
        .map_err(|e| anyhow::anyhow!("server error: {}", e))?;

    Ok(())
}
