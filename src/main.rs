use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use shard_router::config::RouterConfig;
use shard_router::router::handlers::api_router;
use shard_router::router::ShardRouter;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut bind_addr: SocketAddr = "127.0.0.1:8080".parse()?;
    let mut config_path = PathBuf::from("shard_map.json");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" => {
                bind_addr = args[i + 1].parse()?;
                i += 2;
            }
            "--config" => {
                config_path = PathBuf::from(&args[i + 1]);
                i += 2;
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: {} [--bind <addr:port>] [--config <shard_map.json>]",
                    args[0]
                );
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    // 1. Static configuration, loaded once:
    let config = RouterConfig::load(&config_path)?;
    let topology = config.topology()?;
    let strategy = config.initial_strategy();

    tracing::info!(
        "Loaded shard map {}: {} shards, reference backend {}",
        config_path.display(),
        topology.shard_count(),
        config.reference_endpoint()
    );
    for (shard, endpoint) in topology.iter() {
        tracing::info!("  shard {} -> {}", shard, endpoint);
    }
    tracing::info!("Initial strategy: {}", strategy);

    // 2. Router instance; all mutable admin state lives here:
    let router = Arc::new(ShardRouter::new(
        topology,
        config.reference_endpoint(),
        strategy,
    ));

    // 3. HTTP surface; permissive CORS so the operator dashboard can call in:
    let app = api_router(router).layer(CorsLayer::permissive());

    tracing::info!("Shard router listening on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
