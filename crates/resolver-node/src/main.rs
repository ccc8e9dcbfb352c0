//! # HTLC Resolver Node
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging and metrics
//! 2. Load configuration (`RESOLVER_CONFIG` + environment overrides)
//! 3. Validate for production (skipped with `--simulate`)
//! 4. Connect ledger adapters and open the order store
//! 5. Serve HTTP until Ctrl+C

use anyhow::{Context, Result};
use tracing::{error, info};

use resolver_core::ports::SystemTimeSource;
use resolver_node::api;
use resolver_node::container::{build_store, NodeConfig, ResolverContainer};
use resolver_telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    init_telemetry(&telemetry).context("failed to initialize telemetry")?;

    let simulate = std::env::args().skip(1).any(|arg| arg == "--simulate");
    let config = NodeConfig::from_env().context("failed to load configuration")?;

    info!("===========================================");
    info!("  HTLC Resolver v{}", resolver_core::VERSION);
    info!("  Mode: {}", if simulate { "simulated ledgers" } else { "live ledgers" });
    info!("===========================================");

    let container = if simulate {
        let store = build_store(&config).await?;
        ResolverContainer::simulated(
            &config.simulation,
            config.orchestrator.clone(),
            store,
            std::sync::Arc::new(SystemTimeSource),
        )
        .await?
    } else {
        config.validate_for_production()?;
        ResolverContainer::build(&config).await?
    };

    let router = api::router(container.api());
    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("cannot bind {}", config.server.listen_addr))?;
    info!("[resolver] listening on {}", config.server.listen_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Initiating graceful shutdown...");
}
