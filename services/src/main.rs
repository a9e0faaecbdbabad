use quillpost_services::clock::SystemClock;
use quillpost_services::idgen::FlakeIdGenerator;
use quillpost_services::store::pg::PgStore;
use quillpost_services::{AppState, config::Config, database, routes, telemetry};
use quillpost_utils::version_info::{build_branch, build_commit, build_date};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first; tracing setup depends on the environment
    let config: Config = Config::init()?;
    telemetry::init_tracing(&config)?;

    print_build_info();
    info!(
        environment = %config.environment(),
        server_addr = %config.server_addr(),
        port = %config.port(),
        "Configuration loaded"
    );

    // Initialize database connection pool
    let pool = database::create_pool(&config).await?;

    // Build the application router
    let state = AppState::new(
        PgStore::new(pool),
        Arc::new(FlakeIdGenerator::new(0)),
        Arc::new(SystemClock),
    );
    let route = routes(state, config.clone());

    // Create socket address
    let addr = SocketAddr::from((config.server_addr().parse::<IpAddr>()?, config.port()));

    info!("Starting server on {}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, route).await?;

    Ok(())
}

/// Print build information
fn print_build_info() {
    info!("===========================================");
    info!("  Quillpost Services");
    info!("===========================================");
    info!("Build Date:   {}", build_date());
    info!("Build Commit: {}", build_commit());
    info!("Build Branch: {}", build_branch());
    info!("===========================================");
}
