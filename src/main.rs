//! StudyHarbor - a shared study room with a synchronized focus timer
//!
//! This is the main entry point for the study-harbor host process.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use study_harbor::{
    api::create_router,
    config::Config,
    state::AppState,
    sync::Room,
    tasks::{Companion, Drivers},
    transport::{MemoryHub, SystemClock},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("study_harbor={},tower_http=info", config.log_level()))
        .init();

    info!("Starting study-harbor v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, focus={}min, break={}min, companions={}",
        config.host, config.port, config.focus, config.break_minutes, config.companions
    );

    let hub = MemoryHub::new();
    let identity = config.identity();
    info!("You are {} ({}, {})", identity.display_name, identity.guest_id, identity.color);

    let settings = config.room_settings()?;
    let mut room = Room::new(hub.clone(), SystemClock, identity.clone(), settings)?;
    room.open();

    let state = Arc::new(AppState::new(room, hub.clone(), config.port, config.host.clone()));
    let drivers = Drivers::spawn(Arc::clone(&state.room), identity.display_name.clone());

    let mut companions = Vec::with_capacity(config.companions);
    for _ in 0..config.companions {
        match Companion::spawn(hub.clone(), SystemClock, settings) {
            Ok(companion) => companions.push(companion),
            Err(e) => warn!("Failed to start companion: {}", e),
        }
    }

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /timer/toggle     - Start or pause the timer");
    info!("  POST /timer/reset      - Reset to a stopped focus phase");
    info!("  POST /timer/skip       - Skip to the other phase");
    info!("  POST /timer/mode       - Switch between solo and shared");
    info!("  POST /timer/durations  - Change focus/break minutes");
    info!("  POST /move             - Walk your avatar to {{x, y}}");
    info!("  POST /status-message   - Set your status line");
    info!("  POST /hover            - Hover an avatar");
    info!("  POST /low-power        - Toggle low power mode");
    info!("  GET  /status           - Room snapshot");
    info!("  GET  /health           - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    for companion in companions {
        companion.leave();
    }
    drivers.stop();
    match state.room.lock() {
        Ok(mut room) => room.close(),
        Err(e) => warn!("Room lock poisoned during shutdown: {}", e),
    }

    info!("Server shutdown complete");
    Ok(())
}
