use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use railgate::{
    create_router, AppState, Config, MutationTrigger, RandomTrigger, StateStore, TrafficWatch,
    UpdateScheduler,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            eprintln!("Optional: RAILGATE_LISTEN_ADDR (default: 0.0.0.0:3000)");
            eprintln!("Optional: RAILGATE_TICK_SECS (default: 30)");
            eprintln!("Optional: RAILGATE_TRAIN_PROBABILITY, RAILGATE_GATE_PROBABILITY");
            eprintln!("Optional: RAILGATE_CLIENT_QUEUE, RAILGATE_HANDSHAKE_TIMEOUT_MS");
            eprintln!("Optional: RAILGATE_TRAINS_TODAY (default: 24)");
            std::process::exit(1);
        }
    };

    tracing::info!("Starting RailGate server");
    tracing::info!("Listen address: {}", config.listen_addr);
    tracing::info!("Update interval: {:?}", config.tick_interval);

    let store = StateStore::seeded();
    let state = AppState::new(store.clone(), &config);

    let triggers: Vec<Box<dyn MutationTrigger>> = vec![
        Box::new(RandomTrigger::from_entropy(
            config.train_probability,
            config.gate_probability,
        )),
        Box::new(TrafficWatch::new()),
    ];
    let scheduler = UpdateScheduler::new(
        store,
        state.broadcaster.clone(),
        Box::new(triggers),
        config.tick_interval,
    )
    .spawn();

    let app = create_router(state)
        .nest_service("/static", ServeDir::new("static"))
        .layer(CorsLayer::permissive());

    let listener = match tokio::net::TcpListener::bind(&config.listen_addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", config.listen_addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server running at http://{}", config.listen_addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown requested");
        })
        .await;

    scheduler.shutdown().await;

    if let Err(e) = served {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
