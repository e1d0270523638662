use std::sync::Arc;

use noire_server::{config, db, health, openapi, telemetry};
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    telemetry::init_logging();

    let app_config = config::load_config();
    if config::feature_flags().telemetry {
        if let Err(e) = telemetry::init_telemetry() {
            tracing::warn!(error = %e, "failed to start OTLP exporters, continuing without them");
        }
    }
    health::record_start_time();

    let settings = config::Settings::from_env()?;
    let pool = db::create_pool(&settings.database_url, settings.database_max_connections)?;
    db::run_migrations(&pool).await?;

    let state = db::AppState {
        pool: pool.clone(),
        auth: settings.auth.clone(),
        workflow: Arc::new(app_config.workflow.clone()),
    };

    let mut router = openapi::app_router(state, settings.max_body_bytes)
        .layer(TraceLayer::new_for_http());
    if config::feature_flags().telemetry {
        router = router.layer(telemetry::OtelTraceLayer);
    }

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!(addr = %settings.bind_addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
