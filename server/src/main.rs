// orderflow-server/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use anyhow::Context;
use orderflow::{MemoryStore, Stores};
use orderflow_server::store::PgStore;
use orderflow_server::web::configure_app_routes;
use orderflow_server::{AppConfig, AppState};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // Allow RUST_LOG override
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting order service...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(anyhow::anyhow!("configuration error: {}", e));
    }
  };

  let stores = match &app_config.database_url {
    Some(database_url) => {
      let pool = PgPool::connect(database_url)
        .await
        .context("connecting to the database")?;
      tracing::info!("Successfully connected to the database.");
      let store = Arc::new(PgStore::new(pool));
      store.migrate().await?;
      Stores::shared(store)
    }
    None => {
      tracing::warn!("DATABASE_URL is not set; orders are kept in memory and lost on restart.");
      Stores::shared(Arc::new(MemoryStore::new()))
    }
  };

  let app_state = AppState::new(stores, app_config.clone());

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("binding {}", server_address))?
  .run()
  .await?;
  Ok(())
}
