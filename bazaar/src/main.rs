// bazaar/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use bazaar::config::{AppConfig, LogFormat};
use bazaar::services::accounts;
use bazaar::services::payment_gateway::HostedCheckoutGateway;
use bazaar::state::AppState;
use bazaar::store::{MemoryStore, PgStore, Store};
use bazaar::web::configure_app_routes;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Pretty => builder.init(),
  }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  let app_config = match AppConfig::from_env() {
    Ok(cfg) => cfg,
    Err(e) => {
      eprintln!("Configuration error: {}", e);
      std::process::exit(1);
    }
  };
  init_tracing(app_config.log_format);
  tracing::info!(config = ?app_config, "Starting Bazaar API server...");

  let store: Arc<dyn Store> = match app_config.database_url.as_deref() {
    Some(url) => {
      let pg = PgStore::connect(url).await.map_err(std::io::Error::other)?;
      pg.migrate().await.map_err(std::io::Error::other)?;
      Arc::new(pg)
    }
    None => {
      tracing::warn!("DATABASE_URL is not set; using the in-memory store. Data is lost on restart.");
      Arc::new(MemoryStore::new())
    }
  };

  if let Err(e) = accounts::seed_admin(store.as_ref(), &app_config).await {
    tracing::error!(error = %e, "Seeding the admin account failed.");
  }

  let payments = Arc::new(HostedCheckoutGateway::new(app_config.payment_checkout_url.clone()));
  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  let app_state = AppState::new(app_config, store, payments);

  tracing::info!("Binding server to {}...", server_address);
  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
