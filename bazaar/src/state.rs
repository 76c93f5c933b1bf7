// bazaar/src/state.rs

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::pipelines;
use crate::services::mailer::Mailer;
use crate::services::payment_gateway::PaymentGateway;
use crate::services::session::SessionSigner;
use crate::store::Store;
use conveyor::Registry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  pub flows: Arc<Registry<AppError>>,
  pub config: Arc<AppConfig>,
  pub payments: Arc<dyn PaymentGateway>,
  pub sessions: SessionSigner,
  pub mailer: Mailer,
}

impl AppState {
  /// Wires the collaborators together and registers every workflow.
  pub fn new(config: AppConfig, store: Arc<dyn Store>, payments: Arc<dyn PaymentGateway>) -> Self {
    let flows = Arc::new(Registry::<AppError>::new());
    pipelines::register_all_pipelines(&flows);

    Self {
      sessions: SessionSigner::new(&config.session_secret, config.session_ttl_hours),
      mailer: Mailer::new(config.mail_sender.clone()),
      store,
      flows,
      config: Arc::new(config),
      payments,
    }
  }
}
