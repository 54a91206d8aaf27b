use crate::config::GatewayConfig;
use payments::{ChapaClient, HasuraLedger, PaymentService};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub payments: PaymentService,
}

impl AppState {
    /// Wire the Chapa client and Hasura ledger around one pooled HTTP client.
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let provider = Arc::new(ChapaClient::new(http_client.clone(), config.chapa()));
        let ledger = Arc::new(HasuraLedger::new(http_client, config.hasura()));
        let payments = PaymentService::new(provider, ledger, config.checkout_urls());

        Ok(Self::with_service(config, payments))
    }

    /// Build state around an existing payment service.
    pub fn with_service(config: GatewayConfig, payments: PaymentService) -> Self {
        Self {
            config: Arc::new(config),
            payments,
        }
    }
}
