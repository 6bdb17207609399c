pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;

use {
    domain::{gateway::PaymentGateway, store::ParticipantStore},
    services::checkout::Checkout,
    std::sync::Arc,
};

#[derive(Clone)]
pub struct AppState {
    pub checkout: Checkout,
    pub store: Arc<dyn ParticipantStore>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ParticipantStore>,
        gateway: Arc<dyn PaymentGateway>,
        settings: config::CheckoutSettings,
    ) -> Self {
        Self {
            checkout: Checkout::new(store.clone(), gateway, settings),
            store,
        }
    }
}
