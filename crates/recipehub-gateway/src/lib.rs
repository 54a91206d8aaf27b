pub mod auth;
pub mod config;
pub mod cors;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;

pub use auth::AuthenticatedUser;
pub use config::GatewayConfig;
pub use error::ApiError;
pub use state::AppState;
