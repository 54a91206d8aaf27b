use std::env;
use std::time::Duration;
use url::Url;

use payments::chapa::DEFAULT_CHAPA_BASE_URL;
use payments::{ChapaConfig, CheckoutUrls, HasuraConfig};

const DEFAULT_PORT: u16 = 5050;
const DEFAULT_RATE_LIMIT_RPM: u32 = 60;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CHECKOUT_TITLE: &str = "Recipe Purchase";
const DEFAULT_CHECKOUT_DESCRIPTION: &str = "Payment for recipe purchase";

#[derive(Clone)]
pub struct GatewayConfig {
    /// Server port
    pub port: u16,
    /// HS256 secret used to verify bearer tokens
    pub jwt_secret: Vec<u8>,
    /// Chapa secret key (sent as bearer credential)
    pub chapa_secret_key: String,
    /// Chapa API base, e.g. "https://api.chapa.co/v1"
    pub chapa_base_url: String,
    /// Where Chapa delivers webhooks
    pub chapa_callback_url: String,
    /// Where Chapa returns the customer after checkout
    pub chapa_return_url: String,
    /// Secret for the `x-chapa-signature` webhook HMAC (None = unchecked)
    pub chapa_webhook_secret: Option<Vec<u8>>,
    pub checkout_title: String,
    pub checkout_description: String,
    /// Hasura GraphQL endpoint
    pub hasura_endpoint: String,
    /// Hasura admin secret
    pub hasura_admin_key: String,
    /// Bound on every outbound HTTP call
    pub http_timeout: Duration,
    /// CORS allowed origins
    pub allowed_origins: Vec<String>,
    /// Rate limit requests per minute
    pub rate_limit_rpm: u32,
    /// Bearer token required for /metrics endpoint (None = public)
    pub metrics_token: Option<String>,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("port", &self.port)
            .field("jwt_secret", &"[REDACTED]")
            .field("chapa_secret_key", &"[REDACTED]")
            .field("chapa_base_url", &self.chapa_base_url)
            .field("chapa_callback_url", &self.chapa_callback_url)
            .field("chapa_return_url", &self.chapa_return_url)
            .field(
                "chapa_webhook_secret",
                &self.chapa_webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("checkout_title", &self.checkout_title)
            .field("checkout_description", &self.checkout_description)
            .field("hasura_endpoint", &self.hasura_endpoint)
            .field("hasura_admin_key", &"[REDACTED]")
            .field("http_timeout", &self.http_timeout)
            .field("allowed_origins", &self.allowed_origins)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .ok_or(ConfigError::MissingRequired(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn required_url(name: &'static str) -> Result<String, ConfigError> {
    let value = required(name)?;
    Url::parse(&value).map_err(|_| ConfigError::InvalidUrl(name, value.clone()))?;
    Ok(value)
}

fn parse_number<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber(name, raw)),
        None => Ok(default),
    }
}

impl GatewayConfig {
    /// Read configuration from the process environment. Called once at startup.
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = required("JWT_SECRET")?.into_bytes();
        let chapa_secret_key = required("CHAPA_SECRET_KEY")?;
        let chapa_callback_url = required_url("CHAPA_CALLBACK_URL")?;
        let chapa_return_url = required_url("CHAPA_RETURN_URL")?;
        let hasura_endpoint = required_url("HASURA_ENDPOINT")?;
        let hasura_admin_key = required("HASURA_ADMIN_KEY")?;

        let chapa_base_url =
            optional("CHAPA_BASE_URL").unwrap_or_else(|| DEFAULT_CHAPA_BASE_URL.to_string());
        Url::parse(&chapa_base_url)
            .map_err(|_| ConfigError::InvalidUrl("CHAPA_BASE_URL", chapa_base_url.clone()))?;

        let chapa_webhook_secret = optional("CHAPA_WEBHOOK_SECRET").map(String::into_bytes);

        let checkout_title =
            optional("CHECKOUT_TITLE").unwrap_or_else(|| DEFAULT_CHECKOUT_TITLE.to_string());
        let checkout_description = optional("CHECKOUT_DESCRIPTION")
            .unwrap_or_else(|| DEFAULT_CHECKOUT_DESCRIPTION.to_string());

        let port = parse_number("PORT", DEFAULT_PORT)?;
        let rate_limit_rpm = parse_number("RATE_LIMIT_RPM", DEFAULT_RATE_LIMIT_RPM)?;
        let timeout_secs: u64 = parse_number("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidNumber(
                "HTTP_TIMEOUT_SECS",
                "0".to_string(),
            ));
        }

        let allowed_origins: Vec<String> = optional("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ]
            });

        let metrics_token = optional("METRICS_TOKEN");

        if jwt_secret.len() < 32 {
            tracing::warn!(
                "JWT_SECRET is short ({} bytes, recommended minimum 32)",
                jwt_secret.len()
            );
        }
        if chapa_webhook_secret.is_none() {
            tracing::warn!(
                "CHAPA_WEBHOOK_SECRET not set; webhook signatures will not be verified"
            );
        }
        if metrics_token.is_none() {
            tracing::warn!("METRICS_TOKEN not set; /metrics endpoint is publicly accessible");
        }

        Ok(Self {
            port,
            jwt_secret,
            chapa_secret_key,
            chapa_base_url,
            chapa_callback_url,
            chapa_return_url,
            chapa_webhook_secret,
            checkout_title,
            checkout_description,
            hasura_endpoint,
            hasura_admin_key,
            http_timeout: Duration::from_secs(timeout_secs),
            allowed_origins,
            rate_limit_rpm,
            metrics_token,
        })
    }

    pub fn chapa(&self) -> ChapaConfig {
        ChapaConfig {
            base_url: self.chapa_base_url.clone(),
            secret_key: self.chapa_secret_key.clone(),
            checkout_title: self.checkout_title.clone(),
            checkout_description: self.checkout_description.clone(),
        }
    }

    pub fn hasura(&self) -> HasuraConfig {
        HasuraConfig {
            endpoint: self.hasura_endpoint.clone(),
            admin_secret: self.hasura_admin_key.clone(),
        }
    }

    pub fn checkout_urls(&self) -> CheckoutUrls {
        CheckoutUrls {
            callback_url: self.chapa_callback_url.clone(),
            return_url: self.chapa_return_url.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingRequired(&'static str),

    #[error("invalid URL in {0}: {1}")]
    InvalidUrl(&'static str, String),

    #[error("invalid number in {0}: {1}")]
    InvalidNumber(&'static str, String),
}
