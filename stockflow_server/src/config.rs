use std::{env, time::Duration as StdDuration};

use chrono::Duration;
use log::*;
use stockflow_common::{
    helpers::{parse_boolean_flag, parse_positive},
    Secret,
};
use stockflow_engine::order_objects::{CheckoutConfig, DEFAULT_ORDER_TIMEOUT_MINUTES};

const DEFAULT_SF_HOST: &str = "127.0.0.1";
const DEFAULT_SF_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/stockflow.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_EXPIRY_SWEEP_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_HMAC_HEADER: &str = "X-Signature-SHA256";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// How long a new order holds its stock before the expiry worker may reclaim it.
    pub order_timeout: Duration,
    /// How often the expiry worker looks for stale orders. Expiry is enforced no later than one interval after the
    /// order's deadline.
    pub expiry_sweep_interval: StdDuration,
    pub webhook: WebhookConfig,
    /// Bearer token for the `/admin` routes. When empty, the admin routes refuse every request.
    pub admin_token: Secret<String>,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
}

/// Authentication of the payment gateway's webhook calls.
#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub hmac_secret: Secret<String>,
    /// If false, webhook signatures are not checked. **DANGER**
    pub hmac_checks: bool,
    /// The header carrying the base64-encoded HMAC-SHA256 of the request body
    pub hmac_header: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self { hmac_secret: Secret::default(), hmac_checks: true, hmac_header: DEFAULT_HMAC_HEADER.to_string() }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SF_HOST.to_string(),
            port: DEFAULT_SF_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            order_timeout: Duration::minutes(DEFAULT_ORDER_TIMEOUT_MINUTES),
            expiry_sweep_interval: StdDuration::from_secs(DEFAULT_EXPIRY_SWEEP_INTERVAL_SECS),
            webhook: WebhookConfig::default(),
            admin_token: Secret::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SF_HOST").ok().unwrap_or_else(|| DEFAULT_SF_HOST.into());
        let port = env::var("SF_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for SF_PORT. {e} Using the default, {DEFAULT_SF_PORT}, instead.");
                    DEFAULT_SF_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SF_PORT);
        let database_url = env::var("SF_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SF_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections = positive_or_default("SF_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        let order_timeout = Duration::minutes(positive_or_default("SF_ORDER_TIMEOUT", DEFAULT_ORDER_TIMEOUT_MINUTES));
        let expiry_sweep_interval = StdDuration::from_secs(positive_or_default(
            "SF_EXPIRY_SWEEP_INTERVAL",
            DEFAULT_EXPIRY_SWEEP_INTERVAL_SECS,
        ));
        let webhook = WebhookConfig::from_env_or_defaults();
        let admin_token = Secret::new(env::var("SF_ADMIN_TOKEN").ok().unwrap_or_else(|| {
            warn!("🪛️ SF_ADMIN_TOKEN is not set. The admin routes are disabled.");
            String::default()
        }));
        let use_x_forwarded_for = parse_boolean_flag(env::var("SF_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("SF_USE_FORWARDED").ok(), false);
        Self {
            host,
            port,
            database_url,
            max_connections,
            order_timeout,
            expiry_sweep_interval,
            webhook,
            admin_token,
            use_x_forwarded_for,
            use_forwarded,
        }
    }

    pub fn checkout_config(&self) -> CheckoutConfig {
        CheckoutConfig::default().with_order_timeout(self.order_timeout)
    }
}

impl WebhookConfig {
    pub fn from_env_or_defaults() -> Self {
        let hmac_secret = env::var("SF_WEBHOOK_HMAC_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ SF_WEBHOOK_HMAC_SECRET is not set. Please set it to the signing key shared with the payment \
                 gateway."
            );
            String::default()
        });
        let hmac_checks = parse_boolean_flag(env::var("SF_WEBHOOK_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🚨️ Webhook HMAC checks are disabled. Anyone can mark orders as paid. 🚨️");
        }
        let hmac_header = env::var("SF_WEBHOOK_HMAC_HEADER").ok().unwrap_or_else(|| DEFAULT_HMAC_HEADER.to_string());
        Self { hmac_secret: Secret::new(hmac_secret), hmac_checks, hmac_header }
    }
}

fn positive_or_default<T>(var: &str, default: T) -> T
where T: std::str::FromStr + PartialOrd + Default + std::fmt::Display {
    let value = env::var(var).ok();
    match parse_positive::<T>(value.clone()) {
        Some(v) => v,
        None => {
            match value {
                Some(s) => warn!("🪛️ Invalid configuration value for {var}: '{s}'. Using the default of {default}."),
                None => info!("🪛️ {var} is not set. Using the default of {default}."),
            }
            default
        },
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// The subset of the server configuration that route handlers need. It carries no secrets.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
