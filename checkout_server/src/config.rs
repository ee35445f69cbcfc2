use std::env;

use checkout_engine::helpers::PricingConfig;
use log::*;
use rand::{distributions::Alphanumeric, Rng};
use shop_common::{parse_boolean_flag, Money, Secret};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8440;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/checkout.db";
const DEFAULT_CART_EXPIRY_INTERVAL_SECS: u64 = 3600;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The HMAC secret shared with the payment gateway for signing payment callbacks.
    pub callback_secret: Secret<String>,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// How often the stale-cart sweep runs.
    pub cart_expiry_interval_secs: u64,
    pub pricing: PricingConfig,
    pub gateway: GatewayConfig,
    pub notifier: RemoteServiceConfig,
    pub profiles: RemoteServiceConfig,
}

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// The gateway name recorded against orders and audit entries.
    pub name: String,
    pub base_url: String,
    pub api_key: Secret<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { name: "mockpay".to_string(), base_url: "http://localhost:4700".to_string(), api_key: Secret::default() }
    }
}

/// Connection details for an internal REST collaborator (the notification service, the customer profile service).
#[derive(Clone, Debug, Default)]
pub struct RemoteServiceConfig {
    pub base_url: String,
    pub api_key: Secret<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            callback_secret: Secret::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            cart_expiry_interval_secs: DEFAULT_CART_EXPIRY_INTERVAL_SECS,
            pricing: PricingConfig::default(),
            gateway: GatewayConfig::default(),
            notifier: RemoteServiceConfig::default(),
            profiles: RemoteServiceConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("CHECKOUT_HOST").ok().unwrap_or_else(|| DEFAULT_HOST.into());
        let port = env::var("CHECKOUT_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for CHECKOUT_PORT. {e} Using the default, {DEFAULT_PORT}, \
                         instead."
                    );
                    DEFAULT_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_PORT);
        let database_url = env::var("CHECKOUT_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ CHECKOUT_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.into()
        });
        let callback_secret = callback_secret_from_env();
        let use_x_forwarded_for = parse_boolean_flag(env::var("CHECKOUT_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("CHECKOUT_USE_FORWARDED").ok(), false);
        let cart_expiry_interval_secs = env_u64("CHECKOUT_CART_EXPIRY_INTERVAL", DEFAULT_CART_EXPIRY_INTERVAL_SECS);
        Self {
            host,
            port,
            database_url,
            callback_secret,
            use_x_forwarded_for,
            use_forwarded,
            cart_expiry_interval_secs,
            pricing: pricing_from_env(),
            gateway: gateway_from_env(),
            notifier: remote_service_from_env("CHECKOUT_NOTIFIER"),
            profiles: remote_service_from_env("CHECKOUT_PROFILES"),
        }
    }
}

fn callback_secret_from_env() -> Secret<String> {
    match env::var("CHECKOUT_CALLBACK_SECRET") {
        Ok(s) if !s.trim().is_empty() => Secret::new(s),
        _ => {
            let random: String = rand::thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect();
            warn!(
                "🪛️ CHECKOUT_CALLBACK_SECRET is not set. A random secret has been generated, but no gateway \
                 callback will verify against it. Set the shared secret for payment verification to work."
            );
            Secret::new(random)
        },
    }
}

fn pricing_from_env() -> PricingConfig {
    let defaults = PricingConfig::default();
    let tax_rate_bp = env::var("CHECKOUT_TAX_RATE_BP")
        .ok()
        .and_then(|s| {
            s.parse::<u32>()
                .map_err(|e| {
                    error!("🪛️ {s} is not a valid basis-point tax rate for CHECKOUT_TAX_RATE_BP. {e}");
                    e
                })
                .ok()
        })
        .unwrap_or(defaults.tax_rate_bp);
    let currency = env::var("CHECKOUT_CURRENCY").ok().unwrap_or(defaults.currency);
    let standard_shipping =
        Money::from(env_i64("CHECKOUT_STANDARD_SHIPPING", defaults.standard_shipping.value()));
    let express_shipping = Money::from(env_i64("CHECKOUT_EXPRESS_SHIPPING", defaults.express_shipping.value()));
    PricingConfig { tax_rate_bp, currency, standard_shipping, express_shipping }
}

fn gateway_from_env() -> GatewayConfig {
    let defaults = GatewayConfig::default();
    let name = env::var("CHECKOUT_GATEWAY_NAME").ok().unwrap_or(defaults.name);
    let base_url = env::var("CHECKOUT_GATEWAY_URL").ok().unwrap_or(defaults.base_url);
    let api_key = env::var("CHECKOUT_GATEWAY_API_KEY").map(Secret::new).unwrap_or_default();
    GatewayConfig { name, base_url, api_key }
}

fn remote_service_from_env(prefix: &str) -> RemoteServiceConfig {
    let base_url = env::var(format!("{prefix}_URL")).unwrap_or_default();
    let api_key = env::var(format!("{prefix}_API_KEY")).map(Secret::new).unwrap_or_default();
    RemoteServiceConfig { base_url, api_key }
}

fn env_i64(var: &str, default: i64) -> i64 {
    env::var(var)
        .ok()
        .and_then(|s| {
            s.parse::<i64>()
                .map_err(|e| {
                    error!("🪛️ {s} is not a valid value for {var}. {e} Using the default, {default}, instead.");
                    e
                })
                .ok()
        })
        .unwrap_or(default)
}

fn env_u64(var: &str, default: u64) -> u64 {
    env::var(var)
        .ok()
        .and_then(|s| {
            s.parse::<u64>()
                .map_err(|e| {
                    error!("🪛️ {s} is not a valid value for {var}. {e} Using the default, {default}, instead.");
                    e
                })
                .ok()
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8440);
        assert_eq!(config.pricing.tax_rate_bp, 1_000);
        assert_eq!(config.cart_expiry_interval_secs, 3_600);
        assert!(!config.use_x_forwarded_for);
    }

    #[test]
    fn env_overrides_apply() {
        std::env::set_var("CHECKOUT_PORT", "9000");
        std::env::set_var("CHECKOUT_TAX_RATE_BP", "1500");
        std::env::set_var("CHECKOUT_EXPRESS_SHIPPING", "2500");
        std::env::set_var("CHECKOUT_CALLBACK_SECRET", "hush");
        let config = ServerConfig::from_env_or_default();
        assert_eq!(config.port, 9000);
        assert_eq!(config.pricing.tax_rate_bp, 1_500);
        assert_eq!(config.pricing.express_shipping, Money::from(2_500));
        assert_eq!(config.callback_secret.reveal().as_str(), "hush");
        std::env::remove_var("CHECKOUT_PORT");
        std::env::remove_var("CHECKOUT_TAX_RATE_BP");
        std::env::remove_var("CHECKOUT_EXPRESS_SHIPPING");
        std::env::remove_var("CHECKOUT_CALLBACK_SECRET");
    }
}
