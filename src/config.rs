use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::models::PaymentMethodKind;

const DEFAULT_CURRENCY: &str = "INR";
const CONFIG_DIR: &str = "config";
const ENV_PREFIX: &str = "CHECKOUT";

/// Engine configuration, loaded once by the embedding application and
/// passed into the services explicitly. There is no hidden global
/// settings record; a disabled method is rejected at placement time.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CheckoutConfig {
    /// ISO 4217 currency code used for orders and gateway amounts.
    #[serde(default = "default_currency")]
    #[validate(length(min = 3, max = 3, message = "Currency must be 3 characters"))]
    pub currency: String,

    /// Enable cash on delivery.
    #[serde(default = "default_true_bool")]
    pub cod_enabled: bool,

    /// Enable payment from the customer's wallet balance.
    #[serde(default = "default_true_bool")]
    pub wallet_enabled: bool,

    /// Enable the external payment gateway.
    #[serde(default = "default_true_bool")]
    pub gateway_enabled: bool,

    /// Gateway API key identifier.
    #[serde(default)]
    pub gateway_key_id: Option<String>,

    /// Shared secret used to verify gateway callback signatures.
    /// Required whenever the gateway is enabled.
    #[serde(default)]
    pub gateway_secret: Option<String>,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            cod_enabled: true,
            wallet_enabled: true,
            gateway_enabled: true,
            gateway_key_id: None,
            gateway_secret: None,
        }
    }
}

impl CheckoutConfig {
    /// Loads configuration from `config/checkout.*` (optional) layered
    /// with `CHECKOUT_*` environment variables, then validates it.
    pub fn load() -> Result<Self, ConfigError> {
        let cfg: Self = Config::builder()
            .add_source(File::with_name(&format!("{}/checkout", CONFIG_DIR)).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;

        cfg.validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        if cfg.gateway_enabled && cfg.gateway_secret.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::Message(
                "gateway_secret is required when the gateway is enabled".to_string(),
            ));
        }

        info!(
            currency = %cfg.currency,
            cod = cfg.cod_enabled,
            wallet = cfg.wallet_enabled,
            gateway = cfg.gateway_enabled,
            "checkout configuration loaded"
        );
        Ok(cfg)
    }

    pub fn is_method_enabled(&self, kind: PaymentMethodKind) -> bool {
        match kind {
            PaymentMethodKind::Cod => self.cod_enabled,
            PaymentMethodKind::Wallet => self.wallet_enabled,
            PaymentMethodKind::Gateway => self.gateway_enabled,
        }
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_true_bool() -> bool {
    true
}
