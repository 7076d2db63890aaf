use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

use crate::models::Recipient;

pub const DEFAULT_STRIPE_API_BASE_URL: &str = "https://api.stripe.com/v1";
const DEFAULT_STRIPE_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub stripe: StripeConfig,
    pub recipient: RecipientConfig,
    pub provider: ProviderKind,
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    pub secret_key: Secret<String>,
    pub api_base_url: String,
    pub timeout_seconds: u64,
}

/// Who receives every invoice this service issues.
///
/// Both fields are optional at startup; a missing email is reported per
/// request rather than refusing to boot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipientConfig {
    pub email: Option<String>,
    pub name: Option<String>,
}

impl RecipientConfig {
    /// Resolve the recipient, defaulting the name to the email.
    pub fn resolve(&self) -> Option<Recipient> {
        let email = self.email.as_deref().filter(|e| !e.is_empty())?;
        let name = self
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(email);

        Some(Recipient {
            email: email.to_string(),
            name: name.to_string(),
        })
    }
}

/// Backend used for billing calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Stripe,
    /// In-memory provider for local development.
    Mock,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stripe" => Ok(ProviderKind::Stripe),
            "mock" => Ok(ProviderKind::Mock),
            other => Err(anyhow::anyhow!("Unknown billing provider: {}", other)),
        }
    }
}

impl InvoiceConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let timeout_seconds = match non_empty_env("STRIPE_TIMEOUT_SECONDS") {
            Some(raw) => raw.parse().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!(
                    "STRIPE_TIMEOUT_SECONDS must be a whole number of seconds: {}",
                    e
                ))
            })?,
            None => DEFAULT_STRIPE_TIMEOUT_SECONDS,
        };

        let provider = match non_empty_env("BILLING_PROVIDER") {
            Some(raw) => raw.parse().map_err(AppError::ConfigError)?,
            None => ProviderKind::default(),
        };

        Ok(Self {
            common,
            stripe: StripeConfig {
                secret_key: Secret::new(env::var("STRIPE_SECRET_KEY").unwrap_or_default()),
                api_base_url: non_empty_env("STRIPE_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_STRIPE_API_BASE_URL.to_string()),
                timeout_seconds,
            },
            recipient: RecipientConfig {
                email: non_empty_env("RECIPIENT_EMAIL"),
                name: non_empty_env("RECIPIENT_NAME"),
            },
            provider,
            service_name: "invoice-service".to_string(),
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}
