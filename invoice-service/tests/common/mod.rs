#![allow(dead_code)]

use invoice_service::config::{
    InvoiceConfig, ProviderKind, RecipientConfig, StripeConfig, DEFAULT_STRIPE_API_BASE_URL,
};
use invoice_service::services::{BillingProvider, MockBillingProvider};
use invoice_service::startup::{Application, INVOICE_PATH};
use secrecy::Secret;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;

pub const RECIPIENT_EMAIL: &str = "billing@example.com";
pub const RECIPIENT_NAME: &str = "Acme Corp";

pub fn recipient() -> RecipientConfig {
    RecipientConfig {
        email: Some(RECIPIENT_EMAIL.to_string()),
        name: Some(RECIPIENT_NAME.to_string()),
    }
}

pub fn test_config(recipient: RecipientConfig, stripe_base_url: Option<String>) -> InvoiceConfig {
    InvoiceConfig {
        common: CoreConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
            ..CoreConfig::default()
        },
        stripe: StripeConfig {
            secret_key: Secret::new("sk_test_123".to_string()),
            api_base_url: stripe_base_url
                .unwrap_or_else(|| DEFAULT_STRIPE_API_BASE_URL.to_string()),
            timeout_seconds: 5,
        },
        recipient,
        provider: ProviderKind::Mock,
        service_name: "invoice-service-test".to_string(),
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub billing: Arc<MockBillingProvider>,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Spawn with a configured recipient and an empty in-memory provider.
    pub async fn spawn() -> Self {
        Self::spawn_with(recipient(), MockBillingProvider::new()).await
    }

    pub async fn spawn_with(recipient: RecipientConfig, billing: MockBillingProvider) -> Self {
        let billing = Arc::new(billing);
        let port = spawn_app(test_config(recipient, None), billing.clone()).await;

        TestApp {
            address: format!("http://127.0.0.1:{}", port),
            port,
            billing,
            client: reqwest::Client::new(),
        }
    }

    pub fn invoice_url(&self) -> String {
        format!("{}{}", self.address, INVOICE_PATH)
    }

    pub async fn post_invoice(&self, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.invoice_url())
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Build and run an application, returning its port once it answers.
pub async fn spawn_app(config: InvoiceConfig, billing: Arc<dyn BillingProvider>) -> u16 {
    let app = Application::build_with_provider(config, billing)
        .await
        .expect("Failed to build test application");

    let port = app.port();

    tokio::spawn(async move {
        app.run_until_stopped().await.ok();
    });

    // Wait for HTTP server to be ready by polling health endpoint
    let client = reqwest::Client::new();
    let health_url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        if client.get(&health_url).send().await.is_ok() {
            break;
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    }

    port
}
