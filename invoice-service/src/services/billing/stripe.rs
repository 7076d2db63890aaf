//! Stripe billing client.
//!
//! Talks to the Stripe REST API with form-encoded bodies and bearer
//! authentication using the account's secret key.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Deserialize};
use std::time::Duration;

use super::{
    BillingProvider, Customer, Invoice, InvoiceItem, NewInvoice, NewInvoiceItem, ProviderError,
};
use crate::config::StripeConfig;

/// Stripe client for the customer and invoice endpoints.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    config: StripeConfig,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

/// Stripe API error response.
#[derive(Debug, Deserialize)]
struct StripeError {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

#[derive(serde::Serialize)]
struct NewCustomer<'a> {
    email: &'a str,
    name: &'a str,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    fn ensure_configured(&self) -> Result<(), ProviderError> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(
                "Stripe secret key not configured".to_string(),
            ))
        }
    }

    /// Send an authenticated request and decode a successful body as `T`.
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, ProviderError> {
        self.ensure_configured()?;

        let response = request
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(operation, status = %status, "Stripe response");

        if status.is_success() {
            Ok(serde_json::from_str(&body)?)
        } else {
            let error = api_error(status, &body);
            tracing::error!(operation, status = %status, error = %error, "Stripe request failed");
            Err(error)
        }
    }
}

fn api_error(status: StatusCode, body: &str) -> ProviderError {
    match serde_json::from_str::<StripeError>(body) {
        Ok(StripeError { error }) => ProviderError::Api {
            status: status.as_u16(),
            message: error
                .message
                .unwrap_or_else(|| format!("Stripe returned {}", status)),
            kind: error.kind,
            code: error.code,
        },
        Err(_) => ProviderError::Api {
            status: status.as_u16(),
            kind: None,
            code: None,
            message: if body.trim().is_empty() {
                format!("Stripe returned {}", status)
            } else {
                body.to_string()
            },
        },
    }
}

#[async_trait]
impl BillingProvider for StripeClient {
    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Customer>, ProviderError> {
        let request = self
            .client
            .get(self.url("customers"))
            .query(&[("email", email), ("limit", "1")]);

        let customers: ListResponse<Customer> = self.execute("find_customer", request).await?;

        Ok(customers.data.into_iter().next())
    }

    async fn create_customer(&self, email: &str, name: &str) -> Result<Customer, ProviderError> {
        let request = self
            .client
            .post(self.url("customers"))
            .form(&NewCustomer { email, name });

        let customer: Customer = self.execute("create_customer", request).await?;

        tracing::info!(customer_id = %customer.id, "Stripe customer created");
        Ok(customer)
    }

    async fn create_invoice(&self, invoice: &NewInvoice) -> Result<Invoice, ProviderError> {
        let request = self.client.post(self.url("invoices")).form(invoice);

        let created: Invoice = self.execute("create_invoice", request).await?;

        tracing::info!(
            invoice_id = %created.id,
            customer_id = %invoice.customer_id,
            "Stripe draft invoice created"
        );
        Ok(created)
    }

    async fn add_invoice_item(
        &self,
        item: &NewInvoiceItem,
    ) -> Result<InvoiceItem, ProviderError> {
        let request = self.client.post(self.url("invoiceitems")).form(item);

        let created: InvoiceItem = self.execute("add_invoice_item", request).await?;

        tracing::info!(
            item_id = %created.id,
            invoice_id = %item.invoice_id,
            amount = created.amount,
            currency = %created.currency,
            "Stripe invoice item created"
        );
        Ok(created)
    }

    async fn finalize_invoice(&self, invoice_id: &str) -> Result<Invoice, ProviderError> {
        let request = self
            .client
            .post(self.url(&format!("invoices/{}/finalize", invoice_id)));

        let invoice: Invoice = self.execute("finalize_invoice", request).await?;

        tracing::info!(invoice_id = %invoice.id, status = ?invoice.status, "Stripe invoice finalized");
        Ok(invoice)
    }

    async fn send_invoice(&self, invoice_id: &str) -> Result<Invoice, ProviderError> {
        let request = self
            .client
            .post(self.url(&format!("invoices/{}/send", invoice_id)));

        let invoice: Invoice = self.execute("send_invoice", request).await?;

        tracing::info!(invoice_id = %invoice.id, "Stripe invoice sent");
        Ok(invoice)
    }

    fn is_configured(&self) -> bool {
        !self.config.secret_key.expose_secret().is_empty()
    }
}
