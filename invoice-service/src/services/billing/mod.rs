//! Billing platform abstraction.
//!
//! The service only needs six calls from the platform. They live behind
//! [`BillingProvider`] so the HTTP layer can run against Stripe in production
//! and against [`MockBillingProvider`] in tests and local development.

pub mod mock;
pub mod stripe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::models::Cents;

pub use mock::{MockBillingProvider, ProviderCall};
pub use stripe::StripeClient;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0}")]
    NotConfigured(String),

    /// The platform answered with an error body.
    #[error("{message}")]
    Api {
        status: u16,
        kind: Option<String>,
        code: Option<String>,
        message: String,
    },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response from billing provider: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The calls made against the billing platform, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOperation {
    FindCustomer,
    CreateCustomer,
    CreateInvoice,
    AddInvoiceItem,
    FinalizeInvoice,
    SendInvoice,
}

impl ProviderOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderOperation::FindCustomer => "find_customer",
            ProviderOperation::CreateCustomer => "create_customer",
            ProviderOperation::CreateInvoice => "create_invoice",
            ProviderOperation::AddInvoiceItem => "add_invoice_item",
            ProviderOperation::FinalizeInvoice => "finalize_invoice",
            ProviderOperation::SendInvoice => "send_invoice",
        }
    }
}

impl fmt::Display for ProviderOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Open,
    Paid,
    Uncollectible,
    Void,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
    #[serde(default)]
    pub hosted_invoice_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: String,
    #[serde(default)]
    pub invoice: Option<String>,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionMethod {
    /// Email the invoice; the customer pays it themselves.
    SendInvoice,
}

/// Parameters for a draft invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewInvoice {
    #[serde(rename = "customer")]
    pub customer_id: String,
    pub collection_method: CollectionMethod,
    pub days_until_due: u32,
    pub auto_advance: bool,
}

/// Parameters for a line item attached to an existing invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewInvoiceItem {
    #[serde(rename = "customer")]
    pub customer_id: String,
    #[serde(rename = "invoice")]
    pub invoice_id: String,
    pub amount: Cents,
    pub currency: String,
    pub description: String,
}

#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Look up the first customer registered with `email`.
    async fn find_customer_by_email(&self, email: &str)
        -> Result<Option<Customer>, ProviderError>;

    async fn create_customer(&self, email: &str, name: &str) -> Result<Customer, ProviderError>;

    async fn create_invoice(&self, invoice: &NewInvoice) -> Result<Invoice, ProviderError>;

    async fn add_invoice_item(&self, item: &NewInvoiceItem)
        -> Result<InvoiceItem, ProviderError>;

    async fn finalize_invoice(&self, invoice_id: &str) -> Result<Invoice, ProviderError>;

    async fn send_invoice(&self, invoice_id: &str) -> Result<Invoice, ProviderError>;

    fn is_configured(&self) -> bool;
}
