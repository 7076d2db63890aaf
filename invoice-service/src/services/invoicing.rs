//! Issue an invoice to the configured recipient.
//!
//! Each step needs the identifier produced by the one before it, so the calls
//! run strictly in order and the first failure ends the run. Nothing created
//! by earlier steps is rolled back.

use thiserror::Error;

use super::billing::{
    BillingProvider, CollectionMethod, Customer, Invoice, NewInvoice, NewInvoiceItem,
    ProviderError, ProviderOperation,
};
use crate::models::{Cents, Recipient};

pub const CURRENCY: &str = "usd";
pub const LINE_ITEM_DESCRIPTION: &str = "Services";
pub const DAYS_UNTIL_DUE: u32 = 30;

/// A billing call failed part-way through issuing an invoice.
#[derive(Debug, Error)]
#[error("{operation} failed: {source}")]
pub struct InvoicingError {
    pub operation: ProviderOperation,
    #[source]
    pub source: ProviderError,
}

trait StepContext<T> {
    fn during(self, operation: ProviderOperation) -> Result<T, InvoicingError>;
}

impl<T> StepContext<T> for Result<T, ProviderError> {
    fn during(self, operation: ProviderOperation) -> Result<T, InvoicingError> {
        self.map_err(|source| InvoicingError { operation, source })
    }
}

/// Create, populate, finalize and send an invoice for `amount`.
///
/// Returns the invoice as reported by the send call.
#[tracing::instrument(skip_all, fields(recipient = %recipient.email, amount_cents = amount.get()))]
pub async fn issue_invoice(
    provider: &dyn BillingProvider,
    recipient: &Recipient,
    amount: Cents,
) -> Result<Invoice, InvoicingError> {
    let customer = resolve_customer(provider, recipient).await?;

    let draft = provider
        .create_invoice(&NewInvoice {
            customer_id: customer.id.clone(),
            collection_method: CollectionMethod::SendInvoice,
            days_until_due: DAYS_UNTIL_DUE,
            auto_advance: false,
        })
        .await
        .during(ProviderOperation::CreateInvoice)?;

    provider
        .add_invoice_item(&NewInvoiceItem {
            customer_id: customer.id.clone(),
            invoice_id: draft.id.clone(),
            amount,
            currency: CURRENCY.to_string(),
            description: LINE_ITEM_DESCRIPTION.to_string(),
        })
        .await
        .during(ProviderOperation::AddInvoiceItem)?;

    provider
        .finalize_invoice(&draft.id)
        .await
        .during(ProviderOperation::FinalizeInvoice)?;

    let sent = provider
        .send_invoice(&draft.id)
        .await
        .during(ProviderOperation::SendInvoice)?;

    tracing::info!(
        invoice_id = %sent.id,
        customer_id = %customer.id,
        "Invoice issued"
    );

    Ok(sent)
}

async fn resolve_customer(
    provider: &dyn BillingProvider,
    recipient: &Recipient,
) -> Result<Customer, InvoicingError> {
    let existing = provider
        .find_customer_by_email(&recipient.email)
        .await
        .during(ProviderOperation::FindCustomer)?;

    if let Some(customer) = existing {
        tracing::debug!(customer_id = %customer.id, "Reusing existing customer");
        return Ok(customer);
    }

    provider
        .create_customer(&recipient.email, &recipient.name)
        .await
        .during(ProviderOperation::CreateCustomer)
}
