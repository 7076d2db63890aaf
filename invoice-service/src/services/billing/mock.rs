use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use super::{
    BillingProvider, Customer, Invoice, InvoiceItem, InvoiceStatus, NewInvoice, NewInvoiceItem,
    ProviderError, ProviderOperation,
};

/// A call received by [`MockBillingProvider`], with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    FindCustomerByEmail { email: String },
    CreateCustomer { email: String, name: String },
    CreateInvoice(NewInvoice),
    AddInvoiceItem(NewInvoiceItem),
    FinalizeInvoice { invoice_id: String },
    SendInvoice { invoice_id: String },
}

impl ProviderCall {
    pub fn operation(&self) -> ProviderOperation {
        match self {
            ProviderCall::FindCustomerByEmail { .. } => ProviderOperation::FindCustomer,
            ProviderCall::CreateCustomer { .. } => ProviderOperation::CreateCustomer,
            ProviderCall::CreateInvoice(_) => ProviderOperation::CreateInvoice,
            ProviderCall::AddInvoiceItem(_) => ProviderOperation::AddInvoiceItem,
            ProviderCall::FinalizeInvoice { .. } => ProviderOperation::FinalizeInvoice,
            ProviderCall::SendInvoice { .. } => ProviderOperation::SendInvoice,
        }
    }
}

#[derive(Default)]
struct MockState {
    customers: Vec<Customer>,
    invoices: HashMap<String, Invoice>,
    items: Vec<InvoiceItem>,
    calls: Vec<ProviderCall>,
    failures: HashMap<ProviderOperation, String>,
}

/// In-memory billing provider.
///
/// Keeps customers, invoices and line items in memory, follows the
/// draft -> open lifecycle, and records every call in order.
#[derive(Default)]
pub struct MockBillingProvider {
    state: Mutex<MockState>,
    sequence: AtomicU64,
}

impl MockBillingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing customer.
    pub async fn with_customer(self, email: &str, name: &str) -> Self {
        let id = self.next_id("cus");
        self.state.lock().await.customers.push(Customer {
            id,
            email: Some(email.to_string()),
            name: Some(name.to_string()),
        });
        self
    }

    /// Make every call to `operation` fail with `message`.
    pub async fn fail_on(self, operation: ProviderOperation, message: &str) -> Self {
        self.state
            .lock()
            .await
            .failures
            .insert(operation, message.to_string());
        self
    }

    pub async fn calls(&self) -> Vec<ProviderCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn customers(&self) -> Vec<Customer> {
        self.state.lock().await.customers.clone()
    }

    pub async fn invoice(&self, invoice_id: &str) -> Option<Invoice> {
        self.state.lock().await.invoices.get(invoice_id).cloned()
    }

    pub async fn items(&self) -> Vec<InvoiceItem> {
        self.state.lock().await.items.clone()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!(
            "{}_mock_{}",
            prefix,
            self.sequence.fetch_add(1, Ordering::SeqCst) + 1
        )
    }

    /// Record `call` and return the injected failure for it, if any.
    fn record(state: &mut MockState, call: ProviderCall) -> Result<(), ProviderError> {
        let operation = call.operation();
        state.calls.push(call);

        match state.failures.get(&operation) {
            Some(message) => Err(rejected(message.clone())),
            None => Ok(()),
        }
    }
}

fn rejected(message: String) -> ProviderError {
    ProviderError::Api {
        status: 400,
        kind: Some("invalid_request_error".to_string()),
        code: None,
        message,
    }
}

fn missing_invoice(invoice_id: &str) -> ProviderError {
    rejected(format!("No such invoice: '{}'", invoice_id))
}

#[async_trait]
impl BillingProvider for MockBillingProvider {
    async fn find_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Customer>, ProviderError> {
        let mut state = self.state.lock().await;
        Self::record(
            &mut state,
            ProviderCall::FindCustomerByEmail {
                email: email.to_string(),
            },
        )?;

        Ok(state
            .customers
            .iter()
            .find(|c| c.email.as_deref() == Some(email))
            .cloned())
    }

    async fn create_customer(&self, email: &str, name: &str) -> Result<Customer, ProviderError> {
        let mut state = self.state.lock().await;
        Self::record(
            &mut state,
            ProviderCall::CreateCustomer {
                email: email.to_string(),
                name: name.to_string(),
            },
        )?;

        let customer = Customer {
            id: self.next_id("cus"),
            email: Some(email.to_string()),
            name: Some(name.to_string()),
        };
        state.customers.push(customer.clone());

        tracing::info!(customer_id = %customer.id, "[MOCK] Customer created");
        Ok(customer)
    }

    async fn create_invoice(&self, invoice: &NewInvoice) -> Result<Invoice, ProviderError> {
        let mut state = self.state.lock().await;
        Self::record(&mut state, ProviderCall::CreateInvoice(invoice.clone()))?;

        if !state.customers.iter().any(|c| c.id == invoice.customer_id) {
            return Err(rejected(format!(
                "No such customer: '{}'",
                invoice.customer_id
            )));
        }

        let created = Invoice {
            id: self.next_id("in"),
            customer: Some(invoice.customer_id.clone()),
            status: Some(InvoiceStatus::Draft),
            hosted_invoice_url: None,
        };
        state.invoices.insert(created.id.clone(), created.clone());

        Ok(created)
    }

    async fn add_invoice_item(
        &self,
        item: &NewInvoiceItem,
    ) -> Result<InvoiceItem, ProviderError> {
        let mut state = self.state.lock().await;
        Self::record(&mut state, ProviderCall::AddInvoiceItem(item.clone()))?;

        match state.invoices.get(&item.invoice_id) {
            None => return Err(missing_invoice(&item.invoice_id)),
            Some(invoice) if invoice.status != Some(InvoiceStatus::Draft) => {
                return Err(rejected(format!(
                    "Invoice {} is not a draft and cannot be modified",
                    item.invoice_id
                )));
            }
            Some(_) => {}
        }

        let created = InvoiceItem {
            id: self.next_id("ii"),
            invoice: Some(item.invoice_id.clone()),
            amount: item.amount.get() as i64,
            currency: item.currency.clone(),
            description: Some(item.description.clone()),
        };
        state.items.push(created.clone());

        Ok(created)
    }

    async fn finalize_invoice(&self, invoice_id: &str) -> Result<Invoice, ProviderError> {
        let mut state = self.state.lock().await;
        Self::record(
            &mut state,
            ProviderCall::FinalizeInvoice {
                invoice_id: invoice_id.to_string(),
            },
        )?;

        let invoice = state
            .invoices
            .get_mut(invoice_id)
            .ok_or_else(|| missing_invoice(invoice_id))?;

        if invoice.status != Some(InvoiceStatus::Draft) {
            return Err(rejected(format!(
                "Invoice {} is already finalized",
                invoice_id
            )));
        }

        invoice.status = Some(InvoiceStatus::Open);
        invoice.hosted_invoice_url = Some(format!("https://invoice.mock.local/i/{}", invoice_id));

        Ok(invoice.clone())
    }

    async fn send_invoice(&self, invoice_id: &str) -> Result<Invoice, ProviderError> {
        let mut state = self.state.lock().await;
        Self::record(
            &mut state,
            ProviderCall::SendInvoice {
                invoice_id: invoice_id.to_string(),
            },
        )?;

        let invoice = state
            .invoices
            .get(invoice_id)
            .ok_or_else(|| missing_invoice(invoice_id))?;

        if invoice.status != Some(InvoiceStatus::Open) {
            return Err(rejected(format!(
                "Invoice {} must be finalized before it can be sent",
                invoice_id
            )));
        }

        tracing::info!(invoice_id = %invoice_id, "[MOCK] Invoice would be emailed");
        Ok(invoice.clone())
    }

    fn is_configured(&self) -> bool {
        true
    }
}
