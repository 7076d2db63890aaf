pub mod billing;
pub mod invoicing;
pub mod metrics;

pub use billing::{BillingProvider, MockBillingProvider, StripeClient};
pub use invoicing::issue_invoice;
pub use metrics::{get_metrics, init_metrics};
