use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Cents;

/// Body of `POST /api/invoice`.
///
/// `amount` is kept as raw JSON; validation happens in
/// [`crate::models::InvoiceAmount::parse`].
#[derive(Debug, Default, Deserialize)]
pub struct CreateInvoiceRequest {
    #[serde(default)]
    pub amount: Option<Value>,
}

impl CreateInvoiceRequest {
    /// Read a raw request body.
    ///
    /// Only a JSON object can carry `amount`. Empty, malformed and non-object
    /// bodies yield a request without one.
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(mut fields)) => Self {
                amount: fields.remove("amount"),
            },
            Ok(other) => {
                tracing::debug!(kind = json_kind(&other), "Request body is not a JSON object");
                Self::default()
            }
            Err(e) => {
                tracing::debug!(error = %e, "Request body is not valid JSON");
                Self::default()
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceResponse {
    pub success: bool,
    pub invoice_id: String,
    pub invoice_url: Option<String>,
    pub amount: Value,
    pub amount_cents: Cents,
}
