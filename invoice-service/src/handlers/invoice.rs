//! `/api/invoice`: issue an invoice for a dollar amount.

use axum::{
    body::Bytes,
    extract::State,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN,
        },
        StatusCode,
    },
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{CreateInvoiceRequest, CreateInvoiceResponse},
    models::InvoiceAmount,
    services::{invoicing, metrics},
    startup::AppState,
};

const ALLOW_ANY_ORIGIN: (axum::http::HeaderName, &str) = (ACCESS_CONTROL_ALLOW_ORIGIN, "*");

/// CORS preflight. Always succeeds with an empty body.
pub async fn preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            ALLOW_ANY_ORIGIN,
            (ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
            (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ],
    )
}

/// Any method other than POST or OPTIONS.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Issue an invoice to the configured recipient.
///
/// The body is read leniently: an empty, malformed or non-object body is
/// treated as one without an `amount`.
pub async fn create_invoice(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    ([ALLOW_ANY_ORIGIN], issue(&state, &body).await)
}

async fn issue(state: &AppState, body: &[u8]) -> Result<Json<CreateInvoiceResponse>, AppError> {
    let request = CreateInvoiceRequest::from_body(body);

    let amount =
        InvoiceAmount::parse(request.amount).map_err(|e| AppError::BadRequest(e.into()))?;

    let recipient = state.config.recipient.resolve().ok_or_else(|| {
        tracing::error!("Invoice requested but RECIPIENT_EMAIL is not set");
        AppError::ConfigError(anyhow::anyhow!("RECIPIENT_EMAIL not configured"))
    })?;

    tracing::info!(
        amount_cents = amount.cents.get(),
        recipient = %recipient.email,
        "Creating invoice"
    );

    let invoice = invoicing::issue_invoice(state.billing.as_ref(), &recipient, amount.cents)
        .await
        .map_err(|e| {
            tracing::error!(
                operation = %e.operation,
                error = %e.source,
                "Error creating invoice"
            );
            metrics::record_failure(e.operation);
            AppError::Upstream {
                error: "Failed to create invoice".to_string(),
                message: e.source.to_string(),
            }
        })?;

    metrics::record_invoice_sent(amount.cents);

    Ok(Json(CreateInvoiceResponse {
        success: true,
        invoice_id: invoice.id,
        invoice_url: invoice.hosted_invoice_url,
        amount: amount.original,
        amount_cents: amount.cents,
    }))
}
