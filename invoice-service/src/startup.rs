//! Application startup and lifecycle management.

use crate::config::{InvoiceConfig, ProviderKind};
use crate::handlers;
use crate::services::{init_metrics, BillingProvider, MockBillingProvider, StripeClient};
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{metrics::metrics_middleware, tracing::request_id_middleware};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub const INVOICE_PATH: &str = "/api/invoice";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: InvoiceConfig,
    pub billing: Arc<dyn BillingProvider>,
}

/// Build the billing provider selected by configuration.
pub fn build_provider(config: &InvoiceConfig) -> Result<Arc<dyn BillingProvider>, AppError> {
    match config.provider {
        ProviderKind::Stripe => {
            let stripe = StripeClient::new(config.stripe.clone()).map_err(|e| {
                tracing::error!("Failed to create Stripe client: {}", e);
                AppError::InternalError(e.into())
            })?;
            Ok(Arc::new(stripe))
        }
        ProviderKind::Mock => {
            tracing::warn!("Using in-memory billing provider; no invoices will reach Stripe");
            Ok(Arc::new(MockBillingProvider::new()))
        }
    }
}

/// Routes of the service, without binding a listener.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route(
            INVOICE_PATH,
            post(handlers::invoice::create_invoice)
                .options(handlers::invoice::preflight)
                .fallback(handlers::invoice::method_not_allowed),
        )
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the provider named in `config`.
    pub async fn build(config: InvoiceConfig) -> Result<Self, AppError> {
        let billing = build_provider(&config)?;
        Self::build_with_provider(config, billing).await
    }

    /// Build the application around an existing billing provider.
    pub async fn build_with_provider(
        config: InvoiceConfig,
        billing: Arc<dyn BillingProvider>,
    ) -> Result<Self, AppError> {
        init_metrics();

        if billing.is_configured() {
            tracing::info!("Billing provider initialized");
        } else {
            tracing::warn!("Stripe secret key not configured - invoice requests will fail");
        }

        if config.recipient.resolve().is_none() {
            tracing::warn!("RECIPIENT_EMAIL not configured - invoice requests will fail");
        }

        // Port 0 binds a random port for testing
        let addr = (config.common.host.as_str(), config.common.port);
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(
                "Failed to bind HTTP listener to {}:{}: {}",
                config.common.host,
                config.common.port,
                e
            );
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Invoice service: HTTP on port {}", port);

        let state = AppState { config, billing };

        Ok(Self {
            port,
            listener,
            router: router(state),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }
}
