use invoice_service::{config::InvoiceConfig, Application};
use service_core::observability::{init_tracing, shutdown_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = InvoiceConfig::load()?;

    init_tracing(
        &config.service_name,
        &config.common.log_level,
        config.common.log_format,
        config.common.otlp_endpoint.as_deref(),
    );

    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    shutdown_tracing();

    Ok(())
}
