mod common;

use common::{recipient, spawn_app, test_config, RECIPIENT_EMAIL};
use invoice_service::config::StripeConfig;
use invoice_service::models::{Cents, Recipient};
use invoice_service::services::billing::{
    BillingProvider, CollectionMethod, InvoiceStatus, NewInvoice, NewInvoiceItem, ProviderError,
    StripeClient,
};
use invoice_service::services::issue_invoice;
use invoice_service::startup::INVOICE_PATH;
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET_KEY: &str = "sk_test_123";

fn stripe_client(server: &MockServer) -> StripeClient {
    StripeClient::new(StripeConfig {
        secret_key: Secret::new(SECRET_KEY.to_string()),
        api_base_url: format!("{}/v1", server.uri()),
        timeout_seconds: 5,
    })
    .expect("Failed to build Stripe client")
}

fn invoice_json(id: &str, status: &str, url: Option<&str>) -> Value {
    json!({
        "id": id,
        "object": "invoice",
        "customer": "cus_1",
        "status": status,
        "hosted_invoice_url": url,
    })
}

async fn mount_happy_path(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [],
            "has_more": false
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cus_1",
            "object": "customer",
            "email": RECIPIENT_EMAIL,
            "name": "Acme Corp"
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/invoices"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(invoice_json("in_1", "draft", None)),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/invoiceitems"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "ii_1",
            "object": "invoiceitem",
            "invoice": "in_1",
            "amount": 4999,
            "currency": "usd",
            "description": "Services"
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/invoices/in_1/finalize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(invoice_json(
            "in_1",
            "open",
            Some("https://invoice.stripe.com/i/in_1"),
        )))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/invoices/in_1/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(invoice_json(
            "in_1",
            "open",
            Some("https://invoice.stripe.com/i/in_1"),
        )))
        .mount(server)
        .await;
}

#[tokio::test]
async fn find_customer_queries_by_email_with_limit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/customers"))
        .and(query_param("email", RECIPIENT_EMAIL))
        .and(query_param("limit", "1"))
        .and(header("authorization", "Bearer sk_test_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [{ "id": "cus_existing", "email": RECIPIENT_EMAIL, "name": null }],
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let customer = stripe_client(&server)
        .find_customer_by_email(RECIPIENT_EMAIL)
        .await
        .expect("lookup failed")
        .expect("customer not found");

    assert_eq!(customer.id, "cus_existing");
    assert_eq!(customer.name, None);
}

#[tokio::test]
async fn find_customer_returns_none_for_empty_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let customer = stripe_client(&server)
        .find_customer_by_email(RECIPIENT_EMAIL)
        .await
        .expect("lookup failed");

    assert!(customer.is_none());
}

#[tokio::test]
async fn create_customer_posts_email_and_name() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/customers"))
        .and(body_string_contains("email=billing%40example.com"))
        .and(body_string_contains("name=Acme+Corp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cus_new",
            "email": RECIPIENT_EMAIL,
            "name": "Acme Corp"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let customer = stripe_client(&server)
        .create_customer(RECIPIENT_EMAIL, "Acme Corp")
        .await
        .expect("create failed");

    assert_eq!(customer.id, "cus_new");
}

#[tokio::test]
async fn create_invoice_sends_draft_terms() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/invoices"))
        .and(body_string_contains("customer=cus_1"))
        .and(body_string_contains("collection_method=send_invoice"))
        .and(body_string_contains("days_until_due=30"))
        .and(body_string_contains("auto_advance=false"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(invoice_json("in_1", "draft", None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let invoice = stripe_client(&server)
        .create_invoice(&NewInvoice {
            customer_id: "cus_1".to_string(),
            collection_method: CollectionMethod::SendInvoice,
            days_until_due: 30,
            auto_advance: false,
        })
        .await
        .expect("create failed");

    assert_eq!(invoice.id, "in_1");
    assert_eq!(invoice.status, Some(InvoiceStatus::Draft));
}

#[tokio::test]
async fn add_invoice_item_attaches_to_invoice() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/invoiceitems"))
        .and(body_string_contains("customer=cus_1"))
        .and(body_string_contains("invoice=in_1"))
        .and(body_string_contains("amount=4999"))
        .and(body_string_contains("currency=usd"))
        .and(body_string_contains("description=Services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "ii_1",
            "invoice": "in_1",
            "amount": 4999,
            "currency": "usd",
            "description": "Services"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let item = stripe_client(&server)
        .add_invoice_item(&NewInvoiceItem {
            customer_id: "cus_1".to_string(),
            invoice_id: "in_1".to_string(),
            amount: Cents::new(4999).unwrap(),
            currency: "usd".to_string(),
            description: "Services".to_string(),
        })
        .await
        .expect("create failed");

    assert_eq!(item.amount, 4999);
    assert_eq!(item.invoice.as_deref(), Some("in_1"));
}

#[tokio::test]
async fn api_errors_surface_stripe_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/invoices/in_missing/finalize"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "type": "invalid_request_error",
                "code": "resource_missing",
                "message": "No such invoice: 'in_missing'"
            }
        })))
        .mount(&server)
        .await;

    let error = stripe_client(&server)
        .finalize_invoice("in_missing")
        .await
        .unwrap_err();

    assert_eq!(error.to_string(), "No such invoice: 'in_missing'");
    match error {
        ProviderError::Api { status, code, .. } => {
            assert_eq!(status, 404);
            assert_eq!(code.as_deref(), Some("resource_missing"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn issues_invoice_end_to_end_against_stripe_api() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;

    let recipient = Recipient {
        email: RECIPIENT_EMAIL.to_string(),
        name: "Acme Corp".to_string(),
    };

    let invoice = issue_invoice(
        &stripe_client(&server),
        &recipient,
        Cents::new(4999).unwrap(),
    )
    .await
    .expect("issuing failed");

    assert_eq!(invoice.id, "in_1");
    assert_eq!(
        invoice.hosted_invoice_url.as_deref(),
        Some("https://invoice.stripe.com/i/in_1")
    );

    let requests = server.received_requests().await.expect("recording disabled");
    let paths: Vec<_> = requests
        .iter()
        .map(|r| format!("{} {}", r.method, r.url.path()))
        .collect();
    assert_eq!(
        paths,
        vec![
            "GET /v1/customers",
            "POST /v1/customers",
            "POST /v1/invoices",
            "POST /v1/invoiceitems",
            "POST /v1/invoices/in_1/finalize",
            "POST /v1/invoices/in_1/send",
        ]
    );
}

#[tokio::test]
async fn endpoint_reports_stripe_failure_on_invoice_creation() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/customers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "cus_1", "email": RECIPIENT_EMAIL }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/invoices"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "type": "invalid_request_error",
                "message": "This customer has no email address."
            }
        })))
        .mount(&server)
        .await;

    let stripe: Arc<dyn BillingProvider> = Arc::new(stripe_client(&server));
    let port = spawn_app(
        test_config(recipient(), Some(format!("{}/v1", server.uri()))),
        stripe,
    )
    .await;

    let response = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{}{}", port, INVOICE_PATH))
        .json(&json!({ "amount": 15 }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(
        body,
        json!({
            "error": "Failed to create invoice",
            "message": "This customer has no email address."
        })
    );

    let requests = server.received_requests().await.expect("recording disabled");
    assert!(!requests
        .iter()
        .any(|r| r.url.path() == "/v1/invoiceitems"));
}
