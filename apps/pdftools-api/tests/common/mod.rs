//! Shared helpers for driving the router in-process

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use access_core::{sign_payload, Clock, InMemoryAccessStore, ManualClock};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use lopdf::{content::Content, content::Operation, Dictionary, Document, Object, Stream};
use pdftools_api::build_router;
use pdftools_api::config::Settings;
use pdftools_api::state::AppState;
use pdftools_api::stripe::{CheckoutGateway, CheckoutRequest, CheckoutSession, GatewayError};
use tower::ServiceExt;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Records checkout requests and hands out sequential session ids
#[derive(Default)]
pub struct FakeGateway {
    pub requests: Mutex<Vec<CheckoutRequest>>,
}

#[async_trait]
impl CheckoutGateway for FakeGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        let id = format!("cs_test_{}", requests.len());
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.stripe.test/{}", id)),
            id,
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryAccessStore>,
    pub clock: Arc<ManualClock>,
    pub gateway: Arc<FakeGateway>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(Settings {
            webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            ..Settings::default()
        })
    }

    pub fn requiring_payment() -> Self {
        Self::with_settings(Settings {
            webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            require_payment: true,
            ..Settings::default()
        })
    }

    pub fn with_settings(settings: Settings) -> Self {
        let store = Arc::new(InMemoryAccessStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        ));
        let gateway = Arc::new(FakeGateway::default());

        let state = AppState::from_parts(
            store.clone(),
            clock.clone(),
            Some(gateway.clone() as Arc<dyn CheckoutGateway>),
            settings,
        );

        Self {
            router: build_router(Arc::new(state)),
            store,
            clock,
            gateway,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Deliver a correctly signed webhook
    pub async fn deliver_webhook(&self, event: &serde_json::Value) -> Response<Body> {
        let body = serde_json::to_vec(event).unwrap();
        let signature = sign_payload(&body, self.clock.now().timestamp(), WEBHOOK_SECRET).unwrap();
        self.send(
            Request::builder()
                .method("POST")
                .uri("/api/webhooks/stripe")
                .header("stripe-signature", signature)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }
}

pub fn checkout_completed(session_id: &str, user_id: &str, tool_id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": format!("evt_{}", session_id),
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "object": "checkout.session",
                "amount_total": 199,
                "payment_intent": format!("pi_{}", session_id),
                "metadata": { "userId": user_id, "toolId": tool_id }
            }
        }
    })
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn header_str<'a>(response: &'a Response<Body>, name: header::HeaderName) -> &'a str {
    response.headers().get(name).unwrap().to_str().unwrap()
}

/// Hand-built multipart/form-data body
pub struct MultipartBuilder {
    boundary: &'static str,
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self {
            boundary: "----pdftools-test-boundary",
            body: Vec::new(),
        }
    }

    pub fn file(mut self, field: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, field, file_name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn pdf(self, field: &str, file_name: &str, bytes: &[u8]) -> Self {
        self.file(field, file_name, "application/pdf", bytes)
    }

    pub fn text(mut self, field: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, field, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn request(mut self, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

/// A PDF with `num_pages` Letter pages, each drawing `"Page {n}"`
pub fn sample_pdf(num_pages: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));

    let mut kids = Vec::new();
    for i in 0..num_pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), Object::Integer(24)],
                ),
                Operation::new("Td", vec![Object::Integer(72), Object::Integer(700)]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("Page {}", i + 1))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().unwrap(),
        ));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
            (
                "Resources",
                Object::Dictionary(Dictionary::from_iter(vec![(
                    "Font",
                    Object::Dictionary(Dictionary::from_iter(vec![(
                        "F1",
                        Object::Reference(font_id),
                    )])),
                )])),
            ),
        ]));
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(num_pages as i64)),
            ("Kids", Object::Array(kids)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

pub fn page_count(bytes: &[u8]) -> usize {
    Document::load_mem(bytes).unwrap().get_pages().len()
}
