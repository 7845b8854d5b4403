//! Property-based tests for the HTTP boundary
//!
//! Arbitrary page specs and webhook signatures go through the real router.

mod common;

use axum::{body::Body, http::Request, http::StatusCode};
use common::*;
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Page spec tokens: numbers, ranges, junk, with stray whitespace
fn page_token() -> impl Strategy<Value = String> {
    prop_oneof![
        (0i64..8).prop_map(|n| n.to_string()),
        (0i64..8, 0i64..8).prop_map(|(a, b)| format!("{}-{}", a, b)),
        "[a-z]{1,3}",
        Just("-3".to_string()),
        Just(" 2 ".to_string()),
    ]
}

fn page_spec() -> impl Strategy<Value = String> {
    prop::collection::vec(page_token(), 1..5).prop_map(|tokens| tokens.join(","))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn split_never_rejects_a_nonempty_spec(spec in page_spec()) {
        let app = TestApp::new();
        let request = MultipartBuilder::new()
            .pdf("file", "in.pdf", &sample_pdf(4))
            .text("pageNumbers", &spec)
            .request("/pdf/split");

        let (status, bytes) = runtime().block_on(async {
            let response = app.send(request).await;
            let status = response.status();
            (status, body_bytes(response).await)
        });

        prop_assert_eq!(status, StatusCode::OK);
        prop_assert!(page_count(&bytes) <= 4);
    }

    #[test]
    fn forged_signatures_never_write_records(
        timestamp in 1_700_000_000i64..1_800_000_000,
        signature in "[0-9a-f]{64}",
    ) {
        let app = TestApp::new();
        let body = checkout_completed("cs_forged", "mallory", "merge").to_string();
        let request = Request::builder()
            .method("POST")
            .uri("/api/webhooks/stripe")
            .header("stripe-signature", format!("t={},v1={}", timestamp, signature))
            .body(Body::from(body))
            .unwrap();

        let (status, stored) = runtime().block_on(async {
            let status = app.send(request).await.status();
            (status, app.store.len().await)
        });

        prop_assert_eq!(status, StatusCode::BAD_REQUEST);
        prop_assert_eq!(stored, 0);
    }
}
