//! Integration tests for the catalog client against a mock dummyjson server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Url;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use storefront::catalog::{CatalogClient, ProductsParams};
use storefront::error::ErrorKind;
use storefront::fetch::{FetchClient, FetchConfig};
use storefront::notification::Notification;
use storefront::retry::RetryPolicy;

fn product(id: u64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": "",
        "price": 10.0,
        "discountPercentage": 0.0,
        "rating": 4.0,
        "stock": 5,
        "brand": "Acme",
        "category": "smartphones",
        "thumbnail": "",
        "images": []
    })
}

fn page(products: Vec<Value>, total: u64, skip: u64, limit: u64) -> Value {
    json!({"products": products, "total": total, "skip": skip, "limit": limit})
}

fn catalog(server: &MockServer) -> CatalogClient {
    CatalogClient::new(
        Url::parse(&server.uri()).unwrap(),
        FetchClient::builder().build().unwrap(),
    )
    .unwrap()
    .with_fetch_config(FetchConfig::silent())
    .with_retry_policy(
        RetryPolicy::new(3, Duration::from_millis(5)).with_jitter(Duration::ZERO),
    )
}

#[tokio::test]
async fn test_fetch_products_sends_paging() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .and(query_param("limit", "24"))
        .and(query_param("skip", "48"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![product(49, "Phone")],
            194,
            48,
            24,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let response = catalog(&server)
        .fetch_products(&ProductsParams::page(24, 2))
        .await
        .unwrap();

    assert_eq!(response.total, 194);
    assert_eq!(response.products[0].id, 49);
    assert_eq!(response.products[0].brand, "Acme");
}

#[tokio::test]
async fn test_fetch_products_in_category() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/category/smartphones"))
        .and(query_param("limit", "10"))
        .and(query_param("skip", "0"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(vec![product(1, "Phone")], 1, 0, 10)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let params = ProductsParams::default().with_category("smartphones");
    let response = catalog(&server).fetch_products(&params).await.unwrap();
    assert_eq!(response.products.len(), 1);
}

#[tokio::test]
async fn test_fetch_categories_accepts_mixed_shapes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            "beauty",
            {"slug": "fragrances", "name": "Fragrances", "url": "https://dummyjson.com/products/category/fragrances"},
            {"slug": "furniture"},
            {"title": "Groceries"},
            7
        ])))
        .mount(&server)
        .await;

    let categories = catalog(&server).fetch_categories().await.unwrap();
    assert_eq!(
        categories,
        vec!["beauty", "Fragrances", "furniture", "Groceries", "7"]
    );
}

#[tokio::test]
async fn test_fetch_categories_non_array_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"categories": ["beauty"]})))
        .mount(&server)
        .await;

    assert!(catalog(&server).fetch_categories().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_search_products() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/search"))
        .and(query_param("q", "phone case"))
        .and(query_param("limit", "5"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(vec![product(3, "Phone Case")], 1, 0, 5)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let products = catalog(&server).search_products("phone case", 5).await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].title, "Phone Case");
}

#[tokio::test]
async fn test_blank_search_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    assert!(catalog(&server).search_products("  ", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_product_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/9999"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"message": "Product with id '9999' not found"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let error = catalog(&server).fetch_product(9999).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
    assert_eq!(error.message(), "Product with id '9999' not found");
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product(1, "Phone")))
        .expect(1)
        .mount(&server)
        .await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let catalog = catalog(&server).with_notifier(Arc::new(move |n: &Notification| {
        sink.lock().unwrap().push(n.clone())
    }));

    let product = catalog.fetch_product(1).await.unwrap();
    assert_eq!(product.title, "Phone");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(matches!(
        seen[0],
        Notification::Retrying { attempt: 1, max_attempts: 3, .. }
    ));
}

#[tokio::test]
async fn test_exhausted_retries_report_last_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(502).set_body_json(json!({"message": "bad gateway"})))
        .expect(3)
        .mount(&server)
        .await;

    let error = catalog(&server)
        .fetch_products(&ProductsParams::default())
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Server);
    assert_eq!(error.status_code(), Some(502));
    assert_eq!(error.message(), "bad gateway");
}
