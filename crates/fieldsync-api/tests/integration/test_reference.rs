//! Integration tests for reference-data fetches and searches
//!
//! Verifies tenant context parameters, both list response shapes, the
//! tolerant product field spellings, and the bounded request timeout.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_fetch_customers_sends_context_and_parses_paged_body() {
    let (server, client) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/api/demo/Os/entidades/mega/"))
        .and(query_param("empr", "1"))
        .and(query_param("fili", "1"))
        .and(query_param("limit", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"enti_clie": "10", "enti_empr": "1", "enti_nome": "OFICINA CENTRAL"},
                {"enti_clie": "11", "enti_empr": "1", "enti_nome": "AUTO PECAS SILVA"}
            ]
        })))
        .mount(&server)
        .await;

    let customers = client.fetch_customers(500).await.expect("fetch failed");

    assert_eq!(customers.len(), 2);
    assert_eq!(customers[0].enti_clie, "10");
    assert_eq!(customers[1].enti_nome, "AUTO PECAS SILVA");
}

#[tokio::test]
async fn test_fetch_products_scopes_to_company_only() {
    let (server, client) = common::setup().await;

    // Products are company-scoped; no branch parameter on this endpoint.
    Mock::given(method("GET"))
        .and(path("/api/demo/Os/produtos/mega/"))
        .and(query_param("empr", "1"))
        .and(query_param("limit", "500"))
        .and(query_param_is_missing("fili"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"prod_codi": "77", "prod_empr": "1", "prod_nome": "FILTRO DE OLEO", "preco_vista": 35.9},
            {"codigo": 78, "nome": "CORREIA DENTADA", "prod_preco_vista": 120.0}
        ])))
        .mount(&server)
        .await;

    let products = client.fetch_products(500).await.expect("fetch failed");

    assert_eq!(products.len(), 2);
    assert_eq!(products[0].prod_codi, "77");
    assert_eq!(products[0].preco_vista, 35.9);
    // Alternate spellings map onto the same fields.
    assert_eq!(products[1].prod_codi, "78");
    assert_eq!(products[1].prod_nome, "CORREIA DENTADA");
    assert_eq!(products[1].preco_vista, 120.0);
}

#[tokio::test]
async fn test_fetch_customers_error_status_fails() {
    let (server, client) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/api/demo/Os/entidades/mega/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(client.fetch_customers(500).await.is_err());
}

#[tokio::test]
async fn test_search_customers_sends_term_and_company_filter() {
    let (server, client) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/api/demo/entidades/entidades/"))
        .and(query_param("empr", "1"))
        .and(query_param("fili", "1"))
        .and(query_param("search", "silva"))
        .and(query_param("empresa", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"enti_clie": "11", "enti_empr": "2", "enti_nome": "AUTO PECAS SILVA"}
            ]
        })))
        .mount(&server)
        .await;

    let customers = client
        .search_customers("silva", Some("2"))
        .await
        .expect("search failed");

    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].natural_key(), "11-2");
}

#[tokio::test]
async fn test_search_customers_omits_company_filter_when_absent() {
    let (server, client) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/api/demo/entidades/entidades/"))
        .and(query_param("search", "silva"))
        .and(query_param_is_missing("empresa"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .mount(&server)
        .await;

    let customers = client
        .search_customers("silva", None)
        .await
        .expect("search failed");

    assert!(customers.is_empty());
}

#[tokio::test]
async fn test_search_products_sends_term_and_limit() {
    let (server, client) = common::setup().await;

    Mock::given(method("GET"))
        .and(path("/api/demo/produtos/produtos/"))
        .and(query_param("search", "filtro"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"prod_codi": "77", "prod_nome": "FILTRO DE OLEO"}
        ])))
        .mount(&server)
        .await;

    let products = client.search_products("filtro").await.expect("search failed");

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].prod_nome, "FILTRO DE OLEO");
}

#[tokio::test]
async fn test_search_gives_up_on_stalled_backend() {
    let (server, client) = common::setup().await;

    // The response stalls far longer than the request timeout tolerates
    Mock::given(method("GET"))
        .and(path("/api/demo/produtos/produtos/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(60)),
        )
        .mount(&server)
        .await;

    let result = tokio::time::timeout(Duration::from_secs(25), client.search_products("filtro"))
        .await
        .expect("search should fail fast instead of waiting out the stall");

    assert!(result.is_err());
}
