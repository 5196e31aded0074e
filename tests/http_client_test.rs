//! Provider clients against a mock HTTP server.

use axlens::core::http::default_client;
use axlens::error::AxlensError;
use axlens::providers::axelarscan::AxelarscanClient;
use axlens::providers::dune::DuneClient;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn dune(server: &MockServer) -> DuneClient {
    DuneClient::new(default_client().unwrap(), "test-key".to_string()).with_base_url(server.uri())
}

#[tokio::test]
async fn platform_activity_parses_and_sorts_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query/5575605/results"))
        .and(query_param("api_key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "rows": [
                    {"date": "2024-02-01 00:00:00", "platform": "squid", "num_txs": 5.0, "volume": 100.0},
                    {"date": "2024-01-01 00:00:00", "platform": "squid", "num_txs": 3.0, "volume": 50.0},
                    {"date": "not a date", "platform": "junk", "num_txs": 1.0, "volume": 1.0}
                ]
            }
        })))
        .mount(&server)
        .await;

    let rows = dune(&server).platform_activity().await.unwrap();
    // The malformed row is dropped; the rest come back ascending by date.
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].date.date_naive().to_string(), "2024-01-01");
    assert_eq!(rows[1].num_txs, 5.0);
}

#[tokio::test]
async fn chain_tvl_coerces_string_values() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query/5524904/results"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {
                "rows": [
                    {"Chain": "ethereum", "Token Symbol": "axlUSDC", "TVL": "250.5"},
                    {"Chain": "osmosis", "Token Symbol": null, "TVL": 1000.0}
                ]
            }
        })))
        .mount(&server)
        .await;

    let rows = dune(&server).chain_tvl().await.unwrap();
    assert_eq!(rows.len(), 2);
    // Descending by TVL.
    assert_eq!(rows[0].chain, "osmosis");
    assert_eq!(rows[0].token_symbol, None);
    assert_eq!(rows[1].tvl, 250.5);
}

#[tokio::test]
async fn non_success_status_maps_to_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(402))
        .mount(&server)
        .await;

    let err = dune(&server).chain_tvl().await.unwrap_err();
    assert!(err.is_retryable());
    match err {
        AxlensError::Http { status, .. } => assert_eq!(status, 402),
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_maps_to_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = dune(&server).chain_tvl().await.unwrap_err();
    assert!(matches!(err, AxlensError::ParseResponse(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn route_stats_flatten_the_chain_tree() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gmp/GMPStatsByChains"))
        .and(query_param("contractAddress", "0xgateway"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "source_chains": [
                {
                    "key": "ethereum",
                    "destination_chains": [
                        {"key": "osmosis", "volume": 42.0, "num_txs": 7.0}
                    ]
                }
            ]
        })))
        .mount(&server)
        .await;

    let client = AxelarscanClient::new(default_client().unwrap()).with_base_url(server.uri());
    let routes = client.route_stats("0xgateway").await.unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].path(), "ethereum ➡ osmosis");
    assert_eq!(routes[0].volume_usd, 42.0);
    assert_eq!(routes[0].num_txs, 7.0);
}

#[tokio::test]
async fn all_route_stats_combines_contracts() {
    let server = MockServer::start().await;
    // Same body for both tracked contracts.
    Mock::given(method("GET"))
        .and(path("/gmp/GMPStatsByChains"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "source_chains": [
                {
                    "key": "fantom",
                    "destination_chains": [{"key": "polygon", "volume": 1.0, "num_txs": 1.0}]
                }
            ]
        })))
        .mount(&server)
        .await;

    let client = AxelarscanClient::new(default_client().unwrap()).with_base_url(server.uri());
    let routes = client.all_route_stats().await.unwrap();
    // One row per tracked gateway contract.
    assert_eq!(routes.len(), 2);
}
