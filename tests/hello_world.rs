//local shortcuts
mod common;
use common::*;

//third-party shortcuts
use futures::SinkExt;
use marketflow_fanout::{MarketDataMessage, RoutingKey, ServerConfig};

//standard shortcuts

//-------------------------------------------------------------------------------------------------------------------

fn msg(exchange: &str, symbol: &str, data_type: &str) -> MarketDataMessage
{
    MarketDataMessage{
        routing_key: RoutingKey::new(exchange, symbol, data_type),
        timestamp: 1,
        payload: serde_json::json!({ "price": 42 }),
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// E1 — exact match: a subscriber with no wildcards receives exactly the one matching message.
#[tokio::test]
async fn exact_match_delivers_one_frame()
{
    let (addr, supervisor) = start_server(ServerConfig::default()).await;
    let mut ws = connect_ws(addr).await;
    expect_welcome(&mut ws).await;

    ws.send(subscribe_frame(&["binance"], &["BTCUSDT"], &["trade"])).await.unwrap();
    let subscribed = next_json(&mut ws).await;
    assert_eq!(subscribed["type"], "subscribed");

    let router = supervisor.router();
    router.dispatch(&msg("binance", "BTCUSDT", "trade"));

    let data = next_json(&mut ws).await;
    assert_eq!(data["type"], "data");
    assert_eq!(data["payload"]["exchange"], "binance");
    assert_eq!(data["payload"]["symbol"], "BTCUSDT");
    assert_eq!(data["payload"]["data"]["price"], 42);
}

/// E2 — wildcard: a filter that wildcards exchange and symbol matches every dataType == "ticker"
/// message and nothing else.
#[tokio::test]
async fn wildcard_filter_matches_only_its_data_type()
{
    let (addr, supervisor) = start_server(ServerConfig::default()).await;
    let mut ws = connect_ws(addr).await;
    expect_welcome(&mut ws).await;

    ws.send(subscribe_frame(&[], &[], &["ticker"])).await.unwrap();
    next_json(&mut ws).await; // subscribed

    let router = supervisor.router();
    router.dispatch(&msg("okex", "ETHUSDT", "ticker"));
    router.dispatch(&msg("binance", "BTCUSDT", "ticker"));
    router.dispatch(&msg("binance", "BTCUSDT", "trade"));

    let first = next_json(&mut ws).await;
    assert_eq!(first["payload"]["exchange"], "okex");
    let second = next_json(&mut ws).await;
    assert_eq!(second["payload"]["exchange"], "binance");

    // the trade message never arrives: confirm nothing else shows up promptly.
    let raced = tokio::time::timeout(std::time::Duration::from_millis(200), next_json(&mut ws)).await;
    assert!(raced.is_err(), "no third frame should have been delivered");
}

/// E3 — multi-filter dedup: two filters on the same session that both match one message still
/// produce exactly one `data` frame.
#[tokio::test]
async fn multiple_matching_filters_deliver_once()
{
    let (addr, supervisor) = start_server(ServerConfig::default()).await;
    let mut ws = connect_ws(addr).await;
    expect_welcome(&mut ws).await;

    ws.send(subscribe_frame(&["binance"], &[], &["trade"])).await.unwrap();
    next_json(&mut ws).await;
    ws.send(subscribe_frame(&[], &["BTCUSDT"], &[])).await.unwrap();
    next_json(&mut ws).await;

    supervisor.router().dispatch(&msg("binance", "BTCUSDT", "trade"));

    let data = next_json(&mut ws).await;
    assert_eq!(data["type"], "data");

    let raced = tokio::time::timeout(std::time::Duration::from_millis(200), next_json(&mut ws)).await;
    assert!(raced.is_err(), "the session must not receive a second frame for one message");
}

/// E4 — unsubscribe: once `unsubscribed` is observed, no further matching dispatch delivers.
#[tokio::test]
async fn unsubscribe_stops_delivery()
{
    let (addr, supervisor) = start_server(ServerConfig::default()).await;
    let mut ws = connect_ws(addr).await;
    expect_welcome(&mut ws).await;

    ws.send(subscribe_frame(&["binance"], &["BTCUSDT"], &["trade"])).await.unwrap();
    let subscribed = next_json(&mut ws).await;
    let filter_id = subscribed["filterId"].as_str().unwrap().to_string();

    ws.send(text(serde_json::json!({ "type": "unsubscribe", "filterId": filter_id }).to_string())).await.unwrap();
    let unsubscribed = next_json(&mut ws).await;
    assert_eq!(unsubscribed["type"], "unsubscribed");
    assert_eq!(unsubscribed["filterId"], filter_id);

    supervisor.router().dispatch(&msg("binance", "BTCUSDT", "trade"));

    let raced = tokio::time::timeout(std::time::Duration::from_millis(200), next_json(&mut ws)).await;
    assert!(raced.is_err(), "no data frame should arrive after the unsubscribe is acknowledged");
}

#[tokio::test]
async fn ping_is_echoed_as_pong()
{
    let (addr, _supervisor) = start_server(ServerConfig::default()).await;
    let mut ws = connect_ws(addr).await;
    expect_welcome(&mut ws).await;

    ws.send(text(serde_json::json!({ "type": "ping", "timestamp": 1234 }).to_string())).await.unwrap();
    let pong = next_json(&mut ws).await;
    assert_eq!(pong["type"], "pong");
    assert_eq!(pong["timestamp"], 1234);
}

/// A filter declaring an oversize token fails admission's structural validation and is rejected
/// with `INVALID_FILTER`, without registering a filter the subscriber could later rely on.
#[tokio::test]
async fn oversize_token_is_rejected_as_invalid_filter()
{
    let (addr, _supervisor) = start_server(ServerConfig::default()).await;
    let mut ws = connect_ws(addr).await;
    expect_welcome(&mut ws).await;

    let oversize_symbol = "x".repeat(64);
    ws.send(subscribe_frame(&["binance"], &[&oversize_symbol], &["trade"])).await.unwrap();

    let err = next_json(&mut ws).await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["code"], "INVALID_FILTER");
}

/// A filter wildcarding all three dimensions is valid and matches every message (the
/// "match-all" edge case in spec.md §4.C), not structurally invalid.
#[tokio::test]
async fn all_wildcard_filter_matches_everything()
{
    let (addr, supervisor) = start_server(ServerConfig::default()).await;
    let mut ws = connect_ws(addr).await;
    expect_welcome(&mut ws).await;

    ws.send(subscribe_frame(&[], &[], &[])).await.unwrap();
    let subscribed = next_json(&mut ws).await;
    assert_eq!(subscribed["type"], "subscribed");

    supervisor.router().dispatch(&msg("anything", "goes", "here"));
    let data = next_json(&mut ws).await;
    assert_eq!(data["type"], "data");
}

#[tokio::test]
async fn malformed_json_reports_protocol_error_without_closing()
{
    let (addr, _supervisor) = start_server(ServerConfig::default()).await;
    let mut ws = connect_ws(addr).await;
    expect_welcome(&mut ws).await;

    ws.send(text("not json at all")).await.unwrap();
    let err = next_json(&mut ws).await;
    assert_eq!(err["type"], "error");
    assert_eq!(err["code"], "PROTOCOL");

    // the session is still alive: a valid ping still gets a pong.
    ws.send(text(serde_json::json!({ "type": "ping", "timestamp": 1 }).to_string())).await.unwrap();
    let pong = next_json(&mut ws).await;
    assert_eq!(pong["type"], "pong");
}
