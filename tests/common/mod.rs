//local shortcuts
use marketflow_fanout::{build_router_default, ServerConfig, Supervisor};

//third-party shortcuts
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite;

//standard shortcuts
use std::net::SocketAddr;

//-------------------------------------------------------------------------------------------------------------------

pub type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

//-------------------------------------------------------------------------------------------------------------------

/// Spawn the fan-out server on an ephemeral port and return its address and [`Supervisor`]
/// handle, the way `homie-core`'s `tests/ws_server.rs::start_server` drives its axum-native
/// server.
pub async fn start_server(config: ServerConfig) -> (SocketAddr, Supervisor)
{
    let supervisor = Supervisor::new(config);
    let app = build_router_default(supervisor.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await;
    });

    (addr, supervisor)
}

pub async fn connect_ws(addr: SocketAddr) -> WsStream
{
    let url = format!("ws://{addr}/ws");
    let (stream, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    stream
}

pub fn text(s: impl Into<String>) -> tungstenite::Message
{
    tungstenite::Message::Text(s.into().into())
}

/// Read the next text frame, transparently answering WebSocket-level pings and skipping pongs -
/// the protocol treats control-frame and WS-level heartbeats equivalently (spec.md §4.D).
pub async fn next_json(ws: &mut WsStream) -> Value
{
    loop
    {
        match ws.next().await
        {
            Some(Ok(tungstenite::Message::Text(t))) => return serde_json::from_str(&t).unwrap(),
            Some(Ok(tungstenite::Message::Ping(data))) => { let _ = ws.send(tungstenite::Message::Pong(data)).await; }
            Some(Ok(tungstenite::Message::Pong(_))) => continue,
            Some(Ok(tungstenite::Message::Close(frame))) => panic!("connection closed while awaiting a frame: {frame:?}"),
            Some(Ok(other)) => panic!("unexpected message: {other:?}"),
            Some(Err(err)) => panic!("ws error: {err}"),
            None => panic!("ws stream ended unexpectedly"),
        }
    }
}

/// Like [`next_json`] but returns `None` if the connection closes instead of panicking -
/// for tests asserting eviction.
pub async fn next_json_or_close(ws: &mut WsStream) -> Option<Value>
{
    loop
    {
        match ws.next().await
        {
            Some(Ok(tungstenite::Message::Text(t))) => return Some(serde_json::from_str(&t).unwrap()),
            Some(Ok(tungstenite::Message::Ping(data))) => { let _ = ws.send(tungstenite::Message::Pong(data)).await; }
            Some(Ok(tungstenite::Message::Pong(_))) => continue,
            Some(Ok(tungstenite::Message::Close(_))) => return None,
            Some(Ok(other)) => panic!("unexpected message: {other:?}"),
            Some(Err(_)) => return None,
            None => return None,
        }
    }
}

pub async fn expect_welcome(ws: &mut WsStream) -> Value
{
    let frame = next_json(ws).await;
    assert_eq!(frame["type"], "welcome");
    frame
}

pub fn subscribe_frame(exchanges: &[&str], symbols: &[&str], data_types: &[&str]) -> tungstenite::Message
{
    text(serde_json::json!({
        "type": "subscribe",
        "exchange": exchanges,
        "symbols": symbols,
        "dataTypes": data_types,
    }).to_string())
}

//-------------------------------------------------------------------------------------------------------------------
