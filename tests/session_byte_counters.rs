//local shortcuts
mod common;
use common::*;

//third-party shortcuts
use futures::SinkExt;
use marketflow_fanout::ServerConfig;

//standard shortcuts

//-------------------------------------------------------------------------------------------------------------------

/// spec.md §6's observability surface names "per-session sent/received byte counts" among the
/// required counters; both must actually move as frames cross the wire.
#[tokio::test]
async fn session_tracks_sent_and_received_bytes()
{
    let (addr, supervisor) = start_server(ServerConfig::default()).await;
    let mut ws = connect_ws(addr).await;
    expect_welcome(&mut ws).await;

    let ids = supervisor.registry().ids();
    assert_eq!(ids.len(), 1);
    let handle = supervisor.registry().get(ids[0]).unwrap();

    // the welcome frame alone already counts as sent bytes.
    assert!(handle.metrics.bytes_sent.load() > 0);

    let before_received = handle.metrics.bytes_received.load();
    ws.send(subscribe_frame(&["binance"], &["BTCUSDT"], &["trade"])).await.unwrap();
    let subscribed = next_json(&mut ws).await;
    assert_eq!(subscribed["type"], "subscribed");

    let handle = supervisor.registry().get(ids[0]).unwrap();
    assert!(handle.metrics.bytes_received.load() > before_received);
    assert!(handle.metrics.bytes_sent.load() > 0);
}

//-------------------------------------------------------------------------------------------------------------------
