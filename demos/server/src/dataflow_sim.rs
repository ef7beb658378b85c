//! In-process stand-in for the external DataFlow producer (spec.md §1: "the core does not own
//! the upstream connection to exchanges"). Synthesizes [`marketflow_fanout::MarketDataMessage`]s
//! at a configurable rate and calls `dispatch()`, the same single entry point a real ingest
//! adapter would call. This is a test fixture, not part of the core's public contract.

//local shortcuts
use marketflow_fanout::{MarketDataMessage, Router, RoutingKey};

//third-party shortcuts
use rand::seq::SliceRandom;
use rand::Rng;

//standard shortcuts
use std::time::{Duration, SystemTime, UNIX_EPOCH};

//-------------------------------------------------------------------------------------------------------------------

const EXCHANGES: &[&str] = &["binance", "okex", "coinbase"];
const SYMBOLS: &[&str] = &["BTCUSDT", "ETHUSDT", "SOLUSDT"];
const DATA_TYPES: &[&str] = &["trade", "ticker"];

fn now_ms() -> i64
{
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

/// Run forever, dispatching one synthetic message every `period` until the process exits.
pub async fn run(router: Router, period: Duration)
{
    let mut interval = tokio::time::interval(period);
    let mut rng = rand::thread_rng();

    loop
    {
        interval.tick().await;

        let exchange = EXCHANGES.choose(&mut rng).expect("non-empty");
        let symbol = SYMBOLS.choose(&mut rng).expect("non-empty");
        let data_type = DATA_TYPES.choose(&mut rng).expect("non-empty");
        let price: f64 = rng.gen_range(100.0..100_000.0);

        let msg = MarketDataMessage{
                routing_key: RoutingKey::new(*exchange, *symbol, *data_type),
                timestamp: now_ms(),
                payload: serde_json::json!({ "price": price }),
            };

        let delivered = router.dispatch(&msg);
        tracing::trace!(exchange, symbol, data_type, delivered, "dispatched synthetic message");
    }
}

//-------------------------------------------------------------------------------------------------------------------
