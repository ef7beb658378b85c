//local shortcuts
use crate::{DataPayload, MarketDataMessage, Metrics, OutboundFrame, Registry, SubmitResult, SubscriptionIndex};

//third-party shortcuts

//standard shortcuts
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

//-------------------------------------------------------------------------------------------------------------------

/// The fan-out router (component E): the only path from an ingested [`MarketDataMessage`] to
/// wire bytes on matching sessions.
#[derive(Debug, Clone)]
pub struct Router
{
    registry: Registry,
    index: Arc<SubscriptionIndex>,
    metrics: Metrics,
}

impl Router
{
    pub fn new(registry: Registry, index: Arc<SubscriptionIndex>, metrics: Metrics) -> Self
    {
        Self{ registry, index, metrics }
    }

    /// Resolve `msg`'s matching sessions and submit the serialized `data` frame to each.
    ///
    /// Non-blocking and infallible: a slow or closing session only costs a drop, never delays
    /// delivery to the rest. Returns the number of sessions the frame was actually queued to,
    /// purely for tests and metrics scraping - callers on the ingest path can ignore it.
    pub fn dispatch(&self, msg: &MarketDataMessage) -> usize
    {
        let enqueue_time = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0);
        let frame = OutboundFrame::Data{ timestamp: enqueue_time, payload: DataPayload::from(msg) };
        let encoded: Arc<str> = match frame.encode()
        {
            Ok(json) => Arc::from(json.as_str()),
            Err(err) => { tracing::error!(?err, "failed to encode outbound data frame"); return 0; }
        };

        let targets = self.index.lookup(&msg.routing_key);
        let mut delivered = 0usize;

        for session_id in targets
        {
            let Some(handle) = self.registry.get(session_id) else { continue; };
            match handle.submit(encoded.clone())
            {
                SubmitResult::Ok => { delivered += 1; self.metrics.messages_forwarded.increment(); }
                SubmitResult::Dropped => { self.metrics.dropped_total.increment(); }
            }
        }

        delivered
    }
}

//-------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::{Filter, RoutingKey, SessionHandle, SessionId, SessionState};
    use serde_json::json;

    fn msg(exchange: &str, symbol: &str, data_type: &str) -> MarketDataMessage
    {
        MarketDataMessage{
            routing_key: RoutingKey::new(exchange, symbol, data_type),
            timestamp: 1,
            payload: json!({"price": 1}),
        }
    }

    #[test]
    fn dispatch_delivers_exactly_once_to_matching_session()
    {
        let registry = Registry::new();
        let index = Arc::new(SubscriptionIndex::new());
        let metrics = Metrics::default();
        let router = Router::new(registry.clone(), index.clone(), metrics.clone());

        let (handle, mut rx) = SessionHandle::new(SessionId(1), 8);
        handle.set_state(SessionState::Active);
        registry.insert(handle);
        index.add(SessionId(1), Filter{ exchanges: ["binance".to_string()].into(), symbols: ["BTCUSDT".to_string()].into(), data_types: ["trade".to_string()].into() });

        let delivered = router.dispatch(&msg("binance", "BTCUSDT", "trade"));
        assert_eq!(delivered, 1);
        assert_eq!(metrics.messages_forwarded.load(), 1);
        let frame = rx.try_recv().unwrap();
        assert!(frame.contains("\"type\":\"data\""));
    }

    #[test]
    fn dispatch_to_nonmatching_session_is_silent()
    {
        let registry = Registry::new();
        let index = Arc::new(SubscriptionIndex::new());
        let metrics = Metrics::default();
        let router = Router::new(registry.clone(), index.clone(), metrics.clone());

        let (handle, mut rx) = SessionHandle::new(SessionId(1), 8);
        handle.set_state(SessionState::Active);
        registry.insert(handle);
        index.add(SessionId(1), Filter{ exchanges: ["binance".to_string()].into(), symbols: [].into(), data_types: [].into() });

        let delivered = router.dispatch(&msg("okex", "BTCUSDT", "trade"));
        assert_eq!(delivered, 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dispatch_counts_drops_for_closing_session()
    {
        let registry = Registry::new();
        let index = Arc::new(SubscriptionIndex::new());
        let metrics = Metrics::default();
        let router = Router::new(registry.clone(), index.clone(), metrics.clone());

        let (handle, _rx) = SessionHandle::new(SessionId(1), 8);
        handle.set_state(SessionState::Active);
        registry.insert(handle);
        index.add(SessionId(1), Filter::default());

        registry.get(SessionId(1)).unwrap().set_state(SessionState::Closing);
        let delivered = router.dispatch(&msg("a", "b", "c"));
        assert_eq!(delivered, 0);
        assert_eq!(metrics.dropped_total.load(), 1);
    }
}

//-------------------------------------------------------------------------------------------------------------------
