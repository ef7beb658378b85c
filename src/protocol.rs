//local shortcuts

//third-party shortcuts
use serde::{Deserialize, Serialize};

//standard shortcuts
use std::collections::HashSet;
use std::fmt;

//-------------------------------------------------------------------------------------------------------------------

/// Upper bound on a routing-key token (`exchange`/`symbol`/`dataType` value), per the data model:
/// "a short ASCII token (≤ 32 bytes)".
pub const MAX_TOKEN_BYTES: usize = 32;

/// Wire protocol version reported in the `welcome` frame.
pub const PROTOCOL_VERSION: &str = "1";

fn token_is_valid(token: &str) -> bool
{
    !token.is_empty() && token.len() <= MAX_TOKEN_BYTES && token.is_ascii()
}

//-------------------------------------------------------------------------------------------------------------------

/// Id for a session, unique for the process lifetime. Serializes as the wire's `connectionId`
/// string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl Serialize for SessionId
{
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error>
    {
        s.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SessionId
{
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error>
    {
        let raw = String::deserialize(d)?;
        raw.parse::<u64>().map(SessionId).map_err(serde::de::Error::custom)
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Id for a filter, unique within its owning session and never reused for that session.
/// Serializes as the wire's `filterId` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterId(pub u64);

impl fmt::Display for FilterId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl Serialize for FilterId
{
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error>
    {
        s.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for FilterId
{
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error>
    {
        let raw = String::deserialize(d)?;
        raw.parse::<u64>().map(FilterId).map_err(serde::de::Error::custom)
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// The triple `(exchange, symbol, dataType)` extracted from a [`MarketDataMessage`] and compared
/// against [`Filter`]s. Compared for exact equality only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutingKey
{
    pub exchange: String,
    pub symbol: String,
    #[serde(rename = "dataType")]
    pub data_type: String,
}

impl RoutingKey
{
    pub fn new(exchange: impl Into<String>, symbol: impl Into<String>, data_type: impl Into<String>) -> Self
    {
        Self{ exchange: exchange.into(), symbol: symbol.into(), data_type: data_type.into() }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// A client-declared predicate over routing keys. An empty set in a dimension means "wildcard"
/// (match any value in that dimension).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Filter
{
    pub exchanges: HashSet<String>,
    pub symbols: HashSet<String>,
    #[serde(rename = "dataTypes")]
    pub data_types: HashSet<String>,
}

impl Filter
{
    /// Structural validation: every declared token must be a non-empty ASCII string of at most
    /// [`MAX_TOKEN_BYTES`]. A filter with all three dimensions wildcard is valid (it matches
    /// every message, routed through the index's dedicated match-all list rather than a scan).
    pub fn validate(&self) -> bool
    {
        self.exchanges.iter().all(|t| token_is_valid(t))
            && self.symbols.iter().all(|t| token_is_valid(t))
            && self.data_types.iter().all(|t| token_is_valid(t))
    }

    /// True iff every dimension is wildcard (matches any routing key).
    pub fn is_match_all(&self) -> bool
    {
        self.exchanges.is_empty() && self.symbols.is_empty() && self.data_types.is_empty()
    }

    /// The match predicate: each dimension is either wildcard or contains the routing key's
    /// value for that dimension.
    pub fn matches(&self, key: &RoutingKey) -> bool
    {
        (self.exchanges.is_empty() || self.exchanges.contains(&key.exchange))
            && (self.symbols.is_empty() || self.symbols.contains(&key.symbol))
            && (self.data_types.is_empty() || self.data_types.contains(&key.data_type))
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// A message pushed into the core by the upstream DataFlow producer.
///
/// Timestamps are informational for routing; they are never used to reorder delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataMessage
{
    pub routing_key: RoutingKey,
    /// Milliseconds since epoch, monotonic within a single upstream stream.
    pub timestamp: i64,
    /// Opaque once tagged with a routing key: the core never inspects or transforms this.
    pub payload: serde_json::Value,
}

//-------------------------------------------------------------------------------------------------------------------

/// The wire shape of an outbound `data` frame's nested `payload` object: `{type, exchange,
/// symbol, timestamp, data}`.
#[derive(Debug, Clone, Serialize)]
pub struct DataPayload
{
    #[serde(rename = "type")]
    pub data_type: String,
    pub exchange: String,
    pub symbol: String,
    pub timestamp: i64,
    pub data: serde_json::Value,
}

impl From<&MarketDataMessage> for DataPayload
{
    fn from(msg: &MarketDataMessage) -> Self
    {
        DataPayload{
            data_type: msg.routing_key.data_type.clone(),
            exchange: msg.routing_key.exchange.clone(),
            symbol: msg.routing_key.symbol.clone(),
            timestamp: msg.timestamp,
            data: msg.payload.clone(),
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// A decoded inbound (client → server) control frame. See the wire table for field shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundFrame
{
    Ping { timestamp: i64 },
    Subscribe
    {
        exchange: Vec<String>,
        symbols: Vec<String>,
        #[serde(rename = "dataTypes")]
        data_types: Vec<String>,
    },
    Unsubscribe { #[serde(rename = "filterId")] filter_id: FilterId },
}

/// Frame `type` tags this protocol recognizes from a client, per the wire table.
const KNOWN_INBOUND_TYPES: &[&str] = &["ping", "subscribe", "unsubscribe"];

impl InboundFrame
{
    /// Decode one control frame from raw bytes already known to be within `max_frame_bytes`.
    ///
    /// Distinguishes an unrecognized `type` tag ([`crate::FrameDecodeError::UnknownType`]) from
    /// JSON that is malformed outright or structurally wrong for its recognized type
    /// ([`crate::FrameDecodeError::MalformedJson`]), per spec.md §4.A: both report `{code:
    /// "PROTOCOL"}` to the client, but the distinction is useful in logs.
    pub fn decode(bytes: &[u8]) -> Result<Self, crate::FrameDecodeError>
    {
        let value: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| crate::FrameDecodeError::MalformedJson(e.to_string()))?;

        match value.get("type").and_then(serde_json::Value::as_str)
        {
            Some(t) if !KNOWN_INBOUND_TYPES.contains(&t) =>
            {
                return Err(crate::FrameDecodeError::UnknownType(t.to_string()));
            }
            _ => {}
        }

        serde_json::from_value(value)
            .map_err(|e| crate::FrameDecodeError::MalformedJson(e.to_string()))
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// A server-constructed outbound (server → client) control frame.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundFrame
{
    Welcome { #[serde(rename = "connectionId")] connection_id: SessionId, #[serde(rename = "serverTime")] server_time: i64, version: String },
    Pong { timestamp: i64 },
    Subscribed { #[serde(rename = "filterId")] filter_id: FilterId, filter: Filter },
    Unsubscribed { #[serde(rename = "filterId")] filter_id: FilterId },
    Error { code: crate::ErrorCode, message: String },
    Data { timestamp: i64, payload: DataPayload },
}

impl OutboundFrame
{
    pub fn error(code: crate::ErrorCode, message: impl Into<String>) -> Self
    {
        OutboundFrame::Error{ code, message: message.into() }
    }

    pub fn error_default(code: crate::ErrorCode) -> Self
    {
        Self::error(code, code.default_message())
    }

    /// Serialize once; the resulting bytes are shared immutably across every target session's
    /// send queue (component A: "The codec serializes once per fan-out").
    pub fn encode(&self) -> Result<String, serde_json::Error>
    {
        serde_json::to_string(self)
    }
}

//-------------------------------------------------------------------------------------------------------------------
