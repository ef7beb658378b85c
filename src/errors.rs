//local shortcuts

//third-party shortcuts
use serde::{Deserialize, Serialize};

//standard shortcuts

//-------------------------------------------------------------------------------------------------------------------

/// Observable error codes a client may see in an `error` frame or as a close reason.
///
/// Mirrors the wire-level codes in the protocol table: `PROTOCOL`, `INVALID_FILTER`,
/// `FILTER_LIMIT`, `HEARTBEAT_TIMEOUT`, `WRITE_STALL`, `SERVER_SHUTDOWN`, `CONNECTION_LIMIT`,
/// `INTERNAL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode
{
    #[serde(rename = "PROTOCOL")]
    Protocol,
    #[serde(rename = "INVALID_FILTER")]
    InvalidFilter,
    #[serde(rename = "FILTER_LIMIT")]
    FilterLimit,
    #[serde(rename = "HEARTBEAT_TIMEOUT")]
    HeartbeatTimeout,
    #[serde(rename = "WRITE_STALL")]
    WriteStall,
    #[serde(rename = "SERVER_SHUTDOWN")]
    ServerShutdown,
    #[serde(rename = "CONNECTION_LIMIT")]
    ConnectionLimit,
    #[serde(rename = "INTERNAL")]
    Internal,
}

impl ErrorCode
{
    /// A short human-readable message suitable for the `error` frame's `message` field.
    pub fn default_message(&self) -> &'static str
    {
        match self
        {
            ErrorCode::Protocol         => "malformed or unrecognized frame",
            ErrorCode::InvalidFilter    => "filter must declare at least one dimension",
            ErrorCode::FilterLimit      => "session has too many active filters",
            ErrorCode::HeartbeatTimeout => "session was idle past the heartbeat timeout",
            ErrorCode::WriteStall       => "session's outbound queue stopped draining",
            ErrorCode::ServerShutdown   => "server is shutting down",
            ErrorCode::ConnectionLimit  => "server has reached its connection limit",
            ErrorCode::Internal         => "internal error",
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Errors produced while decoding a frame from a client (component A).
///
/// Every variant maps to an `error` frame with [`ErrorCode::Protocol`]; none of them, on their
/// own, close the connection. Closing only happens once the session's protocol-error budget
/// (tracked by [`crate::RateLimitTracker`]) is exceeded.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FrameDecodeError
{
    #[error("frame exceeds max_frame_bytes ({size} > {max})")]
    Oversize { size: usize, max: usize },
    #[error("malformed JSON: {0}")]
    MalformedJson(String),
    #[error("unrecognized frame type {0:?}")]
    UnknownType(String),
}

//-------------------------------------------------------------------------------------------------------------------

/// Errors produced while validating a subscribe request (component F, admission controller).
#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum AdmissionError
{
    #[error("filter must declare at least one of exchanges/symbols/dataTypes")]
    InvalidFilter,
    #[error("session already holds the maximum number of filters")]
    FilterLimit,
}

impl AdmissionError
{
    pub fn code(&self) -> ErrorCode
    {
        match self
        {
            AdmissionError::InvalidFilter => ErrorCode::InvalidFilter,
            AdmissionError::FilterLimit   => ErrorCode::FilterLimit,
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Reasons a session transitions to `Closing`/`Closed` (component B).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason
{
    /// The client sent a WebSocket close frame.
    ClientClosed,
    /// The server-side owner requested the close (e.g. a supervisor shutdown).
    LocalClose,
    /// `lastActivityAt` did not advance within `idleTimeout`.
    HeartbeatTimeout,
    /// The session's oldest pending outbound frame exceeded `writeStallTimeout`.
    WriteStall,
    /// The protocol-error budget was exceeded.
    ProtocolErrorBudgetExceeded,
    /// A single inbound frame exceeded `max_frame_bytes`.
    FrameTooLarge,
    /// The transport failed (socket read/write error).
    TransportError,
    /// The server is draining for shutdown.
    ServerShutdown,
}

impl CloseReason
{
    pub fn as_error_code(&self) -> Option<ErrorCode>
    {
        match self
        {
            CloseReason::HeartbeatTimeout            => Some(ErrorCode::HeartbeatTimeout),
            CloseReason::WriteStall                  => Some(ErrorCode::WriteStall),
            CloseReason::ServerShutdown               => Some(ErrorCode::ServerShutdown),
            CloseReason::ProtocolErrorBudgetExceeded   => Some(ErrorCode::Protocol),
            CloseReason::FrameTooLarge                 => Some(ErrorCode::Protocol),
            CloseReason::ClientClosed
            | CloseReason::LocalClose
            | CloseReason::TransportError             => None,
        }
    }

    pub fn as_str(&self) -> &'static str
    {
        match self
        {
            CloseReason::ClientClosed                => "client_closed",
            CloseReason::LocalClose                  => "local_close",
            CloseReason::HeartbeatTimeout             => "heartbeat_timeout",
            CloseReason::WriteStall                  => "write_stall",
            CloseReason::ProtocolErrorBudgetExceeded  => "protocol_error_budget_exceeded",
            CloseReason::FrameTooLarge                => "frame_too_large",
            CloseReason::TransportError               => "transport_error",
            CloseReason::ServerShutdown               => "server_shutdown",
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------
