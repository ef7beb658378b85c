//local shortcuts
use crate::*;

//third-party shortcuts
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures::{SinkExt, StreamExt};

//standard shortcuts
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

//-------------------------------------------------------------------------------------------------------------------

fn now_ms() -> i64
{
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

/// Bytes a given outbound message will put on the wire, for the session's `bytes_sent` counter
/// (spec.md §6: "per-session sent/received byte counts").
fn message_len(msg: &Message) -> usize
{
    match msg
    {
        Message::Text(t)   => t.len(),
        Message::Binary(b) => b.len(),
        Message::Ping(p) | Message::Pong(p) => p.len(),
        Message::Close(_)  => 0,
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Send one outbound frame, enforcing the write-stall deadline: a socket whose writer is blocked
/// (a stuck reader on the other end) will hang inside `sink.send`, which is exactly the condition
/// `writeStallTimeout` exists to detect (spec.md §4.D). Counts the write against `handle`'s
/// `bytes_sent` on success.
async fn send_with_stall_guard(
    sink: &mut (impl futures::Sink<Message, Error = axum::Error> + Unpin),
    msg: Message,
    write_stall_timeout: Duration,
    handle: &SessionHandle,
) -> Result<(), CloseReason>
{
    let len = message_len(&msg);
    match tokio::time::timeout(write_stall_timeout, sink.send(msg)).await
    {
        Ok(Ok(())) => { handle.metrics.bytes_sent.add(len as u64); Ok(()) }
        Ok(Err(_)) => Err(CloseReason::TransportError),
        Err(_) => Err(CloseReason::WriteStall),
    }
}

async fn send_frame(
    sink: &mut (impl futures::Sink<Message, Error = axum::Error> + Unpin),
    frame: &OutboundFrame,
    write_stall_timeout: Duration,
    handle: &SessionHandle,
) -> Result<(), CloseReason>
{
    let encoded = frame.encode().map_err(|_| CloseReason::TransportError)?;
    send_with_stall_guard(sink, Message::Text(encoded.into()), write_stall_timeout, handle).await
}

//-------------------------------------------------------------------------------------------------------------------

/// Run one downstream connection end to end: admission, handshake, then the message loop, then
/// teardown. Mirrors the shape of a handshake-then-select-loop connection handler, generalized to
/// this protocol's frames and this core's admission/index/heartbeat rules.
pub async fn run_connection(socket: WebSocket, supervisor: Supervisor, authenticator: Arc<dyn Authenticator>, credential: String)
{
    let session_id = supervisor.next_session_id();
    let span = tracing::info_span!("session", id = %session_id);
    let _enter = span.enter();

    if !authenticator.authenticate(&credential)
    {
        tracing::info!("authentication rejected");
        return;
    }

    if !supervisor.try_admit()
    {
        tracing::warn!("connection limit reached, rejecting");
        let _ = reject_connection(socket, ErrorCode::ConnectionLimit).await;
        return;
    }

    let (mut sink, mut stream) = socket.split();
    let (handle, mut frame_rx) = SessionHandle::new(session_id, supervisor.config.send_queue_high_water);

    let welcome = OutboundFrame::Welcome{
            connection_id: session_id,
            server_time: now_ms(),
            version: PROTOCOL_VERSION.to_string(),
        };
    if send_frame(&mut sink, &welcome, supervisor.config.write_stall_timeout, &handle).await.is_err()
    {
        tracing::debug!("handshake failed sending welcome");
        return;
    }

    handle.set_state(SessionState::Active);
    supervisor.register(handle.clone());
    tracing::info!("session active");
    drop(_enter);

    let span = tracing::info_span!("session", id = %session_id);
    let _enter = span.enter();
    let close_reason = run_message_loop(&mut sink, &mut stream, &mut frame_rx, &handle, &supervisor).await;

    supervisor.deregister(session_id);
    let _ = send_close(&mut sink, close_reason, &handle).await;
    tracing::info!(reason = close_reason.as_str(), "session closed");
}

async fn reject_connection(mut socket: WebSocket, code: ErrorCode) -> Result<(), axum::Error>
{
    let frame = OutboundFrame::error_default(code);
    if let Ok(json) = frame.encode()
    {
        let _ = socket.send(Message::Text(json.into())).await;
    }
    socket.send(Message::Close(Some(CloseFrame{ code: 1013, reason: "connection limit".into() }))).await
}

async fn send_close(
    sink: &mut (impl futures::Sink<Message, Error = axum::Error> + Unpin),
    reason: CloseReason,
    handle: &SessionHandle,
) -> Result<(), axum::Error>
{
    if let Some(code) = reason.as_error_code()
    {
        let frame = OutboundFrame::error_default(code);
        if let Ok(json) = frame.encode()
        {
            let len = json.len();
            if sink.send(Message::Text(json.into())).await.is_ok()
            {
                handle.metrics.bytes_sent.add(len as u64);
            }
        }
    }
    sink.send(Message::Close(Some(CloseFrame{ code: 1000, reason: reason.as_str().into() }))).await
}

//-------------------------------------------------------------------------------------------------------------------

/// The heart of components B+D: one `tokio::select!` loop multiplexing inbound frames, outbound
/// fan-out frames, the heartbeat ping, and the idle deadline. Returns the reason the loop exited.
async fn run_message_loop(
    sink: &mut (impl futures::Sink<Message, Error = axum::Error> + Unpin),
    stream: &mut (impl futures::Stream<Item = Result<Message, axum::Error>> + Unpin),
    frame_rx: &mut tokio::sync::mpsc::Receiver<Arc<str>>,
    handle: &SessionHandle,
    supervisor: &Supervisor,
) -> CloseReason
{
    let config = &supervisor.config;
    let mut idle_deadline = tokio::time::Instant::now() + config.idle_timeout;
    let mut heartbeat = tokio::time::interval(config.ping_interval);
    heartbeat.tick().await;

    let mut protocol_errors = RateLimitTracker::new(RateLimitConfig{
            period: Duration::from_secs(60),
            max_count: config.protocol_error_budget,
        });
    let mut shutdown_rx = supervisor.shutdown_signal();

    loop
    {
        tokio::select!
        {
            msg = stream.next() =>
            {
                match msg
                {
                    Some(Ok(Message::Text(text))) =>
                    {
                        idle_deadline = tokio::time::Instant::now() + config.idle_timeout;
                        handle.metrics.bytes_received.add(text.len() as u64);
                        if text.len() > config.max_frame_bytes
                        {
                            let err = FrameDecodeError::Oversize{ size: text.len(), max: config.max_frame_bytes };
                            tracing::debug!(%err, "oversize frame, closing");
                            return CloseReason::FrameTooLarge;
                        }
                        if let Some(reason) = handle_inbound_text(&text, sink, handle, supervisor, &mut protocol_errors).await
                        {
                            return reason;
                        }
                    }
                    Some(Ok(Message::Binary(_))) =>
                    {
                        idle_deadline = tokio::time::Instant::now() + config.idle_timeout;
                        tracing::trace!("ignoring binary frame (text-only protocol)");
                    }
                    Some(Ok(Message::Ping(data))) =>
                    {
                        idle_deadline = tokio::time::Instant::now() + config.idle_timeout;
                        if send_with_stall_guard(sink, Message::Pong(data), config.write_stall_timeout, handle).await.is_err()
                        {
                            return CloseReason::TransportError;
                        }
                    }
                    Some(Ok(Message::Pong(_))) =>
                    {
                        idle_deadline = tokio::time::Instant::now() + config.idle_timeout;
                    }
                    Some(Ok(Message::Close(frame))) =>
                    {
                        tracing::info!(?frame, "client closed");
                        return CloseReason::ClientClosed;
                    }
                    Some(Err(err)) =>
                    {
                        tracing::debug!(?err, "transport error");
                        return CloseReason::TransportError;
                    }
                    None =>
                    {
                        tracing::debug!("stream ended");
                        return CloseReason::TransportError;
                    }
                }
            }
            outbound = frame_rx.recv() =>
            {
                match outbound
                {
                    Some(frame) =>
                    {
                        if send_with_stall_guard(sink, Message::Text(frame.as_ref().to_string().into()), config.write_stall_timeout, handle).await.is_err()
                        {
                            return CloseReason::WriteStall;
                        }
                    }
                    None => return CloseReason::LocalClose,
                }
            }
            _ = heartbeat.tick() =>
            {
                if send_with_stall_guard(sink, Message::Ping(Vec::new().into()), config.write_stall_timeout, handle).await.is_err()
                {
                    return CloseReason::WriteStall;
                }
            }
            _ = tokio::time::sleep_until(idle_deadline) =>
            {
                tracing::info!("idle timeout");
                supervisor.metrics.heartbeat_timeouts.increment();
                return CloseReason::HeartbeatTimeout;
            }
            changed = shutdown_rx.changed() =>
            {
                if changed.is_ok() && *shutdown_rx.borrow()
                {
                    tracing::info!("server shutdown signal received");
                    handle.set_state(SessionState::Closing);
                    return CloseReason::ServerShutdown;
                }
            }
        }
    }
}

/// Decode and act on one inbound text frame. Returns `Some(reason)` if the session must close.
async fn handle_inbound_text(
    text: &str,
    sink: &mut (impl futures::Sink<Message, Error = axum::Error> + Unpin),
    handle: &SessionHandle,
    supervisor: &Supervisor,
    protocol_errors: &mut RateLimitTracker,
) -> Option<CloseReason>
{
    let frame = match InboundFrame::decode(text.as_bytes())
    {
        Ok(frame) => frame,
        Err(err) =>
        {
            tracing::debug!(?err, "malformed inbound frame");
            supervisor.metrics.protocol_errors.increment();
            let _ = send_frame(sink, &OutboundFrame::error_default(ErrorCode::Protocol), supervisor.config.write_stall_timeout, handle).await;
            if !protocol_errors.try_count_msg()
            {
                return Some(CloseReason::ProtocolErrorBudgetExceeded);
            }
            return None;
        }
    };

    match frame
    {
        InboundFrame::Ping{ timestamp } =>
        {
            let _ = send_frame(sink, &OutboundFrame::Pong{ timestamp }, supervisor.config.write_stall_timeout, handle).await;
        }
        InboundFrame::Subscribe{ exchange, symbols, data_types } =>
        {
            let filter = Filter{
                    exchanges: exchange.into_iter().collect(),
                    symbols: symbols.into_iter().collect(),
                    data_types: data_types.into_iter().collect(),
                };
            match admit_subscribe(&filter, handle.id, supervisor)
            {
                Ok(()) =>
                {
                    let filter_id = supervisor.index.add(handle.id, filter.clone());
                    let _ = send_frame(sink, &OutboundFrame::Subscribed{ filter_id, filter }, supervisor.config.write_stall_timeout, handle).await;
                }
                Err(err) =>
                {
                    let _ = send_frame(sink, &OutboundFrame::error_default(err.code()), supervisor.config.write_stall_timeout, handle).await;
                }
            }
        }
        InboundFrame::Unsubscribe{ filter_id } =>
        {
            supervisor.index.remove(handle.id, filter_id);
            let _ = send_frame(sink, &OutboundFrame::Unsubscribed{ filter_id }, supervisor.config.write_stall_timeout, handle).await;
        }
    }

    None
}

/// Admission controller's subscribe-time checks (component F): structural validity and the
/// per-session filter cap.
fn admit_subscribe(filter: &Filter, session_id: SessionId, supervisor: &Supervisor) -> Result<(), AdmissionError>
{
    if !filter.validate()
    {
        return Err(AdmissionError::InvalidFilter);
    }
    if supervisor.index.filter_count(session_id) >= supervisor.config.max_filters_per_session as usize
    {
        return Err(AdmissionError::FilterLimit);
    }
    Ok(())
}

//-------------------------------------------------------------------------------------------------------------------
