//local shortcuts
use crate::{SessionId, SessionMetrics};

//third-party shortcuts
use tokio::sync::mpsc;

//standard shortcuts
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

//-------------------------------------------------------------------------------------------------------------------

/// A session's lifecycle state (component B). Transitions only move forward; `Closed` is
/// terminal and a session never resurrects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState
{
    Handshaking,
    Active,
    Closing,
    Closed,
}

impl SessionState
{
    fn to_u8(self) -> u8
    {
        match self
        {
            SessionState::Handshaking => 0,
            SessionState::Active      => 1,
            SessionState::Closing     => 2,
            SessionState::Closed      => 3,
        }
    }

    fn from_u8(v: u8) -> Self
    {
        match v
        {
            0 => SessionState::Handshaking,
            1 => SessionState::Active,
            2 => SessionState::Closing,
            _ => SessionState::Closed,
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Outcome of [`SessionHandle::submit`]. Never an error: a broken or saturated session is the
/// caller's concern only insofar as it may want to count drops, not a fan-out failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitResult
{
    Ok,
    Dropped,
}

//-------------------------------------------------------------------------------------------------------------------

/// The thread-safe handle other tasks (the router, the supervisor) use to reach a session.
///
/// Holds only what must be visible outside the session's own task: the outbound queue, the
/// current lifecycle state, and its metrics. Everything else (filters map, heartbeat timers,
/// the socket itself) is owned exclusively by the connection task per spec.md §5's
/// session-local-state rule.
#[derive(Debug, Clone)]
pub struct SessionHandle
{
    pub id: SessionId,
    pub created_at: Instant,
    pub metrics: SessionMetrics,
    frame_tx: mpsc::Sender<Arc<str>>,
    state: Arc<AtomicU8>,
}

impl SessionHandle
{
    /// Construct a handle paired with the receiving end the connection task keeps for itself.
    pub fn new(id: SessionId, high_water: usize) -> (SessionHandle, mpsc::Receiver<Arc<str>>)
    {
        let (frame_tx, frame_rx) = mpsc::channel(high_water.max(1));
        let handle = SessionHandle{
                id,
                created_at: Instant::now(),
                metrics: SessionMetrics::default(),
                frame_tx,
                state: Arc::new(AtomicU8::new(SessionState::Handshaking.to_u8())),
            };
        (handle, frame_rx)
    }

    pub fn state(&self) -> SessionState
    {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: SessionState)
    {
        self.state.store(state.to_u8(), Ordering::Release);
    }

    pub fn is_active(&self) -> bool
    {
        self.state() == SessionState::Active
    }

    /// Enqueue an already-serialized outbound frame (component E's contract). Non-blocking:
    /// a full queue or a non-Active session both resolve to `Dropped`, never an error and never
    /// a wait. Submits after Closing/Closed are a silent no-op per spec.md §4.B.
    pub fn submit(&self, frame: Arc<str>) -> SubmitResult
    {
        if !self.is_active()
        {
            return SubmitResult::Dropped;
        }

        match self.frame_tx.try_send(frame)
        {
            Ok(()) => { self.metrics.frames_sent.increment(); SubmitResult::Ok }
            Err(_) => { self.metrics.frames_dropped.increment(); SubmitResult::Dropped }
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------


//-------------------------------------------------------------------------------------------------------------------
