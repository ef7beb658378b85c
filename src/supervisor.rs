//local shortcuts
use crate::{Metrics, Registry, Router, ServerConfig, SessionHandle, SessionId, SubscriptionIndex};

//third-party shortcuts
use tokio::sync::watch;

//standard shortcuts
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

//-------------------------------------------------------------------------------------------------------------------

/// The top-level scope (component G): owns the session registry, hands out session ids, tracks
/// connection-count admission, and drives shutdown. Cheap to clone - every field is already
/// shared (`Arc`/atomic/`DashMap`-backed), so each connection task gets its own handle.
#[derive(Debug, Clone)]
pub struct Supervisor
{
    pub config: Arc<ServerConfig>,
    pub metrics: Metrics,
    pub index: Arc<SubscriptionIndex>,
    registry: Registry,
    next_session_id: Arc<AtomicU64>,
    shutdown_tx: watch::Sender<bool>,
}

impl Supervisor
{
    pub fn new(config: ServerConfig) -> Self
    {
        let (shutdown_tx, _) = watch::channel(false);
        Self{
                config: Arc::new(config),
                metrics: Metrics::default(),
                index: Arc::new(SubscriptionIndex::new()),
                registry: Registry::new(),
                next_session_id: Arc::new(AtomicU64::new(1)),
                shutdown_tx,
            }
    }

    /// A router sharing this supervisor's registry, index, and metrics.
    pub fn router(&self) -> Router
    {
        Router::new(self.registry.clone(), self.index.clone(), self.metrics.clone())
    }

    pub fn registry(&self) -> &Registry { &self.registry }

    /// Assign a fresh, process-unique session id.
    pub fn next_session_id(&self) -> SessionId
    {
        SessionId(self.next_session_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Admission controller's connection-cap check (component F). An approximate test: the
    /// counter is updated concurrently with other accepts, same caveat the teacher's own
    /// connection counter carries.
    pub fn try_admit(&self) -> bool
    {
        self.metrics.connections_active.load() < self.config.max_connections as u64
    }

    /// Register a freshly handshaken session and count it.
    pub fn register(&self, handle: SessionHandle)
    {
        self.metrics.connections_active.increment();
        self.metrics.connections_total.increment();
        self.registry.insert(handle);
    }

    /// Remove a session from the registry and the subscription index. Per spec.md §3 this must
    /// happen before the session's socket resources are released.
    pub fn deregister(&self, id: SessionId)
    {
        self.index.remove_all(id);
        if self.registry.remove(id).is_some()
        {
            self.metrics.connections_active.decrement();
        }
    }

    /// A receiver connection tasks select on to learn when to start their own close sequence.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool>
    {
        self.shutdown_tx.subscribe()
    }

    /// Stop accepting (the caller owns the accept loop and must stop it itself), signal every
    /// live session to close with `SERVER_SHUTDOWN`, and wait up to `drainTimeout` for the
    /// registry to empty. Each connection task enforces its own drain deadline; this just waits
    /// for the aggregate result and logs stragglers rather than forcibly severing sockets itself.
    pub async fn shutdown(&self)
    {
        tracing::info!("supervisor shutdown: signaling sessions to close");
        let _ = self.shutdown_tx.send(true);

        let deadline = tokio::time::Instant::now() + self.config.drain_timeout;
        while tokio::time::Instant::now() < deadline && !self.registry.is_empty()
        {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        if !self.registry.is_empty()
        {
            tracing::warn!(remaining = self.registry.len(), "drain timeout elapsed with sessions still open");
        }
        else
        {
            tracing::info!("all sessions drained");
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------


//-------------------------------------------------------------------------------------------------------------------
