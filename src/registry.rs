//local shortcuts
use crate::{SessionHandle, SessionId};

//third-party shortcuts
use dashmap::DashMap;

//standard shortcuts
use std::sync::Arc;

//-------------------------------------------------------------------------------------------------------------------

/// The concurrent session registry the lifecycle supervisor owns (component G) and the router
/// reads from per dispatch. A thin, cloneable wrapper so both can share one table without either
/// owning the other.
#[derive(Debug, Clone, Default)]
pub struct Registry
{
    sessions: Arc<DashMap<SessionId, SessionHandle>>,
}

impl Registry
{
    pub fn new() -> Self { Self::default() }

    pub fn insert(&self, handle: SessionHandle)
    {
        self.sessions.insert(handle.id, handle);
    }

    pub fn remove(&self, id: SessionId) -> Option<SessionHandle>
    {
        self.sessions.remove(&id).map(|(_, handle)| handle)
    }

    pub fn get(&self, id: SessionId) -> Option<SessionHandle>
    {
        self.sessions.get(&id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize
    {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.sessions.is_empty()
    }

    pub fn ids(&self) -> Vec<SessionId>
    {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }
}

//-------------------------------------------------------------------------------------------------------------------


//-------------------------------------------------------------------------------------------------------------------
