//local shortcuts

//third-party shortcuts

//standard shortcuts
use core::fmt::Debug;

//-------------------------------------------------------------------------------------------------------------------

/// Boundary hook for authenticating an inbound connection before it is admitted.
///
/// Per the core's scope, authentication itself is out of bounds: the core only needs somewhere
/// to call out to it. The teacher's own `Authenticator` validated signed tokens inline; here that
/// concern is pushed behind a trait so the core never depends on a specific auth scheme.
pub trait Authenticator: Debug + Send + Sync + 'static
{
    /// Decide whether to admit a connection, given whatever the upgrade request carried (a
    /// bearer token, a query parameter, a header) already extracted into `credential`.
    fn authenticate(&self, credential: &str) -> bool;
}

//-------------------------------------------------------------------------------------------------------------------

/// Admits every connection. The default when no authenticator is configured, matching the core's
/// non-goal of owning auth.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authenticator for AllowAll
{
    fn authenticate(&self, _credential: &str) -> bool { true }
}

//-------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn allow_all_admits_everything()
    {
        let auth = AllowAll;
        assert!(auth.authenticate(""));
        assert!(auth.authenticate("anything"));
    }
}

//-------------------------------------------------------------------------------------------------------------------
