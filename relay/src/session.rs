use dashmap::DashMap;
use log::*;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Unique identifier for a stream session (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One open consumer connection: its liveness signal and where its frames go.
///
/// The transport layer keeps a clone of the cancellation token and cancels it
/// when the underlying connection closes.
pub struct StreamSession<D> {
    id: SessionId,
    cancellation: CancellationToken,
    destination: D,
}

impl<D> StreamSession<D> {
    pub fn new(destination: D) -> Self {
        Self {
            id: SessionId::new(),
            cancellation: CancellationToken::new(),
            destination,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub(crate) fn into_parts(self) -> (SessionId, CancellationToken, D) {
        (self.id, self.cancellation, self.destination)
    }
}

/// Registry of the stream sessions that are currently open.
///
/// Only cancellation handles live here; messages never pass through the
/// registry. It exists so the server can see how many consumers are attached
/// and can end every stream when it shuts down.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, CancellationToken>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Creates a session around `destination` and registers it.
    pub fn open<D>(&self, destination: D) -> StreamSession<D> {
        let session = StreamSession::new(destination);
        self.sessions
            .insert(session.id().clone(), session.cancellation_token());

        debug!(
            "Opened stream session {} ({} open)",
            session.id(),
            self.sessions.len()
        );
        session
    }

    /// Removes a session from the registry, cancelling it if it is still live.
    pub fn close(&self, session_id: &SessionId) {
        if let Some((_, token)) = self.sessions.remove(session_id) {
            token.cancel();
            debug!(
                "Closed stream session {} ({} open)",
                session_id,
                self.sessions.len()
            );
        }
    }

    /// Cancels every open session. Entries stay registered until their pumps
    /// call `close`.
    pub fn cancel_all(&self) {
        let mut cancelled = 0;
        for entry in self.sessions.iter() {
            entry.value().cancel();
            cancelled += 1;
        }

        if cancelled > 0 {
            info!("Cancelled {cancelled} open stream session(s)");
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn open_registers_a_live_session() {
        let registry = SessionRegistry::new();
        let session = registry.open(());

        assert_eq!(registry.len(), 1);
        assert!(!session.is_cancelled());
    }

    #[test]
    fn close_removes_and_cancels_the_session() {
        let registry = SessionRegistry::new();
        let session = registry.open(());
        let token = session.cancellation_token();

        registry.close(session.id());

        assert!(registry.is_empty());
        assert!(token.is_cancelled());
    }

    #[test]
    fn close_of_unknown_session_is_a_no_op() {
        let registry = SessionRegistry::new();
        let kept = registry.open(());

        registry.close(&SessionId::new());

        assert_eq!(registry.len(), 1);
        assert!(!kept.is_cancelled());
    }

    #[test]
    fn cancel_all_signals_every_session() {
        let registry = SessionRegistry::new();
        let first = registry.open(());
        let second = registry.open(());

        registry.cancel_all();

        assert!(first.is_cancelled());
        assert!(second.is_cancelled());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn standalone_session_is_not_registered_anywhere() {
        let session = StreamSession::new(());
        let (id, token, ()) = session.into_parts();

        assert!(!id.as_str().is_empty());
        assert!(!token.is_cancelled());
    }
}
