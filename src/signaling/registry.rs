use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use super::client::Client;
use super::session::{Session, SessionData};

/// Point-in-time view of the registry for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    pub count: usize,
    /// Session id -> public session data
    pub sessions: Option<HashMap<String, SessionData>>,
    /// Connection index -> session id
    pub connections: Option<HashMap<String, String>>,
}

/// Live connections keyed by session id.
///
/// Locks are held only for the map operation itself. Clients are cloned out
/// before anything is sent or closed.
#[derive(Default)]
pub struct Registry {
    clients: RwLock<HashMap<String, Arc<dyn Client>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client under its session id, closing any client it replaces.
    pub fn register(&self, session: &Session, client: Arc<dyn Client>) {
        let replaced = self.clients.write().insert(session.id.clone(), client);

        info!("Registered session {}", session.id);
        if let Some(stale) = replaced {
            info!(
                "Session {} replaced connection {}",
                session.id,
                stale.index()
            );
            stale.close(false);
        }
    }

    pub fn unregister(&self, session: &Session) {
        if self.clients.write().remove(&session.id).is_some() {
            debug!("Unregistered session {}", session.id);
        }
    }

    pub fn lookup(&self, id: &str) -> Option<Arc<dyn Client>> {
        self.clients.read().get(id).cloned()
    }

    pub fn session(&self, id: &str) -> Option<Arc<Session>> {
        self.lookup(id).map(|client| client.session().clone())
    }

    /// Public data of every live session authenticated as `userid`.
    pub fn user_sessions(&self, userid: &str) -> Vec<SessionData> {
        let sessions: Vec<Arc<Session>> = self
            .clients
            .read()
            .values()
            .map(|client| client.session().clone())
            .collect();

        sessions
            .iter()
            .filter(|session| session.userid() == userid)
            .map(|session| session.data())
            .collect()
    }

    pub fn snapshot(&self, details: bool) -> RegistrySnapshot {
        let clients = self.clients.read();
        let mut snapshot = RegistrySnapshot {
            count: clients.len(),
            ..Default::default()
        };

        if details {
            snapshot.sessions = Some(
                clients
                    .iter()
                    .map(|(id, client)| (id.clone(), client.session().data()))
                    .collect(),
            );
            snapshot.connections = Some(
                clients
                    .iter()
                    .map(|(id, client)| (client.index().to_string(), id.clone()))
                    .collect(),
            );
        }

        snapshot
    }
}
