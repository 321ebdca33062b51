use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Leave status marking a room switch.
pub const STATUS_SOFT: &str = "soft";
/// Leave status marking a disconnect.
pub const STATUS_HARD: &str = "hard";

/// Server-side state for one connected party.
///
/// `id` and `attestation` are fixed for the lifetime of the connection. The
/// rest is mutated by the connection's own worker and read by diagnostics,
/// so it sits behind a lock that is only ever held for a field copy.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    attestation: String,
    state: RwLock<SessionState>,
}

#[derive(Debug, Default, Clone)]
struct SessionState {
    userid: String,
    room: Option<String>,
    status: String,
    ua: String,
}

/// Public view of a session, as broadcast to room members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub userid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ua: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
}

impl Session {
    pub fn new(id: impl Into<String>, attestation: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attestation: attestation.into(),
            state: RwLock::new(SessionState::default()),
        }
    }

    pub fn attestation(&self) -> &str {
        &self.attestation
    }

    pub fn userid(&self) -> String {
        self.state.read().userid.clone()
    }

    pub fn set_userid(&self, userid: impl Into<String>) {
        self.state.write().userid = userid.into();
    }

    /// Current room, `None` while unjoined.
    pub fn room(&self) -> Option<String> {
        self.state.read().room.clone()
    }

    pub fn status(&self) -> String {
        self.state.read().status.clone()
    }

    pub fn ua(&self) -> String {
        self.state.read().ua.clone()
    }

    /// Enter a room, clearing any leave status.
    pub fn join(&self, room: impl Into<String>, ua: impl Into<String>) {
        let mut state = self.state.write();
        state.room = Some(room.into());
        state.ua = ua.into();
        state.status.clear();
    }

    /// Mark the session as leaving with the given status. Membership is kept
    /// until [`Session::clear_room`] so the leave can still be broadcast to
    /// the old room.
    pub fn mark_leaving(&self, status: &str) {
        self.state.write().status = status.to_string();
    }

    pub fn clear_room(&self) {
        self.state.write().room = None;
    }

    pub fn data(&self) -> SessionData {
        let state = self.state.read();
        SessionData {
            id: self.id.clone(),
            userid: state.userid.clone(),
            ua: state.ua.clone(),
            status: state.status.clone(),
        }
    }
}
