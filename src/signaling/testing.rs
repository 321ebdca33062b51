//! Test doubles for the client and room manager capabilities.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use super::client::Client;
use super::messages::Payload;
use super::rooms::RoomManager;
use super::session::{Session, SessionData};
use super::types::OutboundMessage;

pub(crate) struct FakeClient {
    session: Arc<Session>,
    index: u64,
    sent: Mutex<Vec<String>>,
    closed: Mutex<Option<bool>>,
}

impl FakeClient {
    pub(crate) fn new(id: &str, index: u64) -> Arc<Self> {
        Self::with_session(Arc::new(Session::new(id, format!("att-{}", id))), index)
    }

    pub(crate) fn with_session(session: Arc<Session>, index: u64) -> Arc<Self> {
        Arc::new(Self {
            session,
            index,
            sent: Mutex::new(Vec::new()),
            closed: Mutex::new(None),
        })
    }

    /// Everything sent so far, parsed as JSON.
    pub(crate) fn sent(&self) -> Vec<Value> {
        self.sent
            .lock()
            .iter()
            .map(|text| serde_json::from_str(text).expect("client received valid JSON"))
            .collect()
    }

    /// `Some(graceful)` once closed.
    pub(crate) fn closed(&self) -> Option<bool> {
        *self.closed.lock()
    }
}

impl Client for FakeClient {
    fn send(&self, message: OutboundMessage) {
        self.sent.lock().push(message.as_str().to_string());
    }

    fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn close(&self, graceful: bool) {
        *self.closed.lock() = Some(graceful);
    }

    fn index(&self) -> u64 {
        self.index
    }
}

/// Records every call it receives.
#[derive(Default)]
pub(crate) struct FakeRoomManager {
    pub(crate) disallow_join: Mutex<bool>,
    /// Refuse in `join_room` after the gate allowed it.
    pub(crate) room_full: Mutex<bool>,
    pub(crate) joined_room: Mutex<Option<String>>,
    pub(crate) left_room: Mutex<Option<String>>,
    pub(crate) room_users: Mutex<Vec<SessionData>>,
    pub(crate) broadcasts: Mutex<Vec<Payload>>,
}

impl FakeRoomManager {
    pub(crate) fn broadcasts(&self) -> Vec<Payload> {
        self.broadcasts.lock().clone()
    }

    pub(crate) fn broadcast_sessions(&self) -> Vec<SessionData> {
        self.broadcasts()
            .into_iter()
            .map(|payload| match payload {
                Payload::Session(data) => data,
                other => panic!("Expected a session data broadcast, got {:?}", other),
            })
            .collect()
    }
}

impl RoomManager for FakeRoomManager {
    fn can_join_room(&self, _room_id: &str) -> bool {
        !*self.disallow_join.lock()
    }

    fn room_users(&self, _session: &Session) -> Vec<SessionData> {
        self.room_users.lock().clone()
    }

    fn join_room(&self, session: &Session, _sender: Arc<dyn Client>) -> bool {
        if *self.room_full.lock() {
            return false;
        }
        *self.joined_room.lock() = session.room();
        true
    }

    fn leave_room(&self, session: &Session) {
        *self.left_room.lock() = session.room();
    }

    fn broadcast(&self, _session: &Session, payload: Payload) {
        self.broadcasts.lock().push(payload);
    }
}
