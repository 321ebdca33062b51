use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use super::client::{Client, OutgoingEncoder};
use super::messages::{Envelope, Payload};
use super::session::{Session, SessionData};

pub const DEFAULT_MAX_ROOM_USERS: usize = 5000;
pub const DEFAULT_MAX_BROADCASTS_PER_SECOND: u32 = 1000;

/// Room membership and permission policy, consulted by the channelling API.
///
/// Implementations must be safe to call from any connection worker.
pub trait RoomManager: Send + Sync {
    fn can_join_room(&self, room_id: &str) -> bool;

    /// Public data of the other members of the session's room.
    fn room_users(&self, session: &Session) -> Vec<SessionData>;

    /// Add the session to its room. Returns false when the room filled up
    /// since `can_join_room` was consulted.
    fn join_room(&self, session: &Session, sender: Arc<dyn Client>) -> bool;

    fn leave_room(&self, session: &Session);

    /// Deliver `payload` to every other member of the session's room.
    fn broadcast(&self, session: &Session, payload: Payload);
}

struct BroadcastWindow {
    started: Instant,
    count: u32,
}

/// In-memory rooms with a size cap and a global broadcast budget.
///
/// Session state changes are always delivered; only chat draws from the
/// budget.
pub struct Rooms {
    rooms: RwLock<HashMap<String, HashMap<String, Arc<dyn Client>>>>,
    encoder: Arc<dyn OutgoingEncoder>,
    max_users: usize,
    max_broadcasts_per_second: u32,
    window: Mutex<BroadcastWindow>,
}

impl Rooms {
    pub fn new(
        encoder: Arc<dyn OutgoingEncoder>,
        max_users: usize,
        max_broadcasts_per_second: u32,
    ) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            encoder,
            max_users,
            max_broadcasts_per_second,
            window: Mutex::new(BroadcastWindow {
                started: Instant::now(),
                count: 0,
            }),
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.read().len()
    }

    fn acquire_broadcast(&self) -> bool {
        let mut window = self.window.lock();
        if window.started.elapsed() >= Duration::from_secs(1) {
            window.started = Instant::now();
            window.count = 0;
        }
        if window.count >= self.max_broadcasts_per_second {
            return false;
        }
        window.count += 1;
        true
    }
}

impl RoomManager for Rooms {
    fn can_join_room(&self, room_id: &str) -> bool {
        self.rooms
            .read()
            .get(room_id)
            .is_none_or(|members| members.len() < self.max_users)
    }

    fn room_users(&self, session: &Session) -> Vec<SessionData> {
        let Some(room_id) = session.room() else {
            return Vec::new();
        };
        let members: Vec<Arc<dyn Client>> = match self.rooms.read().get(&room_id) {
            Some(members) => members.values().cloned().collect(),
            None => return Vec::new(),
        };

        members
            .iter()
            .filter(|client| client.session().id != session.id)
            .map(|client| client.session().data())
            .collect()
    }

    fn join_room(&self, session: &Session, sender: Arc<dyn Client>) -> bool {
        let Some(room_id) = session.room() else {
            return false;
        };
        let mut rooms = self.rooms.write();
        let members = rooms.get(&room_id);
        let present = members.is_some_and(|m| m.contains_key(&session.id));
        if !present && members.map_or(0, HashMap::len) >= self.max_users {
            warn!(
                "Room {:?} is full, session {} not joined",
                room_id, session.id
            );
            return false;
        }
        rooms
            .entry(room_id.clone())
            .or_default()
            .insert(session.id.clone(), sender);
        drop(rooms);

        info!("Session {} joined room {:?}", session.id, room_id);
        true
    }

    fn leave_room(&self, session: &Session) {
        let Some(room_id) = session.room() else {
            return;
        };
        let mut rooms = self.rooms.write();
        if let Some(members) = rooms.get_mut(&room_id) {
            members.remove(&session.id);
            if members.is_empty() {
                rooms.remove(&room_id);
                info!("Room {:?} removed (empty)", room_id);
            }
        }
        info!("Session {} left room {:?}", session.id, room_id);
    }

    fn broadcast(&self, session: &Session, payload: Payload) {
        let Some(room_id) = session.room() else {
            return;
        };
        let state_change = matches!(payload, Payload::Session(_));
        if !state_change && !self.acquire_broadcast() {
            warn!(
                "Broadcast budget exhausted, dropping broadcast from {}",
                session.id
            );
            return;
        }

        let envelope = Envelope {
            from: session.id.clone(),
            to: String::new(),
            attestation: session.attestation().to_string(),
            data: payload,
        };
        let message = match self.encoder.encode_outgoing(&envelope) {
            Ok(message) => message,
            Err(e) => {
                warn!("Broadcast from {} dropped: {}", session.id, e);
                return;
            }
        };

        let members: Vec<Arc<dyn Client>> = match self.rooms.read().get(&room_id) {
            Some(members) => members
                .iter()
                .filter(|(id, _)| **id != session.id)
                .map(|(_, client)| client.clone())
                .collect(),
            None => return,
        };
        for client in members {
            client.send(message.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signaling::client::JsonEncoder;
    use crate::signaling::testing::FakeClient;

    fn rooms(max_users: usize, max_broadcasts: u32) -> Rooms {
        Rooms::new(Arc::new(JsonEncoder), max_users, max_broadcasts)
    }

    fn joined(rooms: &Rooms, id: &str, room: &str) -> Arc<FakeClient> {
        let client = FakeClient::new(id, 0);
        client.session().join(room, "");
        assert!(rooms.join_room(client.session(), client.clone()));
        client
    }

    fn chat(text: &str) -> Payload {
        Payload::Chat {
            message: text.to_string(),
        }
    }

    #[test]
    fn broadcast_reaches_other_members_only() {
        let rooms = rooms(10, 100);
        let a = joined(&rooms, "a", "lobby");
        let b = joined(&rooms, "b", "lobby");
        let c = joined(&rooms, "c", "elsewhere");

        rooms.broadcast(a.session(), chat("hi"));

        assert!(a.sent().is_empty());
        assert!(c.sent().is_empty());
        let sent = b.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["from"], "a");
        assert_eq!(sent[0]["to"], "");
        assert_eq!(sent[0]["data"]["message"], "hi");
    }

    #[test]
    fn broadcast_without_room_is_ignored() {
        let rooms = rooms(10, 100);
        let b = joined(&rooms, "b", "lobby");
        let loner = FakeClient::new("loner", 0);

        rooms.broadcast(loner.session(), chat("hi"));
        assert!(b.sent().is_empty());
    }

    #[test]
    fn room_size_is_capped() {
        let rooms = rooms(2, 100);
        assert!(rooms.can_join_room("lobby"));
        joined(&rooms, "a", "lobby");
        assert!(rooms.can_join_room("lobby"));
        joined(&rooms, "b", "lobby");
        assert!(!rooms.can_join_room("lobby"));
        assert!(rooms.can_join_room("other"));
    }

    #[test]
    fn room_users_excludes_self() {
        let rooms = rooms(10, 100);
        let a = joined(&rooms, "a", "lobby");
        joined(&rooms, "b", "lobby");
        joined(&rooms, "c", "other");

        let users = rooms.room_users(a.session());
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, "b");
    }

    #[test]
    fn empty_rooms_are_removed() {
        let rooms = rooms(10, 100);
        let a = joined(&rooms, "a", "lobby");
        assert_eq!(rooms.room_count(), 1);

        rooms.leave_room(a.session());
        assert_eq!(rooms.room_count(), 0);
    }

    #[test]
    fn broadcasts_over_budget_are_dropped() {
        let rooms = rooms(10, 3);
        let a = joined(&rooms, "a", "lobby");
        let b = joined(&rooms, "b", "lobby");

        for n in 0..5 {
            rooms.broadcast(a.session(), chat(&n.to_string()));
        }

        assert_eq!(b.sent().len(), 3);
    }

    #[test]
    fn session_updates_bypass_the_budget() {
        let rooms = rooms(10, 2);
        let a = joined(&rooms, "a", "lobby");
        let b = joined(&rooms, "b", "lobby");

        for n in 0..5 {
            rooms.broadcast(b.session(), chat(&n.to_string()));
        }
        b.session().mark_leaving("hard");
        rooms.broadcast(b.session(), Payload::Session(b.session().data()));

        let sent = a.sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[2]["data"]["type"], "session");
        assert_eq!(sent[2]["data"]["status"], "hard");
    }

    #[test]
    fn join_rechecks_the_cap() {
        let rooms = rooms(1, 100);
        joined(&rooms, "a", "lobby");

        let late = FakeClient::new("late", 0);
        late.session().join("lobby", "");
        assert!(!rooms.join_room(late.session(), late.clone()));
        assert_eq!(rooms.room_users(late.session()).len(), 1);
    }

    #[test]
    fn rejoin_of_a_member_is_not_capped() {
        let rooms = rooms(1, 100);
        let a = joined(&rooms, "a", "lobby");

        assert!(rooms.join_room(a.session(), a.clone()));
        assert!(rooms.room_users(a.session()).is_empty());
    }
}
