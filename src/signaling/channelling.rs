use std::sync::Arc;

use tracing::{debug, info, warn};

use super::client::{Client, OutgoingEncoder};
use super::contact::ContactManager;
use super::messages::{ClientMessage, ContactRequest, Payload, ServerMessage};
use super::registry::{Registry, RegistrySnapshot};
use super::relay::RelayCredentials;
use super::rooms::RoomManager;
use super::router::Router;
use super::session::{STATUS_HARD, STATUS_SOFT, Session};
use super::token::TokenCodec;
use super::types::SignalingError;

const ATTESTATION_TOKEN: &str = "attestation";

/// Interprets inbound client messages and drives room membership.
pub struct ChannellingApi {
    version: String,
    registry: Arc<Registry>,
    rooms: Arc<dyn RoomManager>,
    router: Router,
    relay: RelayCredentials,
    contacts: ContactManager,
    tokens: Arc<TokenCodec>,
}

impl ChannellingApi {
    pub fn new(
        version: impl Into<String>,
        tokens: Arc<TokenCodec>,
        relay: RelayCredentials,
        rooms: Arc<dyn RoomManager>,
        encoder: Arc<dyn OutgoingEncoder>,
    ) -> Self {
        let registry = Arc::new(Registry::new());
        Self {
            version: version.into(),
            router: Router::new(registry.clone(), rooms.clone(), encoder),
            contacts: ContactManager::new(registry.clone(), tokens.clone()),
            registry,
            rooms,
            relay,
            tokens,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn stats(&self, details: bool) -> RegistrySnapshot {
        self.registry.snapshot(details)
    }

    /// Attestation for a new session id.
    pub fn attestation(&self, session_id: &str) -> String {
        match self.tokens.encode(ATTESTATION_TOKEN, &session_id) {
            Ok(token) => token,
            Err(e) => {
                warn!("Failed to create attestation for {}: {}", session_id, e);
                String::new()
            }
        }
    }

    pub fn on_connect(&self, client: Arc<dyn Client>) {
        let session = client.session().clone();
        self.registry.register(&session, client.clone());
        client.reply(&self.self_info(&session));
    }

    pub fn on_disconnect(&self, client: &Arc<dyn Client>) {
        let session = client.session();
        if session.room().is_some() {
            self.leave_room(session, STATUS_HARD);
        }
        self.registry.unregister(session);
        debug!(
            "Session {} disconnected, {} online",
            session.id,
            self.registry.snapshot(false).count
        );
    }

    pub fn on_incoming(
        &self,
        client: &Arc<dyn Client>,
        message: ClientMessage,
    ) -> Result<(), SignalingError> {
        let session = client.session();

        match message {
            ClientMessage::Hello { id, ua } => self.handle_hello(client, &id, &ua),

            ClientMessage::Authenticate { userid, nonce } => {
                if !self.tokens.verify_user_nonce(&userid, &nonce) {
                    return Err(SignalingError::AuthenticationFailed { userid });
                }
                info!("Session {} authenticated as {}", session.id, userid);
                session.set_userid(userid);
                client.reply(&self.self_info(session));
                Ok(())
            }

            ClientMessage::Identify => {
                client.reply(&self.self_info(session));
                Ok(())
            }

            ClientMessage::Users => {
                client.reply(&ServerMessage::Users {
                    users: self.rooms.room_users(session),
                });
                Ok(())
            }

            ClientMessage::Offer { to, data } => {
                self.router.unicast(session, &to, Payload::Offer { data });
                Ok(())
            }

            ClientMessage::Answer { to, data } => {
                self.router.unicast(session, &to, Payload::Answer { data });
                Ok(())
            }

            ClientMessage::Candidate { to, data } => {
                self.router
                    .unicast(session, &to, Payload::Candidate { data });
                Ok(())
            }

            ClientMessage::Bye { to, data } => {
                self.router.unicast(session, &to, Payload::Bye { data });
                Ok(())
            }

            ClientMessage::Chat { to, message } => {
                let payload = Payload::Chat { message };
                if to.is_empty() {
                    self.router.broadcast(session, payload);
                } else {
                    self.router.unicast(session, &to, payload);
                }
                Ok(())
            }

            ClientMessage::ContactRequest { to, success, token } => {
                let mut request = ContactRequest { success, token };
                if let Err(e) = self.contacts.handle_request(session, &to, &mut request) {
                    warn!("Contact request from {} to {} failed: {}", session.id, to, e);
                    return Err(e);
                }
                self.router
                    .unicast(session, &to, Payload::ContactRequest(request));
                Ok(())
            }

            ClientMessage::Sessions { token } => {
                let userid = self.contacts.contact_id(session, &token)?;
                client.reply(&ServerMessage::Sessions {
                    users: self.registry.user_sessions(&userid),
                });
                Ok(())
            }
        }
    }

    /// Join `room_id`, leaving the current room first when it differs.
    ///
    /// The permission gate is checked before anything changes, so a denied
    /// join leaves membership untouched and broadcasts nothing. Members
    /// re-joining their current room are not gated.
    fn handle_hello(
        &self,
        client: &Arc<dyn Client>,
        room_id: &str,
        ua: &str,
    ) -> Result<(), SignalingError> {
        let session = client.session();
        let current = session.room();
        let rejoin = current.as_deref() == Some(room_id);

        if !rejoin && !self.rooms.can_join_room(room_id) {
            info!("Session {} denied joining room {:?}", session.id, room_id);
            return Err(SignalingError::JoinDenied {
                room: room_id.to_string(),
            });
        }

        if current.is_some() && !rejoin {
            self.leave_room(session, STATUS_SOFT);
        }

        session.join(room_id, ua);
        if !self.rooms.join_room(session, client.clone()) {
            session.clear_room();
            return Err(SignalingError::JoinDenied {
                room: room_id.to_string(),
            });
        }
        self.router
            .broadcast(session, Payload::Session(session.data()));

        client.reply(&ServerMessage::Welcome {
            room: room_id.to_string(),
            users: self.rooms.room_users(session),
        });
        Ok(())
    }

    fn leave_room(&self, session: &Session, status: &str) {
        session.mark_leaving(status);
        self.rooms.leave_room(session);
        self.router
            .broadcast(session, Payload::Session(session.data()));
        session.clear_room();
    }

    fn self_info(&self, session: &Session) -> ServerMessage {
        ServerMessage::SelfInfo {
            id: session.id.clone(),
            userid: session.userid(),
            version: self.version.clone(),
            turn: self.relay.issue(session),
        }
    }
}
