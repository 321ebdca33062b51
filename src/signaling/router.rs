use std::sync::Arc;

use tracing::{info, warn};

use super::client::OutgoingEncoder;
use super::messages::{Envelope, Payload};
use super::registry::Registry;
use super::rooms::RoomManager;
use super::session::Session;

/// Delivers routed payloads. Unicast goes through the registry, broadcast is
/// handed to the room manager, which owns membership.
#[derive(Clone)]
pub struct Router {
    registry: Arc<Registry>,
    rooms: Arc<dyn RoomManager>,
    encoder: Arc<dyn OutgoingEncoder>,
}

impl Router {
    pub fn new(
        registry: Arc<Registry>,
        rooms: Arc<dyn RoomManager>,
        encoder: Arc<dyn OutgoingEncoder>,
    ) -> Self {
        Self {
            registry,
            rooms,
            encoder,
        }
    }

    /// Fire-and-forget delivery to one session. Unknown targets are dropped.
    pub fn unicast(&self, from: &Session, to: &str, payload: Payload) {
        let envelope = Envelope {
            from: from.id.clone(),
            to: to.to_string(),
            attestation: from.attestation().to_string(),
            data: payload,
        };
        let message = match self.encoder.encode_outgoing(&envelope) {
            Ok(message) => message,
            Err(e) => {
                warn!("Unicast from {} dropped: {}", from.id, e);
                return;
            }
        };

        match self.registry.lookup(to) {
            Some(client) => client.send(message),
            None => info!("Unicast target {} not found", to),
        }
    }

    pub fn broadcast(&self, from: &Session, payload: Payload) {
        self.rooms.broadcast(from, payload);
    }
}
