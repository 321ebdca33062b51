use std::sync::Arc;

use tracing::warn;

use super::messages::{Envelope, ServerMessage};
use super::session::Session;
use super::types::{EncodeError, OutboundMessage};

/// Capabilities a transport connection exposes to the hub.
///
/// `send` must not block; implementations queue the message and serialize
/// writes to their own connection.
pub trait Client: Send + Sync {
    /// Queue an already encoded message.
    fn send(&self, message: OutboundMessage);

    /// Send a direct (non-routed) message to this client.
    fn reply(&self, message: &ServerMessage) {
        match serde_json::to_string(message) {
            Ok(json) => self.send(OutboundMessage::from(json)),
            Err(e) => warn!("Failed to encode reply for {}: {}", self.session().id, e),
        }
    }

    fn session(&self) -> &Arc<Session>;

    /// Close the connection. A non-graceful close skips the close handshake.
    fn close(&self, graceful: bool);

    /// Connection slot number, unique per process.
    fn index(&self) -> u64;
}

/// Encodes routed envelopes for the wire.
pub trait OutgoingEncoder: Send + Sync {
    fn encode_outgoing(&self, envelope: &Envelope) -> Result<OutboundMessage, EncodeError>;
}

/// JSON text frames
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonEncoder;

impl OutgoingEncoder for JsonEncoder {
    fn encode_outgoing(&self, envelope: &Envelope) -> Result<OutboundMessage, EncodeError> {
        Ok(OutboundMessage::from(serde_json::to_string(envelope)?))
    }
}
