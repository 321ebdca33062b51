//! WebSocket signaling hub: session registry, message routing, relay
//! credentials and the contact exchange

mod channelling;
mod client;
mod contact;
mod messages;
mod registry;
mod relay;
mod rooms;
mod router;
mod server;
mod session;
#[cfg(test)]
mod testing;
mod token;
mod types;

pub use channelling::ChannellingApi;
pub use client::{Client, JsonEncoder, OutgoingEncoder};
pub use contact::{Contact, ContactManager};
pub use messages::{ClientMessage, ContactRequest, Envelope, Payload, ServerMessage};
pub use registry::{Registry, RegistrySnapshot};
pub use relay::{DEFAULT_TURN_TTL, RelayCredential, RelayCredentials};
pub use rooms::{DEFAULT_MAX_BROADCASTS_PER_SECOND, DEFAULT_MAX_ROOM_USERS, RoomManager, Rooms};
pub use router::Router;
pub use server::{DEFAULT_SIGNALING_PORT, SignalingServer};
pub use session::{STATUS_HARD, STATUS_SOFT, Session, SessionData};
pub use token::TokenCodec;
pub use types::{
    ContactField, EncodeError, OutboundMessage, Party, SignalingError, TokenError,
    generate_session_id,
};
