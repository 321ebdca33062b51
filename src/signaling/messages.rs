use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::relay::RelayCredential;
use super::session::SessionData;

/// Messages sent from client to server
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Join a room (leaving the current one first)
    #[serde(rename = "hello")]
    Hello {
        #[serde(default)]
        id: String,
        #[serde(default)]
        ua: String,
    },

    /// Bind a user id to this session
    #[serde(rename = "authenticate")]
    Authenticate { userid: String, nonce: String },

    /// Ask for own session info and fresh relay credentials
    #[serde(rename = "self")]
    Identify,

    /// List the other members of the current room
    #[serde(rename = "users")]
    Users,

    #[serde(rename = "offer")]
    Offer { to: String, data: Value },

    #[serde(rename = "answer")]
    Answer { to: String, data: Value },

    #[serde(rename = "candidate")]
    Candidate { to: String, data: Value },

    #[serde(rename = "bye")]
    Bye {
        to: String,
        #[serde(default)]
        data: Value,
    },

    /// Chat to one session, or to the whole room when `to` is empty
    #[serde(rename = "chat")]
    Chat {
        #[serde(default)]
        to: String,
        message: String,
    },

    #[serde(rename = "contact_request")]
    ContactRequest {
        to: String,
        #[serde(default)]
        success: bool,
        #[serde(default)]
        token: String,
    },

    /// Find the live sessions of the user behind a contact token
    #[serde(rename = "sessions")]
    Sessions { token: String },
}

/// Messages sent from server directly to one client
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "self")]
    SelfInfo {
        id: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        userid: String,
        version: String,
        turn: RelayCredential,
    },

    /// Room joined successfully, with the other members
    #[serde(rename = "welcome")]
    Welcome { room: String, users: Vec<SessionData> },

    #[serde(rename = "users")]
    Users { users: Vec<SessionData> },

    #[serde(rename = "sessions")]
    Sessions { users: Vec<SessionData> },

    /// Error response
    #[serde(rename = "error")]
    Error { code: String, message: String },
}

/// Contact exchange state carried between the two parties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRequest {
    pub success: bool,
    #[serde(default)]
    pub token: String,
}

/// Data routed between sessions inside an [`Envelope`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Payload {
    /// Session state change (join, soft or hard leave)
    #[serde(rename = "session")]
    Session(SessionData),

    #[serde(rename = "offer")]
    Offer { data: Value },

    #[serde(rename = "answer")]
    Answer { data: Value },

    #[serde(rename = "candidate")]
    Candidate { data: Value },

    #[serde(rename = "bye")]
    Bye { data: Value },

    #[serde(rename = "chat")]
    Chat { message: String },

    #[serde(rename = "contact_request")]
    ContactRequest(ContactRequest),
}

/// Routed message wrapper. `to` is empty for room broadcasts.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename = "envelope")]
pub struct Envelope {
    pub from: String,
    pub to: String,
    #[serde(rename = "a", skip_serializing_if = "String::is_empty")]
    pub attestation: String,
    pub data: Payload,
}
