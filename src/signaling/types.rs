use rand::Rng;
use thiserror::Error;
use tokio_tungstenite::tungstenite::Utf8Bytes;

/// Signaling protocol errors.
///
/// All of these are recoverable: they are reported back to the client that
/// triggered them and never tear down its connection.
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("invalid token")]
    TokenInvalid(#[from] TokenError),

    #[error("{side} session has no userid")]
    MissingIdentity { side: Party },

    #[error("session not found: {id}")]
    PeerNotFound { id: String },

    #[error("contact mismatch in {field}")]
    ContactMismatch { field: ContactField },

    #[error("cannot create a contact with own userid {userid}")]
    SelfContact { userid: String },

    #[error("ignoring foreign contact token ({a}, {b})")]
    ForeignContact { a: String, b: String },

    #[error("not allowed to join room {room:?}")]
    JoinDenied { room: String },

    #[error("authentication failed for userid {userid}")]
    AuthenticationFailed { userid: String },
}

impl SignalingError {
    /// Stable error code sent to clients in `error` messages.
    pub fn code(&self) -> &'static str {
        match self {
            SignalingError::TokenInvalid(_) => "token_invalid",
            SignalingError::MissingIdentity { .. } => "missing_identity",
            SignalingError::PeerNotFound { .. } => "peer_not_found",
            SignalingError::ContactMismatch { .. } => "contact_mismatch",
            SignalingError::SelfContact { .. } => "self_contact",
            SignalingError::ForeignContact { .. } => "foreign_contact",
            SignalingError::JoinDenied { .. } => "join_denied",
            SignalingError::AuthenticationFailed { .. } => "authentication_failed",
        }
    }
}

/// Which side of a contact exchange an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Own,
    Peer,
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Party::Own => f.write_str("own"),
            Party::Peer => f.write_str("peer"),
        }
    }
}

/// Contact field that failed verification on confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    A,
    B,
}

impl std::fmt::Display for ContactField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContactField::A => f.write_str("a"),
            ContactField::B => f.write_str("b"),
        }
    }
}

/// Token codec failures
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token encoding")]
    Encoding,

    #[error("token too short")]
    Truncated,

    #[error("token signature mismatch")]
    Signature,

    #[error("token decryption failed")]
    Decrypt,

    #[error("token encryption failed")]
    Encrypt,

    #[error("token payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Envelope encoding failure
#[derive(Debug, Error)]
#[error("failed to encode outgoing message: {0}")]
pub struct EncodeError(#[from] pub serde_json::Error);

const SESSION_ID_LEN: usize = 32;
const HEX_CHARS: &[u8] = b"0123456789abcdef";

/// Generate a random session id (32 hex chars).
pub fn generate_session_id() -> String {
    let mut rng = rand::rng();
    (0..SESSION_ID_LEN)
        .map(|_| HEX_CHARS[rng.random_range(0..HEX_CHARS.len())] as char)
        .collect()
}

/// Wrapper for outbound WebSocket messages using tungstenite's Utf8Bytes.
///
/// Cloning is a reference count bump, so one encoded envelope can be handed
/// to many clients.
#[derive(Debug, Clone)]
pub struct OutboundMessage(Utf8Bytes);

impl OutboundMessage {
    /// Create a new outbound message from any string type
    pub fn new(s: impl Into<Utf8Bytes>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Get the inner Utf8Bytes for tungstenite Message::Text
    pub fn into_inner(self) -> Utf8Bytes {
        self.0
    }
}

impl From<String> for OutboundMessage {
    fn from(s: String) -> Self {
        Self(Utf8Bytes::from(s))
    }
}
