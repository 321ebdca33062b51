//! TURN REST API credentials (draft-uberti-behave-turn-rest).
//!
//! The relay server shares `secret` (coturn's `static-auth-secret`) and
//! validates a username/password pair by recomputing the HMAC. Nothing is
//! stored here.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use super::session::Session;

type HmacSha1 = Hmac<Sha1>;

pub const DEFAULT_TURN_TTL: u64 = 3600;

/// Time-limited relay credential. All fields empty when relay auth is off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayCredential {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub ttl: u64,
    #[serde(default)]
    pub urls: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RelayCredentials {
    secret: Vec<u8>,
    ttl: u64,
    uris: Vec<String>,
}

impl RelayCredentials {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: u64, uris: Vec<String>) -> Self {
        Self {
            secret: secret.into(),
            ttl,
            uris,
        }
    }

    pub fn issue(&self, session: &Session) -> RelayCredential {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.issue_at(session, now)
    }

    /// Issue a credential as if the current time were `now` (unix seconds).
    pub fn issue_at(&self, session: &Session, now: u64) -> RelayCredential {
        if self.secret.is_empty() {
            return RelayCredential::default();
        }

        let hashed_id = BASE64.encode(Sha256::digest(session.id.as_bytes()));
        let expiration = now.saturating_add(self.ttl);
        let username = format!("{}:{}", expiration, hashed_id);
        let password = self.password(&username);

        RelayCredential {
            username,
            password,
            ttl: self.ttl,
            urls: self.uris.clone(),
        }
    }

    /// base64(HMAC-SHA1(secret, username))
    pub fn password(&self, username: &str) -> String {
        let mut mac = HmacSha1::new_from_slice(&self.secret).expect("HMAC accepts any key size");
        mac.update(username.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }
}
