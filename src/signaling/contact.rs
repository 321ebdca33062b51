use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::messages::ContactRequest;
use super::registry::Registry;
use super::session::Session;
use super::token::TokenCodec;
use super::types::{ContactField, Party, SignalingError};

const CONTACT_TOKEN: &str = "contact";

/// A consented relation between two user ids. Only ever exists inside a
/// contact token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub a: String,
    pub b: String,
}

/// Drives the request / confirm / deny contact exchange.
pub struct ContactManager {
    registry: Arc<Registry>,
    tokens: Arc<TokenCodec>,
}

impl ContactManager {
    pub fn new(registry: Arc<Registry>, tokens: Arc<TokenCodec>) -> Self {
        Self { registry, tokens }
    }

    pub fn encode(&self, contact: &Contact) -> Result<String, SignalingError> {
        Ok(self.tokens.encode(CONTACT_TOKEN, contact)?)
    }

    pub fn decode(&self, token: &str) -> Result<Contact, SignalingError> {
        Ok(self.tokens.decode(CONTACT_TOKEN, token)?)
    }

    /// Advance a contact exchange between `session` and session `to`.
    ///
    /// A new request gets a fresh token written into `request`; a denial has
    /// its token cleared; a confirmation is verified against the token.
    pub fn handle_request(
        &self,
        session: &Session,
        to: &str,
        request: &mut ContactRequest,
    ) -> Result<(), SignalingError> {
        if request.success {
            self.confirm(session, to, &request.token)
        } else if !request.token.is_empty() {
            request.token.clear();
            Ok(())
        } else {
            request.token = self.create(session, to)?;
            Ok(())
        }
    }

    /// The user id on the other side of `token` from `session`.
    pub fn contact_id(&self, session: &Session, token: &str) -> Result<String, SignalingError> {
        let contact = self.decode(token)?;
        let own = session.userid();
        if !own.is_empty() && contact.a == own {
            Ok(contact.b)
        } else if !own.is_empty() && contact.b == own {
            Ok(contact.a)
        } else {
            Err(SignalingError::ForeignContact {
                a: contact.a,
                b: contact.b,
            })
        }
    }

    fn create(&self, session: &Session, to: &str) -> Result<String, SignalingError> {
        let own = own_userid(session)?;
        let peer = self.peer_userid(to)?;
        if peer == own {
            return Err(SignalingError::SelfContact { userid: own });
        }

        self.encode(&Contact { a: peer, b: own })
    }

    fn confirm(&self, session: &Session, to: &str, token: &str) -> Result<(), SignalingError> {
        let contact = self.decode(token)?;
        let own = own_userid(session)?;
        let peer = self.peer_userid(to)?;

        if own != contact.a {
            return Err(SignalingError::ContactMismatch {
                field: ContactField::A,
            });
        }
        if peer != contact.b {
            return Err(SignalingError::ContactMismatch {
                field: ContactField::B,
            });
        }
        Ok(())
    }

    fn peer_userid(&self, to: &str) -> Result<String, SignalingError> {
        let peer = self
            .registry
            .session(to)
            .ok_or_else(|| SignalingError::PeerNotFound { id: to.to_string() })?;
        let userid = peer.userid();
        if userid.is_empty() {
            return Err(SignalingError::MissingIdentity { side: Party::Peer });
        }
        Ok(userid)
    }
}

fn own_userid(session: &Session) -> Result<String, SignalingError> {
    let userid = session.userid();
    if userid.is_empty() {
        return Err(SignalingError::MissingIdentity { side: Party::Own });
    }
    Ok(userid)
}
