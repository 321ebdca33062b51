//! Signed and encrypted tokens.
//!
//! Layout before base64url: `nonce (12) || AES-256-GCM ciphertext || HMAC-SHA256 (32)`.
//! The token name is bound in both the GCM associated data and the MAC input,
//! so a token minted for one purpose never decodes as another. Tokens carry
//! no expiry.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, Payload as AeadPayload},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};

use super::types::TokenError;

type HmacSha256 = Hmac<Sha256>;

const NONCE_SIZE: usize = 12;
const MAC_SIZE: usize = 32;

pub struct TokenCodec {
    hash_key: Vec<u8>,
    cipher: Aes256Gcm,
}

impl TokenCodec {
    /// `hash_key` signs tokens; the AES key is derived from `block_key`.
    pub fn new(hash_key: &[u8], block_key: &[u8]) -> Self {
        Self {
            hash_key: hash_key.to_vec(),
            cipher: Aes256Gcm::new(&Sha256::digest(block_key)),
        }
    }

    pub fn encode<T: Serialize>(&self, name: &str, value: &T) -> Result<String, TokenError> {
        let plaintext = serde_json::to_vec(value)?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                AeadPayload {
                    msg: &plaintext,
                    aad: name.as_bytes(),
                },
            )
            .map_err(|_| TokenError::Encrypt)?;

        let mut token = Vec::with_capacity(NONCE_SIZE + ciphertext.len() + MAC_SIZE);
        token.extend_from_slice(&nonce_bytes);
        token.extend_from_slice(&ciphertext);
        let mac = self.mac(name, &token).finalize().into_bytes();
        token.extend_from_slice(&mac);

        Ok(URL_SAFE_NO_PAD.encode(token))
    }

    pub fn decode<T: DeserializeOwned>(&self, name: &str, token: &str) -> Result<T, TokenError> {
        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| TokenError::Encoding)?;
        if raw.len() < NONCE_SIZE + MAC_SIZE {
            return Err(TokenError::Truncated);
        }

        let (signed, mac) = raw.split_at(raw.len() - MAC_SIZE);
        self.mac(name, signed)
            .verify_slice(mac)
            .map_err(|_| TokenError::Signature)?;

        let (nonce_bytes, ciphertext) = signed.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                AeadPayload {
                    msg: ciphertext,
                    aad: name.as_bytes(),
                },
            )
            .map_err(|_| TokenError::Decrypt)?;

        Ok(serde_json::from_slice(&plaintext)?)
    }

    /// Authentication nonce for `userid`, as minted by an account service
    /// sharing the session secret.
    pub fn user_nonce(&self, userid: &str) -> String {
        let mac = self.mac("userid", userid.as_bytes()).finalize().into_bytes();
        URL_SAFE_NO_PAD.encode(mac)
    }

    pub fn verify_user_nonce(&self, userid: &str, nonce: &str) -> bool {
        match URL_SAFE_NO_PAD.decode(nonce) {
            Ok(raw) => self
                .mac("userid", userid.as_bytes())
                .verify_slice(&raw)
                .is_ok(),
            Err(_) => false,
        }
    }

    fn mac(&self, name: &str, data: &[u8]) -> HmacSha256 {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.hash_key)
            .expect("HMAC accepts any key size");
        mac.update(name.as_bytes());
        mac.update(&[0]);
        mac.update(data);
        mac
    }
}
