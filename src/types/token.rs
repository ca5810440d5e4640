use ed25519_dalek::Keypair;
use serde::{Deserialize, Serialize};

use crate::crypto::{
    public_key_from_hex, sign_message, signature_from_hex, signature_to_hex, verify_signature,
};
use crate::errors::{PorError, PorResult};

/// Authorization issued off-chain by a staked application: it entitles
/// `client_pubkey` to relay through a service node until the expiration
/// height (0 means no expiry).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationAuthToken {
    pub app_pubkey: String,
    pub client_pubkey: String,
    pub expiration_height: u64,
    pub signature: String,
}

#[derive(Serialize)]
struct TokenPayload<'a> {
    app_pubkey: &'a str,
    client_pubkey: &'a str,
    expiration_height: u64,
}

impl ApplicationAuthToken {
    /// Issue a token signed by the application keypair.
    pub fn issue(app_keypair: &Keypair, client_pubkey: impl Into<String>, expiration_height: u64) -> Self {
        let mut token = Self {
            app_pubkey: hex::encode(app_keypair.public.to_bytes()),
            client_pubkey: client_pubkey.into(),
            expiration_height,
            signature: String::new(),
        };
        let signature = sign_message(app_keypair, &token.canonical_bytes());
        token.signature = signature_to_hex(&signature);
        token
    }

    /// Serialization the application signs; excludes the signature field.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&TokenPayload {
            app_pubkey: &self.app_pubkey,
            client_pubkey: &self.client_pubkey,
            expiration_height: self.expiration_height,
        })
        .expect("serializing auth token")
    }

    /// Check expiry against the verification height and the application
    /// signature over the canonical form.
    pub fn validate(&self, height: u64) -> PorResult<()> {
        if self.expiration_height != 0 && height > self.expiration_height {
            return Err(PorError::InvalidToken(format!(
                "token expired at height {}",
                self.expiration_height
            )));
        }
        let app_key = public_key_from_hex(&self.app_pubkey)
            .map_err(|err| PorError::InvalidToken(err.to_string()))?;
        let signature = signature_from_hex(&self.signature)
            .map_err(|err| PorError::InvalidToken(err.to_string()))?;
        verify_signature(&app_key, &self.canonical_bytes(), &signature)
            .map_err(|err| PorError::InvalidToken(format!("application signature: {err}")))
    }
}
