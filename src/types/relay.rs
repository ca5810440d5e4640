use ed25519_dalek::Keypair;
use serde::{Deserialize, Serialize};

use crate::crypto::{
    public_key_from_hex, sign_message, signature_from_hex, signature_to_hex, verify_signature,
};
use crate::errors::{PorError, PorResult};
use crate::merkle;

use super::{ApplicationAuthToken, SessionHeader};

/// Evidence of one serviced relay: a leaf in the session's merkle tree,
/// signed by the client named in the application token.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelayProof {
    pub session: SessionHeader,
    pub index: u64,
    pub token: ApplicationAuthToken,
    pub signature: String,
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    session: &'a SessionHeader,
    index: u64,
    token: &'a ApplicationAuthToken,
}

impl RelayProof {
    /// Build a leaf and sign it with the client keypair.
    pub fn signed(
        session: SessionHeader,
        index: u64,
        token: ApplicationAuthToken,
        client_keypair: &Keypair,
    ) -> Self {
        let mut leaf = Self {
            session,
            index,
            token,
            signature: String::new(),
        };
        let signature = sign_message(client_keypair, leaf.hash_string().as_bytes());
        leaf.signature = signature_to_hex(&signature);
        leaf
    }

    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&RelayPayload {
            session: &self.session,
            index: self.index,
            token: &self.token,
        })
        .expect("serializing relay proof")
    }

    /// Canonical leaf hash; doubles as the tree node at the leaf level.
    pub fn hash(&self) -> [u8; 32] {
        merkle::leaf_hash(&self.canonical_bytes())
    }

    pub fn hash_string(&self) -> String {
        hex::encode(self.hash())
    }

    /// The client named in the token must have signed the leaf's hash string.
    pub fn verify_client_signature(&self) -> PorResult<()> {
        let client_key = public_key_from_hex(&self.token.client_pubkey)
            .map_err(|err| PorError::InvalidSignature(err.to_string()))?;
        let signature = signature_from_hex(&self.signature)
            .map_err(|err| PorError::InvalidSignature(err.to_string()))?;
        verify_signature(&client_key, self.hash_string().as_bytes(), &signature)
            .map_err(|err| PorError::InvalidSignature(err.to_string()))
    }
}
