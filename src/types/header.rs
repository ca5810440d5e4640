use serde::{Deserialize, Serialize};

use crate::config::PorParams;
use crate::crypto::sha3_256;
use crate::errors::{PorError, PorResult};

/// Identifier of one relay session: which application, for which external
/// chain, starting at which block. The canonical hash keys both the local
/// evidence store and the on-chain records.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHeader {
    pub app_pubkey: String,
    pub chain_id: String,
    pub session_block_height: u64,
}

impl SessionHeader {
    pub fn new(app_pubkey: impl Into<String>, chain_id: impl Into<String>, height: u64) -> Self {
        Self {
            app_pubkey: app_pubkey.into(),
            chain_id: chain_id.into(),
            session_block_height: height,
        }
    }

    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("serializing session header")
    }

    pub fn hash(&self) -> [u8; 32] {
        sha3_256(&self.canonical_bytes())
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash())
    }

    pub fn validate(&self, params: &PorParams) -> PorResult<()> {
        let app_key = hex::decode(&self.app_pubkey)
            .map_err(|err| PorError::InvalidHeader(format!("app pubkey encoding: {err}")))?;
        if app_key.len() != 32 {
            return Err(PorError::InvalidHeader(format!(
                "app pubkey must be 32 bytes, got {}",
                app_key.len()
            )));
        }
        let chain = hex::decode(&self.chain_id)
            .map_err(|err| PorError::InvalidHeader(format!("chain id encoding: {err}")))?;
        if chain.is_empty() || chain.len() > 2 {
            return Err(PorError::InvalidHeader(format!(
                "chain id must decode to 1-2 bytes, got {}",
                chain.len()
            )));
        }
        if self.session_block_height == 0
            || self.session_block_height % params.session_frequency != 0
        {
            return Err(PorError::InvalidHeader(format!(
                "session height {} is not a positive multiple of the session frequency {}",
                self.session_block_height, params.session_frequency
            )));
        }
        Ok(())
    }
}
