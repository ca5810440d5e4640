use ed25519_dalek::Keypair;
use serde::{Deserialize, Serialize};

use crate::crypto::{
    address_from_public_key, public_key_from_hex, sign_message, signature_from_hex,
    signature_to_hex, verify_signature,
};
use crate::errors::{PorError, PorResult};
use crate::types::{Address, ChallengeMessage, ClaimMessage, ProofMessage};

/// Gas and fee applied to auto-submitted transactions. Overridable in the
/// node configuration instead of being baked in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TxFeePolicy {
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default)]
    pub fee: u64,
    #[serde(default = "default_fee_denom")]
    pub denom: String,
}

fn default_gas_limit() -> u64 {
    9_000
}

fn default_fee_denom() -> String {
    "upor".to_string()
}

impl Default for TxFeePolicy {
    fn default() -> Self {
        Self {
            gas_limit: default_gas_limit(),
            fee: 0,
            denom: default_fee_denom(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RelayTxBody {
    Claim(ClaimMessage),
    Proof(ProofMessage),
    Challenge(ChallengeMessage),
}

impl RelayTxBody {
    pub fn sender(&self) -> &Address {
        match self {
            RelayTxBody::Claim(msg) => &msg.from_address,
            RelayTxBody::Proof(msg) => &msg.from_address,
            RelayTxBody::Challenge(msg) => &msg.reporter_address,
        }
    }
}

/// Signed transaction envelope as broadcast to the mempool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelayTx {
    pub body: RelayTxBody,
    pub gas_limit: u64,
    pub fee: u64,
    pub denom: String,
    pub signature: String,
    pub public_key: String,
}

#[derive(Serialize)]
struct SigningPayload<'a> {
    body: &'a RelayTxBody,
    gas_limit: u64,
    fee: u64,
    denom: &'a str,
}

fn signing_bytes(body: &RelayTxBody, gas_limit: u64, fee: u64, denom: &str) -> Vec<u8> {
    serde_json::to_vec(&SigningPayload {
        body,
        gas_limit,
        fee,
        denom,
    })
    .expect("serializing transaction payload")
}

impl RelayTx {
    pub fn verify(&self) -> PorResult<()> {
        let public_key = public_key_from_hex(&self.public_key)
            .map_err(|err| PorError::Crypto(err.to_string()))?;
        if *self.body.sender() != address_from_public_key(&public_key) {
            return Err(PorError::Crypto(
                "transaction sender does not match the signing key".into(),
            ));
        }
        let signature = signature_from_hex(&self.signature)
            .map_err(|err| PorError::Crypto(err.to_string()))?;
        verify_signature(
            &public_key,
            &signing_bytes(&self.body, self.gas_limit, self.fee, &self.denom),
            &signature,
        )
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("encoding transaction envelope")
    }

    pub fn from_bytes(bytes: &[u8]) -> PorResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Builds and signs auto-submitted transactions with the node keypair.
pub struct TxBuilder {
    keypair: Keypair,
    address: Address,
    policy: TxFeePolicy,
}

impl TxBuilder {
    pub fn new(keypair: Keypair, policy: TxFeePolicy) -> Self {
        let address = address_from_public_key(&keypair.public);
        Self {
            keypair,
            address,
            policy,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn build(&self, body: RelayTxBody) -> RelayTx {
        let payload = signing_bytes(
            &body,
            self.policy.gas_limit,
            self.policy.fee,
            &self.policy.denom,
        );
        let signature = sign_message(&self.keypair, &payload);
        RelayTx {
            body,
            gas_limit: self.policy.gas_limit,
            fee: self.policy.fee,
            denom: self.policy.denom.clone(),
            signature: signature_to_hex(&signature),
            public_key: hex::encode(self.keypair.public.to_bytes()),
        }
    }
}
