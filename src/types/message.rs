use serde::{Deserialize, Serialize};

use crate::errors::{PorError, PorResult};
use crate::merkle::MerkleBranch;

use super::{Address, EvidenceType, RelayProof, SessionHeader};

/// On-chain commitment to the full evidence list of one session: the relay
/// count and the merkle root, nothing else is revealed yet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClaimMessage {
    pub header: SessionHeader,
    pub merkle_root: [u8; 32],
    pub total_relays: u64,
    pub evidence_type: EvidenceType,
    pub from_address: Address,
}

/// On-chain reveal of the single leaf selected by the pseudorandom
/// challenge, with its sibling path to the committed root.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProofMessage {
    pub header: SessionHeader,
    pub leaf: RelayProof,
    pub merkle_branch: MerkleBranch,
    pub evidence_type: EvidenceType,
    pub from_address: Address,
}

/// Third-party report of contradictory evidence: two leaves for the same
/// session slot with different content, both carrying the client's
/// signature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChallengeMessage {
    pub leaf_a: RelayProof,
    pub leaf_b: RelayProof,
    pub reporter_address: Address,
}

impl ChallengeMessage {
    /// Structural validity: same slot, distinct content, one client, and
    /// both leaves genuinely signed by that client.
    pub fn validate(&self) -> PorResult<()> {
        if self.leaf_a.session != self.leaf_b.session {
            return Err(PorError::InvalidHeader(
                "challenge leaves reference different sessions".into(),
            ));
        }
        if self.leaf_a.index != self.leaf_b.index {
            return Err(PorError::InvalidHeader(
                "challenge leaves reference different indices".into(),
            ));
        }
        if self.leaf_a.hash() == self.leaf_b.hash() {
            return Err(PorError::InvalidHeader(
                "challenge leaves are identical".into(),
            ));
        }
        if self.leaf_a.token.client_pubkey != self.leaf_b.token.client_pubkey {
            return Err(PorError::InvalidToken(
                "challenge leaves were signed by different clients".into(),
            ));
        }
        self.leaf_a.verify_client_signature()?;
        self.leaf_b.verify_client_signature()?;
        Ok(())
    }
}
