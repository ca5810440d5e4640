mod header;
mod message;
mod relay;
mod token;

use serde::{Deserialize, Serialize};

use crate::errors::{PorError, PorResult};

pub use header::SessionHeader;
pub use message::{ChallengeMessage, ClaimMessage, ProofMessage};
pub use relay::RelayProof;
pub use token::ApplicationAuthToken;

pub type Address = String;

/// Tag distinguishing relay evidence from challenge evidence; keys state
/// records separately.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvidenceType {
    Relay,
    Challenge,
}

impl EvidenceType {
    pub fn as_byte(self) -> u8 {
        match self {
            EvidenceType::Relay => 0,
            EvidenceType::Challenge => 1,
        }
    }

    pub fn from_byte(byte: u8) -> PorResult<Self> {
        match byte {
            0 => Ok(EvidenceType::Relay),
            1 => Ok(EvidenceType::Challenge),
            other => Err(PorError::Config(format!("unknown evidence type {other}"))),
        }
    }
}
