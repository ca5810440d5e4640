use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{PorError, PorResult};
use crate::txbuilder::TxFeePolicy;

/// Protocol parameters governing the commit-reveal schedule. Governance can
/// override them per height; these are also the local fallback defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PorParams {
    #[serde(default = "default_session_frequency")]
    pub session_frequency: u64,
    #[serde(default = "default_proof_waiting_period")]
    pub proof_waiting_period: u64,
    #[serde(default = "default_claim_expiration")]
    pub claim_expiration: u64,
    #[serde(default = "default_unverified_proof_expiration")]
    pub unverified_proof_expiration: u64,
    #[serde(default = "default_stake_denom")]
    pub stake_denom: String,
    #[serde(default = "default_max_evidence_per_session")]
    pub max_evidence_per_session: u64,
}

fn default_session_frequency() -> u64 {
    25
}

fn default_proof_waiting_period() -> u64 {
    3
}

fn default_claim_expiration() -> u64 {
    120
}

fn default_unverified_proof_expiration() -> u64 {
    2 * default_claim_expiration()
}

fn default_stake_denom() -> String {
    "upor".to_string()
}

fn default_max_evidence_per_session() -> u64 {
    100_000
}

impl Default for PorParams {
    fn default() -> Self {
        Self {
            session_frequency: default_session_frequency(),
            proof_waiting_period: default_proof_waiting_period(),
            claim_expiration: default_claim_expiration(),
            unverified_proof_expiration: default_unverified_proof_expiration(),
            stake_denom: default_stake_denom(),
            max_evidence_per_session: default_max_evidence_per_session(),
        }
    }
}

impl PorParams {
    pub fn validate(&self) -> PorResult<()> {
        if self.session_frequency == 0 {
            return Err(PorError::Config("session frequency must be positive".into()));
        }
        Ok(())
    }

    /// First height at which a claim for the session may be submitted.
    pub fn claim_opens_at(&self, session_block_height: u64) -> u64 {
        session_block_height + self.session_frequency
    }

    /// Height whose block hash seeds the pseudorandom challenge; also the
    /// first height at which the reveal is accepted.
    pub fn maturity_height(&self, session_block_height: u64) -> u64 {
        session_block_height + self.proof_waiting_period * self.session_frequency
    }

    /// Height at which claim submission closes.
    pub fn claim_closes_at(&self, session_block_height: u64) -> u64 {
        session_block_height
            + (self.proof_waiting_period + self.claim_expiration) * self.session_frequency
    }

    /// Whole sessions elapsed between the session start and `height`.
    pub fn sessions_elapsed(&self, session_block_height: u64, height: u64) -> u64 {
        height.saturating_sub(session_block_height) / self.session_frequency
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    pub data_dir: PathBuf,
    pub key_path: PathBuf,
    /// External chain identifiers this node hosts relays for (hex).
    #[serde(default)]
    pub hosted_chains: Vec<String>,
    #[serde(default)]
    pub fee: TxFeePolicy,
    #[serde(default)]
    pub params: PorParams,
}

impl NodeConfig {
    pub fn load(path: &Path) -> PorResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: NodeConfig = toml::from_str(&content)
            .map_err(|err| PorError::Config(format!("unable to parse config: {err}")))?;
        config.params.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> PorResult<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;
        let encoded = toml::to_string_pretty(self)
            .map_err(|err| PorError::Config(format!("unable to encode config: {err}")))?;
        fs::write(path, encoded)?;
        Ok(())
    }

    pub fn ensure_directories(&self) -> PorResult<()> {
        fs::create_dir_all(&self.data_dir)?;
        if let Some(parent) = self.key_path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            key_path: PathBuf::from("./keys/node.toml"),
            hosted_chains: Vec::new(),
            fee: TxFeePolicy::default(),
            params: PorParams::default(),
        }
    }
}
