use tracing::{info, warn};

use crate::challenge::required_index;
use crate::config::PorParams;
use crate::errors::{PorError, PorResult};
use crate::interfaces::ChainView;
use crate::merkle::{expected_branch_len, verify_branch};
use crate::storage::{ProofOfRelay, RelayStateStore, StoredClaim};
use crate::types::{
    Address, ChallengeMessage, ClaimMessage, EvidenceType, ProofMessage, SessionHeader,
};

/// Emitted when a challenge certifies contradictory evidence; the staking
/// module owns the actual penalty.
#[derive(Clone, Debug, PartialEq)]
pub struct SlashEvent {
    pub node_address: Address,
    pub reporter_address: Address,
    pub header: SessionHeader,
}

/// Consensus-side message handlers for the commit-reveal protocol. Every
/// handler validates fully before touching state, so a rejection leaves the
/// store untouched.
pub struct Keeper<C: ChainView> {
    state: RelayStateStore,
    chain: C,
}

impl<C: ChainView> Keeper<C> {
    pub fn new(state: RelayStateStore, chain: C) -> Self {
        Self { state, chain }
    }

    pub fn state(&self) -> &RelayStateStore {
        &self.state
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// Accept a commitment to `(total_relays, merkle_root)` for one session.
    /// No leaf content is inspected here.
    pub fn handle_claim(&self, msg: &ClaimMessage, height: u64) -> PorResult<()> {
        let params = self.chain.params(height)?;
        msg.header.validate(&params)?;
        let session_height = msg.header.session_block_height;
        let opens = params.claim_opens_at(session_height);
        if height < opens {
            return Err(PorError::NotReady(opens));
        }
        let closes = params.claim_closes_at(session_height);
        if height >= closes {
            return Err(PorError::Expired(closes));
        }
        if msg.total_relays == 0 {
            return Err(PorError::InvalidHeader(
                "claim commits to zero relays".into(),
            ));
        }
        if !self
            .chain
            .supported_chains(height)?
            .contains(&msg.header.chain_id)
        {
            return Err(PorError::InvalidChain(msg.header.chain_id.clone()));
        }
        if !self.chain.is_app_staked(height, &msg.header.app_pubkey)? {
            return Err(PorError::InvalidToken("application is not staked".into()));
        }
        if self
            .state
            .claim(&msg.from_address, &msg.header, msg.evidence_type)?
            .is_some()
        {
            return Err(PorError::ClaimDuplicate);
        }
        self.state.set_claim(&StoredClaim {
            message: msg.clone(),
            submitted_at_height: height,
        })?;
        Ok(())
    }

    /// Leaf index the committed session must reveal, derived from the block
    /// hash at the claim's maturity height.
    pub fn required_index_for(
        &self,
        header: &SessionHeader,
        total_relays: u64,
        params: &PorParams,
    ) -> PorResult<u64> {
        let entropy_height = params.maturity_height(header.session_block_height);
        let block_hash = self.chain.block_hash(entropy_height)?;
        Ok(required_index(header, total_relays, &block_hash))
    }

    /// Verify a reveal against its claim and finalize the session.
    pub fn handle_proof(&self, msg: &ProofMessage, height: u64) -> PorResult<ProofOfRelay> {
        let params = self.chain.params(height)?;
        let claim = self
            .state
            .claim(&msg.from_address, &msg.header, msg.evidence_type)?
            .ok_or(PorError::ClaimNotFound)?;
        let maturity = params.maturity_height(msg.header.session_block_height);
        if height < maturity {
            return Err(PorError::NotReady(maturity));
        }
        if msg.leaf.session != msg.header {
            return Err(PorError::InvalidHeader(
                "revealed leaf does not belong to the claimed session".into(),
            ));
        }
        let required = self.required_index_for(&msg.header, claim.message.total_relays, &params)?;
        if msg.leaf.index != required {
            return Err(PorError::InvalidChallengeIndex {
                required,
                got: msg.leaf.index,
            });
        }
        if msg.merkle_branch.len() != expected_branch_len(claim.message.total_relays) {
            return Err(PorError::InvalidMerkleProof);
        }
        if !verify_branch(&claim.message.merkle_root, &msg.leaf.hash(), &msg.merkle_branch) {
            return Err(PorError::InvalidMerkleProof);
        }
        if !self.chain.is_app_staked(height, &msg.header.app_pubkey)? {
            return Err(PorError::InvalidToken(
                "application is no longer staked".into(),
            ));
        }
        msg.leaf.token.validate(height)?;
        msg.leaf.verify_client_signature()?;
        let record = ProofOfRelay {
            node_address: msg.from_address.clone(),
            header: msg.header.clone(),
            evidence_type: msg.evidence_type,
            total_relays: claim.message.total_relays,
            merkle_root: claim.message.merkle_root,
            leaf: msg.leaf.clone(),
            verified_at_height: height,
        };
        self.state.set_verified(&record)?;
        self.state
            .delete_claim(&msg.from_address, &msg.header, msg.evidence_type)?;
        info!(
            node = %record.node_address,
            session = %record.header.hash_hex(),
            total_relays = record.total_relays,
            "relay proof verified, reward due"
        );
        Ok(record)
    }

    /// Certify a report of contradictory evidence and invalidate every relay
    /// claim for the affected session.
    pub fn handle_challenge(
        &self,
        msg: &ChallengeMessage,
        height: u64,
    ) -> PorResult<Vec<SlashEvent>> {
        let params = self.chain.params(height)?;
        msg.leaf_a.session.validate(&params)?;
        msg.validate()?;
        let header = msg.leaf_a.session.clone();
        if self
            .state
            .verified(&msg.reporter_address, &header, EvidenceType::Challenge)?
            .is_some()
        {
            return Err(PorError::ClaimDuplicate);
        }
        let mut events = Vec::new();
        for claim in self.state.all_claims()? {
            if claim.message.header != header
                || claim.message.evidence_type != EvidenceType::Relay
            {
                continue;
            }
            self.state
                .delete_claim(&claim.message.from_address, &header, EvidenceType::Relay)?;
            warn!(
                node = %claim.message.from_address,
                session = %header.hash_hex(),
                "claim invalidated by challenge"
            );
            events.push(SlashEvent {
                node_address: claim.message.from_address,
                reporter_address: msg.reporter_address.clone(),
                header: header.clone(),
            });
        }
        self.state.set_verified(&ProofOfRelay {
            node_address: msg.reporter_address.clone(),
            header,
            evidence_type: EvidenceType::Challenge,
            total_relays: 2,
            merkle_root: msg.leaf_b.hash(),
            leaf: msg.leaf_a.clone(),
            verified_at_height: height,
        })?;
        Ok(events)
    }
}
