use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::PorParams;
use crate::errors::PorResult;
use crate::evidence::EvidenceStore;
use crate::interfaces::{ChainView, TxBroadcaster};
use crate::keeper::Keeper;
use crate::txbuilder::{RelayTxBody, TxBuilder};
use crate::types::{Address, ClaimMessage, EvidenceType, ProofMessage, SessionHeader};

/// Where one session stands from the prover's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Collecting,
    Ready,
    Claimed,
    Mature,
    Revealed,
    Settled,
    Discarded,
}

/// Per-block engine that turns accumulated evidence into claim and proof
/// transactions at the right heights and garbage-collects what expired.
/// Invoked by the consensus engine after each committed block; re-invocation
/// at the same height is a no-op.
pub struct LifecycleDriver<C: ChainView, B: TxBroadcaster> {
    keeper: Keeper<C>,
    evidence: Arc<EvidenceStore>,
    builder: TxBuilder,
    broadcaster: B,
    last_processed: Mutex<Option<u64>>,
}

impl<C: ChainView, B: TxBroadcaster> LifecycleDriver<C, B> {
    pub fn new(
        keeper: Keeper<C>,
        evidence: Arc<EvidenceStore>,
        builder: TxBuilder,
        broadcaster: B,
    ) -> Self {
        Self {
            keeper,
            evidence,
            builder,
            broadcaster,
            last_processed: Mutex::new(None),
        }
    }

    pub fn address(&self) -> &Address {
        self.builder.address()
    }

    pub fn keeper(&self) -> &Keeper<C> {
        &self.keeper
    }

    /// Run the three per-block passes: claim ready sessions, reveal mature
    /// claims, sweep expired ones. Per-session failures are logged and
    /// skipped so block application never aborts on a single bad session.
    pub fn end_block(&self, height: u64) -> PorResult<()> {
        {
            let mut last = self.last_processed.lock();
            if *last == Some(height) {
                debug!(height, "duplicate end-block invocation skipped");
                return Ok(());
            }
            *last = Some(height);
        }
        let params = self.keeper.chain().params(height)?;
        self.submit_claims(height, &params);
        self.submit_proofs(height, &params);
        self.sweep_expired(height, &params);
        Ok(())
    }

    fn submit_claims(&self, height: u64, params: &PorParams) {
        let supported = match self.keeper.chain().supported_chains(height) {
            Ok(chains) => chains,
            Err(err) => {
                warn!(?err, height, "cannot read supported chains, skipping claims");
                return;
            }
        };
        for summary in self.evidence.snapshot() {
            let header = &summary.header;
            let session_height = header.session_block_height;
            if height < params.claim_opens_at(session_height) {
                continue;
            }
            if !supported.contains(&header.chain_id) {
                info!(
                    session = %header.hash_hex(),
                    chain = %header.chain_id,
                    "dropping evidence for unsupported chain"
                );
                self.evidence.remove(header);
                continue;
            }
            if height >= params.claim_closes_at(session_height) {
                warn!(
                    session = %header.hash_hex(),
                    "claim window closed, discarding unclaimed evidence"
                );
                self.evidence.remove(header);
                continue;
            }
            match self
                .keeper
                .state()
                .verified(self.address(), header, EvidenceType::Relay)
            {
                Ok(Some(_)) => {
                    debug!(session = %header.hash_hex(), "session settled, clearing evidence");
                    self.evidence.remove(header);
                    continue;
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(?err, session = %header.hash_hex(), "verified lookup failed");
                    continue;
                }
            }
            match self
                .keeper
                .state()
                .claim(self.address(), header, EvidenceType::Relay)
            {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(err) => {
                    warn!(?err, session = %header.hash_hex(), "claim lookup failed");
                    continue;
                }
            }
            let message = ClaimMessage {
                header: header.clone(),
                merkle_root: summary.root,
                total_relays: summary.total_relays,
                evidence_type: EvidenceType::Relay,
                from_address: self.address().clone(),
            };
            let tx = self.builder.build(RelayTxBody::Claim(message));
            self.broadcaster.broadcast(tx.to_bytes());
            info!(
                session = %header.hash_hex(),
                total_relays = summary.total_relays,
                height,
                "claim broadcast"
            );
        }
    }

    fn submit_proofs(&self, height: u64, params: &PorParams) {
        let own_claims = match self.keeper.state().claims_by_address(self.address()) {
            Ok(claims) => claims,
            Err(err) => {
                warn!(?err, height, "cannot enumerate own claims, skipping proofs");
                return;
            }
        };
        for claim in own_claims {
            let header = claim.message.header.clone();
            if height < params.maturity_height(header.session_block_height) {
                continue;
            }
            match self
                .keeper
                .state()
                .verified(self.address(), &header, claim.message.evidence_type)
            {
                Ok(Some(_)) => {
                    debug!(session = %header.hash_hex(), "session settled, clearing evidence");
                    self.evidence.remove(&header);
                    continue;
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(?err, session = %header.hash_hex(), "verified lookup failed");
                    continue;
                }
            }
            let required = match self.keeper.required_index_for(
                &header,
                claim.message.total_relays,
                params,
            ) {
                Ok(index) => index,
                Err(err) => {
                    warn!(?err, session = %header.hash_hex(), "challenge derivation failed");
                    continue;
                }
            };
            let leaf = match self.evidence.leaf(&header, required) {
                Ok(leaf) => leaf,
                Err(err) => {
                    warn!(?err, session = %header.hash_hex(), required, "leaf unavailable");
                    continue;
                }
            };
            let branch = match self.evidence.branch(&header, required) {
                Ok(branch) => branch,
                Err(err) => {
                    warn!(?err, session = %header.hash_hex(), required, "branch unavailable");
                    continue;
                }
            };
            let message = ProofMessage {
                header: header.clone(),
                leaf,
                merkle_branch: branch,
                evidence_type: claim.message.evidence_type,
                from_address: self.address().clone(),
            };
            let tx = self.builder.build(RelayTxBody::Proof(message));
            self.broadcaster.broadcast(tx.to_bytes());
            info!(
                session = %header.hash_hex(),
                required,
                height,
                "proof broadcast"
            );
        }
    }

    fn sweep_expired(&self, height: u64, params: &PorParams) {
        let claims = match self.keeper.state().all_claims() {
            Ok(claims) => claims,
            Err(err) => {
                warn!(?err, height, "cannot enumerate claims, skipping expiry sweep");
                return;
            }
        };
        for claim in claims {
            let session_height = claim.message.header.session_block_height;
            if params.sessions_elapsed(session_height, height)
                < params.unverified_proof_expiration
            {
                continue;
            }
            if let Err(err) = self.keeper.state().delete_claim(
                &claim.message.from_address,
                &claim.message.header,
                claim.message.evidence_type,
            ) {
                warn!(?err, "failed to delete expired claim");
                continue;
            }
            info!(
                node = %claim.message.from_address,
                session = %claim.message.header.hash_hex(),
                "expired claim deleted"
            );
        }
    }

    /// Phase of one session under the current chain state.
    pub fn session_phase(&self, header: &SessionHeader, height: u64) -> PorResult<SessionPhase> {
        let params = self.keeper.chain().params(height)?;
        let session_height = header.session_block_height;
        if self
            .keeper
            .state()
            .verified(self.address(), header, EvidenceType::Relay)?
            .is_some()
        {
            return Ok(if self.evidence.contains(header) {
                SessionPhase::Revealed
            } else {
                SessionPhase::Settled
            });
        }
        if self
            .keeper
            .state()
            .claim(self.address(), header, EvidenceType::Relay)?
            .is_some()
        {
            if params.sessions_elapsed(session_height, height)
                >= params.unverified_proof_expiration
            {
                return Ok(SessionPhase::Discarded);
            }
            return Ok(if height >= params.maturity_height(session_height) {
                SessionPhase::Mature
            } else {
                SessionPhase::Claimed
            });
        }
        if self.evidence.contains(header) {
            if !self
                .keeper
                .chain()
                .supported_chains(height)?
                .contains(&header.chain_id)
            {
                return Ok(SessionPhase::Discarded);
            }
            if height >= params.claim_closes_at(session_height) {
                return Ok(SessionPhase::Discarded);
            }
            return Ok(if height >= params.claim_opens_at(session_height) {
                SessionPhase::Ready
            } else {
                SessionPhase::Collecting
            });
        }
        Ok(SessionPhase::Discarded)
    }
}
