use std::sync::Arc;

use tracing::info;

use crate::config::NodeConfig;
use crate::crypto::{address_from_public_key, load_or_generate_keypair};
use crate::errors::{PorError, PorResult};
use crate::evidence::{EvidenceStore, EvidenceSummary};
use crate::interfaces::{ChainView, TxBroadcaster};
use crate::keeper::Keeper;
use crate::lifecycle::{LifecycleDriver, SessionPhase};
use crate::pagination::{paginate, Page};
use crate::storage::{ProofOfRelay, RelayStateStore, StoredClaim};
use crate::txbuilder::TxBuilder;
use crate::types::{Address, RelayProof, SessionHeader};

const MAX_QUERY_PAGE_SIZE: usize = 1_000;

/// Process-scoped proof-of-relay engine: owns the node keypair, the local
/// evidence accumulator, and the state store, and exposes them through
/// cloneable handles. Created at node start, dropped at node stop.
pub struct Node<C: ChainView, B: TxBroadcaster> {
    inner: Arc<NodeInner<C, B>>,
}

struct NodeInner<C: ChainView, B: TxBroadcaster> {
    config: NodeConfig,
    address: Address,
    evidence: Arc<EvidenceStore>,
    driver: LifecycleDriver<C, B>,
}

pub struct NodeHandle<C: ChainView, B: TxBroadcaster> {
    inner: Arc<NodeInner<C, B>>,
}

impl<C: ChainView, B: TxBroadcaster> Clone for NodeHandle<C, B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: ChainView, B: TxBroadcaster> Node<C, B> {
    pub fn new(config: NodeConfig, chain: C, broadcaster: B) -> PorResult<Self> {
        config.params.validate()?;
        config.ensure_directories()?;
        let keypair = load_or_generate_keypair(&config.key_path)?;
        let address = address_from_public_key(&keypair.public);
        let state = RelayStateStore::open(&config.data_dir.join("db"))?;
        let evidence = Arc::new(EvidenceStore::new(config.params.max_evidence_per_session));
        let keeper = Keeper::new(state, chain);
        let builder = TxBuilder::new(keypair, config.fee.clone());
        let driver = LifecycleDriver::new(keeper, evidence.clone(), builder, broadcaster);
        info!(address = %address, "proof-of-relay engine ready");
        Ok(Self {
            inner: Arc::new(NodeInner {
                config,
                address,
                evidence,
                driver,
            }),
        })
    }

    pub fn handle(&self) -> NodeHandle<C, B> {
        NodeHandle {
            inner: self.inner.clone(),
        }
    }
}

impl<C: ChainView, B: TxBroadcaster> NodeHandle<C, B> {
    pub fn address(&self) -> &Address {
        &self.inner.address
    }

    /// Record one serviced relay. Chains outside the hosted set are refused
    /// before they ever reach the accumulator.
    pub fn submit_relay(&self, header: &SessionHeader, leaf: RelayProof) -> PorResult<u64> {
        let hosted = &self.inner.config.hosted_chains;
        if !hosted.is_empty() && !hosted.contains(&header.chain_id) {
            return Err(PorError::InvalidChain(header.chain_id.clone()));
        }
        self.inner.evidence.append(header, leaf)
    }

    /// Consensus hook: run the lifecycle driver for the committed block.
    pub fn end_block(&self, height: u64) -> PorResult<()> {
        self.inner.driver.end_block(height)
    }

    /// Message handlers for the transaction processor.
    pub fn keeper(&self) -> &Keeper<C> {
        self.inner.driver.keeper()
    }

    pub fn session_phase(&self, header: &SessionHeader, height: u64) -> PorResult<SessionPhase> {
        self.inner.driver.session_phase(header, height)
    }

    pub fn evidence_summaries(&self, page: usize, per_page: usize) -> Page<EvidenceSummary> {
        paginate(
            &self.inner.evidence.snapshot(),
            page,
            per_page,
            MAX_QUERY_PAGE_SIZE,
        )
    }

    pub fn claims(&self, page: usize, per_page: usize) -> PorResult<Page<StoredClaim>> {
        let claims = self
            .inner
            .driver
            .keeper()
            .state()
            .claims_by_address(&self.inner.address)?;
        Ok(paginate(&claims, page, per_page, MAX_QUERY_PAGE_SIZE))
    }

    pub fn verified_proofs(&self, page: usize, per_page: usize) -> PorResult<Page<ProofOfRelay>> {
        let records = self
            .inner
            .driver
            .keeper()
            .state()
            .verified_by_address(&self.inner.address)?;
        Ok(paginate(&records, page, per_page, MAX_QUERY_PAGE_SIZE))
    }

    pub fn verified_proofs_by_app(
        &self,
        app_pubkey: &str,
        page: usize,
        per_page: usize,
    ) -> PorResult<Page<ProofOfRelay>> {
        let records = self
            .inner
            .driver
            .keeper()
            .state()
            .verified_by_app(&self.inner.address, app_pubkey)?;
        Ok(paginate(&records, page, per_page, MAX_QUERY_PAGE_SIZE))
    }
}
