use std::collections::BTreeSet;

use parking_lot::{Mutex, RwLock};

use por_chain::crypto::sha3_256;
use por_chain::{ChainView, PorParams, PorResult, RelayTx, TxBroadcaster};

/// In-memory chain view with mutable governance state: tests flip chain
/// support and application stakes between blocks.
pub struct MockChain {
    params: PorParams,
    supported: RwLock<BTreeSet<String>>,
    staked: RwLock<BTreeSet<String>>,
}

impl MockChain {
    pub fn new(params: PorParams) -> Self {
        Self {
            params,
            supported: RwLock::new(BTreeSet::new()),
            staked: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn support_chain(&self, chain_id: &str) {
        self.supported.write().insert(chain_id.to_string());
    }

    pub fn drop_chain(&self, chain_id: &str) {
        self.supported.write().remove(chain_id);
    }

    pub fn stake_app(&self, app_pubkey: &str) {
        self.staked.write().insert(app_pubkey.to_string());
    }

    pub fn unstake_app(&self, app_pubkey: &str) {
        self.staked.write().remove(app_pubkey);
    }
}

impl ChainView for MockChain {
    fn block_hash(&self, height: u64) -> PorResult<[u8; 32]> {
        let mut seed = b"mock-block".to_vec();
        seed.extend_from_slice(&height.to_be_bytes());
        Ok(sha3_256(&seed))
    }

    fn supported_chains(&self, _height: u64) -> PorResult<BTreeSet<String>> {
        Ok(self.supported.read().clone())
    }

    fn is_app_staked(&self, _height: u64, app_pubkey: &str) -> PorResult<bool> {
        Ok(self.staked.read().contains(app_pubkey))
    }

    fn params(&self, _height: u64) -> PorResult<PorParams> {
        Ok(self.params.clone())
    }
}

/// Collects broadcast bytes so tests can decode and replay them through the
/// keeper, standing in for the mempool.
#[derive(Default)]
pub struct RecordingBroadcaster {
    sent: Mutex<Vec<Vec<u8>>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn drain(&self) -> Vec<RelayTx> {
        self.sent
            .lock()
            .drain(..)
            .map(|bytes| RelayTx::from_bytes(&bytes).expect("decode broadcast tx"))
            .collect()
    }
}

impl TxBroadcaster for RecordingBroadcaster {
    fn broadcast(&self, bytes: Vec<u8>) {
        self.sent.lock().push(bytes);
    }
}
