use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::PorParams;
use crate::errors::PorResult;

/// Read-only view of chain state supplied by the consensus engine. Every
/// accessor pins an explicit height; requesting an unavailable height
/// surfaces `ChainStateMissing`.
pub trait ChainView: Send + Sync {
    /// Hash of the block committed at `height`.
    fn block_hash(&self, height: u64) -> PorResult<[u8; 32]>;

    /// External chains relayable under the governance state at `height`.
    fn supported_chains(&self, height: u64) -> PorResult<BTreeSet<String>>;

    /// Whether the application is staked at `height`.
    fn is_app_staked(&self, height: u64, app_pubkey: &str) -> PorResult<bool>;

    /// Protocol parameters effective at `height`.
    fn params(&self, height: u64) -> PorResult<PorParams>;
}

/// Fire-and-forget transaction submission into the mempool; inclusion is
/// observed later through chain state, never awaited.
pub trait TxBroadcaster: Send + Sync {
    fn broadcast(&self, bytes: Vec<u8>);
}

impl<T: ChainView + ?Sized> ChainView for Arc<T> {
    fn block_hash(&self, height: u64) -> PorResult<[u8; 32]> {
        (**self).block_hash(height)
    }

    fn supported_chains(&self, height: u64) -> PorResult<BTreeSet<String>> {
        (**self).supported_chains(height)
    }

    fn is_app_staked(&self, height: u64, app_pubkey: &str) -> PorResult<bool> {
        (**self).is_app_staked(height, app_pubkey)
    }

    fn params(&self, height: u64) -> PorResult<PorParams> {
        (**self).params(height)
    }
}

impl<T: TxBroadcaster + ?Sized> TxBroadcaster for Arc<T> {
    fn broadcast(&self, bytes: Vec<u8>) {
        (**self).broadcast(bytes)
    }
}
