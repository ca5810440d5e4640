//! Shared fixtures for the proof-of-relay integration suite: a mutable mock
//! chain view, a recording broadcaster, and relay/session builders.

pub mod chain;
pub mod relays;

use std::sync::Arc;

use por_chain::{Node, NodeConfig, NodeHandle, PorParams};

pub use chain::{MockChain, RecordingBroadcaster};
pub use relays::{branch_for, keypair, root_for, RelayFixture};

pub type TestNode = Node<Arc<MockChain>, Arc<RecordingBroadcaster>>;
pub type TestHandle = NodeHandle<Arc<MockChain>, Arc<RecordingBroadcaster>>;

pub struct Harness {
    _dir: tempfile::TempDir,
    pub chain: Arc<MockChain>,
    pub broadcaster: Arc<RecordingBroadcaster>,
    pub handle: TestHandle,
}

/// Node wired to a mock chain over a throwaway data directory.
pub fn harness(params: PorParams) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = NodeConfig {
        data_dir: dir.path().join("data"),
        key_path: dir.path().join("keys/node.toml"),
        hosted_chains: Vec::new(),
        params: params.clone(),
        ..NodeConfig::default()
    };
    let chain = Arc::new(MockChain::new(params));
    let broadcaster = Arc::new(RecordingBroadcaster::new());
    let node: TestNode = Node::new(config, chain.clone(), broadcaster.clone()).expect("node start");
    let handle = node.handle();
    Harness {
        _dir: dir,
        chain,
        broadcaster,
        handle,
    }
}
