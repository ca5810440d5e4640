use ed25519_dalek::{Keypair, PublicKey, SecretKey};

use por_chain::merkle::{MerkleBranch, MerkleTree};
use por_chain::{ApplicationAuthToken, RelayProof, SessionHeader};

pub fn keypair(seed: u8) -> Keypair {
    let secret = SecretKey::from_bytes(&[seed; 32]).expect("secret");
    let public = PublicKey::from(&secret);
    Keypair { secret, public }
}

/// One application/client pair relaying for one session.
pub struct RelayFixture {
    pub app: Keypair,
    pub client: Keypair,
    pub header: SessionHeader,
}

impl RelayFixture {
    pub fn new(app_seed: u8, client_seed: u8, chain_id: &str, session_height: u64) -> Self {
        let app = keypair(app_seed);
        let client = keypair(client_seed);
        let header = SessionHeader::new(
            hex::encode(app.public.to_bytes()),
            chain_id,
            session_height,
        );
        Self {
            app,
            client,
            header,
        }
    }

    pub fn app_pubkey(&self) -> String {
        hex::encode(self.app.public.to_bytes())
    }

    pub fn token(&self, expiration_height: u64) -> ApplicationAuthToken {
        ApplicationAuthToken::issue(
            &self.app,
            hex::encode(self.client.public.to_bytes()),
            expiration_height,
        )
    }

    pub fn leaf(&self, index: u64) -> RelayProof {
        RelayProof::signed(self.header.clone(), index, self.token(0), &self.client)
    }

    pub fn leaves(&self, count: u64) -> Vec<RelayProof> {
        (0..count).map(|index| self.leaf(index)).collect()
    }
}

/// Sibling path for `index` over the given leaves, built one-shot.
pub fn branch_for(leaves: &[RelayProof], index: u64) -> MerkleBranch {
    let hashes = leaves.iter().map(|leaf| leaf.hash()).collect::<Vec<_>>();
    MerkleTree::from_leaves(hashes)
        .branch(index)
        .expect("branch for in-range index")
}

pub fn root_for(leaves: &[RelayProof]) -> [u8; 32] {
    let hashes = leaves.iter().map(|leaf| leaf.hash()).collect::<Vec<_>>();
    MerkleTree::from_leaves(hashes).root().expect("non-empty root")
}
