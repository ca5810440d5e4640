use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::errors::{PorError, PorResult};
use crate::merkle::{MerkleBranch, MerkleTree};
use crate::types::{RelayProof, SessionHeader};

/// Process-wide accumulator of relay evidence, one entry per session. The
/// relay front-end appends while the lifecycle driver reads; appends for
/// different sessions never contend with each other.
pub struct EvidenceStore {
    sessions: RwLock<HashMap<String, Arc<RwLock<SessionEvidence>>>>,
    max_evidence_per_session: u64,
}

struct SessionEvidence {
    header: SessionHeader,
    leaves: Vec<RelayProof>,
    tree: MerkleTree,
}

#[derive(Clone, Debug)]
pub struct EvidenceSummary {
    pub header: SessionHeader,
    pub total_relays: u64,
    pub root: [u8; 32],
}

impl EvidenceStore {
    pub fn new(max_evidence_per_session: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_evidence_per_session,
        }
    }

    /// Append a leaf for the session; its index must equal the current list
    /// length, keeping indices dense and the client signature intact.
    pub fn append(&self, header: &SessionHeader, leaf: RelayProof) -> PorResult<u64> {
        if leaf.session != *header {
            return Err(PorError::InvalidHeader(
                "leaf session does not match the append header".into(),
            ));
        }
        let session = self.session_entry(header);
        let mut evidence = session.write();
        let index = evidence.leaves.len() as u64;
        if index >= self.max_evidence_per_session {
            return Err(PorError::Config(format!(
                "evidence limit {} reached for session",
                self.max_evidence_per_session
            )));
        }
        if leaf.index != index {
            return Err(PorError::InvalidHeader(format!(
                "leaf index {} out of order, expected {index}",
                leaf.index
            )));
        }
        evidence.tree.push(leaf.hash());
        evidence.leaves.push(leaf);
        Ok(index)
    }

    pub fn total_relays(&self, header: &SessionHeader) -> u64 {
        match self.session_lookup(header) {
            Some(session) => session.read().leaves.len() as u64,
            None => 0,
        }
    }

    pub fn contains(&self, header: &SessionHeader) -> bool {
        self.session_lookup(header).is_some()
    }

    pub fn root(&self, header: &SessionHeader) -> PorResult<[u8; 32]> {
        let session = self
            .session_lookup(header)
            .ok_or_else(|| missing(header))?;
        let evidence = session.read();
        evidence.tree.root().ok_or_else(|| missing(header))
    }

    pub fn leaf(&self, header: &SessionHeader, index: u64) -> PorResult<RelayProof> {
        let session = self
            .session_lookup(header)
            .ok_or_else(|| missing(header))?;
        let evidence = session.read();
        evidence
            .leaves
            .get(index as usize)
            .cloned()
            .ok_or_else(|| {
                PorError::EvidenceMissing(format!(
                    "no leaf at index {index} for session {}",
                    header.hash_hex()
                ))
            })
    }

    pub fn branch(&self, header: &SessionHeader, index: u64) -> PorResult<MerkleBranch> {
        let session = self
            .session_lookup(header)
            .ok_or_else(|| missing(header))?;
        let evidence = session.read();
        evidence.tree.branch(index)
    }

    pub fn remove(&self, header: &SessionHeader) -> bool {
        self.sessions.write().remove(&header.hash_hex()).is_some()
    }

    /// Deterministic view of every non-empty session, ordered by session
    /// hash.
    pub fn snapshot(&self) -> Vec<EvidenceSummary> {
        let sessions = self
            .sessions
            .read()
            .values()
            .cloned()
            .collect::<Vec<_>>();
        let mut summaries = Vec::with_capacity(sessions.len());
        for session in sessions {
            let evidence = session.read();
            if let Some(root) = evidence.tree.root() {
                summaries.push(EvidenceSummary {
                    header: evidence.header.clone(),
                    total_relays: evidence.leaves.len() as u64,
                    root,
                });
            }
        }
        summaries.sort_by_key(|summary| summary.header.hash());
        summaries
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    fn session_lookup(&self, header: &SessionHeader) -> Option<Arc<RwLock<SessionEvidence>>> {
        self.sessions.read().get(&header.hash_hex()).cloned()
    }

    fn session_entry(&self, header: &SessionHeader) -> Arc<RwLock<SessionEvidence>> {
        if let Some(session) = self.session_lookup(header) {
            return session;
        }
        let mut sessions = self.sessions.write();
        sessions
            .entry(header.hash_hex())
            .or_insert_with(|| {
                Arc::new(RwLock::new(SessionEvidence {
                    header: header.clone(),
                    leaves: Vec::new(),
                    tree: MerkleTree::new(),
                }))
            })
            .clone()
    }
}

fn missing(header: &SessionHeader) -> PorError {
    PorError::EvidenceMissing(format!("no evidence for session {}", header.hash_hex()))
}
