use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PorError {
    #[error("invalid session header: {0}")]
    InvalidHeader(String),
    #[error("unsupported relay chain: {0}")]
    InvalidChain(String),
    #[error("invalid application token: {0}")]
    InvalidToken(String),
    #[error("invalid client signature: {0}")]
    InvalidSignature(String),
    #[error("merkle branch does not reconstruct the committed root")]
    InvalidMerkleProof,
    #[error("revealed leaf index {got} does not match required index {required}")]
    InvalidChallengeIndex { required: u64, got: u64 },
    #[error("no claim found for this session")]
    ClaimNotFound,
    #[error("a claim already exists for this session")]
    ClaimDuplicate,
    #[error("local relay evidence missing: {0}")]
    EvidenceMissing(String),
    #[error("chain state unavailable at height {0}")]
    ChainStateMissing(u64),
    #[error("not ready before height {0}")]
    NotReady(u64),
    #[error("expired as of height {0}")]
    Expired(u64),
    #[error("storage error: {0}")]
    Storage(#[from] rocksdb::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("cryptography error: {0}")]
    Crypto(String),
}

pub type PorResult<T> = Result<T, PorError>;
