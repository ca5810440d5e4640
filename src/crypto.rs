use std::fs;
use std::path::Path;

use ed25519_dalek::{Keypair, PublicKey, SecretKey, Signature, Signer, Verifier};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::errors::{PorError, PorResult};
use crate::types::Address;

/// Length in bytes of a node or reporter address on the wire.
pub const ADDRESS_LEN: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredKeypair {
    pub public_key: String,
    pub secret_key: String,
}

pub fn sha3_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    hasher.finalize().into()
}

pub fn generate_keypair() -> Keypair {
    Keypair::generate(&mut OsRng)
}

pub fn load_or_generate_keypair(path: &Path) -> PorResult<Keypair> {
    if path.exists() {
        load_keypair(path)
    } else {
        let keypair = generate_keypair();
        save_keypair(path, &keypair)?;
        Ok(keypair)
    }
}

pub fn save_keypair(path: &Path, keypair: &Keypair) -> PorResult<()> {
    let stored = StoredKeypair {
        public_key: hex::encode(keypair.public.to_bytes()),
        secret_key: hex::encode(keypair.secret.to_bytes()),
    };
    let encoded = toml::to_string_pretty(&stored)
        .map_err(|err| PorError::Config(format!("failed to encode keypair: {err}")))?;
    fs::create_dir_all(path.parent().unwrap_or_else(|| Path::new(".")))?;
    fs::write(path, encoded)?;
    Ok(())
}

pub fn load_keypair(path: &Path) -> PorResult<Keypair> {
    let raw = fs::read_to_string(path)?;
    let stored: StoredKeypair = toml::from_str(&raw)
        .map_err(|err| PorError::Config(format!("failed to decode keypair: {err}")))?;
    let secret_bytes = hex::decode(stored.secret_key)
        .map_err(|err| PorError::Config(format!("invalid secret key encoding: {err}")))?;
    let public_bytes = hex::decode(stored.public_key)
        .map_err(|err| PorError::Config(format!("invalid public key encoding: {err}")))?;
    let secret = SecretKey::from_bytes(&secret_bytes)
        .map_err(|err| PorError::Config(format!("invalid secret key bytes: {err}")))?;
    let public = PublicKey::from_bytes(&public_bytes)
        .map_err(|err| PorError::Config(format!("invalid public key bytes: {err}")))?;
    Ok(Keypair { secret, public })
}

pub fn sign_message(keypair: &Keypair, message: &[u8]) -> Signature {
    keypair.sign(message)
}

pub fn verify_signature(
    public_key: &PublicKey,
    message: &[u8],
    signature: &Signature,
) -> PorResult<()> {
    public_key
        .verify(message, signature)
        .map_err(|err| PorError::Crypto(format!("signature verification failed: {err}")))
}

/// Derive the textual node address from a public key: the hex form of the
/// first 20 bytes of the SHA3-256 digest of the key bytes.
pub fn address_from_public_key(public_key: &PublicKey) -> Address {
    let digest = sha3_256(public_key.as_bytes());
    hex::encode(&digest[..ADDRESS_LEN])
}

pub fn decode_address(address: &str) -> PorResult<[u8; ADDRESS_LEN]> {
    let bytes = hex::decode(address)
        .map_err(|err| PorError::Config(format!("invalid address encoding: {err}")))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| PorError::Config(format!("address must be {ADDRESS_LEN} bytes")))
}

pub fn public_key_from_hex(data: &str) -> PorResult<PublicKey> {
    let bytes = hex::decode(data)
        .map_err(|err| PorError::Config(format!("invalid public key encoding: {err}")))?;
    PublicKey::from_bytes(&bytes)
        .map_err(|err| PorError::Config(format!("invalid public key bytes: {err}")))
}

pub fn signature_from_hex(data: &str) -> PorResult<Signature> {
    let bytes = hex::decode(data)
        .map_err(|err| PorError::Config(format!("invalid signature encoding: {err}")))?;
    Signature::from_bytes(&bytes)
        .map_err(|err| PorError::Config(format!("invalid signature bytes: {err}")))
}

pub fn signature_to_hex(signature: &Signature) -> String {
    hex::encode(signature.to_bytes())
}
