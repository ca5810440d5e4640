use std::path::Path;
use std::sync::Arc;

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options,
};
use serde::{Deserialize, Serialize};

use crate::crypto::decode_address;
use crate::errors::{PorError, PorResult};
use crate::types::{Address, ClaimMessage, EvidenceType, RelayProof, SessionHeader};

pub const STORAGE_SCHEMA_VERSION: u32 = 1;

const CF_RELAY_STATE: &str = "relay_state";
const CF_METADATA: &str = "metadata";
const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

/// Leading key byte for verified proof-of-relay records.
const VERIFIED_PREFIX: u8 = 0x01;
/// Leading key byte for unverified claim commitments.
const CLAIM_PREFIX: u8 = 0x02;

/// Claim commitment as persisted, with the height the chain accepted it at.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredClaim {
    pub message: ClaimMessage,
    pub submitted_at_height: u64,
}

/// Final on-chain record of a verified session: the committed pair plus the
/// one leaf the node was required to reveal. Immutable once written.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProofOfRelay {
    pub node_address: Address,
    pub header: SessionHeader,
    pub evidence_type: EvidenceType,
    pub total_relays: u64,
    pub merkle_root: [u8; 32],
    pub leaf: RelayProof,
    pub verified_at_height: u64,
}

/// Height-ordered KV state for claims and verified records, keyed by
/// `(node_address, session header, evidence type)` under per-kind prefixes.
pub struct RelayStateStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RelayStateStore {
    pub fn open(path: &Path) -> PorResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_RELAY_STATE, Options::default()),
            ColumnFamilyDescriptor::new(CF_METADATA, Options::default()),
        ];
        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)?;
        let store = Self { db: Arc::new(db) };
        store.ensure_schema_supported()?;
        Ok(store)
    }

    fn state_cf(&self) -> PorResult<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(CF_RELAY_STATE)
            .ok_or_else(|| PorError::Config("missing relay state column family".into()))
    }

    fn metadata_cf(&self) -> PorResult<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(CF_METADATA)
            .ok_or_else(|| PorError::Config("missing metadata column family".into()))
    }

    fn ensure_schema_supported(&self) -> PorResult<()> {
        let metadata_cf = self.metadata_cf()?;
        match self.db.get_cf(&metadata_cf, SCHEMA_VERSION_KEY)? {
            Some(bytes) => {
                let bytes: [u8; 4] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| PorError::Config("invalid schema version encoding".into()))?;
                let version = u32::from_be_bytes(bytes);
                if version != STORAGE_SCHEMA_VERSION {
                    return Err(PorError::Config(format!(
                        "database schema version {version} is not the supported \
                         {STORAGE_SCHEMA_VERSION}"
                    )));
                }
                Ok(())
            }
            None => {
                self.db.put_cf(
                    &metadata_cf,
                    SCHEMA_VERSION_KEY,
                    STORAGE_SCHEMA_VERSION.to_be_bytes(),
                )?;
                Ok(())
            }
        }
    }

    pub fn schema_version(&self) -> PorResult<u32> {
        let metadata_cf = self.metadata_cf()?;
        match self.db.get_cf(&metadata_cf, SCHEMA_VERSION_KEY)? {
            Some(bytes) => {
                let bytes: [u8; 4] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| PorError::Config("invalid schema version encoding".into()))?;
                Ok(u32::from_be_bytes(bytes))
            }
            None => Ok(STORAGE_SCHEMA_VERSION),
        }
    }

    pub fn set_claim(&self, claim: &StoredClaim) -> PorResult<()> {
        let key = state_key(
            CLAIM_PREFIX,
            &claim.message.from_address,
            &claim.message.header,
            claim.message.evidence_type,
        )?;
        let value = bincode::serialize(claim).expect("encoding claim record");
        let cf = self.state_cf()?;
        self.db.put_cf(&cf, key, value)?;
        Ok(())
    }

    pub fn claim(
        &self,
        address: &str,
        header: &SessionHeader,
        evidence_type: EvidenceType,
    ) -> PorResult<Option<StoredClaim>> {
        let key = state_key(CLAIM_PREFIX, address, header, evidence_type)?;
        let cf = self.state_cf()?;
        match self.db.get_cf(&cf, key)? {
            Some(value) => Ok(Some(
                bincode::deserialize(&value).expect("decoding claim record"),
            )),
            None => Ok(None),
        }
    }

    pub fn delete_claim(
        &self,
        address: &str,
        header: &SessionHeader,
        evidence_type: EvidenceType,
    ) -> PorResult<()> {
        let key = state_key(CLAIM_PREFIX, address, header, evidence_type)?;
        let cf = self.state_cf()?;
        self.db.delete_cf(&cf, key)?;
        Ok(())
    }

    pub fn claims_by_address(&self, address: &str) -> PorResult<Vec<StoredClaim>> {
        let prefix = address_prefix(CLAIM_PREFIX, address)?;
        self.scan(&prefix, |value| {
            bincode::deserialize(value).expect("decoding claim record")
        })
    }

    pub fn all_claims(&self) -> PorResult<Vec<StoredClaim>> {
        self.scan(&[CLAIM_PREFIX], |value| {
            bincode::deserialize(value).expect("decoding claim record")
        })
    }

    pub fn set_verified(&self, record: &ProofOfRelay) -> PorResult<()> {
        let key = state_key(
            VERIFIED_PREFIX,
            &record.node_address,
            &record.header,
            record.evidence_type,
        )?;
        let value = bincode::serialize(record).expect("encoding verified record");
        let cf = self.state_cf()?;
        self.db.put_cf(&cf, key, value)?;
        Ok(())
    }

    pub fn verified(
        &self,
        address: &str,
        header: &SessionHeader,
        evidence_type: EvidenceType,
    ) -> PorResult<Option<ProofOfRelay>> {
        let key = state_key(VERIFIED_PREFIX, address, header, evidence_type)?;
        let cf = self.state_cf()?;
        match self.db.get_cf(&cf, key)? {
            Some(value) => Ok(Some(
                bincode::deserialize(&value).expect("decoding verified record"),
            )),
            None => Ok(None),
        }
    }

    pub fn verified_by_address(&self, address: &str) -> PorResult<Vec<ProofOfRelay>> {
        let prefix = address_prefix(VERIFIED_PREFIX, address)?;
        self.scan(&prefix, |value| {
            bincode::deserialize(value).expect("decoding verified record")
        })
    }

    pub fn verified_by_app(
        &self,
        address: &str,
        app_pubkey: &str,
    ) -> PorResult<Vec<ProofOfRelay>> {
        let mut prefix = address_prefix(VERIFIED_PREFIX, address)?;
        let app = hex::decode(app_pubkey)
            .map_err(|err| PorError::Config(format!("invalid app pubkey encoding: {err}")))?;
        prefix.extend_from_slice(&app);
        self.scan(&prefix, |value| {
            bincode::deserialize(value).expect("decoding verified record")
        })
    }

    fn scan<T>(&self, prefix: &[u8], decode: impl Fn(&[u8]) -> T) -> PorResult<Vec<T>> {
        let cf = self.state_cf()?;
        let mut records = Vec::new();
        let mut iterator = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));
        while let Some(entry) = iterator.next() {
            let (key, value) = entry?;
            if !key.starts_with(prefix) {
                break;
            }
            records.push(decode(&value));
        }
        Ok(records)
    }
}

impl Clone for RelayStateStore {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}

fn state_key(
    prefix: u8,
    address: &str,
    header: &SessionHeader,
    evidence_type: EvidenceType,
) -> PorResult<Vec<u8>> {
    let mut key = address_prefix(prefix, address)?;
    let app = hex::decode(&header.app_pubkey)
        .map_err(|err| PorError::Config(format!("invalid app pubkey encoding: {err}")))?;
    let chain = hex::decode(&header.chain_id)
        .map_err(|err| PorError::Config(format!("invalid chain id encoding: {err}")))?;
    key.extend_from_slice(&app);
    key.extend_from_slice(&chain);
    key.extend_from_slice(&header.session_block_height.to_be_bytes());
    key.push(evidence_type.as_byte());
    Ok(key)
}

fn address_prefix(prefix: u8, address: &str) -> PorResult<Vec<u8>> {
    let address = decode_address(address)?;
    let mut key = Vec::with_capacity(1 + address.len());
    key.push(prefix);
    key.extend_from_slice(&address);
    Ok(key)
}
