use serde::Serialize;

use crate::crypto::sha3_256;
use crate::types::SessionHeader;

#[derive(Serialize)]
struct ChallengeSeed<'a> {
    block_hash: &'a str,
    session: &'a str,
}

/// Derive the leaf index every honest prover must reveal for a committed
/// `(header, total_relays)` pair, seeded by a block hash that did not exist
/// when the relays were served.
///
/// The digest's leading 16 hex characters are walked left to right, parsing
/// the remaining suffix at each offset; the first value below `total_relays`
/// wins, falling back to 0. The resulting bias toward small indices for
/// small evidence lists is part of the protocol.
pub fn required_index(header: &SessionHeader, total_relays: u64, block_hash: &[u8; 32]) -> u64 {
    let block_hash_hex = hex::encode(block_hash);
    let header_hash_hex = header.hash_hex();
    let payload = serde_json::to_vec(&ChallengeSeed {
        block_hash: &block_hash_hex,
        session: &header_hash_hex,
    })
    .expect("serializing challenge seed");
    let digest_hex = hex::encode(sha3_256(&payload));
    let window = &digest_hex[..16];
    for offset in 0..window.len() {
        let candidate =
            u64::from_str_radix(&window[offset..], 16).expect("hex window parses as u64");
        if total_relays > candidate {
            return candidate;
        }
    }
    0
}
