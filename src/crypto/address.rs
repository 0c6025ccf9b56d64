//! HARBI addresses
//!
//! Address format: "harbi:" + Base58Check(pubkey[0:32] + checksum[0:4]).
//! An address pays to a Schnorr public key through a pay-to-pubkey script.

use super::double_hash;
use crate::consensus::ScriptPublicKey;
use thiserror::Error;

/// Address prefix
pub const ADDRESS_PREFIX: &str = "harbi:";

const PUBKEY_LEN: usize = 32;
const CHECKSUM_LEN: usize = 4;
const OP_DATA_32: u8 = 0x20;
const OP_CHECKSIG: u8 = 0xac;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid address prefix")]
    InvalidPrefix,
    #[error("invalid base58 encoding")]
    InvalidEncoding,
    #[error("invalid address length {0}")]
    InvalidLength(usize),
    #[error("invalid checksum")]
    InvalidChecksum,
}

/// Encode a Schnorr public key as an address
pub fn encode_address(pubkey: &[u8; PUBKEY_LEN]) -> String {
    let checksum = double_hash(pubkey);
    let mut payload = Vec::with_capacity(PUBKEY_LEN + CHECKSUM_LEN);
    payload.extend_from_slice(pubkey);
    payload.extend_from_slice(&checksum.0[..CHECKSUM_LEN]);
    format!("{}{}", ADDRESS_PREFIX, bs58::encode(payload).into_string())
}

/// Decode an address back to its public key
pub fn decode_address(address: &str) -> Result<[u8; PUBKEY_LEN], AddressError> {
    let encoded = address
        .strip_prefix(ADDRESS_PREFIX)
        .ok_or(AddressError::InvalidPrefix)?;
    let decoded = bs58::decode(encoded)
        .into_vec()
        .map_err(|_| AddressError::InvalidEncoding)?;

    if decoded.len() != PUBKEY_LEN + CHECKSUM_LEN {
        return Err(AddressError::InvalidLength(decoded.len()));
    }

    let (key, checksum) = decoded.split_at(PUBKEY_LEN);
    if checksum != &double_hash(key).0[..CHECKSUM_LEN] {
        return Err(AddressError::InvalidChecksum);
    }

    let mut pubkey = [0u8; PUBKEY_LEN];
    pubkey.copy_from_slice(key);
    Ok(pubkey)
}

/// Pay-to-pubkey script: OP_DATA_32 <pubkey> OP_CHECKSIG
pub fn pay_to_pubkey_script(pubkey: &[u8; PUBKEY_LEN]) -> ScriptPublicKey {
    let mut script = Vec::with_capacity(PUBKEY_LEN + 2);
    script.push(OP_DATA_32);
    script.extend_from_slice(pubkey);
    script.push(OP_CHECKSIG);
    ScriptPublicKey::new(0, script)
}

/// Decode an address straight into the script that pays to it
pub fn address_to_script_public_key(address: &str) -> Result<ScriptPublicKey, AddressError> {
    decode_address(address).map(|key| pay_to_pubkey_script(&key))
}
