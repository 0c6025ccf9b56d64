//! Coinbase payload codec
//!
//! Layout, all integers little-endian:
//! `blue_score u64 | subsidy u64 | spk_version u16 | spk_len u8 | spk_script | extra_data`

use thiserror::Error;

use super::{CoinbaseData, ScriptPublicKey, Transaction};

const UINT64_LEN: usize = 8;
const UINT16_LEN: usize = 2;
const LENGTH_OF_SCRIPT_PUB_KEY_LENGTH: usize = 1;

/// Fixed prefix before the script bytes
pub const MIN_PAYLOAD_LENGTH: usize = UINT64_LEN + UINT64_LEN + UINT16_LEN + LENGTH_OF_SCRIPT_PUB_KEY_LENGTH;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("coinbase payload is {got} bytes, shorter than the {min} byte minimum")]
    TooShort { got: usize, min: usize },

    #[error("script public key of {got} bytes exceeds the {max} byte limit")]
    ScriptTooLong { got: usize, max: u8 },

    #[error("coinbase payload declares a {declared} byte script but only {available} bytes follow")]
    ScriptOutOfBounds { declared: usize, available: usize },

    #[error("transaction is not a coinbase")]
    NotCoinbase,
}

/// Serialize the payload of a coinbase transaction
pub fn serialize_coinbase_payload(
    blue_score: u64,
    coinbase_data: &CoinbaseData,
    subsidy: u64,
    script_public_key_max_len: u8,
) -> Result<Vec<u8>, PayloadError> {
    let script = &coinbase_data.script_public_key.script;
    if script.len() > script_public_key_max_len as usize {
        return Err(PayloadError::ScriptTooLong {
            got: script.len(),
            max: script_public_key_max_len,
        });
    }

    let mut payload = Vec::with_capacity(MIN_PAYLOAD_LENGTH + script.len() + coinbase_data.extra_data.len());
    payload.extend_from_slice(&blue_score.to_le_bytes());
    payload.extend_from_slice(&subsidy.to_le_bytes());
    payload.extend_from_slice(&coinbase_data.script_public_key.version.to_le_bytes());
    payload.push(script.len() as u8);
    payload.extend_from_slice(script);
    payload.extend_from_slice(&coinbase_data.extra_data);
    Ok(payload)
}

/// Parse a coinbase transaction's payload back into
/// `(blue_score, coinbase_data, subsidy)`
pub fn extract_coinbase_data_blue_score_and_subsidy(
    coinbase: &Transaction,
    script_public_key_max_len: u8,
) -> Result<(u64, CoinbaseData, u64), PayloadError> {
    if !coinbase.is_coinbase() {
        return Err(PayloadError::NotCoinbase);
    }
    let payload = &coinbase.payload;
    if payload.len() < MIN_PAYLOAD_LENGTH {
        return Err(PayloadError::TooShort {
            got: payload.len(),
            min: MIN_PAYLOAD_LENGTH,
        });
    }

    let blue_score = read_u64(&payload[0..8]);
    let subsidy = read_u64(&payload[8..16]);
    let version = u16::from_le_bytes([payload[16], payload[17]]);
    let script_len = payload[18] as usize;

    if script_len > script_public_key_max_len as usize {
        return Err(PayloadError::ScriptTooLong {
            got: script_len,
            max: script_public_key_max_len,
        });
    }
    let available = payload.len() - MIN_PAYLOAD_LENGTH;
    if script_len > available {
        return Err(PayloadError::ScriptOutOfBounds {
            declared: script_len,
            available,
        });
    }

    let script_end = MIN_PAYLOAD_LENGTH + script_len;
    let coinbase_data = CoinbaseData::new(
        ScriptPublicKey::new(version, payload[MIN_PAYLOAD_LENGTH..script_end].to_vec()),
        payload[script_end..].to_vec(),
    );
    Ok((blue_score, coinbase_data, subsidy))
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; UINT64_LEN];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}
