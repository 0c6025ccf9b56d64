//! Transaction structure
//!
//! UTXO-style transactions carried in blocks. Consensus only needs their
//! hashes, ids and outputs here; script validation lives elsewhere.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::{Hash, HashDomain, HashWriter};

/// Transaction id type
pub type TransactionId = Hash;

/// Length of a subnetwork identifier
pub const SUBNETWORK_ID_SIZE: usize = 20;

/// Subnetwork a transaction belongs to
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubnetworkId(pub [u8; SUBNETWORK_ID_SIZE]);

impl SubnetworkId {
    /// Native (regular) transactions
    pub const NATIVE: SubnetworkId = SubnetworkId([0u8; SUBNETWORK_ID_SIZE]);

    /// Reserved subnetwork of coinbase transactions
    pub const COINBASE: SubnetworkId = {
        let mut id = [0u8; SUBNETWORK_ID_SIZE];
        id[0] = 1;
        SubnetworkId(id)
    };
}

impl fmt::Debug for SubnetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubnetworkId({})", hex::encode(self.0))
    }
}

/// Locking script of an output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ScriptPublicKey {
    pub version: u16,
    pub script: Vec<u8>,
}

impl ScriptPublicKey {
    pub fn new(version: u16, script: Vec<u8>) -> Self {
        Self { version, script }
    }
}

/// Reference to a previous output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionOutpoint {
    pub transaction_id: TransactionId,
    pub index: u32,
}

/// A transaction input referencing a previous output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub previous_outpoint: TransactionOutpoint,
    pub signature_script: Vec<u8>,
    pub sequence: u64,
    pub sig_op_count: u8,
}

/// A transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    /// Amount in leor
    pub value: u64,
    pub script_public_key: ScriptPublicKey,
}

impl TransactionOutput {
    pub fn new(value: u64, script_public_key: ScriptPublicKey) -> Self {
        Self {
            value,
            script_public_key,
        }
    }
}

/// A complete transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u16,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u64,
    pub subnetwork_id: SubnetworkId,
    pub gas: u64,
    pub payload: Vec<u8>,
}

impl Transaction {
    pub fn new(
        version: u16,
        inputs: Vec<TransactionInput>,
        outputs: Vec<TransactionOutput>,
        lock_time: u64,
        subnetwork_id: SubnetworkId,
        gas: u64,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            version,
            inputs,
            outputs,
            lock_time,
            subnetwork_id,
            gas,
            payload,
        }
    }

    /// Check if this is a coinbase transaction
    pub fn is_coinbase(&self) -> bool {
        self.subnetwork_id == SubnetworkId::COINBASE
    }

    /// Hash over every field, signature scripts included
    pub fn hash(&self) -> Hash {
        let mut writer = HashWriter::new(HashDomain::TransactionHash);
        self.write_to(&mut writer, true);
        writer.finalize()
    }

    /// Transaction id: like the hash but blind to signature scripts, so
    /// re-signing does not change it
    pub fn id(&self) -> TransactionId {
        let mut writer = HashWriter::new(HashDomain::TransactionId);
        self.write_to(&mut writer, false);
        writer.finalize()
    }

    fn write_to(&self, writer: &mut HashWriter, include_signatures: bool) {
        writer.write_u16(self.version);

        writer.write_u64(self.inputs.len() as u64);
        for input in &self.inputs {
            writer.update(&input.previous_outpoint.transaction_id.0);
            writer.write_u32(input.previous_outpoint.index);
            if include_signatures {
                writer.write_var_bytes(&input.signature_script);
                writer.write_u8(input.sig_op_count);
            } else {
                writer.write_var_bytes(&[]);
            }
            writer.write_u64(input.sequence);
        }

        writer.write_u64(self.outputs.len() as u64);
        for output in &self.outputs {
            writer.write_u64(output.value);
            writer.write_u16(output.script_public_key.version);
            writer.write_var_bytes(&output.script_public_key.script);
        }

        writer.write_u64(self.lock_time);
        writer.update(&self.subnetwork_id.0);
        writer.write_u64(self.gas);
        writer.write_var_bytes(&self.payload);
    }

    /// Calculate total output value
    pub fn total_output_value(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spend(signature: u8) -> Transaction {
        Transaction::new(
            0,
            vec![TransactionInput {
                previous_outpoint: TransactionOutpoint {
                    transaction_id: Hash::from_u64_word(9),
                    index: 0,
                },
                signature_script: vec![signature; 65],
                sequence: 0,
                sig_op_count: 1,
            }],
            vec![TransactionOutput::new(100, ScriptPublicKey::new(0, vec![1, 2, 3]))],
            0,
            SubnetworkId::NATIVE,
            0,
            vec![],
        )
    }

    #[test]
    fn test_coinbase_detection() {
        let mut tx = spend(1);
        assert!(!tx.is_coinbase());
        tx.subnetwork_id = SubnetworkId::COINBASE;
        assert!(tx.is_coinbase());
    }

    #[test]
    fn test_id_ignores_signatures() {
        let a = spend(1);
        let b = spend(2);
        assert_eq!(a.id(), b.id());
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_hash_covers_payload() {
        let a = spend(1);
        let mut b = a.clone();
        b.payload = vec![0xff];
        assert_ne!(a.hash(), b.hash());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_output_value_calculation() {
        let mut tx = spend(1);
        tx.outputs.push(TransactionOutput::new(200, ScriptPublicKey::default()));
        assert_eq!(tx.total_output_value(), 300);
    }
}
