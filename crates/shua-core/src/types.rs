//! Transaction types and their wire serialization.
//!
//! All monetary values are in satoshis. Integers are little-endian on the
//! wire and counts/lengths use the Bitcoin variable-length integer.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::constants::{DEFAULT_SEQUENCE, OUTPUT_OVERHEAD_SIZE, TX_OVERHEAD_SIZE};
use crate::crypto::sha256d;
use crate::error::TransactionError;
use crate::script::Script;

/// Append a variable-length integer.
pub fn write_varint(buf: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => buf.push(n as u8),
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&n.to_le_bytes());
        }
    }
}

/// Cursor over serialized transaction bytes.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], TransactionError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| TransactionError::Decode(format!("truncated at {}", self.pos)))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], TransactionError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn varint(&mut self) -> Result<u64, TransactionError> {
        let [first] = self.array::<1>()?;
        Ok(match first {
            0xfd => u16::from_le_bytes(self.array()?) as u64,
            0xfe => u32::from_le_bytes(self.array()?) as u64,
            0xff => u64::from_le_bytes(self.array()?),
            n => n as u64,
        })
    }

    fn script(&mut self) -> Result<Script, TransactionError> {
        let len = self.varint()? as usize;
        Ok(Script::from_bytes(self.take(len)?.to_vec()))
    }
}

/// A transaction id. Stored in hash byte order, displayed byte-reversed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Txid([u8; 32]);

impl Txid {
    /// Create a txid from bytes in hash (internal) order.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Bytes in hash (internal) order, as written into outpoints.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse the conventional byte-reversed hex form.
    pub fn from_hex(s: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(s.trim()).map_err(|_| TransactionError::InvalidTxid(s.into()))?;
        let mut out: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TransactionError::InvalidTxid(s.into()))?;
        out.reverse();
        Ok(Self(out))
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter().rev() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txid({self})")
    }
}

impl FromStr for Txid {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Txid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Txid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Reference to a specific output of a previous transaction.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutPoint {
    pub txid: Txid,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Txid, vout: u32) -> Self {
        Self { txid, vout }
    }

    pub(crate) fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.txid.as_bytes());
        buf.extend_from_slice(&self.vout.to_le_bytes());
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// A transaction input, spending a previous output.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    pub previous_output: OutPoint,
    /// Unlocking script. Empty until signed.
    pub script_sig: Script,
    pub sequence: u32,
}

impl TxIn {
    /// An input with an empty unlocking script and final sequence.
    pub fn unsigned(previous_output: OutPoint) -> Self {
        Self {
            previous_output,
            script_sig: Script::new(),
            sequence: DEFAULT_SEQUENCE,
        }
    }
}

/// A transaction output: a P2PKH payment or an unspendable data carrier.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    /// Value in satoshis.
    pub value: u64,
    pub script_pubkey: Script,
}

impl TxOut {
    pub(crate) fn write_to(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.value.to_le_bytes());
        write_varint(buf, self.script_pubkey.len() as u64);
        buf.extend_from_slice(self.script_pubkey.as_bytes());
    }
}

/// A transaction transferring value between scripts.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    /// An empty transaction with the given version.
    pub fn new(version: u32) -> Self {
        Self {
            version,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    /// Canonical wire encoding.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.estimated_size() as usize);
        buf.extend_from_slice(&self.version.to_le_bytes());
        write_varint(&mut buf, self.inputs.len() as u64);
        for input in &self.inputs {
            input.previous_output.write_to(&mut buf);
            write_varint(&mut buf, input.script_sig.len() as u64);
            buf.extend_from_slice(input.script_sig.as_bytes());
            buf.extend_from_slice(&input.sequence.to_le_bytes());
        }
        write_varint(&mut buf, self.outputs.len() as u64);
        for output in &self.outputs {
            output.write_to(&mut buf);
        }
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf
    }

    /// Parse the canonical wire encoding. Trailing bytes are rejected.
    pub fn deserialize(data: &[u8]) -> Result<Self, TransactionError> {
        let mut r = Reader { data, pos: 0 };
        let version = u32::from_le_bytes(r.array()?);

        let n_inputs = r.varint()?;
        let mut inputs = Vec::new();
        for _ in 0..n_inputs {
            let txid = Txid::from_bytes(r.array()?);
            let vout = u32::from_le_bytes(r.array()?);
            let script_sig = r.script()?;
            let sequence = u32::from_le_bytes(r.array()?);
            inputs.push(TxIn {
                previous_output: OutPoint::new(txid, vout),
                script_sig,
                sequence,
            });
        }

        let n_outputs = r.varint()?;
        let mut outputs = Vec::new();
        for _ in 0..n_outputs {
            let value = u64::from_le_bytes(r.array()?);
            let script_pubkey = r.script()?;
            outputs.push(TxOut {
                value,
                script_pubkey,
            });
        }

        let lock_time = u32::from_le_bytes(r.array()?);
        if r.pos != data.len() {
            return Err(TransactionError::Decode(format!(
                "{} trailing bytes",
                data.len() - r.pos
            )));
        }

        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    /// Hex of the wire encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    /// Parse a hex-encoded transaction.
    pub fn from_hex(s: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(s.trim()).map_err(|e| TransactionError::Decode(e.to_string()))?;
        Self::deserialize(&bytes)
    }

    /// Double SHA-256 of the wire encoding.
    pub fn txid(&self) -> Txid {
        Txid(sha256d(&self.serialize()))
    }

    /// Sum of all output values. Returns None on overflow.
    pub fn total_output_value(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.value))
    }

    /// Upper-bound size estimate used for fee calculation.
    ///
    /// Counts the fixed overhead, each output's script plus value and length
    /// prefix, and each attached input at its current serialized size.
    pub fn estimated_size(&self) -> u64 {
        let outputs: u64 = self
            .outputs
            .iter()
            .map(|o| o.script_pubkey.len() as u64 + OUTPUT_OVERHEAD_SIZE)
            .sum();
        let inputs: u64 = self
            .inputs
            .iter()
            .map(|i| 36 + 9 + i.script_sig.len() as u64 + 4)
            .sum();
        TX_OVERHEAD_SIZE + outputs + inputs
    }
}

/// A spendable coin in canonical form.
///
/// Invariant: `satoshis > 0`. Normalizers drop records that would violate it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Utxo {
    pub txid: Txid,
    pub vout: u32,
    pub satoshis: u64,
    /// Locking script of the coin.
    pub script: Script,
}

impl Utxo {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout)
    }
}
