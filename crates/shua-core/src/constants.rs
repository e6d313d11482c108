//! Protocol and policy constants. All monetary values in satoshis.

/// Satoshis per BSV.
pub const COIN: u64 = 100_000_000;

/// Fee policy in satoshis per 1000 bytes. No fee-market estimation.
pub const FEE_PER_KB: u64 = 3;

/// Size of a standard P2PKH unlocking script: push(sig) + sig + push(pubkey) + pubkey.
pub const P2PKH_SIGSCRIPT_SIZE: u64 = 1 + 73 + 1 + 33;

/// Size of one P2PKH input: outpoint + script length + unlocking script + sequence.
pub const P2PKH_INPUT_SIZE: u64 = 36 + 1 + P2PKH_SIGSCRIPT_SIZE + 4;

/// Fixed-width transaction overhead used by the size estimator:
/// version + max input-count varint + max output-count varint + lock time.
pub const TX_OVERHEAD_SIZE: u64 = 4 + 9 + 9 + 4;

/// Per-output overhead used by the size estimator: value + max script-length varint.
pub const OUTPUT_OVERHEAD_SIZE: u64 = 8 + 1;

/// Outputs at or below this value are never selected as inputs.
pub const DUST_LIMIT: u64 = 1;

/// Margin a single coin must clear above the target to be picked alone.
pub const SINGLE_COIN_MARGIN: u64 = 2;

/// Amount withheld from the payment output on a full-balance send.
pub const SEND_MAX_BUFFER: u64 = 2;

/// Transaction version emitted by the assembler.
pub const TX_VERSION: u32 = 1;

/// Sequence number for every input (final).
pub const DEFAULT_SEQUENCE: u32 = 0xffff_ffff;

pub const SIGHASH_ALL: u32 = 0x01;
pub const SIGHASH_FORKID: u32 = 0x40;

/// Authorization mode used for every input: all inputs, all outputs, fork id.
pub const SIGHASH_ALL_FORKID: u32 = SIGHASH_ALL | SIGHASH_FORKID;

/// Prefix mixed into signed-message digests.
pub const MESSAGE_MAGIC: &str = "Bitcoin Signed Message:\n";
