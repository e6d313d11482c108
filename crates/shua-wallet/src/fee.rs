//! Size-based fee estimation.
//!
//! `fee = floor((size + P2PKH_INPUT_SIZE * inputs) * rate / 1000) + 1`
//!
//! `size` is the transaction's estimated size before any signature is
//! attached. The `+ 1` keeps every fee strictly positive.

use shua_core::constants::{FEE_PER_KB, P2PKH_INPUT_SIZE};

/// Fee estimator parameterised by a satoshis-per-kilobyte rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimator {
    fee_per_kb: u64,
}

impl FeeEstimator {
    pub fn new(fee_per_kb: u64) -> Self {
        Self { fee_per_kb }
    }

    pub fn fee_per_kb(&self) -> u64 {
        self.fee_per_kb
    }

    /// Fee in satoshis for a transaction of `base_size` bytes that will
    /// carry `input_count` P2PKH inputs.
    pub fn estimate(&self, base_size: u64, input_count: u64) -> u64 {
        let size = base_size.saturating_add(P2PKH_INPUT_SIZE.saturating_mul(input_count));
        size.saturating_mul(self.fee_per_kb) / 1000 + 1
    }
}

impl Default for FeeEstimator {
    fn default() -> Self {
        Self::new(FEE_PER_KB)
    }
}

/// [`FeeEstimator::estimate`] at the default rate.
pub fn estimate_fee(base_size: u64, input_count: u64) -> u64 {
    FeeEstimator::default().estimate(base_size, input_count)
}
