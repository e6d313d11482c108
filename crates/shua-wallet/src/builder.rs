//! Transaction assembly and signing.
//!
//! The flow for every outgoing transaction:
//! 1. Describe the outputs in an [`UnsignedTransaction`]
//! 2. [`TransactionBuilder::build_and_sign`] prices it, selects coins,
//!    attaches inputs and change, then signs every input
//!
//! A [`SignedTransaction`] is immutable; nothing half-signed ever leaves
//! this module.

use shua_core::address::Address;
use shua_core::constants::TX_VERSION;
use shua_core::crypto::{KeyPair, sign_transaction_input};
use shua_core::error::TransactionError;
use shua_core::script::Script;
use shua_core::types::{Transaction, TxIn, TxOut, Txid, Utxo};

use crate::coin_selection::CoinSelector;
use crate::error::WalletError;
use crate::fee::FeeEstimator;

/// Outputs awaiting funding. Inputs are attached by the builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    tx: Transaction,
}

impl UnsignedTransaction {
    pub fn new() -> Self {
        Self {
            tx: Transaction::new(TX_VERSION),
        }
    }

    /// Append a payment of `satoshis` to `address`.
    pub fn pay_to(&mut self, address: &Address, satoshis: u64) -> &mut Self {
        self.tx.outputs.push(TxOut {
            value: satoshis,
            script_pubkey: address.script_pubkey(),
        });
        self
    }

    /// Append a zero-value `OP_FALSE OP_RETURN` output carrying `tokens`.
    pub fn add_data(&mut self, tokens: &[Vec<u8>]) -> &mut Self {
        self.tx.outputs.push(TxOut {
            value: 0,
            script_pubkey: Script::data_output(tokens),
        });
        self
    }

    pub fn outputs(&self) -> &[TxOut] {
        &self.tx.outputs
    }

    /// Byte size before any input is attached.
    pub fn estimated_size(&self) -> u64 {
        self.tx.estimated_size()
    }
}

impl Default for UnsignedTransaction {
    fn default() -> Self {
        Self::new()
    }
}

/// A fully signed transaction ready for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    tx: Transaction,
    spent: Vec<Utxo>,
    fee: u64,
    change: u64,
}

impl SignedTransaction {
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    /// Raw wire bytes.
    pub fn raw(&self) -> Vec<u8> {
        self.tx.serialize()
    }

    pub fn to_hex(&self) -> String {
        self.tx.to_hex()
    }

    pub fn txid(&self) -> Txid {
        self.tx.txid()
    }

    /// Coins consumed by the inputs, in input order.
    pub fn spent(&self) -> &[Utxo] {
        &self.spent
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    /// Value returned to the change address; zero when no change output exists.
    pub fn change(&self) -> u64 {
        self.change
    }
}

/// Prices, funds and signs transactions.
///
/// # Example
/// ```ignore
/// let mut unsigned = UnsignedTransaction::new();
/// unsigned.pay_to(&recipient, 1_000);
/// let signed = TransactionBuilder::new().build_and_sign(unsigned, &coins, &change, &key)?;
/// ```
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    fees: FeeEstimator,
    expected_inputs: Option<u64>,
}

impl TransactionBuilder {
    /// Builder at the default fee rate.
    pub fn new() -> Self {
        Self {
            fees: FeeEstimator::default(),
            expected_inputs: None,
        }
    }

    /// Override the fee rate (satoshis per kilobyte).
    pub fn set_fee_per_kb(&mut self, fee_per_kb: u64) -> &mut Self {
        self.fees = FeeEstimator::new(fee_per_kb);
        self
    }

    /// Price the transaction as if it carried `count` inputs.
    ///
    /// By default the fee covers only inputs already attached to the
    /// transaction when it is priced, which for a fresh
    /// [`UnsignedTransaction`] is none.
    pub fn set_expected_inputs(&mut self, count: u64) -> &mut Self {
        self.expected_inputs = Some(count);
        self
    }

    /// Fee for `unsigned` under this builder's policy.
    pub fn fee_for(&self, unsigned: &UnsignedTransaction) -> u64 {
        let inputs = self
            .expected_inputs
            .unwrap_or(unsigned.tx.inputs.len() as u64);
        self.fees.estimate(unsigned.estimated_size(), inputs)
    }

    /// Fund `unsigned` from `coins`, add change to `change_address` and
    /// sign every input with `key`.
    pub fn build_and_sign(
        &self,
        unsigned: UnsignedTransaction,
        coins: &[Utxo],
        change_address: &Address,
        key: &KeyPair,
    ) -> Result<SignedTransaction, WalletError> {
        if unsigned.tx.outputs.is_empty() {
            return Err(TransactionError::EmptyOutputs.into());
        }
        let send_total = unsigned
            .tx
            .total_output_value()
            .ok_or(TransactionError::ValueOverflow)?;

        let fee = self.fee_for(&unsigned);
        let need = send_total
            .checked_add(fee)
            .ok_or(TransactionError::ValueOverflow)?;

        let selection = CoinSelector::select(coins, Some(need));
        if selection.is_empty() {
            let have = coins
                .iter()
                .fold(0u64, |acc, u| acc.saturating_add(u.satoshis));
            return Err(WalletError::InsufficientFunds { have, need });
        }

        let change = selection.total.checked_sub(need).ok_or_else(|| {
            WalletError::BuildError(format!(
                "selected {} but need {need}",
                selection.total
            ))
        })?;

        let mut tx = unsigned.tx;
        tx.inputs
            .extend(selection.selected.iter().map(|u| TxIn::unsigned(u.outpoint())));
        if change > 0 {
            tx.outputs.push(TxOut {
                value: change,
                script_pubkey: change_address.script_pubkey(),
            });
        }

        for (index, coin) in selection.selected.iter().enumerate() {
            sign_transaction_input(&mut tx, index, key, &coin.script, coin.satoshis)?;
        }

        tracing::debug!(
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            fee,
            change,
            "signed transaction"
        );

        Ok(SignedTransaction {
            tx,
            spent: selection.selected,
            fee,
            change,
        })
    }
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
