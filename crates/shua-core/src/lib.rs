//! # shua-core
//! Foundation types for the Shua wallet: keys, addresses, scripts and
//! the pay-to-public-key-hash transaction format.

pub mod address;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod script;
pub mod types;
