//! End-to-end test suite for Shua.
//!
//! Integration tests drive the wallet service and the social encoder
//! together against an in-memory network that indexes coins and accepts
//! broadcasts.

pub mod helpers;
