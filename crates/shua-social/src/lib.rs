//! # shua-social: social records as embedded data token sequences.
//!
//! A record is a flat sequence of byte tokens made of up to three groups,
//! each opened by a well-known marker:
//!
//! ```text
//! B   <content> <media type> [<encoding>] |     one per text or image
//! MAP SET app <app> type <type> [k v]...        exactly one
//! |   AIP BITCOIN_ECDSA <address> <signature>   optional identity proof
//! ```
//!
//! Build records through [`BSocial`], turn them into tokens with
//! [`SocialOperation::encode`], then optionally [`sign`] them with an
//! identity key before embedding with [`Ops::data_script`].

pub mod content;
pub mod decode;
pub mod error;
pub mod identity;
pub mod operation;
pub mod protocol;

pub use content::{Image, PostContent, TextItem};
pub use decode::{ContentGroup, DecodedOps, IdentityProof, decode};
pub use error::SocialError;
pub use identity::{sign, signing_message, verify};
pub use operation::{BSocial, SocialOperation, TipAmount};
pub use protocol::{Encoding, OperationKind, Ops};
