//! Pay-to-public-key-hash addresses.
//!
//! An address is Base58Check over a one-byte version prefix and the 20-byte
//! HASH160 (RIPEMD-160 of SHA-256) of a compressed public key:
//! - Mainnet: version `0x00`, addresses start with `1`
//! - Testnet: version `0x6f`, addresses start with `m` or `n`

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::crypto::PublicKey;
use crate::error::AddressError;
use crate::script::Script;

/// Network identifier determining address and WIF prefixes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    /// Version byte prefixed to P2PKH address payloads.
    pub fn address_version(&self) -> u8 {
        match self {
            Network::Mainnet => 0x00,
            Network::Testnet => 0x6f,
        }
    }

    /// Version byte prefixed to WIF-encoded private keys.
    pub fn wif_version(&self) -> u8 {
        match self {
            Network::Mainnet => 0x80,
            Network::Testnet => 0xef,
        }
    }

    /// Look up the network from an address version byte.
    pub fn from_address_version(version: u8) -> Result<Self, AddressError> {
        match version {
            0x00 => Ok(Network::Mainnet),
            0x6f => Ok(Network::Testnet),
            other => Err(AddressError::UnknownVersion(other)),
        }
    }

    /// Look up the network from a WIF version byte.
    pub fn from_wif_version(version: u8) -> Option<Self> {
        match version {
            0x80 => Some(Network::Mainnet),
            0xef => Some(Network::Testnet),
            _ => None,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => f.write_str("mainnet"),
            Network::Testnet => f.write_str("testnet"),
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "main" | "livenet" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            other => Err(format!("unknown network: {other}")),
        }
    }
}

/// A P2PKH address: network plus the 20-byte public key hash.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    network: Network,
    pubkey_hash: [u8; 20],
}

impl Address {
    /// Create an address from a public key hash and network.
    pub fn from_pubkey_hash(pubkey_hash: [u8; 20], network: Network) -> Self {
        Self {
            network,
            pubkey_hash,
        }
    }

    /// Derive the address of a public key. Pure and deterministic.
    pub fn from_public_key(public_key: &PublicKey, network: Network) -> Self {
        Self::from_pubkey_hash(public_key.pubkey_hash(), network)
    }

    /// The HASH160 of the owning public key.
    pub fn pubkey_hash(&self) -> [u8; 20] {
        self.pubkey_hash
    }

    /// The network this address belongs to.
    pub fn network(&self) -> Network {
        self.network
    }

    /// The locking script paying to this address.
    pub fn script_pubkey(&self) -> Script {
        Script::p2pkh(&self.pubkey_hash)
    }

    /// Encode this address as a Base58Check string.
    pub fn encode(&self) -> String {
        let mut payload = Vec::with_capacity(21);
        payload.push(self.network.address_version());
        payload.extend_from_slice(&self.pubkey_hash);
        bs58::encode(payload).with_check().into_string()
    }

    /// Decode a Base58Check address string, validating checksum, length and version.
    pub fn decode(s: &str) -> Result<Self, AddressError> {
        let payload = bs58::decode(s.trim())
            .with_check(None)
            .into_vec()
            .map_err(|e| AddressError::InvalidBase58(e.to_string()))?;

        if payload.len() != 21 {
            return Err(AddressError::InvalidLength(payload.len()));
        }

        let network = Network::from_address_version(payload[0])?;
        let mut pubkey_hash = [0u8; 20];
        pubkey_hash.copy_from_slice(&payload[1..]);

        Ok(Self {
            network,
            pubkey_hash,
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn known_protocol_address_round_trips() {
        // The metadata-protocol marker is itself a mainnet P2PKH address.
        let s = "1PuQa7K62MiKCtssSLKy1kh56WWU7MtUR5";
        let addr = Address::decode(s).unwrap();
        assert_eq!(addr.network(), Network::Mainnet);
        assert_eq!(addr.encode(), s);
    }

    #[test]
    fn secret_key_one_has_known_address() {
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let kp = KeyPair::from_secret_bytes(secret).unwrap();
        let addr = Address::from_public_key(&kp.public_key(), Network::Mainnet);
        assert_eq!(addr.encode(), "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH");
    }

    #[test]
    fn derivation_is_idempotent() {
        let kp = KeyPair::from_secret_bytes([7u8; 32]).unwrap();
        let a = Address::from_public_key(&kp.public_key(), Network::Mainnet);
        let b = Address::from_public_key(&kp.public_key(), Network::Mainnet);
        assert_eq!(a, b);
    }

    #[test]
    fn testnet_prefix() {
        let kp = KeyPair::from_secret_bytes([7u8; 32]).unwrap();
        let addr = Address::from_public_key(&kp.public_key(), Network::Testnet);
        let s = addr.encode();
        assert!(s.starts_with('m') || s.starts_with('n'), "got {s}");
        assert_eq!(Address::decode(&s).unwrap(), addr);
    }

    #[test]
    fn bad_checksum_rejected() {
        let err = Address::decode("1PuQa7K62MiKCtssSLKy1kh56WWU7MtUR6").unwrap_err();
        assert!(matches!(err, AddressError::InvalidBase58(_)));
    }

    #[test]
    fn garbage_rejected() {
        assert!(Address::decode("not-an-address").is_err());
        assert!(Address::decode("").is_err());
    }

    #[test]
    fn unknown_version_rejected() {
        let payload = [0x05u8; 21];
        let s = bs58::encode(payload).with_check().into_string();
        assert_eq!(
            Address::decode(&s).unwrap_err(),
            AddressError::UnknownVersion(0x05)
        );
    }

    #[test]
    fn serde_as_string() {
        let addr = Address::decode("1PuQa7K62MiKCtssSLKy1kh56WWU7MtUR5").unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"1PuQa7K62MiKCtssSLKy1kh56WWU7MtUR5\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn network_from_str() {
        assert_eq!("mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("TESTNET".parse::<Network>().unwrap(), Network::Testnet);
        assert!("regtest".parse::<Network>().is_err());
    }
}
