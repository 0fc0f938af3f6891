//! secp256k1 key handling and node-identity derivation
//!
//! Node ids on the wire are 64-byte uncompressed public keys with the
//! leading 0x04 tag stripped; Ethereum addresses are the low 20 bytes of
//! the keccak-256 of that form.

use alloy_primitives::{keccak256, Address, B512};
use secp256k1::{PublicKey, Secp256k1, SecretKey};

use crate::utils::{DptError, Result};

/// True iff `key` is 32 bytes and within the secp256k1 group order.
pub fn is_valid_private(key: &[u8]) -> bool {
    key.len() == 32 && SecretKey::from_slice(key).is_ok()
}

/// Validate a public key.
///
/// A 64-byte key is accepted iff prefixing the 0x04 tag yields an on-curve
/// point. Other lengths are only considered when `sanitize` is set, in
/// which case the library decides whether the bytes parse as a point.
pub fn is_valid_public(pubkey: &[u8], sanitize: bool) -> bool {
    if pubkey.len() == 64 {
        let mut tagged = [0u8; 65];
        tagged[0] = 0x04;
        tagged[1..].copy_from_slice(pubkey);
        PublicKey::from_slice(&tagged).is_ok()
    } else if sanitize {
        PublicKey::from_slice(pubkey).is_ok()
    } else {
        false
    }
}

/// Derive the 64-byte public key for a private key.
pub fn private_to_public(key: &[u8]) -> Result<B512> {
    let secret = SecretKey::from_slice(key)?;
    let secp = Secp256k1::new();
    let public = PublicKey::from_secret_key(&secp, &secret);
    Ok(B512::from_slice(&public.serialize_uncompressed()[1..]))
}

/// The Ethereum address of a public key: low 20 bytes of `keccak256(pub64)`.
///
/// With `sanitize`, keys in other encodings (compressed, tagged
/// uncompressed) are reparsed into the 64-byte form first.
pub fn pub_to_address(pubkey: &[u8], sanitize: bool) -> Result<Address> {
    let normalized;
    let pubkey = if sanitize && pubkey.len() != 64 {
        normalized = import_public(pubkey)?;
        normalized.as_slice()
    } else {
        pubkey
    };
    if pubkey.len() != 64 {
        return Err(DptError::LengthError(format!(
            "public key must be 64 bytes, got {}",
            pubkey.len()
        )));
    }
    Ok(Address::from_slice(&keccak256(pubkey)[12..]))
}

/// The Ethereum address of a private key.
pub fn private_to_address(key: &[u8]) -> Result<Address> {
    let public = private_to_public(key)?;
    pub_to_address(public.as_slice(), false)
}

/// Normalize a public key to the 64-byte tag-less form, parsing via the
/// library when the input is in another encoding.
pub fn import_public(pubkey: &[u8]) -> Result<B512> {
    if pubkey.len() == 64 {
        return Ok(B512::from_slice(pubkey));
    }
    let parsed = PublicKey::from_slice(pubkey)?;
    Ok(B512::from_slice(&parsed.serialize_uncompressed()[1..]))
}
