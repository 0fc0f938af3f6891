use alloy_primitives::{keccak256, Address, Bytes};
use alloy_rlp::RlpEncodable;

use crate::utils::{DptError, Result};

/// Check the canonical textual form: `0x` followed by 40 hex digits.
pub fn is_valid_address(address: &str) -> bool {
    address.len() == 42
        && address.starts_with("0x")
        && address.as_bytes()[2..].iter().all(u8::is_ascii_hexdigit)
}

/// Derive the checksummed form of a hex address.
///
/// Without a chain id this is EIP-55; with one it is EIP-1191, which mixes
/// the decimal chain id into the hash preimage. The two are not mutually
/// compatible, so callers must pick one convention and stay with it.
pub fn to_checksum_address(address: &str, chain_id: Option<u64>) -> Result<String> {
    if !is_valid_address(address) {
        return Err(DptError::LengthError(format!(
            "not a valid hex address: {address}"
        )));
    }
    let addr = address[2..].to_ascii_lowercase();
    let preimage = match chain_id {
        Some(id) => format!("{id}0x{addr}"),
        None => addr.clone(),
    };
    let hash = keccak256(preimage.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in addr.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// Validate a checksummed address, case included.
pub fn is_valid_checksum_address(address: &str, chain_id: Option<u64>) -> bool {
    is_valid_address(address)
        && to_checksum_address(address, chain_id)
            .map(|checksummed| checksummed == address)
            .unwrap_or(false)
}

/// CREATE contract address: low 20 bytes of `keccak256(rlp([sender, nonce]))`.
///
/// The nonce goes in as an unpadded big-endian integer, so a zero nonce
/// encodes as the empty byte string per RLP canonical form.
pub fn generate_address(from: &[u8], nonce: &[u8]) -> Result<Address> {
    if from.len() != 20 {
        return Err(DptError::LengthError(format!(
            "sender must be 20 bytes, got {}",
            from.len()
        )));
    }

    #[derive(RlpEncodable)]
    struct CreateInput {
        sender: Address,
        nonce: Bytes,
    }

    let unpadded = &nonce[nonce.iter().position(|b| *b != 0).unwrap_or(nonce.len())..];
    let encoded = alloy_rlp::encode(CreateInput {
        sender: Address::from_slice(from),
        nonce: Bytes::copy_from_slice(unpadded),
    });
    Ok(Address::from_slice(&keccak256(&encoded)[12..]))
}

/// CREATE2 contract address (EIP-1014): low 20 bytes of
/// `keccak256(0xff ++ sender ++ salt ++ keccak256(init_code))`.
pub fn generate_address2(from: &[u8], salt: &[u8], init_code: &[u8]) -> Result<Address> {
    if from.len() != 20 {
        return Err(DptError::LengthError(format!(
            "sender must be 20 bytes, got {}",
            from.len()
        )));
    }
    if salt.len() != 32 {
        return Err(DptError::LengthError(format!(
            "salt must be 32 bytes, got {}",
            salt.len()
        )));
    }

    let mut preimage = Vec::with_capacity(85);
    preimage.push(0xff);
    preimage.extend_from_slice(from);
    preimage.extend_from_slice(salt);
    preimage.extend_from_slice(keccak256(init_code).as_slice());
    Ok(Address::from_slice(&keccak256(&preimage)[12..]))
}
