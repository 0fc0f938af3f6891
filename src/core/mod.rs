//! Ethereum account model and address primitives
//!
//! The consensus-facing data model the DPT consumes for node-identity
//! derivation: RLP-encoded accounts, EIP-55/EIP-1191 address checksums,
//! CREATE/CREATE2 contract addresses and secp256k1 key handling.

pub mod account;
pub mod address;
pub mod keys;

pub use account::{
    account_body_from_slim, account_body_to_slim, Account, KECCAK256_NULL, KECCAK256_RLP,
};
pub use address::{
    generate_address, generate_address2, is_valid_address, is_valid_checksum_address,
    to_checksum_address,
};
pub use keys::{
    import_public, is_valid_private, is_valid_public, private_to_address, private_to_public,
    pub_to_address,
};
