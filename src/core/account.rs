use alloy_primitives::{b256, keccak256, Bytes, B256, U256};
use alloy_rlp::{Decodable, Header, RlpEncodable};

use crate::utils::{DptError, Result};

/// Keccak-256 of the RLP encoding of the empty trie, the default
/// `storage_root` of a fresh account.
pub const KECCAK256_RLP: B256 =
    b256!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421");

/// Keccak-256 of the empty byte string, the default `code_hash`.
pub const KECCAK256_NULL: B256 =
    b256!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470");

/// An Ethereum state account.
///
/// RLP-encodes as the canonical four-element list
/// `[nonce, balance, storage_root, code_hash]` with unpadded big-endian
/// numerics. Treated as a value object: construct it, derive from it, but
/// don't mutate it in place.
#[derive(Clone, Debug, PartialEq, Eq, RlpEncodable)]
pub struct Account {
    pub nonce: U256,
    pub balance: U256,
    pub storage_root: B256,
    pub code_hash: B256,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            nonce: U256::ZERO,
            balance: U256::ZERO,
            storage_root: KECCAK256_RLP,
            code_hash: KECCAK256_NULL,
        }
    }
}

impl Account {
    pub fn new(nonce: U256, balance: U256, storage_root: B256, code_hash: B256) -> Self {
        Self {
            nonce,
            balance,
            storage_root,
            code_hash,
        }
    }

    /// Build an account from optional raw byte fields.
    ///
    /// Missing fields take their defaults; numeric fields are decoded as
    /// unpadded big-endian unsigned integers. Root fields must be exactly
    /// 32 bytes.
    pub fn from_raw_parts(
        nonce: Option<&[u8]>,
        balance: Option<&[u8]>,
        storage_root: Option<&[u8]>,
        code_hash: Option<&[u8]>,
    ) -> Result<Self> {
        let nonce = match nonce {
            Some(bytes) => decode_be("nonce", bytes)?,
            None => U256::ZERO,
        };
        let balance = match balance {
            Some(bytes) => decode_be("balance", bytes)?,
            None => U256::ZERO,
        };
        let storage_root = match storage_root {
            Some(bytes) => decode_root("storage_root", bytes)?,
            None => KECCAK256_RLP,
        };
        let code_hash = match code_hash {
            Some(bytes) => decode_root("code_hash", bytes)?,
            None => KECCAK256_NULL,
        };
        Ok(Self {
            nonce,
            balance,
            storage_root,
            code_hash,
        })
    }

    /// Decode an account from its RLP encoding.
    pub fn from_rlp(buf: &[u8]) -> Result<Self> {
        let mut buf = buf;
        let header =
            Header::decode(&mut buf).map_err(|e| DptError::MalformedAccount(e.to_string()))?;
        if !header.list {
            return Err(DptError::MalformedAccount(
                "account RLP must be a list".to_string(),
            ));
        }
        if header.payload_length > buf.len() {
            return Err(DptError::MalformedAccount(
                "account RLP payload truncated".to_string(),
            ));
        }
        let mut body = &buf[..header.payload_length];

        let nonce: Bytes = decode_field(&mut body)?;
        let balance: Bytes = decode_field(&mut body)?;
        let storage_root: Bytes = decode_field(&mut body)?;
        let code_hash: Bytes = decode_field(&mut body)?;
        if !body.is_empty() {
            return Err(DptError::MalformedAccount(
                "account RLP has trailing fields".to_string(),
            ));
        }

        Self::from_raw_parts(
            Some(&nonce),
            Some(&balance),
            Some(&storage_root),
            Some(&code_hash),
        )
    }

    /// Set custom nonce
    pub fn with_nonce(mut self, nonce: U256) -> Self {
        self.nonce = nonce;
        self
    }

    /// Set custom balance
    pub fn with_balance(mut self, balance: U256) -> Self {
        self.balance = balance;
        self
    }

    /// Set custom storage_root
    pub fn with_storage_root(mut self, storage_root: B256) -> Self {
        self.storage_root = storage_root;
        self
    }

    /// Set custom code_hash
    pub fn with_code_hash(mut self, code_hash: B256) -> Self {
        self.code_hash = code_hash;
        self
    }

    /// The raw field list `[nonce, balance, storage_root, code_hash]`,
    /// numerics as unpadded big-endian (zero is the empty byte string).
    pub fn raw(&self) -> [Bytes; 4] {
        [
            Bytes::from(self.nonce.to_be_bytes_trimmed_vec()),
            Bytes::from(self.balance.to_be_bytes_trimmed_vec()),
            Bytes::copy_from_slice(self.storage_root.as_slice()),
            Bytes::copy_from_slice(self.code_hash.as_slice()),
        ]
    }

    /// RLP-encode the account.
    pub fn serialize(&self) -> Vec<u8> {
        alloy_rlp::encode(self)
    }

    /// Keccak-256 of the RLP encoding, the form committed to the state trie.
    pub fn hash(&self) -> B256 {
        keccak256(self.serialize())
    }

    /// An account carries code iff its `code_hash` is not the empty hash.
    pub fn is_contract(&self) -> bool {
        self.code_hash != KECCAK256_NULL
    }

    /// EIP-161 emptiness: zero nonce, zero balance, no code.
    pub fn is_empty(&self) -> bool {
        self.nonce == U256::ZERO && self.balance == U256::ZERO && self.code_hash == KECCAK256_NULL
    }
}

fn decode_field(body: &mut &[u8]) -> Result<Bytes> {
    Bytes::decode(body).map_err(|e| DptError::MalformedAccount(e.to_string()))
}

fn decode_be(field: &str, bytes: &[u8]) -> Result<U256> {
    U256::try_from_be_slice(bytes)
        .ok_or_else(|| DptError::InvalidAccount(format!("{field} exceeds 32 bytes")))
}

fn decode_root(field: &str, bytes: &[u8]) -> Result<B256> {
    if bytes.len() != 32 {
        return Err(DptError::InvalidAccount(format!(
            "{field} must be exactly 32 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(B256::from_slice(bytes))
}

/// Convert a raw account body to its slim wire form: default root fields
/// become the empty byte string.
pub fn account_body_to_slim(body: [Bytes; 4]) -> [Bytes; 4] {
    let [nonce, balance, storage_root, code_hash] = body;
    let storage_root = if storage_root.as_ref() == KECCAK256_RLP.as_slice() {
        Bytes::new()
    } else {
        storage_root
    };
    let code_hash = if code_hash.as_ref() == KECCAK256_NULL.as_slice() {
        Bytes::new()
    } else {
        code_hash
    };
    [nonce, balance, storage_root, code_hash]
}

/// Convert a slim account body back to its full form: empty root fields
/// are restored to their defaults.
pub fn account_body_from_slim(body: [Bytes; 4]) -> [Bytes; 4] {
    let [nonce, balance, storage_root, code_hash] = body;
    let storage_root = if storage_root.is_empty() {
        Bytes::copy_from_slice(KECCAK256_RLP.as_slice())
    } else {
        storage_root
    };
    let code_hash = if code_hash.is_empty() {
        Bytes::copy_from_slice(KECCAK256_NULL.as_slice())
    } else {
        code_hash
    };
    [nonce, balance, storage_root, code_hash]
}
