//! Data-channel key material.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Cipher and HMAC keys for one direction.
///
/// For AEAD ciphers the HMAC slot carries the implicit IV instead.
/// Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    cipher_key: Vec<u8>,
    hmac_key: Vec<u8>,
}

impl KeyMaterial {
    /// Create key material from raw bytes.
    pub fn new(cipher_key: impl Into<Vec<u8>>, hmac_key: impl Into<Vec<u8>>) -> Self {
        Self {
            cipher_key: cipher_key.into(),
            hmac_key: hmac_key.into(),
        }
    }

    /// Cipher key bytes.
    ///
    /// # Security
    /// Handle with care - this exposes sensitive key material.
    pub fn cipher_key(&self) -> &[u8] {
        &self.cipher_key
    }

    /// HMAC key (or implicit IV) bytes.
    pub fn hmac_key(&self) -> &[u8] {
        &self.hmac_key
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("cipher_key_len", &self.cipher_key.len())
            .field("hmac_key_len", &self.hmac_key.len())
            .finish()
    }
}

/// Keys for both directions of a data channel.
#[derive(Debug, Clone)]
pub struct DataChannelKeys {
    /// Keys protecting packets we send.
    pub encrypt: KeyMaterial,
    /// Keys verifying packets we receive.
    pub decrypt: KeyMaterial,
}

impl DataChannelKeys {
    /// Pair up send and receive keys.
    pub fn new(encrypt: KeyMaterial, decrypt: KeyMaterial) -> Self {
        Self { encrypt, decrypt }
    }

    /// The peer's view of these keys (directions swapped).
    pub fn swapped(&self) -> Self {
        Self {
            encrypt: self.decrypt.clone(),
            decrypt: self.encrypt.clone(),
        }
    }
}
