//! Data-channel cryptography.
//!
//! Two pipeline families carry tunnel payloads:
//! - CBC/HMAC: AES-CBC with a separate HMAC-SHA2 tag over `iv || ct`.
//! - AEAD: AES-GCM or ChaCha20-Poly1305 with an implicit-IV nonce.
//!
//! [`CryptoDcSelect`] maps the negotiated cipher to one of them and rejects
//! anything else as a configuration error.

mod aead;
mod alg;
mod cbc_hmac;
mod keys;
mod replay;
mod select;

pub use aead::{AeadChannel, AeadContext};
pub use alg::{
    AeadCipher, CbcCipher, CipherAlg, CipherMode, DataChannelSettings, DigestAlg,
    UnknownAlgorithm,
};
pub use cbc_hmac::{CbcHmacChannel, CbcHmacContext};
pub use keys::{DataChannelKeys, KeyMaterial};
pub use replay::ReplayWindow;
pub use select::{CryptoDcSelect, DataChannel, DataChannelContext};
