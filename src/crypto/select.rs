//! Data-channel crypto selection.
//!
//! Maps negotiated [`DataChannelSettings`] to a pipeline family. Every
//! [`CipherMode`] is handled explicitly; algorithms outside the CBC/HMAC
//! and AEAD families fail here, before any pipeline exists.

use std::sync::Arc;

use tracing::{debug, warn};

use super::aead::{AeadChannel, AeadContext};
use super::alg::{CipherMode, DataChannelSettings};
use super::cbc_hmac::{CbcHmacChannel, CbcHmacContext};
use super::keys::DataChannelKeys;
use crate::core::{CryptoError, DataChannelSelectError, Frame, SessionStats};

/// Factory for data-channel contexts, sharing one frame and stats block.
#[derive(Debug, Clone)]
pub struct CryptoDcSelect {
    frame: Arc<Frame>,
    stats: Arc<SessionStats>,
}

impl CryptoDcSelect {
    /// Create a selector.
    pub fn new(frame: Arc<Frame>, stats: Arc<SessionStats>) -> Self {
        Self { frame, stats }
    }

    /// Pick the pipeline family for `settings`.
    pub fn new_context(
        &self,
        settings: DataChannelSettings,
    ) -> Result<DataChannelContext, DataChannelSelectError> {
        let name = settings.cipher.name();
        match settings.cipher.mode() {
            CipherMode::CbcHmac(cipher) => {
                let digest = settings
                    .digest
                    .ok_or(DataChannelSelectError::MissingDigest { name })?;
                debug!(cipher = name, digest = digest.name(), "selected CBC/HMAC data channel");
                Ok(DataChannelContext::CbcHmac(CbcHmacContext::new(
                    cipher,
                    digest,
                    Arc::clone(&self.frame),
                    Arc::clone(&self.stats),
                )))
            }
            CipherMode::Aead(cipher) => {
                debug!(cipher = name, "selected AEAD data channel");
                Ok(DataChannelContext::Aead(AeadContext::new(
                    cipher,
                    Arc::clone(&self.frame),
                    Arc::clone(&self.stats),
                )))
            }
            CipherMode::Unsupported => {
                warn!(cipher = name, "data channel cipher rejected");
                Err(DataChannelSelectError::UnsupportedCipher { name })
            }
        }
    }
}

/// A selected pipeline family, not yet keyed.
#[derive(Debug, Clone)]
pub enum DataChannelContext {
    /// CBC block cipher plus HMAC.
    CbcHmac(CbcHmacContext),
    /// AEAD construction.
    Aead(AeadContext),
}

impl DataChannelContext {
    /// Key a channel from `keys`.
    pub fn instantiate(&self, keys: &DataChannelKeys) -> Result<DataChannel, CryptoError> {
        match self {
            DataChannelContext::CbcHmac(ctx) => ctx.instantiate(keys).map(DataChannel::CbcHmac),
            DataChannelContext::Aead(ctx) => ctx.instantiate(keys).map(DataChannel::Aead),
        }
    }
}

/// A keyed data channel.
#[derive(Debug)]
pub enum DataChannel {
    /// CBC block cipher plus HMAC.
    CbcHmac(CbcHmacChannel),
    /// AEAD construction.
    Aead(AeadChannel),
}

impl DataChannel {
    /// Seal one payload.
    pub fn encrypt(&mut self, payload: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self {
            DataChannel::CbcHmac(ch) => ch.encrypt(payload),
            DataChannel::Aead(ch) => ch.encrypt(payload),
        }
    }

    /// Verify and open one packet.
    pub fn decrypt(&mut self, packet: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self {
            DataChannel::CbcHmac(ch) => ch.decrypt(packet),
            DataChannel::Aead(ch) => ch.decrypt(packet),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{CipherAlg, DigestAlg, KeyMaterial};

    fn selector() -> CryptoDcSelect {
        CryptoDcSelect::new(Arc::new(Frame::default()), Arc::new(SessionStats::new()))
    }

    #[test]
    fn test_families() {
        let select = selector();
        let cbc = select
            .new_context(DataChannelSettings::new(
                CipherAlg::Aes256Cbc,
                Some(DigestAlg::Sha256),
            ))
            .unwrap();
        assert!(matches!(cbc, DataChannelContext::CbcHmac(_)));

        // AEAD ignores the digest.
        let gcm = select
            .new_context(DataChannelSettings::new(
                CipherAlg::Aes128Gcm,
                Some(DigestAlg::Sha512),
            ))
            .unwrap();
        assert!(matches!(gcm, DataChannelContext::Aead(_)));
    }

    #[test]
    fn test_unsupported_is_config_error() {
        let select = selector();
        for cipher in [CipherAlg::Aes256Ctr, CipherAlg::None] {
            let err = select
                .new_context(DataChannelSettings::new(cipher, Some(DigestAlg::Sha256)))
                .unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("{}: only CBC/HMAC and AEAD cipher modes supported", cipher.name())
            );
        }
    }

    #[test]
    fn test_cbc_needs_digest() {
        let err = selector()
            .new_context(DataChannelSettings::new(CipherAlg::Aes128Cbc, None))
            .unwrap_err();
        assert_eq!(err, DataChannelSelectError::MissingDigest { name: "AES-128-CBC" });
    }

    #[test]
    fn test_every_supported_alg_roundtrips() {
        let select = selector();
        for cipher in CipherAlg::ALL {
            let Ok(ctx) = select.new_context(DataChannelSettings::new(cipher, Some(DigestAlg::Sha256)))
            else {
                assert_eq!(cipher.mode(), CipherMode::Unsupported);
                continue;
            };
            let keys = DataChannelKeys::new(
                KeyMaterial::new(vec![7; cipher.key_size()], vec![8; 32]),
                KeyMaterial::new(vec![9; cipher.key_size()], vec![10; 32]),
            );
            let mut tx = ctx.instantiate(&keys).unwrap();
            let mut rx = ctx.instantiate(&keys.swapped()).unwrap();
            let packet = tx.encrypt(b"ping").unwrap();
            assert_eq!(rx.decrypt(&packet).unwrap(), b"ping", "{cipher}");
        }
    }
}
