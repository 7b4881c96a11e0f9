//! Cipher and digest algorithm tables.

use std::fmt;
use std::str::FromStr;

/// Block cipher used by the CBC/HMAC family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CbcCipher {
    /// AES-128.
    Aes128,
    /// AES-256.
    Aes256,
}

impl CbcCipher {
    /// Key size in bytes.
    pub fn key_size(self) -> usize {
        match self {
            CbcCipher::Aes128 => 16,
            CbcCipher::Aes256 => 32,
        }
    }
}

/// Construction used by the AEAD family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AeadCipher {
    /// AES-128-GCM.
    Aes128Gcm,
    /// AES-256-GCM.
    Aes256Gcm,
    /// ChaCha20-Poly1305.
    ChaCha20Poly1305,
}

impl AeadCipher {
    /// Key size in bytes.
    pub fn key_size(self) -> usize {
        match self {
            AeadCipher::Aes128Gcm => 16,
            AeadCipher::Aes256Gcm | AeadCipher::ChaCha20Poly1305 => 32,
        }
    }
}

/// Data-channel cipher family of an algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherMode {
    /// Block cipher in CBC mode, authenticated with a separate HMAC.
    CbcHmac(CbcCipher),
    /// Authenticated encryption with associated data.
    Aead(AeadCipher),
    /// Neither family; cannot carry the data channel.
    Unsupported,
}

/// Data-channel cipher algorithms known to the selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherAlg {
    /// AES-128 in CBC mode.
    Aes128Cbc,
    /// AES-256 in CBC mode.
    Aes256Cbc,
    /// AES-128 in GCM mode.
    Aes128Gcm,
    /// AES-256 in GCM mode.
    Aes256Gcm,
    /// ChaCha20-Poly1305.
    ChaCha20Poly1305,
    /// AES-256 in CTR mode (no integrity; rejected by the selector).
    Aes256Ctr,
    /// No encryption (rejected by the selector).
    None,
}

impl CipherAlg {
    /// All known algorithms.
    pub const ALL: [CipherAlg; 7] = [
        CipherAlg::Aes128Cbc,
        CipherAlg::Aes256Cbc,
        CipherAlg::Aes128Gcm,
        CipherAlg::Aes256Gcm,
        CipherAlg::ChaCha20Poly1305,
        CipherAlg::Aes256Ctr,
        CipherAlg::None,
    ];

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            CipherAlg::Aes128Cbc => "AES-128-CBC",
            CipherAlg::Aes256Cbc => "AES-256-CBC",
            CipherAlg::Aes128Gcm => "AES-128-GCM",
            CipherAlg::Aes256Gcm => "AES-256-GCM",
            CipherAlg::ChaCha20Poly1305 => "CHACHA20-POLY1305",
            CipherAlg::Aes256Ctr => "AES-256-CTR",
            CipherAlg::None => "none",
        }
    }

    /// Cipher family.
    pub fn mode(self) -> CipherMode {
        match self {
            CipherAlg::Aes128Cbc => CipherMode::CbcHmac(CbcCipher::Aes128),
            CipherAlg::Aes256Cbc => CipherMode::CbcHmac(CbcCipher::Aes256),
            CipherAlg::Aes128Gcm => CipherMode::Aead(AeadCipher::Aes128Gcm),
            CipherAlg::Aes256Gcm => CipherMode::Aead(AeadCipher::Aes256Gcm),
            CipherAlg::ChaCha20Poly1305 => CipherMode::Aead(AeadCipher::ChaCha20Poly1305),
            CipherAlg::Aes256Ctr | CipherAlg::None => CipherMode::Unsupported,
        }
    }

    /// Key size in bytes; zero for `none`.
    pub fn key_size(self) -> usize {
        match self.mode() {
            CipherMode::CbcHmac(cipher) => cipher.key_size(),
            CipherMode::Aead(cipher) => cipher.key_size(),
            CipherMode::Unsupported => match self {
                CipherAlg::Aes256Ctr => 32,
                _ => 0,
            },
        }
    }
}

impl fmt::Display for CipherAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown algorithm name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown algorithm '{0}'")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for CipherAlg {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CipherAlg::ALL
            .into_iter()
            .find(|alg| alg.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownAlgorithm(s.to_string()))
    }
}

/// HMAC digest for the CBC family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlg {
    /// HMAC-SHA256.
    Sha256,
    /// HMAC-SHA512.
    Sha512,
}

impl DigestAlg {
    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            DigestAlg::Sha256 => "SHA256",
            DigestAlg::Sha512 => "SHA512",
        }
    }

    /// Digest (and HMAC tag) size in bytes.
    pub fn size(self) -> usize {
        match self {
            DigestAlg::Sha256 => 32,
            DigestAlg::Sha512 => 64,
        }
    }
}

impl FromStr for DigestAlg {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [DigestAlg::Sha256, DigestAlg::Sha512]
            .into_iter()
            .find(|alg| alg.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownAlgorithm(s.to_string()))
    }
}

/// Negotiated data-channel settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataChannelSettings {
    /// Cipher algorithm.
    pub cipher: CipherAlg,
    /// HMAC digest; required for the CBC family, ignored for AEAD.
    pub digest: Option<DigestAlg>,
}

impl DataChannelSettings {
    /// Settings for `cipher` with `digest`.
    pub fn new(cipher: CipherAlg, digest: Option<DigestAlg>) -> Self {
        Self { cipher, digest }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("aes-256-gcm".parse::<CipherAlg>().unwrap(), CipherAlg::Aes256Gcm);
        assert_eq!("AES-128-CBC".parse::<CipherAlg>().unwrap(), CipherAlg::Aes128Cbc);
        assert_eq!("none".parse::<CipherAlg>().unwrap(), CipherAlg::None);
        assert_eq!("sha512".parse::<DigestAlg>().unwrap(), DigestAlg::Sha512);
        assert!("BF-CBC".parse::<CipherAlg>().is_err());
    }

    #[test]
    fn test_modes() {
        assert_eq!(CipherAlg::Aes128Cbc.mode(), CipherMode::CbcHmac(CbcCipher::Aes128));
        assert_eq!(
            CipherAlg::ChaCha20Poly1305.mode(),
            CipherMode::Aead(AeadCipher::ChaCha20Poly1305)
        );
        assert_eq!(CipherAlg::Aes256Ctr.mode(), CipherMode::Unsupported);
        assert_eq!(CipherAlg::None.mode(), CipherMode::Unsupported);

        for alg in CipherAlg::ALL {
            if let CipherMode::CbcHmac(_) = alg.mode() {
                assert!(alg.name().ends_with("-CBC"));
            }
        }
    }

    #[test]
    fn test_key_sizes() {
        assert_eq!(CipherAlg::Aes128Gcm.key_size(), 16);
        assert_eq!(CipherAlg::Aes256Cbc.key_size(), 32);
        assert_eq!(CipherAlg::Aes256Ctr.key_size(), 32);
        assert_eq!(CipherAlg::None.key_size(), 0);
    }
}
