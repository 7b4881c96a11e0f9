//! Error types for the tunnel transport.

use thiserror::Error;

/// Terminal errors for one connection attempt, delivered to the parent.
///
/// Both variants are reported only after the client has fully torn itself
/// down, so a parent handling one never observes a half-stopped client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Name resolution for the server failed.
    #[error("DNS resolve error on '{host}' (port {port}) for TCP session: {message}")]
    Resolve {
        /// Configured server host.
        host: String,
        /// Configured server port.
        port: String,
        /// Underlying resolver error text.
        message: String,
    },

    /// The link failed after it was started.
    #[error("Transport error on '{host}': {message}")]
    Link {
        /// Configured server host.
        host: String,
        /// Diagnostic text reported by the link.
        message: String,
    },
}

impl TransportError {
    /// Check if this error came from the resolver.
    pub fn is_resolve_error(&self) -> bool {
        matches!(self, TransportError::Resolve { .. })
    }

    /// The server host the failed attempt was targeting.
    pub fn host(&self) -> &str {
        match self {
            TransportError::Resolve { host, .. } | TransportError::Link { host, .. } => host,
        }
    }
}

/// Errors raised while building a client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field was empty.
    #[error("missing {0}")]
    Missing(&'static str),

    /// A field was present but out of range.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The configuration file could not be parsed.
    #[cfg(feature = "config-file")]
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Data-channel runtime errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Encryption failed.
    #[error("encryption failed")]
    EncryptionFailed,

    /// AEAD decryption failed (invalid tag or corrupted).
    #[error("decryption failed (invalid tag or corrupted)")]
    DecryptionFailed,

    /// HMAC verification failed.
    #[error("HMAC verification failed")]
    HmacMismatch,

    /// Packet is too short or badly padded.
    #[error("malformed packet: {0}")]
    MalformedPacket(&'static str),

    /// Replay detected.
    #[error("replay detected")]
    ReplayDetected,

    /// Packet id space exhausted; the key must be replaced.
    #[error("packet id exhausted - key must be renegotiated")]
    CounterExhaustion,

    /// Key material has the wrong size for the algorithm.
    #[error("invalid key length for {alg}: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Algorithm name.
        alg: &'static str,
        /// Expected length in bytes.
        expected: usize,
        /// Supplied length in bytes.
        actual: usize,
    },
}

/// Configuration-time failure of the data-channel selector.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataChannelSelectError {
    /// The cipher belongs to neither the CBC/HMAC nor the AEAD family.
    #[error("{name}: only CBC/HMAC and AEAD cipher modes supported")]
    UnsupportedCipher {
        /// Cipher name as configured.
        name: &'static str,
    },

    /// A CBC cipher was configured without an HMAC digest.
    #[error("{name}: CBC cipher requires an HMAC digest")]
    MissingDigest {
        /// Cipher name as configured.
        name: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_error_message() {
        let err = TransportError::Resolve {
            host: "vpn.example.com".into(),
            port: "1194".into(),
            message: "no such host".into(),
        };
        assert!(err.is_resolve_error());
        assert_eq!(err.host(), "vpn.example.com");
        let text = err.to_string();
        assert!(text.contains("vpn.example.com"));
        assert!(text.contains("1194"));
        assert!(text.contains("no such host"));
    }

    #[test]
    fn test_link_error_message() {
        let err = TransportError::Link {
            host: "vpn.example.com".into(),
            message: "connection reset".into(),
        };
        assert!(!err.is_resolve_error());
        assert_eq!(
            err.to_string(),
            "Transport error on 'vpn.example.com': connection reset"
        );
    }

    #[test]
    fn test_unsupported_cipher_message() {
        let err = DataChannelSelectError::UnsupportedCipher { name: "AES-256-CTR" };
        assert_eq!(
            err.to_string(),
            "AES-256-CTR: only CBC/HMAC and AEAD cipher modes supported"
        );
    }
}
