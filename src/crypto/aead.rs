//! AEAD data-channel pipeline.
//!
//! Packet layout: `packet_id (4, BE) | ciphertext || tag (16)`.
//!
//! The 12-byte nonce is the packet id followed by the 8-byte implicit IV
//! carried in the HMAC slot of the key material. The packet id doubles as
//! the associated data, so it is authenticated without being encrypted.

use std::sync::Arc;

use aes_gcm::{Aes128Gcm, Aes256Gcm};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};

use super::alg::AeadCipher;
use super::keys::{DataChannelKeys, KeyMaterial};
use super::replay::ReplayWindow;
use crate::core::{
    AEAD_IMPLICIT_IV_SIZE, AEAD_NONCE_SIZE, AEAD_TAG_SIZE, CryptoError, ErrorKind, Frame,
    PACKET_ID_SIZE, SessionStats,
};

/// Per-configuration template for AEAD channels.
#[derive(Debug, Clone)]
pub struct AeadContext {
    cipher: AeadCipher,
    frame: Arc<Frame>,
    stats: Arc<SessionStats>,
}

impl AeadContext {
    pub(crate) fn new(cipher: AeadCipher, frame: Arc<Frame>, stats: Arc<SessionStats>) -> Self {
        Self {
            cipher,
            frame,
            stats,
        }
    }

    /// AEAD construction.
    pub fn cipher(&self) -> AeadCipher {
        self.cipher
    }

    /// Key a channel.
    pub fn instantiate(&self, keys: &DataChannelKeys) -> Result<AeadChannel, CryptoError> {
        Ok(AeadChannel {
            encrypt: Direction::new(self.cipher, &keys.encrypt)?,
            decrypt: Direction::new(self.cipher, &keys.decrypt)?,
            frame: Arc::clone(&self.frame),
            stats: Arc::clone(&self.stats),
            last_id: 0,
            replay: ReplayWindow::new(),
        })
    }
}

enum Sealer {
    Aes128Gcm(Box<Aes128Gcm>),
    Aes256Gcm(Box<Aes256Gcm>),
    ChaCha20Poly1305(ChaCha20Poly1305),
}

impl Sealer {
    fn new(cipher: AeadCipher, key: &[u8]) -> Result<Self, CryptoError> {
        let invalid = || CryptoError::InvalidKeyLength {
            alg: aead_name(cipher),
            expected: cipher.key_size(),
            actual: key.len(),
        };
        if key.len() != cipher.key_size() {
            return Err(invalid());
        }
        match cipher {
            AeadCipher::Aes128Gcm => Aes128Gcm::new_from_slice(key)
                .map(|c| Sealer::Aes128Gcm(Box::new(c)))
                .map_err(|_| invalid()),
            AeadCipher::Aes256Gcm => Aes256Gcm::new_from_slice(key)
                .map(|c| Sealer::Aes256Gcm(Box::new(c)))
                .map_err(|_| invalid()),
            AeadCipher::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(key)
                .map(Sealer::ChaCha20Poly1305)
                .map_err(|_| invalid()),
        }
    }

    fn seal(&self, nonce: &Nonce, payload: Payload<'_, '_>) -> Result<Vec<u8>, CryptoError> {
        match self {
            Sealer::Aes128Gcm(c) => c.encrypt(nonce, payload),
            Sealer::Aes256Gcm(c) => c.encrypt(nonce, payload),
            Sealer::ChaCha20Poly1305(c) => c.encrypt(nonce, payload),
        }
        .map_err(|_| CryptoError::EncryptionFailed)
    }

    fn open(&self, nonce: &Nonce, payload: Payload<'_, '_>) -> Result<Vec<u8>, CryptoError> {
        match self {
            Sealer::Aes128Gcm(c) => c.decrypt(nonce, payload),
            Sealer::Aes256Gcm(c) => c.decrypt(nonce, payload),
            Sealer::ChaCha20Poly1305(c) => c.decrypt(nonce, payload),
        }
        .map_err(|_| CryptoError::DecryptionFailed)
    }
}

struct Direction {
    sealer: Sealer,
    implicit_iv: [u8; AEAD_IMPLICIT_IV_SIZE],
}

impl Direction {
    fn new(cipher: AeadCipher, keys: &KeyMaterial) -> Result<Self, CryptoError> {
        let slot = keys.hmac_key();
        if slot.len() < AEAD_IMPLICIT_IV_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                alg: "implicit IV",
                expected: AEAD_IMPLICIT_IV_SIZE,
                actual: slot.len(),
            });
        }
        let mut implicit_iv = [0u8; AEAD_IMPLICIT_IV_SIZE];
        implicit_iv.copy_from_slice(&slot[..AEAD_IMPLICIT_IV_SIZE]);
        Ok(Self {
            sealer: Sealer::new(cipher, keys.cipher_key())?,
            implicit_iv,
        })
    }

    fn nonce(&self, id: &[u8; PACKET_ID_SIZE]) -> [u8; AEAD_NONCE_SIZE] {
        let mut nonce = [0u8; AEAD_NONCE_SIZE];
        nonce[..PACKET_ID_SIZE].copy_from_slice(id);
        nonce[PACKET_ID_SIZE..].copy_from_slice(&self.implicit_iv);
        nonce
    }
}

/// A keyed AEAD channel.
pub struct AeadChannel {
    encrypt: Direction,
    decrypt: Direction,
    frame: Arc<Frame>,
    stats: Arc<SessionStats>,
    last_id: u32,
    replay: ReplayWindow,
}

impl AeadChannel {
    /// Seal one payload into a packet.
    pub fn encrypt(&mut self, payload: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if payload.len() > self.frame.payload_size() {
            return Err(CryptoError::MalformedPacket("payload larger than frame"));
        }
        self.last_id = self
            .last_id
            .checked_add(1)
            .ok_or(CryptoError::CounterExhaustion)?;
        let id = self.last_id.to_be_bytes();

        let nonce = self.encrypt.nonce(&id);
        let sealed = self.encrypt.sealer.seal(
            Nonce::from_slice(&nonce),
            Payload {
                msg: payload,
                aad: &id,
            },
        )?;

        let mut packet = Vec::with_capacity(PACKET_ID_SIZE + sealed.len());
        packet.extend_from_slice(&id);
        packet.extend_from_slice(&sealed);
        Ok(packet)
    }

    /// Verify and open one packet.
    pub fn decrypt(&mut self, packet: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if packet.len() < PACKET_ID_SIZE + AEAD_TAG_SIZE {
            self.stats.error(ErrorKind::DecryptError);
            return Err(CryptoError::MalformedPacket("AEAD packet too short"));
        }
        let (id, sealed) = packet.split_at(PACKET_ID_SIZE);
        let mut id_bytes = [0u8; PACKET_ID_SIZE];
        id_bytes.copy_from_slice(id);
        let id = u32::from_be_bytes(id_bytes) as u64;

        // Cheap rejection before the tag is checked.
        if let Err(e) = self.replay.check(id) {
            self.stats.error(ErrorKind::ReplayError);
            return Err(e);
        }

        let nonce = self.decrypt.nonce(&id_bytes);
        let payload = self
            .decrypt
            .sealer
            .open(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: sealed,
                    aad: &id_bytes,
                },
            )
            .inspect_err(|_| self.stats.error(ErrorKind::DecryptError))?;

        self.replay.accept(id)?;
        Ok(payload)
    }
}

impl std::fmt::Debug for AeadChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AeadChannel")
            .field("last_id", &self.last_id)
            .finish_non_exhaustive()
    }
}

fn aead_name(cipher: AeadCipher) -> &'static str {
    match cipher {
        AeadCipher::Aes128Gcm => "AES-128-GCM",
        AeadCipher::Aes256Gcm => "AES-256-GCM",
        AeadCipher::ChaCha20Poly1305 => "CHACHA20-POLY1305",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(cipher: AeadCipher) -> (AeadChannel, AeadChannel, Arc<SessionStats>) {
        let stats = Arc::new(SessionStats::new());
        let ctx = AeadContext::new(cipher, Arc::new(Frame::default()), Arc::clone(&stats));
        let keys = DataChannelKeys::new(
            KeyMaterial::new(vec![0x42; cipher.key_size()], vec![0x01; 8]),
            KeyMaterial::new(vec![0x24; cipher.key_size()], vec![0x02; 8]),
        );
        let ours = ctx.instantiate(&keys).unwrap();
        let theirs = ctx.instantiate(&keys.swapped()).unwrap();
        (ours, theirs, stats)
    }

    #[test]
    fn test_roundtrip_all_ciphers() {
        for cipher in [
            AeadCipher::Aes128Gcm,
            AeadCipher::Aes256Gcm,
            AeadCipher::ChaCha20Poly1305,
        ] {
            let (mut tx, mut rx, _) = pair(cipher);
            let packet = tx.encrypt(b"tunnel payload").unwrap();
            assert_eq!(packet.len(), PACKET_ID_SIZE + 14 + AEAD_TAG_SIZE);
            assert_eq!(&packet[..PACKET_ID_SIZE], &[0, 0, 0, 1]);
            assert_eq!(rx.decrypt(&packet).unwrap(), b"tunnel payload");
        }
    }

    #[test]
    fn test_packet_ids_increase() {
        let (mut tx, _, _) = pair(AeadCipher::Aes256Gcm);
        let first = tx.encrypt(b"a").unwrap();
        let second = tx.encrypt(b"a").unwrap();
        assert_eq!(hex::encode(&first[..4]), "00000001");
        assert_eq!(hex::encode(&second[..4]), "00000002");
        assert_ne!(first[4..], second[4..]);
    }

    #[test]
    fn test_tampered_id_fails_auth() {
        let (mut tx, mut rx, stats) = pair(AeadCipher::ChaCha20Poly1305);
        let mut packet = tx.encrypt(b"data").unwrap();
        packet[3] = 9;
        assert_eq!(rx.decrypt(&packet), Err(CryptoError::DecryptionFailed));
        assert_eq!(stats.error_count(ErrorKind::DecryptError), 1);

        // A forged id must not advance the window.
        packet[3] = 1;
        assert!(rx.decrypt(&packet).is_ok());
    }

    #[test]
    fn test_replay_rejected_before_open() {
        let (mut tx, mut rx, stats) = pair(AeadCipher::Aes128Gcm);
        let packet = tx.encrypt(b"once").unwrap();
        assert!(rx.decrypt(&packet).is_ok());
        assert_eq!(rx.decrypt(&packet), Err(CryptoError::ReplayDetected));
        assert_eq!(stats.error_count(ErrorKind::ReplayError), 1);
        assert_eq!(stats.error_count(ErrorKind::DecryptError), 0);
    }

    #[test]
    fn test_short_implicit_iv() {
        let ctx = AeadContext::new(
            AeadCipher::Aes128Gcm,
            Arc::new(Frame::default()),
            Arc::new(SessionStats::new()),
        );
        let keys = DataChannelKeys::new(
            KeyMaterial::new(vec![0; 16], vec![0; 4]),
            KeyMaterial::new(vec![0; 16], vec![0; 8]),
        );
        assert!(matches!(
            ctx.instantiate(&keys),
            Err(CryptoError::InvalidKeyLength { expected: 8, actual: 4, .. })
        ));
    }

    #[test]
    fn test_oversized_payload() {
        let (mut tx, _, _) = pair(AeadCipher::Aes128Gcm);
        let payload = vec![0u8; Frame::default().payload_size() + 1];
        assert!(matches!(
            tx.encrypt(&payload),
            Err(CryptoError::MalformedPacket(_))
        ));
    }
}
