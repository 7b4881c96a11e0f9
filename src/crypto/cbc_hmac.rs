//! CBC/HMAC data-channel pipeline.
//!
//! Packet layout on the wire:
//!
//! ```text
//! +-----------------+----------+--------------------------------------+
//! | HMAC(iv || ct)  | iv (16)  | ct = CBC(packet_id(4) || payload || pad) |
//! +-----------------+----------+--------------------------------------+
//! ```
//!
//! The tag is verified before anything is decrypted. The packet id sits
//! inside the ciphertext, so the replay window is consulted only after
//! the HMAC and the padding check pass.

use std::sync::Arc;

use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes256, Block};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Sha256, Sha512};

use super::alg::{CbcCipher, DigestAlg};
use super::keys::{DataChannelKeys, KeyMaterial};
use super::replay::ReplayWindow;
use crate::core::{CBC_BLOCK_SIZE, CryptoError, ErrorKind, Frame, PACKET_ID_SIZE, SessionStats};

/// Per-configuration template for CBC/HMAC channels.
#[derive(Debug, Clone)]
pub struct CbcHmacContext {
    cipher: CbcCipher,
    digest: DigestAlg,
    frame: Arc<Frame>,
    stats: Arc<SessionStats>,
}

impl CbcHmacContext {
    pub(crate) fn new(
        cipher: CbcCipher,
        digest: DigestAlg,
        frame: Arc<Frame>,
        stats: Arc<SessionStats>,
    ) -> Self {
        Self {
            cipher,
            digest,
            frame,
            stats,
        }
    }

    /// Block cipher.
    pub fn cipher(&self) -> CbcCipher {
        self.cipher
    }

    /// HMAC digest.
    pub fn digest(&self) -> DigestAlg {
        self.digest
    }

    /// Key a channel.
    pub fn instantiate(&self, keys: &DataChannelKeys) -> Result<CbcHmacChannel, CryptoError> {
        Ok(CbcHmacChannel {
            encrypt: Direction::new(self.cipher, self.digest, &keys.encrypt)?,
            decrypt: Direction::new(self.cipher, self.digest, &keys.decrypt)?,
            tag_size: self.digest.size(),
            frame: Arc::clone(&self.frame),
            stats: Arc::clone(&self.stats),
            last_id: 0,
            replay: ReplayWindow::new(),
        })
    }
}

enum BlockCipher {
    Aes128(Aes128),
    Aes256(Aes256),
}

impl BlockCipher {
    fn new(cipher: CbcCipher, key: &[u8]) -> Result<Self, CryptoError> {
        let invalid = || CryptoError::InvalidKeyLength {
            alg: cbc_name(cipher),
            expected: cipher.key_size(),
            actual: key.len(),
        };
        if key.len() != cipher.key_size() {
            return Err(invalid());
        }
        match cipher {
            CbcCipher::Aes128 => Aes128::new_from_slice(key)
                .map(BlockCipher::Aes128)
                .map_err(|_| invalid()),
            CbcCipher::Aes256 => Aes256::new_from_slice(key)
                .map(BlockCipher::Aes256)
                .map_err(|_| invalid()),
        }
    }

    fn encrypt_block(&self, block: &mut [u8]) {
        let block = Block::from_mut_slice(block);
        match self {
            BlockCipher::Aes128(c) => c.encrypt_block(block),
            BlockCipher::Aes256(c) => c.encrypt_block(block),
        }
    }

    fn decrypt_block(&self, block: &mut [u8]) {
        let block = Block::from_mut_slice(block);
        match self {
            BlockCipher::Aes128(c) => c.decrypt_block(block),
            BlockCipher::Aes256(c) => c.decrypt_block(block),
        }
    }
}

/// Keyed HMAC state, cloned per packet.
#[derive(Clone)]
enum PacketMac {
    Sha256(Hmac<Sha256>),
    Sha512(Hmac<Sha512>),
}

impl PacketMac {
    fn new(digest: DigestAlg, key: &[u8]) -> Result<Self, CryptoError> {
        // HMAC accepts any key length; an empty key is a configuration bug.
        if key.is_empty() {
            return Err(CryptoError::InvalidKeyLength {
                alg: digest.name(),
                expected: digest.size(),
                actual: 0,
            });
        }
        let mac = match digest {
            DigestAlg::Sha256 => <Hmac<Sha256> as Mac>::new_from_slice(key).map(PacketMac::Sha256),
            DigestAlg::Sha512 => <Hmac<Sha512> as Mac>::new_from_slice(key).map(PacketMac::Sha512),
        };
        mac.map_err(|_| CryptoError::InvalidKeyLength {
            alg: digest.name(),
            expected: digest.size(),
            actual: key.len(),
        })
    }

    fn tag(&self, iv: &[u8], ciphertext: &[u8]) -> Vec<u8> {
        match self.clone() {
            PacketMac::Sha256(mut mac) => {
                mac.update(iv);
                mac.update(ciphertext);
                mac.finalize().into_bytes().to_vec()
            }
            PacketMac::Sha512(mut mac) => {
                mac.update(iv);
                mac.update(ciphertext);
                mac.finalize().into_bytes().to_vec()
            }
        }
    }

    /// Constant-time comparison.
    fn verify(&self, iv: &[u8], ciphertext: &[u8], tag: &[u8]) -> bool {
        match self.clone() {
            PacketMac::Sha256(mut mac) => {
                mac.update(iv);
                mac.update(ciphertext);
                mac.verify_slice(tag).is_ok()
            }
            PacketMac::Sha512(mut mac) => {
                mac.update(iv);
                mac.update(ciphertext);
                mac.verify_slice(tag).is_ok()
            }
        }
    }
}

struct Direction {
    cipher: BlockCipher,
    mac: PacketMac,
}

impl Direction {
    fn new(cipher: CbcCipher, digest: DigestAlg, keys: &KeyMaterial) -> Result<Self, CryptoError> {
        Ok(Self {
            cipher: BlockCipher::new(cipher, keys.cipher_key())?,
            mac: PacketMac::new(digest, keys.hmac_key())?,
        })
    }
}

/// A keyed CBC/HMAC channel.
pub struct CbcHmacChannel {
    encrypt: Direction,
    decrypt: Direction,
    tag_size: usize,
    frame: Arc<Frame>,
    stats: Arc<SessionStats>,
    last_id: u32,
    replay: ReplayWindow,
}

impl CbcHmacChannel {
    /// Seal one payload into a packet.
    pub fn encrypt(&mut self, payload: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if payload.len() > self.frame.payload_size() {
            return Err(CryptoError::MalformedPacket("payload larger than frame"));
        }
        let id = self.next_id()?;

        let mut body = Vec::with_capacity(PACKET_ID_SIZE + payload.len() + CBC_BLOCK_SIZE);
        body.extend_from_slice(&id.to_be_bytes());
        body.extend_from_slice(payload);
        let pad = CBC_BLOCK_SIZE - body.len() % CBC_BLOCK_SIZE;
        body.resize(body.len() + pad, pad as u8);

        let mut iv = [0u8; CBC_BLOCK_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);

        let mut chain = iv;
        for block in body.chunks_exact_mut(CBC_BLOCK_SIZE) {
            for (b, c) in block.iter_mut().zip(chain) {
                *b ^= c;
            }
            self.encrypt.cipher.encrypt_block(block);
            chain.copy_from_slice(block);
        }

        let tag = self.encrypt.mac.tag(&iv, &body);
        let mut packet = Vec::with_capacity(tag.len() + iv.len() + body.len());
        packet.extend_from_slice(&tag);
        packet.extend_from_slice(&iv);
        packet.extend_from_slice(&body);
        Ok(packet)
    }

    /// Verify and open one packet.
    pub fn decrypt(&mut self, packet: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let header = self.tag_size + CBC_BLOCK_SIZE;
        if packet.len() < header + CBC_BLOCK_SIZE || (packet.len() - header) % CBC_BLOCK_SIZE != 0 {
            self.stats.error(ErrorKind::DecryptError);
            return Err(CryptoError::MalformedPacket("bad CBC packet length"));
        }

        let (tag, rest) = packet.split_at(self.tag_size);
        let (iv, ciphertext) = rest.split_at(CBC_BLOCK_SIZE);
        if !self.decrypt.mac.verify(iv, ciphertext, tag) {
            self.stats.error(ErrorKind::HmacError);
            return Err(CryptoError::HmacMismatch);
        }

        let mut body = ciphertext.to_vec();
        let mut chain = [0u8; CBC_BLOCK_SIZE];
        chain.copy_from_slice(iv);
        for block in body.chunks_exact_mut(CBC_BLOCK_SIZE) {
            let mut saved = [0u8; CBC_BLOCK_SIZE];
            saved.copy_from_slice(block);
            self.decrypt.cipher.decrypt_block(block);
            for (b, c) in block.iter_mut().zip(chain) {
                *b ^= c;
            }
            chain = saved;
        }

        let body_len = match unpadded_len(&body) {
            Some(len) if len >= PACKET_ID_SIZE => len,
            _ => {
                self.stats.error(ErrorKind::DecryptError);
                return Err(CryptoError::DecryptionFailed);
            }
        };

        let mut id = [0u8; PACKET_ID_SIZE];
        id.copy_from_slice(&body[..PACKET_ID_SIZE]);
        let id = u32::from_be_bytes(id) as u64;
        if let Err(e) = self.replay.accept(id) {
            self.stats.error(ErrorKind::ReplayError);
            return Err(e);
        }

        body.truncate(body_len);
        body.drain(..PACKET_ID_SIZE);
        Ok(body)
    }

    fn next_id(&mut self) -> Result<u32, CryptoError> {
        self.last_id = self
            .last_id
            .checked_add(1)
            .ok_or(CryptoError::CounterExhaustion)?;
        Ok(self.last_id)
    }
}

impl std::fmt::Debug for CbcHmacChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CbcHmacChannel")
            .field("tag_size", &self.tag_size)
            .field("last_id", &self.last_id)
            .finish_non_exhaustive()
    }
}

/// Length of `body` with PKCS#7 padding removed, if the padding is valid.
fn unpadded_len(body: &[u8]) -> Option<usize> {
    let pad = *body.last()? as usize;
    if pad == 0 || pad > CBC_BLOCK_SIZE || pad > body.len() {
        return None;
    }
    let len = body.len() - pad;
    body[len..].iter().all(|&b| b as usize == pad).then_some(len)
}

fn cbc_name(cipher: CbcCipher) -> &'static str {
    match cipher {
        CbcCipher::Aes128 => "AES-128-CBC",
        CbcCipher::Aes256 => "AES-256-CBC",
    }
}
