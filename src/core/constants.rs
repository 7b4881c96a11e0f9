//! Transport and data-channel constants.
//!
//! Wire-level values are fixed by the protocol and MUST NOT be changed.
//! The `DEFAULT_*` values are configuration defaults.

// =============================================================================
// CLIENT CONFIG DEFAULTS
// =============================================================================

/// Maximum number of packets queued on a link before sends are rejected.
pub const DEFAULT_SEND_QUEUE_MAX_SIZE: usize = 64;

/// Maximum number of recycled buffers a link keeps on its free list.
pub const DEFAULT_FREE_LIST_MAX_SIZE: usize = 8;

/// Default maximum payload carried by one framed packet.
pub const DEFAULT_PAYLOAD_SIZE: usize = 2048;

/// Default headroom reserved in front of a payload buffer.
pub const DEFAULT_HEADROOM: usize = 64;

/// Default tailroom reserved after a payload buffer.
pub const DEFAULT_TAILROOM: usize = 64;

// =============================================================================
// STREAM FRAMING
// =============================================================================

/// Size of the big-endian length prefix in front of each packet on a stream.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Largest packet a 16-bit length prefix can describe.
pub const MAX_STREAM_PACKET_SIZE: usize = u16::MAX as usize;

// =============================================================================
// PROTOCOL LABELS
// =============================================================================

/// Stream protocol label; qualified with the address family when reported.
pub const STREAM_PROTOCOL: &str = "TCP";

// =============================================================================
// DATA CHANNEL
// =============================================================================

/// Size of the packet id carried by every data-channel packet.
pub const PACKET_ID_SIZE: usize = 4;

/// AES block size (and CBC IV size).
pub const CBC_BLOCK_SIZE: usize = 16;

/// AEAD authentication tag size (GCM and Poly1305).
pub const AEAD_TAG_SIZE: usize = 16;

/// AEAD nonce size (96-bit).
pub const AEAD_NONCE_SIZE: usize = 12;

/// Bytes of the AEAD nonce taken from key material (the rest is the packet id).
pub const AEAD_IMPLICIT_IV_SIZE: usize = AEAD_NONCE_SIZE - PACKET_ID_SIZE;

// =============================================================================
// ANTI-REPLAY
// =============================================================================

/// Replay window size in bits.
pub const REPLAY_WINDOW_SIZE: usize = 2048;
