//! Buffer sizing policy.

use super::constants::{
    DEFAULT_HEADROOM, DEFAULT_PAYLOAD_SIZE, DEFAULT_TAILROOM, MAX_STREAM_PACKET_SIZE,
};

/// Sizing policy shared by the link and the data channel.
///
/// `payload_size` bounds a single packet; headroom and tailroom are extra
/// capacity reserved so encapsulation can grow a buffer without reallocating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    payload_size: usize,
    headroom: usize,
    tailroom: usize,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new(DEFAULT_PAYLOAD_SIZE)
    }
}

impl Frame {
    /// Create a frame policy with the given payload size and default margins.
    ///
    /// The payload size is clamped to what a 16-bit length prefix can carry.
    pub fn new(payload_size: usize) -> Self {
        Self {
            payload_size: payload_size.min(MAX_STREAM_PACKET_SIZE),
            headroom: DEFAULT_HEADROOM,
            tailroom: DEFAULT_TAILROOM,
        }
    }

    /// Set the headroom.
    pub fn with_headroom(mut self, headroom: usize) -> Self {
        self.headroom = headroom;
        self
    }

    /// Set the tailroom.
    pub fn with_tailroom(mut self, tailroom: usize) -> Self {
        self.tailroom = tailroom;
        self
    }

    /// Maximum payload of a single packet.
    pub fn payload_size(&self) -> usize {
        self.payload_size
    }

    /// Reserved bytes in front of the payload.
    pub fn headroom(&self) -> usize {
        self.headroom
    }

    /// Reserved bytes after the payload.
    pub fn tailroom(&self) -> usize {
        self.tailroom
    }

    /// Capacity to allocate for one packet buffer.
    pub fn buffer_capacity(&self) -> usize {
        self.headroom + self.payload_size + self.tailroom
    }

    /// Check whether a packet of `len` bytes may travel on the link.
    pub fn accepts(&self, len: usize) -> bool {
        len > 0 && len <= self.payload_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_frame() {
        let frame = Frame::default();
        assert_eq!(frame.payload_size(), DEFAULT_PAYLOAD_SIZE);
        assert_eq!(
            frame.buffer_capacity(),
            DEFAULT_HEADROOM + DEFAULT_PAYLOAD_SIZE + DEFAULT_TAILROOM
        );
    }

    #[test]
    fn test_payload_clamped_to_length_prefix() {
        let frame = Frame::new(1 << 20);
        assert_eq!(frame.payload_size(), MAX_STREAM_PACKET_SIZE);
    }

    #[test]
    fn test_accepts() {
        let frame = Frame::new(1200).with_headroom(0).with_tailroom(0);
        assert!(!frame.accepts(0));
        assert!(frame.accepts(1));
        assert!(frame.accepts(1200));
        assert!(!frame.accepts(1201));
        assert_eq!(frame.buffer_capacity(), 1200);
    }
}
