//! Core constants, error types, statistics and frame sizing.

mod constants;
mod error;
mod frame;
mod stats;

pub use constants::*;
pub use error::*;
pub use frame::Frame;
pub use stats::{ErrorKind, SessionStats};
