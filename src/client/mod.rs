//! Transport client: the per-attempt lifecycle state machine, its config
//! and factory, and the parent interface it reports to.

#[allow(clippy::module_inception)]
mod client;
mod config;
mod parent;

pub use client::*;
pub use config::*;
pub use parent::*;
