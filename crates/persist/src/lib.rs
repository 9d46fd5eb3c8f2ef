//! Frame-buffer persistence.
//!
//! # Invariants
//! - `encode` is a pure function of layout, dimensions and samples.
//! - Every file ends in a SHA-256 of all preceding bytes; `decode` refuses
//!   files whose trailer does not match.
//! - Saves are atomic: the destination holds either the old file or the new one.

pub mod codec;
pub mod store;

pub use codec::{FORMAT_VERSION, MAGIC, PersistError, decode, encode};
pub use store::{read, save};
