//! The `persistence` module stores durable envelopes so that a durable
//! subscription made later can replay them.
//!
//! It uses `sled` as an embedded key-value store, with one tree per subject.

pub mod sled_store;

pub use sled_store::Persistence;

#[cfg(test)]
mod tests;
