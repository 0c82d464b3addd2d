//! The `client` module defines the broker's view of a connected bus client:
//! an identifier and the channel envelopes are pushed into.

pub mod pubsub_client;
pub use pubsub_client::Client;

#[cfg(test)]
mod tests;
