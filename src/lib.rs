//! # gmsec
//!
//! `gmsec` is a publish/subscribe messaging API with schema-driven message
//! construction and request/reply correlation. Connections bind to a
//! middleware through the `Transport` trait; the crate ships an in-process
//! bus (loopback) and a WebSocket bus server so the API works without any
//! external middleware.
//!
//! ## Core Modules
//!
//! - `message`: typed fields, message kinds and the XML/JSON forms.
//! - `config`: the key/value option store and the bus server's settings.
//! - `specification`: message schemas and the `MessageFactory` built on them.
//! - `subject`: subject validation and wildcard pattern matching.
//! - `connection`: publish/subscribe, request/reply and message dispatch.
//! - `heartbeat`: a periodic `MSG.HB` publisher.
//! - `resource`: a periodic `MSG.RSRC` publisher of system usage.
//! - `broker`, `client`, `persistence`: the bus behind the loopback and
//!   WebSocket transports, with optional durable storage.
//! - `transport`: the `Transport` seam and its implementations.
//! - `utils`: errors, `Status`, logging and shared helpers.

pub mod broker;
pub mod client;
pub mod config;
pub mod connection;
pub mod heartbeat;
pub mod message;
pub mod persistence;
pub mod resource;
pub mod specification;
pub mod subject;
pub mod transport;
pub mod utils;

pub use broker::Bus;
pub use config::Config;
pub use connection::{Connection, Event, ReplyCallback, SubscriptionInfo};
pub use message::{Message, MessageKind, ResponseStatus};
pub use specification::MessageFactory;
pub use utils::{GmsecError, Result, Status};
