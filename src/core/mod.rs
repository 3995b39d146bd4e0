//! # Core
//!
//! Connection handling, pooling and the cache client built on top of them.
//!
//! ## Modules
//!
//! - [`connection`] - Single connection with buffered sends and deadlines
//! - [`pool`] - Bounded connection pool and the scoped borrow guard
//! - [`pipeline`] - Send-all, read-last command batches
//! - [`command`] - Command builders and argument flattening
//! - [`reply`] - Reply conversions
//! - [`config`] - Connection and pool settings
//! - [`builder`] - Client builder
//! - [`client`] - The pooled cache client

pub use crate::proto::error::{Error, Result};

/// Client builder configuration.
pub mod builder;
/// The pooled cache client.
pub mod client;
/// Command construction helpers.
pub mod command;
/// Connection and pool settings.
pub mod config;
/// Low-level connection management.
pub mod connection;
pub mod pipeline;
pub mod pool;
pub mod reply;

pub use builder::ClientBuilder;
pub use client::Client;
pub use config::CacheConfig;
pub use pool::{Pool, PoolStats, PooledConnection};
