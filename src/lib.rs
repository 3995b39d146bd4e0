//! # Dataplane
//!
//! Pooled cache client for Redis-compatible servers, with pipelined batch
//! execution, plus thin wrappers for publishing to a message broker and
//! invoking remote services.
//!
//! ## Modules
//!
//! - [`core`] - Connections, the pool and the cache [`Client`]
//! - [`proto`] - RESP frames, codec and the error type
//! - [`capability`] - [`Cache`], [`Publisher`] and [`ServiceInvoker`] traits
//! - [`payload`] - Bytes, text or structured data for any of the above
//! - [`mq`] - [`Producer`](mq::Producer) over a broker transport
//! - [`rpc`] - [`Invoker`](rpc::Invoker) over a service transport
//!
//! ## Features
//!
//! - `test-utils` - In-process mock server in [`testing`]
//!
//! ## Example
//!
//! ```no_run
//! use dataplane::{Cache, ClientBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClientBuilder::new()
//!         .address("redis://localhost:6379")
//!         .max_active(32)
//!         .build()?;
//!     client.set("visits", &0).await?;
//!     let visits = client.incr("visits").await?;
//!     assert_eq!(visits, 1);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod capability;
pub mod core;
pub mod mq;
pub mod payload;
pub mod proto;
pub mod rpc;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use crate::capability::{Cache, Publisher, ServiceInvoker};
pub use crate::core::command::{Cmd, Json, ToArgs};
pub use crate::core::pool::{Pool, PoolStats, PooledConnection};
pub use crate::core::{CacheConfig, Client, ClientBuilder};
pub use crate::payload::Payload;
pub use crate::proto::error::{BoxError, Error, Result};
pub use crate::proto::frame::Frame;
