//! # Proto
//!
//! RESP (Redis Serialization Protocol) wire layer.
//!
//! ## Modules
//!
//! - [`codec`] - Encoder and incremental decoder
//! - [`error`] - Error taxonomy shared by the whole crate
//! - [`frame`] - Frame types representing RESP data structures

pub mod codec;
/// Error types.
pub mod error;
pub mod frame;
