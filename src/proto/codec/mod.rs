//! RESP encoder and incremental decoder.

mod decoder;
mod encoder;

pub use decoder::Decoder;
pub use encoder::Encoder;
