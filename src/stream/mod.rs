//! Incremental decoding of streamed completion bodies.
mod decoder;
mod parser;

#[cfg(test)]
mod tests;

pub use decoder::Utf8ChunkDecoder;
pub use parser::{FlushReport, StreamFrameParser, consume};
