//! Streaming input: format sniffing, splicing, background chunked reading,
//! and the composed auto-detecting decompression reader.

pub mod background;
pub mod decode;
pub mod sniff;
pub mod splice;

pub use background::ChunkedBackgroundReader;
pub use decode::{DecodingOptions, DecodingReader};
pub use sniff::CompressionKind;
pub use splice::SpliceReader;
