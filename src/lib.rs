//! # kgtab
//!
//! Streaming, schema-aware tabular I/O for large delimited-text
//! knowledge-graph files: transparently decompress inputs of unknown
//! compression format, and write rows back out under a validated,
//! renamable column schema in any of several row-oriented formats,
//! optionally compressing on a background worker.
//!
//! ## Key Features
//!
//! - **Auto-detecting decompression** - gzip, bzip2, xz, and lz4 streams are
//!   classified by trial decoding of their leading bytes; no extension needed
//! - **Loss-free sniffing** - sniffed bytes are spliced back in front of the
//!   stream, so nothing is consumed irrecoverably
//! - **Header capture** - the first line is extracted and the remaining
//!   stream replayed intact to downstream readers
//! - **Background workers** - chunked background reading and background
//!   compression overlap codec CPU with I/O through bounded channels
//! - **Schema-aware writing** - column renaming, shuffle-list row reshaping,
//!   and edge-file/node-file convention checks
//! - **Nine output formats** - kgtk, csv, md, json, json-map,
//!   json-map-compact, jsonl, jsonl-map, jsonl-map-compact
//!
//! ## Quick Start
//!
//! ```no_run
//! use kgtab::{ReaderOptions, ShuffleWriter, TabReader, WriterOptions};
//! # fn main() -> anyhow::Result<()> {
//!
//! // Read a possibly-compressed edge file; compression is sniffed.
//! let mut reader = TabReader::open("edges.tsv.gz", ReaderOptions::default())?;
//!
//! // Write the same rows out under a reordered schema.
//! let columns: Vec<String> = reader.schema().columns().to_vec();
//! let mut writer = ShuffleWriter::open(&columns, "out.tsv.bz2", WriterOptions::default())?;
//! let shuffle = writer.build_shuffle_list(&columns, true)?;
//! for row in reader.by_ref() {
//!     writer.write(&row?, Some(&shuffle))?;
//! }
//! writer.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! Two independent producer/consumer pipelines exist, each optional:
//! background *input* decompression ([`ChunkedBackgroundReader`]) and
//! background *output* compression (enabled through
//! [`WriterOptions::compress_in_background`]). Both move data through
//! bounded channels for backpressure and carry a single, unambiguous
//! end-of-stream marker. Reader and writer instances own their workers
//! exclusively and are not safe for concurrent use from multiple threads.
//!
//! ## Feature Flags
//!
//! - `compression-gzip` - gzip via `flate2`
//! - `compression-bzip2` - bzip2 via `bzip2`
//! - `compression-xz` - xz via `xz2`
//! - `compression-lz4` - lz4 via `lz4`
//!
//! All codec features are enabled by default.
//!
//! ## Module Overview
//!
//! - [`io`] - sniffing, splicing, background reading, decoding
//! - [`schema`] - schema resolution, renaming, edge/node conventions
//! - [`reader`] - row source over a decoded stream
//! - [`writer`] - schema-aware multi-format row writer
//! - [`validation`] - the syntax-validator boundary
//! - [`error`] - the crate error taxonomy

pub mod error;
pub mod io;
pub mod reader;
pub mod schema;
pub mod validation;
pub mod writer;

// General re-exports
pub use error::{KgtabError, Result};
pub use io::background::ChunkedBackgroundReader;
pub use io::decode::{DecodingOptions, DecodingReader};
pub use io::sniff::CompressionKind;
pub use io::splice::SpliceReader;
pub use reader::{ReaderOptions, TabReader};
pub use schema::{HeaderErrorAction, Mode, Schema};
pub use validation::{ColumnCountValidator, ValidationIterator, ValidatorOptions};
pub use writer::{OutputFormat, ShuffleList, ShuffleWriter, WriterOptions};
