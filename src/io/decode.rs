//! Auto-detecting decompression reader with header capture.
//!
//! [`DecodingReader`] composes the format sniffer, the splice reader, the
//! matching decompressor, and optionally a background chunked reader into a
//! single pull-based byte stream. Iteration yields whatever chunk size the
//! underlying layer naturally produces; this is intentionally coarse-grained
//! for throughput, not line-based.

use crate::error::{KgtabError, Result};
use crate::io::background::{ChunkedBackgroundReader, DEFAULT_CHUNK_SIZE, DEFAULT_QUEUE_SIZE};
use crate::io::sniff::{self, CompressionKind};
use crate::io::splice::SpliceReader;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::mem;
use std::path::Path;

/// Maximum number of raw bytes buffered for sniffing. Bounds memory for
/// degenerate inputs; anything read here is spliced back afterwards.
pub const SNIFF_BUFFER_SIZE: usize = 1 << 20;

/// Extensions dispatched directly to plain text without sniffing.
const TEXT_EXTENSIONS: &[&str] = &[".tsv", ".csv"];

/// Construction options for a [`DecodingReader`].
#[derive(Debug, Clone)]
pub struct DecodingOptions {
    /// Run decompression on a background worker.
    pub background: bool,
    /// Chunk size for background reads and for [`DecodingReader::chunks`].
    pub chunk_size: usize,
    /// Bounded channel capacity for the background worker, in chunks.
    pub queue_size: usize,
    /// Maximum sniff-buffer size in bytes.
    pub sniff_size: usize,
}

impl Default for DecodingOptions {
    fn default() -> Self {
        DecodingOptions {
            background: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            queue_size: DEFAULT_QUEUE_SIZE,
            sniff_size: SNIFF_BUFFER_SIZE,
        }
    }
}

/// A byte stream that transparently decompresses its source.
///
/// Opening reads a bounded sniff buffer, classifies it, splices it back in
/// front of the still-open source, and wraps the result in the matching
/// decompressor. A stream that sniffs as compressed but fails to actually
/// decompress surfaces the failure at first real read, not at open time.
///
/// Instances own their worker and channel exclusively and are not safe for
/// concurrent use from multiple threads.
pub struct DecodingReader {
    stream: Box<dyn Read + Send>,
    kind: CompressionKind,
    chunk_size: usize,
}

impl DecodingReader {
    /// Open a reader over `raw`, sniffing its compression format.
    pub fn open<R: Read + Send + 'static>(raw: R, background: bool) -> Result<Self> {
        Self::with_options(
            raw,
            DecodingOptions {
                background,
                ..DecodingOptions::default()
            },
        )
    }

    /// Open a reader over `raw` with explicit options.
    pub fn with_options<R: Read + Send + 'static>(
        mut raw: R,
        options: DecodingOptions,
    ) -> Result<Self> {
        let prefix = read_prefix(&mut raw, options.sniff_size.max(1))?;
        let kind = sniff::sniff(&prefix);
        Self::assemble(Box::new(SpliceReader::new(Cursor::new(prefix), raw)), kind, &options)
    }

    /// Open a file, dispatching by extension to the matching decompressor;
    /// unknown or absent extensions trigger sniffing.
    pub fn open_path(path: impl AsRef<Path>, background: bool) -> Result<Self> {
        Self::open_path_with_options(
            path,
            DecodingOptions {
                background,
                ..DecodingOptions::default()
            },
        )
    }

    /// Open a file with explicit options. See [`DecodingReader::open_path`].
    pub fn open_path_with_options(
        path: impl AsRef<Path>,
        options: DecodingOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let kind = CompressionKind::from_path(path);
        if kind != CompressionKind::None {
            return Self::assemble(Box::new(file), kind, &options);
        }
        let lower = path.to_string_lossy().to_lowercase();
        if TEXT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            return Self::assemble(Box::new(file), CompressionKind::None, &options);
        }
        Self::with_options(file, options)
    }

    fn assemble(
        raw: Box<dyn Read + Send>,
        kind: CompressionKind,
        options: &DecodingOptions,
    ) -> Result<Self> {
        let mut stream = sniff::wrap_reader(kind, raw)
            .map_err(|e| KgtabError::Format(format!("cannot open {} stream: {e}", kind.name())))?;
        if options.background {
            stream = Box::new(ChunkedBackgroundReader::with_sizes(
                stream,
                options.chunk_size,
                options.queue_size,
            ));
        }
        Ok(DecodingReader {
            stream,
            kind,
            chunk_size: options.chunk_size.max(1),
        })
    }

    /// The compression scheme this stream was classified as.
    pub fn kind(&self) -> CompressionKind {
        self.kind
    }

    /// Iterate over decoded chunks, sized by whatever the underlying layer
    /// naturally produces (at most the configured chunk size).
    pub fn chunks(&mut self) -> Chunks<'_> {
        Chunks { reader: self }
    }

    /// Consume the stream just far enough to extract the first line.
    ///
    /// Accumulates chunks until a newline is found, handling headers that
    /// span several chunks; `\n` and `\r\n` both terminate the header. The
    /// returned line has its terminator stripped.
    ///
    /// Bytes read past the header in the same chunk are spliced back in
    /// front of the stream so no data is lost downstream. With
    /// `preserve_header` set, the header line itself (terminator included)
    /// is spliced back too.
    pub fn capture_header(&mut self, preserve_header: bool) -> Result<String> {
        let mut buffer: Vec<u8> = Vec::new();
        let mut newline: Option<usize> = None;
        let mut chunk = vec![0u8; self.chunk_size];
        loop {
            let scan_from = buffer.len();
            let n = match self.stream.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(KgtabError::from_read(e)),
            };
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buffer[scan_from..].iter().position(|&b| b == b'\n') {
                newline = Some(scan_from + pos);
                break;
            }
        }

        let header_end = newline.unwrap_or(buffer.len());
        let mut header = &buffer[..header_end];
        if header.ends_with(b"\r") {
            header = &header[..header.len() - 1];
        }
        let header = std::str::from_utf8(header)
            .map_err(|_| KgtabError::Format("header line is not valid UTF-8".to_string()))?
            .to_string();

        let rest = if preserve_header {
            buffer
        } else {
            match newline {
                Some(pos) => buffer.split_off(pos + 1),
                None => Vec::new(),
            }
        };
        let inner = mem::replace(&mut self.stream, Box::new(io::empty()));
        self.stream = Box::new(SpliceReader::new(Cursor::new(rest), inner));
        Ok(header)
    }
}

impl Read for DecodingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

/// Chunk iterator over a [`DecodingReader`]; see [`DecodingReader::chunks`].
pub struct Chunks<'a> {
    reader: &'a mut DecodingReader,
}

impl Iterator for Chunks<'_> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = vec![0u8; self.reader.chunk_size];
        loop {
            match self.reader.stream.read(&mut buf) {
                Ok(0) => return None,
                Ok(n) => {
                    buf.truncate(n);
                    return Some(Ok(buf));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Read up to `limit` bytes from `raw`, retrying short reads so the sniff
/// buffer is as full as the source allows.
fn read_prefix<R: Read>(raw: &mut R, limit: usize) -> Result<Vec<u8>> {
    let mut prefix = vec![0u8; limit];
    let mut filled = 0;
    while filled < limit {
        match raw.read(&mut prefix[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(KgtabError::Io(e)),
        }
    }
    prefix.truncate(filled);
    Ok(prefix)
}
