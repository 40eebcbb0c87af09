//! Compression-format sniffing and codec construction.
//!
//! Classification is heuristic rather than a strict magic-number check: each
//! candidate decoder is constructed over a prefix of the stream and accepted
//! if it can decode without error. This tolerates truncated or empty inputs
//! by falling back to plain text.
//!
//! ## Built-in Codecs
//!
//! When enabled via feature flags, the following codecs are available:
//! - **Gzip** (`.gz`, `.gzip`) - via `flate2` crate (feature: `compression-gzip`)
//! - **Bzip2** (`.bz2`, `.bzip2`) - via `bzip2` crate (feature: `compression-bzip2`)
//! - **Xz** (`.xz`, `.lzma`) - via `xz2` crate (feature: `compression-xz`)
//! - **Lz4** (`.lz4`) - via `lz4` crate (feature: `compression-lz4`)

use std::io::{Cursor, Read, Write};
use std::path::Path;

/// Compression scheme attached to a stream after sniffing or extension
/// dispatch. Immutable once classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionKind {
    /// Plain text, no decompression needed.
    #[default]
    None,
    /// Gzip / zlib deflate framing.
    Gzip,
    /// Bzip2 block compression.
    Bzip2,
    /// Xz / LZMA container.
    Xz,
    /// LZ4 frame format.
    Lz4,
}

impl CompressionKind {
    /// Human-readable codec name.
    pub fn name(&self) -> &'static str {
        match self {
            CompressionKind::None => "text",
            CompressionKind::Gzip => "gzip",
            CompressionKind::Bzip2 => "bzip2",
            CompressionKind::Xz => "xz",
            CompressionKind::Lz4 => "lz4",
        }
    }

    /// File extensions associated with this codec, leading dot included.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            CompressionKind::None => &[],
            CompressionKind::Gzip => &[".gz", ".gzip"],
            CompressionKind::Bzip2 => &[".bz2", ".bzip2"],
            CompressionKind::Xz => &[".xz", ".lzma"],
            CompressionKind::Lz4 => &[".lz4"],
        }
    }

    /// Detect the compression kind from a file path extension.
    ///
    /// Matching is case-insensitive. Paths without a recognized compression
    /// suffix map to [`CompressionKind::None`]; callers that want
    /// content-based detection should sniff instead.
    pub fn from_path(path: impl AsRef<Path>) -> CompressionKind {
        let path_str = path.as_ref().to_string_lossy().to_lowercase();
        for kind in [
            CompressionKind::Gzip,
            CompressionKind::Bzip2,
            CompressionKind::Xz,
            CompressionKind::Lz4,
        ] {
            for ext in kind.extensions() {
                if path_str.ends_with(ext) {
                    return kind;
                }
            }
        }
        CompressionKind::None
    }
}

/// Classify the compression scheme of a stream from its leading bytes.
///
/// Candidate decoders are tried in a fixed priority order (gzip, bzip2, xz,
/// lz4); the first one that decodes the prefix without error wins. An empty
/// or undecodable prefix classifies as [`CompressionKind::None`].
///
/// Sniffing never consumes the source: callers hand in a prefix they have
/// already buffered and splice it back in front of the stream afterwards.
pub fn sniff(prefix: &[u8]) -> CompressionKind {
    if prefix.is_empty() {
        return CompressionKind::None;
    }

    #[cfg(feature = "compression-gzip")]
    {
        let mut decoder = flate2::read::GzDecoder::new(Cursor::new(prefix));
        if decoder.read(&mut [0u8; 1]).is_ok() {
            return CompressionKind::Gzip;
        }
    }
    #[cfg(feature = "compression-bzip2")]
    {
        let mut decoder = bzip2::read::BzDecoder::new(Cursor::new(prefix));
        if decoder.read(&mut [0u8; 1]).is_ok() {
            return CompressionKind::Bzip2;
        }
    }
    #[cfg(feature = "compression-xz")]
    {
        let mut decoder = xz2::read::XzDecoder::new(Cursor::new(prefix));
        if decoder.read(&mut [0u8; 1]).is_ok() {
            return CompressionKind::Xz;
        }
    }
    #[cfg(feature = "compression-lz4")]
    {
        let attempt = lz4::Decoder::new(Cursor::new(prefix))
            .and_then(|mut decoder| decoder.read(&mut [0u8; 1]));
        if attempt.is_ok() {
            return CompressionKind::Lz4;
        }
    }

    let _ = prefix;
    CompressionKind::None
}

/// Wrap a reader with the decompressor matching `kind`.
///
/// Takes ownership of the input reader and returns a boxed trait object that
/// transparently decompresses the stream. Fails if the codec's feature is
/// not enabled in this build.
pub fn wrap_reader(
    kind: CompressionKind,
    reader: Box<dyn Read + Send>,
) -> std::io::Result<Box<dyn Read + Send>> {
    match kind {
        CompressionKind::None => Ok(reader),
        #[cfg(feature = "compression-gzip")]
        CompressionKind::Gzip => Ok(Box::new(flate2::read::GzDecoder::new(reader))),
        #[cfg(feature = "compression-bzip2")]
        CompressionKind::Bzip2 => Ok(Box::new(bzip2::read::BzDecoder::new(reader))),
        #[cfg(feature = "compression-xz")]
        CompressionKind::Xz => Ok(Box::new(xz2::read::XzDecoder::new(reader))),
        #[cfg(feature = "compression-lz4")]
        CompressionKind::Lz4 => Ok(Box::new(lz4::Decoder::new(reader)?)),
        #[allow(unreachable_patterns)]
        other => Err(codec_disabled(other)),
    }
}

/// Wrap a writer with the compressor matching `kind`.
///
/// Returned writers finish their compressed trailer when dropped, matching
/// the behavior of the underlying codec crates.
pub fn wrap_writer(
    kind: CompressionKind,
    writer: Box<dyn Write + Send>,
) -> std::io::Result<Box<dyn Write + Send>> {
    match kind {
        CompressionKind::None => Ok(writer),
        #[cfg(feature = "compression-gzip")]
        CompressionKind::Gzip => Ok(Box::new(flate2::write::GzEncoder::new(
            writer,
            flate2::Compression::default(),
        ))),
        #[cfg(feature = "compression-bzip2")]
        CompressionKind::Bzip2 => Ok(Box::new(bzip2::write::BzEncoder::new(
            writer,
            bzip2::Compression::default(),
        ))),
        #[cfg(feature = "compression-xz")]
        CompressionKind::Xz => Ok(Box::new(xz2::write::XzEncoder::new(writer, 6))),
        #[cfg(feature = "compression-lz4")]
        CompressionKind::Lz4 => {
            let encoder = lz4::EncoderBuilder::new().build(writer)?;
            Ok(Box::new(Lz4AutoFinish(Some(encoder))))
        }
        #[allow(unreachable_patterns)]
        other => Err(codec_disabled(other)),
    }
}

fn codec_disabled(kind: CompressionKind) -> std::io::Error {
    std::io::Error::other(format!(
        "{} support is not enabled in this build",
        kind.name()
    ))
}

/// The `lz4` encoder requires an explicit `finish` to write the frame end
/// mark; this wrapper finishes on drop so it composes with boxed writers.
#[cfg(feature = "compression-lz4")]
struct Lz4AutoFinish(Option<lz4::Encoder<Box<dyn Write + Send>>>);

#[cfg(feature = "compression-lz4")]
impl Write for Lz4AutoFinish {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.0.as_mut() {
            Some(encoder) => encoder.write(buf),
            None => Err(std::io::Error::other("lz4 encoder already finished")),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.0.as_mut() {
            Some(encoder) => encoder.flush(),
            None => Ok(()),
        }
    }
}

#[cfg(feature = "compression-lz4")]
impl Drop for Lz4AutoFinish {
    fn drop(&mut self) {
        if let Some(encoder) = self.0.take() {
            let (_, _result) = encoder.finish();
        }
    }
}
