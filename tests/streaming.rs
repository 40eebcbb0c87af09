//! Tests for stream splicing, background chunked reading, and header
//! capture across chunk boundaries.

use kgtab::{ChunkedBackgroundReader, DecodingOptions, DecodingReader, SpliceReader};
use std::io::{self, Cursor, Read};

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Reads through `reader` with a cycling sequence of odd buffer sizes, so
/// reads land at awkward offsets.
fn read_unevenly(mut reader: impl Read) -> io::Result<Vec<u8>> {
    let sizes = [1usize, 7, 3, 64, 13, 255, 2, 31];
    let mut out = Vec::new();
    let mut turn = 0;
    loop {
        let mut buf = vec![0u8; sizes[turn % sizes.len()]];
        turn += 1;
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Ok(out);
        }
        out.extend_from_slice(&buf[..n]);
    }
}

#[test]
fn splice_is_transparent_at_every_boundary() -> io::Result<()> {
    let data = patterned(4096);
    for split in [0, 1, 7, 255, 256, 2048, 4095, 4096] {
        let front = Cursor::new(data[..split].to_vec());
        let rest = Cursor::new(data[split..].to_vec());
        let joined = read_unevenly(SpliceReader::new(front, rest))?;
        assert_eq!(joined, data, "split at {split}");
    }
    Ok(())
}

#[test]
fn splice_single_read_spans_the_boundary() -> io::Result<()> {
    let mut reader = SpliceReader::new(Cursor::new(vec![1u8, 2, 3]), Cursor::new(vec![4u8, 5]));
    let mut buf = [0u8; 8];
    let n = reader.read(&mut buf)?;
    assert_eq!(&buf[..n], &[1, 2, 3, 4, 5]);
    assert_eq!(reader.read(&mut buf)?, 0);
    Ok(())
}

#[test]
fn splice_composes_for_deeper_nesting() -> io::Result<()> {
    let data = patterned(300);
    let inner = SpliceReader::new(
        Cursor::new(data[100..200].to_vec()),
        Cursor::new(data[200..].to_vec()),
    );
    let outer = SpliceReader::new(Cursor::new(data[..100].to_vec()), inner);
    assert_eq!(read_unevenly(outer)?, data);
    Ok(())
}

#[test]
fn background_reader_preserves_order_and_content() -> io::Result<()> {
    let data = patterned(1 << 20);
    let reader = ChunkedBackgroundReader::with_sizes(Cursor::new(data.clone()), 1031, 4);
    assert_eq!(read_unevenly(reader)?, data);
    Ok(())
}

#[test]
fn background_reader_survives_tiny_queue_and_slow_consumer() -> io::Result<()> {
    // Queue capacity 1 forces the worker to block on almost every chunk;
    // the consumer must still drain everything without deadlock.
    let data = patterned(64 << 10);
    let mut reader = ChunkedBackgroundReader::with_sizes(Cursor::new(data.clone()), 509, 1);
    let mut out = Vec::new();
    let mut byte = [0u8; 1];
    while reader.read(&mut byte)? == 1 {
        out.push(byte[0]);
    }
    assert_eq!(out, data);
    // End of stream is sticky.
    assert_eq!(reader.read(&mut byte)?, 0);
    Ok(())
}

#[test]
fn background_reader_drops_cleanly_without_draining() -> io::Result<()> {
    let data = patterned(8 << 20);
    let mut reader = ChunkedBackgroundReader::with_sizes(Cursor::new(data), 4096, 1);
    let mut buf = [0u8; 100];
    reader.read_exact(&mut buf)?;
    // Drop with the worker blocked on a full channel; must not hang.
    drop(reader);
    Ok(())
}

/// Yields `limit` patterned bytes, then fails.
struct FailingSource {
    produced: usize,
    limit: usize,
}

impl Read for FailingSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.produced >= self.limit {
            return Err(io::Error::other("source went away"));
        }
        let n = buf.len().min(self.limit - self.produced);
        for slot in &mut buf[..n] {
            *slot = (self.produced % 251) as u8;
            self.produced += 1;
        }
        Ok(n)
    }
}

#[test]
fn background_reader_surfaces_worker_errors() {
    let source = FailingSource {
        produced: 0,
        limit: 1000,
    };
    let mut reader = ChunkedBackgroundReader::with_sizes(source, 256, 4);
    let mut out = Vec::new();
    let err = reader
        .read_to_end(&mut out)
        .expect_err("worker failure must surface");
    assert!(err.to_string().contains("source went away"));
    // The bytes produced before the failure arrived intact.
    assert_eq!(out, patterned(1000));
}

#[test]
fn header_capture_strips_terminator_and_replays_rest() -> anyhow::Result<()> {
    let text = b"node1\tlabel\tnode2\nQ1\tP31\tQ5\nQ2\tP31\tQ5\n".to_vec();
    let mut reader = DecodingReader::open(Cursor::new(text), false)?;
    let header = reader.capture_header(false)?;
    assert_eq!(header, "node1\tlabel\tnode2");
    let mut rest = String::new();
    reader.read_to_string(&mut rest)?;
    assert_eq!(rest, "Q1\tP31\tQ5\nQ2\tP31\tQ5\n");
    Ok(())
}

#[test]
fn header_capture_handles_crlf() -> anyhow::Result<()> {
    let text = b"id\tlabel\r\nQ1\tEarth\r\n".to_vec();
    let mut reader = DecodingReader::open(Cursor::new(text), false)?;
    assert_eq!(reader.capture_header(false)?, "id\tlabel");
    let mut rest = String::new();
    reader.read_to_string(&mut rest)?;
    assert_eq!(rest, "Q1\tEarth\r\n");
    Ok(())
}

#[test]
fn header_spanning_many_chunks_is_reassembled() -> anyhow::Result<()> {
    let header: String = "c".repeat(100);
    let text = format!("{header}\nrow\n");
    let mut reader = DecodingReader::with_options(
        Cursor::new(text.into_bytes()),
        DecodingOptions {
            chunk_size: 4,
            ..DecodingOptions::default()
        },
    )?;
    assert_eq!(reader.capture_header(false)?, header);
    let mut rest = String::new();
    reader.read_to_string(&mut rest)?;
    assert_eq!(rest, "row\n");
    Ok(())
}

#[test]
fn preserved_header_is_replayed_with_the_stream() -> anyhow::Result<()> {
    let text = "id\tlabel\nQ1\tEarth\n".to_string();
    let mut reader = DecodingReader::open(Cursor::new(text.clone().into_bytes()), false)?;
    assert_eq!(reader.capture_header(true)?, "id\tlabel");
    let mut replay = String::new();
    reader.read_to_string(&mut replay)?;
    assert_eq!(replay, text);
    Ok(())
}

#[test]
fn header_without_newline_consumes_whole_stream() -> anyhow::Result<()> {
    let mut reader = DecodingReader::open(Cursor::new(b"only-line".to_vec()), false)?;
    assert_eq!(reader.capture_header(false)?, "only-line");
    let mut rest = String::new();
    reader.read_to_string(&mut rest)?;
    assert!(rest.is_empty());
    Ok(())
}

#[test]
fn header_capture_on_empty_stream_is_empty() -> anyhow::Result<()> {
    let mut reader = DecodingReader::open(Cursor::new(Vec::new()), false)?;
    assert_eq!(reader.capture_header(false)?, "");
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn header_capture_works_on_compressed_streams() -> anyhow::Result<()> {
    use std::io::Write;
    let mut encoder =
        flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(b"node1\tlabel\tnode2\nQ1\tP31\tQ5\n")?;
    let raw = encoder.finish()?;

    let mut reader = DecodingReader::open(Cursor::new(raw), false)?;
    assert_eq!(reader.capture_header(false)?, "node1\tlabel\tnode2");
    let mut rest = String::new();
    reader.read_to_string(&mut rest)?;
    assert_eq!(rest, "Q1\tP31\tQ5\n");
    Ok(())
}

#[test]
fn non_utf8_header_is_a_format_error() -> anyhow::Result<()> {
    let mut reader = DecodingReader::open(Cursor::new(vec![0xFF, 0xFE, b'\n']), false)?;
    let err = reader
        .capture_header(false)
        .expect_err("invalid UTF-8 must be rejected");
    assert!(matches!(err, kgtab::KgtabError::Format(_)));
    Ok(())
}
