//! Two-segment logical stream concatenation.
//!
//! Streams here (pipes, decompressors) are not seekable, so "peek without
//! consuming" is modeled by splicing the already-consumed bytes back in
//! front of the live stream instead of rewinding it.

use std::io::{self, Read};

/// Presents two byte sources as one: reads drain the first segment, then
/// continue transparently from the second with no gap or duplication at the
/// boundary. A single `read` call may span the boundary.
///
/// Only two segments are handled; deeper nesting is built by composition,
/// splicing a new front segment over an existing `SpliceReader`.
pub struct SpliceReader<F, S> {
    front: Option<F>,
    rest: S,
}

impl<F: Read, S: Read> SpliceReader<F, S> {
    /// Create a reader over `front` followed by `rest`.
    pub fn new(front: F, rest: S) -> Self {
        SpliceReader {
            front: Some(front),
            rest,
        }
    }
}

impl<F: Read, S: Read> Read for SpliceReader<F, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        if let Some(front) = self.front.as_mut() {
            while filled < buf.len() {
                let n = front.read(&mut buf[filled..])?;
                if n == 0 {
                    self.front = None;
                    break;
                }
                filled += n;
            }
            if filled == buf.len() {
                return Ok(filled);
            }
        }
        match self.rest.read(&mut buf[filled..]) {
            Ok(n) => Ok(filled + n),
            // Bytes already drained from the front segment must not be lost;
            // the error will recur on the next call.
            Err(_) if filled > 0 => Ok(filled),
            Err(e) => Err(e),
        }
    }
}
