//! Background chunked reading over a bounded channel.
//!
//! Decompression is CPU-bound while the downstream consumer is often
//! I/O-bound; running the reads on a worker thread overlaps the two. The
//! bounded channel is the backpressure mechanism: the worker blocks when the
//! consumer falls behind, and the consumer blocks only when no chunk has
//! arrived yet.

use crossbeam_channel::{Receiver, bounded};
use std::io::{self, Read};
use std::thread::{self, JoinHandle};

/// Default number of chunks the channel may buffer ahead of the consumer.
pub const DEFAULT_QUEUE_SIZE: usize = 64;

/// Default chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 20;

/// A message from the worker: a chunk of stream data, the end-of-stream
/// marker, or the read error that terminated the worker. The explicit `End`
/// marker keeps a genuinely empty chunk distinguishable from end-of-stream.
enum Delivery {
    Chunk(Vec<u8>),
    End,
    Failed(io::Error),
}

/// Runs stream reads on a worker thread, delivering fixed-size chunks
/// through a bounded channel in strict read order.
///
/// Dropping the reader tears the worker down without deadlock: the receiver
/// side of the channel is released first, which unblocks a worker stuck on a
/// full channel, and pending chunks are discarded.
pub struct ChunkedBackgroundReader {
    receiver: Option<Receiver<Delivery>>,
    worker: Option<JoinHandle<()>>,
    chunk: Vec<u8>,
    pos: usize,
    done: bool,
    deferred: Option<io::Error>,
}

impl ChunkedBackgroundReader {
    /// Start a worker over `stream` with the default chunk and queue sizes.
    pub fn new<R: Read + Send + 'static>(stream: R) -> Self {
        Self::with_sizes(stream, DEFAULT_CHUNK_SIZE, DEFAULT_QUEUE_SIZE)
    }

    /// Start a worker over `stream`, reading `chunk_size` bytes at a time
    /// into a channel holding at most `queue_size` chunks.
    pub fn with_sizes<R: Read + Send + 'static>(
        mut stream: R,
        chunk_size: usize,
        queue_size: usize,
    ) -> Self {
        let chunk_size = chunk_size.max(1);
        let (sender, receiver) = bounded(queue_size.max(1));
        let worker = thread::spawn(move || {
            loop {
                let mut buf = vec![0u8; chunk_size];
                match stream.read(&mut buf) {
                    Ok(0) => {
                        let _ = sender.send(Delivery::End);
                        break;
                    }
                    Ok(n) => {
                        buf.truncate(n);
                        if sender.send(Delivery::Chunk(buf)).is_err() {
                            // Consumer went away; stop without draining.
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        let _ = sender.send(Delivery::Failed(e));
                        break;
                    }
                }
            }
        });
        ChunkedBackgroundReader {
            receiver: Some(receiver),
            worker: Some(worker),
            chunk: Vec::new(),
            pos: 0,
            done: false,
            deferred: None,
        }
    }

    /// Pull the next delivery. Blocks when nothing has been consumed yet in
    /// this read call; polls without blocking otherwise.
    fn refill(&mut self, block: bool) -> io::Result<bool> {
        let Some(receiver) = self.receiver.as_ref() else {
            self.done = true;
            return Ok(false);
        };
        let delivery = if block {
            match receiver.recv() {
                Ok(d) => d,
                Err(_) => {
                    self.done = true;
                    return Err(io::Error::other("background reader worker disconnected"));
                }
            }
        } else {
            match receiver.try_recv() {
                Ok(d) => d,
                Err(_) => return Ok(false),
            }
        };
        match delivery {
            Delivery::Chunk(chunk) => {
                self.chunk = chunk;
                self.pos = 0;
                Ok(true)
            }
            Delivery::End => {
                self.done = true;
                Ok(false)
            }
            Delivery::Failed(e) => {
                self.done = true;
                Err(e)
            }
        }
    }
}

impl Read for ChunkedBackgroundReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            if self.pos < self.chunk.len() {
                let n = (buf.len() - filled).min(self.chunk.len() - self.pos);
                buf[filled..filled + n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
                self.pos += n;
                filled += n;
                continue;
            }
            if self.done {
                if filled == 0 {
                    if let Some(e) = self.deferred.take() {
                        return Err(e);
                    }
                }
                break;
            }
            match self.refill(filled == 0) {
                Ok(true) => {}
                Ok(false) => {
                    if filled > 0 {
                        break;
                    }
                    if self.done {
                        break;
                    }
                }
                Err(e) => {
                    if filled == 0 {
                        return Err(e);
                    }
                    // Hand back what we have; surface the failure next call.
                    self.deferred = Some(e);
                    break;
                }
            }
        }
        Ok(filled)
    }
}

impl Drop for ChunkedBackgroundReader {
    fn drop(&mut self) {
        // Dropping the receiver first unblocks a worker waiting on a full
        // channel; pending chunks are discarded with it.
        self.receiver.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
