//! Shard log framing.
//!
//! Writers are append sessions: opening a compressed log for append starts a
//! new gzip member, readers decode every member in sequence.

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Largest payload a length-prefixed frame can carry.
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// One payload per `\n` terminated line.
    Lines,
    /// `u16` big-endian length followed by the payload.
    LengthPrefixed,
}

enum Sink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Plain(w) => w.write(buf),
            Sink::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Plain(w) => w.flush(),
            Sink::Gzip(w) => w.flush(),
        }
    }
}

pub struct FrameWriter {
    sink: Sink,
    framing: Framing,
    /// File length covered by flushed frames (plain logs only).
    committed: u64,
    pending: u64,
}

impl FrameWriter {
    /// Open a log for appending, creating it when absent.
    pub fn append(path: &Path, framing: Framing, compressed: bool) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let committed = file.metadata()?.len();
        Ok(Self::from_file(file, framing, compressed, committed))
    }

    /// Create a log, discarding any previous content.
    pub fn create(path: &Path, framing: Framing, compressed: bool) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_file(file, framing, compressed, 0))
    }

    fn from_file(file: File, framing: Framing, compressed: bool, committed: u64) -> Self {
        let buffered = BufWriter::new(file);
        let sink = if compressed {
            Sink::Gzip(GzEncoder::new(buffered, Compression::default()))
        } else {
            Sink::Plain(buffered)
        };
        FrameWriter {
            sink,
            framing,
            committed,
            pending: 0,
        }
    }

    pub fn write_frame(&mut self, payload: &[u8]) -> io::Result<()> {
        match self.framing {
            Framing::Lines => {
                self.sink.write_all(payload)?;
                self.sink.write_all(b"\n")?;
                self.pending += payload.len() as u64 + 1;
                Ok(())
            }
            Framing::LengthPrefixed => {
                if payload.len() > MAX_FRAME_LEN {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!(
                            "frame of {} bytes exceeds the {} byte limit",
                            payload.len(),
                            MAX_FRAME_LEN
                        ),
                    ));
                }
                let len = payload.len() as u16;
                self.sink.write_all(&len.to_be_bytes())?;
                self.sink.write_all(payload)?;
                self.pending += payload.len() as u64 + 2;
                Ok(())
            }
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()?;
        self.committed += std::mem::take(&mut self.pending);
        Ok(())
    }

    /// End the session without writing buffered frames.
    ///
    /// A plain log is cut back to its last flushed frame. Returns false when
    /// the log cannot be restored that way (gzip members are left
    /// unterminated) and has to be rewritten by the caller.
    pub fn abandon(self) -> io::Result<bool> {
        match self.sink {
            Sink::Plain(w) => {
                let (file, _unwritten) = w.into_parts();
                file.set_len(self.committed)?;
                Ok(true)
            }
            Sink::Gzip(w) => {
                drop(w);
                Ok(false)
            }
        }
    }

    /// Flush buffered frames and terminate the gzip member, if any.
    pub fn finish(self) -> io::Result<()> {
        match self.sink {
            Sink::Plain(mut w) => w.flush(),
            Sink::Gzip(w) => {
                let mut inner = w.finish()?;
                inner.flush()
            }
        }
    }
}

pub struct FrameReader {
    inner: Box<dyn BufRead + Send>,
    framing: Framing,
}

impl FrameReader {
    pub fn open(path: &Path, framing: Framing, compressed: bool) -> io::Result<Self> {
        let file = File::open(path)?;
        let inner: Box<dyn BufRead + Send> = if file.metadata()?.len() == 0 {
            Box::new(io::empty())
        } else if compressed {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(FrameReader { inner, framing })
    }

    /// Next payload, or `None` at a clean end of stream.
    ///
    /// A frame cut short by the end of the stream yields an
    /// [`io::ErrorKind::UnexpectedEof`] error.
    pub fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        match self.framing {
            Framing::Lines => self.next_line(),
            Framing::LengthPrefixed => self.next_prefixed(),
        }
    }

    fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if self.inner.read_until(b'\n', &mut buf)? == 0 {
                return Ok(None);
            }
            while matches!(buf.last(), Some(b'\n' | b'\r')) {
                buf.pop();
            }
            if buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Ok(Some(buf));
        }
    }

    fn next_prefixed(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut header = [0u8; 2];
        match read_full(&mut self.inner, &mut header)? {
            0 => return Ok(None),
            2 => {}
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated frame header",
                ))
            }
        }

        let len = u16::from_be_bytes(header) as usize;
        let mut payload = vec![0u8; len];
        let got = read_full(&mut self.inner, &mut payload)?;
        if got < len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("truncated frame: expected {} bytes, found {}", len, got),
            ));
        }
        Ok(Some(payload))
    }
}

fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
