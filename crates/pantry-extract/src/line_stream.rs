//! Chunked, delimiter-based line reader
//!
//! [`LineStream`] reads its source in fixed-size chunks and hands out one
//! delimiter-separated line at a time, so a dump of any size is processed in
//! bounded memory. Lines are returned as raw bytes with the delimiter removed.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

/// Bytes requested from the source per read
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Lazy, rewindable sequence of lines over a byte source.
pub struct LineStream<R> {
    reader: R,
    delimiter: Vec<u8>,
    chunk_size: usize,
    buffer: Vec<u8>,
    /// Start of unconsumed bytes in `buffer`
    start: usize,
    /// Delimiter search resumes here; bytes before it are known not to start one
    scanned: usize,
    at_eof: bool,
}

impl LineStream<File> {
    /// Open a file with the default newline delimiter and chunk size
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Opening line stream");
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read> LineStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            delimiter: vec![b'\n'],
            chunk_size: DEFAULT_CHUNK_SIZE,
            buffer: Vec::with_capacity(DEFAULT_CHUNK_SIZE),
            start: 0,
            scanned: 0,
            at_eof: false,
        }
    }

    /// Create a stream with a custom delimiter and chunk size.
    ///
    /// Fails with `InvalidInput` for an empty delimiter or a zero chunk size.
    pub fn with_options(reader: R, delimiter: impl Into<Vec<u8>>, chunk_size: usize) -> io::Result<Self> {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "line delimiter must not be empty"));
        }
        if chunk_size == 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "chunk size must be positive"));
        }

        let mut stream = Self::new(reader);
        stream.delimiter = delimiter;
        stream.chunk_size = chunk_size;
        Ok(stream)
    }

    /// Next line without its delimiter, or `None` once the source is drained.
    ///
    /// A trailing line without a delimiter is returned once; after that every
    /// call returns `None`.
    pub fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        if self.at_eof {
            return Ok(None);
        }

        loop {
            if let Some(end) = self.find_delimiter() {
                let line = self.buffer[self.start..end].to_vec();
                self.start = end + self.delimiter.len();
                self.scanned = self.start;
                return Ok(Some(line));
            }

            // A delimiter may straddle the next chunk boundary
            let overlap = self.delimiter.len() - 1;
            self.scanned = self.buffer.len().saturating_sub(overlap).max(self.start);

            if self.fill()? == 0 {
                self.at_eof = true;
                let tail = (self.start < self.buffer.len()).then(|| self.buffer[self.start..].to_vec());
                self.buffer.clear();
                self.start = 0;
                self.scanned = 0;
                return Ok(tail);
            }
        }
    }

    fn find_delimiter(&self) -> Option<usize> {
        let haystack = &self.buffer[self.scanned..];
        let offset = if let [byte] = self.delimiter.as_slice() {
            haystack.iter().position(|b| b == byte)
        } else {
            haystack
                .windows(self.delimiter.len())
                .position(|window| window == self.delimiter.as_slice())
        };
        offset.map(|o| self.scanned + o)
    }

    /// Read one chunk into the buffer, returning the number of bytes read
    fn fill(&mut self) -> io::Result<usize> {
        if self.start > 0 {
            self.buffer.drain(..self.start);
            self.scanned -= self.start;
            self.start = 0;
        }

        let len = self.buffer.len();
        self.buffer.resize(len + self.chunk_size, 0);
        let read = loop {
            match self.reader.read(&mut self.buffer[len..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buffer.truncate(len);
                    return Err(e);
                },
            }
        };
        self.buffer.truncate(len + read);
        Ok(read)
    }
}

impl<R: Read + Seek> LineStream<R> {
    /// Seek back to the start of the source and drop buffered state
    pub fn rewind(&mut self) -> io::Result<()> {
        self.reader.seek(SeekFrom::Start(0))?;
        self.buffer.clear();
        self.start = 0;
        self.scanned = 0;
        self.at_eof = false;
        Ok(())
    }
}

impl<R: Read> Iterator for LineStream<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect(input: &str, chunk_size: usize) -> Vec<String> {
        let stream = LineStream::with_options(Cursor::new(input.as_bytes().to_vec()), "\n", chunk_size).unwrap();
        stream
            .map(|line| String::from_utf8(line.unwrap()).unwrap())
            .collect()
    }

    #[test]
    fn test_lines_without_trailing_delimiter() {
        assert_eq!(collect("a\nb\nc", DEFAULT_CHUNK_SIZE), ["a", "b", "c"]);
    }

    #[test]
    fn test_trailing_delimiter_adds_no_empty_line() {
        assert_eq!(collect("a\nb\n", DEFAULT_CHUNK_SIZE), ["a", "b"]);
    }

    #[test]
    fn test_chunk_smaller_than_line() {
        let input = "first line\nsecond, longer line\nx";
        for chunk_size in 1..=5 {
            assert_eq!(collect(input, chunk_size), ["first line", "second, longer line", "x"]);
        }
    }

    #[test]
    fn test_empty_lines_are_kept() {
        assert_eq!(collect("a\n\nb", 2), ["a", "", "b"]);
    }

    #[test]
    fn test_empty_source() {
        let mut stream = LineStream::new(Cursor::new(Vec::new()));
        assert!(stream.next_line().unwrap().is_none());
        assert!(stream.next_line().unwrap().is_none());
    }

    #[test]
    fn test_tail_returned_once() {
        let mut stream = LineStream::with_options(Cursor::new(b"no delimiter here".to_vec()), "\n", 4).unwrap();
        assert_eq!(stream.next_line().unwrap().unwrap(), b"no delimiter here");
        for _ in 0..3 {
            assert!(stream.next_line().unwrap().is_none());
        }
    }

    #[test]
    fn test_multibyte_delimiter_across_chunks() {
        let input = b"alpha\r\nbeta\r\n\r\ngamma".to_vec();
        for chunk_size in 1..=8 {
            let stream = LineStream::with_options(Cursor::new(input.clone()), "\r\n", chunk_size).unwrap();
            let lines: Vec<Vec<u8>> = stream.map(|l| l.unwrap()).collect();
            assert_eq!(lines, [b"alpha".to_vec(), b"beta".to_vec(), Vec::new(), b"gamma".to_vec()]);
        }
    }

    #[test]
    fn test_partial_delimiter_is_content() {
        // A lone '\r' is not a "\r\n" delimiter
        let stream = LineStream::with_options(Cursor::new(b"a\rb\r\nc".to_vec()), "\r\n", 1).unwrap();
        let lines: Vec<Vec<u8>> = stream.map(|l| l.unwrap()).collect();
        assert_eq!(lines, [b"a\rb".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn test_rewind_restarts_from_beginning() {
        let mut stream = LineStream::with_options(Cursor::new(b"one\ntwo\nthree".to_vec()), "\n", 3).unwrap();
        assert_eq!(stream.next_line().unwrap().unwrap(), b"one");
        assert_eq!(stream.next_line().unwrap().unwrap(), b"two");

        stream.rewind().unwrap();
        let lines: Vec<Vec<u8>> = stream.by_ref().map(|l| l.unwrap()).collect();
        assert_eq!(lines, [b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);

        // Rewinding after end-of-source also works
        stream.rewind().unwrap();
        assert_eq!(stream.next_line().unwrap().unwrap(), b"one");
    }

    #[test]
    fn test_invalid_options() {
        assert!(LineStream::with_options(Cursor::new(Vec::new()), "", 16).is_err());
        assert!(LineStream::with_options(Cursor::new(Vec::new()), "\n", 0).is_err());
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = LineStream::open(dir.path().join("missing.jsonl"));
        assert_eq!(result.err().unwrap().kind(), io::ErrorKind::NotFound);
    }
}
