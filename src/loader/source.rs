//! Compressed feed sources
//!
//! A source is any byte stream holding a gzip-compressed TSV feed. Files are
//! one kind of stream; tests feed in-memory buffers. Lines are read one at a
//! time and never collected.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use super::errors::{LoaderError, LoaderResult};

/// One data line with its 1-based position in the decompressed feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub number: u64,
    pub bytes: Vec<u8>,
}

/// Forward-only line reader over a gzip stream.
pub struct DatasetSource<R: Read> {
    name: String,
    reader: BufReader<MultiGzDecoder<R>>,
    line_number: u64,
    header_skipped: bool,
    finished: bool,
}

impl DatasetSource<File> {
    /// Opens a compressed feed file.
    pub fn open(path: &Path) -> LoaderResult<Self> {
        let name = path.display().to_string();
        let file = File::open(path).map_err(|e| LoaderError::source_unavailable(&name, e))?;
        Ok(Self::from_reader(name, file))
    }
}

impl<R: Read> DatasetSource<R> {
    /// Wraps any compressed byte stream.
    pub fn from_reader(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader: BufReader::new(MultiGzDecoder::new(reader)),
            line_number: 0,
            header_skipped: false,
            finished: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of lines consumed so far, header included
    pub fn lines_read(&self) -> u64 {
        self.line_number
    }

    fn read_line(&mut self) -> LoaderResult<Option<Vec<u8>>> {
        let mut buf = Vec::new();
        let n = self
            .reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| LoaderError::source_unavailable(&self.name, e))?;
        if n == 0 {
            return Ok(None);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        self.line_number += 1;
        Ok(Some(buf))
    }

    /// Consumes the header line. Must be called before iterating.
    pub fn skip_header(&mut self) -> LoaderResult<()> {
        if self.header_skipped {
            return Ok(());
        }
        match self.read_line()? {
            Some(_) => {
                self.header_skipped = true;
                Ok(())
            }
            None => Err(LoaderError::MissingHeader {
                name: self.name.clone(),
            }),
        }
    }
}

impl<R: Read> Iterator for DatasetSource<R> {
    type Item = LoaderResult<SourceLine>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if !self.header_skipped {
            if let Err(e) = self.skip_header() {
                self.finished = true;
                return Some(Err(e));
            }
        }
        match self.read_line() {
            Ok(Some(bytes)) => Some(Ok(SourceLine {
                number: self.line_number,
                bytes,
            })),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};

    fn gzip(text: &str) -> Cursor<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(text.as_bytes()).unwrap();
        Cursor::new(encoder.finish().unwrap())
    }

    #[test]
    fn test_header_skipped_and_lines_numbered() {
        let source = DatasetSource::from_reader("mem", gzip("h1\th2\na\tb\r\nc\td\n"));
        let lines: Vec<SourceLine> = source.map(|l| l.unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].number, 2);
        assert_eq!(lines[0].bytes, b"a\tb");
        assert_eq!(lines[1].number, 3);
        assert_eq!(lines[1].bytes, b"c\td");
    }

    #[test]
    fn test_last_line_without_newline() {
        let source = DatasetSource::from_reader("mem", gzip("header\nx\ty"));
        let lines: Vec<SourceLine> = source.map(|l| l.unwrap()).collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].bytes, b"x\ty");
    }

    #[test]
    fn test_empty_stream_has_no_header() {
        let mut source = DatasetSource::from_reader("mem", gzip(""));
        let err = source.next().unwrap().unwrap_err();
        assert!(matches!(err, LoaderError::MissingHeader { .. }));
        assert!(source.next().is_none());
    }

    #[test]
    fn test_not_gzip_is_unavailable() {
        let mut source = DatasetSource::from_reader("mem", Cursor::new(b"plain text\n".to_vec()));
        let err = source.next().unwrap().unwrap_err();
        assert_eq!(err.code(), "REEL_SOURCE_UNAVAILABLE");
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let err = match DatasetSource::open(Path::new("/nonexistent/title.basics.tsv.gz")) {
            Err(e) => e,
            Ok(_) => panic!("expected missing file"),
        };
        assert!(matches!(err, LoaderError::SourceUnavailable { .. }));
    }
}
