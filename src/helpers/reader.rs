use crate::error::RustyTablesError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum UnifiedReaderError {
    #[error("No data from remote file: '{0}'")]
    RemoteFileNoDataError(String),
}

/// A unified reader over a workbook package, wherever its bytes come from
pub(crate) enum UnifiedReader {
    /// Local file reader
    Local(BufReader<File>),
    /// Remote URL or caller-supplied bytes (in-memory buffer)
    Memory(Cursor<Vec<u8>>),
}

impl UnifiedReader {
    /// Opens a file from either a local path or remote URL.
    /// Remote URLs are fetched through DuckDB's `read_blob`, which handles credentials and protocols.
    pub(crate) fn new(file_name: &str) -> Result<UnifiedReader, RustyTablesError> {
        if Self::is_remote_url(file_name) {
            Self::read_blob_with_duckdb(file_name)
        } else {
            let file = File::open(file_name)?;
            Ok(UnifiedReader::Local(BufReader::new(file)))
        }
    }

    /// Wraps an already loaded workbook package
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> UnifiedReader {
        UnifiedReader::Memory(Cursor::new(bytes))
    }

    /// Checks if a file name represents a remote URL
    pub(crate) fn is_remote_url(file_name: &str) -> bool {
        if let Ok(url) = Url::parse(file_name) {
            // Single-letter schemes are Windows drive letters
            url.scheme() != "file" && url.scheme().len() > 1
        } else {
            false
        }
    }

    /// Reads a remote file using DuckDB's read_blob functionality
    fn read_blob_with_duckdb(file_name: &str) -> Result<UnifiedReader, RustyTablesError> {
        let connection = duckdb::Connection::open_in_memory()?;
        let result: Result<Vec<u8>, _> = connection.query_row("SELECT content FROM read_blob(?)", [file_name], |row| row.get(0));
        connection.close().map_err(|(_, e)| e)?;

        let bytes = result?;
        if bytes.is_empty() {
            Err(UnifiedReaderError::RemoteFileNoDataError(file_name.to_owned()))?;
        }

        Ok(UnifiedReader::Memory(Cursor::new(bytes)))
    }

    /// Returns true when the stream starts with the compound file (CFB) signature.
    /// Encrypted OOXML packages and legacy binary workbooks are stored this way.
    /// The stream is rewound afterwards.
    pub(crate) fn has_compound_file_signature(&mut self) -> Result<bool, RustyTablesError> {
        const SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        let mut header = [0u8; 8];
        let matched = match self.read_exact(&mut header) {
            Ok(()) => header == SIGNATURE,
            Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => false,
            Err(error) => Err(error)?,
        };
        self.rewind()?;
        Ok(matched)
    }
}

impl Read for UnifiedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            UnifiedReader::Local(reader) => reader.read(buf),
            UnifiedReader::Memory(reader) => reader.read(buf),
        }
    }
}

impl Seek for UnifiedReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            UnifiedReader::Local(reader) => reader.seek(pos),
            UnifiedReader::Memory(reader) => reader.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_remote_url() {
        // Local files
        assert!(!UnifiedReader::is_remote_url("test.xlsx"));
        assert!(!UnifiedReader::is_remote_url("/path/to/test.xlsx"));
        assert!(!UnifiedReader::is_remote_url("./relative/test.xlsx"));
        assert!(!UnifiedReader::is_remote_url("C:\\data\\test.xlsx"));

        // Remote URLs
        assert!(UnifiedReader::is_remote_url("http://example.com/test.xlsx"));
        assert!(UnifiedReader::is_remote_url("https://example.com/test.xlsx"));
        assert!(UnifiedReader::is_remote_url("s3://bucket/test.xlsx"));
        assert!(UnifiedReader::is_remote_url("gs://bucket/test.xlsx"));

        // File URLs are not remote
        assert!(!UnifiedReader::is_remote_url("file:///path/to/test.xlsx"));
    }

    #[test]
    fn test_open_local_file() {
        let result = UnifiedReader::new("Cargo.toml");
        assert!(result.is_ok(), "Failed to open local file: {:?}", result.err());

        let result = UnifiedReader::new("non_existent_file.xlsx");
        assert!(result.is_err(), "Should fail to open non-existent file");
    }

    #[test]
    fn test_compound_file_signature() {
        let mut encrypted = UnifiedReader::from_bytes(vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0x00]);
        assert!(encrypted.has_compound_file_signature().unwrap());

        let mut zipped = UnifiedReader::from_bytes(b"PK\x03\x04rest".to_vec());
        assert!(!zipped.has_compound_file_signature().unwrap());
        let mut first = [0u8; 2];
        zipped.read_exact(&mut first).unwrap();
        assert_eq!(&first, b"PK");

        let mut short = UnifiedReader::from_bytes(vec![0xD0]);
        assert!(!short.has_compound_file_signature().unwrap());
    }
}
