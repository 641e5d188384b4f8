use bincode::{
    self,
    config::{Configuration, Fixint, LittleEndian, NoLimit},
    error::{DecodeError, EncodeError},
};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Errors raised by record stream access.
///
/// All of them are fatal to the enclosing distillation run: this is an
/// offline batch computation and a truncated result is worse than a loud
/// failure, so nothing here is retried or recovered from.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An I/O error while opening, reading, or writing a record stream.
    /// Contains a string naming the stream and the underlying error.
    #[error("Record stream I/O error: {0}")]
    Io(String),

    /// A record could not be encoded for storage.
    #[error("Record encoding error: {0}")]
    Encode(String),

    /// A stored record could not be decoded, including an end-of-file in
    /// the middle of a record.
    #[error("Record decoding error: {0}")]
    Decode(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}
impl From<EncodeError> for StoreError {
    fn from(err: EncodeError) -> Self {
        StoreError::Encode(format!("Bincode encoding error: {}", err))
    }
}
impl From<DecodeError> for StoreError {
    fn from(err: DecodeError) -> Self {
        StoreError::Decode(format!("Bincode decoding error: {}", err))
    }
}

/// Sequential "read next record or end-of-stream" access to one stream.
///
/// Iteration terminates at end-of-stream, never by a record count.
pub trait RecordReader {
    /// Returns the next record, or `None` once the stream is exhausted.
    fn read_record(&mut self) -> Result<Option<Vec<u8>>, StoreError>;
}

/// Sequential record output with per-record success reporting.
pub trait RecordWriter {
    fn write_record(&mut self, record: &[u8]) -> Result<(), StoreError>;

    /// Forces buffered records out to the underlying stream. Called once a
    /// run finishes so a buffered write failure surfaces as an error
    /// instead of being swallowed on drop.
    fn flush(&mut self) -> Result<(), StoreError>;
}

/// The bincode configuration shared by every stored record. Fixed-width
/// little-endian integers keep the byte layout stable across hosts.
pub(crate) fn record_config() -> Configuration<LittleEndian, Fixint, NoLimit> {
    bincode::config::standard()
        .with_little_endian()
        .with_fixed_int_encoding()
}

/// Reads bincode-framed records from a file, buffered.
pub struct FileRecordReader {
    path: String,
    reader: BufReader<File>,
    config: Configuration<LittleEndian, Fixint, NoLimit>,
}

impl std::fmt::Debug for FileRecordReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRecordReader")
            .field("path", &self.path)
            .field("reader", &self.reader)
            .finish_non_exhaustive()
    }
}

impl FileRecordReader {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let file = File::open(path).map_err(|e| {
            StoreError::Io(format!("Failed to open record stream {:?}: {}", path, e))
        })?;
        Ok(Self {
            path: format!("{:?}", path),
            reader: BufReader::new(file),
            config: record_config(),
        })
    }
}

impl RecordReader for FileRecordReader {
    fn read_record(&mut self) -> Result<Option<Vec<u8>>, StoreError> {
        // A clean end-of-file between records is end-of-stream; running out
        // of bytes inside a record is corruption and reported as an error.
        let buffered = self.reader.fill_buf().map_err(|e| {
            StoreError::Io(format!("Failed to read record stream {}: {}", self.path, e))
        })?;
        if buffered.is_empty() {
            return Ok(None);
        }
        let record: Vec<u8> = bincode::decode_from_std_read(&mut self.reader, self.config)
            .map_err(|e| {
                StoreError::Decode(format!("Malformed record in {}: {}", self.path, e))
            })?;
        Ok(Some(record))
    }
}

/// Writes bincode-framed records to a file, buffered. The file is opened in
/// truncate mode: any previous contents are overwritten, never appended to.
pub struct FileRecordWriter {
    path: String,
    writer: BufWriter<File>,
    config: Configuration<LittleEndian, Fixint, NoLimit>,
}

impl FileRecordWriter {
    pub fn create(path: &Path) -> Result<Self, StoreError> {
        let file = File::create(path).map_err(|e| {
            StoreError::Io(format!("Failed to create record stream {:?}: {}", path, e))
        })?;
        Ok(Self {
            path: format!("{:?}", path),
            writer: BufWriter::new(file),
            config: record_config(),
        })
    }
}

impl RecordWriter for FileRecordWriter {
    fn write_record(&mut self, record: &[u8]) -> Result<(), StoreError> {
        bincode::encode_into_std_write(record, &mut self.writer, self.config).map_err(|e| {
            StoreError::Encode(format!("Failed to write record to {}: {}", self.path, e))
        })?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        self.writer.flush().map_err(|e| {
            StoreError::Io(format!("Failed to flush record stream {}: {}", self.path, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn read_all(path: &Path) -> Vec<Vec<u8>> {
        let mut reader = FileRecordReader::open(path).expect("open stream");
        let mut records = Vec::new();
        while let Some(record) = reader.read_record().expect("read record") {
            records.push(record);
        }
        records
    }

    #[test]
    fn written_records_read_back_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stream");

        let records: Vec<Vec<u8>> = vec![vec![1, 2, 3], vec![], vec![0xFF; 100]];
        let mut writer = FileRecordWriter::create(&path).unwrap();
        for record in &records {
            writer.write_record(record).unwrap();
        }
        writer.flush().unwrap();

        assert_eq!(read_all(&path), records);
    }

    #[test]
    fn empty_file_is_end_of_stream() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty");
        FileRecordWriter::create(&path).unwrap().flush().unwrap();

        let mut reader = FileRecordReader::open(&path).unwrap();
        assert!(reader.read_record().unwrap().is_none());
        assert!(
            reader.read_record().unwrap().is_none(),
            "end-of-stream is stable across repeated reads"
        );
    }

    #[test]
    fn create_truncates_previous_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stream");

        let mut writer = FileRecordWriter::create(&path).unwrap();
        writer.write_record(&[1, 2, 3]).unwrap();
        writer.write_record(&[4, 5, 6]).unwrap();
        writer.flush().unwrap();

        let mut writer = FileRecordWriter::create(&path).unwrap();
        writer.write_record(&[9]).unwrap();
        writer.flush().unwrap();

        assert_eq!(read_all(&path), vec![vec![9]]);
    }

    #[test]
    fn truncated_record_is_a_decode_error_not_end_of_stream() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stream");

        let mut writer = FileRecordWriter::create(&path).unwrap();
        writer.write_record(&[7; 64]).unwrap();
        writer.flush().unwrap();

        let full = fs::read(&path).unwrap();
        fs::write(&path, &full[..full.len() / 2]).unwrap();

        let mut reader = FileRecordReader::open(&path).unwrap();
        match reader.read_record() {
            Err(StoreError::Decode(msg)) => {
                assert!(msg.contains("Malformed record"), "unexpected message: {msg}")
            }
            other => panic!("expected a decode error for a truncated record, got {other:?}"),
        }
    }

    #[test]
    fn opening_a_missing_stream_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("no_such_stream");
        match FileRecordReader::open(&missing) {
            Err(StoreError::Io(msg)) => {
                assert!(msg.contains("Failed to open"), "unexpected message: {msg}")
            }
            other => panic!("expected an I/O error, got {other:?}"),
        }
    }
}
