use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::info;

use crate::constants::layout::{TRAIN_INDEX_FILE, TRAIN_RECORD_FILE};
use crate::errors::FaceDataError;
use crate::record::RecordStore;
use crate::record::frame::{read_record, write_record};
use crate::record::header::{RecordHeader, pack};
use crate::types::{RecordBytes, RecordKey, RecordOffset};

/// Require `path` to exist before opening it.
pub(crate) fn require_file(path: &Path) -> Result<(), FaceDataError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(FaceDataError::MissingFile {
            path: path.to_path_buf(),
        })
    }
}

type ParsedIndex = (Vec<RecordKey>, HashMap<RecordKey, RecordOffset>);

fn parse_index(text: &str) -> Result<ParsedIndex, FaceDataError> {
    let mut keys = Vec::new();
    let mut offsets = HashMap::new();
    for (line_idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let malformed = |details: String| FaceDataError::MalformedIndex {
            line: line_idx + 1,
            details,
        };
        let mut parts = line.split('\t');
        let (Some(raw_key), Some(raw_offset)) = (parts.next(), parts.next()) else {
            return Err(malformed(format!("expected 'key<TAB>offset', got '{line}'")));
        };
        let key = raw_key
            .trim()
            .parse::<RecordKey>()
            .map_err(|_| malformed(format!("invalid key '{raw_key}'")))?;
        let offset = raw_offset
            .trim()
            .parse::<RecordOffset>()
            .map_err(|_| malformed(format!("invalid offset '{raw_offset}'")))?;
        if offsets.insert(key, offset).is_none() {
            keys.push(key);
        }
    }
    Ok((keys, offsets))
}

/// Read-only indexed record file (`.idx` + `.rec`).
///
/// The record file is memory-mapped once; reads borrow the mapping and copy
/// out the reassembled record, so `read` is safe from any number of threads.
pub struct IndexedRecordFile {
    rec_path: PathBuf,
    keys: Vec<RecordKey>,
    offsets: HashMap<RecordKey, RecordOffset>,
    map: Option<Mmap>,
}

impl IndexedRecordFile {
    /// Open an explicit `.idx`/`.rec` pair.
    pub fn open(
        idx_path: impl AsRef<Path>,
        rec_path: impl AsRef<Path>,
    ) -> Result<Self, FaceDataError> {
        let idx_path = idx_path.as_ref();
        let rec_path = rec_path.as_ref();
        require_file(idx_path)?;
        require_file(rec_path)?;
        let (keys, offsets) = parse_index(&fs::read_to_string(idx_path)?)?;
        let file = File::open(rec_path)?;
        let map = if file.metadata()?.len() == 0 {
            None
        } else {
            // SAFETY: the file is opened read-only and the dataset is treated
            // as immutable for the lifetime of the store.
            Some(unsafe { Mmap::map(&file)? })
        };
        info!(
            path = %rec_path.display(),
            records = keys.len(),
            "[faceset:record] opened indexed record file"
        );
        Ok(Self {
            rec_path: rec_path.to_path_buf(),
            keys,
            offsets,
            map,
        })
    }

    /// Open `train.idx` / `train.rec` inside `dir`.
    pub fn open_dir(dir: impl AsRef<Path>) -> Result<Self, FaceDataError> {
        let dir = dir.as_ref();
        Self::open(dir.join(TRAIN_INDEX_FILE), dir.join(TRAIN_RECORD_FILE))
    }

    /// Path of the backing `.rec` file.
    pub fn rec_path(&self) -> &Path {
        &self.rec_path
    }

    fn bytes(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }
}

impl RecordStore for IndexedRecordFile {
    fn keys(&self) -> &[RecordKey] {
        &self.keys
    }

    fn contains(&self, key: RecordKey) -> bool {
        self.offsets.contains_key(&key)
    }

    fn read(&self, key: RecordKey) -> Result<RecordBytes, FaceDataError> {
        let offset = *self
            .offsets
            .get(&key)
            .ok_or(FaceDataError::MissingRecord { key })?;
        let offset = usize::try_from(offset).map_err(|_| FaceDataError::MalformedRecord {
            key,
            details: format!("offset {offset} does not fit in memory"),
        })?;
        read_record(self.bytes(), offset, key)
    }
}

/// Sequential writer producing an `.idx`/`.rec` pair readable by `IndexedRecordFile`.
pub struct IndexedRecordWriter {
    index: BufWriter<File>,
    records: BufWriter<File>,
    position: RecordOffset,
    written: usize,
}

impl IndexedRecordWriter {
    /// Create (truncating) an explicit `.idx`/`.rec` pair.
    pub fn create(
        idx_path: impl AsRef<Path>,
        rec_path: impl AsRef<Path>,
    ) -> Result<Self, FaceDataError> {
        Ok(Self {
            index: BufWriter::new(File::create(idx_path)?),
            records: BufWriter::new(File::create(rec_path)?),
            position: 0,
            written: 0,
        })
    }

    /// Create `train.idx` / `train.rec` inside `dir`.
    pub fn create_dir(dir: impl AsRef<Path>) -> Result<Self, FaceDataError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Self::create(dir.join(TRAIN_INDEX_FILE), dir.join(TRAIN_RECORD_FILE))
    }

    /// Append raw record bytes under `key`.
    pub fn write(&mut self, key: RecordKey, bytes: &[u8]) -> Result<(), FaceDataError> {
        writeln!(self.index, "{key}\t{}", self.position)?;
        let len = write_record(&mut self.records, bytes)?;
        self.position += len as RecordOffset;
        self.written += 1;
        Ok(())
    }

    /// Pack `header` + `payload` and append it under `key`.
    pub fn write_packed(
        &mut self,
        key: RecordKey,
        header: &RecordHeader,
        payload: &[u8],
    ) -> Result<(), FaceDataError> {
        self.write(key, &pack(header, payload))
    }

    /// Number of records written so far.
    pub fn len(&self) -> usize {
        self.written
    }

    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    /// Flush both files.
    pub fn finish(mut self) -> Result<(), FaceDataError> {
        self.index.flush()?;
        self.records.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::header::{Label, unpack};
    use tempfile::tempdir;

    #[test]
    fn writer_output_reads_back_in_index_order() {
        let temp = tempdir().unwrap();
        let mut writer = IndexedRecordWriter::create_dir(temp.path()).unwrap();
        writer
            .write_packed(0, &RecordHeader::range_declaration(3, 2), &[])
            .unwrap();
        writer
            .write_packed(2, &RecordHeader::new(Label::scalar(1.0), 2, 0), b"second")
            .unwrap();
        writer
            .write_packed(1, &RecordHeader::new(Label::scalar(0.0), 1, 0), b"first")
            .unwrap();
        assert_eq!(writer.len(), 3);
        writer.finish().unwrap();

        let store = IndexedRecordFile::open_dir(temp.path()).unwrap();
        assert_eq!(store.keys(), &[0, 2, 1]);
        let bytes = store.read(1).unwrap();
        let (header, payload) = unpack(1, &bytes).unwrap();
        assert_eq!(header.label, Label::scalar(0.0));
        assert_eq!(payload, b"first");
        assert!(matches!(
            store.read(9),
            Err(FaceDataError::MissingRecord { key: 9 })
        ));
    }

    #[test]
    fn open_reports_missing_files() {
        let temp = tempdir().unwrap();
        let err = IndexedRecordFile::open_dir(temp.path()).err().unwrap();
        match err {
            FaceDataError::MissingFile { path } => assert!(path.ends_with(TRAIN_INDEX_FILE)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn open_rejects_malformed_index_lines() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(TRAIN_INDEX_FILE), "0\t0\nnot-a-key\t8\n").unwrap();
        fs::write(temp.path().join(TRAIN_RECORD_FILE), b"").unwrap();
        let err = IndexedRecordFile::open_dir(temp.path()).err().unwrap();
        assert!(matches!(err, FaceDataError::MalformedIndex { line: 2, .. }));
    }

    #[test]
    fn empty_record_file_opens_and_reads_fail_cleanly() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(TRAIN_INDEX_FILE), "0\t0\n").unwrap();
        fs::write(temp.path().join(TRAIN_RECORD_FILE), b"").unwrap();
        let store = IndexedRecordFile::open_dir(temp.path()).unwrap();
        assert!(matches!(
            store.read(0),
            Err(FaceDataError::MalformedRecord { key: 0, .. })
        ));
    }
}
