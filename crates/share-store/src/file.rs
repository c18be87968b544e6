use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cursor::{CursorTracker, StateIterator};
use crate::error::{StoreError, StoreResult};
use crate::table::StateTable;
use crate::traits::{CasOutcome, Version, Versioned, WorldState};

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// One logged mutation.
///
/// On-disk frame format:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized LogRecord)]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum LogRecord {
    Put {
        key: String,
        value: Vec<u8>,
        version: Version,
    },
    Delete {
        key: String,
        sequence: Version,
    },
    /// Sequence high-water mark written by compaction.
    Checkpoint { sequence: Version },
}

/// Flush/sync strategy for the state log.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    /// `fsync` after every write.
    EveryWrite,
    /// Flush to the OS and rely on its page cache.
    #[default]
    OsDefault,
}

/// Configuration for [`FileWorldState`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStateConfig {
    pub sync_mode: SyncMode,
}

struct LogWriter {
    writer: BufWriter<File>,
    /// Current end of the log file.
    offset: u64,
}

struct FileInner {
    table: StateTable,
    log: LogWriter,
}

/// Durable single-node world state.
///
/// Every mutation is appended to a log file before it is applied in memory;
/// opening the file replays the log. Frames that fail the CRC check are
/// skipped, and a torn frame at the tail (a crash mid-append) is cut off so
/// later appends stay readable. [`FileWorldState::compact`] rewrites the log
/// as one frame per live key.
pub struct FileWorldState {
    path: PathBuf,
    config: FileStateConfig,
    inner: RwLock<FileInner>,
    cursors: CursorTracker,
}

impl FileWorldState {
    /// Open (or create) the state log at `path` and replay it.
    pub fn open(path: &Path, config: FileStateConfig) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let (table, valid_len) = if path.exists() {
            recover(path)?
        } else {
            (StateTable::default(), 0)
        };

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let file_len = file.metadata()?.len();
        if valid_len < file_len {
            warn!(
                path = %path.display(),
                valid_len,
                file_len,
                "discarding torn tail of state log"
            );
            file.set_len(valid_len)?;
        }

        info!(path = %path.display(), keys = table.len(), "world state opened");
        Ok(Self {
            path: path.to_path_buf(),
            config,
            inner: RwLock::new(FileInner {
                table,
                log: LogWriter {
                    writer: BufWriter::new(file),
                    offset: valid_len,
                },
            }),
            cursors: CursorTracker::new(),
        })
    }

    /// Path to the state log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size of the state log in bytes.
    pub fn log_offset(&self) -> StoreResult<u64> {
        Ok(self.read()?.log.offset)
    }

    /// Number of live keys.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.table.len())
    }

    /// Returns `true` if no key is stored.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of range iterators that have not been released yet.
    pub fn open_cursors(&self) -> usize {
        self.cursors.open_count()
    }

    /// Rewrite the log so it holds exactly one put frame per live key.
    ///
    /// The new log is written beside the old one and renamed over it, so a
    /// crash during compaction leaves the previous log intact.
    pub fn compact(&self) -> StoreResult<()> {
        let mut inner = self.write()?;
        let tmp_path = self.path.with_extension("compact");

        let mut tmp = BufWriter::new(File::create(&tmp_path)?);
        let mut written: u64 = 0;
        for (key, v) in inner.table.iter() {
            let frame = encode_frame(&LogRecord::Put {
                key: key.clone(),
                value: v.value.clone(),
                version: v.version,
            })?;
            tmp.write_all(&frame)?;
            written += frame.len() as u64;
        }
        let sequence = inner.table.next_version() - 1;
        if sequence > 0 {
            let frame = encode_frame(&LogRecord::Checkpoint { sequence })?;
            tmp.write_all(&frame)?;
            written += frame.len() as u64;
        }
        tmp.flush()?;
        tmp.get_ref().sync_all()?;
        drop(tmp);

        inner.log.writer.flush()?;
        fs::rename(&tmp_path, &self.path)?;
        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        let before = inner.log.offset;
        inner.log = LogWriter {
            writer: BufWriter::new(file),
            offset: written,
        };

        info!(before, after = written, "state log compacted");
        Ok(())
    }

    fn append(&self, log: &mut LogWriter, record: &LogRecord) -> StoreResult<()> {
        let frame = encode_frame(record)?;
        if let Err(e) = self.write_frame(log, &frame) {
            warn!(offset = log.offset, error = %e, "state log append failed; rolling back");
            self.reset_log(log)?;
            return Err(e.into());
        }
        debug!(offset = log.offset, len = frame.len(), "state log append");
        log.offset += frame.len() as u64;
        Ok(())
    }

    fn write_frame(&self, log: &mut LogWriter, frame: &[u8]) -> io::Result<()> {
        log.writer.write_all(frame)?;
        log.writer.flush()?;
        if matches!(self.config.sync_mode, SyncMode::EveryWrite) {
            log.writer.get_ref().sync_all()?;
        }
        Ok(())
    }

    /// Drop whatever a failed append left buffered or half-written, so the
    /// log ends at the last acknowledged frame again.
    fn reset_log(&self, log: &mut LogWriter) -> StoreResult<()> {
        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        let stale = std::mem::replace(&mut log.writer, BufWriter::new(file));
        // into_parts hands back the buffer without flushing it.
        let (_, _unwritten) = stale.into_parts();
        log.writer.get_ref().set_len(log.offset)?;
        Ok(())
    }

    fn put_locked(&self, inner: &mut FileInner, key: &str, value: &[u8]) -> StoreResult<()> {
        let version = inner.table.next_version();
        self.append(
            &mut inner.log,
            &LogRecord::Put {
                key: key.to_string(),
                value: value.to_vec(),
                version,
            },
        )?;
        inner.table.put(key, value.to_vec());
        Ok(())
    }

    fn delete_locked(&self, inner: &mut FileInner, key: &str) -> StoreResult<()> {
        if inner.table.get(key).is_none() {
            return Ok(());
        }
        let sequence = inner.table.next_version();
        self.append(
            &mut inner.log,
            &LogRecord::Delete {
                key: key.to_string(),
                sequence,
            },
        )?;
        inner.table.delete(key);
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, FileInner>> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, FileInner>> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl WorldState for FileWorldState {
    fn get_versioned(&self, key: &str) -> StoreResult<Option<Versioned>> {
        Ok(self.read()?.table.get(key).cloned())
    }

    fn put_state(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut inner = self.write()?;
        self.put_locked(&mut inner, key, value)
    }

    fn delete_state(&self, key: &str) -> StoreResult<()> {
        let mut inner = self.write()?;
        self.delete_locked(&mut inner, key)
    }

    fn range(&self, start: &str, end: &str) -> StoreResult<StateIterator> {
        let snapshot = self.read()?.table.snapshot_range(start, end)?;
        Ok(StateIterator::from_snapshot(snapshot, self.cursors.open()))
    }

    fn put_if_version(
        &self,
        key: &str,
        expected: Option<Version>,
        value: &[u8],
    ) -> StoreResult<CasOutcome> {
        let mut inner = self.write()?;
        let current = inner.table.version_of(key);
        if current != expected {
            return Ok(CasOutcome::Conflict { current });
        }
        self.put_locked(&mut inner, key, value)?;
        Ok(CasOutcome::Applied)
    }

    fn delete_if_version(&self, key: &str, expected: Option<Version>) -> StoreResult<CasOutcome> {
        let mut inner = self.write()?;
        let current = inner.table.version_of(key);
        if current != expected {
            return Ok(CasOutcome::Conflict { current });
        }
        self.delete_locked(&mut inner, key)?;
        Ok(CasOutcome::Applied)
    }
}

impl std::fmt::Debug for FileWorldState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWorldState")
            .field("path", &self.path)
            .field("config", &self.config)
            .finish()
    }
}

fn encode_frame(record: &LogRecord) -> StoreResult<Vec<u8>> {
    let payload =
        bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len())
        .map_err(|_| StoreError::Serialization("log record exceeds 4 GiB".into()))?;
    let crc = crc32fast::hash(&payload);

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Replay the log at `path`.
///
/// Returns the rebuilt table and the length of the readable prefix of the
/// file. Frames failing the CRC check are skipped; an impossible length or a
/// truncated frame ends recovery.
fn recover(path: &Path) -> StoreResult<(StateTable, u64)> {
    let mut reader = BufReader::new(File::open(path)?);
    let file_len = reader.get_ref().metadata()?.len();
    let mut table = StateTable::default();
    let mut offset: u64 = 0;
    let mut replayed = 0usize;

    while offset + HEADER_SIZE as u64 <= file_len {
        let mut header = [0u8; HEADER_SIZE];
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }

        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if length == 0 || offset + HEADER_SIZE as u64 + length as u64 > file_len {
            warn!(offset, length, file_len, "invalid state log frame length; stopping recovery");
            break;
        }

        let mut payload = vec![0u8; length as usize];
        match reader.read_exact(&mut payload) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                warn!(offset, "truncated state log frame; stopping recovery");
                break;
            }
            Err(e) => return Err(e.into()),
        }
        let frame_end = offset + HEADER_SIZE as u64 + length as u64;

        let actual_crc = crc32fast::hash(&payload);
        if actual_crc != expected_crc {
            warn!(
                offset,
                expected = expected_crc,
                actual = actual_crc,
                "CRC mismatch; skipping state log frame"
            );
            offset = frame_end;
            continue;
        }

        match bincode::deserialize::<LogRecord>(&payload) {
            Ok(LogRecord::Put {
                key,
                value,
                version,
            }) => table.restore_put(key, value, version),
            Ok(LogRecord::Delete { key, sequence }) => table.restore_delete(&key, sequence),
            Ok(LogRecord::Checkpoint { sequence }) => table.advance_sequence(sequence),
            Err(e) => {
                warn!(offset, error = %e, "failed to decode state log frame; skipping");
            }
        }
        replayed += 1;
        offset = frame_end;
    }

    debug!(replayed, keys = table.len(), "state log replay complete");
    Ok((table, offset))
}
