//! # Town Journal
//!
//! **Append-only on-device persistence for the local store.**
//!
//! Every store mutation is appended as one record. On startup the records
//! are folded back into the last snapshot and queue. A checkpoint rewrites
//! the file so it holds only the current snapshot and queue.
//!
//! ## Guarantees
//!
//! 1. **Integrity**: every record carries a CRC32; a bad record ends recovery
//! 2. **Prefix recovery**: a torn tail is cut off, earlier records survive
//! 3. **Atomic compaction**: checkpoints are written aside and renamed over
//!
//! ## Format
//!
//! ```text
//! [4 bytes: magic "FTJL"]
//! [4 bytes: version]
//! [8 bytes: next LSN at last checkpoint]
//!
//! Record format:
//! [8 bytes: LSN (Log Sequence Number)]
//! [1 byte: record kind (QUEUE/DEQUEUE/SNAPSHOT/SESSION/ECONOMY)]
//! [4 bytes: payload length]
//! [N bytes: payload (JSON)]
//! [4 bytes: CRC32 of above]
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use focustown_core::{ResourceDelta, SessionEntry, Timestamp, TownState};

use crate::error::{JournalError, JournalResult};
use crate::queue::QueuedCommand;

/// Magic bytes identifying a journal file.
const JOURNAL_MAGIC: &[u8; 4] = b"FTJL";

/// Current journal format version.
const JOURNAL_VERSION: u32 = 1;

const HEADER_LEN: usize = 16;

/// LSN + kind + length.
const RECORD_PREFIX_LEN: usize = 8 + 1 + 4;

const CRC_LEN: usize = 4;

/// Journal record kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordKind {
    /// Insert or replace a queue entry.
    Queue = 1,
    /// Remove acknowledged queue entries.
    Dequeue = 2,
    /// Replace the town snapshot.
    Snapshot = 3,
    /// A completed focus session.
    SessionLog = 4,
    /// Resource change caused by a command.
    EconomyLog = 5,
}

impl RecordKind {
    /// Converts from u8.
    const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Queue),
            2 => Some(Self::Dequeue),
            3 => Some(Self::Snapshot),
            4 => Some(Self::SessionLog),
            5 => Some(Self::EconomyLog),
            _ => None,
        }
    }
}

/// The single persisted town snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRow {
    /// Mirrors `town.version`.
    pub version: u64,
    /// When the row was written.
    pub updated_at: Timestamp,
    /// The town itself.
    pub town: TownState,
}

/// One line of the economy history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomyEntry {
    /// When the command was applied.
    pub created_at: Timestamp,
    /// Command type tag, e.g. `PLACE_BUILDING`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Resource change.
    pub delta: ResourceDelta,
    /// Free-form note; the command id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Everything folded back out of a journal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecoveredState {
    /// Last snapshot written.
    pub snapshot: Option<SnapshotRow>,
    /// Queue entries in their original order.
    pub queue: Vec<QueuedCommand>,
    /// Completed sessions since the last checkpoint.
    pub sessions: Vec<SessionEntry>,
    /// Economy history since the last checkpoint.
    pub economy: Vec<EconomyEntry>,
    /// Records read.
    pub records: usize,
    /// True if a damaged tail was cut off.
    pub truncated: bool,
}

impl RecoveredState {
    fn fold(&mut self, kind: RecordKind, payload: &[u8]) -> JournalResult<()> {
        match kind {
            RecordKind::Queue => {
                let entry: QueuedCommand = decode(payload)?;
                match self.queue.iter_mut().find(|e| e.command.id == entry.command.id) {
                    Some(existing) => *existing = entry,
                    None => self.queue.push(entry),
                }
            }
            RecordKind::Dequeue => {
                let ids: Vec<String> = decode(payload)?;
                self.queue.retain(|entry| !ids.contains(&entry.command.id));
            }
            RecordKind::Snapshot => self.snapshot = Some(decode(payload)?),
            RecordKind::SessionLog => self.sessions.push(decode(payload)?),
            RecordKind::EconomyLog => self.economy.push(decode(payload)?),
        }
        self.records += 1;
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(payload: &[u8]) -> JournalResult<T> {
    Ok(serde_json::from_slice(payload)?)
}

fn encode_header(next_lsn: u64) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[0..4].copy_from_slice(JOURNAL_MAGIC);
    header[4..8].copy_from_slice(&JOURNAL_VERSION.to_le_bytes());
    header[8..16].copy_from_slice(&next_lsn.to_le_bytes());
    header
}

fn encode_record(lsn: u64, kind: RecordKind, payload: &[u8]) -> JournalResult<Vec<u8>> {
    let len = u32::try_from(payload.len())
        .map_err(|_| JournalError::Corrupt(format!("payload of {} bytes", payload.len())))?;

    let mut buf = Vec::with_capacity(RECORD_PREFIX_LEN + payload.len() + CRC_LEN);
    buf.extend_from_slice(&lsn.to_le_bytes());
    buf.push(kind as u8);
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(payload);

    let crc = crc32fast::hash(&buf);
    buf.extend_from_slice(&crc.to_le_bytes());
    Ok(buf)
}

/// A record decoded from a byte buffer.
struct RawRecord<'a> {
    lsn: u64,
    kind: RecordKind,
    payload: &'a [u8],
    /// Bytes consumed, including the CRC.
    len: usize,
}

/// Decodes one record at the start of `buf`, or `None` if it is torn or damaged.
fn decode_record(buf: &[u8]) -> Option<RawRecord<'_>> {
    let prefix = buf.get(..RECORD_PREFIX_LEN)?;
    let lsn = u64::from_le_bytes(prefix[0..8].try_into().ok()?);
    let kind = RecordKind::from_u8(prefix[8])?;
    let payload_len = usize::try_from(u32::from_le_bytes(prefix[9..13].try_into().ok()?)).ok()?;

    let body_end = RECORD_PREFIX_LEN.checked_add(payload_len)?;
    let total = body_end.checked_add(CRC_LEN)?;
    let body = buf.get(..body_end)?;
    let stored_crc = u32::from_le_bytes(buf.get(body_end..total)?.try_into().ok()?);
    if crc32fast::hash(body) != stored_crc {
        return None;
    }

    Some(RawRecord {
        lsn,
        kind,
        payload: &body[RECORD_PREFIX_LEN..],
        len: total,
    })
}

/// Append-only journal file.
pub struct Journal {
    path: PathBuf,
    next_lsn: u64,
    appended: u32,
    file: BufWriter<File>,
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("path", &self.path)
            .field("next_lsn", &self.next_lsn)
            .field("appended", &self.appended)
            .finish_non_exhaustive()
    }
}

impl Journal {
    /// Opens or creates a journal and recovers its contents.
    ///
    /// A damaged or torn tail is cut off so later appends follow the last
    /// good record.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors, a foreign file, or an unsupported version.
    pub fn open(path: impl AsRef<Path>) -> JournalResult<(Self, RecoveredState)> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        if bytes.is_empty() {
            file.write_all(&encode_header(0))?;
            file.flush()?;
            tracing::info!(path = %path.display(), "created journal");
            let journal = Self {
                path,
                next_lsn: 0,
                appended: 0,
                file: BufWriter::new(file),
            };
            return Ok((journal, RecoveredState::default()));
        }

        let (recovered, next_lsn, good_len) = Self::recover(&bytes)?;
        if good_len < bytes.len() {
            tracing::warn!(
                path = %path.display(),
                kept = good_len,
                dropped = bytes.len() - good_len,
                "journal tail damaged, truncating"
            );
            file.set_len(u64::try_from(good_len).unwrap_or(u64::MAX))?;
        }
        file.seek(SeekFrom::End(0))?;

        tracing::info!(
            path = %path.display(),
            records = recovered.records,
            queued = recovered.queue.len(),
            has_snapshot = recovered.snapshot.is_some(),
            "recovered journal"
        );

        let journal = Self {
            path,
            next_lsn,
            appended: u32::try_from(recovered.records).unwrap_or(u32::MAX),
            file: BufWriter::new(file),
        };
        Ok((journal, recovered))
    }

    /// Folds a journal image, returning the state, the next LSN and the
    /// length of the valid prefix.
    fn recover(bytes: &[u8]) -> JournalResult<(RecoveredState, u64, usize)> {
        let header = bytes
            .get(..HEADER_LEN)
            .ok_or_else(|| JournalError::Corrupt("truncated header".to_string()))?;
        if &header[0..4] != JOURNAL_MAGIC {
            return Err(JournalError::Corrupt("invalid journal magic".to_string()));
        }
        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != JOURNAL_VERSION {
            return Err(JournalError::UnsupportedVersion(version));
        }
        let mut lsn_bytes = [0u8; 8];
        lsn_bytes.copy_from_slice(&header[8..16]);
        let mut next_lsn = u64::from_le_bytes(lsn_bytes);

        let mut recovered = RecoveredState::default();
        let mut offset = HEADER_LEN;

        while offset < bytes.len() {
            let Some(record) = decode_record(&bytes[offset..]) else {
                recovered.truncated = true;
                break;
            };
            if let Err(err) = recovered.fold(record.kind, record.payload) {
                tracing::warn!(lsn = record.lsn, error = %err, "undecodable journal record");
                recovered.truncated = true;
                break;
            }
            next_lsn = next_lsn.max(record.lsn.saturating_add(1));
            offset += record.len;
        }

        Ok((recovered, next_lsn, offset))
    }

    /// Path of the journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended since the last checkpoint.
    #[must_use]
    pub const fn records_since_checkpoint(&self) -> u32 {
        self.appended
    }

    fn append<T: Serialize + ?Sized>(&mut self, kind: RecordKind, value: &T) -> JournalResult<u64> {
        let payload = serde_json::to_vec(value)?;
        let lsn = self.next_lsn;
        let record = encode_record(lsn, kind, &payload)?;

        self.file.write_all(&record)?;
        self.file.flush()?;

        self.next_lsn = self.next_lsn.saturating_add(1);
        self.appended = self.appended.saturating_add(1);
        Ok(lsn)
    }

    /// Records a queue entry, replacing any earlier entry with the same id.
    ///
    /// # Errors
    ///
    /// Fails on I/O or encoding errors.
    pub fn append_queue(&mut self, entry: &QueuedCommand) -> JournalResult<u64> {
        self.append(RecordKind::Queue, entry)
    }

    /// Records removal of acknowledged ids.
    ///
    /// # Errors
    ///
    /// Fails on I/O or encoding errors.
    pub fn append_dequeue(&mut self, ids: &[String]) -> JournalResult<u64> {
        self.append(RecordKind::Dequeue, ids)
    }

    /// Records the current town snapshot.
    ///
    /// # Errors
    ///
    /// Fails on I/O or encoding errors.
    pub fn append_snapshot(&mut self, town: &TownState, updated_at: Timestamp) -> JournalResult<u64> {
        let row = SnapshotRow {
            version: town.version,
            updated_at,
            town: town.clone(),
        };
        self.append(RecordKind::Snapshot, &row)
    }

    /// Records a completed session.
    ///
    /// # Errors
    ///
    /// Fails on I/O or encoding errors.
    pub fn append_session(&mut self, entry: &SessionEntry) -> JournalResult<u64> {
        self.append(RecordKind::SessionLog, entry)
    }

    /// Records a resource change.
    ///
    /// # Errors
    ///
    /// Fails on I/O or encoding errors.
    pub fn append_economy(&mut self, entry: &EconomyEntry) -> JournalResult<u64> {
        self.append(RecordKind::EconomyLog, entry)
    }

    /// Forces appended records to disk.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors.
    pub fn sync(&mut self) -> JournalResult<()> {
        self.file.flush()?;
        self.file.get_ref().sync_all()?;
        Ok(())
    }

    /// Rewrites the journal to hold only `town` and `queue`.
    ///
    /// The new image is written next to the journal and renamed over it, so a
    /// crash leaves either the old or the new file intact. Session and economy
    /// history before the checkpoint is dropped.
    ///
    /// # Errors
    ///
    /// Fails on I/O or encoding errors; the old journal stays in use.
    pub fn checkpoint(
        &mut self,
        town: &TownState,
        updated_at: Timestamp,
        queue: &[QueuedCommand],
    ) -> JournalResult<()> {
        let mut lsn = self.next_lsn;
        let mut image = Vec::new();
        image.extend_from_slice(&encode_header(lsn));

        let row = SnapshotRow {
            version: town.version,
            updated_at,
            town: town.clone(),
        };
        image.extend(encode_record(lsn, RecordKind::Snapshot, &serde_json::to_vec(&row)?)?);
        lsn += 1;
        for entry in queue {
            image.extend(encode_record(lsn, RecordKind::Queue, &serde_json::to_vec(entry)?)?);
            lsn += 1;
        }

        let staging = self.path.with_extension("ftj.tmp");
        {
            let mut out = File::create(&staging)?;
            out.write_all(&image)?;
            out.sync_all()?;
        }
        fs::rename(&staging, &self.path)?;

        let mut file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        file.seek(SeekFrom::End(0))?;
        self.file = BufWriter::new(file);

        let records = u32::try_from(queue.len() + 1).unwrap_or(u32::MAX);
        tracing::debug!(path = %self.path.display(), records, "journal checkpoint");
        self.next_lsn = lsn;
        self.appended = records;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focustown_core::{Command, CommandKind};

    fn entry(id: &str) -> QueuedCommand {
        QueuedCommand::pending(Command::new(
            id,
            0,
            CommandKind::ClaimProduction {
                building_id: "farm-1".to_string(),
            },
        ))
    }

    #[test]
    fn test_create_and_reopen_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("town.ftj");
        {
            let (_journal, recovered) = Journal::open(&path).unwrap();
            assert_eq!(recovered, RecoveredState::default());
        }
        assert_eq!(fs::metadata(&path).unwrap().len(), HEADER_LEN as u64);
        let (_journal, recovered) = Journal::open(&path).unwrap();
        assert_eq!(recovered.records, 0);
        assert!(!recovered.truncated);
    }

    #[test]
    fn test_queue_upsert_and_dequeue_fold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("town.ftj");
        {
            let (mut journal, _) = Journal::open(&path).unwrap();
            journal.append_queue(&entry("a")).unwrap();
            journal.append_queue(&entry("b")).unwrap();
            journal.append_queue(&entry("c")).unwrap();
            journal
                .append_queue(&QueuedCommand::rejected(entry("b").command, "task-missing"))
                .unwrap();
            journal.append_dequeue(&["a".to_string()]).unwrap();
            journal.append_snapshot(&TownState::initial(5), 9).unwrap();
        }

        let (journal, recovered) = Journal::open(&path).unwrap();
        let ids: Vec<_> = recovered.queue.iter().map(QueuedCommand::id).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(recovered.queue[0].error.as_deref(), Some("task-missing"));
        let snapshot = recovered.snapshot.unwrap();
        assert_eq!(snapshot.updated_at, 9);
        assert_eq!(snapshot.town, TownState::initial(5));
        assert_eq!(recovered.records, 6);
        assert_eq!(journal.records_since_checkpoint(), 6);
    }

    #[test]
    fn test_torn_tail_is_cut_off() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("town.ftj");
        {
            let (mut journal, _) = Journal::open(&path).unwrap();
            journal.append_queue(&entry("a")).unwrap();
            journal.append_queue(&entry("b")).unwrap();
        }
        let full = fs::metadata(&path).unwrap().len();
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(full - 3).unwrap();
        drop(file);

        {
            let (mut journal, recovered) = Journal::open(&path).unwrap();
            assert!(recovered.truncated);
            assert_eq!(recovered.queue.len(), 1);
            journal.append_queue(&entry("c")).unwrap();
        }

        let (_journal, recovered) = Journal::open(&path).unwrap();
        let ids: Vec<_> = recovered.queue.iter().map(QueuedCommand::id).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(!recovered.truncated);
    }

    #[test]
    fn test_flipped_byte_fails_crc() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("town.ftj");
        {
            let (mut journal, _) = Journal::open(&path).unwrap();
            journal.append_queue(&entry("a")).unwrap();
        }
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - CRC_LEN - 2;
        bytes[last] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();

        let (_journal, recovered) = Journal::open(&path).unwrap();
        assert!(recovered.truncated);
        assert!(recovered.queue.is_empty());
    }

    #[test]
    fn test_foreign_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("town.ftj");
        fs::write(&path, b"definitely not a journal").unwrap();
        assert!(matches!(Journal::open(&path), Err(JournalError::Corrupt(_))));

        let mut header = encode_header(0);
        header[4..8].copy_from_slice(&99u32.to_le_bytes());
        fs::write(&path, header).unwrap();
        assert!(matches!(
            Journal::open(&path),
            Err(JournalError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_checkpoint_compacts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("town.ftj");
        let town = TownState::initial(1);
        {
            let (mut journal, _) = Journal::open(&path).unwrap();
            for i in 0..20 {
                journal.append_snapshot(&town, i).unwrap();
            }
            journal
                .append_economy(&EconomyEntry {
                    created_at: 1,
                    kind: "PLACE_BUILDING".to_string(),
                    delta: ResourceDelta::default(),
                    note: None,
                })
                .unwrap();
            journal.checkpoint(&town, 50, &[entry("keep")]).unwrap();
            assert_eq!(journal.records_since_checkpoint(), 2);
            journal.append_dequeue(&["keep".to_string()]).unwrap();
        }

        let (_journal, recovered) = Journal::open(&path).unwrap();
        assert_eq!(recovered.records, 3);
        assert!(recovered.queue.is_empty());
        assert!(recovered.economy.is_empty());
        assert_eq!(recovered.snapshot.unwrap().updated_at, 50);
    }
}
