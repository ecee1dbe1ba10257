//! File-based Write-Ahead Log implementation
//!
//! Stores WAL entries as JSON lines in append-only segment files with fsync for durability.
//! Supports automatic rotation, crash recovery, and cleanup of checkpointed segments.

use super::{LogEntry, LogSequenceNumber, WriteAheadLog};
use akidb_core::{CoreError, CoreResult};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Configuration for FileWAL
#[derive(Debug, Clone)]
pub struct FileWALConfig {
    /// Maximum segment size in bytes before rotation (default: 100MB)
    pub max_file_size_bytes: u64,

    /// fsync on every write (default: true)
    /// Set to false for higher throughput at the risk of losing the tail on power loss
    pub sync_on_write: bool,

    /// Number of fully checkpointed segments to keep (default: 10)
    pub retention_count: usize,
}

impl Default for FileWALConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 100 * 1024 * 1024,
            sync_on_write: true,
            retention_count: 10,
        }
    }
}

impl FileWALConfig {
    /// Validate configuration.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_file_size_bytes == 0 {
            return Err(CoreError::ValidationError(
                "wal max_file_size_bytes must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Active segment and the LSN counter, guarded together so file order
/// always matches LSN order.
struct SegmentWriter {
    file: BufWriter<File>,
    path: PathBuf,
    bytes_written: u64,
    current_lsn: LogSequenceNumber,
}

/// File-based WAL implementation
///
/// # File Format
/// - Filename: `wal-{lsn_hex}.log` where lsn_hex is the first LSN the segment may hold
/// - Content: JSON lines, one `(LSN, LogEntry)` tuple per line
///
/// # Crash Recovery
/// On startup, scans all segments to find the highest LSN and checkpoint LSN,
/// then opens a fresh segment for new appends.
pub struct FileWAL {
    dir: PathBuf,
    writer: Mutex<SegmentWriter>,
    checkpoint_lsn: RwLock<LogSequenceNumber>,
    config: FileWALConfig,
}

fn segment_path(dir: &Path, start: LogSequenceNumber) -> PathBuf {
    dir.join(format!("wal-{:016x}.log", start.value()))
}

fn parse_segment_start(path: &Path) -> Option<LogSequenceNumber> {
    if path.extension().map_or(true, |e| e != "log") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let hex = stem.strip_prefix("wal-")?;
    u64::from_str_radix(hex, 16).ok().map(LogSequenceNumber::new)
}

fn open_segment(path: &Path) -> CoreResult<BufWriter<File>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BufWriter::new(file))
}

impl FileWAL {
    /// Open (or create) a WAL in `dir`.
    ///
    /// # Errors
    /// Returns error if directory creation fails or existing segments cannot be read
    pub async fn new(dir: impl AsRef<Path>, config: FileWALConfig) -> CoreResult<Self> {
        config.validate()?;
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        let (current_lsn, checkpoint_lsn) = Self::recover_state(&dir).await?;

        let start = current_lsn
            .checked_next()
            .ok_or_else(|| CoreError::internal("WAL LSN space exhausted"))?;
        let path = segment_path(&dir, start);
        let file = open_segment(&path)?;

        tracing::debug!(
            dir = %dir.display(),
            current_lsn = current_lsn.value(),
            checkpoint_lsn = checkpoint_lsn.value(),
            "opened WAL"
        );

        Ok(Self {
            dir,
            writer: Mutex::new(SegmentWriter {
                file,
                path,
                bytes_written: 0,
                current_lsn,
            }),
            checkpoint_lsn: RwLock::new(checkpoint_lsn),
            config,
        })
    }

    /// Directory holding the segments.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Scan existing segments for the highest LSN and the latest checkpoint.
    async fn recover_state(dir: &Path) -> CoreResult<(LogSequenceNumber, LogSequenceNumber)> {
        let mut max_lsn = LogSequenceNumber::ZERO;
        let mut checkpoint_lsn = LogSequenceNumber::ZERO;

        for (start, path) in Self::list_segments(dir).await? {
            // An empty segment still proves every LSN before its start was assigned.
            let floor = start.prev();
            if floor > max_lsn {
                max_lsn = floor;
            }

            let reader = BufReader::new(File::open(&path)?);
            for line in reader.lines() {
                let line = line?;
                let Ok((lsn, entry)) = serde_json::from_str::<(LogSequenceNumber, LogEntry)>(&line)
                else {
                    continue;
                };
                if lsn > max_lsn {
                    max_lsn = lsn;
                }
                if let LogEntry::Checkpoint {
                    lsn: checkpoint, ..
                } = entry
                {
                    if checkpoint > checkpoint_lsn {
                        checkpoint_lsn = checkpoint;
                    }
                }
            }
        }

        Ok((max_lsn, checkpoint_lsn))
    }

    /// All segments in the directory, sorted by starting LSN.
    async fn list_segments(dir: &Path) -> CoreResult<Vec<(LogSequenceNumber, PathBuf)>> {
        let mut segments = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Some(start) = parse_segment_start(&path) {
                segments.push((start, path));
            }
        }

        segments.sort_by_key(|(start, _)| *start);
        Ok(segments)
    }

    fn rotate_locked(&self, writer: &mut SegmentWriter) -> CoreResult<()> {
        writer.file.flush()?;
        writer.file.get_ref().sync_all()?;

        // Name the new segment after the first LSN it will contain.
        let start = writer
            .current_lsn
            .checked_next()
            .ok_or_else(|| CoreError::internal("WAL LSN space exhausted"))?;
        let path = segment_path(&self.dir, start);
        writer.file = open_segment(&path)?;
        writer.path = path;
        writer.bytes_written = 0;

        tracing::debug!(segment_start = start.value(), "rotated WAL segment");
        Ok(())
    }

    /// Delete segments that lie entirely at or below `checkpoint_lsn`,
    /// keeping the newest `retention_count` of them.
    async fn cleanup_old_files(&self, checkpoint_lsn: LogSequenceNumber) -> CoreResult<usize> {
        let active = self.writer.lock().path.clone();
        let segments = Self::list_segments(&self.dir).await?;

        let covered: Vec<&PathBuf> = segments
            .windows(2)
            .filter(|pair| pair[1].0.value() <= checkpoint_lsn.value().saturating_add(1))
            .map(|pair| &pair[0].1)
            .filter(|path| **path != active)
            .collect();

        let to_delete = covered.len().saturating_sub(self.config.retention_count);
        for path in covered.iter().take(to_delete) {
            tokio::fs::remove_file(path).await?;
        }

        if to_delete > 0 {
            tracing::debug!(
                deleted = to_delete,
                checkpoint_lsn = checkpoint_lsn.value(),
                "removed checkpointed WAL segments"
            );
        }
        Ok(to_delete)
    }

    /// Number of segment files currently on disk.
    pub async fn segment_count(&self) -> CoreResult<usize> {
        Ok(Self::list_segments(&self.dir).await?.len())
    }
}

#[async_trait]
impl WriteAheadLog for FileWAL {
    async fn append(&self, entry: LogEntry) -> CoreResult<LogSequenceNumber> {
        let mut writer = self.writer.lock();

        let lsn = writer
            .current_lsn
            .checked_next()
            .ok_or_else(|| CoreError::internal("WAL LSN space exhausted"))?;

        let json = serde_json::to_string(&(lsn, &entry))?;
        writeln!(writer.file, "{}", json)?;
        writer.file.flush()?;
        if self.config.sync_on_write {
            writer.file.get_ref().sync_all()?;
        }

        writer.current_lsn = lsn;
        writer.bytes_written += json.len() as u64 + 1;

        if writer.bytes_written >= self.config.max_file_size_bytes {
            self.rotate_locked(&mut writer)?;
        }

        Ok(lsn)
    }

    async fn replay(
        &self,
        from_lsn: LogSequenceNumber,
    ) -> CoreResult<Vec<(LogSequenceNumber, LogEntry)>> {
        self.writer.lock().file.flush()?;

        let segments = Self::list_segments(&self.dir).await?;
        let mut entries = Vec::new();

        for (i, (_, path)) in segments.iter().enumerate() {
            // Skip segments whose successor starts at or below from_lsn.
            if let Some((next_start, _)) = segments.get(i + 1) {
                if *next_start <= from_lsn {
                    continue;
                }
            }

            let reader = BufReader::new(File::open(path)?);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<(LogSequenceNumber, LogEntry)>(&line) {
                    Ok((lsn, entry)) => {
                        if lsn >= from_lsn {
                            entries.push((lsn, entry));
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            segment = %path.display(),
                            error = %e,
                            "skipping unreadable WAL entry"
                        );
                    }
                }
            }
        }

        entries.sort_by_key(|(lsn, _)| *lsn);
        Ok(entries)
    }

    async fn checkpoint(&self, lsn: LogSequenceNumber) -> CoreResult<()> {
        {
            let mut checkpoint = self.checkpoint_lsn.write();
            if lsn <= *checkpoint {
                return Ok(());
            }
            *checkpoint = lsn;
        }

        self.append(LogEntry::Checkpoint {
            lsn,
            timestamp: chrono::Utc::now(),
        })
        .await?;

        self.cleanup_old_files(lsn).await?;
        Ok(())
    }

    async fn rotate(&self) -> CoreResult<()> {
        let mut writer = self.writer.lock();
        self.rotate_locked(&mut writer)
    }

    async fn current_lsn(&self) -> CoreResult<LogSequenceNumber> {
        Ok(self.writer.lock().current_lsn)
    }

    async fn checkpoint_lsn(&self) -> CoreResult<LogSequenceNumber> {
        Ok(*self.checkpoint_lsn.read())
    }

    async fn flush(&self) -> CoreResult<()> {
        let mut writer = self.writer.lock();
        writer.file.flush()?;
        writer.file.get_ref().sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use akidb_core::{CollectionId, DocumentId, VectorDocument};
    use tempfile::TempDir;

    fn upsert(i: usize) -> LogEntry {
        let doc = VectorDocument::new(DocumentId::new(), vec![i as f32]);
        LogEntry::upsert(CollectionId::new(), &doc)
    }

    async fn create_test_wal(config: FileWALConfig) -> (FileWAL, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let wal = FileWAL::new(temp_dir.path(), config).await.unwrap();
        (wal, temp_dir)
    }

    #[tokio::test]
    async fn test_file_wal_append_assigns_consecutive_lsns() {
        let (wal, _dir) = create_test_wal(FileWALConfig::default()).await;
        assert_eq!(wal.current_lsn().await.unwrap(), LogSequenceNumber::ZERO);

        assert_eq!(wal.append(upsert(0)).await.unwrap().value(), 1);
        assert_eq!(wal.append(upsert(1)).await.unwrap().value(), 2);
        assert_eq!(wal.current_lsn().await.unwrap().value(), 2);
    }

    #[tokio::test]
    async fn test_file_wal_replay_from_middle() {
        let (wal, _dir) = create_test_wal(FileWALConfig::default()).await;
        for i in 0..5 {
            wal.append(upsert(i)).await.unwrap();
        }

        let all = wal.replay(LogSequenceNumber::ZERO).await.unwrap();
        assert_eq!(all.len(), 5);
        for (i, (lsn, _)) in all.iter().enumerate() {
            assert_eq!(lsn.value(), (i + 1) as u64);
        }

        let tail = wal.replay(LogSequenceNumber::new(4)).await.unwrap();
        assert_eq!(tail.len(), 2);
    }

    #[tokio::test]
    async fn test_file_wal_crash_recovery() {
        let temp_dir = TempDir::new().unwrap();
        let dir_path = temp_dir.path().to_path_buf();

        {
            let wal = FileWAL::new(&dir_path, FileWALConfig::default())
                .await
                .unwrap();
            for i in 0..10 {
                wal.append(upsert(i)).await.unwrap();
            }
        }

        let wal = FileWAL::new(&dir_path, FileWALConfig::default())
            .await
            .unwrap();
        assert_eq!(wal.current_lsn().await.unwrap().value(), 10);
        assert_eq!(wal.replay(LogSequenceNumber::ZERO).await.unwrap().len(), 10);

        assert_eq!(wal.append(upsert(10)).await.unwrap().value(), 11);
    }

    #[tokio::test]
    async fn test_rotation_on_size() {
        let config = FileWALConfig {
            max_file_size_bytes: 256,
            sync_on_write: false,
            retention_count: 10,
        };
        let (wal, _dir) = create_test_wal(config).await;

        for i in 0..20 {
            wal.append(upsert(i)).await.unwrap();
        }

        assert!(wal.segment_count().await.unwrap() > 1);
        let entries = wal.replay(LogSequenceNumber::ZERO).await.unwrap();
        assert_eq!(entries.len(), 20);

        let tail = wal.replay(LogSequenceNumber::new(15)).await.unwrap();
        assert_eq!(tail.first().map(|(lsn, _)| lsn.value()), Some(15));
        assert_eq!(tail.len(), 6);
    }

    #[tokio::test]
    async fn test_checkpoint_removes_only_fully_covered_segments() {
        let config = FileWALConfig {
            max_file_size_bytes: u64::MAX,
            sync_on_write: false,
            retention_count: 0,
        };
        let (wal, _dir) = create_test_wal(config).await;

        for i in 0..3 {
            wal.append(upsert(i)).await.unwrap();
        }
        wal.rotate().await.unwrap();
        for i in 3..6 {
            wal.append(upsert(i)).await.unwrap();
        }
        wal.rotate().await.unwrap();

        // LSN 5 lives in the second segment, so only the first may go.
        wal.checkpoint(LogSequenceNumber::new(4)).await.unwrap();

        let remaining = wal.replay(LogSequenceNumber::ZERO).await.unwrap();
        let upserts: Vec<u64> = remaining
            .iter()
            .filter(|(_, e)| !e.is_checkpoint())
            .map(|(lsn, _)| lsn.value())
            .collect();
        assert_eq!(upserts, vec![4, 5, 6]);
        assert_eq!(
            wal.checkpoint_lsn().await.unwrap(),
            LogSequenceNumber::new(4)
        );
    }

    #[tokio::test]
    async fn test_checkpoint_survives_restart() {
        let temp_dir = TempDir::new().unwrap();
        {
            let wal = FileWAL::new(temp_dir.path(), FileWALConfig::default())
                .await
                .unwrap();
            for i in 0..4 {
                wal.append(upsert(i)).await.unwrap();
            }
            wal.checkpoint(LogSequenceNumber::new(3)).await.unwrap();
        }

        let wal = FileWAL::new(temp_dir.path(), FileWALConfig::default())
            .await
            .unwrap();
        assert_eq!(
            wal.checkpoint_lsn().await.unwrap(),
            LogSequenceNumber::new(3)
        );
        assert_eq!(wal.current_lsn().await.unwrap().value(), 5);
    }

    #[tokio::test]
    async fn test_corrupt_lines_are_skipped() {
        let (wal, dir) = create_test_wal(FileWALConfig::default()).await;
        wal.append(upsert(0)).await.unwrap();

        let segment = segment_path(dir.path(), LogSequenceNumber::new(1));
        let mut file = OpenOptions::new().append(true).open(&segment).unwrap();
        writeln!(file, "{{garbage").unwrap();
        drop(file);

        wal.append(upsert(1)).await.unwrap();
        assert_eq!(wal.replay(LogSequenceNumber::ZERO).await.unwrap().len(), 2);
    }
}
