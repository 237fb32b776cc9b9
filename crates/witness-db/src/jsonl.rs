//! Append-mode JSON-lines journal.
//!
//! One [`JournalRecord`] per line, tagged by `"record"`. Lines are only ever
//! added. Each line goes to the file in a single unbuffered write; if the
//! write fails part-way the file is cut back to the last complete line, so
//! a record the caller saw fail never resurfaces on replay.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, error, info};

use witness_ledger::{Journal, JournalError};
use witness_types::JournalRecord;

use crate::error::DbError;

/// Where journal lines are written.
pub trait JournalSink: Write + Send {
    /// Cut the sink back to `len` bytes.
    fn truncate_to(&mut self, len: u64) -> std::io::Result<()>;
}

impl JournalSink for File {
    fn truncate_to(&mut self, len: u64) -> std::io::Result<()> {
        self.set_len(len)
    }
}

/// Sink plus the length of its last complete line.
#[derive(Debug)]
struct Tail<S> {
    sink: S,
    /// `None` once a failed write could not be rolled back.
    len: Option<u64>,
}

impl<S: JournalSink> Tail<S> {
    fn write_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        let Some(len) = self.len else {
            return Err(std::io::Error::other(
                "journal ends in a partial line; reopen it before writing",
            ));
        };
        let written = self.sink.write_all(line).and_then(|()| self.sink.flush());
        match written {
            Ok(()) => {
                self.len = u64::try_from(line.len()).ok().and_then(|n| len.checked_add(n));
                Ok(())
            }
            Err(e) => {
                self.len = self.sink.truncate_to(len).ok().map(|()| len);
                Err(e)
            }
        }
    }
}

/// Journal backed by a JSON-lines file.
#[derive(Debug)]
pub struct JsonlJournal<S = File> {
    path: PathBuf,
    tail: Mutex<Tail<S>>,
}

impl JsonlJournal {
    /// Open `path` for appending, creating it (and its directory) if needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DbError> {
        let path = path.into();
        let io_error = |source| DbError::Io {
            path: path.clone(),
            source,
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(io_error)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_error)?;
        let len = file.metadata().map_err(io_error)?.len();
        info!(path = %path.display(), bytes = len, "Journal opened");
        Ok(Self::with_sink(path, file, len))
    }
}

impl<S> JsonlJournal<S> {
    /// Journal writing to `sink`, which already holds `len` bytes of
    /// complete lines.
    pub fn with_sink(path: impl Into<PathBuf>, sink: S, len: u64) -> Self {
        Self {
            path: path.into(),
            tail: Mutex::new(Tail {
                sink,
                len: Some(len),
            }),
        }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<S: JournalSink> Journal for JsonlJournal<S> {
    fn append(&self, record: &JournalRecord) -> Result<(), JournalError> {
        // Encode first so a serialization failure writes nothing.
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let Ok(mut tail) = self.tail.lock() else {
            return Err(JournalError::LockPoisoned);
        };
        if let Err(e) = tail.write_line(&line) {
            error!(
                path = %self.path.display(),
                error = %e,
                rolled_back = tail.len.is_some(),
                "Journal write failed"
            );
            return Err(e.into());
        }
        debug!(path = %self.path.display(), bytes = line.len(), "Journal record written");
        Ok(())
    }
}

/// Read every record from a journal file, in order.
///
/// A missing file reads as an empty journal. Blank lines are skipped.
pub fn read_journal(path: impl AsRef<Path>) -> Result<Vec<JournalRecord>, DbError> {
    let path = path.as_ref();
    let io_error = |source| DbError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "No journal yet");
            return Ok(Vec::new());
        }
        Err(e) => return Err(io_error(e)),
    };

    let mut records = Vec::new();
    for (line, text) in (1..).zip(BufReader::new(file).lines()) {
        let text = text.map_err(io_error)?;
        if text.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&text).map_err(|source| DbError::Corrupt { line, source })?;
        records.push(record);
    }
    info!(path = %path.display(), records = records.len(), "Journal read");
    Ok(records)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use witness_types::{MeaningEntry, MeaningSource};

    use super::*;

    fn meaning(term: &str) -> JournalRecord {
        JournalRecord::Meaning(MeaningEntry::new(term, MeaningSource::Cultural, "a shared custom"))
    }

    /// In-memory sink that can be told to fail its next write half-way.
    #[derive(Debug, Default)]
    struct FlakySink {
        data: Vec<u8>,
        fail_next_write: bool,
        fail_truncate: bool,
    }

    impl Write for FlakySink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.fail_next_write {
                self.fail_next_write = false;
                self.data.extend_from_slice(&buf[..buf.len() / 2]);
                return Err(std::io::Error::other("disk full"));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl JournalSink for FlakySink {
        fn truncate_to(&mut self, len: u64) -> std::io::Result<()> {
            if self.fail_truncate {
                return Err(std::io::Error::other("read-only"));
            }
            self.data.truncate(usize::try_from(len).map_err(std::io::Error::other)?);
            Ok(())
        }
    }

    fn flaky(sink: FlakySink) -> JsonlJournal<FlakySink> {
        JsonlJournal::with_sink("memory.jsonl", sink, 0)
    }

    fn written(journal: &JsonlJournal<FlakySink>) -> Vec<JournalRecord> {
        let tail = journal.tail.lock().unwrap();
        String::from_utf8(tail.sink.data.clone())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_journal(dir.path().join("absent.jsonl")).unwrap().is_empty());
    }

    #[test]
    fn records_come_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("journal.jsonl");
        let journal = JsonlJournal::open(&path).unwrap();
        journal.append(&meaning("gift")).unwrap();
        journal.append(&meaning("visit")).unwrap();

        assert_eq!(read_journal(&path).unwrap(), vec![meaning("gift"), meaning("visit")]);
    }

    #[test]
    fn reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        JsonlJournal::open(&path).unwrap().append(&meaning("gift")).unwrap();
        JsonlJournal::open(&path).unwrap().append(&meaning("visit")).unwrap();
        assert_eq!(read_journal(&path).unwrap().len(), 2);
    }

    #[test]
    fn malformed_lines_are_located() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        let good = serde_json::to_string(&meaning("gift")).unwrap();
        std::fs::write(&path, format!("{good}\n\n{{\"record\":\"meaning\"\n")).unwrap();
        assert!(matches!(read_journal(&path), Err(DbError::Corrupt { line: 3, .. })));
    }

    #[test]
    fn failed_write_leaves_no_trace() {
        let journal = flaky(FlakySink::default());
        journal.append(&meaning("gift")).unwrap();

        journal.tail.lock().unwrap().sink.fail_next_write = true;
        assert!(matches!(
            journal.append(&meaning("rumour")),
            Err(JournalError::Io { .. })
        ));

        journal.append(&meaning("visit")).unwrap();
        assert_eq!(written(&journal), vec![meaning("gift"), meaning("visit")]);
    }

    #[test]
    fn unrecoverable_tail_refuses_further_writes() {
        let journal = flaky(FlakySink {
            fail_next_write: true,
            fail_truncate: true,
            ..FlakySink::default()
        });
        assert!(journal.append(&meaning("rumour")).is_err());
        assert!(journal.append(&meaning("visit")).is_err());
        assert_eq!(journal.tail.lock().unwrap().sink.data.iter().filter(|b| **b == b'\n').count(), 0);
    }
}
