use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::entry::{EntryType, Operation, WalEntry};
use crate::error::WalError;

/// Append-only, strictly sequenced WAL (`spec.md` §4.7). Entries are kept
/// in memory for replay and, when a log path is configured, mirrored to an
/// append-only file as newline-delimited JSON — one `fs::write`-style
/// append per entry, matching the file adapter's write-then-fsync-free
/// simplicity rather than the teacher's column-family log.
pub struct WalManager {
    entries: Mutex<Vec<WalEntry>>,
    next_sequence: AtomicU64,
    log_file: Option<Mutex<File>>,
}

impl WalManager {
    pub fn in_memory() -> Self {
        WalManager { entries: Mutex::new(Vec::new()), next_sequence: AtomicU64::new(1), log_file: None }
    }

    pub fn with_log_file(path: impl Into<PathBuf>) -> Result<Self, WalError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).read(true).open(&path)?;
        let mut manager = WalManager { entries: Mutex::new(Vec::new()), next_sequence: AtomicU64::new(1), log_file: Some(Mutex::new(file)) };
        manager.replay(&path)?;
        Ok(manager)
    }

    fn replay(&mut self, path: &PathBuf) -> Result<(), WalError> {
        let file = File::open(path)?;
        let mut max_seq = 0;
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: WalEntry = serde_json::from_str(&line)?;
            max_seq = max_seq.max(entry.sequence_number);
            entries.push(entry);
        }
        *self.entries.get_mut().unwrap() = entries;
        self.next_sequence = AtomicU64::new(max_seq + 1);
        Ok(())
    }

    pub fn append(
        &self,
        transaction_id: &str,
        entry_type: EntryType,
        collection_name: &str,
        operation: Operation,
        data: Vec<u8>,
    ) -> Result<WalEntry, WalError> {
        let sequence_number = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let timestamp_millis = now_millis();
        let checksum = WalEntry::checksum_input(
            transaction_id,
            sequence_number,
            timestamp_millis,
            entry_type,
            collection_name,
            operation,
            &data,
        );
        let entry = WalEntry {
            transaction_id: transaction_id.to_string(),
            sequence_number,
            timestamp_millis,
            entry_type,
            collection_name: collection_name.to_string(),
            operation,
            data,
            checksum,
        };

        if let Some(file) = &self.log_file {
            let mut file = file.lock().unwrap();
            let line = serde_json::to_string(&entry)?;
            writeln!(file, "{line}")?;
            file.flush()?;
        }
        self.entries.lock().unwrap().push(entry.clone());
        tracing::debug!(tx = transaction_id, seq = sequence_number, ?entry_type, "wal append");
        Ok(entry)
    }

    /// Every entry ever appended, in sequence order.
    pub fn entries(&self) -> Vec<WalEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// All entries belonging to one transaction, in sequence order.
    pub fn entries_for(&self, transaction_id: &str) -> Vec<WalEntry> {
        self.entries.lock().unwrap().iter().filter(|e| e.transaction_id == transaction_id).cloned().collect()
    }
}

fn now_millis() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}
