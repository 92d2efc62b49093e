use std::sync::Arc;

use anchor_storage::{Store, StoreError, StoreIterator, StoreProvider, Tag, TagExpr};
use anchor_types::{LogEntry, LogEntryStatus};
use base64::Engine;
use tokio::sync::Mutex;

use crate::{store_names, AnchorStoreError};

const LOG_TAG: &str = "log";
const INDEX_TAG: &str = "index";
const STATUS_TAG: &str = "status";

/// Append-only record of witnessed entries per VCT log, identified by
/// `(log_url, index)`. Leaf inputs are immutable; the only status
/// transition is the bulk `Success -> Failed` flip.
#[derive(Debug, Clone)]
pub struct LogEntryStore {
    store: Arc<dyn Store>,
    // Serializes index allocation in `append` across this handle and
    // its clones; without it two concurrent appends read the same next
    // index and one leaf overwrites the other.
    append_lock: Arc<Mutex<()>>,
}

impl LogEntryStore {
    pub async fn new(provider: &dyn StoreProvider) -> Result<Self, AnchorStoreError> {
        let store = provider.open_store(store_names::LOG_ENTRY).await?;
        Ok(Self {
            store,
            append_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Appends a single leaf at the next free index of the log and
    /// returns that index. Index allocation and the write are one
    /// atomic step.
    pub async fn append(
        &self,
        log_url: &str,
        leaf_input: Vec<u8>,
    ) -> Result<u64, AnchorStoreError> {
        let _guard = self.append_lock.lock().await;

        let index = self.next_index(log_url).await?;
        let entry = LogEntry {
            index,
            leaf_input,
            status: LogEntryStatus::Success,
        };
        self.put_entry(log_url, &entry).await?;
        Ok(index)
    }

    /// Stores the entries of the index range `[start, end]`. The range
    /// size must match the number of entries exactly.
    pub async fn store_log_entries(
        &self,
        log_url: &str,
        start: u64,
        end: u64,
        leaf_inputs: Vec<Vec<u8>>,
    ) -> Result<(), AnchorStoreError> {
        let expected = (end.saturating_sub(start) + 1) as usize;
        if end < start || leaf_inputs.len() != expected {
            return Err(AnchorStoreError::EntryCountMismatch {
                got: leaf_inputs.len(),
                expected,
            });
        }

        for (offset, leaf_input) in leaf_inputs.into_iter().enumerate() {
            let index = start + offset as u64;
            let entry = LogEntry {
                index,
                leaf_input,
                status: LogEntryStatus::Success,
            };
            self.put_entry(log_url, &entry).await?;
        }
        Ok(())
    }

    /// Successful entries of the log, ascending by index.
    pub async fn get_log_entries(
        &self,
        log_url: &str,
    ) -> Result<LogEntryIterator, AnchorStoreError> {
        self.query_entries(log_url, LogEntryStatus::Success, 0).await
    }

    /// Successful entries with index `>= from_index`.
    pub async fn get_log_entries_from(
        &self,
        log_url: &str,
        from_index: u64,
    ) -> Result<LogEntryIterator, AnchorStoreError> {
        self.query_entries(log_url, LogEntryStatus::Success, from_index)
            .await
    }

    /// Failed entries of the log, ascending by index.
    pub async fn get_failed_log_entries(
        &self,
        log_url: &str,
    ) -> Result<LogEntryIterator, AnchorStoreError> {
        self.query_entries(log_url, LogEntryStatus::Failed, 0).await
    }

    /// Flips every successful entry with index `>= from_index` to
    /// failed, e.g. after detecting an inconsistency with the log's
    /// signed tree head. Leaf inputs are preserved.
    pub async fn fail_log_entries_from(
        &self,
        log_url: &str,
        from_index: u64,
    ) -> Result<usize, AnchorStoreError> {
        let mut iter = self
            .query_entries(log_url, LogEntryStatus::Success, from_index)
            .await?;

        let mut to_fail = Vec::new();
        while let Some(entry) = iter.next().await? {
            to_fail.push(entry);
        }
        iter.close()?;

        let flipped = to_fail.len();
        for mut entry in to_fail {
            entry.status = LogEntryStatus::Failed;
            self.put_entry(log_url, &entry).await?;
        }

        if flipped > 0 {
            tracing::warn!("Marked {flipped} log entries of [{log_url}] as failed");
        }
        Ok(flipped)
    }

    /// The index the next appended entry will receive.
    pub async fn next_index(&self, log_url: &str) -> Result<u64, AnchorStoreError> {
        let mut iter = self
            .store
            .query(&[TagExpr::equals(LOG_TAG, encode_log_url(log_url))])
            .await?;

        let mut next = 0;
        while let Some(record) = iter.next().await? {
            let entry: LogEntry = serde_json::from_slice(&record.value)
                .map_err(|e| AnchorStoreError::Corrupted(e.to_string()))?;
            next = next.max(entry.index + 1);
        }
        iter.close()?;
        Ok(next)
    }

    async fn put_entry(&self, log_url: &str, entry: &LogEntry) -> Result<(), AnchorStoreError> {
        let key = entry_key(log_url, entry.index);
        let bytes = serde_json::to_vec(entry)
            .map_err(|e| AnchorStoreError::Corrupted(e.to_string()))?;

        self.store
            .put(
                &key,
                &bytes,
                &[
                    Tag::new(LOG_TAG, encode_log_url(log_url)),
                    Tag::new(INDEX_TAG, entry.index.to_string()),
                    Tag::new(STATUS_TAG, entry.status.as_str()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn query_entries(
        &self,
        log_url: &str,
        status: LogEntryStatus,
        from_index: u64,
    ) -> Result<LogEntryIterator, AnchorStoreError> {
        let iter = self
            .store
            .query(&[
                TagExpr::equals(LOG_TAG, encode_log_url(log_url)),
                TagExpr::equals(STATUS_TAG, status.as_str()),
            ])
            .await?;

        Ok(LogEntryIterator {
            inner: iter,
            from_index,
        })
    }
}

/// Iterator over log entries, ascending by index.
pub struct LogEntryIterator {
    inner: Box<dyn StoreIterator>,
    from_index: u64,
}

impl LogEntryIterator {
    pub async fn next(&mut self) -> Result<Option<LogEntry>, AnchorStoreError> {
        while let Some(record) = self.inner.next().await? {
            let entry: LogEntry = serde_json::from_slice(&record.value)
                .map_err(|e| AnchorStoreError::Corrupted(e.to_string()))?;
            if entry.index >= self.from_index {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    pub fn total_items(&self) -> usize {
        self.inner.total_items()
    }

    pub fn close(&mut self) -> Result<(), StoreError> {
        self.inner.close()
    }
}

/// Entries sort by key within a log; the zero-padded index keeps the
/// lexicographic and numeric orders aligned.
fn entry_key(log_url: &str, index: u64) -> String {
    format!("{}|{index:020}", encode_log_url(log_url))
}

fn encode_log_url(log_url: &str) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(log_url.to_lowercase())
}
