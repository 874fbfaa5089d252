//! Per-`(project_id, iid)` state machine.
//!
//! One `Mutex<MrEntry>` per key inside a `RwLock<HashMap<..>>`: the outer
//! lock is only ever held long enough to find or insert an entry, so two
//! different MRs never contend on the same lock for their actual work.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use reviewbot_model::MergeRequestKey;

/// `Idle → Enqueued → Running(head_sha) → PostingComments → Completed |
/// Failed | Superseded`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Enqueued,
    Running { head_sha: String },
    PostingComments,
    Completed,
    Failed,
    Superseded,
}

#[derive(Debug, Default)]
struct MrEntry {
    state: RunState,
    /// Bumped every time a new run is admitted; a running task compares its
    /// own generation against this at each cooperative checkpoint.
    generation: u64,
    /// Per-file last-`head_sha` at which that file's touched-line set was
    /// reviewed, so incremental re-review can skip files unchanged since.
    reviewed_files: HashMap<String, String>,
}

impl Default for RunState {
    fn default() -> Self {
        RunState::Idle
    }
}

/// Handle returned by `MrStateTable::admit`. The holder uses it to observe
/// whether a newer event has superseded this run, and to record the
/// generation-gated state transitions of its work plan.
#[derive(Clone)]
pub struct RunTicket {
    entry: Arc<Mutex<MrEntry>>,
    generation: u64,
}

impl RunTicket {
    /// True while no newer run has been admitted for this key.
    pub async fn is_current(&self) -> bool {
        self.entry.lock().await.generation == self.generation
    }

    pub async fn mark_running(&self, head_sha: impl Into<String>) -> bool {
        let mut e = self.entry.lock().await;
        if e.generation != self.generation {
            return false;
        }
        e.state = RunState::Running { head_sha: head_sha.into() };
        true
    }

    pub async fn mark_posting_comments(&self) -> bool {
        let mut e = self.entry.lock().await;
        if e.generation != self.generation {
            return false;
        }
        e.state = RunState::PostingComments;
        true
    }

    pub async fn mark_completed(&self) {
        let mut e = self.entry.lock().await;
        if e.generation == self.generation {
            e.state = RunState::Completed;
        }
    }

    pub async fn mark_failed(&self) {
        let mut e = self.entry.lock().await;
        if e.generation == self.generation {
            e.state = RunState::Failed;
        }
    }

    /// Records that `path` was reviewed up to `head_sha`, for the next
    /// run's incremental-diff restriction. A no-op once superseded.
    pub async fn record_file_reviewed(&self, path: &str, head_sha: &str) {
        let mut e = self.entry.lock().await;
        if e.generation == self.generation {
            e.reviewed_files.insert(path.to_string(), head_sha.to_string());
        }
    }

    pub async fn last_reviewed_sha_for(&self, path: &str) -> Option<String> {
        self.entry.lock().await.reviewed_files.get(path).cloned()
    }

    pub async fn is_first_review(&self) -> bool {
        self.entry.lock().await.reviewed_files.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct MrStateTable {
    entries: RwLock<HashMap<MergeRequestKey, Arc<Mutex<MrEntry>>>>,
}

impl MrStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry_for(&self, key: &MergeRequestKey) -> Arc<Mutex<MrEntry>> {
        if let Some(entry) = self.entries.read().await.get(key) {
            return entry.clone();
        }
        self.entries
            .write()
            .await
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(MrEntry::default())))
            .clone()
    }

    /// Admits a new run for `key`. If a run is already in flight it is
    /// implicitly superseded: its ticket's generation check will now fail,
    /// and the new run proceeds under a fresh generation. Callers never
    /// need to see two `Running` tickets for the same key at once.
    pub async fn admit(&self, key: &MergeRequestKey) -> RunTicket {
        let entry = self.entry_for(key).await;
        let generation = {
            let mut guard = entry.lock().await;
            guard.generation += 1;
            guard.state = RunState::Enqueued;
            guard.generation
        };
        RunTicket { entry, generation }
    }

    pub async fn current_state(&self, key: &MergeRequestKey) -> RunState {
        self.entry_for(key).await.lock().await.state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> MergeRequestKey {
        MergeRequestKey::new("grp/proj", 1)
    }

    #[tokio::test]
    async fn second_admit_supersedes_the_first_ticket() {
        let table = MrStateTable::new();
        let first = table.admit(&key()).await;
        assert!(first.is_current().await);

        let second = table.admit(&key()).await;
        assert!(!first.is_current().await);
        assert!(second.is_current().await);
    }

    #[tokio::test]
    async fn mark_running_fails_once_superseded() {
        let table = MrStateTable::new();
        let first = table.admit(&key()).await;
        let _second = table.admit(&key()).await;
        assert!(!first.mark_running("sha1").await);
    }

    #[tokio::test]
    async fn first_review_has_no_reviewed_files() {
        let table = MrStateTable::new();
        let ticket = table.admit(&key()).await;
        assert!(ticket.is_first_review().await);
        ticket.record_file_reviewed("a.rs", "sha1").await;
        assert!(!ticket.is_first_review().await);
        assert_eq!(ticket.last_reviewed_sha_for("a.rs").await.as_deref(), Some("sha1"));
    }
}
