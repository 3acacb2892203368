//! Posted-repo ledger — the dedup record of everything already broadcast.
//!
//! Whole-file JSON, rewritten on every mutation. Persistence failures are
//! non-fatal: an unreadable file degrades to an empty ledger view, an
//! unwritable file skips the write with a warning. Neither aborts a
//! broadcast in progress.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use github_client::Repo;

/// Ledger capacity; the oldest records are dropped once this is exceeded.
pub const MAX_LEDGER_ENTRIES: usize = 1000;

/// One previously-broadcast repository. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostedRepo {
    pub id: u64,
    pub full_name: String,
    pub url: String,
    pub posted_at: DateTime<Utc>,
    /// Star count at the time of posting, not kept current.
    pub stars: u32,
}

impl PostedRepo {
    fn from_repo(repo: &Repo, now: DateTime<Utc>) -> Self {
        Self {
            id: repo.id,
            full_name: repo.full_name.clone(),
            url: repo.html_url.clone(),
            posted_at: now,
            stars: repo.stargazers_count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerFile {
    posted_repos: Vec<PostedRepo>,
    last_updated: DateTime<Utc>,
}

impl LedgerFile {
    fn empty() -> Self {
        Self {
            posted_repos: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}

/// File-backed dedup ledger. Owns its on-disk representation exclusively.
pub struct PostedLedger {
    path: PathBuf,
}

impl PostedLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// True iff a record with this id exists.
    pub fn is_posted(&self, id: u64) -> bool {
        self.load()
            .posted_repos
            .iter()
            .any(|record| record.id == id)
    }

    /// Return the repos whose id is not yet recorded, preserving input order.
    /// Pure read, no mutation.
    pub fn filter_unposted(&self, repos: &[Repo]) -> Vec<Repo> {
        let posted: HashSet<u64> = self
            .load()
            .posted_repos
            .iter()
            .map(|record| record.id)
            .collect();
        repos
            .iter()
            .filter(|repo| !posted.contains(&repo.id))
            .cloned()
            .collect()
    }

    /// Record one repo. No-op if its id is already present.
    pub fn record(&self, repo: &Repo) {
        self.record_all(std::slice::from_ref(repo));
    }

    /// Record a batch of repos in one read-modify-write pass, then truncate
    /// the oldest entries down to capacity.
    pub fn record_all(&self, repos: &[Repo]) {
        if repos.is_empty() {
            return;
        }

        let mut file = self.load();
        let existing: HashSet<u64> = file.posted_repos.iter().map(|record| record.id).collect();
        let now = Utc::now();

        let mut added = 0usize;
        for repo in repos {
            if existing.contains(&repo.id) {
                continue;
            }
            file.posted_repos.push(PostedRepo::from_repo(repo, now));
            added += 1;
        }
        if added == 0 {
            return;
        }

        if file.posted_repos.len() > MAX_LEDGER_ENTRIES {
            let excess = file.posted_repos.len() - MAX_LEDGER_ENTRIES;
            file.posted_repos.drain(..excess);
            info!(dropped = excess, "Ledger over capacity, dropped oldest records");
        }

        file.last_updated = now;
        self.save(&file);
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.load().posted_repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wholesale clear. The next broadcast starts from a blank ledger.
    pub fn reset(&self) {
        self.save(&LedgerFile::empty());
        info!(path = %self.path.display(), "Ledger reset");
    }

    fn load(&self) -> LedgerFile {
        match fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(file) => file,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Ledger file unparseable, treating as empty");
                    LedgerFile::empty()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LedgerFile::empty(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ledger file unreadable, treating as empty");
                LedgerFile::empty()
            }
        }
    }

    fn save(&self, file: &LedgerFile) {
        if let Err(e) = write_json(&self.path, file) {
            warn!(path = %self.path.display(), error = %e, "Failed to write ledger, skipping");
        }
    }
}

/// Serialize a value to pretty JSON at `path`, creating parent directories.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let raw = serde_json::to_string_pretty(value)?;
    fs::write(path, raw)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::make_repo;

    fn temp_ledger() -> (tempfile::TempDir, PostedLedger) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = PostedLedger::new(dir.path().join("posted_repos.json"));
        (dir, ledger)
    }

    #[test]
    fn record_is_idempotent() {
        let (_dir, ledger) = temp_ledger();
        let repo = make_repo(42, "acme/widget", 500);

        ledger.record(&repo);
        ledger.record(&repo);

        assert_eq!(ledger.len(), 1);
        assert!(ledger.is_posted(42));
    }

    #[test]
    fn filter_unposted_preserves_order_and_drops_recorded() {
        let (_dir, ledger) = temp_ledger();
        let a = make_repo(1, "a/a", 10);
        let b = make_repo(2, "b/b", 20);
        let c = make_repo(3, "c/c", 30);
        ledger.record(&b);

        let filtered = ledger.filter_unposted(&[a, b, c]);
        let ids: Vec<u64> = filtered.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn filter_unposted_does_not_mutate() {
        let (_dir, ledger) = temp_ledger();
        let repo = make_repo(7, "x/y", 100);

        let _ = ledger.filter_unposted(&[repo]);
        assert!(ledger.is_empty());
        assert!(!ledger.is_posted(7));
    }

    #[test]
    fn capacity_bound_drops_oldest_first() {
        let (_dir, ledger) = temp_ledger();
        let batch: Vec<Repo> = (0..MAX_LEDGER_ENTRIES as u64 + 50)
            .map(|i| make_repo(i, &format!("org/repo{i}"), 10))
            .collect();

        ledger.record_all(&batch);

        assert_eq!(ledger.len(), MAX_LEDGER_ENTRIES);
        // Oldest (lowest ids, inserted first) are gone; newest survive.
        assert!(!ledger.is_posted(0));
        assert!(!ledger.is_posted(49));
        assert!(ledger.is_posted(50));
        assert!(ledger.is_posted(MAX_LEDGER_ENTRIES as u64 + 49));
    }

    #[test]
    fn unreadable_file_degrades_to_empty_view() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posted_repos.json");
        fs::write(&path, "not json {").unwrap();
        let ledger = PostedLedger::new(&path);

        assert!(ledger.is_empty());
        // A record after the bad read rewrites the file cleanly.
        ledger.record(&make_repo(1, "a/a", 5));
        assert!(ledger.is_posted(1));
    }

    #[test]
    fn reset_clears_all_records() {
        let (_dir, ledger) = temp_ledger();
        ledger.record_all(&[make_repo(1, "a/a", 5), make_repo(2, "b/b", 6)]);
        assert_eq!(ledger.len(), 2);

        ledger.reset();
        assert!(ledger.is_empty());
    }

    #[test]
    fn disk_shape_is_camel_case() {
        let (_dir, ledger) = temp_ledger();
        ledger.record(&make_repo(9, "a/a", 5));

        let raw = fs::read_to_string(ledger.path.clone()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value.get("postedRepos").is_some());
        assert!(value.get("lastUpdated").is_some());
        let record = &value["postedRepos"][0];
        assert_eq!(record["id"], 9);
        assert!(record.get("fullName").is_some());
        assert!(record.get("postedAt").is_some());
    }
}
