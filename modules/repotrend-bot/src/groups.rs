//! Group selection state and broadcast target resolution.
//!
//! Two files, both owned exclusively by this module:
//! - selected-groups: the operator's explicit destination selection
//! - group cache: the joined-group set fetched from the transport on fallback
//!
//! Resolution precedence (first non-empty source wins):
//! 1. explicit per-call override
//! 2. persisted selection
//! 3. statically configured list
//! 4. groups fetched from the transport (cached as a side effect)

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ledger::write_json;
use crate::traits::{ChatTransport, GroupInfo};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectionFile {
    selected_groups: Vec<String>,
    last_updated: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheFile {
    groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    group_details: Option<Vec<GroupDetail>>,
    last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetail {
    pub id: String,
    pub name: String,
    pub participant_count: usize,
    pub description: Option<String>,
}

/// File-backed group selection plus the resolution logic over it.
pub struct GroupStore {
    selection_path: PathBuf,
    cache_path: PathBuf,
}

impl GroupStore {
    pub fn new(selection_path: impl Into<PathBuf>, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            selection_path: selection_path.into(),
            cache_path: cache_path.into(),
        }
    }

    /// The persisted selection, or empty when none exists or the file is bad.
    pub fn selected(&self) -> Vec<String> {
        match fs::read_to_string(&self.selection_path) {
            Ok(raw) => match serde_json::from_str::<SelectionFile>(&raw) {
                Ok(file) => file.selected_groups,
                Err(e) => {
                    warn!(path = %self.selection_path.display(), error = %e, "Selection file unparseable, treating as no selection");
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!(path = %self.selection_path.display(), error = %e, "Selection file unreadable, treating as no selection");
                Vec::new()
            }
        }
    }

    /// Replace the selection wholesale.
    pub fn set_selected(&self, groups: Vec<String>) {
        self.write_selection(groups);
    }

    /// Add one group id to the selection (read-modify-write, not append).
    pub fn add_group(&self, id: &str) {
        let mut groups = self.selected();
        if groups.iter().any(|g| g == id) {
            return;
        }
        groups.push(id.to_string());
        self.write_selection(groups);
    }

    /// Remove one group id from the selection.
    pub fn remove_group(&self, id: &str) {
        let mut groups = self.selected();
        let before = groups.len();
        groups.retain(|g| g != id);
        if groups.len() != before {
            self.write_selection(groups);
        }
    }

    /// Clear the selection. Semantically "no selection" (resolution falls
    /// through to the next source), not "target no groups".
    pub fn clear_selection(&self) {
        self.write_selection(Vec::new());
        info!("Group selection cleared");
    }

    /// Resolve the destination groups for one broadcast run. Reads but never
    /// mutates the selection. An empty result means "nothing to do".
    pub async fn resolve(
        &self,
        explicit_override: Option<Vec<String>>,
        configured: &[String],
        transport: &dyn ChatTransport,
    ) -> Vec<String> {
        if let Some(groups) = explicit_override {
            if !groups.is_empty() {
                info!(count = groups.len(), "Targets: explicit override");
                return groups;
            }
        }

        let selected = self.selected();
        if !selected.is_empty() {
            info!(count = selected.len(), "Targets: persisted selection");
            return selected;
        }

        if !configured.is_empty() {
            info!(count = configured.len(), "Targets: configured group list");
            return configured.to_vec();
        }

        match transport.list_groups().await {
            Ok(groups) => {
                info!(count = groups.len(), "Targets: fetched participating groups");
                self.cache_groups(&groups);
                groups.into_iter().map(|g| g.id).collect()
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch participating groups, nothing to do");
                Vec::new()
            }
        }
    }

    fn cache_groups(&self, groups: &[GroupInfo]) {
        let file = CacheFile {
            groups: groups.iter().map(|g| g.id.clone()).collect(),
            group_details: Some(
                groups
                    .iter()
                    .map(|g| GroupDetail {
                        id: g.id.clone(),
                        name: g.name.clone().unwrap_or_default(),
                        participant_count: g.participant_count,
                        description: g.description.clone(),
                    })
                    .collect(),
            ),
            last_updated: Utc::now(),
        };
        if let Err(e) = write_json(&self.cache_path, &file) {
            warn!(path = %self.cache_path.display(), error = %e, "Failed to write group cache, skipping");
        }
    }

    fn write_selection(&self, groups: Vec<String>) {
        let file = SelectionFile {
            selected_groups: groups,
            last_updated: Utc::now(),
        };
        if let Err(e) = write_json(&self.selection_path, &file) {
            warn!(path = %self.selection_path.display(), error = %e, "Failed to write group selection, skipping");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;

    fn temp_store() -> (tempfile::TempDir, GroupStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = GroupStore::new(
            dir.path().join("selected_groups.json"),
            dir.path().join("group_cache.json"),
        );
        (dir, store)
    }

    fn ids(groups: &[&str]) -> Vec<String> {
        groups.iter().map(|g| g.to_string()).collect()
    }

    #[tokio::test]
    async fn precedence_override_selection_config_fetch() {
        let (_dir, store) = temp_store();
        store.set_selected(ids(&["G2"]));
        let configured = ids(&["G3"]);
        let transport = MockTransport::new().with_groups(&["G4"]);

        // 1. Explicit override wins.
        let resolved = store
            .resolve(Some(ids(&["G1"])), &configured, &transport)
            .await;
        assert_eq!(resolved, ids(&["G1"]));

        // 2. No override: persisted selection.
        let resolved = store.resolve(None, &configured, &transport).await;
        assert_eq!(resolved, ids(&["G2"]));

        // 3. Selection cleared: configured list.
        store.clear_selection();
        let resolved = store.resolve(None, &configured, &transport).await;
        assert_eq!(resolved, ids(&["G3"]));

        // 4. Nothing configured: fetched participating groups.
        let resolved = store.resolve(None, &[], &transport).await;
        assert_eq!(resolved, ids(&["G4"]));
    }

    #[tokio::test]
    async fn empty_override_falls_through() {
        let (_dir, store) = temp_store();
        store.set_selected(ids(&["G2"]));
        let transport = MockTransport::new();

        let resolved = store.resolve(Some(Vec::new()), &[], &transport).await;
        assert_eq!(resolved, ids(&["G2"]));
    }

    #[tokio::test]
    async fn fetch_failure_resolves_to_nothing() {
        let (_dir, store) = temp_store();
        let transport = MockTransport::new().fail_list_groups();

        let resolved = store.resolve(None, &[], &transport).await;
        assert!(resolved.is_empty());
    }

    #[tokio::test]
    async fn resolution_does_not_mutate_selection() {
        let (_dir, store) = temp_store();
        store.set_selected(ids(&["G2"]));
        let transport = MockTransport::new().with_groups(&["G4"]);

        let _ = store.resolve(Some(ids(&["G1"])), &[], &transport).await;
        assert_eq!(store.selected(), ids(&["G2"]));
    }

    #[tokio::test]
    async fn fallback_fetch_writes_cache_with_details() {
        let (dir, store) = temp_store();
        let transport = MockTransport::new().with_groups(&["G4", "G5"]);

        let _ = store.resolve(None, &[], &transport).await;

        let raw = fs::read_to_string(dir.path().join("group_cache.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["groups"].as_array().unwrap().len(), 2);
        assert!(value.get("groupDetails").is_some());
        assert!(value.get("lastUpdated").is_some());
    }

    #[test]
    fn add_and_remove_rewrite_wholesale() {
        let (_dir, store) = temp_store();
        store.add_group("G1");
        store.add_group("G2");
        store.add_group("G1"); // duplicate, no-op
        assert_eq!(store.selected(), ids(&["G1", "G2"]));

        store.remove_group("G1");
        assert_eq!(store.selected(), ids(&["G2"]));
    }
}
