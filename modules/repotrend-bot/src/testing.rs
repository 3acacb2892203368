// Test mocks for the broadcast pipeline.
//
// Two mocks matching the two trait boundaries:
// - MockSearcher (RepoSearcher) — fragment-matched query→results, records
//   every query it sees so tests can assert which tiers ran
// - MockTransport (ChatTransport) — records sends, per-group failure
//   injection, configurable joined-group list
//
// Plus `make_repo` for constructing provider items.

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;

use github_client::{Repo, SortKey, SortOrder};
use repotrend_common::Config;

use crate::traits::{ChatTransport, GroupInfo, RepoSearcher};

/// A config for tests: no env vars, state files under `data_dir`.
pub fn test_config(data_dir: &std::path::Path) -> Config {
    Config {
        waha_base_url: "http://localhost:3000".to_string(),
        waha_session: "default".to_string(),
        waha_api_key: None,
        github_token: None,
        auto_post_enabled: true,
        post_interval_hours: 24,
        post_hour: 9,
        post_minute: 0,
        star_threshold: 300,
        results_per_keyword: 5,
        target_groups: Vec::new(),
        data_dir: data_dir.to_path_buf(),
    }
}

/// Build a provider repo with the fields the pipeline cares about.
pub fn make_repo(id: u64, full_name: &str, stars: u32) -> Repo {
    Repo {
        id,
        full_name: full_name.to_string(),
        html_url: format!("https://github.com/{full_name}"),
        description: None,
        stargazers_count: stars,
        language: None,
        created_at: Some(Utc::now()),
        pushed_at: Some(Utc::now()),
    }
}

// ---------------------------------------------------------------------------
// MockSearcher
// ---------------------------------------------------------------------------

/// Fragment-matched searcher. A query returns the results registered for the
/// first fragment it contains; unregistered queries return empty. Fragments
/// registered via `fail_query_containing` error instead.
pub struct MockSearcher {
    routes: Mutex<Vec<Route>>,
    failing: Vec<String>,
    queries: Mutex<Vec<String>>,
}

struct Route {
    fragment: String,
    /// Served in order across matching calls; the last response repeats.
    responses: Vec<Vec<Repo>>,
    cursor: usize,
}

impl MockSearcher {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(Vec::new()),
            failing: Vec::new(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn on_query_containing(self, fragment: &str, repos: Vec<Repo>) -> Self {
        self.on_query_containing_seq(fragment, vec![repos])
    }

    /// Register successive responses for a fragment: the first matching call
    /// gets `responses[0]`, the next `responses[1]`, and so on; the last
    /// response repeats once exhausted.
    pub fn on_query_containing_seq(self, fragment: &str, responses: Vec<Vec<Repo>>) -> Self {
        self.routes.lock().unwrap().push(Route {
            fragment: fragment.to_string(),
            responses,
            cursor: 0,
        });
        self
    }

    pub fn fail_query_containing(mut self, fragment: &str) -> Self {
        self.failing.push(fragment.to_string());
        self
    }

    /// Every query this mock has served, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl Default for MockSearcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepoSearcher for MockSearcher {
    async fn search(
        &self,
        query: &str,
        _sort: SortKey,
        _order: SortOrder,
        per_page: u32,
    ) -> Result<Vec<Repo>> {
        self.queries.lock().unwrap().push(query.to_string());

        if self.failing.iter().any(|f| query.contains(f.as_str())) {
            bail!("MockSearcher: injected failure for {query}");
        }

        let mut routes = self.routes.lock().unwrap();
        for route in routes.iter_mut() {
            if query.contains(route.fragment.as_str()) {
                if route.responses.is_empty() {
                    return Ok(Vec::new());
                }
                let idx = route.cursor.min(route.responses.len() - 1);
                route.cursor += 1;
                return Ok(route.responses[idx]
                    .iter()
                    .take(per_page as usize)
                    .cloned()
                    .collect());
            }
        }
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

/// Recording chat transport with per-group failure injection.
pub struct MockTransport {
    groups: Vec<GroupInfo>,
    fail_sends_to: HashSet<String>,
    fail_list: bool,
    sent: Mutex<Vec<(String, String)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            groups: Vec::new(),
            fail_sends_to: HashSet::new(),
            fail_list: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Set the joined-group list returned by `list_groups`.
    pub fn with_groups(mut self, ids: &[&str]) -> Self {
        self.groups = ids
            .iter()
            .map(|id| GroupInfo {
                id: id.to_string(),
                name: Some(format!("Group {id}")),
                participant_count: 3,
                description: None,
            })
            .collect();
        self
    }

    /// Every send to this group id fails.
    pub fn fail_sends_to(mut self, id: &str) -> Self {
        self.fail_sends_to.insert(id.to_string());
        self
    }

    pub fn fail_list_groups(mut self) -> Self {
        self.fail_list = true;
        self
    }

    /// Every (chat_id, text) delivered so far, in order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        if self.fail_sends_to.contains(chat_id) {
            bail!("MockTransport: injected send failure for {chat_id}");
        }
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn list_groups(&self) -> Result<Vec<GroupInfo>> {
        if self.fail_list {
            bail!("MockTransport: injected list_groups failure");
        }
        Ok(self.groups.clone())
    }
}
