//! Fanout broadcaster — one run of the discovery-dedup-broadcast pipeline.
//!
//! Sequential over groups, then keywords, with a fixed inter-message delay.
//! One group's transport failure is counted and the loop moves on; the run
//! itself never fails past its own boundary. Ledger entries recorded before
//! a later failure are kept.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use repotrend_common::{Config, RepotrendError};

use crate::discovery::{discover, KEYWORDS};
use crate::format::format_repos;
use crate::groups::GroupStore;
use crate::ledger::PostedLedger;
use crate::traits::{ChatTransport, RepoSearcher};

/// Fixed spacing between provider calls. Deliberately unconditional, not
/// adaptive backoff: the delay applies even when a keyword produced nothing.
const MESSAGE_DELAY: Duration = Duration::from_secs(2);

/// Aggregate outcome of one broadcast run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub groups_attempted: usize,
    pub groups_succeeded: usize,
    pub groups_failed: usize,
    pub messages_sent: usize,
    pub repos_posted: usize,
}

impl fmt::Display for BroadcastReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "groups {}/{} ok ({} failed), {} messages, {} repos posted",
            self.groups_succeeded,
            self.groups_attempted,
            self.groups_failed,
            self.messages_sent,
            self.repos_posted
        )
    }
}

pub struct Broadcaster {
    searcher: Arc<dyn RepoSearcher>,
    transport: Arc<dyn ChatTransport>,
    ledger: PostedLedger,
    groups: GroupStore,
    star_threshold: u32,
    results_per_keyword: u32,
    target_groups: Vec<String>,
    message_delay: Duration,
    /// Single-flight guard: a manual trigger overlapping a scheduled run
    /// reports in-progress instead of racing the ledger read-then-write.
    run_lock: tokio::sync::Mutex<()>,
}

impl Broadcaster {
    pub fn new(
        searcher: Arc<dyn RepoSearcher>,
        transport: Arc<dyn ChatTransport>,
        ledger: PostedLedger,
        groups: GroupStore,
        config: &Config,
    ) -> Self {
        Self {
            searcher,
            transport,
            ledger,
            groups,
            star_threshold: config.star_threshold,
            results_per_keyword: config.results_per_keyword,
            target_groups: config.target_groups.clone(),
            message_delay: MESSAGE_DELAY,
            run_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Override the inter-message delay. Test hook.
    pub fn with_message_delay(mut self, delay: Duration) -> Self {
        self.message_delay = delay;
        self
    }

    pub fn ledger(&self) -> &PostedLedger {
        &self.ledger
    }

    pub fn group_store(&self) -> &GroupStore {
        &self.groups
    }

    /// Run one broadcast. The only error this surfaces is the single-flight
    /// conflict; everything else degrades into the report's counters.
    pub async fn broadcast(
        &self,
        explicit_override: Option<Vec<String>>,
    ) -> Result<BroadcastReport, RepotrendError> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| RepotrendError::BroadcastInProgress)?;

        let targets = self
            .groups
            .resolve(explicit_override, &self.target_groups, self.transport.as_ref())
            .await;

        let mut report = BroadcastReport::default();
        if targets.is_empty() {
            info!("No target groups resolved, nothing to do");
            return Ok(report);
        }

        info!(
            groups = targets.len(),
            keywords = KEYWORDS.len(),
            "Broadcast run starting"
        );

        for group_id in &targets {
            report.groups_attempted += 1;
            match self.post_to_group(group_id, &mut report).await {
                Ok(()) => report.groups_succeeded += 1,
                Err(e) => {
                    warn!(group = group_id.as_str(), error = %e, "Delivery to group failed, continuing");
                    report.groups_failed += 1;
                }
            }
        }

        info!(%report, "Broadcast run complete");
        Ok(report)
    }

    async fn post_to_group(&self, group_id: &str, report: &mut BroadcastReport) -> anyhow::Result<()> {
        for keyword in KEYWORDS {
            let outcome = self.post_keyword(group_id, keyword, report).await;
            // Uniform provider call spacing, even for empty or failed keywords.
            tokio::time::sleep(self.message_delay).await;
            outcome?;
        }
        Ok(())
    }

    async fn post_keyword(
        &self,
        group_id: &str,
        keyword: &str,
        report: &mut BroadcastReport,
    ) -> anyhow::Result<()> {
        let repos = discover(
            self.searcher.as_ref(),
            &self.ledger,
            keyword,
            self.star_threshold,
            self.results_per_keyword,
        )
        .await;

        if repos.is_empty() {
            return Ok(());
        }

        let text = format_repos(&repos, keyword);
        self.transport.send_message(group_id, &text).await?;
        // Recorded only after a successful delivery.
        self.ledger.record_all(&repos);
        report.messages_sent += 1;
        report.repos_posted += repos.len();
        Ok(())
    }
}
