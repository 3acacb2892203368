//! Recurring broadcast scheduler.
//!
//! One explicit instance owns at most one pending wake-up. The cadence is
//! "next daily occurrence of the fixed time", not a rolling interval from
//! completion: a run that finishes late still fires at the same wall-clock
//! time tomorrow. Schedule state is process-local; a restart comes up idle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use repotrend_common::{Config, RepotrendError};

use crate::fanout::{BroadcastReport, Broadcaster};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerStatus {
    /// No pending wake-up.
    Idle,
    /// Exactly one pending wake-up, no broadcast running.
    Armed,
    /// The wake-up fired and the scheduled broadcast is in flight.
    Executing,
}

pub struct PostScheduler {
    broadcaster: Arc<Broadcaster>,
    enabled: bool,
    post_hour: u32,
    post_minute: u32,
    executing: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PostScheduler {
    pub fn new(broadcaster: Arc<Broadcaster>, config: &Config) -> Self {
        Self {
            broadcaster,
            enabled: config.auto_post_enabled,
            post_hour: config.post_hour,
            post_minute: config.post_minute,
            executing: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    /// Arm the daily wake-up. No-op when disabled by configuration or when
    /// already armed/executing — never a second pending wake-up.
    pub fn start(&self) {
        if !self.enabled {
            info!("Auto-post disabled, scheduler not started");
            return;
        }

        let mut task = self.task.lock().unwrap();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            info!("Scheduler already armed, ignoring start");
            return;
        }

        let broadcaster = Arc::clone(&self.broadcaster);
        let executing = Arc::clone(&self.executing);
        let (hour, minute) = (self.post_hour, self.post_minute);

        *task = Some(tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let next = next_occurrence(now, hour, minute);
                let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
                info!(next = %next, "Scheduler armed");
                tokio::time::sleep(wait).await;

                executing.store(true, Ordering::SeqCst);
                // The fired broadcast runs in its own task: aborting this
                // arming loop only cancels the pending wake-up, never a
                // delivery already under way. The run task clears the
                // executing flag itself so the flag survives an abort here.
                let run = tokio::spawn({
                    let broadcaster = Arc::clone(&broadcaster);
                    let executing = Arc::clone(&executing);
                    async move {
                        match broadcaster.broadcast(None).await {
                            Ok(report) => info!(%report, "Scheduled broadcast complete"),
                            Err(e) => warn!(error = %e, "Scheduled broadcast did not run"),
                        }
                        executing.store(false, Ordering::SeqCst);
                    }
                });
                let _ = run.await;
                // Loop re-arms for the next daily occurrence regardless of outcome.
            }
        }));
        info!(hour, minute, "Scheduler started");
    }

    /// Cancel any pending wake-up. Safe from any state. A broadcast that has
    /// already fired keeps running to completion; only the arming loop (and
    /// with it every future wake-up) goes away.
    pub fn stop(&self) {
        let mut task = self.task.lock().unwrap();
        if let Some(handle) = task.take() {
            handle.abort();
            info!("Scheduler stopped");
        }
    }

    pub fn status(&self) -> SchedulerStatus {
        let task = self.task.lock().unwrap();
        match task.as_ref() {
            Some(handle) if !handle.is_finished() => {
                if self.executing.load(Ordering::SeqCst) {
                    SchedulerStatus::Executing
                } else {
                    SchedulerStatus::Armed
                }
            }
            _ => SchedulerStatus::Idle,
        }
    }

    /// Run a broadcast now, independent of scheduler state. The broadcaster's
    /// single-flight lock is the only mutual exclusion with a scheduled run.
    pub async fn trigger_manual_post(
        &self,
        group_override: Option<Vec<String>>,
    ) -> Result<BroadcastReport, RepotrendError> {
        self.broadcaster.broadcast(group_override).await
    }
}

impl Drop for PostScheduler {
    fn drop(&mut self) {
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}

/// Next daily occurrence of `hour:minute`: today if still ahead, else tomorrow.
pub fn next_occurrence(now: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Utc> {
    let today = now
        .date_naive()
        .and_hms_opt(hour, minute, 0)
        .unwrap_or_else(|| now.date_naive().and_hms_opt(0, 0, 0).expect("midnight is valid"))
        .and_utc();
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    use crate::groups::GroupStore;
    use crate::ledger::PostedLedger;
    use crate::testing::{make_repo, test_config, MockSearcher, MockTransport};
    use crate::traits::ChatTransport;

    fn build_scheduler(dir: &tempfile::TempDir, enabled: bool) -> PostScheduler {
        let mut config = test_config(dir.path());
        config.auto_post_enabled = enabled;
        let broadcaster = Arc::new(Broadcaster::new(
            Arc::new(MockSearcher::new()),
            Arc::new(MockTransport::new()),
            PostedLedger::new(dir.path().join("posted_repos.json")),
            GroupStore::new(
                dir.path().join("selected_groups.json"),
                dir.path().join("group_cache.json"),
            ),
            &config,
        ));
        PostScheduler::new(broadcaster, &config)
    }

    #[test]
    fn next_occurrence_today_when_still_ahead() {
        let now = Utc.with_ymd_and_hms(2026, 8, 27, 6, 30, 0).unwrap();
        let next = next_occurrence(now, 9, 0);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 8, 27, 9, 0, 0).unwrap());
    }

    #[test]
    fn next_occurrence_tomorrow_when_passed() {
        let now = Utc.with_ymd_and_hms(2026, 8, 27, 9, 0, 0).unwrap();
        let next = next_occurrence(now, 9, 0);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 8, 28, 9, 0, 0).unwrap());

        let now = Utc.with_ymd_and_hms(2026, 8, 27, 23, 59, 0).unwrap();
        let next = next_occurrence(now, 9, 0);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 8, 28, 9, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn start_is_single_flight() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = build_scheduler(&dir, true);
        assert_eq!(scheduler.status(), SchedulerStatus::Idle);

        scheduler.start();
        assert_eq!(scheduler.status(), SchedulerStatus::Armed);

        // Second start while armed is a no-op: still one pending wake-up,
        // and a single stop returns to idle.
        scheduler.start();
        assert_eq!(scheduler.status(), SchedulerStatus::Armed);

        scheduler.stop();
        assert_eq!(scheduler.status(), SchedulerStatus::Idle);
    }

    #[tokio::test]
    async fn disabled_scheduler_never_arms() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = build_scheduler(&dir, false);

        scheduler.start();
        assert_eq!(scheduler.status(), SchedulerStatus::Idle);
    }

    #[tokio::test]
    async fn stop_while_idle_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = build_scheduler(&dir, true);

        scheduler.stop();
        assert_eq!(scheduler.status(), SchedulerStatus::Idle);

        // And restart after a stop re-arms.
        scheduler.start();
        scheduler.stop();
        scheduler.start();
        assert_eq!(scheduler.status(), SchedulerStatus::Armed);
        scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_does_not_interrupt_fired_broadcast() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.target_groups = vec!["G1".to_string()];
        // Post time within the next two minutes of wall clock; the paused
        // runtime fast-forwards through the pre-fire wait.
        let soon = Utc::now() + ChronoDuration::seconds(90);
        config.post_hour = soon.hour();
        config.post_minute = soon.minute();

        // Two keywords with hits, separated by empty ones, so the run spans
        // several inter-message delays.
        let searcher = MockSearcher::new()
            .on_query_containing("AI created:>", vec![make_repo(1, "a/a", 50)])
            .on_query_containing("rust created:>", vec![make_repo(2, "b/b", 60)]);
        let transport = Arc::new(MockTransport::new());
        let broadcaster = Arc::new(Broadcaster::new(
            Arc::new(searcher),
            Arc::clone(&transport) as Arc<dyn ChatTransport>,
            PostedLedger::new(dir.path().join("posted_repos.json")),
            GroupStore::new(
                dir.path().join("selected_groups.json"),
                dir.path().join("group_cache.json"),
            ),
            &config,
        ));
        let scheduler = PostScheduler::new(Arc::clone(&broadcaster), &config);
        scheduler.start();

        // Walk virtual time forward until the wake-up has fired and the first
        // message is out, with later keywords still pending.
        let mut caught_mid_run = false;
        for _ in 0..400 {
            tokio::time::sleep(Duration::from_millis(500)).await;
            if transport.sent().len() == 1 && scheduler.status() == SchedulerStatus::Executing {
                caught_mid_run = true;
                break;
            }
        }
        assert!(caught_mid_run, "scheduled broadcast never reached mid-run");

        scheduler.stop();
        tokio::time::sleep(Duration::from_secs(60)).await;

        // The run that had already fired delivered everything it owed, and
        // recorded it; only the pending wake-ups are gone.
        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].1.contains("b/b"));
        assert!(broadcaster.ledger().is_posted(2));
        assert_eq!(scheduler.status(), SchedulerStatus::Idle);
    }

    #[tokio::test]
    async fn manual_trigger_runs_independent_of_scheduler_state() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = build_scheduler(&dir, true);

        // Idle scheduler, manual post still runs (empty resolution here).
        let report = scheduler.trigger_manual_post(None).await.unwrap();
        assert_eq!(report, BroadcastReport::default());
    }
}
