use crate::commands::indexer::{Indexer, PassReport};
use crate::models::network::RefreshStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub type SharedRefreshStatus = Arc<RwLock<RefreshStatus>>;

pub fn new_refresh_status() -> SharedRefreshStatus {
    Arc::new(RwLock::new(RefreshStatus::default()))
}

/// A pass is due when none has completed yet, or the last one finished at
/// least `poll_interval` ago.
pub fn refresh_due(last_completed_ms: Option<i64>, now_ms: i64, poll_interval: Duration) -> bool {
    match last_completed_ms {
        None => true,
        Some(last) => {
            let interval_ms = i64::try_from(poll_interval.as_millis()).unwrap_or(i64::MAX);
            now_ms.saturating_sub(last) >= interval_ms
        }
    }
}

/// Run one pass and record it in `status`.
pub async fn run_refresh_pass(indexer: &Indexer, status: &SharedRefreshStatus) -> PassReport {
    {
        let mut current = status.write().await;
        current.in_progress = true;
        current.last_started_at = Some(chrono::Utc::now().timestamp_millis());
    }

    let report = indexer.run_index_pass().await;

    let mut current = status.write().await;
    current.in_progress = false;
    current.passes += 1;
    current.last_completed_at = Some(chrono::Utc::now().timestamp_millis());
    current.last_failed_daos = report.troubled_daos();
    report
}

/// Background refresh task. Wakes every `liveness_check` and starts a pass
/// when one is due; the first wake is immediate.
pub async fn run_refresh_loop(
    indexer: Arc<Indexer>,
    status: SharedRefreshStatus,
    poll_interval: Duration,
    liveness_check: Duration,
) {
    let mut ticker = tokio::time::interval(liveness_check);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let last_completed = status.read().await.last_completed_at;
        let now = chrono::Utc::now().timestamp_millis();
        if !refresh_due(last_completed, now, poll_interval) {
            continue;
        }

        log::info!("Refreshing DAO data from chain...");
        let report = run_refresh_pass(&indexer, &status).await;
        if !report.failed.is_empty() {
            log::warn!("{} DAOs failed this pass", report.failed.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THIRTY_MINUTES: Duration = Duration::from_secs(30 * 60);

    #[test]
    fn first_pass_is_always_due() {
        assert!(refresh_due(None, 0, THIRTY_MINUTES));
    }

    #[test]
    fn due_only_after_interval_elapses() {
        let last = 1_000_000;
        assert!(!refresh_due(Some(last), last + 60_000, THIRTY_MINUTES));
        assert!(!refresh_due(Some(last), last + 1_799_999, THIRTY_MINUTES));
        assert!(refresh_due(Some(last), last + 1_800_000, THIRTY_MINUTES));
    }

    #[test]
    fn clock_going_backwards_is_not_due() {
        assert!(!refresh_due(Some(5_000), 1_000, THIRTY_MINUTES));
    }
}
