use crate::analysis::normalize::normalize_proposal;
use crate::analysis::policy::{dao_display_name, member_count};
use crate::commands::db::{DaoFields, Store, StoreResult};
use crate::commands::near::DataSource;
use crate::commands::settings::IndexerSettings;
use crate::models::proposal::{Proposal, RawProposal};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// What one DAO's index procedure did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexOutcome {
    pub dao_id: String,
    pub member_count: u64,
    pub total_on_chain: u64,
    pub start_id: u64,
    pub fetched: usize,
    pub refreshed: usize,
    /// Remote calls that failed and were replaced by a safe default.
    pub remote_errors: usize,
}

impl IndexOutcome {
    pub fn is_up_to_date(&self) -> bool {
        self.start_id >= self.total_on_chain
    }
}

#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub indexed: Vec<IndexOutcome>,
    pub failed: Vec<(String, String)>,
}

impl PassReport {
    /// DAOs that either failed outright or were indexed from degraded data.
    pub fn troubled_daos(&self) -> Vec<String> {
        self.failed
            .iter()
            .map(|(dao_id, _)| dao_id.clone())
            .chain(
                self.indexed
                    .iter()
                    .filter(|outcome| outcome.remote_errors > 0)
                    .map(|outcome| outcome.dao_id.clone()),
            )
            .collect()
    }
}

/// First id to fetch: resume after the high-water mark, but never look
/// further back than `max_per_dao` proposals from the remote head.
pub fn compute_start_id(high_water_mark: Option<u64>, total_on_chain: u64, max_per_dao: u64) -> u64 {
    let resume_at = high_water_mark.map_or(0, |id| id.saturating_add(1));
    resume_at.max(total_on_chain.saturating_sub(max_per_dao))
}

pub struct Indexer {
    source: Arc<dyn DataSource>,
    store: Arc<Store>,
    settings: IndexerSettings,
}

impl Indexer {
    pub fn new(source: Arc<dyn DataSource>, store: Arc<Store>, settings: IndexerSettings) -> Self {
        Self {
            source,
            store,
            settings,
        }
    }

    /// One refresh pass over every tracked (and, if enabled, discovered) DAO.
    /// DAOs are indexed one after another; a failing DAO is logged and skipped.
    pub async fn run_index_pass(&self) -> PassReport {
        let mut dao_ids = self.settings.tracked_daos.clone();
        if self.settings.discovery.enabled {
            let mut seen: HashSet<String> = dao_ids.iter().cloned().collect();
            for dao_id in self.discover_daos().await {
                if seen.insert(dao_id.clone()) {
                    dao_ids.push(dao_id);
                }
            }
        }

        log::info!("Index pass starting for {} DAOs", dao_ids.len());
        let mut report = PassReport::default();

        for (position, dao_id) in dao_ids.iter().enumerate() {
            if position > 0 {
                pause(self.settings.dao_delay).await;
            }

            match self.index_dao(dao_id).await {
                Ok(outcome) => {
                    if outcome.is_up_to_date() && outcome.fetched == 0 {
                        log::info!(
                            "{dao_id}: up to date ({} on chain, {} members)",
                            outcome.total_on_chain,
                            outcome.member_count
                        );
                    } else {
                        log::info!(
                            "{dao_id}: fetched {} proposals from #{} ({} on chain), refreshed {}",
                            outcome.fetched,
                            outcome.start_id,
                            outcome.total_on_chain,
                            outcome.refreshed
                        );
                    }
                    report.indexed.push(outcome);
                }
                Err(e) => {
                    log::error!("Failed to index DAO {dao_id}: {e}");
                    report.failed.push((dao_id.clone(), e));
                }
            }
        }

        log::info!(
            "Index pass complete: {} indexed, {} failed",
            report.indexed.len(),
            report.failed.len()
        );
        report
    }

    /// Per-DAO index procedure. Remote failures degrade to defaults;
    /// only store failures surface as `Err`.
    pub async fn index_dao(&self, dao_id: &str) -> Result<IndexOutcome, String> {
        let mut outcome = IndexOutcome {
            dao_id: dao_id.to_string(),
            ..IndexOutcome::default()
        };

        let policy = match self.source.fetch_policy(dao_id).await {
            Ok(policy) => Some(policy),
            Err(e) => {
                log::warn!("{dao_id}: policy unavailable: {e}");
                outcome.remote_errors += 1;
                None
            }
        };
        outcome.member_count = member_count(policy.as_ref());

        let fields = DaoFields {
            name: dao_display_name(dao_id),
            member_count: outcome.member_count,
            indexed_at: chrono::Utc::now().timestamp_millis(),
        };
        let owned_id = dao_id.to_string();
        self.with_store(move |store| store.upsert_dao(&owned_id, &fields))
            .await?;

        pause(self.settings.call_delay).await;

        outcome.total_on_chain = match self.source.fetch_proposal_count(dao_id).await {
            Ok(count) => count,
            Err(e) => {
                log::warn!("{dao_id}: proposal count unavailable: {e}");
                outcome.remote_errors += 1;
                0
            }
        };

        let owned_id = dao_id.to_string();
        let high_water_mark = self
            .with_store(move |store| store.find_max_proposal_id(&owned_id))
            .await?;
        outcome.start_id = compute_start_id(
            high_water_mark,
            outcome.total_on_chain,
            self.settings.max_proposals_per_dao,
        );

        if !outcome.is_up_to_date() {
            self.backfill(&mut outcome).await?;
        }

        if self.settings.refresh_open_proposals {
            self.refresh_open_proposals(&mut outcome).await?;
        }

        Ok(outcome)
    }

    async fn backfill(&self, outcome: &mut IndexOutcome) -> Result<(), String> {
        let dao_id = outcome.dao_id.clone();
        let total = outcome.total_on_chain;
        let mut from = outcome.start_id;

        while from < total {
            let limit = self.settings.page_size.min(total - from);
            let page = match self.source.fetch_proposal_page(&dao_id, from, limit).await {
                Ok(page) => page,
                Err(e) => {
                    // Stop here so the stored ids stay contiguous; the next pass resumes.
                    log::warn!("{dao_id}: page at #{from} failed, backfill paused: {e}");
                    outcome.remote_errors += 1;
                    break;
                }
            };

            let proposals = decode_page(&dao_id, page, |id| id >= from && id < total);
            let Some(last_id) = proposals.iter().map(|p| p.id).max() else {
                log::debug!("{dao_id}: empty page at #{from}");
                break;
            };

            outcome.fetched += proposals.len();
            self.with_store(move |store| store.upsert_proposals(&proposals))
                .await?;
            from = last_id + 1;

            if from < total {
                pause(self.settings.call_delay).await;
            }
        }

        Ok(())
    }

    /// Re-fetch stored `InProgress` proposals older than the backfill window
    /// so their status and votes track the chain.
    async fn refresh_open_proposals(&self, outcome: &mut IndexOutcome) -> Result<(), String> {
        let dao_id = outcome.dao_id.clone();
        let owned_id = dao_id.clone();
        let mut pending: BTreeSet<u64> = self
            .with_store(move |store| store.list_open_proposal_ids(&owned_id))
            .await?
            .into_iter()
            .filter(|id| *id < outcome.start_id)
            .collect();

        loop {
            let Some(first) = pending.first().copied() else {
                break;
            };
            pause(self.settings.call_delay).await;

            let limit = self.settings.page_size;
            let page = match self.source.fetch_proposal_page(&dao_id, first, limit).await {
                Ok(page) => page,
                Err(e) => {
                    log::warn!("{dao_id}: open-proposal refresh at #{first} failed: {e}");
                    outcome.remote_errors += 1;
                    break;
                }
            };

            let proposals = decode_page(&dao_id, page, |id| pending.contains(&id));
            outcome.refreshed += proposals.len();
            self.with_store(move |store| store.upsert_proposals(&proposals))
                .await?;

            let window_end = first.saturating_add(limit.max(1));
            pending.retain(|id| *id >= window_end);
        }

        Ok(())
    }

    /// Run a store operation on the blocking pool.
    async fn with_store<T, F>(&self, op: F) -> Result<T, String>
    where
        F: FnOnce(&Store) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| format!("STORE_FAILED: worker stopped: {e}"))?
            .map_err(|e| format!("STORE_FAILED: {e}"))
    }

    /// Walk the factory listing and pick the busiest DAOs.
    pub async fn discover_daos(&self) -> Vec<String> {
        let discovery = &self.settings.discovery;
        let mut names = Vec::new();
        let mut from = 0u64;

        loop {
            match self
                .source
                .fetch_dao_list(&discovery.factory_id, from, discovery.page_size)
                .await
            {
                Ok(batch) if batch.is_empty() => break,
                Ok(batch) => {
                    from += batch.len() as u64;
                    names.extend(batch);
                }
                Err(e) => {
                    log::warn!("Discovery listing at {from} failed: {e}");
                    break;
                }
            }
            pause(self.settings.call_delay).await;
        }

        let mut candidates = Vec::new();
        for name in names {
            let dao_id = qualify_dao_id(&name, &discovery.factory_id);
            match self.source.fetch_proposal_count(&dao_id).await {
                Ok(count) if count >= discovery.min_proposals => candidates.push((dao_id, count)),
                Ok(_) => {}
                Err(e) => log::debug!("Discovery skipped {dao_id}: {e}"),
            }
            pause(self.settings.call_delay).await;
        }

        candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        candidates.truncate(discovery.max_daos);
        log::info!("Discovery selected {} DAOs", candidates.len());
        candidates.into_iter().map(|(dao_id, _)| dao_id).collect()
    }
}

fn qualify_dao_id(name: &str, factory_id: &str) -> String {
    if name.ends_with(&format!(".{factory_id}")) {
        name.to_string()
    } else {
        format!("{name}.{factory_id}")
    }
}

fn decode_page(dao_id: &str, page: Vec<Value>, keep: impl Fn(u64) -> bool) -> Vec<Proposal> {
    page.into_iter()
        .filter_map(|raw| match serde_json::from_value::<RawProposal>(raw) {
            Ok(raw) => Some(raw),
            Err(e) => {
                log::warn!("{dao_id}: skipping undecodable proposal: {e}");
                None
            }
        })
        .filter(|raw| keep(raw.id))
        .map(|raw| normalize_proposal(&raw, dao_id))
        .collect()
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
