use crate::analysis::aggregate::{mean_of, median_of};
use crate::commands::db::{Store, StoreError};
use crate::commands::scoring::{compute_gri, grade_of};
use crate::models::dao::Dao;
use crate::models::gri::{round1, GriScore};
use crate::models::network::{
    DaoGriResponse, DaoListResponse, DaoOverviewResponse, DaoProposalsResponse, DaoSummary,
    NetworkHealthResponse, NetworkStatusResponse, ProposalDetailResponse, RefreshStatus,
    TrendPoint,
};
use crate::models::proposal::Proposal;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::HashSet;

pub const ACTIVITY_WINDOW_MS: i64 = 30 * 24 * 60 * 60 * 1000;
pub const RECENT_PROPOSALS: usize = 10;
pub const TREND_DAYS: i64 = 7;

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("store worker stopped: {0}")]
    Worker(String),
}

struct ScoredDao {
    dao: Dao,
    proposals: Vec<Proposal>,
    gri: GriScore,
}

impl ScoredDao {
    fn summary(&self) -> DaoSummary {
        DaoSummary {
            dao: self.dao.clone(),
            proposal_count: self.proposals.len(),
            gri_score: self.gri.overall,
        }
    }
}

// Policies are not persisted, so API scores run without one.
fn score_dao(store: &Store, dao: Dao) -> Result<ScoredDao, ViewError> {
    let proposals = store.list_proposals(&dao.id)?;
    let gri = compute_gri(&proposals, None, dao.member_count);
    Ok(ScoredDao {
        dao,
        proposals,
        gri,
    })
}

fn score_all(store: &Store) -> Result<Vec<ScoredDao>, ViewError> {
    store
        .list_daos()?
        .into_iter()
        .map(|dao| score_dao(store, dao))
        .collect()
}

fn require_dao(store: &Store, dao_id: &str) -> Result<Dao, ViewError> {
    store.find_dao(dao_id)?.ok_or(ViewError::NotFound("DAO"))
}

fn submitted_after(proposal: &Proposal, cutoff_ms: i64) -> bool {
    proposal.submission_time.as_millis() > cutoff_ms
}

fn newest_first(proposals: &mut [Proposal]) {
    proposals.sort_by_key(|p| Reverse(p.submission_time));
}

pub fn list_daos(store: &Store) -> Result<DaoListResponse, ViewError> {
    let scored = score_all(store)?;
    let scores: Vec<f64> = scored.iter().map(|s| s.gri.overall).collect();

    Ok(DaoListResponse {
        daos: scored.iter().map(ScoredDao::summary).collect(),
        total_count: scored.len(),
        network_gri: mean_of(&scores),
    })
}

pub fn dao_overview(store: &Store, dao_id: &str, now_ms: i64) -> Result<DaoOverviewResponse, ViewError> {
    let scored = score_dao(store, require_dao(store, dao_id)?)?;

    let cutoff = now_ms.saturating_sub(ACTIVITY_WINDOW_MS);
    let active_members: HashSet<&str> = scored
        .proposals
        .iter()
        .filter(|p| submitted_after(p, cutoff))
        .flat_map(|p| p.votes.keys().map(String::as_str))
        .collect();
    let active_members = active_members.len();

    let mut recent_proposals = scored.proposals.clone();
    newest_first(&mut recent_proposals);
    recent_proposals.truncate(RECENT_PROPOSALS);

    Ok(DaoOverviewResponse {
        dao: scored.summary(),
        member_count: scored.dao.member_count,
        gri: scored.gri,
        recent_proposals,
        active_members,
    })
}

pub fn dao_proposals(
    store: &Store,
    dao_id: &str,
    status: Option<&str>,
) -> Result<DaoProposalsResponse, ViewError> {
    let dao = require_dao(store, dao_id)?;
    let mut proposals: Vec<Proposal> = store
        .list_proposals(&dao.id)?
        .into_iter()
        .filter(|p| status.map_or(true, |wanted| p.status.as_str() == wanted))
        .collect();
    newest_first(&mut proposals);

    Ok(DaoProposalsResponse {
        dao_id: dao.id,
        total_count: proposals.len(),
        proposals,
    })
}

pub fn dao_gri(store: &Store, dao_id: &str) -> Result<DaoGriResponse, ViewError> {
    let scored = score_dao(store, require_dao(store, dao_id)?)?;
    Ok(DaoGriResponse {
        grade: grade_of(scored.gri.overall),
        proposal_count: scored.proposals.len(),
        member_count: scored.dao.member_count,
        dao_id: scored.dao.id,
        dao_name: scored.dao.name,
        gri: scored.gri,
    })
}

pub fn proposal_detail(
    store: &Store,
    dao_id: &str,
    proposal_id: u64,
) -> Result<ProposalDetailResponse, ViewError> {
    let dao = require_dao(store, dao_id)?;
    let proposal = store
        .find_proposal(&dao.id, proposal_id)?
        .ok_or(ViewError::NotFound("Proposal"))?;

    let voter_count = proposal.votes.len();
    let participation_rate = if dao.member_count > 0 {
        round1(voter_count as f64 / dao.member_count as f64 * 100.0)
    } else {
        0.0
    };

    Ok(ProposalDetailResponse {
        proposal,
        voter_count,
        participation_rate,
        member_count: dao.member_count,
    })
}

pub fn network_health(store: &Store, now: DateTime<Utc>) -> Result<NetworkHealthResponse, ViewError> {
    let scored = score_all(store)?;
    let cutoff = now.timestamp_millis().saturating_sub(ACTIVITY_WINDOW_MS);

    let scores: Vec<f64> = scored.iter().map(|s| s.gri.overall).collect();
    let active_daos = scored
        .iter()
        .filter(|s| s.proposals.iter().any(|p| submitted_after(p, cutoff)))
        .count();
    let total_proposals = scored.iter().map(|s| s.proposals.len()).sum();
    let total_votes = scored
        .iter()
        .flat_map(|s| s.proposals.iter())
        .map(|p| p.votes.len())
        .sum();

    let participation: Vec<f64> = scored
        .iter()
        .map(|s| s.gri.breakdown.participation.score)
        .collect();

    Ok(NetworkHealthResponse {
        median_gri: median_of(&scores),
        active_daos,
        inactive_daos: scored.len() - active_daos,
        total_proposals,
        total_votes,
        participation_trend: flat_trend(now, mean_of(&participation)),
        trend_authoritative: false,
    })
}

/// No history is kept, so every point repeats the current value.
fn flat_trend(now: DateTime<Utc>, value: f64) -> Vec<TrendPoint> {
    (0..TREND_DAYS)
        .rev()
        .map(|days_ago| TrendPoint {
            date: (now - chrono::Duration::days(days_ago))
                .format("%Y-%m-%d")
                .to_string(),
            value,
        })
        .collect()
}

pub fn network_status(store: &Store, refresh: RefreshStatus) -> Result<NetworkStatusResponse, ViewError> {
    Ok(NetworkStatusResponse {
        status: "healthy".to_string(),
        dao_count: store.count_daos()?,
        refresh,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
