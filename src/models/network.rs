use crate::models::dao::Dao;
use crate::models::gri::{Grade, GriScore};
use crate::models::proposal::Proposal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaoSummary {
    #[serde(flatten)]
    pub dao: Dao,
    pub proposal_count: usize,
    pub gri_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaoListResponse {
    pub daos: Vec<DaoSummary>,
    pub total_count: usize,
    /// Mean of every DAO's overall score.
    #[serde(rename = "networkGRI")]
    pub network_gri: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaoOverviewResponse {
    pub dao: DaoSummary,
    pub gri: GriScore,
    pub recent_proposals: Vec<Proposal>,
    pub member_count: u64,
    pub active_members: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaoProposalsResponse {
    pub dao_id: String,
    pub proposals: Vec<Proposal>,
    pub total_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaoGriResponse {
    pub dao_id: String,
    pub dao_name: String,
    pub gri: GriScore,
    pub grade: Grade,
    pub proposal_count: usize,
    pub member_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalDetailResponse {
    pub proposal: Proposal,
    pub voter_count: usize,
    pub participation_rate: f64,
    pub member_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkHealthResponse {
    #[serde(rename = "medianGRI")]
    pub median_gri: f64,
    #[serde(rename = "activeDAOs")]
    pub active_daos: usize,
    #[serde(rename = "inactiveDAOs")]
    pub inactive_daos: usize,
    pub total_proposals: usize,
    pub total_votes: usize,
    pub participation_trend: Vec<TrendPoint>,
    /// Always false: the trend is synthesized from the current snapshot.
    pub trend_authoritative: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatus {
    pub in_progress: bool,
    pub passes: u64,
    pub last_started_at: Option<i64>,
    pub last_completed_at: Option<i64>,
    pub last_failed_daos: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatusResponse {
    pub status: String,
    pub dao_count: usize,
    pub refresh: RefreshStatus,
    pub version: String,
}
