use crate::models::gri::{round1, GriMetric, EXECUTION_RELIABILITY_WEIGHT};
use crate::models::proposal::{Proposal, ProposalStatus};

/// Counts of the statuses the reliability and latency ratios look at.
/// `InProgress`, `Removed`, `Moved` and unknown statuses are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusPartition {
    pub approved: usize,
    pub rejected: usize,
    pub expired: usize,
    pub failed: usize,
}

impl StatusPartition {
    pub fn of(proposals: &[Proposal]) -> Self {
        let mut partition = Self::default();
        for proposal in proposals {
            match proposal.status {
                ProposalStatus::Approved => partition.approved += 1,
                ProposalStatus::Rejected => partition.rejected += 1,
                ProposalStatus::Expired => partition.expired += 1,
                ProposalStatus::Failed => partition.failed += 1,
                _ => {}
            }
        }
        partition
    }

    pub fn decided(&self) -> usize {
        self.approved + self.rejected
    }
}

/// Execution reliability (30%): share of approved proposals among those that
/// were approved, failed or expired.
pub fn execution_reliability(proposals: &[Proposal]) -> GriMetric {
    if proposals.is_empty() {
        return GriMetric {
            score: 0.0,
            weight: EXECUTION_RELIABILITY_WEIGHT,
            raw_value: 0.0,
            description: "No proposals found".to_string(),
        };
    }

    let StatusPartition {
        approved,
        rejected,
        expired,
        failed,
    } = StatusPartition::of(proposals);

    if approved + rejected == 0 {
        return GriMetric {
            score: 50.0,
            weight: EXECUTION_RELIABILITY_WEIGHT,
            raw_value: 0.0,
            description: "No decided proposals yet".to_string(),
        };
    }

    let description =
        format!("{approved} approved, {rejected} rejected, {expired} expired, {failed} failed");

    // Only rejections: nothing was executed or lost, so the ratio is undefined.
    let attempted = approved + failed + expired;
    if attempted == 0 {
        return GriMetric {
            score: 50.0,
            weight: EXECUTION_RELIABILITY_WEIGHT,
            raw_value: 0.0,
            description,
        };
    }

    let success_rate = (approved as f64 / attempted as f64 * 100.0).min(100.0);

    GriMetric {
        score: round1(success_rate),
        weight: EXECUTION_RELIABILITY_WEIGHT,
        raw_value: approved as f64,
        description,
    }
}
