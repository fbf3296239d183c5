use crate::analysis::reliability::StatusPartition;
use crate::models::gri::{round1, GriMetric, GOVERNANCE_LATENCY_WEIGHT};
use crate::models::proposal::Proposal;

/// Governance latency (20%). There is no decision timestamp in the data, so
/// the expiry ratio stands in for decision speed: every 1% of proposals
/// left to expire costs two points.
pub fn governance_latency(proposals: &[Proposal]) -> GriMetric {
    let partition = StatusPartition::of(proposals);

    if partition.decided() == 0 {
        return GriMetric {
            score: 50.0,
            weight: GOVERNANCE_LATENCY_WEIGHT,
            raw_value: 0.0,
            description: "No decided proposals to measure latency".to_string(),
        };
    }

    let total = proposals.len();
    let expired_ratio = partition.expired as f64 / total as f64;
    let score = (100.0 - expired_ratio * 200.0).max(0.0);

    GriMetric {
        score: round1(score),
        weight: GOVERNANCE_LATENCY_WEIGHT,
        raw_value: expired_ratio,
        description: format!(
            "{} of {} proposals expired ({:.1}%)",
            partition.expired,
            total,
            expired_ratio * 100.0
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::proposal_with_status;
    use crate::models::proposal::ProposalStatus::{self, *};

    fn proposals(statuses: &[ProposalStatus]) -> Vec<Proposal> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, s)| proposal_with_status(i as u64, *s))
            .collect()
    }

    #[test]
    fn neutral_when_nothing_decided() {
        assert_eq!(governance_latency(&[]).score, 50.0);
        assert_eq!(governance_latency(&proposals(&[Expired, InProgress])).score, 50.0);
    }

    #[test]
    fn full_marks_without_expiry() {
        assert_eq!(governance_latency(&proposals(&[Approved, Rejected])).score, 100.0);
    }

    #[test]
    fn expiry_ratio_uses_every_proposal_as_denominator() {
        // 1 expired of 4 total: 100 - 200 * 0.25
        let metric = governance_latency(&proposals(&[Approved, Expired, InProgress, Moved]));
        assert_eq!(metric.score, 50.0);
        assert_eq!(metric.raw_value, 0.25);
        assert_eq!(metric.description, "1 of 4 proposals expired (25.0%)");
    }

    #[test]
    fn floors_at_zero() {
        let metric = governance_latency(&proposals(&[Approved, Expired, Expired]));
        assert_eq!(metric.score, 0.0);
    }
}
