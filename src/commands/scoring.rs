use crate::analysis::latency::governance_latency;
use crate::analysis::participation::participation_score;
use crate::analysis::reliability::execution_reliability;
use crate::analysis::transparency::transparency_score;
use crate::models::dao::DaoPolicy;
use crate::models::gri::{round1, Grade, GriBreakdown, GriScore, GRI_WEIGHTS_VERSION};
use crate::models::proposal::Proposal;

/// Compute the Governance Reality Index for one DAO.
///
/// Pure apart from the `last_updated` stamp. The policy is accepted so
/// callers can pass what they have; no current component reads it.
pub fn compute_gri(
    proposals: &[Proposal],
    _policy: Option<&DaoPolicy>,
    member_count: u64,
) -> GriScore {
    let breakdown = GriBreakdown {
        participation: participation_score(proposals, member_count),
        execution_reliability: execution_reliability(proposals),
        governance_latency: governance_latency(proposals),
        transparency: transparency_score(proposals),
    };

    let overall: f64 = breakdown
        .metrics()
        .iter()
        .map(|(_, metric)| metric.contribution())
        .sum();

    GriScore {
        overall: round1(overall.clamp(0.0, 100.0)),
        breakdown,
        weights_version: GRI_WEIGHTS_VERSION,
        last_updated: chrono::Utc::now(),
    }
}

/// Grade label for an overall score.
pub fn grade_of(score: f64) -> Grade {
    if score >= 80.0 {
        Grade::Excellent
    } else if score >= 60.0 {
        Grade::Good
    } else if score >= 40.0 {
        Grade::Fair
    } else if score >= 20.0 {
        Grade::NeedsImprovement
    } else {
        Grade::Critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::proposal;
    use crate::models::proposal::{ProposalStatus, VoteAction};

    fn mixed_proposals(count: u64) -> Vec<Proposal> {
        let statuses = [
            ProposalStatus::Approved,
            ProposalStatus::Rejected,
            ProposalStatus::Expired,
            ProposalStatus::Failed,
            ProposalStatus::InProgress,
            ProposalStatus::Removed,
            ProposalStatus::Moved,
        ];
        (0..count)
            .map(|id| {
                let mut p = proposal(id);
                p.status = statuses[(id as usize * 5 + 3) % statuses.len()];
                p.description = "d".repeat((id as usize * 17) % 90);
                for v in 0..(id % 9) {
                    p.votes.insert(format!("v{v}.near"), VoteAction::Approve);
                }
                p
            })
            .collect()
    }

    #[test]
    fn empty_input_scores_ten() {
        let gri = compute_gri(&[], None, 0);
        assert_eq!(gri.breakdown.participation.score, 0.0);
        assert_eq!(gri.breakdown.execution_reliability.score, 0.0);
        assert_eq!(gri.breakdown.governance_latency.score, 50.0);
        assert_eq!(gri.breakdown.transparency.score, 0.0);
        assert_eq!(gri.overall, 10.0);
        assert_eq!(gri.weights_version, GRI_WEIGHTS_VERSION);
        assert_eq!(grade_of(gri.overall), Grade::Critical);
    }

    #[test]
    fn scores_stay_in_bounds_and_match_weighted_sum() {
        for count in 0..40 {
            for members in [0u64, 1, 3, 8, 50] {
                let gri = compute_gri(&mixed_proposals(count), None, members);
                for (name, metric) in gri.breakdown.metrics() {
                    assert!(
                        (0.0..=100.0).contains(&metric.score),
                        "{name} out of range: {}",
                        metric.score
                    );
                }
                assert!((0.0..=100.0).contains(&gri.overall));

                let b = &gri.breakdown;
                let expected = round1(
                    b.participation.score * 0.4
                        + b.execution_reliability.score * 0.3
                        + b.governance_latency.score * 0.2
                        + b.transparency.score * 0.1,
                );
                assert!((gri.overall - expected).abs() < 0.05 + 1e-9);
            }
        }
    }

    #[test]
    fn healthy_dao_scores_well() {
        let proposals: Vec<Proposal> = (0..4)
            .map(|id| {
                let mut p = proposal(id);
                p.status = ProposalStatus::Approved;
                p.description = "A thorough description of the treasury transfer and rationale".into();
                for v in 0..3 {
                    p.votes.insert(format!("v{v}.near"), VoteAction::Approve);
                }
                p
            })
            .collect();

        let gri = compute_gri(&proposals, None, 3);
        assert_eq!(gri.overall, 100.0);
        assert_eq!(grade_of(gri.overall), Grade::Excellent);
    }

    #[test]
    fn grade_boundaries() {
        assert_eq!(grade_of(100.0).as_str(), "Excellent");
        assert_eq!(grade_of(80.0).as_str(), "Excellent");
        assert_eq!(grade_of(79.9).as_str(), "Good");
        assert_eq!(grade_of(60.0).as_str(), "Good");
        assert_eq!(grade_of(40.0).as_str(), "Fair");
        assert_eq!(grade_of(20.0).as_str(), "Needs Improvement");
        assert_eq!(grade_of(19.9).as_str(), "Critical");
        assert_eq!(grade_of(0.0).as_str(), "Critical");
    }
}
