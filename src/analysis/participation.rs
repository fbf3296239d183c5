use crate::models::gri::{round1, GriMetric, PARTICIPATION_WEIGHT};
use crate::models::proposal::Proposal;

/// Participation (40%): average distinct voters per proposal relative to
/// the DAO's member count, capped at 100.
pub fn participation_score(proposals: &[Proposal], member_count: u64) -> GriMetric {
    if proposals.is_empty() || member_count == 0 {
        return GriMetric {
            score: 0.0,
            weight: PARTICIPATION_WEIGHT,
            raw_value: 0.0,
            description: "No proposals or members found".to_string(),
        };
    }

    let total_voters: usize = proposals.iter().map(|p| p.votes.len()).sum();
    let avg_voters = total_voters as f64 / proposals.len() as f64;
    let rate = (avg_voters / member_count as f64 * 100.0).min(100.0);

    GriMetric {
        score: round1(rate),
        weight: PARTICIPATION_WEIGHT,
        raw_value: round1(avg_voters),
        description: format!(
            "Average {avg_voters:.1} voters per proposal out of {member_count} members"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::proposal_with_voters;

    #[test]
    fn zero_without_proposals_or_members() {
        assert_eq!(participation_score(&[], 10).score, 0.0);
        assert_eq!(participation_score(&[proposal_with_voters(0, 3)], 0).score, 0.0);
    }

    #[test]
    fn averages_voters_over_members() {
        let proposals = vec![proposal_with_voters(0, 2), proposal_with_voters(1, 4)];
        let metric = participation_score(&proposals, 10);
        assert_eq!(metric.score, 30.0);
        assert_eq!(metric.raw_value, 3.0);
        assert_eq!(metric.weight, 0.4);
        assert!(metric.description.contains("3.0 voters"));
    }

    #[test]
    fn caps_at_hundred_when_voters_exceed_members() {
        let proposals = vec![proposal_with_voters(0, 12)];
        assert_eq!(participation_score(&proposals, 5).score, 100.0);
    }
}
