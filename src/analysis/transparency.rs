use crate::models::gri::{round1, GriMetric, TRANSPARENCY_WEIGHT};
use crate::models::proposal::Proposal;

/// Descriptions longer than this many characters count as detailed.
pub const DETAILED_DESCRIPTION_CHARS: usize = 50;

/// Transparency (10%): share of proposals with a detailed description.
pub fn transparency_score(proposals: &[Proposal]) -> GriMetric {
    if proposals.is_empty() {
        return GriMetric {
            score: 0.0,
            weight: TRANSPARENCY_WEIGHT,
            raw_value: 0.0,
            description: "No proposals found".to_string(),
        };
    }

    let detailed = proposals
        .iter()
        .filter(|p| p.description.chars().count() > DETAILED_DESCRIPTION_CHARS)
        .count();
    let rate = detailed as f64 / proposals.len() as f64 * 100.0;

    GriMetric {
        score: round1(rate),
        weight: TRANSPARENCY_WEIGHT,
        raw_value: detailed as f64,
        description: format!(
            "{detailed} of {} proposals have detailed descriptions",
            proposals.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::proposal_with_description;

    #[test]
    fn zero_without_proposals() {
        assert_eq!(transparency_score(&[]).score, 0.0);
    }

    #[test]
    fn counts_descriptions_strictly_longer_than_threshold() {
        let proposals = vec![
            proposal_with_description(0, &"x".repeat(50)),
            proposal_with_description(1, &"x".repeat(51)),
            proposal_with_description(2, ""),
        ];
        let metric = transparency_score(&proposals);
        assert_eq!(metric.raw_value, 1.0);
        assert_eq!(metric.score, 33.3);
    }

    #[test]
    fn measures_characters_not_bytes() {
        // 30 two-byte characters: 60 bytes but only 30 chars.
        let proposals = vec![proposal_with_description(0, &"é".repeat(30))];
        assert_eq!(transparency_score(&proposals).score, 0.0);
    }
}
