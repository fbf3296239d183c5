use crate::models::proposal::{
    Proposal, ProposalKind, ProposalStatus, RawProposal, SubmissionTime, VoteAction, VoteCounts,
};
use serde_json::Value;
use std::collections::BTreeMap;

/// Map a raw contract record onto the canonical proposal shape.
/// Never fails: malformed optional fields fall back to empty/zero values.
pub fn normalize_proposal(raw: &RawProposal, dao_id: &str) -> Proposal {
    Proposal {
        id: raw.id,
        dao_id: dao_id.to_string(),
        proposer: raw.proposer.clone(),
        description: raw.description.clone(),
        kind: ProposalKind::from_raw(&raw.kind),
        status: ProposalStatus::from_raw(&raw.status),
        vote_count: sum_vote_counts(&raw.vote_counts),
        submission_time: SubmissionTime::from_raw(&raw.submission_time),
        votes: copy_votes(&raw.votes),
    }
}

/// Sum per-role `[approve, reject, remove]` tallies component-wise.
/// Entries that are not a 3-element numeric tuple are skipped.
pub fn sum_vote_counts(per_role: &Value) -> VoteCounts {
    let mut total = VoteCounts::default();
    let Some(roles) = per_role.as_object() else {
        return total;
    };

    for counts in roles.values() {
        let Some([approve, reject, remove]) = parse_tally(counts) else {
            continue;
        };
        total.approve = VoteCounts::saturate(u128::from(total.approve) + approve);
        total.reject = VoteCounts::saturate(u128::from(total.reject) + reject);
        total.remove = VoteCounts::saturate(u128::from(total.remove) + remove);
    }

    total
}

fn parse_tally(counts: &Value) -> Option<[u128; 3]> {
    let parts = counts.as_array()?;
    if parts.len() != 3 {
        return None;
    }
    Some([
        parse_count(&parts[0])?,
        parse_count(&parts[1])?,
        parse_count(&parts[2])?,
    ])
}

// Token-weighted DAOs report balances near 1e24, either as decimal strings
// or as numbers too large for u64 (held as f64).
fn parse_count(value: &Value) -> Option<u128> {
    match value {
        Value::Number(n) => n.as_u64().map(u128::from).or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u128)
        }),
        Value::String(s) => s.trim().parse::<u128>().ok(),
        _ => None,
    }
}

fn copy_votes(raw: &Value) -> BTreeMap<String, VoteAction> {
    let Some(votes) = raw.as_object() else {
        return BTreeMap::new();
    };

    votes
        .iter()
        .map(|(voter, action)| {
            let action = match action {
                Value::String(raw) => VoteAction::from_raw(raw),
                other => VoteAction::Other(other.to_string()),
            };
            (voter.clone(), action)
        })
        .collect()
}
