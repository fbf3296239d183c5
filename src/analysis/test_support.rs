use crate::models::proposal::{
    Proposal, ProposalKind, ProposalStatus, SubmissionTime, VoteAction, VoteCounts,
};
use std::collections::BTreeMap;

pub fn proposal(id: u64) -> Proposal {
    Proposal {
        id,
        dao_id: "test.sputnik-dao.near".to_string(),
        proposer: "alice.near".to_string(),
        description: String::new(),
        kind: ProposalKind::Vote(serde_json::Value::Null),
        status: ProposalStatus::InProgress,
        vote_count: VoteCounts::default(),
        submission_time: SubmissionTime(0),
        votes: BTreeMap::new(),
    }
}

pub fn proposal_with_voters(id: u64, voters: usize) -> Proposal {
    let mut p = proposal(id);
    for i in 0..voters {
        p.votes.insert(format!("voter{i}.near"), VoteAction::Approve);
    }
    p
}

pub fn proposal_with_status(id: u64, status: ProposalStatus) -> Proposal {
    let mut p = proposal(id);
    p.status = status;
    p
}

pub fn proposal_with_description(id: u64, description: &str) -> Proposal {
    let mut p = proposal(id);
    p.description = description.to_string();
    p
}
