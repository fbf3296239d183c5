use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Proposal lifecycle status as reported by the contract.
/// Anything other than `InProgress` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    InProgress,
    Approved,
    Rejected,
    Removed,
    Expired,
    Moved,
    Failed,
    #[serde(other)]
    Unknown,
}

impl ProposalStatus {
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "InProgress" => Self::InProgress,
            "Approved" => Self::Approved,
            "Rejected" => Self::Rejected,
            "Removed" => Self::Removed,
            "Expired" => Self::Expired,
            "Moved" => Self::Moved,
            "Failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "InProgress",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Removed => "Removed",
            Self::Expired => "Expired",
            Self::Moved => "Moved",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// A single voter's action. Unknown strings pass through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VoteAction {
    Approve,
    Reject,
    Remove,
    Other(String),
}

impl VoteAction {
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "Approve" => Self::Approve,
            "Reject" => Self::Reject,
            "Remove" => Self::Remove,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Approve => "Approve",
            Self::Reject => "Reject",
            Self::Remove => "Remove",
            Self::Other(raw) => raw,
        }
    }
}

impl Serialize for VoteAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for VoteAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_raw(&raw))
    }
}

/// Tally summed across every role of the DAO. Token-weighted tallies can
/// exceed any integer column, so each component saturates at `MAX_TALLY`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
    pub approve: u64,
    pub reject: u64,
    pub remove: u64,
}

impl VoteCounts {
    pub const MAX_TALLY: u64 = i64::MAX as u64;

    pub fn saturate(value: u128) -> u64 {
        u64::try_from(value).map_or(Self::MAX_TALLY, |v| v.min(Self::MAX_TALLY))
    }
}

/// Nanoseconds since the unix epoch. Kept as an integer end to end and
/// serialized as a decimal string so consumers never see a lossy float.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubmissionTime(pub u64);

impl SubmissionTime {
    pub const NANOS_PER_MILLI: u64 = 1_000_000;

    pub fn as_nanos(&self) -> u64 {
        self.0
    }

    pub fn as_millis(&self) -> i64 {
        (self.0 / Self::NANOS_PER_MILLI) as i64
    }

    /// Accepts a JSON number or a numeric string. Anything else is zero.
    pub fn from_raw(raw: &Value) -> Self {
        match raw {
            Value::Number(n) => Self(n.as_u64().unwrap_or(0)),
            Value::String(s) => Self(s.trim().parse::<u64>().unwrap_or(0)),
            _ => Self(0),
        }
    }
}

impl fmt::Display for SubmissionTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for SubmissionTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for SubmissionTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(Self::from_raw(&raw))
    }
}

/// Action a proposal asks the DAO to perform. Payloads are opaque; the
/// scoring engine only needs to count proposals, never to read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum ProposalKind {
    AddMemberToRole(Value),
    RemoveMemberFromRole(Value),
    FunctionCall(Value),
    UpgradeSelf(Value),
    UpgradeRemote(Value),
    Transfer(Value),
    SetStakingContract(Value),
    AddBounty(Value),
    BountyDone(Value),
    Vote(Value),
    FactoryInfoUpdate(Value),
    ChangeConfig(Value),
    ChangePolicy(Value),
    ChangePolicyAddOrUpdateRole(Value),
    ChangePolicyRemoveRole(Value),
    ChangePolicyUpdateDefaultVotePolicy(Value),
    ChangePolicyUpdateParameters(Value),
    Unknown { name: String, payload: Value },
}

impl ProposalKind {
    /// Decode the chain encoding: either a bare tag string (`"Vote"`) or a
    /// single-key object (`{"Transfer": {...}}`).
    pub fn from_raw(raw: &Value) -> Self {
        let (name, payload) = match raw {
            Value::String(tag) => (tag.clone(), Value::Null),
            Value::Object(map) if map.len() == 1 => match map.iter().next() {
                Some((tag, payload)) => (tag.clone(), payload.clone()),
                None => (String::new(), Value::Null),
            },
            other => (String::new(), other.clone()),
        };

        match name.as_str() {
            "AddMemberToRole" => Self::AddMemberToRole(payload),
            "RemoveMemberFromRole" => Self::RemoveMemberFromRole(payload),
            "FunctionCall" => Self::FunctionCall(payload),
            "UpgradeSelf" => Self::UpgradeSelf(payload),
            "UpgradeRemote" => Self::UpgradeRemote(payload),
            "Transfer" => Self::Transfer(payload),
            "SetStakingContract" => Self::SetStakingContract(payload),
            "AddBounty" => Self::AddBounty(payload),
            "BountyDone" => Self::BountyDone(payload),
            "Vote" => Self::Vote(payload),
            "FactoryInfoUpdate" => Self::FactoryInfoUpdate(payload),
            "ChangeConfig" => Self::ChangeConfig(payload),
            "ChangePolicy" => Self::ChangePolicy(payload),
            "ChangePolicyAddOrUpdateRole" => Self::ChangePolicyAddOrUpdateRole(payload),
            "ChangePolicyRemoveRole" => Self::ChangePolicyRemoveRole(payload),
            "ChangePolicyUpdateDefaultVotePolicy" => {
                Self::ChangePolicyUpdateDefaultVotePolicy(payload)
            }
            "ChangePolicyUpdateParameters" => Self::ChangePolicyUpdateParameters(payload),
            _ => Self::Unknown { name, payload },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::AddMemberToRole(_) => "AddMemberToRole",
            Self::RemoveMemberFromRole(_) => "RemoveMemberFromRole",
            Self::FunctionCall(_) => "FunctionCall",
            Self::UpgradeSelf(_) => "UpgradeSelf",
            Self::UpgradeRemote(_) => "UpgradeRemote",
            Self::Transfer(_) => "Transfer",
            Self::SetStakingContract(_) => "SetStakingContract",
            Self::AddBounty(_) => "AddBounty",
            Self::BountyDone(_) => "BountyDone",
            Self::Vote(_) => "Vote",
            Self::FactoryInfoUpdate(_) => "FactoryInfoUpdate",
            Self::ChangeConfig(_) => "ChangeConfig",
            Self::ChangePolicy(_) => "ChangePolicy",
            Self::ChangePolicyAddOrUpdateRole(_) => "ChangePolicyAddOrUpdateRole",
            Self::ChangePolicyRemoveRole(_) => "ChangePolicyRemoveRole",
            Self::ChangePolicyUpdateDefaultVotePolicy(_) => "ChangePolicyUpdateDefaultVotePolicy",
            Self::ChangePolicyUpdateParameters(_) => "ChangePolicyUpdateParameters",
            Self::Unknown { name, .. } => name,
        }
    }

    fn payload(&self) -> &Value {
        match self {
            Self::AddMemberToRole(p)
            | Self::RemoveMemberFromRole(p)
            | Self::FunctionCall(p)
            | Self::UpgradeSelf(p)
            | Self::UpgradeRemote(p)
            | Self::Transfer(p)
            | Self::SetStakingContract(p)
            | Self::AddBounty(p)
            | Self::BountyDone(p)
            | Self::Vote(p)
            | Self::FactoryInfoUpdate(p)
            | Self::ChangeConfig(p)
            | Self::ChangePolicy(p)
            | Self::ChangePolicyAddOrUpdateRole(p)
            | Self::ChangePolicyRemoveRole(p)
            | Self::ChangePolicyUpdateDefaultVotePolicy(p)
            | Self::ChangePolicyUpdateParameters(p) => p,
            Self::Unknown { payload, .. } => payload,
        }
    }

    /// Re-encode in the chain's shape.
    pub fn to_raw(&self) -> Value {
        let name = self.name();
        let payload = self.payload();
        if name.is_empty() {
            return payload.clone();
        }
        if payload.is_null() {
            return Value::String(name.to_string());
        }
        let mut map = serde_json::Map::new();
        map.insert(name.to_string(), payload.clone());
        Value::Object(map)
    }
}

impl From<Value> for ProposalKind {
    fn from(raw: Value) -> Self {
        Self::from_raw(&raw)
    }
}

impl From<ProposalKind> for Value {
    fn from(kind: ProposalKind) -> Self {
        kind.to_raw()
    }
}

impl Default for ProposalKind {
    fn default() -> Self {
        Self::Unknown {
            name: String::new(),
            payload: Value::Null,
        }
    }
}

/// Canonical proposal. Natural key is (`dao_id`, `id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: u64,
    pub dao_id: String,
    pub proposer: String,
    pub description: String,
    pub kind: ProposalKind,
    pub status: ProposalStatus,
    pub vote_count: VoteCounts,
    pub submission_time: SubmissionTime,
    pub votes: BTreeMap<String, VoteAction>,
}

/// Proposal record exactly as `get_proposals` returns it. Every field but
/// `id` is lenient; normalization decides what the loose values mean.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProposal {
    pub id: u64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub proposer: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default)]
    pub kind: Value,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default)]
    pub vote_counts: Value,
    #[serde(default)]
    pub votes: Value,
    #[serde(default)]
    pub submission_time: Value,
}

// Null or non-string values read as empty.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_decodes_tagged_and_bare_forms() {
        let transfer = ProposalKind::from_raw(&json!({
            "Transfer": { "token_id": "", "receiver_id": "bob.near", "amount": "1" }
        }));
        assert_eq!(transfer.name(), "Transfer");

        let vote = ProposalKind::from_raw(&json!("Vote"));
        assert_eq!(vote, ProposalKind::Vote(Value::Null));
        assert_eq!(vote.to_raw(), json!("Vote"));
    }

    #[test]
    fn unknown_kind_keeps_name_and_payload() {
        let raw = json!({ "SomethingNew": { "x": 1 } });
        let kind = ProposalKind::from_raw(&raw);
        assert_eq!(kind.name(), "SomethingNew");
        assert_eq!(kind.to_raw(), raw);
    }

    #[test]
    fn submission_time_survives_nanosecond_magnitudes() {
        let raw = json!("1700000000123456789");
        let time = SubmissionTime::from_raw(&raw);
        assert_eq!(time.as_nanos(), 1_700_000_000_123_456_789);
        assert_eq!(time.as_millis(), 1_700_000_000_123);
        assert_eq!(serde_json::to_value(time).unwrap(), json!("1700000000123456789"));
    }

    #[test]
    fn unrecognized_status_is_unknown_and_terminal() {
        let status: ProposalStatus = serde_json::from_value(json!("Vetoed")).unwrap();
        assert_eq!(status, ProposalStatus::Unknown);
        assert!(status.is_terminal());
        assert!(!ProposalStatus::InProgress.is_terminal());
    }

    #[test]
    fn raw_proposal_tolerates_null_and_mistyped_text() {
        let raw: RawProposal = serde_json::from_value(json!({
            "id": 4,
            "proposer": null,
            "description": null,
            "status": 7
        }))
        .unwrap();
        assert_eq!(raw.id, 4);
        assert_eq!(raw.proposer, "");
        assert_eq!(raw.description, "");
        assert_eq!(raw.status, "");
    }

    #[test]
    fn tallies_saturate_below_the_integer_column_limit() {
        assert_eq!(VoteCounts::saturate(12), 12);
        assert_eq!(VoteCounts::saturate(u128::from(u64::MAX)), VoteCounts::MAX_TALLY);
        assert_eq!(VoteCounts::saturate(1_000_000_000_000_000_000_000_000), VoteCounts::MAX_TALLY);
    }

    #[test]
    fn vote_action_passes_unknown_strings_through() {
        let action: VoteAction = serde_json::from_value(json!("Abstain")).unwrap();
        assert_eq!(action, VoteAction::Other("Abstain".to_string()));
        assert_eq!(serde_json::to_value(&action).unwrap(), json!("Abstain"));
    }
}
