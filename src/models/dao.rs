use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;

/// A tracked DAO. `id` and `contract_id` carry the same account id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dao {
    pub id: String,
    pub name: String,
    pub contract_id: String,
    pub member_count: u64,
    pub created_at: i64,
    pub last_indexed_at: i64,
}

/// Who a role applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum RoleKind {
    Everyone,
    /// Token holders above a balance; the balance is kept opaque.
    Member(Value),
    Group(Vec<String>),
    Other(Value),
}

impl RoleKind {
    pub fn from_raw(raw: &Value) -> Self {
        match raw {
            Value::String(tag) if tag == "Everyone" => Self::Everyone,
            Value::Object(map) => {
                if let Some(members) = map.get("Group").and_then(Value::as_array) {
                    return Self::Group(
                        members
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect(),
                    );
                }
                if let Some(balance) = map.get("Member") {
                    return Self::Member(balance.clone());
                }
                Self::Other(raw.clone())
            }
            other => Self::Other(other.clone()),
        }
    }

    pub fn to_raw(&self) -> Value {
        match self {
            Self::Everyone => Value::String("Everyone".to_string()),
            Self::Member(balance) => serde_json::json!({ "Member": balance }),
            Self::Group(members) => serde_json::json!({ "Group": members }),
            Self::Other(raw) => raw.clone(),
        }
    }

    pub fn group_size(&self) -> usize {
        match self {
            Self::Group(members) => members.len(),
            _ => 0,
        }
    }
}

impl Serialize for RoleKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_raw().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RoleKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(Self::from_raw(&raw))
    }
}

/// Vote threshold: a `[numerator, denominator]` ratio or an absolute weight.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum VoteThreshold {
    Ratio(u64, u64),
    Weight(String),
    #[default]
    Majority,
}

impl VoteThreshold {
    pub fn from_raw(raw: &Value) -> Self {
        match raw {
            Value::Array(parts) if parts.len() == 2 => {
                match (parts[0].as_u64(), parts[1].as_u64()) {
                    (Some(num), Some(den)) => Self::Ratio(num, den),
                    _ => Self::Majority,
                }
            }
            Value::String(tag) if tag == "Majority" => Self::Majority,
            Value::String(weight) => Self::Weight(weight.clone()),
            Value::Object(map) => match (map.get("Ratio"), map.get("Weight")) {
                (Some(ratio), _) => Self::from_raw(ratio),
                (None, Some(Value::String(weight))) => Self::Weight(weight.clone()),
                _ => Self::Majority,
            },
            _ => Self::Majority,
        }
    }

    pub fn to_raw(&self) -> Value {
        match self {
            Self::Ratio(num, den) => serde_json::json!([num, den]),
            Self::Weight(weight) => Value::String(weight.clone()),
            Self::Majority => Value::String("Majority".to_string()),
        }
    }
}

impl Serialize for VoteThreshold {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_raw().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for VoteThreshold {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(Self::from_raw(&raw))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VotePolicy {
    #[serde(default)]
    pub weight_kind: String,
    #[serde(default)]
    pub quorum: String,
    #[serde(default)]
    pub threshold: VoteThreshold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub name: String,
    pub kind: RoleKind,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub vote_policy: HashMap<String, VotePolicy>,
}

/// Snapshot of a DAO's governance rules as returned by `get_policy`.
/// Fetched fresh every pass and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaoPolicy {
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub default_vote_policy: VotePolicy,
    #[serde(default)]
    pub proposal_bond: String,
    #[serde(default)]
    pub proposal_period: String,
    #[serde(default)]
    pub bounty_bond: String,
    #[serde(default)]
    pub bounty_forgiveness_period: String,
}
