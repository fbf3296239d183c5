#![allow(dead_code)]

use gri_lib::commands::near::{DataSource, RpcError};
use gri_lib::commands::settings::{DiscoverySettings, IndexerSettings};
use gri_lib::models::dao::DaoPolicy;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const FACTORY: &str = "sputnik-dao.near";

#[derive(Debug, Clone, Default)]
pub struct FakeDao {
    pub count: u64,
    pub members: Vec<String>,
    pub statuses: HashMap<u64, String>,
    pub unreachable: bool,
}

/// Scripted chain: per-DAO proposal counts, statuses and failures.
#[derive(Default)]
pub struct FakeSource {
    daos: Mutex<HashMap<String, FakeDao>>,
    factory_names: Mutex<Vec<String>>,
    failing_pages: Mutex<HashSet<(String, u64)>>,
    page_calls: Mutex<Vec<(String, u64, u64)>>,
    policy_hooks: Mutex<HashMap<String, PolicyHook>>,
}

type PolicyHook = Arc<dyn Fn() + Send + Sync>;

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dao(self, dao_id: &str, count: u64) -> Self {
        self.daos.lock().expect("fake lock").insert(
            dao_id.to_string(),
            FakeDao {
                count,
                members: vec!["a.near".into(), "b.near".into(), "c.near".into()],
                ..FakeDao::default()
            },
        );
        self
    }

    pub fn with_unreachable_dao(self, dao_id: &str) -> Self {
        self.daos.lock().expect("fake lock").insert(
            dao_id.to_string(),
            FakeDao {
                unreachable: true,
                ..FakeDao::default()
            },
        );
        self
    }

    pub fn with_factory(self, names: &[&str]) -> Self {
        *self.factory_names.lock().expect("fake lock") =
            names.iter().map(|name| name.to_string()).collect();
        self
    }

    pub fn set_count(&self, dao_id: &str, count: u64) {
        if let Some(dao) = self.daos.lock().expect("fake lock").get_mut(dao_id) {
            dao.count = count;
        }
    }

    pub fn set_status(&self, dao_id: &str, id: u64, status: &str) {
        if let Some(dao) = self.daos.lock().expect("fake lock").get_mut(dao_id) {
            dao.statuses.insert(id, status.to_string());
        }
    }

    pub fn fail_page(&self, dao_id: &str, from_index: u64) {
        self.failing_pages
            .lock()
            .expect("fake lock")
            .insert((dao_id.to_string(), from_index));
    }

    pub fn heal_pages(&self) {
        self.failing_pages.lock().expect("fake lock").clear();
    }

    /// Run `hook` whenever the policy of `dao_id` is fetched.
    pub fn on_policy_fetch(&self, dao_id: &str, hook: impl Fn() + Send + Sync + 'static) {
        self.policy_hooks
            .lock()
            .expect("fake lock")
            .insert(dao_id.to_string(), Arc::new(hook));
    }

    pub fn page_calls(&self) -> Vec<(String, u64, u64)> {
        self.page_calls.lock().expect("fake lock").clone()
    }

    fn dao(&self, dao_id: &str) -> Result<FakeDao, RpcError> {
        match self.daos.lock().expect("fake lock").get(dao_id) {
            Some(dao) if !dao.unreachable => Ok(dao.clone()),
            Some(_) => Err(RpcError::Transport("connection reset".into())),
            None => Err(RpcError::Rpc("UNKNOWN_ACCOUNT".into())),
        }
    }
}

pub fn raw_proposal(id: u64, status: &str) -> Value {
    json!({
        "id": id,
        "proposer": "alice.near",
        "description": format!("Proposal {id}: fund the next milestone of the community grants program"),
        "kind": { "Transfer": { "token_id": "", "receiver_id": "bob.near", "amount": "1" } },
        "status": status,
        "vote_counts": { "council": [1, 0, 0] },
        "votes": { format!("voter{}.near", id % 3): "Approve" },
        "submission_time": (1_700_000_000_000_000_000u64 + id).to_string()
    })
}

#[async_trait::async_trait]
impl DataSource for FakeSource {
    async fn fetch_proposal_page(
        &self,
        contract_id: &str,
        from_index: u64,
        limit: u64,
    ) -> Result<Vec<Value>, RpcError> {
        self.page_calls
            .lock()
            .expect("fake lock")
            .push((contract_id.to_string(), from_index, limit));

        if self
            .failing_pages
            .lock()
            .expect("fake lock")
            .contains(&(contract_id.to_string(), from_index))
        {
            return Err(RpcError::RateLimited);
        }

        let dao = self.dao(contract_id)?;
        let end = dao.count.min(from_index.saturating_add(limit));
        Ok((from_index..end)
            .map(|id| {
                let status = dao.statuses.get(&id).map(String::as_str).unwrap_or("InProgress");
                raw_proposal(id, status)
            })
            .collect())
    }

    async fn fetch_proposal_count(&self, contract_id: &str) -> Result<u64, RpcError> {
        Ok(self.dao(contract_id)?.count)
    }

    async fn fetch_policy(&self, contract_id: &str) -> Result<DaoPolicy, RpcError> {
        let hook = self.policy_hooks.lock().expect("fake lock").get(contract_id).cloned();
        if let Some(hook) = hook {
            hook();
        }
        let dao = self.dao(contract_id)?;
        serde_json::from_value(json!({
            "roles": [
                { "name": "all", "kind": "Everyone", "permissions": [], "vote_policy": {} },
                { "name": "council", "kind": { "Group": dao.members }, "permissions": ["*:*"], "vote_policy": {} }
            ],
            "default_vote_policy": { "weight_kind": "RoleWeight", "quorum": "0", "threshold": [1, 2] }
        }))
        .map_err(|e| RpcError::Malformed(e.to_string()))
    }

    async fn fetch_dao_list(
        &self,
        _factory_id: &str,
        from_index: u64,
        limit: u64,
    ) -> Result<Vec<String>, RpcError> {
        let names = self.factory_names.lock().expect("fake lock");
        Ok(names
            .iter()
            .skip(from_index as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

pub fn settings_for(tracked: &[&str]) -> IndexerSettings {
    IndexerSettings {
        max_proposals_per_dao: 100,
        page_size: 50,
        call_delay: Duration::ZERO,
        dao_delay: Duration::ZERO,
        tracked_daos: tracked.iter().map(|id| id.to_string()).collect(),
        refresh_open_proposals: false,
        discovery: DiscoverySettings {
            enabled: false,
            factory_id: FACTORY.to_string(),
            min_proposals: 50,
            max_daos: 15,
            page_size: 2,
        },
    }
}
