use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use std::time::Duration;

const SETTINGS_SCHEMA_VERSION: i64 = 1;

pub const DEFAULT_TRACKED_DAOS: [&str; 5] = [
    "sputnik-dao.near",
    "near.sputnik-dao.near",
    "marketing.sputnik-dao.near",
    "creative.sputnik-dao.near",
    "devhub.sputnik-dao.near",
];

pub const DEFAULT_CORS_ORIGINS: [&str; 3] = [
    "http://localhost:5173",
    "https://near-governance.vercel.app",
    "https://neardao.cyberpunkinc.xyz",
];

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverySettings {
    pub enabled: bool,
    pub factory_id: String,
    pub min_proposals: u64,
    pub max_daos: usize,
    pub page_size: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexerSettings {
    pub max_proposals_per_dao: u64,
    pub page_size: u64,
    pub call_delay: Duration,
    pub dao_delay: Duration,
    pub tracked_daos: Vec<String>,
    pub refresh_open_proposals: bool,
    pub discovery: DiscoverySettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveSettings {
    pub poll_interval: Duration,
    pub liveness_check: Duration,
    pub rpc_url: String,
    pub rpc_timeout: Duration,
    pub db_path: String,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub indexer: IndexerSettings,
}

impl Default for IndexerSettings {
    fn default() -> Self {
        effective_from_value(&migrate_settings(json!({}))).indexer
    }
}

/// Resolve settings: defaults, then the optional `GRI_SETTINGS_FILE`, then
/// environment overrides.
pub fn load_effective_settings() -> Result<EffectiveSettings, String> {
    let mut settings = match std::env::var("GRI_SETTINGS_FILE") {
        Ok(path) if !path.trim().is_empty() => load_settings_from_disk(&path)?,
        _ => default_settings(),
    };
    apply_env_overrides(&mut settings, std::env::vars());
    Ok(effective_from_value(&migrate_settings(settings)))
}

pub fn load_settings_from_disk(path: &str) -> Result<Value, String> {
    let path = Path::new(path);
    if !path.exists() {
        return Ok(default_settings());
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let parsed = serde_json::from_str::<Value>(&raw).unwrap_or_else(|_| json!({}));
    Ok(migrate_settings(parsed))
}

/// Overlay environment-style variables onto a settings document.
/// Values that do not parse are ignored.
pub fn apply_env_overrides<I>(settings: &mut Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut overrides = Map::new();
    let mut discovery = Map::new();

    for (key, raw) in vars {
        let raw = raw.trim();
        match key.as_str() {
            "GRI_POLL_INTERVAL_MS" => insert_u64(&mut overrides, "pollIntervalMs", raw),
            "GRI_LIVENESS_CHECK_MS" => insert_u64(&mut overrides, "livenessCheckMs", raw),
            "GRI_MAX_PROPOSALS_PER_DAO" => insert_u64(&mut overrides, "maxProposalsPerDao", raw),
            "GRI_PAGE_SIZE" => insert_u64(&mut overrides, "pageSize", raw),
            "GRI_CALL_DELAY_MS" => insert_u64(&mut overrides, "callDelayMs", raw),
            "GRI_DAO_DELAY_MS" => insert_u64(&mut overrides, "daoDelayMs", raw),
            "GRI_RPC_TIMEOUT_MS" => insert_u64(&mut overrides, "rpcTimeoutMs", raw),
            "PORT" => insert_u64(&mut overrides, "port", raw),
            "GRI_REFRESH_OPEN_PROPOSALS" => insert_bool(&mut overrides, "refreshOpenProposals", raw),
            "GRI_TRACKED_DAOS" => insert_list(&mut overrides, "trackedDaos", raw),
            "CORS_ORIGINS" => insert_list(&mut overrides, "corsOrigins", raw),
            "NEAR_RPC_URL" => insert_str(&mut overrides, "rpcUrl", raw),
            "GRI_DB_PATH" => insert_str(&mut overrides, "dbPath", raw),
            "HOST" => insert_str(&mut overrides, "host", raw),
            "GRI_DISCOVERY_ENABLED" => insert_bool(&mut discovery, "enabled", raw),
            "GRI_FACTORY_ID" => insert_str(&mut discovery, "factoryId", raw),
            "GRI_DISCOVERY_MIN_PROPOSALS" => insert_u64(&mut discovery, "minProposals", raw),
            "GRI_DISCOVERY_MAX_DAOS" => insert_u64(&mut discovery, "maxDaos", raw),
            "GRI_DISCOVERY_PAGE_SIZE" => insert_u64(&mut discovery, "pageSize", raw),
            _ => {}
        }
    }

    if !discovery.is_empty() {
        overrides.insert("discovery".to_string(), Value::Object(discovery));
    }
    merge_settings(settings, &Value::Object(overrides));
}

fn insert_u64(map: &mut Map<String, Value>, key: &str, raw: &str) {
    if let Ok(value) = raw.parse::<u64>() {
        map.insert(key.to_string(), json!(value));
    }
}

fn insert_list(map: &mut Map<String, Value>, key: &str, raw: &str) {
    let items: Vec<&str> = raw.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
    if !items.is_empty() {
        map.insert(key.to_string(), json!(items));
    }
}

fn insert_bool(map: &mut Map<String, Value>, key: &str, raw: &str) {
    let value = match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => return,
    };
    map.insert(key.to_string(), json!(value));
}

fn insert_str(map: &mut Map<String, Value>, key: &str, raw: &str) {
    if !raw.is_empty() {
        map.insert(key.to_string(), json!(raw));
    }
}

fn migrate_settings(input: Value) -> Value {
    let defaults = default_settings();
    let mut out = match input {
        Value::Object(map) => Value::Object(map),
        _ => Value::Object(Map::new()),
    };

    deep_merge_defaults(&mut out, &defaults);
    sanitize_settings(&mut out);
    if let Some(obj) = out.as_object_mut() {
        obj.insert("schema_version".to_string(), json!(SETTINGS_SCHEMA_VERSION));
    }

    out
}

fn default_settings() -> Value {
    json!({
        "schema_version": SETTINGS_SCHEMA_VERSION,
        "pollIntervalMs": 30 * 60 * 1000,
        "livenessCheckMs": 60 * 1000,
        "maxProposalsPerDao": 100,
        "pageSize": 50,
        "callDelayMs": 200,
        "daoDelayMs": 500,
        "trackedDaos": DEFAULT_TRACKED_DAOS,
        "refreshOpenProposals": false,
        "rpcUrl": "https://free.rpc.fastnear.com",
        "rpcTimeoutMs": 15_000,
        "dbPath": "gri.db",
        "host": "0.0.0.0",
        "port": 3001,
        "corsOrigins": DEFAULT_CORS_ORIGINS,
        "discovery": {
            "enabled": false,
            "factoryId": "sputnik-dao.near",
            "minProposals": 50,
            "maxDaos": 15,
            "pageSize": 100
        }
    })
}

fn deep_merge_defaults(target: &mut Value, defaults: &Value) {
    let (Some(target_obj), Some(default_obj)) = (target.as_object_mut(), defaults.as_object()) else {
        return;
    };

    for (key, default_value) in default_obj {
        match target_obj.get_mut(key) {
            Some(existing) => {
                if existing.is_object() && default_value.is_object() {
                    deep_merge_defaults(existing, default_value);
                }
            }
            None => {
                target_obj.insert(key.clone(), default_value.clone());
            }
        }
    }
}

fn merge_settings(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(target_obj), Value::Object(incoming_obj)) => {
            for (key, value) in incoming_obj {
                if let Some(existing) = target_obj.get_mut(key) {
                    merge_settings(existing, value);
                } else {
                    target_obj.insert(key.clone(), value.clone());
                }
            }
        }
        (target_slot, incoming_value) => {
            *target_slot = incoming_value.clone();
        }
    }
}

fn sanitize_settings(settings: &mut Value) {
    let Some(obj) = settings.as_object_mut() else {
        return;
    };

    // Clamp numerics.
    clamp_u64(obj, "pollIntervalMs", 10_000, 86_400_000, 1_800_000);
    clamp_u64(obj, "livenessCheckMs", 1_000, 3_600_000, 60_000);
    clamp_u64(obj, "maxProposalsPerDao", 1, 10_000, 100);
    clamp_u64(obj, "pageSize", 1, 500, 50);
    clamp_u64(obj, "callDelayMs", 0, 60_000, 200);
    clamp_u64(obj, "daoDelayMs", 0, 60_000, 500);
    clamp_u64(obj, "rpcTimeoutMs", 1_000, 120_000, 15_000);
    clamp_u64(obj, "port", 1, u16::MAX as u64, 3001);

    ensure_bool(obj, "refreshOpenProposals", false);
    ensure_str(obj, "rpcUrl", "https://free.rpc.fastnear.com");
    ensure_str(obj, "dbPath", "gri.db");
    ensure_str(obj, "host", "0.0.0.0");
    sanitize_list(obj, "trackedDaos", &DEFAULT_TRACKED_DAOS);
    sanitize_list(obj, "corsOrigins", &DEFAULT_CORS_ORIGINS);

    let discovery = obj
        .entry("discovery".to_string())
        .or_insert_with(|| json!({}));
    if !discovery.is_object() {
        *discovery = json!({});
    }
    if let Some(discovery) = discovery.as_object_mut() {
        ensure_bool(discovery, "enabled", false);
        ensure_str(discovery, "factoryId", "sputnik-dao.near");
        clamp_u64(discovery, "minProposals", 0, 1_000_000, 50);
        clamp_u64(discovery, "maxDaos", 0, 1_000, 15);
        clamp_u64(discovery, "pageSize", 1, 500, 100);
    }
}

// Trimmed, deduplicated, non-empty; falls back to `defaults`.
fn sanitize_list(map: &mut Map<String, Value>, key: &str, defaults: &[&str]) {
    let mut items: Vec<String> = Vec::new();
    if let Some(raw) = map.get(key).and_then(Value::as_array) {
        for item in raw.iter().filter_map(Value::as_str).map(str::trim) {
            if !item.is_empty() && !items.iter().any(|seen| seen == item) {
                items.push(item.to_string());
            }
        }
    }
    if items.is_empty() {
        items = defaults.iter().map(|s| s.to_string()).collect();
    }
    map.insert(key.to_string(), json!(items));
}

fn clamp_u64(map: &mut Map<String, Value>, key: &str, min: u64, max: u64, default: u64) {
    let raw = map.get(key).and_then(Value::as_u64).unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

fn ensure_bool(map: &mut Map<String, Value>, key: &str, default: bool) {
    let value = map.get(key).and_then(Value::as_bool).unwrap_or(default);
    map.insert(key.to_string(), json!(value));
}

fn ensure_str(map: &mut Map<String, Value>, key: &str, default: &str) {
    let value = map
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string();
    map.insert(key.to_string(), json!(value));
}

/// Read typed settings out of a sanitized document.
fn effective_from_value(settings: &Value) -> EffectiveSettings {
    let u64_of = |v: &Value, key: &str| v.get(key).and_then(Value::as_u64).unwrap_or(0);
    let str_of = |v: &Value, key: &str| {
        v.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let list_of = |v: &Value, key: &str| -> Vec<String> {
        v.get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };
    let discovery = settings.get("discovery").cloned().unwrap_or_else(|| json!({}));

    EffectiveSettings {
        poll_interval: Duration::from_millis(u64_of(settings, "pollIntervalMs")),
        liveness_check: Duration::from_millis(u64_of(settings, "livenessCheckMs")),
        rpc_url: str_of(settings, "rpcUrl"),
        rpc_timeout: Duration::from_millis(u64_of(settings, "rpcTimeoutMs")),
        db_path: str_of(settings, "dbPath"),
        host: str_of(settings, "host"),
        port: u16::try_from(u64_of(settings, "port")).unwrap_or(3001),
        cors_origins: list_of(settings, "corsOrigins"),
        indexer: IndexerSettings {
            max_proposals_per_dao: u64_of(settings, "maxProposalsPerDao"),
            page_size: u64_of(settings, "pageSize"),
            call_delay: Duration::from_millis(u64_of(settings, "callDelayMs")),
            dao_delay: Duration::from_millis(u64_of(settings, "daoDelayMs")),
            tracked_daos: list_of(settings, "trackedDaos"),
            refresh_open_proposals: settings
                .get("refreshOpenProposals")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            discovery: DiscoverySettings {
                enabled: discovery
                    .get("enabled")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                factory_id: str_of(&discovery, "factoryId"),
                min_proposals: u64_of(&discovery, "minProposals"),
                max_daos: u64_of(&discovery, "maxDaos") as usize,
                page_size: u64_of(&discovery, "pageSize"),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_match_documented_values() {
        let effective = effective_from_value(&migrate_settings(json!({})));
        assert_eq!(effective.poll_interval, Duration::from_secs(30 * 60));
        assert_eq!(effective.liveness_check, Duration::from_secs(60));
        assert_eq!(effective.indexer.max_proposals_per_dao, 100);
        assert_eq!(effective.indexer.page_size, 50);
        assert_eq!(effective.indexer.tracked_daos.len(), DEFAULT_TRACKED_DAOS.len());
        assert!(!effective.indexer.discovery.enabled);
        assert!(!effective.indexer.refresh_open_proposals);
        assert_eq!(effective.port, 3001);
        assert_eq!(effective.cors_origins, DEFAULT_CORS_ORIGINS.map(String::from).to_vec());
    }

    #[test]
    fn env_overrides_apply_and_bad_values_are_ignored() {
        let mut settings = default_settings();
        apply_env_overrides(
            &mut settings,
            vars(&[
                ("GRI_MAX_PROPOSALS_PER_DAO", "250"),
                ("GRI_PAGE_SIZE", "not-a-number"),
                ("GRI_TRACKED_DAOS", " a.sputnik-dao.near, ,b.sputnik-dao.near,a.sputnik-dao.near"),
                ("GRI_DISCOVERY_ENABLED", "true"),
                ("GRI_DISCOVERY_MIN_PROPOSALS", "10"),
                ("PORT", "8080"),
                ("CORS_ORIGINS", "https://gri.example.org, http://localhost:3000"),
                ("UNRELATED", "x"),
            ]),
        );
        let effective = effective_from_value(&migrate_settings(settings));

        assert_eq!(effective.indexer.max_proposals_per_dao, 250);
        assert_eq!(effective.indexer.page_size, 50);
        assert_eq!(
            effective.indexer.tracked_daos,
            vec!["a.sputnik-dao.near".to_string(), "b.sputnik-dao.near".to_string()]
        );
        assert!(effective.indexer.discovery.enabled);
        assert_eq!(effective.indexer.discovery.min_proposals, 10);
        assert_eq!(effective.indexer.discovery.factory_id, "sputnik-dao.near");
        assert_eq!(effective.port, 8080);
        assert_eq!(
            effective.cors_origins,
            vec!["https://gri.example.org".to_string(), "http://localhost:3000".to_string()]
        );
    }

    #[test]
    fn clamps_out_of_range_numbers() {
        let migrated = migrate_settings(json!({
            "pollIntervalMs": 5,
            "pageSize": 100_000,
            "trackedDaos": []
        }));
        let effective = effective_from_value(&migrated);
        assert_eq!(effective.poll_interval, Duration::from_millis(10_000));
        assert_eq!(effective.indexer.page_size, 500);
        assert_eq!(effective.indexer.tracked_daos.len(), DEFAULT_TRACKED_DAOS.len());
    }

    #[test]
    fn settings_file_is_merged_over_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "pageSize": 25, "discovery": { "maxDaos": 3 } }"#).expect("write");

        let loaded = load_settings_from_disk(&path.to_string_lossy()).expect("load");
        let effective = effective_from_value(&loaded);
        assert_eq!(effective.indexer.page_size, 25);
        assert_eq!(effective.indexer.discovery.max_daos, 3);
        assert_eq!(effective.indexer.discovery.page_size, 100);
        assert_eq!(effective.indexer.max_proposals_per_dao, 100);
    }
}
