use crate::models::dao::Dao;
use crate::models::proposal::{
    Proposal, ProposalKind, ProposalStatus, SubmissionTime, VoteAction, VoteCounts,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

const DB_SCHEMA_VERSION: i64 = 2;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Encoding error: {0}")]
    Encoding(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Fields written when a DAO is indexed. Creation fills every column;
/// later passes only refresh the member count and index timestamp.
#[derive(Debug, Clone)]
pub struct DaoFields {
    pub name: String,
    pub member_count: u64,
    pub indexed_at: i64,
}

pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA synchronous = NORMAL;",
    )?;

    let mut version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        apply_migration_1(conn)?;
        version = 1;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version < 2 {
        apply_migration_2(conn)?;
        version = 2;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version > DB_SCHEMA_VERSION {
        // Future schema; do not fail reads/writes for forward-compatible changes.
        conn.pragma_update(None, "user_version", version)?;
    }

    Ok(())
}

fn apply_migration_1(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS daos (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            contract_id TEXT NOT NULL,
            member_count INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            last_indexed_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS proposals (
            dao_id TEXT NOT NULL REFERENCES daos(id),
            id INTEGER NOT NULL,
            proposer TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            kind_json TEXT NOT NULL DEFAULT 'null',
            status TEXT NOT NULL,
            approve_count INTEGER NOT NULL DEFAULT 0,
            reject_count INTEGER NOT NULL DEFAULT 0,
            remove_count INTEGER NOT NULL DEFAULT 0,
            submission_time TEXT NOT NULL DEFAULT '0',
            updated_at INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (dao_id, id)
        );

        CREATE TABLE IF NOT EXISTS votes (
            dao_id TEXT NOT NULL,
            proposal_id INTEGER NOT NULL,
            voter TEXT NOT NULL,
            action TEXT NOT NULL,
            PRIMARY KEY (dao_id, proposal_id, voter),
            FOREIGN KEY (dao_id, proposal_id) REFERENCES proposals(dao_id, id)
        );
        ",
    )
}

fn apply_migration_2(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_proposals_status ON proposals(dao_id, status);
        CREATE INDEX IF NOT EXISTS idx_votes_proposal ON votes(dao_id, proposal_id);
        ",
    )
}

/// Key-indexed record store for DAOs, proposals and votes. Every write is
/// an upsert on the natural key, so repeated writes converge.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &str) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    pub fn upsert_dao(&self, id: &str, fields: &DaoFields) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "
            INSERT INTO daos (id, name, contract_id, member_count, created_at, last_indexed_at)
            VALUES (?1, ?2, ?1, ?3, ?4, ?4)
            ON CONFLICT(id) DO UPDATE SET
                member_count = excluded.member_count,
                last_indexed_at = excluded.last_indexed_at
            ",
            params![id, fields.name, fields.member_count as i64, fields.indexed_at],
        )?;
        Ok(())
    }

    pub fn find_dao(&self, id: &str) -> StoreResult<Option<Dao>> {
        let conn = self.lock()?;
        let dao = conn
            .query_row(
                "SELECT id, name, contract_id, member_count, created_at, last_indexed_at FROM daos WHERE id = ?1",
                params![id],
                dao_from_row,
            )
            .optional()?;
        Ok(dao)
    }

    pub fn list_daos(&self) -> StoreResult<Vec<Dao>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, contract_id, member_count, created_at, last_indexed_at FROM daos ORDER BY id ASC",
        )?;
        let daos = stmt
            .query_map([], dao_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(daos)
    }

    pub fn count_daos(&self) -> StoreResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM daos", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Greatest stored proposal id for a DAO (the high-water mark).
    pub fn find_max_proposal_id(&self, dao_id: &str) -> StoreResult<Option<u64>> {
        let conn = self.lock()?;
        let max: Option<i64> = conn.query_row(
            "SELECT MAX(id) FROM proposals WHERE dao_id = ?1",
            params![dao_id],
            |row| row.get(0),
        )?;
        Ok(max.map(|id| id as u64))
    }

    /// Stored ids still `InProgress`, ascending.
    pub fn list_open_proposal_ids(&self, dao_id: &str) -> StoreResult<Vec<u64>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id FROM proposals WHERE dao_id = ?1 AND status = 'InProgress' ORDER BY id ASC",
        )?;
        let ids = stmt
            .query_map(params![dao_id], |row| row.get::<_, i64>(0))?
            .map(|id| id.map(|id| id as u64))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    pub fn upsert_proposal(&self, proposal: &Proposal) -> StoreResult<()> {
        let conn = self.lock()?;
        upsert_proposal_with_conn(&conn, proposal)
    }

    pub fn upsert_vote(
        &self,
        dao_id: &str,
        proposal_id: u64,
        voter: &str,
        action: &VoteAction,
    ) -> StoreResult<()> {
        let conn = self.lock()?;
        upsert_vote_with_conn(&conn, dao_id, proposal_id, voter, action)
    }

    /// Persist a page of proposals and all of their votes atomically.
    pub fn upsert_proposals(&self, proposals: &[Proposal]) -> StoreResult<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let mut votes = 0;
        for proposal in proposals {
            upsert_proposal_with_conn(&tx, proposal)?;
            for (voter, action) in &proposal.votes {
                upsert_vote_with_conn(&tx, &proposal.dao_id, proposal.id, voter, action)?;
                votes += 1;
            }
        }
        tx.commit()?;
        Ok(votes)
    }

    /// Every stored proposal of a DAO with its votes, newest id first.
    pub fn list_proposals(&self, dao_id: &str) -> StoreResult<Vec<Proposal>> {
        let conn = self.lock()?;
        let mut votes_by_proposal: HashMap<u64, BTreeMap<String, VoteAction>> = HashMap::new();
        {
            let mut stmt = conn.prepare(
                "SELECT proposal_id, voter, action FROM votes WHERE dao_id = ?1",
            )?;
            let rows = stmt.query_map(params![dao_id], |row| {
                Ok((
                    row.get::<_, i64>(0)? as u64,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;
            for row in rows {
                let (proposal_id, voter, action) = row?;
                votes_by_proposal
                    .entry(proposal_id)
                    .or_default()
                    .insert(voter, VoteAction::from_raw(&action));
            }
        }

        let mut stmt = conn.prepare(
            "
            SELECT id, dao_id, proposer, description, kind_json, status,
                   approve_count, reject_count, remove_count, submission_time
            FROM proposals WHERE dao_id = ?1 ORDER BY id DESC
            ",
        )?;
        let rows = stmt
            .query_map(params![dao_id], |row| {
                Ok(ProposalRow {
                    id: row.get::<_, i64>(0)? as u64,
                    dao_id: row.get(1)?,
                    proposer: row.get(2)?,
                    description: row.get(3)?,
                    kind_json: row.get(4)?,
                    status: row.get(5)?,
                    approve: row.get::<_, i64>(6)? as u64,
                    reject: row.get::<_, i64>(7)? as u64,
                    remove: row.get::<_, i64>(8)? as u64,
                    submission_time: row.get(9)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|row| {
                let votes = votes_by_proposal.remove(&row.id).unwrap_or_default();
                row.into_proposal(votes)
            })
            .collect()
    }

    pub fn find_proposal(&self, dao_id: &str, id: u64) -> StoreResult<Option<Proposal>> {
        Ok(self
            .list_proposals(dao_id)?
            .into_iter()
            .find(|proposal| proposal.id == id))
    }

    pub fn count_proposals(&self, dao_id: &str) -> StoreResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM proposals WHERE dao_id = ?1",
            params![dao_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn count_votes(&self, dao_id: &str) -> StoreResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM votes WHERE dao_id = ?1",
            params![dao_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

struct ProposalRow {
    id: u64,
    dao_id: String,
    proposer: String,
    description: String,
    kind_json: String,
    status: String,
    approve: u64,
    reject: u64,
    remove: u64,
    submission_time: String,
}

impl ProposalRow {
    fn into_proposal(self, votes: BTreeMap<String, VoteAction>) -> StoreResult<Proposal> {
        let kind_raw: serde_json::Value = serde_json::from_str(&self.kind_json)
            .map_err(|e| StoreError::Encoding(format!("proposal {} kind: {e}", self.id)))?;

        Ok(Proposal {
            id: self.id,
            dao_id: self.dao_id,
            proposer: self.proposer,
            description: self.description,
            kind: ProposalKind::from_raw(&kind_raw),
            status: ProposalStatus::from_raw(&self.status),
            vote_count: VoteCounts {
                approve: self.approve,
                reject: self.reject,
                remove: self.remove,
            },
            submission_time: SubmissionTime(self.submission_time.parse().unwrap_or(0)),
            votes,
        })
    }
}

fn dao_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Dao> {
    Ok(Dao {
        id: row.get(0)?,
        name: row.get(1)?,
        contract_id: row.get(2)?,
        member_count: row.get::<_, i64>(3)? as u64,
        created_at: row.get(4)?,
        last_indexed_at: row.get(5)?,
    })
}

fn upsert_proposal_with_conn(conn: &Connection, proposal: &Proposal) -> StoreResult<()> {
    let kind_json = serde_json::to_string(&proposal.kind.to_raw())
        .map_err(|e| StoreError::Encoding(format!("proposal {} kind: {e}", proposal.id)))?;
    let now = chrono::Utc::now().timestamp();

    conn.execute(
        "
        INSERT INTO proposals (
            dao_id,
            id,
            proposer,
            description,
            kind_json,
            status,
            approve_count,
            reject_count,
            remove_count,
            submission_time,
            updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(dao_id, id) DO UPDATE SET
            status = excluded.status,
            approve_count = excluded.approve_count,
            reject_count = excluded.reject_count,
            remove_count = excluded.remove_count,
            updated_at = excluded.updated_at
        ",
        params![
            proposal.dao_id,
            proposal.id as i64,
            proposal.proposer,
            proposal.description,
            kind_json,
            proposal.status.as_str(),
            proposal.vote_count.approve as i64,
            proposal.vote_count.reject as i64,
            proposal.vote_count.remove as i64,
            proposal.submission_time.to_string(),
            now,
        ],
    )?;

    Ok(())
}

fn upsert_vote_with_conn(
    conn: &Connection,
    dao_id: &str,
    proposal_id: u64,
    voter: &str,
    action: &VoteAction,
) -> StoreResult<()> {
    conn.execute(
        "
        INSERT INTO votes (dao_id, proposal_id, voter, action) VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(dao_id, proposal_id, voter) DO UPDATE SET action = excluded.action
        ",
        params![dao_id, proposal_id as i64, voter, action.as_str()],
    )?;
    Ok(())
}
