// SQLite-backed request store
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

use crate::types::{ApprovalEntry, RequestRecord};

pub struct RequestStore {
    conn: Connection,
}

/// Caller-attached metadata persisted alongside a record. The parser never
/// sets any of this; identity and file provenance come from the uploading
/// side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub uploaded_by: String,
    pub file_name: String,
    /// RFC 3339 upload timestamp.
    pub uploaded_at: String,
}

impl RequestMeta {
    /// Metadata stamped with the current time.
    pub fn now(uploaded_by: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            uploaded_by: uploaded_by.into(),
            file_name: file_name.into(),
            uploaded_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Partial update for a stored request; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct RequestUpdate {
    pub state: Option<String>,
    pub work_notes: Option<String>,
    pub closed_at: Option<String>,
}

impl RequestUpdate {
    pub fn is_empty(&self) -> bool {
        self.state.is_none() && self.work_notes.is_none() && self.closed_at.is_none()
    }
}

/// A persisted request: record plus row id and upload metadata.
#[derive(Debug, Clone)]
pub struct StoredRequest {
    pub id: i64,
    pub record: RequestRecord,
    pub meta: RequestMeta,
}

impl RequestStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database {}", path.display()))?;
        Self::create_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::create_schema(&conn)?;
        Ok(Self { conn })
    }

    fn create_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            -- Parsed request records
            CREATE TABLE IF NOT EXISTS requests (
                id INTEGER PRIMARY KEY,
                request_number TEXT NOT NULL DEFAULT '',
                requested_for TEXT NOT NULL DEFAULT '',
                opened_at TEXT NOT NULL DEFAULT '',
                closed_at TEXT NOT NULL DEFAULT '',
                updated_to_open TEXT NOT NULL DEFAULT '',
                short_description TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                work_notes TEXT NOT NULL DEFAULT '',
                state TEXT NOT NULL DEFAULT '',
                uploaded_by TEXT NOT NULL DEFAULT '',
                file_name TEXT NOT NULL DEFAULT '',
                uploaded_at TEXT NOT NULL DEFAULT ''
            );

            -- Approval rows per request, in order of appearance
            CREATE TABLE IF NOT EXISTS approvals (
                id INTEGER PRIMARY KEY,
                request_id INTEGER NOT NULL,
                seq INTEGER NOT NULL,
                state TEXT NOT NULL DEFAULT '',
                approver TEXT NOT NULL DEFAULT '',
                item TEXT NOT NULL DEFAULT '',
                created TEXT NOT NULL DEFAULT '',
                created_original TEXT NOT NULL DEFAULT '',
                FOREIGN KEY (request_id) REFERENCES requests(id),
                UNIQUE(request_id, seq)
            );

            CREATE INDEX IF NOT EXISTS idx_requests_number
                ON requests(request_number);
            CREATE INDEX IF NOT EXISTS idx_requests_state
                ON requests(state);
            CREATE INDEX IF NOT EXISTS idx_approvals_request
                ON approvals(request_id, seq);
            "#,
        )?;
        Ok(())
    }

    /// Persist a parsed record with its approvals. Returns the new row id.
    pub fn create(&mut self, record: &RequestRecord, meta: &RequestMeta) -> Result<i64> {
        let tx = self.conn.transaction()?;

        tx.execute(
            r#"INSERT INTO requests (
                   request_number, requested_for, opened_at, closed_at,
                   updated_to_open, short_description, description,
                   work_notes, state, uploaded_by, file_name, uploaded_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"#,
            params![
                record.request_number,
                record.requested_for,
                record.opened_at,
                record.closed_at,
                record.updated_to_open,
                record.short_description,
                record.description,
                record.work_notes,
                record.state,
                meta.uploaded_by,
                meta.file_name,
                meta.uploaded_at,
            ],
        )?;
        let request_id = tx.last_insert_rowid();

        for (seq, approval) in record.approvals.iter().enumerate() {
            tx.execute(
                r#"INSERT INTO approvals
                       (request_id, seq, state, approver, item, created, created_original)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
                params![
                    request_id,
                    seq as i64,
                    approval.state,
                    approval.approver,
                    approval.item,
                    approval.created,
                    approval.created_original,
                ],
            )?;
        }

        tx.commit()?;
        Ok(request_id)
    }

    /// Apply a partial update to a stored request.
    pub fn update(&self, id: i64, update: &RequestUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }

        let changed = self.conn.execute(
            r#"UPDATE requests SET
                   state = COALESCE(?1, state),
                   work_notes = COALESCE(?2, work_notes),
                   closed_at = COALESCE(?3, closed_at)
               WHERE id = ?4"#,
            params![update.state, update.work_notes, update.closed_at, id],
        )?;

        if changed == 0 {
            bail!("request {} not found", id);
        }
        Ok(())
    }

    /// Remove a request and its approval rows.
    pub fn delete(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM approvals WHERE request_id = ?1", params![id])?;
        let changed = tx.execute("DELETE FROM requests WHERE id = ?1", params![id])?;
        tx.commit()?;

        if changed == 0 {
            bail!("request {} not found", id);
        }
        Ok(())
    }

    pub fn get(&self, id: i64) -> Result<StoredRequest> {
        let stored = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_REQUEST),
                params![id],
                row_to_stored,
            )
            .optional()?;

        match stored {
            Some(mut stored) => {
                stored.record.approvals = self.load_approvals(stored.id)?;
                Ok(stored)
            }
            None => bail!("request {} not found", id),
        }
    }

    /// All stored requests, newest upload first, optionally filtered by state.
    pub fn list(&self, state: Option<&str>) -> Result<Vec<StoredRequest>> {
        let mut results = match state {
            Some(state) => {
                let mut stmt = self.conn.prepare(&format!(
                    "{} WHERE state = ?1 ORDER BY uploaded_at DESC, id DESC",
                    SELECT_REQUEST
                ))?;
                let rows = stmt.query_map(params![state], row_to_stored)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("{} ORDER BY uploaded_at DESC, id DESC", SELECT_REQUEST))?;
                let rows = stmt.query_map([], row_to_stored)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        for stored in &mut results {
            stored.record.approvals = self.load_approvals(stored.id)?;
        }
        Ok(results)
    }

    /// Case-insensitive search over request number and requested-for.
    pub fn search(&self, term: &str) -> Result<Vec<StoredRequest>> {
        let pattern = format!("%{}%", term.to_lowercase());
        let mut stmt = self.conn.prepare(&format!(
            r#"{} WHERE LOWER(request_number) LIKE ?1 OR LOWER(requested_for) LIKE ?1
               ORDER BY uploaded_at DESC, id DESC"#,
            SELECT_REQUEST
        ))?;
        let rows = stmt.query_map(params![pattern], row_to_stored)?;
        let mut results = rows.collect::<std::result::Result<Vec<_>, _>>()?;

        for stored in &mut results {
            stored.record.approvals = self.load_approvals(stored.id)?;
        }
        Ok(results)
    }

    /// Request tallies per state, most common first.
    pub fn count_by_state(&self) -> Result<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT state, COUNT(*) FROM requests
               GROUP BY state ORDER BY COUNT(*) DESC, state"#,
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    fn load_approvals(&self, request_id: i64) -> Result<Vec<ApprovalEntry>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT state, approver, item, created, created_original
               FROM approvals WHERE request_id = ?1 ORDER BY seq"#,
        )?;
        let rows = stmt.query_map(params![request_id], |row| {
            Ok(ApprovalEntry {
                state: row.get(0)?,
                approver: row.get(1)?,
                item: row.get(2)?,
                created: row.get(3)?,
                created_original: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

const SELECT_REQUEST: &str = r#"SELECT id, request_number, requested_for, opened_at, closed_at,
       updated_to_open, short_description, description, work_notes, state,
       uploaded_by, file_name, uploaded_at
FROM requests"#;

fn row_to_stored(row: &Row<'_>) -> rusqlite::Result<StoredRequest> {
    Ok(StoredRequest {
        id: row.get(0)?,
        record: RequestRecord {
            request_number: row.get(1)?,
            requested_for: row.get(2)?,
            opened_at: row.get(3)?,
            closed_at: row.get(4)?,
            updated_to_open: row.get(5)?,
            short_description: row.get(6)?,
            description: row.get(7)?,
            work_notes: row.get(8)?,
            state: row.get(9)?,
            approvals: Vec::new(),
        },
        meta: RequestMeta {
            uploaded_by: row.get(10)?,
            file_name: row.get(11)?,
            uploaded_at: row.get(12)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> RequestRecord {
        RequestRecord {
            request_number: "RITM0012345".into(),
            requested_for: "Jane Doe".into(),
            state: "Approved".into(),
            short_description: "Badge access".into(),
            approvals: vec![ApprovalEntry {
                state: "Approved".into(),
                approver: "John Smith".into(),
                item: "Laptop Request".into(),
                created: "2024-01-05 09:00:00".into(),
                created_original: "2024-01-05 09:00:00".into(),
            }],
            ..Default::default()
        }
    }

    fn meta_at(uploaded_at: &str) -> RequestMeta {
        RequestMeta {
            uploaded_by: "security-desk".into(),
            file_name: "RITM0012345.pdf".into(),
            uploaded_at: uploaded_at.into(),
        }
    }

    #[test]
    fn create_then_get_round_trips() {
        let mut store = RequestStore::open_in_memory().unwrap();
        let record = sample_record();
        let id = store.create(&record, &meta_at("2024-01-10T12:00:00Z")).unwrap();

        let stored = store.get(id).unwrap();
        assert_eq!(stored.record, record);
        assert_eq!(stored.meta.uploaded_by, "security-desk");
        assert_eq!(stored.record.approvals.len(), 1);
        assert_eq!(stored.record.approvals[0].approver, "John Smith");
    }

    #[test]
    fn list_is_newest_first_and_filterable() {
        let mut store = RequestStore::open_in_memory().unwrap();
        let mut older = sample_record();
        older.request_number = "RITM0000001".into();
        older.state = "Pending".into();
        store.create(&older, &meta_at("2024-01-01T00:00:00Z")).unwrap();
        store.create(&sample_record(), &meta_at("2024-02-01T00:00:00Z")).unwrap();

        let all = store.list(None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].record.request_number, "RITM0012345");
        assert_eq!(all[1].record.request_number, "RITM0000001");

        let pending = store.list(Some("Pending")).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].record.request_number, "RITM0000001");
    }

    #[test]
    fn search_matches_number_and_name() {
        let mut store = RequestStore::open_in_memory().unwrap();
        store.create(&sample_record(), &meta_at("2024-01-10T12:00:00Z")).unwrap();

        assert_eq!(store.search("ritm0012").unwrap().len(), 1);
        assert_eq!(store.search("jane").unwrap().len(), 1);
        assert_eq!(store.search("nobody").unwrap().len(), 0);
    }

    #[test]
    fn partial_update_leaves_other_fields() {
        let mut store = RequestStore::open_in_memory().unwrap();
        let id = store.create(&sample_record(), &meta_at("2024-01-10T12:00:00Z")).unwrap();

        store
            .update(
                id,
                &RequestUpdate {
                    state: Some("Closed Complete".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let stored = store.get(id).unwrap();
        assert_eq!(stored.record.state, "Closed Complete");
        assert_eq!(stored.record.requested_for, "Jane Doe");
        assert_eq!(stored.record.work_notes, "");
    }

    #[test]
    fn update_missing_request_errors() {
        let store = RequestStore::open_in_memory().unwrap();
        let err = store
            .update(99, &RequestUpdate { state: Some("x".into()), ..Default::default() })
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn delete_removes_request_and_approvals() {
        let mut store = RequestStore::open_in_memory().unwrap();
        let id = store.create(&sample_record(), &meta_at("2024-01-10T12:00:00Z")).unwrap();

        store.delete(id).unwrap();
        assert!(store.get(id).is_err());

        // Approval rows must not survive their request.
        let orphans: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM approvals", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn count_by_state_tallies() {
        let mut store = RequestStore::open_in_memory().unwrap();
        store.create(&sample_record(), &meta_at("2024-01-01T00:00:00Z")).unwrap();
        store.create(&sample_record(), &meta_at("2024-01-02T00:00:00Z")).unwrap();
        let mut pending = sample_record();
        pending.state = "Pending".into();
        store.create(&pending, &meta_at("2024-01-03T00:00:00Z")).unwrap();

        let counts = store.count_by_state().unwrap();
        assert_eq!(counts[0], ("Approved".to_string(), 2));
        assert_eq!(counts[1], ("Pending".to_string(), 1));
    }
}
