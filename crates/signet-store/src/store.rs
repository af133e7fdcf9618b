//! SQLite-backed entity store.
//!
//! One table per entity kind, each row a JSON snapshot of the entity. The
//! JSON is the source of truth; the extra columns (`control_id`, `version`,
//! `form_type`, `seq`) exist only for lookups and `max + 1` allocation.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use signet_audit::ActivityRecord;
use signet_core::{ControlId, FormType};
use signet_evidence::ChecklistItem;
use signet_workflow::{Document, EvidenceForm};

use crate::StoreError;

// ---------------------------------------------------------------------------
// SignetStore
// ---------------------------------------------------------------------------

/// The SQLite persistence layer.
///
/// Mutating methods take `&mut self` even where rusqlite would accept
/// `&self`: read-modify-write cycles (`next_document_version` followed by an
/// upsert) must not interleave, and the exclusive receiver makes the borrow
/// checker enforce that.
pub struct SignetStore {
    conn: Connection,
}

impl SignetStore {
    /// Opens (or creates) the store at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] / [`StoreError::Corrupt`] if the
    /// database cannot be opened or its schema cannot be initialized.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("creating '{}': {e}", parent.display())))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| StoreError::from_sqlite(&e, "opening database"))?;
        let store = Self { conn };
        store.init_tables()?;
        info!(path = %path.display(), "store opened");
        Ok(store)
    }

    /// Creates an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::from_sqlite(&e, "opening in-memory database"))?;
        let store = Self { conn };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS documents (
                    id TEXT PRIMARY KEY,
                    control_id TEXT NOT NULL,
                    version INTEGER NOT NULL,
                    data TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_documents_control
                    ON documents(control_id);
                CREATE TABLE IF NOT EXISTS evidence_forms (
                    id TEXT PRIMARY KEY,
                    form_type TEXT NOT NULL,
                    control_id TEXT NOT NULL,
                    seq INTEGER NOT NULL,
                    data TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_forms_type ON evidence_forms(form_type);
                CREATE INDEX IF NOT EXISTS idx_forms_control ON evidence_forms(control_id);
                CREATE TABLE IF NOT EXISTS checklist_items (
                    control_id TEXT NOT NULL,
                    requirement_id INTEGER NOT NULL,
                    data TEXT NOT NULL,
                    PRIMARY KEY (control_id, requirement_id)
                );
                CREATE TABLE IF NOT EXISTS activity_log (
                    sequence INTEGER PRIMARY KEY,
                    data TEXT NOT NULL
                );",
            )
            .map_err(|e| StoreError::from_sqlite(&e, "initializing schema"))
    }

    // -- Documents ----------------------------------------------------------

    /// Inserts or replaces a document.
    pub fn upsert_document(&mut self, document: &Document) -> Result<(), StoreError> {
        let data = encode(document)?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO documents (id, control_id, version, data)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    document.id,
                    document.control_id.as_str(),
                    document.version,
                    data
                ],
            )
            .map_err(|e| StoreError::from_sqlite(&e, "upsert document"))?;
        debug!(id = %document.id, "document upserted");
        Ok(())
    }

    /// Fetches a document by id.
    pub fn get_document(&self, id: &str) -> Result<Option<Document>, StoreError> {
        self.conn
            .query_row(
                "SELECT data FROM documents WHERE id = ?1",
                params![id],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|e| StoreError::from_sqlite(&e, "get document"))?
            .map(|data| decode(&data))
            .transpose()
    }

    /// All documents of a control, oldest version first.
    pub fn documents_for_control(
        &self,
        control: &ControlId,
    ) -> Result<Vec<Document>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT data FROM documents WHERE control_id = ?1 ORDER BY version ASC",
            )
            .map_err(|e| StoreError::from_sqlite(&e, "list documents"))?;
        let rows = stmt
            .query_map(params![control.as_str()], |row| row.get::<_, String>(0))
            .map_err(|e| StoreError::from_sqlite(&e, "list documents"))?;

        let mut documents = Vec::new();
        for row in rows {
            let data = row.map_err(|e| StoreError::from_sqlite(&e, "list documents"))?;
            documents.push(decode(&data)?);
        }
        Ok(documents)
    }

    /// Next version for a control: `max(existing) + 1`, starting at 1.
    pub fn next_document_version(&mut self, control: &ControlId) -> Result<u32, StoreError> {
        let max: u32 = self
            .conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM documents WHERE control_id = ?1",
                params![control.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::from_sqlite(&e, "next document version"))?;
        Ok(max + 1)
    }

    /// Deletes a document. Returns `false` if no such row existed.
    pub fn delete_document(&mut self, id: &str) -> Result<bool, StoreError> {
        let affected = self
            .conn
            .execute("DELETE FROM documents WHERE id = ?1", params![id])
            .map_err(|e| StoreError::from_sqlite(&e, "delete document"))?;
        Ok(affected > 0)
    }

    // -- Evidence forms -----------------------------------------------------

    /// Inserts or replaces an evidence form.
    ///
    /// The numeric part of the form id (`"IR-00042"` → 42) is stored in its
    /// own column for `max + 1` allocation.
    pub fn upsert_form(&mut self, form: &EvidenceForm) -> Result<(), StoreError> {
        let seq = form_sequence(&form.id)?;
        let data = encode(form)?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO evidence_forms (id, form_type, control_id, seq, data)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    form.id,
                    form.form_type.name(),
                    form.control_id.as_str(),
                    seq,
                    data
                ],
            )
            .map_err(|e| StoreError::from_sqlite(&e, "upsert form"))?;
        debug!(id = %form.id, "evidence form upserted");
        Ok(())
    }

    /// Fetches an evidence form by id.
    pub fn get_form(&self, id: &str) -> Result<Option<EvidenceForm>, StoreError> {
        self.conn
            .query_row(
                "SELECT data FROM evidence_forms WHERE id = ?1",
                params![id],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|e| StoreError::from_sqlite(&e, "get form"))?
            .map(|data| decode(&data))
            .transpose()
    }

    /// All forms, optionally filtered to one control, ordered by id.
    pub fn list_forms(
        &self,
        control: Option<&ControlId>,
    ) -> Result<Vec<EvidenceForm>, StoreError> {
        let (sql, filter) = match control {
            Some(c) => (
                "SELECT data FROM evidence_forms WHERE control_id = ?1 ORDER BY id ASC",
                Some(c.as_str().to_string()),
            ),
            None => ("SELECT data FROM evidence_forms ORDER BY id ASC", None),
        };

        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| StoreError::from_sqlite(&e, "list forms"))?;
        let rows: Result<Vec<String>, rusqlite::Error> = match filter {
            Some(c) => stmt
                .query_map(params![c], |row| row.get(0))
                .map_err(|e| StoreError::from_sqlite(&e, "list forms"))?
                .collect(),
            None => stmt
                .query_map([], |row| row.get(0))
                .map_err(|e| StoreError::from_sqlite(&e, "list forms"))?
                .collect(),
        };

        let mut forms = Vec::new();
        for data in rows.map_err(|e| StoreError::from_sqlite(&e, "list forms"))? {
            forms.push(decode(&data)?);
        }
        Ok(forms)
    }

    /// Next id sequence for a form type: `max(existing) + 1`, starting at 1.
    pub fn next_form_sequence(&mut self, form_type: FormType) -> Result<u32, StoreError> {
        let max: u32 = self
            .conn
            .query_row(
                "SELECT COALESCE(MAX(seq), 0) FROM evidence_forms WHERE form_type = ?1",
                params![form_type.name()],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::from_sqlite(&e, "next form sequence"))?;
        Ok(max + 1)
    }

    // -- Checklist items ----------------------------------------------------

    /// Inserts a checklist item only if the `(control, requirement)` pair is
    /// absent. Returns `true` if a row was inserted.
    ///
    /// This is the primitive behind idempotent checklist initialization.
    pub fn insert_item_if_absent(&mut self, item: &ChecklistItem) -> Result<bool, StoreError> {
        let data = encode(item)?;
        let affected = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO checklist_items (control_id, requirement_id, data)
                 VALUES (?1, ?2, ?3)",
                params![item.control_id.as_str(), item.requirement_id, data],
            )
            .map_err(|e| StoreError::from_sqlite(&e, "insert checklist item"))?;
        Ok(affected > 0)
    }

    /// Replaces an existing checklist item.
    pub fn update_item(&mut self, item: &ChecklistItem) -> Result<(), StoreError> {
        let data = encode(item)?;
        self.conn
            .execute(
                "UPDATE checklist_items SET data = ?3
                 WHERE control_id = ?1 AND requirement_id = ?2",
                params![item.control_id.as_str(), item.requirement_id, data],
            )
            .map_err(|e| StoreError::from_sqlite(&e, "update checklist item"))?;
        Ok(())
    }

    /// Fetches one checklist item.
    pub fn get_item(
        &self,
        control: &ControlId,
        requirement_id: u32,
    ) -> Result<Option<ChecklistItem>, StoreError> {
        self.conn
            .query_row(
                "SELECT data FROM checklist_items
                 WHERE control_id = ?1 AND requirement_id = ?2",
                params![control.as_str(), requirement_id],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|e| StoreError::from_sqlite(&e, "get checklist item"))?
            .map(|data| decode(&data))
            .transpose()
    }

    /// All checklist items of a control, ordered by requirement id.
    pub fn items_for_control(
        &self,
        control: &ControlId,
    ) -> Result<Vec<ChecklistItem>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT data FROM checklist_items WHERE control_id = ?1
                 ORDER BY requirement_id ASC",
            )
            .map_err(|e| StoreError::from_sqlite(&e, "list checklist items"))?;
        let rows = stmt
            .query_map(params![control.as_str()], |row| row.get::<_, String>(0))
            .map_err(|e| StoreError::from_sqlite(&e, "list checklist items"))?;

        let mut items = Vec::new();
        for row in rows {
            let data = row.map_err(|e| StoreError::from_sqlite(&e, "list checklist items"))?;
            items.push(decode(&data)?);
        }
        Ok(items)
    }

    // -- Activity trail -----------------------------------------------------

    /// Appends an activity record. The sequence is the primary key, so a
    /// duplicate append fails instead of silently rewriting history.
    pub fn append_activity(&mut self, record: &ActivityRecord) -> Result<(), StoreError> {
        let data = encode(record)?;
        self.conn
            .execute(
                "INSERT INTO activity_log (sequence, data) VALUES (?1, ?2)",
                params![record.sequence, data],
            )
            .map_err(|e| StoreError::from_sqlite(&e, "append activity"))?;
        Ok(())
    }

    /// The most recent activity record, if any.
    pub fn last_activity(&self) -> Result<Option<ActivityRecord>, StoreError> {
        self.conn
            .query_row(
                "SELECT data FROM activity_log ORDER BY sequence DESC LIMIT 1",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|e| StoreError::from_sqlite(&e, "last activity"))?
            .map(|data| decode(&data))
            .transpose()
    }

    /// The whole trail in chain order, optionally capped to the most recent
    /// `limit` records (still returned oldest-first).
    pub fn list_activity(&self, limit: Option<u32>) -> Result<Vec<ActivityRecord>, StoreError> {
        let mut records = Vec::new();
        let mut stmt = self
            .conn
            .prepare("SELECT data FROM activity_log ORDER BY sequence ASC")
            .map_err(|e| StoreError::from_sqlite(&e, "list activity"))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| StoreError::from_sqlite(&e, "list activity"))?;
        for row in rows {
            let data = row.map_err(|e| StoreError::from_sqlite(&e, "list activity"))?;
            records.push(decode(&data)?);
        }
        if let Some(n) = limit {
            let n = n as usize;
            if records.len() > n {
                records.drain(..records.len() - n);
            }
        }
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// JSON codec helpers
// ---------------------------------------------------------------------------

fn encode<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// The numeric suffix of a generated form id (`"IR-00042"` → 42).
fn form_sequence(id: &str) -> Result<u32, StoreError> {
    id.rsplit('-')
        .next()
        .and_then(|suffix| suffix.parse().ok())
        .ok_or_else(|| StoreError::Database(format!("malformed form id '{id}'")))
}

fn decode<T: serde::de::DeserializeOwned>(data: &str) -> Result<T, StoreError> {
    serde_json::from_str(data).map_err(|e| StoreError::Serialization(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
