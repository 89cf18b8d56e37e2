//! SQLite-backed gateway used as a local stand-in for the hosted platform.
//!
//! # Responsibility
//! - Store collection rows as JSON objects in `records`.
//! - Store uploaded binaries in `storage_objects`.
//! - Hold the signed-in session and notify auth listeners on change.
//!
//! # Invariants
//! - `insert` assigns a UUID `id` and an epoch-millisecond `created_at` when
//!   the row does not carry them.
//! - `update` never changes `id` or `created_at`.
//! - Object paths are write-once; a second upload to the same path fails.

use crate::gateway::{
    now_epoch_ms, AuthUser, Filter, Gateway, GatewayError, GatewayResult, Row, SelectQuery,
};
use crate::model::block::PendingAttachment;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::cell::RefCell;
use uuid::Uuid;

const REQUIRED_TABLES: [&str; 2] = ["records", "storage_objects"];
const IMMUTABLE_COLUMNS: [&str; 2] = ["id", "created_at"];

type AuthListener = Box<dyn Fn(Option<&AuthUser>)>;

/// Gateway over a migrated SQLite connection.
pub struct SqliteGateway<'conn> {
    conn: &'conn Connection,
    public_base_url: String,
    session: RefCell<Option<AuthUser>>,
    listeners: RefCell<Vec<AuthListener>>,
}

impl<'conn> SqliteGateway<'conn> {
    /// Constructs a gateway from a migrated connection.
    ///
    /// # Errors
    /// - `InvalidData` when required tables are missing.
    pub fn try_new(
        conn: &'conn Connection,
        public_base_url: impl Into<String>,
    ) -> GatewayResult<Self> {
        for table in REQUIRED_TABLES {
            if !table_exists(conn, table)? {
                return Err(GatewayError::InvalidData(format!(
                    "required table `{table}` is missing"
                )));
            }
        }

        Ok(Self {
            conn,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            session: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
        })
    }

    /// Replaces the current session and notifies every auth listener.
    ///
    /// Listeners may register further listeners; those are kept but only
    /// see later changes.
    pub fn set_session(&self, user: Option<AuthUser>) {
        *self.session.borrow_mut() = user.clone();
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        for listener in &listeners {
            listener(user.as_ref());
        }
        let mut slot = self.listeners.borrow_mut();
        let added = std::mem::replace(&mut *slot, listeners);
        slot.extend(added);
    }

    /// Registers a fire-and-forget callback invoked on every session change.
    pub fn on_auth_change(&self, listener: impl Fn(Option<&AuthUser>) + 'static) {
        self.listeners.borrow_mut().push(Box::new(listener));
    }

    /// Raw bytes of a stored object, if present.
    pub fn object_bytes(&self, bucket: &str, path: &str) -> GatewayResult<Option<Vec<u8>>> {
        let bytes = self
            .conn
            .query_row(
                "SELECT bytes FROM storage_objects WHERE bucket = ?1 AND path = ?2;",
                params![bucket, path],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(bytes)
    }

    /// Number of stored objects in `bucket`.
    pub fn object_count(&self, bucket: &str) -> GatewayResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM storage_objects WHERE bucket = ?1;",
            [bucket],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn load_matching(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> GatewayResult<Vec<(String, Row)>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, data
             FROM records
             WHERE collection = ?1
             ORDER BY created_at ASC, id ASC;",
        )?;
        let mut rows = stmt.query([collection])?;
        let mut matching = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get("id")?;
            let data: String = row.get("data")?;
            let decoded = parse_row_data(collection, &id, &data)?;
            if filters.iter().all(|filter| filter.matches(&decoded)) {
                matching.push((id, decoded));
            }
        }
        Ok(matching)
    }
}

impl Gateway for SqliteGateway<'_> {
    fn select(&self, collection: &str, query: &SelectQuery) -> GatewayResult<Vec<Row>> {
        let rows = self
            .load_matching(collection, &query.filters)?
            .into_iter()
            .map(|(_, row)| row)
            .collect::<Vec<_>>();
        let shaped = query.shape(rows);
        debug!(
            "event=gateway_select module=gateway collection={collection} rows={}",
            shaped.len()
        );
        Ok(shaped)
    }

    fn insert(&self, collection: &str, mut row: Row) -> GatewayResult<Row> {
        let id = match row.get("id") {
            Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
            _ => Uuid::new_v4().to_string(),
        };
        let created_at = row
            .get("created_at")
            .and_then(Value::as_i64)
            .unwrap_or_else(now_epoch_ms);
        row.insert("id".to_string(), Value::String(id.clone()));
        row.insert("created_at".to_string(), Value::from(created_at));

        self.conn.execute(
            "INSERT INTO records (collection, id, created_at, data)
             VALUES (?1, ?2, ?3, ?4);",
            params![collection, id, created_at, encode_row(&row)?],
        )?;
        debug!("event=gateway_insert module=gateway collection={collection} status=ok");
        Ok(row)
    }

    fn update(&self, collection: &str, patch: Row, filters: &[Filter]) -> GatewayResult<usize> {
        let matching = self.load_matching(collection, filters)?;
        let tx = self.conn.unchecked_transaction()?;
        for (id, mut row) in matching.iter().cloned() {
            for (key, value) in &patch {
                if IMMUTABLE_COLUMNS.contains(&key.as_str()) {
                    continue;
                }
                row.insert(key.clone(), value.clone());
            }
            tx.execute(
                "UPDATE records SET data = ?3 WHERE collection = ?1 AND id = ?2;",
                params![collection, id, encode_row(&row)?],
            )?;
        }
        tx.commit()?;
        debug!(
            "event=gateway_update module=gateway collection={collection} affected={}",
            matching.len()
        );
        Ok(matching.len())
    }

    fn delete(&self, collection: &str, filters: &[Filter]) -> GatewayResult<usize> {
        let matching = self.load_matching(collection, filters)?;
        let tx = self.conn.unchecked_transaction()?;
        for (id, _) in &matching {
            tx.execute(
                "DELETE FROM records WHERE collection = ?1 AND id = ?2;",
                params![collection, id],
            )?;
        }
        tx.commit()?;
        debug!(
            "event=gateway_delete module=gateway collection={collection} affected={}",
            matching.len()
        );
        Ok(matching.len())
    }

    fn current_user(&self) -> GatewayResult<Option<AuthUser>> {
        Ok(self.session.borrow().clone())
    }

    fn upload(
        &self,
        bucket: &str,
        path: &str,
        attachment: &PendingAttachment,
    ) -> GatewayResult<()> {
        if self.session.borrow().is_none() {
            return Err(GatewayError::PermissionDenied(
                "uploads require a signed-in user".to_string(),
            ));
        }
        if self.object_bytes(bucket, path)?.is_some() {
            return Err(GatewayError::Storage(format!(
                "object already exists: {bucket}/{path}"
            )));
        }

        self.conn.execute(
            "INSERT INTO storage_objects (bucket, path, content_type, bytes)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                bucket,
                path,
                attachment.content_type.as_str(),
                attachment.bytes.as_slice()
            ],
        )?;
        debug!(
            "event=gateway_upload module=gateway bucket={bucket} bytes={}",
            attachment.bytes.len()
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{bucket}/{path}",
            self.public_base_url
        )
    }
}

fn parse_row_data(collection: &str, id: &str, data: &str) -> GatewayResult<Row> {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(_) => Err(GatewayError::InvalidData(format!(
            "row `{collection}/{id}` is not a JSON object"
        ))),
        Err(err) => Err(GatewayError::InvalidData(format!(
            "row `{collection}/{id}` is not valid JSON: {err}"
        ))),
    }
}

fn encode_row(row: &Row) -> GatewayResult<String> {
    serde_json::to_string(row)
        .map_err(|err| GatewayError::InvalidData(format!("row cannot be encoded: {err}")))
}

fn table_exists(conn: &Connection, table: &str) -> GatewayResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
