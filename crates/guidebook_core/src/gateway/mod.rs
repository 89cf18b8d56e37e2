//! Remote data gateway contract.
//!
//! # Responsibility
//! - Define the query/command/auth/storage surface the core consumes from the
//!   hosted platform.
//! - Keep services storage-agnostic; implementations are injected.
//!
//! # Invariants
//! - Rows are JSON objects keyed by column name.
//! - Filters are column equality; a row matches when all filters match.
//! - `public_url` is synchronous and assumes a prior successful upload.
//!
//! # See also
//! - docs/architecture/gateway.md

use crate::db::DbError;
use crate::model::block::PendingAttachment;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod sqlite;

/// One row of a collection.
pub type Row = Map<String, Value>;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failure reported by a gateway call.
#[derive(Debug)]
pub enum GatewayError {
    /// Transport/storage failure of the backing store.
    Db(DbError),
    /// Object storage rejected the operation.
    Storage(String),
    /// The caller's session does not allow the operation.
    PermissionDenied(String),
    /// Stored data cannot be decoded.
    InvalidData(String),
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Storage(message) => write!(f, "storage error: {message}"),
            Self::PermissionDenied(message) => write!(f, "permission denied: {message}"),
            Self::InvalidData(message) => write!(f, "invalid gateway data: {message}"),
        }
    }
}

impl Error for GatewayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for GatewayError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for GatewayError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Signed-in user as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

impl AuthUser {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }
}

/// Column equality filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        row.get(&self.column) == Some(&self.value)
    }
}

/// Result ordering for `select`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

/// Query options for `select`.
///
/// Empty `columns` selects every column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub columns: Vec<String>,
    pub filters: Vec<Filter>,
    pub order: Option<OrderBy>,
    pub limit: Option<u32>,
}

impl SelectQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|column| column.to_string()).collect();
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(OrderBy {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|filter| filter.matches(row))
    }

    /// Applies ordering, limit and projection to already-filtered rows.
    pub fn shape(&self, mut rows: Vec<Row>) -> Vec<Row> {
        if let Some(order) = &self.order {
            rows.sort_by(|left, right| {
                let ordering = compare_values(left.get(&order.column), right.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
        if let Some(limit) = self.limit {
            rows.truncate(limit as usize);
        }
        if !self.columns.is_empty() {
            for row in &mut rows {
                row.retain(|key, _| self.columns.iter().any(|column| column == key));
            }
        }
        rows
    }
}

/// Hosted data/auth/storage platform as consumed by the core.
pub trait Gateway {
    /// Returns matching rows of `collection`.
    fn select(&self, collection: &str, query: &SelectQuery) -> GatewayResult<Vec<Row>>;
    /// Inserts one row and returns it with its assigned `id`.
    fn insert(&self, collection: &str, row: Row) -> GatewayResult<Row>;
    /// Merges `patch` into every matching row. Returns the affected count.
    fn update(&self, collection: &str, patch: Row, filters: &[Filter]) -> GatewayResult<usize>;
    /// Removes every matching row. Returns the affected count.
    fn delete(&self, collection: &str, filters: &[Filter]) -> GatewayResult<usize>;
    /// Currently signed-in user, if any.
    fn current_user(&self) -> GatewayResult<Option<AuthUser>>;
    /// Stores one binary under `bucket/path`.
    fn upload(&self, bucket: &str, path: &str, attachment: &PendingAttachment)
        -> GatewayResult<()>;
    /// Public URL of a previously uploaded object.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

impl<G: Gateway + ?Sized> Gateway for &G {
    fn select(&self, collection: &str, query: &SelectQuery) -> GatewayResult<Vec<Row>> {
        (**self).select(collection, query)
    }

    fn insert(&self, collection: &str, row: Row) -> GatewayResult<Row> {
        (**self).insert(collection, row)
    }

    fn update(&self, collection: &str, patch: Row, filters: &[Filter]) -> GatewayResult<usize> {
        (**self).update(collection, patch, filters)
    }

    fn delete(&self, collection: &str, filters: &[Filter]) -> GatewayResult<usize> {
        (**self).delete(collection, filters)
    }

    fn current_user(&self) -> GatewayResult<Option<AuthUser>> {
        (**self).current_user()
    }

    fn upload(
        &self,
        bucket: &str,
        path: &str,
        attachment: &PendingAttachment,
    ) -> GatewayResult<()> {
        (**self).upload(bucket, path, attachment)
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        (**self).public_url(bucket, path)
    }
}

/// Current wall clock in Unix epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Orders JSON column values; absent/null sort first.
fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), Some(_)) => Ordering::Less,
        (Some(_), None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
