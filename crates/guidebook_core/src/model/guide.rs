//! Persisted guide document shapes.
//!
//! # Responsibility
//! - Define the writable document (`GuideDocument`) and the full stored row
//!   (`GuideRecord`) exchanged with the gateway.
//! - Own like-map semantics and tag normalization.
//!
//! # Invariants
//! - `like` is a sparse presence map; the like count is derived at read time.
//! - Tags are trimmed, lowercased and deduplicated before persistence.
//! - Reads are lenient: absent columns fall back to empty defaults.

use crate::gateway::Row;
use crate::model::block::StoredSection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Gateway-assigned guide row identifier.
pub type GuideId = String;

/// `content` column of a guide row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuideContent {
    #[serde(default)]
    pub sections: Vec<StoredSection>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Per-user like presence map (`user_id -> true`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LikeMap(BTreeMap<String, bool>);

impl LikeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with a truthy entry.
    pub fn count(&self) -> usize {
        self.0.values().filter(|liked| **liked).count()
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.0.get(user_id).copied().unwrap_or(false)
    }

    /// Flips the like of `user_id`. Returns whether the user now likes it.
    ///
    /// Unliking removes the entry instead of storing `false`.
    pub fn toggle(&mut self, user_id: &str) -> bool {
        if self.is_liked_by(user_id) {
            self.0.remove(user_id);
            false
        } else {
            self.0.insert(user_id.to_string(), true);
            true
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Writable columns of a guide row, shared by insert and full overwrite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuideDocument {
    pub name: String,
    pub description: String,
    pub img_url: Option<String>,
    pub category: String,
    pub content: GuideContent,
}

impl GuideDocument {
    /// Encodes the document as a gateway row.
    pub fn to_row(&self) -> Result<Row, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(serde::ser::Error::custom(format!(
                "guide document encoded as non-object `{other}`"
            ))),
        }
    }
}

/// Full guide row as returned by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideRecord {
    pub id: GuideId,
    /// Unix epoch milliseconds.
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub img_url: Option<String>,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub content: GuideContent,
    #[serde(default)]
    pub view: i64,
    #[serde(default)]
    pub like: LikeMap,
}

impl GuideRecord {
    /// Decodes a gateway row.
    pub fn from_row(row: Row) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(row))
    }

    pub fn like_count(&self) -> usize {
        self.like.count()
    }
}

/// Normalizes one tag value. Blank input yields `None`.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes, deduplicates and sorts tag values.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .filter_map(|tag| normalize_tag(tag))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
