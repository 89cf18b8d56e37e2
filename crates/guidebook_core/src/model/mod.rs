//! Guide content domain model.
//!
//! # Responsibility
//! - Define the block variant set edited in memory.
//! - Define the persisted guide document and row shapes.
//!
//! # Invariants
//! - Block identifiers are editor-local and never persisted.
//! - Only fully resolved `Section`s are written; reads stay lenient.
//!
//! # See also
//! - docs/architecture/guide-content.md

pub mod block;
pub mod guide;
