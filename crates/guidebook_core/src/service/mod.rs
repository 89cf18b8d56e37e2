//! Guide use-case services.
//!
//! # Responsibility
//! - Orchestrate metadata extraction, attachment upload and document writes.
//! - Keep callers decoupled from the gateway implementation.
//!
//! # See also
//! - docs/architecture/guide-content.md

pub mod guide_service;
pub mod metadata;
pub mod serializer;
