//! Read-path rendering of stored guides.
//!
//! # Responsibility
//! - Turn stored sections into display-ready structure.
//!
//! # Invariants
//! - Rendering is side-effect free.
//! - Sections of unrecognized type are skipped, never an error.

pub mod section_renderer;
