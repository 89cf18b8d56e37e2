//! Core content logic for community guides.
//! This crate is the single source of truth for guide content invariants.

pub mod config;
pub mod db;
pub mod editor;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod render;
pub mod service;

pub use config::{ConfigError, GuidebookConfig};
pub use editor::block_editor::{BlockEditor, MoveDirection, PreservedSection};
pub use gateway::sqlite::SqliteGateway;
pub use gateway::{
    AuthUser, Filter, Gateway, GatewayError, GatewayResult, OrderBy, Row, SelectQuery,
};
pub use logging::{
    default_log_level, init_logging, init_logging_from, logging_status, LoggingError,
};
pub use model::block::{
    AppLink, Block, BlockBody, BlockId, BlockKind, BlockPatch, ImageBlock, NamedLink,
    PdfLink, PendingAttachment, Section, SectionError, StoreLabel, StoredSection,
};
pub use model::guide::{GuideContent, GuideDocument, GuideId, GuideRecord, LikeMap};
pub use render::section_renderer::{
    plain_text, render_sections, CalloutIcon, RenderedLink, RenderedSection, SocialLink,
    SocialPlatform, StoreBadge,
};
pub use service::guide_service::{
    GuideDraft, GuideEditSession, GuideListQuery, GuideMetadata, GuideService,
    GuideServiceError, GuideValidationError, LikeState,
};
pub use service::metadata::{extract_metadata, ExtractedGuide, MetadataError};
pub use service::serializer::{guide_folder, merge_preserved, UploadError, UploadTarget};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
