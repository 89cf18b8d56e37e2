//! Guide use-case service.
//!
//! # Responsibility
//! - Create guides from a block sequence (metadata extraction + two-phase
//!   save).
//! - Load guides into an edit session and overwrite them on save.
//! - Read, list and delete guides; toggle likes and count views.
//!
//! # Invariants
//! - Validation runs before any gateway call.
//! - Every pending upload succeeds before the single document write.
//! - The caller's editor state is never mutated by a save, so a failed save
//!   can be retried.
//! - Sections the editor cannot represent survive load and save unchanged.
//! - Like/view updates are read-modify-write with last writer wins.

use crate::config::GuidebookConfig;
use crate::editor::block_editor::{BlockEditor, PreservedSection};
use crate::gateway::{now_epoch_ms, AuthUser, Filter, Gateway, GatewayError, Row, SelectQuery};
use crate::model::block::{
    Block, BlockBody, BlockId, ImageBlock, Section, SectionError, StoredSection,
};
use crate::model::guide::{normalize_tags, GuideContent, GuideDocument, GuideId, GuideRecord};
use crate::service::metadata::{extract_metadata, MetadataError};
use crate::service::serializer::{
    build_sections, ensure_resolvable, merge_preserved, upload_pending, UploadError,
    UploadTarget,
};
use log::{debug, info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const GUIDES_DEFAULT_LIMIT: u32 = 20;
const GUIDES_LIMIT_MAX: u32 = 100;

/// Input problems detected before any gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuideValidationError {
    /// No usable title (create: no non-blank heading; edit: blank name).
    TitleRequired,
    /// Category is blank.
    CategoryRequired,
    /// An image points at a local URL with nothing to upload in its place.
    UnresolvedImage(String),
}

impl Display for GuideValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TitleRequired => write!(f, "title required"),
            Self::CategoryRequired => write!(f, "category required"),
            Self::UnresolvedImage(url) => write!(f, "image `{url}` was never uploaded"),
        }
    }
}

impl Error for GuideValidationError {}

impl From<MetadataError> for GuideValidationError {
    fn from(value: MetadataError) -> Self {
        match value {
            MetadataError::TitleRequired => Self::TitleRequired,
        }
    }
}

impl From<SectionError> for GuideValidationError {
    fn from(value: SectionError) -> Self {
        match value {
            SectionError::LocalUrl(url) => Self::UnresolvedImage(url),
            SectionError::PendingAttachment => Self::UnresolvedImage(String::new()),
        }
    }
}

/// Service error for guide use-cases.
#[derive(Debug)]
pub enum GuideServiceError {
    Validation(GuideValidationError),
    /// No signed-in user for an operation that needs one.
    Unauthenticated,
    GuideNotFound(GuideId),
    /// Phase 1 failed; nothing was written.
    UploadFailed(UploadError),
    /// Document write failed after uploads succeeded.
    SaveFailed(GatewayError),
    /// Any other gateway failure.
    Gateway(GatewayError),
    /// A stored or assembled document does not have the guide shape.
    InvalidDocument(String),
    /// Write succeeded but read-back disagrees.
    InconsistentState(&'static str),
}

impl Display for GuideServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Unauthenticated => write!(f, "sign in required"),
            Self::GuideNotFound(id) => write!(f, "guide not found: {id}"),
            Self::UploadFailed(err) => write!(f, "{err}"),
            Self::SaveFailed(err) => write!(f, "guide save failed: {err}"),
            Self::Gateway(err) => write!(f, "{err}"),
            Self::InvalidDocument(details) => write!(f, "invalid guide document: {details}"),
            Self::InconsistentState(details) => write!(f, "inconsistent guide state: {details}"),
        }
    }
}

impl Error for GuideServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::UploadFailed(err) => Some(err),
            Self::SaveFailed(err) | Self::Gateway(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GuideValidationError> for GuideServiceError {
    fn from(value: GuideValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<GatewayError> for GuideServiceError {
    fn from(value: GatewayError) -> Self {
        Self::Gateway(value)
    }
}

impl From<UploadError> for GuideServiceError {
    fn from(value: UploadError) -> Self {
        Self::UploadFailed(value)
    }
}

/// Create-flow input: the authored block sequence plus explicit fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideDraft {
    pub blocks: Vec<Block>,
    pub category: String,
    pub tags: Vec<String>,
}

/// Explicit metadata captured by the edit flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideMetadata {
    pub name: String,
    pub description: String,
    /// Existing cover URL, a pending replacement, or none.
    pub cover: Option<ImageBlock>,
    pub category: String,
    pub tags: Vec<String>,
}

/// Working copy of one stored guide.
#[derive(Debug, Clone, PartialEq)]
pub struct GuideEditSession {
    pub guide_id: GuideId,
    /// Kept to address the guide's storage folder.
    pub created_at: i64,
    pub created_by: String,
    pub metadata: GuideMetadata,
    pub editor: BlockEditor,
    /// Stored sections the editor cannot represent; written back on save.
    pub preserved: Vec<PreservedSection>,
}

/// Query options for guide listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuideListQuery {
    pub category: Option<String>,
    /// Defaults to 20 and clamps to 100.
    pub limit: Option<u32>,
}

/// Like state after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub count: usize,
}

/// Guide service facade over an injected gateway.
pub struct GuideService<G: Gateway> {
    gateway: G,
    config: GuidebookConfig,
}

impl<G: Gateway> GuideService<G> {
    pub fn new(gateway: G, config: GuidebookConfig) -> Self {
        Self { gateway, config }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Creates one guide from an authored block sequence.
    ///
    /// The first heading/text/image blocks become name/description/cover;
    /// every other block is persisted as a section.
    pub fn create_guide(&self, draft: &GuideDraft) -> Result<GuideRecord, GuideServiceError> {
        let started_at = Instant::now();
        let category = required_category(&draft.category)?;
        let extracted = extract_metadata(&draft.blocks).map_err(GuideValidationError::from)?;
        let mut cover = extracted.cover;
        let mut bodies: Vec<BlockBody> = extracted
            .remaining
            .into_iter()
            .map(|block| block.body)
            .collect();
        ensure_resolvable(cover.as_ref(), &bodies).map_err(GuideValidationError::from)?;

        let author = self.require_user()?;
        let created_at = now_epoch_ms();
        let target = UploadTarget::for_guide(&self.config.image_bucket, created_at, &author.id);
        let uploads = upload_pending(&self.gateway, &target, cover.as_mut(), &mut bodies)
            .inspect_err(|_| log_failure("guide_create", "upload_failed", started_at))?;

        let sections = resolve_sections(bodies)?
            .into_iter()
            .map(StoredSection::from)
            .collect();
        let document = assemble_document(
            extracted.title,
            extracted.description,
            cover,
            category,
            sections,
            &draft.tags,
        );
        let mut row = encode_document(&document)?;
        row.insert("created_at".to_string(), Value::from(created_at));
        row.insert("created_by".to_string(), Value::String(author.id.clone()));
        row.insert("view".to_string(), Value::from(0));
        row.insert("like".to_string(), Value::Object(Row::new()));

        let inserted = self
            .gateway
            .insert(&self.config.guides_collection, row)
            .map_err(GuideServiceError::SaveFailed)
            .inspect_err(|_| log_failure("guide_create", "save_failed", started_at))?;
        let record = decode_record(inserted)?;

        info!(
            "event=guide_create module=service status=ok uploads={uploads} sections={} duration_ms={}",
            record.content.sections.len(),
            started_at.elapsed().as_millis()
        );
        Ok(record)
    }

    /// Loads a stored guide into an edit session.
    pub fn load_for_edit(&self, id: &str) -> Result<GuideEditSession, GuideServiceError> {
        let record = self
            .get_guide(id)?
            .ok_or_else(|| GuideServiceError::GuideNotFound(id.to_string()))?;

        let (editor, preserved) = BlockEditor::split_sections(&record.content.sections);
        if !preserved.is_empty() {
            debug!(
                "event=guide_load module=service status=ok preserved_sections={}",
                preserved.len()
            );
        }

        Ok(GuideEditSession {
            editor,
            preserved,
            metadata: GuideMetadata {
                name: record.name,
                description: record.description,
                cover: record
                    .img_url
                    .filter(|url| !url.trim().is_empty())
                    .map(ImageBlock::from_url),
                category: record.category,
                tags: record.content.tags,
            },
            guide_id: record.id,
            created_at: record.created_at,
            created_by: record.created_by,
        })
    }

    /// Overwrites a stored guide with the session's metadata and blocks.
    pub fn save_edit(
        &self,
        session: &GuideEditSession,
    ) -> Result<GuideRecord, GuideServiceError> {
        let started_at = Instant::now();
        let metadata = &session.metadata;
        if metadata.name.trim().is_empty() {
            return Err(GuideValidationError::TitleRequired.into());
        }
        let category = required_category(&metadata.category)?;
        let mut cover = metadata.cover.clone();
        let mut bodies: Vec<BlockBody> = session
            .editor
            .blocks()
            .iter()
            .map(|block| block.body.clone())
            .collect();
        ensure_resolvable(cover.as_ref(), &bodies).map_err(GuideValidationError::from)?;

        self.require_user()?;
        let target = UploadTarget::for_guide(
            &self.config.image_bucket,
            session.created_at,
            &session.created_by,
        );
        let uploads = upload_pending(&self.gateway, &target, cover.as_mut(), &mut bodies)
            .inspect_err(|_| log_failure("guide_update", "upload_failed", started_at))?;

        let ids: Vec<BlockId> = session.editor.blocks().iter().map(|block| block.id).collect();
        let sections = merge_preserved(&ids, resolve_sections(bodies)?, &session.preserved);
        let document = assemble_document(
            metadata.name.trim().to_string(),
            metadata.description.clone(),
            cover,
            category,
            sections,
            &metadata.tags,
        );
        let changed = self
            .gateway
            .update(
                &self.config.guides_collection,
                encode_document(&document)?,
                &[Filter::eq("id", session.guide_id.as_str())],
            )
            .map_err(GuideServiceError::SaveFailed)
            .inspect_err(|_| log_failure("guide_update", "save_failed", started_at))?;
        if changed == 0 {
            return Err(GuideServiceError::GuideNotFound(session.guide_id.clone()));
        }

        info!(
            "event=guide_update module=service status=ok uploads={uploads} duration_ms={}",
            started_at.elapsed().as_millis()
        );
        self.get_guide(&session.guide_id)?
            .ok_or(GuideServiceError::InconsistentState(
                "updated guide not found in read-back",
            ))
    }

    /// Gets one guide by id.
    pub fn get_guide(&self, id: &str) -> Result<Option<GuideRecord>, GuideServiceError> {
        let query = SelectQuery::all().filter(Filter::eq("id", id)).limit(1);
        self.gateway
            .select(&self.config.guides_collection, &query)?
            .into_iter()
            .next()
            .map(decode_record)
            .transpose()
    }

    /// Lists guides newest first, optionally restricted to one category.
    pub fn list_guides(
        &self,
        query: &GuideListQuery,
    ) -> Result<Vec<GuideRecord>, GuideServiceError> {
        let mut select = SelectQuery::all()
            .order_by("created_at", false)
            .limit(normalize_guide_limit(query.limit));
        if let Some(category) = query
            .category
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            select = select.filter(Filter::eq("category", category));
        }

        self.gateway
            .select(&self.config.guides_collection, &select)?
            .into_iter()
            .map(decode_record)
            .collect()
    }

    /// Deletes one guide row. Stored images are left in place.
    pub fn delete_guide(&self, id: &str) -> Result<(), GuideServiceError> {
        let removed = self
            .gateway
            .delete(&self.config.guides_collection, &[Filter::eq("id", id)])?;
        if removed == 0 {
            return Err(GuideServiceError::GuideNotFound(id.to_string()));
        }
        info!("event=guide_delete module=service status=ok");
        Ok(())
    }

    /// Toggles the signed-in user's like on a guide.
    pub fn toggle_like(&self, id: &str) -> Result<LikeState, GuideServiceError> {
        let user = self.require_user()?;
        let mut record = self
            .get_guide(id)?
            .ok_or_else(|| GuideServiceError::GuideNotFound(id.to_string()))?;

        let liked = record.like.toggle(&user.id);
        let like_value = serde_json::to_value(&record.like)
            .map_err(|err| GuideServiceError::InvalidDocument(err.to_string()))?;
        self.patch_guide(id, "like", like_value)?;

        Ok(LikeState {
            liked,
            count: record.like.count(),
        })
    }

    /// Increments the view counter. Returns the new count.
    pub fn record_view(&self, id: &str) -> Result<i64, GuideServiceError> {
        let record = self
            .get_guide(id)?
            .ok_or_else(|| GuideServiceError::GuideNotFound(id.to_string()))?;
        let views = record.view.saturating_add(1);
        self.patch_guide(id, "view", Value::from(views))?;
        Ok(views)
    }

    fn patch_guide(&self, id: &str, column: &str, value: Value) -> Result<(), GuideServiceError> {
        let mut patch = Row::new();
        patch.insert(column.to_string(), value);
        let changed = self.gateway.update(
            &self.config.guides_collection,
            patch,
            &[Filter::eq("id", id)],
        )?;
        if changed == 0 {
            return Err(GuideServiceError::GuideNotFound(id.to_string()));
        }
        Ok(())
    }

    fn require_user(&self) -> Result<AuthUser, GuideServiceError> {
        self.gateway
            .current_user()?
            .ok_or(GuideServiceError::Unauthenticated)
    }
}

/// Normalizes list limit according to the listing contract.
pub fn normalize_guide_limit(limit: Option<u32>) -> u32 {
    match limit {
        None | Some(0) => GUIDES_DEFAULT_LIMIT,
        Some(value) => value.min(GUIDES_LIMIT_MAX),
    }
}

fn required_category(category: &str) -> Result<String, GuideValidationError> {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        Err(GuideValidationError::CategoryRequired)
    } else {
        Ok(trimmed.to_string())
    }
}

fn resolve_sections(bodies: Vec<BlockBody>) -> Result<Vec<Section>, GuideServiceError> {
    build_sections(bodies).map_err(|err| GuideServiceError::InvalidDocument(err.to_string()))
}

fn assemble_document(
    name: String,
    description: String,
    cover: Option<ImageBlock>,
    category: String,
    sections: Vec<StoredSection>,
    tags: &[String],
) -> GuideDocument {
    GuideDocument {
        name,
        description,
        img_url: cover
            .map(|image| image.url)
            .filter(|url| !url.trim().is_empty()),
        category,
        content: GuideContent {
            sections,
            tags: normalize_tags(tags),
        },
    }
}

fn encode_document(document: &GuideDocument) -> Result<Row, GuideServiceError> {
    document
        .to_row()
        .map_err(|err| GuideServiceError::InvalidDocument(err.to_string()))
}

fn decode_record(row: Row) -> Result<GuideRecord, GuideServiceError> {
    GuideRecord::from_row(row).map_err(|err| GuideServiceError::InvalidDocument(err.to_string()))
}

fn log_failure(event: &str, error_code: &str, started_at: Instant) {
    warn!(
        "event={event} module=service status=error error_code={error_code} duration_ms={}",
        started_at.elapsed().as_millis()
    );
}
