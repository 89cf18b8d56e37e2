//! Guide persistence serializer.
//!
//! # Responsibility
//! - Phase 1: upload every pending image attachment and substitute its
//!   permanent public URL.
//! - Phase 2: turn resolved block payloads into persistable `Section`s.
//!
//! # Invariants
//! - Uploads run sequentially; the first failure stops the phase and is
//!   returned, so no document write can follow it.
//! - Already uploaded objects are not rolled back on failure.
//! - Object paths live under a per-guide folder derived from creation time
//!   and author id.
//! - Sections loaded but not understood are written back verbatim.

use crate::editor::block_editor::PreservedSection;
use crate::gateway::{Gateway, GatewayError};
use crate::model::block::{BlockBody, BlockId, ImageBlock, Section, SectionError, StoredSection};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static UNSAFE_PATH_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid path segment regex"));

const FALLBACK_FILE_NAME: &str = "image";

/// One failed attachment upload.
#[derive(Debug)]
pub struct UploadError {
    /// Object path that failed.
    pub path: String,
    pub source: GatewayError,
}

impl Display for UploadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "upload of `{}` failed: {}", self.path, self.source)
    }
}

impl Error for UploadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Where phase 1 writes attachments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub bucket: String,
    /// Folder prefix, always ending in `/`.
    pub folder: String,
}

impl UploadTarget {
    pub fn for_guide(bucket: impl Into<String>, created_at_ms: i64, author_id: &str) -> Self {
        Self {
            bucket: bucket.into(),
            folder: guide_folder(created_at_ms, author_id),
        }
    }

    /// Unique object path for one attachment inside the guide folder.
    pub fn object_path(&self, file_name: &str) -> String {
        format!(
            "{}{}_{}",
            self.folder,
            Uuid::new_v4().simple(),
            sanitize_segment(file_name)
        )
    }
}

/// Deterministic per-guide storage folder: `{created_at_ms}_{author_id}/`.
pub fn guide_folder(created_at_ms: i64, author_id: &str) -> String {
    format!("{created_at_ms}_{}/", sanitize_segment(author_id))
}

/// Rejects images that point at session-local URLs without a pending
/// upload to replace them. Runs before any network call.
pub fn ensure_resolvable(
    cover: Option<&ImageBlock>,
    bodies: &[BlockBody],
) -> Result<(), SectionError> {
    let images = cover
        .into_iter()
        .chain(bodies.iter().filter_map(BlockBody::as_image));
    for image in images {
        if !image.has_pending() && image.has_local_url() {
            return Err(SectionError::LocalUrl(image.url.clone()));
        }
    }
    Ok(())
}

/// Phase 1: uploads every pending attachment of `cover` and `bodies`.
///
/// On success each uploaded image holds its public URL and no pending
/// attachment. Returns the number of uploads performed.
pub fn upload_pending<G: Gateway>(
    gateway: &G,
    target: &UploadTarget,
    cover: Option<&mut ImageBlock>,
    bodies: &mut [BlockBody],
) -> Result<usize, UploadError> {
    let images = cover
        .into_iter()
        .chain(bodies.iter_mut().filter_map(BlockBody::as_image_mut));

    let mut uploaded = 0usize;
    for image in images {
        let Some(attachment) = image.pending.as_ref() else {
            continue;
        };
        let path = target.object_path(&attachment.file_name);
        if let Err(source) = gateway.upload(&target.bucket, &path, attachment) {
            warn!(
                "event=attachment_upload module=serializer status=error uploaded_before_failure={uploaded}"
            );
            return Err(UploadError { path, source });
        }
        image.url = gateway.public_url(&target.bucket, &path);
        image.pending = None;
        uploaded += 1;
    }

    debug!("event=attachment_upload module=serializer status=ok uploaded={uploaded}");
    Ok(uploaded)
}

/// Phase 2: converts resolved payloads to sections.
///
/// Blank list items are dropped.
pub fn build_sections(bodies: Vec<BlockBody>) -> Result<Vec<Section>, SectionError> {
    bodies
        .into_iter()
        .map(|body| match body {
            BlockBody::List { items } => BlockBody::List {
                items: items
                    .into_iter()
                    .filter(|item| !item.trim().is_empty())
                    .collect(),
            },
            other => other,
        })
        .map(Section::from_body)
        .collect()
}

/// Interleaves preserved sections back between the built ones.
///
/// `ids[i]` is the editor block that produced `sections[i]`. A preserved
/// section whose anchor block no longer exists goes to the end.
pub fn merge_preserved(
    ids: &[BlockId],
    sections: Vec<Section>,
    preserved: &[PreservedSection],
) -> Vec<StoredSection> {
    let anchored = |anchor: Option<BlockId>| {
        preserved
            .iter()
            .filter(move |section| section.after == anchor)
            .map(|section| StoredSection::Unknown(section.raw.clone()))
    };

    let mut merged: Vec<StoredSection> = anchored(None).collect();
    for (id, section) in ids.iter().zip(sections) {
        merged.push(section.into());
        merged.extend(anchored(Some(*id)));
    }
    merged.extend(
        preserved
            .iter()
            .filter(|section| section.after.is_some_and(|anchor| !ids.contains(&anchor)))
            .map(|section| StoredSection::Unknown(section.raw.clone())),
    );
    merged
}

fn sanitize_segment(value: &str) -> String {
    let cleaned = UNSAFE_PATH_CHARS_RE.replace_all(value.trim(), "_");
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        build_sections, ensure_resolvable, guide_folder, merge_preserved, sanitize_segment,
        UploadTarget,
    };
    use crate::editor::block_editor::PreservedSection;
    use crate::model::block::{BlockBody, ImageBlock, Section, SectionError, StoredSection};
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn folder_is_deterministic_per_guide() {
        assert_eq!(guide_folder(1_700_000_000_000, "u1"), "1700000000000_u1/");
        assert_eq!(
            guide_folder(1_700_000_000_000, "u1"),
            guide_folder(1_700_000_000_000, "u1")
        );
    }

    #[test]
    fn object_paths_stay_inside_folder_and_are_sanitized() {
        let target = UploadTarget::for_guide("guide-images", 5, "author");
        let path = target.object_path("my photo (1).png");
        assert!(path.starts_with("5_author/"));
        assert!(path.ends_with("_my_photo_1_.png"));
        assert_eq!(sanitize_segment("  "), "image");
    }

    #[test]
    fn build_sections_drops_blank_list_items() {
        let sections = build_sections(vec![BlockBody::List {
            items: vec!["a".to_string(), " ".to_string(), "b".to_string()],
        }])
        .unwrap();
        assert_eq!(
            sections[0].body(),
            &BlockBody::List {
                items: vec!["a".to_string(), "b".to_string()]
            }
        );
    }

    #[test]
    fn local_url_without_pending_upload_is_rejected() {
        let bodies = vec![BlockBody::Image(ImageBlock::from_url("blob:abc"))];
        assert_eq!(
            ensure_resolvable(None, &bodies),
            Err(SectionError::LocalUrl("blob:abc".to_string()))
        );
    }

    #[test]
    fn preserved_sections_are_interleaved_by_anchor() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let gone = Uuid::new_v4();
        let heading = |content: &str| {
            Section::from_body(BlockBody::Heading {
                content: content.to_string(),
            })
            .unwrap()
        };
        let preserved = vec![
            PreservedSection {
                after: Some(gone),
                raw: json!({"type": "orphan"}),
            },
            PreservedSection {
                after: None,
                raw: json!({"type": "head"}),
            },
            PreservedSection {
                after: Some(first),
                raw: json!({"type": "middle"}),
            },
        ];

        let merged = merge_preserved(
            &[first, second],
            vec![heading("one"), heading("two")],
            &preserved,
        );
        assert_eq!(
            merged,
            vec![
                StoredSection::Unknown(json!({"type": "head"})),
                StoredSection::Known(heading("one")),
                StoredSection::Unknown(json!({"type": "middle"})),
                StoredSection::Known(heading("two")),
                StoredSection::Unknown(json!({"type": "orphan"})),
            ]
        );
    }
}
