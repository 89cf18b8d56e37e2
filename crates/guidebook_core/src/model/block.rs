//! Guide content-block model.
//!
//! # Responsibility
//! - Define the block variant set and the field shape of each variant.
//! - Define the persisted `Section` form and the lenient `StoredSection` read
//!   form.
//! - Own the variant conversion rule used by the editor.
//!
//! # Invariants
//! - Every `Block` carries a locally-unique `BlockId` that is never persisted.
//! - `pending` attachments never reach the wire (`#[serde(skip)]`).
//! - A `Section` never holds a pending attachment or a local URL.
//!
//! # See also
//! - docs/architecture/guide-content.md

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Editor-local identity for one block.
pub type BlockId = Uuid;

/// URL schemes that only resolve inside the authoring session.
const LOCAL_URL_PREFIXES: &[&str] = &["blob:", "file:", "data:"];

/// Fieldless discriminant of `BlockBody`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Text,
    Heading,
    Quote,
    Tip,
    Image,
    List,
    Delimiter,
    Links,
    AppLinks,
    PdfLinks,
    SocialLinks,
}

impl BlockKind {
    /// Every known kind, in palette order.
    pub const ALL: [BlockKind; 11] = [
        BlockKind::Text,
        BlockKind::Heading,
        BlockKind::Quote,
        BlockKind::Tip,
        BlockKind::Image,
        BlockKind::List,
        BlockKind::Delimiter,
        BlockKind::Links,
        BlockKind::AppLinks,
        BlockKind::PdfLinks,
        BlockKind::SocialLinks,
    ];

    /// Wire name used in the `type` discriminant.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Heading => "heading",
            Self::Quote => "quote",
            Self::Tip => "tip",
            Self::Image => "image",
            Self::List => "list",
            Self::Delimiter => "delimiter",
            Self::Links => "links",
            Self::AppLinks => "app_links",
            Self::PdfLinks => "pdf_links",
            Self::SocialLinks => "social_links",
        }
    }

    /// Parses a wire name. Returns `None` for unknown kinds.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// Kinds whose whole payload is a single `content` string.
    pub fn is_text_like(self) -> bool {
        matches!(self, Self::Text | Self::Heading | Self::Quote | Self::Tip)
    }
}

impl Display for BlockKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A locally chosen binary that has not been uploaded yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PendingAttachment {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// Payload of an `image` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBlock {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub caption: String,
    /// Present only while a local file awaits upload.
    #[serde(skip)]
    pub pending: Option<PendingAttachment>,
}

impl ImageBlock {
    /// Image already stored at a permanent URL.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Image backed by a local file that still has to be uploaded.
    pub fn from_attachment(attachment: PendingAttachment) -> Self {
        Self {
            pending: Some(attachment),
            ..Self::default()
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether `url` points at something only the authoring session can see.
    pub fn has_local_url(&self) -> bool {
        is_local_url(&self.url)
    }
}

/// `{name, url}` pair used by `links` and `social_links`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedLink {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl NamedLink {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// App store a download badge points at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreLabel {
    #[default]
    #[serde(rename = "Play Store")]
    PlayStore,
    #[serde(rename = "App Store")]
    AppStore,
}

impl StoreLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PlayStore => "Play Store",
            Self::AppStore => "App Store",
        }
    }
}

/// `{label, url}` pair used by `app_links`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppLink {
    #[serde(default)]
    pub label: StoreLabel,
    #[serde(default)]
    pub url: String,
}

/// `{label, url}` pair used by `pdf_links`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfLink {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub url: String,
}

/// Variant-tagged block payload. Serialized with a `type` discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockBody {
    Text {
        #[serde(default)]
        content: String,
    },
    Heading {
        #[serde(default)]
        content: String,
    },
    Quote {
        #[serde(default)]
        content: String,
    },
    Tip {
        #[serde(default)]
        content: String,
    },
    Image(ImageBlock),
    List {
        #[serde(default)]
        items: Vec<String>,
    },
    Delimiter,
    Links {
        #[serde(default)]
        items: Vec<NamedLink>,
    },
    AppLinks {
        #[serde(default)]
        items: Vec<AppLink>,
    },
    PdfLinks {
        #[serde(default)]
        items: Vec<PdfLink>,
    },
    SocialLinks {
        #[serde(default)]
        items: Vec<NamedLink>,
    },
}

/// One named-field replacement applied by `BlockEditor::update_block`.
///
/// A patch that names a field the current variant does not have is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockPatch {
    /// `content` of text/heading/quote/tip.
    Content(String),
    /// `url` of image.
    Url(String),
    /// `caption` of image.
    Caption(String),
    /// Sets or clears the pending upload of an image.
    Attachment(Option<PendingAttachment>),
    /// `items` of list.
    Items(Vec<String>),
    /// `items` of links and social_links.
    NamedLinks(Vec<NamedLink>),
    /// `items` of app_links.
    AppLinks(Vec<AppLink>),
    /// `items` of pdf_links.
    PdfLinks(Vec<PdfLink>),
}

impl BlockBody {
    /// Default/empty payload for a kind.
    pub fn empty(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Text => Self::Text {
                content: String::new(),
            },
            BlockKind::Heading => Self::Heading {
                content: String::new(),
            },
            BlockKind::Quote => Self::Quote {
                content: String::new(),
            },
            BlockKind::Tip => Self::Tip {
                content: String::new(),
            },
            BlockKind::Image => Self::Image(ImageBlock::default()),
            BlockKind::List => Self::List { items: Vec::new() },
            BlockKind::Delimiter => Self::Delimiter,
            BlockKind::Links => Self::Links { items: Vec::new() },
            BlockKind::AppLinks => Self::AppLinks { items: Vec::new() },
            BlockKind::PdfLinks => Self::PdfLinks { items: Vec::new() },
            BlockKind::SocialLinks => Self::SocialLinks { items: Vec::new() },
        }
    }

    /// Text-like payload of the given kind.
    ///
    /// Non text-like kinds fall back to `text`.
    pub fn text_like(kind: BlockKind, content: impl Into<String>) -> Self {
        let content = content.into();
        match kind {
            BlockKind::Heading => Self::Heading { content },
            BlockKind::Quote => Self::Quote { content },
            BlockKind::Tip => Self::Tip { content },
            _ => Self::Text { content },
        }
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Text { .. } => BlockKind::Text,
            Self::Heading { .. } => BlockKind::Heading,
            Self::Quote { .. } => BlockKind::Quote,
            Self::Tip { .. } => BlockKind::Tip,
            Self::Image(_) => BlockKind::Image,
            Self::List { .. } => BlockKind::List,
            Self::Delimiter => BlockKind::Delimiter,
            Self::Links { .. } => BlockKind::Links,
            Self::AppLinks { .. } => BlockKind::AppLinks,
            Self::PdfLinks { .. } => BlockKind::PdfLinks,
            Self::SocialLinks { .. } => BlockKind::SocialLinks,
        }
    }

    /// `content` of a text-like block.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Text { content }
            | Self::Heading { content }
            | Self::Quote { content }
            | Self::Tip { content } => Some(content.as_str()),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageBlock> {
        match self {
            Self::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_image_mut(&mut self) -> Option<&mut ImageBlock> {
        match self {
            Self::Image(image) => Some(image),
            _ => None,
        }
    }

    /// Best-effort single-string view of the payload.
    ///
    /// Used when converting into a text-like kind.
    pub fn text_projection(&self) -> String {
        match self {
            Self::Text { content }
            | Self::Heading { content }
            | Self::Quote { content }
            | Self::Tip { content } => content.clone(),
            Self::Image(image) => image.caption.clone(),
            Self::List { items } => items.join("\n"),
            Self::Delimiter => String::new(),
            Self::Links { .. }
            | Self::AppLinks { .. }
            | Self::PdfLinks { .. }
            | Self::SocialLinks { .. } => self
                .link_pairs()
                .into_iter()
                .map(|(name, _)| name)
                .filter(|name| !name.trim().is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Reshapes the payload into `target`, keeping what is compatible.
    ///
    /// Converting to the current kind returns the payload unchanged.
    pub fn convert(self, target: BlockKind) -> Self {
        if self.kind() == target {
            return self;
        }

        match target {
            BlockKind::Text | BlockKind::Heading | BlockKind::Quote | BlockKind::Tip => {
                Self::text_like(target, self.text_projection())
            }
            BlockKind::Image => Self::Image(ImageBlock {
                caption: self.text_projection(),
                ..ImageBlock::default()
            }),
            BlockKind::List => Self::List {
                items: self.list_projection(),
            },
            BlockKind::Delimiter => Self::Delimiter,
            BlockKind::Links => Self::Links {
                items: self
                    .convertible_pairs()
                    .map(|(name, url)| NamedLink { name, url })
                    .collect(),
            },
            BlockKind::SocialLinks => Self::SocialLinks {
                items: self
                    .convertible_pairs()
                    .map(|(name, url)| NamedLink { name, url })
                    .collect(),
            },
            BlockKind::PdfLinks => Self::PdfLinks {
                items: self
                    .convertible_pairs()
                    .map(|(label, url)| PdfLink { label, url })
                    .collect(),
            },
            // Free-form names cannot be mapped onto the store label enum.
            BlockKind::AppLinks => Self::AppLinks { items: Vec::new() },
        }
    }

    /// Applies one field patch. Returns `false` when the variant lacks the
    /// named field.
    pub fn apply(&mut self, patch: BlockPatch) -> bool {
        match (self, patch) {
            (
                Self::Text { content }
                | Self::Heading { content }
                | Self::Quote { content }
                | Self::Tip { content },
                BlockPatch::Content(value),
            ) => {
                *content = value;
                true
            }
            (Self::Image(image), BlockPatch::Url(value)) => {
                image.url = value;
                true
            }
            (Self::Image(image), BlockPatch::Caption(value)) => {
                image.caption = value;
                true
            }
            (Self::Image(image), BlockPatch::Attachment(value)) => {
                image.pending = value;
                true
            }
            (Self::List { items }, BlockPatch::Items(value)) => {
                *items = value;
                true
            }
            (
                Self::Links { items } | Self::SocialLinks { items },
                BlockPatch::NamedLinks(value),
            ) => {
                *items = value;
                true
            }
            (Self::AppLinks { items }, BlockPatch::AppLinks(value)) => {
                *items = value;
                true
            }
            (Self::PdfLinks { items }, BlockPatch::PdfLinks(value)) => {
                *items = value;
                true
            }
            _ => false,
        }
    }

    /// Appends one empty item to a collection variant.
    pub fn push_empty_item(&mut self) -> bool {
        match self {
            Self::List { items } => items.push(String::new()),
            Self::Links { items } | Self::SocialLinks { items } => items.push(NamedLink::default()),
            Self::AppLinks { items } => items.push(AppLink::default()),
            Self::PdfLinks { items } => items.push(PdfLink::default()),
            _ => return false,
        }
        true
    }

    /// Removes the item at `index` from a collection variant.
    pub fn remove_item(&mut self, index: usize) -> bool {
        fn remove_at<T>(items: &mut Vec<T>, index: usize) -> bool {
            if index < items.len() {
                items.remove(index);
                true
            } else {
                false
            }
        }

        match self {
            Self::List { items } => remove_at(items, index),
            Self::Links { items } | Self::SocialLinks { items } => remove_at(items, index),
            Self::AppLinks { items } => remove_at(items, index),
            Self::PdfLinks { items } => remove_at(items, index),
            _ => false,
        }
    }

    /// `(name-or-label, url)` pairs of link-collection variants.
    fn link_pairs(&self) -> Vec<(String, String)> {
        match self {
            Self::Links { items } | Self::SocialLinks { items } => items
                .iter()
                .map(|item| (item.name.clone(), item.url.clone()))
                .collect(),
            Self::PdfLinks { items } => items
                .iter()
                .map(|item| (item.label.clone(), item.url.clone()))
                .collect(),
            Self::AppLinks { items } => items
                .iter()
                .map(|item| (item.label.as_str().to_string(), item.url.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn convertible_pairs(&self) -> impl Iterator<Item = (String, String)> {
        self.link_pairs().into_iter()
    }

    fn list_projection(&self) -> Vec<String> {
        let source = match self {
            Self::List { items } => return items.clone(),
            Self::Delimiter => return Vec::new(),
            other => other.text_projection(),
        };
        source
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// One unit of guide content inside an editing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: BlockId,
    pub body: BlockBody,
}

impl Block {
    /// Wraps a payload with a freshly generated identifier.
    pub fn new(body: BlockBody) -> Self {
        Self {
            id: Uuid::new_v4(),
            body,
        }
    }

    /// Empty block of `kind` with a fresh identifier.
    pub fn empty(kind: BlockKind) -> Self {
        Self::new(BlockBody::empty(kind))
    }

    pub fn kind(&self) -> BlockKind {
        self.body.kind()
    }

    /// Identity comparison used for list diffing; payloads are ignored.
    pub fn same_identity(&self, other: &Block) -> bool {
        self.id == other.id
    }
}

/// Rejection reasons when a payload is not yet persistable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionError {
    /// An image still holds a local file that was never uploaded.
    PendingAttachment,
    /// An image points at a session-local URL.
    LocalUrl(String),
}

impl Display for SectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PendingAttachment => write!(f, "image section still has a pending upload"),
            Self::LocalUrl(url) => write!(f, "image section points at local url `{url}`"),
        }
    }
}

impl Error for SectionError {}

/// Persisted form of a block: no identifier, no pending attachment, no
/// local URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Section(BlockBody);

impl Section {
    /// Accepts a payload whose attachments have all been resolved.
    pub fn from_body(body: BlockBody) -> Result<Self, SectionError> {
        if let Some(image) = body.as_image() {
            if image.has_pending() {
                return Err(SectionError::PendingAttachment);
            }
            if image.has_local_url() {
                return Err(SectionError::LocalUrl(image.url.clone()));
            }
        }
        Ok(Self(body))
    }

    pub fn body(&self) -> &BlockBody {
        &self.0
    }

    pub fn into_body(self) -> BlockBody {
        self.0
    }

    pub fn kind(&self) -> BlockKind {
        self.0.kind()
    }
}

/// Section as read back from storage.
///
/// Shapes this build does not recognize are kept verbatim as `Unknown` so
/// older readers tolerate newer documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredSection {
    Known(Section),
    Unknown(serde_json::Value),
}

impl StoredSection {
    pub fn as_known(&self) -> Option<&Section> {
        match self {
            Self::Known(section) => Some(section),
            Self::Unknown(_) => None,
        }
    }
}

impl From<Section> for StoredSection {
    fn from(value: Section) -> Self {
        Self::Known(value)
    }
}

/// Whether `url` only resolves inside the authoring session.
pub fn is_local_url(url: &str) -> bool {
    let trimmed = url.trim_start();
    LOCAL_URL_PREFIXES
        .iter()
        .any(|prefix| trimmed.starts_with(prefix))
}
