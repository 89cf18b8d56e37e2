//! Create-flow metadata extraction.
//!
//! # Responsibility
//! - Promote the first heading/text/image blocks to title/description/cover.
//! - Return the remaining blocks in their original relative order.
//!
//! # Invariants
//! - The three searches are independent, single-pass and first-match.
//! - Only the promoted blocks are removed from the section list.

use crate::model::block::{Block, BlockBody, BlockId, ImageBlock};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Extraction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataError {
    /// No heading block with non-blank content exists.
    TitleRequired,
}

impl Display for MetadataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TitleRequired => write!(f, "title required: add a heading block"),
        }
    }
}

impl Error for MetadataError {}

/// Metadata promoted out of a block sequence plus what stays as sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedGuide {
    pub title: String,
    /// Empty when no text block exists.
    pub description: String,
    pub cover: Option<ImageBlock>,
    /// Blocks that were not promoted, in original order.
    pub remaining: Vec<Block>,
}

/// Splits guide metadata from the body blocks.
///
/// - `title`: first heading with non-blank content (required).
/// - `description`: first text block.
/// - `cover`: first image block.
pub fn extract_metadata(blocks: &[Block]) -> Result<ExtractedGuide, MetadataError> {
    let title_block = blocks.iter().find(|block| {
        matches!(&block.body, BlockBody::Heading { content } if !content.trim().is_empty())
    });
    let Some(title_block) = title_block else {
        return Err(MetadataError::TitleRequired);
    };
    let description_block = blocks
        .iter()
        .find(|block| matches!(block.body, BlockBody::Text { .. }));
    let cover_block = blocks
        .iter()
        .find(|block| matches!(block.body, BlockBody::Image(_)));

    let consumed: Vec<BlockId> = [Some(title_block), description_block, cover_block]
        .into_iter()
        .flatten()
        .map(|block| block.id)
        .collect();

    Ok(ExtractedGuide {
        title: title_block.body.content().unwrap_or_default().to_string(),
        description: description_block
            .and_then(|block| block.body.content())
            .unwrap_or_default()
            .to_string(),
        cover: cover_block.and_then(|block| block.body.as_image().cloned()),
        remaining: blocks
            .iter()
            .filter(|block| !consumed.contains(&block.id))
            .cloned()
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::{extract_metadata, MetadataError};
    use crate::model::block::{Block, BlockBody, BlockKind};

    fn heading(content: &str) -> Block {
        Block::new(BlockBody::Heading {
            content: content.to_string(),
        })
    }

    #[test]
    fn blank_headings_do_not_count_as_title() {
        let blocks = vec![heading("   "), Block::empty(BlockKind::Text)];
        assert_eq!(
            extract_metadata(&blocks).unwrap_err(),
            MetadataError::TitleRequired
        );
    }

    #[test]
    fn later_blocks_of_promoted_kinds_stay_in_sections() {
        let blocks = vec![heading("Title"), heading("Step one"), heading("Step two")];
        let extracted = extract_metadata(&blocks).unwrap();
        assert_eq!(extracted.title, "Title");
        assert_eq!(extracted.description, "");
        assert!(extracted.cover.is_none());
        assert_eq!(extracted.remaining, blocks[1..].to_vec());
    }
}
