//! In-memory block editor for one guide editing session.
//!
//! # Responsibility
//! - Own the ordered block sequence of one session.
//! - Apply add/update/delete/move/convert operations in place.
//!
//! # Invariants
//! - Order changes only through insertion and `move_block`; never sorted.
//! - Identifiers are unique within the sequence and survive conversion.
//! - Unknown identifiers and out-of-range indexes are silent no-ops
//!   (the operation returns `false`).

use crate::model::block::{Block, BlockBody, BlockId, BlockKind, BlockPatch, StoredSection};
use log::{debug, warn};
use serde_json::Value;

/// Direction for `BlockEditor::move_block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Stored section the editor cannot represent, carried through an edit
/// session untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct PreservedSection {
    /// Block the section followed when loaded; `None` when it led the list.
    pub after: Option<BlockId>,
    pub raw: Value,
}

/// Ordered block sequence owned by one editing session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockEditor {
    blocks: Vec<Block>,
}

impl BlockEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session from existing blocks.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Starts an edit-flow session from stored sections.
    ///
    /// Every section receives a fresh identifier. Sections this build cannot
    /// decode are dropped; use `split_sections` to keep them.
    pub fn from_sections(sections: &[StoredSection]) -> Self {
        let (editor, preserved) = Self::split_sections(sections);
        if !preserved.is_empty() {
            warn!(
                "event=editor_load module=editor status=partial dropped_sections={}",
                preserved.len()
            );
        }
        editor
    }

    /// Splits stored sections into an editor over the decodable ones and the
    /// undecodable ones, each anchored after the block it followed.
    pub fn split_sections(sections: &[StoredSection]) -> (Self, Vec<PreservedSection>) {
        let mut blocks: Vec<Block> = Vec::with_capacity(sections.len());
        let mut preserved = Vec::new();
        for section in sections {
            match section {
                StoredSection::Known(known) => blocks.push(Block::new(known.body().clone())),
                StoredSection::Unknown(raw) => preserved.push(PreservedSection {
                    after: blocks.last().map(|block| block.id),
                    raw: raw.clone(),
                }),
            }
        }
        (Self { blocks }, preserved)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|block| block.id == id)
    }

    pub fn position(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|block| block.id == id)
    }

    /// Inserts an empty block of `kind` right after `after_index`, or at the
    /// end when `after_index` is `None` or past the end.
    pub fn add_block(&mut self, kind: BlockKind, after_index: Option<usize>) -> BlockId {
        self.insert_block(Block::empty(kind), after_index)
    }

    /// Inserts a prepared block using the same placement rule as
    /// `add_block`. A colliding identifier is replaced with a fresh one.
    pub fn insert_block(&mut self, mut block: Block, after_index: Option<usize>) -> BlockId {
        if self.get(block.id).is_some() {
            block = Block::new(block.body);
        }
        let id = block.id;
        match after_index {
            Some(index) if index < self.blocks.len() => self.blocks.insert(index + 1, block),
            _ => self.blocks.push(block),
        }
        id
    }

    /// Applies field patches to the block `id`.
    ///
    /// Patches naming fields the block's variant lacks are skipped.
    pub fn update_block(
        &mut self,
        id: BlockId,
        patches: impl IntoIterator<Item = BlockPatch>,
    ) -> bool {
        let Some(block) = self.block_mut(id) else {
            debug!("event=block_update module=editor status=noop reason=unknown_id");
            return false;
        };
        let mut applied = false;
        for patch in patches {
            applied |= block.body.apply(patch);
        }
        applied
    }

    /// Removes the block `id`.
    pub fn delete_block(&mut self, id: BlockId) -> bool {
        match self.position(id) {
            Some(index) => {
                self.blocks.remove(index);
                true
            }
            None => {
                debug!("event=block_delete module=editor status=noop reason=unknown_id");
                false
            }
        }
    }

    /// Swaps the block at `index` with its neighbour in `direction`.
    pub fn move_block(&mut self, index: usize, direction: MoveDirection) -> bool {
        if index >= self.blocks.len() {
            return false;
        }
        let target = match direction {
            MoveDirection::Up if index > 0 => index - 1,
            MoveDirection::Down if index + 1 < self.blocks.len() => index + 1,
            _ => return false,
        };
        self.blocks.swap(index, target);
        true
    }

    /// Changes the variant of block `id`, keeping its identifier and the
    /// fields compatible with `kind`.
    pub fn convert_block(&mut self, id: BlockId, kind: BlockKind) -> bool {
        let Some(block) = self.block_mut(id) else {
            debug!("event=block_convert module=editor status=noop reason=unknown_id");
            return false;
        };
        let body = std::mem::replace(&mut block.body, BlockBody::Delimiter);
        block.body = body.convert(kind);
        true
    }

    /// Appends an empty item to a list or link-collection block.
    pub fn push_item(&mut self, id: BlockId) -> bool {
        self.block_mut(id)
            .is_some_and(|block| block.body.push_empty_item())
    }

    /// Removes item `index` from a list or link-collection block.
    pub fn remove_item(&mut self, id: BlockId, index: usize) -> bool {
        self.block_mut(id)
            .is_some_and(|block| block.body.remove_item(index))
    }

    fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|block| block.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::{BlockEditor, MoveDirection};
    use crate::model::block::{BlockBody, BlockKind, BlockPatch};

    #[test]
    fn add_block_inserts_after_index_or_appends() {
        let mut editor = BlockEditor::new();
        let first = editor.add_block(BlockKind::Heading, None);
        let last = editor.add_block(BlockKind::Text, None);
        let middle = editor.add_block(BlockKind::Tip, Some(0));
        let tail = editor.add_block(BlockKind::Delimiter, Some(99));

        let order = editor.blocks().iter().map(|block| block.id).collect::<Vec<_>>();
        assert_eq!(order, vec![first, middle, last, tail]);
    }

    #[test]
    fn update_ignores_fields_the_variant_lacks() {
        let mut editor = BlockEditor::new();
        let id = editor.add_block(BlockKind::Quote, None);

        assert!(!editor.update_block(id, [BlockPatch::Url("https://x".to_string())]));
        assert!(editor.update_block(id, [BlockPatch::Content("said".to_string())]));
        assert_eq!(
            editor.get(id).map(|block| block.body.clone()),
            Some(BlockBody::Quote {
                content: "said".to_string()
            })
        );
    }

    #[test]
    fn move_out_of_range_is_noop() {
        let mut editor = BlockEditor::new();
        editor.add_block(BlockKind::Text, None);
        assert!(!editor.move_block(5, MoveDirection::Up));
    }

    #[test]
    fn item_helpers_edit_collections_only() {
        let mut editor = BlockEditor::new();
        let list = editor.add_block(BlockKind::List, None);
        let text = editor.add_block(BlockKind::Text, None);

        assert!(editor.push_item(list));
        assert!(editor.push_item(list));
        assert!(editor.remove_item(list, 1));
        assert!(!editor.remove_item(list, 1));
        assert!(!editor.push_item(text));
        assert_eq!(
            editor.get(list).map(|block| block.body.clone()),
            Some(BlockBody::List {
                items: vec![String::new()]
            })
        );
    }
}
