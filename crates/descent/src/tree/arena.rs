//! Block-backed node storage.
//!
//! Nodes live in fixed-size blocks and are addressed by index, so growing
//! the arena never moves an existing node and unwinding to a checkpoint is
//! a truncation. Node indices are dense and allocation-ordered, which the
//! builder relies on when it discards a cancelled region.

use super::node::Node;

pub(crate) const BLOCK_SIZE: usize = 512;

/// Index of a node in its [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Arena position to unwind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(pub(crate) u32);

#[derive(Debug, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub(crate) struct Arena {
    blocks: Vec<Vec<Node>>,
    len: u32,
}

impl Arena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) const fn len(&self) -> u32 {
        self.len
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        if self.blocks.last().map_or(true, |block| block.len() == BLOCK_SIZE) {
            self.blocks.push(Vec::with_capacity(BLOCK_SIZE));
        }
        if let Some(block) = self.blocks.last_mut() {
            block.push(node);
        }
        let id = NodeId(self.len);
        self.len += 1;
        id
    }

    pub(crate) fn get(&self, id: NodeId) -> &Node {
        let index = id.0 as usize;
        &self.blocks[index / BLOCK_SIZE][index % BLOCK_SIZE]
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node {
        let index = id.0 as usize;
        &mut self.blocks[index / BLOCK_SIZE][index % BLOCK_SIZE]
    }

    pub(crate) const fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.len)
    }

    /// Discard every node allocated after `checkpoint`. Whole trailing
    /// blocks are dropped, the boundary block is truncated in place.
    pub(crate) fn truncate(&mut self, checkpoint: Checkpoint) {
        let keep = checkpoint.0 as usize;
        debug_assert!(keep <= self.len as usize);
        let full_blocks = keep / BLOCK_SIZE;
        let remainder = keep % BLOCK_SIZE;
        if remainder == 0 {
            self.blocks.truncate(full_blocks);
        } else {
            self.blocks.truncate(full_blocks + 1);
            if let Some(block) = self.blocks.last_mut() {
                block.truncate(remainder);
            }
        }
        self.len = checkpoint.0;
    }
}
