//! Stackless depth-first traversal.
//!
//! Traversal follows the per-node links directly: entering a production
//! descends to its first child, and a node's link says whether to move to a
//! sibling or climb back out. No auxiliary stack is allocated, so walking a
//! tree of any depth costs constant memory.

use super::arena::NodeId;
use super::node::{Link, NodeData};
use super::ParseTree;

/// One step of a depth-first walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Descending into a production.
    Enter(NodeId),
    /// Visiting a token leaf.
    Token(NodeId),
    /// Climbing back out of a production.
    Exit(NodeId),
}

/// Iterator over [`Step`]s, created by [`ParseTree::traverse`].
#[derive(Debug)]
pub struct Traverse<'t> {
    tree: &'t ParseTree,
    next: Option<Step>,
}

impl<'t> Traverse<'t> {
    pub(crate) fn new(tree: &'t ParseTree) -> Self {
        Self {
            tree,
            next: Some(Step::Enter(tree.root())),
        }
    }

    fn visit(&self, id: NodeId) -> Step {
        match self.tree.arena.get(id).data {
            NodeData::Token { .. } => Step::Token(id),
            NodeData::Production { .. } => Step::Enter(id),
        }
    }

    fn follow(&self, link: Link) -> Option<Step> {
        match link {
            Link::Sibling(sibling) => Some(self.visit(sibling)),
            Link::Parent(parent) => Some(Step::Exit(parent)),
            Link::Root => None,
        }
    }
}

impl Iterator for Traverse<'_> {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        let step = self.next.take()?;
        self.next = match step {
            Step::Enter(id) => match self.tree.arena.get(id).data {
                NodeData::Production {
                    first_child: Some(child),
                    ..
                } => Some(self.visit(child)),
                _ => Some(Step::Exit(id)),
            },
            Step::Token(id) | Step::Exit(id) => self.follow(self.tree.arena.get(id).link),
        };
        Some(step)
    }
}
