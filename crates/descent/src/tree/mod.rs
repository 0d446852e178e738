//! Lossless parse trees.
//!
//! A [`ParseTree`] records every committed token, whitespace and error
//! tokens included, so concatenating the token ranges of a finished tree
//! reproduces the consumed input exactly.
//! Nodes live in a block arena and refer to each other by index; each node
//! carries a single link to its next sibling or, for the last child, back to
//! its parent. See the submodules for storage, construction and traversal.

mod arena;
mod builder;
mod node;
mod sink;
mod traverse;

pub use arena::NodeId;
pub use builder::TreeBuilder;
pub use sink::TreeSink;
pub use traverse::{Step, Traverse};

use crate::kind::TokenKind;
use crate::text::TextRange;
use node::NodeData;
use std::fmt::Write as _;

/// An immutable tree produced by a tree-building parse.
#[derive(Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ParseTree {
    arena: arena::Arena,
    root: NodeId,
}

impl ParseTree {
    /// The root production. Always present; it covers the whole input.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// The production name of `id`, or `None` for a token.
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&'static str> {
        match self.arena.get(id).data {
            NodeData::Production { name, .. } => Some(name),
            NodeData::Token { .. } => None,
        }
    }

    /// The token kind of `id`, or `None` for a production.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> Option<TokenKind> {
        match self.arena.get(id).data {
            NodeData::Token { kind, .. } => Some(kind),
            NodeData::Production { .. } => None,
        }
    }

    /// The source span the node covers.
    #[must_use]
    pub fn range(&self, id: NodeId) -> TextRange {
        self.arena.get(id).range()
    }

    /// Number of direct children (zero for tokens).
    #[must_use]
    pub fn child_count(&self, id: NodeId) -> u32 {
        match self.arena.get(id).data {
            NodeData::Production { count, .. } => count,
            NodeData::Token { .. } => 0,
        }
    }

    /// Iterator over the direct children of `id`.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        let first = match self.arena.get(id).data {
            NodeData::Production { first_child, .. } => first_child,
            NodeData::Token { .. } => None,
        };
        Children { tree: self, next: first }
    }

    /// Depth-first walk over the whole tree.
    #[must_use]
    pub fn traverse(&self) -> Traverse<'_> {
        Traverse::new(self)
    }

    /// Total number of nodes, root included.
    #[must_use]
    pub fn node_count(&self) -> u32 {
        self.arena.len()
    }

    /// Indented textual rendering against the input the tree was parsed
    /// from, for tests and debugging.
    #[must_use]
    pub fn render(&self, input: &str) -> String {
        let mut out = String::new();
        let mut depth = 0usize;
        for step in self.traverse() {
            match step {
                Step::Enter(id) => {
                    let name = self.name(id).unwrap_or("?");
                    for _ in 0..depth {
                        out.push_str("  ");
                    }
                    let _ = writeln!(out, "{name}@{}", self.range(id));
                    depth += 1;
                }
                Step::Token(id) => {
                    let range = self.range(id);
                    let kind = self.kind(id).unwrap_or(TokenKind::ERROR);
                    let text =
                        &input[range.start().into() as usize..range.end().into() as usize];
                    for _ in 0..depth {
                        out.push_str("  ");
                    }
                    let _ = writeln!(out, "{kind} {text:?}@{range}");
                }
                Step::Exit(_) => depth = depth.saturating_sub(1),
            }
        }
        out
    }
}

/// Iterator over the direct children of one node.
#[derive(Debug)]
pub struct Children<'t> {
    tree: &'t ParseTree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next.take()?;
        if let node::Link::Sibling(sibling) = self.tree.arena.get(id).link {
            self.next = Some(sibling);
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::TextSize;

    #[test]
    fn test_render_shape() {
        let mut builder = TreeBuilder::new("file");
        builder.start_production("number", TextSize::zero());
        builder.token(
            TokenKind::DIGITS,
            TextRange::new(TextSize::zero(), TextSize::from(2)),
        );
        builder.finish_production("number", TextSize::from(2));
        let tree = builder.finish(TextSize::from(2)).unwrap();

        let rendered = tree.render("42");
        assert_eq!(rendered, "file@0..2\n  number@0..2\n    digits \"42\"@0..2\n");
    }

    #[test]
    fn test_token_ranges_cover_input() {
        let mut builder = TreeBuilder::new("file");
        builder.token(
            TokenKind::DIGITS,
            TextRange::new(TextSize::zero(), TextSize::from(1)),
        );
        builder.token(
            TokenKind::WHITESPACE,
            TextRange::new(TextSize::from(1), TextSize::from(2)),
        );
        builder.token(
            TokenKind::DIGITS,
            TextRange::new(TextSize::from(2), TextSize::from(3)),
        );
        let tree = builder.finish(TextSize::from(3)).unwrap();

        let mut end = TextSize::zero();
        for step in tree.traverse() {
            if let Step::Token(id) = step {
                let range = tree.range(id);
                assert_eq!(range.start(), end);
                end = range.end();
            }
        }
        assert_eq!(end, TextSize::from(3));
    }
}
