//! Node representation.
//!
//! The tree is index-linked rather than pointer-linked: every node carries
//! one [`Link`] that points to its next sibling, or to its parent when it is
//! the last child. A production stores its first child and child count, so
//! forward traversal needs no auxiliary stack and no per-child vector.

use super::arena::NodeId;
use crate::kind::TokenKind;
use crate::text::TextRange;

/// Where traversal goes after this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum Link {
    /// Next sibling under the same parent.
    Sibling(NodeId),
    /// This is the last child; climb back to the parent.
    Parent(NodeId),
    /// This is the root.
    Root,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub(crate) enum NodeData {
    Token {
        kind: TokenKind,
        range: TextRange,
    },
    Production {
        name: &'static str,
        first_child: Option<NodeId>,
        count: u32,
        range: TextRange,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub(crate) struct Node {
    pub(crate) data: NodeData,
    pub(crate) link: Link,
}

impl Node {
    pub(crate) const fn range(&self) -> TextRange {
        match self.data {
            NodeData::Token { range, .. } | NodeData::Production { range, .. } => range,
        }
    }
}
