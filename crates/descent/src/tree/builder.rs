//! Incremental tree construction from parse events.
//!
//! The builder keeps a stack of open frames (the root, open productions and
//! open operator chains). Tokens are appended to the innermost frame;
//! finishing a production patches its node and hands it to the frame below;
//! cancelling truncates the arena back to the frame's checkpoint and covers
//! the abandoned span with an error token so the finished tree still spans
//! every consumed byte.

use super::arena::{Arena, Checkpoint, NodeId};
use super::node::{Link, Node, NodeData};
use super::ParseTree;
use crate::error::{ParseError, ParseErrorKind};
use crate::kind::TokenKind;
use crate::text::{TextRange, TextSize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Root,
    Production { name: &'static str, node: NodeId },
    Chain,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    checkpoint: Checkpoint,
    begin: TextSize,
    first: Option<NodeId>,
    last: Option<NodeId>,
    count: u32,
}

impl Frame {
    fn new(kind: FrameKind, checkpoint: Checkpoint, begin: TextSize) -> Self {
        Self {
            kind,
            checkpoint,
            begin,
            first: None,
            last: None,
            count: 0,
        }
    }
}

/// Builds a [`ParseTree`] from the event stream of one parse.
#[derive(Debug)]
pub struct TreeBuilder {
    arena: Arena,
    frames: Vec<Frame>,
    root_name: &'static str,
}

impl TreeBuilder {
    #[must_use]
    pub fn new(root_name: &'static str) -> Self {
        let arena = Arena::new();
        let root = Frame::new(FrameKind::Root, arena.checkpoint(), TextSize::zero());
        Self {
            arena,
            frames: vec![root],
            root_name,
        }
    }

    fn append_child(&mut self, id: NodeId) {
        let Some(frame) = self.frames.last_mut() else {
            debug_assert!(false, "no open frame");
            return;
        };
        match frame.last {
            Some(last) => self.arena.get_mut(last).link = Link::Sibling(id),
            None => frame.first = Some(id),
        }
        frame.last = Some(id);
        frame.count += 1;
    }

    /// Append a token. Zero-length trivia is elided; an error token directly
    /// following another error token merges into it.
    pub fn token(&mut self, kind: TokenKind, range: TextRange) {
        if range.is_empty() && kind.is_trivia() {
            return;
        }
        if kind == TokenKind::ERROR {
            if let Some(last) = self.frames.last().and_then(|frame| frame.last) {
                let node = self.arena.get_mut(last);
                if let NodeData::Token {
                    kind: TokenKind::ERROR,
                    range: prev,
                } = &mut node.data
                {
                    if prev.end() == range.start() {
                        *prev = prev.cover(range);
                        return;
                    }
                }
            }
        }
        let id = self.arena.alloc(Node {
            data: NodeData::Token { kind, range },
            link: Link::Root,
        });
        self.append_child(id);
    }

    pub fn start_production(&mut self, name: &'static str, pos: TextSize) {
        let checkpoint = self.arena.checkpoint();
        let node = self.arena.alloc(Node {
            data: NodeData::Production {
                name,
                first_child: None,
                count: 0,
                range: TextRange::empty(pos),
            },
            link: Link::Root,
        });
        self.frames
            .push(Frame::new(FrameKind::Production { name, node }, checkpoint, pos));
    }

    pub fn finish_production(&mut self, name: &'static str, pos: TextSize) {
        let Some(frame) = self.frames.pop() else {
            debug_assert!(false, "production finished without a frame");
            return;
        };
        let FrameKind::Production { name: open, node } = frame.kind else {
            debug_assert!(false, "production finished over a non-production frame");
            return;
        };
        debug_assert_eq!(open, name);
        let _ = name;
        self.arena.get_mut(node).data = NodeData::Production {
            name: open,
            first_child: frame.first,
            count: frame.count,
            range: TextRange::new(frame.begin, pos),
        };
        if let Some(last) = frame.last {
            self.arena.get_mut(last).link = Link::Parent(node);
        }
        self.append_child(node);
    }

    /// Discard the open production. The arena unwinds to the frame's
    /// checkpoint; input consumed inside the region is re-covered by an
    /// error token so the tree stays lossless.
    pub fn cancel_production(&mut self, name: &'static str, pos: TextSize) {
        let Some(frame) = self.frames.pop() else {
            debug_assert!(false, "production cancelled without a frame");
            return;
        };
        debug_assert!(
            matches!(frame.kind, FrameKind::Production { name: open, .. } if open == name)
        );
        let _ = name;
        self.arena.truncate(frame.checkpoint);
        if pos > frame.begin {
            self.token(TokenKind::ERROR, TextRange::new(frame.begin, pos));
        }
    }

    pub fn start_chain(&mut self, pos: TextSize) {
        let checkpoint = self.arena.checkpoint();
        self.frames.push(Frame::new(FrameKind::Chain, checkpoint, pos));
    }

    /// Collapse everything accumulated in the open chain into one
    /// production node, which becomes the chain's sole content.
    pub fn operation(&mut self, name: &'static str, pos: TextSize) {
        let Some(frame) = self.frames.last_mut() else {
            debug_assert!(false, "operation without a frame");
            return;
        };
        debug_assert_eq!(frame.kind, FrameKind::Chain);
        let start = match frame.first {
            Some(first) => self.arena.get(first).range().start(),
            None => pos,
        };
        let node = self.arena.alloc(Node {
            data: NodeData::Production {
                name,
                first_child: frame.first,
                count: frame.count,
                range: TextRange::new(start, pos),
            },
            link: Link::Root,
        });
        if let Some(last) = frame.last {
            self.arena.get_mut(last).link = Link::Parent(node);
        }
        frame.first = Some(node);
        frame.last = Some(node);
        frame.count = 1;
    }

    /// Close the open chain, splicing its content into the enclosing frame.
    pub fn finish_chain(&mut self, _pos: TextSize) {
        let Some(chain) = self.frames.pop() else {
            debug_assert!(false, "chain finished without a frame");
            return;
        };
        debug_assert_eq!(chain.kind, FrameKind::Chain);
        let Some(parent) = self.frames.last_mut() else {
            return;
        };
        let Some(first) = chain.first else {
            return;
        };
        match parent.last {
            Some(last) => self.arena.get_mut(last).link = Link::Sibling(first),
            None => parent.first = Some(first),
        }
        parent.last = chain.last;
        parent.count += chain.count;
    }

    /// Seal the tree under a root production covering `0..end`.
    pub fn finish(mut self, end: TextSize) -> Result<ParseTree, ParseError> {
        let Some(frame) = self.frames.pop() else {
            return Err(ParseError::new(
                TextRange::empty(end),
                ParseErrorKind::InvalidSyntax("tree builder finished twice".into()),
            ));
        };
        if frame.kind != FrameKind::Root || !self.frames.is_empty() {
            return Err(ParseError::new(
                TextRange::empty(end),
                ParseErrorKind::InvalidSyntax("unbalanced parse events".into()),
            ));
        }
        let root = self.arena.alloc(Node {
            data: NodeData::Production {
                name: self.root_name,
                first_child: frame.first,
                count: frame.count,
                range: TextRange::new(TextSize::zero(), end),
            },
            link: Link::Root,
        });
        if let Some(last) = frame.last {
            self.arena.get_mut(last).link = Link::Parent(root);
        }
        Ok(ParseTree {
            arena: self.arena,
            root,
        })
    }
}
