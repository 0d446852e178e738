//! Literal-recognition tries.
//!
//! A [`Trie`] is a flattened finite automaton over a fixed set of literal
//! strings, built once at grammar-construction time and immutable
//! thereafter. Matching is longest-match and backtrack-free: the automaton
//! walks forward, remembering every accepting node it passes, and commits to
//! the deepest accept whose trailing restriction (if any) does not match the
//! following character. The same automaton serves single literals, literal
//! sets, keywords (literal plus forbidden identifier-continuation class) and
//! symbol tables (literal mapped to an arbitrary value).

use crate::char_class::CharSet;
use crate::input::Reader;
use crate::text::TextSize;
use smallvec::SmallVec;

/// Index of a trie node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeId(u32);

#[derive(Debug, Clone)]
struct TrieNode<V> {
    /// Outgoing transitions, sorted by edge character after [`TrieBuilder::build`].
    transitions: SmallVec<[(char, NodeId); 4]>,
    /// Value accepted at this node, if any.
    value: Option<V>,
    /// Characters that must not immediately follow an accept at this node
    /// (keyword/identifier disambiguation).
    forbid_trailing: Option<CharSet>,
}

impl<V> TrieNode<V> {
    fn new() -> Self {
        Self {
            transitions: SmallVec::new(),
            value: None,
            forbid_trailing: None,
        }
    }

    fn find_transition(&self, c: char) -> Option<NodeId> {
        self.transitions
            .binary_search_by_key(&c, |&(edge, _)| edge)
            .ok()
            .map(|idx| self.transitions[idx].1)
    }
}

/// Immutable longest-match automaton over a set of literals.
#[derive(Debug, Clone)]
pub struct Trie<V> {
    nodes: Vec<TrieNode<V>>,
}

/// Incremental constructor for a [`Trie`].
#[derive(Debug)]
pub struct TrieBuilder<V> {
    nodes: Vec<TrieNode<V>>,
}

impl<V> Default for TrieBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> TrieBuilder<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::new()],
        }
    }

    /// Insert a literal. The empty literal is accepted: it marks the root as
    /// accepting and therefore always matches, which models unconditional
    /// tokens.
    ///
    /// Inserting the same literal twice keeps the first value.
    pub fn insert(&mut self, literal: &str, value: V) -> &mut Self {
        let node = self.walk_to(literal);
        let slot = &mut self.nodes[node.0 as usize].value;
        if slot.is_none() {
            *slot = Some(value);
        }
        self
    }

    /// Insert a literal that must not be immediately followed by a character
    /// from `forbid` — the keyword form of [`TrieBuilder::insert`].
    pub fn insert_keyword(&mut self, literal: &str, value: V, forbid: CharSet) -> &mut Self {
        let node = self.walk_to(literal);
        let entry = &mut self.nodes[node.0 as usize];
        if entry.value.is_none() {
            entry.value = Some(value);
        }
        entry.forbid_trailing = Some(forbid);
        self
    }

    fn walk_to(&mut self, literal: &str) -> NodeId {
        let mut node = NodeId(0);
        for c in literal.chars() {
            node = match self.nodes[node.0 as usize].find_linear(c) {
                Some(next) => next,
                None => {
                    let next = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
                    self.nodes.push(TrieNode::new());
                    self.nodes[node.0 as usize].transitions.push((c, next));
                    next
                }
            };
        }
        node
    }

    /// Finalize: sort every node's transitions for binary-search lookup.
    #[must_use]
    pub fn build(mut self) -> Trie<V> {
        for node in &mut self.nodes {
            node.transitions.sort_by_key(|&(c, _)| c);
        }
        Trie { nodes: self.nodes }
    }
}

impl<V> TrieNode<V> {
    // Unsorted lookup used during construction only.
    fn find_linear(&self, c: char) -> Option<NodeId> {
        self.transitions
            .iter()
            .find(|&&(edge, _)| edge == c)
            .map(|&(_, target)| target)
    }
}

impl<V: Copy> Trie<V> {
    /// Match the longest literal that is a prefix of the remaining input.
    ///
    /// On success the reader is advanced to the end of the match and the
    /// associated value is returned; on failure the reader is untouched.
    /// An accept whose forbidden trailing class matches the *next* character
    /// is rejected, falling back to the next-longest accept.
    pub fn try_match(&self, reader: &mut Reader<'_>) -> Option<V> {
        // (value, end position of the accept)
        let mut accepts: SmallVec<[(V, TextSize); 4]> = SmallVec::new();
        let mut probe = *reader;
        let mut node = &self.nodes[0];

        loop {
            if let Some(value) = node.value {
                let forbidden = match (&node.forbid_trailing, probe.peek()) {
                    (Some(class), Some(next)) => class.matches(next),
                    _ => false,
                };
                if !forbidden {
                    accepts.push((value, probe.position()));
                }
            }
            let Some(c) = probe.peek() else { break };
            let Some(next) = node.find_transition(c) else { break };
            probe.bump();
            node = &self.nodes[next.0 as usize];
        }

        let (value, end) = accepts.pop()?;
        reader.set_position(end);
        Some(value)
    }

    /// Look up an exact literal without a reader, e.g. for reserved-word
    /// checks on an already-recognized lexeme.
    #[must_use]
    pub fn match_exact(&self, literal: &str) -> Option<V> {
        let mut node = &self.nodes[0];
        for c in literal.chars() {
            node = &self.nodes[node.find_transition(c)?.0 as usize];
        }
        node.value
    }

    /// Number of nodes in the automaton.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
