//! The tree-building event handler.

use super::builder::TreeBuilder;
use super::ParseTree;
use crate::error::ParseError;
use crate::handler::Handler;
use crate::kind::TokenKind;
use crate::text::{TextRange, TextSize};

/// Feeds parse events into a [`TreeBuilder`] while collecting reported
/// errors on the side.
#[derive(Debug)]
pub struct TreeSink {
    builder: TreeBuilder,
    errors: Vec<ParseError>,
    recovered: usize,
}

impl TreeSink {
    #[must_use]
    pub fn new(root_name: &'static str) -> Self {
        Self {
            builder: TreeBuilder::new(root_name),
            errors: Vec::new(),
            recovered: 0,
        }
    }

    /// Seal the tree and surrender the collected errors and the number of
    /// successfully resynchronized regions.
    pub fn finish(
        self,
        end: TextSize,
    ) -> (Result<ParseTree, ParseError>, Vec<ParseError>, usize) {
        (self.builder.finish(end), self.errors, self.recovered)
    }
}

impl Handler for TreeSink {
    fn production_start(&mut self, name: &'static str, pos: TextSize) {
        self.builder.start_production(name, pos);
    }

    fn production_finish(&mut self, name: &'static str, pos: TextSize) {
        self.builder.finish_production(name, pos);
    }

    fn production_cancel(&mut self, name: &'static str, pos: TextSize) {
        self.builder.cancel_production(name, pos);
    }

    fn token(&mut self, kind: TokenKind, range: TextRange) {
        self.builder.token(kind, range);
    }

    fn error(&mut self, error: &ParseError) {
        self.errors.push(error.clone());
    }

    fn recovery_finish(&mut self, _pos: TextSize) {
        self.recovered += 1;
    }

    fn chain_start(&mut self, pos: TextSize) {
        self.builder.start_chain(pos);
    }

    fn operation(&mut self, name: &'static str, pos: TextSize) {
        self.builder.operation(name, pos);
    }

    fn chain_finish(&mut self, pos: TextSize) {
        self.builder.finish_chain(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::char_class::CharSet;
    use crate::context::Context;
    use crate::input::Reader;
    use crate::rule::{CharsRule, Done, Literal, Production, Rule, Sequence};

    #[test]
    fn test_sink_builds_tree_from_parse() {
        let rule = Production::new(
            "pair",
            Box::new(Sequence::new(vec![
                Box::new(Literal::new("(")),
                Box::new(CharsRule::new(CharSet::ascii_digit(), TokenKind::DIGITS)),
                Box::new(Literal::new(")")),
            ])),
        );
        let ws = CharsRule::new(CharSet::ascii_whitespace(), TokenKind::WHITESPACE);

        let mut sink = TreeSink::new("file");
        {
            let mut ctx = Context::new(&mut sink);
            ctx.set_whitespace(&ws);
            let mut reader = Reader::new("( 42 )");
            assert!(rule.parse(&mut ctx, &mut reader, &Done));
        }
        let (tree, errors, recovered) = sink.finish(TextSize::from(6));
        let tree = tree.unwrap();
        assert!(errors.is_empty());
        assert_eq!(recovered, 0);
        assert_eq!(
            tree.render("( 42 )"),
            "file@0..6\n  pair@0..6\n    literal \"(\"@0..1\n    whitespace \" \"@1..2\n    \
             digits \"42\"@2..4\n    whitespace \" \"@4..5\n    literal \")\"@5..6\n"
        );
    }
}
