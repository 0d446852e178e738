//! Token-level rules: literals, keywords, symbol tables, character classes,
//! identifiers and end-of-input.
//!
//! All of these recognize exactly one token via a pure `scan` and share the
//! commit path in the parent module: emit the token event, skip whitespace,
//! continue. The literal family routes through [`Trie`] so single literals,
//! keywords and symbol tables all use the same longest-match automaton.

use super::{
    finish_token, parse_token_rule, try_scan_token, BranchRule, BranchShape, Continuation, Rule,
    Taken, TokenRule,
};
use crate::char_class::CharSet;
use crate::context::Context;
use crate::error::{ParseError, ParseErrorKind};
use crate::input::Reader;
use crate::kind::TokenKind;
use crate::text::TextRange;
use crate::trie::{Trie, TrieBuilder};
use compact_str::CompactString;

macro_rules! impl_token_branch {
    ($ty:ty) => {
        impl Rule for $ty {
            fn parse(
                &self,
                ctx: &mut Context<'_>,
                reader: &mut Reader<'_>,
                cont: &dyn Continuation,
            ) -> bool {
                parse_token_rule(self, ctx, reader, cont)
            }

            fn as_branch(&self) -> Option<&dyn BranchRule> {
                Some(self)
            }

            fn as_token(&self) -> Option<&dyn TokenRule> {
                Some(self)
            }
        }

        impl BranchRule for $ty {
            fn try_parse(&self, _ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> Option<Taken> {
                try_scan_token(self, reader)
            }

            fn finish(
                &self,
                ctx: &mut Context<'_>,
                reader: &mut Reader<'_>,
                taken: Taken,
                cont: &dyn Continuation,
            ) -> bool {
                finish_token(ctx, reader, taken, cont)
            }
        }
    };
}

/// Matches one exact literal string.
#[derive(Debug, Clone)]
pub struct Literal {
    text: CompactString,
    trie: Trie<()>,
    kind: TokenKind,
}

impl Literal {
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self::with_kind(text, TokenKind::LITERAL)
    }

    #[must_use]
    pub fn with_kind(text: &str, kind: TokenKind) -> Self {
        let mut builder = TrieBuilder::new();
        builder.insert(text, ());
        Self {
            text: CompactString::new(text),
            trie: builder.build(),
            kind,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl TokenRule for Literal {
    fn scan(&self, reader: &mut Reader<'_>) -> Option<TokenKind> {
        self.trie.try_match(reader).map(|()| self.kind)
    }

    fn expected(&self) -> ParseErrorKind {
        ParseErrorKind::ExpectedLiteral(self.text.clone())
    }
}

impl_token_branch!(Literal);

/// Matches a literal that must not run into a following identifier
/// character, so `if` matches in `if (x)` but not in `iffy`.
#[derive(Debug, Clone)]
pub struct Keyword {
    text: CompactString,
    trie: Trie<()>,
    kind: TokenKind,
}

impl Keyword {
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self::with_trailing(text, CharSet::identifier_rest())
    }

    /// Keyword with a custom forbidden trailing class.
    #[must_use]
    pub fn with_trailing(text: &str, forbid: CharSet) -> Self {
        let mut builder = TrieBuilder::new();
        builder.insert_keyword(text, (), forbid);
        Self {
            text: CompactString::new(text),
            trie: builder.build(),
            kind: TokenKind::LITERAL,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl TokenRule for Keyword {
    fn scan(&self, reader: &mut Reader<'_>) -> Option<TokenKind> {
        self.trie.try_match(reader).map(|()| self.kind)
    }

    fn expected(&self) -> ParseErrorKind {
        ParseErrorKind::ExpectedKeyword(self.text.clone())
    }
}

impl_token_branch!(Keyword);

/// A symbol table: many literals in one longest-match automaton, each mapped
/// to its own token kind. One scan resolves the whole operator alphabet.
#[derive(Debug, Clone)]
pub struct LiteralSet {
    trie: Trie<TokenKind>,
    description: &'static str,
}

impl LiteralSet {
    #[must_use]
    pub fn new(description: &'static str, entries: &[(&str, TokenKind)]) -> Self {
        let mut builder = TrieBuilder::new();
        for &(text, kind) in entries {
            builder.insert(text, kind);
        }
        Self {
            trie: builder.build(),
            description,
        }
    }

    /// Exact lookup without consuming input.
    #[must_use]
    pub fn lookup(&self, text: &str) -> Option<TokenKind> {
        self.trie.match_exact(text)
    }
}

impl TokenRule for LiteralSet {
    fn scan(&self, reader: &mut Reader<'_>) -> Option<TokenKind> {
        self.trie.try_match(reader)
    }

    fn expected(&self) -> ParseErrorKind {
        ParseErrorKind::ExpectedCharClass(self.description)
    }
}

impl_token_branch!(LiteralSet);

/// Matches a run of characters from a class as one token.
#[derive(Debug, Clone)]
pub struct CharsRule {
    class: CharSet,
    kind: TokenKind,
    at_most_one: bool,
}

impl CharsRule {
    /// One or more characters of `class`.
    #[must_use]
    pub const fn new(class: CharSet, kind: TokenKind) -> Self {
        Self {
            class,
            kind,
            at_most_one: false,
        }
    }

    /// Exactly one character of `class`.
    #[must_use]
    pub const fn single(class: CharSet, kind: TokenKind) -> Self {
        Self {
            class,
            kind,
            at_most_one: true,
        }
    }
}

impl TokenRule for CharsRule {
    fn scan(&self, reader: &mut Reader<'_>) -> Option<TokenKind> {
        let mut matched = false;
        while let Some(c) = reader.peek() {
            if !self.class.matches(c) {
                break;
            }
            reader.bump();
            matched = true;
            if self.at_most_one {
                break;
            }
        }
        matched.then_some(self.kind)
    }

    fn expected(&self) -> ParseErrorKind {
        ParseErrorKind::ExpectedCharClass(self.class.name())
    }
}

impl_token_branch!(CharsRule);

/// Matches an identifier: one leading-class character followed by any number
/// of continuation-class characters, optionally rejecting reserved words.
///
/// A reserved word is still consumed as an identifier token; the error is
/// recoverable and the parse continues, which keeps the tree lossless and
/// produces one precise diagnostic instead of a cascade.
#[derive(Debug, Clone)]
pub struct Identifier {
    lead: CharSet,
    rest: CharSet,
    kind: TokenKind,
    reserved: Option<Trie<()>>,
}

impl Identifier {
    #[must_use]
    pub fn new() -> Self {
        Self::with_classes(CharSet::identifier_lead(), CharSet::identifier_rest())
    }

    #[must_use]
    pub const fn with_classes(lead: CharSet, rest: CharSet) -> Self {
        Self {
            lead,
            rest,
            kind: TokenKind::IDENTIFIER,
            reserved: None,
        }
    }

    /// Reject the given words when they appear where this identifier is
    /// expected.
    #[must_use]
    pub fn reserve(mut self, words: &[&str]) -> Self {
        let mut builder = TrieBuilder::new();
        for &word in words {
            builder.insert(word, ());
        }
        self.reserved = Some(builder.build());
        self
    }

    fn check_reserved(&self, ctx: &mut Context<'_>, reader: &Reader<'_>, range: TextRange) {
        let Some(reserved) = &self.reserved else {
            return;
        };
        let lexeme = reader.slice(range);
        if reserved.match_exact(lexeme).is_some() {
            ctx.report(ParseError::new(
                range,
                ParseErrorKind::ReservedIdentifier(CompactString::new(lexeme)),
            ));
        }
    }
}

impl Default for Identifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenRule for Identifier {
    fn scan(&self, reader: &mut Reader<'_>) -> Option<TokenKind> {
        let c = reader.peek()?;
        if !self.lead.matches(c) {
            return None;
        }
        reader.bump();
        while let Some(c) = reader.peek() {
            if !self.rest.matches(c) {
                break;
            }
            reader.bump();
        }
        Some(self.kind)
    }

    fn expected(&self) -> ParseErrorKind {
        ParseErrorKind::ExpectedCharClass(self.lead.name())
    }
}

impl Rule for Identifier {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        let begin = reader.position();
        match self.scan(reader) {
            Some(kind) => {
                let range = TextRange::new(begin, reader.position());
                self.check_reserved(ctx, reader, range);
                ctx.emit_token(kind, range);
                ctx.skip_whitespace(reader);
                cont.run(ctx, reader)
            }
            None => {
                ctx.report(ParseError::new(TextRange::empty(begin), self.expected()));
                false
            }
        }
    }

    fn as_branch(&self) -> Option<&dyn BranchRule> {
        Some(self)
    }

    fn as_token(&self) -> Option<&dyn TokenRule> {
        Some(self)
    }
}

impl BranchRule for Identifier {
    fn try_parse(&self, _ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> Option<Taken> {
        try_scan_token(self, reader)
    }

    fn finish(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        taken: Taken,
        cont: &dyn Continuation,
    ) -> bool {
        match taken {
            Taken::Token { kind, begin } => {
                let range = TextRange::new(begin, reader.position());
                self.check_reserved(ctx, reader, range);
                ctx.emit_token(kind, range);
                ctx.skip_whitespace(reader);
                cont.run(ctx, reader)
            }
            taken => finish_token(ctx, reader, taken, cont),
        }
    }
}

/// Matches only at end of input, consuming nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct EofRule;

impl EofRule {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Rule for EofRule {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        if reader.is_eof() {
            cont.run(ctx, reader)
        } else {
            ctx.report(ParseError::new(
                TextRange::empty(reader.position()),
                ParseErrorKind::ExpectedEof,
            ));
            false
        }
    }

    fn as_branch(&self) -> Option<&dyn BranchRule> {
        Some(self)
    }
}

impl BranchRule for EofRule {
    fn try_parse(&self, _ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> Option<Taken> {
        reader.is_eof().then(|| Taken::Empty {
            begin: reader.position(),
        })
    }

    fn finish(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        _taken: Taken,
        cont: &dyn Continuation,
    ) -> bool {
        cont.run(ctx, reader)
    }
}

/// The unconditional branch: its condition consumes nothing and always
/// accepts, so it terminates an alternation as the fallback arm.
#[derive(Debug)]
pub struct ElseRule {
    then: Box<dyn Rule>,
}

impl ElseRule {
    #[must_use]
    pub fn new(then: Box<dyn Rule>) -> Self {
        Self { then }
    }
}

impl Rule for ElseRule {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        self.then.parse(ctx, reader, cont)
    }

    fn as_branch(&self) -> Option<&dyn BranchRule> {
        Some(self)
    }
}

impl BranchRule for ElseRule {
    fn shape(&self) -> BranchShape {
        BranchShape::Always
    }

    fn try_parse(&self, _ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> Option<Taken> {
        Some(Taken::Empty {
            begin: reader.position(),
        })
    }

    fn finish(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        _taken: Taken,
        cont: &dyn Continuation,
    ) -> bool {
        self.then.parse(ctx, reader, cont)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ValidateSink;
    use crate::rule::Done;
    use crate::text::TextSize;

    fn parse_with(rule: &dyn Rule, input: &str) -> (bool, Vec<ParseError>, u32) {
        let mut sink = ValidateSink::new();
        let mut ctx = Context::new(&mut sink);
        let mut reader = Reader::new(input);
        let ok = rule.parse(&mut ctx, &mut reader, &Done);
        let end = reader.position().into();
        (ok, sink.into_errors(), end)
    }

    #[test]
    fn test_literal_match() {
        let rule = Literal::new("let");
        let (ok, errors, end) = parse_with(&rule, "let x");
        assert!(ok);
        assert!(errors.is_empty());
        assert_eq!(end, 3);
    }

    #[test]
    fn test_literal_mismatch_reports() {
        let rule = Literal::new("let");
        let (ok, errors, end) = parse_with(&rule, "fn x");
        assert!(!ok);
        assert_eq!(
            errors[0].kind,
            ParseErrorKind::ExpectedLiteral("let".into())
        );
        assert_eq!(end, 0);
    }

    #[test]
    fn test_keyword_rejects_longer_identifier() {
        let rule = Keyword::new("if");
        let (ok, _, _) = parse_with(&rule, "if (x)");
        assert!(ok);
        let (ok, errors, _) = parse_with(&rule, "iffy");
        assert!(!ok);
        assert_eq!(errors[0].kind, ParseErrorKind::ExpectedKeyword("if".into()));
    }

    #[test]
    fn test_literal_set_longest_match() {
        let rule = LiteralSet::new(
            "operator",
            &[("+", TokenKind::OPERATOR), ("+=", TokenKind::of(40))],
        );
        let mut reader = Reader::new("+=");
        assert_eq!(rule.scan(&mut reader), Some(TokenKind::of(40)));
        assert_eq!(rule.lookup("+"), Some(TokenKind::OPERATOR));
        assert_eq!(rule.lookup("-"), None);
    }

    #[test]
    fn test_chars_run() {
        let rule = CharsRule::new(CharSet::ascii_digit(), TokenKind::DIGITS);
        let mut reader = Reader::new("1234x");
        assert_eq!(rule.scan(&mut reader), Some(TokenKind::DIGITS));
        assert_eq!(reader.position(), TextSize::from(4));
    }

    #[test]
    fn test_chars_single() {
        let rule = CharsRule::single(CharSet::ascii_digit(), TokenKind::DIGITS);
        let mut reader = Reader::new("1234");
        assert_eq!(rule.scan(&mut reader), Some(TokenKind::DIGITS));
        assert_eq!(reader.position(), TextSize::from(1));
    }

    #[test]
    fn test_identifier_reserved_recoverable() {
        let rule = Identifier::new().reserve(&["let", "fn"]);
        let (ok, errors, end) = parse_with(&rule, "let");
        // Consumed and reported, parse continues.
        assert!(ok);
        assert_eq!(
            errors[0].kind,
            ParseErrorKind::ReservedIdentifier("let".into())
        );
        assert_eq!(end, 3);

        let (ok, errors, _) = parse_with(&rule, "letter");
        assert!(ok);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_eof_rule() {
        let rule = EofRule::new();
        let (ok, errors, _) = parse_with(&rule, "");
        assert!(ok);
        assert!(errors.is_empty());

        let (ok, errors, _) = parse_with(&rule, "x");
        assert!(!ok);
        assert_eq!(errors[0].kind, ParseErrorKind::ExpectedEof);
    }

    #[test]
    fn test_else_always_accepts() {
        let rule = ElseRule::new(Box::new(Literal::new("x")));
        assert_eq!(rule.shape(), BranchShape::Always);
        let mut sink = ValidateSink::new();
        let mut ctx = Context::new(&mut sink);
        let mut reader = Reader::new("x");
        let taken = rule.try_parse(&mut ctx, &mut reader).unwrap();
        assert!(rule.finish(&mut ctx, &mut reader, taken, &Done));
    }
}
