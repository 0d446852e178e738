//! Operator-precedence expression parsing.
//!
//! An [`ExpressionRule`] parses a full expression with a precedence-climbing
//! loop instead of one grammar production per precedence level. Levels are
//! declared loosest-first on the [`ExpressionBuilder`]; each level has one
//! fixity and any number of operators. Binding powers are derived from the
//! level index, with the right side nudged for associativity. Building the
//! rule compiles every operator literal into one longest-match trie, so each
//! step of the climb decides the next operator with a single scan.
//!
//! The rule reports structure through the chain events: every climb opens a
//! `chain_start`/`chain_finish` pair, and each completed operator
//! application emits `operation`, which a tree sink turns into a production
//! node over the operands accumulated since the chain opened. Operands,
//! operator tokens and nested chains all land in the open chain, so the
//! handler never needs to reorder anything.
//!
//! Two structural violations are recoverable and reported exactly once per
//! operator run: mixing operators from different groups at the same level,
//! and repeating an operator whose level forbids chaining. Both continue
//! parsing with the offending operator accepted, so `a < b == c` yields one
//! diagnostic and a usable tree.

use crate::context::Context;
use crate::error::{ParseError, ParseErrorKind};
use crate::handler::Handler as _;
use crate::input::Reader;
use crate::kind::TokenKind;
use crate::rule::{Continuation, Done, Rule};
use crate::text::TextRange;
use crate::trie::{Trie, TrieBuilder};
use compact_str::CompactString;
use hashbrown::HashMap;

/// How operators at one precedence level associate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixity {
    /// Binary, groups to the left: `a - b - c` is `(a - b) - c`.
    InfixLeft,
    /// Binary, groups to the right: `a = b = c` is `a = (b = c)`.
    InfixRight,
    /// Binary, flattened: `a, b, c` is one application over all operands.
    InfixList,
    /// Binary, non-chainable: `a == b == c` is an error.
    InfixSingle,
    /// Unary, before the operand.
    Prefix,
    /// Unary, after the operand.
    Postfix,
}

impl Fixity {
    const fn is_prefix(self) -> bool {
        matches!(self, Self::Prefix)
    }
}

/// One operator: the literal that recognizes it, the token kind it commits
/// as, and the name of the resulting production.
#[derive(Debug)]
pub struct Operator {
    name: &'static str,
    literal: CompactString,
    kind: TokenKind,
    group: u8,
}

impl Operator {
    #[must_use]
    pub fn new(name: &'static str, literal: &str) -> Self {
        Self {
            name,
            literal: literal.into(),
            kind: TokenKind::OPERATOR,
            group: 0,
        }
    }

    /// Commit the operator token under a kind other than
    /// [`TokenKind::OPERATOR`].
    #[must_use]
    pub fn with_kind(mut self, kind: TokenKind) -> Self {
        self.kind = kind;
        self
    }

    /// Assign the operator to a group. Operators of different groups at the
    /// same level must not be mixed in one run without parentheses.
    #[must_use]
    pub const fn in_group(mut self, group: u8) -> Self {
        self.group = group;
        self
    }
}

#[derive(Debug)]
struct Level {
    fixity: Fixity,
    operators: Vec<Operator>,
}

/// Builder for an [`ExpressionRule`]. Declare levels loosest-first.
#[derive(Debug)]
pub struct ExpressionBuilder {
    atom: Box<dyn Rule>,
    levels: Vec<Level>,
}

impl ExpressionBuilder {
    #[must_use]
    pub fn new(atom: Box<dyn Rule>) -> Self {
        Self {
            atom,
            levels: Vec::new(),
        }
    }

    #[must_use]
    pub fn level(mut self, fixity: Fixity, operators: Vec<Operator>) -> Self {
        self.levels.push(Level { fixity, operators });
        self
    }

    /// Compile the declared levels into one longest-match trie over the
    /// whole operator literal set. A literal declared at several levels
    /// keeps one slot per position (prefix vs. operand-follows); within a
    /// position the first declaration wins, so earlier (looser) levels take
    /// priority over later duplicates.
    #[must_use]
    pub fn build(self) -> ExpressionRule {
        let mut slots: HashMap<CompactString, u16> = HashMap::new();
        let mut roles: Vec<OperatorRoles> = Vec::new();
        let mut table = TrieBuilder::new();
        for (li, level) in self.levels.iter().enumerate() {
            for (oi, operator) in level.operators.iter().enumerate() {
                let slot = *slots.entry(operator.literal.clone()).or_insert_with(|| {
                    let slot = u16::try_from(roles.len()).unwrap_or(u16::MAX);
                    roles.push(OperatorRoles::default());
                    table.insert(&operator.literal, slot);
                    slot
                });
                let entry = &mut roles[slot as usize];
                let role = if level.fixity.is_prefix() {
                    &mut entry.prefix
                } else {
                    &mut entry.infix
                };
                if role.is_none() {
                    *role = Some((
                        u16::try_from(li).unwrap_or(u16::MAX),
                        u16::try_from(oi).unwrap_or(u16::MAX),
                    ));
                }
            }
        }
        ExpressionRule {
            atom: self.atom,
            levels: self.levels,
            table: table.build(),
            roles,
        }
    }
}

/// Where a literal may appear, mapped to its `(level, operator)` indices.
#[derive(Debug, Clone, Copy, Default)]
struct OperatorRoles {
    prefix: Option<(u16, u16)>,
    infix: Option<(u16, u16)>,
}

/// State of the current same-level operator run inside one chain.
struct Run {
    level: usize,
    group: u8,
    pending_list: Option<&'static str>,
    reported_single: bool,
}

/// The expression rule produced by [`ExpressionBuilder`].
#[derive(Debug)]
pub struct ExpressionRule {
    atom: Box<dyn Rule>,
    levels: Vec<Level>,
    /// One automaton over every operator literal; values index `roles`.
    table: Trie<u16>,
    roles: Vec<OperatorRoles>,
}

impl ExpressionRule {
    /// Left and right binding powers for a level. Deeper levels bind
    /// tighter; the right side of a left-associative level is nudged up so
    /// the recursion stops before an operator of the same level.
    fn powers(&self, level: usize) -> (u16, u16) {
        let p = (u16::try_from(level).unwrap_or(u16::MAX / 2) + 1) * 2;
        match self.levels[level].fixity {
            Fixity::InfixLeft | Fixity::InfixList | Fixity::InfixSingle => (p, p + 1),
            Fixity::InfixRight => (p, p),
            Fixity::Prefix => (0, p),
            Fixity::Postfix => (p, 0),
        }
    }

    /// One longest-match scan of the operator trie on a reader copy. The
    /// matched literal resolves to its slot for the wanted position; a
    /// literal only declared for the other position is no operator here.
    fn probe(&self, reader: &Reader<'_>, want_prefix: bool) -> Option<(usize, usize)> {
        let mut scan = *reader;
        let slot = self.table.try_match(&mut scan)?;
        let roles = self.roles[slot as usize];
        let (li, oi) = if want_prefix { roles.prefix } else { roles.infix }?;
        Some((li as usize, oi as usize))
    }

    fn commit_operator(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        level: usize,
        op: usize,
    ) -> bool {
        let begin = reader.position();
        if self.table.try_match(reader).is_none() {
            debug_assert!(false, "probed operator no longer matches");
            return false;
        }
        let operator = &self.levels[level].operators[op];
        ctx.emit_token(operator.kind, TextRange::new(begin, reader.position()));
        ctx.skip_whitespace(reader);
        true
    }

    /// One precedence climb: everything binding at least as tight as
    /// `min_bp`. Opens its own chain; the tree sink splices the chain's
    /// content into the enclosing one when it closes.
    fn parse_min(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>, min_bp: u16) -> bool {
        if !ctx.enter_guarded(reader.position(), ParseErrorKind::NestingLimitExceeded) {
            return false;
        }
        ctx.handler().chain_start(reader.position());
        let ok = self.parse_chain(ctx, reader, min_bp);
        ctx.handler().chain_finish(reader.position());
        ctx.exit_guarded();
        ok
    }

    fn parse_chain(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>, min_bp: u16) -> bool {
        // Head: a prefix operator application or a plain atom.
        if let Some((li, oi)) = self.probe(reader, true) {
            let name = self.levels[li].operators[oi].name;
            let (_, rp) = self.powers(li);
            if !self.commit_operator(ctx, reader, li, oi) {
                return false;
            }
            if !self.parse_min(ctx, reader, rp) {
                return false;
            }
            ctx.handler().operation(name, reader.position());
        } else if !self.atom.parse(ctx, reader, &Done) {
            return false;
        }

        let mut run: Option<Run> = None;
        loop {
            let Some((li, oi)) = self.probe(reader, false) else {
                break;
            };
            let (lp, rp) = self.powers(li);
            if lp < min_bp {
                break;
            }
            let fixity = self.levels[li].fixity;
            let op_at = reader.position();
            let name = self.levels[li].operators[oi].name;
            let group = self.levels[li].operators[oi].group;

            match &mut run {
                Some(state) if state.level == li => {
                    if state.group != group {
                        ctx.report(ParseError::new(
                            TextRange::empty(op_at),
                            ParseErrorKind::OperatorGroupMismatch,
                        ));
                        state.group = group;
                    }
                    if fixity == Fixity::InfixSingle && !state.reported_single {
                        ctx.report(ParseError::new(
                            TextRange::empty(op_at),
                            ParseErrorKind::SingleOperatorRepeated,
                        ));
                        state.reported_single = true;
                    }
                    if fixity == Fixity::InfixList && state.pending_list != Some(name) {
                        self.flush(ctx, reader, state);
                        state.pending_list = Some(name);
                    }
                }
                other => {
                    if let Some(state) = other {
                        self.flush(ctx, reader, state);
                    }
                    *other = Some(Run {
                        level: li,
                        group,
                        pending_list: (fixity == Fixity::InfixList).then_some(name),
                        reported_single: false,
                    });
                }
            }

            if !self.commit_operator(ctx, reader, li, oi) {
                return false;
            }
            match fixity {
                Fixity::Postfix => ctx.handler().operation(name, reader.position()),
                Fixity::InfixList => {
                    if !self.parse_min(ctx, reader, rp) {
                        return false;
                    }
                }
                _ => {
                    if !self.parse_min(ctx, reader, rp) {
                        return false;
                    }
                    ctx.handler().operation(name, reader.position());
                }
            }
        }
        if let Some(state) = &mut run {
            self.flush(ctx, reader, state);
        }
        true
    }

    fn flush(&self, ctx: &mut Context<'_>, reader: &Reader<'_>, state: &mut Run) {
        if let Some(name) = state.pending_list.take() {
            ctx.handler().operation(name, reader.position());
        }
    }
}

impl Rule for ExpressionRule {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        if !self.parse_min(ctx, reader, 0) {
            return false;
        }
        cont.run(ctx, reader)
    }
}
