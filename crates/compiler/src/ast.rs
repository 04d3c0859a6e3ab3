//! Abstract Syntax Tree
//!
//! A program is a flat list of statements. Each statement carries its
//! prefix data (label, NOT, PLEASE, percent chance), its kind, and the
//! source text it was parsed from so that malformed statements can be
//! reported verbatim.

use cringe_core::{BinaryOp, Label, UnaryOp, VarName};
use std::fmt;

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `#n`, or any subtree folded down to a value
    Constant(u32),
    /// `.n` / `:n`, optionally with a unary operator after the sigil
    Scalar {
        name: VarName,
        unary: Option<UnaryOp>,
    },
    /// `,n SUB e e ...` / `;n SUB ...`; no subscripts means the whole array
    Element { name: VarName, subscripts: Vec<Expr> },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Spark or rabbit-ear group
    Group {
        unary: Option<UnaryOp>,
        inner: Box<Expr>,
    },
}

impl Expr {
    pub fn as_constant(&self) -> Option<u32> {
        match self {
            Expr::Constant(value) => Some(*value),
            _ => None,
        }
    }
}

/// Assignment target
#[derive(Debug, Clone, PartialEq)]
pub struct LValue {
    pub name: VarName,
    pub subscripts: Vec<Expr>,
}

/// Statement classes, as named by `ABSTAIN FROM CALCULATING` and friends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gerund {
    Calculating,
    Nexting,
    Resuming,
    Forgetting,
    ComingFrom,
    Abstaining,
    Reinstating,
    Stashing,
    Retrieving,
    Ignoring,
    Remembering,
    ReadingOut,
    WritingIn,
    TryingAgain,
}

impl Gerund {
    /// Spellings recognised in source, longest first where one is a
    /// prefix of another
    pub const SPELLINGS: &'static [(&'static str, Gerund)] = &[
        ("CALCULATING", Gerund::Calculating),
        ("NEXTING", Gerund::Nexting),
        ("RESUMING", Gerund::Resuming),
        ("FORGETTING", Gerund::Forgetting),
        ("FORGETING", Gerund::Forgetting),
        ("COMING FROM", Gerund::ComingFrom),
        ("ABSTAINING", Gerund::Abstaining),
        ("REINSTATING", Gerund::Reinstating),
        ("STASHING", Gerund::Stashing),
        ("RETRIEVING", Gerund::Retrieving),
        ("IGNORING", Gerund::Ignoring),
        ("REMEMBERING", Gerund::Remembering),
        ("READING OUT", Gerund::ReadingOut),
        ("WRITING IN", Gerund::WritingIn),
        ("TRYING AGAIN", Gerund::TryingAgain),
    ];

    pub fn name(self) -> &'static str {
        Gerund::SPELLINGS
            .iter()
            .find(|(_, gerund)| *gerund == self)
            .map(|(text, _)| *text)
            .unwrap_or("?")
    }
}

impl fmt::Display for Gerund {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What an ABSTAIN or REINSTATE acts on
#[derive(Debug, Clone, PartialEq)]
pub enum Toggle {
    Label(Label),
    Gerunds(Vec<Gerund>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Calculate { target: LValue, value: Expr },
    Redimension { target: VarName, dims: Vec<Expr> },
    Next(Label),
    Resume(Expr),
    Forget(Expr),
    ComeFrom(Label),
    Abstain { times: Option<Expr>, target: Toggle },
    Reinstate(Toggle),
    Stash(Vec<VarName>),
    Retrieve(Vec<VarName>),
    Ignore(Vec<VarName>),
    Remember(Vec<VarName>),
    ReadOut(Vec<Expr>),
    WriteIn(Vec<LValue>),
    GiveUp,
    TryAgain,
    /// Did not parse; executing it faults
    Malformed,
}

impl StatementKind {
    /// The class this statement belongs to, if it can be abstained by class
    pub fn gerund(&self) -> Option<Gerund> {
        match self {
            StatementKind::Calculate { .. } | StatementKind::Redimension { .. } => {
                Some(Gerund::Calculating)
            }
            StatementKind::Next(_) => Some(Gerund::Nexting),
            StatementKind::Resume(_) => Some(Gerund::Resuming),
            StatementKind::Forget(_) => Some(Gerund::Forgetting),
            StatementKind::ComeFrom(_) => Some(Gerund::ComingFrom),
            StatementKind::Abstain { .. } => Some(Gerund::Abstaining),
            StatementKind::Reinstate(_) => Some(Gerund::Reinstating),
            StatementKind::Stash(_) => Some(Gerund::Stashing),
            StatementKind::Retrieve(_) => Some(Gerund::Retrieving),
            StatementKind::Ignore(_) => Some(Gerund::Ignoring),
            StatementKind::Remember(_) => Some(Gerund::Remembering),
            StatementKind::ReadOut(_) => Some(Gerund::ReadingOut),
            StatementKind::WriteIn(_) => Some(Gerund::WritingIn),
            StatementKind::TryAgain => Some(Gerund::TryingAgain),
            StatementKind::GiveUp | StatementKind::Malformed => None,
        }
    }

    /// The toggle carried by ABSTAIN / REINSTATE
    pub fn toggle(&self) -> Option<&Toggle> {
        match self {
            StatementKind::Abstain { target, .. } => Some(target),
            StatementKind::Reinstate(target) => Some(target),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Position in the program, from 0
    pub index: usize,
    /// Source line, from 1
    pub line: usize,
    pub label: Option<Label>,
    /// False for `DO NOT` / `DON'T`
    pub enabled: bool,
    pub please: bool,
    /// Chance of running, 0 to 100
    pub percent: u32,
    pub kind: StatementKind,
    /// Source text of the statement, trimmed
    pub text: String,
}

impl Statement {
    pub fn is_malformed(&self) -> bool {
        self.kind == StatementKind::Malformed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gerund_names() {
        assert_eq!(Gerund::Forgetting.name(), "FORGETTING");
        assert_eq!(Gerund::ComingFrom.to_string(), "COMING FROM");
    }

    #[test]
    fn test_give_up_has_no_gerund() {
        assert_eq!(StatementKind::GiveUp.gerund(), None);
        assert_eq!(StatementKind::Malformed.gerund(), None);
        assert_eq!(StatementKind::TryAgain.gerund(), Some(Gerund::TryingAgain));
    }

    #[test]
    fn test_redimension_counts_as_calculating() {
        let kind = StatementKind::Redimension {
            target: VarName::parse(",1").unwrap(),
            dims: vec![Expr::Constant(3)],
        };
        assert_eq!(kind.gerund(), Some(Gerund::Calculating));
    }
}
