//! Constant folding
//!
//! Collapses binary nodes over two constants and groups around a
//! constant. A folded group's unary operator works at 16 bits when the
//! value fits, 32 otherwise, the same rule the interpreter applies.

use crate::ast::{Expr, LValue, Statement, StatementKind};
use cringe_core::Width;

pub fn fold_expr(expr: Expr) -> Expr {
    match expr {
        Expr::Binary { op, lhs, rhs } => {
            let lhs = fold_expr(*lhs);
            let rhs = fold_expr(*rhs);
            match (lhs.as_constant(), rhs.as_constant()) {
                (Some(a), Some(b)) => Expr::Constant(op.apply(a, b)),
                _ => Expr::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            }
        }
        Expr::Group { unary, inner } => {
            let inner = fold_expr(*inner);
            match (inner.as_constant(), unary) {
                (Some(value), Some(op)) => Expr::Constant(op.apply(value, Width::of_value(value))),
                (Some(value), None) => Expr::Constant(value),
                _ => Expr::Group {
                    unary,
                    inner: Box::new(inner),
                },
            }
        }
        Expr::Element { name, subscripts } => Expr::Element {
            name,
            subscripts: fold_all(subscripts),
        },
        other => other,
    }
}

fn fold_all(exprs: Vec<Expr>) -> Vec<Expr> {
    exprs.into_iter().map(fold_expr).collect()
}

fn fold_lvalue(lvalue: LValue) -> LValue {
    LValue {
        name: lvalue.name,
        subscripts: fold_all(lvalue.subscripts),
    }
}

pub fn fold_statement(statement: Statement) -> Statement {
    let kind = match statement.kind {
        StatementKind::Calculate { target, value } => StatementKind::Calculate {
            target: fold_lvalue(target),
            value: fold_expr(value),
        },
        StatementKind::Redimension { target, dims } => StatementKind::Redimension {
            target,
            dims: fold_all(dims),
        },
        StatementKind::Resume(e) => StatementKind::Resume(fold_expr(e)),
        StatementKind::Forget(e) => StatementKind::Forget(fold_expr(e)),
        StatementKind::Abstain { times, target } => StatementKind::Abstain {
            times: times.map(fold_expr),
            target,
        },
        StatementKind::ReadOut(exprs) => StatementKind::ReadOut(fold_all(exprs)),
        StatementKind::WriteIn(targets) => {
            StatementKind::WriteIn(targets.into_iter().map(fold_lvalue).collect())
        }
        other => other,
    };
    Statement { kind, ..statement }
}

pub fn fold_program(statements: Vec<Statement>) -> Vec<Statement> {
    statements.into_iter().map(fold_statement).collect()
}
