//! Statement interpreter
//!
//! Runs a built [`Program`] inside the engine. Each unit of work walks
//! the statement list from its entry point. For every statement it
//! checks, in order: the injected bug, the abstain slot, the percent
//! chance; then executes the statement and finally looks for a COME
//! FROM watching it.

use crate::ast::{Expr, LValue, Statement, StatementKind};
use crate::program::Program;
use cringe_core::{Fault, Label, Width};
use cringe_runtime::{Context, Evaluator};
use tracing::trace;

/// What a unit does after a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    /// The unit is finished: it resumed its invoker, gave up, or was
    /// dropped while waiting on a NEXT
    Exit,
    /// TRY AGAIN
    Restart,
}

pub struct Interpreter {
    program: Program,
}

impl Interpreter {
    pub fn new(program: Program) -> Self {
        Interpreter { program }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    fn is_abstained(&self, ctx: &Context, index: usize, statement: &Statement) -> bool {
        match self.program.slot(index) {
            Some(slot) => ctx.is_abstained(slot),
            None => !statement.enabled,
        }
    }

    /// The COME FROM to jump to after statement `index`, if it fires
    fn redirect(&self, ctx: &Context, index: usize) -> Option<usize> {
        let from = self.program.trapdoor(index)?;
        let watcher = self.program.statement(from)?;
        if self.is_abstained(ctx, from, watcher) || !ctx.chance(watcher.percent) {
            return None;
        }
        trace!(unit = ctx.unit(), from = index, to = from, "come from");
        Some(from)
    }

    fn execute(&self, ctx: &Context, statement: &Statement) -> Result<Flow, Fault> {
        match &statement.kind {
            StatementKind::Calculate { target, value } => {
                let value = eval(ctx, value)?;
                assign(ctx, target, value)?;
            }
            StatementKind::Redimension { target, dims } => {
                let dims = eval_all(ctx, dims)?;
                ctx.redimension(*target, &dims)?;
            }
            StatementKind::Next(label) => {
                if ctx.invoke(*label)? {
                    return Ok(Flow::Exit);
                }
            }
            StatementKind::Resume(depth) => {
                let depth = eval(ctx, depth)?;
                if depth > 0 {
                    ctx.resume(depth)?;
                    return Ok(Flow::Exit);
                }
            }
            StatementKind::Forget(depth) => ctx.forget(eval(ctx, depth)?),
            StatementKind::ComeFrom(_) => {}
            StatementKind::Abstain { times, target } => {
                let times = times.as_ref().map(|e| eval(ctx, e)).transpose()?;
                let slots = self.program.toggle_slots(target)?;
                ctx.abstain(&slots, times);
            }
            StatementKind::Reinstate(target) => {
                let slots = self.program.toggle_slots(target)?;
                ctx.reinstate(&slots);
            }
            StatementKind::Stash(names) => ctx.stash(names),
            StatementKind::Retrieve(names) => ctx.retrieve(names)?,
            StatementKind::Ignore(names) => ctx.ignore(names),
            StatementKind::Remember(names) => ctx.remember(names),
            StatementKind::ReadOut(exprs) => {
                for expr in exprs {
                    read_out(ctx, expr)?;
                }
            }
            StatementKind::WriteIn(targets) => {
                for target in targets {
                    write_in(ctx, target)?;
                }
            }
            StatementKind::GiveUp => {
                ctx.give_up();
                return Ok(Flow::Exit);
            }
            StatementKind::TryAgain => return Ok(Flow::Restart),
            StatementKind::Malformed => {
                return Err(Fault::Malformed {
                    line: statement.line,
                    text: statement.text.clone(),
                });
            }
        }
        Ok(Flow::Continue)
    }
}

impl Evaluator for Interpreter {
    fn has_label(&self, label: Label) -> bool {
        self.program.index_of(label).is_some()
    }

    fn evaluate(&self, ctx: &Context, entry: Option<Label>) -> Result<(), Fault> {
        let mut index = match entry {
            None => 0,
            Some(label) => self.program.index_of(label).ok_or(Fault::Lost(label))?,
        };

        loop {
            if ctx.is_finished() {
                return Ok(());
            }
            let statement = self.program.statement(index).ok_or(Fault::FellOffEdge)?;
            if self.program.has_bug(index) {
                return Err(Fault::RandomBug);
            }

            let runs = !self.is_abstained(ctx, index, statement) && ctx.chance(statement.percent);
            trace!(unit = ctx.unit(), index, line = statement.line, runs, "statement");
            let flow = if runs {
                self.execute(ctx, statement)?
            } else {
                Flow::Continue
            };

            match flow {
                Flow::Exit => return Ok(()),
                Flow::Restart => index = 0,
                Flow::Continue => {
                    index = self.redirect(ctx, index).unwrap_or(index + 1);
                }
            }
        }
    }
}

fn eval_all(ctx: &Context, exprs: &[Expr]) -> Result<Vec<u32>, Fault> {
    exprs.iter().map(|e| eval(ctx, e)).collect()
}

/// Evaluate an expression against the engine's variables.
pub fn eval(ctx: &Context, expr: &Expr) -> Result<u32, Fault> {
    match expr {
        Expr::Constant(value) => Ok(*value),
        Expr::Scalar { name, unary } => {
            let value = ctx.get_scalar(*name)?;
            Ok(match unary {
                Some(op) => op.apply(value, name.class.width()),
                None => value,
            })
        }
        Expr::Element { name, subscripts } => {
            let indices = eval_all(ctx, subscripts)?;
            ctx.get_element(*name, &indices)
        }
        Expr::Binary { op, lhs, rhs } => {
            let a = eval(ctx, lhs)?;
            let b = eval(ctx, rhs)?;
            Ok(op.apply(a, b))
        }
        Expr::Group { unary, inner } => {
            let value = eval(ctx, inner)?;
            Ok(match unary {
                Some(op) => op.apply(value, Width::of_value(value)),
                None => value,
            })
        }
    }
}

fn assign(ctx: &Context, target: &LValue, value: u32) -> Result<(), Fault> {
    if target.subscripts.is_empty() {
        ctx.set_scalar(target.name, value)
    } else {
        let indices = eval_all(ctx, &target.subscripts)?;
        ctx.set_element(target.name, &indices, value)
    }
}

/// Whole arrays go out as characters; everything else as a number.
fn read_out(ctx: &Context, expr: &Expr) -> Result<(), Fault> {
    match expr {
        Expr::Element { name, subscripts } if subscripts.is_empty() => ctx.read_out(*name),
        Expr::Scalar { name, unary: None } => ctx.read_out(*name),
        other => ctx.read_out_value(eval(ctx, other)?),
    }
}

fn write_in(ctx: &Context, target: &LValue) -> Result<(), Fault> {
    if target.subscripts.is_empty() {
        ctx.write_in(target.name)
    } else {
        let indices = eval_all(ctx, &target.subscripts)?;
        ctx.write_in_element(target.name, &indices)
    }
}
