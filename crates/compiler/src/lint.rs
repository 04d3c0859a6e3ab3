//! Static checks for `cringe check`
//!
//! Reports what the program builder would reject, plus the problems
//! that only show up once execution reaches them:
//!
//! - politeness outside the configured range (error)
//! - malformed statements (warning, or hint when the statement starts
//!   disabled and is therefore most likely a comment)
//! - constant zero dimensions (W239)
//! - NEXT targets that are neither local nor in the system library (E129)
//! - ABSTAIN / REINSTATE naming a label that does not exist (E139)
//!
//! Structural faults found while parsing or building are reported as a
//! single error.

use crate::ast::{Expr, Statement, StatementKind, Toggle};
use crate::config::RunConfig;
use crate::fold::fold_program;
use crate::parser::parse;
use crate::program::{Program, check_politeness};
use cringe_core::{Fault, Label};
use cringe_runtime::syslib;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Severity level for lint diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Hint,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Hint => "hint",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintDiagnostic {
    /// Fault or warning code, such as `E129` or `W239`
    pub id: String,
    pub message: String,
    pub severity: Severity,
    pub file: PathBuf,
    /// Line number (0-indexed)
    pub line: usize,
}

impl LintDiagnostic {
    fn new(id: &str, severity: Severity, file: &Path, line: usize, message: String) -> Self {
        LintDiagnostic {
            id: id.to_string(),
            message,
            severity,
            file: file.to_path_buf(),
            line: line.saturating_sub(1),
        }
    }

    fn from_fault(fault: &Fault, file: &Path, line: usize) -> Self {
        let message = fault.to_string();
        let message = message
            .split_once(' ')
            .map(|(_, rest)| rest.to_string())
            .unwrap_or(message);
        LintDiagnostic::new(
            &format!("E{:03}", fault.code()),
            Severity::Error,
            file,
            line,
            message,
        )
    }
}

/// Parse, build and lint one source text.
pub fn check_source(source: &str, file: &Path, config: &RunConfig) -> Vec<LintDiagnostic> {
    let statements = match parse(source) {
        Ok(statements) => fold_program(statements),
        Err(fault) => return vec![LintDiagnostic::from_fault(&fault, file, fault_line(&fault))],
    };

    let mut diagnostics = lint_statements(&statements, file, config);
    let build_config = config.clone().with_random_bugs(false).with_politeness(false);
    if let Err(fault) = Program::build(statements.clone(), &build_config) {
        let line = build_fault_line(&fault, &statements);
        diagnostics.push(LintDiagnostic::from_fault(&fault, file, line));
    }
    diagnostics
}

fn fault_line(fault: &Fault) -> usize {
    match fault {
        Fault::Unparseable { line } => *line,
        _ => 1,
    }
}

/// Line of the statement a build fault is about: the second use of a
/// duplicate label, the offending COME FROM, or the misplaced TRY AGAIN.
fn build_fault_line(fault: &Fault, statements: &[Statement]) -> usize {
    let come_from = |label: Label| {
        statements
            .iter()
            .filter(move |s| s.kind == StatementKind::ComeFrom(label))
    };
    let last = statements.len().saturating_sub(1);
    let culprit = match fault {
        Fault::DuplicateLabel(label) => statements
            .iter()
            .filter(|s| s.label == Some(*label))
            .nth(1),
        Fault::ComeFromNowhere(label) => come_from(*label).next(),
        Fault::OverConnected(label) => come_from(*label).nth(1),
        Fault::TryAgainMisplaced => statements
            .iter()
            .find(|s| s.kind == StatementKind::TryAgain && s.index != last),
        _ => None,
    };
    culprit.map_or(1, |s| s.line)
}

/// A fault that only fires if execution gets there
fn unresolved(fault: Fault, file: &Path, line: usize) -> LintDiagnostic {
    LintDiagnostic {
        severity: Severity::Warning,
        ..LintDiagnostic::from_fault(&fault, file, line)
    }
}

/// Lint a parsed program.
pub fn lint_statements(
    statements: &[Statement],
    file: &Path,
    config: &RunConfig,
) -> Vec<LintDiagnostic> {
    let mut diagnostics = Vec::new();

    if config.politeness {
        if let Err(fault) = check_politeness(
            statements,
            config.min_politeness_percent,
            config.max_politeness_percent,
        ) {
            diagnostics.push(LintDiagnostic::from_fault(&fault, file, 1));
        }
    }

    let labels: HashSet<Label> = statements.iter().filter_map(|s| s.label).collect();
    let library = config.syslib.then(syslib::component);

    for statement in statements {
        let line = statement.line;
        match &statement.kind {
            StatementKind::Malformed => {
                let severity = if statement.enabled {
                    Severity::Warning
                } else {
                    Severity::Hint
                };
                diagnostics.push(LintDiagnostic::new(
                    "E000",
                    severity,
                    file,
                    line,
                    format!("{} * {}", line, statement.text),
                ));
            }
            StatementKind::Redimension { dims, .. } => {
                if dims.iter().any(|d| *d == Expr::Constant(0)) {
                    diagnostics.push(LintDiagnostic::new(
                        "W239",
                        Severity::Warning,
                        file,
                        line,
                        "WARNING HANDLER PRINTED SNIDE REMARK".to_string(),
                    ));
                }
            }
            StatementKind::Next(label) => {
                let linked = library.as_ref().is_some_and(|lib| lib.exports(*label));
                if !labels.contains(label) && !linked {
                    diagnostics.push(unresolved(Fault::Lost(*label), file, line));
                }
            }
            kind => {
                if let Some(Toggle::Label(label)) = kind.toggle() {
                    if !labels.contains(label) {
                        let fault = Fault::NotPlanningToGoThere(*label);
                        diagnostics.push(unresolved(fault, file, line));
                    }
                }
            }
        }
    }
    diagnostics
}

/// Format diagnostics for CLI output
pub fn format_diagnostics(diagnostics: &[LintDiagnostic]) -> String {
    let mut output = String::new();
    for d in diagnostics {
        output.push_str(&format!(
            "{}:{}: {}[{}]: {}\n",
            d.file.display(),
            d.line + 1,
            d.severity.as_str(),
            d.id,
            d.message
        ));
    }
    output
}
