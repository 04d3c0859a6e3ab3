//! Cringe Compiler Library
//!
//! Turns source text into a [`Program`] and runs it on the cringe
//! runtime engine.
//!
//! ```rust,ignore
//! use cringe::{RunConfig, Sources, compile, engine_builder};
//!
//! let config = RunConfig::new().with_random_bugs(false);
//! let program = compile(&sources.text(), &config)?;
//! engine_builder(program, &config).build().run(None)?;
//! ```
//!
//! # Modules
//!
//! - `lexer` / `parser` / `ast`: source text to statements
//! - `fold`: constant folding
//! - `program`: labels, trapdoors, abstain slots, structural checks
//! - `interpreter`: executes statements inside the engine
//! - `lint`: diagnostics for `cringe check`
//! - `config`: run configuration
//! - `source`: reading and joining `.i` files

pub mod ast;
pub mod config;
pub mod fold;
pub mod interpreter;
pub mod lexer;
pub mod lint;
pub mod parser;
pub mod program;
pub mod source;

pub use ast::{Expr, Gerund, LValue, Statement, StatementKind, Toggle};
pub use config::RunConfig;
pub use interpreter::Interpreter;
pub use lint::{LintDiagnostic, Severity};
pub use parser::Parser;
pub use program::Program;
pub use source::{LoadError, Sources};

use cringe_core::Fault;
use cringe_runtime::{Engine, EngineBuilder, Failure, syslib};
use std::sync::Arc;
use tracing::info;

/// Parse, fold and build a program.
pub fn compile(source: &str, config: &RunConfig) -> Result<Program, Fault> {
    let statements = fold::fold_program(parser::parse(source)?);
    Program::build(statements, config)
}

/// An engine builder loaded with `program`: its abstain table, the
/// system library when enabled, and the configured seed. I/O defaults
/// to stdin/stdout.
pub fn engine_builder(program: Program, config: &RunConfig) -> EngineBuilder {
    let slots = program.initial_slots().to_vec();
    let builder = Engine::builder(Arc::new(Interpreter::new(program)))
        .slots(slots)
        .seed(config.seed);
    if config.syslib {
        builder.link(syslib::component())
    } else {
        builder
    }
}

/// Compile and run `source` against stdin/stdout.
pub fn run_source(source: &str, config: &RunConfig) -> Result<(), Failure> {
    let program = compile(source, config)?;
    info!(statements = program.len(), "running program");
    let engine = engine_builder(program, config).build();
    let result = engine.run(None);
    let stats = engine.stats();
    info!(
        spawned = stats.spawned,
        completed = stats.completed,
        peak = stats.peak_running,
        ok = result.is_ok(),
        "run finished"
    );
    result
}
