//! Cringe Core: the value model shared by the runtime and the compiler
//!
//! Nothing in this crate knows about statements or control flow. It
//! provides the pieces every statement is built from.
//!
//! # Modules
//!
//! - `bitops`: interleave, select and the rotate-based unary operators
//! - `error`: the fault catalogue with codes and messages
//! - `label`: validated statement labels
//! - `tape`: delta encoding for character I/O
//! - `variables`: the process-wide Variable Store

pub mod bitops;
pub mod error;
pub mod label;
pub mod tape;
pub mod variables;

pub use bitops::{BinaryOp, UnaryOp, Width};
pub use error::Fault;
pub use label::Label;
pub use tape::TapePosition;
pub use variables::{VarClass, VarName, VariableStore};
