//! Cringe Runtime: the concurrent execution engine
//!
//! A program runs as a set of units (May coroutines) that share one
//! nexting stack, the Variable Store, the abstain table and the I/O
//! streams. The compiler supplies the program through the
//! [`Evaluator`] trait; native code joins in through linked
//! [`Component`]s, the system library among them.
//!
//! # Modules
//!
//! - `engine`: units, frames, invoke/resume/forget, the shared state
//! - `frame`: nexting stack frames and how they are settled
//! - `io`: READ OUT / WRITE IN against byte streams
//! - `linkage`: components exporting native handlers under labels
//! - `syslib`: the classic arithmetic library
//! - `scheduler`: May configuration and unit statistics
//! - `diagnostics`: SIGQUIT dump of running engines

#[cfg(feature = "diagnostics")]
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod frame;
pub mod io;
pub mod linkage;
pub mod scheduler;
pub mod syslib;

pub use engine::{
    Context, Engine, EngineBuilder, EngineSnapshot, Evaluator, MAX_NEXTING_DEPTH, SlotId,
};
pub use error::Failure;
pub use frame::{FrameInfo, FrameSignal};
pub use io::{CaptureBuffer, Io};
pub use linkage::{Component, Handler, Linkage};
pub use scheduler::UnitStats;
