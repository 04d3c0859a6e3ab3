//! Execution Engine
//!
//! Runs a program as a set of concurrent units sharing one nexting
//! stack, one Variable Store, one abstain table and one pair of I/O
//! streams.
//!
//! - `run` starts the entry unit and waits until every unit has exited.
//! - An invoke pushes a frame, starts the callee as a new unit, and
//!   blocks the invoker until the frame is settled.
//! - `resume(n)` settles the top `n` frames: the `n`-th one is resumed,
//!   the ones above it are dropped, and a dropped invoker unwinds.
//! - `forget(n)` drops the top `n` frames.
//! - The first fault from any unit ends the run: every frame is dropped
//!   and the fault is returned from `run`.
//!
//! Every operation on shared state happens under one lock, so each
//! statement's effect is atomic with respect to the other units. The
//! lock is a coroutine mutex: a unit waiting for it yields its worker
//! thread instead of blocking it.
//!
//! The engine also keeps a count of units that are able to make
//! progress. An invoke hands the invoker's share to the callee, and
//! settling a frame gives one back to the invoker. When the count drops
//! to zero without the run having finished, every remaining unit is
//! waiting on a frame nobody can settle; that is reported as a stack
//! rupture rather than left to hang.

use crate::error::{Failure, format_panic_payload};
use crate::frame::{Frame, FrameInfo, FrameSignal};
use crate::io::Io;
use crate::linkage::{Component, Handler, Linkage};
use crate::scheduler::{self, UnitStats};
use cringe_core::{Fault, Label, TapePosition, VarName, VariableStore};
use may::sync::{Mutex, MutexGuard};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::{BufRead, Write};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar, PoisonError, Weak};
use tracing::{debug, trace, warn};

/// Frames allowed on the nexting stack at once
pub const MAX_NEXTING_DEPTH: usize = 80;

/// Index into the engine's abstain table
pub type SlotId = usize;

/// The program being run
///
/// `evaluate` executes one unit: from the start of the program when
/// `entry` is `None`, otherwise from the statement carrying `entry`. It
/// returns once the unit has nothing left to do, including after an
/// invoke reported that the unit must unwind.
pub trait Evaluator: Send + Sync + 'static {
    fn has_label(&self, label: Label) -> bool;
    fn evaluate(&self, ctx: &Context, entry: Option<Label>) -> Result<(), Fault>;
}

#[derive(Clone)]
enum Target {
    Entry(Option<Label>),
    Local(Label),
    Linked(Handler),
}

struct State {
    frames: Vec<Frame>,
    store: VariableStore,
    io: Io,
    slots: Vec<u32>,
    running: usize,
    finished: bool,
    failure: Option<Failure>,
    next_frame: u64,
    stats: UnitStats,
    rng: StdRng,
}

impl State {
    /// Record the first fault of the run and end it.
    fn record(&mut self, fault: Fault) {
        if self.finished {
            trace!("ignoring {} after the run ended", fault);
            return;
        }
        debug!("run failed: {}", fault);
        let nexting = self.frames.iter().rev().map(|frame| frame.label).collect();
        self.failure = Some(Failure::new(fault, nexting));
        self.abort();
    }

    fn abort(&mut self) {
        self.finished = true;
        while let Some(frame) = self.frames.pop() {
            frame.settle(FrameSignal::Dropped);
            self.running += 1;
        }
    }

    fn pop_frame(&mut self, outcome: FrameSignal) {
        if let Some(frame) = self.frames.pop() {
            trace!(frame = frame.id, label = %frame.label, ?outcome, "frame settled");
            frame.settle(outcome);
            self.running += 1;
        }
    }
}

struct Shared {
    state: Mutex<State>,
    evaluator: Arc<dyn Evaluator>,
    linkage: Linkage,
    drained: std::sync::Mutex<bool>,
    drained_cv: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn exit_unit(&self, unit: u64, fault: Option<Fault>) {
        let mut state = self.lock();
        if let Some(fault) = fault {
            state.record(fault);
        }
        state.running = state.running.saturating_sub(1);
        state.stats.record_exit();
        trace!(unit, running = state.running, "unit exited");
        if state.running == 0 && !state.finished {
            warn!(
                depth = state.frames.len(),
                "every unit is waiting on the nexting stack"
            );
            state.record(Fault::StackRupture);
        }
        let drained = state.running == 0;
        drop(state);

        if drained {
            let mut done = self.drained.lock().unwrap_or_else(PoisonError::into_inner);
            *done = true;
            self.drained_cv.notify_all();
        }
    }
}

fn run_unit(shared: Arc<Shared>, unit: u64, target: Target) {
    let ctx = Context {
        shared: Arc::clone(&shared),
        unit,
    };
    let outcome = catch_unwind(AssertUnwindSafe(|| match &target {
        Target::Entry(entry) => shared.evaluator.evaluate(&ctx, *entry),
        Target::Local(label) => shared.evaluator.evaluate(&ctx, Some(*label)),
        Target::Linked(handler) => match handler(&ctx) {
            Ok(false) => ctx.resume(1),
            Ok(true) => {
                ctx.drop_frame(unit);
                Ok(())
            }
            Err(fault) => Err(fault),
        },
    }));
    let fault = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(fault)) => Some(fault),
        Err(payload) => Some(Fault::Internal(format_panic_payload(&payload))),
    };
    shared.exit_unit(unit, fault);
}

/// A unit's handle on the running program
#[derive(Clone)]
pub struct Context {
    shared: Arc<Shared>,
    unit: u64,
}

impl Context {
    pub fn unit(&self) -> u64 {
        self.unit
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared.lock()
    }

    /// Apply a change that cannot fail, unless the run already ended.
    fn update(&self, change: impl FnOnce(&mut State)) {
        let mut state = self.lock();
        if !state.finished {
            change(&mut state);
        }
    }

    /// Apply a change to shared state unless the run already ended.
    fn mutate<T: Default>(
        &self,
        change: impl FnOnce(&mut State) -> Result<T, Fault>,
    ) -> Result<T, Fault> {
        let mut state = self.lock();
        if state.finished {
            return Ok(T::default());
        }
        change(&mut state)
    }

    /// Invoke `label` and wait for the frame to be settled.
    ///
    /// Returns `Ok(true)` when the caller must unwind: its frame was
    /// dropped, or the run has ended.
    pub fn invoke(&self, label: Label) -> Result<bool, Fault> {
        let target = if self.shared.evaluator.has_label(label) {
            Target::Local(label)
        } else if let Some(handler) = self.shared.linkage.resolve(label) {
            Target::Linked(Arc::clone(handler))
        } else {
            return Err(Fault::Lost(label));
        };

        let waiter = {
            let mut state = self.lock();
            if state.finished {
                return Ok(true);
            }
            if state.frames.len() >= MAX_NEXTING_DEPTH {
                return Err(Fault::StackExhausted);
            }
            let id = state.next_frame;
            state.next_frame += 1;
            let (frame, waiter) = Frame::new(id, label);
            state.frames.push(frame);

            // The callee takes over this unit's running share
            let shared = Arc::clone(&self.shared);
            let name = format!("cringe-{}", label.get());
            if let Err(e) = scheduler::spawn_unit(name, move || run_unit(shared, id, target)) {
                state.frames.pop();
                return Err(Fault::Internal(e.to_string()));
            }
            let running = state.running;
            state.stats.record_spawn(running);
            trace!(unit = self.unit, frame = id, %label, depth = state.frames.len(), "invoke");
            waiter
        };

        match waiter.recv() {
            Ok(FrameSignal::Resumed) => Ok(false),
            Ok(FrameSignal::Dropped) | Err(_) => Ok(true),
        }
    }

    /// Settle the top `depth` frames, resuming the deepest of them.
    pub fn resume(&self, depth: u32) -> Result<(), Fault> {
        if depth == 0 {
            return Ok(());
        }
        self.mutate(|state| {
            let depth = depth as usize;
            if depth > state.frames.len() {
                return Err(Fault::StackRupture);
            }
            for _ in 1..depth {
                state.pop_frame(FrameSignal::Dropped);
            }
            state.pop_frame(FrameSignal::Resumed);
            Ok(())
        })
    }

    /// Drop up to `depth` frames without resuming anyone.
    pub fn forget(&self, depth: u32) {
        self.update(|state| {
            let depth = (depth as usize).min(state.frames.len());
            for _ in 0..depth {
                state.pop_frame(FrameSignal::Dropped);
            }
        });
    }

    /// Drop frame `id` if it is still on top, so its invoker unwinds.
    /// A frame already settled by its callee is left alone.
    fn drop_frame(&self, id: u64) {
        self.update(|state| {
            if state.frames.last().is_some_and(|frame| frame.id == id) {
                state.pop_frame(FrameSignal::Dropped);
            }
        });
    }

    /// End the run normally.
    pub fn give_up(&self) {
        let mut state = self.lock();
        if !state.finished {
            debug!(unit = self.unit, "giving up");
            state.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// Current nexting depth
    pub fn depth(&self) -> usize {
        self.lock().frames.len()
    }

    pub fn get_scalar(&self, name: VarName) -> Result<u32, Fault> {
        self.lock().store.get_scalar(name)
    }

    pub fn set_scalar(&self, name: VarName, value: u32) -> Result<(), Fault> {
        self.mutate(|state| state.store.set_scalar(name, value))
    }

    pub fn get_element(&self, name: VarName, indices: &[u32]) -> Result<u32, Fault> {
        self.lock().store.get_element(name, indices)
    }

    pub fn set_element(&self, name: VarName, indices: &[u32], value: u32) -> Result<(), Fault> {
        self.mutate(|state| state.store.set_element(name, indices, value))
    }

    pub fn redimension(&self, name: VarName, dims: &[u32]) -> Result<(), Fault> {
        self.mutate(|state| state.store.redimension(name, dims))
    }

    pub fn stash(&self, names: &[VarName]) {
        self.update(|state| names.iter().for_each(|&name| state.store.stash(name)));
    }

    /// Retrieve each variable in order; the first empty history faults.
    pub fn retrieve(&self, names: &[VarName]) -> Result<(), Fault> {
        self.mutate(|state| {
            names
                .iter()
                .try_for_each(|&name| state.store.retrieve(name))
        })
    }

    pub fn ignore(&self, names: &[VarName]) {
        self.update(|state| names.iter().for_each(|&name| state.store.ignore(name)));
    }

    pub fn remember(&self, names: &[VarName]) {
        self.update(|state| names.iter().for_each(|&name| state.store.remember(name)));
    }

    /// READ OUT a variable: scalars as numbers, arrays through the tape.
    pub fn read_out(&self, name: VarName) -> Result<(), Fault> {
        self.mutate(|state| {
            if name.class.is_array() {
                let State { io, store, .. } = state;
                io.read_out_array(store, name)
            } else {
                let value = state.store.get_scalar(name)?;
                state.io.read_out_number(value)
            }
        })
    }

    pub fn read_out_value(&self, value: u32) -> Result<(), Fault> {
        self.mutate(|state| state.io.read_out_number(value))
    }

    /// WRITE IN a variable: scalars take one line, arrays one byte per element.
    pub fn write_in(&self, name: VarName) -> Result<(), Fault> {
        self.mutate(|state| {
            if name.class.is_array() {
                let State { io, store, .. } = state;
                io.write_in_array(store, name)
            } else {
                let value = state.io.read_number()?;
                state.store.set_scalar(name, value)
            }
        })
    }

    pub fn write_in_element(&self, name: VarName, indices: &[u32]) -> Result<(), Fault> {
        self.mutate(|state| {
            let value = state.io.read_number()?;
            state.store.set_element(name, indices, value)
        })
    }

    pub fn advance_input(&self, delta: u32) {
        self.update(|state| state.io.tape_mut().advance_input(delta));
    }

    pub fn advance_output(&self, delta: u32) {
        self.update(|state| state.io.tape_mut().advance_output(delta));
    }

    /// Raise the abstain counter of each slot. Without a count, a slot
    /// that is not abstained becomes abstained once; with a count, the
    /// count is added.
    pub fn abstain(&self, slots: &[SlotId], times: Option<u32>) {
        self.update(|state| {
            for &slot in slots {
                let Some(counter) = state.slots.get_mut(slot) else {
                    warn!(slot, "abstain on an unknown slot");
                    continue;
                };
                match times {
                    None if *counter == 0 => *counter = 1,
                    None => {}
                    Some(times) => *counter = counter.saturating_add(times),
                }
            }
        });
    }

    pub fn reinstate(&self, slots: &[SlotId]) {
        self.update(|state| {
            for &slot in slots {
                if let Some(counter) = state.slots.get_mut(slot) {
                    *counter = counter.saturating_sub(1);
                }
            }
        });
    }

    pub fn is_abstained(&self, slot: SlotId) -> bool {
        self.lock().slots.get(slot).is_some_and(|&counter| counter > 0)
    }

    /// Roll for a `percent` chance. 0 and anything from 100 up always pass.
    pub fn chance(&self, percent: u32) -> bool {
        if percent == 0 || percent >= 100 {
            return true;
        }
        self.lock().rng.gen_range(0..100) < percent
    }

    /// Uniform value in `0..bound`; 0 when `bound` is 0.
    pub fn random_below(&self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.lock().rng.gen_range(0..bound)
    }
}

/// Point-in-time view of an engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSnapshot {
    /// Outermost first
    pub frames: Vec<FrameInfo>,
    pub stats: UnitStats,
    pub running: usize,
    pub finished: bool,
    pub tape: TapePosition,
}

pub struct EngineBuilder {
    evaluator: Arc<dyn Evaluator>,
    slots: Vec<u32>,
    input: Option<Box<dyn BufRead + Send>>,
    output: Option<Box<dyn Write + Send>>,
    linkage: Linkage,
    seed: Option<u64>,
}

impl EngineBuilder {
    /// Initial abstain counters, one per slot
    pub fn slots(mut self, slots: Vec<u32>) -> Self {
        self.slots = slots;
        self
    }

    pub fn input(mut self, input: impl BufRead + Send + 'static) -> Self {
        self.input = Some(Box::new(input));
        self
    }

    pub fn output(mut self, output: impl Write + Send + 'static) -> Self {
        self.output = Some(Box::new(output));
        self
    }

    pub fn link(mut self, component: Component) -> Self {
        self.linkage.link(component);
        self
    }

    /// Fix the random sequence; `None` seeds from the OS.
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> Engine {
        let io = match (self.input, self.output) {
            (None, None) => Io::stdio(),
            (input, output) => Io::new(
                input.unwrap_or_else(|| Box::new(std::io::BufReader::new(std::io::stdin()))),
                output.unwrap_or_else(|| Box::new(std::io::stdout())),
            ),
        };
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let state = State {
            frames: Vec::with_capacity(MAX_NEXTING_DEPTH),
            store: VariableStore::new(),
            io,
            slots: self.slots,
            running: 0,
            finished: false,
            failure: None,
            next_frame: 1,
            stats: UnitStats::default(),
            rng,
        };
        Engine {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                evaluator: self.evaluator,
                linkage: self.linkage,
                drained: std::sync::Mutex::new(false),
                drained_cv: Condvar::new(),
            }),
        }
    }
}

/// One program execution. Cloning shares the same run.
#[derive(Clone)]
pub struct Engine {
    shared: Arc<Shared>,
}

impl Engine {
    pub fn builder(evaluator: Arc<dyn Evaluator>) -> EngineBuilder {
        EngineBuilder {
            evaluator,
            slots: Vec::new(),
            input: None,
            output: None,
            linkage: Linkage::new(),
            seed: None,
        }
    }

    /// Run the program from `entry` (or from the top) until every unit
    /// has exited. An engine runs once.
    pub fn run(&self, entry: Option<Label>) -> Result<(), Failure> {
        scheduler::init();
        {
            let mut state = self.shared.lock();
            if state.stats.spawned > 0 {
                return Err(Fault::Internal("engine has already run".to_string()).into());
            }
            state.running = 1;
            state.stats.record_spawn(1);
        }
        #[cfg(feature = "diagnostics")]
        crate::diagnostics::watch(self);

        debug!(?entry, "starting run");
        let shared = Arc::clone(&self.shared);
        if let Err(e) = scheduler::spawn_unit("cringe-entry".to_string(), move || {
            run_unit(shared, 0, Target::Entry(entry))
        }) {
            return Err(Fault::Internal(e.to_string()).into());
        }

        let mut done = self
            .shared
            .drained
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while !*done {
            done = self
                .shared
                .drained_cv
                .wait(done)
                .unwrap_or_else(PoisonError::into_inner);
        }
        drop(done);

        let mut state = self.shared.lock();
        if let Err(fault) = state.io.flush() {
            state.failure.get_or_insert(Failure::from(fault));
        }
        debug!(stats = ?state.stats, "run finished");
        match state.failure.clone() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    pub fn scalar(&self, name: VarName) -> Result<u32, Fault> {
        self.shared.lock().store.get_scalar(name)
    }

    pub fn element(&self, name: VarName, indices: &[u32]) -> Result<u32, Fault> {
        self.shared.lock().store.get_element(name, indices)
    }

    pub fn slot(&self, slot: SlotId) -> Option<u32> {
        self.shared.lock().slots.get(slot).copied()
    }

    pub fn depth(&self) -> usize {
        self.shared.lock().frames.len()
    }

    pub fn stats(&self) -> UnitStats {
        self.shared.lock().stats
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let state = self.shared.lock();
        EngineSnapshot {
            frames: state.frames.iter().map(FrameInfo::from).collect(),
            stats: state.stats,
            running: state.running,
            finished: state.finished,
            tape: *state.io.tape(),
        }
    }

    #[cfg_attr(not(feature = "diagnostics"), allow(dead_code))]
    pub(crate) fn downgrade(&self) -> WeakEngine {
        WeakEngine(Arc::downgrade(&self.shared))
    }
}

/// An engine reference that does not keep the run alive
#[cfg_attr(not(feature = "diagnostics"), allow(dead_code))]
#[derive(Clone)]
pub(crate) struct WeakEngine(Weak<Shared>);

#[cfg_attr(not(feature = "diagnostics"), allow(dead_code))]
impl WeakEngine {
    pub(crate) fn upgrade(&self) -> Option<Engine> {
        self.0.upgrade().map(|shared| Engine { shared })
    }
}
