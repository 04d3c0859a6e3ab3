//! Runtime diagnostics for production debugging
//!
//! Provides a SIGQUIT (kill -3) handler that dumps the state of every
//! running engine to stderr: its nexting stack, unit counts and tape
//! position. The process keeps running.
//!
//! ## Usage
//!
//! ```bash
//! kill -3 <pid>
//! ```
//!
//! ## Signal Safety
//!
//! Dumping takes locks and does I/O, which is not async-signal-safe.
//! A dedicated thread waits for signals through signal-hook's iterator
//! API and does the dump outside of signal context.

use crate::engine::{Engine, EngineSnapshot, WeakEngine};
use std::io::Write;
use std::sync::{Mutex, Once, OnceLock, PoisonError};

static SIGNAL_HANDLER_INIT: Once = Once::new();

/// Maximum number of frames shown per engine
const FRAME_DISPLAY_LIMIT: usize = 20;

fn registry() -> &'static Mutex<Vec<WeakEngine>> {
    static ENGINES: OnceLock<Mutex<Vec<WeakEngine>>> = OnceLock::new();
    ENGINES.get_or_init(|| Mutex::new(Vec::new()))
}

/// Install the SIGQUIT handler. Idempotent.
pub fn install_signal_handler() {
    SIGNAL_HANDLER_INIT.call_once(|| {
        #[cfg(unix)]
        {
            use signal_hook::consts::SIGQUIT;
            use signal_hook::iterator::Signals;

            let mut signals = match Signals::new([SIGQUIT]) {
                Ok(s) => s,
                Err(e) => {
                    tracing::debug!("SIGQUIT diagnostics unavailable: {}", e);
                    return;
                }
            };

            std::thread::Builder::new()
                .name("cringe-diagnostics".to_string())
                .spawn(move || {
                    for sig in signals.forever() {
                        if sig == SIGQUIT {
                            dump_diagnostics();
                        }
                    }
                })
                .ok();
        }
    });
}

/// Track an engine for the dump. Engines that have been dropped are
/// pruned on the next registration.
pub fn watch(engine: &Engine) {
    install_signal_handler();
    let mut engines = registry().lock().unwrap_or_else(PoisonError::into_inner);
    engines.retain(|weak| weak.upgrade().is_some());
    engines.push(engine.downgrade());
}

fn live_snapshots() -> Vec<EngineSnapshot> {
    let engines = registry()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    engines
        .iter()
        .filter_map(WeakEngine::upgrade)
        .map(|engine| engine.snapshot())
        .collect()
}

/// Dump diagnostics for every watched engine to stderr.
pub fn dump_diagnostics() {
    let mut out = std::io::stderr().lock();
    let _ = write_report(&mut out, &live_snapshots());
}

/// The same report as a string
pub fn report() -> String {
    let mut out = Vec::new();
    let _ = write_report(&mut out, &live_snapshots());
    String::from_utf8_lossy(&out).into_owned()
}

fn write_report(out: &mut impl Write, snapshots: &[EngineSnapshot]) -> std::io::Result<()> {
    writeln!(out, "\n=== Cringe Runtime Diagnostics ===")?;
    writeln!(out, "Timestamp: {:?}", std::time::SystemTime::now())?;

    if snapshots.is_empty() {
        writeln!(out, "\n(no engines running)")?;
    }
    for (idx, snap) in snapshots.iter().enumerate() {
        writeln!(out, "\n[Engine {}]", idx + 1)?;
        writeln!(out, "  Finished:  {}", snap.finished)?;
        writeln!(out, "  Running:   {}", snap.running)?;
        writeln!(out, "  Spawned:   {} (total)", snap.stats.spawned)?;
        writeln!(out, "  Completed: {} (total)", snap.stats.completed)?;
        writeln!(out, "  Peak:      {} (high-water mark)", snap.stats.peak_running)?;
        writeln!(
            out,
            "  Tape:      in={} out={}",
            snap.tape.last_in(),
            snap.tape.last_out()
        )?;

        writeln!(out, "  Nexting stack ({} deep):", snap.frames.len())?;
        // Innermost first
        for frame in snap.frames.iter().rev().take(FRAME_DISPLAY_LIMIT) {
            writeln!(
                out,
                "    {} frame #{} waiting {}ms",
                frame.label, frame.id, frame.age_ms
            )?;
        }
        if snap.frames.len() > FRAME_DISPLAY_LIMIT {
            writeln!(
                out,
                "    ... and {} more frames",
                snap.frames.len() - FRAME_DISPLAY_LIMIT
            )?;
        }
    }

    writeln!(out, "\n=== End Diagnostics ===\n")
}
