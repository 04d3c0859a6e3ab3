//! Engine tests
//!
//! Programs here are scripts: one Rust closure per label, driving the
//! engine through the same Context calls the interpreter makes.

use cringe_core::{Fault, Label, VarClass, VarName};
use cringe_runtime::{
    CaptureBuffer, Component, Context, Engine, Evaluator, MAX_NEXTING_DEPTH, syslib,
};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

type Step = Box<dyn Fn(&Context) -> Result<(), Fault> + Send + Sync>;

struct Script {
    entry: Step,
    labels: HashMap<Label, Step>,
}

impl Script {
    fn new(entry: impl Fn(&Context) -> Result<(), Fault> + Send + Sync + 'static) -> Self {
        Script {
            entry: Box::new(entry),
            labels: HashMap::new(),
        }
    }

    fn at(
        mut self,
        label: u16,
        step: impl Fn(&Context) -> Result<(), Fault> + Send + Sync + 'static,
    ) -> Self {
        self.labels.insert(lbl(label), Box::new(step));
        self
    }
}

impl Evaluator for Script {
    fn has_label(&self, label: Label) -> bool {
        self.labels.contains_key(&label)
    }

    fn evaluate(&self, ctx: &Context, entry: Option<Label>) -> Result<(), Fault> {
        match entry {
            None => (self.entry)(ctx),
            Some(label) => match self.labels.get(&label) {
                Some(step) => step(ctx),
                None => Err(Fault::Lost(label)),
            },
        }
    }
}

fn lbl(n: u16) -> Label {
    Label::new(u32::from(n)).unwrap()
}

fn spot(n: u16) -> VarName {
    VarName::new(VarClass::Spot, n)
}

fn two_spot(n: u16) -> VarName {
    VarName::new(VarClass::TwoSpot, n)
}

fn engine(script: Script) -> (Engine, CaptureBuffer) {
    let out = CaptureBuffer::new();
    let engine = Engine::builder(Arc::new(script))
        .input(Cursor::new(Vec::new()))
        .output(out.clone())
        .seed(Some(7))
        .build();
    (engine, out)
}

#[test]
fn test_nexting_depth_limit() {
    let script = Script::new(|ctx| {
        ctx.set_scalar(spot(1), 0)?;
        ctx.invoke(lbl(1))?;
        Ok(())
    })
    .at(1, |ctx| {
        let depth = ctx.get_scalar(spot(1))?;
        ctx.set_scalar(spot(1), depth + 1)?;
        ctx.invoke(lbl(1))?;
        Ok(())
    });
    let (engine, _) = engine(script);

    let failure = engine.run(None).unwrap_err();
    assert_eq!(failure.fault, Fault::StackExhausted);
    assert_eq!(failure.nexting.len(), MAX_NEXTING_DEPTH);
    assert_eq!(engine.scalar(spot(1)), Ok(MAX_NEXTING_DEPTH as u32));
    assert_eq!(engine.depth(), 0);
    assert_eq!(engine.stats().live(), 0);
}

#[test]
fn test_resume_one_continues_invoker() {
    let script = Script::new(|ctx| {
        if ctx.invoke(lbl(10))? {
            return Ok(());
        }
        ctx.set_scalar(spot(2), 1)?;
        ctx.give_up();
        Ok(())
    })
    .at(10, |ctx| {
        ctx.set_scalar(spot(1), 7)?;
        ctx.resume(1)
    });
    let (engine, _) = engine(script);

    engine.run(None).unwrap();
    assert_eq!(engine.scalar(spot(1)), Ok(7));
    assert_eq!(engine.scalar(spot(2)), Ok(1));
    assert_eq!(engine.depth(), 0);
}

#[test]
fn test_resume_two_unwinds_middle_frame() {
    let script = Script::new(|ctx| {
        if ctx.invoke(lbl(10))? {
            return Ok(());
        }
        ctx.set_scalar(spot(3), 1)?;
        ctx.give_up();
        Ok(())
    })
    .at(10, |ctx| {
        if ctx.invoke(lbl(20))? {
            return Ok(());
        }
        ctx.set_scalar(spot(4), 1)
    })
    .at(20, |ctx| ctx.resume(2));
    let (engine, _) = engine(script);

    engine.run(None).unwrap();
    assert_eq!(engine.scalar(spot(3)), Ok(1));
    assert_eq!(engine.scalar(spot(4)), Err(Fault::Unassigned));
}

#[test]
fn test_forget_terminates_invoker() {
    let script = Script::new(|ctx| {
        if ctx.invoke(lbl(10))? {
            return Ok(());
        }
        ctx.set_scalar(spot(1), 1)
    })
    .at(10, |ctx| {
        ctx.forget(1);
        assert_eq!(ctx.depth(), 0);
        ctx.set_scalar(spot(2), 5)?;
        ctx.give_up();
        Ok(())
    });
    let (engine, _) = engine(script);

    engine.run(None).unwrap();
    assert_eq!(engine.scalar(spot(2)), Ok(5));
    assert_eq!(engine.scalar(spot(1)), Err(Fault::Unassigned));
}

#[test]
fn test_resume_deeper_than_stack_ruptures() {
    let (engine, _) = engine(Script::new(|ctx| ctx.resume(1)));
    let failure = engine.run(None).unwrap_err();
    assert_eq!(failure.fault, Fault::StackRupture);
    assert!(failure.nexting.is_empty());
}

#[test]
fn test_resume_zero_is_a_no_op() {
    let (engine, _) = engine(Script::new(|ctx| {
        ctx.resume(0)?;
        ctx.give_up();
        Ok(())
    }));
    engine.run(None).unwrap();
}

#[test]
fn test_every_unit_stopped_is_a_rupture() {
    // The entry returns without giving up
    let (engine, _) = engine(Script::new(|_| Ok(())));
    assert_eq!(engine.run(None).unwrap_err().fault, Fault::StackRupture);
}

#[test]
fn test_stash_and_retrieve() {
    let script = Script::new(|ctx| {
        ctx.set_scalar(spot(1), 1)?;
        ctx.stash(&[spot(1)]);
        ctx.set_scalar(spot(1), 2)?;
        ctx.retrieve(&[spot(1)])?;
        ctx.set_scalar(spot(2), ctx.get_scalar(spot(1))?)?;
        ctx.retrieve(&[spot(1)])
    });
    let (engine, _) = engine(script);

    assert_eq!(engine.run(None).unwrap_err().fault, Fault::EmptyStash);
    assert_eq!(engine.scalar(spot(2)), Ok(1));
}

#[test]
fn test_unknown_target_is_lost() {
    let (engine, _) = engine(Script::new(|ctx| ctx.invoke(lbl(3000)).map(|_| ())));
    assert_eq!(engine.run(None).unwrap_err().fault, Fault::Lost(lbl(3000)));
}

#[test]
fn test_linked_handler_resumes_invoker() {
    let script = Script::new(|ctx| {
        if ctx.invoke(lbl(2000))? {
            return Ok(());
        }
        ctx.give_up();
        Ok(())
    });
    let out = CaptureBuffer::new();
    let engine = Engine::builder(Arc::new(script))
        .output(out.clone())
        .input(Cursor::new(Vec::new()))
        .link(Component::new("answers").export(2000, |ctx| {
            ctx.set_scalar(spot(1), 42)?;
            Ok(false)
        }))
        .build();

    engine.run(None).unwrap();
    assert_eq!(engine.scalar(spot(1)), Ok(42));
}

#[test]
fn test_linked_handler_terminating_unwinds_invoker() {
    let script = Script::new(|ctx| {
        let unwound = ctx.invoke(lbl(2000))?;
        ctx.set_scalar(spot(2), u32::from(unwound))?;
        ctx.give_up();
        Ok(())
    });
    let engine = Engine::builder(Arc::new(script))
        .output(CaptureBuffer::new())
        .input(Cursor::new(Vec::new()))
        .link(Component::new("quitter").export(2000, |ctx| {
            ctx.set_scalar(spot(1), 9)?;
            Ok(true)
        }))
        .build();

    engine.run(None).unwrap();
    assert_eq!(engine.scalar(spot(1)), Ok(9));
    assert_eq!(engine.scalar(spot(2)), Ok(1));
    assert_eq!(engine.depth(), 0);
}

#[test]
fn test_linked_handler_that_settled_its_frame() {
    // The handler forgets its own frame, then finishes the run itself
    let script = Script::new(|ctx| {
        if ctx.invoke(lbl(2000))? {
            return Ok(());
        }
        ctx.set_scalar(spot(2), 1)?;
        ctx.give_up();
        Ok(())
    });
    let engine = Engine::builder(Arc::new(script))
        .output(CaptureBuffer::new())
        .input(Cursor::new(Vec::new()))
        .link(Component::new("detacher").export(2000, |ctx| {
            ctx.forget(1);
            ctx.set_scalar(spot(1), 3)?;
            ctx.give_up();
            Ok(true)
        }))
        .build();

    engine.run(None).unwrap();
    assert_eq!(engine.scalar(spot(1)), Ok(3));
    assert_eq!(engine.scalar(spot(2)), Err(Fault::Unassigned));
}

#[test]
fn test_local_label_shadows_linked() {
    let script = Script::new(|ctx| {
        if ctx.invoke(lbl(1000))? {
            return Ok(());
        }
        ctx.give_up();
        Ok(())
    })
    .at(1000, |ctx| {
        ctx.set_scalar(spot(3), 1)?;
        ctx.resume(1)
    });
    let engine = Engine::builder(Arc::new(script))
        .output(CaptureBuffer::new())
        .input(Cursor::new(Vec::new()))
        .link(syslib::component())
        .build();

    engine.run(None).unwrap();
    assert_eq!(engine.scalar(spot(3)), Ok(1));
}

fn syslib_engine(script: Script) -> Engine {
    Engine::builder(Arc::new(script))
        .output(CaptureBuffer::new())
        .input(Cursor::new(Vec::new()))
        .link(syslib::component())
        .seed(Some(11))
        .build()
}

#[test]
fn test_syslib_add_and_flag() {
    let script = Script::new(|ctx| {
        ctx.set_scalar(spot(1), 40)?;
        ctx.set_scalar(spot(2), 2)?;
        ctx.invoke(lbl(1000))?;
        ctx.set_scalar(spot(1), 65535)?;
        ctx.invoke(lbl(1009))?;
        ctx.set_scalar(two_spot(1), 0x1234)?;
        ctx.set_scalar(spot(1), 0x10)?;
        ctx.invoke(lbl(1050))?;
        ctx.give_up();
        Ok(())
    });
    let engine = syslib_engine(script);

    engine.run(None).unwrap();
    // (1009) leaves the truncated sum in .3
    assert_eq!(engine.scalar(spot(3)), Ok(1));
    assert_eq!(engine.scalar(spot(4)), Ok(2));
    assert_eq!(engine.scalar(spot(2)), Ok(0x123));
}

#[test]
fn test_syslib_overflow_faults() {
    let script = Script::new(|ctx| {
        ctx.set_scalar(spot(1), 65535)?;
        ctx.set_scalar(spot(2), 1)?;
        ctx.invoke(lbl(1000))?;
        ctx.give_up();
        Ok(())
    });
    let engine = syslib_engine(script);

    let failure = engine.run(None).unwrap_err();
    assert_eq!(failure.fault, Fault::Overflow);
    assert_eq!(failure.nexting, vec![lbl(1000)]);
}

#[test]
fn test_syslib_32_bit_routines() {
    let script = Script::new(|ctx| {
        ctx.set_scalar(spot(1), 0xABCD)?;
        ctx.set_scalar(spot(2), 0x1234)?;
        ctx.invoke(lbl(1520))?;
        ctx.set_scalar(two_spot(2), 0xABCD_1234)?;
        ctx.invoke(lbl(1510))?;
        ctx.set_scalar(two_spot(1), 100)?;
        ctx.set_scalar(two_spot(2), 0)?;
        ctx.invoke(lbl(1550))?;
        ctx.set_scalar(spot(5), ctx.get_scalar(two_spot(3))?)?;
        ctx.set_scalar(two_spot(2), 3)?;
        ctx.invoke(lbl(1540))?;
        ctx.give_up();
        Ok(())
    });
    let engine = syslib_engine(script);

    engine.run(None).unwrap();
    assert_eq!(engine.scalar(spot(5)), Ok(0));
    assert_eq!(engine.scalar(two_spot(3)), Ok(300));
}

#[test]
fn test_syslib_random_in_range() {
    let script = Script::new(|ctx| {
        ctx.set_scalar(spot(1), 10)?;
        ctx.invoke(lbl(1910))?;
        ctx.invoke(lbl(1900))?;
        ctx.give_up();
        Ok(())
    });
    let engine = syslib_engine(script);

    engine.run(None).unwrap();
    assert!(engine.scalar(spot(2)).unwrap() <= 10);
    assert!(engine.scalar(spot(1)).unwrap() <= 0xFFFF);
}

#[test]
fn test_panicking_unit_is_internal_fault() {
    let (engine, _) = engine(Script::new(|_| panic!("boom")));
    assert_eq!(
        engine.run(None).unwrap_err().fault,
        Fault::Internal("boom".to_string())
    );
}

#[test]
fn test_read_out_and_write_in() {
    let script = Script::new(|ctx| {
        ctx.write_in(spot(1))?;
        ctx.read_out(spot(1))?;
        ctx.read_out_value(9)?;
        ctx.give_up();
        Ok(())
    });
    let out = CaptureBuffer::new();
    let engine = Engine::builder(Arc::new(script))
        .input(Cursor::new(b"FOUR TWO\n".to_vec()))
        .output(out.clone())
        .build();

    engine.run(None).unwrap();
    assert_eq!(out.text(), "42\n9\n");
}

#[test]
fn test_abstain_counters() {
    let script = Script::new(|ctx| {
        ctx.abstain(&[0], None);
        ctx.abstain(&[0], None);
        assert!(ctx.is_abstained(0));
        ctx.abstain(&[0], Some(3));
        ctx.reinstate(&[0, 1]);
        assert!(!ctx.is_abstained(1));
        ctx.give_up();
        Ok(())
    });
    let engine = Engine::builder(Arc::new(script))
        .output(CaptureBuffer::new())
        .input(Cursor::new(Vec::new()))
        .slots(vec![0, 1])
        .build();

    engine.run(None).unwrap();
    assert_eq!(engine.slot(0), Some(3));
    assert_eq!(engine.slot(1), Some(0));
    assert_eq!(engine.slot(2), None);
}

#[test]
fn test_mutations_after_give_up_are_dropped() {
    let (engine, _) = engine(Script::new(|ctx| {
        ctx.give_up();
        assert!(ctx.is_finished());
        ctx.set_scalar(spot(1), 1)?;
        assert_eq!(ctx.invoke(lbl(5)), Err(Fault::Lost(lbl(5))));
        Ok(())
    }));

    engine.run(None).unwrap();
    assert_eq!(engine.scalar(spot(1)), Err(Fault::Unassigned));
}

#[test]
fn test_engine_runs_once() {
    let (engine, _) = engine(Script::new(|ctx| {
        ctx.give_up();
        Ok(())
    }));
    engine.run(None).unwrap();
    assert!(matches!(
        engine.run(None).unwrap_err().fault,
        Fault::Internal(_)
    ));
    let snapshot = engine.snapshot();
    assert!(snapshot.finished);
    assert_eq!(snapshot.stats.spawned, 1);
}
