//! Control-Flow Model
//!
//! A built program: the statement list plus everything resolved ahead
//! of execution. Labels map to statement indices, each COME FROM is
//! attached to the statement it watches (its trapdoor), and every
//! statement that can be abstained gets a slot in the engine's abstain
//! table.
//!
//! Slots are per statement. `ABSTAIN FROM (10)` toggles the one slot of
//! the statement labelled (10); `ABSTAIN FROM CALCULATING` toggles the
//! slots of every assignment. A statement that is both labelled and of a
//! named class shares a single counter between the two.

use crate::ast::{Gerund, Statement, StatementKind, Toggle};
use crate::config::RunConfig;
use cringe_core::{Fault, Label};
use cringe_runtime::{SlotId, syslib};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// One in this many statements carries an injected bug
const BUG_ODDS: u32 = 256;

/// Programs this short are never judged on politeness
const POLITENESS_MIN_STATEMENTS: usize = 4;

#[derive(Debug)]
pub struct Program {
    statements: Vec<Statement>,
    labels: HashMap<Label, usize>,
    /// Per statement: the COME FROM watching it
    trapdoors: Vec<Option<usize>>,
    /// Per statement: its abstain slot, if anything can abstain it
    slots: Vec<Option<SlotId>>,
    initial_slots: Vec<u32>,
    gerund_slots: HashMap<Gerund, Vec<SlotId>>,
    bugs: Vec<bool>,
}

impl Program {
    pub fn build(statements: Vec<Statement>, config: &RunConfig) -> Result<Self, Fault> {
        if config.politeness {
            check_politeness(
                &statements,
                config.min_politeness_percent,
                config.max_politeness_percent,
            )?;
        }

        let labels = index_labels(&statements)?;
        check_try_again(&statements)?;
        let trapdoors = resolve_trapdoors(&statements, &labels)?;
        let (slots, initial_slots, gerund_slots) = assign_slots(&statements);
        let bugs = inject_bugs(statements.len(), config);

        let program = Program {
            statements,
            labels,
            trapdoors,
            slots,
            initial_slots,
            gerund_slots,
            bugs,
        };
        program.warn_unresolved(config);
        debug!(
            statements = program.statements.len(),
            labels = program.labels.len(),
            slots = program.initial_slots.len(),
            "program built"
        );
        Ok(program)
    }

    fn warn_unresolved(&self, config: &RunConfig) {
        let library = config.syslib.then(syslib::component);
        for statement in &self.statements {
            match &statement.kind {
                StatementKind::Next(label) => {
                    let linked = library.as_ref().is_some_and(|lib| lib.exports(*label));
                    if !self.labels.contains_key(label) && !linked {
                        warn!(line = statement.line, "NEXT to unknown label {}", label);
                    }
                }
                StatementKind::Malformed => {
                    debug!("{} * {}", statement.line, statement.text);
                }
                _ => {}
            }
        }
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn statement(&self, index: usize) -> Option<&Statement> {
        self.statements.get(index)
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn index_of(&self, label: Label) -> Option<usize> {
        self.labels.get(&label).copied()
    }

    /// The COME FROM statement watching `index`
    pub fn trapdoor(&self, index: usize) -> Option<usize> {
        self.trapdoors.get(index).copied().flatten()
    }

    pub fn slot(&self, index: usize) -> Option<SlotId> {
        self.slots.get(index).copied().flatten()
    }

    /// Initial abstain counters: 1 for `DO NOT` statements
    pub fn initial_slots(&self) -> &[u32] {
        &self.initial_slots
    }

    pub fn has_bug(&self, index: usize) -> bool {
        self.bugs.get(index).copied().unwrap_or(false)
    }

    /// Slots toggled by an ABSTAIN or REINSTATE. E139 when the label
    /// does not exist.
    pub fn toggle_slots(&self, toggle: &Toggle) -> Result<Vec<SlotId>, Fault> {
        match toggle {
            Toggle::Label(label) => {
                let index = self
                    .index_of(*label)
                    .ok_or(Fault::NotPlanningToGoThere(*label))?;
                Ok(self.slot(index).into_iter().collect())
            }
            Toggle::Gerunds(gerunds) => Ok(gerunds
                .iter()
                .filter_map(|g| self.gerund_slots.get(g))
                .flatten()
                .copied()
                .collect()),
        }
    }
}

/// Share of statements saying PLEASE, as a whole percentage
pub fn politeness_percent(statements: &[Statement]) -> u32 {
    if statements.is_empty() {
        return 0;
    }
    let polite = statements.iter().filter(|s| s.please).count();
    (polite * 100 / statements.len()) as u32
}

pub fn check_politeness(statements: &[Statement], min: u32, max: u32) -> Result<(), Fault> {
    if statements.len() < POLITENESS_MIN_STATEMENTS {
        return Ok(());
    }
    let percent = politeness_percent(statements);
    if percent < min {
        Err(Fault::InsufficientlyPolite)
    } else if percent > max {
        Err(Fault::OverlyPolite)
    } else {
        Ok(())
    }
}

fn index_labels(statements: &[Statement]) -> Result<HashMap<Label, usize>, Fault> {
    let mut labels = HashMap::new();
    for statement in statements {
        if let Some(label) = statement.label {
            if labels.insert(label, statement.index).is_some() {
                return Err(Fault::DuplicateLabel(label));
            }
        }
    }
    Ok(labels)
}

/// TRY AGAIN may only be the final statement.
fn check_try_again(statements: &[Statement]) -> Result<(), Fault> {
    let last = statements.len().saturating_sub(1);
    let misplaced = statements
        .iter()
        .any(|s| s.kind == StatementKind::TryAgain && s.index != last);
    if misplaced {
        Err(Fault::TryAgainMisplaced)
    } else {
        Ok(())
    }
}

fn resolve_trapdoors(
    statements: &[Statement],
    labels: &HashMap<Label, usize>,
) -> Result<Vec<Option<usize>>, Fault> {
    let mut trapdoors = vec![None; statements.len()];
    for statement in statements {
        if let StatementKind::ComeFrom(label) = statement.kind {
            let target = *labels.get(&label).ok_or(Fault::ComeFromNowhere(label))?;
            if trapdoors[target].is_some() {
                return Err(Fault::OverConnected(label));
            }
            trapdoors[target] = Some(statement.index);
        }
    }
    Ok(trapdoors)
}

type SlotTable = (Vec<Option<SlotId>>, Vec<u32>, HashMap<Gerund, Vec<SlotId>>);

/// Give a slot to every statement that starts disabled or that some
/// ABSTAIN / REINSTATE can reach.
fn assign_slots(statements: &[Statement]) -> SlotTable {
    let mut named_labels = HashSet::new();
    let mut named_gerunds = HashSet::new();
    for toggle in statements.iter().filter_map(|s| s.kind.toggle()) {
        match toggle {
            Toggle::Label(label) => {
                named_labels.insert(*label);
            }
            Toggle::Gerunds(gerunds) => named_gerunds.extend(gerunds.iter().copied()),
        }
    }

    let mut slots = Vec::with_capacity(statements.len());
    let mut initial = Vec::new();
    let mut gerund_slots: HashMap<Gerund, Vec<SlotId>> = HashMap::new();
    for statement in statements {
        let gerund = statement.kind.gerund();
        let by_label = statement.label.is_some_and(|l| named_labels.contains(&l));
        let by_gerund = gerund.is_some_and(|g| named_gerunds.contains(&g));
        if statement.enabled && !by_label && !by_gerund {
            slots.push(None);
            continue;
        }

        let slot = initial.len();
        initial.push(u32::from(!statement.enabled));
        slots.push(Some(slot));
        if let Some(g) = gerund.filter(|_| by_gerund) {
            gerund_slots.entry(g).or_default().push(slot);
        }
    }
    (slots, initial, gerund_slots)
}

fn inject_bugs(count: usize, config: &RunConfig) -> Vec<bool> {
    if !config.random_bugs {
        return vec![false; count];
    }
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    (0..count).map(|_| rng.gen_range(0..BUG_ODDS) == 0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn quiet() -> RunConfig {
        RunConfig::new().with_random_bugs(false).with_politeness(false)
    }

    fn build(source: &str) -> Result<Program, Fault> {
        Program::build(parse(source)?, &quiet())
    }

    fn label(n: u32) -> Label {
        Label::new(n).unwrap()
    }

    #[test]
    fn test_labels_and_trapdoors() {
        let program = build("(1) DO .1 <- #1\nDO COME FROM (1)\nDO GIVE UP").unwrap();
        assert_eq!(program.index_of(label(1)), Some(0));
        assert_eq!(program.trapdoor(0), Some(1));
        assert_eq!(program.trapdoor(1), None);
    }

    #[test]
    fn test_duplicate_label() {
        assert_eq!(
            build("(1) DO GIVE UP\n(1) DO GIVE UP").unwrap_err(),
            Fault::DuplicateLabel(label(1))
        );
    }

    #[test]
    fn test_come_from_faults() {
        assert_eq!(
            build("DO COME FROM (9)").unwrap_err(),
            Fault::ComeFromNowhere(label(9))
        );
        assert_eq!(
            build("(1) DO GIVE UP\nDO COME FROM (1)\nDO COME FROM (1)").unwrap_err(),
            Fault::OverConnected(label(1))
        );
    }

    #[test]
    fn test_try_again_must_be_last() {
        assert!(build("DO .1 <- #1\nDO TRY AGAIN").is_ok());
        assert_eq!(
            build("DO TRY AGAIN\nDO GIVE UP").unwrap_err(),
            Fault::TryAgainMisplaced
        );
    }

    #[test]
    fn test_slots_only_where_reachable() {
        let program = build(
            "(1) DO .1 <- #1\n\
             DO NOT GIVE UP\n\
             DO READ OUT .1\n\
             DO ABSTAIN FROM (1)\n\
             DO REINSTATE READING OUT",
        )
        .unwrap();
        assert_eq!(program.slot(0), Some(0));
        assert_eq!(program.slot(1), Some(1));
        assert_eq!(program.slot(2), Some(2));
        assert_eq!(program.slot(3), None);
        assert_eq!(program.initial_slots(), &[0, 1, 0]);
        assert_eq!(
            program
                .toggle_slots(&Toggle::Gerunds(vec![Gerund::ReadingOut]))
                .unwrap(),
            vec![2]
        );
        assert_eq!(
            program
                .toggle_slots(&Toggle::Gerunds(vec![Gerund::Nexting]))
                .unwrap(),
            Vec::<SlotId>::new()
        );
        assert_eq!(
            program.toggle_slots(&Toggle::Label(label(7))),
            Err(Fault::NotPlanningToGoThere(label(7)))
        );
    }

    #[test]
    fn test_politeness_bounds() {
        let rude = "DO GIVE UP\nDO GIVE UP\nDO GIVE UP\nDO GIVE UP";
        let grovelling = "PLEASE GIVE UP\nPLEASE GIVE UP\nDO GIVE UP\nDO GIVE UP";
        let fine = "PLEASE GIVE UP\nDO GIVE UP\nDO GIVE UP\nDO GIVE UP";
        let config = RunConfig::new().with_random_bugs(false);

        assert_eq!(
            Program::build(parse(rude).unwrap(), &config).unwrap_err(),
            Fault::InsufficientlyPolite
        );
        assert_eq!(
            Program::build(parse(grovelling).unwrap(), &config).unwrap_err(),
            Fault::OverlyPolite
        );
        assert!(Program::build(parse(fine).unwrap(), &config).is_ok());
        assert!(Program::build(parse("DO GIVE UP").unwrap(), &config).is_ok());
    }

    #[test]
    fn test_bug_injection_is_reproducible() {
        let source = "DO .1 <- #1\n".repeat(600);
        let config = quiet().with_random_bugs(true).with_seed(Some(42));
        let a = Program::build(parse(&source).unwrap(), &config).unwrap();
        let b = Program::build(parse(&source).unwrap(), &config).unwrap();
        assert_eq!(a.bugs, b.bugs);

        let clean = Program::build(parse(&source).unwrap(), &quiet()).unwrap();
        assert!((0..clean.len()).all(|i| !clean.has_bug(i)));
    }
}
