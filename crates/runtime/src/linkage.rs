//! Linked components
//!
//! A component exports handlers under labels. When a NEXT names a label
//! the program does not define, the engine looks it up here and runs the
//! handler as the callee, with the same frame mechanics as a local
//! target.
//!
//! A handler returns "should terminate". `Ok(false)` means the handler
//! finished normally and its invoker resumes, exactly as if the callee
//! had executed `RESUME #1`. `Ok(true)` means the invoker must unwind:
//! if the handler's frame is still on top of the stack it is dropped, so
//! the invoker's NEXT reports "should terminate" just as it would for a
//! local callee. A frame the handler already settled itself is left
//! alone.

use crate::engine::Context;
use cringe_core::{Fault, Label};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

pub type Handler = Arc<dyn Fn(&Context) -> Result<bool, Fault> + Send + Sync>;

/// The export list of one component
#[derive(Clone, Default)]
pub struct Component {
    name: String,
    exports: HashMap<Label, Handler>,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Component {
            name: name.into(),
            exports: HashMap::new(),
        }
    }

    /// Export `handler` under `label`. Label 0 is not a label and is skipped.
    pub fn export<F>(mut self, label: u16, handler: F) -> Self
    where
        F: Fn(&Context) -> Result<bool, Fault> + Send + Sync + 'static,
    {
        match Label::new(u32::from(label)) {
            Ok(label) => {
                self.exports.insert(label, Arc::new(handler));
            }
            Err(fault) => warn!(component = %self.name, "not exporting: {}", fault),
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exports(&self, label: Label) -> bool {
        self.exports.contains_key(&label)
    }

    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.exports.keys().copied()
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut labels: Vec<_> = self.labels().collect();
        labels.sort();
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("exports", &labels)
            .finish()
    }
}

/// Components in link order. Earlier components win.
#[derive(Clone, Default, Debug)]
pub struct Linkage {
    components: Vec<Component>,
}

impl Linkage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(&mut self, component: Component) {
        self.components.push(component);
    }

    pub fn resolve(&self, label: Label) -> Option<&Handler> {
        self.components
            .iter()
            .find_map(|component| component.exports.get(&label))
    }

    pub fn exports(&self, label: Label) -> bool {
        self.resolve(label).is_some()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_linked_component_wins() {
        let label = Label::new(1000).unwrap();
        let first = Component::new("first").export(1000, |_| Ok(true));
        let second = Component::new("second")
            .export(1000, |_| Ok(false))
            .export(1001, |_| Ok(false));

        let mut linkage = Linkage::new();
        linkage.link(first);
        linkage.link(second);

        assert!(linkage.exports(label));
        assert!(linkage.exports(Label::new(1001).unwrap()));
        assert!(!linkage.exports(Label::new(1002).unwrap()));
        assert_eq!(linkage.components()[0].name(), "first");
        assert!(linkage.components()[0].exports(label));
    }

    #[test]
    fn test_label_zero_is_not_exported() {
        let component = Component::new("odd").export(0, |_| Ok(false));
        assert_eq!(component.labels().count(), 0);
    }
}
