//! Statement labels

use crate::error::Fault;
use std::fmt;
use std::num::NonZeroU16;

/// A statement label, 1..=65535. Displays as `(n)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(NonZeroU16);

impl Label {
    /// Validate a label read from source (E197 outside 1..=65535).
    pub fn new(value: u32) -> Result<Self, Fault> {
        u16::try_from(value)
            .ok()
            .and_then(NonZeroU16::new)
            .map(Label)
            .ok_or(Fault::InvalidLabel(value))
    }

    pub fn get(self) -> u16 {
        self.0.get()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0)
    }
}
