//! Variable Store
//!
//! Process-wide variables keyed by sigil class and number. Variables
//! spring into existence on first reference. Each one carries an enable
//! flag (IGNORE / REMEMBER) and a private history stack (STASH /
//! RETRIEVE).
//!
//! Arrays are 1-based and row-major. An array has no storage until it is
//! redimensioned; element access before that is a fault.

use crate::bitops::Width;
use crate::error::Fault;
use std::collections::HashMap;
use std::fmt;

/// The four variable classes, named after their sigils
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VarClass {
    /// `.` 16-bit scalar
    Spot,
    /// `:` 32-bit scalar
    TwoSpot,
    /// `,` 16-bit array
    Tail,
    /// `;` 32-bit array
    Hybrid,
}

impl VarClass {
    pub fn from_sigil(sigil: char) -> Option<Self> {
        match sigil {
            '.' => Some(VarClass::Spot),
            ':' => Some(VarClass::TwoSpot),
            ',' => Some(VarClass::Tail),
            ';' => Some(VarClass::Hybrid),
            _ => None,
        }
    }

    pub fn sigil(self) -> char {
        match self {
            VarClass::Spot => '.',
            VarClass::TwoSpot => ':',
            VarClass::Tail => ',',
            VarClass::Hybrid => ';',
        }
    }

    pub fn is_array(self) -> bool {
        matches!(self, VarClass::Tail | VarClass::Hybrid)
    }

    pub fn width(self) -> Width {
        match self {
            VarClass::Spot | VarClass::Tail => Width::Half,
            VarClass::TwoSpot | VarClass::Hybrid => Width::Full,
        }
    }
}

/// A variable name such as `.1` or `;12`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarName {
    pub class: VarClass,
    pub number: u16,
}

impl VarName {
    pub const fn new(class: VarClass, number: u16) -> Self {
        VarName { class, number }
    }

    /// Parse `.1`, `:2`, `,3` or `;4`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut chars = text.chars();
        let class = VarClass::from_sigil(chars.next()?)?;
        let number = chars.as_str().parse().ok()?;
        Some(VarName { class, number })
    }
}

impl fmt::Display for VarName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.class.sigil(), self.number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ArrayData {
    dims: Vec<usize>,
    cells: Vec<u32>,
}

impl ArrayData {
    fn offset(&self, indices: &[u32]) -> Result<usize, Fault> {
        if indices.len() != self.dims.len() {
            return Err(Fault::Hyperspace);
        }
        let mut offset = 0usize;
        for (&index, &dim) in indices.iter().zip(&self.dims) {
            let index = index as usize;
            if index == 0 || index > dim {
                return Err(Fault::Hyperspace);
            }
            offset = offset * dim + (index - 1);
        }
        Ok(offset)
    }
}

/// Current contents of a variable. `None` means never assigned (scalars)
/// or never dimensioned (arrays).
#[derive(Debug, Clone, PartialEq, Eq)]
enum Contents {
    Scalar(Option<u32>),
    Array(Option<ArrayData>),
}

#[derive(Debug, Clone)]
struct Variable {
    enabled: bool,
    contents: Contents,
    history: Vec<Contents>,
}

impl Variable {
    fn new(class: VarClass) -> Self {
        let contents = if class.is_array() {
            Contents::Array(None)
        } else {
            Contents::Scalar(None)
        };
        Variable {
            enabled: true,
            contents,
            history: Vec::new(),
        }
    }
}

fn check_width(class: VarClass, value: u32) -> Result<(), Fault> {
    if class.width() == Width::Half && value > 0xFFFF {
        return Err(Fault::Oversized);
    }
    Ok(())
}

fn require_scalar(name: VarName) -> Result<(), Fault> {
    if name.class.is_array() {
        Err(Fault::Hyperspace)
    } else {
        Ok(())
    }
}

fn require_array(name: VarName) -> Result<(), Fault> {
    if name.class.is_array() {
        Ok(())
    } else {
        Err(Fault::Hyperspace)
    }
}

#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    vars: HashMap<VarName, Variable>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, name: VarName) -> &mut Variable {
        self.vars
            .entry(name)
            .or_insert_with(|| Variable::new(name.class))
    }

    fn array(&self, name: VarName) -> Result<&ArrayData, Fault> {
        require_array(name)?;
        match self.vars.get(&name).map(|v| &v.contents) {
            Some(Contents::Array(Some(data))) => Ok(data),
            _ => Err(Fault::Hyperspace),
        }
    }

    pub fn get_scalar(&self, name: VarName) -> Result<u32, Fault> {
        require_scalar(name)?;
        match self.vars.get(&name).map(|v| &v.contents) {
            Some(Contents::Scalar(Some(value))) => Ok(*value),
            _ => Err(Fault::Unassigned),
        }
    }

    /// Assign a scalar. Oversized values fault even while the variable
    /// is ignored; otherwise an ignored variable keeps its value.
    pub fn set_scalar(&mut self, name: VarName, value: u32) -> Result<(), Fault> {
        require_scalar(name)?;
        check_width(name.class, value)?;
        let var = self.entry(name);
        if var.enabled {
            var.contents = Contents::Scalar(Some(value));
        }
        Ok(())
    }

    pub fn get_element(&self, name: VarName, indices: &[u32]) -> Result<u32, Fault> {
        let data = self.array(name)?;
        Ok(data.cells[data.offset(indices)?])
    }

    pub fn set_element(&mut self, name: VarName, indices: &[u32], value: u32) -> Result<(), Fault> {
        require_array(name)?;
        check_width(name.class, value)?;
        let var = self.entry(name);
        let Contents::Array(Some(data)) = &mut var.contents else {
            return Err(Fault::Hyperspace);
        };
        let offset = data.offset(indices)?;
        if var.enabled {
            data.cells[offset] = value;
        }
        Ok(())
    }

    /// Discard an array's contents and allocate zeroed storage.
    ///
    /// Storage that cannot be allocated faults with E241 and leaves the
    /// previous contents in place.
    pub fn redimension(&mut self, name: VarName, dims: &[u32]) -> Result<(), Fault> {
        require_array(name)?;
        if dims.is_empty() {
            return Err(Fault::Hyperspace);
        }
        if dims.contains(&0) {
            return Err(Fault::ZeroDimension);
        }
        let dims: Vec<usize> = dims.iter().map(|&d| d as usize).collect();
        let len = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or(Fault::Hyperspace)?;
        let var = self.entry(name);
        if !var.enabled {
            return Ok(());
        }
        let mut cells: Vec<u32> = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|_| Fault::Hyperspace)?;
        cells.resize(len, 0);
        var.contents = Contents::Array(Some(ArrayData { dims, cells }));
        Ok(())
    }

    /// Dimension vector of a dimensioned array.
    pub fn dimensions(&self, name: VarName) -> Result<&[usize], Fault> {
        Ok(&self.array(name)?.dims)
    }

    /// All cells of a dimensioned array in row-major order.
    pub fn elements(&self, name: VarName) -> Result<&[u32], Fault> {
        Ok(&self.array(name)?.cells)
    }

    /// Push a copy of the current contents onto the variable's history.
    pub fn stash(&mut self, name: VarName) {
        let var = self.entry(name);
        let snapshot = var.contents.clone();
        var.history.push(snapshot);
    }

    /// Pop the history. The popped contents are restored only while the
    /// variable is enabled.
    pub fn retrieve(&mut self, name: VarName) -> Result<(), Fault> {
        let var = self.entry(name);
        let snapshot = var.history.pop().ok_or(Fault::EmptyStash)?;
        if var.enabled {
            var.contents = snapshot;
        }
        Ok(())
    }

    pub fn ignore(&mut self, name: VarName) {
        self.entry(name).enabled = false;
    }

    pub fn remember(&mut self, name: VarName) {
        self.entry(name).enabled = true;
    }

    pub fn is_enabled(&self, name: VarName) -> bool {
        self.vars.get(&name).is_none_or(|v| v.enabled)
    }

    pub fn stash_depth(&self, name: VarName) -> usize {
        self.vars.get(&name).map_or(0, |v| v.history.len())
    }
}
