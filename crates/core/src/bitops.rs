//! Bit operators
//!
//! The two binary operators (interleave and select) and the three
//! rotate-based unary operators. Every value travels as a `u32`; a
//! [`Width`] decides whether a unary operator works over 16 or 32 bits.

/// Operand width for the unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    /// 16-bit ("spot") values
    Half,
    /// 32-bit ("two-spot") values
    Full,
}

impl Width {
    /// Width of a value whose width is not fixed by a variable class.
    pub fn of_value(value: u32) -> Self {
        if value <= 0xFFFF {
            Width::Half
        } else {
            Width::Full
        }
    }

    pub fn mask(self) -> u32 {
        match self {
            Width::Half => 0xFFFF,
            Width::Full => 0xFFFF_FFFF,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Width::Half => 16,
            Width::Full => 32,
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `$` (mingle)
    Interleave,
    /// `~`
    Select,
}

impl BinaryOp {
    pub fn apply(self, a: u32, b: u32) -> u32 {
        match self {
            BinaryOp::Interleave => interleave(a, b),
            BinaryOp::Select => select(a, b),
        }
    }

    pub fn symbol(self) -> char {
        match self {
            BinaryOp::Interleave => '$',
            BinaryOp::Select => '~',
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    And,
    Or,
    Xor,
}

impl UnaryOp {
    /// Combine `value` with its one-bit right rotation over `width`.
    pub fn apply(self, value: u32, width: Width) -> u32 {
        let value = value & width.mask();
        let rotated = rotate(value, width);
        let combined = match self {
            UnaryOp::And => value & rotated,
            UnaryOp::Or => value | rotated,
            UnaryOp::Xor => value ^ rotated,
        };
        combined & width.mask()
    }

    pub fn symbol(self) -> char {
        match self {
            UnaryOp::And => '&',
            UnaryOp::Or => 'V',
            UnaryOp::Xor => '?',
        }
    }
}

/// Interleave the low 16 bits of `a` and `b`.
///
/// Bit `i` of `b` lands at result bit `2i`, bit `i` of `a` at `2i + 1`.
pub fn interleave(a: u32, b: u32) -> u32 {
    let mut result = 0u32;
    for bit in 0..16 {
        result |= ((b >> bit) & 1) << (2 * bit);
        result |= ((a >> bit) & 1) << (2 * bit + 1);
    }
    result
}

/// Pack the bits of `a` found under the set bits of `b` into the low
/// end of the result, preserving their order.
pub fn select(a: u32, b: u32) -> u32 {
    let mut result = 0u32;
    let mut next = 0;
    for bit in 0..32 {
        if (b >> bit) & 1 == 1 {
            result |= ((a >> bit) & 1) << next;
            next += 1;
        }
    }
    result
}

/// One-bit right rotation: the low bit wraps to the top of `width`.
pub fn rotate(value: u32, width: Width) -> u32 {
    match width {
        Width::Half => {
            let v = value & 0xFFFF;
            (v >> 1) | ((v & 1) << 15)
        }
        Width::Full => value.rotate_right(1),
    }
}
