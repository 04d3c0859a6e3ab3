//! Tape positions for character I/O
//!
//! Array I/O never moves raw bytes. Input stores the difference between
//! each byte and the previous one read; output subtracts each value from
//! the previous (bit-reversed) byte written and bit-reverses the result.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TapePosition {
    last_in: u8,
    last_out: u8,
}

impl TapePosition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_in(&self) -> u8 {
        self.last_in
    }

    pub fn last_out(&self) -> u8 {
        self.last_out
    }

    /// Value stored for an input byte; advances the input position.
    pub fn encode_input(&mut self, byte: u8) -> u32 {
        let value = byte.wrapping_sub(self.last_in);
        self.last_in = byte;
        u32::from(value)
    }

    /// Byte written for a stored value; advances the output position.
    pub fn decode_output(&mut self, value: u32) -> u8 {
        let c = self.last_out.wrapping_sub((value & 0xFF) as u8);
        self.last_out = c;
        reverse_byte(c)
    }

    pub fn advance_input(&mut self, delta: u32) {
        self.last_in = self.last_in.wrapping_add((delta % 255) as u8);
    }

    pub fn advance_output(&mut self, delta: u32) {
        self.last_out = self.last_out.wrapping_add((delta % 255) as u8);
    }
}

/// Reverse the bits of a byte: swap nibbles, then bit pairs, then bits.
pub fn reverse_byte(c: u8) -> u8 {
    let c = c.rotate_left(4);
    let c = ((c & 0x33) << 2) | ((c & 0xCC) >> 2);
    ((c & 0x55) << 1) | ((c & 0xAA) >> 1)
}
