//! I/O Adapter
//!
//! READ OUT and WRITE IN against a pair of byte streams.
//!
//! - Scalars are written as decimal followed by a newline, and read as
//!   one line holding either decimal digits or spelled-out digit words
//!   (`ONE TWO THREE`).
//! - Arrays move one byte per element through the [`TapePosition`]
//!   delta encoding.
//!
//! The adapter lives inside the engine's exclusive section, so writes
//! from different units never interleave and never yield mid-write.

use cringe_core::{Fault, TapePosition, VarName, VariableStore};
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex, PoisonError};

pub struct Io {
    input: Box<dyn BufRead + Send>,
    output: Box<dyn Write + Send>,
    tape: TapePosition,
}

impl Io {
    pub fn new(input: impl BufRead + Send + 'static, output: impl Write + Send + 'static) -> Self {
        Io {
            input: Box::new(input),
            output: Box::new(output),
            tape: TapePosition::new(),
        }
    }

    pub fn stdio() -> Self {
        Self::new(io::BufReader::new(io::stdin()), io::stdout())
    }

    pub fn tape(&self) -> &TapePosition {
        &self.tape
    }

    pub fn tape_mut(&mut self) -> &mut TapePosition {
        &mut self.tape
    }

    fn emit(&mut self, bytes: &[u8]) -> Result<(), Fault> {
        self.output
            .write_all(bytes)
            .and_then(|_| self.output.flush())
            .map_err(|e| Fault::OutputFailed(e.to_string()))
    }

    pub fn flush(&mut self) -> Result<(), Fault> {
        self.output
            .flush()
            .map_err(|e| Fault::OutputFailed(e.to_string()))
    }

    /// Write a number on its own line.
    pub fn read_out_number(&mut self, value: u32) -> Result<(), Fault> {
        self.emit(format!("{}\n", value).as_bytes())
    }

    /// Decode every element of an array through the output tape.
    pub fn read_out_array(&mut self, store: &VariableStore, name: VarName) -> Result<(), Fault> {
        let bytes: Vec<u8> = store
            .elements(name)?
            .iter()
            .map(|&value| self.tape.decode_output(value))
            .collect();
        self.emit(&bytes)
    }

    /// Fill a one-dimensional array from the input, one byte per element.
    pub fn write_in_array(&mut self, store: &mut VariableStore, name: VarName) -> Result<(), Fault> {
        let len = match store.dimensions(name)? {
            [len] => *len,
            _ => return Err(Fault::Hyperspace),
        };
        for index in 1..=len {
            let byte = self.read_byte()?.ok_or(Fault::InputExhausted)?;
            let value = self.tape.encode_input(byte);
            store.set_element(name, &[index as u32], value)?;
        }
        Ok(())
    }

    /// Read one number from the next input line.
    pub fn read_number(&mut self) -> Result<u32, Fault> {
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| Fault::BadInput(e.to_string()))?;
        if read == 0 {
            return Err(Fault::InputExhausted);
        }
        parse_number(line.trim())
    }

    fn read_byte(&mut self) -> Result<Option<u8>, Fault> {
        let buf = self
            .input
            .fill_buf()
            .map_err(|e| Fault::BadInput(e.to_string()))?;
        let Some(&byte) = buf.first() else {
            return Ok(None);
        };
        self.input.consume(1);
        Ok(Some(byte))
    }
}

fn digit_word(word: &str) -> Option<u64> {
    let digit = match word.to_ascii_uppercase().as_str() {
        "ZERO" | "OH" => 0,
        "ONE" => 1,
        "TWO" => 2,
        "THREE" => 3,
        "FOUR" => 4,
        "FIVE" => 5,
        "SIX" => 6,
        "SEVEN" => 7,
        "EIGHT" => 8,
        "NINE" | "NINER" => 9,
        _ => return None,
    };
    Some(digit)
}

/// Parse decimal digits or a sequence of digit words.
pub fn parse_number(text: &str) -> Result<u32, Fault> {
    let bad = || Fault::BadInput(text.to_string());
    if text.is_empty() {
        return Err(bad());
    }
    let value: u64 = if text.bytes().all(|b| b.is_ascii_digit()) {
        // Anything longer than 10 digits cannot fit in 32 bits anyway
        if text.trim_start_matches('0').len() > 10 {
            return Err(Fault::InputTooWide);
        }
        text.parse().map_err(|_| bad())?
    } else {
        let mut value = 0u64;
        for word in text.split_whitespace() {
            let digit = digit_word(word).ok_or_else(bad)?;
            value = value * 10 + digit;
            if value > u64::from(u32::MAX) {
                return Err(Fault::InputTooWide);
            }
        }
        value
    };
    u32::try_from(value).map_err(|_| Fault::InputTooWide)
}

/// A cloneable in-memory output sink, for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cringe_core::tape::reverse_byte;
    use cringe_core::{VarClass, VarName};
    use std::io::Cursor;

    fn io_with_input(input: &str) -> (Io, CaptureBuffer) {
        let out = CaptureBuffer::new();
        let io = Io::new(Cursor::new(input.as_bytes().to_vec()), out.clone());
        (io, out)
    }

    #[test]
    fn test_parse_number_forms() {
        assert_eq!(parse_number("42"), Ok(42));
        assert_eq!(parse_number("ONE TWO THREE"), Ok(123));
        assert_eq!(parse_number("oh seven"), Ok(7));
        assert_eq!(parse_number("4294967295"), Ok(u32::MAX));
        assert_eq!(parse_number("4294967296"), Err(Fault::InputTooWide));
        assert_eq!(parse_number("99999999999"), Err(Fault::InputTooWide));
        assert_eq!(
            parse_number("XLII"),
            Err(Fault::BadInput("XLII".to_string()))
        );
        assert_eq!(parse_number(""), Err(Fault::BadInput(String::new())));
    }

    #[test]
    fn test_read_number_line_by_line() {
        let (mut io, _) = io_with_input("12\nTHREE\n");
        assert_eq!(io.read_number(), Ok(12));
        assert_eq!(io.read_number(), Ok(3));
        assert_eq!(io.read_number(), Err(Fault::InputExhausted));
    }

    #[test]
    fn test_read_out_number() {
        let (mut io, out) = io_with_input("");
        io.read_out_number(65535).unwrap();
        assert_eq!(out.text(), "65535\n");
    }

    #[test]
    fn test_write_in_array_stores_deltas() {
        let (mut io, _) = io_with_input("AB");
        let mut store = VariableStore::new();
        let arr = VarName::new(VarClass::Tail, 1);
        store.redimension(arr, &[2]).unwrap();
        io.write_in_array(&mut store, arr).unwrap();
        assert_eq!(store.elements(arr), Ok(&[65, 1][..]));
    }

    #[test]
    fn test_write_in_array_requires_rank_one() {
        let (mut io, _) = io_with_input("ABCD");
        let mut store = VariableStore::new();
        let arr = VarName::new(VarClass::Tail, 1);
        store.redimension(arr, &[2, 2]).unwrap();
        assert_eq!(io.write_in_array(&mut store, arr), Err(Fault::Hyperspace));
    }

    #[test]
    fn test_write_in_array_runs_out_of_input() {
        let (mut io, _) = io_with_input("A");
        let mut store = VariableStore::new();
        let arr = VarName::new(VarClass::Hybrid, 1);
        store.redimension(arr, &[2]).unwrap();
        assert_eq!(io.write_in_array(&mut store, arr), Err(Fault::InputExhausted));
    }

    #[test]
    fn test_read_out_array_decodes_text() {
        let (mut io, out) = io_with_input("");
        let mut store = VariableStore::new();
        let arr = VarName::new(VarClass::Tail, 1);
        store.redimension(arr, &[2]).unwrap();
        let mut last = 0u8;
        for (i, &b) in b"Hi".iter().enumerate() {
            let rev = reverse_byte(b);
            store
                .set_element(arr, &[i as u32 + 1], u32::from(last.wrapping_sub(rev)))
                .unwrap();
            last = rev;
        }
        io.read_out_array(&store, arr).unwrap();
        assert_eq!(out.text(), "Hi");
    }
}
