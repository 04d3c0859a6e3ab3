//! Fault catalogue
//!
//! Every failure the language can report, structural or at run time.
//! Each fault has a fixed numeric code and message; `Display` renders
//! the code and message together the way they are shown to the user.

use crate::label::Label;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// E000: execution reached a statement that did not parse
    Malformed { line: usize, text: String },
    /// E017
    Unparseable { line: usize },
    /// E079
    InsufficientlyPolite,
    /// E099
    OverlyPolite,
    /// E123: more than 80 nested invocations
    StackExhausted,
    /// E129: invoke target neither local nor linked
    Lost(Label),
    /// E139: abstain/reinstate names a label that does not exist
    NotPlanningToGoThere(Label),
    /// E182
    DuplicateLabel(Label),
    /// E197
    InvalidLabel(u32),
    /// E200: read of a variable never written
    Unassigned,
    /// E240
    ZeroDimension,
    /// E241: wrong class, rank, bounds, or undimensioned array
    Hyperspace,
    /// E252: the output stream refused a write
    OutputFailed(String),
    /// E275: value above 65535 stored in a 16-bit variable
    Oversized,
    /// E436
    EmptyStash,
    /// E444: redirect names a label that does not exist
    ComeFromNowhere(Label),
    /// E533
    InputTooWide,
    /// E555: label named by more than one redirect
    OverConnected(Label),
    /// E562: input ended during an array read
    InputExhausted,
    /// E579
    BadInput(String),
    /// E632: unwind deeper than the stack, or every unit stopped
    StackRupture,
    /// E633
    FellOffEdge,
    /// E774
    RandomBug,
    /// E777
    NoSource,
    /// E778: a unit of work panicked
    Internal(String),
    /// E993
    TryAgainMisplaced,
    /// E997
    ControlledUnary,
    /// E998
    WrongCompiler(String),
    /// E1999: system library overflow
    Overflow,
}

impl Fault {
    pub fn code(&self) -> u16 {
        match self {
            Fault::Malformed { .. } => 0,
            Fault::Unparseable { .. } => 17,
            Fault::InsufficientlyPolite => 79,
            Fault::OverlyPolite => 99,
            Fault::StackExhausted => 123,
            Fault::Lost(_) => 129,
            Fault::NotPlanningToGoThere(_) => 139,
            Fault::DuplicateLabel(_) => 182,
            Fault::InvalidLabel(_) => 197,
            Fault::Unassigned => 200,
            Fault::ZeroDimension => 240,
            Fault::Hyperspace => 241,
            Fault::OutputFailed(_) => 252,
            Fault::Oversized => 275,
            Fault::EmptyStash => 436,
            Fault::ComeFromNowhere(_) => 444,
            Fault::InputTooWide => 533,
            Fault::OverConnected(_) => 555,
            Fault::InputExhausted => 562,
            Fault::BadInput(_) => 579,
            Fault::StackRupture => 632,
            Fault::FellOffEdge => 633,
            Fault::RandomBug => 774,
            Fault::NoSource => 777,
            Fault::Internal(_) => 778,
            Fault::TryAgainMisplaced => 993,
            Fault::ControlledUnary => 997,
            Fault::WrongCompiler(_) => 998,
            Fault::Overflow => 1999,
        }
    }

    /// Faults found before execution starts
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Fault::Unparseable { .. }
                | Fault::InsufficientlyPolite
                | Fault::OverlyPolite
                | Fault::DuplicateLabel(_)
                | Fault::InvalidLabel(_)
                | Fault::ComeFromNowhere(_)
                | Fault::OverConnected(_)
                | Fault::TryAgainMisplaced
                | Fault::ControlledUnary
                | Fault::NoSource
                | Fault::WrongCompiler(_)
        )
    }

    /// Process exit status for this fault
    pub fn exit_code(&self) -> i32 {
        if self.is_structural() { 1 } else { 2 }
    }

    fn message(&self) -> String {
        match self {
            Fault::Malformed { line, text } => format!("{} * {}", line, text.trim()),
            Fault::Unparseable { line } => {
                format!("DO YOU EXPECT ME TO FIGURE THIS OUT?\n\tON THE WAY TO {}", line)
            }
            Fault::InsufficientlyPolite => "PROGRAMMER IS INSUFFICIENTLY POLITE".to_string(),
            Fault::OverlyPolite => "PROGRAMMER IS OVERLY POLITE".to_string(),
            Fault::StackExhausted => "PROGRAM HAS DISAPPEARED INTO THE BLACK LAGOON".to_string(),
            Fault::Lost(label) => format!("PROGRAM HAS GOTTEN LOST ON THE WAY TO {}", label),
            Fault::NotPlanningToGoThere(label) => {
                format!("I WASN'T PLANNING TO GO THERE ANYWAY {}", label)
            }
            Fault::DuplicateLabel(label) => format!("YOU MUST LIKE THIS LABEL A LOT! {}", label),
            Fault::InvalidLabel(n) => format!("SO! 65535 LABELS AREN'T ENOUGH FOR YOU? ({})", n),
            Fault::Unassigned => "NOTHING VENTURED, NOTHING GAINED".to_string(),
            Fault::ZeroDimension => "ERROR HANDLER PRINTED SNIDE REMARK".to_string(),
            Fault::Hyperspace => "VARIABLES MAY NOT BE STORED IN WEST HYPERSPACE".to_string(),
            Fault::OutputFailed(detail) => {
                format!("I'VE FORGOTTEN WHAT I WAS ABOUT TO SAY ({})", detail)
            }
            Fault::Oversized => "DON'T BYTE OFF MORE THAN YOU CAN CHEW".to_string(),
            Fault::EmptyStash => "THROW STICK BEFORE RETRIEVING!".to_string(),
            Fault::ComeFromNowhere(label) => format!("IT CAME FROM BEYOND SPACE {}", label),
            Fault::InputTooWide => {
                "YOU WANT MAYBE WE SHOULD IMPLEMENT 64-BIT VARIABLES?".to_string()
            }
            Fault::OverConnected(label) => {
                format!("FLOW DIAGRAM IS EXCESSIVELY CONNECTED {}", label)
            }
            Fault::InputExhausted => "I DO NOT COMPUTE".to_string(),
            Fault::BadInput(text) => {
                format!("WHAT BASE AND/OR LANGUAGE INCLUDES \"{}\" ???", text)
            }
            Fault::StackRupture => {
                "THE NEXT STACK RUPTURES. ALL DIE. OH, THE EMBARRASSMENT!".to_string()
            }
            Fault::FellOffEdge => {
                "PROGRAM FELL OFF THE EDGE ON THE WAY TO THE NEW WORLD".to_string()
            }
            Fault::RandomBug => "RANDOM COMPILER BUG".to_string(),
            Fault::NoSource => "A SOURCE IS A SOURCE, OF COURSE, OF COURSE".to_string(),
            Fault::Internal(detail) => format!("UNEXPLAINED COMPILER BUG ({})", detail),
            Fault::TryAgainMisplaced => "I GAVE UP LONG AGO".to_string(),
            Fault::ControlledUnary => {
                "ILLEGAL POSSESSION OF A CONTROLLED UNARY OPERATOR".to_string()
            }
            Fault::WrongCompiler(path) => format!(
                "EXCUSE ME, YOU MUST HAVE ME CONFUSED WITH SOME OTHER COMPILER ({})",
                path
            ),
            Fault::Overflow => "DOUBLE OR SINGLE PRECISION OVERFLOW".to_string(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:03} {}", self.code(), self.message())
    }
}

impl std::error::Error for Fault {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        assert_eq!(
            Fault::StackExhausted.to_string(),
            "E123 PROGRAM HAS DISAPPEARED INTO THE BLACK LAGOON"
        );
        assert_eq!(
            Fault::Overflow.to_string(),
            "E1999 DOUBLE OR SINGLE PRECISION OVERFLOW"
        );
    }

    #[test]
    fn test_malformed_shows_line_and_text() {
        let fault = Fault::Malformed {
            line: 7,
            text: "DO SOMETHING SILLY\n".to_string(),
        };
        assert_eq!(fault.to_string(), "E000 7 * DO SOMETHING SILLY");
    }

    #[test]
    fn test_lost_names_label() {
        let label = Label::new(42).unwrap();
        assert_eq!(
            Fault::Lost(label).to_string(),
            "E129 PROGRAM HAS GOTTEN LOST ON THE WAY TO (42)"
        );
    }

    #[test]
    fn test_structural_faults_exit_with_one() {
        let label = Label::new(1).unwrap();
        assert!(Fault::DuplicateLabel(label).is_structural());
        assert_eq!(Fault::OverConnected(label).exit_code(), 1);
        assert!(!Fault::EmptyStash.is_structural());
        assert_eq!(Fault::StackRupture.exit_code(), 2);
    }
}
