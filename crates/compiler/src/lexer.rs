//! Hand-written scanner
//!
//! At every position the scanner tries each token class in a fixed
//! priority order, with no notion of word boundaries, and takes the
//! first match. Anything that starts no token is skipped. So `DOUBLE`
//! scans as `DO` followed by the word `UBLE`, and `PLEASE NOTE` starts
//! with `PLEASE`, `NOT`.

use crate::ast::Gerund;
use cringe_core::{BinaryOp, UnaryOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    Please,
    Do,
    /// `NOT` or `N'T`
    Not,
    /// `%`, followed by the chance as digits
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    ReadOut,
    WriteIn,
    ComeFrom,
    Abstain,
    Reinstate,
    Next,
    Stash,
    Resume,
    Forget,
    Ignore,
    Remember,
    Retrieve,
    GiveUp,
    TryAgain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Spark,
    Ears,
    Plus,
    By,
    From,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// `(n)`
    Label(u32),
    /// A run of digits; saturates at `u32::MAX`
    Digits(u32),
    Prefix(Prefix),
    Gerund(Gerund),
    Keyword(Keyword),
    /// `<-`
    Gets,
    Separator(Separator),
    /// One of `. , ; : #`
    Sigil(char),
    Sub,
    Unary(UnaryOp),
    Binary(BinaryOp),
    /// `@` or `^`
    Controlled(char),
    Word(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Line the token starts on, from 1
    pub line: usize,
    /// Byte span in the scanned text
    pub start: usize,
    pub end: usize,
}

const PREFIXES: &[(&str, Prefix)] = &[
    ("PLEASE", Prefix::Please),
    ("DO", Prefix::Do),
    ("N'T", Prefix::Not),
    ("NOT", Prefix::Not),
    ("%", Prefix::Percent),
];

const KEYWORDS: &[(&str, Keyword)] = &[
    ("READ OUT", Keyword::ReadOut),
    ("WRITE IN", Keyword::WriteIn),
    ("COME FROM", Keyword::ComeFrom),
    ("ABSTAIN", Keyword::Abstain),
    ("REINSTATE", Keyword::Reinstate),
    ("NEXT", Keyword::Next),
    ("STASH", Keyword::Stash),
    ("RESUME", Keyword::Resume),
    ("FORGET", Keyword::Forget),
    ("IGNORE", Keyword::Ignore),
    ("REMEMBER", Keyword::Remember),
    ("RETRIEVE", Keyword::Retrieve),
    ("GIVE UP", Keyword::GiveUp),
    ("TRY AGAIN", Keyword::TryAgain),
];

const SEPARATORS: &[(&str, Separator)] = &[
    ("\"", Separator::Ears),
    ("'", Separator::Spark),
    ("+", Separator::Plus),
    ("BY", Separator::By),
    ("FROM", Separator::From),
];

/// Replace every wow (`!`) with the spark-spot pair it abbreviates.
pub fn expand_wows(source: &str) -> String {
    source.replace('!', "'.")
}

/// Length of `phrase` at the start of `text`. Words of a multi-word
/// phrase may be separated by any run of blanks.
fn match_phrase(text: &str, phrase: &str) -> Option<usize> {
    let mut consumed = 0;
    for (i, word) in phrase.split(' ').enumerate() {
        if i > 0 {
            let blanks = text[consumed..]
                .bytes()
                .take_while(|b| *b == b' ' || *b == b'\t')
                .count();
            if blanks == 0 {
                return None;
            }
            consumed += blanks;
        }
        if !text[consumed..].starts_with(word) {
            return None;
        }
        consumed += word.len();
    }
    Some(consumed)
}

fn match_table<T: Clone>(text: &str, table: &[(&str, T)]) -> Option<(usize, T)> {
    table
        .iter()
        .find_map(|(phrase, value)| match_phrase(text, phrase).map(|len| (len, value.clone())))
}

fn digits_value(digits: &str) -> u32 {
    digits.bytes().fold(0u32, |acc, b| {
        acc.saturating_mul(10).saturating_add(u32::from(b - b'0'))
    })
}

fn leading_digits(text: &str) -> usize {
    text.bytes().take_while(u8::is_ascii_digit).count()
}

/// Scan one token at the start of `text`: its kind and byte length.
fn scan(text: &str) -> Option<(TokenKind, usize)> {
    if let Some(inner) = text.strip_prefix('(') {
        let n = leading_digits(inner);
        if n > 0 && inner[n..].starts_with(')') {
            return Some((TokenKind::Label(digits_value(&inner[..n])), n + 2));
        }
    }

    let n = leading_digits(text);
    if n > 0 {
        return Some((TokenKind::Digits(digits_value(&text[..n])), n));
    }

    if let Some((len, prefix)) = match_table(text, PREFIXES) {
        return Some((TokenKind::Prefix(prefix), len));
    }
    if let Some((len, gerund)) = match_table(text, Gerund::SPELLINGS) {
        return Some((TokenKind::Gerund(gerund), len));
    }
    if let Some((len, keyword)) = match_table(text, KEYWORDS) {
        return Some((TokenKind::Keyword(keyword), len));
    }
    if text.starts_with("<-") {
        return Some((TokenKind::Gets, 2));
    }
    if let Some((len, separator)) = match_table(text, SEPARATORS) {
        return Some((TokenKind::Separator(separator), len));
    }
    if text.starts_with("SUB") {
        return Some((TokenKind::Sub, 3));
    }

    let c = text.chars().next()?;
    let single = match c {
        '.' | ',' | ';' | ':' | '#' => Some(TokenKind::Sigil(c)),
        '&' => Some(TokenKind::Unary(UnaryOp::And)),
        'v' | 'V' => Some(TokenKind::Unary(UnaryOp::Or)),
        '?' => Some(TokenKind::Unary(UnaryOp::Xor)),
        '$' | '¢' => Some(TokenKind::Binary(BinaryOp::Interleave)),
        '~' => Some(TokenKind::Binary(BinaryOp::Select)),
        '@' | '^' => Some(TokenKind::Controlled(c)),
        _ => None,
    };
    if let Some(kind) = single {
        return Some((kind, c.len_utf8()));
    }

    let letters = text.bytes().take_while(u8::is_ascii_alphabetic).count();
    if letters > 0 {
        return Some((TokenKind::Word(text[..letters].to_string()), letters));
    }
    None
}

/// Scan the whole text. Wows must already be expanded.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut line = 1;

    while let Some(c) = text[pos..].chars().next() {
        if c == '\n' {
            line += 1;
            pos += 1;
            continue;
        }
        match scan(&text[pos..]) {
            Some((kind, len)) => {
                tokens.push(Token {
                    kind,
                    line,
                    start: pos,
                    end: pos + len,
                });
                pos += len;
            }
            None => pos += c.len_utf8(),
        }
    }
    tokens
}
