//! Statement parser
//!
//! Grammar, one statement at a time:
//! ```text
//! [(label)] (PLEASE [DO] | DO) [NOT | N'T] [%n] body
//! ```
//!
//! A statement whose body does not parse is kept as a malformed
//! statement with its source text; the parser then skips ahead to the
//! next prefix, or label followed by a prefix, and carries on. Only a
//! handful of faults stop parsing outright: constants above 65535,
//! labels outside 1..=65535, and the controlled unary operators.

use crate::ast::{Expr, Gerund, LValue, Statement, StatementKind, Toggle};
use crate::lexer::{self, Keyword, Prefix, Separator, Token, TokenKind};
use cringe_core::{Fault, Label, UnaryOp, VarClass, VarName, Width};

/// Why a statement could not be parsed
#[derive(Debug)]
enum ParseError {
    /// The statement is malformed; parsing continues after it
    Syntax,
    /// The whole program is rejected
    Fatal(Fault),
}

impl From<Fault> for ParseError {
    fn from(fault: Fault) -> Self {
        ParseError::Fatal(fault)
    }
}

type ParseResult<T> = Result<T, ParseError>;

/// Prefix data read before the statement body
struct Prefixes {
    label: Option<Label>,
    valid: bool,
    enabled: bool,
    please: bool,
    percent: u32,
}

pub struct Parser {
    text: String,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        let text = lexer::expand_wows(source);
        let tokens = lexer::tokenize(&text);
        Parser {
            text,
            tokens,
            pos: 0,
        }
    }

    pub fn parse(&mut self) -> Result<Vec<Statement>, Fault> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            let index = statements.len();
            let statement = self.parse_statement(index)?;
            statements.push(statement);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self, index: usize) -> Result<Statement, Fault> {
        let first = self.pos;
        let line = self.tokens[first].line;

        let prefixes = self.parse_prefixes()?;
        let kind = if prefixes.valid {
            self.parse_body()
        } else {
            Err(ParseError::Syntax)
        };

        let kind = match kind {
            Ok(kind) => kind,
            Err(ParseError::Fatal(fault)) => return Err(fault),
            Err(ParseError::Syntax) => {
                self.recover(first);
                StatementKind::Malformed
            }
        };

        Ok(Statement {
            index,
            line,
            label: prefixes.label,
            enabled: prefixes.enabled,
            please: prefixes.please,
            percent: prefixes.percent,
            kind,
            text: self.source_text(first),
        })
    }

    fn parse_prefixes(&mut self) -> Result<Prefixes, Fault> {
        let mut prefixes = Prefixes {
            label: None,
            valid: false,
            enabled: true,
            please: false,
            percent: 100,
        };

        if let Some(TokenKind::Label(n)) = self.peek() {
            let n = *n;
            prefixes.label = Some(Label::new(n)?);
            self.pos += 1;
        }

        while let Some(TokenKind::Prefix(prefix)) = self.peek() {
            let prefix = *prefix;
            self.pos += 1;
            match prefix {
                Prefix::Please => {
                    prefixes.valid = true;
                    prefixes.please = true;
                }
                Prefix::Do => prefixes.valid = true,
                Prefix::Not => prefixes.enabled = false,
                Prefix::Percent => {
                    if let Some(TokenKind::Digits(n)) = self.peek() {
                        prefixes.percent = (*n).min(100);
                        self.pos += 1;
                    }
                }
            }
        }
        Ok(prefixes)
    }

    fn parse_body(&mut self) -> ParseResult<StatementKind> {
        match self.peek() {
            Some(TokenKind::Keyword(keyword)) => {
                let keyword = *keyword;
                self.pos += 1;
                self.parse_keyword_body(keyword)
            }
            Some(TokenKind::Label(_)) => {
                let target = self.parse_label()?;
                self.expect(&TokenKind::Keyword(Keyword::Next))?;
                Ok(StatementKind::Next(target))
            }
            Some(TokenKind::Sigil(_)) => self.parse_calculate(),
            _ => Err(ParseError::Syntax),
        }
    }

    fn parse_keyword_body(&mut self, keyword: Keyword) -> ParseResult<StatementKind> {
        Ok(match keyword {
            Keyword::Next => return Err(ParseError::Syntax),
            Keyword::Resume => StatementKind::Resume(self.parse_expr(None)?),
            Keyword::Forget => StatementKind::Forget(self.parse_expr(None)?),
            Keyword::ComeFrom => StatementKind::ComeFrom(self.parse_label()?),
            Keyword::Abstain => {
                let times = if self.check_separator(Separator::From) {
                    None
                } else {
                    Some(self.parse_expr(None)?)
                };
                self.expect(&TokenKind::Separator(Separator::From))?;
                StatementKind::Abstain {
                    times,
                    target: self.parse_toggle()?,
                }
            }
            Keyword::Reinstate => StatementKind::Reinstate(self.parse_toggle()?),
            Keyword::Stash => StatementKind::Stash(self.parse_names()?),
            Keyword::Retrieve => StatementKind::Retrieve(self.parse_names()?),
            Keyword::Ignore => StatementKind::Ignore(self.parse_names()?),
            Keyword::Remember => StatementKind::Remember(self.parse_names()?),
            Keyword::ReadOut => {
                let mut exprs = vec![self.parse_expr(None)?];
                while self.consume_separator(Separator::Plus) {
                    exprs.push(self.parse_expr(None)?);
                }
                StatementKind::ReadOut(exprs)
            }
            Keyword::WriteIn => {
                let mut targets = vec![self.parse_lvalue()?];
                while self.consume_separator(Separator::Plus) {
                    targets.push(self.parse_lvalue()?);
                }
                StatementKind::WriteIn(targets)
            }
            Keyword::GiveUp => StatementKind::GiveUp,
            Keyword::TryAgain => StatementKind::TryAgain,
        })
    }

    /// `lvalue <- expr`, or `array <- expr BY expr ...`
    fn parse_calculate(&mut self) -> ParseResult<StatementKind> {
        let target = self.parse_lvalue()?;
        self.expect(&TokenKind::Gets)?;

        if target.name.class.is_array() && target.subscripts.is_empty() {
            let mut dims = vec![self.parse_expr(None)?];
            while self.consume_separator(Separator::By) {
                dims.push(self.parse_expr(None)?);
            }
            return Ok(StatementKind::Redimension {
                target: target.name,
                dims,
            });
        }

        let value = self.parse_expr(None)?;
        Ok(StatementKind::Calculate { target, value })
    }

    /// `(label)` or `gerund + gerund ...`
    fn parse_toggle(&mut self) -> ParseResult<Toggle> {
        if let Some(TokenKind::Label(_)) = self.peek() {
            return Ok(Toggle::Label(self.parse_label()?));
        }
        let mut gerunds = vec![self.parse_gerund()?];
        while self.consume_separator(Separator::Plus) {
            gerunds.push(self.parse_gerund()?);
        }
        Ok(Toggle::Gerunds(gerunds))
    }

    fn parse_gerund(&mut self) -> ParseResult<Gerund> {
        match self.peek() {
            Some(TokenKind::Gerund(gerund)) => {
                let gerund = *gerund;
                self.pos += 1;
                Ok(gerund)
            }
            _ => Err(ParseError::Syntax),
        }
    }

    fn parse_label(&mut self) -> ParseResult<Label> {
        match self.peek() {
            Some(TokenKind::Label(n)) => {
                let n = *n;
                self.pos += 1;
                Ok(Label::new(n)?)
            }
            _ => Err(ParseError::Syntax),
        }
    }

    /// Variable names joined by `+`, for STASH and friends
    fn parse_names(&mut self) -> ParseResult<Vec<VarName>> {
        let mut names = vec![self.parse_var_name()?];
        while self.consume_separator(Separator::Plus) {
            names.push(self.parse_var_name()?);
        }
        Ok(names)
    }

    fn parse_var_name(&mut self) -> ParseResult<VarName> {
        let class = match self.peek() {
            Some(TokenKind::Sigil(c)) => VarClass::from_sigil(*c).ok_or(ParseError::Syntax)?,
            _ => return Err(ParseError::Syntax),
        };
        self.pos += 1;
        let number = self.parse_number()?;
        Ok(VarName::new(class, number))
    }

    /// A variable number, 1..=65535
    fn parse_number(&mut self) -> ParseResult<u16> {
        match self.peek() {
            Some(TokenKind::Digits(n)) => {
                let n = u16::try_from(*n)
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or(ParseError::Syntax)?;
                self.pos += 1;
                Ok(n)
            }
            _ => Err(ParseError::Syntax),
        }
    }

    fn parse_lvalue(&mut self) -> ParseResult<LValue> {
        let name = self.parse_var_name()?;
        let subscripts = if name.class.is_array() {
            self.parse_subscripts(None)?
        } else {
            Vec::new()
        };
        Ok(LValue { name, subscripts })
    }

    /// Optional `SUB e e ...`. The list ends at the first token that
    /// cannot start an expression, or at the enclosing group's closing
    /// delimiter.
    fn parse_subscripts(&mut self, delimiter: Option<Separator>) -> ParseResult<Vec<Expr>> {
        let mut subscripts = Vec::new();
        if !self.consume(&TokenKind::Sub) {
            return Ok(subscripts);
        }
        while self.starts_expr(delimiter) {
            subscripts.push(self.parse_expr(delimiter)?);
        }
        if subscripts.is_empty() {
            return Err(ParseError::Syntax);
        }
        Ok(subscripts)
    }

    fn starts_expr(&self, delimiter: Option<Separator>) -> bool {
        match self.peek() {
            Some(TokenKind::Sigil(_)) => true,
            Some(TokenKind::Separator(sep @ (Separator::Spark | Separator::Ears))) => {
                Some(*sep) != delimiter
            }
            _ => false,
        }
    }

    /// A primary, then a right-associative chain of binary operators.
    fn parse_expr(&mut self, delimiter: Option<Separator>) -> ParseResult<Expr> {
        let lhs = match self.peek() {
            Some(TokenKind::Separator(sep @ (Separator::Spark | Separator::Ears))) => {
                let sep = *sep;
                self.parse_group(sep)?
            }
            Some(TokenKind::Sigil('#')) => self.parse_constant()?,
            Some(TokenKind::Sigil('.' | ':')) => self.parse_scalar()?,
            Some(TokenKind::Sigil(',' | ';')) => {
                let name = self.parse_var_name()?;
                let subscripts = self.parse_subscripts(delimiter)?;
                Expr::Element { name, subscripts }
            }
            Some(TokenKind::Controlled(_)) => return Err(Fault::ControlledUnary.into()),
            _ => return Err(ParseError::Syntax),
        };

        if let Some(TokenKind::Binary(op)) = self.peek() {
            let op = *op;
            self.pos += 1;
            let rhs = self.parse_expr(delimiter)?;
            return Ok(Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            });
        }
        Ok(lhs)
    }

    fn parse_group(&mut self, delimiter: Separator) -> ParseResult<Expr> {
        self.pos += 1;
        let unary = self.parse_unary()?;
        let inner = self.parse_expr(Some(delimiter))?;
        if !self.consume_separator(delimiter) {
            return Err(ParseError::Syntax);
        }
        Ok(Expr::Group {
            unary,
            inner: Box::new(inner),
        })
    }

    /// `#n` or `#<unary>n`; the unary is applied here at 16 bits.
    fn parse_constant(&mut self) -> ParseResult<Expr> {
        let line = self.current_line();
        self.pos += 1;
        let unary = self.parse_unary()?;
        let value = match self.peek() {
            Some(TokenKind::Digits(n)) => *n,
            _ => return Err(ParseError::Syntax),
        };
        self.pos += 1;
        if value > 0xFFFF {
            return Err(Fault::Unparseable { line }.into());
        }
        Ok(Expr::Constant(match unary {
            Some(op) => op.apply(value, Width::Half),
            None => value,
        }))
    }

    fn parse_scalar(&mut self) -> ParseResult<Expr> {
        let class = match self.peek() {
            Some(TokenKind::Sigil(c)) => VarClass::from_sigil(*c).ok_or(ParseError::Syntax)?,
            _ => return Err(ParseError::Syntax),
        };
        self.pos += 1;
        let unary = self.parse_unary()?;
        let number = self.parse_number()?;
        Ok(Expr::Scalar {
            name: VarName::new(class, number),
            unary,
        })
    }

    fn parse_unary(&mut self) -> ParseResult<Option<UnaryOp>> {
        match self.peek() {
            Some(TokenKind::Unary(op)) => {
                let op = *op;
                self.pos += 1;
                Ok(Some(op))
            }
            Some(TokenKind::Controlled(_)) => Err(Fault::ControlledUnary.into()),
            _ => Ok(None),
        }
    }

    /// Skip to the next prefix, or label followed by a prefix. Always
    /// moves past the statement's first token.
    fn recover(&mut self, first: usize) {
        self.pos = self.pos.max(first + 1);
        while !self.is_at_end() {
            match self.peek() {
                Some(TokenKind::Prefix(_)) => return,
                Some(TokenKind::Label(_)) => {
                    if let Some(TokenKind::Prefix(_)) = self.tokens.get(self.pos + 1).map(|t| &t.kind)
                    {
                        return;
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
    }

    /// Source text from token `first` up to the next statement
    fn source_text(&self, first: usize) -> String {
        let start = self.tokens[first].start;
        let end = self
            .tokens
            .get(self.pos)
            .map(|t| t.start)
            .unwrap_or(self.text.len());
        self.text[start..end].trim().to_string()
    }

    fn current_line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn consume(&mut self, expected: &TokenKind) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &TokenKind) -> ParseResult<()> {
        if self.consume(expected) {
            Ok(())
        } else {
            Err(ParseError::Syntax)
        }
    }

    fn check_separator(&self, separator: Separator) -> bool {
        self.peek() == Some(&TokenKind::Separator(separator))
    }

    fn consume_separator(&mut self, separator: Separator) -> bool {
        self.consume(&TokenKind::Separator(separator))
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

/// Parse a whole program.
pub fn parse(source: &str) -> Result<Vec<Statement>, Fault> {
    Parser::new(source).parse()
}
