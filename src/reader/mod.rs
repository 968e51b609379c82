//! Support for reading Lisp expressions from character streams.

use std::io::ErrorKind;

use crate::data::{Expr, Storage};

pub mod stream;
pub mod token;

use stream::{CharStream, StrStream};
use token::{Token, TokenOffset, Tokenizer};


/// Default limit on how deeply lists may nest.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Error type if a read does not complete.
///
/// Running out of input between expressions, `EndOfInput`, is how a read loop
/// normally ends. Running out of input inside a list, e.g. "(()", is
/// `UnexpectedEndOfInput`: the expression is incomplete, and more input may fix it.
/// A true error, e.g. "())", is one that no additional input can fix.
///
/// If input is coming in interactively, this is a useful distinction;
/// on an error, we'd want to indicate it to the user,
/// while on an incomplete expression we'd like to prompt the user for more input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadErr {
    EndOfInput,
    UnexpectedEndOfInput(String),
    Error(String),
}

impl std::fmt::Display for ReadErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::result::Result<(), std::fmt::Error> {
        match self {
            ReadErr::EndOfInput => write!(f, "end of input"),
            ReadErr::UnexpectedEndOfInput(e) => write!(f, "incomplete input: {e}"),
            ReadErr::Error(e) => write!(f, "error in input: {e}"),
        }
    }
}

impl std::error::Error for ReadErr {}

impl ReadErr {
    /// Add additional context to an error.
    pub fn annotate(self, more: impl AsRef<str>) -> Self {
        match self {
            ReadErr::EndOfInput => ReadErr::EndOfInput,
            ReadErr::UnexpectedEndOfInput(e) => {
                ReadErr::UnexpectedEndOfInput(format!("{}: {}", more.as_ref(), e))
            }
            ReadErr::Error(e) => ReadErr::Error(format!("{}: {}", more.as_ref(), e)),
        }
    }
}

/// The main result type for this module:
/// a T (token, expression, etc), or an error, or incomplete.
pub type ReadResult<T> = Result<T, ReadErr>;

impl From<ReadErr> for std::io::Error {
    fn from(value: ReadErr) -> Self {
        match value {
            ReadErr::EndOfInput => std::io::Error::new(ErrorKind::UnexpectedEof, "end of input"),
            ReadErr::UnexpectedEndOfInput(s) => std::io::Error::new(ErrorKind::BrokenPipe, s),
            ReadErr::Error(s) => std::io::Error::new(ErrorKind::InvalidInput, s),
        }
    }
}

/// Reads expressions, one at a time, from a character stream.
///
/// Objects are allocated in the provided store. A read that fails discards
/// everything it allocated, so the store only ever holds complete expressions.
pub struct Reader<'a, S> {
    tokens: Tokenizer<'a, S>,
    max_depth: usize,
}

impl<'a, S> Reader<'a, S>
where
    S: CharStream,
{
    pub fn new(store: &'a Storage, input: S) -> Self {
        Reader {
            tokens: Tokenizer::new(store, input),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limit how deeply lists may nest; deeper input is an error.
    /// One level of list is always allowed.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The (1-indexed) line and column of the next character to be read.
    pub fn next_position(&self) -> (usize, usize) {
        self.tokens.next_position()
    }

    /// Recover the underlying stream, positioned after the last token read.
    pub fn into_inner(self) -> S {
        self.tokens.into_inner()
    }

    /// Read one complete expression: an atom, or a list.
    ///
    /// The empty list `()` is returned as `None`.
    /// Returns `EndOfInput` if there are no more expressions in the stream.
    pub fn read_expression(&mut self) -> ReadResult<Expr<'a>> {
        let store = self.tokens.store();
        let mark = store.checkpoint();
        let result = self.read_top();
        match &result {
            Ok(expr) => {
                if let Some(ptr) = expr {
                    tracing::debug!("read expression {}", ptr);
                } else {
                    tracing::debug!("read expression ()");
                }
            }
            Err(ReadErr::EndOfInput) => tracing::debug!("end of input"),
            Err(err) => {
                tracing::debug!("read failed: {}", err);
                store.rollback(mark);
            }
        }
        result
    }

    fn read_top(&mut self) -> ReadResult<Expr<'a>> {
        let TokenOffset {
            token,
            line,
            column,
        } = self.tokens.read_token()?;
        match token {
            Token::Atom(atom) => Ok(Some(atom)),
            Token::LParen => self.list_tail(1),
            Token::RParen => Err(ReadErr::Error(format!(
                "encountered right paren (line {line}, column {column}) without matching left paren"
            ))),
        }
    }

    /// Read the rest of a list whose opening paren has been consumed,
    /// through its closing paren.
    ///
    /// As with `read_expression`, a failure discards everything this call allocated.
    pub fn read_list_tail(&mut self) -> ReadResult<Expr<'a>> {
        let store = self.tokens.store();
        let mark = store.checkpoint();
        let result = self.list_tail(1);
        if let Err(err) = &result {
            tracing::debug!("read failed: {}", err);
            store.rollback(mark);
        }
        result
    }

    /// `depth` is the number of lists open, including this one.
    /// Siblings are read in a loop; only nested lists recurse.
    fn list_tail(&mut self, depth: usize) -> ReadResult<Expr<'a>> {
        let mut elements: Vec<Expr<'a>> = Vec::new();
        loop {
            let TokenOffset {
                token,
                line,
                column,
            } = self.tokens.read_token().map_err(|err| match err {
                ReadErr::EndOfInput => ReadErr::UnexpectedEndOfInput(format!(
                    "got end of input within a list of depth {depth}"
                )),
                err => err,
            })?;
            let element = match token {
                Token::RParen => break,
                Token::Atom(atom) => Some(atom),
                Token::LParen => {
                    if depth >= self.max_depth {
                        return Err(ReadErr::Error(format!(
                            "list at line {line}, column {column} nests deeper than the limit of {}",
                            self.max_depth
                        )));
                    }
                    self.list_tail(depth + 1)?
                }
            };
            elements.push(element);
        }

        let store = self.tokens.store();
        Ok(elements
            .into_iter()
            .rev()
            .fold(None, |tail, head| Some(store.put_cons(head, tail))))
    }

    /// Read every remaining expression in the stream.
    pub fn read_all(&mut self) -> ReadResult<Vec<Expr<'a>>> {
        self.collect()
    }
}

impl<'a, S> Iterator for Reader<'a, S>
where
    S: CharStream,
{
    type Item = ReadResult<Expr<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        // A failed stream would fail again on every call.
        if self.tokens.stream_failed() {
            return None;
        }
        match self.read_expression() {
            Err(ReadErr::EndOfInput) => None,
            v => Some(v),
        }
    }
}

/// Parse the string as a sequence of Lisp expressions (i.e. a body).
pub fn parse_body<'a>(store: &'a Storage, input: &str) -> ReadResult<Vec<Expr<'a>>> {
    Reader::new(store, StrStream::from(input)).read_all()
}

/// Parse the string as exactly one expression.
///
/// Anything but whitespace after the expression is an error.
pub fn parse_one<'a>(store: &'a Storage, input: &str) -> ReadResult<Expr<'a>> {
    let mark = store.checkpoint();
    let mut reader = Reader::new(store, StrStream::from(input));
    let expr = reader.read_expression()?;
    match reader.tokens.read_token() {
        Err(ReadErr::EndOfInput) => Ok(expr),
        Err(err) => {
            store.rollback(mark);
            Err(err)
        }
        Ok(TokenOffset { line, column, .. }) => {
            store.rollback(mark);
            Err(ReadErr::Error(format!(
                "unexpected input after expression at line {line}, column {column}"
            )))
        }
    }
}
