//! Module for extracting Lisp tokens from an input stream.

use crate::data::{Ptr, Storage};
use crate::reader::stream::CharStream;
use crate::reader::{ReadErr, ReadResult};

/// A Lisp token.
///
/// Whitespace is ignored. The parens are never interned as atoms,
/// so they cannot leak into a parsed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    LParen,
    RParen,
    Atom(Ptr<'a>),
}

impl std::fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Atom(p) => std::fmt::Display::fmt(&p.get(), f),
        }
    }
}

/// A token along with its starting position in the input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenOffset<'a> {
    pub token: Token<'a>,
    pub line: usize,
    pub column: usize,
}

impl<'a> From<TokenOffset<'a>> for Token<'a> {
    fn from(value: TokenOffset<'a>) -> Self {
        value.token
    }
}

/// Token separators. The parens also end a token, but are tokens themselves.
/// This is C's `isspace`: ASCII whitespace plus vertical tab.
fn is_space(c: char) -> bool {
    c.is_ascii_whitespace() || c == '\x0B'
}

/// Splits a character stream into tokens, one at a time.
///
/// Atoms are interned into the store as they are read.
pub struct Tokenizer<'a, S> {
    store: &'a Storage,
    input: S,

    // Position of the last character consumed.
    // Line is 0-indexed; column counts characters consumed on this line,
    // so it is also the 1-indexed column of the last character.
    line: usize,
    column: usize,

    // Set once the stream reports an error; no more tokens are read after.
    failed: bool,
}

impl<'a, S> Tokenizer<'a, S>
where
    S: CharStream,
{
    pub fn new(store: &'a Storage, input: S) -> Self {
        Tokenizer {
            store,
            input,
            line: 0,
            column: 0,
            failed: false,
        }
    }

    pub fn store(&self) -> &'a Storage {
        self.store
    }

    /// Recover the underlying stream, positioned after the last token read.
    pub fn into_inner(self) -> S {
        self.input
    }

    /// The (1-indexed) line and column of the next character to be read.
    pub fn next_position(&self) -> (usize, usize) {
        (self.line + 1, self.column + 1)
    }

    /// Whether the underlying stream has failed.
    pub fn stream_failed(&self) -> bool {
        self.failed
    }

    fn next_char(&mut self) -> ReadResult<Option<char>> {
        let c = match self.input.next_char() {
            Ok(c) => c,
            Err(err) => {
                self.failed = true;
                let (line, column) = self.next_position();
                return Err(ReadErr::Error(format!("failed to read input: {err}"))
                    .annotate(format!("at line {line} column {column}")));
            }
        };
        match c {
            Some('\n') => {
                self.line += 1;
                self.column = 0;
            }
            Some(_) => self.column += 1,
            None => (),
        }
        Ok(c)
    }

    /// Push back a character consumed from the current line.
    fn unread(&mut self, c: char) {
        debug_assert!(c != '\n', "newlines are never pushed back");
        self.column -= 1;
        self.input.unread(c);
    }

    /// Read exactly one token.
    ///
    /// Returns `EndOfInput` if the stream is exhausted before a token starts.
    pub fn read_token(&mut self) -> ReadResult<TokenOffset<'a>> {
        // Forward over any whitespace:
        let first = loop {
            match self.next_char()? {
                None => return Err(ReadErr::EndOfInput),
                Some(c) if is_space(c) => continue,
                Some(c) => break c,
            }
        };
        let (line, column) = (self.line + 1, self.column);

        let token = match first {
            '(' => Token::LParen,
            ')' => Token::RParen,
            c => Token::Atom(self.read_atom(c)?),
        };
        tracing::trace!(line, column, "read token {token}");
        Ok(TokenOffset {
            token,
            line,
            column,
        })
    }

    /// Accumulate the rest of an atom that starts with `first`.
    ///
    /// Whitespace ends the atom and is consumed; a paren ends the atom and is
    /// left in the stream; end-of-input ends the atom.
    fn read_atom(&mut self, first: char) -> ReadResult<Ptr<'a>> {
        let mut name = String::new();
        name.push(first);
        while let Some(c) = self.next_char()? {
            if is_space(c) {
                break;
            }
            if c == '(' || c == ')' {
                self.unread(c);
                break;
            }
            name.push(c);
        }
        Ok(self.store.put_atom(&name))
    }
}

impl<'a, S> Iterator for Tokenizer<'a, S>
where
    S: CharStream,
{
    type Item = ReadResult<TokenOffset<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_token() {
            Err(ReadErr::EndOfInput) => None,
            v => Some(v),
        }
    }
}
