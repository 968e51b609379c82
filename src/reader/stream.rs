//! Character sources for the reader.

use std::io::{self, ErrorKind, Read};

/// An ordered source of characters, with one character of pushback.
pub trait CharStream {
    /// Consume the next character.
    /// Returns `None` at end of input.
    fn next_char(&mut self) -> io::Result<Option<char>>;

    /// Push a character back, so the next call to `next_char` returns it.
    ///
    /// Only one character of pushback is supported.
    fn unread(&mut self, c: char);
}

/// Character stream over an in-memory iterator, e.g. `str::chars`.
pub struct StrStream<I> {
    chars: I,
    pushback: Option<char>,
}

impl<I> StrStream<I>
where
    I: Iterator<Item = char>,
{
    pub fn new(chars: I) -> Self {
        StrStream {
            chars,
            pushback: None,
        }
    }
}

impl<'s> From<&'s str> for StrStream<std::str::Chars<'s>> {
    fn from(value: &'s str) -> Self {
        StrStream::new(value.chars())
    }
}

impl<I> CharStream for StrStream<I>
where
    I: Iterator<Item = char>,
{
    fn next_char(&mut self) -> io::Result<Option<char>> {
        Ok(self.pushback.take().or_else(|| self.chars.next()))
    }

    fn unread(&mut self, c: char) {
        debug_assert!(self.pushback.is_none(), "only one character of pushback");
        self.pushback = Some(c);
    }
}

/// Character stream decoding UTF-8 from a byte source.
///
/// Reads one byte at a time; wrap unbuffered sources (files, sockets)
/// in a `BufReader`.
pub struct IoStream<R> {
    input: R,
    pushback: Option<char>,
}

impl<R> IoStream<R>
where
    R: Read,
{
    pub fn new(input: R) -> Self {
        IoStream {
            input,
            pushback: None,
        }
    }

    /// Recover the underlying reader.
    pub fn into_inner(self) -> R {
        self.input
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let mut b = [0u8; 1];
        loop {
            match self.input.read(&mut b) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(b[0])),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Number of bytes in the UTF-8 sequence started by `lead`, if it is a valid lead byte.
fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

impl<R> CharStream for IoStream<R>
where
    R: Read,
{
    fn next_char(&mut self) -> io::Result<Option<char>> {
        if let Some(c) = self.pushback.take() {
            return Ok(Some(c));
        }
        let Some(lead) = self.next_byte()? else {
            return Ok(None);
        };
        let width = utf8_width(lead).ok_or_else(|| {
            io::Error::new(
                ErrorKind::InvalidData,
                format!("invalid UTF-8 lead byte 0x{lead:02x}"),
            )
        })?;

        let mut buf = [lead, 0, 0, 0];
        for slot in buf.iter_mut().take(width).skip(1) {
            *slot = self.next_byte()?.ok_or_else(|| {
                io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "input ended within a UTF-8 sequence",
                )
            })?;
        }
        let s = std::str::from_utf8(&buf[..width])
            .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;
        Ok(s.chars().next())
    }

    fn unread(&mut self, c: char) {
        debug_assert!(self.pushback.is_none(), "only one character of pushback");
        self.pushback = Some(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(mut s: impl CharStream) -> io::Result<String> {
        let mut out = String::new();
        while let Some(c) = s.next_char()? {
            out.push(c);
        }
        Ok(out)
    }

    #[test]
    fn str_pushback() -> io::Result<()> {
        let mut s = StrStream::from("ab");
        assert_eq!(s.next_char()?, Some('a'));
        s.unread('a');
        assert_eq!(s.next_char()?, Some('a'));
        assert_eq!(s.next_char()?, Some('b'));
        assert_eq!(s.next_char()?, None);
        assert_eq!(s.next_char()?, None);
        Ok(())
    }

    #[test]
    fn io_decodes_utf8() -> io::Result<()> {
        let input = "(λ (x) ∀ 🦀)";
        let got = drain(IoStream::new(input.as_bytes()))?;
        assert_eq!(got, input);
        Ok(())
    }

    #[test]
    fn io_pushback() -> io::Result<()> {
        let mut s = IoStream::new(&b"x)"[..]);
        assert_eq!(s.next_char()?, Some('x'));
        assert_eq!(s.next_char()?, Some(')'));
        s.unread(')');
        assert_eq!(s.next_char()?, Some(')'));
        assert_eq!(s.next_char()?, None);
        Ok(())
    }

    #[test]
    fn io_rejects_invalid_utf8() {
        let err = drain(IoStream::new(&b"ab\xffcd"[..])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn io_rejects_truncated_utf8() {
        // First two bytes of a three-byte sequence.
        let err = drain(IoStream::new(&b"a\xe2\x88"[..])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }
}
