use std::io::{self, Read};

/// A byte source the reader pulls from, with one byte of lookahead.
///
/// Text sources carry their whole buffer and a cursor (REPL buffers, loaded
/// files, test input). The stdin source blocks one byte at a time so the
/// `read` built-in consumes exactly one form and leaves the rest of the
/// input for the next caller.
pub enum Source<'a> {
    Text { bytes: &'a [u8], pos: usize },
    Stdin { pending: Option<u8> },
}

impl<'a> Source<'a> {
    pub fn text(input: &'a str) -> Source<'a> {
        Source::Text {
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    pub fn stdin() -> Source<'static> {
        Source::Stdin { pending: None }
    }

    /// Look at the next byte without consuming it. None at end of input.
    pub fn peek(&mut self) -> Option<u8> {
        match self {
            Source::Text { bytes, pos } => bytes.get(*pos).copied(),
            Source::Stdin { pending } => {
                if pending.is_none() {
                    let mut buf = [0u8; 1];
                    match io::stdin().read(&mut buf) {
                        Ok(0) | Err(_) => return None,
                        Ok(_) => *pending = Some(buf[0]),
                    }
                }
                *pending
            }
        }
    }

    /// Consume and return the next byte. None at end of input.
    pub fn advance(&mut self) -> Option<u8> {
        match self {
            Source::Text { bytes, pos } => {
                let ch = bytes.get(*pos).copied();
                if ch.is_some() {
                    *pos += 1;
                }
                ch
            }
            Source::Stdin { .. } => {
                let ch = self.peek();
                if let Source::Stdin { pending } = self {
                    *pending = None;
                }
                ch
            }
        }
    }

    /// Cursor position. Only meaningful for text sources.
    pub fn position(&self) -> usize {
        match self {
            Source::Text { pos, .. } => *pos,
            Source::Stdin { .. } => 0,
        }
    }
}
