use crate::error::{LispError, Result};
use crate::heap::Heap;
use crate::stream::Source;
use crate::symbol::SymbolTable;
use crate::value::Value;

/// S-expression reader: turns a byte source into one Value at a time.
pub struct Reader<'a, 'h> {
    src: Source<'a>,
    heap: &'h mut Heap,
    symbols: &'h mut SymbolTable,
}

fn is_symbol_char(ch: u8) -> bool {
    ch != b'(' && ch != b')' && ch != 0 && !ch.is_ascii_whitespace()
}

impl<'a, 'h> Reader<'a, 'h> {
    pub fn new(src: Source<'a>, heap: &'h mut Heap, symbols: &'h mut SymbolTable) -> Self {
        Reader { src, heap, symbols }
    }

    /// Read one form. Returns None at clean end of input.
    pub fn read(&mut self) -> Result<Option<Value>> {
        self.skip_whitespace_and_comments();
        if self.src.peek().is_none() {
            return Ok(None);
        }
        Ok(Some(self.read_form()?))
    }

    /// Cursor position in the underlying source.
    pub fn position(&self) -> usize {
        self.src.position()
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while let Some(ch) = self.src.peek() {
                if ch.is_ascii_whitespace() {
                    self.src.advance();
                } else {
                    break;
                }
            }
            if self.src.peek() == Some(b';') {
                while let Some(ch) = self.src.advance() {
                    if ch == b'\n' || ch == b'\r' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn read_form(&mut self) -> Result<Value> {
        self.skip_whitespace_and_comments();

        let ch = self
            .src
            .peek()
            .ok_or_else(|| LispError::Parse("unexpected end of input".into()))?;

        match ch {
            b'(' => {
                self.src.advance();
                self.read_list()
            }
            b')' => Err(LispError::Parse("unexpected ')'".into())),
            b'"' => {
                self.src.advance();
                self.read_string()
            }
            _ => self.read_atom(),
        }
    }

    /// Read the body of a list: (a b c), (a . b), or (a b . c).
    /// The opening '(' has already been consumed.
    fn read_list(&mut self) -> Result<Value> {
        let mut elements = Vec::new();
        let mut dot_tail = None;

        loop {
            self.skip_whitespace_and_comments();

            let ch = self
                .src
                .peek()
                .ok_or_else(|| LispError::Parse("unterminated list".into()))?;

            if ch == b')' {
                self.src.advance();
                break;
            }

            // A '.' at element position always starts the dotted tail.
            if ch == b'.' {
                self.src.advance();
                dot_tail = Some(self.read_form()?);
                self.skip_whitespace_and_comments();
                if self.src.advance() != Some(b')') {
                    return Err(LispError::Parse("expected ')' after dotted tail".into()));
                }
                break;
            }

            elements.push(self.read_form()?);
        }

        let mut result = dot_tail.unwrap_or_else(Value::null);
        for val in elements.into_iter().rev() {
            result = self.heap.cons(val, result)?;
        }
        Ok(result)
    }

    /// Read a string literal. The opening '"' has already been consumed.
    fn read_string(&mut self) -> Result<Value> {
        let mut bytes = Vec::new();
        loop {
            let ch = self
                .src
                .advance()
                .ok_or_else(|| LispError::Parse("unterminated string".into()))?;
            match ch {
                b'"' => break,
                b'\\' => {
                    let esc = self
                        .src
                        .advance()
                        .ok_or_else(|| LispError::Parse("unterminated string".into()))?;
                    match esc {
                        b'n' => bytes.push(b'\n'),
                        b'f' => bytes.push(0x0C),
                        b'b' => bytes.push(0x08),
                        b'r' => bytes.push(b'\r'),
                        b't' => bytes.push(b'\t'),
                        b'\'' => bytes.push(b'\''),
                        b'"' => bytes.push(b'"'),
                        b'\\' => bytes.push(b'\\'),
                        // Backslash-newline is a line continuation: nothing.
                        b'\n' | b'\r' => {}
                        other => bytes.push(other),
                    }
                }
                other => bytes.push(other),
            }
        }
        let text = String::from_utf8(bytes)
            .map_err(|_| LispError::Parse("invalid UTF-8 in string".into()))?;
        let id = self.heap.alloc_str(text);
        Ok(Value::Str(id))
    }

    /// Read an integer or a symbol. A word is an integer exactly when its
    /// first character is a digit, or a '-' immediately followed by a digit;
    /// `- 1` is the symbol `-` followed by the integer `1`.
    fn read_atom(&mut self) -> Result<Value> {
        let first = self
            .src
            .advance()
            .ok_or_else(|| LispError::Parse("unexpected end of input".into()))?;

        if first.is_ascii_digit()
            || (first == b'-' && self.src.peek().is_some_and(|c| c.is_ascii_digit()))
        {
            return self.read_int(first);
        }

        if !is_symbol_char(first) {
            return Err(LispError::Parse("zero-length atom".into()));
        }

        let mut name = vec![first];
        while let Some(ch) = self.src.peek() {
            if !is_symbol_char(ch) {
                break;
            }
            name.push(ch);
            self.src.advance();
        }
        let name = String::from_utf8(name)
            .map_err(|_| LispError::Parse("invalid UTF-8 in symbol".into()))?;
        Ok(Value::Symbol(self.symbols.intern(&name)))
    }

    fn read_int(&mut self, first: u8) -> Result<Value> {
        let mut digits = String::new();
        digits.push(first as char);
        while let Some(ch) = self.src.peek() {
            if !ch.is_ascii_digit() {
                break;
            }
            digits.push(ch as char);
            self.src.advance();
        }
        digits
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| LispError::Parse(format!("integer literal out of range: {}", digits)))
    }
}

/// Read a single form from a string.
pub fn read_str(input: &str, heap: &mut Heap, symbols: &mut SymbolTable) -> Result<Value> {
    let mut reader = Reader::new(Source::text(input), heap, symbols);
    reader
        .read()?
        .ok_or_else(|| LispError::Parse("empty input".into()))
}

/// Read one form starting at byte offset `pos`.
/// Returns `Ok(Some((value, new_pos)))` or `Ok(None)` if only whitespace and
/// comments remain.
pub fn read_one_at(
    input: &str,
    pos: usize,
    heap: &mut Heap,
    symbols: &mut SymbolTable,
) -> Result<Option<(Value, usize)>> {
    let mut reader = Reader::new(Source::text(&input[pos..]), heap, symbols);
    match reader.read()? {
        Some(val) => Ok(Some((val, pos + reader.position()))),
        None => Ok(None),
    }
}
