// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Splitting of zone file text into logical lines of fields.
//!
//! This handles comments, parentheses (which continue a line), and
//! quoting. Escape sequences are left in place, since their meaning
//! depends on the field; the lexer only makes sure that an escaped
//! character never ends a field.

use super::error::{Error, ErrorKind, Result};

/// A field of a logical line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) struct Field<'a> {
    /// The text of the field, with escapes still in place. Quotes are
    /// not included.
    pub text: &'a str,
    pub quoted: bool,
}

impl<'a> Field<'a> {
    /// Returns whether this is the unquoted field `\#` that introduces
    /// generic RDATA ([RFC 3597 § 5]).
    ///
    /// [RFC 3597 § 5]: https://datatracker.ietf.org/doc/html/rfc3597#section-5
    pub fn is_backslash_hash(&self) -> bool {
        !self.quoted && self.text == "\\#"
    }
}

/// A logical line. With parentheses, this may span several lines of
/// the file; `number` is the first of them.
#[derive(Clone, Debug)]
pub(super) struct Line<'a> {
    pub number: usize,
    pub starts_with_blank: bool,
    pub fields: Vec<Field<'a>>,
}

pub(super) struct Lexer<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            line: 1,
        }
    }

    /// Reads the next logical line, or returns `None` at the end of the
    /// text. Lines without fields are returned too.
    pub fn next_line(&mut self) -> Result<Option<Line<'a>>> {
        if self.pos >= self.text.len() {
            return Ok(None);
        }
        let mut line = Line {
            number: self.line,
            starts_with_blank: matches!(self.peek(), Some(b' ' | b'\t')),
            fields: Vec::new(),
        };
        let mut in_parens = false;

        while let Some(octet) = self.peek() {
            match octet {
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b';' => self.skip_comment(),
                b'\n' => {
                    self.pos += 1;
                    self.line += 1;
                    if !in_parens {
                        return Ok(Some(line));
                    }
                }
                b'(' if in_parens => return Err(self.error(ErrorKind::NestedParens)),
                b'(' => {
                    in_parens = true;
                    self.pos += 1;
                }
                b')' if !in_parens => return Err(self.error(ErrorKind::UnmatchedCloseParen)),
                b')' => {
                    in_parens = false;
                    self.pos += 1;
                }
                b'"' => line.fields.push(self.quoted_field()?),
                _ => line.fields.push(self.unquoted_field()?),
            }
        }

        if in_parens {
            Err(Error::new(line.number, ErrorKind::EofBeforeCloseParen))
        } else {
            Ok(Some(line))
        }
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn error(&self, kind: ErrorKind) -> Error {
        Error::new(self.line, kind)
    }

    fn skip_comment(&mut self) {
        while !matches!(self.peek(), None | Some(b'\n')) {
            self.pos += 1;
        }
    }

    fn unquoted_field(&mut self) -> Result<Field<'a>> {
        let start = self.pos;
        while let Some(octet) = self.peek() {
            match octet {
                b' ' | b'\t' | b'\r' | b'\n' | b';' | b'(' | b')' | b'"' => break,
                b'\\' => self.skip_escaped()?,
                _ => self.pos += 1,
            }
        }
        Ok(Field {
            text: &self.text[start..self.pos],
            quoted: false,
        })
    }

    /// Reads a quoted field. The closing quote ends the field even if
    /// no separator follows it.
    fn quoted_field(&mut self) -> Result<Field<'a>> {
        let start_line = self.line;
        self.pos += 1;
        let start = self.pos;
        loop {
            match self.peek() {
                None => return Err(Error::new(start_line, ErrorKind::EofInQuotedString)),
                Some(b'"') => break,
                Some(b'\\') => self.skip_escaped()?,
                Some(b'\n') => {
                    self.line += 1;
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
        let text = &self.text[start..self.pos];
        self.pos += 1;
        Ok(Field { text, quoted: true })
    }

    /// Skips a backslash and the character after it.
    fn skip_escaped(&mut self) -> Result<()> {
        self.pos += 1;
        match self.text[self.pos..].chars().next() {
            Some(c) => {
                if c == '\n' {
                    self.line += 1;
                }
                self.pos += c.len_utf8();
                Ok(())
            }
            None => Err(self.error(ErrorKind::EofInEscape)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(line: &Line<'a>) -> Vec<&'a str> {
        line.fields.iter().map(|f| f.text).collect()
    }

    #[test]
    fn splits_fields_and_lines() {
        let mut lexer = Lexer::new("www IN A 10.0.0.1 ; comment\n  IN TXT \"a b\"\n");
        let first = lexer.next_line().unwrap().unwrap();
        assert_eq!(first.number, 1);
        assert!(!first.starts_with_blank);
        assert_eq!(texts(&first), ["www", "IN", "A", "10.0.0.1"]);
        let second = lexer.next_line().unwrap().unwrap();
        assert_eq!(second.number, 2);
        assert!(second.starts_with_blank);
        assert_eq!(texts(&second), ["IN", "TXT", "a b"]);
        assert!(second.fields[2].quoted);
        assert!(lexer.next_line().unwrap().is_none());
    }

    #[test]
    fn parentheses_continue_lines() {
        let mut lexer = Lexer::new("@ SOA ns admin (\n 1 ; serial\n 2 3 4 5 )\nnext A 1.2.3.4");
        let line = lexer.next_line().unwrap().unwrap();
        assert_eq!(texts(&line), ["@", "SOA", "ns", "admin", "1", "2", "3", "4", "5"]);
        let line = lexer.next_line().unwrap().unwrap();
        assert_eq!(line.number, 4);
        assert_eq!(texts(&line), ["next", "A", "1.2.3.4"]);
    }

    #[test]
    fn escapes_do_not_end_fields() {
        let mut lexer = Lexer::new("a\\ b \"c\\\"d\" \\#");
        let line = lexer.next_line().unwrap().unwrap();
        assert_eq!(texts(&line), ["a\\ b", "c\\\"d", "\\#"]);
        assert!(line.fields[2].is_backslash_hash());
    }

    #[test]
    fn unbalanced_parentheses_are_errors() {
        let err = Lexer::new("a (\nb\n").next_line().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::EofBeforeCloseParen);
        assert_eq!(err.line(), 1);
        let err = Lexer::new("a )").next_line().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnmatchedCloseParen);
        let err = Lexer::new("a ( ( b )").next_line().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::NestedParens);
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let mut lexer = Lexer::new("\n\"abc");
        assert!(lexer.next_line().unwrap().unwrap().fields.is_empty());
        let err = lexer.next_line().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::EofInQuotedString);
        assert_eq!(err.line(), 2);
    }
}
