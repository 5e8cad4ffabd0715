use tracing::trace;

use crate::errors::{CompileError, CompileResult};

mod lexemes;

#[cfg(test)]
mod scanner_tests;

pub use lexemes::LogoLexemes;

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub lexeme: LogoLexemes,
    pub text: &'a str,
    pub line: u32,
}

// anything the parser can pull tokens from
pub trait TokenStream<'a> {
    fn peek_nth(&mut self, n: usize) -> CompileResult<Option<&Token<'a>>>;
    fn advance(&mut self) -> CompileResult<Option<Token<'a>>>;

    fn peek(&mut self) -> CompileResult<Option<&Token<'a>>> {
        self.peek_nth(0)
    }

    // line of the next token, or of the last line seen at EOF
    fn line(&mut self) -> u32;
}

/// Maximal-munch scanner over LogoASM source text.
pub struct Scanner<'a> {
    input: &'a str,
    cursor: usize,
    line: u32,
    lookahead: Vec<Token<'a>>,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            cursor: 0,
            line: 1,
            lookahead: Vec::new(),
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.input.as_bytes()
    }

    fn current(&self) -> Option<u8> {
        self.bytes().get(self.cursor).copied()
    }

    fn skip_ignored(&mut self) {
        while let Some(c) = self.current() {
            match c {
                b' ' | b'\t' | b'\r' => self.cursor += 1,
                b'\n' => {
                    self.line += 1;
                    self.cursor += 1;
                }
                b'#' => {
                    let start = self.cursor;
                    while self.current().is_some_and(|c| c != b'\n') {
                        self.cursor += 1;
                    }
                    trace!("comment:{}:'{}'", self.line, &self.input[start..self.cursor]);
                }
                _ => break,
            }
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.current().is_some_and(&pred) {
            self.cursor += 1;
        }
    }

    fn lookahead_byte(&self, offset: usize) -> Option<u8> {
        self.bytes().get(self.cursor + offset).copied()
    }

    fn invalid_character(&self) -> CompileError {
        let ch = self.input[self.cursor..].chars().next().unwrap_or('\0');
        CompileError::InvalidCharacter {
            line: self.line,
            ch,
        }
    }

    // scans one token from the raw input, ignoring the lookahead buffer
    fn next_word(&mut self) -> CompileResult<Option<Token<'a>>> {
        self.skip_ignored();
        let Some(c) = self.current() else {
            return Ok(None);
        };

        let start = self.cursor;
        let line = self.line;
        let is_word_start = |c: u8| c == b'_' || c.is_ascii_alphabetic();
        let is_word = |c: u8| c == b'_' || c.is_ascii_alphanumeric();

        let lexeme = match c {
            c if is_word_start(c) => {
                self.take_while(is_word);
                LogoLexemes::classify_word(&self.input[start..self.cursor])
            }
            b':' => {
                if !self.lookahead_byte(1).is_some_and(is_word_start) {
                    return Err(self.invalid_character());
                }
                self.cursor += 1;
                self.take_while(is_word);
                let identifier = &self.input[start + 1..self.cursor];
                if LogoLexemes::classify_word(identifier).is_reserved() {
                    return Err(CompileError::InvalidIdentifier {
                        line,
                        identifier: identifier.to_string(),
                    });
                }
                LogoLexemes::ColonIdentifier
            }
            c if c.is_ascii_digit() => {
                self.take_while(|c| c.is_ascii_digit());
                if self.current() == Some(b'.') {
                    self.cursor += 1;
                    self.take_while(|c| c.is_ascii_digit());
                }
                LogoLexemes::Number
            }
            b'\'' | b'"' => {
                let quote = c;
                self.cursor += 1;
                self.take_while(|c| c != quote);
                if self.current() != Some(quote) {
                    self.cursor = start;
                    return Err(self.invalid_character());
                }
                self.cursor += 1;
                // strings may span lines
                let newlines = self.input[start..self.cursor].matches('\n').count() as u32;
                self.line += newlines;
                LogoLexemes::StringConst
            }
            b'=' | b'<' | b'>' => {
                self.cursor += 1;
                match (c, self.current()) {
                    (b'=', Some(b'=')) | (b'<', Some(b'>')) | (b'<', Some(b'=')) | (b'>', Some(b'=')) => {
                        self.cursor += 1;
                        LogoLexemes::RelOp
                    }
                    (b'=', _) => LogoLexemes::AssignOp,
                    _ => LogoLexemes::RelOp,
                }
            }
            b'+' | b'-' | b'*' | b'/' => {
                self.cursor += 1;
                if self.current() == Some(b'=') {
                    self.cursor += 1;
                    LogoLexemes::AssignOp
                } else if c == b'+' || c == b'-' {
                    LogoLexemes::AddOp
                } else {
                    LogoLexemes::MulOp
                }
            }
            b'%' => {
                self.cursor += 1;
                LogoLexemes::MulOp
            }
            b'^' => {
                self.cursor += 1;
                LogoLexemes::PwrOp
            }
            b'(' => {
                self.cursor += 1;
                LogoLexemes::LParen
            }
            b')' => {
                self.cursor += 1;
                LogoLexemes::RParen
            }
            _ => return Err(self.invalid_character()),
        };

        let text = &self.input[start..self.cursor];
        trace!("{}:{}:'{}'", lexeme, line, text);
        Ok(Some(Token { lexeme, text, line }))
    }

    /// Scans the whole input; only used by tests and tooling.
    pub fn tokenize(mut self) -> CompileResult<Vec<Token<'a>>> {
        let mut tokens = Vec::new();
        while let Some(tok) = self.advance()? {
            tokens.push(tok);
        }
        Ok(tokens)
    }
}

impl<'a> TokenStream<'a> for Scanner<'a> {
    fn peek_nth(&mut self, n: usize) -> CompileResult<Option<&Token<'a>>> {
        while self.lookahead.len() <= n {
            match self.next_word()? {
                Some(tok) => self.lookahead.push(tok),
                None => break,
            }
        }
        Ok(self.lookahead.get(n))
    }

    fn advance(&mut self) -> CompileResult<Option<Token<'a>>> {
        if self.lookahead.is_empty() {
            self.next_word()
        } else {
            Ok(Some(self.lookahead.remove(0)))
        }
    }

    fn line(&mut self) -> u32 {
        match self.lookahead.first() {
            Some(tok) => tok.line,
            None => self.line,
        }
    }
}
