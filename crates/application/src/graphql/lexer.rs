use std::fmt;

use super::ast::Pos;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Bang,
    Dollar,
    Amp,
    ParenL,
    ParenR,
    Spread,
    Colon,
    Equals,
    At,
    BracketL,
    BracketR,
    BraceL,
    Pipe,
    BraceR,
    Name(String),
    Int(String),
    Float(String),
    String(String),
    BlockString(String),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let punct = match self {
            TokenKind::Bang => "!",
            TokenKind::Dollar => "$",
            TokenKind::Amp => "&",
            TokenKind::ParenL => "(",
            TokenKind::ParenR => ")",
            TokenKind::Spread => "...",
            TokenKind::Colon => ":",
            TokenKind::Equals => "=",
            TokenKind::At => "@",
            TokenKind::BracketL => "[",
            TokenKind::BracketR => "]",
            TokenKind::BraceL => "{",
            TokenKind::Pipe => "|",
            TokenKind::BraceR => "}",
            TokenKind::Name(name) => return write!(f, "Name \"{}\"", name),
            TokenKind::Int(raw) => return write!(f, "Int \"{}\"", raw),
            TokenKind::Float(raw) => return write!(f, "Float \"{}\"", raw),
            TokenKind::String(s) | TokenKind::BlockString(s) => {
                return write!(f, "String {:?}", s)
            }
            TokenKind::Eof => return f.write_str("<EOF>"),
        };
        write!(f, "\"{}\"", punct)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub pos: Pos,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, pos: Pos) -> Self {
        Self {
            message: message.into(),
            pos,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Syntax Error: {}", self.message)
    }
}

impl std::error::Error for SyntaxError {}

pub struct Lexer {
    chars: Vec<char>,
    index: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    fn pos(&self) -> Pos {
        Pos::new(self.line, self.column)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.index += 1;
        match c {
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            '\r' => {
                if self.peek() != Some('\n') {
                    self.line += 1;
                    self.column = 1;
                }
            }
            _ => self.column += 1,
        }
        Some(c)
    }

    fn skip_ignored(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\n' | '\r' | ',' | '\u{feff}' => {
                    self.bump();
                }
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' || c == '\r' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, SyntaxError> {
        self.skip_ignored();
        let pos = self.pos();

        let Some(c) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                pos,
            });
        };

        let kind = match c {
            '!' => self.single(TokenKind::Bang),
            '$' => self.single(TokenKind::Dollar),
            '&' => self.single(TokenKind::Amp),
            '(' => self.single(TokenKind::ParenL),
            ')' => self.single(TokenKind::ParenR),
            ':' => self.single(TokenKind::Colon),
            '=' => self.single(TokenKind::Equals),
            '@' => self.single(TokenKind::At),
            '[' => self.single(TokenKind::BracketL),
            ']' => self.single(TokenKind::BracketR),
            '{' => self.single(TokenKind::BraceL),
            '|' => self.single(TokenKind::Pipe),
            '}' => self.single(TokenKind::BraceR),
            '.' => {
                if self.peek_at(1) == Some('.') && self.peek_at(2) == Some('.') {
                    self.bump();
                    self.bump();
                    self.bump();
                    TokenKind::Spread
                } else {
                    return Err(SyntaxError::new("Unexpected character \".\".", pos));
                }
            }
            '"' => {
                if self.peek_at(1) == Some('"') && self.peek_at(2) == Some('"') {
                    self.read_block_string(pos)?
                } else {
                    self.read_string(pos)?
                }
            }
            '-' | '0'..='9' => self.read_number()?,
            c if is_name_start(c) => self.read_name(),
            other => {
                return Err(SyntaxError::new(
                    format!("Unexpected character {:?}.", other),
                    pos,
                ))
            }
        };

        Ok(Token { kind, pos })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    fn read_name(&mut self) -> TokenKind {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if !is_name_continue(c) {
                break;
            }
            name.push(c);
            self.bump();
        }
        TokenKind::Name(name)
    }

    fn read_digits(&mut self, raw: &mut String) -> Result<(), SyntaxError> {
        match self.peek() {
            Some(c) if c.is_ascii_digit() => {}
            other => return Err(self.digit_expected(other)),
        }
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            raw.push(c);
            self.bump();
        }
        Ok(())
    }

    fn digit_expected(&self, found: Option<char>) -> SyntaxError {
        let found = found.map_or_else(|| "<EOF>".to_string(), |c| format!("{:?}", c));
        SyntaxError::new(
            format!("Invalid number, expected digit but got: {}.", found),
            self.pos(),
        )
    }

    fn read_number(&mut self) -> Result<TokenKind, SyntaxError> {
        let mut raw = String::new();
        let mut is_float = false;

        if self.peek() == Some('-') {
            raw.push('-');
            self.bump();
        }

        if self.peek() == Some('0') {
            raw.push('0');
            self.bump();
            if let Some(c) = self.peek().filter(char::is_ascii_digit) {
                return Err(SyntaxError::new(
                    format!("Invalid number, unexpected digit after 0: {:?}.", c),
                    self.pos(),
                ));
            }
        } else {
            self.read_digits(&mut raw)?;
        }

        if self.peek() == Some('.') {
            is_float = true;
            raw.push('.');
            self.bump();
            self.read_digits(&mut raw)?;
        }

        if let Some(e @ ('e' | 'E')) = self.peek() {
            is_float = true;
            raw.push(e);
            self.bump();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                raw.push(sign);
                self.bump();
            }
            self.read_digits(&mut raw)?;
        }

        if let Some(c) = self.peek() {
            if c == '.' || is_name_start(c) {
                return Err(self.digit_expected(Some(c)));
            }
        }

        Ok(if is_float {
            TokenKind::Float(raw)
        } else {
            TokenKind::Int(raw)
        })
    }

    fn read_string(&mut self, start: Pos) -> Result<TokenKind, SyntaxError> {
        self.bump();
        let mut value = String::new();

        loop {
            let Some(c) = self.peek() else {
                return Err(SyntaxError::new("Unterminated string.", start));
            };
            match c {
                '"' => {
                    self.bump();
                    return Ok(TokenKind::String(value));
                }
                '\n' | '\r' => return Err(SyntaxError::new("Unterminated string.", start)),
                '\\' => {
                    let escape_pos = self.pos();
                    self.bump();
                    let escaped = match self.bump() {
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('/') => '/',
                        Some('b') => '\u{0008}',
                        Some('f') => '\u{000c}',
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some('u') => self.read_unicode_escape(escape_pos)?,
                        Some(other) => {
                            return Err(SyntaxError::new(
                                format!("Invalid character escape sequence: \\{}.", other),
                                escape_pos,
                            ))
                        }
                        None => return Err(SyntaxError::new("Unterminated string.", start)),
                    };
                    value.push(escaped);
                }
                _ => {
                    value.push(c);
                    self.bump();
                }
            }
        }
    }

    fn read_unicode_escape(&mut self, escape_pos: Pos) -> Result<char, SyntaxError> {
        let mut hex = String::with_capacity(4);
        for _ in 0..4 {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    hex.push(c);
                    self.bump();
                }
                _ => {
                    return Err(SyntaxError::new(
                        format!("Invalid Unicode escape sequence: \\u{}.", hex),
                        escape_pos,
                    ))
                }
            }
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| {
                SyntaxError::new(
                    format!("Invalid Unicode escape sequence: \\u{}.", hex),
                    escape_pos,
                )
            })
    }

    fn read_block_string(&mut self, start: Pos) -> Result<TokenKind, SyntaxError> {
        for _ in 0..3 {
            self.bump();
        }
        let mut raw = String::new();

        loop {
            match self.peek() {
                None => return Err(SyntaxError::new("Unterminated string.", start)),
                Some('"') if self.peek_at(1) == Some('"') && self.peek_at(2) == Some('"') => {
                    for _ in 0..3 {
                        self.bump();
                    }
                    return Ok(TokenKind::BlockString(block_string_value(&raw)));
                }
                Some('\\')
                    if self.peek_at(1) == Some('"')
                        && self.peek_at(2) == Some('"')
                        && self.peek_at(3) == Some('"') =>
                {
                    for _ in 0..4 {
                        self.bump();
                    }
                    raw.push_str("\"\"\"");
                }
                Some(c) => {
                    raw.push(c);
                    self.bump();
                }
            }
        }
    }
}

fn is_name_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_name_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Strips the common indentation and the leading/trailing blank lines of a
/// block string.
fn block_string_value(raw: &str) -> String {
    let lines: Vec<&str> = raw.split("\r\n").flat_map(|l| l.split(['\n', '\r'])).collect();

    let common_indent = lines
        .iter()
        .skip(1)
        .filter_map(|line| {
            let indent = line.len() - line.trim_start_matches([' ', '\t']).len();
            (indent < line.len()).then_some(indent)
        })
        .min()
        .unwrap_or(0);

    let mut out: Vec<&str> = lines
        .iter()
        .enumerate()
        .map(|(i, &line)| {
            if i == 0 {
                line
            } else if line.len() < common_indent {
                line.trim_start_matches([' ', '\t'])
            } else {
                &line[common_indent..]
            }
        })
        .collect();

    while out.first().is_some_and(|l| l.trim_matches([' ', '\t']).is_empty()) {
        out.remove(0);
    }
    while out.last().is_some_and(|l| l.trim_matches([' ', '\t']).is_empty()) {
        out.pop();
    }

    out.join("\n")
}
