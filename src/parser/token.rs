//! Hand-written lexer for the SQL-like dialect.

use super::ParseError;

/// Keywords of the dialect. Matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Create,
    Table,
    Insert,
    Into,
    Values,
    Select,
    From,
    Where,
    Join,
    On,
    Like,
    Update,
    Set,
    Delete,
    Primary,
    Key,
    AutoIncrement,
    Unique,
    Null,
    True,
    False,
    Int,
    Text,
    Bool,
    Float,
}

impl Keyword {
    /// Both `AUTO_INCREMENT` and `AUTOINCREMENT` spell the same keyword.
    pub fn from_ident(ident: &str) -> Option<Self> {
        let kw = match ident.to_ascii_uppercase().as_str() {
            "CREATE" => Self::Create,
            "TABLE" => Self::Table,
            "INSERT" => Self::Insert,
            "INTO" => Self::Into,
            "VALUES" => Self::Values,
            "SELECT" => Self::Select,
            "FROM" => Self::From,
            "WHERE" => Self::Where,
            "JOIN" => Self::Join,
            "ON" => Self::On,
            "LIKE" => Self::Like,
            "UPDATE" => Self::Update,
            "SET" => Self::Set,
            "DELETE" => Self::Delete,
            "PRIMARY" => Self::Primary,
            "KEY" => Self::Key,
            "AUTO_INCREMENT" | "AUTOINCREMENT" => Self::AutoIncrement,
            "UNIQUE" => Self::Unique,
            "NULL" => Self::Null,
            "TRUE" => Self::True,
            "FALSE" => Self::False,
            "INT" => Self::Int,
            "TEXT" => Self::Text,
            "BOOL" => Self::Bool,
            "FLOAT" => Self::Float,
            _ => return None,
        };
        Some(kw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Keyword(Keyword),
    Ident(String),
    Int(i64),
    Float(f64),
    /// Quoted string with escapes already resolved.
    Str(String),
    LParen,
    RParen,
    Comma,
    Semicolon,
    Dot,
    Eq,
    Star,
    Minus,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token start, for error messages.
    pub offset: usize,
}

/// Single-pass lexer over the statement text.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    start: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token {
            kind,
            offset: self.start,
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.start)
    }

    fn scan_ident(&mut self) -> Token {
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        let text = &self.input[self.start..self.pos];
        match Keyword::from_ident(text) {
            Some(kw) => self.make_token(TokenKind::Keyword(kw)),
            None => self.make_token(TokenKind::Ident(text.to_string())),
        }
    }

    fn scan_number(&mut self) -> Result<Token, ParseError> {
        let mut is_float = false;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        // A dot only belongs to the number when a digit follows; otherwise
        // it is the qualification dot of `table.column`.
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = &self.input[self.start..self.pos];
        if is_float {
            text.parse::<f64>()
                .map(|f| self.make_token(TokenKind::Float(f)))
                .map_err(|_| self.error(format!("invalid decimal literal '{text}'")))
        } else {
            text.parse::<i64>()
                .map(|i| self.make_token(TokenKind::Int(i)))
                .map_err(|_| self.error(format!("invalid integer literal '{text}'")))
        }
    }

    /// Scan a `'...'` or `"..."` literal. Backslash escapes the enclosing
    /// quote (and itself); any other escape is kept verbatim.
    fn scan_string(&mut self, quote: char) -> Result<Token, ParseError> {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.advance() {
                Some('\\') => match self.peek() {
                    Some(c) if c == quote || c == '\\' => {
                        value.push(c);
                        self.advance();
                    }
                    _ => value.push('\\'),
                },
                Some(c) if c == quote => return Ok(self.make_token(TokenKind::Str(value))),
                Some(c) => value.push(c),
                None => return Err(self.error("unterminated string literal")),
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
        self.start = self.pos;

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(self.make_token(TokenKind::Eof)),
        };

        match c {
            '(' => {
                self.advance();
                Ok(self.make_token(TokenKind::LParen))
            }
            ')' => {
                self.advance();
                Ok(self.make_token(TokenKind::RParen))
            }
            ',' => {
                self.advance();
                Ok(self.make_token(TokenKind::Comma))
            }
            ';' => {
                self.advance();
                Ok(self.make_token(TokenKind::Semicolon))
            }
            '.' => {
                self.advance();
                Ok(self.make_token(TokenKind::Dot))
            }
            '=' => {
                self.advance();
                Ok(self.make_token(TokenKind::Eq))
            }
            '*' => {
                self.advance();
                Ok(self.make_token(TokenKind::Star))
            }
            '-' => {
                self.advance();
                Ok(self.make_token(TokenKind::Minus))
            }
            '\'' | '"' => self.scan_string(c),
            c if c.is_ascii_digit() => self.scan_number(),
            c if c.is_alphabetic() || c == '_' => Ok(self.scan_ident()),
            other => {
                self.advance();
                Err(self.error(format!("unexpected character '{other}'")))
            }
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}
