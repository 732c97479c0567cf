//! Recursive-descent parser producing the typed request tree.

use super::ParseError;
use super::ast::*;
use super::token::{Keyword, Lexer, Token, TokenKind};
use crate::value::{ColumnType, Value};

/// Parse one statement of the dialect. A trailing semicolon is optional.
pub fn parse(input: &str) -> Result<Request, ParseError> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let request = parser.parse_statement()?;
    parser.eat(&TokenKind::Semicolon);
    parser.expect_eof()?;
    Ok(request)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // tokenize() always terminates the stream with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    /// Consume the token if it matches; report whether it did.
    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: Keyword) -> bool {
        self.eat(&TokenKind::Keyword(kw))
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<Token, ParseError> {
        if &self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_keyword(&mut self, kw: Keyword, what: &str) -> Result<(), ParseError> {
        self.expect(&TokenKind::Keyword(kw), what).map(|_| ())
    }

    fn expect_eof(&mut self) -> Result<(), ParseError> {
        if self.peek().kind == TokenKind::Eof {
            Ok(())
        } else {
            Err(self.unexpected("end of statement"))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek().kind.clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError::new(
            format!("expected {expected}, found {:?}", token.kind),
            token.offset,
        )
    }

    fn parse_statement(&mut self) -> Result<Request, ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Keyword(Keyword::Create) => self.parse_create(),
            TokenKind::Keyword(Keyword::Insert) => self.parse_insert(),
            TokenKind::Keyword(Keyword::Select) => self.parse_select(),
            TokenKind::Keyword(Keyword::Update) => self.parse_update(),
            TokenKind::Keyword(Keyword::Delete) => self.parse_delete(),
            other => Err(ParseError::new(
                format!("unknown command, found {other:?}"),
                token.offset,
            )),
        }
    }

    // CREATE TABLE <ident> ( <col_def> (, <col_def>)* )
    fn parse_create(&mut self) -> Result<Request, ParseError> {
        self.expect_keyword(Keyword::Table, "TABLE after CREATE")?;
        let table = self.expect_ident("table name")?;
        self.expect(&TokenKind::LParen, "'(' before column definitions")?;

        let mut columns = Vec::new();
        loop {
            columns.push(self.parse_column_def()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen, "')' after column definitions")?;
        Ok(Request::CreateTable(CreateTable { table, columns }))
    }

    // col_def := <ident> <type> [PRIMARY KEY] [AUTO_INCREMENT] [UNIQUE]
    fn parse_column_def(&mut self) -> Result<ColumnSpec, ParseError> {
        let name = self.expect_ident("column name")?;
        let ty = self.parse_column_type()?;
        let mut spec = ColumnSpec::new(name, ty);

        loop {
            if self.eat_keyword(Keyword::Primary) {
                self.expect_keyword(Keyword::Key, "KEY after PRIMARY")?;
                spec.primary_key = true;
            } else if self.eat_keyword(Keyword::AutoIncrement) {
                spec.auto_increment = true;
            } else if self.eat_keyword(Keyword::Unique) {
                spec.unique = true;
            } else {
                return Ok(spec);
            }
        }
    }

    fn parse_column_type(&mut self) -> Result<ColumnType, ParseError> {
        let token = self.peek().clone();
        let ty = match token.kind {
            TokenKind::Keyword(Keyword::Int) => ColumnType::Int,
            TokenKind::Keyword(Keyword::Text) => ColumnType::Text,
            TokenKind::Keyword(Keyword::Bool) => ColumnType::Bool,
            TokenKind::Keyword(Keyword::Float) => ColumnType::Float,
            TokenKind::Ident(name) => {
                return Err(ParseError::new(
                    format!(
                        "unsupported data type '{name}', supported types: {}",
                        ColumnType::supported()
                    ),
                    token.offset,
                ));
            }
            _ => return Err(self.unexpected("column type")),
        };
        self.advance();
        Ok(ty)
    }

    // INSERT INTO <ident> VALUES ( <value> (, <value>)* )
    fn parse_insert(&mut self) -> Result<Request, ParseError> {
        self.expect_keyword(Keyword::Into, "INTO after INSERT")?;
        let table = self.expect_ident("table name")?;
        self.expect_keyword(Keyword::Values, "VALUES")?;
        self.expect(&TokenKind::LParen, "'(' before values")?;

        let mut values = Vec::new();
        loop {
            values.push(self.parse_value()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen, "')' after values")?;
        Ok(Request::Insert(Insert { table, values }))
    }

    /// Literal grammar: NULL, TRUE/FALSE, integer, decimal, quoted string.
    /// A bare identifier in value position falls back to a string literal.
    fn parse_value(&mut self) -> Result<Value, ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Keyword(Keyword::Null) => Ok(Value::Null),
            TokenKind::Keyword(Keyword::True) => Ok(Value::Bool(true)),
            TokenKind::Keyword(Keyword::False) => Ok(Value::Bool(false)),
            TokenKind::Int(i) => Ok(Value::Int(i)),
            TokenKind::Float(f) => Ok(Value::Float(f)),
            TokenKind::Str(s) => Ok(Value::Text(s)),
            TokenKind::Ident(s) => Ok(Value::Text(s)),
            TokenKind::Minus => {
                let token = self.advance();
                match token.kind {
                    TokenKind::Int(i) => Ok(Value::Int(-i)),
                    TokenKind::Float(f) => Ok(Value::Float(-f)),
                    other => Err(ParseError::new(
                        format!("expected number after '-', found {other:?}"),
                        token.offset,
                    )),
                }
            }
            other => Err(ParseError::new(
                format!("expected value, found {other:?}"),
                token.offset,
            )),
        }
    }

    // SELECT <projection> FROM <ident> (JOIN ...)* [WHERE <predicate>]
    fn parse_select(&mut self) -> Result<Request, ParseError> {
        let columns = self.parse_projection()?;
        self.expect_keyword(Keyword::From, "FROM")?;
        let table = self.expect_ident("table name")?;

        let mut joins = Vec::new();
        while self.eat_keyword(Keyword::Join) {
            joins.push(self.parse_join()?);
        }

        let conditions = self.parse_where()?;
        Ok(Request::Select(Select {
            table,
            columns,
            joins,
            conditions,
        }))
    }

    /// `*` parses to the empty list, meaning every column.
    fn parse_projection(&mut self) -> Result<Vec<String>, ParseError> {
        if self.eat(&TokenKind::Star) {
            return Ok(Vec::new());
        }
        let mut columns = Vec::new();
        loop {
            columns.push(self.parse_column_ref()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(columns)
    }

    /// `<ident>` or qualified `<ident>.<ident>`, flattened to one string.
    fn parse_column_ref(&mut self) -> Result<String, ParseError> {
        let first = self.expect_ident("column name")?;
        if self.eat(&TokenKind::Dot) {
            let second = self.expect_ident("column name after '.'")?;
            Ok(format!("{first}.{second}"))
        } else {
            Ok(first)
        }
    }

    // JOIN <ident> ON <ident>.<ident> = <ident>.<ident>
    fn parse_join(&mut self) -> Result<Join, ParseError> {
        let table = self.expect_ident("table name after JOIN")?;
        self.expect_keyword(Keyword::On, "ON")?;
        let (left_table, left_column) = self.parse_qualified_ref()?;
        self.expect(&TokenKind::Eq, "'=' in join condition")?;
        let (right_table, right_column) = self.parse_qualified_ref()?;
        Ok(Join {
            table,
            on: JoinOn {
                left_table,
                left_column,
                right_table,
                right_column,
            },
        })
    }

    fn parse_qualified_ref(&mut self) -> Result<(String, String), ParseError> {
        let table = self.expect_ident("qualified column reference")?;
        self.expect(&TokenKind::Dot, "'.' in qualified column reference")?;
        let column = self.expect_ident("column name after '.'")?;
        Ok((table, column))
    }

    // [WHERE <ident> = <value> | <ident> LIKE <string>]
    fn parse_where(&mut self) -> Result<Vec<Condition>, ParseError> {
        if !self.eat_keyword(Keyword::Where) {
            return Ok(Vec::new());
        }
        let column = self.parse_column_ref()?;
        if self.eat_keyword(Keyword::Like) {
            let token = self.advance();
            match token.kind {
                TokenKind::Str(pattern) => Ok(vec![Condition::like(column, pattern)]),
                other => Err(ParseError::new(
                    format!("expected string pattern after LIKE, found {other:?}"),
                    token.offset,
                )),
            }
        } else {
            self.expect(&TokenKind::Eq, "'=' or LIKE in WHERE clause")?;
            let value = self.parse_value()?;
            Ok(vec![Condition::equals(column, value)])
        }
    }

    // UPDATE <ident> SET <ident> = <value> (, ...)* [WHERE <predicate>]
    fn parse_update(&mut self) -> Result<Request, ParseError> {
        let table = self.expect_ident("table name after UPDATE")?;
        self.expect_keyword(Keyword::Set, "SET")?;

        let mut assignments = Vec::new();
        loop {
            let column = self.expect_ident("column name in SET")?;
            self.expect(&TokenKind::Eq, "'=' in assignment")?;
            let value = self.parse_value()?;
            assignments.push((column, value));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        let conditions = self.parse_where()?;
        Ok(Request::Update(Update {
            table,
            assignments,
            conditions,
        }))
    }

    // DELETE FROM <ident> [WHERE <predicate>]
    fn parse_delete(&mut self) -> Result<Request, ParseError> {
        self.expect_keyword(Keyword::From, "FROM after DELETE")?;
        let table = self.expect_ident("table name")?;
        let conditions = self.parse_where()?;
        Ok(Request::Delete(Delete {
            table,
            conditions,
        }))
    }
}
