// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! SQL parser for the local engine
//!
//! Covers the ClickHouse statements the driver exercises: database and table
//! DDL, `INSERT ... VALUES`, single-table `SELECT` and `SHOW`. Keywords are
//! case-insensitive; identifiers are case-sensitive and may be quoted with
//! backticks or double quotes.

use super::error::{SqlError, SqlResult};
use super::types::DataType;
use crate::engine::OutputFormat;
use crate::value::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Unquoted identifier or keyword
    Word(String),
    /// Backtick or double-quoted identifier
    Quoted(String),
    Number(String),
    Text(Vec<u8>),
    LeftParen,
    RightParen,
    Comma,
    Semicolon,
    Dot,
    Asterisk,
    Plus,
    Minus,
    Slash,
    Percent,
    Equal,
    NotEqual,
    Less,
    LessEq,
    Greater,
    GreaterEq,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => write!(f, "{}", w),
            Token::Quoted(w) => write!(f, "`{}`", w),
            Token::Number(n) => write!(f, "{}", n),
            Token::Text(t) => write!(f, "'{}'", String::from_utf8_lossy(t)),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::Dot => write!(f, "."),
            Token::Asterisk => write!(f, "*"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::Equal => write!(f, "="),
            Token::NotEqual => write!(f, "!="),
            Token::Less => write!(f, "<"),
            Token::LessEq => write!(f, "<="),
            Token::Greater => write!(f, ">"),
            Token::GreaterEq => write!(f, ">="),
        }
    }
}

/// Split SQL text into tokens, dropping whitespace and comments
pub fn tokenize(sql: &str) -> SqlResult<Vec<Token>> {
    let bytes = sql.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\n' | b'\r' => i += 1,
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = sql[i + 2..]
                    .find("*/")
                    .ok_or_else(|| SqlError::Syntax("unterminated block comment".to_string()))?;
                i += end + 4;
            }
            b'(' => push(&mut tokens, &mut i, Token::LeftParen),
            b')' => push(&mut tokens, &mut i, Token::RightParen),
            b',' => push(&mut tokens, &mut i, Token::Comma),
            b';' => push(&mut tokens, &mut i, Token::Semicolon),
            b'.' if !bytes.get(i + 1).is_some_and(u8::is_ascii_digit) => {
                push(&mut tokens, &mut i, Token::Dot)
            }
            b'*' => push(&mut tokens, &mut i, Token::Asterisk),
            b'+' => push(&mut tokens, &mut i, Token::Plus),
            b'-' => push(&mut tokens, &mut i, Token::Minus),
            b'/' => push(&mut tokens, &mut i, Token::Slash),
            b'%' => push(&mut tokens, &mut i, Token::Percent),
            b'=' => {
                // `==` is accepted as equality
                let width = if bytes.get(i + 1) == Some(&b'=') { 2 } else { 1 };
                tokens.push(Token::Equal);
                i += width;
            }
            b'!' if bytes.get(i + 1) == Some(&b'=') => {
                tokens.push(Token::NotEqual);
                i += 2;
            }
            b'<' => match bytes.get(i + 1) {
                Some(b'=') => {
                    tokens.push(Token::LessEq);
                    i += 2;
                }
                Some(b'>') => {
                    tokens.push(Token::NotEqual);
                    i += 2;
                }
                _ => push(&mut tokens, &mut i, Token::Less),
            },
            b'>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::GreaterEq);
                    i += 2;
                } else {
                    push(&mut tokens, &mut i, Token::Greater);
                }
            }
            b'\'' => {
                let (text, end) = string_literal(bytes, i)?;
                tokens.push(Token::Text(text));
                i = end;
            }
            b'`' | b'"' => {
                let (raw, end) = quoted_identifier(bytes, i, c)?;
                tokens.push(Token::Quoted(raw));
                i = end;
            }
            b'0'..=b'9' | b'.' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                    let mut j = i + 1;
                    if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                        j += 1;
                    }
                    if j < bytes.len() && bytes[j].is_ascii_digit() {
                        i = j;
                        while i < bytes.len() && bytes[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Number(sql[start..i].to_string()));
            }
            c if c.is_ascii_alphabetic() || c == b'_' || c >= 0x80 => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] >= 0x80)
                {
                    i += 1;
                }
                tokens.push(Token::Word(sql[start..i].to_string()));
            }
            other => {
                return Err(SqlError::Syntax(format!(
                    "unexpected character '{}' at position {}",
                    other as char, i
                )))
            }
        }
    }
    Ok(tokens)
}

fn push(tokens: &mut Vec<Token>, i: &mut usize, token: Token) {
    tokens.push(token);
    *i += 1;
}

/// Unescape a single-quoted literal starting at `start`
fn string_literal(bytes: &[u8], start: usize) -> SqlResult<(Vec<u8>, usize)> {
    let mut out = Vec::new();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' if bytes.get(i + 1) == Some(&b'\'') => {
                out.push(b'\'');
                i += 2;
            }
            b'\'' => return Ok((out, i + 1)),
            b'\\' => {
                let escaped = *bytes
                    .get(i + 1)
                    .ok_or_else(|| SqlError::Syntax("unterminated string literal".to_string()))?;
                i += 2;
                match escaped {
                    b'n' => out.push(b'\n'),
                    b't' => out.push(b'\t'),
                    b'r' => out.push(b'\r'),
                    b'0' => out.push(0),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0C),
                    b'a' => out.push(0x07),
                    b'v' => out.push(0x0B),
                    b'x' => {
                        let hex = bytes
                            .get(i..i + 2)
                            .and_then(|h| std::str::from_utf8(h).ok())
                            .and_then(|h| u8::from_str_radix(h, 16).ok())
                            .ok_or_else(|| SqlError::Syntax("invalid \\x escape".to_string()))?;
                        out.push(hex);
                        i += 2;
                    }
                    other => out.push(other),
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    Err(SqlError::Syntax("unterminated string literal".to_string()))
}

fn quoted_identifier(bytes: &[u8], start: usize, quote: u8) -> SqlResult<(String, usize)> {
    let mut out = Vec::new();
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                out.push(quote);
                i += 2;
                continue;
            }
            let name = String::from_utf8(out)
                .map_err(|_| SqlError::Syntax("identifier is not valid UTF-8".to_string()))?;
            return Ok((name, i + 1));
        }
        out.push(bytes[i]);
        i += 1;
    }
    Err(SqlError::Syntax("unterminated quoted identifier".to_string()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub database: Option<String>,
    pub name: String,
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.database {
            Some(db) => write!(f, "{}.{}", db, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub table: TableRef,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnSpec>,
    pub engine: String,
    pub order_by: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Wildcard,
    Expr { expr: Expr, alias: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: Expr,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub items: Vec<SelectItem>,
    pub from: Option<TableRef>,
    pub filter: Option<Expr>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
    pub offset: u64,
    /// Trailing `FORMAT` clause, overriding the requested output format
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateDatabase { name: String, if_not_exists: bool },
    DropDatabase { name: String, if_exists: bool },
    Use(String),
    CreateTable(CreateTable),
    DropTable { table: TableRef, if_exists: bool },
    Truncate(TableRef),
    Insert {
        table: TableRef,
        columns: Option<Vec<String>>,
        rows: Vec<Vec<Expr>>,
    },
    Select(Select),
    ShowDatabases,
    ShowTables { database: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    And,
    Or,
}

impl BinaryOp {
    /// ClickHouse function name, used for result column names
    pub fn function_name(self) -> &'static str {
        match self {
            BinaryOp::Plus => "plus",
            BinaryOp::Minus => "minus",
            BinaryOp::Multiply => "multiply",
            BinaryOp::Divide => "divide",
            BinaryOp::Modulo => "modulo",
            BinaryOp::Eq => "equals",
            BinaryOp::NotEq => "notEquals",
            BinaryOp::Less => "less",
            BinaryOp::LessEq => "lessOrEquals",
            BinaryOp::Greater => "greater",
            BinaryOp::GreaterEq => "greaterOrEquals",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Less
                | BinaryOp::LessEq
                | BinaryOp::Greater
                | BinaryOp::GreaterEq
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Column(String),
    Negate(Box<Expr>),
    Not(Box<Expr>),
    IsNull { expr: Box<Expr>, negated: bool },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    /// Function call; `count(*)` is stored with no arguments
    Function { name: String, args: Vec<Expr> },
}

pub const AGGREGATES: [&str; 5] = ["count", "sum", "min", "max", "avg"];

impl Expr {
    pub fn is_aggregate(&self) -> bool {
        match self {
            Expr::Function { name, .. } if AGGREGATES.contains(&name.as_str()) => true,
            Expr::Function { args, .. } => args.iter().any(Expr::is_aggregate),
            Expr::Negate(e) | Expr::Not(e) | Expr::IsNull { expr: e, .. } => e.is_aggregate(),
            Expr::Binary { left, right, .. } => left.is_aggregate() || right.is_aggregate(),
            Expr::Literal(_) | Expr::Column(_) => false,
        }
    }

    /// Result column name ClickHouse would give this expression
    pub fn display_name(&self) -> String {
        match self {
            Expr::Literal(Value::String(s)) => format!("'{}'", s.replace('\'', "\\'")),
            Expr::Literal(v) => v.to_string(),
            Expr::Column(name) => name.clone(),
            Expr::Negate(e) => format!("negate({})", e.display_name()),
            Expr::Not(e) => format!("not({})", e.display_name()),
            Expr::IsNull { expr, negated } => {
                let name = if *negated { "isNotNull" } else { "isNull" };
                format!("{}({})", name, expr.display_name())
            }
            Expr::Binary { op, left, right } => format!(
                "{}({}, {})",
                op.function_name(),
                left.display_name(),
                right.display_name()
            ),
            Expr::Function { name, args } => {
                let args: Vec<String> = args.iter().map(Expr::display_name).collect();
                format!("{}({})", name, args.join(", "))
            }
        }
    }
}

/// Parse a `;`-separated script; empty statements are skipped
pub fn parse_script(sql: &str) -> SqlResult<Vec<Statement>> {
    let tokens = tokenize(sql)?;
    let mut statements = Vec::new();
    for chunk in tokens.split(|t| *t == Token::Semicolon) {
        if chunk.is_empty() {
            continue;
        }
        let mut parser = Parser::new(chunk);
        let statement = parser.statement()?;
        if let Some(extra) = parser.peek() {
            return Err(SqlError::Syntax(format!("unexpected '{}' after statement", extra)));
        }
        statements.push(statement);
    }
    Ok(statements)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> SqlResult<&'a Token> {
        let token = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| SqlError::Syntax("unexpected end of statement".to_string()))?;
        self.pos += 1;
        Ok(token)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> SqlResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(keyword))
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> SqlResult<()> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    fn unexpected(&self, expected: &str) -> SqlError {
        match self.peek() {
            Some(found) => SqlError::Syntax(format!("expected {}, found '{}'", expected, found)),
            None => SqlError::Syntax(format!("expected {}, found end of statement", expected)),
        }
    }

    fn identifier(&mut self) -> SqlResult<String> {
        match self.next()? {
            Token::Word(w) | Token::Quoted(w) => Ok(w.clone()),
            other => Err(SqlError::Syntax(format!("expected identifier, found '{}'", other))),
        }
    }

    fn table_ref(&mut self) -> SqlResult<TableRef> {
        let first = self.identifier()?;
        if self.eat(&Token::Dot) {
            let name = self.identifier()?;
            Ok(TableRef {
                database: Some(first),
                name,
            })
        } else {
            Ok(TableRef {
                database: None,
                name: first,
            })
        }
    }

    fn if_not_exists(&mut self) -> SqlResult<bool> {
        if self.eat_keyword("IF") {
            self.expect_keyword("NOT")?;
            self.expect_keyword("EXISTS")?;
            return Ok(true);
        }
        Ok(false)
    }

    fn if_exists(&mut self) -> SqlResult<bool> {
        if self.eat_keyword("IF") {
            self.expect_keyword("EXISTS")?;
            return Ok(true);
        }
        Ok(false)
    }

    fn statement(&mut self) -> SqlResult<Statement> {
        let keyword = match self.peek() {
            Some(Token::Word(w)) => w.to_uppercase(),
            _ => return Err(self.unexpected("statement")),
        };
        match keyword.as_str() {
            "CREATE" => {
                self.pos += 1;
                if self.eat_keyword("DATABASE") {
                    let if_not_exists = self.if_not_exists()?;
                    let name = self.identifier()?;
                    self.skip_engine_clause()?;
                    Ok(Statement::CreateDatabase { name, if_not_exists })
                } else if self.eat_keyword("TABLE") {
                    self.create_table()
                } else {
                    Err(self.unexpected("DATABASE or TABLE"))
                }
            }
            "DROP" => {
                self.pos += 1;
                if self.eat_keyword("DATABASE") {
                    let if_exists = self.if_exists()?;
                    let name = self.identifier()?;
                    Ok(Statement::DropDatabase { name, if_exists })
                } else {
                    self.expect_keyword("TABLE")?;
                    let if_exists = self.if_exists()?;
                    let table = self.table_ref()?;
                    Ok(Statement::DropTable { table, if_exists })
                }
            }
            "USE" => {
                self.pos += 1;
                Ok(Statement::Use(self.identifier()?))
            }
            "TRUNCATE" => {
                self.pos += 1;
                self.eat_keyword("TABLE");
                self.if_exists()?;
                Ok(Statement::Truncate(self.table_ref()?))
            }
            "INSERT" => {
                self.pos += 1;
                self.insert()
            }
            "SELECT" => {
                self.pos += 1;
                Ok(Statement::Select(self.select()?))
            }
            "SHOW" => {
                self.pos += 1;
                if self.eat_keyword("DATABASES") {
                    Ok(Statement::ShowDatabases)
                } else {
                    self.expect_keyword("TABLES")?;
                    let database = if self.eat_keyword("FROM") || self.eat_keyword("IN") {
                        Some(self.identifier()?)
                    } else {
                        None
                    };
                    Ok(Statement::ShowTables { database })
                }
            }
            _ => Err(SqlError::Unsupported(format!("statement {}", keyword))),
        }
    }

    /// `ENGINE = Name(args)` with the arguments ignored
    fn skip_engine_clause(&mut self) -> SqlResult<Option<String>> {
        if !self.eat_keyword("ENGINE") {
            return Ok(None);
        }
        self.eat(&Token::Equal);
        let engine = self.identifier()?;
        if self.peek() == Some(&Token::LeftParen) {
            self.skip_parenthesized()?;
        }
        Ok(Some(engine))
    }

    fn skip_parenthesized(&mut self) -> SqlResult<()> {
        self.expect(Token::LeftParen)?;
        let mut depth = 1;
        while depth > 0 {
            match self.next()? {
                Token::LeftParen => depth += 1,
                Token::RightParen => depth -= 1,
                _ => {}
            }
        }
        Ok(())
    }

    fn create_table(&mut self) -> SqlResult<Statement> {
        let if_not_exists = self.if_not_exists()?;
        let table = self.table_ref()?;

        self.expect(Token::LeftParen)?;
        let mut columns = Vec::new();
        loop {
            let name = self.identifier()?;
            let data_type = self.type_name()?;
            let data_type = DataType::parse(&data_type)?;
            columns.push(ColumnSpec { name, data_type });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RightParen)?;

        let mut engine = String::from("MergeTree");
        let mut order_by = Vec::new();
        while self.peek().is_some() {
            if let Some(name) = self.skip_engine_clause()? {
                engine = name;
            } else if self.eat_keyword("ORDER") {
                self.expect_keyword("BY")?;
                order_by = self.key_columns()?;
            } else if self.eat_keyword("PRIMARY") {
                self.expect_keyword("KEY")?;
                let primary = self.key_columns()?;
                if order_by.is_empty() {
                    order_by = primary;
                }
            } else if self.eat_keyword("PARTITION") {
                self.expect_keyword("BY")?;
                self.expr()?;
            } else if self.eat_keyword("SETTINGS") {
                self.settings()?;
            } else {
                return Err(self.unexpected("table clause"));
            }
        }

        for key in &order_by {
            if !columns.iter().any(|c| &c.name == key) {
                return Err(SqlError::UnknownColumn(key.clone()));
            }
        }

        Ok(Statement::CreateTable(CreateTable {
            table,
            if_not_exists,
            columns,
            engine,
            order_by,
        }))
    }

    /// Raw type text up to the next top-level `,` or `)`
    fn type_name(&mut self) -> SqlResult<String> {
        let mut text = String::new();
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token {
                Token::Comma | Token::RightParen if depth == 0 => break,
                Token::LeftParen => depth += 1,
                Token::RightParen => depth -= 1,
                _ => {}
            }
            match token {
                Token::Word(w) if depth == 0 && !text.is_empty() => {
                    // `DEFAULT`, `CODEC` and other column modifiers are not supported
                    return Err(SqlError::Unsupported(format!("column modifier {}", w)));
                }
                Token::Text(t) => text.push_str(&String::from_utf8_lossy(t)),
                other => text.push_str(&other.to_string()),
            }
            self.pos += 1;
        }
        if text.is_empty() {
            return Err(self.unexpected("column type"));
        }
        Ok(text)
    }

    /// Ordering key: `col`, `(a, b)` or `tuple()`
    fn key_columns(&mut self) -> SqlResult<Vec<String>> {
        if self.peek_keyword("tuple") && self.peek_at(1) == Some(&Token::LeftParen) {
            self.pos += 1;
            self.skip_parenthesized()?;
            return Ok(Vec::new());
        }
        if self.eat(&Token::LeftParen) {
            let mut keys = Vec::new();
            if self.eat(&Token::RightParen) {
                return Ok(keys);
            }
            loop {
                keys.push(self.key_column()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RightParen)?;
            return Ok(keys);
        }
        Ok(vec![self.key_column()?])
    }

    fn key_column(&mut self) -> SqlResult<String> {
        match self.expr()? {
            Expr::Column(name) => Ok(name),
            other => Err(SqlError::Unsupported(format!(
                "ordering key expression {}",
                other.display_name()
            ))),
        }
    }

    fn settings(&mut self) -> SqlResult<()> {
        loop {
            self.identifier()?;
            self.expect(Token::Equal)?;
            self.next()?;
            if !self.eat(&Token::Comma) {
                return Ok(());
            }
        }
    }

    fn insert(&mut self) -> SqlResult<Statement> {
        self.expect_keyword("INTO")?;
        self.eat_keyword("TABLE");
        let table = self.table_ref()?;

        let columns = if self.eat(&Token::LeftParen) {
            let mut names = vec![self.identifier()?];
            while self.eat(&Token::Comma) {
                names.push(self.identifier()?);
            }
            self.expect(Token::RightParen)?;
            Some(names)
        } else {
            None
        };

        self.expect_keyword("VALUES")?;
        let mut rows = Vec::new();
        loop {
            self.expect(Token::LeftParen)?;
            let mut row = Vec::new();
            if !self.eat(&Token::RightParen) {
                loop {
                    row.push(self.expr()?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(Token::RightParen)?;
            }
            rows.push(row);
            // The comma between row tuples is optional
            self.eat(&Token::Comma);
            if self.peek() != Some(&Token::LeftParen) {
                break;
            }
        }

        Ok(Statement::Insert {
            table,
            columns,
            rows,
        })
    }

    fn select(&mut self) -> SqlResult<Select> {
        let mut items = Vec::new();
        loop {
            if self.eat(&Token::Asterisk) {
                items.push(SelectItem::Wildcard);
            } else {
                let expr = self.expr()?;
                let alias = if self.eat_keyword("AS") {
                    Some(self.identifier()?)
                } else {
                    None
                };
                items.push(SelectItem::Expr { expr, alias });
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }

        let from = if self.eat_keyword("FROM") {
            Some(self.table_ref()?)
        } else {
            None
        };

        let filter = if self.eat_keyword("WHERE") {
            Some(self.expr()?)
        } else {
            None
        };

        let mut order_by = Vec::new();
        if self.eat_keyword("ORDER") {
            self.expect_keyword("BY")?;
            loop {
                let expr = self.expr()?;
                let descending = if self.eat_keyword("DESC") || self.eat_keyword("DESCENDING") {
                    true
                } else {
                    if !self.eat_keyword("ASC") {
                        self.eat_keyword("ASCENDING");
                    }
                    false
                };
                order_by.push(OrderItem { expr, descending });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }

        let mut limit = None;
        let mut offset = 0;
        if self.eat_keyword("LIMIT") {
            let first = self.unsigned()?;
            if self.eat(&Token::Comma) {
                offset = first;
                limit = Some(self.unsigned()?);
            } else {
                limit = Some(first);
            }
        }
        if self.eat_keyword("OFFSET") {
            offset = self.unsigned()?;
        }

        let format = if self.eat_keyword("FORMAT") {
            Some(
                self.identifier()?
                    .parse::<OutputFormat>()
                    .map_err(|e| SqlError::Unsupported(e.to_string()))?,
            )
        } else {
            None
        };

        Ok(Select {
            items,
            from,
            filter,
            order_by,
            limit,
            offset,
            format,
        })
    }

    fn unsigned(&mut self) -> SqlResult<u64> {
        match self.next()? {
            Token::Number(n) => n
                .parse::<u64>()
                .map_err(|_| SqlError::Syntax(format!("expected unsigned integer, found {}", n))),
            other => Err(SqlError::Syntax(format!("expected unsigned integer, found '{}'", other))),
        }
    }

    fn expr(&mut self) -> SqlResult<Expr> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> SqlResult<Expr> {
        let mut left = self.and_expr()?;
        while self.eat_keyword("OR") {
            let right = self.and_expr()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> SqlResult<Expr> {
        let mut left = self.not_expr()?;
        while self.eat_keyword("AND") {
            let right = self.not_expr()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> SqlResult<Expr> {
        if self.eat_keyword("NOT") {
            return Ok(Expr::Not(Box::new(self.not_expr()?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> SqlResult<Expr> {
        let left = self.additive()?;
        if self.eat_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            self.expect_keyword("NULL")?;
            return Ok(Expr::IsNull {
                expr: Box::new(left),
                negated,
            });
        }
        let op = match self.peek() {
            Some(Token::Equal) => BinaryOp::Eq,
            Some(Token::NotEqual) => BinaryOp::NotEq,
            Some(Token::Less) => BinaryOp::Less,
            Some(Token::LessEq) => BinaryOp::LessEq,
            Some(Token::Greater) => BinaryOp::Greater,
            Some(Token::GreaterEq) => BinaryOp::GreaterEq,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.additive()?;
        Ok(binary(op, left, right))
    }

    fn additive(&mut self) -> SqlResult<Expr> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Plus,
                Some(Token::Minus) => BinaryOp::Minus,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn multiplicative(&mut self) -> SqlResult<Expr> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Asterisk) => BinaryOp::Multiply,
                Some(Token::Slash) => BinaryOp::Divide,
                Some(Token::Percent) => BinaryOp::Modulo,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = binary(op, left, right);
        }
    }

    fn unary(&mut self) -> SqlResult<Expr> {
        if self.eat(&Token::Minus) {
            let operand = self.unary()?;
            // Negative numeric literals stay literals so they type like ClickHouse
            return Ok(match operand {
                Expr::Literal(Value::UInt(u)) if u <= i64::MAX as u64 + 1 => {
                    Expr::Literal(Value::Int((u as i128).wrapping_neg() as i64))
                }
                Expr::Literal(Value::Float(f)) => Expr::Literal(Value::Float(-f)),
                other => Expr::Negate(Box::new(other)),
            });
        }
        if self.eat(&Token::Plus) {
            return self.unary();
        }
        self.primary()
    }

    fn primary(&mut self) -> SqlResult<Expr> {
        match self.next()? {
            Token::Number(n) => number_literal(n),
            Token::Text(bytes) => Ok(Expr::Literal(match String::from_utf8(bytes.clone()) {
                Ok(s) => Value::String(s),
                Err(e) => Value::Bytes(e.into_bytes()),
            })),
            Token::LeftParen => {
                let inner = self.expr()?;
                self.expect(Token::RightParen)?;
                Ok(inner)
            }
            Token::Quoted(name) => self.column_tail(name.clone()),
            Token::Word(word) => {
                if self.peek() == Some(&Token::LeftParen) {
                    return self.function(word);
                }
                match word.to_lowercase().as_str() {
                    "null" => Ok(Expr::Literal(Value::Null)),
                    "true" => Ok(Expr::Literal(Value::Bool(true))),
                    "false" => Ok(Expr::Literal(Value::Bool(false))),
                    "inf" => Ok(Expr::Literal(Value::Float(f64::INFINITY))),
                    "nan" => Ok(Expr::Literal(Value::Float(f64::NAN))),
                    _ => self.column_tail(word.clone()),
                }
            }
            other => Err(SqlError::Syntax(format!("unexpected '{}' in expression", other))),
        }
    }

    /// `table.column` references resolve to the column name
    fn column_tail(&mut self, first: String) -> SqlResult<Expr> {
        let mut name = first;
        while self.eat(&Token::Dot) {
            name = self.identifier()?;
        }
        Ok(Expr::Column(name))
    }

    fn function(&mut self, name: &str) -> SqlResult<Expr> {
        self.expect(Token::LeftParen)?;
        let mut args = Vec::new();
        let lowered = name.to_lowercase();
        let name = if AGGREGATES.contains(&lowered.as_str()) {
            lowered
        } else {
            name.to_string()
        };
        if name == "count" && self.eat(&Token::Asterisk) {
            self.expect(Token::RightParen)?;
            return Ok(Expr::Function { name, args });
        }
        if !self.eat(&Token::RightParen) {
            loop {
                args.push(self.expr()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RightParen)?;
        }
        Ok(Expr::Function { name, args })
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn number_literal(text: &str) -> SqlResult<Expr> {
    let is_float = text.contains(['.', 'e', 'E']);
    let value = if is_float {
        Value::Float(
            text.parse::<f64>()
                .map_err(|_| SqlError::Syntax(format!("invalid number {}", text)))?,
        )
    } else {
        Value::UInt(
            text.parse::<u64>()
                .map_err(|_| SqlError::Syntax(format!("integer {} is out of range", text)))?,
        )
    };
    Ok(Expr::Literal(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(sql: &str) -> Statement {
        let mut statements = parse_script(sql).unwrap();
        assert_eq!(statements.len(), 1, "{}", sql);
        statements.remove(0)
    }

    #[test]
    fn test_tokenize_literals_and_comments() {
        let tokens = tokenize("SELECT 'it''s', 'a\\'b', `col`, 1.5e3 -- tail\n/* c */ <> 2").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word("SELECT".into()),
                Token::Text(b"it's".to_vec()),
                Token::Comma,
                Token::Text(b"a'b".to_vec()),
                Token::Comma,
                Token::Quoted("col".into()),
                Token::Comma,
                Token::Number("1.5e3".into()),
                Token::NotEqual,
                Token::Number("2".into()),
            ]
        );
        assert!(tokenize("SELECT 'open").is_err());
        assert_eq!(tokenize("'\\xFF'").unwrap(), vec![Token::Text(vec![0xff])]);
    }

    #[test]
    fn test_create_table_with_clauses() {
        let statement = parse_one(
            "CREATE TABLE IF NOT EXISTS db.t (id FixedString(26), v Nullable(UInt32), s String) \
             ENGINE = MergeTree() PARTITION BY id ORDER BY (id, v) SETTINGS index_granularity = 8192",
        );
        let Statement::CreateTable(create) = statement else {
            panic!("expected CREATE TABLE");
        };
        assert!(create.if_not_exists);
        assert_eq!(create.table.database.as_deref(), Some("db"));
        assert_eq!(create.columns[0].data_type, DataType::FixedString(26));
        assert!(create.columns[1].data_type.is_nullable());
        assert_eq!(create.engine, "MergeTree");
        assert_eq!(create.order_by, vec!["id".to_string(), "v".to_string()]);
    }

    #[test]
    fn test_create_table_rejects_unknown_key() {
        assert!(parse_script("CREATE TABLE t (a UInt8) ORDER BY b").is_err());
        let Statement::CreateTable(create) = parse_one("CREATE TABLE t (a UInt8) ENGINE = Log ORDER BY tuple()") else {
            panic!("expected CREATE TABLE");
        };
        assert!(create.order_by.is_empty());
        assert_eq!(create.engine, "Log");
    }

    #[test]
    fn test_insert_values() {
        let statement = parse_one("INSERT INTO t (a, b) VALUES (1, 'x'), (-2, NULL) (3, 'z')");
        let Statement::Insert { columns, rows, .. } = statement else {
            panic!("expected INSERT");
        };
        assert_eq!(columns, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][0], Expr::Literal(Value::Int(-2)));
        assert_eq!(rows[1][1], Expr::Literal(Value::Null));
    }

    #[test]
    fn test_select_clauses() {
        let statement = parse_one(
            "SELECT id, v * 2 AS doubled FROM t WHERE v > 0.5 AND NOT s = 'a' \
             ORDER BY v DESC, id LIMIT 10 OFFSET 5 FORMAT JSONCompact",
        );
        let Statement::Select(select) = statement else {
            panic!("expected SELECT");
        };
        assert_eq!(select.items.len(), 2);
        assert!(select.filter.is_some());
        assert_eq!(select.order_by.len(), 2);
        assert!(select.order_by[0].descending);
        assert_eq!(select.limit, Some(10));
        assert_eq!(select.offset, 5);
        assert_eq!(select.format, Some(OutputFormat::JsonCompact));
    }

    #[test]
    fn test_order_direction_keywords() {
        let Statement::Select(select) =
            parse_one("SELECT a FROM t ORDER BY a ASC, b ASCENDING, c DESCENDING, d LIMIT 1")
        else {
            panic!("expected SELECT");
        };
        let directions: Vec<bool> = select.order_by.iter().map(|item| item.descending).collect();
        assert_eq!(directions, vec![false, false, true, false]);
        assert_eq!(select.limit, Some(1));
    }

    #[test]
    fn test_precedence_and_names() {
        let Statement::Select(select) = parse_one("SELECT 1 + 2 * 3, count(*), 'abc'") else {
            panic!("expected SELECT");
        };
        let names: Vec<String> = select
            .items
            .iter()
            .map(|item| match item {
                SelectItem::Expr { expr, .. } => expr.display_name(),
                SelectItem::Wildcard => "*".to_string(),
            })
            .collect();
        assert_eq!(names, vec!["plus(1, multiply(2, 3))", "count()", "'abc'"]);
    }

    #[test]
    fn test_script_splitting() {
        let statements = parse_script("CREATE DATABASE IF NOT EXISTS d ENGINE = Atomic; USE d;; SHOW TABLES;").unwrap();
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[1], Statement::Use("d".into()));
    }

    #[test]
    fn test_unsupported_statement() {
        assert!(matches!(
            parse_script("ALTER TABLE t DELETE WHERE 1"),
            Err(SqlError::Unsupported(_))
        ));
    }
}
