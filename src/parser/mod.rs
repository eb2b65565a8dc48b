//! Recursive-descent parser turning [`Token`]s into [`Statement`]s.
//!
//! A malformed statement does not stop the batch: the error is recorded with
//! the position of the offending token and parsing resumes at the next `;` or
//! statement-leading keyword.

mod ddl;
mod dml;
mod expr;
mod query;
mod utility;

use tracing::warn;

use crate::ast::{ObjectName, Statement};
use crate::error::ParseError;
use crate::token::{Keyword, Token, TokenKind};
use crate::tokenizer;

pub(crate) type PResult<T> = std::result::Result<T, ParseError>;

/// Statements and errors of a batch, each list in source order.
#[derive(Debug, Default)]
pub struct ParseOutput {
    pub statements: Vec<Statement>,
    pub errors: Vec<ParseError>,
}

/// Parses a batch of statements from a token stream.
pub fn parse(tokens: Vec<Token>) -> ParseOutput {
    Parser::new(tokens).parse()
}

/// Tokenizes and parses a batch of statements.
pub fn parse_sql(sql: &str) -> ParseOutput {
    parse(tokenizer::tokenize(sql))
}

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    /// Next index handed to a bare `?` marker; reset for every statement.
    next_parameter: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let (line, column, offset) = tokens
                .last()
                .map_or((1, 1, 0), |t| (t.line, t.column + t.text.chars().count(), t.offset + t.text.chars().count()));
            tokens.push(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                line,
                column,
                offset,
            });
        }
        Self {
            tokens,
            position: 0,
            next_parameter: 0,
        }
    }

    /// Parses the whole batch, splitting successes from failures.
    pub fn parse(&mut self) -> ParseOutput {
        let mut output = ParseOutput::default();
        for result in self.parse_batch() {
            match result {
                Ok(statement) => output.statements.push(statement),
                Err(error) => output.errors.push(error),
            }
        }
        output
    }

    /// Parses the whole batch, keeping one entry per statement in source order.
    pub fn parse_batch(&mut self) -> Vec<Result<Statement, ParseError>> {
        let mut results = Vec::new();
        loop {
            while self.eat(TokenKind::Semicolon) {}
            if self.is_at_end() {
                break;
            }

            let start = self.position;
            self.next_parameter = 0;
            let result = self.parse_statement().and_then(|statement| {
                if self.check(TokenKind::Semicolon) || self.is_at_end() {
                    Ok(statement)
                } else {
                    Err(self.unexpected("';' or end of input"))
                }
            });

            if let Err(error) = &result {
                warn!(%error, "syntax error");
                self.recover(start);
            }
            results.push(result);
        }
        results
    }

    /// Parses a single statement, rejecting anything after it.
    pub fn parse_single(&mut self) -> PResult<Statement> {
        while self.eat(TokenKind::Semicolon) {}
        self.next_parameter = 0;
        let statement = self.parse_statement()?;
        self.eat(TokenKind::Semicolon);
        if !self.is_at_end() {
            return Err(self.unexpected("end of input"));
        }
        Ok(statement)
    }

    fn parse_statement(&mut self) -> PResult<Statement> {
        let kind = self.current_token().kind;
        match kind {
            TokenKind::Keyword(Keyword::Select | Keyword::With) => {
                Ok(Statement::Select(Box::new(self.parse_query()?)))
            }
            TokenKind::LeftParen => Ok(Statement::Select(Box::new(self.parse_query()?))),
            TokenKind::Keyword(Keyword::Insert) => self.parse_insert(),
            TokenKind::Keyword(Keyword::Update) => self.parse_update(),
            TokenKind::Keyword(Keyword::Delete) => self.parse_delete(),
            TokenKind::Keyword(Keyword::Create) => self.parse_create(),
            TokenKind::Keyword(Keyword::Drop) => self.parse_drop(),
            TokenKind::Keyword(Keyword::Alter) => self.parse_alter(),
            TokenKind::Keyword(Keyword::Truncate) => self.parse_truncate(),
            TokenKind::Keyword(Keyword::Grant) => self.parse_grant(),
            TokenKind::Keyword(Keyword::Revoke) => self.parse_revoke(),
            TokenKind::Keyword(
                Keyword::Begin | Keyword::Commit | Keyword::Rollback | Keyword::Savepoint,
            ) => self.parse_transaction(),
            TokenKind::Identifier if self.check_word("START") || self.check_word("RELEASE") => {
                self.parse_transaction()
            }
            TokenKind::Keyword(Keyword::Describe | Keyword::Desc) => self.parse_describe(),
            TokenKind::Keyword(Keyword::Show) => self.parse_show(),
            TokenKind::Keyword(Keyword::Set) => self.parse_set(),
            TokenKind::Keyword(Keyword::Use) => self.parse_use(),
            _ => Err(self.unexpected("a statement")),
        }
    }

    /// Skips to the next `;` or statement-leading keyword, always moving past
    /// the token the failed statement started at.
    fn recover(&mut self, start: usize) {
        if self.position <= start {
            self.position = start;
            self.advance();
        }
        while !self.is_at_end() {
            match self.current_token().kind {
                TokenKind::Semicolon => break,
                TokenKind::Keyword(keyword) if keyword.starts_statement() => break,
                _ => self.advance(),
            }
        }
    }

    //helpers
    fn current_token(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn peek_token(&self, ahead: usize) -> &Token {
        let idx = (self.position + ahead).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    /// Returns the current token and moves past it.
    fn next_token(&mut self) -> Token {
        let token = self.current_token().clone();
        self.advance();
        token
    }

    fn is_at_end(&self) -> bool {
        self.current_token().kind == TokenKind::Eof
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current_token().kind == kind
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current_token().is_keyword(keyword)
    }

    fn check_word(&self, word: &str) -> bool {
        self.current_token().is_word(word)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        let matched = self.check(kind);
        if matched {
            self.advance();
        }
        matched
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        self.eat(TokenKind::Keyword(keyword))
    }

    fn eat_word(&mut self, word: &str) -> bool {
        let matched = self.check_word(word);
        if matched {
            self.advance();
        }
        matched
    }

    fn consume(&mut self, expected: TokenKind, what: &str) -> PResult<Token> {
        if self.check(expected) {
            Ok(self.next_token())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn consume_keyword(&mut self, keyword: Keyword) -> PResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(keyword.as_str()))
        }
    }

    fn consume_word(&mut self, word: &str) -> PResult<()> {
        if self.eat_word(word) {
            Ok(())
        } else {
            Err(self.unexpected(word))
        }
    }

    fn consume_ident(&mut self) -> PResult<String> {
        match self.current_token().kind {
            TokenKind::Identifier | TokenKind::QuotedIdentifier => Ok(self.next_token().text),
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// `name` or `schema.name`.
    fn parse_object_name(&mut self) -> PResult<ObjectName> {
        let first = self.consume_ident()?;
        if self.eat(TokenKind::Dot) {
            let name = self.consume_ident()?;
            Ok(ObjectName::qualified(first, name))
        } else {
            Ok(ObjectName::new(first))
        }
    }

    /// `(a, b, c)`
    fn parse_ident_list(&mut self) -> PResult<Vec<String>> {
        self.consume(TokenKind::LeftParen, "'('")?;
        let mut names = vec![self.consume_ident()?];
        while self.eat(TokenKind::Comma) {
            names.push(self.consume_ident()?);
        }
        self.consume(TokenKind::RightParen, "')'")?;
        Ok(names)
    }

    /// `IF NOT EXISTS`
    fn parse_if_not_exists(&mut self) -> PResult<bool> {
        if self.check_word("IF") && self.peek_token(1).is_keyword(Keyword::Not) {
            self.advance();
            self.advance();
            self.consume_keyword(Keyword::Exists)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// `IF EXISTS`
    fn parse_if_exists(&mut self) -> PResult<bool> {
        if self.check_word("IF") && self.peek_token(1).is_keyword(Keyword::Exists) {
            self.advance();
            self.advance();
            return Ok(true);
        }
        Ok(false)
    }

    fn parse_integer(&mut self) -> PResult<i64> {
        let negative = self.eat(TokenKind::Minus);
        let token = self.consume(TokenKind::Number, "integer")?;
        let value = token
            .text
            .parse::<i64>()
            .map_err(|_| error_at(&token, format!("Expected integer, found {token}")))?;
        Ok(if negative { -value } else { value })
    }

    /// Source text of the tokens in `start..self.position`, one space apart.
    fn source_span(&self, start: usize) -> String {
        self.tokens[start..self.position]
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.current_token();
        error_at(token, format!("Expected {expected}, found {token}"))
    }
}

fn error_at(token: &Token, message: String) -> ParseError {
    ParseError {
        message,
        line: token.line,
        column: token.column,
        offset: token.offset,
    }
}
