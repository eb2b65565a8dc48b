use super::{PResult, Parser};
use crate::ast::*;
use crate::token::{Keyword, TokenKind};

impl Parser {
    pub(super) fn parse_insert(&mut self) -> PResult<Statement> {
        self.consume_keyword(Keyword::Insert)?;
        self.consume_keyword(Keyword::Into)?;
        let table = self.parse_object_name()?;

        // `(a, b)` is a column list unless it opens a parenthesized query
        let columns = if self.check(TokenKind::LeftParen)
            && !matches!(
                self.peek_token(1).kind,
                TokenKind::Keyword(Keyword::Select | Keyword::With)
            ) {
            Some(self.parse_ident_list()?)
        } else {
            None
        };

        let source = if self.eat_keyword(Keyword::Values) {
            let mut rows = vec![self.parse_values_row()?];
            while self.eat(TokenKind::Comma) {
                rows.push(self.parse_values_row()?);
            }
            InsertSource::Values(rows)
        } else if self.check_keyword(Keyword::Select)
            || self.check_keyword(Keyword::With)
            || self.check(TokenKind::LeftParen)
        {
            InsertSource::Select(Box::new(self.parse_query()?))
        } else {
            return Err(self.unexpected("VALUES or SELECT"));
        };

        Ok(Statement::Insert(Insert {
            table,
            columns,
            source,
        }))
    }

    fn parse_values_row(&mut self) -> PResult<Vec<Expr>> {
        self.consume(TokenKind::LeftParen, "'('")?;
        let values = self.parse_expr_list()?;
        self.consume(TokenKind::RightParen, "')'")?;
        Ok(values)
    }

    pub(super) fn parse_update(&mut self) -> PResult<Statement> {
        self.consume_keyword(Keyword::Update)?;
        let table = self.parse_object_name()?;
        let alias = self.parse_alias()?;
        self.consume_keyword(Keyword::Set)?;

        let mut assignments = Vec::new();
        loop {
            // `alias.column = ...` names the column of the updated table
            let mut column = self.consume_ident()?;
            while self.eat(TokenKind::Dot) {
                column = self.consume_ident()?;
            }
            self.consume(TokenKind::Eq, "'='")?;
            let value = self.parse_expr()?;
            assignments.push((column, value));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        let where_clause = if self.eat_keyword(Keyword::Where) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        Ok(Statement::Update(Update {
            table,
            alias,
            assignments,
            where_clause,
        }))
    }

    pub(super) fn parse_delete(&mut self) -> PResult<Statement> {
        self.consume_keyword(Keyword::Delete)?;
        self.consume_keyword(Keyword::From)?;
        let table = self.parse_object_name()?;
        let alias = self.parse_alias()?;

        let where_clause = if self.eat_keyword(Keyword::Where) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        Ok(Statement::Delete(Delete {
            table,
            alias,
            where_clause,
        }))
    }
}
