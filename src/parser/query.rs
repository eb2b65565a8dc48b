use super::{PResult, Parser};
use crate::ast::*;
use crate::token::{Keyword, TokenKind};

impl Parser {
    /// `[WITH ...] SELECT ...`, optionally wrapped in parentheses.
    pub(super) fn parse_query(&mut self) -> PResult<Select> {
        if self.eat(TokenKind::LeftParen) {
            let query = self.parse_query()?;
            self.consume(TokenKind::RightParen, "')'")?;
            return Ok(query);
        }

        let with = if self.eat_keyword(Keyword::With) {
            Some(self.parse_with()?)
        } else {
            None
        };
        let mut select = self.parse_select()?;
        select.with = with;
        Ok(select)
    }

    fn parse_with(&mut self) -> PResult<With> {
        let recursive = self.eat_word("RECURSIVE");
        let mut ctes = Vec::new();
        loop {
            let name = self.consume_ident()?;
            let columns = if self.check(TokenKind::LeftParen) {
                self.parse_ident_list()?
            } else {
                Vec::new()
            };
            self.consume_keyword(Keyword::As)?;
            self.consume(TokenKind::LeftParen, "'('")?;
            let query = self.parse_query()?;
            self.consume(TokenKind::RightParen, "')'")?;
            ctes.push(Cte {
                name,
                columns,
                query: Box::new(query),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(With { recursive, ctes })
    }

    fn parse_select(&mut self) -> PResult<Select> {
        self.consume_keyword(Keyword::Select)?;
        let distinct = self.eat_keyword(Keyword::Distinct);
        if !distinct {
            self.eat_keyword(Keyword::All);
        }

        let mut columns = vec![self.parse_select_item()?];
        while self.eat(TokenKind::Comma) {
            columns.push(self.parse_select_item()?);
        }

        let mut from = Vec::new();
        if self.eat_keyword(Keyword::From) {
            from.push(self.parse_from_item()?);
            while self.eat(TokenKind::Comma) {
                from.push(self.parse_from_item()?);
            }
        }

        let where_clause = if self.eat_keyword(Keyword::Where) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let mut group_by = Vec::new();
        if self.eat_keyword(Keyword::Group) {
            self.consume_keyword(Keyword::By)?;
            group_by = self.parse_expr_list()?;
        }

        let having = if self.eat_keyword(Keyword::Having) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let mut order_by = Vec::new();
        if self.eat_keyword(Keyword::Order) {
            self.consume_keyword(Keyword::By)?;
            order_by = self.parse_order_by_list()?;
        }

        // LIMIT and OFFSET are accepted in either order
        let mut limit = None;
        let mut offset = None;
        loop {
            if limit.is_none() && self.eat_keyword(Keyword::Limit) {
                let first = self.parse_expr()?;
                // MySQL `LIMIT offset, count`
                if offset.is_none() && self.eat(TokenKind::Comma) {
                    offset = Some(first);
                    limit = Some(self.parse_expr()?);
                } else {
                    limit = Some(first);
                }
            } else if offset.is_none() && self.eat_keyword(Keyword::Offset) {
                offset = Some(self.parse_expr()?);
                if !self.eat_word("ROWS") {
                    self.eat_word("ROW");
                }
            } else {
                break;
            }
        }

        Ok(Select {
            with: None,
            distinct,
            columns,
            from,
            where_clause,
            group_by,
            having,
            order_by,
            limit,
            offset,
        })
    }

    fn parse_select_item(&mut self) -> PResult<SelectItem> {
        if self.eat(TokenKind::Star) {
            return Ok(SelectItem::Wildcard);
        }

        let is_name = matches!(
            self.current_token().kind,
            TokenKind::Identifier | TokenKind::QuotedIdentifier
        );
        if is_name
            && self.peek_token(1).kind == TokenKind::Dot
            && self.peek_token(2).kind == TokenKind::Star
        {
            let table = self.consume_ident()?;
            self.advance();
            self.advance();
            return Ok(SelectItem::QualifiedWildcard(table));
        }

        let expr = self.parse_expr()?;
        let alias = self.parse_alias()?;
        Ok(SelectItem::Expr { expr, alias })
    }

    /// `[AS] alias`
    pub(super) fn parse_alias(&mut self) -> PResult<Option<String>> {
        if self.eat_keyword(Keyword::As) {
            return self.consume_ident().map(Some);
        }
        match self.current_token().kind {
            TokenKind::Identifier | TokenKind::QuotedIdentifier => Ok(Some(self.next_token().text)),
            _ => Ok(None),
        }
    }

    fn parse_from_item(&mut self) -> PResult<FromItem> {
        let mut item = self.parse_table_factor()?;

        loop {
            let kind = if self.eat_keyword(Keyword::Join) {
                JoinKind::Inner
            } else if self.eat_keyword(Keyword::Inner) {
                self.consume_keyword(Keyword::Join)?;
                JoinKind::Inner
            } else if self.eat_keyword(Keyword::Cross) {
                self.consume_keyword(Keyword::Join)?;
                JoinKind::Cross
            } else if let Some(kind) = self.parse_outer_join_kind() {
                self.eat_keyword(Keyword::Outer);
                self.consume_keyword(Keyword::Join)?;
                kind
            } else {
                break;
            };

            let right = self.parse_table_factor()?;
            let constraint = if kind == JoinKind::Cross {
                JoinConstraint::None
            } else if self.eat_keyword(Keyword::On) {
                JoinConstraint::On(self.parse_expr()?)
            } else if self.eat_keyword(Keyword::Using) {
                JoinConstraint::Using(self.parse_ident_list()?)
            } else {
                JoinConstraint::None
            };

            item = FromItem::Join {
                left: Box::new(item),
                right: Box::new(right),
                kind,
                constraint,
            };
        }

        Ok(item)
    }

    fn parse_outer_join_kind(&mut self) -> Option<JoinKind> {
        let kind = match self.current_token().kind {
            TokenKind::Keyword(Keyword::Left) => JoinKind::Left,
            TokenKind::Keyword(Keyword::Right) => JoinKind::Right,
            TokenKind::Keyword(Keyword::Full) => JoinKind::Full,
            _ => return None,
        };
        self.advance();
        Some(kind)
    }

    fn parse_table_factor(&mut self) -> PResult<FromItem> {
        if self.eat(TokenKind::LeftParen) {
            let query = self.parse_query()?;
            self.consume(TokenKind::RightParen, "')'")?;
            let alias = self.parse_alias()?;
            return Ok(FromItem::Subquery {
                query: Box::new(query),
                alias,
            });
        }

        let name = self.parse_object_name()?;
        let alias = self.parse_alias()?;
        Ok(FromItem::Table { name, alias })
    }

    pub(super) fn parse_order_by_list(&mut self) -> PResult<Vec<OrderByClause>> {
        let mut items = Vec::new();
        loop {
            let expr = self.parse_expr()?;
            let direction = if self.eat_keyword(Keyword::Desc) {
                SortDirection::Desc
            } else {
                self.eat_keyword(Keyword::Asc);
                SortDirection::Asc
            };
            let nulls = if self.eat_word("NULLS") {
                if self.eat_word("FIRST") {
                    Some(NullsOrder::First)
                } else {
                    self.consume_word("LAST")?;
                    Some(NullsOrder::Last)
                }
            } else {
                None
            };
            items.push(OrderByClause {
                expr,
                direction,
                nulls,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }
}
