//! Expression grammar, lowest precedence first:
//! OR, AND, NOT, comparison, additive, multiplicative, unary, primary.

use super::{PResult, Parser, error_at};
use crate::ast::*;
use crate::data_type::DataType;
use crate::token::{Keyword, TokenKind};

impl Parser {
    pub(super) fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_or()
    }

    pub(super) fn parse_expr_list(&mut self) -> PResult<Vec<Expr>> {
        let mut exprs = vec![self.parse_expr()?];
        while self.eat(TokenKind::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut left = self.parse_and()?;
        while self.eat_keyword(Keyword::Or) {
            let right = self.parse_and()?;
            left = Expr::binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut left = self.parse_not()?;
        while self.eat_keyword(Keyword::And) {
            let right = self.parse_not()?;
            left = Expr::binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> PResult<Expr> {
        if !self.eat_keyword(Keyword::Not) {
            return self.parse_comparison();
        }
        Ok(match self.parse_not()? {
            Expr::Exists {
                query,
                negated: false,
            } => Expr::Exists {
                query,
                negated: true,
            },
            expr => Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(expr),
            },
        })
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let mut left = self.parse_additive()?;

        loop {
            let op = match self.current_token().kind {
                TokenKind::Eq => Some(BinaryOp::Eq),
                TokenKind::NotEq => Some(BinaryOp::NotEq),
                TokenKind::Lt => Some(BinaryOp::Lt),
                TokenKind::LtEq => Some(BinaryOp::LtEq),
                TokenKind::Gt => Some(BinaryOp::Gt),
                TokenKind::GtEq => Some(BinaryOp::GtEq),
                _ => None,
            };
            if let Some(op) = op {
                self.advance();
                let right = self.parse_additive()?;
                left = Expr::binary(left, op, right);
                continue;
            }

            if self.eat_keyword(Keyword::Is) {
                let negated = self.eat_keyword(Keyword::Not);
                self.consume_keyword(Keyword::Null)?;
                left = Expr::IsNull {
                    expr: Box::new(left),
                    negated,
                };
                continue;
            }

            let negated = self.check_keyword(Keyword::Not)
                && matches!(
                    self.peek_token(1).kind,
                    TokenKind::Keyword(Keyword::In | Keyword::Between | Keyword::Like)
                );
            if negated {
                self.advance();
            }

            if self.eat_keyword(Keyword::In) {
                left = self.parse_in(left, negated)?;
            } else if self.eat_keyword(Keyword::Between) {
                let low = self.parse_additive()?;
                self.consume_keyword(Keyword::And)?;
                let high = self.parse_additive()?;
                left = Expr::Between {
                    expr: Box::new(left),
                    low: Box::new(low),
                    high: Box::new(high),
                    negated,
                };
            } else if self.eat_keyword(Keyword::Like) {
                let pattern = self.parse_additive()?;
                let escape = if self.eat_word("ESCAPE") {
                    Some(Box::new(self.parse_primary()?))
                } else {
                    None
                };
                left = Expr::Like {
                    expr: Box::new(left),
                    pattern: Box::new(pattern),
                    escape,
                    negated,
                };
            } else {
                break;
            }
        }

        Ok(left)
    }

    fn parse_in(&mut self, expr: Expr, negated: bool) -> PResult<Expr> {
        self.consume(TokenKind::LeftParen, "'('")?;
        let result = if self.check_keyword(Keyword::Select) || self.check_keyword(Keyword::With) {
            Expr::InSubquery {
                expr: Box::new(expr),
                query: Box::new(self.parse_query()?),
                negated,
            }
        } else {
            Expr::InList {
                expr: Box::new(expr),
                list: self.parse_expr_list()?,
                negated,
            }
        };
        self.consume(TokenKind::RightParen, "')'")?;
        Ok(result)
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current_token().kind {
                TokenKind::Plus => BinaryOp::Plus,
                TokenKind::Minus => BinaryOp::Minus,
                TokenKind::Concat => BinaryOp::Concat,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current_token().kind {
                TokenKind::Star => BinaryOp::Multiply,
                TokenKind::Slash => BinaryOp::Divide,
                TokenKind::Percent => BinaryOp::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::binary(left, op, right);
        }
        Ok(left)
    }

    pub(super) fn parse_unary(&mut self) -> PResult<Expr> {
        if self.eat(TokenKind::Plus) {
            return self.parse_unary();
        }
        if !self.eat(TokenKind::Minus) {
            return self.parse_primary();
        }
        // numeric literals absorb their sign
        Ok(match self.parse_unary()? {
            Expr::Literal(Literal::Integer(i)) => Expr::Literal(Literal::Integer(-i)),
            Expr::Literal(Literal::Float(x)) => Expr::Literal(Literal::Float(-x)),
            expr => Expr::Unary {
                op: UnaryOp::Minus,
                expr: Box::new(expr),
            },
        })
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let token = self.current_token().clone();
        match token.kind {
            TokenKind::Number => {
                self.advance();
                parse_number(&token.text)
                    .map(Expr::Literal)
                    .ok_or_else(|| error_at(&token, format!("Invalid number {}", token.text)))
            }
            TokenKind::String => {
                self.advance();
                Ok(Expr::Literal(Literal::String(token.text)))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(false)))
            }
            TokenKind::Parameter => {
                self.advance();
                self.parameter(&token.text)
                    .map(Expr::Parameter)
                    .ok_or_else(|| error_at(&token, format!("Invalid parameter {}", token.text)))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = if self.check_keyword(Keyword::Select) || self.check_keyword(Keyword::With) {
                    Expr::Subquery(Box::new(self.parse_query()?))
                } else {
                    self.parse_expr()?
                };
                self.consume(TokenKind::RightParen, "')'")?;
                Ok(expr)
            }
            TokenKind::Keyword(Keyword::Case) => self.parse_case(),
            TokenKind::Keyword(Keyword::Cast) => {
                self.advance();
                self.consume(TokenKind::LeftParen, "'('")?;
                let expr = self.parse_expr()?;
                self.consume_keyword(Keyword::As)?;
                let (target, _) = self.parse_type_name()?;
                self.consume(TokenKind::RightParen, "')'")?;
                Ok(Expr::Cast {
                    expr: Box::new(expr),
                    target,
                })
            }
            TokenKind::Keyword(Keyword::Exists) => {
                self.advance();
                self.consume(TokenKind::LeftParen, "'('")?;
                let query = self.parse_query()?;
                self.consume(TokenKind::RightParen, "')'")?;
                Ok(Expr::Exists {
                    query: Box::new(query),
                    negated: false,
                })
            }
            // LEFT(s, n) and RIGHT(s, n) share their names with join keywords
            TokenKind::Keyword(Keyword::Left | Keyword::Right)
                if self.peek_token(1).kind == TokenKind::LeftParen =>
            {
                self.advance();
                self.parse_function_call(token.text.to_uppercase())
            }
            TokenKind::Identifier | TokenKind::QuotedIdentifier => self.parse_name_expr(),
            _ => Err(self.unexpected("expression")),
        }
    }

    /// Column reference, function call, typed literal or `seq.NEXTVAL`.
    fn parse_name_expr(&mut self) -> PResult<Expr> {
        let token = self.next_token();

        if token.kind == TokenKind::Identifier {
            // DATE '2024-01-01' is shorthand for CAST('2024-01-01' AS DATE)
            let typed = match token.text.to_uppercase().as_str() {
                "DATE" => Some(DataType::Date),
                "TIME" => Some(DataType::Time),
                "TIMESTAMP" | "DATETIME" => Some(DataType::Timestamp),
                _ => None,
            };
            if let Some(data_type) = typed {
                if self.check(TokenKind::String) {
                    let text = self.next_token().text;
                    return Ok(Expr::Cast {
                        expr: Box::new(Expr::Literal(Literal::String(text))),
                        target: TypeName {
                            data_type,
                            length: None,
                            scale: None,
                        },
                    });
                }
            }

            if matches!(
                token.text.to_uppercase().as_str(),
                "CURRENT_TIMESTAMP" | "CURRENT_DATE" | "CURRENT_TIME" | "LOCALTIMESTAMP"
            ) && !self.check(TokenKind::LeftParen)
            {
                return Ok(Expr::Function(FunctionCall {
                    name: token.text.to_uppercase(),
                    args: Vec::new(),
                    star: false,
                    distinct: false,
                    over: None,
                }));
            }
        }

        if self.check(TokenKind::LeftParen) {
            return self.parse_function_call(token.text);
        }

        let mut parts = vec![token.text];
        while self.eat(TokenKind::Dot) {
            parts.push(self.consume_ident()?);
        }

        // seq.NEXTVAL / seq.CURRVAL
        if parts.len() >= 2 {
            let last = parts[parts.len() - 1].to_uppercase();
            if last == "NEXTVAL" || last == "CURRVAL" {
                let sequence = parts[..parts.len() - 1].join(".");
                return Ok(Expr::Function(FunctionCall {
                    name: last,
                    args: vec![Expr::Literal(Literal::String(sequence))],
                    star: false,
                    distinct: false,
                    over: None,
                }));
            }
        }

        let mut parts = parts.into_iter().rev();
        let name = parts.next().unwrap_or_default();
        let table = parts.next();
        let schema = parts.next();
        if parts.next().is_some() {
            return Err(self.unexpected("column reference with at most three parts"));
        }
        Ok(Expr::Column(ColumnRef {
            schema,
            table,
            name,
        }))
    }

    fn parse_function_call(&mut self, name: String) -> PResult<Expr> {
        self.consume(TokenKind::LeftParen, "'('")?;
        let distinct = self.eat_keyword(Keyword::Distinct);
        let mut star = false;
        let mut args = Vec::new();
        if self.eat(TokenKind::Star) {
            star = true;
        } else if !self.check(TokenKind::RightParen) {
            args = self.parse_expr_list()?;
        }
        self.consume(TokenKind::RightParen, "')'")?;

        let over = if self.eat_word("OVER") {
            self.consume(TokenKind::LeftParen, "'('")?;
            let mut window = WindowSpec::default();
            if self.eat_word("PARTITION") {
                self.consume_keyword(Keyword::By)?;
                window.partition_by = self.parse_expr_list()?;
            }
            if self.eat_keyword(Keyword::Order) {
                self.consume_keyword(Keyword::By)?;
                window.order_by = self.parse_order_by_list()?;
            }
            self.consume(TokenKind::RightParen, "')'")?;
            Some(window)
        } else {
            None
        };

        Ok(Expr::Function(FunctionCall {
            name,
            args,
            star,
            distinct,
            over,
        }))
    }

    fn parse_case(&mut self) -> PResult<Expr> {
        self.consume_keyword(Keyword::Case)?;
        let operand = if self.check_keyword(Keyword::When) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };

        let mut branches = Vec::new();
        while self.eat_keyword(Keyword::When) {
            let condition = self.parse_expr()?;
            self.consume_keyword(Keyword::Then)?;
            let result = self.parse_expr()?;
            branches.push((condition, result));
        }
        if branches.is_empty() {
            return Err(self.unexpected("WHEN"));
        }

        let else_result = if self.eat_keyword(Keyword::Else) {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        self.consume_keyword(Keyword::End)?;

        Ok(Expr::Case {
            operand,
            branches,
            else_result,
        })
    }

    /// Resolves a parameter marker. Bare `?` markers are numbered left to
    /// right within the statement; `$n` is one-based.
    fn parameter(&mut self, marker: &str) -> Option<Parameter> {
        if marker == "?" {
            let idx = self.next_parameter;
            self.next_parameter += 1;
            return Some(Parameter::Positional(idx));
        }
        let (sigil, rest) = marker.split_at(1);
        if sigil == "$" && rest.chars().all(|c| c.is_ascii_digit()) {
            let n = rest.parse::<usize>().ok()?;
            return n.checked_sub(1).map(Parameter::Positional);
        }
        Some(Parameter::Named(rest.to_string()))
    }
}

fn parse_number(text: &str) -> Option<Literal> {
    let is_integer = text.chars().all(|c| c.is_ascii_digit());
    if is_integer {
        if let Ok(i) = text.parse::<i64>() {
            return Some(Literal::Integer(i));
        }
    }
    text.parse::<f64>().ok().map(Literal::Float)
}

#[cfg(test)]
mod tests {
    use super::super::tests::parse_one;
    use crate::ast::*;
    use crate::data_type::DataType;

    fn expr(sql: &str) -> Expr {
        match parse_one(&format!("SELECT {sql}")) {
            Statement::Select(select) => match select.columns.into_iter().next() {
                Some(SelectItem::Expr { expr, .. }) => expr,
                other => panic!("Expected expression, got {other:?}"),
            },
            other => panic!("Expected Select, got {other:?}"),
        }
    }

    fn int(i: i64) -> Expr {
        Expr::Literal(Literal::Integer(i))
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            expr("1 + 2 * 3"),
            Expr::binary(int(1), BinaryOp::Plus, Expr::binary(int(2), BinaryOp::Multiply, int(3)))
        );
        assert_eq!(expr("a OR b AND c").to_string(), "(a OR (b AND c))");
        assert_eq!(expr("NOT a = 1 AND b").to_string(), "((NOT (a = 1)) AND b)");
        assert_eq!(expr("a || b = 'xy'").to_string(), "((a || b) = 'xy')");
        assert_eq!(expr("10 - 4 - 3").to_string(), "((10 - 4) - 3)");
    }

    #[test]
    fn test_negative_literals_fold() {
        assert_eq!(expr("-5"), int(-5));
        assert_eq!(expr("-2.5"), Expr::Literal(Literal::Float(-2.5)));
        assert_eq!(expr("- x").to_string(), "(- x)");
        assert_eq!(expr("+7"), int(7));
    }

    #[test]
    fn test_predicates() {
        assert!(matches!(expr("a IS NOT NULL"), Expr::IsNull { negated: true, .. }));
        assert!(matches!(expr("a NOT IN (1, 2)"), Expr::InList { negated: true, ref list, .. } if list.len() == 2));
        assert!(matches!(expr("a IN (SELECT b FROM t)"), Expr::InSubquery { negated: false, .. }));
        assert!(matches!(expr("a NOT BETWEEN 1 AND 5"), Expr::Between { negated: true, .. }));
        assert!(matches!(expr("a LIKE 'x%' ESCAPE '\\'"), Expr::Like { escape: Some(_), .. }));
        assert!(matches!(expr("NOT EXISTS (SELECT 1)"), Expr::Exists { negated: true, .. }));
    }

    #[test]
    fn test_between_binds_tighter_than_and() {
        assert_eq!(
            expr("x BETWEEN 1 AND 2 AND y").to_string(),
            "((x BETWEEN 1 AND 2) AND y)"
        );
    }

    #[test]
    fn test_function_calls() {
        let Expr::Function(call) = expr("COUNT(*)") else {
            panic!("Expected function");
        };
        assert!(call.star);
        assert!(call.is_aggregate());

        let Expr::Function(call) = expr("count(DISTINCT city)") else {
            panic!("Expected function");
        };
        assert!(call.distinct);
        assert_eq!(call.args, vec![Expr::column("city")]);

        let Expr::Function(call) = expr("LEFT(name, 2)") else {
            panic!("Expected function");
        };
        assert_eq!(call.name, "LEFT");

        let Expr::Function(call) = expr("RANK() OVER (ORDER BY score DESC)") else {
            panic!("Expected function");
        };
        assert_eq!(call.over.unwrap().order_by.len(), 1);
    }

    #[test]
    fn test_qualified_columns() {
        assert_eq!(
            expr("s.t.c"),
            Expr::Column(ColumnRef {
                schema: Some("s".into()),
                table: Some("t".into()),
                name: "c".into()
            })
        );
        let Expr::Function(call) = expr("app.orders_seq.nextval") else {
            panic!("Expected NEXTVAL call");
        };
        assert_eq!(call.name, "NEXTVAL");
        assert_eq!(call.args, vec![Expr::Literal(Literal::String("app.orders_seq".into()))]);
    }

    #[test]
    fn test_typed_literals_and_cast() {
        assert_eq!(
            expr("DATE '2024-02-01'"),
            Expr::Cast {
                expr: Box::new(Expr::Literal(Literal::String("2024-02-01".into()))),
                target: TypeName {
                    data_type: DataType::Date,
                    length: None,
                    scale: None
                }
            }
        );
        let Expr::Cast { target, .. } = expr("CAST(x AS VARCHAR(20))") else {
            panic!("Expected cast");
        };
        assert_eq!(target.data_type, DataType::Varchar);
        assert_eq!(target.length, Some(20));
    }

    #[test]
    fn test_parameters_are_numbered_per_statement() {
        let output = crate::parser::parse_sql("SELECT ?, ?, $5, @who; SELECT ?");
        assert!(output.errors.is_empty());
        let Statement::Select(first) = &output.statements[0] else {
            panic!("Expected Select");
        };
        let params: Vec<String> = first.columns.iter().map(ToString::to_string).collect();
        assert_eq!(params, vec!["$1", "$2", "$5", ":who"]);
        assert_eq!(output.statements[1].to_string(), "SELECT $1");
    }

    #[test]
    fn test_case_expression() {
        let Expr::Case {
            operand, branches, else_result,
        } = expr("CASE grade WHEN 'A' THEN 4 WHEN 'B' THEN 3 END")
        else {
            panic!("Expected case");
        };
        assert!(operand.is_some());
        assert_eq!(branches.len(), 2);
        assert!(else_result.is_none());
    }
}
