use super::{PResult, Parser, error_at};
use crate::ast::*;
use crate::data_type::DataType;
use crate::table::{ColumnDefinition, DefaultValue, ForeignKey, ReferentialAction};
use crate::token::{Keyword, TokenKind};
use crate::value::{Value, parse_datetime};

impl Parser {
    pub(super) fn parse_create(&mut self) -> PResult<Statement> {
        let start = self.position;
        self.consume_keyword(Keyword::Create)?;

        let or_replace = if self.eat_keyword(Keyword::Or) {
            self.consume_word("REPLACE")?;
            true
        } else {
            false
        };
        if !self.eat_word("TEMPORARY") {
            self.eat_word("TEMP");
        }

        if self.eat_keyword(Keyword::Table) {
            return self.parse_create_table();
        }
        if self.eat_keyword(Keyword::Unique) {
            self.consume_word("INDEX")?;
            return self.parse_create_index(true);
        }
        if self.eat_word("INDEX") {
            return self.parse_create_index(false);
        }
        if self.eat_word("VIEW") {
            return self.parse_create_view(or_replace);
        }
        if self.eat_word("SEQUENCE") {
            return self.parse_create_sequence();
        }
        if self.eat_word("SCHEMA") || self.eat_word("DATABASE") {
            let if_not_exists = self.parse_if_not_exists()?;
            let name = self.consume_ident()?;
            return Ok(Statement::CreateSchema {
                name,
                if_not_exists,
            });
        }
        if self.eat_word("USER") {
            return self.parse_create_user();
        }
        if self.eat_word("ROLE") {
            let if_not_exists = self.parse_if_not_exists()?;
            let name = self.consume_ident()?;
            return Ok(Statement::CreateRole {
                name,
                if_not_exists,
            });
        }
        if self.check_word("PROCEDURE") || self.check_word("FUNCTION") {
            return self.parse_create_procedure(start, or_replace);
        }

        Err(self.unexpected("TABLE, VIEW, INDEX, SEQUENCE, SCHEMA, USER, ROLE or PROCEDURE"))
    }

    fn parse_create_table(&mut self) -> PResult<Statement> {
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.parse_object_name()?;

        if self.eat_keyword(Keyword::As) {
            let query = self.parse_query()?;
            return Ok(Statement::CreateTable(CreateTable {
                name,
                if_not_exists,
                columns: Vec::new(),
                constraints: Vec::new(),
                as_select: Some(Box::new(query)),
            }));
        }

        self.consume(TokenKind::LeftParen, "'('")?;
        let mut columns = vec![];
        let mut constraints = vec![];
        loop {
            if self.starts_table_constraint() {
                constraints.push(self.parse_table_constraint()?);
            } else {
                columns.push(self.parse_column_def()?);
            }
            match self.current_token().kind {
                TokenKind::RightParen => {
                    self.advance();
                    break;
                }
                TokenKind::Comma => {
                    self.advance();
                    continue;
                }
                _ => return Err(self.unexpected("',' or ')'")),
            }
        }

        Ok(Statement::CreateTable(CreateTable {
            name,
            if_not_exists,
            columns,
            constraints,
            as_select: None,
        }))
    }

    fn starts_table_constraint(&self) -> bool {
        matches!(
            self.current_token().kind,
            TokenKind::Keyword(
                Keyword::Constraint
                    | Keyword::Primary
                    | Keyword::Unique
                    | Keyword::Foreign
                    | Keyword::Check
            )
        )
    }

    /// Parses a column type. The flag reports a `SERIAL` pseudo-type, which is
    /// rewritten into its integer type here.
    pub(super) fn parse_type_name(&mut self) -> PResult<(TypeName, bool)> {
        let token = self.consume(TokenKind::Identifier, "data type")?;
        let upper = token.text.to_uppercase();

        let (data_type, serial) = match upper.as_str() {
            "SERIAL" | "SERIAL4" => (DataType::Integer, true),
            "SMALLSERIAL" | "SERIAL2" => (DataType::SmallInt, true),
            "BIGSERIAL" | "SERIAL8" => (DataType::BigInt, true),
            "DOUBLE" => {
                self.eat_word("PRECISION");
                (DataType::Double, false)
            }
            "CHARACTER" | "CHAR" if self.eat_word("VARYING") => (DataType::Varchar, false),
            _ => match DataType::from_name(&upper) {
                Some(data_type) => (data_type, false),
                None => return Err(error_at(&token, format!("Unknown data type {}", token.text))),
            },
        };

        let mut length = None;
        let mut scale = None;
        if self.eat(TokenKind::LeftParen) {
            length = Some(self.parse_type_size()?);
            if self.eat(TokenKind::Comma) {
                scale = Some(self.parse_type_size()?);
            }
            self.consume(TokenKind::RightParen, "')'")?;
        }

        Ok((
            TypeName {
                data_type,
                length,
                scale,
            },
            serial,
        ))
    }

    fn parse_type_size(&mut self) -> PResult<u32> {
        let token = self.consume(TokenKind::Number, "type size")?;
        token
            .text
            .parse()
            .map_err(|_| error_at(&token, format!("Invalid type size {}", token.text)))
    }

    /// Column name, type, then a stream of constraints applied in order.
    fn parse_column_def(&mut self) -> PResult<ColumnDefinition> {
        let name = self.consume_ident()?;
        let (type_name, serial) = self.parse_type_name()?;

        let mut column = ColumnDefinition::new(name, type_name.data_type);
        if type_name.data_type == DataType::Decimal {
            column.precision = type_name.length;
        } else {
            column.length = type_name.length;
        }
        column.scale = type_name.scale;
        if serial {
            column.auto_increment = true;
            column.nullable = false;
        }

        loop {
            if self.eat_keyword(Keyword::Not) {
                self.consume_keyword(Keyword::Null)?;
                column.nullable = false;
            } else if self.eat_keyword(Keyword::Null) {
                column.nullable = true;
            } else if self.eat_keyword(Keyword::Primary) {
                self.consume_word("KEY")?;
                column.primary_key = true;
                column.nullable = false;
            } else if self.eat_keyword(Keyword::Unique) {
                self.eat_word("KEY");
                column.unique = true;
            } else if self.eat_keyword(Keyword::Default) {
                column.default = Some(self.parse_default_value()?);
            } else if self.eat_keyword(Keyword::References) {
                column.references = Some(self.parse_references(None, vec![column.name.clone()])?);
            } else if self.eat_keyword(Keyword::Check) {
                column.check = Some(self.parse_check_body()?);
            } else if self.eat_keyword(Keyword::Constraint) {
                self.consume_ident()?;
            } else if self.eat_word("AUTO_INCREMENT")
                || self.eat_word("AUTOINCREMENT")
                || self.eat_word("IDENTITY")
            {
                column.auto_increment = true;
            } else {
                break;
            }
        }

        Ok(column)
    }

    fn parse_default_value(&mut self) -> PResult<DefaultValue> {
        if self.eat(TokenKind::LeftParen) {
            let value = self.parse_default_value()?;
            self.consume(TokenKind::RightParen, "')'")?;
            return Ok(value);
        }

        let token = self.current_token().clone();
        let value = match token.kind {
            TokenKind::Keyword(Keyword::Null) => Value::Null,
            TokenKind::Keyword(Keyword::True) => Value::Bool(true),
            TokenKind::Keyword(Keyword::False) => Value::Bool(false),
            TokenKind::String => Value::from(token.text.as_str()),
            TokenKind::Number | TokenKind::Minus => {
                return match self.parse_unary()? {
                    Expr::Literal(literal) => Ok(DefaultValue::Value(literal.to_value())),
                    _ => Err(error_at(&token, "Expected literal default value".to_string())),
                };
            }
            TokenKind::Identifier => {
                let upper = token.text.to_uppercase();
                self.advance();
                if matches!(upper.as_str(), "CURRENT_TIMESTAMP" | "NOW" | "LOCALTIMESTAMP") {
                    if self.eat(TokenKind::LeftParen) {
                        self.consume(TokenKind::RightParen, "')'")?;
                    }
                    return Ok(DefaultValue::CurrentTimestamp);
                }
                if matches!(upper.as_str(), "DATE" | "TIMESTAMP" | "DATETIME") {
                    let literal = self.consume(TokenKind::String, "string literal")?;
                    return parse_datetime(&literal.text)
                        .map(|dt| DefaultValue::Value(Value::DateTime(dt)))
                        .ok_or_else(|| {
                            error_at(&literal, format!("Invalid datetime {}", literal.text))
                        });
                }
                return Err(error_at(&token, format!("Expected literal default value, found {token}")));
            }
            _ => return Err(self.unexpected("literal default value")),
        };
        self.advance();
        Ok(DefaultValue::Value(value))
    }

    /// `REFERENCES table [(columns)] [ON DELETE action] [ON UPDATE action]`,
    /// after the REFERENCES keyword.
    fn parse_references(&mut self, name: Option<String>, columns: Vec<String>) -> PResult<ForeignKey> {
        let table = self.parse_object_name()?.to_string();
        let referenced_columns = if self.check(TokenKind::LeftParen) {
            self.parse_ident_list()?
        } else {
            Vec::new()
        };

        let mut on_delete = None;
        let mut on_update = None;
        while self.eat_keyword(Keyword::On) {
            if self.eat_keyword(Keyword::Delete) {
                on_delete = Some(self.parse_referential_action()?);
            } else if self.eat_keyword(Keyword::Update) {
                on_update = Some(self.parse_referential_action()?);
            } else {
                return Err(self.unexpected("DELETE or UPDATE"));
            }
        }

        Ok(ForeignKey {
            name,
            columns,
            table,
            referenced_columns,
            on_delete,
            on_update,
        })
    }

    fn parse_referential_action(&mut self) -> PResult<ReferentialAction> {
        if self.eat_word("CASCADE") {
            Ok(ReferentialAction::Cascade)
        } else if self.eat_word("RESTRICT") {
            Ok(ReferentialAction::Restrict)
        } else if self.eat_keyword(Keyword::Set) {
            if self.eat_keyword(Keyword::Null) {
                Ok(ReferentialAction::SetNull)
            } else {
                self.consume_keyword(Keyword::Default)?;
                Ok(ReferentialAction::SetDefault)
            }
        } else if self.eat_word("NO") {
            self.consume_word("ACTION")?;
            Ok(ReferentialAction::NoAction)
        } else {
            Err(self.unexpected("referential action"))
        }
    }

    /// `( tokens )` after CHECK, kept as source text.
    fn parse_check_body(&mut self) -> PResult<String> {
        self.consume(TokenKind::LeftParen, "'('")?;
        let start = self.position;
        let mut depth = 0usize;
        loop {
            match self.current_token().kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen if depth == 0 => break,
                TokenKind::RightParen => depth -= 1,
                TokenKind::Eof => return Err(self.unexpected("')'")),
                _ => {}
            }
            self.advance();
        }
        let text = self.source_span(start);
        self.advance();
        Ok(text)
    }

    fn parse_table_constraint(&mut self) -> PResult<TableConstraint> {
        let name = if self.eat_keyword(Keyword::Constraint) {
            Some(self.consume_ident()?)
        } else {
            None
        };

        if self.eat_keyword(Keyword::Primary) {
            self.consume_word("KEY")?;
            let columns = self.parse_ident_list()?;
            Ok(TableConstraint::PrimaryKey { name, columns })
        } else if self.eat_keyword(Keyword::Unique) {
            self.eat_word("KEY");
            let columns = self.parse_ident_list()?;
            Ok(TableConstraint::Unique { name, columns })
        } else if self.eat_keyword(Keyword::Foreign) {
            self.consume_word("KEY")?;
            let columns = self.parse_ident_list()?;
            self.consume_keyword(Keyword::References)?;
            Ok(TableConstraint::ForeignKey(self.parse_references(name, columns)?))
        } else if self.eat_keyword(Keyword::Check) {
            let expr = self.parse_check_body()?;
            Ok(TableConstraint::Check { name, expr })
        } else {
            Err(self.unexpected("PRIMARY KEY, UNIQUE, FOREIGN KEY or CHECK"))
        }
    }

    fn parse_create_index(&mut self, unique: bool) -> PResult<Statement> {
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.consume_ident()?;
        self.consume_keyword(Keyword::On)?;
        let table = self.parse_object_name()?;

        self.consume(TokenKind::LeftParen, "'('")?;
        let mut columns = Vec::new();
        loop {
            columns.push(self.consume_ident()?);
            if !self.eat_keyword(Keyword::Asc) {
                self.eat_keyword(Keyword::Desc);
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::RightParen, "')'")?;

        Ok(Statement::CreateIndex(CreateIndex {
            name,
            table,
            columns,
            unique,
            if_not_exists,
        }))
    }

    fn parse_create_view(&mut self, or_replace: bool) -> PResult<Statement> {
        let name = self.parse_object_name()?;
        let columns = if self.check(TokenKind::LeftParen) {
            self.parse_ident_list()?
        } else {
            Vec::new()
        };
        self.consume_keyword(Keyword::As)?;
        let query = self.parse_query()?;
        Ok(Statement::CreateView(CreateView {
            name,
            or_replace,
            columns,
            query: Box::new(query),
        }))
    }

    fn parse_create_sequence(&mut self) -> PResult<Statement> {
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.parse_object_name()?;
        let mut options = SequenceOptions::default();

        loop {
            if self.eat_word("START") {
                self.eat_keyword(Keyword::With);
                options.start = Some(self.parse_integer()?);
            } else if self.eat_word("INCREMENT") {
                self.eat_keyword(Keyword::By);
                options.increment = Some(self.parse_integer()?);
            } else if self.eat_word("MINVALUE") {
                options.min_value = Some(self.parse_integer()?);
            } else if self.eat_word("MAXVALUE") {
                options.max_value = Some(self.parse_integer()?);
            } else if self.eat_word("CACHE") {
                options.cache = Some(self.parse_integer()?);
            } else if self.eat_word("CYCLE") {
                options.cycle = true;
            } else if self.eat_word("NOCYCLE") {
                options.cycle = false;
            } else if self.eat_word("NO") {
                if self.eat_word("CYCLE") {
                    options.cycle = false;
                } else if self.eat_word("MINVALUE") {
                    options.min_value = None;
                } else if self.eat_word("MAXVALUE") {
                    options.max_value = None;
                } else {
                    return Err(self.unexpected("CYCLE, MINVALUE or MAXVALUE"));
                }
            } else {
                break;
            }
        }

        Ok(Statement::CreateSequence(CreateSequence {
            name,
            if_not_exists,
            options,
        }))
    }

    fn parse_create_user(&mut self) -> PResult<Statement> {
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.parse_principal()?;
        let password = if self.eat_word("IDENTIFIED") {
            self.consume_keyword(Keyword::By)?;
            Some(self.consume(TokenKind::String, "password string")?.text)
        } else if self.eat_keyword(Keyword::With) || self.check_word("PASSWORD") {
            self.consume_word("PASSWORD")?;
            Some(self.consume(TokenKind::String, "password string")?.text)
        } else {
            None
        };
        Ok(Statement::CreateUser(CreateUser {
            name,
            password,
            if_not_exists,
        }))
    }

    /// Skips the routine body, keeping the whole statement as text. `BEGIN`
    /// and `CASE` open blocks closed by `END`; a `;` only ends the statement
    /// outside of any block.
    fn parse_create_procedure(&mut self, start: usize, or_replace: bool) -> PResult<Statement> {
        let kind = if self.eat_word("PROCEDURE") {
            RoutineKind::Procedure
        } else {
            self.consume_word("FUNCTION")?;
            RoutineKind::Function
        };
        let name = self.parse_object_name()?;

        let mut depth = 0usize;
        loop {
            match self.current_token().kind {
                TokenKind::Eof => break,
                TokenKind::Semicolon if depth == 0 => break,
                TokenKind::Keyword(Keyword::Begin | Keyword::Case) => depth += 1,
                TokenKind::Keyword(Keyword::End) => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.advance();
        }

        Ok(Statement::CreateProcedure(CreateProcedure {
            name,
            kind,
            or_replace,
            source: self.source_span(start),
        }))
    }

    pub(super) fn parse_drop(&mut self) -> PResult<Statement> {
        self.consume_keyword(Keyword::Drop)?;
        let object = if self.eat_keyword(Keyword::Table) {
            ObjectType::Table
        } else if self.eat_word("VIEW") {
            ObjectType::View
        } else if self.eat_word("INDEX") {
            ObjectType::Index
        } else if self.eat_word("SEQUENCE") {
            ObjectType::Sequence
        } else if self.eat_word("SCHEMA") || self.eat_word("DATABASE") {
            ObjectType::Schema
        } else if self.eat_word("USER") {
            ObjectType::User
        } else if self.eat_word("ROLE") {
            ObjectType::Role
        } else if self.eat_word("PROCEDURE") {
            ObjectType::Procedure
        } else if self.eat_word("FUNCTION") {
            ObjectType::Function
        } else {
            return Err(self.unexpected("object type"));
        };

        let if_exists = self.parse_if_exists()?;
        let name = if matches!(object, ObjectType::User | ObjectType::Role) {
            ObjectName::new(self.parse_principal()?)
        } else {
            self.parse_object_name()?
        };
        if object == ObjectType::Index && self.eat_keyword(Keyword::On) {
            self.parse_object_name()?;
        }
        let cascade = self.eat_word("CASCADE");
        if !cascade {
            self.eat_word("RESTRICT");
        }

        Ok(Statement::Drop(Drop {
            object,
            name,
            if_exists,
            cascade,
        }))
    }

    pub(super) fn parse_alter(&mut self) -> PResult<Statement> {
        self.consume_keyword(Keyword::Alter)?;
        self.consume_keyword(Keyword::Table)?;
        let table = self.parse_object_name()?;

        let action = if self.eat_word("ADD") {
            self.eat_word("COLUMN");
            AlterAction::AddColumn(self.parse_column_def()?)
        } else if self.eat_keyword(Keyword::Drop) {
            self.eat_word("COLUMN");
            AlterAction::DropColumn(self.consume_ident()?)
        } else if self.eat_word("RENAME") {
            if self.eat_keyword(Keyword::To) {
                AlterAction::RenameTable(self.consume_ident()?)
            } else {
                self.eat_word("COLUMN");
                let from = self.consume_ident()?;
                self.consume_keyword(Keyword::To)?;
                let to = self.consume_ident()?;
                AlterAction::RenameColumn { from, to }
            }
        } else {
            return Err(self.unexpected("ADD, DROP or RENAME"));
        };

        Ok(Statement::AlterTable(AlterTable { table, action }))
    }

    pub(super) fn parse_truncate(&mut self) -> PResult<Statement> {
        self.consume_keyword(Keyword::Truncate)?;
        self.eat_keyword(Keyword::Table);
        let table = self.parse_object_name()?;
        Ok(Statement::Truncate { table })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::parse_one;
    use crate::ast::*;
    use crate::data_type::DataType;
    use crate::table::{DefaultValue, ReferentialAction};
    use crate::value::Value;

    fn create_table(sql: &str) -> CreateTable {
        match parse_one(sql) {
            Statement::CreateTable(create) => create,
            other => panic!("Expected CreateTable, got {other:?}"),
        }
    }

    #[test]
    fn test_column_constraint_stream() {
        let create = create_table(
            "CREATE TABLE t (
                id INTEGER PRIMARY KEY,
                name VARCHAR(10) NOT NULL UNIQUE,
                price NUMERIC(8, 2) DEFAULT 0.5,
                created TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                owner INT NULL REFERENCES users (id) ON DELETE SET NULL ON UPDATE CASCADE,
                qty INT CHECK (qty >= 0)
            )",
        );
        let [id, name, price, created, owner, qty] = create.columns.as_slice() else {
            panic!("Expected six columns");
        };
        assert!(id.primary_key && !id.nullable);
        assert_eq!((name.length, name.nullable, name.unique), (Some(10), false, true));
        assert_eq!((price.precision, price.scale), (Some(8), Some(2)));
        assert_eq!(price.default, Some(DefaultValue::Value(Value::Float(0.5))));
        assert_eq!(created.default, Some(DefaultValue::CurrentTimestamp));

        let fk = owner.references.as_ref().unwrap();
        assert!(owner.nullable);
        assert_eq!(fk.table, "users");
        assert_eq!(fk.referenced_columns, vec!["id"]);
        assert_eq!(fk.on_delete, Some(ReferentialAction::SetNull));
        assert_eq!(fk.on_update, Some(ReferentialAction::Cascade));

        assert_eq!(qty.check.as_deref(), Some("qty >= 0"));
    }

    #[test]
    fn test_serial_is_rewritten() {
        let create = create_table("CREATE TABLE t (a SERIAL, b BIGSERIAL, c SMALLSERIAL)");
        let types: Vec<_> = create.columns.iter().map(|c| c.data_type).collect();
        assert_eq!(types, vec![DataType::Integer, DataType::BigInt, DataType::SmallInt]);
        assert!(create.columns.iter().all(|c| c.auto_increment && !c.nullable));
    }

    #[test]
    fn test_table_constraints() {
        let create = create_table(
            "CREATE TABLE line (
                order_id INT, item INT, note TEXT,
                CONSTRAINT pk_line PRIMARY KEY (order_id, item),
                UNIQUE (note),
                FOREIGN KEY (order_id) REFERENCES orders (id),
                CHECK (item > 0)
            )",
        );
        assert_eq!(create.columns.len(), 3);
        assert_eq!(create.constraints.len(), 4);
        assert_eq!(
            create.constraints[0],
            TableConstraint::PrimaryKey {
                name: Some("pk_line".into()),
                columns: vec!["order_id".into(), "item".into()]
            }
        );
        assert!(matches!(&create.constraints[2], TableConstraint::ForeignKey(fk) if fk.columns == vec!["order_id"]));
        assert!(matches!(&create.constraints[3], TableConstraint::Check { expr, .. } if expr == "item > 0"));
    }

    #[test]
    fn test_create_table_as_select() {
        let create = create_table("CREATE TABLE copy AS SELECT * FROM t WHERE x = 1");
        assert!(create.columns.is_empty());
        assert!(create.as_select.is_some());
    }

    #[test]
    fn test_unknown_type_reports_position() {
        let output = crate::parser::parse_sql("CREATE TABLE t (a WIBBLE)");
        assert_eq!(output.errors.len(), 1);
        assert_eq!(output.errors[0].column, 19);
        assert!(output.errors[0].message.contains("WIBBLE"));
    }

    #[test]
    fn test_procedure_body_is_skipped() {
        let output = crate::parser::parse_sql(
            "CREATE PROCEDURE p() BEGIN UPDATE t SET a = 1; SELECT CASE WHEN a THEN 1 END; END; SELECT 1",
        );
        assert!(output.errors.is_empty(), "{:?}", output.errors);
        assert_eq!(output.statements.len(), 2);
        let Statement::CreateProcedure(procedure) = &output.statements[0] else {
            panic!("Expected procedure");
        };
        assert_eq!(procedure.kind, RoutineKind::Procedure);
        assert_eq!(procedure.name, ObjectName::new("p"));
        assert!(procedure.source.ends_with("END"));
    }

    #[test]
    fn test_sequence_options() {
        let Statement::CreateSequence(sequence) =
            parse_one("CREATE SEQUENCE s INCREMENT BY -1 MINVALUE -10 NO MAXVALUE NO CYCLE CACHE 5")
        else {
            panic!("Expected sequence");
        };
        assert_eq!(sequence.options.increment, Some(-1));
        assert_eq!(sequence.options.min_value, Some(-10));
        assert_eq!(sequence.options.max_value, None);
        assert!(!sequence.options.cycle);
        assert_eq!(sequence.options.cache, Some(5));
    }

    #[test]
    fn test_drop_and_alter() {
        assert_eq!(
            parse_one("DROP SCHEMA IF EXISTS sales CASCADE"),
            Statement::Drop(Drop {
                object: ObjectType::Schema,
                name: ObjectName::new("sales"),
                if_exists: true,
                cascade: true
            })
        );
        assert!(matches!(
            parse_one("ALTER TABLE t RENAME TO u"),
            Statement::AlterTable(AlterTable { action: AlterAction::RenameTable(ref n), .. }) if n == "u"
        ));
        assert!(matches!(
            parse_one("ALTER TABLE t DROP COLUMN c"),
            Statement::AlterTable(AlterTable { action: AlterAction::DropColumn(ref n), .. }) if n == "c"
        ));
    }
}
