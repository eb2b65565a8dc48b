//! Transaction control, access control and session statements.

use super::{PResult, Parser};
use crate::ast::*;
use crate::token::{Keyword, TokenKind};

impl Parser {
    pub(super) fn parse_transaction(&mut self) -> PResult<Statement> {
        if self.eat_keyword(Keyword::Begin) {
            self.eat_optional_transaction();
            return Ok(Statement::Begin);
        }
        if self.eat_word("START") {
            self.consume_word("TRANSACTION")?;
            return Ok(Statement::Begin);
        }
        if self.eat_keyword(Keyword::Commit) {
            self.eat_optional_transaction();
            return Ok(Statement::Commit);
        }
        if self.eat_keyword(Keyword::Rollback) {
            self.eat_optional_transaction();
            let savepoint = if self.eat_keyword(Keyword::To) {
                self.eat_keyword(Keyword::Savepoint);
                Some(self.consume_ident()?)
            } else {
                None
            };
            return Ok(Statement::Rollback { savepoint });
        }
        if self.eat_keyword(Keyword::Savepoint) {
            let name = self.consume_ident()?;
            return Ok(Statement::Savepoint { name });
        }
        self.consume_word("RELEASE")?;
        self.eat_keyword(Keyword::Savepoint);
        let name = self.consume_ident()?;
        Ok(Statement::ReleaseSavepoint { name })
    }

    fn eat_optional_transaction(&mut self) {
        if !self.eat_word("TRANSACTION") {
            self.eat_word("WORK");
        }
    }

    /// User or role name, quoted with either kind of quote.
    pub(super) fn parse_principal(&mut self) -> PResult<String> {
        match self.current_token().kind {
            TokenKind::Identifier | TokenKind::QuotedIdentifier | TokenKind::String => {
                Ok(self.next_token().text)
            }
            _ => Err(self.unexpected("user or role name")),
        }
    }

    fn parse_principal_list(&mut self) -> PResult<Vec<String>> {
        let mut names = vec![self.parse_principal()?];
        while self.eat(TokenKind::Comma) {
            names.push(self.parse_principal()?);
        }
        Ok(names)
    }

    /// Privilege or role names up to `ON`, `TO` or `FROM`. Keyword privileges
    /// are stored in upper case, role names as written.
    fn parse_privileges(&mut self) -> PResult<Vec<String>> {
        let mut privileges = Vec::new();
        loop {
            let token = self.current_token().clone();
            let privilege = match token.kind {
                TokenKind::Keyword(Keyword::All) => {
                    self.advance();
                    self.eat_word("PRIVILEGES");
                    "ALL".to_string()
                }
                TokenKind::Keyword(
                    keyword @ (Keyword::Select
                    | Keyword::Insert
                    | Keyword::Update
                    | Keyword::Delete
                    | Keyword::Create
                    | Keyword::Drop
                    | Keyword::Alter
                    | Keyword::Truncate
                    | Keyword::References),
                ) => {
                    self.advance();
                    keyword.as_str().to_string()
                }
                TokenKind::Identifier | TokenKind::QuotedIdentifier => {
                    self.advance();
                    token.text
                }
                _ => return Err(self.unexpected("privilege")),
            };
            privileges.push(privilege);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(privileges)
    }

    fn parse_grant_object(&mut self) -> PResult<Option<ObjectName>> {
        if !self.eat_keyword(Keyword::On) {
            return Ok(None);
        }
        self.eat_keyword(Keyword::Table);
        self.parse_object_name().map(Some)
    }

    pub(super) fn parse_grant(&mut self) -> PResult<Statement> {
        self.consume_keyword(Keyword::Grant)?;
        let privileges = self.parse_privileges()?;
        let object = self.parse_grant_object()?;
        self.consume_keyword(Keyword::To)?;
        let grantees = self.parse_principal_list()?;
        let with_grant_option = if self.eat_keyword(Keyword::With) {
            self.consume_keyword(Keyword::Grant)?;
            self.consume_word("OPTION")?;
            true
        } else {
            false
        };
        Ok(Statement::Grant(Grant {
            privileges,
            object,
            grantees,
            with_grant_option,
        }))
    }

    pub(super) fn parse_revoke(&mut self) -> PResult<Statement> {
        self.consume_keyword(Keyword::Revoke)?;
        let privileges = self.parse_privileges()?;
        let object = self.parse_grant_object()?;
        self.consume_keyword(Keyword::From)?;
        let grantees = self.parse_principal_list()?;
        Ok(Statement::Revoke(Revoke {
            privileges,
            object,
            grantees,
        }))
    }

    pub(super) fn parse_describe(&mut self) -> PResult<Statement> {
        self.advance();
        self.eat_keyword(Keyword::Table);
        let table = self.parse_object_name()?;
        Ok(Statement::Describe { table })
    }

    pub(super) fn parse_show(&mut self) -> PResult<Statement> {
        self.consume_keyword(Keyword::Show)?;
        let show = if self.eat_word("TABLES") {
            let schema = if self.eat_keyword(Keyword::From) || self.eat_keyword(Keyword::In) {
                Some(self.consume_ident()?)
            } else {
                None
            };
            Show::Tables { schema }
        } else if self.eat_word("SCHEMAS") || self.eat_word("DATABASES") {
            Show::Schemas
        } else if self.eat_word("VIEWS") {
            Show::Views
        } else if self.eat_word("SEQUENCES") {
            Show::Sequences
        } else if self.eat_word("USERS") {
            Show::Users
        } else if self.eat_word("ROLES") {
            Show::Roles
        } else if self.eat_word("GRANTS") {
            let grantee = if self.eat_word("FOR") {
                Some(self.parse_principal()?)
            } else {
                None
            };
            Show::Grants { grantee }
        } else if self.eat_word("COLUMNS") {
            if !self.eat_keyword(Keyword::From) {
                self.consume_keyword(Keyword::In)?;
            }
            Show::Columns {
                table: self.parse_object_name()?,
            }
        } else {
            Show::Variable(self.consume_ident()?)
        };
        Ok(Statement::Show(show))
    }

    /// `SET name {= | TO} value`; the separator may be left out
    /// (`SET SCHEMA 'sales'`).
    pub(super) fn parse_set(&mut self) -> PResult<Statement> {
        self.consume_keyword(Keyword::Set)?;
        let name = self.consume_ident()?;
        if !self.eat(TokenKind::Eq) {
            self.eat_keyword(Keyword::To);
        }
        let value = self.parse_expr()?;
        Ok(Statement::Set { name, value })
    }

    pub(super) fn parse_use(&mut self) -> PResult<Statement> {
        self.consume_keyword(Keyword::Use)?;
        let schema = self.consume_ident()?;
        Ok(Statement::Use { schema })
    }
}
