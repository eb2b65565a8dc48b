//! Error types for the SQL engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// A syntax error recorded by the parser, with the position of the offending token.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} at line {line} column {column}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Syntax error: {0}")]
    Syntax(ParseError),

    // Catalog errors
    #[error("Schema not found: {0}")]
    SchemaNotFound(String),

    #[error("Schema already exists: {0}")]
    SchemaExists(String),

    #[error("Schema {0} is not empty, use CASCADE to drop it")]
    SchemaNotEmpty(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("View not found: {0}")]
    ViewNotFound(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Column already exists: {0}")]
    ColumnExists(String),

    #[error("Expected {expected} values, found {found}")]
    ColumnCountMismatch { expected: usize, found: usize },

    #[error("Index already exists: {0}")]
    IndexExists(String),

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Sequence not found: {0}")]
    SequenceNotFound(String),

    #[error("Sequence already exists: {0}")]
    SequenceExists(String),

    #[error("Sequence {name} reached its limit {limit}")]
    SequenceExhausted { name: String, limit: i64 },

    #[error("CURRVAL of sequence {0} is not yet defined in this session")]
    SequenceNotInitialized(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("Role already exists: {0}")]
    RoleExists(String),

    #[error("Procedure not found: {0}")]
    ProcedureNotFound(String),

    #[error("Procedure already exists: {0}")]
    ProcedureExists(String),

    // Constraint errors
    #[error("NULL value in column {column} of table {table} violates NOT NULL constraint")]
    NullViolation { table: String, column: String },

    // Transaction errors
    #[error("A transaction is already active")]
    TransactionActive,

    #[error("No active transaction")]
    NoActiveTransaction,

    #[error("Savepoint not found: {0}")]
    SavepointNotFound(String),

    // Evaluation errors
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Aggregate function {0} is not allowed here")]
    AggregateMisuse(String),

    #[error("No value bound for parameter {0}")]
    ParameterNotBound(String),

    #[error("Recursive common table expression {0} is not supported")]
    RecursiveCte(String),

    #[error("View {0} refers to itself")]
    RecursiveView(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl Error {
    /// Short symbolic identifier reported to hosts alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Syntax(_) => "SYNTAX_ERROR",
            Self::SchemaNotFound(_) => "SCHEMA_NOT_FOUND",
            Self::SchemaExists(_) => "SCHEMA_EXISTS",
            Self::SchemaNotEmpty(_) => "SCHEMA_NOT_EMPTY",
            Self::TableNotFound(_) => "TABLE_NOT_FOUND",
            Self::TableExists(_) => "TABLE_EXISTS",
            Self::ViewNotFound(_) => "VIEW_NOT_FOUND",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::ColumnExists(_) => "COLUMN_EXISTS",
            Self::ColumnCountMismatch { .. } => "COLUMN_COUNT_MISMATCH",
            Self::IndexExists(_) => "INDEX_EXISTS",
            Self::IndexNotFound(_) => "INDEX_NOT_FOUND",
            Self::SequenceNotFound(_) => "SEQUENCE_NOT_FOUND",
            Self::SequenceExists(_) => "SEQUENCE_EXISTS",
            Self::SequenceExhausted { .. } => "SEQUENCE_EXHAUSTED",
            Self::SequenceNotInitialized(_) => "SEQUENCE_NOT_INITIALIZED",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::UserExists(_) => "USER_EXISTS",
            Self::RoleNotFound(_) => "ROLE_NOT_FOUND",
            Self::RoleExists(_) => "ROLE_EXISTS",
            Self::ProcedureNotFound(_) => "PROCEDURE_NOT_FOUND",
            Self::ProcedureExists(_) => "PROCEDURE_EXISTS",
            Self::NullViolation { .. } => "NULL_VIOLATION",
            Self::TransactionActive => "TRANSACTION_ACTIVE",
            Self::NoActiveTransaction => "NO_ACTIVE_TRANSACTION",
            Self::SavepointNotFound(_) => "SAVEPOINT_NOT_FOUND",
            Self::UnknownFunction(_) => "UNKNOWN_FUNCTION",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::AggregateMisuse(_) => "AGGREGATE_MISUSE",
            Self::ParameterNotBound(_) => "PARAMETER_NOT_BOUND",
            Self::RecursiveCte(_) => "RECURSIVE_CTE",
            Self::RecursiveView(_) => "RECURSIVE_VIEW",
            Self::Unsupported(_) => "UNSUPPORTED",
        }
    }
}

impl From<ParseError> for Error {
    fn from(error: ParseError) -> Self {
        Self::Syntax(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_symbolic() {
        let err = Error::NullViolation {
            table: "t".into(),
            column: "name".into(),
        };
        assert_eq!(err.code(), "NULL_VIOLATION");
        assert!(err.to_string().contains("name"));

        assert_eq!(Error::SchemaNotEmpty("s".into()).code(), "SCHEMA_NOT_EMPTY");
        assert_eq!(Error::TransactionActive.code(), "TRANSACTION_ACTIVE");
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError {
            message: "Expected FROM, found ;".into(),
            line: 2,
            column: 7,
            offset: 15,
        };
        assert_eq!(err.to_string(), "Expected FROM, found ; at line 2 column 7");
        assert_eq!(Error::from(err).code(), "SYNTAX_ERROR");
    }
}
