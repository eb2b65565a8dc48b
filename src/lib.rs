//! An embeddable, in-memory SQL engine.
//!
//! SQL text goes through [`tokenize`] and [`parse`] into [`ast::Statement`]s,
//! which the executor runs against a [`Catalog`] of schemas, tables, views,
//! sequences, users and roles. [`Database`] ties these together and reports
//! one [`StatementResult`] per statement of a batch.

pub mod ast;
pub mod catalog;
pub mod config;
pub mod data_type;
pub mod database;
pub mod error;
pub mod eval;
pub mod executor;
pub mod functions;
pub mod parser;
pub mod row;
pub mod table;
pub mod token;
pub mod tokenizer;
pub mod transaction;
pub mod value;

pub use ast::{ObjectName, Statement};
pub use catalog::Catalog;
pub use config::{EngineConfig, IdentifierCase};
pub use data_type::DataType;
pub use database::{BatchResult, Database, ErrorInfo, Params, ResultSet, StatementResult};
pub use error::{Error, ParseError, Result};
pub use parser::{ParseOutput, Parser, parse};
pub use row::Row;
pub use table::{ColumnDefinition, TableDefinition, TableStorage};
pub use token::Token;
pub use tokenizer::tokenize;
pub use value::Value;
