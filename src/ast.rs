//! Abstract syntax tree produced by the parser.
//!
//! Every node renders back to SQL through `Display`. The rendering is fully
//! parenthesized, so parsing it again yields an equal tree.

use std::fmt::{self, Display};

use crate::data_type::DataType;
use crate::table::{ColumnDefinition, DefaultValue, ForeignKey};
use crate::token::Keyword;
use crate::value::Value;

/// Function names treated as aggregates when called without `OVER`.
pub const AGGREGATE_FUNCTIONS: &[&str] = &["COUNT", "SUM", "AVG", "MIN", "MAX"];

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Box<Select>),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    CreateTable(CreateTable),
    CreateView(CreateView),
    CreateIndex(CreateIndex),
    CreateSequence(CreateSequence),
    CreateSchema { name: String, if_not_exists: bool },
    CreateUser(CreateUser),
    CreateRole { name: String, if_not_exists: bool },
    CreateProcedure(CreateProcedure),
    Drop(Drop),
    AlterTable(AlterTable),
    Truncate { table: ObjectName },
    Grant(Grant),
    Revoke(Revoke),
    Begin,
    Commit,
    Rollback { savepoint: Option<String> },
    Savepoint { name: String },
    ReleaseSavepoint { name: String },
    Describe { table: ObjectName },
    Show(Show),
    Set { name: String, value: Expr },
    Use { schema: String },
}

/// A possibly schema-qualified object name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectName {
    pub schema: Option<String>,
    pub name: String,
}

impl ObjectName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub with: Option<With>,
    pub distinct: bool,
    pub columns: Vec<SelectItem>,
    pub from: Vec<FromItem>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderByClause>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct With {
    pub recursive: bool,
    pub ctes: Vec<Cte>,
}

/// Common table expression: `name [(columns)] AS (query)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    pub name: String,
    pub columns: Vec<String>,
    pub query: Box<Select>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Wildcard,
    /// `t.*`
    QualifiedWildcard(String),
    Expr { expr: Expr, alias: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FromItem {
    Table {
        name: ObjectName,
        alias: Option<String>,
    },
    Subquery {
        query: Box<Select>,
        alias: Option<String>,
    },
    Join {
        left: Box<FromItem>,
        right: Box<FromItem>,
        kind: JoinKind,
        constraint: JoinConstraint,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinConstraint {
    On(Expr),
    Using(Vec<String>),
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByClause {
    pub expr: Expr,
    pub direction: SortDirection,
    /// Explicit `NULLS FIRST` / `NULLS LAST`.
    pub nulls: Option<NullsOrder>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: ObjectName,
    pub columns: Option<Vec<String>>,
    pub source: InsertSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Values(Vec<Vec<Expr>>),
    Select(Box<Select>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: ObjectName,
    pub alias: Option<String>,
    pub assignments: Vec<(String, Expr)>,
    pub where_clause: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: ObjectName,
    pub alias: Option<String>,
    pub where_clause: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: ObjectName,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnDefinition>,
    pub constraints: Vec<TableConstraint>,
    /// `CREATE TABLE ... AS SELECT`
    pub as_select: Option<Box<Select>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraint {
    PrimaryKey {
        name: Option<String>,
        columns: Vec<String>,
    },
    Unique {
        name: Option<String>,
        columns: Vec<String>,
    },
    ForeignKey(ForeignKey),
    Check {
        name: Option<String>,
        expr: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateView {
    pub name: ObjectName,
    pub or_replace: bool,
    pub columns: Vec<String>,
    pub query: Box<Select>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndex {
    pub name: String,
    pub table: ObjectName,
    pub columns: Vec<String>,
    pub unique: bool,
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SequenceOptions {
    pub start: Option<i64>,
    pub increment: Option<i64>,
    pub min_value: Option<i64>,
    pub max_value: Option<i64>,
    pub cycle: bool,
    pub cache: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateSequence {
    pub name: ObjectName,
    pub if_not_exists: bool,
    pub options: SequenceOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateUser {
    pub name: String,
    pub password: Option<String>,
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineKind {
    Procedure,
    Function,
}

/// Stored procedure or function, kept as source text only.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateProcedure {
    pub name: ObjectName,
    pub kind: RoutineKind,
    pub or_replace: bool,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Table,
    View,
    Index,
    Sequence,
    Schema,
    User,
    Role,
    Procedure,
    Function,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Drop {
    pub object: ObjectType,
    pub name: ObjectName,
    pub if_exists: bool,
    pub cascade: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterTable {
    pub table: ObjectName,
    pub action: AlterAction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterAction {
    AddColumn(ColumnDefinition),
    DropColumn(String),
    RenameTable(String),
    RenameColumn { from: String, to: String },
}

/// `GRANT privileges ON object TO grantees`, or `GRANT role TO user` when
/// `object` is absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Grant {
    pub privileges: Vec<String>,
    pub object: Option<ObjectName>,
    pub grantees: Vec<String>,
    pub with_grant_option: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Revoke {
    pub privileges: Vec<String>,
    pub object: Option<ObjectName>,
    pub grantees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Show {
    Tables { schema: Option<String> },
    Schemas,
    Views,
    Sequences,
    Users,
    Roles,
    Grants { grantee: Option<String> },
    Columns { table: ObjectName },
    Variable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Column(ColumnRef),
    Parameter(Parameter),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<Expr>,
        query: Box<Select>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        escape: Option<Box<Expr>>,
        negated: bool,
    },
    Case {
        operand: Option<Box<Expr>>,
        branches: Vec<(Expr, Expr)>,
        else_result: Option<Box<Expr>>,
    },
    Cast {
        expr: Box<Expr>,
        target: TypeName,
    },
    Exists {
        query: Box<Select>,
        negated: bool,
    },
    Subquery(Box<Select>),
    Function(FunctionCall),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Literal {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Boolean(b) => Value::Bool(*b),
            Self::Integer(i) => Value::Int(*i),
            Self::Float(x) => Value::Float(*x),
            Self::String(s) => Value::from(s.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub schema: Option<String>,
    pub table: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: None,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    /// `?` (numbered left to right) or `$n`, zero-based.
    Positional(usize),
    /// `:name` or `@name`, stored without the marker.
    Named(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Concat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeName {
    pub data_type: DataType,
    pub length: Option<u32>,
    pub scale: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expr>,
    /// `COUNT(*)`
    pub star: bool,
    pub distinct: bool,
    pub over: Option<WindowSpec>,
}

impl FunctionCall {
    pub fn is_aggregate(&self) -> bool {
        self.over.is_none()
            && AGGREGATE_FUNCTIONS
                .iter()
                .any(|name| name.eq_ignore_ascii_case(&self.name))
    }
}

/// `OVER (PARTITION BY ... ORDER BY ...)`, parsed but never evaluated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowSpec {
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<OrderByClause>,
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(ColumnRef::new(name))
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Self::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Visits this expression and its children in pre-order. Subqueries are
    /// not entered. Returning `false` from `visit` skips the node's children.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr) -> bool) {
        if !visit(self) {
            return;
        }
        match self {
            Self::Literal(_)
            | Self::Column(_)
            | Self::Parameter(_)
            | Self::Exists { .. }
            | Self::Subquery(_) => {}
            Self::Unary { expr, .. }
            | Self::IsNull { expr, .. }
            | Self::InSubquery { expr, .. }
            | Self::Cast { expr, .. } => expr.walk(visit),
            Self::Binary { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Self::InList { expr, list, .. } => {
                expr.walk(visit);
                list.iter().for_each(|e| e.walk(visit));
            }
            Self::Between { expr, low, high, .. } => {
                expr.walk(visit);
                low.walk(visit);
                high.walk(visit);
            }
            Self::Like {
                expr,
                pattern,
                escape,
                ..
            } => {
                expr.walk(visit);
                pattern.walk(visit);
                if let Some(escape) = escape {
                    escape.walk(visit);
                }
            }
            Self::Case {
                operand,
                branches,
                else_result,
            } => {
                if let Some(operand) = operand {
                    operand.walk(visit);
                }
                for (condition, result) in branches {
                    condition.walk(visit);
                    result.walk(visit);
                }
                if let Some(else_result) = else_result {
                    else_result.walk(visit);
                }
            }
            Self::Function(call) => {
                call.args.iter().for_each(|e| e.walk(visit));
                if let Some(over) = &call.over {
                    over.partition_by.iter().for_each(|e| e.walk(visit));
                    over.order_by.iter().for_each(|o| o.expr.walk(visit));
                }
            }
        }
    }

    /// Aggregate calls in this expression, outermost first. Arguments of an
    /// aggregate are not searched.
    pub fn aggregates(&self) -> Vec<&FunctionCall> {
        let mut found = Vec::new();
        self.walk(&mut |expr| match expr {
            Self::Function(call) if call.is_aggregate() => {
                found.push(call);
                false
            }
            _ => true,
        });
        found
    }

    pub fn contains_aggregate(&self) -> bool {
        !self.aggregates().is_empty()
    }
}

fn join<T: Display>(values: &[T], separator: &str) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

/// Writes an identifier, quoting it when it would not lex back as itself.
pub fn quote_ident(name: &str) -> String {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        && Keyword::lookup(name).is_none();
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

fn idents(names: &[String]) -> String {
    names
        .iter()
        .map(|n| quote_ident(n))
        .collect::<Vec<_>>()
        .join(", ")
}

fn quote_string(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Renders a stored value as a SQL literal.
pub fn value_literal(value: &Value) -> String {
    match value {
        Value::Text(s) => quote_string(s),
        Value::DateTime(_) => format!("TIMESTAMP {}", quote_string(&value.to_string())),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Float(x) => Literal::Float(*x).to_string(),
        other => other.to_string(),
    }
}

impl Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{}.", quote_ident(schema))?;
        }
        f.write_str(&quote_ident(&self.name))
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Boolean(true) => f.write_str("TRUE"),
            Self::Boolean(false) => f.write_str("FALSE"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => {
                let text = x.to_string();
                if text.contains(['.', 'e', 'E']) || !x.is_finite() {
                    f.write_str(&text)
                } else {
                    write!(f, "{text}.0")
                }
            }
            Self::String(s) => f.write_str(&quote_string(s)),
        }
    }
}

impl Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{}.", quote_ident(schema))?;
        }
        if let Some(table) = &self.table {
            write!(f, "{}.", quote_ident(table))?;
        }
        f.write_str(&quote_ident(&self.name))
    }
}

impl Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positional(idx) => write!(f, "${}", idx + 1),
            Self::Named(name) => write!(f, ":{name}"),
        }
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Or => "OR",
            Self::And => "AND",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Concat => "||",
        })
    }
}

impl Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data_type)?;
        match (self.length, self.scale) {
            (Some(len), Some(scale)) => write!(f, "({len}, {scale})"),
            (Some(len), None) => write!(f, "({len})"),
            _ => Ok(()),
        }
    }
}

fn not(negated: bool) -> &'static str {
    if negated { "NOT " } else { "" }
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(literal) => write!(f, "{literal}"),
            Self::Column(column) => write!(f, "{column}"),
            Self::Parameter(param) => write!(f, "{param}"),
            Self::Unary {
                op: UnaryOp::Not,
                expr,
            } => write!(f, "(NOT {expr})"),
            Self::Unary {
                op: UnaryOp::Minus,
                expr,
            } => write!(f, "(- {expr})"),
            Self::Binary { left, op, right } => write!(f, "({left} {op} {right})"),
            Self::IsNull { expr, negated } => write!(f, "({expr} IS {}NULL)", not(*negated)),
            Self::InList {
                expr,
                list,
                negated,
            } => write!(f, "({expr} {}IN ({}))", not(*negated), join(list, ", ")),
            Self::InSubquery {
                expr,
                query,
                negated,
            } => write!(f, "({expr} {}IN ({query}))", not(*negated)),
            Self::Between {
                expr,
                low,
                high,
                negated,
            } => write!(f, "({expr} {}BETWEEN {low} AND {high})", not(*negated)),
            Self::Like {
                expr,
                pattern,
                escape,
                negated,
            } => {
                write!(f, "({expr} {}LIKE {pattern}", not(*negated))?;
                if let Some(escape) = escape {
                    write!(f, " ESCAPE {escape}")?;
                }
                f.write_str(")")
            }
            Self::Case {
                operand,
                branches,
                else_result,
            } => {
                f.write_str("CASE")?;
                if let Some(operand) = operand {
                    write!(f, " {operand}")?;
                }
                for (condition, result) in branches {
                    write!(f, " WHEN {condition} THEN {result}")?;
                }
                if let Some(else_result) = else_result {
                    write!(f, " ELSE {else_result}")?;
                }
                f.write_str(" END")
            }
            Self::Cast { expr, target } => write!(f, "CAST({expr} AS {target})"),
            Self::Exists { query, negated } => {
                if *negated {
                    write!(f, "(NOT EXISTS ({query}))")
                } else {
                    write!(f, "EXISTS ({query})")
                }
            }
            Self::Subquery(query) => write!(f, "({query})"),
            Self::Function(call) => write!(f, "{call}"),
        }
    }
}

impl Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        if self.star {
            f.write_str("*")?;
        } else {
            f.write_str(&join(&self.args, ", "))?;
        }
        f.write_str(")")?;
        if let Some(over) = &self.over {
            write!(f, " OVER ({over})")?;
        }
        Ok(())
    }
}

impl Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.partition_by.is_empty() {
            parts.push(format!("PARTITION BY {}", join(&self.partition_by, ", ")));
        }
        if !self.order_by.is_empty() {
            parts.push(format!("ORDER BY {}", join(&self.order_by, ", ")));
        }
        f.write_str(&parts.join(" "))
    }
}

impl Display for OrderByClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if self.direction == SortDirection::Desc {
            f.write_str(" DESC")?;
        }
        match self.nulls {
            Some(NullsOrder::First) => f.write_str(" NULLS FIRST"),
            Some(NullsOrder::Last) => f.write_str(" NULLS LAST"),
            None => Ok(()),
        }
    }
}

impl Display for SelectItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard => f.write_str("*"),
            Self::QualifiedWildcard(table) => write!(f, "{}.*", quote_ident(table)),
            Self::Expr { expr, alias: None } => write!(f, "{expr}"),
            Self::Expr {
                expr,
                alias: Some(alias),
            } => write!(f, "{expr} AS {}", quote_ident(alias)),
        }
    }
}

impl Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
            Self::Cross => "CROSS JOIN",
        })
    }
}

fn alias(alias: &Option<String>) -> String {
    alias
        .as_ref()
        .map(|a| format!(" AS {}", quote_ident(a)))
        .unwrap_or_default()
}

impl Display for FromItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table { name, alias: a } => write!(f, "{name}{}", alias(a)),
            Self::Subquery { query, alias: a } => write!(f, "({query}){}", alias(a)),
            Self::Join {
                left,
                right,
                kind,
                constraint,
            } => {
                write!(f, "{left} {kind} {right}")?;
                match constraint {
                    JoinConstraint::On(expr) => write!(f, " ON {expr}"),
                    JoinConstraint::Using(columns) => write!(f, " USING ({})", idents(columns)),
                    JoinConstraint::None => Ok(()),
                }
            }
        }
    }
}

impl Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(with) = &self.with {
            f.write_str("WITH ")?;
            if with.recursive {
                f.write_str("RECURSIVE ")?;
            }
            let ctes: Vec<String> = with
                .ctes
                .iter()
                .map(|cte| {
                    let columns = if cte.columns.is_empty() {
                        String::new()
                    } else {
                        format!(" ({})", idents(&cte.columns))
                    };
                    format!("{}{columns} AS ({})", quote_ident(&cte.name), cte.query)
                })
                .collect();
            write!(f, "{} ", ctes.join(", "))?;
        }
        f.write_str("SELECT ")?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        f.write_str(&join(&self.columns, ", "))?;
        if !self.from.is_empty() {
            write!(f, " FROM {}", join(&self.from, ", "))?;
        }
        if let Some(expr) = &self.where_clause {
            write!(f, " WHERE {expr}")?;
        }
        if !self.group_by.is_empty() {
            write!(f, " GROUP BY {}", join(&self.group_by, ", "))?;
        }
        if let Some(expr) = &self.having {
            write!(f, " HAVING {expr}")?;
        }
        if !self.order_by.is_empty() {
            write!(f, " ORDER BY {}", join(&self.order_by, ", "))?;
        }
        if let Some(expr) = &self.limit {
            write!(f, " LIMIT {expr}")?;
        }
        if let Some(expr) = &self.offset {
            write!(f, " OFFSET {expr}")?;
        }
        Ok(())
    }
}

impl Display for ColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", quote_ident(&self.name), self.type_string())?;
        if !self.nullable {
            f.write_str(" NOT NULL")?;
        }
        if self.primary_key {
            f.write_str(" PRIMARY KEY")?;
        }
        if self.unique {
            f.write_str(" UNIQUE")?;
        }
        if self.auto_increment {
            f.write_str(" AUTO_INCREMENT")?;
        }
        match &self.default {
            Some(DefaultValue::Value(value)) => write!(f, " DEFAULT {}", value_literal(value))?,
            Some(DefaultValue::CurrentTimestamp) => f.write_str(" DEFAULT CURRENT_TIMESTAMP")?,
            None => {}
        }
        if let Some(reference) = &self.references {
            write!(f, " {}", References(reference))?;
        }
        if let Some(check) = &self.check {
            write!(f, " CHECK ({check})")?;
        }
        Ok(())
    }
}

/// The `REFERENCES t (c) [ON DELETE ..] [ON UPDATE ..]` tail of a foreign key.
struct References<'a>(&'a ForeignKey);

impl Display for References<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fk = self.0;
        write!(f, "REFERENCES {}", fk.table)?;
        if !fk.referenced_columns.is_empty() {
            write!(f, " ({})", idents(&fk.referenced_columns))?;
        }
        if let Some(action) = fk.on_delete {
            write!(f, " ON DELETE {action}")?;
        }
        if let Some(action) = fk.on_update {
            write!(f, " ON UPDATE {action}")?;
        }
        Ok(())
    }
}

fn constraint_name(name: &Option<String>) -> String {
    name.as_ref()
        .map(|n| format!("CONSTRAINT {} ", quote_ident(n)))
        .unwrap_or_default()
}

impl Display for TableConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrimaryKey { name, columns } => {
                write!(f, "{}PRIMARY KEY ({})", constraint_name(name), idents(columns))
            }
            Self::Unique { name, columns } => {
                write!(f, "{}UNIQUE ({})", constraint_name(name), idents(columns))
            }
            Self::ForeignKey(fk) => write!(
                f,
                "{}FOREIGN KEY ({}) {}",
                constraint_name(&fk.name),
                idents(&fk.columns),
                References(fk)
            ),
            Self::Check { name, expr } => write!(f, "{}CHECK ({expr})", constraint_name(name)),
        }
    }
}

impl Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Table => "TABLE",
            Self::View => "VIEW",
            Self::Index => "INDEX",
            Self::Sequence => "SEQUENCE",
            Self::Schema => "SCHEMA",
            Self::User => "USER",
            Self::Role => "ROLE",
            Self::Procedure => "PROCEDURE",
            Self::Function => "FUNCTION",
        })
    }
}

fn if_not_exists(flag: bool) -> &'static str {
    if flag { "IF NOT EXISTS " } else { "" }
}

fn grant_target(privileges: &[String], object: &Option<ObjectName>) -> String {
    match object {
        Some(object) => format!("{} ON {object}", privileges.join(", ")),
        None => idents(privileges),
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select(select) => write!(f, "{select}"),
            Self::Insert(insert) => {
                write!(f, "INSERT INTO {}", insert.table)?;
                if let Some(columns) = &insert.columns {
                    write!(f, " ({})", idents(columns))?;
                }
                match &insert.source {
                    InsertSource::Values(rows) => {
                        let rows: Vec<String> = rows
                            .iter()
                            .map(|row| format!("({})", join(row, ", ")))
                            .collect();
                        write!(f, " VALUES {}", rows.join(", "))
                    }
                    InsertSource::Select(query) => write!(f, " {query}"),
                }
            }
            Self::Update(update) => {
                write!(f, "UPDATE {}{} SET ", update.table, alias(&update.alias))?;
                let assignments: Vec<String> = update
                    .assignments
                    .iter()
                    .map(|(column, expr)| format!("{} = {expr}", quote_ident(column)))
                    .collect();
                f.write_str(&assignments.join(", "))?;
                if let Some(expr) = &update.where_clause {
                    write!(f, " WHERE {expr}")?;
                }
                Ok(())
            }
            Self::Delete(delete) => {
                write!(f, "DELETE FROM {}{}", delete.table, alias(&delete.alias))?;
                if let Some(expr) = &delete.where_clause {
                    write!(f, " WHERE {expr}")?;
                }
                Ok(())
            }
            Self::CreateTable(create) => {
                write!(f, "CREATE TABLE {}{}", if_not_exists(create.if_not_exists), create.name)?;
                if let Some(query) = &create.as_select {
                    return write!(f, " AS {query}");
                }
                let mut parts: Vec<String> = create.columns.iter().map(ToString::to_string).collect();
                parts.extend(create.constraints.iter().map(ToString::to_string));
                write!(f, " ({})", parts.join(", "))
            }
            Self::CreateView(view) => {
                f.write_str("CREATE ")?;
                if view.or_replace {
                    f.write_str("OR REPLACE ")?;
                }
                write!(f, "VIEW {}", view.name)?;
                if !view.columns.is_empty() {
                    write!(f, " ({})", idents(&view.columns))?;
                }
                write!(f, " AS {}", view.query)
            }
            Self::CreateIndex(index) => write!(
                f,
                "CREATE {}INDEX {}{} ON {} ({})",
                if index.unique { "UNIQUE " } else { "" },
                if_not_exists(index.if_not_exists),
                quote_ident(&index.name),
                index.table,
                idents(&index.columns)
            ),
            Self::CreateSequence(sequence) => {
                write!(
                    f,
                    "CREATE SEQUENCE {}{}",
                    if_not_exists(sequence.if_not_exists),
                    sequence.name
                )?;
                let options = &sequence.options;
                if let Some(start) = options.start {
                    write!(f, " START WITH {start}")?;
                }
                if let Some(increment) = options.increment {
                    write!(f, " INCREMENT BY {increment}")?;
                }
                if let Some(min) = options.min_value {
                    write!(f, " MINVALUE {min}")?;
                }
                if let Some(max) = options.max_value {
                    write!(f, " MAXVALUE {max}")?;
                }
                if let Some(cache) = options.cache {
                    write!(f, " CACHE {cache}")?;
                }
                if options.cycle {
                    f.write_str(" CYCLE")?;
                }
                Ok(())
            }
            Self::CreateSchema {
                name,
                if_not_exists: flag,
            } => write!(f, "CREATE SCHEMA {}{}", if_not_exists(*flag), quote_ident(name)),
            Self::CreateUser(user) => {
                write!(
                    f,
                    "CREATE USER {}{}",
                    if_not_exists(user.if_not_exists),
                    quote_ident(&user.name)
                )?;
                if let Some(password) = &user.password {
                    write!(f, " IDENTIFIED BY {}", quote_string(password))?;
                }
                Ok(())
            }
            Self::CreateRole {
                name,
                if_not_exists: flag,
            } => write!(f, "CREATE ROLE {}{}", if_not_exists(*flag), quote_ident(name)),
            Self::CreateProcedure(procedure) => f.write_str(&procedure.source),
            Self::Drop(drop) => {
                write!(f, "DROP {} ", drop.object)?;
                if drop.if_exists {
                    f.write_str("IF EXISTS ")?;
                }
                write!(f, "{}", drop.name)?;
                if drop.cascade {
                    f.write_str(" CASCADE")?;
                }
                Ok(())
            }
            Self::AlterTable(alter) => {
                write!(f, "ALTER TABLE {} ", alter.table)?;
                match &alter.action {
                    AlterAction::AddColumn(column) => write!(f, "ADD COLUMN {column}"),
                    AlterAction::DropColumn(name) => write!(f, "DROP COLUMN {}", quote_ident(name)),
                    AlterAction::RenameTable(name) => write!(f, "RENAME TO {}", quote_ident(name)),
                    AlterAction::RenameColumn { from, to } => write!(
                        f,
                        "RENAME COLUMN {} TO {}",
                        quote_ident(from),
                        quote_ident(to)
                    ),
                }
            }
            Self::Truncate { table } => write!(f, "TRUNCATE TABLE {table}"),
            Self::Grant(grant) => {
                write!(
                    f,
                    "GRANT {} TO {}",
                    grant_target(&grant.privileges, &grant.object),
                    idents(&grant.grantees)
                )?;
                if grant.with_grant_option {
                    f.write_str(" WITH GRANT OPTION")?;
                }
                Ok(())
            }
            Self::Revoke(revoke) => write!(
                f,
                "REVOKE {} FROM {}",
                grant_target(&revoke.privileges, &revoke.object),
                idents(&revoke.grantees)
            ),
            Self::Begin => f.write_str("BEGIN"),
            Self::Commit => f.write_str("COMMIT"),
            Self::Rollback { savepoint: None } => f.write_str("ROLLBACK"),
            Self::Rollback {
                savepoint: Some(name),
            } => write!(f, "ROLLBACK TO SAVEPOINT {}", quote_ident(name)),
            Self::Savepoint { name } => write!(f, "SAVEPOINT {}", quote_ident(name)),
            Self::ReleaseSavepoint { name } => {
                write!(f, "RELEASE SAVEPOINT {}", quote_ident(name))
            }
            Self::Describe { table } => write!(f, "DESCRIBE {table}"),
            Self::Show(show) => match show {
                Show::Tables { schema: None } => f.write_str("SHOW TABLES"),
                Show::Tables {
                    schema: Some(schema),
                } => write!(f, "SHOW TABLES FROM {}", quote_ident(schema)),
                Show::Schemas => f.write_str("SHOW SCHEMAS"),
                Show::Views => f.write_str("SHOW VIEWS"),
                Show::Sequences => f.write_str("SHOW SEQUENCES"),
                Show::Users => f.write_str("SHOW USERS"),
                Show::Roles => f.write_str("SHOW ROLES"),
                Show::Grants { grantee: None } => f.write_str("SHOW GRANTS"),
                Show::Grants {
                    grantee: Some(grantee),
                } => write!(f, "SHOW GRANTS FOR {}", quote_ident(grantee)),
                Show::Columns { table } => write!(f, "SHOW COLUMNS FROM {table}"),
                Show::Variable(name) => write!(f, "SHOW {}", quote_ident(name)),
            },
            Self::Set { name, value } => write!(f, "SET {} = {value}", quote_ident(name)),
            Self::Use { schema } => write!(f, "USE {}", quote_ident(schema)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_display_is_parenthesized() {
        let expr = Expr::binary(
            Expr::column("a"),
            BinaryOp::Plus,
            Expr::binary(Expr::column("b"), BinaryOp::Multiply, Expr::Literal(Literal::Integer(2))),
        );
        assert_eq!(expr.to_string(), "(a + (b * 2))");
    }

    #[test]
    fn test_literal_display() {
        assert_eq!(Literal::Float(3.0).to_string(), "3.0");
        assert_eq!(Literal::Float(0.25).to_string(), "0.25");
        assert_eq!(Literal::String("it's".into()).to_string(), "'it''s'");
        assert_eq!(Literal::Integer(-4).to_string(), "-4");
    }

    #[test]
    fn test_identifier_quoting() {
        assert_eq!(quote_ident("users"), "users");
        assert_eq!(quote_ident("order"), "\"order\"");
        assert_eq!(quote_ident("my col"), "\"my col\"");
        assert_eq!(quote_ident("1st"), "\"1st\"");
    }

    #[test]
    fn test_aggregates_are_found_outside_subqueries() {
        let count = Expr::Function(FunctionCall {
            name: "count".into(),
            args: vec![],
            star: true,
            distinct: false,
            over: None,
        });
        let expr = Expr::binary(count.clone(), BinaryOp::Plus, Expr::Literal(Literal::Integer(1)));
        assert!(expr.contains_aggregate());
        assert_eq!(expr.aggregates().len(), 1);
        assert_eq!(count.to_string(), "count(*)");

        let windowed = Expr::Function(FunctionCall {
            name: "SUM".into(),
            args: vec![Expr::column("x")],
            star: false,
            distinct: false,
            over: Some(WindowSpec::default()),
        });
        assert!(!windowed.contains_aggregate());
    }
}
