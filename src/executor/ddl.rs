//! Schema changes, security, transaction control and the utility
//! statements (DESCRIBE, SHOW, SET, USE).

use tracing::info;

use super::{Executor, Outcome};
use crate::ast::{
    AlterAction, AlterTable, CreateTable, Drop, Expr, ObjectName, ObjectType, Show, Statement,
    TableConstraint,
};
use crate::catalog::{Procedure, View};
use crate::data_type::DataType;
use crate::database::ResultSet;
use crate::error::{Error, Result};
use crate::eval::{self, Scope};
use crate::row::Row;
use crate::table::{
    CheckConstraint, ColumnDefinition, DefaultValue, ForeignKey, IndexDefinition, TableDefinition,
};
use crate::value::Value;

/// Settings that name the current schema.
const SCHEMA_SETTINGS: &[&str] = &["SCHEMA", "SEARCH_PATH", "CURRENT_SCHEMA"];

impl Executor<'_> {
    pub(super) fn execute_utility(&mut self, statement: &Statement) -> Result<Outcome> {
        match statement {
            Statement::CreateTable(create) => return self.create_table(create),
            Statement::CreateView(create) => {
                let (schema, name) = self.catalog.resolve(&create.name);
                if self.references(&create.query, &name) {
                    return Err(Error::RecursiveView(format!("{schema}.{name}")));
                }
                let columns = create.columns.iter().map(|c| self.catalog.fold(c)).collect();
                let view = View {
                    schema,
                    name,
                    columns,
                    query: (*create.query).clone(),
                };
                self.catalog.create_view(view, create.or_replace)?;
            }
            Statement::CreateIndex(create) => {
                let index = IndexDefinition {
                    name: self.catalog.fold(&create.name),
                    columns: create.columns.iter().map(|c| self.catalog.fold(c)).collect(),
                    unique: create.unique,
                };
                self.catalog
                    .create_index(&create.table, index, create.if_not_exists)?;
            }
            Statement::CreateSequence(create) => {
                self.catalog
                    .create_sequence(&create.name, &create.options, create.if_not_exists)?;
            }
            Statement::CreateSchema { name, if_not_exists } => {
                self.catalog.create_schema(name, *if_not_exists)?;
            }
            Statement::CreateUser(create) => {
                self.catalog
                    .create_user(&create.name, create.password.clone(), create.if_not_exists)?;
            }
            Statement::CreateRole { name, if_not_exists } => {
                self.catalog.create_role(name, *if_not_exists)?;
            }
            Statement::CreateProcedure(create) => {
                let (schema, name) = self.catalog.resolve(&create.name);
                let procedure = Procedure {
                    schema,
                    name,
                    kind: create.kind,
                    source: create.source.clone(),
                };
                self.catalog.create_procedure(procedure, create.or_replace)?;
            }
            Statement::Drop(drop) => self.drop_object(drop)?,
            Statement::AlterTable(alter) => self.alter_table(alter)?,
            Statement::Truncate { table } => self.catalog.truncate_table(table)?,
            Statement::Grant(grant) => self.catalog.grant(grant)?,
            Statement::Revoke(revoke) => self.catalog.revoke(revoke)?,
            Statement::Begin => self.catalog.begin()?,
            Statement::Commit => self.catalog.commit(),
            Statement::Rollback { savepoint: None } => self.catalog.rollback(),
            Statement::Rollback {
                savepoint: Some(name),
            } => self.catalog.rollback_to(name)?,
            Statement::Savepoint { name } => self.catalog.savepoint(name)?,
            Statement::ReleaseSavepoint { name } => self.catalog.release_savepoint(name)?,
            Statement::Describe { table } => return self.describe(table).map(Outcome::Rows),
            Statement::Show(show) => return self.show(show).map(Outcome::Rows),
            Statement::Set { name, value } => self.set(name, value)?,
            Statement::Use { schema } => self.catalog.set_current_schema(schema)?,
            Statement::Select(_) | Statement::Insert(_) | Statement::Update(_) | Statement::Delete(_) => {
                return Err(Error::Unsupported(format!("{statement} as a utility statement")));
            }
        }
        Ok(Outcome::Done)
    }

    fn create_table(&mut self, create: &CreateTable) -> Result<Outcome> {
        let (schema, name) = self.catalog.resolve(&create.name);

        if let Some(query) = &create.as_select {
            let result = self.execute_select(query)?;
            let columns = result
                .columns
                .iter()
                .zip(&result.types)
                .map(|(column, data_type)| {
                    let base = data_type.split('(').next().unwrap_or_default();
                    ColumnDefinition::new(
                        self.catalog.fold(column),
                        DataType::from_name(base).unwrap_or(DataType::Text),
                    )
                })
                .collect::<Vec<_>>();
            let definition = TableDefinition::new(schema, name, columns);
            let names: Vec<String> = definition.column_names().map(str::to_string).collect();
            if !self.catalog.create_table(definition, create.if_not_exists)? {
                return Ok(Outcome::Done);
            }
            let table = self.catalog.table_mut(&create.name)?;
            let mut affected = 0;
            for values in result.rows {
                table.insert(Row::from_pairs(names.iter().cloned().zip(values)))?;
                affected += 1;
            }
            return Ok(Outcome::Modified {
                affected,
                last_insert_id: None,
            });
        }

        let mut columns: Vec<ColumnDefinition> = Vec::with_capacity(create.columns.len());
        for column in &create.columns {
            let column = self.fold_column(column);
            if columns.iter().any(|c| c.name == column.name) {
                return Err(Error::ColumnExists(column.name));
            }
            columns.push(column);
        }
        let mut definition = TableDefinition::new(schema, name, columns);

        for constraint in &create.constraints {
            match constraint {
                TableConstraint::PrimaryKey { columns, .. } => {
                    let columns = self.fold_known(&definition, columns)?;
                    definition.set_primary_key(columns);
                }
                TableConstraint::Unique { columns, .. } => {
                    let columns = self.fold_known(&definition, columns)?;
                    definition.unique_constraints.push(columns);
                }
                TableConstraint::ForeignKey(foreign_key) => {
                    let mut foreign_key = self.fold_foreign_key(foreign_key);
                    foreign_key.columns = self.fold_known(&definition, &foreign_key.columns)?;
                    definition.foreign_keys.push(foreign_key);
                }
                TableConstraint::Check { name, expr } => definition.checks.push(CheckConstraint {
                    name: name.clone(),
                    expr: expr.clone(),
                }),
            }
        }
        definition.apply_integer_key_rule();
        self.catalog.create_table(definition, create.if_not_exists)?;
        Ok(Outcome::Done)
    }

    fn fold_column(&self, column: &ColumnDefinition) -> ColumnDefinition {
        let mut column = column.clone();
        column.name = self.catalog.fold(&column.name);
        column.references = column.references.as_ref().map(|fk| self.fold_foreign_key(fk));
        column
    }

    fn fold_foreign_key(&self, foreign_key: &ForeignKey) -> ForeignKey {
        ForeignKey {
            name: foreign_key.name.clone(),
            columns: foreign_key.columns.iter().map(|c| self.catalog.fold(c)).collect(),
            table: self.catalog.fold(&foreign_key.table),
            referenced_columns: foreign_key
                .referenced_columns
                .iter()
                .map(|c| self.catalog.fold(c))
                .collect(),
            on_delete: foreign_key.on_delete,
            on_update: foreign_key.on_update,
        }
    }

    /// Folds constraint column names, failing on any the table lacks.
    fn fold_known(&self, definition: &TableDefinition, columns: &[String]) -> Result<Vec<String>> {
        columns
            .iter()
            .map(|column| {
                let column = self.catalog.fold(column);
                match definition.column(&column) {
                    Some(_) => Ok(column),
                    None => Err(Error::ColumnNotFound(column)),
                }
            })
            .collect()
    }

    fn drop_object(&mut self, drop: &Drop) -> Result<()> {
        let Drop {
            object,
            name,
            if_exists,
            cascade,
        } = drop;
        match object {
            ObjectType::Table => self.catalog.drop_table(name, *if_exists)?,
            ObjectType::View => self.catalog.drop_view(name, *if_exists)?,
            ObjectType::Index => self.catalog.drop_index(name, *if_exists)?,
            ObjectType::Sequence => self.catalog.drop_sequence(name, *if_exists)?,
            ObjectType::Schema => self.catalog.drop_schema(&name.name, *if_exists, *cascade)?,
            ObjectType::User => self.catalog.drop_user(&name.name, *if_exists)?,
            ObjectType::Role => self.catalog.drop_role(&name.name, *if_exists)?,
            ObjectType::Procedure | ObjectType::Function => {
                self.catalog.drop_procedure(name, *if_exists)?
            }
        };
        Ok(())
    }

    fn alter_table(&mut self, alter: &AlterTable) -> Result<()> {
        self.catalog.prepare_write(&alter.table)?;
        match &alter.action {
            AlterAction::AddColumn(column) => {
                let column = self.fold_column(column);
                info!(table = %alter.table, column = %column.name, "column added");
                self.catalog.table_mut(&alter.table)?.add_column(column)
            }
            AlterAction::DropColumn(column) => {
                let column = self.catalog.fold(column);
                info!(table = %alter.table, column = %column, "column dropped");
                self.catalog.table_mut(&alter.table)?.drop_column(&column)
            }
            AlterAction::RenameColumn { from, to } => {
                let (from, to) = (self.catalog.fold(from), self.catalog.fold(to));
                info!(table = %alter.table, from = %from, to = %to, "column renamed");
                self.catalog
                    .table_mut(&alter.table)?
                    .rename_column(&from, &to)
            }
            AlterAction::RenameTable(new_name) => self.catalog.rename_table(&alter.table, new_name),
        }
    }

    /// One row per column: name, declared type, nullability, key kind,
    /// default and extra flags.
    fn describe(&self, table: &ObjectName) -> Result<ResultSet> {
        let definition = self.catalog.describe_table(table)?;
        let rows = definition
            .columns
            .iter()
            .map(|column| {
                let key = if definition.primary_key.contains(&column.name) {
                    "PRI"
                } else if column.unique
                    || definition
                        .unique_constraints
                        .iter()
                        .any(|u| u.len() == 1 && u[0] == column.name)
                {
                    "UNI"
                } else {
                    ""
                };
                let default = match &column.default {
                    Some(DefaultValue::Value(value)) => Value::from(value.to_string()),
                    Some(DefaultValue::CurrentTimestamp) => Value::from("CURRENT_TIMESTAMP"),
                    None => Value::Null,
                };
                let extra = if column.auto_increment { "auto_increment" } else { "" };
                vec![
                    Value::from(column.name.as_str()),
                    Value::from(column.type_string()),
                    Value::from(if column.nullable { "YES" } else { "NO" }),
                    Value::from(key),
                    default,
                    Value::from(extra),
                ]
            })
            .collect();
        Ok(text_result(
            &["column", "type", "nullable", "key", "default", "extra"],
            rows,
        ))
    }

    fn show(&self, show: &Show) -> Result<ResultSet> {
        let catalog = &*self.catalog;
        let result = match show {
            Show::Tables { schema } => {
                let schema = schema.as_deref().map(|s| catalog.fold(s));
                let rows = catalog
                    .list_tables(schema.as_deref())?
                    .into_iter()
                    .map(|name| vec![Value::from(name)])
                    .collect();
                text_result(&["table"], rows)
            }
            Show::Schemas => text_result(
                &["schema"],
                catalog.schemas().map(|s| vec![Value::from(s.name.as_str())]).collect(),
            ),
            Show::Views => text_result(
                &["schema", "view"],
                catalog
                    .schemas()
                    .flat_map(|s| s.views())
                    .map(|v| vec![Value::from(v.schema.as_str()), Value::from(v.name.as_str())])
                    .collect(),
            ),
            Show::Sequences => text_result(
                &["schema", "sequence"],
                catalog
                    .schemas()
                    .flat_map(|s| s.sequences())
                    .map(|q| vec![Value::from(q.schema.as_str()), Value::from(q.name.as_str())])
                    .collect(),
            ),
            Show::Users => text_result(
                &["user", "roles"],
                catalog
                    .users()
                    .map(|u| vec![Value::from(u.name.as_str()), Value::from(u.roles.join(", "))])
                    .collect(),
            ),
            Show::Roles => text_result(
                &["role"],
                catalog.roles().map(|r| vec![Value::from(r.name.as_str())]).collect(),
            ),
            Show::Grants { grantee } => {
                let grantee = grantee.as_deref().map(|g| {
                    if g.eq_ignore_ascii_case("PUBLIC") {
                        g.to_ascii_uppercase()
                    } else {
                        catalog.fold(g)
                    }
                });
                let rows = catalog
                    .privileges()
                    .iter()
                    .filter(|p| grantee.as_deref().is_none_or(|g| p.grantee == g))
                    .map(|p| {
                        vec![
                            Value::from(p.grantee.as_str()),
                            Value::from(p.privilege.as_str()),
                            p.object.as_deref().map_or(Value::Null, Value::from),
                            Value::Bool(p.with_grant_option),
                        ]
                    })
                    .collect();
                let mut result = text_result(&["grantee", "privilege", "object", "grantable"], rows);
                result.types[3] = DataType::Boolean.to_string();
                result
            }
            Show::Columns { table } => self.describe(table)?,
            Show::Variable(name) => {
                let key = name.to_ascii_uppercase();
                let value = if SCHEMA_SETTINGS.contains(&key.as_str()) {
                    Value::from(catalog.current_schema())
                } else {
                    catalog.setting(name).cloned().unwrap_or(Value::Null)
                };
                let data_type = value
                    .data_type()
                    .map_or_else(|| "NULL".to_string(), |t| t.to_string());
                ResultSet {
                    columns: vec![name.to_lowercase()],
                    types: vec![data_type],
                    rows: vec![vec![value]],
                    row_count: 1,
                }
            }
        };
        Ok(result)
    }

    /// A bare identifier on the right-hand side is taken as text
    /// (`SET search_path = sales`).
    fn set(&mut self, name: &str, value: &Expr) -> Result<()> {
        let value = match value {
            Expr::Column(column) if column.table.is_none() => Value::from(column.name.as_str()),
            other => eval::evaluate(other, &Scope::new(&Row::new()), self)?,
        };
        if SCHEMA_SETTINGS.contains(&name.to_ascii_uppercase().as_str()) {
            let schema = match &value {
                Value::Text(schema) => schema.to_string(),
                other => other.to_string(),
            };
            return self.catalog.set_current_schema(&schema);
        }
        self.catalog.set_setting(name, value);
        Ok(())
    }
}

/// A result whose columns are all text.
fn text_result(columns: &[&str], rows: Vec<Vec<Value>>) -> ResultSet {
    ResultSet {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        types: vec![DataType::Text.to_string(); columns.len()],
        row_count: rows.len(),
        rows,
    }
}
