//! Schemas and everything they own, plus users, roles, privileges, session
//! settings and the transaction state.
//!
//! Every name handed to the catalog is folded through
//! [`EngineConfig::fold`] before it is looked up or stored.

use std::collections::BTreeMap;

use allocative::size_of_unique_allocated_data;
use tracing::{info, trace};

use crate::ast::{Grant, ObjectName, Revoke, RoutineKind, Select, SequenceOptions};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::table::{IndexDefinition, TableDefinition, TableStorage};
use crate::transaction::{TableSnapshot, TransactionManager};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub schema: String,
    pub name: String,
    /// Output column names; empty keeps the query's own names.
    pub columns: Vec<String>,
    pub query: Select,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Procedure {
    pub schema: String,
    pub name: String,
    pub kind: RoutineKind,
    pub source: String,
}

/// A number generator served by `NEXTVAL` and `CURRVAL`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub schema: String,
    pub name: String,
    pub start: i64,
    pub increment: i64,
    pub min_value: i64,
    pub max_value: i64,
    pub cycle: bool,
    pub cache: i64,
    explicit_min: Option<i64>,
    explicit_max: Option<i64>,
    current: Option<i64>,
}

impl Sequence {
    /// Ascending sequences default to `1..=i64::MAX`, descending ones to
    /// `i64::MIN..=-1`. START defaults to the bound the sequence moves away from.
    pub fn new(schema: String, name: String, options: &SequenceOptions) -> Result<Self> {
        let increment = options.increment.unwrap_or(1);
        if increment == 0 {
            return Err(Error::InvalidArgument(format!(
                "INCREMENT of sequence {name} must not be zero"
            )));
        }
        let ascending = increment > 0;
        let min_value = options
            .min_value
            .unwrap_or(if ascending { 1 } else { i64::MIN });
        let max_value = options
            .max_value
            .unwrap_or(if ascending { i64::MAX } else { -1 });
        let start = options
            .start
            .unwrap_or(if ascending { min_value } else { max_value });
        if min_value > max_value || !(min_value..=max_value).contains(&start) {
            return Err(Error::InvalidArgument(format!(
                "START {start} of sequence {name} is outside {min_value}..{max_value}"
            )));
        }
        Ok(Self {
            schema,
            name,
            start,
            increment,
            min_value,
            max_value,
            cycle: options.cycle,
            cache: options.cache.unwrap_or(1),
            explicit_min: options.min_value,
            explicit_max: options.max_value,
            current: None,
        })
    }

    /// Advances the sequence. The first call returns START.
    pub fn next_value(&mut self) -> Result<i64> {
        let next = match self.current {
            None => self.start,
            Some(current) => {
                let stepped = current
                    .checked_add(self.increment)
                    .filter(|v| (self.min_value..=self.max_value).contains(v));
                match stepped {
                    Some(value) => value,
                    None if self.cycle => {
                        if self.increment > 0 {
                            self.explicit_min.unwrap_or(self.start)
                        } else {
                            self.explicit_max.unwrap_or(self.start)
                        }
                    }
                    None => {
                        return Err(Error::SequenceExhausted {
                            name: self.name.clone(),
                            limit: if self.increment > 0 {
                                self.max_value
                            } else {
                                self.min_value
                            },
                        });
                    }
                }
            }
        };
        self.current = Some(next);
        Ok(next)
    }

    pub fn current_value(&self) -> Result<i64> {
        self.current
            .ok_or_else(|| Error::SequenceNotInitialized(self.name.clone()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub name: String,
    tables: BTreeMap<String, TableStorage>,
    views: BTreeMap<String, View>,
    sequences: BTreeMap<String, Sequence>,
    procedures: BTreeMap<String, Procedure>,
}

impl Schema {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
            && self.views.is_empty()
            && self.sequences.is_empty()
            && self.procedures.is_empty()
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableStorage> {
        self.tables.values()
    }

    pub fn views(&self) -> impl Iterator<Item = &View> {
        self.views.values()
    }

    pub fn sequences(&self) -> impl Iterator<Item = &Sequence> {
        self.sequences.values()
    }

    pub fn procedures(&self) -> impl Iterator<Item = &Procedure> {
        self.procedures.values()
    }

    fn name_taken(&self, name: &str) -> bool {
        self.tables.contains_key(name) || self.views.contains_key(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub name: String,
    pub password: Option<String>,
    /// Roles granted with `GRANT role TO user`.
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Role {
    pub name: String,
    pub roles: Vec<String>,
}

/// A privilege recorded by GRANT. Privileges are kept for hosts to check;
/// statements are never refused because of them.
#[derive(Debug, Clone, PartialEq)]
pub struct Privilege {
    pub grantee: String,
    pub privilege: String,
    /// `schema.object`, or `None` for a privilege granted without `ON`.
    pub object: Option<String>,
    pub with_grant_option: bool,
}

/// Grantee that always exists and stands for every user.
const PUBLIC: &str = "PUBLIC";

#[derive(Debug)]
pub struct Catalog {
    config: EngineConfig,
    schemas: BTreeMap<String, Schema>,
    current_schema: String,
    users: BTreeMap<String, User>,
    roles: BTreeMap<String, Role>,
    privileges: Vec<Privilege>,
    settings: BTreeMap<String, Value>,
    transactions: TransactionManager,
}

impl Catalog {
    pub fn new(config: EngineConfig) -> Self {
        let default_schema = config.fold(&config.default_schema).into_owned();
        let mut schemas = BTreeMap::new();
        schemas.insert(default_schema.clone(), Schema::new(default_schema.clone()));
        Self {
            config,
            schemas,
            current_schema: default_schema,
            users: BTreeMap::new(),
            roles: BTreeMap::new(),
            privileges: Vec::new(),
            settings: BTreeMap::new(),
            transactions: TransactionManager::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn fold(&self, ident: &str) -> String {
        self.config.fold(ident).into_owned()
    }

    /// Splits an object name into folded `(schema, name)`, using the current
    /// schema when none is given.
    pub fn resolve(&self, name: &ObjectName) -> (String, String) {
        let schema = match &name.schema {
            Some(schema) => self.fold(schema),
            None => self.current_schema.clone(),
        };
        (schema, self.fold(&name.name))
    }

    /// Same as [`Self::resolve`] for a dotted name such as `sales.orders_seq`.
    fn resolve_dotted(&self, name: &str) -> (String, String) {
        match name.rsplit_once('.') {
            Some((schema, object)) => (self.fold(schema), self.fold(object)),
            None => (self.current_schema.clone(), self.fold(name)),
        }
    }

    // Schemas

    pub fn current_schema(&self) -> &str {
        &self.current_schema
    }

    pub fn set_current_schema(&mut self, name: &str) -> Result<()> {
        let name = self.fold(name);
        if !self.schemas.contains_key(&name) {
            return Err(Error::SchemaNotFound(name));
        }
        self.current_schema = name;
        Ok(())
    }

    pub fn schema(&self, name: &str) -> Result<&Schema> {
        let name = self.fold(name);
        self.schemas.get(&name).ok_or(Error::SchemaNotFound(name))
    }

    fn schema_mut(&mut self, name: &str) -> Result<&mut Schema> {
        self.schemas
            .get_mut(name)
            .ok_or_else(|| Error::SchemaNotFound(name.to_string()))
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    /// Returns `false` when the schema already existed and `if_not_exists` was set.
    pub fn create_schema(&mut self, name: &str, if_not_exists: bool) -> Result<bool> {
        let name = self.fold(name);
        if self.schemas.contains_key(&name) {
            return if if_not_exists {
                Ok(false)
            } else {
                Err(Error::SchemaExists(name))
            };
        }
        info!(schema = %name, "schema created");
        self.schemas.insert(name.clone(), Schema::new(name));
        Ok(true)
    }

    /// Drops a schema. Anything it still contains requires `cascade`.
    pub fn drop_schema(&mut self, name: &str, if_exists: bool, cascade: bool) -> Result<bool> {
        let name = self.fold(name);
        let Some(schema) = self.schemas.get(&name) else {
            return if if_exists {
                Ok(false)
            } else {
                Err(Error::SchemaNotFound(name))
            };
        };
        if !schema.is_empty() && !cascade {
            return Err(Error::SchemaNotEmpty(name));
        }

        let prefix = format!("{name}.");
        self.privileges
            .retain(|p| !p.object.as_ref().is_some_and(|o| o.starts_with(&prefix)));
        self.schemas.remove(&name);
        info!(schema = %name, cascade, "schema dropped");

        if self.current_schema == name {
            let default_schema = self.config.fold(&self.config.default_schema).into_owned();
            self.schemas
                .entry(default_schema.clone())
                .or_insert_with(|| Schema::new(default_schema.clone()));
            self.current_schema = default_schema;
        }
        Ok(true)
    }

    // Tables

    /// Adds a table whose definition already carries folded names.
    pub fn create_table(&mut self, definition: TableDefinition, if_not_exists: bool) -> Result<bool> {
        let schema = self.schema_mut(&definition.schema)?;
        if schema.name_taken(&definition.name) {
            return if if_not_exists {
                Ok(false)
            } else {
                Err(Error::TableExists(definition.qualified_name()))
            };
        }
        info!(table = %definition.qualified_name(), columns = definition.columns.len(), "table created");
        schema
            .tables
            .insert(definition.name.clone(), TableStorage::new(definition));
        Ok(true)
    }

    pub fn drop_table(&mut self, name: &ObjectName, if_exists: bool) -> Result<bool> {
        let (schema_name, table) = self.resolve(name);
        let schema = self.schema_mut(&schema_name)?;
        if schema.tables.remove(&table).is_none() {
            return if if_exists {
                Ok(false)
            } else {
                Err(Error::TableNotFound(table))
            };
        }
        let key = format!("{schema_name}.{table}");
        self.privileges.retain(|p| p.object.as_deref() != Some(key.as_str()));
        info!(table = %key, "table dropped");
        Ok(true)
    }

    pub fn rename_table(&mut self, name: &ObjectName, new_name: &str) -> Result<()> {
        let (schema_name, table) = self.resolve(name);
        let new_name = self.fold(new_name);
        let schema = self.schema_mut(&schema_name)?;
        if schema.name_taken(&new_name) {
            return Err(Error::TableExists(new_name));
        }
        let mut storage = schema
            .tables
            .remove(&table)
            .ok_or_else(|| Error::TableNotFound(table.clone()))?;
        storage.definition_mut().name = new_name.clone();
        schema.tables.insert(new_name.clone(), storage);

        let (from, to) = (format!("{schema_name}.{table}"), format!("{schema_name}.{new_name}"));
        self.transactions.rename(&from, &to);
        for privilege in &mut self.privileges {
            if privilege.object.as_deref() == Some(from.as_str()) {
                privilege.object = Some(to.clone());
            }
        }
        info!(from = %from, to = %to, "table renamed");
        Ok(())
    }

    pub fn has_table(&self, name: &ObjectName) -> bool {
        self.table(name).is_ok()
    }

    pub fn table(&self, name: &ObjectName) -> Result<&TableStorage> {
        let (schema, table) = self.resolve(name);
        self.schemas
            .get(&schema)
            .ok_or_else(|| Error::SchemaNotFound(schema.clone()))?
            .tables
            .get(&table)
            .ok_or(Error::TableNotFound(table))
    }

    pub fn table_mut(&mut self, name: &ObjectName) -> Result<&mut TableStorage> {
        let (schema, table) = self.resolve(name);
        self.schema_mut(&schema)?
            .tables
            .get_mut(&table)
            .ok_or(Error::TableNotFound(table))
    }

    /// Column metadata of a table, for DESCRIBE and host display layers.
    pub fn describe_table(&self, name: &ObjectName) -> Result<&TableDefinition> {
        self.table(name).map(TableStorage::definition)
    }

    /// Table names of `schema` (the current schema when `None`), sorted.
    pub fn list_tables(&self, schema: Option<&str>) -> Result<Vec<&str>> {
        let schema = match schema {
            Some(name) => self.schema(name)?,
            None => self.schema_by_key(&self.current_schema)?,
        };
        Ok(schema.tables.keys().map(String::as_str).collect())
    }

    fn schema_by_key(&self, name: &str) -> Result<&Schema> {
        self.schemas
            .get(name)
            .ok_or_else(|| Error::SchemaNotFound(name.to_string()))
    }

    /// Snapshots a table before its first write inside a transaction.
    pub fn prepare_write(&mut self, name: &ObjectName) -> Result<()> {
        let (schema, table) = self.resolve(name);
        let key = format!("{schema}.{table}");
        if !self.transactions.needs_backup(&key) {
            return Ok(());
        }
        let rows = self.table(name)?.snapshot();
        trace!(
            table = %key,
            rows = rows.len(),
            bytes = size_of_unique_allocated_data(&rows),
            "table snapshot taken"
        );
        self.transactions.record_backup(key, rows);
        Ok(())
    }

    pub fn truncate_table(&mut self, name: &ObjectName) -> Result<()> {
        self.prepare_write(name)?;
        self.table_mut(name)?.truncate();
        Ok(())
    }

    // Views

    pub fn create_view(&mut self, view: View, or_replace: bool) -> Result<()> {
        let schema = self.schema_mut(&view.schema)?;
        if schema.tables.contains_key(&view.name)
            || (schema.views.contains_key(&view.name) && !or_replace)
        {
            return Err(Error::TableExists(format!("{}.{}", view.schema, view.name)));
        }
        info!(view = %view.name, schema = %view.schema, "view created");
        schema.views.insert(view.name.clone(), view);
        Ok(())
    }

    pub fn view(&self, name: &ObjectName) -> Option<&View> {
        let (schema, view) = self.resolve(name);
        self.schemas.get(&schema)?.views.get(&view)
    }

    pub fn drop_view(&mut self, name: &ObjectName, if_exists: bool) -> Result<bool> {
        let (schema, view) = self.resolve(name);
        if self.schema_mut(&schema)?.views.remove(&view).is_none() {
            return if if_exists {
                Ok(false)
            } else {
                Err(Error::ViewNotFound(view))
            };
        }
        info!(view = %view, schema = %schema, "view dropped");
        Ok(true)
    }

    // Indexes

    pub fn create_index(
        &mut self,
        table: &ObjectName,
        index: IndexDefinition,
        if_not_exists: bool,
    ) -> Result<bool> {
        let (schema, _) = self.resolve(table);
        let exists = self
            .schema_by_key(&schema)?
            .tables
            .values()
            .any(|t| t.definition().indexes.iter().any(|i| i.name == index.name));
        if exists {
            return if if_not_exists {
                Ok(false)
            } else {
                Err(Error::IndexExists(index.name))
            };
        }
        let storage = self.table_mut(table)?;
        for column in &index.columns {
            if storage.definition().column(column).is_none() {
                return Err(Error::ColumnNotFound(column.clone()));
            }
        }
        let definition = storage.definition_mut();
        if index.unique {
            definition.unique_constraints.push(index.columns.clone());
        }
        info!(index = %index.name, table = %definition.qualified_name(), "index created");
        definition.indexes.push(index);
        Ok(true)
    }

    pub fn drop_index(&mut self, name: &ObjectName, if_exists: bool) -> Result<bool> {
        let (schema, index) = self.resolve(name);
        for table in self.schema_mut(&schema)?.tables.values_mut() {
            let definition = table.definition_mut();
            if let Some(pos) = definition.indexes.iter().position(|i| i.name == index) {
                definition.indexes.remove(pos);
                info!(index = %index, "index dropped");
                return Ok(true);
            }
        }
        if if_exists {
            Ok(false)
        } else {
            Err(Error::IndexNotFound(index))
        }
    }

    // Sequences

    pub fn create_sequence(
        &mut self,
        name: &ObjectName,
        options: &SequenceOptions,
        if_not_exists: bool,
    ) -> Result<bool> {
        let (schema_name, sequence) = self.resolve(name);
        let schema = self.schema_mut(&schema_name)?;
        if schema.sequences.contains_key(&sequence) {
            return if if_not_exists {
                Ok(false)
            } else {
                Err(Error::SequenceExists(sequence))
            };
        }
        let created = Sequence::new(schema_name.clone(), sequence.clone(), options)?;
        info!(sequence = %sequence, schema = %schema_name, start = created.start, "sequence created");
        schema.sequences.insert(sequence, created);
        Ok(true)
    }

    pub fn drop_sequence(&mut self, name: &ObjectName, if_exists: bool) -> Result<bool> {
        let (schema, sequence) = self.resolve(name);
        if self.schema_mut(&schema)?.sequences.remove(&sequence).is_none() {
            return if if_exists {
                Ok(false)
            } else {
                Err(Error::SequenceNotFound(sequence))
            };
        }
        info!(sequence = %sequence, "sequence dropped");
        Ok(true)
    }

    /// `NEXTVAL('name')`; the name may be schema-qualified.
    pub fn next_value(&mut self, name: &str) -> Result<i64> {
        let (schema, sequence) = self.resolve_dotted(name);
        self.schema_mut(&schema)?
            .sequences
            .get_mut(&sequence)
            .ok_or(Error::SequenceNotFound(sequence))?
            .next_value()
    }

    pub fn current_value(&self, name: &str) -> Result<i64> {
        let (schema, sequence) = self.resolve_dotted(name);
        self.schema_by_key(&schema)?
            .sequences
            .get(&sequence)
            .ok_or(Error::SequenceNotFound(sequence))?
            .current_value()
    }

    // Procedures

    pub fn create_procedure(&mut self, procedure: Procedure, or_replace: bool) -> Result<()> {
        let schema = self.schema_mut(&procedure.schema)?;
        if schema.procedures.contains_key(&procedure.name) && !or_replace {
            return Err(Error::ProcedureExists(procedure.name));
        }
        info!(procedure = %procedure.name, schema = %procedure.schema, "procedure created");
        schema.procedures.insert(procedure.name.clone(), procedure);
        Ok(())
    }

    pub fn drop_procedure(&mut self, name: &ObjectName, if_exists: bool) -> Result<bool> {
        let (schema, procedure) = self.resolve(name);
        if self.schema_mut(&schema)?.procedures.remove(&procedure).is_none() {
            return if if_exists {
                Ok(false)
            } else {
                Err(Error::ProcedureNotFound(procedure))
            };
        }
        info!(procedure = %procedure, "procedure dropped");
        Ok(true)
    }

    // Users, roles and privileges

    pub fn create_user(&mut self, name: &str, password: Option<String>, if_not_exists: bool) -> Result<bool> {
        let name = self.fold(name);
        if self.users.contains_key(&name) {
            return if if_not_exists {
                Ok(false)
            } else {
                Err(Error::UserExists(name))
            };
        }
        info!(user = %name, "user created");
        self.users.insert(
            name.clone(),
            User {
                name,
                password,
                roles: Vec::new(),
            },
        );
        Ok(true)
    }

    pub fn drop_user(&mut self, name: &str, if_exists: bool) -> Result<bool> {
        let name = self.fold(name);
        if self.users.remove(&name).is_none() {
            return if if_exists {
                Ok(false)
            } else {
                Err(Error::UserNotFound(name))
            };
        }
        self.privileges.retain(|p| p.grantee != name);
        info!(user = %name, "user dropped");
        Ok(true)
    }

    pub fn create_role(&mut self, name: &str, if_not_exists: bool) -> Result<bool> {
        let name = self.fold(name);
        if self.roles.contains_key(&name) {
            return if if_not_exists {
                Ok(false)
            } else {
                Err(Error::RoleExists(name))
            };
        }
        info!(role = %name, "role created");
        self.roles.insert(
            name.clone(),
            Role {
                name,
                roles: Vec::new(),
            },
        );
        Ok(true)
    }

    pub fn drop_role(&mut self, name: &str, if_exists: bool) -> Result<bool> {
        let name = self.fold(name);
        if self.roles.remove(&name).is_none() {
            return if if_exists {
                Ok(false)
            } else {
                Err(Error::RoleNotFound(name))
            };
        }
        for user in self.users.values_mut() {
            user.roles.retain(|r| *r != name);
        }
        for role in self.roles.values_mut() {
            role.roles.retain(|r| *r != name);
        }
        self.privileges.retain(|p| p.grantee != name);
        info!(role = %name, "role dropped");
        Ok(true)
    }

    /// Folds a grantee and checks it names a user, a role or `PUBLIC`.
    fn grantee(&self, name: &str) -> Result<String> {
        if name.eq_ignore_ascii_case(PUBLIC) {
            return Ok(PUBLIC.to_string());
        }
        let name = self.fold(name);
        if self.users.contains_key(&name) || self.roles.contains_key(&name) {
            Ok(name)
        } else {
            Err(Error::UserNotFound(name))
        }
    }

    /// Object key of a GRANT/REVOKE target, which must be a table or view.
    fn grant_object(&self, object: &ObjectName) -> Result<String> {
        let (schema, name) = self.resolve(object);
        if self.table(object).is_err() && self.view(object).is_none() {
            return Err(Error::TableNotFound(name));
        }
        Ok(format!("{schema}.{name}"))
    }

    /// Records a GRANT. Without `ON`, the privileges are role names granted
    /// to each grantee.
    pub fn grant(&mut self, grant: &Grant) -> Result<()> {
        let grantees = grant
            .grantees
            .iter()
            .map(|g| self.grantee(g))
            .collect::<Result<Vec<_>>>()?;

        let Some(object) = &grant.object else {
            let roles = grant
                .privileges
                .iter()
                .map(|r| {
                    let role = self.fold(r);
                    if self.roles.contains_key(&role) {
                        Ok(role)
                    } else {
                        Err(Error::RoleNotFound(role))
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            for grantee in &grantees {
                let granted = match (self.users.get_mut(grantee), self.roles.get_mut(grantee)) {
                    (Some(user), _) => &mut user.roles,
                    (None, Some(role)) => &mut role.roles,
                    (None, None) => continue,
                };
                for role in &roles {
                    if !granted.contains(role) {
                        granted.push(role.clone());
                    }
                }
            }
            return Ok(());
        };

        let object = self.grant_object(object)?;
        for grantee in grantees {
            for privilege in &grant.privileges {
                let privilege = privilege.to_uppercase();
                let existing = self.privileges.iter_mut().find(|p| {
                    p.grantee == grantee
                        && p.privilege == privilege
                        && p.object.as_deref() == Some(object.as_str())
                });
                match existing {
                    Some(p) => p.with_grant_option |= grant.with_grant_option,
                    None => self.privileges.push(Privilege {
                        grantee: grantee.clone(),
                        privilege,
                        object: Some(object.clone()),
                        with_grant_option: grant.with_grant_option,
                    }),
                }
            }
        }
        Ok(())
    }

    /// Removes privileges (or role memberships). Revoking `ALL` removes every
    /// privilege the grantee holds on the object.
    pub fn revoke(&mut self, revoke: &Revoke) -> Result<()> {
        let grantees = revoke
            .grantees
            .iter()
            .map(|g| self.grantee(g))
            .collect::<Result<Vec<_>>>()?;

        let Some(object) = &revoke.object else {
            let roles: Vec<String> = revoke.privileges.iter().map(|r| self.fold(r)).collect();
            for grantee in &grantees {
                if let Some(user) = self.users.get_mut(grantee) {
                    user.roles.retain(|r| !roles.contains(r));
                }
                if let Some(role) = self.roles.get_mut(grantee) {
                    role.roles.retain(|r| !roles.contains(r));
                }
            }
            return Ok(());
        };

        let object = self.grant_object(object)?;
        let privileges: Vec<String> = revoke.privileges.iter().map(|p| p.to_uppercase()).collect();
        let all = privileges.iter().any(|p| p == "ALL");
        self.privileges.retain(|p| {
            !(grantees.contains(&p.grantee)
                && p.object.as_deref() == Some(object.as_str())
                && (all || privileges.contains(&p.privilege)))
        });
        Ok(())
    }

    pub fn privileges(&self) -> &[Privilege] {
        &self.privileges
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    // Session settings

    pub fn set_setting(&mut self, name: &str, value: Value) {
        let name = name.to_lowercase();
        self.settings.insert(name, value);
    }

    pub fn setting(&self, name: &str) -> Option<&Value> {
        self.settings.get(&name.to_lowercase())
    }

    // Transactions

    pub fn in_transaction(&self) -> bool {
        self.transactions.is_active()
    }

    pub fn begin(&mut self) -> Result<()> {
        self.transactions.begin()
    }

    pub fn commit(&mut self) {
        self.transactions.commit();
    }

    /// Restores every table written since BEGIN. Tables dropped in the
    /// meantime stay dropped.
    pub fn rollback(&mut self) {
        let backups = self.transactions.rollback();
        self.restore(backups);
    }

    pub fn savepoint(&mut self, name: &str) -> Result<()> {
        let name = self.fold(name);
        if !self.transactions.is_active() {
            return Err(Error::NoActiveTransaction);
        }
        let mut tables = TableSnapshot::new();
        for schema in self.schemas.values() {
            for table in schema.tables.values() {
                tables.insert(table.definition().qualified_name(), table.snapshot());
            }
        }
        trace!(
            savepoint = %name,
            bytes = tables.values().map(|rows| size_of_unique_allocated_data(rows)).sum::<usize>(),
            "savepoint snapshot taken"
        );
        self.transactions.savepoint(name, tables)
    }

    pub fn rollback_to(&mut self, name: &str) -> Result<()> {
        let name = self.fold(name);
        let tables = self.transactions.rollback_to(&name)?;
        self.restore(tables);
        Ok(())
    }

    pub fn release_savepoint(&mut self, name: &str) -> Result<()> {
        let name = self.fold(name);
        self.transactions.release(&name)
    }

    fn restore(&mut self, tables: TableSnapshot) {
        for (key, rows) in tables {
            let Some((schema, table)) = key.split_once('.') else {
                continue;
            };
            if let Some(storage) = self
                .schemas
                .get_mut(schema)
                .and_then(|s| s.tables.get_mut(table))
            {
                trace!(table = %key, rows = rows.len(), "table restored");
                storage.restore(rows);
            }
        }
    }

    /// Heap bytes held by the rows of every table.
    pub fn memory_usage(&self) -> usize {
        self.schemas
            .values()
            .flat_map(|s| s.tables.values())
            .map(|t| size_of_unique_allocated_data(t))
            .sum()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
