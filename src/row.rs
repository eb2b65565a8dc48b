use std::collections::HashMap;

use allocative::{Allocative, Key, Visitor};

use crate::value::Value;

/// A row as an ordered list of `(column key, value)` pairs.
///
/// Keys are either plain column names (`name`) or alias-qualified duplicates
/// (`u.name`). Iteration order is insertion order and never depends on the
/// lookup index. Rows are plain values: cloning one out of storage and
/// mutating it has no effect until it is written back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Builds a row from pairs, later duplicates overwriting earlier ones.
    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        let mut row = Self::new();
        for (key, value) in pairs {
            row.set(key, value);
        }
        row
    }

    /// Sets `key` to `value`. An existing key keeps its position.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.index.get(&key) {
            Some(&pos) => self.columns[pos].1 = value,
            None => {
                self.index.insert(key.clone(), self.columns.len());
                self.columns.push((key, value));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&pos| &self.columns[pos].1)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Resolves a column reference.
    ///
    /// A qualified reference (`t.c`) must match its key exactly. An
    /// unqualified one matches the plain key, or failing that any
    /// alias-qualified key ending in `.c`; when several tables share the
    /// column name the last match wins.
    pub fn resolve(&self, table: Option<&str>, column: &str) -> Option<&Value> {
        match table {
            Some(table) => self.get(&format!("{table}.{column}")),
            None => self.get(column).or_else(|| {
                let suffix = format!(".{column}");
                self.columns
                    .iter()
                    .rev()
                    .find(|(key, _)| key.ends_with(&suffix))
                    .map(|(_, value)| value)
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Keys that are not alias-qualified, in row order.
    pub fn plain_keys(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .map(|(key, _)| key.as_str())
            .filter(|key| !key.contains('.'))
    }

    /// Appends every entry of `other`; plain keys already present take the
    /// right-hand value.
    pub fn merge(&mut self, other: &Row) {
        for (key, value) in &other.columns {
            self.set(key.clone(), value.clone());
        }
    }

    /// Removes a key, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.index.remove(key)?;
        let (_, value) = self.columns.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Some(value)
    }

    /// Renames a key in place. Returns `false`, leaving the row untouched,
    /// when `from` is missing or `to` is already taken.
    pub fn rename(&mut self, from: &str, to: impl Into<String>) -> bool {
        let to = to.into();
        if self.index.contains_key(&to) {
            return false;
        }
        let Some(pos) = self.index.remove(from) else {
            return false;
        };
        self.index.insert(to.clone(), pos);
        self.columns[pos].0 = to;
        true
    }

    /// Copy of this row with every plain key duplicated as `qualifier.key`.
    pub fn qualified(&self, qualifier: &str) -> Row {
        let mut row = Row::with_capacity(self.columns.len() * 2);
        for (key, value) in &self.columns {
            row.set(key.clone(), value.clone());
        }
        for (key, value) in &self.columns {
            if !key.contains('.') {
                row.set(format!("{qualifier}.{key}"), value.clone());
            }
        }
        row
    }

    pub fn into_values(self) -> Vec<Value> {
        self.columns.into_iter().map(|(_, value)| value).collect()
    }
}

impl Allocative for Row {
    fn visit<'a, 'b: 'a>(&self, visitor: &'a mut Visitor<'b>) {
        let mut visitor = visitor.enter_self_sized::<Self>();
        for (key, value) in &self.columns {
            visitor.visit_field(Key::new("key"), key);
            visitor.visit_field(Key::new("value"), value);
        }
        visitor.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Row {
        Row::from_pairs([("id", Value::Int(1)), ("name", Value::from("Alice"))]).qualified("u")
    }

    #[test]
    fn test_order_is_insertion_order() {
        let row = sample();
        let keys: Vec<_> = row.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["id", "name", "u.id", "u.name"]);
        assert_eq!(row.plain_keys().collect::<Vec<_>>(), vec!["id", "name"]);
    }

    #[test]
    fn test_set_keeps_position() {
        let mut row = sample();
        row.set("id", Value::Int(7));
        assert_eq!(row.iter().next(), Some(("id", &Value::Int(7))));
        assert_eq!(row.len(), 4);
    }

    #[test]
    fn test_resolve() {
        let row = sample();
        assert_eq!(row.resolve(Some("u"), "name"), Some(&Value::from("Alice")));
        assert_eq!(row.resolve(None, "id"), Some(&Value::Int(1)));
        assert_eq!(row.resolve(Some("x"), "id"), None);
    }

    #[test]
    fn test_resolve_suffix_last_match_wins() {
        let mut row = Row::new();
        row.set("a.v", Value::Int(1));
        row.set("b.v", Value::Int(2));
        assert_eq!(row.resolve(None, "v"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_merge_and_remove() {
        let mut left = sample();
        let right = Row::from_pairs([("id", Value::Int(9)), ("score", Value::Int(3))]).qualified("s");
        left.merge(&right);
        assert_eq!(left.get("id"), Some(&Value::Int(9)));
        assert_eq!(left.get("u.id"), Some(&Value::Int(1)));
        assert_eq!(left.get("s.score"), Some(&Value::Int(3)));

        assert_eq!(left.remove("name"), Some(Value::from("Alice")));
        assert_eq!(left.get("u.name"), Some(&Value::from("Alice")));
        assert!(!left.contains("name"));
    }

    #[test]
    fn test_clone_is_independent() {
        let stored = sample();
        let mut fetched = stored.clone();
        fetched.set("name", Value::from("Mallory"));
        assert_eq!(stored.get("name"), Some(&Value::from("Alice")));
    }

    #[test]
    fn test_rename() {
        let mut row = Row::from_pairs([("a", Value::Int(1)), ("b", Value::Int(2))]);
        assert!(row.rename("a", "z"));
        assert_eq!(row.iter().map(|(k, _)| k).collect::<Vec<_>>(), vec!["z", "b"]);
        assert_eq!(row.get("z"), Some(&Value::Int(1)));
        assert!(!row.rename("missing", "y"));
    }

    #[test]
    fn test_rename_onto_existing_key_is_refused() {
        let mut row = Row::from_pairs([("a", Value::Int(1)), ("b", Value::Int(2))]);
        assert!(!row.rename("a", "b"));
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("a"), Some(&Value::Int(1)));
        assert_eq!(row.get("b"), Some(&Value::Int(2)));
    }
}
