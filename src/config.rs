//! Engine-wide configuration.
//!
//! The configuration is fixed when a [`crate::Database`] is built and never
//! changes afterwards, so identifier folding stays consistent for every lookup
//! made during the life of the engine.

use std::borrow::Cow;

/// Schema created at startup and selected as the current schema.
pub const DEFAULT_SCHEMA: &str = "public";

/// How unquoted and quoted identifiers are normalised before catalog lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierCase {
    /// Fold every identifier to lower case (`Users` and `USERS` are the same table).
    #[default]
    Lower,
    /// Fold every identifier to upper case.
    Upper,
    /// Keep identifiers exactly as written.
    Sensitive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub identifier_case: IdentifierCase,
    pub default_schema: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            identifier_case: IdentifierCase::default(),
            default_schema: DEFAULT_SCHEMA.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_identifier_case(mut self, case: IdentifierCase) -> Self {
        self.identifier_case = case;
        self
    }

    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = schema.into();
        self
    }

    /// Normalises an identifier according to [`Self::identifier_case`].
    pub fn fold<'a>(&self, ident: &'a str) -> Cow<'a, str> {
        match self.identifier_case {
            IdentifierCase::Lower if ident.chars().any(char::is_uppercase) => {
                Cow::Owned(ident.to_lowercase())
            }
            IdentifierCase::Upper if ident.chars().any(char::is_lowercase) => {
                Cow::Owned(ident.to_uppercase())
            }
            _ => Cow::Borrowed(ident),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold() {
        let lower = EngineConfig::default();
        assert_eq!(lower.fold("Users"), "users");
        assert!(matches!(lower.fold("users"), Cow::Borrowed(_)));

        let upper = EngineConfig::default().with_identifier_case(IdentifierCase::Upper);
        assert_eq!(upper.fold("Users"), "USERS");

        let exact = EngineConfig::default().with_identifier_case(IdentifierCase::Sensitive);
        assert_eq!(exact.fold("Users"), "Users");
    }

    #[test]
    fn test_default_schema() {
        assert_eq!(EngineConfig::default().default_schema, "public");
        let config = EngineConfig::default().with_default_schema("app");
        assert_eq!(config.default_schema, "app");
    }
}
