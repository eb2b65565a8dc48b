use std::fmt;

/// Represents the declared data types of a column schema.
///
/// Vendor spellings (`INT4`, `VARCHAR2`, `NUMBER`, `DATETIME`, ...) are mapped
/// onto these canonical types by [`DataType::from_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 16-bit integer.
    SmallInt,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInt,
    /// Exact numeric with optional precision and scale.
    Decimal,
    /// Single precision floating point.
    Real,
    /// Double precision floating point.
    Double,
    /// Fixed-length character string.
    Char,
    /// Variable-length character string.
    Varchar,
    /// Unbounded character string.
    Text,
    Boolean,
    Date,
    Time,
    Timestamp,
    /// Binary large object.
    Blob,
}

impl DataType {
    /// Resolves a type name as written in SQL.
    ///
    /// The `SERIAL` family is not handled here: the parser rewrites it into an
    /// integer type plus an auto-increment flag.
    pub fn from_name(name: &str) -> Option<Self> {
        let data_type = match name.to_uppercase().as_str() {
            "SMALLINT" | "INT2" | "TINYINT" => Self::SmallInt,
            "INT" | "INTEGER" | "INT4" | "MEDIUMINT" => Self::Integer,
            "BIGINT" | "INT8" => Self::BigInt,
            "DECIMAL" | "NUMERIC" | "NUMBER" | "DEC" => Self::Decimal,
            "REAL" | "FLOAT4" => Self::Real,
            "FLOAT" | "DOUBLE" | "FLOAT8" | "BINARY_DOUBLE" => Self::Double,
            "CHAR" | "CHARACTER" | "NCHAR" => Self::Char,
            "VARCHAR" | "VARCHAR2" | "NVARCHAR" | "NVARCHAR2" => Self::Varchar,
            "TEXT" | "CLOB" | "STRING" | "LONGTEXT" => Self::Text,
            "BOOL" | "BOOLEAN" => Self::Boolean,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "TIMESTAMP" | "DATETIME" | "TIMESTAMPTZ" => Self::Timestamp,
            "BLOB" | "BYTEA" | "BINARY" | "VARBINARY" | "RAW" => Self::Blob,
            _ => return None,
        };
        Some(data_type)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::SmallInt | Self::Integer | Self::BigInt)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, Self::Decimal | Self::Real | Self::Double)
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Char | Self::Varchar | Self::Text)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SmallInt => "SMALLINT",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Decimal => "DECIMAL",
            Self::Real => "REAL",
            Self::Double => "DOUBLE",
            Self::Char => "CHAR",
            Self::Varchar => "VARCHAR",
            Self::Text => "TEXT",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
            Self::Blob => "BLOB",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_names() {
        assert_eq!(DataType::from_name("int4"), Some(DataType::Integer));
        assert_eq!(DataType::from_name("VARCHAR2"), Some(DataType::Varchar));
        assert_eq!(DataType::from_name("number"), Some(DataType::Decimal));
        assert_eq!(DataType::from_name("datetime"), Some(DataType::Timestamp));
        assert_eq!(DataType::from_name("serial"), None);
        assert_eq!(DataType::from_name("widget"), None);
    }

    #[test]
    fn test_display_reparses() {
        for data_type in [DataType::BigInt, DataType::Varchar, DataType::Timestamp] {
            assert_eq!(DataType::from_name(&data_type.to_string()), Some(data_type));
        }
    }
}
