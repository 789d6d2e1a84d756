//! Column types and schemas, with the promotion rules used when chunks of
//! one distributed table disagree on their column types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ErrorCode, Result, TableError};

/// Column data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Type of a column holding only NULLs.
    Null,
    Bool,
    Int,
    Float,
    Str,
}

impl DataType {
    /// Returns the common representation of two types, if one exists.
    pub fn promote(self, other: DataType) -> Option<DataType> {
        match (self, other) {
            (a, b) if a == b => Some(a),
            (DataType::Null, t) | (t, DataType::Null) => Some(t),
            (DataType::Int, DataType::Float) | (DataType::Float, DataType::Int) => {
                Some(DataType::Float)
            }
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Null => "Null",
            DataType::Bool => "Bool",
            DataType::Int => "Int",
            DataType::Float => "Float",
            DataType::Str => "Str",
        };
        write!(f, "{}", name)
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }

    fn promote(&self, other: &Field) -> Result<Field> {
        let data_type = self.data_type.promote(other.data_type).ok_or_else(|| {
            TableError::type_promotion(&self.name, self.type_label(), other.type_label())
        })?;
        let nullable = self.nullable
            || other.nullable
            || self.data_type == DataType::Null
            || other.data_type == DataType::Null;
        Ok(Field::new(self.name.clone(), data_type, nullable))
    }

    fn type_label(&self) -> String {
        if self.nullable && self.data_type != DataType::Null {
            format!("{}?", self.data_type)
        } else {
            self.data_type.to_string()
        }
    }
}

/// Ordered list of fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the position of a column by name.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| {
                TableError::schema_with_code(
                    ErrorCode::SCHEMA_UNKNOWN_COLUMN,
                    format!("unknown column '{}'", name),
                )
            })
    }

    /// Returns a schema holding only the given columns, in the given order.
    pub fn project(&self, indices: &[usize]) -> Schema {
        Schema::new(
            indices
                .iter()
                .filter_map(|&i| self.fields.get(i).cloned())
                .collect(),
        )
    }

    /// Promotes two schemas column by column.
    ///
    /// Both schemas must name the same columns in the same order.
    pub fn promote(&self, other: &Schema) -> Result<Schema> {
        if self.len() != other.len() || self.names().ne(other.names()) {
            return Err(TableError::TypePromotion {
                code: ErrorCode::PROMOTION_COLUMN_MISMATCH,
                column: "*".to_string(),
                left: format!("({})", self.names().collect::<Vec<_>>().join(", ")),
                right: format!("({})", other.names().collect::<Vec<_>>().join(", ")),
            });
        }
        let fields = self
            .fields
            .iter()
            .zip(&other.fields)
            .map(|(a, b)| a.promote(b))
            .collect::<Result<Vec<_>>>()?;
        Ok(Schema::new(fields))
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|field| format!("{}: {}", field.name, field.type_label()))
            .collect();
        write!(f, "({})", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(fields: &[(&str, DataType)]) -> Schema {
        Schema::new(
            fields
                .iter()
                .map(|(n, t)| Field::new(*n, *t, false))
                .collect(),
        )
    }

    #[test]
    fn test_data_type_promotion() {
        assert_eq!(DataType::Int.promote(DataType::Int), Some(DataType::Int));
        assert_eq!(DataType::Int.promote(DataType::Float), Some(DataType::Float));
        assert_eq!(DataType::Null.promote(DataType::Str), Some(DataType::Str));
        assert_eq!(DataType::Int.promote(DataType::Str), None);
        assert_eq!(DataType::Bool.promote(DataType::Int), None);
    }

    #[test]
    fn test_schema_promotion_widens_and_marks_nullable() {
        let a = schema(&[("id", DataType::Int), ("x", DataType::Int)]);
        let b = schema(&[("id", DataType::Int), ("x", DataType::Null)]);
        let c = schema(&[("id", DataType::Int), ("x", DataType::Float)]);

        let ab = a.promote(&b).unwrap();
        assert_eq!(ab.fields()[1].data_type, DataType::Int);
        assert!(ab.fields()[1].nullable);

        let abc = ab.promote(&c).unwrap();
        assert_eq!(abc.fields()[1].data_type, DataType::Float);
        assert!(abc.fields()[1].nullable);
        assert_eq!(abc.to_string(), "(id: Int, x: Float?)");
    }

    #[test]
    fn test_schema_promotion_failures() {
        let a = schema(&[("id", DataType::Int)]);
        let b = schema(&[("id", DataType::Str)]);
        let err = a.promote(&b).unwrap_err();
        assert!(matches!(err, TableError::TypePromotion { ref column, .. } if column == "id"));

        let renamed = schema(&[("key", DataType::Int)]);
        let err = a.promote(&renamed).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PROMOTION_COLUMN_MISMATCH);
    }

    #[test]
    fn test_index_of_unknown_column() {
        let s = schema(&[("id", DataType::Int)]);
        assert_eq!(s.index_of("id").unwrap(), 0);
        assert_eq!(
            s.index_of("nope").unwrap_err().code(),
            ErrorCode::SCHEMA_UNKNOWN_COLUMN
        );
    }
}
