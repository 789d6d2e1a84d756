//! Local (single-node) key-sorted tables.
//!
//! A `LocalTable` stores its rows column-wise and always keeps them sorted by
//! its primary key. A table with no primary key is unkeyed and keeps rows in
//! insertion order. Distributed tables are made of these as chunks.

pub mod aggregate;
pub mod csv;
pub mod display;
pub mod schema;
pub mod value;

pub use aggregate::{Aggregate, AggregateFunction};
pub use schema::{DataType, Field, Schema};
pub use value::Value;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::error::{ErrorCode, Result, TableError};

/// Primary key tuple of one row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key(Vec<Value>);

impl Key {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "({})", parts.join(", "))
    }
}

impl From<Vec<Value>> for Key {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

/// A materialized table whose rows are sorted by primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalTable {
    schema: Arc<Schema>,
    columns: Vec<Vec<Value>>,
    pkey: Vec<usize>,
    num_rows: usize,
}

impl LocalTable {
    /// Creates a table from a schema and columns, sorting rows by `pkey`.
    ///
    /// Values are coerced to their field types; a value that cannot be
    /// represented in its column is a schema error.
    pub fn new<S: AsRef<str>>(schema: Schema, columns: Vec<Vec<Value>>, pkey: &[S]) -> Result<Self> {
        if columns.len() != schema.len() {
            return Err(TableError::schema_with_code(
                ErrorCode::SCHEMA_ARITY_MISMATCH,
                format!(
                    "{} columns supplied for a schema of {} fields",
                    columns.len(),
                    schema.len()
                ),
            ));
        }

        let num_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        for (field, column) in schema.fields().iter().zip(&columns) {
            if column.len() != num_rows {
                return Err(TableError::schema_with_code(
                    ErrorCode::SCHEMA_RAGGED_COLUMNS,
                    format!(
                        "column '{}' has {} rows, expected {}",
                        field.name,
                        column.len(),
                        num_rows
                    ),
                ));
            }
        }

        let pkey = pkey
            .iter()
            .map(|name| schema.index_of(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let columns = coerce_columns(&schema, columns)?;
        let mut table = Self {
            schema: Arc::new(schema),
            columns,
            pkey,
            num_rows,
        };
        table.sort_by_key();
        Ok(table)
    }

    /// Creates a table from named columns, inferring each column's type.
    pub fn from_columns<N: Into<String>, S: AsRef<str>>(
        columns: Vec<(N, Vec<Value>)>,
        pkey: &[S],
    ) -> Result<Self> {
        let mut fields = Vec::with_capacity(columns.len());
        let mut data = Vec::with_capacity(columns.len());
        for (name, values) in columns {
            let name = name.into();
            let mut data_type = DataType::Null;
            for value in &values {
                let value_type = value.data_type();
                data_type = data_type
                    .promote(value_type)
                    .ok_or_else(|| TableError::type_promotion(&name, data_type, value_type))?;
            }
            let nullable = values.iter().any(Value::is_null);
            fields.push(Field::new(name, data_type, nullable));
            data.push(values);
        }
        Self::new(Schema::new(fields), data, pkey)
    }

    /// Creates a table from row tuples.
    pub fn from_rows<S: AsRef<str>>(
        names: &[S],
        rows: Vec<Vec<Value>>,
        pkey: &[S],
    ) -> Result<Self> {
        let mut columns: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); names.len()];
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != names.len() {
                return Err(TableError::schema_with_code(
                    ErrorCode::SCHEMA_ARITY_MISMATCH,
                    format!("row {} has {} values, expected {}", i, row.len(), names.len()),
                ));
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }
        let named = names
            .iter()
            .map(|n| n.as_ref().to_string())
            .zip(columns)
            .collect();
        Self::from_columns(named, pkey)
    }

    /// Creates an empty table with the given schema.
    pub fn empty<S: AsRef<str>>(schema: Schema, pkey: &[S]) -> Result<Self> {
        let columns = vec![Vec::new(); schema.len()];
        Self::new(schema, columns, pkey)
    }

    fn from_parts(schema: Arc<Schema>, columns: Vec<Vec<Value>>, pkey: Vec<usize>) -> Self {
        let num_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        Self {
            schema,
            columns,
            pkey,
            num_rows,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    /// Returns true if the table has a primary key.
    pub fn is_keyed(&self) -> bool {
        !self.pkey.is_empty()
    }

    /// Primary key column names, in key order.
    pub fn pkey(&self) -> Vec<String> {
        self.pkey
            .iter()
            .filter_map(|&i| self.schema.field(i).map(|f| f.name.clone()))
            .collect()
    }

    /// Primary key column positions, in key order.
    pub fn pkey_indices(&self) -> &[usize] {
        &self.pkey
    }

    /// Schema of the key tuple.
    pub fn key_schema(&self) -> Schema {
        self.schema.project(&self.pkey)
    }

    pub fn column(&self, name: &str) -> Result<&[Value]> {
        let index = self.schema.index_of(name)?;
        Ok(&self.columns[index])
    }

    pub fn columns(&self) -> &[Vec<Value>] {
        &self.columns
    }

    /// Values of the `component`-th key column.
    pub fn key_column(&self, component: usize) -> Option<&[Value]> {
        self.pkey
            .get(component)
            .map(|&index| self.columns[index].as_slice())
    }

    pub fn row(&self, index: usize) -> Option<Vec<Value>> {
        if index >= self.num_rows {
            return None;
        }
        Some(self.columns.iter().map(|c| c[index].clone()).collect())
    }

    /// Iterates rows in key order.
    pub fn rows(&self) -> impl Iterator<Item = Vec<Value>> + '_ {
        (0..self.num_rows).map(move |i| self.columns.iter().map(|c| c[i].clone()).collect())
    }

    /// Key of the row at `index`. Panics if out of bounds.
    pub fn key(&self, index: usize) -> Key {
        Key(self
            .pkey
            .iter()
            .map(|&c| self.columns[c][index].clone())
            .collect())
    }

    /// Iterates keys in row order.
    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        (0..self.num_rows).map(move |i| self.key(i))
    }

    pub fn first_key(&self) -> Option<Key> {
        (self.num_rows > 0).then(|| self.key(0))
    }

    pub fn last_key(&self) -> Option<Key> {
        self.num_rows.checked_sub(1).map(|i| self.key(i))
    }

    fn value_indices(&self) -> Vec<usize> {
        (0..self.columns.len())
            .filter(|c| !self.pkey.contains(c))
            .collect()
    }

    fn non_key_values(&self, index: usize, value_indices: &[usize]) -> Vec<Value> {
        value_indices
            .iter()
            .map(|&c| self.columns[c][index].clone())
            .collect()
    }

    fn compare_keys(&self, i: usize, other: &LocalTable, j: usize) -> Ordering {
        self.pkey
            .iter()
            .zip(&other.pkey)
            .map(|(&a, &b)| self.columns[a][i].cmp(&other.columns[b][j]))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Returns true if rows are in non-decreasing key order.
    pub fn is_sorted_by_key(&self) -> bool {
        (1..self.num_rows).all(|i| self.compare_keys(i - 1, self, i).is_le())
    }

    fn sort_by_key(&mut self) {
        let this: &LocalTable = self;
        if this.pkey.is_empty() || this.is_sorted_by_key() {
            return;
        }
        let mut order: Vec<usize> = (0..this.num_rows).collect();
        order.sort_by(|&a, &b| this.compare_keys(a, this, b));
        let columns = this
            .columns
            .iter()
            .map(|column| order.iter().map(|&i| column[i].clone()).collect())
            .collect();
        self.columns = columns;
    }

    /// Returns a copy of this table keyed (and sorted) by `pkey`.
    pub fn with_primary_key<S: AsRef<str>>(&self, pkey: &[S]) -> Result<Self> {
        Self::new((*self.schema).clone(), self.columns.clone(), pkey)
    }

    /// Converts every column into the representation of `schema`.
    pub fn coerce_to(&self, schema: &Schema) -> Result<Self> {
        if self.schema.as_ref() == schema {
            return Ok(self.clone());
        }
        let promoted = self.schema.promote(schema)?;
        if &promoted != schema {
            return Err(TableError::schema(format!(
                "table schema {} does not widen to {}",
                self.schema, schema
            )));
        }
        let columns = coerce_columns(schema, self.columns.clone())?;
        Ok(Self::from_parts(
            Arc::new(schema.clone()),
            columns,
            self.pkey.clone(),
        ))
    }

    /// Rows in `range` as a new table. Sortedness is preserved.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let start = range.start.min(self.num_rows);
        let end = range.end.clamp(start, self.num_rows);
        let columns = self
            .columns
            .iter()
            .map(|c| c[start..end].to_vec())
            .collect();
        Self::from_parts(self.schema.clone(), columns, self.pkey.clone())
    }

    /// Appends `other`'s rows after this table's rows.
    ///
    /// Rows are not re-sorted: callers concatenate keyed tables only when the
    /// last key of `self` precedes the first key of `other`.
    pub fn concat(&self, other: &LocalTable) -> Result<Self> {
        let schema = self.schema.promote(&other.schema)?;
        let left = self.coerce_to(&schema)?;
        let right = other.coerce_to(&schema)?;
        let columns = left
            .columns
            .into_iter()
            .zip(right.columns)
            .map(|(mut l, r)| {
                l.extend(r);
                l
            })
            .collect();
        Ok(Self::from_parts(Arc::new(schema), columns, self.pkey.clone()))
    }

    /// Ordered merge of two key-sorted tables with the same primary key.
    ///
    /// Rows with identical keys are combined with `aggregate`, applied to the
    /// non-key values of (`self` row, `other` row).
    pub fn merge_with(&self, other: &LocalTable, aggregate: &Aggregate) -> Result<Self> {
        if self.pkey() != other.pkey() {
            return Err(TableError::schema(format!(
                "cannot merge tables keyed by ({}) and ({})",
                self.pkey().join(", "),
                other.pkey().join(", ")
            )));
        }
        let schema = self.schema.promote(&other.schema)?;
        let left = self.coerce_to(&schema)?;
        let right = other.coerce_to(&schema)?;
        let value_indices = left.value_indices();

        let mut columns: Vec<Vec<Value>> =
            vec![Vec::with_capacity(left.num_rows + right.num_rows); schema.len()];
        let (mut i, mut j) = (0, 0);
        while i < left.num_rows && j < right.num_rows {
            match left.compare_keys(i, &right, j) {
                Ordering::Less => {
                    push_row(&mut columns, &left, i);
                    i += 1;
                }
                Ordering::Greater => {
                    push_row(&mut columns, &right, j);
                    j += 1;
                }
                Ordering::Equal => {
                    let combined = aggregate.combine(
                        &left.non_key_values(i, &value_indices),
                        &right.non_key_values(j, &value_indices),
                    );
                    if combined.len() != value_indices.len() {
                        return Err(TableError::schema_with_code(
                            ErrorCode::SCHEMA_ARITY_MISMATCH,
                            format!(
                                "aggregate returned {} values, expected {}",
                                combined.len(),
                                value_indices.len()
                            ),
                        ));
                    }
                    for &k in &left.pkey {
                        columns[k].push(left.columns[k][i].clone());
                    }
                    for (&c, value) in value_indices.iter().zip(combined) {
                        columns[c].push(value);
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        for r in i..left.num_rows {
            push_row(&mut columns, &left, r);
        }
        for r in j..right.num_rows {
            push_row(&mut columns, &right, r);
        }

        let pkey = left.pkey();
        Self::new(schema, columns, pkey.as_slice())
    }
}

fn push_row(columns: &mut [Vec<Value>], table: &LocalTable, row: usize) {
    for (out, column) in columns.iter_mut().zip(&table.columns) {
        out.push(column[row].clone());
    }
}

fn coerce_columns(schema: &Schema, columns: Vec<Vec<Value>>) -> Result<Vec<Vec<Value>>> {
    schema
        .fields()
        .iter()
        .zip(columns)
        .map(|(field, column)| {
            column
                .into_iter()
                .map(|value| {
                    let value_type = value.data_type();
                    if value.is_null() && !field.nullable {
                        return Err(TableError::schema(format!(
                            "NULL in non-nullable column '{}'",
                            field.name
                        )));
                    }
                    value.coerce(field.data_type).ok_or_else(|| {
                        TableError::schema(format!(
                            "{} value does not fit column '{}' of type {}",
                            value_type, field.name, field.data_type
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect()
}

impl fmt::Display for LocalTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", display::render(self, display::DEFAULT_MAX_ROWS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(i64, &str)]) -> LocalTable {
        LocalTable::from_rows(
            &["id", "name"],
            rows.iter()
                .map(|(id, name)| vec![Value::Int(*id), Value::str(*name)])
                .collect(),
            &["id"],
        )
        .unwrap()
    }

    #[test]
    fn test_construction_sorts_by_key() {
        let t = table(&[(3, "c"), (1, "a"), (2, "b")]);
        let ids: Vec<Key> = t.keys().collect();
        assert_eq!(
            ids,
            vec![
                Key::new(vec![Value::Int(1)]),
                Key::new(vec![Value::Int(2)]),
                Key::new(vec![Value::Int(3)]),
            ]
        );
        assert_eq!(t.column("name").unwrap()[0], Value::str("a"));
        assert_eq!(t.pkey(), vec!["id".to_string()]);
    }

    #[test]
    fn test_unkeyed_keeps_insertion_order() {
        let t = LocalTable::from_rows(
            &["x"],
            vec![vec![Value::Int(2)], vec![Value::Int(1)]],
            &[],
        )
        .unwrap();
        assert!(!t.is_keyed());
        assert_eq!(t.column("x").unwrap(), &[Value::Int(2), Value::Int(1)]);
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let schema = Schema::new(vec![
            Field::new("a", DataType::Int, false),
            Field::new("b", DataType::Int, false),
        ]);
        let err = LocalTable::new(
            schema,
            vec![vec![Value::Int(1)], vec![]],
            &["a"],
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::SCHEMA_RAGGED_COLUMNS);
    }

    #[test]
    fn test_unknown_key_column_rejected() {
        let err = LocalTable::from_rows(&["a"], vec![vec![Value::Int(1)]], &["b"]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SCHEMA_UNKNOWN_COLUMN);
    }

    #[test]
    fn test_concat_promotes_types() {
        let ints = LocalTable::from_rows(
            &["id", "v"],
            vec![vec![Value::Int(1), Value::Int(10)]],
            &["id"],
        )
        .unwrap();
        let floats = LocalTable::from_rows(
            &["id", "v"],
            vec![vec![Value::Int(2), Value::Float(2.5)]],
            &["id"],
        )
        .unwrap();

        let joined = ints.concat(&floats).unwrap();
        assert_eq!(joined.num_rows(), 2);
        assert_eq!(joined.schema().fields()[1].data_type, DataType::Float);
        assert_eq!(joined.column("v").unwrap()[0].data_type(), DataType::Float);
    }

    #[test]
    fn test_merge_with_interleaves_and_aggregates() {
        let left = table(&[(1, "a"), (3, "c"), (5, "left")]);
        let right = table(&[(2, "b"), (5, "right"), (6, "f")]);

        let merged = left.merge_with(&right, &Aggregate::default()).unwrap();
        let rows: Vec<Vec<Value>> = merged.rows().collect();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[3], vec![Value::Int(5), Value::str("right")]);

        let kept = left.merge_with(&right, &Aggregate::FirstWriteWins).unwrap();
        assert_eq!(kept.row(3).unwrap()[1], Value::str("left"));
    }

    #[test]
    fn test_merge_with_rejects_bad_aggregate_arity() {
        let left = table(&[(1, "a")]);
        let right = table(&[(1, "b")]);
        let broken = Aggregate::custom(|_, _| vec![]);

        let err = left.merge_with(&right, &broken).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SCHEMA_ARITY_MISMATCH);
    }

    #[test]
    fn test_slice_and_key_bounds() {
        let t = table(&[(1, "a"), (2, "b"), (3, "c")]);
        let s = t.slice(1..10);
        assert_eq!(s.num_rows(), 2);
        assert_eq!(s.first_key(), Some(Key::new(vec![Value::Int(2)])));
        assert_eq!(s.last_key(), Some(Key::new(vec![Value::Int(3)])));
        assert!(t.slice(3..3).first_key().is_none());
    }
}
