//! The accumulator table: row keys in roster order plus named columns.
//!
//! Every operation returns a new `Table`; nothing mutates a table in place, so
//! each join step can be compared with the one before it.
use crate::error::{ExtractError, Result};
use crate::key::RowKey;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    keys: Vec<RowKey>,
    columns: Vec<Column>,
}

impl Table {
    /// A key-only table, the starting point of every pipeline.
    pub fn from_keys(keys: Vec<RowKey>) -> Self {
        Table {
            keys,
            columns: Vec::new(),
        }
    }

    pub fn keys(&self) -> &[RowKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Value at `row` of column `name`.
    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        self.column(name).and_then(|values| values.get(row))
    }

    /// Look a row up by key. Linear; meant for tests and diagnostics.
    pub fn value_for(&self, key: &RowKey, name: &str) -> Option<&Value> {
        let row = self.keys.iter().position(|k| k == key)?;
        self.value(row, name)
    }

    /// Append a column with one optional cell per current row. Rows whose cell
    /// is `None` are dropped; the surviving rows keep their order.
    pub fn narrow_with(&self, name: &str, cells: Vec<Option<Value>>) -> Result<Table> {
        if self.column(name).is_some() {
            return Err(ExtractError::DuplicateColumn(name.to_string()));
        }
        debug_assert_eq!(cells.len(), self.len());

        let keep: Vec<usize> = cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|_| i))
            .collect();

        let mut narrowed = self.select_rows(&keep);
        narrowed.columns.push(Column {
            name: name.to_string(),
            values: cells.into_iter().flatten().collect(),
        });
        Ok(narrowed)
    }

    /// Append a full-length column.
    pub fn with_column(mut self, name: &str, values: Vec<Value>) -> Result<Table> {
        if self.column(name).is_some() {
            return Err(ExtractError::DuplicateColumn(name.to_string()));
        }
        debug_assert_eq!(values.len(), self.len());
        self.columns.push(Column {
            name: name.to_string(),
            values,
        });
        Ok(self)
    }

    /// Swap the values of an existing column, keeping its position.
    pub fn replace_column(mut self, name: &str, values: Vec<Value>) -> Result<Table> {
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| ExtractError::UnknownColumn(name.to_string()))?;
        column.values = values;
        Ok(self)
    }

    /// Keep the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Table {
        Table {
            keys: rows.iter().map(|&r| self.keys[r].clone()).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: rows.iter().map(|&r| c.values[r].clone()).collect(),
                })
                .collect(),
        }
    }

    /// First `n` rows in current order.
    pub fn head(&self, n: usize) -> Table {
        let rows: Vec<usize> = (0..n.min(self.len())).collect();
        self.select_rows(&rows)
    }

    /// Same rows, only the named columns, in the order asked for.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<Table> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let values = self
                .column(name)
                .ok_or_else(|| ExtractError::UnknownColumn(name.to_string()))?;
            columns.push(Column {
                name: name.to_string(),
                values: values.to_vec(),
            });
        }
        Ok(Table {
            keys: self.keys.clone(),
            columns,
        })
    }

    /// Row-major view of the cells.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&Value>> + '_ {
        (0..self.len()).map(move |r| self.columns.iter().map(|c| &c.values[r]).collect())
    }
}
