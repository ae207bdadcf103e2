//! Ordered column and row registries.
//!
//! Both registries keep entries sorted by `number` and reject blank or
//! duplicate names, so a registry that exists is always well-formed.

use std::collections::HashSet;

use crate::error::{EntryKind, RegistryError};
use crate::model::{Column, ColumnId, Row, RowId};

/// Ordered set of answer-option columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnRegistry {
    columns: Vec<Column>,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from columns in any order, sorting them by number.
    pub fn from_columns(columns: impl IntoIterator<Item = Column>) -> Result<Self, RegistryError> {
        let mut columns: Vec<Column> = columns.into_iter().collect();
        columns.sort_by_key(|c| c.number);
        let mut registry = Self::new();
        for column in columns {
            registry.push(column)?;
        }
        Ok(registry)
    }

    /// Append a column. Its number must be greater than the last one.
    pub fn push(&mut self, column: Column) -> Result<(), RegistryError> {
        check_entry(
            EntryKind::Column,
            column.number,
            &column.name,
            self.columns.last().map(|c| c.number),
            self.columns.iter().map(|c| c.name.as_str()),
        )?;
        self.columns.push(column);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    /// Column with the given 0-based ordinal.
    pub fn get(&self, number: usize) -> Option<&Column> {
        self.columns
            .binary_search_by_key(&number, |c| c.number)
            .ok()
            .map(|i| &self.columns[i])
    }

    pub fn by_id(&self, id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == Some(id))
    }

    /// Position of a column in registry order.
    pub fn position_of(&self, id: ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| c.id == Some(id))
    }

    /// Ids of persisted columns, in order.
    pub fn ids(&self) -> Vec<ColumnId> {
        self.columns.iter().filter_map(|c| c.id).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a ColumnRegistry {
    type Item = &'a Column;
    type IntoIter = std::slice::Iter<'a, Column>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

/// Ordered set of sub-question rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowRegistry {
    rows: Vec<Row>,
}

impl RowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from rows in any order, sorting them by number.
    pub fn from_rows(rows: impl IntoIterator<Item = Row>) -> Result<Self, RegistryError> {
        let mut rows: Vec<Row> = rows.into_iter().collect();
        rows.sort_by_key(|r| r.number);
        let mut registry = Self::new();
        for row in rows {
            registry.push(row)?;
        }
        Ok(registry)
    }

    /// Append a row. Its number must be greater than the last one.
    pub fn push(&mut self, row: Row) -> Result<(), RegistryError> {
        check_entry(
            EntryKind::Row,
            row.number,
            &row.name,
            self.rows.last().map(|r| r.number),
            self.rows.iter().map(|r| r.name.as_str()),
        )?;
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    /// Row with the given 0-based ordinal.
    pub fn get(&self, number: usize) -> Option<&Row> {
        self.rows
            .binary_search_by_key(&number, |r| r.number)
            .ok()
            .map(|i| &self.rows[i])
    }

    pub fn by_id(&self, id: RowId) -> Option<&Row> {
        self.rows.iter().find(|r| r.id == Some(id))
    }

    pub fn ids(&self) -> Vec<RowId> {
        self.rows.iter().filter_map(|r| r.id).collect()
    }
}

impl<'a> IntoIterator for &'a RowRegistry {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

fn check_entry<'a>(
    kind: EntryKind,
    number: usize,
    name: &str,
    previous: Option<usize>,
    existing: impl Iterator<Item = &'a str>,
) -> Result<(), RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::BlankName { kind, number });
    }
    if let Some(previous) = previous {
        if number <= previous {
            return Err(RegistryError::OutOfOrder {
                kind,
                previous,
                found: number,
            });
        }
    }
    let existing: HashSet<&str> = existing.map(str::trim).collect();
    if existing.contains(name.trim()) {
        return Err(RegistryError::DuplicateName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}
