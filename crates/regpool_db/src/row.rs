//! Wide-column row model: rows, cells, read filters and write mutations.

use serde::{Deserialize, Serialize};

/// One cell of a row: the latest value stored under `family:column`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub family: String,
    pub column: String,
    pub value: Vec<u8>,
}

impl Cell {
    pub fn new(family: impl Into<String>, column: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            family: family.into(),
            column: column.into(),
            value: value.into(),
        }
    }
}

/// A row as returned by a read: its key plus the cells that survived the filter,
/// ordered by family then column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    key: String,
    cells: Vec<Cell>,
}

impl Row {
    pub fn new(key: impl Into<String>, mut cells: Vec<Cell>) -> Self {
        cells.sort_by(|a, b| (&a.family, &a.column).cmp(&(&b.family, &b.column)));
        Self {
            key: key.into(),
            cells,
        }
    }

    /// The full row key.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cells of a single column family.
    pub fn family<'a>(&'a self, family: &'a str) -> impl Iterator<Item = &'a Cell> + 'a {
        self.cells.iter().filter(move |cell| cell.family == family)
    }

    /// Value of `family:column`, if the row holds that cell.
    pub fn value(&self, family: &str, column: &str) -> Option<&[u8]> {
        self.cells
            .iter()
            .find(|cell| cell.family == family && cell.column == column)
            .map(|cell| cell.value.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn into_parts(self) -> (String, Vec<Cell>) {
        (self.key, self.cells)
    }
}

/// Projection applied to every read: keep only cells of `family` and/or `column`.
///
/// Unset parts match everything, so `RowFilter::all()` keeps every cell. A row
/// whose cells are all filtered out is reported as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFilter {
    family: Option<String>,
    column: Option<String>,
}

impl RowFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn family(family: impl Into<String>) -> Self {
        Self {
            family: Some(family.into()),
            column: None,
        }
    }

    pub fn column(column: impl Into<String>) -> Self {
        Self {
            family: None,
            column: Some(column.into()),
        }
    }

    /// `family:column` only.
    pub fn cell(family: impl Into<String>, column: impl Into<String>) -> Self {
        Self::family(family).and_column(column)
    }

    /// Chains a column restriction onto this filter.
    pub fn and_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn family_name(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn column_name(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn matches(&self, family: &str, column: &str) -> bool {
        self.family.as_deref().map_or(true, |f| f == family)
            && self.column.as_deref().map_or(true, |c| c == column)
    }

    /// Applies the filter to a row, `None` if no cell survives.
    pub fn apply(&self, row: Row) -> Option<Row> {
        let (key, cells) = row.into_parts();
        let cells: Vec<Cell> = cells
            .into_iter()
            .filter(|cell| self.matches(&cell.family, &cell.column))
            .collect();
        if cells.is_empty() {
            None
        } else {
            Some(Row::new(key, cells))
        }
    }
}

/// A single operation of a row mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOp {
    /// Remove every cell of the row.
    DeleteRow,
    /// Remove one cell.
    DeleteCell { family: String, column: String },
    /// Write one cell, replacing any previous value.
    SetCell {
        family: String,
        column: String,
        value: Vec<u8>,
    },
}

/// Ordered list of operations applied atomically to one row.
///
/// ```
/// use regpool_db::Mutation;
///
/// let mutation = Mutation::new()
///     .delete_row()
///     .set("DeviceProperties", "ApplianceKey", b"appk-test".to_vec());
/// assert_eq!(mutation.ops().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mutation {
    ops: Vec<MutationOp>,
}

impl Mutation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete_row(mut self) -> Self {
        self.ops.push(MutationOp::DeleteRow);
        self
    }

    pub fn delete_cell(mut self, family: impl Into<String>, column: impl Into<String>) -> Self {
        self.ops.push(MutationOp::DeleteCell {
            family: family.into(),
            column: column.into(),
        });
        self
    }

    pub fn set(
        mut self,
        family: impl Into<String>,
        column: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        self.ops.push(MutationOp::SetCell {
            family: family.into(),
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn ops(&self) -> &[MutationOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
