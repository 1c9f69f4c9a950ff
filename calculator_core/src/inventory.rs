//! Ordered inventory rows addressed by stable ids.

use std::fmt;

pub const DEFAULT_ROW_QUANTITY: &str = "0";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row#{}", self.0)
    }
}

/// One editable inventory entry. Both fields hold raw user text; the quantity
/// is only interpreted when a request is encoded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InventoryRow {
    pub name: String,
    pub quantity: String,
}

impl InventoryRow {
    pub fn new(name: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct InventoryStore {
    rows: Vec<(RowId, InventoryRow)>,
    next_id: u64,
}

impl InventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row at the end and returns the id used to remove it later.
    pub fn add_row(&mut self, name: impl Into<String>, quantity: impl Into<String>) -> RowId {
        let id = RowId(self.next_id);
        self.next_id += 1;
        self.rows.push((id, InventoryRow::new(name, quantity)));
        id
    }

    pub fn add_empty_row(&mut self) -> RowId {
        self.add_row("", DEFAULT_ROW_QUANTITY)
    }

    pub fn remove_row(&mut self, id: RowId) -> Option<InventoryRow> {
        let index = self.rows.iter().position(|(row_id, _)| *row_id == id)?;
        let (_, row) = self.rows.remove(index);
        Some(row)
    }

    pub fn get(&self, id: RowId) -> Option<&InventoryRow> {
        self.rows
            .iter()
            .find(|(row_id, _)| *row_id == id)
            .map(|(_, row)| row)
    }

    pub fn get_mut(&mut self, id: RowId) -> Option<&mut InventoryRow> {
        self.rows
            .iter_mut()
            .find(|(row_id, _)| *row_id == id)
            .map(|(_, row)| row)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RowId, &InventoryRow)> {
        self.rows.iter().map(|(id, row)| (*id, row))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (RowId, &mut InventoryRow)> {
        self.rows.iter_mut().map(|(id, row)| (*id, row))
    }

    pub fn rows(&self) -> impl Iterator<Item = &InventoryRow> {
        self.rows.iter().map(|(_, row)| row)
    }

    pub fn ids(&self) -> Vec<RowId> {
        self.rows.iter().map(|(id, _)| *id).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
