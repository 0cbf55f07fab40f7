//! Allocation scope of a single CSV parse.
//!
//! Every object created while parsing lives in a [`ParseArena`] until the
//! table is built. Dropping the arena on an early return releases exactly
//! that set and nothing else.

use tracing::debug;

use crate::error::{Error, Result};
use crate::object::{ObjRef, Vector, table};

pub(crate) const COLUMN_ALLOC_FAILED: &str =
    "Failed to allocate column data - file too large for memory";

#[derive(Default)]
pub struct ParseArena {
    names: Option<ObjRef>,
    columns: Vec<Vec<ObjRef>>,
    committed: bool,
}

impl ParseArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_names(&mut self, names: ObjRef) {
        self.names = Some(names);
    }

    /// Reserves `count` columns with room for `rows` cells each. Reservation
    /// is fallible so an oversized input surfaces as an error object.
    pub fn reserve_columns(&mut self, count: usize, rows: usize) -> Result<()> {
        let failed = |_| Error::user(COLUMN_ALLOC_FAILED);
        self.columns.try_reserve_exact(count).map_err(failed)?;
        for _ in 0..count {
            let mut column = Vec::new();
            column.try_reserve_exact(rows).map_err(failed)?;
            self.columns.push(column);
        }
        Ok(())
    }

    pub fn columns_mut(&mut self) -> &mut [Vec<ObjRef>] {
        &mut self.columns
    }

    /// Number of cells parsed so far.
    pub fn cells(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    /// Moves everything into a table. Construction failures come back as
    /// user errors and leave nothing allocated.
    pub fn finish(mut self) -> Result<ObjRef> {
        let names = self
            .names
            .take()
            .unwrap_or_else(|| ObjRef::vector(Vector::symbols(Vec::new())));
        let columns = std::mem::take(&mut self.columns)
            .into_iter()
            .map(ObjRef::list)
            .collect::<Vec<_>>();
        self.committed = true;
        table::table(names, ObjRef::list(columns))
            .map_err(|err| Error::user(format!("Failed to create table: {err}")))
    }
}

impl Drop for ParseArena {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let cells = self.cells();
        if self.names.is_some() || !self.columns.is_empty() {
            debug!(columns = self.columns.len(), cells, "releasing partial CSV allocations");
        }
    }
}
