pub mod page;
pub mod pager;
pub mod row;
pub mod heap;
pub mod index;

use crate::error::DbResult;
use crate::storage::page::RecordId;
use crate::storage::row::{ColumnType, ValueDict};

pub use heap::HeapTable;
pub use index::BTreeIndex;

/// Location of one stored row: a block of the relation's heap file and a
/// record slot inside it. Only the storage layer creates these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle {
    pub block_id: u32,
    pub record_id: RecordId,
}

/// A named physical table with an ordered column schema.
pub trait DbRelation {
    fn table_name(&self) -> &str;
    fn column_names(&self) -> &[String];
    fn column_types(&self) -> &[ColumnType];

    fn create(&mut self) -> DbResult<()>;
    fn create_if_not_exists(&mut self) -> DbResult<()>;
    fn open(&mut self) -> DbResult<()>;
    fn close(&mut self);
    fn drop(&mut self) -> DbResult<()>;

    fn insert(&mut self, row: &ValueDict) -> DbResult<Handle>;
    fn del(&mut self, handle: Handle) -> DbResult<()>;
    /// Handles of every row matching all entries of `conditions`.
    fn select(&mut self, conditions: Option<&ValueDict>) -> DbResult<Vec<Handle>>;
    /// The row at `handle`, restricted to `columns` (all columns if `None`).
    fn project(&mut self, handle: Handle, columns: Option<&[String]>) -> DbResult<ValueDict>;
}

/// A secondary structure over some columns of a relation. Entries are keyed
/// by column values, so every operation reads the base row through the
/// relation it is handed.
pub trait DbIndex {
    fn name(&self) -> &str;
    fn create(&mut self, relation: &mut dyn DbRelation) -> DbResult<()>;
    fn drop(&mut self) -> DbResult<()>;
    fn insert(&mut self, relation: &mut dyn DbRelation, handle: Handle) -> DbResult<()>;
    fn del(&mut self, relation: &mut dyn DbRelation, handle: Handle) -> DbResult<()>;
}
