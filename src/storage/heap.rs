use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{DbError, DbResult};
use crate::storage::page::{SlottedPage, MAX_RECORD_SIZE};
use crate::storage::pager::Pager;
use crate::storage::row::{ColumnType, RowData, Value, ValueDict};
use crate::storage::{DbRelation, Handle};

/// The blocks of one relation, stored in `<dir>/<name>.db`.
pub struct HeapFile {
    path: PathBuf,
    pager: Option<Pager>,
}

impl HeapFile {
    pub fn new(dir: &Path, name: &str) -> Self {
        HeapFile {
            path: dir.join(format!("{}.db", name)),
            pager: None,
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create the file with one empty block.
    pub fn create(&mut self) -> DbResult<()> {
        self.pager = Some(Pager::create(&self.path)?);
        self.get_new()?;
        Ok(())
    }

    /// Remove the file from disk.
    pub fn drop(&mut self) -> DbResult<()> {
        self.close();
        fs::remove_file(&self.path)
            .map_err(|e| DbError::Relation(format!("cannot drop {}: {}", self.path.display(), e)))?;
        debug!("heap: dropped {}", self.path.display());
        Ok(())
    }

    pub fn open(&mut self) -> DbResult<()> {
        if self.pager.is_none() {
            self.pager = Some(Pager::open(&self.path)?);
        }
        Ok(())
    }

    pub fn close(&mut self) {
        self.pager = None;
    }

    /// The open pager, opening the file first if needed.
    pub fn pager(&mut self) -> DbResult<&mut Pager> {
        self.open()?;
        match self.pager.as_mut() {
            Some(pager) => Ok(pager),
            None => Err(DbError::Relation(format!("{} is not open", self.path.display()))),
        }
    }

    /// Append a freshly formatted block and return its id.
    pub fn get_new(&mut self) -> DbResult<u32> {
        let pager = self.pager()?;
        let block_id = pager.allocate_page();
        SlottedPage::init(&mut pager.get_page(block_id)?.data);
        pager.flush_page(block_id)?;
        Ok(block_id)
    }

    pub fn block_ids(&mut self) -> DbResult<Vec<u32>> {
        Ok((0..self.pager()?.num_pages()).collect())
    }
}

/// A relation stored as unordered records in a heap file.
pub struct HeapTable {
    table_name: String,
    column_names: Vec<String>,
    column_types: Vec<ColumnType>,
    file: HeapFile,
}

impl HeapTable {
    pub fn new(dir: &Path, table_name: &str, column_names: Vec<String>, column_types: Vec<ColumnType>) -> Self {
        HeapTable {
            table_name: table_name.to_string(),
            file: HeapFile::new(dir, table_name),
            column_names,
            column_types,
        }
    }

    pub fn exists(&self) -> bool {
        self.file.exists()
    }

    /// Check that `row` supplies every column with a value of the declared
    /// type, and lay the values out in column order.
    fn validate(&self, row: &ValueDict) -> DbResult<RowData> {
        let mut values = Vec::with_capacity(self.column_names.len());
        for (name, ty) in self.column_names.iter().zip(&self.column_types) {
            let value = row.get(name).ok_or_else(|| {
                DbError::Relation("don't know how to handle NULLs, defaults, etc. yet".into())
            })?;
            if value.column_type() != *ty {
                return Err(DbError::Relation(format!(
                    "column '{}' of {} expects {}",
                    name,
                    self.table_name,
                    ty.as_str()
                )));
            }
            values.push(value.clone());
        }
        Ok(RowData(values))
    }

    fn append(&mut self, row: &RowData) -> DbResult<Handle> {
        let bytes = row.serialize()?;
        if bytes.len() > MAX_RECORD_SIZE {
            return Err(DbError::NoRoom(bytes.len()));
        }
        let pager = self.file.pager()?;
        let last = pager.num_pages().checked_sub(1);
        if let Some(block_id) = last {
            let added = SlottedPage::wrap(&mut pager.get_page(block_id)?.data).add(&bytes);
            match added {
                Ok(record_id) => {
                    pager.flush_page(block_id)?;
                    return Ok(Handle { block_id, record_id });
                }
                Err(DbError::NoRoom(_)) => {}
                Err(e) => return Err(e),
            }
        }
        let block_id = self.file.get_new()?;
        let pager = self.file.pager()?;
        let record_id = {
            let mut block = SlottedPage::wrap(&mut pager.get_page(block_id)?.data);
            block.add(&bytes)?
        };
        pager.flush_page(block_id)?;
        debug!("heap: {} grew to block {}", self.table_name, block_id);
        Ok(Handle { block_id, record_id })
    }

    fn read(&mut self, handle: Handle) -> DbResult<RowData> {
        let page = self.file.pager()?.get_page(handle.block_id)?;
        let block = SlottedPage::wrap(&mut page.data);
        let bytes = block.get(handle.record_id).ok_or_else(|| {
            DbError::Relation(format!(
                "no row at ({}, {}) in {}",
                handle.block_id, handle.record_id, self.table_name
            ))
        })?;
        RowData::deserialize(bytes)
    }

    fn to_dict(column_names: &[String], row: RowData) -> ValueDict {
        column_names.iter().cloned().zip(row.0).collect()
    }

    fn matches(column_names: &[String], row: &RowData, conditions: &ValueDict) -> bool {
        conditions.iter().all(|(column, wanted)| {
            column_names
                .iter()
                .position(|c| c == column)
                .and_then(|i| row.0.get(i))
                .is_some_and(|v: &Value| v == wanted)
        })
    }
}

impl DbRelation for HeapTable {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn column_names(&self) -> &[String] {
        &self.column_names
    }

    fn column_types(&self) -> &[ColumnType] {
        &self.column_types
    }

    fn create(&mut self) -> DbResult<()> {
        self.file.create()?;
        debug!("heap: created relation {}", self.table_name);
        Ok(())
    }

    fn create_if_not_exists(&mut self) -> DbResult<()> {
        if self.file.open().is_err() {
            self.create()?;
        }
        Ok(())
    }

    fn open(&mut self) -> DbResult<()> {
        self.file.open()
    }

    fn close(&mut self) {
        self.file.close();
    }

    fn drop(&mut self) -> DbResult<()> {
        self.file.drop()
    }

    fn insert(&mut self, row: &ValueDict) -> DbResult<Handle> {
        let data = self.validate(row)?;
        self.append(&data)
    }

    fn del(&mut self, handle: Handle) -> DbResult<()> {
        let pager = self.file.pager()?;
        {
            let mut block = SlottedPage::wrap(&mut pager.get_page(handle.block_id)?.data);
            block.del(handle.record_id)?;
        }
        pager.flush_page(handle.block_id)
    }

    fn select(&mut self, conditions: Option<&ValueDict>) -> DbResult<Vec<Handle>> {
        let conditions = conditions.filter(|c| !c.is_empty());
        let mut handles = Vec::new();
        for block_id in self.file.block_ids()? {
            let page = self.file.pager()?.get_page(block_id)?;
            let block = SlottedPage::wrap(&mut page.data);
            for record_id in block.ids() {
                if let Some(conditions) = conditions {
                    let bytes = block.get(record_id).unwrap_or_default();
                    let row = RowData::deserialize(bytes)?;
                    if !Self::matches(&self.column_names, &row, conditions) {
                        continue;
                    }
                }
                handles.push(Handle { block_id, record_id });
            }
        }
        Ok(handles)
    }

    fn project(&mut self, handle: Handle, columns: Option<&[String]>) -> DbResult<ValueDict> {
        let row = self.read(handle)?;
        let mut full = Self::to_dict(&self.column_names, row);
        match columns {
            None => Ok(full),
            Some(columns) => columns
                .iter()
                .map(|c| {
                    full.remove(c)
                        .map(|v| (c.clone(), v))
                        .ok_or_else(|| DbError::ColumnNotFound(c.clone()))
                })
                .collect(),
        }
    }
}
