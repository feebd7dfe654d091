use std::collections::BTreeMap;

use log::debug;

use crate::error::{DbError, DbResult};
use crate::storage::row::Value;
use crate::storage::{DbIndex, DbRelation, Handle};

type Entries = BTreeMap<Vec<Value>, Vec<Handle>>;

/// An ordered index from key-column values to row handles.
///
/// Entries live in memory only. A freshly opened index has none and
/// rebuilds them from its relation the first time it is maintained, so the
/// relation's heap file stays the single durable copy of the data.
pub struct BTreeIndex {
    table_name: String,
    name: String,
    key_columns: Vec<String>,
    unique: bool,
    entries: Option<Entries>,
}

impl BTreeIndex {
    pub fn new(table_name: &str, name: &str, key_columns: Vec<String>, unique: bool) -> Self {
        BTreeIndex {
            table_name: table_name.to_string(),
            name: name.to_string(),
            key_columns,
            unique,
            entries: None,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_built(&self) -> bool {
        self.entries.is_some()
    }

    /// Handles stored under `key` (values in key-column order).
    pub fn lookup(&self, key: &[Value]) -> Vec<Handle> {
        self.entries
            .as_ref()
            .and_then(|e| e.get(key))
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of handles held.
    pub fn len(&self) -> usize {
        self.entries
            .as_ref()
            .map_or(0, |e| e.values().map(Vec::len).sum())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key_for(&self, relation: &mut dyn DbRelation, handle: Handle) -> DbResult<Vec<Value>> {
        let mut row = relation.project(handle, Some(self.key_columns.as_slice()))?;
        self.key_columns
            .iter()
            .map(|c| row.remove(c).ok_or_else(|| DbError::ColumnNotFound(c.clone())))
            .collect()
    }

    fn build(&self, relation: &mut dyn DbRelation) -> DbResult<Entries> {
        let mut entries = Entries::new();
        for handle in relation.select(None)? {
            let key = self.key_for(relation, handle)?;
            add_entry(&mut entries, self.unique, key, handle)?;
        }
        debug!(
            "index {}.{}: built {} keys",
            self.table_name,
            self.name,
            entries.len()
        );
        Ok(entries)
    }

    fn built(&mut self, relation: &mut dyn DbRelation) -> DbResult<&mut Entries> {
        if self.entries.is_none() {
            self.entries = Some(self.build(relation)?);
        }
        self.entries
            .as_mut()
            .ok_or_else(|| DbError::Relation(format!("index {} is not built", self.name)))
    }
}

fn add_entry(entries: &mut Entries, unique: bool, key: Vec<Value>, handle: Handle) -> DbResult<()> {
    let display = key.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
    let slot = entries.entry(key).or_default();
    if slot.contains(&handle) {
        return Ok(());
    }
    if unique && !slot.is_empty() {
        return Err(DbError::DuplicateKey(format!("({})", display)));
    }
    slot.push(handle);
    Ok(())
}

impl DbIndex for BTreeIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn create(&mut self, relation: &mut dyn DbRelation) -> DbResult<()> {
        if self.entries.is_some() {
            return Err(DbError::Relation(format!("index {} already exists", self.name)));
        }
        self.entries = Some(self.build(relation)?);
        Ok(())
    }

    fn drop(&mut self) -> DbResult<()> {
        self.entries = None;
        debug!("index {}.{}: dropped", self.table_name, self.name);
        Ok(())
    }

    fn insert(&mut self, relation: &mut dyn DbRelation, handle: Handle) -> DbResult<()> {
        let key = self.key_for(relation, handle)?;
        let unique = self.unique;
        let entries = self.built(relation)?;
        add_entry(entries, unique, key, handle)
    }

    fn del(&mut self, relation: &mut dyn DbRelation, handle: Handle) -> DbResult<()> {
        let key = self.key_for(relation, handle)?;
        let entries = self.built(relation)?;
        if let Some(slot) = entries.get_mut(&key) {
            slot.retain(|h| *h != handle);
            if slot.is_empty() {
                entries.remove(&key);
            }
        }
        Ok(())
    }
}
