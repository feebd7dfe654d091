use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{DbError, DbResult};
use crate::storage::heap::HeapTable;
use crate::storage::index::BTreeIndex;
use crate::storage::row::{dict, ColumnType, Value, ValueDict};
use crate::storage::{DbRelation, Handle};

pub const TABLES: &str = "_tables";
pub const COLUMNS: &str = "_columns";
pub const INDICES: &str = "_indices";

/// One of the three system relations describing everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registry {
    Tables,
    Columns,
    Indices,
}

impl Registry {
    pub const ALL: [Registry; 3] = [Registry::Tables, Registry::Columns, Registry::Indices];

    /// The registry stored under `name`, if it is one.
    pub fn from_table_name(name: &str) -> Option<Registry> {
        Registry::ALL.into_iter().find(|r| r.table_name() == name)
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            Registry::Tables => TABLES,
            Registry::Columns => COLUMNS,
            Registry::Indices => INDICES,
        }
    }

    /// Column names and types of the registry relation itself.
    pub fn schema(&self) -> (Vec<String>, Vec<ColumnType>) {
        use ColumnType::*;
        let cols: &[(&str, ColumnType)] = match self {
            Registry::Tables => &[("table_name", Text)],
            Registry::Columns => &[("table_name", Text), ("column_name", Text), ("data_type", Text)],
            Registry::Indices => &[
                ("table_name", Text),
                ("index_name", Text),
                ("seq_in_index", Integer),
                ("column_name", Text),
                ("index_type", Text),
                ("is_unique", Boolean),
            ],
        };
        cols.iter().map(|(n, t)| (n.to_string(), *t)).unzip()
    }
}

pub fn is_registry(name: &str) -> bool {
    Registry::from_table_name(name).is_some()
}

/// The catalog: the three registry relations plus every user relation and
/// index opened so far. Created once by the caller and handed to each
/// statement.
pub struct Catalog {
    dir: PathBuf,
    tables: HeapTable,
    columns: HeapTable,
    indices: HeapTable,
    relations: HashMap<String, HeapTable>,
    index_cache: HashMap<(String, String), BTreeIndex>,
}

impl Catalog {
    /// Open the catalog stored in `dir`, creating the directory and the
    /// registries on first use.
    pub fn open(dir: impl AsRef<Path>) -> DbResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let registry = |which: Registry| {
            let (names, types) = which.schema();
            HeapTable::new(&dir, which.table_name(), names, types)
        };
        let mut catalog = Catalog {
            tables: registry(Registry::Tables),
            columns: registry(Registry::Columns),
            indices: registry(Registry::Indices),
            relations: HashMap::new(),
            index_cache: HashMap::new(),
            dir,
        };

        let fresh = !catalog.tables.exists();
        catalog.tables.create_if_not_exists()?;
        catalog.columns.create_if_not_exists()?;
        catalog.indices.create_if_not_exists()?;
        if fresh {
            catalog.bootstrap()?;
            info!("catalog: initialized new database in {}", catalog.dir.display());
        } else {
            debug!("catalog: opened {}", catalog.dir.display());
        }
        Ok(catalog)
    }

    /// Describe the registries in themselves.
    fn bootstrap(&mut self) -> DbResult<()> {
        for which in Registry::ALL {
            let table_name = which.table_name();
            self.register(Registry::Tables, &dict([("table_name", Value::from(table_name))]))?;
            let (names, types) = which.schema();
            for (name, ty) in names.into_iter().zip(types) {
                self.register(
                    Registry::Columns,
                    &dict([
                        ("table_name", Value::from(table_name)),
                        ("column_name", Value::from(name)),
                        ("data_type", Value::from(ty.as_str())),
                    ]),
                )?;
            }
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn registry(&mut self, which: Registry) -> &mut HeapTable {
        match which {
            Registry::Tables => &mut self.tables,
            Registry::Columns => &mut self.columns,
            Registry::Indices => &mut self.indices,
        }
    }

    /// Insert a row into a registry after checking it against what the
    /// registry already holds.
    pub fn register(&mut self, which: Registry, row: &ValueDict) -> DbResult<Handle> {
        let text = |column: &str| -> DbResult<Value> {
            row.get(column)
                .cloned()
                .ok_or_else(|| DbError::ColumnNotFound(column.to_string()))
        };
        let (key, clash) = match which {
            Registry::Tables => {
                let name = text("table_name")?;
                let clash = format!("table {} already exists", name_of(&name));
                (dict([("table_name", name)]), clash)
            }
            Registry::Columns => {
                let data_type = text("data_type")?;
                if !matches!(data_type.as_text(), Some("INT" | "TEXT" | "BOOLEAN")) {
                    return Err(DbError::Relation(format!(
                        "unknown data type {}",
                        name_of(&data_type)
                    )));
                }
                let (table, column) = (text("table_name")?, text("column_name")?);
                let clash = format!("duplicate column {}.{}", name_of(&table), name_of(&column));
                (dict([("table_name", table), ("column_name", column)]), clash)
            }
            Registry::Indices => {
                let (table, index, column) =
                    (text("table_name")?, text("index_name")?, text("column_name")?);
                let clash = format!(
                    "duplicate column {} in index {}.{}",
                    name_of(&column),
                    name_of(&table),
                    name_of(&index)
                );
                (
                    dict([("table_name", table), ("index_name", index), ("column_name", column)]),
                    clash,
                )
            }
        };
        let registry = self.registry(which);
        if !registry.select(Some(&key))?.is_empty() {
            return Err(DbError::Relation(clash));
        }
        registry.insert(row)
    }

    /// Delete a registry row, forgetting any cached object it described.
    pub fn unregister(&mut self, which: Registry, handle: Handle) -> DbResult<()> {
        let row = self.registry(which).project(handle, None)?;
        self.registry(which).del(handle)?;
        let text = |column: &str| row.get(column).map(name_of).unwrap_or_default();
        match which {
            Registry::Tables => {
                self.relations.remove(&text("table_name"));
            }
            Registry::Indices => {
                self.index_cache
                    .remove(&(text("table_name"), text("index_name")));
            }
            Registry::Columns => {}
        }
        Ok(())
    }

    pub fn is_registered(&mut self, table_name: &str) -> DbResult<bool> {
        let key = dict([("table_name", Value::from(table_name))]);
        Ok(!self.tables.select(Some(&key))?.is_empty())
    }

    /// Column names and types of `table_name`, in declaration order.
    pub fn get_columns(&mut self, table_name: &str) -> DbResult<(Vec<String>, Vec<ColumnType>)> {
        let key = dict([("table_name", Value::from(table_name))]);
        let mut names = Vec::new();
        let mut types = Vec::new();
        for handle in self.columns.select(Some(&key))? {
            let row = self.columns.project(handle, None)?;
            let name = row.get("column_name").map(name_of).unwrap_or_default();
            let ty = row
                .get("data_type")
                .and_then(Value::as_text)
                .and_then(ColumnType::from_str)
                .ok_or_else(|| DbError::Relation(format!("bad data type for {}.{}", table_name, name)))?;
            names.push(name);
            types.push(ty);
        }
        Ok((names, types))
    }

    /// The relation called `name`, which must be registered in `_tables`.
    pub fn get_table(&mut self, name: &str) -> DbResult<&mut HeapTable> {
        match name {
            TABLES => return Ok(&mut self.tables),
            COLUMNS => return Ok(&mut self.columns),
            INDICES => return Ok(&mut self.indices),
            _ => {}
        }
        if !self.relations.contains_key(name) {
            if !self.is_registered(name)? {
                return Err(DbError::TableNotFound(name.to_string()));
            }
            let (names, types) = self.get_columns(name)?;
            debug!("catalog: loaded relation {} {:?}", name, names);
            let table = HeapTable::new(&self.dir, name, names, types);
            self.relations.insert(name.to_string(), table);
        }
        self.relations
            .get_mut(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    /// Names of the indices on `table_name`, in registry order.
    pub fn get_index_names(&mut self, table_name: &str) -> DbResult<Vec<String>> {
        let key = dict([("table_name", Value::from(table_name))]);
        let wanted = ["index_name".to_string()];
        let mut names: Vec<String> = Vec::new();
        for handle in self.indices.select(Some(&key))? {
            let row = self.indices.project(handle, Some(&wanted[..]))?;
            let name = row.get("index_name").map(name_of).unwrap_or_default();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn load_index(&mut self, table_name: &str, index_name: &str) -> DbResult<BTreeIndex> {
        let key = dict([
            ("table_name", Value::from(table_name)),
            ("index_name", Value::from(index_name)),
        ]);
        let mut rows = Vec::new();
        for handle in self.indices.select(Some(&key))? {
            rows.push(self.indices.project(handle, None)?);
        }
        if rows.is_empty() {
            return Err(DbError::IndexNotFound {
                table: table_name.to_string(),
                index: index_name.to_string(),
            });
        }
        rows.sort_by_key(|r| r.get("seq_in_index").and_then(Value::as_integer).unwrap_or(0));
        let unique = matches!(rows[0].get("is_unique"), Some(Value::Boolean(true)));
        let columns = rows
            .iter()
            .map(|r| r.get("column_name").map(name_of).unwrap_or_default())
            .collect();
        Ok(BTreeIndex::new(table_name, index_name, columns, unique))
    }

    /// The index `index_name` on `table_name`, which must be registered in
    /// `_indices`.
    pub fn get_index(&mut self, table_name: &str, index_name: &str) -> DbResult<&mut BTreeIndex> {
        let key = (table_name.to_string(), index_name.to_string());
        if !self.index_cache.contains_key(&key) {
            let index = self.load_index(table_name, index_name)?;
            self.index_cache.insert(key.clone(), index);
        }
        self.index_cache.get_mut(&key).ok_or_else(|| DbError::IndexNotFound {
            table: table_name.to_string(),
            index: index_name.to_string(),
        })
    }

    /// An index together with the relation it covers, for maintenance.
    pub fn get_index_with_table(
        &mut self,
        table_name: &str,
        index_name: &str,
    ) -> DbResult<(&mut BTreeIndex, &mut HeapTable)> {
        self.get_table(table_name)?;
        self.get_index(table_name, index_name)?;
        let Catalog { tables, columns, indices, relations, index_cache, .. } = self;
        let relation = match table_name {
            TABLES => tables,
            COLUMNS => columns,
            INDICES => indices,
            _ => relations
                .get_mut(table_name)
                .ok_or_else(|| DbError::TableNotFound(table_name.to_string()))?,
        };
        let index = index_cache
            .get_mut(&(table_name.to_string(), index_name.to_string()))
            .ok_or_else(|| DbError::IndexNotFound {
                table: table_name.to_string(),
                index: index_name.to_string(),
            })?;
        Ok((index, relation))
    }
}

/// A registry name column as a plain string.
fn name_of(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        other => other.to_string(),
    }
}
