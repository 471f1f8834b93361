//! Table and column metadata, with dual persistence: a sidecar JSON file
//! (preferred on open) and a bincode-embeddable form for the metadata page.

use std::{fs, path::Path};

use ahash::RandomState;
use common::{ColumnId, DbError, DbResult};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use types::{SqlType, Value};

type Map<K, V> = HashMap<K, V, RandomState>;

/// Unique identifier for an index definition stored in the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexId(pub u64);

/// Persistent catalog that stores table schemas, page lists, and index metadata.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Catalog {
    tables: Vec<TableMeta>,
    next_index_id: u64,
    /// Named sequence counters; bookkeeping only (see DESIGN.md §4.5.1).
    sequences: Map<String, u64>,
    #[serde(skip)]
    #[serde(default)]
    table_name_index: Map<String, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: Vec::new(),
            next_index_id: 1,
            sequences: Map::default(),
            table_name_index: Map::default(),
        }
    }

    /// Load a catalog, preferring the sidecar JSON file and falling back to
    /// the metadata-page bytes when the sidecar is absent or unreadable.
    pub fn open(sidecar_path: &Path, page_zero_bytes: Option<&[u8]>) -> DbResult<Self> {
        if sidecar_path.exists() {
            if let Ok(data) = fs::read_to_string(sidecar_path) {
                if let Ok(mut catalog) = serde_json::from_str::<Catalog>(&data) {
                    catalog.rebuild_indexes();
                    return Ok(catalog);
                }
            }
        }
        if let Some(bytes) = page_zero_bytes {
            if let Ok(mut catalog) = Self::from_bytes(bytes) {
                catalog.rebuild_indexes();
                return Ok(catalog);
            }
        }
        Ok(Self::new())
    }

    /// Persist to the sidecar JSON file.
    pub fn save(&self, sidecar_path: &Path) -> DbResult<()> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|err| DbError::Catalog(format!("serialize failed: {err}")))?;
        fs::write(sidecar_path, data)?;
        Ok(())
    }

    /// Serialize for embedding in the metadata page (page 0).
    pub fn to_bytes(&self) -> DbResult<Vec<u8>> {
        bincode::serde::encode_to_vec(self, bincode::config::legacy())
            .map_err(|err| DbError::Catalog(format!("catalog encode failed: {err}")))
    }

    /// Deserialize from metadata-page bytes.
    pub fn from_bytes(bytes: &[u8]) -> DbResult<Self> {
        let (mut catalog, _): (Catalog, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::legacy())
                .map_err(|err| DbError::Catalog(format!("catalog decode failed: {err}")))?;
        catalog.rebuild_indexes();
        Ok(catalog)
    }

    pub fn table(&self, name: &str) -> DbResult<&TableMeta> {
        let idx = self
            .table_name_index
            .get(&name.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| DbError::Catalog(format!("table '{name}' does not exist")))?;
        Ok(&self.tables[idx])
    }

    pub fn table_mut(&mut self, name: &str) -> DbResult<&mut TableMeta> {
        let idx = self
            .table_name_index
            .get(&name.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| DbError::Catalog(format!("table '{name}' does not exist")))?;
        Ok(&mut self.tables[idx])
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.table_name_index.contains_key(&name.to_ascii_lowercase())
    }

    pub fn create_table(&mut self, name: &str, columns: Vec<Column>) -> DbResult<()> {
        if self.has_table(name) {
            return Err(DbError::Catalog(format!("table '{name}' already exists")));
        }
        let schema = TableSchema::try_new(columns)?;
        self.tables.push(TableMeta::new(name.to_string(), schema));
        self.rebuild_indexes();
        Ok(())
    }

    pub fn drop_table(&mut self, name: &str) -> DbResult<()> {
        let idx = self
            .table_name_index
            .get(&name.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| DbError::Catalog(format!("table '{name}' does not exist")))?;
        self.tables.remove(idx);
        self.rebuild_indexes();
        Ok(())
    }

    pub fn list_tables(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableMeta> {
        self.tables.iter()
    }

    pub fn create_index(
        &mut self,
        table_name: &str,
        index_name: &str,
        columns: &[&str],
        kind: IndexKind,
    ) -> DbResult<IndexId> {
        if columns.is_empty() {
            return Err(DbError::Catalog(
                "index must reference at least one column".into(),
            ));
        }
        let resolved = {
            let table = self.table(table_name)?;
            let mut resolved = Vec::with_capacity(columns.len());
            for name in columns {
                let ordinal = table.schema.column_index(name).ok_or_else(|| {
                    DbError::Catalog(format!("unknown column '{name}' on table '{table_name}'"))
                })?;
                resolved.push(ordinal);
            }
            resolved
        };
        let index_id = IndexId(self.next_index_id);
        self.next_index_id += 1;
        let table = self.table_mut(table_name)?;
        table.add_index(IndexMeta {
            id: index_id,
            name: index_name.to_string(),
            columns: resolved,
            kind,
        })?;
        Ok(index_id)
    }

    pub fn drop_index(&mut self, table_name: &str, index_name: &str) -> DbResult<()> {
        self.table_mut(table_name)?.remove_index(index_name)
    }

    /// Allocate and persist the next value for a named sequence counter.
    /// Not exercised by any grammar rule in the shipped dialect; bookkeeping
    /// mirrored from the catalogs this one is grounded on.
    pub fn next_sequence_value(&mut self, name: &str) -> u64 {
        let counter = self.sequences.entry(name.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Validate and complete a record being inserted into `table_name`.
    ///
    /// `columns` names the positions of `values`, or `None` to mean "all
    /// declared columns in order". Returns the full row in declared column
    /// order with defaults filled in for omitted columns.
    pub fn validate_record(
        &self,
        table_name: &str,
        columns: Option<&[String]>,
        values: &[Value],
    ) -> DbResult<Vec<Value>> {
        let table = self.table(table_name)?;
        let schema = &table.schema;

        let target_names: Vec<String> = match columns {
            Some(cols) => cols.to_vec(),
            None => schema.columns.iter().map(|c| c.name.clone()).collect(),
        };

        if target_names.len() != values.len() {
            return Err(DbError::Constraint(format!(
                "value count mismatch: expected {}, got {}",
                target_names.len(),
                values.len()
            )));
        }

        let mut provided: Map<String, Value> = Map::default();
        for (name, value) in target_names.iter().zip(values.iter()) {
            if schema.column_index(name).is_none() {
                return Err(DbError::Constraint(format!(
                    "unknown column '{name}' on table '{table_name}'"
                )));
            }
            provided.insert(name.to_ascii_lowercase(), value.clone());
        }

        let mut out = Vec::with_capacity(schema.columns.len());
        for col in &schema.columns {
            let value = match provided.get(&col.name.to_ascii_lowercase()) {
                Some(v) => v.clone(),
                None => col.default.clone().unwrap_or(Value::Null),
            };
            if value.is_null() && !col.nullable {
                return Err(DbError::Constraint(format!(
                    "column '{}' does not accept NULL",
                    col.name
                )));
            }
            if !col.ty.accepts(&value) {
                return Err(DbError::Constraint(format!(
                    "value {:?} is not compatible with column '{}' ({:?})",
                    value, col.name, col.ty
                )));
            }
            out.push(value);
        }
        Ok(out)
    }

    fn rebuild_indexes(&mut self) {
        self.table_name_index.clear();
        for (idx, table) in self.tables.iter_mut().enumerate() {
            self.table_name_index.insert(table.name.to_ascii_lowercase(), idx);
            table.rebuild_index_lookup();
        }
    }
}

/// Metadata describing a registered table: its schema, the page list backing
/// its table heap, and any named indexes (bookkeeping only).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableMeta {
    pub name: String,
    pub schema: TableSchema,
    pub page_ids: Vec<u64>,
    pub record_count: u64,
    pub created_at_unix: u64,
    pub indexes: Vec<IndexMeta>,
    #[serde(skip)]
    #[serde(default)]
    index_name_lookup: Map<String, usize>,
}

impl TableMeta {
    fn new(name: String, schema: TableSchema) -> Self {
        let mut table = Self {
            name,
            schema,
            page_ids: Vec::new(),
            record_count: 0,
            created_at_unix: 0,
            indexes: Vec::new(),
            index_name_lookup: Map::default(),
        };
        table.rebuild_index_lookup();
        table
    }

    fn add_index(&mut self, index: IndexMeta) -> DbResult<()> {
        if self.index_name_lookup.contains_key(&index.name) {
            return Err(DbError::Catalog(format!(
                "index '{}' already exists on table '{}'",
                index.name, self.name
            )));
        }
        self.indexes.push(index);
        self.rebuild_index_lookup();
        Ok(())
    }

    fn remove_index(&mut self, index_name: &str) -> DbResult<()> {
        let idx = self.index_name_lookup.get(index_name).copied().ok_or_else(|| {
            DbError::Catalog(format!(
                "index '{index_name}' does not exist on table '{}'",
                self.name
            ))
        })?;
        self.indexes.remove(idx);
        self.rebuild_index_lookup();
        Ok(())
    }

    pub fn index(&self, name: &str) -> DbResult<&IndexMeta> {
        let idx = self.index_name_lookup.get(name).copied().ok_or_else(|| {
            DbError::Catalog(format!(
                "index '{name}' does not exist on table '{}'",
                self.name
            ))
        })?;
        Ok(&self.indexes[idx])
    }

    pub fn has_index(&self, index_name: &str) -> bool {
        self.index_name_lookup.contains_key(index_name)
    }

    pub fn indexes(&self) -> &[IndexMeta] {
        &self.indexes
    }

    fn rebuild_index_lookup(&mut self) {
        self.index_name_lookup.clear();
        for (idx, index) in self.indexes.iter().enumerate() {
            self.index_name_lookup.insert(index.name.clone(), idx);
        }
    }
}

/// Column layout for a table, along with a name-to-ordinal lookup.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TableSchema {
    pub columns: Vec<Column>,
    pub name_to_ordinal: Map<String, ColumnId>,
}

impl TableSchema {
    pub fn try_new(columns: Vec<Column>) -> DbResult<Self> {
        if columns.is_empty() {
            return Err(DbError::Catalog(
                "table must contain at least one column".into(),
            ));
        }
        if columns.len() > u16::MAX as usize {
            return Err(DbError::Catalog(
                "too many columns for a single table".into(),
            ));
        }
        let mut name_to_ordinal = Map::default();
        for (idx, column) in columns.iter().enumerate() {
            let ordinal = idx as ColumnId;
            let key = column.name.to_ascii_lowercase();
            if name_to_ordinal.insert(key, ordinal).is_some() {
                return Err(DbError::Catalog(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
        }
        Ok(Self {
            columns,
            name_to_ordinal,
        })
    }

    pub fn column_index(&self, name: &str) -> Option<ColumnId> {
        self.name_to_ordinal.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn column_type(&self, ordinal: ColumnId) -> Option<&SqlType> {
        self.columns.get(ordinal as usize).map(|c| &c.ty)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Describes a logical column within a table schema.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub name: String,
    pub ty: SqlType,
    pub nullable: bool,
    pub default: Option<Value>,
    pub primary_key: bool,
    pub unique: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: SqlType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: true,
            default: None,
            primary_key: false,
            unique: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self.unique = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Metadata describing a table index. Recorded but not consulted by the
/// planner: index acceleration is an explicit non-goal of this engine.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexMeta {
    pub id: IndexId,
    pub name: String,
    pub columns: Vec<ColumnId>,
    pub kind: IndexKind,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum IndexKind {
    BTree,
    Hash,
}
