//! The catalog data model: schemas, tables, columns, indexes,
//! constraints, sequences and routines, all reachable from the top-level
//! `Ais` graph. Field layout follows the struct-of-named-fields style used
//! by catalog structs elsewhere in the ecosystem (e.g. a relational
//! planner's `TableCatalog`): plain data, no behavior beyond small
//! accessors and the mutating builders the schema manager's DDL path uses
//! to produce a candidate graph.
//!
//! `Ais` itself carries no generation — that is stamped on once the graph
//! is handed to [`snapshot::Snapshot::freeze`].

pub mod snapshot;
pub mod validation;

use std::collections::BTreeMap;

use serde_derive::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub type_name: String,
    pub nullable: bool,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// The tree name backing this index's physical storage structure.
    pub tree_name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    PrimaryKey(Vec<String>),
    Unique(Vec<String>),
    ForeignKey { columns: Vec<String>, references_table: String, references_columns: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub kind: ConstraintKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: i64,
    pub name: String,
    pub schema_name: String,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    pub constraints: Vec<Constraint>,
    /// Stamped by the `TableVersionMap`; downstream caches key their own
    /// invalidation off this rather than the whole-catalog generation.
    pub version: i64,
    /// Memory-resident tables (system/session state) are excluded from
    /// the persisted per-schema blob by the selectors that back that
    /// distinction.
    pub is_memory_resident: bool,
}

impl Table {
    pub fn primary_key(&self) -> Option<&Index> {
        self.indexes.iter().find(|idx| idx.is_primary)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
    pub schema_name: String,
    pub start_with: i64,
    pub increment: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routine {
    pub name: String,
    pub schema_name: String,
    pub definition: String,
}

/// Deployed code backing a routine. Modeled only deeply enough to give
/// `Selector::pick_jar` something to select over; jars are not otherwise
/// linked into table/routine resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jar {
    pub name: String,
    pub schema_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub tables: BTreeMap<String, Table>,
    pub sequences: BTreeMap<String, Sequence>,
    pub routines: BTreeMap<String, Routine>,
    pub jars: BTreeMap<String, Jar>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Schema { name: name.into(), ..Default::default() }
    }

    pub fn get_user_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }
}

/// The full logical catalog graph (the "Akiban Information Schema" of the
/// glossary). Immutable once wrapped in a [`snapshot::Snapshot`]; these
/// methods are the only way to build or change one before that point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ais {
    pub schemas: BTreeMap<String, Schema>,
}

impl Ais {
    pub fn new() -> Self {
        Ais::default()
    }

    pub fn get_schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn schema_names(&self) -> impl Iterator<Item = &String> {
        self.schemas.keys()
    }

    /// Inserts an empty schema if one with this name doesn't already
    /// exist, and returns a mutable reference to it either way.
    pub fn get_or_create_schema(&mut self, name: &str) -> &mut Schema {
        self.schemas.entry(name.to_string()).or_insert_with(|| Schema::new(name))
    }

    pub fn drop_schema(&mut self, name: &str) -> Option<Schema> {
        self.schemas.remove(name)
    }

    pub fn add_table(&mut self, table: Table) {
        self.get_or_create_schema(&table.schema_name.clone()).tables.insert(table.name.clone(), table);
    }
}
