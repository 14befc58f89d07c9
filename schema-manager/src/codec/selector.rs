//! Selectors: policy objects deciding which catalog elements
//! are emitted when a schema is serialized. A single capability-set trait
//! plays the role the source's dynamic-dispatch visitors did — no
//! inheritance hierarchy, just one polymorphic object the codec consults
//! at each node.

use crate::catalog::{Jar, Routine, Sequence, Table};

pub const SYSTEM_SCHEMAS: &[&str] = &["sys", "sqlj", "security"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSelection {
    Included,
    Excluded,
    Rewritten(Table),
}

pub trait Selector: Send + Sync {
    fn pick_schema(&self, name: &str) -> bool;
    fn pick_table(&self, table: &Table) -> TableSelection;
    fn pick_routine(&self, routine: &Routine) -> bool;
    fn pick_sequence(&self, sequence: &Sequence) -> bool;
    fn pick_jar(&self, jar: &Jar) -> bool;
}

/// Everything in schema `s`.
pub struct SingleSchema {
    pub schema: String,
}

impl SingleSchema {
    pub fn new(schema: impl Into<String>) -> Self {
        SingleSchema { schema: schema.into() }
    }
}

impl Selector for SingleSchema {
    fn pick_schema(&self, name: &str) -> bool {
        name == self.schema
    }
    fn pick_table(&self, _table: &Table) -> TableSelection {
        TableSelection::Included
    }
    fn pick_routine(&self, _routine: &Routine) -> bool {
        true
    }
    fn pick_sequence(&self, _sequence: &Sequence) -> bool {
        true
    }
    fn pick_jar(&self, _jar: &Jar) -> bool {
        true
    }
}

/// `SingleSchema(s)` minus memory-resident tables — used for system and
/// security schemas when persisting, since memory tables never need a
/// durable blob.
pub struct SingleSchemaExceptMemoryTables {
    pub schema: String,
}

impl SingleSchemaExceptMemoryTables {
    pub fn new(schema: impl Into<String>) -> Self {
        SingleSchemaExceptMemoryTables { schema: schema.into() }
    }
}

impl Selector for SingleSchemaExceptMemoryTables {
    fn pick_schema(&self, name: &str) -> bool {
        name == self.schema
    }
    fn pick_table(&self, table: &Table) -> TableSelection {
        if table.is_memory_resident { TableSelection::Excluded } else { TableSelection::Included }
    }
    fn pick_routine(&self, _routine: &Routine) -> bool {
        true
    }
    fn pick_sequence(&self, _sequence: &Sequence) -> bool {
        true
    }
    fn pick_jar(&self, _jar: &Jar) -> bool {
        true
    }
}

/// `SingleSchema(s)` minus memory-resident tables and minus routines —
/// used for the `sys`/`sqlj` schemas when persisting: their routines are
/// system-provided rather than user DDL, and like every system schema
/// their memory-resident tables never need a durable blob either.
pub struct SingleSchemaExceptMemoryTablesAndRoutines {
    pub schema: String,
}

impl SingleSchemaExceptMemoryTablesAndRoutines {
    pub fn new(schema: impl Into<String>) -> Self {
        SingleSchemaExceptMemoryTablesAndRoutines { schema: schema.into() }
    }
}

impl Selector for SingleSchemaExceptMemoryTablesAndRoutines {
    fn pick_schema(&self, name: &str) -> bool {
        name == self.schema
    }
    fn pick_table(&self, table: &Table) -> TableSelection {
        if table.is_memory_resident { TableSelection::Excluded } else { TableSelection::Included }
    }
    fn pick_routine(&self, _routine: &Routine) -> bool {
        false
    }
    fn pick_sequence(&self, _sequence: &Sequence) -> bool {
        true
    }
    fn pick_jar(&self, _jar: &Jar) -> bool {
        true
    }
}

/// Only tables marked memory-resident, plus `sys`/`sqlj`/`security`
/// routines — applies across every schema rather than a single one.
pub struct MemoryTablesOnly;

impl Selector for MemoryTablesOnly {
    fn pick_schema(&self, _name: &str) -> bool {
        true
    }
    fn pick_table(&self, table: &Table) -> TableSelection {
        if table.is_memory_resident { TableSelection::Included } else { TableSelection::Excluded }
    }
    fn pick_routine(&self, routine: &Routine) -> bool {
        SYSTEM_SCHEMAS.contains(&routine.schema_name.as_str())
    }
    fn pick_sequence(&self, _sequence: &Sequence) -> bool {
        false
    }
    fn pick_jar(&self, jar: &Jar) -> bool {
        SYSTEM_SCHEMAS.contains(&jar.schema_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, Routine};

    fn memory_table() -> Table {
        Table {
            id: 1,
            name: "session_state".to_string(),
            schema_name: "sys".to_string(),
            columns: vec![Column {
                name: "k".to_string(),
                type_name: "varchar".to_string(),
                nullable: false,
                position: 0,
            }],
            indexes: vec![],
            constraints: vec![],
            version: 1,
            is_memory_resident: true,
        }
    }

    #[test]
    fn single_schema_except_memory_tables_excludes_them() {
        let selector = SingleSchemaExceptMemoryTables::new("sys");
        assert_eq!(selector.pick_table(&memory_table()), TableSelection::Excluded);
    }

    #[test]
    fn single_schema_except_memory_tables_and_routines_excludes_both() {
        let selector = SingleSchemaExceptMemoryTablesAndRoutines::new("sys");
        assert_eq!(selector.pick_table(&memory_table()), TableSelection::Excluded);

        let routine = Routine { name: "r".to_string(), schema_name: "sys".to_string(), definition: String::new() };
        assert!(!selector.pick_routine(&routine));
    }

    #[test]
    fn memory_tables_only_includes_only_memory_tables() {
        let selector = MemoryTablesOnly;
        assert_eq!(selector.pick_table(&memory_table()), TableSelection::Included);

        let mut durable = memory_table();
        durable.is_memory_resident = false;
        assert_eq!(selector.pick_table(&durable), TableSelection::Excluded);
    }

    #[test]
    fn memory_tables_only_picks_system_routines() {
        let selector = MemoryTablesOnly;
        let routine = Routine {
            name: "r".to_string(),
            schema_name: "sqlj".to_string(),
            definition: String::new(),
        };
        assert!(selector.pick_routine(&routine));

        let user_routine = Routine { schema_name: "app".to_string(), ..routine };
        assert!(!selector.pick_routine(&user_routine));
    }

    #[test]
    fn memory_tables_only_picks_system_jars_but_not_user_jars() {
        let selector = MemoryTablesOnly;
        let jar = Jar { name: "j".to_string(), schema_name: "sys".to_string() };
        assert!(selector.pick_jar(&jar));

        let user_jar = Jar { schema_name: "app".to_string(), ..jar };
        assert!(!selector.pick_jar(&user_jar));
    }
}
