//! Chooses which [`Selector`] persists a given schema. System
//! schemas get a narrower selector than user schemas; this is the one
//! place that policy is decided, kept separate from the codec itself so
//! the codec stays selector-agnostic.

use crate::codec::selector::{
    Selector, SingleSchema, SingleSchemaExceptMemoryTables, SingleSchemaExceptMemoryTablesAndRoutines,
    SYSTEM_SCHEMAS,
};

/// `sys`/`sqlj` carry only system-provided routines, never user DDL, so
/// persisting them drops routines in addition to memory-resident tables.
/// `security` keeps its routines.
const ROUTINE_FREE_SCHEMAS: &[&str] = &["sys", "sqlj"];

pub fn selector_for_schema(schema_name: &str) -> Box<dyn Selector> {
    if ROUTINE_FREE_SCHEMAS.contains(&schema_name) {
        Box::new(SingleSchemaExceptMemoryTablesAndRoutines::new(schema_name))
    } else if SYSTEM_SCHEMAS.contains(&schema_name) {
        Box::new(SingleSchemaExceptMemoryTables::new(schema_name))
    } else {
        Box::new(SingleSchema::new(schema_name))
    }
}
