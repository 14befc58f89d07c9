//! The catalog codec: packs/unpacks the catalog graph to and
//! from a stream of per-schema byte blobs. `save` applies a [`Selector`]
//! and encodes one schema; [`CatalogBuilder`] accumulates decoded blobs,
//! fed in any order, and finalizes them into a draft [`Ais`].
//!
//! Encoding is `bincode` over `serde`-derived catalog types. Blobs are
//! opaque KV values rather than a concatenated stream, so unlike a
//! length-prefixed wire frame there is no inner framing to manage here.

pub mod buffer;
pub mod selector;

use std::collections::BTreeMap;

use crate::catalog::{Ais, Schema};
use crate::codec::buffer::GrowableBuffer;
use crate::codec::selector::{Selector, TableSelection};
use crate::error::{CResult, Error};

/// Serializes `schema`, restricted by `selector`, into its per-schema blob.
/// Returns `None` if `selector` excludes this schema entirely — callers
/// should `clear` rather than `set` the schema's KV key in that case.
pub fn save(schema: &Schema, selector: &dyn Selector, cap: usize) -> CResult<Option<Vec<u8>>> {
    if !selector.pick_schema(&schema.name) {
        return Ok(None);
    }

    let mut filtered = Schema::new(&schema.name);
    for table in schema.tables.values() {
        match selector.pick_table(table) {
            TableSelection::Included => {
                filtered.tables.insert(table.name.clone(), table.clone());
            }
            TableSelection::Rewritten(rewritten) => {
                filtered.tables.insert(rewritten.name.clone(), rewritten);
            }
            TableSelection::Excluded => {}
        }
    }
    for sequence in schema.sequences.values() {
        if selector.pick_sequence(sequence) {
            filtered.sequences.insert(sequence.name.clone(), sequence.clone());
        }
    }
    for routine in schema.routines.values() {
        if selector.pick_routine(routine) {
            filtered.routines.insert(routine.name.clone(), routine.clone());
        }
    }
    for jar in schema.jars.values() {
        if selector.pick_jar(jar) {
            filtered.jars.insert(jar.name.clone(), jar.clone());
        }
    }

    let encoded = bincode::serialize(&filtered).map_err(|e| Error::Codec(e.to_string()))?;
    let mut buffer = GrowableBuffer::new(cap);
    buffer.write(&encoded)?;
    Ok(Some(buffer.into_vec()))
}

/// Accumulates decoded per-schema blobs into a draft catalog graph.
/// Blobs may be fed in any order; `finalize` is the hook where
/// cross-schema references would be resolved once every blob has been
/// fed (this catalog model has none today, so it is a pass-through).
#[derive(Default)]
pub struct CatalogBuilder {
    schemas: BTreeMap<String, Schema>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        CatalogBuilder::default()
    }

    /// Decodes `bytes` as a schema blob and accumulates it. `expected_name`
    /// is the schema name recovered from the blob's KV key; it must match
    /// the name encoded inside the blob itself, or the store is corrupt.
    pub fn feed(&mut self, expected_name: &str, bytes: &[u8]) -> CResult<()> {
        let schema: Schema = bincode::deserialize(bytes).map_err(|e| Error::Codec(e.to_string()))?;
        if schema.name != expected_name {
            return Err(Error::InternalInvariant(format!(
                "blob key names schema '{expected_name}' but decodes to '{}'",
                schema.name
            )));
        }
        self.schemas.insert(schema.name.clone(), schema);
        Ok(())
    }

    pub fn finalize(self) -> Ais {
        Ais { schemas: self.schemas }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, Routine, Table};
    use crate::codec::selector::SingleSchema;

    fn app_schema() -> Schema {
        let mut schema = Schema::new("app");
        schema.tables.insert(
            "users".to_string(),
            Table {
                id: 1,
                name: "users".to_string(),
                schema_name: "app".to_string(),
                columns: vec![Column {
                    name: "id".to_string(),
                    type_name: "int".to_string(),
                    nullable: false,
                    position: 0,
                }],
                indexes: vec![],
                constraints: vec![],
                version: 1,
                is_memory_resident: false,
            },
        );
        schema.routines.insert(
            "r1".to_string(),
            Routine { name: "r1".to_string(), schema_name: "app".to_string(), definition: "x".to_string() },
        );
        schema
    }

    #[test]
    fn save_then_feed_round_trips_a_schema() {
        let schema = app_schema();
        let selector = SingleSchema::new("app");
        let bytes = save(&schema, &selector, 0).unwrap().expect("schema is selected");

        let mut builder = CatalogBuilder::new();
        builder.feed("app", &bytes).unwrap();
        let ais = builder.finalize();

        assert_eq!(ais.get_schema("app"), Some(&schema));
    }

    #[test]
    fn save_returns_none_when_selector_excludes_the_schema() {
        let schema = app_schema();
        let selector = SingleSchema::new("other");
        assert_eq!(save(&schema, &selector, 0).unwrap(), None);
    }

    #[test]
    fn blobs_can_be_fed_in_any_order() {
        let a = {
            let mut s = Schema::new("a");
            s.tables.insert(
                "t".to_string(),
                Table {
                    id: 1,
                    name: "t".to_string(),
                    schema_name: "a".to_string(),
                    columns: vec![Column {
                        name: "id".to_string(),
                        type_name: "int".to_string(),
                        nullable: false,
                        position: 0,
                    }],
                    indexes: vec![],
                    constraints: vec![],
                    version: 1,
                    is_memory_resident: false,
                },
            );
            s
        };
        let b = Schema::new("b");

        let selector = selector::SingleSchema::new("a");
        let a_bytes = save(&a, &selector, 0).unwrap().unwrap();
        let selector_b = selector::SingleSchema::new("b");
        let b_bytes = save(&b, &selector_b, 0).unwrap().unwrap();

        let mut forward = CatalogBuilder::new();
        forward.feed("a", &a_bytes).unwrap();
        forward.feed("b", &b_bytes).unwrap();

        let mut backward = CatalogBuilder::new();
        backward.feed("b", &b_bytes).unwrap();
        backward.feed("a", &a_bytes).unwrap();

        assert_eq!(forward.finalize(), backward.finalize());
    }

    #[test]
    fn overflow_cap_is_reported_with_the_cap_value() {
        let schema = app_schema();
        let selector = SingleSchema::new("app");
        let err = save(&schema, &selector, 4).unwrap_err();
        assert_eq!(err, Error::CatalogTooLarge { cap: 4 });
    }
}
