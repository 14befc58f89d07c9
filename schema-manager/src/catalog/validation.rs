//! `LIVE_AIS_VALIDATIONS`: post-change consistency
//! checks run against a candidate catalog before its generation is bumped
//! and anything is written to the KV store. Deliberately narrow — DDL
//! syntax/semantics are out of scope; this only catches a
//! candidate graph that is internally inconsistent.

use std::collections::HashSet;

use crate::catalog::Ais;
use crate::error::{CResult, Error};

pub fn validate(ais: &Ais) -> CResult<()> {
    for (schema_key, schema) in &ais.schemas {
        if schema_key != &schema.name {
            return Err(Error::ValidationFailure(format!(
                "schema stored under key '{schema_key}' has mismatched name '{}'",
                schema.name
            )));
        }

        for (table_key, table) in &schema.tables {
            if table_key != &table.name {
                return Err(Error::ValidationFailure(format!(
                    "table stored under key '{table_key}' has mismatched name '{}'",
                    table.name
                )));
            }
            if table.schema_name != schema.name {
                return Err(Error::ValidationFailure(format!(
                    "table '{}' claims schema '{}' but lives under '{}'",
                    table.name, table.schema_name, schema.name
                )));
            }
            if table.columns.is_empty() {
                return Err(Error::ValidationFailure(format!(
                    "table '{}.{}' has no columns",
                    schema.name, table.name
                )));
            }

            let mut seen_columns = HashSet::new();
            for column in &table.columns {
                if !seen_columns.insert(column.name.as_str()) {
                    return Err(Error::ValidationFailure(format!(
                        "table '{}.{}' has duplicate column '{}'",
                        schema.name, table.name, column.name
                    )));
                }
            }

            let mut primary_keys = 0;
            for index in &table.indexes {
                if index.is_primary {
                    primary_keys += 1;
                }
                for column in &index.columns {
                    if !table.columns.iter().any(|c| &c.name == column) {
                        return Err(Error::ValidationFailure(format!(
                            "index '{}' on '{}.{}' references unknown column '{}'",
                            index.tree_name, schema.name, table.name, column
                        )));
                    }
                }
            }
            if primary_keys > 1 {
                return Err(Error::ValidationFailure(format!(
                    "table '{}.{}' has more than one primary key index",
                    schema.name, table.name
                )));
            }
        }
    }

    Ok(())
}
