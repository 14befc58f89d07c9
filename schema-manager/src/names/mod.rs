//! Name generator and table-version map: collision-free id
//! and tree-name allocation, plus a per-table monotonic version counter
//! downstream caches use for cheap invalidation checks.
//!
//! `NameGenerator` is a thin, `Mutex`-guarded facade over
//! [`DefaultGenerator`], wrapping a non-thread-safe allocator the same way
//! an `Arc<Mutex<E>>` wraps a non-thread-safe storage engine. Callers
//! must not hold the lock across KV I/O — every method here
//! takes the lock, does pure in-memory bookkeeping, and releases it before
//! returning.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::catalog::Ais;
use crate::error::{CResult, Error};

/// The non-thread-safe allocator `NameGenerator` wraps. Exists as its own
/// type so the allocation logic can be unit-tested without a lock in the
/// way.
#[derive(Default)]
struct DefaultGenerator {
    next_table_id: i64,
    used_table_ids: HashSet<i64>,
    used_tree_names: HashSet<String>,
    used_constraint_names: HashSet<String>,
    used_sequence_names: HashSet<String>,
}

impl DefaultGenerator {
    fn new() -> Self {
        DefaultGenerator { next_table_id: 1, ..Default::default() }
    }

    fn next_table_id(&mut self) -> i64 {
        loop {
            let candidate = self.next_table_id;
            self.next_table_id += 1;
            if self.used_table_ids.insert(candidate) {
                return candidate;
            }
        }
    }

    fn tree_name(&mut self, schema: &str, table: &str, index: &str) -> String {
        let base = format!("{schema}.{table}.{index}");
        self.dedupe(&base, |n| self.used_tree_names.contains(n))
    }

    fn constraint_name(&mut self, schema: &str, table: &str, constraint: &str) -> String {
        let base = format!("{schema}.{table}.{constraint}");
        self.dedupe(&base, |n| self.used_constraint_names.contains(n))
    }

    fn sequence_name(&mut self, schema: &str, sequence: &str) -> String {
        let base = format!("{schema}.{sequence}");
        self.dedupe(&base, |n| self.used_sequence_names.contains(n))
    }

    /// Appends a numeric suffix until `base` (or `base$n`) is unused, then
    /// marks the winner as used. `contains` is checked against whichever
    /// `used_*` set the caller is allocating from.
    fn dedupe(&mut self, base: &str, contains: impl Fn(&str) -> bool) -> String {
        let mut candidate = base.to_string();
        let mut suffix = 0u64;
        while contains(&candidate) {
            suffix += 1;
            candidate = format!("{base}${suffix}");
        }
        candidate
    }

    fn mark_tree_name_used(&mut self, name: String) {
        self.used_tree_names.insert(name);
    }

    fn mark_constraint_name_used(&mut self, name: String) {
        self.used_constraint_names.insert(name);
    }

    fn mark_sequence_name_used(&mut self, name: String) {
        self.used_sequence_names.insert(name);
    }

    /// Marks every identifier present in `ais` as used, so subsequent
    /// allocations never reissue one already present in a loaded or
    /// merged snapshot.
    fn merge_ais(&mut self, ais: &Ais) {
        for schema in ais.schemas.values() {
            for table in schema.tables.values() {
                self.used_table_ids.insert(table.id);
                if table.id >= self.next_table_id {
                    self.next_table_id = table.id + 1;
                }
                for index in &table.indexes {
                    self.used_tree_names.insert(index.tree_name.clone());
                }
                for constraint in &table.constraints {
                    self.used_constraint_names.insert(constraint.name.clone());
                }
            }
            for sequence in schema.sequences.values() {
                self.used_sequence_names.insert(sequence.name.clone());
            }
        }
    }
}

/// Thread-safe facade over [`DefaultGenerator`]. A single coarse lock
/// guards every method; name generator operations never
/// touch the KV store, so the lock is never held across I/O.
#[derive(Default)]
pub struct NameGenerator {
    inner: Mutex<DefaultGenerator>,
}

impl NameGenerator {
    pub fn new() -> Self {
        NameGenerator { inner: Mutex::new(DefaultGenerator::new()) }
    }

    fn lock(&self) -> CResult<std::sync::MutexGuard<'_, DefaultGenerator>> {
        self.inner.lock().map_err(|_| Error::InternalInvariant("name generator lock poisoned".into()))
    }

    pub fn next_table_id(&self) -> CResult<i64> {
        Ok(self.lock()?.next_table_id())
    }

    pub fn tree_name(&self, schema: &str, table: &str, index: &str) -> CResult<String> {
        let mut guard = self.lock()?;
        let name = guard.tree_name(schema, table, index);
        guard.mark_tree_name_used(name.clone());
        Ok(name)
    }

    pub fn constraint_name(&self, schema: &str, table: &str, constraint: &str) -> CResult<String> {
        let mut guard = self.lock()?;
        let name = guard.constraint_name(schema, table, constraint);
        guard.mark_constraint_name_used(name.clone());
        Ok(name)
    }

    pub fn sequence_name(&self, schema: &str, sequence: &str) -> CResult<String> {
        let mut guard = self.lock()?;
        let name = guard.sequence_name(schema, sequence);
        guard.mark_sequence_name_used(name.clone());
        Ok(name)
    }

    pub fn merge_ais(&self, ais: &Ais) -> CResult<()> {
        self.lock()?.merge_ais(ais);
        Ok(())
    }
}

/// `tableId -> version`, monotonic per key, bracketed by an exclusive
/// claim so a batch of updates during one DDL is applied atomically with
/// respect to other claimants.
#[derive(Default)]
pub struct TableVersionMap {
    inner: Mutex<std::collections::HashMap<i64, i64>>,
}

/// RAII guard returned by [`TableVersionMap::claim_exclusive`]. Dropping
/// it releases the claim even if the claimant panics or returns early.
pub struct ExclusiveClaim<'a> {
    map: &'a TableVersionMap,
}

impl TableVersionMap {
    pub fn new() -> Self {
        TableVersionMap::default()
    }

    pub fn claim_exclusive(&self) -> ExclusiveClaim<'_> {
        ExclusiveClaim { map: self }
    }

    pub fn get(&self, table_id: i64) -> Option<i64> {
        self.inner.lock().expect("table version map lock poisoned").get(&table_id).copied()
    }
}

impl ExclusiveClaim<'_> {
    /// Only applies `version` if it is strictly greater than the current
    /// value for `table_id`.
    pub fn put(&mut self, table_id: i64, version: i64) {
        let mut guard = self.map.inner.lock().expect("table version map lock poisoned");
        let current = guard.get(&table_id).copied().unwrap_or(i64::MIN);
        if version > current {
            guard.insert(table_id, version);
        }
    }
}
