//! An in-memory [`KvGateway`] used by tests and the `demos` binary.
//!
//! A `BTreeMap`-backed store with an optimistic-concurrency commit path:
//! rather than full per-key MVCC versioning, which the real KV store this
//! gateway stands in for would own internally, this engine uses one coarse
//! commit counter. A transaction may commit only if nobody else has
//! committed since it began; otherwise `commit_or_retry` reports a conflict
//! and the caller reruns its body from scratch, which is exactly the
//! behavior the schema manager's DDL loop depends on.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::error::{CResult, Error};
use crate::kv::{EndCallback, KvGateway, Transaction};

struct Inner {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    commit_version: u64,
}

#[derive(Clone)]
pub struct MemoryKv {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        MemoryKv { inner: Arc::new(Mutex::new(Inner { data: BTreeMap::new(), commit_version: 0 })) }
    }
}

impl Default for MemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MemoryTxn {
    store: Arc<Mutex<Inner>>,
    begin_version: u64,
    /// Buffered writes, applied atomically on commit. `None` marks a clear.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    callbacks: Vec<EndCallback>,
    fired: bool,
}

impl MemoryTxn {
    fn fire(&mut self, timestamp: u64) {
        if self.fired {
            return;
        }
        self.fired = true;
        for callback in self.callbacks.drain(..) {
            callback(timestamp);
        }
    }
}

impl Drop for MemoryTxn {
    fn drop(&mut self) {
        // Any exit path that didn't go through `commit_or_retry` (an early
        // `?` out of the caller's body) is an abort.
        self.fire(0);
    }
}

impl Transaction for MemoryTxn {
    fn get(&mut self, key: &[u8]) -> CResult<Option<Vec<u8>>> {
        if let Some(buffered) = self.writes.get(key) {
            return Ok(buffered.clone());
        }
        let guard = self.store.lock().map_err(|_| Error::Kv("memory store poisoned".into()))?;
        Ok(guard.data.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> CResult<()> {
        self.writes.insert(key.to_vec(), Some(value));
        Ok(())
    }

    fn clear(&mut self, key: &[u8]) -> CResult<()> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn range_starts_with(&mut self, prefix: &[u8]) -> CResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let guard = self.store.lock().map_err(|_| Error::Kv("memory store poisoned".into()))?;
        let mut merged: BTreeMap<Vec<u8>, Option<Vec<u8>>> = guard
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), Some(v.clone())))
            .collect();
        drop(guard);

        for (k, v) in &self.writes {
            if k.starts_with(prefix) {
                merged.insert(k.clone(), v.clone());
            }
        }

        Ok(merged.into_iter().filter_map(|(k, v)| v.map(|v| (k, v))).collect())
    }

    fn add_end_of_transaction_callback(&mut self, callback: EndCallback) {
        self.callbacks.push(callback);
    }
}

impl KvGateway for MemoryKv {
    type Txn = MemoryTxn;

    fn begin_transaction(&self) -> CResult<Self::Txn> {
        let guard = self.inner.lock().map_err(|_| Error::Kv("memory store poisoned".into()))?;
        Ok(MemoryTxn {
            store: self.inner.clone(),
            begin_version: guard.commit_version,
            writes: BTreeMap::new(),
            callbacks: Vec::new(),
            fired: false,
        })
    }

    fn commit_or_retry(&self, mut txn: Self::Txn) -> CResult<bool> {
        let mut guard = self.inner.lock().map_err(|_| Error::Kv("memory store poisoned".into()))?;
        if guard.commit_version != txn.begin_version {
            drop(guard);
            txn.fire(0);
            return Ok(true);
        }

        for (key, value) in txn.writes.drain() {
            match value {
                Some(v) => {
                    guard.data.insert(key, v);
                }
                None => {
                    guard.data.remove(&key);
                }
            }
        }
        guard.commit_version += 1;
        let timestamp = guard.commit_version;
        drop(guard);

        txn.fire(timestamp);
        Ok(false)
    }
}
