//! The KV gateway: a thin adapter over the ordered key-value store that
//! backs the catalog. The store itself is an external collaborator
//! referenced only by the interface it exposes — this module defines that
//! interface (`KvGateway`/`Transaction`) and, for tests and the `demos`
//! binary, one small in-memory implementation ([`memory::MemoryKv`]).

pub mod keys;
pub mod memory;

use crate::error::CResult;

/// Invoked exactly once per transaction, after commit or abort, with the
/// store's logical commit timestamp (or `0` on abort). Mirrors the KV
/// store's `addCallback(session, END, fn)`.
pub type EndCallback = Box<dyn FnOnce(u64) + Send>;

/// A single KV transaction. Every exit path — an explicit commit, a
/// conflict that asks the caller to retry, or the transaction simply being
/// dropped on an early `?` — fires any registered [`EndCallback`] exactly
/// once, so a caller can rely on commit-or-abort cleanup running regardless
/// of how the transaction ends.
pub trait Transaction {
    fn get(&mut self, key: &[u8]) -> CResult<Option<Vec<u8>>>;

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> CResult<()>;

    fn clear(&mut self, key: &[u8]) -> CResult<()>;

    /// All live key/value pairs whose key starts with `prefix`, in key
    /// order. Every caller in this crate drains it fully to rebuild a
    /// catalog, so it is materialized eagerly here rather than threading a
    /// borrowed iterator through the trait.
    fn range_starts_with(&mut self, prefix: &[u8]) -> CResult<Vec<(Vec<u8>, Vec<u8>)>>;

    fn add_end_of_transaction_callback(&mut self, callback: EndCallback);
}

/// An ordered key-value store supporting optimistic transactions.
pub trait KvGateway: Send + Sync {
    type Txn: Transaction;

    fn begin_transaction(&self) -> CResult<Self::Txn>;

    /// Attempts to commit `txn`. `Ok(true)` means the transaction
    /// conflicted with a concurrent commit and the caller must rerun its
    /// body from scratch on a fresh transaction; `Ok(false)` means it
    /// committed.
    fn commit_or_retry(&self, txn: Self::Txn) -> CResult<bool>;

    /// Runs `body` inside a `begin` / `commit_or_retry` loop, rebuilding
    /// `body`'s effects from scratch on every retry.
    fn run_in_transaction<F, R>(&self, mut body: F) -> CResult<R>
    where
        F: FnMut(&mut Self::Txn) -> CResult<R>,
    {
        loop {
            let mut txn = self.begin_transaction()?;
            let result = body(&mut txn)?;
            if self.commit_or_retry(txn)? {
                continue;
            }
            return Ok(result);
        }
    }
}
