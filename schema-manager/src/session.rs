//! A session is the narrow "one keyed value" abstraction the schema
//! manager needs from whatever owns the surrounding query execution: an
//! identity, and a slot to cache the `Snapshot` attached to it for the
//! life of the current transaction.

use std::sync::Mutex;

use crate::catalog::snapshot::Snapshot;

pub struct Session {
    id: u64,
    attached: Mutex<Option<Snapshot>>,
}

impl Session {
    pub fn new(id: u64) -> Self {
        Session { id, attached: Mutex::new(None) }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The snapshot cached for this session's current transaction, if
    /// `get_ais` has already been called once since the last time it was
    /// cleared.
    pub fn attached_snapshot(&self) -> Option<Snapshot> {
        self.attached.lock().expect("session lock poisoned").clone()
    }

    pub fn attach_snapshot(&self, snapshot: Snapshot) {
        *self.attached.lock().expect("session lock poisoned") = Some(snapshot);
    }

    /// Called from the transaction's end-of-transaction callback: a
    /// session's cached snapshot is only valid for the transaction that
    /// installed it.
    pub fn clear_snapshot(&self) {
        *self.attached.lock().expect("session lock poisoned") = None;
    }
}
