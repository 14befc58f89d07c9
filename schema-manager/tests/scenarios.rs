//! End-to-end scenarios, placed under `tests/` to keep integration
//! coverage out of `src/` entirely.
//! Each test here mirrors one of the testable properties: bootstrap on an
//! empty store, create-then-read, drop-clears-blob, concurrent
//! conflicting DDL, an oversize catalog rejection, and an interrupted
//! read.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

use schema_manager::catalog::{Ais, Column, Table};
use schema_manager::error::Error;
use schema_manager::kv::memory::MemoryKv;
use schema_manager::kv::{keys, EndCallback, KvGateway, Transaction};
use schema_manager::{ManagerConfig, SchemaManager, Session};

fn table_with_columns(name: &str, column_names: &[&str]) -> Table {
    Table {
        id: 1,
        name: name.to_string(),
        schema_name: "app".to_string(),
        columns: column_names
            .iter()
            .enumerate()
            .map(|(position, col_name)| Column {
                name: col_name.to_string(),
                type_name: "int".to_string(),
                nullable: false,
                position,
            })
            .collect(),
        indexes: vec![],
        constraints: vec![],
        version: 1,
        is_memory_resident: false,
    }
}

// S1 — bootstrap empty store.
#[test]
fn bootstrap_on_an_empty_store_reaches_generation_zero() {
    let manager = SchemaManager::new(MemoryKv::new(), ManagerConfig::default());
    manager.start().unwrap();

    assert_eq!(manager.get_oldest_active_ais_generation().unwrap(), 0);
}

// S2 — create then read.
#[test]
fn create_then_read_is_visible_to_a_new_session() {
    let kv = MemoryKv::new();
    let manager = SchemaManager::new(kv.clone(), ManagerConfig::default());
    manager.start().unwrap();

    let writer = Arc::new(Session::new(1));
    manager
        .save_ais_change(&writer, |ais| {
            ais.add_table(table_with_columns("users", &["id"]));
            Ok(())
        })
        .unwrap();

    kv.run_in_transaction(|txn| {
        let generation = keys::decode_generation(&txn.get(&keys::generation_key("sm/"))?.unwrap())?;
        assert_eq!(generation, 1);
        let blob = txn.get(&keys::schema_blob_key("sm/", "app"))?;
        assert!(blob.is_some_and(|b| !b.is_empty()));
        Ok(())
    })
    .unwrap();

    let reader = Arc::new(Session::new(2));
    let snapshot = manager.run_in_transaction(|txn| manager.get_ais(&reader, txn)).unwrap();
    assert!(snapshot.ais().get_schema("app").unwrap().get_user_table("users").is_some());
}

// S3 — drop schema clears blob.
#[test]
fn dropping_a_schema_clears_its_blob() {
    let kv = MemoryKv::new();
    let manager = SchemaManager::new(kv.clone(), ManagerConfig::default());
    manager.start().unwrap();

    let session = Arc::new(Session::new(1));
    manager
        .save_ais_change(&session, |ais| {
            ais.add_table(table_with_columns("users", &["id"]));
            Ok(())
        })
        .unwrap();

    let snapshot = manager
        .save_ais_change(&session, |ais: &mut Ais| {
            ais.drop_schema("app");
            Ok(())
        })
        .unwrap();
    assert_eq!(snapshot.generation(), 2);

    kv.run_in_transaction(|txn| {
        assert!(txn.get(&keys::schema_blob_key("sm/", "app"))?.is_none());
        Ok(())
    })
    .unwrap();
}

// S4 — concurrent conflicting DDL retries.
#[test]
fn concurrent_conflicting_ddl_forces_a_retry_and_preserves_both_columns() {
    let kv = MemoryKv::new();
    let manager = Arc::new(SchemaManager::new(kv, ManagerConfig::default()));
    manager.start().unwrap();

    let bootstrap_session = Arc::new(Session::new(1));
    let base_generation = manager
        .save_ais_change(&bootstrap_session, |ais| {
            ais.add_table(table_with_columns("t", &["id"]));
            Ok(())
        })
        .unwrap()
        .generation();

    let (tx_a_ready, rx_a_ready) = mpsc::channel::<()>();
    let (tx_b_done, rx_b_done) = mpsc::channel::<()>();
    let a_has_synced = Arc::new(AtomicBool::new(false));

    let manager_a = manager.clone();
    let handle_a = std::thread::spawn(move || {
        let session = Arc::new(Session::new(2));
        manager_a
            .save_ais_change(&session, move |ais| {
                let schema = ais.get_or_create_schema("app");
                schema.tables.get_mut("t").unwrap().columns.push(Column {
                    name: "a".to_string(),
                    type_name: "int".to_string(),
                    nullable: true,
                    position: 1,
                });
                if !a_has_synced.swap(true, Ordering::SeqCst) {
                    tx_a_ready.send(()).unwrap();
                    rx_b_done.recv().unwrap();
                }
                Ok(())
            })
            .unwrap()
    });

    rx_a_ready.recv().unwrap();

    let manager_b = manager.clone();
    let session_b = Arc::new(Session::new(3));
    let snapshot_b = manager_b
        .save_ais_change(&session_b, |ais| {
            let schema = ais.get_or_create_schema("app");
            schema.tables.get_mut("t").unwrap().columns.push(Column {
                name: "b".to_string(),
                type_name: "int".to_string(),
                nullable: true,
                position: 2,
            });
            Ok(())
        })
        .unwrap();
    assert_eq!(snapshot_b.generation(), base_generation + 1);
    tx_b_done.send(()).unwrap();

    let snapshot_a = handle_a.join().unwrap();
    assert_eq!(snapshot_a.generation(), base_generation + 2);

    let table = snapshot_a.ais().get_schema("app").unwrap().get_user_table("t").unwrap();
    let column_names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    assert!(column_names.contains(&"a"));
    assert!(column_names.contains(&"b"));
}

// S5 — oversize catalog rejected.
#[test]
fn oversize_catalog_is_rejected_and_leaves_no_trace() {
    let kv = MemoryKv::new();
    let manager = SchemaManager::new(kv.clone(), ManagerConfig::default().with_blob_cap_bytes(1024));
    manager.start().unwrap();

    let session = Arc::new(Session::new(1));
    let many_columns: Vec<String> = (0..500).map(|i| format!("col_{i}")).collect();
    let column_refs: Vec<&str> = many_columns.iter().map(String::as_str).collect();

    let err = manager
        .save_ais_change(&session, move |ais| {
            ais.add_table(table_with_columns("wide", &column_refs));
            Ok(())
        })
        .unwrap_err();
    assert_eq!(err, Error::CatalogTooLarge { cap: 1024 });

    kv.run_in_transaction(|txn| {
        assert!(txn.get(&keys::generation_key("sm/"))?.is_none());
        assert!(txn.get(&keys::schema_blob_key("sm/", "app"))?.is_none());
        Ok(())
    })
    .unwrap();
    assert_eq!(manager.get_oldest_active_ais_generation().unwrap(), 0);
}

// S6 — interrupted read leaves curAIS unchanged and surfaces QueryCanceled.
struct FlakyKv {
    inner: MemoryKv,
    fail_next_scan: Arc<AtomicBool>,
}

struct FlakyTxn {
    inner: <MemoryKv as KvGateway>::Txn,
    fail_next_scan: Arc<AtomicBool>,
}

impl Transaction for FlakyTxn {
    fn get(&mut self, key: &[u8]) -> schema_manager::CResult<Option<Vec<u8>>> {
        self.inner.get(key)
    }
    fn set(&mut self, key: &[u8], value: Vec<u8>) -> schema_manager::CResult<()> {
        self.inner.set(key, value)
    }
    fn clear(&mut self, key: &[u8]) -> schema_manager::CResult<()> {
        self.inner.clear(key)
    }
    fn range_starts_with(&mut self, prefix: &[u8]) -> schema_manager::CResult<Vec<(Vec<u8>, Vec<u8>)>> {
        if self.fail_next_scan.swap(false, Ordering::SeqCst) {
            return Err(Error::Interrupted);
        }
        self.inner.range_starts_with(prefix)
    }
    fn add_end_of_transaction_callback(&mut self, callback: EndCallback) {
        self.inner.add_end_of_transaction_callback(callback)
    }
}

impl KvGateway for FlakyKv {
    type Txn = FlakyTxn;

    fn begin_transaction(&self) -> schema_manager::CResult<Self::Txn> {
        Ok(FlakyTxn { inner: self.inner.begin_transaction()?, fail_next_scan: self.fail_next_scan.clone() })
    }

    fn commit_or_retry(&self, txn: Self::Txn) -> schema_manager::CResult<bool> {
        self.inner.commit_or_retry(txn.inner)
    }
}

#[test]
fn an_interrupted_reload_surfaces_query_canceled_and_leaves_cur_ais_untouched() {
    let inner = MemoryKv::new();
    let fail_next_scan = Arc::new(AtomicBool::new(false));
    let flaky = FlakyKv { inner: inner.clone(), fail_next_scan: fail_next_scan.clone() };

    let manager = SchemaManager::new(flaky, ManagerConfig::default());
    manager.start().unwrap();
    assert_eq!(manager.get_oldest_active_ais_generation().unwrap(), 0);

    // Something else bumps the store's generation without going through
    // this manager, so the next `get_ais` sees a stale `curAIS` and must
    // reload.
    inner
        .run_in_transaction(|txn| txn.set(&keys::generation_key("sm/"), keys::encode_generation(1)))
        .unwrap();

    fail_next_scan.store(true, Ordering::SeqCst);

    let session = Arc::new(Session::new(1));
    let err = manager.run_in_transaction(|txn| manager.get_ais(&session, txn)).unwrap_err();
    assert_eq!(err, Error::QueryCanceled);
    assert_eq!(manager.get_oldest_active_ais_generation().unwrap(), 0);
}
