mod logging;

use std::sync::Arc;

use log::info;
use schema_manager::catalog::{Column, Table};
use schema_manager::kv::memory::MemoryKv;
use schema_manager::{ManagerConfig, SchemaManager, Session};

fn main() {
    let _guards = logging::init_logging(".", "info").unwrap_or_default();

    println!("Hello, schema manager!");

    run().unwrap();

    println!("Bye~");
}

fn run() -> schema_manager::CResult<()> {
    let manager = SchemaManager::new(MemoryKv::new(), ManagerConfig::default());
    manager.start()?;
    info!("bootstrapped at generation {}", manager.get_oldest_active_ais_generation()?);

    let session = Arc::new(Session::new(1));

    manager.save_ais_change(&session, |ais| {
        ais.add_table(Table {
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
        });
        Ok(())
    })?;
    info!("created app.users");

    manager.save_ais_change(&session, |ais| {
        ais.add_table(Table {
            id: 2,
            name: "orders".to_string(),
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
        });
        Ok(())
    })?;
    info!("created app.orders");

    let snapshot = manager.run_in_transaction(|txn| manager.unsaved_ais_change(&session, txn, |_ais| Ok(())))?;
    assert_eq!(snapshot.ais().get_schema("app").unwrap().tables.len(), 2);

    manager.stop();
    Ok(())
}
