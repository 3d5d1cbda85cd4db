// ==========================================
// 导入管线集成测试
// ==========================================
// 覆盖: 幂等重导入、坏行隔离、清空语义、
//       自然键归一、确定性健康度、遗留库迁移
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

use asset_warehouse::config::{ConfigManager, ImportConfigReader};
use asset_warehouse::domain::import::{ImportOptions, ImportTarget};
use asset_warehouse::importer::reconciler::HealthSource;
use asset_warehouse::importer::{AssetImporter, ImportDriver, ImportError};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use test_helpers::{create_legacy_fixture, create_test_db, write_csv_fixture};

const ASSET_HEADER: &str = "asset_id,company_id,farm_id,name,asset_type,description,\
installation_date,status,health,capacity,material,content,location_name,location_city";

struct FixedHealth(i64);

impl HealthSource for FixedHealth {
    fn draw(&mut self, _min: i64, _max: i64) -> i64 {
        self.0
    }
}

fn make_driver(conn: Arc<Mutex<Connection>>) -> ImportDriver {
    let config: Arc<dyn ImportConfigReader> =
        Arc::new(ConfigManager::from_connection(conn.clone()).unwrap());
    ImportDriver::new(conn, config).with_health_factory(Box::new(|| Box::new(FixedHealth(77))))
}

fn count(conn: &Arc<Mutex<Connection>>, table: &str) -> i64 {
    let guard = conn.lock().unwrap();
    guard
        .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })
        .unwrap()
}

#[tokio::test]
async fn test_csv_import_then_reimport_is_idempotent() {
    let (_db, conn) = create_test_db().unwrap();
    let driver = make_driver(conn.clone());

    let csv = write_csv_fixture(&[
        ASSET_HEADER,
        "A-001,COMP-1,F-001,Tank 101,Storage Tank,main tank,2024-01-20,active,87,5000,Carbon Steel,Crude Oil,North Terminal,Houston",
        "A-002,COMP-1,F-001,Tank 102,Storage Tank,,01/15/2023,active,,3000,Carbon Steel,Diesel,North Terminal,Houston",
    ])
    .unwrap();

    let first = driver
        .import_csv(csv.path(), ImportTarget::Assets, ImportOptions::default())
        .await
        .unwrap();
    assert_eq!(first.created, 2);
    assert_eq!(first.failed, 0);

    let second = driver
        .import_csv(csv.path(), ImportTarget::Assets, ImportOptions::default())
        .await
        .unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 2);

    // 无重复业务键,引用数据不膨胀
    assert_eq!(count(&conn, "assets"), 2);
    assert_eq!(count(&conn, "companies"), 1);
    assert_eq!(count(&conn, "farms"), 1);
    assert_eq!(count(&conn, "materials"), 1);
    assert_eq!(count(&conn, "locations"), 1);
    assert_eq!(count(&conn, "contents"), 2);
}

#[tokio::test]
async fn test_bad_row_does_not_abort_run() {
    let (_db, conn) = create_test_db().unwrap();
    let driver = make_driver(conn.clone());

    // 10 行,其中 1 行 capacity 为垃圾值
    let mut lines = vec![ASSET_HEADER.to_string()];
    for i in 1..=10 {
        let capacity = if i == 5 { "lots" } else { "1000" };
        lines.push(format!(
            "A-{:03},COMP-1,,Tank {},,,,active,,{},,,,",
            i, i, capacity
        ));
    }
    let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
    let csv = write_csv_fixture(&refs).unwrap();

    let summary = driver
        .import_csv(csv.path(), ImportTarget::Assets, ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.total_rows, 10);
    assert_eq!(summary.created, 9);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].identifier, "A-005");
    assert_eq!(count(&conn, "assets"), 9);
}

#[tokio::test]
async fn test_reference_names_fold_to_one_row() {
    let (_db, conn) = create_test_db().unwrap();
    let driver = make_driver(conn.clone());

    let csv = write_csv_fixture(&[
        ASSET_HEADER,
        "A-001,COMP-1,,Tank 101,,,,active,,,Crude Oil,,,",
        "A-002,COMP-1,,Tank 102,,,,active,,,  crude  oil ,,,",
        "A-003,COMP-1,,Tank 103,,,,active,,,CRUDE OIL,,,",
    ])
    .unwrap();

    driver
        .import_csv(csv.path(), ImportTarget::Assets, ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(count(&conn, "materials"), 1);
    // 展示名保留首写者
    let guard = conn.lock().unwrap();
    let name: String = guard
        .query_row("SELECT name FROM materials", [], |row| row.get(0))
        .unwrap();
    assert_eq!(name, "Crude Oil");
}

#[tokio::test]
async fn test_failed_row_leaves_no_dangling_reference() {
    let (_db, conn) = create_test_db().unwrap();
    let driver = make_driver(conn.clone());

    // 行 1 缺 company_id,创建失败整行回滚;行 2 引用同一材质
    let csv = write_csv_fixture(&[
        ASSET_HEADER,
        "A-001,,,Tank 101,,,,active,,,Crude Oil,,,",
        "A-002,COMP-1,,Tank 102,,,,active,,,Crude Oil,,,",
    ])
    .unwrap();

    let summary = driver
        .import_csv(csv.path(), ImportTarget::Assets, ImportOptions::default())
        .await
        .unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.created, 1);

    // 行 2 的 material_id 必须指向真实存在的材质行
    assert_eq!(count(&conn, "materials"), 1);
    let guard = conn.lock().unwrap();
    let material: String = guard
        .query_row(
            "SELECT m.name FROM assets a JOIN materials m ON m.id = a.material_id \
             WHERE a.asset_id = 'A-002'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(material, "Crude Oil");
}

#[tokio::test]
async fn test_injected_health_source_is_deterministic() {
    let (_db, conn) = create_test_db().unwrap();
    let driver = make_driver(conn.clone());

    let csv = write_csv_fixture(&[
        ASSET_HEADER,
        // health 列为空 → 从注入来源抽取
        "A-001,COMP-1,,Tank 101,,,,active,,,,,,",
    ])
    .unwrap();

    driver
        .import_csv(csv.path(), ImportTarget::Assets, ImportOptions::default())
        .await
        .unwrap();

    let guard = conn.lock().unwrap();
    let health: i64 = guard
        .query_row(
            "SELECT health FROM assets WHERE asset_id = 'A-001'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(health, 77);
}

#[tokio::test]
async fn test_clear_existing_wipes_farms_assets_keeps_references() {
    let (_db, conn) = create_test_db().unwrap();
    let driver = make_driver(conn.clone());

    let seed = write_csv_fixture(&[
        ASSET_HEADER,
        "A-OLD,COMP-1,F-OLD,Old Tank,Storage Tank,,,active,50,,Carbon Steel,,North Terminal,Houston",
    ])
    .unwrap();
    driver
        .import_csv(seed.path(), ImportTarget::Assets, ImportOptions::default())
        .await
        .unwrap();

    let fresh = write_csv_fixture(&[
        ASSET_HEADER,
        "A-NEW,COMP-1,,New Tank,,,,active,60,,,,,",
    ])
    .unwrap();
    driver
        .import_csv(
            fresh.path(),
            ImportTarget::Assets,
            ImportOptions {
                clear_existing: true,
            },
        )
        .await
        .unwrap();

    // 厂区/资产被清空后重建,引用主数据保留
    assert_eq!(count(&conn, "assets"), 1);
    assert_eq!(count(&conn, "farms"), 0);
    assert_eq!(count(&conn, "companies"), 1);
    assert_eq!(count(&conn, "materials"), 1);
    assert_eq!(count(&conn, "locations"), 1);

    let guard = conn.lock().unwrap();
    let remaining: String = guard
        .query_row("SELECT asset_id FROM assets", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, "A-NEW");
}

#[tokio::test]
async fn test_unreachable_source_leaves_store_untouched_even_with_clear() {
    let (_db, conn) = create_test_db().unwrap();
    let driver = make_driver(conn.clone());

    let seed = write_csv_fixture(&[
        ASSET_HEADER,
        "A-001,COMP-1,,Tank 101,,,,active,,,,,,",
    ])
    .unwrap();
    driver
        .import_csv(seed.path(), ImportTarget::Assets, ImportOptions::default())
        .await
        .unwrap();

    // 来源不可达: 即使要求清空,存量必须原样保留
    let result = driver
        .import_csv(
            Path::new("no_such_file.csv"),
            ImportTarget::Assets,
            ImportOptions {
                clear_existing: true,
            },
        )
        .await;
    assert!(matches!(result, Err(ImportError::SourceNotFound(_))));
    assert_eq!(count(&conn, "assets"), 1);
}

#[tokio::test]
async fn test_farm_then_asset_csv_round() {
    let (_db, conn) = create_test_db().unwrap();
    let driver = make_driver(conn.clone());

    let farms = write_csv_fixture(&[
        "farm_id,company_id,name,status,operational_since,location_name,location_city",
        "F-001,COMP-1,North Farm,active,2020-06-01,North Terminal,Houston",
    ])
    .unwrap();
    let summary = driver
        .import_csv(farms.path(), ImportTarget::Farms, ImportOptions::default())
        .await
        .unwrap();
    assert_eq!(summary.created, 1);

    let assets = write_csv_fixture(&[
        ASSET_HEADER,
        "A-001,COMP-1,F-001,Tank 101,,,,active,,,,,,",
    ])
    .unwrap();
    driver
        .import_csv(assets.path(), ImportTarget::Assets, ImportOptions::default())
        .await
        .unwrap();

    // 资产挂到已导入的厂区,未生成存根
    assert_eq!(count(&conn, "farms"), 1);
    let guard = conn.lock().unwrap();
    let farm_name: String = guard
        .query_row("SELECT name FROM farms WHERE farm_id = 'F-001'", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(farm_name, "North Farm");
}

#[tokio::test]
async fn test_audit_batch_row_written() {
    let (_db, conn) = create_test_db().unwrap();
    let driver = make_driver(conn.clone());

    let csv = write_csv_fixture(&[
        ASSET_HEADER,
        "A-001,COMP-1,,Tank 101,,,,active,,,,,,",
    ])
    .unwrap();
    driver
        .import_csv(csv.path(), ImportTarget::Assets, ImportOptions::default())
        .await
        .unwrap();

    let guard = conn.lock().unwrap();
    let (target, total, created): (String, i64, i64) = guard
        .query_row(
            "SELECT target, total_rows, created_rows FROM import_batches",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(target, "assets");
    assert_eq!(total, 1);
    assert_eq!(created, 1);
}

#[tokio::test]
async fn test_legacy_migration_end_to_end() {
    let (_db, conn) = create_test_db().unwrap();
    let driver = make_driver(conn.clone());
    let legacy = create_legacy_fixture().unwrap();

    let summary = driver
        .migrate_legacy(legacy.path(), ImportOptions::default())
        .await
        .unwrap();

    // 1 厂区 + 2 资产 + 1 事件
    assert_eq!(summary.total_rows, 4);
    assert_eq!(summary.created, 4);
    assert_eq!(summary.failed, 0);

    assert_eq!(count(&conn, "farms"), 1);
    assert_eq!(count(&conn, "assets"), 2);
    assert_eq!(count(&conn, "asset_events"), 1);
    // 引用数据按名称重建
    assert_eq!(count(&conn, "materials"), 1);
    assert_eq!(count(&conn, "contents"), 1);
    assert_eq!(count(&conn, "event_types"), 1);

    let guard = conn.lock().unwrap();
    // 遗留资产的引用名被解析回 id
    let material_name: String = guard
        .query_row(
            r#"
            SELECT m.name FROM assets a
            JOIN materials m ON m.id = a.material_id
            WHERE a.asset_id = 'A-LEG-1'
            "#,
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(material_name, "Carbon Steel");

    // health 缺失 → 注入来源填充
    let health: i64 = guard
        .query_row(
            "SELECT health FROM assets WHERE asset_id = 'A-LEG-2'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(health, 77);
    drop(guard);

    // 重复迁移幂等: 资产更新,事件不重复
    let second = driver
        .migrate_legacy(legacy.path(), ImportOptions::default())
        .await
        .unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 3);
    assert_eq!(second.skipped, 1);
    assert_eq!(count(&conn, "asset_events"), 1);
}
