// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、CSV/遗留库夹具生成
// ==========================================

use asset_warehouse::repository::init_schema;
use rusqlite::Connection;
use std::error::Error;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - Arc<Mutex<Connection>>: 打开的连接
pub fn create_test_db() -> Result<(NamedTempFile, Arc<Mutex<Connection>>), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let conn = asset_warehouse::db::open_sqlite_connection(
        temp_file.path().to_str().ok_or("路径非 UTF-8")?,
    )?;
    init_schema(&conn)?;
    Ok((temp_file, Arc::new(Mutex::new(conn))))
}

/// 写一个 CSV 夹具文件（扩展名 .csv）
pub fn write_csv_fixture(lines: &[&str]) -> Result<NamedTempFile, Box<dyn Error>> {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile()?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    Ok(file)
}

/// 构建一个小型遗留库夹具（镜像旧系统的表结构）
pub fn create_legacy_fixture() -> Result<NamedTempFile, Box<dyn Error>> {
    let file = NamedTempFile::new()?;
    let conn = Connection::open(file.path())?;
    conn.execute_batch(
        r#"
        CREATE TABLE companies (
            company_id TEXT PRIMARY KEY, name TEXT, logo TEXT, industry TEXT,
            location_id TEXT, established_date TEXT, created_at TEXT
        );
        CREATE TABLE locations (
            location_id INTEGER PRIMARY KEY, name TEXT, address TEXT,
            city TEXT, state TEXT, zip_code TEXT, country TEXT,
            latitude REAL, longitude REAL, created_at TEXT
        );
        CREATE TABLE asset_types (id INTEGER PRIMARY KEY, name TEXT, description TEXT, code TEXT);
        CREATE TABLE materials (id INTEGER PRIMARY KEY, name TEXT, description TEXT);
        CREATE TABLE contents (id INTEGER PRIMARY KEY, name TEXT, description TEXT);
        CREATE TABLE event_types (id INTEGER PRIMARY KEY, name TEXT, description TEXT);
        CREATE TABLE farms (
            farm_id TEXT PRIMARY KEY, company_id TEXT, location_id INTEGER,
            name TEXT, description TEXT, status TEXT,
            operational_since TEXT, created_at TEXT
        );
        CREATE TABLE assets (
            asset_id TEXT PRIMARY KEY, company_id TEXT, location_id INTEGER,
            farm_id TEXT, name TEXT, asset_type_id INTEGER, description TEXT,
            status TEXT, installation_date TEXT, manufactured_date TEXT,
            commission_date TEXT, decommission_date TEXT,
            latitude REAL, longitude REAL, capacity REAL,
            current_volume REAL, diameter REAL, height REAL, model_id TEXT,
            material_id INTEGER, content_id INTEGER, created_at TEXT
        );
        CREATE TABLE asset_events (
            event_id TEXT PRIMARY KEY, asset_id TEXT, title TEXT,
            event_type_id INTEGER, start_date TEXT, end_date TEXT,
            event_status TEXT, description TEXT, performed_by TEXT,
            cost TEXT, created_at TEXT
        );

        INSERT INTO companies (company_id, name, industry)
            VALUES ('COMP-LEGACY', 'Legacy Petro', 'Oil & Gas');
        INSERT INTO locations (location_id, name, city, country)
            VALUES (1, 'North Terminal', 'Houston', 'USA');
        INSERT INTO asset_types (id, name) VALUES (1, 'Storage Tank');
        INSERT INTO materials (id, name) VALUES (1, 'Carbon Steel');
        INSERT INTO contents (id, name) VALUES (1, 'Crude Oil');
        INSERT INTO event_types (id, name) VALUES (1, 'Inspection');

        INSERT INTO farms (farm_id, company_id, location_id, name, status)
            VALUES ('F-LEG-1', 'COMP-LEGACY', 1, 'Legacy North Farm', 'active');
        INSERT INTO assets (
            asset_id, company_id, location_id, farm_id, name, asset_type_id,
            status, capacity, material_id, content_id
        ) VALUES (
            'A-LEG-1', 'COMP-LEGACY', 1, 'F-LEG-1', 'Legacy Tank 1', 1,
            'active', 8000.0, 1, 1
        );
        INSERT INTO assets (asset_id, company_id, name, status)
            VALUES ('A-LEG-2', 'COMP-LEGACY', 'Legacy Tank 2', 'inactive');
        INSERT INTO asset_events (event_id, asset_id, title, event_type_id, event_status)
            VALUES ('EV-LEG-1', 'A-LEG-1', 'Annual inspection', 1, 'done');
        "#,
    )?;
    Ok(file)
}
