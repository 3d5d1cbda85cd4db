// ==========================================
// 罐区资产台账系统 - 数据库 Schema 初始化
// ==========================================
// 职责: 幂等建表（CREATE TABLE IF NOT EXISTS）+ 版本戳
// 红线: 引用表的自然键以 name_key 归一列 + UNIQUE 索引落地,
//       不依赖调用方大小写一致
// ==========================================

use crate::db::CURRENT_SCHEMA_VERSION;
use crate::repository::error::RepositoryResult;
use rusqlite::Connection;

/// 初始化全部表结构（幂等,可重复调用）
pub fn init_schema(conn: &Connection) -> RepositoryResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ===== 引用主数据 =====

        CREATE TABLE IF NOT EXISTS companies (
            company_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            logo TEXT,
            industry TEXT,
            location_id TEXT,
            established_date TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS locations (
            location_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL,
            address TEXT,
            city TEXT,
            state TEXT,
            zip_code TEXT,
            country TEXT,
            latitude REAL,
            longitude REAL,
            created_at TEXT NOT NULL,
            UNIQUE (name_key)
        );

        CREATE TABLE IF NOT EXISTS asset_types (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL,
            description TEXT,
            code TEXT,
            UNIQUE (name_key)
        );

        CREATE TABLE IF NOT EXISTS materials (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL,
            description TEXT,
            UNIQUE (name_key)
        );

        CREATE TABLE IF NOT EXISTS contents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL,
            description TEXT,
            UNIQUE (name_key)
        );

        CREATE TABLE IF NOT EXISTS event_types (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL,
            description TEXT,
            UNIQUE (name_key)
        );

        -- ===== 厂区与资产 =====
        -- 外键删除语义由 fk_policy 模块在仓储边界执行,
        -- 表定义不声明 ON DELETE 行为（策略显式化红线）

        CREATE TABLE IF NOT EXISTS farms (
            farm_id TEXT PRIMARY KEY,
            company_id TEXT,
            location_id INTEGER,
            name TEXT NOT NULL,
            description TEXT,
            status TEXT NOT NULL,
            operational_since TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS assets (
            asset_id TEXT PRIMARY KEY,
            company_id TEXT,
            location_id INTEGER,
            farm_id TEXT,
            name TEXT NOT NULL,
            asset_type_id INTEGER,
            description TEXT,
            status TEXT NOT NULL,
            installation_date TEXT,
            manufactured_date TEXT,
            commission_date TEXT,
            decommission_date TEXT,
            latitude REAL,
            longitude REAL,
            health INTEGER NOT NULL CHECK (health BETWEEN 0 AND 100),
            capacity REAL,
            current_volume REAL,
            diameter REAL,
            height REAL,
            model_id TEXT,
            material_id INTEGER,
            content_id INTEGER,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_assets_farm_id ON assets (farm_id);
        CREATE INDEX IF NOT EXISTS idx_assets_location_id ON assets (location_id);
        CREATE INDEX IF NOT EXISTS idx_farms_location_id ON farms (location_id);

        CREATE TABLE IF NOT EXISTS asset_events (
            event_id TEXT PRIMARY KEY,
            asset_id TEXT NOT NULL,
            title TEXT NOT NULL,
            event_type_id INTEGER,
            start_date TEXT,
            end_date TEXT,
            event_status TEXT,
            description TEXT,
            performed_by TEXT,
            cost TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_asset_events_asset_id ON asset_events (asset_id);

        -- ===== 批次审计 =====

        CREATE TABLE IF NOT EXISTS import_batches (
            batch_id TEXT PRIMARY KEY,
            source_kind TEXT NOT NULL,
            source_name TEXT NOT NULL,
            target TEXT NOT NULL,
            total_rows INTEGER NOT NULL,
            created_rows INTEGER NOT NULL,
            updated_rows INTEGER NOT NULL,
            skipped_rows INTEGER NOT NULL,
            failed_rows INTEGER NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT NOT NULL,
            elapsed_ms INTEGER NOT NULL
        );
        "#,
    )?;

    // 版本戳（幂等）
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}
