// ==========================================
// 罐区资产台账系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询
// 存储: config_kv 表 (key-value)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::asset::{HEALTH_MAX, HEALTH_MIN};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 写入配置值（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_default_asset_status(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default(config_keys::DEFAULT_ASSET_STATUS, "active")
    }

    async fn get_default_farm_status(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default(config_keys::DEFAULT_FARM_STATUS, "active")
    }

    async fn get_health_bounds(&self) -> Result<(i64, i64), Box<dyn Error>> {
        let min_raw = self.get_config_or_default(config_keys::HEALTH_MIN, "0")?;
        let max_raw = self.get_config_or_default(config_keys::HEALTH_MAX, "100")?;

        let min = min_raw.parse::<i64>().unwrap_or(HEALTH_MIN);
        let max = max_raw.parse::<i64>().unwrap_or(HEALTH_MAX);

        // 配置非法时回退到内置区间
        if min > max || min < HEALTH_MIN || max > HEALTH_MAX {
            Ok((HEALTH_MIN, HEALTH_MAX))
        } else {
            Ok((min, max))
        }
    }

    async fn get_legacy_batch_size(&self) -> Result<i64, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::LEGACY_BATCH_SIZE, "500")?;
        let size = value.parse::<i64>().unwrap_or(500);
        Ok(if size < 1 { 500 } else { size })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 默认状态
    pub const DEFAULT_ASSET_STATUS: &str = "default_asset_status";
    pub const DEFAULT_FARM_STATUS: &str = "default_farm_status";

    // 健康度区间
    pub const HEALTH_MIN: &str = "health_min";
    pub const HEALTH_MAX: &str = "health_max";

    // 旧库迁移
    pub const LEGACY_BATCH_SIZE: &str = "legacy_batch_size";
}
