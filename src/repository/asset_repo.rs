// ==========================================
// 罐区资产台账系统 - 资产仓储
// ==========================================
// 职责: assets 表按业务键的读写与逐字段更新,
//       asset_events 表的只追加写入
// 红线: 不含对账决策逻辑,只做数据 CRUD
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::asset::{Asset, AssetEvent};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::fk_policy::apply_on_delete_tx;
use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex};

// ==========================================
// AssetRepository
// ==========================================
pub struct AssetRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AssetRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    const SELECT_COLUMNS: &'static str = "asset_id, company_id, location_id, farm_id, name, \
         asset_type_id, description, status, installation_date, manufactured_date, \
         commission_date, decommission_date, latitude, longitude, health, capacity, \
         current_volume, diameter, height, model_id, material_id, content_id, created_at";

    fn row_to_asset(row: &Row) -> rusqlite::Result<Asset> {
        Ok(Asset {
            asset_id: row.get(0)?,
            company_id: row.get(1)?,
            location_id: row.get(2)?,
            farm_id: row.get(3)?,
            name: row.get(4)?,
            asset_type_id: row.get(5)?,
            description: row.get(6)?,
            status: row.get(7)?,
            installation_date: row.get(8)?,
            manufactured_date: row.get(9)?,
            commission_date: row.get(10)?,
            decommission_date: row.get(11)?,
            latitude: row.get(12)?,
            longitude: row.get(13)?,
            health: row.get(14)?,
            capacity: row.get(15)?,
            current_volume: row.get(16)?,
            diameter: row.get(17)?,
            height: row.get(18)?,
            model_id: row.get(19)?,
            material_id: row.get(20)?,
            content_id: row.get(21)?,
            created_at: row.get(22)?,
        })
    }

    // ==========================================
    // 事务内操作（逐行对账事务复用）
    // ==========================================

    /// 按业务键读取资产
    pub fn get_by_id_tx(tx: &Transaction, asset_id: &str) -> RepositoryResult<Option<Asset>> {
        let sql = format!("SELECT {} FROM assets WHERE asset_id = ?1", Self::SELECT_COLUMNS);
        let found = tx
            .query_row(&sql, params![asset_id], Self::row_to_asset)
            .optional()?;
        Ok(found)
    }

    /// 业务键存在性探测（厂区/资产类别错配判定用）
    pub fn exists_tx(tx: &Transaction, asset_id: &str) -> RepositoryResult<bool> {
        let found = tx
            .query_row(
                "SELECT 1 FROM assets WHERE asset_id = ?1",
                params![asset_id],
                |_row| Ok(true),
            )
            .optional()?;
        Ok(found.unwrap_or(false))
    }

    /// 插入新资产
    pub fn insert_tx(tx: &Transaction, asset: &Asset) -> RepositoryResult<()> {
        tx.execute(
            r#"
            INSERT INTO assets (
                asset_id, company_id, location_id, farm_id, name, asset_type_id,
                description, status, installation_date, manufactured_date,
                commission_date, decommission_date, latitude, longitude, health,
                capacity, current_volume, diameter, height, model_id,
                material_id, content_id, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23
            )
            "#,
            params![
                asset.asset_id,
                asset.company_id,
                asset.location_id,
                asset.farm_id,
                asset.name,
                asset.asset_type_id,
                asset.description,
                asset.status,
                asset.installation_date,
                asset.manufactured_date,
                asset.commission_date,
                asset.decommission_date,
                asset.latitude,
                asset.longitude,
                asset.health,
                asset.capacity,
                asset.current_volume,
                asset.diameter,
                asset.height,
                asset.model_id,
                asset.material_id,
                asset.content_id,
                asset.created_at,
            ],
        )?;
        Ok(())
    }

    /// 逐字段覆盖更新: 只触碰提供的列,其余保持存量值
    ///
    /// 注意: health 不在更新路径重算,只有来源记录显式提供时才出现在 columns 中
    pub fn update_columns_tx(
        tx: &Transaction,
        asset_id: &str,
        columns: Vec<(&'static str, Box<dyn ToSql>)>,
    ) -> RepositoryResult<()> {
        if columns.is_empty() {
            return Ok(());
        }

        let sets: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, (name, _))| format!("{} = ?{}", name, i + 1))
            .collect();
        let sql = format!(
            "UPDATE assets SET {} WHERE asset_id = ?{}",
            sets.join(", "),
            columns.len() + 1
        );

        let mut values: Vec<&dyn ToSql> = columns.iter().map(|(_, v)| v.as_ref()).collect();
        values.push(&asset_id);
        tx.execute(&sql, params_from_iter(values))?;
        Ok(())
    }

    /// 追加资产事件（INSERT OR IGNORE: 重复 event_id 不覆盖,保证重入幂等）
    ///
    /// # 返回
    /// - true: 本次写入了新事件
    /// - false: event_id 已存在,跳过
    pub fn append_event_tx(tx: &Transaction, event: &AssetEvent) -> RepositoryResult<bool> {
        let inserted = tx.execute(
            r#"
            INSERT OR IGNORE INTO asset_events (
                event_id, asset_id, title, event_type_id, start_date, end_date,
                event_status, description, performed_by, cost, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                event.event_id,
                event.asset_id,
                event.title,
                event.event_type_id,
                event.start_date,
                event.end_date,
                event.event_status,
                event.description,
                event.performed_by,
                event.cost,
                event.created_at,
            ],
        )?;
        Ok(inserted > 0)
    }

    /// 清空全部资产行与其事件（clear-existing 专用,由调用方事务包裹）
    pub fn delete_all_tx(tx: &Transaction) -> RepositoryResult<usize> {
        // 资产->事件为级联策略,先清子表
        tx.execute("DELETE FROM asset_events", [])?;
        let deleted = tx.execute("DELETE FROM assets", [])?;
        Ok(deleted)
    }

    // ==========================================
    // 实例级操作
    // ==========================================

    /// 读取资产
    pub fn get_by_id(&self, asset_id: &str) -> RepositoryResult<Option<Asset>> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        let asset = Self::get_by_id_tx(&tx, asset_id)?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(asset)
    }

    /// 删除资产（级联删除其事件,其余无影响）
    pub fn delete(&self, asset_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        apply_on_delete_tx(&tx, "assets", &asset_id)?;
        let deleted = tx.execute("DELETE FROM assets WHERE asset_id = ?1", params![asset_id])?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(deleted > 0)
    }

    /// 资产总数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM assets", [], |row| row.get(0))?;
        Ok(count)
    }

    /// 某资产的事件数
    pub fn count_events(&self, asset_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM asset_events WHERE asset_id = ?1",
            params![asset_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
