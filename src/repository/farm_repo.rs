// ==========================================
// 罐区资产台账系统 - 厂区仓储
// ==========================================
// 职责: farms 表按业务键的读写与逐字段更新
// 红线: 不含对账决策逻辑,只做数据 CRUD
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::asset::Farm;
use crate::domain::types::FarmStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::fk_policy::apply_on_delete_tx;
use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex};

// ==========================================
// FarmRepository
// ==========================================
pub struct FarmRepository {
    conn: Arc<Mutex<Connection>>,
}

impl FarmRepository {
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

    fn row_to_farm(row: &Row) -> rusqlite::Result<Farm> {
        let status_raw: String = row.get(5)?;
        Ok(Farm {
            farm_id: row.get(0)?,
            company_id: row.get(1)?,
            location_id: row.get(2)?,
            name: row.get(3)?,
            description: row.get(4)?,
            // 存量库中的异常状态文本按 active 兜底读出,不在读路径报错
            status: FarmStatus::parse(&status_raw).unwrap_or(FarmStatus::Active),
            operational_since: row
                .get::<_, Option<String>>(6)?
                .and_then(|s| chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            created_at: row.get(7)?,
        })
    }

    const SELECT_COLUMNS: &'static str =
        "farm_id, company_id, location_id, name, description, status, operational_since, created_at";

    // ==========================================
    // 事务内操作（逐行对账事务复用）
    // ==========================================

    /// 按业务键读取厂区
    pub fn get_by_id_tx(tx: &Transaction, farm_id: &str) -> RepositoryResult<Option<Farm>> {
        let sql = format!("SELECT {} FROM farms WHERE farm_id = ?1", Self::SELECT_COLUMNS);
        let found = tx
            .query_row(&sql, params![farm_id], Self::row_to_farm)
            .optional()?;
        Ok(found)
    }

    /// 业务键存在性探测（资产/厂区类别错配判定用）
    pub fn exists_tx(tx: &Transaction, farm_id: &str) -> RepositoryResult<bool> {
        let found = tx
            .query_row(
                "SELECT 1 FROM farms WHERE farm_id = ?1",
                params![farm_id],
                |_row| Ok(true),
            )
            .optional()?;
        Ok(found.unwrap_or(false))
    }

    /// 插入新厂区
    pub fn insert_tx(tx: &Transaction, farm: &Farm) -> RepositoryResult<()> {
        tx.execute(
            r#"
            INSERT INTO farms (farm_id, company_id, location_id, name, description,
                               status, operational_since, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                farm.farm_id,
                farm.company_id,
                farm.location_id,
                farm.name,
                farm.description,
                farm.status.as_str(),
                farm.operational_since.map(|d| d.format("%Y-%m-%d").to_string()),
                farm.created_at,
            ],
        )?;
        Ok(())
    }

    /// 逐字段覆盖更新: 只触碰提供的列,其余保持存量值
    ///
    /// # 参数
    /// - columns: (列名, 新值) 列表;列名来自代码内常量,非外部输入
    pub fn update_columns_tx(
        tx: &Transaction,
        farm_id: &str,
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
            "UPDATE farms SET {} WHERE farm_id = ?{}",
            sets.join(", "),
            columns.len() + 1
        );

        let mut values: Vec<&dyn ToSql> = columns.iter().map(|(_, v)| v.as_ref()).collect();
        values.push(&farm_id);
        tx.execute(&sql, params_from_iter(values))?;
        Ok(())
    }

    /// 清空全部厂区行（clear-existing 专用,由调用方事务包裹）
    pub fn delete_all_tx(tx: &Transaction) -> RepositoryResult<usize> {
        let deleted = tx.execute("DELETE FROM farms", [])?;
        Ok(deleted)
    }

    // ==========================================
    // 实例级操作
    // ==========================================

    /// 读取厂区
    pub fn get_by_id(&self, farm_id: &str) -> RepositoryResult<Option<Farm>> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        let farm = Self::get_by_id_tx(&tx, farm_id)?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(farm)
    }

    /// 删除厂区（孤儿保留: 依赖资产的 farm_id 清空,资产不删除）
    pub fn delete(&self, farm_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        apply_on_delete_tx(&tx, "farms", &farm_id)?;
        let deleted = tx.execute("DELETE FROM farms WHERE farm_id = ?1", params![farm_id])?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(deleted > 0)
    }

    /// 厂区总数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM farms", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::schema::init_schema;
    use chrono::Utc;

    fn setup() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn sample_farm(farm_id: &str) -> Farm {
        Farm {
            farm_id: farm_id.to_string(),
            company_id: Some("COMP-1".to_string()),
            location_id: None,
            name: "North Tank Farm".to_string(),
            description: None,
            status: FarmStatus::Active,
            operational_since: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_and_get_roundtrip() {
        let conn = setup();
        let repo = FarmRepository::from_connection(conn.clone());
        {
            let guard = conn.lock().unwrap();
            let tx = guard.unchecked_transaction().unwrap();
            FarmRepository::insert_tx(&tx, &sample_farm("F-001")).unwrap();
            tx.commit().unwrap();
        }

        let farm = repo.get_by_id("F-001").unwrap().unwrap();
        assert_eq!(farm.name, "North Tank Farm");
        assert_eq!(farm.status, FarmStatus::Active);
        assert!(repo.get_by_id("F-404").unwrap().is_none());
    }

    #[test]
    fn test_update_columns_partial() {
        let conn = setup();
        let repo = FarmRepository::from_connection(conn.clone());
        {
            let guard = conn.lock().unwrap();
            let tx = guard.unchecked_transaction().unwrap();
            FarmRepository::insert_tx(&tx, &sample_farm("F-001")).unwrap();
            FarmRepository::update_columns_tx(
                &tx,
                "F-001",
                vec![("status", Box::new("inactive".to_string()))],
            )
            .unwrap();
            tx.commit().unwrap();
        }

        let farm = repo.get_by_id("F-001").unwrap().unwrap();
        assert_eq!(farm.status, FarmStatus::Inactive);
        // 其余字段未触碰
        assert_eq!(farm.name, "North Tank Farm");
    }
}
