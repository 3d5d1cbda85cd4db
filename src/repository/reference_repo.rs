// ==========================================
// 罐区资产台账系统 - 引用主数据仓储
// ==========================================
// 职责: 公司/位置/资产类型/材质/介质/事件类型的
//       自然键查找、插入、策略化删除
// 红线: 不含业务逻辑;查找命中时绝不回写存量属性
//       （引用数据首写优先）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::reference::{location_natural_key, natural_key, Location};
use crate::domain::Company;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::fk_policy::apply_on_delete_tx;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::sync::{Arc, Mutex};

// ==========================================
// ReferenceRepository
// ==========================================
pub struct ReferenceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReferenceRepository {
    /// 创建新的仓储实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 事务内查找（对账引擎的逐行事务复用）
    // ==========================================

    /// 按业务键查找公司
    pub fn find_company_tx(tx: &Transaction, company_id: &str) -> RepositoryResult<Option<String>> {
        let found = tx
            .query_row(
                "SELECT company_id FROM companies WHERE company_id = ?1",
                params![company_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(found)
    }

    /// 插入公司（首见惰性创建）
    pub fn insert_company_tx(tx: &Transaction, company: &Company) -> RepositoryResult<()> {
        tx.execute(
            r#"
            INSERT INTO companies (company_id, name, logo, industry, location_id, established_date, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                company.company_id,
                company.name,
                company.logo,
                company.industry,
                company.location_id,
                company.established_date.map(|d| d.format("%Y-%m-%d").to_string()),
                company.created_at,
            ],
        )?;
        Ok(())
    }

    /// 按复合自然键（city+name 归一）查找位置
    pub fn find_location_tx(
        tx: &Transaction,
        city: &str,
        name: &str,
    ) -> RepositoryResult<Option<i64>> {
        let key = location_natural_key(city, name);
        let found = tx
            .query_row(
                "SELECT location_id FROM locations WHERE name_key = ?1",
                params![key],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found)
    }

    /// 插入位置,返回自增 id
    pub fn insert_location_tx(tx: &Transaction, location: &Location) -> RepositoryResult<i64> {
        let key = location_natural_key(
            location.city.as_deref().unwrap_or(""),
            &location.name,
        );
        tx.execute(
            r#"
            INSERT INTO locations (name, name_key, address, city, state, zip_code, country,
                                   latitude, longitude, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                location.name,
                key,
                location.address,
                location.city,
                location.state,
                location.zip_code,
                location.country,
                location.latitude,
                location.longitude,
                location.created_at,
            ],
        )?;
        Ok(tx.last_insert_rowid())
    }

    /// 按归一名称查找单名引用行（materials/contents/asset_types/event_types 通用）
    fn find_named_tx(tx: &Transaction, table: &str, name: &str) -> RepositoryResult<Option<i64>> {
        let sql = format!("SELECT id FROM {} WHERE name_key = ?1", table);
        let found = tx
            .query_row(&sql, params![natural_key(name)], |row| row.get::<_, i64>(0))
            .optional()?;
        Ok(found)
    }

    /// 插入单名引用行,返回自增 id（展示名保留首写者原样大小写）
    fn insert_named_tx(
        tx: &Transaction,
        table: &str,
        name: &str,
        description: Option<&str>,
    ) -> RepositoryResult<i64> {
        let sql = format!(
            "INSERT INTO {} (name, name_key, description) VALUES (?1, ?2, ?3)",
            table
        );
        tx.execute(&sql, params![name.trim(), natural_key(name), description])?;
        Ok(tx.last_insert_rowid())
    }

    pub fn find_material_tx(tx: &Transaction, name: &str) -> RepositoryResult<Option<i64>> {
        Self::find_named_tx(tx, "materials", name)
    }

    pub fn insert_material_tx(
        tx: &Transaction,
        name: &str,
        description: Option<&str>,
    ) -> RepositoryResult<i64> {
        Self::insert_named_tx(tx, "materials", name, description)
    }

    pub fn find_content_tx(tx: &Transaction, name: &str) -> RepositoryResult<Option<i64>> {
        Self::find_named_tx(tx, "contents", name)
    }

    pub fn insert_content_tx(
        tx: &Transaction,
        name: &str,
        description: Option<&str>,
    ) -> RepositoryResult<i64> {
        Self::insert_named_tx(tx, "contents", name, description)
    }

    pub fn find_asset_type_tx(tx: &Transaction, name: &str) -> RepositoryResult<Option<i64>> {
        Self::find_named_tx(tx, "asset_types", name)
    }

    pub fn insert_asset_type_tx(
        tx: &Transaction,
        name: &str,
        description: Option<&str>,
    ) -> RepositoryResult<i64> {
        Self::insert_named_tx(tx, "asset_types", name, description)
    }

    pub fn find_event_type_tx(tx: &Transaction, name: &str) -> RepositoryResult<Option<i64>> {
        Self::find_named_tx(tx, "event_types", name)
    }

    pub fn insert_event_type_tx(
        tx: &Transaction,
        name: &str,
        description: Option<&str>,
    ) -> RepositoryResult<i64> {
        Self::insert_named_tx(tx, "event_types", name, description)
    }

    // ==========================================
    // 实例级操作（删除/查询,自管事务）
    // ==========================================

    /// 读取位置（测试与运维查询）
    pub fn get_location(&self, location_id: i64) -> RepositoryResult<Option<Location>> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                r#"
                SELECT location_id, name, address, city, state, zip_code, country,
                       latitude, longitude, created_at
                FROM locations WHERE location_id = ?1
                "#,
                params![location_id],
                |row| {
                    Ok(Location {
                        location_id: row.get(0)?,
                        name: row.get(1)?,
                        address: row.get(2)?,
                        city: row.get(3)?,
                        state: row.get(4)?,
                        zip_code: row.get(5)?,
                        country: row.get(6)?,
                        latitude: row.get(7)?,
                        longitude: row.get(8)?,
                        created_at: row.get(9)?,
                    })
                },
            )
            .optional()?;
        Ok(found)
    }

    /// 删除公司（孤儿保留: farms/assets 的 company_id 清空）
    pub fn delete_company(&self, company_id: &str) -> RepositoryResult<bool> {
        self.delete_parent_row("companies", "company_id", &company_id)
    }

    /// 删除位置（孤儿保留: farms/assets 的 location_id 清空）
    pub fn delete_location(&self, location_id: i64) -> RepositoryResult<bool> {
        self.delete_parent_row("locations", "location_id", &location_id)
    }

    /// 删除材质（assets.material_id 清空）
    pub fn delete_material(&self, id: i64) -> RepositoryResult<bool> {
        self.delete_parent_row("materials", "id", &id)
    }

    /// 删除介质（assets.content_id 清空）
    pub fn delete_content(&self, id: i64) -> RepositoryResult<bool> {
        self.delete_parent_row("contents", "id", &id)
    }

    /// 删除资产类型（assets.asset_type_id 清空）
    pub fn delete_asset_type(&self, id: i64) -> RepositoryResult<bool> {
        self.delete_parent_row("asset_types", "id", &id)
    }

    /// 删除事件类型（asset_events.event_type_id 清空）
    pub fn delete_event_type(&self, id: i64) -> RepositoryResult<bool> {
        self.delete_parent_row("event_types", "id", &id)
    }

    /// 策略化删除父行: 子关系处理与父行删除同事务
    fn delete_parent_row(
        &self,
        table: &str,
        pk_column: &str,
        id: &dyn rusqlite::ToSql,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        apply_on_delete_tx(&tx, table, id)?;

        let sql = format!("DELETE FROM {} WHERE {} = ?1", table, pk_column);
        let deleted = tx.execute(&sql, [id])?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(deleted > 0)
    }

    /// 统计表行数（幂等性测试用）
    pub fn count(&self, table: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
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

    #[test]
    fn test_named_reference_first_write_wins() {
        let conn = setup();
        let guard = conn.lock().unwrap();
        let tx = guard.unchecked_transaction().unwrap();

        let id1 =
            ReferenceRepository::insert_content_tx(&tx, "Crude Oil", Some("light sweet")).unwrap();
        // 大小写/空白变体命中同一行
        let id2 = ReferenceRepository::find_content_tx(&tx, " crude  oil ").unwrap();
        assert_eq!(id2, Some(id1));
        tx.commit().unwrap();
    }

    #[test]
    fn test_location_composite_key() {
        let conn = setup();
        let guard = conn.lock().unwrap();
        let tx = guard.unchecked_transaction().unwrap();

        let loc = Location {
            location_id: 0,
            name: "Maasvlakte Terminal".to_string(),
            address: None,
            city: Some("Rotterdam".to_string()),
            state: None,
            zip_code: None,
            country: Some("NL".to_string()),
            latitude: Some(51.95),
            longitude: Some(4.02),
            created_at: Utc::now(),
        };
        let id = ReferenceRepository::insert_location_tx(&tx, &loc).unwrap();

        // 同名不同城市是另一条位置
        assert_eq!(
            ReferenceRepository::find_location_tx(&tx, "Rotterdam", "Maasvlakte Terminal").unwrap(),
            Some(id)
        );
        assert_eq!(
            ReferenceRepository::find_location_tx(&tx, "Antwerp", "Maasvlakte Terminal").unwrap(),
            None
        );
        tx.commit().unwrap();
    }
}
