// ==========================================
// 罐区资产台账系统 - 对账引擎
// ==========================================
// 职责: 规范化记录 → 创建/更新/跳过/失败 的逐行决策
// 事务: 每条记录一个事务,覆盖引用解析 + 目标行写入;
//       行失败只回滚该行,不波及已处理行
// 红线: 更新路径只覆盖来源显式提供的字段;
//       health 创建时缺失才随机填充,更新时不重算
// ==========================================

use crate::domain::asset::{Asset, AssetEvent, Farm};
use crate::domain::import::{
    NormalizedAssetRecord, NormalizedEventRecord, NormalizedFarmRecord, RecordOutcome,
};
use crate::domain::types::FarmStatus;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::resolver::EntityResolver;
use crate::repository::asset_repo::AssetRepository;
use crate::repository::farm_repo::FarmRepository;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::types::ToSql;
use rusqlite::{Connection, Transaction};
use std::sync::{Arc, Mutex};

// ==========================================
// HealthSource - 健康度来源（可注入,测试可确定性化）
// ==========================================
pub trait HealthSource: Send {
    /// 抽取一个健康度值,区间含端点
    fn draw(&mut self, min: i64, max: i64) -> i64;
}

/// 生产实现: 独立 RNG,不依赖全局状态
pub struct RandomHealthSource {
    rng: StdRng,
}

impl RandomHealthSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// 固定种子（复现导入结果用）
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomHealthSource {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthSource for RandomHealthSource {
    fn draw(&mut self, min: i64, max: i64) -> i64 {
        self.rng.gen_range(min..=max)
    }
}

// ==========================================
// ReconcileDefaults - 对账缺省值（来自配置层）
// ==========================================
#[derive(Debug, Clone)]
pub struct ReconcileDefaults {
    pub asset_status: String,
    pub farm_status: FarmStatus,
    pub health_bounds: (i64, i64),
}

impl Default for ReconcileDefaults {
    fn default() -> Self {
        Self {
            asset_status: "active".to_string(),
            farm_status: FarmStatus::Active,
            health_bounds: (crate::domain::asset::HEALTH_MIN, crate::domain::asset::HEALTH_MAX),
        }
    }
}

// ==========================================
// ReconcileEngine
// ==========================================
pub struct ReconcileEngine {
    conn: Arc<Mutex<Connection>>,
    resolver: EntityResolver,
    defaults: ReconcileDefaults,
    health_source: Box<dyn HealthSource>,
}

impl ReconcileEngine {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        defaults: ReconcileDefaults,
        health_source: Box<dyn HealthSource>,
    ) -> Self {
        Self {
            conn,
            resolver: EntityResolver::new(),
            defaults,
            health_source,
        }
    }

    // 行事务的开启/提交失败都只失败当前行,不终止整次运行
    fn begin_tx(conn: &Connection, row: usize) -> ImportResult<Transaction<'_>> {
        conn.unchecked_transaction()
            .map_err(|e| Self::persistence_err(row, e))
    }

    fn commit_tx(tx: Transaction<'_>, row: usize) -> ImportResult<()> {
        tx.commit().map_err(|e| Self::persistence_err(row, e))
    }

    fn resolution_err(row: usize, message: impl std::fmt::Display) -> ImportError {
        ImportError::ResolutionError {
            row,
            message: message.to_string(),
        }
    }

    fn persistence_err(row: usize, message: impl std::fmt::Display) -> ImportError {
        ImportError::PersistenceError {
            row,
            message: message.to_string(),
        }
    }

    // ==========================================
    // 资产对账
    // ==========================================
    pub fn reconcile_asset(
        &mut self,
        record: &NormalizedAssetRecord,
    ) -> ImportResult<RecordOutcome> {
        let row = record.row_number;
        // 先把 Arc 克隆到局部再加锁,锁守卫不借用 self,后续仍可调用 &mut self 方法
        let conn = Arc::clone(&self.conn);
        let conn = conn
            .lock()
            .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;
        let tx = Self::begin_tx(&conn, row)?;

        // 业务键类别错配: asset_id 命中厂区表 → 整行跳过
        if FarmRepository::exists_tx(&tx, &record.asset_id)
            .map_err(|e| Self::persistence_err(row, e))?
        {
            return Ok(RecordOutcome::Skipped(format!(
                "业务键 {} 已存在于厂区表",
                record.asset_id
            )));
        }

        let existing = AssetRepository::get_by_id_tx(&tx, &record.asset_id)
            .map_err(|e| Self::persistence_err(row, e))?;

        // ===== 引用解析（惰性创建,记录未提供的引用不触碰）=====

        let company_id = match &record.company_id {
            Some(id) => {
                let (resolved, _) = self
                    .resolver
                    .resolve_company(&tx, id, record.company_name.as_deref())
                    .map_err(|e| Self::resolution_err(row, e))?;
                Some(resolved)
            }
            None => None,
        };

        let location_id = match &record.location_name {
            Some(name) => {
                let (id, _) = self
                    .resolver
                    .resolve_location(&tx, name, record.location_city.as_deref())
                    .map_err(|e| Self::resolution_err(row, e))?;
                Some(id)
            }
            None => None,
        };

        let asset_type_id = match &record.asset_type_name {
            Some(name) => Some(
                self.resolver
                    .resolve_asset_type(&tx, name)
                    .map_err(|e| Self::resolution_err(row, e))?
                    .0,
            ),
            None => None,
        };

        let material_id = match &record.material_name {
            Some(name) => Some(
                self.resolver
                    .resolve_material(&tx, name)
                    .map_err(|e| Self::resolution_err(row, e))?
                    .0,
            ),
            None => None,
        };

        let content_id = match &record.content_name {
            Some(name) => Some(
                self.resolver
                    .resolve_content(&tx, name)
                    .map_err(|e| Self::resolution_err(row, e))?
                    .0,
            ),
            None => None,
        };

        // 未知厂区 → 存根厂区惰性创建
        let farm_id = match &record.farm_id {
            Some(fid) => {
                self.ensure_farm_stub(&tx, fid, company_id.as_deref(), location_id, row)?;
                Some(fid.clone())
            }
            None => None,
        };

        let outcome = match existing {
            None => {
                // ===== 创建路径 =====
                if company_id.is_none() {
                    return Err(ImportError::MissingRequiredField {
                        row,
                        field: "company_id".to_string(),
                    });
                }
                let name = record.name.clone().ok_or_else(|| {
                    ImportError::MissingRequiredField {
                        row,
                        field: "name".to_string(),
                    }
                })?;

                let (health_min, health_max) = self.defaults.health_bounds;
                let health = record
                    .health
                    .unwrap_or_else(|| self.health_source.draw(health_min, health_max));

                let asset = Asset {
                    asset_id: record.asset_id.clone(),
                    company_id,
                    location_id,
                    farm_id,
                    name,
                    asset_type_id,
                    description: record.description.clone(),
                    status: record
                        .status
                        .clone()
                        .unwrap_or_else(|| self.defaults.asset_status.clone()),
                    installation_date: record.installation_date,
                    manufactured_date: record.manufactured_date,
                    commission_date: record.commission_date,
                    decommission_date: record.decommission_date,
                    latitude: record.latitude,
                    longitude: record.longitude,
                    health,
                    capacity: record.capacity,
                    current_volume: record.current_volume,
                    diameter: record.diameter,
                    height: record.height,
                    model_id: record.model_id.clone(),
                    material_id,
                    content_id,
                    created_at: Utc::now(),
                };
                AssetRepository::insert_tx(&tx, &asset)
                    .map_err(|e| Self::persistence_err(row, e))?;
                RecordOutcome::Created
            }
            Some(_) => {
                // ===== 更新路径: 只覆盖来源显式提供的字段 =====
                let mut columns: Vec<(&'static str, Box<dyn ToSql>)> = Vec::new();

                if let Some(v) = &record.name {
                    columns.push(("name", Box::new(v.clone())));
                }
                if let Some(v) = &record.description {
                    columns.push(("description", Box::new(v.clone())));
                }
                if let Some(v) = &record.status {
                    columns.push(("status", Box::new(v.clone())));
                }
                if let Some(v) = record.installation_date {
                    columns.push(("installation_date", Box::new(v)));
                }
                if let Some(v) = record.manufactured_date {
                    columns.push(("manufactured_date", Box::new(v)));
                }
                if let Some(v) = record.commission_date {
                    columns.push(("commission_date", Box::new(v)));
                }
                if let Some(v) = record.decommission_date {
                    columns.push(("decommission_date", Box::new(v)));
                }
                if let Some(v) = record.latitude {
                    columns.push(("latitude", Box::new(v)));
                }
                if let Some(v) = record.longitude {
                    columns.push(("longitude", Box::new(v)));
                }
                if let Some(v) = record.health {
                    columns.push(("health", Box::new(v)));
                }
                if let Some(v) = record.capacity {
                    columns.push(("capacity", Box::new(v)));
                }
                if let Some(v) = record.current_volume {
                    columns.push(("current_volume", Box::new(v)));
                }
                if let Some(v) = record.diameter {
                    columns.push(("diameter", Box::new(v)));
                }
                if let Some(v) = record.height {
                    columns.push(("height", Box::new(v)));
                }
                if let Some(v) = &record.model_id {
                    columns.push(("model_id", Box::new(v.clone())));
                }
                if let Some(v) = company_id {
                    columns.push(("company_id", Box::new(v)));
                }
                if let Some(v) = location_id {
                    columns.push(("location_id", Box::new(v)));
                }
                if let Some(v) = farm_id {
                    columns.push(("farm_id", Box::new(v)));
                }
                if let Some(v) = asset_type_id {
                    columns.push(("asset_type_id", Box::new(v)));
                }
                if let Some(v) = material_id {
                    columns.push(("material_id", Box::new(v)));
                }
                if let Some(v) = content_id {
                    columns.push(("content_id", Box::new(v)));
                }

                AssetRepository::update_columns_tx(&tx, &record.asset_id, columns)
                    .map_err(|e| Self::persistence_err(row, e))?;
                RecordOutcome::Updated
            }
        };

        Self::commit_tx(tx, row)?;
        Ok(outcome)
    }

    /// 资产行引用了未知厂区时,按原始行为惰性创建存根厂区
    fn ensure_farm_stub(
        &mut self,
        tx: &Transaction,
        farm_id: &str,
        company_id: Option<&str>,
        location_id: Option<i64>,
        row: usize,
    ) -> ImportResult<()> {
        if FarmRepository::exists_tx(tx, farm_id).map_err(|e| Self::persistence_err(row, e))? {
            return Ok(());
        }

        let company_id = match company_id {
            Some(id) => id.to_string(),
            None => {
                return Err(Self::resolution_err(
                    row,
                    format!("厂区 {} 需存根创建,但行内无 company_id", farm_id),
                ))
            }
        };

        let farm = Farm {
            farm_id: farm_id.to_string(),
            company_id: Some(company_id),
            location_id,
            name: format!("Farm {}", farm_id),
            description: Some(format!("Auto-created farm for {}", farm_id)),
            status: self.defaults.farm_status,
            operational_since: None,
            created_at: Utc::now(),
        };
        FarmRepository::insert_tx(tx, &farm).map_err(|e| Self::persistence_err(row, e))?;
        Ok(())
    }

    // ==========================================
    // 厂区对账
    // ==========================================
    pub fn reconcile_farm(&mut self, record: &NormalizedFarmRecord) -> ImportResult<RecordOutcome> {
        let row = record.row_number;
        let conn = Arc::clone(&self.conn);
        let conn = conn
            .lock()
            .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;
        let tx = Self::begin_tx(&conn, row)?;

        // 业务键类别错配: farm_id 命中资产表 → 整行跳过
        if AssetRepository::exists_tx(&tx, &record.farm_id)
            .map_err(|e| Self::persistence_err(row, e))?
        {
            return Ok(RecordOutcome::Skipped(format!(
                "业务键 {} 已存在于资产表",
                record.farm_id
            )));
        }

        let existing = FarmRepository::get_by_id_tx(&tx, &record.farm_id)
            .map_err(|e| Self::persistence_err(row, e))?;

        let company_id = match &record.company_id {
            Some(id) => {
                let (resolved, _) = self
                    .resolver
                    .resolve_company(&tx, id, record.company_name.as_deref())
                    .map_err(|e| Self::resolution_err(row, e))?;
                Some(resolved)
            }
            None => None,
        };

        let location_id = match &record.location_name {
            Some(name) => {
                let (id, _) = self
                    .resolver
                    .resolve_location(&tx, name, record.location_city.as_deref())
                    .map_err(|e| Self::resolution_err(row, e))?;
                Some(id)
            }
            None => None,
        };

        let outcome = match existing {
            None => {
                if company_id.is_none() {
                    return Err(ImportError::MissingRequiredField {
                        row,
                        field: "company_id".to_string(),
                    });
                }
                let name = record.name.clone().ok_or_else(|| {
                    ImportError::MissingRequiredField {
                        row,
                        field: "name".to_string(),
                    }
                })?;

                let farm = Farm {
                    farm_id: record.farm_id.clone(),
                    company_id,
                    location_id,
                    name,
                    description: record.description.clone(),
                    status: record.status.unwrap_or(self.defaults.farm_status),
                    operational_since: record.operational_since,
                    created_at: Utc::now(),
                };
                FarmRepository::insert_tx(&tx, &farm)
                    .map_err(|e| Self::persistence_err(row, e))?;
                RecordOutcome::Created
            }
            Some(_) => {
                let mut columns: Vec<(&'static str, Box<dyn ToSql>)> = Vec::new();
                if let Some(v) = &record.name {
                    columns.push(("name", Box::new(v.clone())));
                }
                if let Some(v) = &record.description {
                    columns.push(("description", Box::new(v.clone())));
                }
                if let Some(v) = record.status {
                    columns.push(("status", Box::new(v.as_str().to_string())));
                }
                if let Some(v) = record.operational_since {
                    columns.push(("operational_since", Box::new(v.format("%Y-%m-%d").to_string())));
                }
                if let Some(v) = company_id {
                    columns.push(("company_id", Box::new(v)));
                }
                if let Some(v) = location_id {
                    columns.push(("location_id", Box::new(v)));
                }

                FarmRepository::update_columns_tx(&tx, &record.farm_id, columns)
                    .map_err(|e| Self::persistence_err(row, e))?;
                RecordOutcome::Updated
            }
        };

        Self::commit_tx(tx, row)?;
        Ok(outcome)
    }

    // ==========================================
    // 事件追加（只追加,不更新存量事件）
    // ==========================================
    pub fn append_event(&mut self, record: &NormalizedEventRecord) -> ImportResult<RecordOutcome> {
        let row = record.row_number;
        let conn = Arc::clone(&self.conn);
        let conn = conn
            .lock()
            .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;
        let tx = Self::begin_tx(&conn, row)?;

        // 资产不存在 → 跳过（镜像遗留迁移行为）
        if !AssetRepository::exists_tx(&tx, &record.asset_id)
            .map_err(|e| Self::persistence_err(row, e))?
        {
            return Ok(RecordOutcome::Skipped(format!(
                "资产 {} 不存在,事件无处挂靠",
                record.asset_id
            )));
        }

        let event_type_id = match &record.event_type_name {
            Some(name) => Some(
                self.resolver
                    .resolve_event_type(&tx, name)
                    .map_err(|e| Self::resolution_err(row, e))?
                    .0,
            ),
            None => None,
        };

        let event = AssetEvent {
            event_id: record.event_id.clone(),
            asset_id: record.asset_id.clone(),
            title: record.title.clone().unwrap_or_default(),
            event_type_id,
            start_date: record.start_date,
            end_date: record.end_date,
            event_status: record.event_status.clone(),
            description: record.description.clone(),
            performed_by: record.performed_by.clone(),
            cost: record.cost.clone(),
            created_at: Utc::now(),
        };

        let inserted = AssetRepository::append_event_tx(&tx, &event)
            .map_err(|e| Self::persistence_err(row, e))?;
        Self::commit_tx(tx, row)?;

        if inserted {
            Ok(RecordOutcome::Created)
        } else {
            Ok(RecordOutcome::Skipped(format!(
                "事件 {} 已存在,只追加路径不覆盖",
                record.event_id
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::schema::init_schema;

    /// 测试用确定性健康度来源
    struct FixedHealth(i64);

    impl HealthSource for FixedHealth {
        fn draw(&mut self, _min: i64, _max: i64) -> i64 {
            self.0
        }
    }

    fn setup_engine(health: i64) -> (Arc<Mutex<Connection>>, ReconcileEngine) {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));
        let engine = ReconcileEngine::new(
            conn.clone(),
            ReconcileDefaults::default(),
            Box::new(FixedHealth(health)),
        );
        (conn, engine)
    }

    fn asset_record(asset_id: &str) -> NormalizedAssetRecord {
        NormalizedAssetRecord {
            asset_id: asset_id.to_string(),
            name: Some("Tank 101".to_string()),
            company_id: Some("COMP-1".to_string()),
            row_number: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_then_update_same_key() {
        let (_conn, mut engine) = setup_engine(42);

        let outcome = engine.reconcile_asset(&asset_record("A-001")).unwrap();
        assert_eq!(outcome, RecordOutcome::Created);

        let outcome = engine.reconcile_asset(&asset_record("A-001")).unwrap();
        assert_eq!(outcome, RecordOutcome::Updated);
    }

    #[test]
    fn test_missing_health_drawn_from_source() {
        let (conn, mut engine) = setup_engine(42);
        engine.reconcile_asset(&asset_record("A-001")).unwrap();

        let guard = conn.lock().unwrap();
        let health: i64 = guard
            .query_row(
                "SELECT health FROM assets WHERE asset_id = 'A-001'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(health, 42);
    }

    #[test]
    fn test_update_touches_only_supplied_fields() {
        let (conn, mut engine) = setup_engine(42);

        let mut full = asset_record("A-001");
        full.capacity = Some(5000.0);
        full.description = Some("main storage".to_string());
        engine.reconcile_asset(&full).unwrap();

        // 只提供 health 的更新
        let partial = NormalizedAssetRecord {
            asset_id: "A-001".to_string(),
            health: Some(10),
            row_number: 2,
            ..Default::default()
        };
        engine.reconcile_asset(&partial).unwrap();

        let guard = conn.lock().unwrap();
        let (health, capacity, description): (i64, Option<f64>, Option<String>) = guard
            .query_row(
                "SELECT health, capacity, description FROM assets WHERE asset_id = 'A-001'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(health, 10);
        assert_eq!(capacity, Some(5000.0));
        assert_eq!(description, Some("main storage".to_string()));
    }

    #[test]
    fn test_unknown_farm_gets_stub() {
        let (conn, mut engine) = setup_engine(42);

        let mut record = asset_record("A-001");
        record.farm_id = Some("F-XYZ".to_string());
        engine.reconcile_asset(&record).unwrap();

        let guard = conn.lock().unwrap();
        let name: String = guard
            .query_row(
                "SELECT name FROM farms WHERE farm_id = 'F-XYZ'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(name, "Farm F-XYZ");
    }

    #[test]
    fn test_kind_mismatch_skips_row() {
        let (_conn, mut engine) = setup_engine(42);

        let farm = NormalizedFarmRecord {
            farm_id: "SHARED-1".to_string(),
            name: Some("North Farm".to_string()),
            company_id: Some("COMP-1".to_string()),
            row_number: 1,
            ..Default::default()
        };
        engine.reconcile_farm(&farm).unwrap();

        // 同一业务键走资产路径 → 跳过
        let outcome = engine.reconcile_asset(&asset_record("SHARED-1")).unwrap();
        assert!(matches!(outcome, RecordOutcome::Skipped(_)));
    }

    #[test]
    fn test_event_append_only() {
        let (_conn, mut engine) = setup_engine(42);
        engine.reconcile_asset(&asset_record("A-001")).unwrap();

        let event = NormalizedEventRecord {
            event_id: "EV-1".to_string(),
            asset_id: "A-001".to_string(),
            title: Some("Inspection".to_string()),
            row_number: 1,
            ..Default::default()
        };
        assert_eq!(engine.append_event(&event).unwrap(), RecordOutcome::Created);
        assert!(matches!(
            engine.append_event(&event).unwrap(),
            RecordOutcome::Skipped(_)
        ));
    }

    #[test]
    fn test_tx_begin_failure_fails_row_only() {
        let (conn, mut engine) = setup_engine(42);
        // 连接上已有未结事务时,行事务无法开启,应记为行级持久化错误
        conn.lock().unwrap().execute_batch("BEGIN").unwrap();

        let err = engine.reconcile_asset(&asset_record("A-001")).unwrap_err();
        assert!(matches!(err, ImportError::PersistenceError { row: 1, .. }));
        assert!(!err.is_fatal());

        conn.lock().unwrap().execute_batch("ROLLBACK").unwrap();
        assert_eq!(
            engine.reconcile_asset(&asset_record("A-001")).unwrap(),
            RecordOutcome::Created
        );
    }

    #[test]
    fn test_event_without_asset_skipped() {
        let (_conn, mut engine) = setup_engine(42);
        let event = NormalizedEventRecord {
            event_id: "EV-1".to_string(),
            asset_id: "A-404".to_string(),
            row_number: 1,
            ..Default::default()
        };
        assert!(matches!(
            engine.append_event(&event).unwrap(),
            RecordOutcome::Skipped(_)
        ));
    }
}
