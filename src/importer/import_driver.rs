// ==========================================
// 罐区资产台账系统 - 导入驱动
// ==========================================
// 职责: 串起 来源 → 规范化 → 对账 → 汇总/审计 的整次运行
// 顺序: 打开来源（致命错误在此终止,库不被触碰）
//       → 可选清空（单事务全有或全无）
//       → 逐行流式处理（行失败不中断运行）
//       → 批次审计落行 → 返回汇总
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::import::{
    ImportBatch, ImportOptions, ImportTarget, RunSummary, SourceKind,
};
use crate::domain::import::RecordOutcome;
use crate::domain::types::FarmStatus;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::importer_trait::AssetImporter;
use crate::importer::legacy_source::LegacyDbSource;
use crate::importer::reconciler::{
    HealthSource, RandomHealthSource, ReconcileDefaults, ReconcileEngine,
};
use crate::importer::source::{CsvSource, RecordSource};
use crate::repository::asset_repo::AssetRepository;
use crate::repository::batch_repo::BatchRepository;
use crate::repository::farm_repo::FarmRepository;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

type HealthFactory = Box<dyn Fn() -> Box<dyn HealthSource> + Send + Sync>;

// ==========================================
// ImportDriver
// ==========================================
pub struct ImportDriver {
    conn: Arc<Mutex<Connection>>,
    config: Arc<dyn ImportConfigReader>,
    health_factory: HealthFactory,
}

impl ImportDriver {
    pub fn new(conn: Arc<Mutex<Connection>>, config: Arc<dyn ImportConfigReader>) -> Self {
        Self {
            conn,
            config,
            health_factory: Box::new(|| Box::new(RandomHealthSource::new())),
        }
    }

    /// 注入健康度来源（测试确定性 / 结果复现）
    pub fn with_health_factory(mut self, factory: HealthFactory) -> Self {
        self.health_factory = factory;
        self
    }

    /// 从配置层汇集对账缺省值
    async fn load_defaults(&self) -> ImportResult<ReconcileDefaults> {
        let asset_status = self
            .config
            .get_default_asset_status()
            .await
            .map_err(|e| ImportError::ConfigReadError {
                key: "default_asset_status".to_string(),
                message: e.to_string(),
            })?;
        let farm_status_raw = self
            .config
            .get_default_farm_status()
            .await
            .map_err(|e| ImportError::ConfigReadError {
                key: "default_farm_status".to_string(),
                message: e.to_string(),
            })?;
        let health_bounds = self
            .config
            .get_health_bounds()
            .await
            .map_err(|e| ImportError::ConfigReadError {
                key: "health_min/health_max".to_string(),
                message: e.to_string(),
            })?;

        Ok(ReconcileDefaults {
            asset_status,
            farm_status: FarmStatus::parse(&farm_status_raw).unwrap_or(FarmStatus::Active),
            health_bounds,
        })
    }

    /// 清空厂区与资产行（及资产事件）,单事务全有或全无
    fn clear_existing(&self) -> ImportResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;

        let assets_deleted = AssetRepository::delete_all_tx(&tx)?;
        let farms_deleted = FarmRepository::delete_all_tx(&tx)?;

        tx.commit()
            .map_err(|e| ImportError::DatabaseTransactionError(e.to_string()))?;

        tracing::info!(
            assets_deleted,
            farms_deleted,
            "清空存量厂区/资产完成"
        );
        Ok(())
    }

    /// 逐行流式处理一个来源
    fn run_records(
        &self,
        engine: &mut ReconcileEngine,
        source: &mut dyn RecordSource,
        target: ImportTarget,
    ) -> ImportResult<RunSummary> {
        let mapper = FieldMapper::new();
        let mut summary = RunSummary::default();

        while let Some(raw) = source.next_record()? {
            let row_number = raw.row_number;
            let result = match target {
                ImportTarget::Assets => mapper
                    .map_asset(&raw)
                    .and_then(|record| engine.reconcile_asset(&record)),
                ImportTarget::Farms => mapper
                    .map_farm(&raw)
                    .and_then(|record| engine.reconcile_farm(&record)),
                ImportTarget::Events => mapper
                    .map_event(&raw)
                    .and_then(|record| engine.append_event(&record)),
            };

            let identifier = Self::row_identifier(&raw, target, row_number);
            match result {
                Ok(outcome) => {
                    if let RecordOutcome::Skipped(reason) = &outcome {
                        tracing::debug!(row = row_number, %identifier, %reason, "行跳过");
                    }
                    summary.record(&identifier, &outcome);
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    tracing::warn!(row = row_number, %identifier, error = %err, "行失败");
                    summary.record(&identifier, &RecordOutcome::Failed(err.to_string()));
                }
            }
        }

        Ok(summary)
    }

    /// 行标识: 业务键优先,缺失时退化为行号
    fn row_identifier(
        raw: &crate::domain::import::RawRecord,
        target: ImportTarget,
        row_number: usize,
    ) -> String {
        let key_column = match target {
            ImportTarget::Assets => "asset_id",
            ImportTarget::Farms => "farm_id",
            ImportTarget::Events => "event_id",
        };
        raw.value(key_column)
            .as_text()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("row {}", row_number))
    }

    /// 批次审计落行（失败只告警,不回滚业务数据）
    fn write_audit(
        &self,
        source_kind: SourceKind,
        source_name: &str,
        target: ImportTarget,
        summary: &RunSummary,
        started_at: chrono::DateTime<Utc>,
    ) {
        let batch = ImportBatch {
            batch_id: uuid::Uuid::new_v4().to_string(),
            source_kind,
            source_name: source_name.to_string(),
            target,
            total_rows: summary.total_rows as i64,
            created_rows: summary.created as i64,
            updated_rows: summary.updated as i64,
            skipped_rows: summary.skipped as i64,
            failed_rows: summary.failed as i64,
            started_at,
            finished_at: Utc::now(),
            elapsed_ms: summary.elapsed_ms as i64,
        };

        let repo = BatchRepository::from_connection(self.conn.clone());
        if let Err(err) = repo.insert(&batch) {
            tracing::warn!(error = %err, "批次审计写入失败");
        }
    }

    /// 单来源运行骨架
    fn run_source(
        &self,
        engine: &mut ReconcileEngine,
        source: &mut dyn RecordSource,
        source_kind: SourceKind,
        target: ImportTarget,
    ) -> ImportResult<RunSummary> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let source_name = source.source_name().to_string();

        let mut summary = self.run_records(engine, source, target)?;
        summary.elapsed_ms = clock.elapsed().as_millis() as u64;

        tracing::info!(
            source = %source_name,
            target = %target,
            total = summary.total_rows,
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            failed = summary.failed,
            elapsed_ms = summary.elapsed_ms,
            "导入运行完成"
        );

        self.write_audit(source_kind, &source_name, target, &summary, started_at);
        Ok(summary)
    }
}

// ==========================================
// AssetImporter 实现
// ==========================================
#[async_trait]
impl AssetImporter for ImportDriver {
    async fn import_csv(
        &self,
        path: &Path,
        target: ImportTarget,
        options: ImportOptions,
    ) -> ImportResult<RunSummary> {
        // 先开来源: 来源不可达时存量数据不被触碰（即使要求清空）
        let mut source = CsvSource::open(path)?;
        let defaults = self.load_defaults().await?;

        if options.clear_existing {
            self.clear_existing()?;
        }

        let mut engine =
            ReconcileEngine::new(self.conn.clone(), defaults, (self.health_factory)());
        self.run_source(&mut engine, &mut source, SourceKind::Csv, target)
    }

    async fn migrate_legacy(
        &self,
        path: &Path,
        options: ImportOptions,
    ) -> ImportResult<RunSummary> {
        let batch_size = self
            .config
            .get_legacy_batch_size()
            .await
            .map_err(|e| ImportError::ConfigReadError {
                key: "legacy_batch_size".to_string(),
                message: e.to_string(),
            })?;

        // 三个流全部可开,才允许清空
        let mut farms = LegacyDbSource::farms(path, batch_size)?;
        let mut assets = LegacyDbSource::assets(path, batch_size)?;
        let mut events = LegacyDbSource::events(path, batch_size)?;
        let defaults = self.load_defaults().await?;

        if options.clear_existing {
            self.clear_existing()?;
        }

        // 同一引擎跑三趟: 解析器缓存跨趟复用
        let mut engine =
            ReconcileEngine::new(self.conn.clone(), defaults, (self.health_factory)());

        let mut summary = self.run_source(
            &mut engine,
            &mut farms,
            SourceKind::LegacyDatabase,
            ImportTarget::Farms,
        )?;
        summary.merge(self.run_source(
            &mut engine,
            &mut assets,
            SourceKind::LegacyDatabase,
            ImportTarget::Assets,
        )?);
        summary.merge(self.run_source(
            &mut engine,
            &mut events,
            SourceKind::LegacyDatabase,
            ImportTarget::Events,
        )?);

        Ok(summary)
    }
}
