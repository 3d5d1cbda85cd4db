// ==========================================
// 罐区资产台账系统 - 导入批次审计仓储
// ==========================================
// 职责: 每次导入运行落一条审计行,供事后追溯
// 红线: 审计写入失败不得回滚业务数据（由驱动层决定容忍度）
// ==========================================

use crate::domain::import::{ImportBatch, ImportTarget, SourceKind};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

pub struct BatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BatchRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn row_to_batch(row: &Row) -> rusqlite::Result<ImportBatch> {
        let source_kind: String = row.get(1)?;
        let target: String = row.get(3)?;
        Ok(ImportBatch {
            batch_id: row.get(0)?,
            source_kind: match source_kind.as_str() {
                "legacy_database" => SourceKind::LegacyDatabase,
                _ => SourceKind::Csv,
            },
            source_name: row.get(2)?,
            target: match target.as_str() {
                "farms" => ImportTarget::Farms,
                "events" => ImportTarget::Events,
                _ => ImportTarget::Assets,
            },
            total_rows: row.get(4)?,
            created_rows: row.get(5)?,
            updated_rows: row.get(6)?,
            skipped_rows: row.get(7)?,
            failed_rows: row.get(8)?,
            started_at: row.get(9)?,
            finished_at: row.get(10)?,
            elapsed_ms: row.get(11)?,
        })
    }

    /// 落一条批次审计行
    pub fn insert(&self, batch: &ImportBatch) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_batches (
                batch_id, source_kind, source_name, target, total_rows,
                created_rows, updated_rows, skipped_rows, failed_rows,
                started_at, finished_at, elapsed_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                batch.batch_id,
                batch.source_kind.to_string(),
                batch.source_name,
                batch.target.to_string(),
                batch.total_rows,
                batch.created_rows,
                batch.updated_rows,
                batch.skipped_rows,
                batch.failed_rows,
                batch.started_at,
                batch.finished_at,
                batch.elapsed_ms,
            ],
        )?;
        Ok(())
    }

    /// 按开始时间倒序列出最近 limit 条批次
    pub fn list_recent(&self, limit: i64) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT batch_id, source_kind, source_name, target, total_rows,
                   created_rows, updated_rows, skipped_rows, failed_rows,
                   started_at, finished_at, elapsed_ms
            FROM import_batches
            ORDER BY started_at DESC
            LIMIT ?1
            "#,
        )?;
        let batches = stmt
            .query_map(params![limit], Self::row_to_batch)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(batches)
    }
}
