// ==========================================
// 罐区资产台账系统 - 导入中间结构
// ==========================================
// 职责: 原始记录、规范化记录、逐行结果、运行汇总
// 红线: 未定型字符串只进入规范化层（RawValue）,
//       不泄漏到解析器/对账引擎
// ==========================================

use crate::domain::types::FarmStatus;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// RawValue - 未定型字段值
// ==========================================
// 仅规范化层消费: Text 可能为空串/占位符,由清洗器归一
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Text(String),
    Missing,
}

impl RawValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, RawValue::Missing)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s),
            RawValue::Missing => None,
        }
    }
}

// ==========================================
// RawRecord - 原始行记录
// ==========================================
// 来源: CSV 行（表头定义列名）或遗留库游标行
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// 行号（1 起,数据行计数,用于错误定位）
    pub row_number: usize,
    fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn new(row_number: usize, fields: HashMap<String, String>) -> Self {
        Self { row_number, fields }
    }

    /// 按列名取值（缺列 → Missing,存在即 Text,空白归一交给清洗器）
    pub fn value(&self, key: &str) -> RawValue {
        match self.fields.get(key) {
            Some(v) => RawValue::Text(v.clone()),
            None => RawValue::Missing,
        }
    }

    /// 是否整行空白（全部值 trim 后为空）
    pub fn is_blank(&self) -> bool {
        self.fields.values().all(|v| v.trim().is_empty())
    }
}

// ==========================================
// NormalizedAssetRecord - 规范化资产记录
// ==========================================
// 镜像 Asset 字段 + 未解析的引用数据名称
// 字段为 None 表示"未知"（更新时不触碰存量值）
#[derive(Debug, Clone, Default)]
pub struct NormalizedAssetRecord {
    // ===== 业务键（规范化层保证非空）=====
    pub asset_id: String,

    // ===== 标量字段 =====
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub installation_date: Option<DateTime<Utc>>,
    pub manufactured_date: Option<DateTime<Utc>>,
    pub commission_date: Option<DateTime<Utc>>,
    pub decommission_date: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub health: Option<i64>,
    pub capacity: Option<f64>,
    pub current_volume: Option<f64>,
    pub diameter: Option<f64>,
    pub height: Option<f64>,
    pub model_id: Option<String>,

    // ===== 待解析引用（名称/业务键,解析延迟到解析器）=====
    pub company_id: Option<String>,
    pub company_name: Option<String>,
    pub farm_id: Option<String>,
    pub asset_type_name: Option<String>,
    pub material_name: Option<String>,
    pub content_name: Option<String>,
    pub location_name: Option<String>,
    pub location_city: Option<String>,

    // ===== 元信息 =====
    pub row_number: usize,
}

// ==========================================
// NormalizedFarmRecord - 规范化厂区记录
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct NormalizedFarmRecord {
    pub farm_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<FarmStatus>,
    pub operational_since: Option<NaiveDate>,

    pub company_id: Option<String>,
    pub company_name: Option<String>,
    pub location_name: Option<String>,
    pub location_city: Option<String>,

    pub row_number: usize,
}

// ==========================================
// NormalizedEventRecord - 规范化事件记录
// ==========================================
// 只追加路径: 不做 create-or-update 分支
#[derive(Debug, Clone, Default)]
pub struct NormalizedEventRecord {
    pub event_id: String,
    pub asset_id: String,
    pub title: Option<String>,
    pub event_type_name: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub event_status: Option<String>,
    pub description: Option<String>,
    pub performed_by: Option<String>,
    pub cost: Option<String>,

    pub row_number: usize,
}

// ==========================================
// RecordOutcome - 逐行对账结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "reason")]
pub enum RecordOutcome {
    Created,
    Updated,
    Skipped(String),
    Failed(String),
}

// ==========================================
// RowError - 失败行明细
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowError {
    /// 业务键,无法确定时为 "row <n>"
    pub identifier: String,
    pub reason: String,
}

// ==========================================
// RunSummary - 运行汇总
// ==========================================
// 运行结束后返回给操作员的唯一可观测结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_rows: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<RowError>,
    pub elapsed_ms: u64,
}

impl RunSummary {
    /// 记录一行结果
    pub fn record(&mut self, identifier: &str, outcome: &RecordOutcome) {
        self.total_rows += 1;
        match outcome {
            RecordOutcome::Created => self.created += 1,
            RecordOutcome::Updated => self.updated += 1,
            RecordOutcome::Skipped(_) => self.skipped += 1,
            RecordOutcome::Failed(reason) => {
                self.failed += 1;
                self.errors.push(RowError {
                    identifier: identifier.to_string(),
                    reason: reason.clone(),
                });
            }
        }
    }

    /// 合并另一次运行的统计（遗留库迁移的多趟合并）
    pub fn merge(&mut self, other: RunSummary) {
        self.total_rows += other.total_rows;
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.errors.extend(other.errors);
        self.elapsed_ms += other.elapsed_ms;
    }
}

// ==========================================
// ImportBatch - 批次审计记录
// ==========================================
// 对齐 import_batches 表,每次运行落一行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,
    pub source_kind: SourceKind,
    pub source_name: String,
    pub target: ImportTarget,
    pub total_rows: i64,
    pub created_rows: i64,
    pub updated_rows: i64,
    pub skipped_rows: i64,
    pub failed_rows: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: i64,
}

// ==========================================
// 运行配置
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Csv,
    LegacyDatabase,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Csv => write!(f, "csv"),
            SourceKind::LegacyDatabase => write!(f, "legacy_database"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportTarget {
    Assets,
    Farms,
    Events,
}

impl std::fmt::Display for ImportTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportTarget::Assets => write!(f, "assets"),
            ImportTarget::Farms => write!(f, "farms"),
            ImportTarget::Events => write!(f, "events"),
        }
    }
}

/// 导入运行选项
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// 导入前清空 Farm/Asset 行（仅这两类,单事务全有或全无）
    pub clear_existing: bool,
}
