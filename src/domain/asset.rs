// ==========================================
// 罐区资产台账系统 - 厂区与资产领域模型
// ==========================================
// 业务键: farm_id / asset_id（跨系统稳定,重复导入不生成新键）
// 红线: 可选数值字段缺失表示"未知",不得落 0
// ==========================================

use crate::domain::types::FarmStatus;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 健康度合法区间（含端点）
pub const HEALTH_MIN: i64 = 0;
pub const HEALTH_MAX: i64 = 100;

// ==========================================
// Farm - 厂区（罐区）
// ==========================================
// 归属: 公司 1:N 厂区; 厂区 1:N 资产
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Farm {
    // ===== 主键 =====
    pub farm_id: String, // 业务键（形如 <company_id>-F-XXXXX）

    // ===== 归属与位置 =====
    pub company_id: Option<String>, // 公司删除时清空（孤儿保留）
    pub location_id: Option<i64>,   // 位置删除时清空（孤儿保留）

    // ===== 基础信息 =====
    pub name: String,
    pub description: Option<String>,
    pub status: FarmStatus,
    pub operational_since: Option<NaiveDate>,

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
}

impl Farm {
    /// 生成厂区业务键（<company_id>-F-XXXXX）
    pub fn generate_id(company_id: &str) -> String {
        let unique_part = uuid::Uuid::new_v4().simple().to_string()[..5].to_uppercase();
        format!("{}-F-{}", company_id, unique_part)
    }
}

// ==========================================
// Asset - 资产（储罐/换热器等）
// ==========================================
// 红线: farm 删除后资产以孤儿形式保留（farm_id 清空）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    // ===== 主键 =====
    pub asset_id: String, // 业务键（形如 <farm_id>-A-XXXXX）

    // ===== 归属与位置 =====
    pub company_id: Option<String>, // 公司删除时清空（孤儿保留）
    pub location_id: Option<i64>,
    pub farm_id: Option<String>, // 可空归属,厂区删除时清空

    // ===== 基础信息 =====
    pub name: String,
    pub asset_type_id: Option<i64>,
    pub description: Option<String>,
    pub status: String,

    // ===== 时间信息 =====
    pub installation_date: Option<DateTime<Utc>>,
    pub manufactured_date: Option<DateTime<Utc>>,
    pub commission_date: Option<DateTime<Utc>>,
    pub decommission_date: Option<DateTime<Utc>>,

    // ===== 地理与健康 =====
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub health: i64, // [0,100],创建时缺失则随机填充,更新时不重算

    // ===== 罐体几何（全部可选,缺失=未知）=====
    pub capacity: Option<f64>,
    pub current_volume: Option<f64>,
    pub diameter: Option<f64>,
    pub height: Option<f64>,
    pub model_id: Option<String>,

    // ===== 引用数据 =====
    pub material_id: Option<i64>,
    pub content_id: Option<i64>,

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
}

impl Asset {
    /// 生成资产业务键（<prefix>-A-XXXXX）
    ///
    /// prefix 优先取 farm_id,无厂区归属时退化为 company_id
    pub fn generate_id(prefix: &str) -> String {
        let unique_part = uuid::Uuid::new_v4().simple().to_string()[..5].to_uppercase();
        let prefix = if prefix.is_empty() { "X" } else { prefix };
        format!("{}-A-{}", prefix, unique_part)
    }
}

// ==========================================
// AssetEvent - 资产维护/巡检事件
// ==========================================
// 红线: 只追加（append-only）,导入路径不更新已有事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetEvent {
    pub event_id: String,
    pub asset_id: String, // FK,资产删除时级联删除
    pub title: String,
    pub event_type_id: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub event_status: Option<String>,
    pub description: Option<String>,
    pub performed_by: Option<String>,
    pub cost: Option<String>,
    pub created_at: DateTime<Utc>,
}
