// ==========================================
// 罐区资产台账系统 - 引用主数据模型
// ==========================================
// 用途: 解析器惰性创建,导入路径只读不改
// 红线: 引用数据首写优先（first-write-wins）,解析不回写属性
// ==========================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// 自然键归一
// ==========================================

/// 自然键归一: trim + 小写 + 内部连续空白折叠为单空格
///
/// "Crude Oil" 与 " crude  oil " 折叠为同一键,
/// 引用数据查找与存储（name_key 列）统一走这里
pub fn natural_key(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 位置复合自然键: city + name（任一可缺省为空串）
pub fn location_natural_key(city: &str, name: &str) -> String {
    format!("{}|{}", natural_key(city), natural_key(name))
}

// ==========================================
// Company - 公司
// ==========================================
// 业务键: company_id（外部稳定标识,形如 COMP-XXXXXXXX）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub company_id: String,
    pub name: String,
    pub logo: Option<String>,
    pub industry: Option<String>,
    pub location_id: Option<String>,
    pub established_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Company {
    /// 生成公司业务键（COMP-XXXXXXXX）
    pub fn generate_id() -> String {
        let unique_part = uuid::Uuid::new_v4().simple().to_string()[..8].to_uppercase();
        format!("COMP-{}", unique_part)
    }
}

// ==========================================
// Location - 地理位置
// ==========================================
// 自然键: city + name 组合（无外部稳定 id）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub location_id: i64, // 自增主键
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

// ==========================================
// AssetType - 资产类型
// ==========================================
// 自然键: name（如 "Fixed Roof Tank" / "Heat Exchanger"）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetType {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub code: Option<String>,
}

// ==========================================
// Material - 建造材质
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

// ==========================================
// Content - 存储介质
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

// ==========================================
// EventType - 事件类型
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventType {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_company_id_shape() {
        let id = Company::generate_id();
        assert!(id.starts_with("COMP-"));
        assert_eq!(id.len(), "COMP-".len() + 8);
    }

    #[test]
    fn test_natural_key_fold() {
        assert_eq!(natural_key("Crude Oil"), "crude oil");
        assert_eq!(natural_key(" crude  oil "), "crude oil");
        assert_eq!(natural_key("CRUDE\tOIL"), "crude oil");
    }

    #[test]
    fn test_location_natural_key_composite() {
        assert_eq!(
            location_natural_key(" Rotterdam ", "Maasvlakte Terminal"),
            "rotterdam|maasvlakte terminal"
        );
        assert_eq!(location_natural_key("", "Depot 7"), "|depot 7");
    }
}
