// ==========================================
// 罐区资产台账系统 - 领域类型定义
// ==========================================
// 序列化格式: snake_case (与数据库存储一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 厂区状态 (Farm Status)
// ==========================================
// 红线: 枚举封闭,未知文本按"无法解析"处理,不落库
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FarmStatus {
    Active,            // 运行中
    Inactive,          // 停用
    UnderConstruction, // 在建
}

impl FarmStatus {
    /// 容忍式解析（trim + 小写 + 空格/连字符归一）
    ///
    /// 无法识别的文本返回 None（视为"未知"，不报错）
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "active" => Some(FarmStatus::Active),
            "inactive" => Some(FarmStatus::Inactive),
            "under_construction" => Some(FarmStatus::UnderConstruction),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FarmStatus::Active => "active",
            FarmStatus::Inactive => "inactive",
            FarmStatus::UnderConstruction => "under_construction",
        }
    }
}

impl fmt::Display for FarmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 引用数据类别 (Reference Kind)
// ==========================================
// 用途: 实体解析器按类别分派自然键查找
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Company,
    Location,
    AssetType,
    Material,
    Content,
    EventType,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Company => write!(f, "company"),
            ReferenceKind::Location => write!(f, "location"),
            ReferenceKind::AssetType => write!(f, "asset_type"),
            ReferenceKind::Material => write!(f, "material"),
            ReferenceKind::Content => write!(f, "content"),
            ReferenceKind::EventType => write!(f, "event_type"),
        }
    }
}

// ==========================================
// 外键删除策略 (FK Policy)
// ==========================================
// 红线: 引用完整性策略显式建表声明,不依赖隐式 ORM 行为
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FkPolicy {
    Cascade, // 级联删除子行
    SetNull, // 清空子行外键（孤儿保留）
    Restrict, // 存在子行时拒绝删除
}

impl fmt::Display for FkPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FkPolicy::Cascade => write!(f, "cascade"),
            FkPolicy::SetNull => write!(f, "set_null"),
            FkPolicy::Restrict => write!(f, "restrict"),
        }
    }
}
