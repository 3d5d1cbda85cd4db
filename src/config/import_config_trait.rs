// ==========================================
// 罐区资产台账系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    // ===== 默认状态配置 =====

    /// 获取新建资产的默认状态
    ///
    /// # 默认值
    /// - "active"
    async fn get_default_asset_status(&self) -> Result<String, Box<dyn Error>>;

    /// 获取存根厂区的默认状态
    ///
    /// # 默认值
    /// - "active"
    async fn get_default_farm_status(&self) -> Result<String, Box<dyn Error>>;

    // ===== 健康度配置 =====

    /// 获取健康度随机填充区间（含端点）
    ///
    /// # 返回
    /// - (i64, i64): (下界, 上界)
    ///
    /// # 默认值
    /// - (0, 100)
    async fn get_health_bounds(&self) -> Result<(i64, i64), Box<dyn Error>>;

    // ===== 旧库迁移配置 =====

    /// 获取旧库迁移的分页批量大小
    ///
    /// # 默认值
    /// - 500
    async fn get_legacy_batch_size(&self) -> Result<i64, Box<dyn Error>>;
}
