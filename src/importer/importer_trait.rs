// ==========================================
// 罐区资产台账系统 - 资产导入器 Trait
// ==========================================
// 职责: 定义导入模块对外接口（不包含实现）
// ==========================================

use crate::domain::import::{ImportOptions, ImportTarget, RunSummary};
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// AssetImporter Trait
// ==========================================
// 实现者: ImportDriver
#[async_trait]
pub trait AssetImporter: Send + Sync {
    /// 从 CSV 文件导入
    ///
    /// # 参数
    /// - path: CSV 文件路径
    /// - target: 目标实体（assets / farms / events）
    /// - options: 运行选项
    ///
    /// # 返回
    /// - Ok(RunSummary): 运行汇总（含逐行失败明细）
    /// - Err: 致命错误（来源不可达等）,未产生汇总
    async fn import_csv(
        &self,
        path: &Path,
        target: ImportTarget,
        options: ImportOptions,
    ) -> ImportResult<RunSummary>;

    /// 从遗留 SQLite 库整体迁移
    ///
    /// 趟次: 厂区 → 资产 → 事件（镜像遗留系统的依赖顺序）
    async fn migrate_legacy(&self, path: &Path, options: ImportOptions)
        -> ImportResult<RunSummary>;
}
