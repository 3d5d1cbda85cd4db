// ==========================================
// 罐区资产台账系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、导入中间结构
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod asset;
pub mod import;
pub mod reference;
pub mod types;

// 重导出核心类型
pub use asset::{Asset, AssetEvent, Farm};
pub use import::{
    ImportBatch, ImportOptions, ImportTarget, NormalizedAssetRecord, NormalizedEventRecord,
    NormalizedFarmRecord, RawRecord, RawValue, RecordOutcome, RowError, RunSummary, SourceKind,
};
pub use reference::{AssetType, Company, Content, EventType, Location, Material};
pub use types::{FarmStatus, FkPolicy, ReferenceKind};
