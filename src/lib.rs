// ==========================================
// 罐区资产台账系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 资产主数据导入与对账引擎
// 约束: 单写入者批处理（不支持并发导入流）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{FarmStatus, FkPolicy, ReferenceKind};

// 领域实体
pub use domain::{
    Asset, AssetEvent, AssetType, Company, Content, EventType, Farm, Location, Material,
};

// 导入结果类型
pub use domain::{
    ImportBatch, ImportOptions, ImportTarget, NormalizedAssetRecord, NormalizedEventRecord,
    NormalizedFarmRecord, RawRecord, RawValue, RecordOutcome, RowError, RunSummary, SourceKind,
};

// 导入器
pub use importer::{
    AssetImporter, CsvSource, EntityResolver, ImportDriver, LegacyDbSource, ReconcileEngine,
    RecordSource,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "罐区资产台账系统";
