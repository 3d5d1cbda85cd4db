// ==========================================
// 罐区资产台账系统 - 导入模块
// ==========================================
// 管线: RecordSource → DataCleaner/FieldMapper → EntityResolver
//       → ReconcileEngine → ImportDriver
// ==========================================

pub mod data_cleaner;
pub mod error;
pub mod field_mapper;
pub mod import_driver;
pub mod importer_trait;
pub mod legacy_source;
pub mod reconciler;
pub mod resolver;
pub mod source;

pub use data_cleaner::DataCleaner;
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper;
pub use import_driver::ImportDriver;
pub use importer_trait::AssetImporter;
pub use legacy_source::LegacyDbSource;
pub use reconciler::{HealthSource, RandomHealthSource, ReconcileDefaults, ReconcileEngine};
pub use resolver::{EntityResolver, ResolveAttributes, ResolvedRef};
pub use source::{CsvSource, RecordSource};
