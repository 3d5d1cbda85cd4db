// ==========================================
// 罐区资产台账系统 - 持久化层
// ==========================================
// 分层: repository 只负责 SQLite 读写与外键策略执行,
//       对账决策（创建/更新/跳过）全部在 importer 层
// ==========================================

pub mod asset_repo;
pub mod batch_repo;
pub mod error;
pub mod farm_repo;
pub mod fk_policy;
pub mod reference_repo;
pub mod schema;

pub use asset_repo::AssetRepository;
pub use batch_repo::BatchRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use farm_repo::FarmRepository;
pub use fk_policy::{apply_on_delete_tx, policies_for_parent, RelationPolicy, RELATION_POLICIES};
pub use reference_repo::ReferenceRepository;
pub use schema::init_schema;
