// ==========================================
// 罐区资产台账系统 - 配置模块
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

pub use config_manager::{config_keys, ConfigManager};
pub use import_config_trait::ImportConfigReader;
