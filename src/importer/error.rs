// ==========================================
// 罐区资产台账系统 - 导入模块错误类型
// ==========================================
// 分级: 致命错误（来源不可达/不可解析头）终止整次运行,
//       行级错误只计入该行 Failed,不影响其他行
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 来源相关错误（致命）=====
    #[error("来源不存在: {0}")]
    SourceNotFound(String),

    #[error("来源格式不支持: {0}（仅支持 .csv / SQLite 库文件）")]
    UnsupportedFormat(String),

    #[error("来源读取失败: {0}")]
    SourceReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("遗留库打开失败: {0}")]
    LegacyDbError(String),

    // ===== 行级错误 =====
    #[error("必填字段缺失 (行 {row}): {field} 为空")]
    MissingRequiredField { row: usize, field: String },

    #[error("类型转换失败 (行 {row}, 字段 {field}): {message}")]
    TypeConversionError {
        row: usize,
        field: String,
        message: String,
    },

    #[error("数值范围错误 (行 {row}, 字段 {field}): 值 {value} 超出范围 [{min}, {max}]")]
    ValueRangeError {
        row: usize,
        field: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("引用解析失败 (行 {row}): {message}")]
    ResolutionError { row: usize, message: String },

    #[error("持久化失败 (行 {row}): {message}")]
    PersistenceError { row: usize, message: String },

    // ===== 数据库错误（致命）=====
    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 是否为致命错误（终止整次运行,而非只失败当前行）
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ImportError::MissingRequiredField { .. }
                | ImportError::TypeConversionError { .. }
                | ImportError::ValueRangeError { .. }
                | ImportError::ResolutionError { .. }
                | ImportError::PersistenceError { .. }
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::SourceReadError(err.to_string())
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::DatabaseQueryError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<RepositoryError>（行级上下文由调用处补充）
impl From<crate::repository::RepositoryError> for ImportError {
    fn from(err: crate::repository::RepositoryError) -> Self {
        ImportError::DatabaseQueryError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
