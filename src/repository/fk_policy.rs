// ==========================================
// 罐区资产台账系统 - 引用完整性策略表
// ==========================================
// 职责: 每条父子关系的删除策略显式声明,
//       由仓储层删除操作在同一事务内执行
// 红线: 孤儿保留删除（set_null）是台账基本不变式:
//       删除 Company/Location/Farm/AssetType/Material/Content
//       绝不连带删除依赖的 Farm/Asset
// ==========================================

use crate::domain::types::FkPolicy;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::Transaction;

// ==========================================
// RelationPolicy - 单条父子关系
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct RelationPolicy {
    /// 父表名
    pub parent: &'static str,
    /// 子表名
    pub child: &'static str,
    /// 子表上指向父表的外键列
    pub fk_column: &'static str,
    /// 删除父行时对子行的处理
    pub policy: FkPolicy,
}

/// 全量关系策略表
///
/// 与 schema.rs 的表定义一一对应;新增外键关系必须同步登记
pub const RELATION_POLICIES: &[RelationPolicy] = &[
    RelationPolicy { parent: "companies", child: "farms", fk_column: "company_id", policy: FkPolicy::SetNull },
    RelationPolicy { parent: "companies", child: "assets", fk_column: "company_id", policy: FkPolicy::SetNull },
    RelationPolicy { parent: "locations", child: "farms", fk_column: "location_id", policy: FkPolicy::SetNull },
    RelationPolicy { parent: "locations", child: "assets", fk_column: "location_id", policy: FkPolicy::SetNull },
    RelationPolicy { parent: "farms", child: "assets", fk_column: "farm_id", policy: FkPolicy::SetNull },
    RelationPolicy { parent: "asset_types", child: "assets", fk_column: "asset_type_id", policy: FkPolicy::SetNull },
    RelationPolicy { parent: "materials", child: "assets", fk_column: "material_id", policy: FkPolicy::SetNull },
    RelationPolicy { parent: "contents", child: "assets", fk_column: "content_id", policy: FkPolicy::SetNull },
    RelationPolicy { parent: "event_types", child: "asset_events", fk_column: "event_type_id", policy: FkPolicy::SetNull },
    RelationPolicy { parent: "assets", child: "asset_events", fk_column: "asset_id", policy: FkPolicy::Cascade },
];

/// 查询某父表的全部子关系
pub fn policies_for_parent(parent: &str) -> Vec<&'static RelationPolicy> {
    RELATION_POLICIES.iter().filter(|p| p.parent == parent).collect()
}

/// 删除父行前,在同一事务内对每条子关系执行策略
///
/// # 参数
/// - tx: 调用方事务（策略执行与父行删除必须同事务）
/// - parent: 父表名
/// - parent_id: 父行主键值（已绑定参数,非拼接）
pub fn apply_on_delete_tx(
    tx: &Transaction,
    parent: &str,
    parent_id: &dyn rusqlite::ToSql,
) -> RepositoryResult<()> {
    for relation in policies_for_parent(parent) {
        match relation.policy {
            FkPolicy::SetNull => {
                let sql = format!(
                    "UPDATE {} SET {} = NULL WHERE {} = ?1",
                    relation.child, relation.fk_column, relation.fk_column
                );
                tx.execute(&sql, [parent_id])?;
            }
            FkPolicy::Cascade => {
                let sql = format!(
                    "DELETE FROM {} WHERE {} = ?1",
                    relation.child, relation.fk_column
                );
                tx.execute(&sql, [parent_id])?;
            }
            FkPolicy::Restrict => {
                let sql = format!(
                    "SELECT COUNT(*) FROM {} WHERE {} = ?1",
                    relation.child, relation.fk_column
                );
                let count: i64 = tx.query_row(&sql, [parent_id], |row| row.get(0))?;
                if count > 0 {
                    return Err(RepositoryError::DeleteRestricted {
                        parent: relation.parent.to_string(),
                        child: relation.child.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}
