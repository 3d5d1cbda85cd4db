// ==========================================
// 罐区资产台账系统 - 引用数据解析器
// ==========================================
// 职责: 名称/业务键 → 引用行 id 的查找或惰性创建
// 缓存: 运行级缓存,键为折叠后的自然键,
//       同一运行内大小写/空白变体只命中一行
// 红线: 命中存量行时绝不回写其属性（首写优先）
// 红线: 只缓存查找命中的已提交行;本事务新建的行回滚即消失,
//       不得入缓存,提交后由后续行的查找回填
// ==========================================

use crate::domain::reference::{location_natural_key, natural_key, Company, Location};
use crate::domain::types::ReferenceKind;
use crate::repository::error::RepositoryResult;
use crate::repository::reference_repo::ReferenceRepository;
use chrono::Utc;
use rusqlite::Transaction;
use std::collections::HashMap;

// ==========================================
// ResolvedRef - 解析结果引用
// ==========================================
// 公司用业务键,其余引用表用自增主键
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedRef {
    Business(String),
    RowId(i64),
}

/// 统一解析入口的附加属性（类别相关,缺省为空）
#[derive(Debug, Clone, Default)]
pub struct ResolveAttributes {
    /// 公司: 存根创建时的展示名
    pub display_name: Option<String>,
    /// 位置: 复合自然键的城市部分
    pub city: Option<String>,
}

// ==========================================
// EntityResolver
// ==========================================
#[derive(Default)]
pub struct EntityResolver {
    companies: HashMap<String, String>,
    locations: HashMap<String, i64>,
    materials: HashMap<String, i64>,
    contents: HashMap<String, i64>,
    asset_types: HashMap<String, i64>,
    event_types: HashMap<String, i64>,
}

impl EntityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按类别分派的统一解析入口
    ///
    /// # 参数
    /// - key: 业务键（公司）或自然键名称（其余类别）
    /// - attributes: 类别相关的附加属性
    ///
    /// # 返回
    /// - (引用, 是否本次创建)
    pub fn resolve(
        &mut self,
        tx: &Transaction,
        kind: ReferenceKind,
        key: &str,
        attributes: &ResolveAttributes,
    ) -> RepositoryResult<(ResolvedRef, bool)> {
        match kind {
            ReferenceKind::Company => self
                .resolve_company(tx, key, attributes.display_name.as_deref())
                .map(|(id, created)| (ResolvedRef::Business(id), created)),
            ReferenceKind::Location => self
                .resolve_location(tx, key, attributes.city.as_deref())
                .map(|(id, created)| (ResolvedRef::RowId(id), created)),
            ReferenceKind::AssetType => self
                .resolve_asset_type(tx, key)
                .map(|(id, created)| (ResolvedRef::RowId(id), created)),
            ReferenceKind::Material => self
                .resolve_material(tx, key)
                .map(|(id, created)| (ResolvedRef::RowId(id), created)),
            ReferenceKind::Content => self
                .resolve_content(tx, key)
                .map(|(id, created)| (ResolvedRef::RowId(id), created)),
            ReferenceKind::EventType => self
                .resolve_event_type(tx, key)
                .map(|(id, created)| (ResolvedRef::RowId(id), created)),
        }
    }

    /// 解析公司（业务键匹配,缺失则按存根属性创建）
    ///
    /// # 返回
    /// - (company_id, was_created)
    pub fn resolve_company(
        &mut self,
        tx: &Transaction,
        company_id: &str,
        company_name: Option<&str>,
    ) -> RepositoryResult<(String, bool)> {
        let cache_key = company_id.trim().to_string();
        if let Some(found) = self.companies.get(&cache_key) {
            return Ok((found.clone(), false));
        }

        if let Some(found) = ReferenceRepository::find_company_tx(tx, &cache_key)? {
            self.companies.insert(cache_key, found.clone());
            return Ok((found, false));
        }

        // 存根公司: 名称缺省为 "Company <id>"
        let company = Company {
            company_id: cache_key.clone(),
            name: company_name
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("Company {}", cache_key)),
            logo: None,
            industry: Some("Oil & Gas".to_string()),
            location_id: None,
            established_date: None,
            created_at: Utc::now(),
        };
        // 新建行不入缓存: 所在行事务可能回滚
        ReferenceRepository::insert_company_tx(tx, &company)?;
        Ok((cache_key, true))
    }

    /// 解析位置（复合自然键 city+name）
    pub fn resolve_location(
        &mut self,
        tx: &Transaction,
        name: &str,
        city: Option<&str>,
    ) -> RepositoryResult<(i64, bool)> {
        let city = city.unwrap_or("");
        let cache_key = location_natural_key(city, name);
        if let Some(&found) = self.locations.get(&cache_key) {
            return Ok((found, false));
        }

        if let Some(found) = ReferenceRepository::find_location_tx(tx, city, name)? {
            self.locations.insert(cache_key, found);
            return Ok((found, false));
        }

        let location = Location {
            location_id: 0, // 自增列,插入后回填
            name: name.trim().to_string(),
            address: None,
            city: if city.trim().is_empty() {
                None
            } else {
                Some(city.trim().to_string())
            },
            state: None,
            zip_code: None,
            country: None,
            latitude: None,
            longitude: None,
            created_at: Utc::now(),
        };
        let id = ReferenceRepository::insert_location_tx(tx, &location)?;
        Ok((id, true))
    }

    /// 单名引用的通用 find-or-create
    fn resolve_named(
        cache: &mut HashMap<String, i64>,
        name: &str,
        find: impl Fn(&str) -> RepositoryResult<Option<i64>>,
        insert: impl Fn(&str) -> RepositoryResult<i64>,
    ) -> RepositoryResult<(i64, bool)> {
        let cache_key = natural_key(name);
        if let Some(&found) = cache.get(&cache_key) {
            return Ok((found, false));
        }

        if let Some(found) = find(name)? {
            cache.insert(cache_key, found);
            return Ok((found, false));
        }

        let id = insert(name)?;
        Ok((id, true))
    }

    pub fn resolve_material(
        &mut self,
        tx: &Transaction,
        name: &str,
    ) -> RepositoryResult<(i64, bool)> {
        Self::resolve_named(
            &mut self.materials,
            name,
            |n| ReferenceRepository::find_material_tx(tx, n),
            |n| ReferenceRepository::insert_material_tx(tx, n, None),
        )
    }

    pub fn resolve_content(
        &mut self,
        tx: &Transaction,
        name: &str,
    ) -> RepositoryResult<(i64, bool)> {
        Self::resolve_named(
            &mut self.contents,
            name,
            |n| ReferenceRepository::find_content_tx(tx, n),
            |n| ReferenceRepository::insert_content_tx(tx, n, None),
        )
    }

    pub fn resolve_asset_type(
        &mut self,
        tx: &Transaction,
        name: &str,
    ) -> RepositoryResult<(i64, bool)> {
        Self::resolve_named(
            &mut self.asset_types,
            name,
            |n| ReferenceRepository::find_asset_type_tx(tx, n),
            |n| ReferenceRepository::insert_asset_type_tx(tx, n, None),
        )
    }

    pub fn resolve_event_type(
        &mut self,
        tx: &Transaction,
        name: &str,
    ) -> RepositoryResult<(i64, bool)> {
        Self::resolve_named(
            &mut self.event_types,
            name,
            |n| ReferenceRepository::find_event_type_tx(tx, n),
            |n| ReferenceRepository::insert_event_type_tx(tx, n, None),
        )
    }
}
