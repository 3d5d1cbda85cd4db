// ==========================================
// 罐区资产台账系统 - 字段映射器
// ==========================================
// 职责: RawRecord → 规范化记录（别名归一、必填校验、类型转换）
// 红线: 未定型字符串到此为止,规范化记录只含类型化字段;
//       值存在但不可解析的数值 → 行级失败,
//       不可解析日期 → 未知（None）,行继续
// ==========================================

use crate::domain::import::{
    NormalizedAssetRecord, NormalizedEventRecord, NormalizedFarmRecord, RawRecord,
};
use crate::domain::types::FarmStatus;
use crate::domain::asset::{HEALTH_MAX, HEALTH_MIN};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::{ImportError, ImportResult};

// ===== 列名别名（第一个命中的列生效）=====

const ALIAS_ASSET_ID: &[&str] = &["asset_id", "tank_id", "id"];
const ALIAS_FARM_ID: &[&str] = &["farm_id"];
const ALIAS_EVENT_ID: &[&str] = &["event_id"];
const ALIAS_NAME: &[&str] = &["name", "asset_name"];
const ALIAS_COMPANY_ID: &[&str] = &["company_id"];
const ALIAS_COMPANY_NAME: &[&str] = &["company_name", "company"];
const ALIAS_ASSET_TYPE: &[&str] = &["asset_type", "asset_type_name", "type"];
const ALIAS_MATERIAL: &[&str] = &["material", "material_name"];
const ALIAS_CONTENT: &[&str] = &["content", "content_name"];
const ALIAS_LOCATION_NAME: &[&str] = &["location_name", "location"];
const ALIAS_LOCATION_CITY: &[&str] = &["location_city", "city"];

pub struct FieldMapper {
    cleaner: DataCleaner,
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldMapper {
    pub fn new() -> Self {
        Self { cleaner: DataCleaner }
    }

    // ===== 取值辅助 =====

    /// 按别名列表取文本字段（空白/占位符归一为 None）
    fn text_field(&self, record: &RawRecord, aliases: &[&str]) -> Option<String> {
        for alias in aliases {
            if let Some(text) = record.value(alias).as_text() {
                if let Some(cleaned) = self.cleaner.normalize_null(Some(text.to_string())) {
                    return Some(cleaned);
                }
            }
        }
        None
    }

    /// 必填文本字段,缺失即行级失败
    fn required_field(
        &self,
        record: &RawRecord,
        aliases: &[&str],
        field: &str,
    ) -> ImportResult<String> {
        self.text_field(record, aliases)
            .ok_or_else(|| ImportError::MissingRequiredField {
                row: record.row_number,
                field: field.to_string(),
            })
    }

    /// 浮点字段: 缺失 → None,存在但不可解析 → 行级失败
    fn f64_field(
        &self,
        record: &RawRecord,
        aliases: &[&str],
        field: &str,
    ) -> ImportResult<Option<f64>> {
        match self.text_field(record, aliases) {
            None => Ok(None),
            Some(text) => self.cleaner.parse_f64(&text).map(Some).ok_or_else(|| {
                ImportError::TypeConversionError {
                    row: record.row_number,
                    field: field.to_string(),
                    message: format!("无法解析为数值: {}", text),
                }
            }),
        }
    }

    /// 整数字段
    fn i64_field(
        &self,
        record: &RawRecord,
        aliases: &[&str],
        field: &str,
    ) -> ImportResult<Option<i64>> {
        match self.text_field(record, aliases) {
            None => Ok(None),
            Some(text) => self.cleaner.parse_i64(&text).map(Some).ok_or_else(|| {
                ImportError::TypeConversionError {
                    row: record.row_number,
                    field: field.to_string(),
                    message: format!("无法解析为整数: {}", text),
                }
            }),
        }
    }

    /// 日期时间字段: 不可解析视为未提供（宽容语义）
    fn datetime_field(
        &self,
        record: &RawRecord,
        alias: &str,
    ) -> Option<chrono::DateTime<chrono::Utc>> {
        self.text_field(record, &[alias])
            .and_then(|text| self.cleaner.parse_datetime(&text))
    }

    // ===== 映射入口 =====

    /// 资产行映射
    pub fn map_asset(&self, record: &RawRecord) -> ImportResult<NormalizedAssetRecord> {
        let asset_id = self.required_field(record, ALIAS_ASSET_ID, "asset_id")?;
        let name = self.required_field(record, ALIAS_NAME, "name")?;

        let health = self.i64_field(record, &["health"], "health")?;
        if let Some(value) = health {
            if !(HEALTH_MIN..=HEALTH_MAX).contains(&value) {
                return Err(ImportError::ValueRangeError {
                    row: record.row_number,
                    field: "health".to_string(),
                    value,
                    min: HEALTH_MIN,
                    max: HEALTH_MAX,
                });
            }
        }

        Ok(NormalizedAssetRecord {
            asset_id,
            name: Some(name),
            description: self.text_field(record, &["description"]),
            status: self.text_field(record, &["status"]),
            installation_date: self.datetime_field(record, "installation_date"),
            manufactured_date: self.datetime_field(record, "manufactured_date"),
            commission_date: self.datetime_field(record, "commission_date"),
            decommission_date: self.datetime_field(record, "decommission_date"),
            latitude: self.f64_field(record, &["latitude"], "latitude")?,
            longitude: self.f64_field(record, &["longitude"], "longitude")?,
            health,
            capacity: self.f64_field(record, &["capacity"], "capacity")?,
            current_volume: self.f64_field(record, &["current_volume"], "current_volume")?,
            diameter: self.f64_field(record, &["diameter"], "diameter")?,
            height: self.f64_field(record, &["height"], "height")?,
            model_id: self.text_field(record, &["model_id"]),
            company_id: self.text_field(record, ALIAS_COMPANY_ID),
            company_name: self.text_field(record, ALIAS_COMPANY_NAME),
            farm_id: self.text_field(record, ALIAS_FARM_ID),
            asset_type_name: self.text_field(record, ALIAS_ASSET_TYPE),
            material_name: self.text_field(record, ALIAS_MATERIAL),
            content_name: self.text_field(record, ALIAS_CONTENT),
            location_name: self.text_field(record, ALIAS_LOCATION_NAME),
            location_city: self.text_field(record, ALIAS_LOCATION_CITY),
            row_number: record.row_number,
        })
    }

    /// 厂区行映射
    pub fn map_farm(&self, record: &RawRecord) -> ImportResult<NormalizedFarmRecord> {
        let farm_id = self.required_field(record, ALIAS_FARM_ID, "farm_id")?;
        let name = self.required_field(record, ALIAS_NAME, "name")?;

        // 状态不可识别视为未提供,不失败整行
        let status = self
            .text_field(record, &["status"])
            .and_then(|text| FarmStatus::parse(&text));

        let operational_since = self
            .text_field(record, &["operational_since"])
            .and_then(|text| self.cleaner.parse_date(&text));

        Ok(NormalizedFarmRecord {
            farm_id,
            name: Some(name),
            description: self.text_field(record, &["description"]),
            status,
            operational_since,
            company_id: self.text_field(record, ALIAS_COMPANY_ID),
            company_name: self.text_field(record, ALIAS_COMPANY_NAME),
            location_name: self.text_field(record, ALIAS_LOCATION_NAME),
            location_city: self.text_field(record, ALIAS_LOCATION_CITY),
            row_number: record.row_number,
        })
    }

    /// 事件行映射（只追加路径）
    pub fn map_event(&self, record: &RawRecord) -> ImportResult<NormalizedEventRecord> {
        let event_id = self.required_field(record, ALIAS_EVENT_ID, "event_id")?;
        let asset_id = self.required_field(record, ALIAS_ASSET_ID, "asset_id")?;

        Ok(NormalizedEventRecord {
            event_id,
            asset_id,
            title: self.text_field(record, &["title"]),
            event_type_name: self.text_field(record, &["event_type", "event_type_name"]),
            start_date: self.datetime_field(record, "start_date"),
            end_date: self.datetime_field(record, "end_date"),
            event_status: self.text_field(record, &["event_status"]),
            description: self.text_field(record, &["description"]),
            performed_by: self.text_field(record, &["performed_by"]),
            cost: self.text_field(record, &["cost"]),
            row_number: record.row_number,
        })
    }
}
