// ==========================================
// 罐区资产台账系统 - 数据清洗器实现
// ==========================================
// 职责: TRIM / NULL 标准化 / 自然键折叠 / 宽容类型解析
// 红线: 日期解析失败返回 None（视为未提供）,不中断行处理
// ==========================================

use crate::domain::reference::natural_key;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// 占位符值: 来源里的这些文本等价于"未提供"
const NULL_SENTINELS: &[&str] = &["n/a", "na", "none", "null", "-", "--"];

pub struct DataCleaner;

impl DataCleaner {
    /// TRIM + 可选大写
    pub fn clean_text(&self, value: &str, uppercase: bool) -> String {
        let trimmed = value.trim();
        if uppercase {
            trimmed.to_uppercase()
        } else {
            trimmed.to_string()
        }
    }

    /// NULL 标准化: 空串/空白/占位符 → None
    pub fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() || NULL_SENTINELS.contains(&trimmed.to_lowercase().as_str()) {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    /// 自然键折叠（引用数据名称匹配用）
    pub fn fold_key(&self, value: &str) -> String {
        natural_key(value)
    }

    /// 宽容整数解析（"87"、"87.0" 均接受）
    pub fn parse_i64(&self, value: &str) -> Option<i64> {
        let trimmed = value.trim();
        trimmed
            .parse::<i64>()
            .ok()
            .or_else(|| trimmed.parse::<f64>().ok().map(|f| f as i64))
    }

    /// 宽容浮点解析
    pub fn parse_f64(&self, value: &str) -> Option<f64> {
        value.trim().parse::<f64>().ok()
    }

    /// 宽容日期解析（多格式依次尝试,全部失败返回 None）
    pub fn parse_date(&self, value: &str) -> Option<NaiveDate> {
        let trimmed = value.trim();
        const FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y", "%Y/%m/%d", "%Y%m%d"];
        for format in FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
                return Some(date);
            }
        }
        // 带时间部分的来源值只取日期
        self.parse_datetime(trimmed).map(|dt| dt.date_naive())
    }

    /// 宽容日期时间解析（纯日期按当日零点补齐,UTC）
    pub fn parse_datetime(&self, value: &str) -> Option<DateTime<Utc>> {
        let trimmed = value.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Some(dt.with_timezone(&Utc));
        }

        const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M:%S"];
        for format in DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Some(Utc.from_utc_datetime(&naive));
            }
        }

        const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y", "%Y/%m/%d", "%Y%m%d"];
        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
                return date
                    .and_hms_opt(0, 0, 0)
                    .map(|naive| Utc.from_utc_datetime(&naive));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_null_sentinels() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.normalize_null(Some("  ".to_string())), None);
        assert_eq!(cleaner.normalize_null(Some("N/A".to_string())), None);
        assert_eq!(cleaner.normalize_null(Some("None".to_string())), None);
        assert_eq!(cleaner.normalize_null(Some("-".to_string())), None);
        assert_eq!(
            cleaner.normalize_null(Some("  value  ".to_string())),
            Some("value".to_string())
        );
        assert_eq!(cleaner.normalize_null(None), None);
    }

    #[test]
    fn test_fold_key_case_and_whitespace() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.fold_key("Crude  Oil"), cleaner.fold_key(" crude oil "));
    }

    #[test]
    fn test_parse_date_formats() {
        let cleaner = DataCleaner;
        let expected = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
        assert_eq!(cleaner.parse_date("2024-01-20"), Some(expected));
        assert_eq!(cleaner.parse_date("01/20/2024"), Some(expected));
        assert_eq!(cleaner.parse_date("20-01-2024"), Some(expected));
        assert_eq!(cleaner.parse_date("2024/01/20"), Some(expected));
        // 解析失败 → None,不报错
        assert_eq!(cleaner.parse_date("not-a-date"), None);
    }

    #[test]
    fn test_parse_datetime_date_only_midnight() {
        let cleaner = DataCleaner;
        let dt = cleaner.parse_datetime("2024-01-20").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-20T00:00:00+00:00");
    }

    #[test]
    fn test_parse_i64_tolerant() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.parse_i64("87"), Some(87));
        assert_eq!(cleaner.parse_i64("87.0"), Some(87));
        assert_eq!(cleaner.parse_i64("abc"), None);
    }
}
