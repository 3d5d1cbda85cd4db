// ==========================================
// 罐区资产台账系统 - 遗留库来源
// ==========================================
// 职责: 将遗留 SQLite 库的行转为与 CSV 同构的 RawRecord 流
// 做法: JOIN 遗留引用表,把数值外键还原为名称列,
//       下游走同一条规范化/解析/对账管线
// 红线: LIMIT/OFFSET 分页,整库不落内存
// ==========================================

use crate::domain::import::RawRecord;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::source::RecordSource;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags};
use std::collections::HashMap;
use std::path::Path;

/// 默认分页批量
pub const DEFAULT_BATCH_SIZE: i64 = 500;

// ==========================================
// LegacyDbSource - 遗留 SQLite 库来源
// ==========================================
pub struct LegacyDbSource {
    name: String,
    conn: Connection,
    query: &'static str,
    columns: &'static [&'static str],
    batch_size: i64,
    offset: i64,
    /// 当前页缓冲（倒序存放,pop 即下一行）
    buffer: Vec<RawRecord>,
    exhausted: bool,
    row_number: usize,
}

// 遗留资产行: 外键 JOIN 还原为名称列,列名对齐 CSV 逻辑列
const LEGACY_ASSETS_QUERY: &str = r#"
    SELECT a.asset_id, a.company_id, a.farm_id, a.name, a.description,
           a.status, a.installation_date, a.manufactured_date,
           a.commission_date, a.decommission_date, a.latitude, a.longitude,
           a.capacity, a.current_volume, a.diameter, a.height, a.model_id,
           t.name AS asset_type, m.name AS material, c.name AS content,
           l.name AS location_name, l.city AS location_city
    FROM assets a
    LEFT JOIN asset_types t ON t.id = a.asset_type_id
    LEFT JOIN materials m ON m.id = a.material_id
    LEFT JOIN contents c ON c.id = a.content_id
    LEFT JOIN locations l ON l.location_id = a.location_id
    ORDER BY a.asset_id
    LIMIT ?1 OFFSET ?2
"#;

const LEGACY_ASSETS_COLUMNS: &[&str] = &[
    "asset_id",
    "company_id",
    "farm_id",
    "name",
    "description",
    "status",
    "installation_date",
    "manufactured_date",
    "commission_date",
    "decommission_date",
    "latitude",
    "longitude",
    "capacity",
    "current_volume",
    "diameter",
    "height",
    "model_id",
    "asset_type",
    "material",
    "content",
    "location_name",
    "location_city",
];

const LEGACY_FARMS_QUERY: &str = r#"
    SELECT f.farm_id, f.company_id, f.name, f.description, f.status,
           f.operational_since,
           l.name AS location_name, l.city AS location_city
    FROM farms f
    LEFT JOIN locations l ON l.location_id = f.location_id
    ORDER BY f.farm_id
    LIMIT ?1 OFFSET ?2
"#;

const LEGACY_FARMS_COLUMNS: &[&str] = &[
    "farm_id",
    "company_id",
    "name",
    "description",
    "status",
    "operational_since",
    "location_name",
    "location_city",
];

const LEGACY_EVENTS_QUERY: &str = r#"
    SELECT e.event_id, e.asset_id, e.title, e.start_date, e.end_date,
           e.event_status, e.description, e.performed_by, e.cost,
           t.name AS event_type
    FROM asset_events e
    LEFT JOIN event_types t ON t.id = e.event_type_id
    ORDER BY e.event_id
    LIMIT ?1 OFFSET ?2
"#;

const LEGACY_EVENTS_COLUMNS: &[&str] = &[
    "event_id",
    "asset_id",
    "title",
    "start_date",
    "end_date",
    "event_status",
    "description",
    "performed_by",
    "cost",
    "event_type",
];

impl LegacyDbSource {
    /// 打开遗留库的资产流
    pub fn assets<P: AsRef<Path>>(db_path: P, batch_size: i64) -> ImportResult<Self> {
        Self::open(db_path, LEGACY_ASSETS_QUERY, LEGACY_ASSETS_COLUMNS, batch_size)
    }

    /// 打开遗留库的厂区流
    pub fn farms<P: AsRef<Path>>(db_path: P, batch_size: i64) -> ImportResult<Self> {
        Self::open(db_path, LEGACY_FARMS_QUERY, LEGACY_FARMS_COLUMNS, batch_size)
    }

    /// 打开遗留库的事件流
    pub fn events<P: AsRef<Path>>(db_path: P, batch_size: i64) -> ImportResult<Self> {
        Self::open(db_path, LEGACY_EVENTS_QUERY, LEGACY_EVENTS_COLUMNS, batch_size)
    }

    fn open<P: AsRef<Path>>(
        db_path: P,
        query: &'static str,
        columns: &'static [&'static str],
        batch_size: i64,
    ) -> ImportResult<Self> {
        let path = db_path.as_ref();
        if !path.exists() {
            return Err(ImportError::SourceNotFound(path.display().to_string()));
        }

        // 只读打开,迁移不得改写遗留库
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| ImportError::LegacyDbError(e.to_string()))?;

        Ok(Self {
            name: path.display().to_string(),
            conn,
            query,
            columns,
            batch_size: if batch_size < 1 { DEFAULT_BATCH_SIZE } else { batch_size },
            offset: 0,
            buffer: Vec::new(),
            exhausted: false,
            row_number: 0,
        })
    }

    /// 遗留列值统一转文本,NULL → 缺列（下游按 Missing 处理）
    fn value_to_text(value: ValueRef) -> Option<String> {
        match value {
            ValueRef::Null => None,
            ValueRef::Integer(i) => Some(i.to_string()),
            ValueRef::Real(f) => Some(f.to_string()),
            ValueRef::Text(t) => Some(String::from_utf8_lossy(t).to_string()),
            ValueRef::Blob(_) => None,
        }
    }

    fn fetch_next_page(&mut self) -> ImportResult<()> {
        let mut stmt = self
            .conn
            .prepare(self.query)
            .map_err(|e| ImportError::LegacyDbError(e.to_string()))?;
        let mut rows = stmt
            .query(params![self.batch_size, self.offset])
            .map_err(|e| ImportError::LegacyDbError(e.to_string()))?;

        let mut page = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| ImportError::LegacyDbError(e.to_string()))?
        {
            self.row_number += 1;
            let mut fields = HashMap::new();
            for (idx, column) in self.columns.iter().enumerate() {
                let value = row
                    .get_ref(idx)
                    .map_err(|e| ImportError::LegacyDbError(e.to_string()))?;
                if let Some(text) = Self::value_to_text(value) {
                    fields.insert((*column).to_string(), text);
                }
            }
            page.push(RawRecord::new(self.row_number, fields));
        }

        if (page.len() as i64) < self.batch_size {
            self.exhausted = true;
        }
        self.offset += page.len() as i64;
        page.reverse();
        self.buffer = page;
        Ok(())
    }
}

impl RecordSource for LegacyDbSource {
    fn next_record(&mut self) -> ImportResult<Option<RawRecord>> {
        if self.buffer.is_empty() {
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_next_page()?;
            if self.buffer.is_empty() {
                return Ok(None);
            }
        }
        Ok(self.buffer.pop())
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn legacy_fixture() -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        let conn = Connection::open(file.path()).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE materials (id INTEGER PRIMARY KEY, name TEXT);
            CREATE TABLE contents (id INTEGER PRIMARY KEY, name TEXT);
            CREATE TABLE asset_types (id INTEGER PRIMARY KEY, name TEXT);
            CREATE TABLE locations (
                location_id INTEGER PRIMARY KEY, name TEXT, city TEXT
            );
            CREATE TABLE farms (
                farm_id TEXT PRIMARY KEY, company_id TEXT, location_id INTEGER,
                name TEXT, description TEXT, status TEXT, operational_since TEXT
            );
            CREATE TABLE assets (
                asset_id TEXT PRIMARY KEY, company_id TEXT, location_id INTEGER,
                farm_id TEXT, name TEXT, asset_type_id INTEGER, description TEXT,
                status TEXT, installation_date TEXT, manufactured_date TEXT,
                commission_date TEXT, decommission_date TEXT,
                latitude REAL, longitude REAL, capacity REAL,
                current_volume REAL, diameter REAL, height REAL, model_id TEXT,
                material_id INTEGER, content_id INTEGER
            );
            CREATE TABLE event_types (id INTEGER PRIMARY KEY, name TEXT);
            CREATE TABLE asset_events (
                event_id TEXT PRIMARY KEY, asset_id TEXT, title TEXT,
                event_type_id INTEGER, start_date TEXT, end_date TEXT,
                event_status TEXT, description TEXT, performed_by TEXT, cost TEXT
            );

            INSERT INTO materials (id, name) VALUES (1, 'Carbon Steel');
            INSERT INTO contents (id, name) VALUES (1, 'Crude Oil');
            INSERT INTO asset_types (id, name) VALUES (1, 'Storage Tank');
            INSERT INTO locations (location_id, name, city)
                VALUES (1, 'North Terminal', 'Houston');
            INSERT INTO assets (
                asset_id, company_id, farm_id, name, asset_type_id,
                status, material_id, content_id, location_id, capacity
            ) VALUES (
                'A-001', 'COMP-1', NULL, 'Tank 101', 1,
                'active', 1, 1, 1, 5000.0
            );
            INSERT INTO assets (asset_id, company_id, name, status)
                VALUES ('A-002', 'COMP-1', 'Tank 102', 'active');
            "#,
        )
        .unwrap();
        file
    }

    #[test]
    fn test_assets_stream_surfaces_reference_names() {
        let fixture = legacy_fixture();
        let mut source = LegacyDbSource::assets(fixture.path(), 500).unwrap();

        let first = source.next_record().unwrap().unwrap();
        assert_eq!(first.value("asset_id").as_text(), Some("A-001"));
        assert_eq!(first.value("material").as_text(), Some("Carbon Steel"));
        assert_eq!(first.value("content").as_text(), Some("Crude Oil"));
        assert_eq!(first.value("location_city").as_text(), Some("Houston"));
        // NULL 外键 → 缺列
        assert!(first.value("farm_id").is_missing());

        let second = source.next_record().unwrap().unwrap();
        assert_eq!(second.value("asset_id").as_text(), Some("A-002"));
        assert!(second.value("material").is_missing());
        assert!(source.next_record().unwrap().is_none());
    }

    #[test]
    fn test_paged_read_crosses_page_boundary() {
        let fixture = legacy_fixture();
        // batch_size = 1 强制跨页
        let mut source = LegacyDbSource::assets(fixture.path(), 1).unwrap();
        let mut ids = Vec::new();
        while let Some(record) = source.next_record().unwrap() {
            ids.push(record.value("asset_id").as_text().unwrap().to_string());
        }
        assert_eq!(ids, vec!["A-001", "A-002"]);
    }

    #[test]
    fn test_missing_db_is_fatal() {
        let result = LegacyDbSource::assets("no_such_legacy.db", 500);
        assert!(matches!(result, Err(ImportError::SourceNotFound(_))));
    }
}
