// ==========================================
// 罐区资产台账系统 - 记录来源抽象与 CSV 来源
// ==========================================
// 职责: 将 CSV / 遗留库统一为逐行 RawRecord 流
// 红线: 流式读取,不整文件载入内存;
//       打开失败是致命错误,单行解析失败是行级错误
// ==========================================

use crate::domain::import::RawRecord;
use crate::importer::error::{ImportError, ImportResult};
use csv::{ReaderBuilder, StringRecordsIntoIter};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

// ==========================================
// RecordSource Trait
// ==========================================
// 实现者: CsvSource（CSV 文件）、LegacyDbSource（遗留 SQLite 库）
pub trait RecordSource: Send {
    /// 取下一条原始记录
    ///
    /// # 返回
    /// - Ok(Some(record)): 下一行
    /// - Ok(None): 来源耗尽
    /// - Err: 读取失败
    fn next_record(&mut self) -> ImportResult<Option<RawRecord>>;

    /// 来源名称（审计与日志用）
    fn source_name(&self) -> &str;
}

// ==========================================
// CsvSource - CSV 文件来源
// ==========================================
pub struct CsvSource {
    name: String,
    headers: Vec<String>,
    records: StringRecordsIntoIter<File>,
    /// 数据行计数（1 起,不含表头）
    row_number: usize,
}

impl CsvSource {
    pub fn open<P: AsRef<Path>>(file_path: P) -> ImportResult<Self> {
        let path = file_path.as_ref();

        if !path.exists() {
            return Err(ImportError::SourceNotFound(path.display().to_string()));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        Ok(Self {
            name: path.display().to_string(),
            headers,
            records: reader.into_records(),
            row_number: 0,
        })
    }
}

impl RecordSource for CsvSource {
    fn next_record(&mut self) -> ImportResult<Option<RawRecord>> {
        loop {
            let record = match self.records.next() {
                Some(result) => result?,
                None => return Ok(None),
            };
            self.row_number += 1;

            let mut row_map = HashMap::new();
            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = self.headers.get(col_idx) {
                    row_map.insert(header.clone(), value.trim().to_string());
                }
            }

            let raw = RawRecord::new(self.row_number, row_map);
            // 跳过完全空白的行
            if raw.is_blank() {
                continue;
            }
            return Ok(Some(raw));
        }
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
