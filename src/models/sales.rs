use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// 销售记录 (CSV 中的一行)
///
/// `date` / `region` 只在对应过滤条件生效时才会被解析.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesRecord {
    pub row: usize,              // 数据行号 (从1开始, 不含表头)
    pub product: String,         // 商品名称原文
    pub date: Option<NaiveDate>, // 交易日期
    pub region: Option<String>,  // 地区
    pub amount: Option<BigDecimal>, // 金额/数量, 空单元格为 None
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// 解析日期, 支持常见的日期与时间戳格式
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Some(date);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
}
