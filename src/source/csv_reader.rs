use bigdecimal::BigDecimal;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use crate::error::AnalysisError;
use crate::models::{parse_date, ColumnOverrides, SalesRecord};

const PRODUCT_ALIASES: &[&str] = &["product", "product_name", "item", "item_name", "name"];
const AMOUNT_ALIASES: &[&str] = &["amount", "sales", "quantity", "units", "qty", "total", "revenue"];
const DATE_ALIASES: &[&str] = &["date", "transaction_date", "sale_date", "order_date"];
const REGION_ALIASES: &[&str] = &["region", "city", "area", "location", "territory"];

/// 金额小数位 (含指数) 的上限, 超出后求和时的对齐代价不可控
const MAX_AMOUNT_SCALE: i64 = 64;

/// 需要读取哪些可选列
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    pub need_date: bool,
    pub need_region: bool,
}

/// 解析出的列下标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    pub product: usize,
    pub amount: usize,
    pub date: Option<usize>,
    pub region: Option<usize>,
}

/// 表头归一化: 小写, 非字母数字折叠为下划线
fn header_key(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        if c.is_alphanumeric() {
            key.extend(c.to_lowercase());
        } else if !key.ends_with('_') {
            key.push('_');
        }
    }
    key.trim_matches('_').to_string()
}

fn find_column(
    headers: &[String],
    role: &str,
    explicit: Option<&str>,
    aliases: &[&str],
) -> Result<Option<usize>, AnalysisError> {
    if let Some(name) = explicit {
        let wanted = header_key(name);
        return headers
            .iter()
            .position(|h| *h == wanted)
            .map(Some)
            .ok_or_else(|| AnalysisError::Schema(format!("{role} column '{name}' not found")));
    }
    Ok(aliases
        .iter()
        .find_map(|alias| headers.iter().position(|h| h == alias)))
}

fn require(index: Option<usize>, role: &str, aliases: &[&str]) -> Result<usize, AnalysisError> {
    index.ok_or_else(|| {
        AnalysisError::Schema(format!(
            "missing {role} column (expected one of: {})",
            aliases.join(", ")
        ))
    })
}

/// 按表头解析列位置, 日期/地区列仅在需要时才强制存在
pub fn resolve_columns(
    raw_headers: &StringRecord,
    overrides: &ColumnOverrides,
    options: LoadOptions,
) -> Result<ColumnIndex, AnalysisError> {
    let headers: Vec<String> = raw_headers.iter().map(header_key).collect();

    let product = find_column(&headers, "product", overrides.product.as_deref(), PRODUCT_ALIASES)?;
    let amount = find_column(&headers, "amount", overrides.amount.as_deref(), AMOUNT_ALIASES)?;
    let date = find_column(&headers, "date", overrides.date.as_deref(), DATE_ALIASES)?;
    let region = find_column(&headers, "region", overrides.region.as_deref(), REGION_ALIASES)?;

    Ok(ColumnIndex {
        product: require(product, "product", PRODUCT_ALIASES)?,
        amount: require(amount, "amount", AMOUNT_ALIASES)?,
        date: if options.need_date {
            Some(require(date, "date", DATE_ALIASES)?)
        } else {
            date
        },
        region: if options.need_region {
            Some(require(region, "region", REGION_ALIASES)?)
        } else {
            region
        },
    })
}

/// 解析金额单元格: 空值返回 None, 去掉千分位和前导 `$`
pub fn parse_amount(raw: &str) -> Result<Option<BigDecimal>, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let cleaned: String = value
        .strip_prefix('$')
        .unwrap_or(value)
        .chars()
        .filter(|c| *c != ',')
        .collect();
    let amount = BigDecimal::from_str(cleaned.trim()).map_err(|_| format!("'{value}' is not a number"))?;
    let (_, scale) = amount.as_bigint_and_exponent();
    if scale.abs() > MAX_AMOUNT_SCALE {
        return Err(format!(
            "'{value}' is out of range (more than {MAX_AMOUNT_SCALE} decimal places or exponent digits)"
        ));
    }
    Ok(Some(amount))
}

fn to_record(
    row: usize,
    record: &StringRecord,
    columns: ColumnIndex,
    options: LoadOptions,
) -> Result<SalesRecord, AnalysisError> {
    let cell = |idx: usize| record.get(idx).unwrap_or("");

    let amount = parse_amount(cell(columns.amount))
        .map_err(|e| AnalysisError::Schema(format!("row {row}: amount {e}")))?;

    let date = match columns.date.filter(|_| options.need_date) {
        None => None,
        Some(idx) => {
            let raw = cell(idx);
            match parse_date(raw) {
                Some(d) => Some(d),
                None if raw.trim().is_empty() => None,
                None => {
                    return Err(AnalysisError::Schema(format!(
                        "row {row}: date '{raw}' is not a valid date"
                    )))
                }
            }
        }
    };

    let region = columns
        .region
        .filter(|_| options.need_region)
        .map(|idx| cell(idx).trim().to_string())
        .filter(|r| !r.is_empty());

    Ok(SalesRecord {
        row,
        product: cell(columns.product).to_string(),
        date,
        region,
        amount,
    })
}

/// 读取销售 CSV 文件
pub fn load_sales(
    path: &Path,
    overrides: &ColumnOverrides,
    options: LoadOptions,
) -> Result<Vec<SalesRecord>, AnalysisError> {
    let metadata = std::fs::metadata(path).map_err(|e| AnalysisError::not_found(path, e))?;
    if !metadata.is_file() {
        return Err(AnalysisError::not_found(path, "not a regular file"));
    }
    let file = File::open(path).map_err(|e| AnalysisError::not_found(path, e))?;

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AnalysisError::Schema(format!("cannot read header row: {e}")))?
        .clone();
    let columns = resolve_columns(&headers, overrides, options)?;
    tracing::debug!(?columns, path = %path.display(), "resolved sales columns");

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let row = idx + 1;
        let record = result.map_err(|e| {
            if e.is_io_error() {
                AnalysisError::not_found(path, &e)
            } else {
                AnalysisError::Schema(format!("row {row}: {e}"))
            }
        })?;
        records.push(to_record(row, &record, columns, options)?);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn header_key_folds_punctuation() {
        assert_eq!(header_key(" Product Name "), "product_name");
        assert_eq!(header_key("Sale-Date"), "sale_date");
        assert_eq!(header_key("UNITS (#)"), "units");
    }

    #[test]
    fn resolves_aliases_by_priority() {
        let headers = StringRecord::from(vec!["City", "Units", "Product", "Date"]);
        let cols = resolve_columns(&headers, &ColumnOverrides::default(), LoadOptions::default()).unwrap();
        assert_eq!(cols.product, 2);
        assert_eq!(cols.amount, 1);
        assert_eq!(cols.date, Some(3));
        assert_eq!(cols.region, Some(0));
    }

    #[test]
    fn explicit_override_wins() {
        let headers = StringRecord::from(vec!["product", "amount", "net_units"]);
        let overrides = ColumnOverrides {
            amount: Some("Net Units".to_string()),
            ..Default::default()
        };
        let cols = resolve_columns(&headers, &overrides, LoadOptions::default()).unwrap();
        assert_eq!(cols.amount, 2);
    }

    #[test]
    fn missing_required_columns_are_schema_errors() {
        let headers = StringRecord::from(vec!["product", "notes"]);
        let err = resolve_columns(&headers, &ColumnOverrides::default(), LoadOptions::default());
        assert!(matches!(err, Err(AnalysisError::Schema(_))));

        let headers = StringRecord::from(vec!["product", "amount"]);
        let options = LoadOptions { need_date: true, need_region: false };
        let err = resolve_columns(&headers, &ColumnOverrides::default(), options);
        assert!(matches!(err, Err(AnalysisError::Schema(_))));
    }

    #[test]
    fn parses_amount_cells() {
        assert_eq!(parse_amount("1,250.50").unwrap(), Some(BigDecimal::from_str("1250.50").unwrap()));
        assert_eq!(parse_amount("$42").unwrap(), Some(BigDecimal::from(42)));
        assert_eq!(parse_amount("  ").unwrap(), None);
        assert!(parse_amount("lots").is_err());
    }

    #[test]
    fn amount_exponents_are_bounded() {
        assert_eq!(parse_amount("1e3").unwrap(), Some(BigDecimal::from(1000)));
        assert_eq!(parse_amount("2.5E-2").unwrap(), Some(BigDecimal::from_str("0.025").unwrap()));
        assert!(parse_amount("1e-500000000").is_err());
        assert!(parse_amount("1e999999").is_err());
        assert!(parse_amount("0.00000000000000000000000000000000000000000000000000000000000000001").is_err());
    }

    #[test]
    fn huge_exponent_row_is_a_schema_error() {
        let file = csv_file("product,amount\nWidget,100\nWidget,1e-500000000\n");
        let err = load_sales(file.path(), &ColumnOverrides::default(), LoadOptions::default()).unwrap_err();
        match err {
            AnalysisError::Schema(msg) => assert!(msg.contains("row 2"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn loads_rows_and_skips_optional_columns_when_unused() {
        let file = csv_file("product,date,region,amount\nWidget,not-a-date,East,100\nGadget,,West,\n");
        let records = load_sales(file.path(), &ColumnOverrides::default(), LoadOptions::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].product, "Widget");
        assert_eq!(records[0].amount, Some(BigDecimal::from(100)));
        assert!(records[0].date.is_none());
        assert!(records[0].region.is_none());
        assert_eq!(records[1].amount, None);
    }

    #[test]
    fn bad_date_is_reported_when_dates_are_needed() {
        let file = csv_file("product,date,amount\nWidget,not-a-date,100\n");
        let options = LoadOptions { need_date: true, need_region: false };
        let err = load_sales(file.path(), &ColumnOverrides::default(), options).unwrap_err();
        match err {
            AnalysisError::Schema(msg) => assert!(msg.contains("row 1")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_sales(
            Path::new("/definitely/not/here.csv"),
            &ColumnOverrides::default(),
            LoadOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::NotFound { .. }));
    }

    #[test]
    fn directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_sales(dir.path(), &ColumnOverrides::default(), LoadOptions::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::NotFound { .. }));
    }
}
