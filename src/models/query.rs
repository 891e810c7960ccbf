use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::AnalysisError;
use crate::models::sales::parse_date;
use crate::service::phonetic::normalize_name;

/// 聚类匹配模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// 语音编码相同且相似度达到阈值
    #[default]
    Phonetic,
    /// 仅相似度达到阈值
    Similarity,
}

/// 地区过滤: 单个地区或地区集合
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RegionFilter {
    One(String),
    Many(Vec<String>),
}

/// 列名覆盖 (不填则按别名自动识别)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnOverrides {
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

/// 请求参数 (调试接口 params JSON)
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregateParams {
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    pub product_name: String,
    pub similarity_threshold: f64,
    #[serde(default)]
    pub match_mode: MatchMode,
    #[serde(default)]
    pub date_start: Option<String>,
    #[serde(default)]
    pub date_end: Option<String>,
    #[serde(default)]
    pub region: Option<RegionFilter>,
    #[serde(default)]
    pub columns: ColumnOverrides,
}

impl AggregateParams {
    pub fn new(file_path: impl Into<PathBuf>, product_name: &str, similarity_threshold: f64) -> Self {
        Self {
            file_path: Some(file_path.into()),
            product_name: product_name.to_string(),
            similarity_threshold,
            match_mode: MatchMode::default(),
            date_start: None,
            date_end: None,
            region: None,
            columns: ColumnOverrides::default(),
        }
    }
}

/// 闭区间日期范围, 任一端可缺省
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// 校验后的聚合查询
#[derive(Debug, Clone)]
pub struct SalesQuery {
    pub file_path: PathBuf,
    pub product_name: String,
    pub threshold: f64,
    pub mode: MatchMode,
    pub date_range: Option<DateRange>,
    /// 已小写、去空白
    pub regions: Option<Vec<String>>,
    pub columns: ColumnOverrides,
}

impl SalesQuery {
    pub fn region_matches(&self, region: Option<&str>) -> bool {
        match (&self.regions, region) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(wanted), Some(value)) => {
                let value = value.trim().to_lowercase();
                wanted.iter().any(|w| *w == value)
            }
        }
    }
}

fn parse_bound(name: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, AnalysisError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => parse_date(value)
            .map(Some)
            .ok_or_else(|| AnalysisError::Validation(format!("{name} '{value}' is not a valid date"))),
    }
}

impl TryFrom<AggregateParams> for SalesQuery {
    type Error = AnalysisError;

    fn try_from(params: AggregateParams) -> Result<Self, Self::Error> {
        let file_path = params.file_path.ok_or_else(|| {
            AnalysisError::Validation("file_path is required (upload a file or pass file_path)".to_string())
        })?;

        if normalize_name(&params.product_name).is_empty() {
            return Err(AnalysisError::Validation(
                "product_name must contain at least one letter or digit".to_string(),
            ));
        }

        let threshold = params.similarity_threshold;
        if !threshold.is_finite() || !(0.0..=100.0).contains(&threshold) {
            return Err(AnalysisError::Validation(format!(
                "similarity_threshold must be between 0 and 100, got {threshold}"
            )));
        }

        let start = parse_bound("date_start", params.date_start.as_deref())?;
        let end = parse_bound("date_end", params.date_end.as_deref())?;
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(AnalysisError::Validation(format!(
                    "date_start {s} is after date_end {e}"
                )));
            }
        }
        let date_range = (start.is_some() || end.is_some()).then_some(DateRange { start, end });

        let regions = match params.region {
            None => None,
            Some(filter) => {
                let raw = match filter {
                    RegionFilter::One(r) => vec![r],
                    RegionFilter::Many(rs) => rs,
                };
                let cleaned: Vec<String> = raw.iter().map(|r| r.trim().to_lowercase()).collect();
                if cleaned.is_empty() || cleaned.iter().any(String::is_empty) {
                    return Err(AnalysisError::Validation("region must not be empty".to_string()));
                }
                Some(cleaned)
            }
        };

        Ok(Self {
            file_path,
            product_name: params.product_name,
            threshold,
            mode: params.match_mode,
            date_range,
            regions,
            columns: params.columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> AggregateParams {
        AggregateParams::new("/tmp/sales.csv", "Widget", 80.0)
    }

    #[test]
    fn deserializes_minimal_params_with_defaults() {
        let p: AggregateParams = serde_json::from_value(json!({
            "product_name": "Widget",
            "similarity_threshold": 75
        }))
        .unwrap();
        assert_eq!(p.match_mode, MatchMode::Phonetic);
        assert!(p.file_path.is_none());
        assert!(p.region.is_none());
    }

    #[test]
    fn rejects_unknown_keys() {
        let result: Result<AggregateParams, _> = serde_json::from_value(json!({
            "product_name": "Widget",
            "similarity_threshold": 75,
            "min_units": 10
        }));
        assert!(result.is_err());
    }

    #[test]
    fn region_accepts_string_or_list() {
        let p: AggregateParams = serde_json::from_value(json!({
            "product_name": "Widget",
            "similarity_threshold": 75,
            "region": ["East", " west "]
        }))
        .unwrap();
        let mut p = p;
        p.file_path = Some("/tmp/x.csv".into());
        let q = SalesQuery::try_from(p).unwrap();
        assert_eq!(q.regions, Some(vec!["east".to_string(), "west".to_string()]));
        assert!(q.region_matches(Some("EAST")));
        assert!(!q.region_matches(Some("North")));
        assert!(!q.region_matches(None));
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let mut p = params();
        p.similarity_threshold = 120.0;
        assert!(matches!(SalesQuery::try_from(p), Err(AnalysisError::Validation(_))));

        let mut p = params();
        p.similarity_threshold = -1.0;
        assert!(matches!(SalesQuery::try_from(p), Err(AnalysisError::Validation(_))));
    }

    #[test]
    fn reversed_date_range_is_rejected() {
        let mut p = params();
        p.date_start = Some("2024-02-01".to_string());
        p.date_end = Some("2024-01-01".to_string());
        assert!(matches!(SalesQuery::try_from(p), Err(AnalysisError::Validation(_))));
    }

    #[test]
    fn malformed_date_is_rejected() {
        let mut p = params();
        p.date_end = Some("next tuesday".to_string());
        assert!(matches!(SalesQuery::try_from(p), Err(AnalysisError::Validation(_))));
    }

    #[test]
    fn blank_product_or_missing_file_is_rejected() {
        let mut p = params();
        p.product_name = "  --  ".to_string();
        assert!(matches!(SalesQuery::try_from(p), Err(AnalysisError::Validation(_))));

        let mut p = params();
        p.file_path = None;
        assert!(matches!(SalesQuery::try_from(p), Err(AnalysisError::Validation(_))));
    }

    #[test]
    fn open_ended_date_range() {
        let mut p = params();
        p.date_end = Some("2024-01-02".to_string());
        let range = SalesQuery::try_from(p).unwrap().date_range.unwrap();
        assert!(range.contains(NaiveDate::from_ymd_opt(1999, 1, 1).unwrap()));
        assert!(range.contains(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()));
    }
}
