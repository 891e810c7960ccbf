use bigdecimal::{BigDecimal, Zero};
use rayon::prelude::*;

use crate::error::AnalysisError;
use crate::models::{SalesQuery, SalesRecord};
use crate::service::phonetic::ProductMatcher;
use crate::source::{load_sales, LoadOptions};

/// 聚合统计
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSummary {
    pub total_rows: usize,
    pub cluster_rows: usize,
    pub filtered_rows: usize,
    pub total: BigDecimal,
}

/// 读取 → 聚类匹配 → 过滤 → 求和
///
/// 没有匹配记录时返回 0, 不是错误.
pub fn aggregate(query: &SalesQuery) -> Result<BigDecimal, AnalysisError> {
    aggregate_with_summary(query).map(|s| s.total)
}

pub fn aggregate_with_summary(query: &SalesQuery) -> Result<AggregateSummary, AnalysisError> {
    let options = LoadOptions {
        need_date: query.date_range.is_some(),
        need_region: query.regions.is_some(),
    };
    let records = load_sales(&query.file_path, &query.columns, options)?;
    let summary = aggregate_records(query, &records);

    tracing::info!(
        product = %query.product_name,
        mode = ?query.mode,
        threshold = query.threshold,
        total_rows = summary.total_rows,
        cluster_rows = summary.cluster_rows,
        filtered_rows = summary.filtered_rows,
        total = %summary.total,
        "销售聚合完成"
    );

    Ok(summary)
}

/// 对已加载的记录做聚类和过滤求和
pub fn aggregate_records(query: &SalesQuery, records: &[SalesRecord]) -> AggregateSummary {
    let matcher = ProductMatcher::new(&query.product_name, query.mode, query.threshold);

    // 逐行匹配互不依赖, 并行计算
    let cluster: Vec<&SalesRecord> = records
        .par_iter()
        .filter(|r| matcher.matches(&r.product))
        .collect();

    let kept: Vec<&SalesRecord> = cluster
        .iter()
        .copied()
        .filter(|r| match (&query.date_range, r.date) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(range), Some(date)) => range.contains(date),
        })
        .filter(|r| query.region_matches(r.region.as_deref()))
        .collect();

    let total = kept
        .iter()
        .filter_map(|r| r.amount.as_ref())
        .fold(BigDecimal::zero(), |acc, amount| acc + amount);

    AggregateSummary {
        total_rows: records.len(),
        cluster_rows: cluster.len(),
        filtered_rows: kept.len(),
        total,
    }
}
