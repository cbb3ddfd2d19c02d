//! 各實體的合併與衍生計算。輸入都是已解析的 [`UpstreamRow`]，不做任何 I/O。

use crate::core::period::YearMonth;
use crate::domain::model::{
    AggregationLevel, FlowDirection, NationalComparisonRecord, PartnerCountryRecord,
    ProductRecord, SectorValue, Series, SummaryRecord, TimeSeriesRecord, TradeFlow, UpstreamRow,
};
use std::collections::HashMap;

pub fn to_millions(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v / 1_000_000.0,
        _ => 0.0,
    }
}

/// `100 * part / total`，total 為 0 時回傳 0
pub fn percentage(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        part / total * 100.0
    } else {
        0.0
    }
}

fn first_total(rows: &[UpstreamRow]) -> Option<f64> {
    rows.first().and_then(|row| row.metric_fob)
}

pub fn summarize(label: String, export_rows: &[UpstreamRow], import_rows: &[UpstreamRow]) -> SummaryRecord {
    SummaryRecord::new(
        label,
        to_millions(first_total(export_rows)),
        to_millions(first_total(import_rows)),
    )
}

fn monthly_lookup(rows: &[UpstreamRow]) -> HashMap<(i32, u32), f64> {
    let mut lookup = HashMap::new();
    for row in rows {
        if let (Some(year), Some(month)) = (row.year, row.month_of_year()) {
            *lookup.entry((year, month)).or_insert(0.0) += row.metric_fob.unwrap_or(0.0);
        }
    }
    lookup
}

/// 依請求區間的月份順序輸出，上游缺的月份補 0
pub fn summary_history(
    from: YearMonth,
    to: YearMonth,
    export_rows: &[UpstreamRow],
    import_rows: &[UpstreamRow],
) -> Vec<SummaryRecord> {
    let exports = monthly_lookup(export_rows);
    let imports = monthly_lookup(import_rows);

    YearMonth::range_inclusive(from, to)
        .map(|month| {
            let key = (month.year, month.month);
            SummaryRecord::new(
                month.label(),
                to_millions(exports.get(&key).copied()),
                to_millions(imports.get(&key).copied()),
            )
        })
        .collect()
}

pub fn merge_time_series(
    responses: &[(FlowDirection, Vec<UpstreamRow>)],
    series: Series,
    monthly: bool,
    include_sectors: bool,
) -> Vec<TimeSeriesRecord> {
    let mut records: HashMap<String, TimeSeriesRecord> = HashMap::new();

    for (flow, rows) in responses {
        for row in rows {
            let Some(year) = row.year else {
                tracing::debug!("Skipping time-series row without year: {:?}", row);
                continue;
            };
            let month = if monthly {
                row.month_of_year().map(|m| format!("{:02}", m))
            } else {
                None
            };
            let key = match &month {
                Some(m) => format!("{}-{}", year, m),
                None => year.to_string(),
            };

            let record = records.entry(key.clone()).or_insert_with(|| TimeSeriesRecord {
                period: key,
                year: year.to_string(),
                month,
                exports: None,
                imports: None,
                current: None,
                balance: None,
                sectors: None,
            });

            let value = to_millions(row.metric_fob);
            let slot = match flow {
                FlowDirection::Export => &mut record.exports,
                FlowDirection::Import => &mut record.imports,
            };
            *slot = Some(slot.unwrap_or(0.0) + value);

            if include_sectors {
                if let Some(name) = row.isic_section.as_deref().filter(|s| !s.is_empty()) {
                    record.sectors.get_or_insert_with(Vec::new).push(SectorValue {
                        code: row.sector_code(),
                        name: name.to_string(),
                        value,
                    });
                }
            }
        }
    }

    let mut results: Vec<TimeSeriesRecord> = records.into_values().collect();
    for record in &mut results {
        if let (Some(exports), Some(imports)) = (record.exports, record.imports) {
            match series {
                Series::Current => record.current = Some(exports + imports),
                Series::Balance => record.balance = Some(exports - imports),
                Series::Export | Series::Import => {}
            }
        }
    }

    // YYYY 與 YYYY-MM 都可以直接用字串排序
    results.sort_by(|a, b| a.period.cmp(&b.period));
    results
}

fn partner_metric(record: &PartnerCountryRecord, flow: TradeFlow) -> Option<f64> {
    match flow {
        TradeFlow::Export => record.exports,
        TradeFlow::Import => record.imports,
        TradeFlow::Current => record.current,
    }
}

pub fn merge_partner_countries(
    responses: &[(FlowDirection, Vec<UpstreamRow>)],
    flow: TradeFlow,
    top_n: usize,
) -> Vec<PartnerCountryRecord> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut results: Vec<PartnerCountryRecord> = Vec::new();

    for (direction, rows) in responses {
        for row in rows {
            let Some(country) = row.country_label() else {
                continue;
            };
            let position = *index.entry(country.to_string()).or_insert_with(|| {
                results.push(PartnerCountryRecord {
                    country: country.to_string(),
                    exports: None,
                    imports: None,
                    current: None,
                    balance: None,
                    percentage: 0.0,
                });
                results.len() - 1
            });

            let record = &mut results[position];
            let value = to_millions(row.metric_fob);
            let slot = match direction {
                FlowDirection::Export => &mut record.exports,
                FlowDirection::Import => &mut record.imports,
            };
            *slot = Some(slot.unwrap_or(0.0) + value);
        }
    }

    let mut total = 0.0;
    for record in &mut results {
        let exports = record.exports.unwrap_or(0.0);
        let imports = record.imports.unwrap_or(0.0);
        record.current = Some(exports + imports);
        record.balance = Some(exports - imports);
        total += partner_metric(record, flow).unwrap_or(0.0);
    }

    for record in &mut results {
        record.percentage = match partner_metric(record, flow) {
            Some(value) => percentage(value, total),
            None => 0.0,
        };
    }

    results.sort_by(|a, b| {
        let a = partner_metric(a, flow).unwrap_or(0.0);
        let b = partner_metric(b, flow).unwrap_or(0.0);
        b.total_cmp(&a)
    });
    results.truncate(top_n);
    results
}

pub fn rank_products(rows: &[UpstreamRow], aggregation: AggregationLevel, top_n: usize) -> Vec<ProductRecord> {
    let mut products: Vec<ProductRecord> = rows
        .iter()
        .map(|row| ProductRecord {
            code: aggregation.code_of(row),
            description: aggregation.description_of(row),
            value: to_millions(row.metric_fob),
            quantity: None,
            weight: row.metric_kg.filter(|w| w.is_finite()),
            percentage: 0.0,
        })
        .collect();

    let total: f64 = products.iter().map(|p| p.value).sum();
    for product in &mut products {
        product.percentage = percentage(product.value, total);
    }

    products.sort_by(|a, b| b.value.total_cmp(&a.value));
    products.truncate(top_n);
    products
}

/// `region_name` 與上游 `state` 欄位逐字比對 (兩者皆為 UTF-8)
pub fn national_comparison(
    national_rows: &[UpstreamRow],
    region_rows: &[UpstreamRow],
    state_rows: &[UpstreamRow],
    region_name: &str,
) -> NationalComparisonRecord {
    let national_total = first_total(national_rows).unwrap_or(0.0);
    let region_total = first_total(region_rows).unwrap_or(0.0);

    let mut states: Vec<(Option<&str>, f64)> = state_rows
        .iter()
        .map(|row| (row.state_label(), row.metric_fob.unwrap_or(0.0)))
        .collect();
    states.sort_by(|a, b| b.1.total_cmp(&a.1));

    let ranking = states
        .iter()
        .position(|(state, _)| *state == Some(region_name))
        .map(|index| index + 1)
        .unwrap_or(0);

    NationalComparisonRecord {
        participation: percentage(region_total, national_total),
        ranking,
    }
}
