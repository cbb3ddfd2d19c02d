use crate::core::aggregate;
use crate::core::cache_key::CacheKeyCodec;
use crate::core::caching::CachingOrchestrator;
use crate::core::period::{PeriodResolver, YearMonth};
use crate::core::upstream::UpstreamClient;
use crate::domain::model::{
    AggregationLevel, DashboardRecord, Filter, FlowDirection, NationalComparisonRecord,
    PartnerCountryRecord, Period, PeriodType, Periodicity, ProductPeriod, ProductRecord, Series,
    SummaryRecord, TimeSeriesRecord, TradeFlow, UpstreamQuery, UpstreamRow,
};
use crate::domain::ports::{Clock, SystemClock, UpstreamTransport};
use crate::utils::error::{ComexError, Result};
use crate::utils::validation::validate_year_month;
use chrono::Datelike;
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;

pub const METRIC_FOB: &str = "metricFOB";
pub const METRIC_CIF: &str = "metricCIF";
pub const METRIC_KG: &str = "metricKG";

pub const DETAIL_COUNTRY: &str = "country";
pub const DETAIL_STATE: &str = "state";
pub const DETAIL_SECTOR: &str = "ISICSection";

pub const DEFAULT_PARTNER_TOP_N: usize = 10;
pub const DEFAULT_PRODUCT_TOP_N: usize = 20;
const DASHBOARD_TOP_N: usize = 10;

/// 查詢範圍所限定的行政區
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub filter: String,
    pub id: i64,
    pub name: String,
}

impl Default for Region {
    fn default() -> Self {
        Self {
            filter: "state".to_string(),
            id: 23,
            name: "Ceará".to_string(),
        }
    }
}

impl Region {
    fn as_filter(&self) -> Filter {
        Filter {
            filter: self.filter.clone(),
            values: vec![self.id],
        }
    }
}

/// 交易統計的聚合引擎：每個入口都先查快取，miss 時才向上游查詢並合併。
pub struct AggregationEngine<T: UpstreamTransport> {
    upstream: UpstreamClient<T>,
    cache: CachingOrchestrator,
    keys: CacheKeyCodec,
    clock: Arc<dyn Clock>,
    region: Region,
}

impl<T: UpstreamTransport> AggregationEngine<T> {
    pub fn new(transport: T, cache: CachingOrchestrator) -> Self {
        Self {
            upstream: UpstreamClient::new(transport),
            cache,
            keys: CacheKeyCodec::default(),
            clock: Arc::new(SystemClock),
            region: Region::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    pub fn with_key_codec(mut self, keys: CacheKeyCodec) -> Self {
        self.keys = keys;
        self
    }

    pub fn transport(&self) -> &T {
        self.upstream.transport()
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    fn resolver(&self) -> PeriodResolver {
        PeriodResolver::new(self.clock.today())
    }

    fn regional(&self, flow: FlowDirection, period: Period) -> UpstreamQuery {
        UpstreamQuery::new(flow, period).filter(self.region.as_filter())
    }

    /// 每個方向一個查詢，並行送出並等待全部完成
    async fn query_each(
        &self,
        operation: &str,
        directions: &[FlowDirection],
        build: impl Fn(FlowDirection) -> UpstreamQuery,
    ) -> Result<Vec<(FlowDirection, Vec<UpstreamRow>)>> {
        let pending = directions.iter().map(|&direction| {
            let query = build(direction);
            async move { (direction, self.upstream.query(operation, query).await) }
        });

        join_all(pending)
            .await
            .into_iter()
            .map(|(direction, rows)| rows.map(|rows| (direction, rows)))
            .collect()
    }

    pub async fn get_summary(
        &self,
        period_type: PeriodType,
        custom_period: Option<Period>,
    ) -> Result<SummaryRecord> {
        let key = self.keys.encode(
            "summary",
            &json!({"periodType": period_type, "customPeriod": custom_period}),
        )?;

        self.cache
            .get_or_compute(&key, || self.compute_summary(period_type, custom_period.as_ref()))
            .await
    }

    async fn compute_summary(
        &self,
        period_type: PeriodType,
        custom_period: Option<&Period>,
    ) -> Result<SummaryRecord> {
        let resolved = self.resolver().resolve(period_type, custom_period)?;

        let (exports, imports) = tokio::join!(
            self.upstream.query(
                "get_summary",
                self.regional(FlowDirection::Export, resolved.period.clone())
                    .metrics(&[METRIC_FOB]),
            ),
            self.upstream.query(
                "get_summary",
                self.regional(FlowDirection::Import, resolved.period.clone())
                    .metrics(&[METRIC_FOB, METRIC_CIF]),
            ),
        );

        let summary = aggregate::summarize(resolved.label, &exports?, &imports?);
        tracing::info!(
            "📊 Summary {}: exports={:.2}M imports={:.2}M",
            summary.period,
            summary.exports,
            summary.imports
        );
        Ok(summary)
    }

    pub async fn get_summary_history(&self, from: &str, to: &str) -> Result<Vec<SummaryRecord>> {
        validate_year_month("from", from)?;
        validate_year_month("to", to)?;
        let start: YearMonth = from.parse()?;
        let end: YearMonth = to.parse()?;
        if start > end {
            return Err(ComexError::validation(format!(
                "from ({}) must not be after to ({})",
                from, to
            )));
        }

        let key = self
            .keys
            .encode("summary-history", &json!({"from": from, "to": to}))?;

        self.cache
            .get_or_compute(&key, || self.compute_summary_history(start, end))
            .await
    }

    async fn compute_summary_history(&self, start: YearMonth, end: YearMonth) -> Result<Vec<SummaryRecord>> {
        let period = Period::new(start.to_string(), end.to_string());

        let (exports, imports) = tokio::join!(
            self.upstream.query(
                "get_summary_history",
                self.regional(FlowDirection::Export, period.clone())
                    .month_detail(true)
                    .metrics(&[METRIC_FOB]),
            ),
            self.upstream.query(
                "get_summary_history",
                self.regional(FlowDirection::Import, period.clone())
                    .month_detail(true)
                    .metrics(&[METRIC_FOB, METRIC_CIF]),
            ),
        );

        Ok(aggregate::summary_history(start, end, &exports?, &imports?))
    }

    pub async fn get_time_series(
        &self,
        periodicity: Periodicity,
        series: Series,
        start_year: i32,
        end_year: Option<i32>,
        include_sectors: bool,
    ) -> Result<Vec<TimeSeriesRecord>> {
        let key = self.keys.encode(
            "timeseries",
            &json!({
                "periodicity": periodicity,
                "series": series,
                "startYear": start_year,
                "endYear": end_year,
                "includeSectors": include_sectors,
            }),
        )?;

        self.cache
            .get_or_compute(&key, || {
                self.compute_time_series(periodicity, series, start_year, end_year, include_sectors)
            })
            .await
    }

    async fn compute_time_series(
        &self,
        periodicity: Periodicity,
        series: Series,
        start_year: i32,
        end_year: Option<i32>,
        include_sectors: bool,
    ) -> Result<Vec<TimeSeriesRecord>> {
        let end_year = end_year.unwrap_or_else(|| self.resolver().reference_year());
        if start_year > end_year {
            return Err(ComexError::validation(format!(
                "startYear ({}) must not be after endYear ({})",
                start_year, end_year
            )));
        }

        let period = PeriodResolver::year_span(start_year, end_year);
        let monthly = periodicity == Periodicity::Monthly;

        let responses = self
            .query_each("get_time_series", series.directions(), |direction| {
                let query = self
                    .regional(direction, period.clone())
                    .month_detail(monthly)
                    .metrics(&[METRIC_FOB]);
                if include_sectors {
                    query.details(&[DETAIL_SECTOR])
                } else {
                    query
                }
            })
            .await?;

        let records = aggregate::merge_time_series(&responses, series, monthly, include_sectors);
        tracing::debug!("📈 Time series {}..{}: {} points", start_year, end_year, records.len());
        Ok(records)
    }

    pub async fn get_partner_countries(
        &self,
        flow: TradeFlow,
        period_type: PeriodType,
        custom_period: Option<Period>,
        top_n: Option<usize>,
    ) -> Result<Vec<PartnerCountryRecord>> {
        let top_n = top_n.unwrap_or(DEFAULT_PARTNER_TOP_N);
        validate_top_n(top_n)?;

        let key = self.keys.encode(
            "partners",
            &json!({
                "flow": flow,
                "periodType": period_type,
                "customPeriod": custom_period,
                "topN": top_n,
            }),
        )?;

        self.cache
            .get_or_compute(&key, || {
                self.compute_partner_countries(flow, period_type, custom_period.as_ref(), top_n)
            })
            .await
    }

    async fn compute_partner_countries(
        &self,
        flow: TradeFlow,
        period_type: PeriodType,
        custom_period: Option<&Period>,
        top_n: usize,
    ) -> Result<Vec<PartnerCountryRecord>> {
        if period_type == PeriodType::LastYear {
            return Err(ComexError::validation("Unsupported period type."));
        }
        let period = self.resolver().resolve(period_type, custom_period)?.period;

        let responses = self
            .query_each("get_partner_countries", flow.directions(), |direction| {
                self.regional(direction, period.clone())
                    .details(&[DETAIL_COUNTRY])
                    .metrics(&[METRIC_FOB])
            })
            .await?;

        Ok(aggregate::merge_partner_countries(&responses, flow, top_n))
    }

    pub async fn get_top_products(
        &self,
        flow: FlowDirection,
        periodicity: Periodicity,
        period: Option<ProductPeriod>,
        aggregation: AggregationLevel,
        top_n: Option<usize>,
    ) -> Result<Vec<ProductRecord>> {
        let top_n = top_n.unwrap_or(DEFAULT_PRODUCT_TOP_N);
        validate_top_n(top_n)?;

        let key = self.keys.encode(
            "products",
            &json!({
                "flow": flow,
                "periodicity": periodicity,
                "period": period,
                "aggregation": aggregation,
                "topN": top_n,
            }),
        )?;

        self.cache
            .get_or_compute(&key, || {
                self.compute_top_products(flow, periodicity, period.as_ref(), aggregation, top_n)
            })
            .await
    }

    async fn compute_top_products(
        &self,
        flow: FlowDirection,
        periodicity: Periodicity,
        period: Option<&ProductPeriod>,
        aggregation: AggregationLevel,
        top_n: usize,
    ) -> Result<Vec<ProductRecord>> {
        let query_period = match period {
            Some(ProductPeriod::Range(range)) => range.clone(),
            Some(ProductPeriod::Year(year)) => PeriodResolver::year_span(*year, *year),
            None => {
                let year = self.resolver().reference_year() - 1;
                PeriodResolver::year_span(year, year)
            }
        };

        let rows = self
            .upstream
            .query(
                "get_top_products",
                self.regional(flow, query_period)
                    .month_detail(periodicity == Periodicity::Monthly)
                    .details(&[aggregation.detail()])
                    .metrics(&[METRIC_FOB, METRIC_KG]),
            )
            .await?;

        Ok(aggregate::rank_products(&rows, aggregation, top_n))
    }

    pub async fn get_national_comparison(
        &self,
        flow: FlowDirection,
        period: Period,
    ) -> Result<NationalComparisonRecord> {
        validate_year_month("from", &period.from)?;
        validate_year_month("to", &period.to)?;

        let key = self
            .keys
            .encode("national-comparison", &json!({"flow": flow, "period": period}))?;

        self.cache
            .get_or_compute(&key, || self.compute_national_comparison(flow, &period))
            .await
    }

    async fn compute_national_comparison(
        &self,
        flow: FlowDirection,
        period: &Period,
    ) -> Result<NationalComparisonRecord> {
        let (national, regional, states) = tokio::join!(
            self.upstream.query(
                "get_national_comparison",
                UpstreamQuery::new(flow, period.clone()).metrics(&[METRIC_FOB]),
            ),
            self.upstream.query(
                "get_national_comparison",
                self.regional(flow, period.clone()).metrics(&[METRIC_FOB]),
            ),
            self.upstream.query(
                "get_national_comparison",
                UpstreamQuery::new(flow, period.clone())
                    .details(&[DETAIL_STATE])
                    .metrics(&[METRIC_FOB]),
            ),
        );

        let comparison =
            aggregate::national_comparison(&national?, &regional?, &states?, &self.region.name);
        if comparison.ranking == 0 {
            tracing::warn!(
                "⚠️ Region '{}' not found in the per-state breakdown",
                self.region.name
            );
        }
        Ok(comparison)
    }

    /// 儀表板：各部分走各自的快取入口
    pub async fn get_dashboard(&self, year: Option<i32>) -> Result<DashboardRecord> {
        let target_year = year.unwrap_or_else(|| self.clock.today().year());
        let product_period = Some(ProductPeriod::Year(target_year - 1));

        let (summary, top_exports, top_imports, top_partners) = tokio::join!(
            self.get_summary(PeriodType::YearToDate, None),
            self.get_top_products(
                FlowDirection::Export,
                Periodicity::Annual,
                product_period.clone(),
                AggregationLevel::Heading,
                Some(DASHBOARD_TOP_N),
            ),
            self.get_top_products(
                FlowDirection::Import,
                Periodicity::Annual,
                product_period.clone(),
                AggregationLevel::Heading,
                Some(DASHBOARD_TOP_N),
            ),
            self.get_partner_countries(
                TradeFlow::Current,
                PeriodType::YearToDate,
                None,
                Some(DASHBOARD_TOP_N),
            ),
        );

        Ok(DashboardRecord {
            summary: summary?,
            top_exports: top_exports?,
            top_imports: top_imports?,
            top_partners: top_partners?,
        })
    }
}

fn validate_top_n(top_n: usize) -> Result<()> {
    if top_n == 0 {
        return Err(ComexError::validation("topN must be a positive integer"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_cache::MemoryCache;
    use crate::core::testing::{assert_close, envelope, MockTransport};
    use crate::domain::ports::FixedClock;
    use crate::utils::error::TransportError;
    use chrono::NaiveDate;
    use serde_json::{json, Value};

    // 2024-05-10 → 參考月份 2024-03
    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()))
    }

    fn engine(transport: MockTransport) -> (AggregationEngine<MockTransport>, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::new());
        let engine = AggregationEngine::new(transport, CachingOrchestrator::new(cache.clone()))
            .with_clock(clock());
        (engine, cache)
    }

    fn region_filter() -> Option<Vec<Filter>> {
        Some(vec![Filter {
            filter: "state".to_string(),
            values: vec![23],
        }])
    }

    fn strings(values: &[&str]) -> Option<Vec<String>> {
        Some(values.iter().map(|v| v.to_string()).collect())
    }

    #[tokio::test]
    async fn test_summary_history_assembles_months_in_order() {
        let transport = MockTransport::by_flow(
            json!([
                {"year": 2024, "monthNumber": 1, "metricFOB": 1_000_000},
                {"year": 2024, "monthNumber": 2, "metricFOB": 2_000_000},
                {"year": 2024, "monthNumber": 3, "metricFOB": 500_000}
            ]),
            json!([
                {"year": 2024, "monthNumber": 1, "metricFOB": 200_000},
                {"year": 2024, "monthNumber": 2, "metricFOB": 100_000}
            ]),
        );
        let (engine, cache) = engine(transport);

        let result = engine.get_summary_history("2024-01", "2024-03").await.unwrap();

        let calls = engine.transport().calls();
        assert_eq!(calls.len(), 2);
        let export = calls.iter().find(|q| q.flow == FlowDirection::Export).unwrap();
        let import = calls.iter().find(|q| q.flow == FlowDirection::Import).unwrap();
        assert!(export.month_detail);
        assert_eq!(export.period, Period::new("2024-01", "2024-03"));
        assert_eq!(export.filters, region_filter());
        assert_eq!(export.details, None);
        assert_eq!(export.metrics, strings(&["metricFOB"]));
        assert_eq!(import.metrics, strings(&["metricFOB", "metricCIF"]));

        let expected = [
            ("jan/2024", 1.0, 0.2, 0.8, 1.2),
            ("fev/2024", 2.0, 0.1, 1.9, 2.1),
            ("mar/2024", 0.5, 0.0, 0.5, 0.5),
        ];
        assert_eq!(result.len(), expected.len());
        for (record, (label, exports, imports, balance, current)) in result.iter().zip(expected) {
            assert_eq!(record.period, label);
            assert_close(record.exports, exports);
            assert_close(record.imports, imports);
            assert_close(record.trade_balance, balance);
            assert_close(record.trade_current, current);
        }
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_summary_history_rejects_invalid_months_without_upstream_calls() {
        let (engine, cache) = engine(MockTransport::by_flow(json!([]), json!([])));

        let err = engine.get_summary_history("2024-13", "2024-14").await.unwrap_err();
        assert!(matches!(err, ComexError::ValidationError { .. }));

        let err = engine.get_summary_history("2024-05", "2024-01").await.unwrap_err();
        assert!(matches!(err, ComexError::ValidationError { .. }));

        assert_eq!(engine.transport().call_count(), 0);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_summary_year_to_date_and_cache_hit() {
        let transport = MockTransport::by_flow(
            json!([{"metricFOB": 150_000_000}]),
            json!([{"metricFOB": "50000000", "metricCIF": 55_000_000}]),
        );
        let (engine, _cache) = engine(transport);

        let first = engine.get_summary(PeriodType::YearToDate, None).await.unwrap();
        let second = engine.get_summary(PeriodType::YearToDate, None).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.period, "Jan-mar/2024");
        assert_close(first.exports, 150.0);
        assert_close(first.imports, 50.0);
        assert_close(first.trade_balance, 100.0);
        assert_close(first.trade_current, 200.0);

        let calls = engine.transport().calls();
        assert_eq!(calls.len(), 2, "second call must be served from cache");
        assert!(calls.iter().all(|q| q.period == Period::new("2024-01", "2024-03")));
        assert!(calls.iter().all(|q| !q.month_detail));
    }

    #[tokio::test]
    async fn test_summary_custom_requires_period() {
        let (engine, _cache) = engine(MockTransport::by_flow(json!([]), json!([])));

        let err = engine.get_summary(PeriodType::Custom, None).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(engine.transport().call_count(), 0);

        let summary = engine
            .get_summary(PeriodType::Custom, Some(Period::new("2023-01", "2023-06")))
            .await
            .unwrap();
        assert_eq!(summary.period, "2023-01 - 2023-06");
        assert_close(summary.exports, 0.0);
        assert_close(summary.trade_current, 0.0);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_not_cached() {
        let transport = MockTransport::failing(TransportError::Unreachable {
            message: "timeout".to_string(),
        });
        let (engine, cache) = engine(transport);

        let err = engine.get_summary(PeriodType::LastYear, None).await.unwrap_err();
        assert!(matches!(err, ComexError::UpstreamUnreachable { .. }));
        assert!(cache.is_empty().await);

        let _ = engine.get_summary(PeriodType::LastYear, None).await;
        assert_eq!(engine.transport().call_count(), 4);
    }

    #[tokio::test]
    async fn test_engine_without_cache_always_queries() {
        let transport = MockTransport::by_flow(json!([]), json!([]));
        let engine = AggregationEngine::new(transport, CachingOrchestrator::disabled())
            .with_clock(clock());

        engine.get_summary(PeriodType::CurrentMonth, None).await.unwrap();
        engine.get_summary(PeriodType::CurrentMonth, None).await.unwrap();

        assert_eq!(engine.transport().call_count(), 4);
    }

    #[tokio::test]
    async fn test_time_series_queries_only_needed_flows() {
        let transport = MockTransport::by_flow(
            json!([{"year": 2023, "monthNumber": 1, "metricFOB": 1_000_000, "ISICSection": "Agropecuária", "coIsicSection": "A"}]),
            json!([]),
        );
        let (engine, _cache) = engine(transport);

        let records = engine
            .get_time_series(Periodicity::Monthly, Series::Export, 2023, None, true)
            .await
            .unwrap();

        let calls = engine.transport().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].flow, FlowDirection::Export);
        assert!(calls[0].month_detail);
        // 未指定結束年份時使用參考年份
        assert_eq!(calls[0].period, Period::new("2023-01", "2024-12"));
        assert_eq!(calls[0].details, strings(&["ISICSection"]));

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].period, "2023-01");
        assert_eq!(records[0].sectors.as_ref().unwrap()[0].code, "A");
    }

    #[tokio::test]
    async fn test_time_series_current_annual() {
        let transport = MockTransport::by_flow(
            json!([{"year": 2022, "metricFOB": 3_000_000}, {"year": 2021, "metricFOB": 1_000_000}]),
            json!([{"year": 2022, "metricFOB": 1_000_000}]),
        );
        let (engine, _cache) = engine(transport);

        let records = engine
            .get_time_series(Periodicity::Annual, Series::Current, 2021, Some(2022), false)
            .await
            .unwrap();

        let calls = engine.transport().calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|q| q.details.is_none() && !q.month_detail));
        assert_eq!(records.iter().map(|r| r.period.as_str()).collect::<Vec<_>>(), vec!["2021", "2022"]);
        assert_eq!(records[0].current, None);
        assert_close(records[1].current.unwrap(), 4.0);
    }

    #[tokio::test]
    async fn test_time_series_rejects_inverted_years() {
        let (engine, _cache) = engine(MockTransport::by_flow(json!([]), json!([])));
        let err = engine
            .get_time_series(Periodicity::Annual, Series::Import, 2025, Some(2020), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ComexError::ValidationError { .. }));
        assert_eq!(engine.transport().call_count(), 0);
    }

    #[tokio::test]
    async fn test_partner_countries_last_year_is_unsupported() {
        let (engine, _cache) = engine(MockTransport::by_flow(json!([]), json!([])));

        let err = engine
            .get_partner_countries(TradeFlow::Export, PeriodType::LastYear, None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ComexError::ValidationError { .. }));
        assert_eq!(engine.transport().call_count(), 0);
    }

    #[tokio::test]
    async fn test_partner_countries_export_flow() {
        let transport = MockTransport::by_flow(
            json!([
                {"country": "China", "metricFOB": 2_000_000},
                {"country": "Países Baixos (Holanda)", "metricFOB": 6_000_000},
                {"country": "Estados Unidos", "metricFOB": 4_000_000}
            ]),
            json!([]),
        );
        let (engine, _cache) = engine(transport);

        let partners = engine
            .get_partner_countries(TradeFlow::Export, PeriodType::CurrentMonth, None, Some(2))
            .await
            .unwrap();

        let calls = engine.transport().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].details, strings(&["country"]));
        assert_eq!(calls[0].period, Period::new("2024-02", "2024-02"));

        assert_eq!(partners.len(), 2);
        assert_eq!(partners[0].country, "Países Baixos (Holanda)");
        assert_close(partners[0].percentage, 50.0);
        assert_eq!(partners[1].country, "Estados Unidos");
    }

    #[tokio::test]
    async fn test_top_products_defaults() {
        let rows: Vec<Value> = (1..=25)
            .map(|i| json!({"headingCode": format!("{:04}", i), "heading": format!("Produto {}", i), "metricFOB": i * 1_000_000, "metricKG": i * 10}))
            .collect();
        let transport = MockTransport::new(move |_| Ok(envelope(Value::Array(rows.clone()))));
        let (engine, _cache) = engine(transport);

        let products = engine
            .get_top_products(FlowDirection::Export, Periodicity::Annual, None, AggregationLevel::Heading, None)
            .await
            .unwrap();

        let calls = engine.transport().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].period, Period::new("2023-01", "2023-12"));
        assert_eq!(calls[0].details, strings(&["heading"]));
        assert_eq!(calls[0].metrics, strings(&["metricFOB", "metricKG"]));
        assert_eq!(calls[0].filters, region_filter());

        assert_eq!(products.len(), 20);
        assert_eq!(products[0].code, "0025");
        assert!(products.windows(2).all(|w| w[0].value >= w[1].value));
        assert_eq!(products[0].weight, Some(250.0));
    }

    #[tokio::test]
    async fn test_top_products_explicit_year_and_range() {
        let transport = MockTransport::new(|_| Ok(envelope(json!([{"chapterCode": "08", "chapter": "Frutas", "metricFOB": 1_000_000}]))));
        let (engine, _cache) = engine(transport);

        engine
            .get_top_products(FlowDirection::Import, Periodicity::Monthly, Some(ProductPeriod::Year(2020)), AggregationLevel::Chapter, Some(5))
            .await
            .unwrap();
        engine
            .get_top_products(
                FlowDirection::Import,
                Periodicity::Monthly,
                Some(ProductPeriod::Range(Period::new("2021-03", "2021-04"))),
                AggregationLevel::Chapter,
                Some(5),
            )
            .await
            .unwrap();

        let calls = engine.transport().calls();
        assert_eq!(calls[0].period, Period::new("2020-01", "2020-12"));
        assert_eq!(calls[1].period, Period::new("2021-03", "2021-04"));
        assert!(calls.iter().all(|q| q.month_detail && q.flow == FlowDirection::Import));
    }

    #[tokio::test]
    async fn test_national_comparison_issues_three_queries() {
        let transport = MockTransport::new(|query| {
            let rows = match (&query.filters, &query.details) {
                (Some(_), _) => json!([{"metricFOB": 50_000_000}]),
                (None, Some(_)) => json!([
                    {"state": "São Paulo", "metricFOB": 900_000_000},
                    {"state": "Ceará", "metricFOB": 50_000_000},
                    {"state": "Bahia", "metricFOB": 50_000_001}
                ]),
                (None, None) => json!([{"metricFOB": 1_000_000_000}]),
            };
            Ok(envelope(rows))
        });
        let (engine, _cache) = engine(transport);

        let comparison = engine
            .get_national_comparison(FlowDirection::Export, Period::new("2024-01", "2024-03"))
            .await
            .unwrap();

        assert_eq!(engine.transport().call_count(), 3);
        assert_close(comparison.participation, 5.0);
        assert_eq!(comparison.ranking, 3);
    }

    #[tokio::test]
    async fn test_national_comparison_region_absent() {
        let transport = MockTransport::new(|query| {
            let rows = if query.details.is_some() {
                json!([{"state": "Bahia", "metricFOB": 10}])
            } else {
                json!([])
            };
            Ok(envelope(rows))
        });
        let (engine, _cache) = engine(transport);

        let comparison = engine
            .get_national_comparison(FlowDirection::Import, Period::new("2024-01", "2024-01"))
            .await
            .unwrap();

        assert_eq!(comparison.ranking, 0);
        assert_close(comparison.participation, 0.0);

        let err = engine
            .get_national_comparison(FlowDirection::Import, Period::new("2024-1", "2024-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, ComexError::ValidationError { .. }));
    }

    #[tokio::test]
    async fn test_dashboard_combines_cached_entities() {
        let transport = MockTransport::new(|query| {
            let rows = match query.details.as_deref() {
                Some([detail]) if detail == "country" => json!([{"country": "China", "metricFOB": 1_000_000}]),
                Some([detail]) if detail == "heading" => json!([{"headingCode": "0801", "heading": "Cocos", "metricFOB": 1_000_000}]),
                _ => json!([{"metricFOB": 2_000_000}]),
            };
            Ok(envelope(rows))
        });
        let (engine, cache) = engine(transport);

        let dashboard = engine.get_dashboard(Some(2024)).await.unwrap();

        assert_eq!(dashboard.summary.period, "Jan-mar/2024");
        assert_eq!(dashboard.top_exports.len(), 1);
        assert_eq!(dashboard.top_imports[0].code, "0801");
        assert_eq!(dashboard.top_partners[0].country, "China");
        assert_close(dashboard.top_partners[0].current.unwrap(), 2.0);

        // summary 2 + products 2 + partners 2
        assert_eq!(engine.transport().call_count(), 6);
        assert_eq!(cache.len().await, 4);
        let product_calls: Vec<_> = engine
            .transport()
            .calls()
            .into_iter()
            .filter(|q| q.details == strings(&["heading"]))
            .collect();
        assert!(product_calls.iter().all(|q| q.period == Period::new("2023-01", "2023-12")));

        engine.get_dashboard(Some(2024)).await.unwrap();
        assert_eq!(engine.transport().call_count(), 6);
    }

    #[tokio::test]
    async fn test_custom_region() {
        let transport = MockTransport::new(|query| {
            let rows = if query.details.is_some() {
                json!([{"state": "Piauí", "metricFOB": 10}, {"state": "Ceará", "metricFOB": 20}])
            } else {
                json!([{"metricFOB": 10}])
            };
            Ok(envelope(rows))
        });
        let (engine, _cache) = engine(transport);
        let engine = engine.with_region(Region {
            filter: "state".to_string(),
            id: 22,
            name: "Piauí".to_string(),
        });

        let comparison = engine
            .get_national_comparison(FlowDirection::Export, Period::new("2024-01", "2024-02"))
            .await
            .unwrap();

        assert_eq!(comparison.ranking, 2);
        assert_eq!(engine.region().id, 22);
        assert!(engine
            .transport()
            .calls()
            .iter()
            .filter_map(|q| q.filters.as_ref())
            .all(|f| f[0].values == vec![22]));
    }
}
