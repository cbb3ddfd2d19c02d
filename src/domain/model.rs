use serde::{Deserialize, Deserializer, Serialize};

/// 上游查詢使用的 `YYYY-MM` 區間
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub from: String,
    pub to: String,
}

impl Period {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "camelCase")]
pub enum PeriodType {
    CurrentMonth,
    YearToDate,
    LastYear,
    Custom,
}

/// 上游只接受單一方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    Export,
    Import,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum TradeFlow {
    Export,
    Import,
    Current,
}

impl TradeFlow {
    /// 需要向上游查詢的方向
    pub fn directions(self) -> &'static [FlowDirection] {
        match self {
            TradeFlow::Export => &[FlowDirection::Export],
            TradeFlow::Import => &[FlowDirection::Import],
            TradeFlow::Current => &[FlowDirection::Export, FlowDirection::Import],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Periodicity {
    Monthly,
    Annual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Series {
    Export,
    Import,
    Current,
    Balance,
}

impl Series {
    pub fn directions(self) -> &'static [FlowDirection] {
        match self {
            Series::Export => &[FlowDirection::Export],
            Series::Import => &[FlowDirection::Import],
            Series::Current | Series::Balance => &[FlowDirection::Export, FlowDirection::Import],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum AggregationLevel {
    Ncm,
    Heading,
    Chapter,
}

impl AggregationLevel {
    /// 上游 `details` 維度名稱
    pub fn detail(self) -> &'static str {
        match self {
            AggregationLevel::Ncm => "ncm",
            AggregationLevel::Heading => "heading",
            AggregationLevel::Chapter => "chapter",
        }
    }

    /// ncmCode / headingCode / chapterCode
    pub fn code_of(self, row: &UpstreamRow) -> String {
        let code = match self {
            AggregationLevel::Ncm => &row.ncm_code,
            AggregationLevel::Heading => &row.heading_code,
            AggregationLevel::Chapter => &row.chapter_code,
        };
        code.clone().unwrap_or_default()
    }

    /// ncm / heading / chapter
    pub fn description_of(self, row: &UpstreamRow) -> String {
        let description = match self {
            AggregationLevel::Ncm => &row.ncm,
            AggregationLevel::Heading => &row.heading,
            AggregationLevel::Chapter => &row.chapter,
        };
        description.clone().unwrap_or_default()
    }
}

/// Top products 的期間: 自訂區間或整年
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductPeriod {
    Year(i32),
    Range(Period),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub filter: String,
    pub values: Vec<i64>,
}

/// 送往 `POST /general` 的查詢
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamQuery {
    pub flow: FlowDirection,
    pub month_detail: bool,
    pub period: Period,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<Filter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Vec<String>>,
}

impl UpstreamQuery {
    pub fn new(flow: FlowDirection, period: Period) -> Self {
        Self {
            flow,
            month_detail: false,
            period,
            filters: None,
            details: None,
            metrics: None,
        }
    }

    pub fn month_detail(mut self, month_detail: bool) -> Self {
        self.month_detail = month_detail;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.get_or_insert_with(Vec::new).push(filter);
        self
    }

    pub fn details(mut self, details: &[&str]) -> Self {
        self.details = Some(details.iter().map(|d| d.to_string()).collect());
        self
    }

    pub fn metrics(mut self, metrics: &[&str]) -> Self {
        self.metrics = Some(metrics.iter().map(|m| m.to_string()).collect());
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvelopeData {
    #[serde(default)]
    pub list: Vec<UpstreamRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<EnvelopeData>,
}

impl UpstreamEnvelope {
    pub fn into_rows(self) -> Vec<UpstreamRow> {
        self.data.map(|d| d.list).unwrap_or_default()
    }
}

/// 上游回傳的單列資料。上游欄位型別不固定 (數字或字串)，在這裡統一解析。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UpstreamRow {
    #[serde(default, deserialize_with = "lossy_i32")]
    pub year: Option<i32>,
    #[serde(default, rename = "monthNumber", deserialize_with = "lossy_u32")]
    pub month_number: Option<u32>,
    #[serde(default, deserialize_with = "lossy_u32")]
    pub month: Option<u32>,

    #[serde(default, rename = "metricFOB", deserialize_with = "lossy_f64")]
    pub metric_fob: Option<f64>,
    #[serde(default, rename = "metricCIF", deserialize_with = "lossy_f64")]
    pub metric_cif: Option<f64>,
    #[serde(default, rename = "metricKG", deserialize_with = "lossy_f64")]
    pub metric_kg: Option<f64>,

    #[serde(default, deserialize_with = "lossy_string")]
    pub country: Option<String>,
    #[serde(default, rename = "countryName", deserialize_with = "lossy_string")]
    pub country_name: Option<String>,
    #[serde(default, deserialize_with = "lossy_string")]
    pub state: Option<String>,
    #[serde(default, rename = "stateName", deserialize_with = "lossy_string")]
    pub state_name: Option<String>,

    #[serde(default, rename = "ISICSection", deserialize_with = "lossy_string")]
    pub isic_section: Option<String>,
    #[serde(default, rename = "coIsicSection", deserialize_with = "lossy_string")]
    pub co_isic_section: Option<String>,
    #[serde(default, rename = "ISICSectionCode", deserialize_with = "lossy_string")]
    pub isic_section_code: Option<String>,

    #[serde(default, rename = "ncmCode", deserialize_with = "lossy_string")]
    pub ncm_code: Option<String>,
    #[serde(default, deserialize_with = "lossy_string")]
    pub ncm: Option<String>,
    #[serde(default, rename = "headingCode", deserialize_with = "lossy_string")]
    pub heading_code: Option<String>,
    #[serde(default, deserialize_with = "lossy_string")]
    pub heading: Option<String>,
    #[serde(default, rename = "chapterCode", deserialize_with = "lossy_string")]
    pub chapter_code: Option<String>,
    #[serde(default, deserialize_with = "lossy_string")]
    pub chapter: Option<String>,
}

impl UpstreamRow {
    pub fn month_of_year(&self) -> Option<u32> {
        self.month_number.or(self.month)
    }

    pub fn country_label(&self) -> Option<&str> {
        non_empty(&self.country).or_else(|| non_empty(&self.country_name))
    }

    pub fn state_label(&self) -> Option<&str> {
        non_empty(&self.state).or_else(|| non_empty(&self.state_name))
    }

    pub fn sector_code(&self) -> String {
        self.co_isic_section
            .clone()
            .or_else(|| self.isic_section_code.clone())
            .unwrap_or_default()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// 數字或字串皆可；字串允許逗號小數點。無法解析或非有限值視為缺值。
pub fn number_from_value(value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn lossy_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

fn lossy_i32<'de, D>(deserializer: D) -> std::result::Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(number_from_value)
        .filter(|v| v.fract() == 0.0)
        .map(|v| v as i32))
}

fn lossy_u32<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(number_from_value)
        .filter(|v| v.fract() == 0.0 && *v >= 0.0)
        .map(|v| v as u32))
}

fn lossy_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// 金額一律以百萬為單位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub period: String,
    pub exports: f64,
    pub imports: f64,
    pub trade_balance: f64,
    pub trade_current: f64,
}

impl SummaryRecord {
    pub fn new(period: String, exports: f64, imports: f64) -> Self {
        Self {
            period,
            exports,
            imports,
            trade_balance: exports - imports,
            trade_current: exports + imports,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorValue {
    pub code: String,
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRecord {
    pub period: String,
    pub year: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exports: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imports: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sectors: Option<Vec<SectorValue>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerCountryRecord {
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exports: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imports: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub code: String,
    pub description: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NationalComparisonRecord {
    pub participation: f64,
    pub ranking: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardRecord {
    pub summary: SummaryRecord,
    pub top_exports: Vec<ProductRecord>,
    pub top_imports: Vec<ProductRecord>,
    pub top_partners: Vec<PartnerCountryRecord>,
}
