pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{HttpTransport, MemoryCache};
pub use config::AppConfig;
pub use core::caching::CachingOrchestrator;
pub use core::engine::{AggregationEngine, Region};
pub use domain::model::{
    AggregationLevel, DashboardRecord, FlowDirection, NationalComparisonRecord,
    PartnerCountryRecord, Period, PeriodType, Periodicity, ProductPeriod, ProductRecord, Series,
    SummaryRecord, TimeSeriesRecord, TradeFlow,
};
pub use utils::error::{ComexError, Result};
