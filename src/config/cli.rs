use crate::config::toml_config::AppConfig;
use crate::core::engine::AggregationEngine;
use crate::domain::model::{
    AggregationLevel, FlowDirection, Period, PeriodType, Periodicity, ProductPeriod, Series,
    TradeFlow,
};
use crate::domain::ports::UpstreamTransport;
use crate::utils::error::{ComexError, ErrorCategory, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "comexstat")]
#[command(about = "Aggregated foreign-trade statistics from the ComexStat API")]
pub struct Cli {
    /// TOML 設定檔；省略時使用預設值
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// 自訂區間 `--from YYYY-MM --to YYYY-MM`
#[derive(Debug, Clone, Default, Args)]
pub struct RangeArgs {
    #[arg(long, requires = "to")]
    pub from: Option<String>,

    #[arg(long, requires = "from")]
    pub to: Option<String>,
}

impl RangeArgs {
    pub fn period(&self) -> Option<Period> {
        match (&self.from, &self.to) {
            (Some(from), Some(to)) => Some(Period::new(from.clone(), to.clone())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Exports, imports, balance and current trade for one period
    Summary {
        #[arg(long, value_enum, default_value = "year-to-date")]
        period_type: PeriodType,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// One summary per month between two YYYY-MM months
    SummaryHistory {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Monthly or annual trade series
    Timeseries {
        #[arg(long, value_enum, default_value = "annual")]
        periodicity: Periodicity,
        #[arg(long, value_enum, default_value = "export")]
        series: Series,
        #[arg(long)]
        start_year: i32,
        #[arg(long)]
        end_year: Option<i32>,
        #[arg(long)]
        include_sectors: bool,
    },
    /// Ranked partner countries
    Partners {
        #[arg(long, value_enum, default_value = "export")]
        flow: TradeFlow,
        #[arg(long, value_enum, default_value = "year-to-date")]
        period_type: PeriodType,
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long)]
        top_n: Option<usize>,
    },
    /// Ranked products at NCM, heading or chapter level
    Products {
        #[arg(long, value_enum, default_value = "export")]
        flow: FlowDirection,
        #[arg(long, value_enum, default_value = "annual")]
        periodicity: Periodicity,
        #[arg(long, conflicts_with_all = ["from", "to"])]
        year: Option<i32>,
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long, value_enum, default_value = "heading")]
        aggregation: AggregationLevel,
        #[arg(long)]
        top_n: Option<usize>,
    },
    /// Regional share and ranking against the national total
    NationalComparison {
        #[arg(long, value_enum, default_value = "export")]
        flow: FlowDirection,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Summary, top products and top partners in one call
    Dashboard {
        #[arg(long)]
        year: Option<i32>,
    },
}

impl Cli {
    pub fn load_config(&self) -> Result<AppConfig> {
        match &self.config {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                AppConfig::from_file(path)
            }
            None => Ok(AppConfig::default()),
        }
    }
}

/// 執行子命令並回傳要放進 `data` 的 JSON
pub async fn execute<T: UpstreamTransport>(
    engine: &AggregationEngine<T>,
    command: &Command,
) -> Result<Value> {
    let value = match command {
        Command::Summary { period_type, range } => {
            serde_json::to_value(engine.get_summary(*period_type, range.period()).await?)?
        }
        Command::SummaryHistory { from, to } => {
            serde_json::to_value(engine.get_summary_history(from, to).await?)?
        }
        Command::Timeseries {
            periodicity,
            series,
            start_year,
            end_year,
            include_sectors,
        } => serde_json::to_value(
            engine
                .get_time_series(*periodicity, *series, *start_year, *end_year, *include_sectors)
                .await?,
        )?,
        Command::Partners {
            flow,
            period_type,
            range,
            top_n,
        } => serde_json::to_value(
            engine
                .get_partner_countries(*flow, *period_type, range.period(), *top_n)
                .await?,
        )?,
        Command::Products {
            flow,
            periodicity,
            year,
            range,
            aggregation,
            top_n,
        } => {
            let period = range
                .period()
                .map(ProductPeriod::Range)
                .or(year.map(ProductPeriod::Year));
            serde_json::to_value(
                engine
                    .get_top_products(*flow, *periodicity, period, *aggregation, *top_n)
                    .await?,
            )?
        }
        Command::NationalComparison { flow, from, to } => serde_json::to_value(
            engine
                .get_national_comparison(*flow, Period::new(from.clone(), to.clone()))
                .await?,
        )?,
        Command::Dashboard { year } => serde_json::to_value(engine.get_dashboard(*year).await?)?,
    };

    Ok(value)
}

/// 成功輸出的外層格式
pub fn success_envelope(data: Value) -> Value {
    serde_json::json!({ "success": true, "data": data })
}

pub fn exit_code(error: &ComexError) -> i32 {
    match error.category() {
        ErrorCategory::ClientInput => 2,
        ErrorCategory::Upstream => 3,
        ErrorCategory::Configuration | ErrorCategory::Internal => 1,
    }
}
