use crate::domain::model::{Period, PeriodType};
use crate::utils::error::{ComexError, Result};
use crate::utils::validation::validate_year_month;
use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// 上游資料發布延遲兩個月
pub const REPORTING_LAG_MONTHS: i32 = 2;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// pt-BR 三字母月份縮寫 (小寫、無句點)
pub fn month_abbreviation(month: u32) -> &'static str {
    MONTH_ABBREVIATIONS[((month.clamp(1, 12)) - 1) as usize]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        debug_assert!((1..=12).contains(&month));
        Self { year, month }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }

    fn index(self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    fn from_index(index: i64) -> Self {
        Self::new(index.div_euclid(12) as i32, (index.rem_euclid(12) + 1) as u32)
    }

    pub fn shifted(self, months: i32) -> Self {
        Self::from_index(self.index() + months as i64)
    }

    pub fn next(self) -> Self {
        self.shifted(1)
    }

    /// `<abbrev>/<year>`，例如 `jan/2024`
    pub fn label(self) -> String {
        format!("{}/{}", month_abbreviation(self.month), self.year)
    }

    /// 含頭尾的月份序列
    pub fn range_inclusive(from: YearMonth, to: YearMonth) -> impl Iterator<Item = YearMonth> {
        (from.index()..=to.index()).map(YearMonth::from_index)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ComexError;

    fn from_str(s: &str) -> Result<Self> {
        validate_year_month("period", s)?;
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| ComexError::validation(format!("'{}' is not YYYY-MM", s)))?;
        let year = year
            .parse::<i32>()
            .map_err(|e| ComexError::validation(format!("invalid year in '{}': {}", s, e)))?;
        let month = month
            .parse::<u32>()
            .map_err(|e| ComexError::validation(format!("invalid month in '{}': {}", s, e)))?;
        Ok(Self::new(year, month))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPeriod {
    pub period: Period,
    pub label: String,
}

/// 將 period-type 轉成實際查詢區間
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodResolver {
    reference: YearMonth,
}

impl PeriodResolver {
    /// `today` 是實際日期；內部先往回推 [`REPORTING_LAG_MONTHS`]
    pub fn new(today: NaiveDate) -> Self {
        Self::with_reference(YearMonth::from_date(today).shifted(-REPORTING_LAG_MONTHS))
    }

    pub fn with_reference(reference: YearMonth) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> YearMonth {
        self.reference
    }

    pub fn reference_year(&self) -> i32 {
        self.reference.year
    }

    pub fn resolve(&self, period_type: PeriodType, custom: Option<&Period>) -> Result<ResolvedPeriod> {
        match period_type {
            PeriodType::CurrentMonth => {
                let month = self.reference.shifted(-1);
                Ok(ResolvedPeriod {
                    period: Period::new(month.to_string(), month.to_string()),
                    label: month.label(),
                })
            }
            PeriodType::YearToDate => {
                let start = YearMonth::new(self.reference.year, 1);
                Ok(ResolvedPeriod {
                    period: Period::new(start.to_string(), self.reference.to_string()),
                    label: format!("Jan-{}", self.reference.label()),
                })
            }
            PeriodType::LastYear => {
                let year = self.reference.year - 1;
                Ok(ResolvedPeriod {
                    period: Period::new(
                        YearMonth::new(year, 1).to_string(),
                        YearMonth::new(year, 12).to_string(),
                    ),
                    label: year.to_string(),
                })
            }
            PeriodType::Custom => {
                let custom = custom.ok_or_else(|| {
                    ComexError::validation("Custom period is required when period type is custom.")
                })?;
                Ok(ResolvedPeriod {
                    period: custom.clone(),
                    label: format!("{} - {}", custom.from, custom.to),
                })
            }
        }
    }

    /// 整年區間 `YYYY-01` 至 `YYYY-12`
    pub fn year_span(start_year: i32, end_year: i32) -> Period {
        Period::new(
            YearMonth::new(start_year, 1).to_string(),
            YearMonth::new(end_year, 12).to_string(),
        )
    }
}
