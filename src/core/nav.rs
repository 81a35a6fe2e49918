//! Trailing returns from NAV history

use super::fund::NavPoint;
use anyhow::{Result, anyhow};
use chrono::Duration;
use rust_decimal::{Decimal, prelude::*};
use rust_finprim::rate::cagr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum HistoricalPeriod {
    OneYear,
    ThreeYears,
    FiveYears,
    TenYears,
}

impl HistoricalPeriod {
    pub const ALL: [HistoricalPeriod; 4] = [
        HistoricalPeriod::OneYear,
        HistoricalPeriod::ThreeYears,
        HistoricalPeriod::FiveYears,
        HistoricalPeriod::TenYears,
    ];

    pub fn to_duration(&self) -> Duration {
        Duration::days(365 * self.years())
    }

    pub fn years(&self) -> i64 {
        match self {
            HistoricalPeriod::OneYear => 1,
            HistoricalPeriod::ThreeYears => 3,
            HistoricalPeriod::FiveYears => 5,
            HistoricalPeriod::TenYears => 10,
        }
    }
}

impl Display for HistoricalPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}Y", self.years())
    }
}

impl FromStr for HistoricalPeriod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "1Y" => Ok(HistoricalPeriod::OneYear),
            "3Y" => Ok(HistoricalPeriod::ThreeYears),
            "5Y" => Ok(HistoricalPeriod::FiveYears),
            "10Y" => Ok(HistoricalPeriod::TenYears),
            _ => Err(anyhow!("Invalid historical period: {}", s)),
        }
    }
}

/// CAGR in percent for every period the history covers. `history` must be
/// ordered newest first.
pub fn trailing_returns(history: &[NavPoint]) -> Result<BTreeMap<HistoricalPeriod, f64>> {
    let latest = history
        .first()
        .ok_or_else(|| anyhow!("NAV history is empty"))?;
    if latest.nav <= 0.0 {
        return Err(anyhow!("Latest NAV is not positive"));
    }

    let mut returns = BTreeMap::new();
    for period in HistoricalPeriod::ALL {
        let start = latest.date - period.to_duration();
        let Some(base) = history.iter().find(|p| p.date <= start) else {
            continue;
        };
        if base.nav <= 0.0 {
            continue;
        }

        let begin_bal =
            Decimal::from_f64(base.nav).ok_or_else(|| anyhow!("Invalid historical NAV"))?;
        let end_bal =
            Decimal::from_f64(latest.nav).ok_or_else(|| anyhow!("Invalid latest NAV"))?;
        let n_years = Decimal::from(period.years());

        let rate = cagr(begin_bal, end_bal, n_years);
        let percentage = (rate * Decimal::from(100))
            .to_f64()
            .ok_or_else(|| anyhow!("CAGR percentage conversion failed"))?;
        debug!("cagr {period}: {begin_bal} -> {end_bal} = {percentage:.2}%");
        returns.insert(period, percentage);
    }

    Ok(returns)
}
