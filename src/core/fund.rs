//! Fund data abstractions and core types

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundSummary {
    pub scheme_code: String,
    pub scheme_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundMeta {
    pub scheme_code: String,
    pub scheme_name: String,
    pub fund_house: Option<String>,
    pub scheme_type: Option<String>,
    pub scheme_category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavPoint {
    pub date: NaiveDate,
    pub nav: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundDetails {
    pub meta: FundMeta,
    /// Newest first.
    pub history: Vec<NavPoint>,
}

impl FundDetails {
    pub fn latest(&self) -> Option<&NavPoint> {
        self.history.first()
    }
}

#[async_trait]
pub trait FundDataProvider: Send + Sync {
    /// A blank query lists every fund.
    async fn search(&self, query: &str) -> Result<Vec<FundSummary>>;
    async fn details(&self, scheme_code: &str) -> Result<FundDetails>;
}
