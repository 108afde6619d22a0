use crate::models::bucket::Period;
use rust_decimal::Decimal;
use serde::Serialize;

/// Pace of spending compared with elapsed time in the period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketStatus {
    Good,
    Warning,
    Critical,
}

impl BucketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BucketStatus::Good => "good",
            BucketStatus::Warning => "warning",
            BucketStatus::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardBucket {
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub size: Decimal,
    pub period: Period,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_spent: Decimal,
    pub percentage_full: f64,
    pub percentage_of_time_elapsed: f64,
    pub status: BucketStatus,
    pub transaction_count: usize,
}
