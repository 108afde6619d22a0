use crate::models::transaction::Transaction;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Recurring window a bucket's spending is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Monthly,
    Yearly,
}

impl Period {
    pub fn as_str(self) -> &'static str {
        match self {
            Period::Monthly => "monthly",
            Period::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(Period::Monthly),
            "yearly" => Ok(Period::Yearly),
            _ => Err(format!("Period must be either \"monthly\" or \"yearly\", got '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub size: Decimal,
    pub period: Period,
    pub created_at: DateTime<Utc>,
}

impl Bucket {
    pub fn new(id: String, name: String, size: Decimal, period: Period, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            size,
            period,
            created_at,
        }
    }
}

/// Validated input for creating a bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBucket {
    pub name: String,
    pub size: Decimal,
    pub period: Period,
}

/// Validated partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketChanges {
    pub name: Option<String>,
    pub size: Option<Decimal>,
    pub period: Option<Period>,
}

impl BucketChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.size.is_none() && self.period.is_none()
    }

    pub fn apply_to(&self, bucket: &mut Bucket) {
        if let Some(ref name) = self.name {
            bucket.name = name.clone();
        }
        if let Some(size) = self.size {
            bucket.size = size;
        }
        if let Some(period) = self.period {
            bucket.period = period;
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketWithTransactions {
    #[serde(flatten)]
    pub bucket: Bucket,
    pub transactions: Vec<Transaction>,
}
