use crate::models::bucket::Bucket;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    /// Always a non-negative magnitude.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub bucket_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        id: String,
        date: NaiveDate,
        description: String,
        amount: Decimal,
        bucket_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            date,
            description,
            amount,
            bucket_id,
            created_at,
        }
    }
}

/// Input for a transaction that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub bucket_id: Option<String>,
}

/// A transaction with its bucket reference resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionWithBucket {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub bucket: Option<Bucket>,
}
