use crate::db::{bucket_repository, repository};
use crate::error::Result;
use crate::models::bucket::Bucket;
use crate::models::dashboard::{BucketStatus, DashboardBucket};
use crate::models::transaction::Transaction;
use crate::operations::period::PeriodWindow;
use chrono::NaiveDateTime;
use rusqlite::Connection;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Allowed gap, in percentage points, between spending and elapsed time.
const PACE_THRESHOLD: f64 = 10.0;

pub fn classify(percentage_full: f64, percentage_of_time_elapsed: f64) -> BucketStatus {
    if percentage_full < percentage_of_time_elapsed - PACE_THRESHOLD {
        BucketStatus::Good
    } else if percentage_full > percentage_of_time_elapsed + PACE_THRESHOLD {
        BucketStatus::Critical
    } else {
        BucketStatus::Warning
    }
}

/// Status of one bucket given its transactions. Transactions dated outside
/// the bucket's current period are ignored.
pub fn calculate_bucket_status(
    bucket: &Bucket,
    transactions: &[Transaction],
    now: NaiveDateTime,
) -> DashboardBucket {
    let window = PeriodWindow::current(bucket.period, now);

    let in_period: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| window.contains(t.date))
        .collect();

    let total_spent = in_period
        .iter()
        .fold(Decimal::ZERO, |acc, t| acc.saturating_add(t.amount));
    // ratio in f64; Decimal division overflows for tiny sizes
    let percentage_full = match (total_spent.to_f64(), bucket.size.to_f64()) {
        (Some(spent), Some(size)) => spent * 100.0 / size,
        _ => 0.0,
    };

    DashboardBucket {
        id: bucket.id.clone(),
        name: bucket.name.clone(),
        size: bucket.size,
        period: bucket.period,
        total_spent,
        percentage_full,
        percentage_of_time_elapsed: window.percentage_of_time_elapsed,
        status: classify(percentage_full, window.percentage_of_time_elapsed),
        transaction_count: in_period.len(),
    }
}

/// One status record per bucket, evaluated at `now`.
pub fn build_dashboard(conn: &Connection, now: NaiveDateTime) -> Result<Vec<DashboardBucket>> {
    let buckets = bucket_repository::get_all_buckets(conn)?;

    let mut dashboard = Vec::with_capacity(buckets.len());
    for bucket in &buckets {
        let window = PeriodWindow::current(bucket.period, now);
        let transactions = repository::get_bucket_transactions_in_range(
            conn,
            &bucket.id,
            window.start_date(),
            window.end_date(),
        )?;
        dashboard.push(calculate_bucket_status(bucket, &transactions, now));
    }

    log::debug!("Dashboard computed for {} buckets", dashboard.len());
    Ok(dashboard)
}
