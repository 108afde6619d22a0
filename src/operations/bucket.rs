use crate::db::{bucket_repository, repository};
use crate::error::{AppError, Result};
use crate::models::bucket::{Bucket, BucketChanges, BucketWithTransactions, NewBucket};
use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

fn attach_transactions(conn: &Connection, bucket: Bucket) -> Result<BucketWithTransactions> {
    let transactions = repository::get_transactions_for_bucket(conn, &bucket.id)?;
    Ok(BucketWithTransactions {
        bucket,
        transactions,
    })
}

pub fn list_buckets(conn: &Connection) -> Result<Vec<BucketWithTransactions>> {
    bucket_repository::get_all_buckets(conn)?
        .into_iter()
        .map(|bucket| attach_transactions(conn, bucket))
        .collect()
}

pub fn get_bucket(conn: &Connection, id: &str) -> Result<BucketWithTransactions> {
    let bucket = bucket_repository::get_bucket(conn, id)?.ok_or_else(|| AppError::not_found("Bucket"))?;
    attach_transactions(conn, bucket)
}

pub fn create_bucket(conn: &Connection, input: NewBucket) -> Result<BucketWithTransactions> {
    let bucket = Bucket::new(
        Uuid::new_v4().to_string(),
        input.name,
        input.size,
        input.period,
        Utc::now(),
    );
    bucket_repository::add_bucket(conn, &bucket)?;
    log::info!("Created bucket '{}' ({})", bucket.name, bucket.id);

    Ok(BucketWithTransactions {
        bucket,
        transactions: Vec::new(),
    })
}

pub fn update_bucket(conn: &Connection, id: &str, changes: &BucketChanges) -> Result<BucketWithTransactions> {
    let bucket = bucket_repository::update_bucket(conn, id, changes)?;
    log::info!("Updated bucket {}", id);
    attach_transactions(conn, bucket)
}

/// Transactions that referenced the bucket become unassigned.
pub fn delete_bucket(conn: &Connection, id: &str) -> Result<()> {
    bucket_repository::delete_bucket(conn, id)?;
    log::info!("Deleted bucket {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::establish_test_connection;
    use crate::models::bucket::Period;
    use crate::operations::transaction;
    use crate::models::transaction::NewTransaction;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn new_bucket(name: &str) -> NewBucket {
        NewBucket {
            name: name.to_string(),
            size: Decimal::new(40000, 2),
            period: Period::Monthly,
        }
    }

    #[test]
    fn test_create_bucket_success() {
        let conn = establish_test_connection().unwrap();
        let created = create_bucket(&conn, new_bucket("Food")).unwrap();
        assert!(created.transactions.is_empty());

        let buckets = list_buckets(&conn).unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].bucket.name, "Food");
        assert!(Uuid::parse_str(&buckets[0].bucket.id).is_ok());
    }

    #[test]
    fn test_list_buckets_empty() {
        let conn = establish_test_connection().unwrap();
        let buckets = list_buckets(&conn).unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_get_bucket_includes_transactions() {
        let conn = establish_test_connection().unwrap();
        let created = create_bucket(&conn, new_bucket("Food")).unwrap();
        transaction::create_transaction(
            &conn,
            NewTransaction {
                date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                description: "Market".to_string(),
                amount: Decimal::new(1200, 2),
                bucket_id: Some(created.bucket.id.clone()),
            },
        )
        .unwrap();

        let fetched = get_bucket(&conn, &created.bucket.id).unwrap();
        assert_eq!(fetched.transactions.len(), 1);
        assert_eq!(fetched.transactions[0].description, "Market");
    }

    #[test]
    fn test_get_bucket_not_found() {
        let conn = establish_test_connection().unwrap();
        let result = get_bucket(&conn, "missing");
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[test]
    fn test_update_bucket_name_only() {
        let conn = establish_test_connection().unwrap();
        let created = create_bucket(&conn, new_bucket("Food")).unwrap();

        let changes = BucketChanges {
            name: Some("X".to_string()),
            ..Default::default()
        };
        let updated = update_bucket(&conn, &created.bucket.id, &changes).unwrap();

        assert_eq!(updated.bucket.name, "X");
        assert_eq!(updated.bucket.size, Decimal::new(40000, 2));
        assert_eq!(updated.bucket.period, Period::Monthly);
    }

    #[test]
    fn test_delete_bucket_success() {
        let conn = establish_test_connection().unwrap();
        let created = create_bucket(&conn, new_bucket("Food")).unwrap();

        let result = delete_bucket(&conn, &created.bucket.id);
        assert!(result.is_ok());
        assert!(list_buckets(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_delete_bucket_not_found() {
        let conn = establish_test_connection().unwrap();
        let result = delete_bucket(&conn, "Missing");
        assert!(result.unwrap_err().to_string().contains("not found"));
    }
}
