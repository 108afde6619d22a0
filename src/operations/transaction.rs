use crate::db::{bucket_repository, repository};
use crate::error::{AppError, Result};
use crate::models::transaction::{NewTransaction, Transaction, TransactionWithBucket};
use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

fn ensure_bucket_exists(conn: &Connection, bucket_id: &str) -> Result<()> {
    if bucket_repository::bucket_exists(conn, bucket_id)? {
        Ok(())
    } else {
        Err(AppError::invalid("bucketId", "Bucket does not exist"))
    }
}

fn resolve_one(conn: &Connection, transaction: Transaction) -> Result<TransactionWithBucket> {
    let bucket = match transaction.bucket_id {
        Some(ref bucket_id) => bucket_repository::get_bucket(conn, bucket_id)?,
        None => None,
    };
    Ok(TransactionWithBucket { transaction, bucket })
}

pub fn list_transactions(conn: &Connection) -> Result<Vec<TransactionWithBucket>> {
    let transactions = repository::get_all_transactions(conn)?;
    repository::with_buckets(conn, transactions)
}

pub fn get_transaction(conn: &Connection, id: &str) -> Result<TransactionWithBucket> {
    let transaction =
        repository::get_transaction(conn, id)?.ok_or_else(|| AppError::not_found("Transaction"))?;
    resolve_one(conn, transaction)
}

pub fn create_transaction(conn: &Connection, input: NewTransaction) -> Result<TransactionWithBucket> {
    if let Some(ref bucket_id) = input.bucket_id {
        ensure_bucket_exists(conn, bucket_id)?;
    }

    let transaction = Transaction::new(
        Uuid::new_v4().to_string(),
        input.date,
        input.description,
        input.amount,
        input.bucket_id,
        Utc::now(),
    );
    repository::add_transaction(conn, &transaction)?;
    log::info!("Created transaction {}", transaction.id);
    resolve_one(conn, transaction)
}

/// Always writes the bucket reference; `None` clears the assignment.
pub fn assign_bucket(conn: &Connection, id: &str, bucket_id: Option<&str>) -> Result<TransactionWithBucket> {
    if let Some(bucket_id) = bucket_id {
        ensure_bucket_exists(conn, bucket_id)?;
    }

    repository::set_transaction_bucket(conn, id, bucket_id)?;
    log::info!(
        "Transaction {} assigned to {}",
        id,
        bucket_id.unwrap_or("no bucket")
    );
    get_transaction(conn, id)
}

pub fn delete_transaction(conn: &Connection, id: &str) -> Result<()> {
    repository::remove_transaction(conn, id)?;
    log::info!("Deleted transaction {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::establish_test_connection;
    use crate::models::bucket::{NewBucket, Period};
    use crate::operations::bucket::create_bucket;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn seed_bucket(conn: &Connection) -> String {
        create_bucket(
            conn,
            NewBucket {
                name: "Fun".to_string(),
                size: Decimal::new(100, 0),
                period: Period::Monthly,
            },
        )
        .unwrap()
        .bucket
        .id
    }

    fn new_transaction(bucket_id: Option<String>) -> NewTransaction {
        NewTransaction {
            date: NaiveDate::from_ymd_opt(2025, 5, 4).unwrap(),
            description: "Cinema".to_string(),
            amount: Decimal::new(1850, 2),
            bucket_id,
        }
    }

    #[test]
    fn test_create_and_list_with_bucket_resolved() {
        let conn = establish_test_connection().unwrap();
        let bucket_id = seed_bucket(&conn);
        create_transaction(&conn, new_transaction(Some(bucket_id.clone()))).unwrap();

        let listed = list_transactions(&conn).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].bucket.as_ref().unwrap().id, bucket_id);
    }

    #[test]
    fn test_create_with_unknown_bucket_is_validation_error() {
        let conn = establish_test_connection().unwrap();
        let result = create_transaction(&conn, new_transaction(Some(Uuid::new_v4().to_string())));
        assert!(matches!(result, Err(AppError::Validation { .. })));
        assert!(list_transactions(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_assign_then_clear() {
        let conn = establish_test_connection().unwrap();
        let bucket_id = seed_bucket(&conn);
        let created = create_transaction(&conn, new_transaction(None)).unwrap();
        let id = created.transaction.id;

        let assigned = assign_bucket(&conn, &id, Some(&bucket_id)).unwrap();
        assert_eq!(assigned.transaction.bucket_id.as_deref(), Some(bucket_id.as_str()));
        assert_eq!(assigned.bucket.unwrap().name, "Fun");

        let cleared = assign_bucket(&conn, &id, None).unwrap();
        assert!(cleared.transaction.bucket_id.is_none());
        assert!(cleared.bucket.is_none());
    }

    #[test]
    fn test_assign_missing_transaction() {
        let conn = establish_test_connection().unwrap();
        let result = assign_bucket(&conn, "missing", None);
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[test]
    fn test_get_and_delete_transaction() {
        let conn = establish_test_connection().unwrap();
        let created = create_transaction(&conn, new_transaction(None)).unwrap();
        let id = created.transaction.id;

        assert_eq!(get_transaction(&conn, &id).unwrap().transaction.description, "Cinema");
        delete_transaction(&conn, &id).unwrap();
        assert!(matches!(get_transaction(&conn, &id), Err(AppError::NotFound { .. })));
        assert!(matches!(delete_transaction(&conn, &id), Err(AppError::NotFound { .. })));
    }
}
