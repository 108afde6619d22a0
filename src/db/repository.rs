use super::{format_date, format_timestamp, read_date, read_decimal, read_timestamp};
use crate::db::bucket_repository;
use crate::error::{AppError, Result};
use crate::models::transaction::{Transaction, TransactionWithBucket};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};
use std::collections::HashMap;

const TRANSACTION_COLUMNS: &str = "id, date, description, amount, bucket_id, created_at";

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        date: read_date(row, 1)?,
        description: row.get(2)?,
        amount: read_decimal(row, 3)?,
        bucket_id: row.get(4)?,
        created_at: read_timestamp(row, 5)?,
    })
}

fn query_transactions<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(sql)?;
    let transaction_iter = stmt.query_map(params, transaction_from_row)?;

    let mut transactions = Vec::new();
    for transaction in transaction_iter {
        transactions.push(transaction?);
    }
    Ok(transactions)
}

pub fn add_transaction(conn: &Connection, transaction: &Transaction) -> Result<()> {
    conn.execute(
        "INSERT INTO transactions (id, date, description, amount, bucket_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            &transaction.id,
            format_date(transaction.date),
            &transaction.description,
            transaction.amount.to_string(),
            &transaction.bucket_id,
            format_timestamp(transaction.created_at),
        ],
    )?;
    Ok(())
}

/// All transactions, most recent date first.
pub fn get_all_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    query_transactions(
        conn,
        &format!(
            "SELECT {} FROM transactions ORDER BY date DESC, created_at DESC",
            TRANSACTION_COLUMNS
        ),
        [],
    )
}

pub fn get_transaction(conn: &Connection, id: &str) -> Result<Option<Transaction>> {
    let transaction = conn
        .query_row(
            &format!("SELECT {} FROM transactions WHERE id = ?1", TRANSACTION_COLUMNS),
            [id],
            transaction_from_row,
        )
        .optional()?;
    Ok(transaction)
}

pub fn get_transactions_for_bucket(conn: &Connection, bucket_id: &str) -> Result<Vec<Transaction>> {
    query_transactions(
        conn,
        &format!(
            "SELECT {} FROM transactions WHERE bucket_id = ?1 ORDER BY date DESC, created_at DESC",
            TRANSACTION_COLUMNS
        ),
        [bucket_id],
    )
}

/// Transactions assigned to `bucket_id` dated within `[start_date, end_date]`.
pub fn get_bucket_transactions_in_range(
    conn: &Connection,
    bucket_id: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Vec<Transaction>> {
    query_transactions(
        conn,
        &format!(
            "SELECT {} FROM transactions \
             WHERE bucket_id = ?1 AND date >= ?2 AND date <= ?3 \
             ORDER BY date ASC",
            TRANSACTION_COLUMNS
        ),
        rusqlite::params![bucket_id, format_date(start_date), format_date(end_date)],
    )
}

/// Resolves each transaction's bucket reference with one bucket lookup pass.
pub fn with_buckets(
    conn: &Connection,
    transactions: Vec<Transaction>,
) -> Result<Vec<TransactionWithBucket>> {
    let mut cache = HashMap::new();
    let mut resolved = Vec::with_capacity(transactions.len());

    for transaction in transactions {
        let bucket = match transaction.bucket_id {
            Some(ref bucket_id) => {
                if !cache.contains_key(bucket_id) {
                    let bucket = bucket_repository::get_bucket(conn, bucket_id)?;
                    cache.insert(bucket_id.clone(), bucket);
                }
                cache.get(bucket_id).cloned().flatten()
            }
            None => None,
        };
        resolved.push(TransactionWithBucket { transaction, bucket });
    }

    Ok(resolved)
}

/// Sets (or clears, with `None`) the bucket reference.
pub fn set_transaction_bucket(conn: &Connection, id: &str, bucket_id: Option<&str>) -> Result<()> {
    let rows = conn.execute(
        "UPDATE transactions SET bucket_id = ?1 WHERE id = ?2",
        rusqlite::params![bucket_id, id],
    )?;

    if rows == 0 {
        return Err(AppError::not_found("Transaction"));
    }
    Ok(())
}

pub fn remove_transaction(conn: &Connection, id: &str) -> Result<()> {
    let rows_affected = conn.execute("DELETE FROM transactions WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(AppError::not_found("Transaction"));
    }

    Ok(())
}
