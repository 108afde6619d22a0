use super::{format_timestamp, read_decimal, read_timestamp};
use crate::error::{AppError, Result};
use crate::models::bucket::{Bucket, BucketChanges, Period};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use std::str::FromStr;

const BUCKET_COLUMNS: &str = "id, name, size, period, created_at";

fn bucket_from_row(row: &Row<'_>) -> rusqlite::Result<Bucket> {
    let period_str: String = row.get(3)?;
    let period = Period::from_str(&period_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into())
    })?;

    Ok(Bucket {
        id: row.get(0)?,
        name: row.get(1)?,
        size: read_decimal(row, 2)?,
        period,
        created_at: read_timestamp(row, 4)?,
    })
}

pub fn add_bucket(conn: &Connection, bucket: &Bucket) -> Result<()> {
    conn.execute(
        "INSERT INTO buckets (id, name, size, period, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            &bucket.id,
            &bucket.name,
            bucket.size.to_string(),
            bucket.period.as_str(),
            format_timestamp(bucket.created_at),
        ],
    )?;
    Ok(())
}

/// All buckets, newest first.
pub fn get_all_buckets(conn: &Connection) -> Result<Vec<Bucket>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM buckets ORDER BY created_at DESC, rowid DESC",
        BUCKET_COLUMNS
    ))?;

    let iter = stmt.query_map([], bucket_from_row)?;

    let mut buckets = Vec::new();
    for bucket in iter {
        buckets.push(bucket?);
    }
    Ok(buckets)
}

pub fn get_bucket(conn: &Connection, id: &str) -> Result<Option<Bucket>> {
    let bucket = conn
        .query_row(
            &format!("SELECT {} FROM buckets WHERE id = ?1", BUCKET_COLUMNS),
            [id],
            bucket_from_row,
        )
        .optional()?;
    Ok(bucket)
}

pub fn bucket_exists(conn: &Connection, id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM buckets WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// Writes only the supplied fields and returns the stored bucket.
pub fn update_bucket(conn: &Connection, id: &str, changes: &BucketChanges) -> Result<Bucket> {
    let mut bucket = get_bucket(conn, id)?.ok_or_else(|| AppError::not_found("Bucket"))?;
    if changes.is_empty() {
        return Ok(bucket);
    }

    changes.apply_to(&mut bucket);
    conn.execute(
        "UPDATE buckets SET name = ?1, size = ?2, period = ?3 WHERE id = ?4",
        rusqlite::params![
            &bucket.name,
            bucket.size.to_string(),
            bucket.period.as_str(),
            id,
        ],
    )?;
    Ok(bucket)
}

pub fn delete_bucket(conn: &Connection, id: &str) -> Result<()> {
    let rows = conn.execute("DELETE FROM buckets WHERE id = ?1", [id])?;

    if rows == 0 {
        return Err(AppError::not_found("Bucket"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::establish_test_connection;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    fn create_test_bucket(id: &str, name: &str) -> Bucket {
        Bucket::new(
            id.to_string(),
            name.to_string(),
            Decimal::new(30000, 2),
            Period::Monthly,
            Utc::now(),
        )
    }

    #[test]
    fn test_add_and_get_bucket() {
        let conn = establish_test_connection().unwrap();
        let bucket = create_test_bucket("b1", "Food");
        add_bucket(&conn, &bucket).unwrap();

        let stored = get_bucket(&conn, "b1").unwrap().unwrap();
        assert_eq!(stored.name, "Food");
        assert_eq!(stored.size, Decimal::new(30000, 2));
        assert_eq!(stored.period, Period::Monthly);
    }

    #[test]
    fn test_get_bucket_missing_is_none() {
        let conn = establish_test_connection().unwrap();
        assert!(get_bucket(&conn, "nope").unwrap().is_none());
        assert!(!bucket_exists(&conn, "nope").unwrap());
    }

    #[test]
    fn test_add_bucket_duplicate_id() {
        let conn = establish_test_connection().unwrap();
        let bucket = create_test_bucket("b1", "Food");
        add_bucket(&conn, &bucket).unwrap();

        let result = add_bucket(&conn, &bucket);
        assert!(matches!(result, Err(AppError::Duplicate)));
    }

    #[test]
    fn test_get_all_buckets_newest_first() {
        let conn = establish_test_connection().unwrap();
        let mut older = create_test_bucket("old", "Old");
        older.created_at = Utc::now() - Duration::days(2);
        let newer = create_test_bucket("new", "New");

        add_bucket(&conn, &older).unwrap();
        add_bucket(&conn, &newer).unwrap();

        let buckets = get_all_buckets(&conn).unwrap();
        let ids: Vec<&str> = buckets.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[test]
    fn test_update_bucket_partial() {
        let conn = establish_test_connection().unwrap();
        add_bucket(&conn, &create_test_bucket("b1", "Food")).unwrap();

        let changes = BucketChanges {
            name: Some("X".to_string()),
            ..Default::default()
        };
        update_bucket(&conn, "b1", &changes).unwrap();

        let stored = get_bucket(&conn, "b1").unwrap().unwrap();
        assert_eq!(stored.name, "X");
        assert_eq!(stored.size, Decimal::new(30000, 2));
        assert_eq!(stored.period, Period::Monthly);
    }

    #[test]
    fn test_update_bucket_not_found() {
        let conn = establish_test_connection().unwrap();
        let result = update_bucket(&conn, "missing", &BucketChanges::default());
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }

    #[test]
    fn test_delete_bucket_success_and_not_found() {
        let conn = establish_test_connection().unwrap();
        add_bucket(&conn, &create_test_bucket("b1", "Food")).unwrap();

        assert!(delete_bucket(&conn, "b1").is_ok());
        assert!(get_all_buckets(&conn).unwrap().is_empty());

        let result = delete_bucket(&conn, "b1");
        assert!(matches!(result, Err(AppError::NotFound { .. })));
    }
}
