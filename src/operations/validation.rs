//! Boundary validation shared by the HTTP handlers and the CLI.
//!
//! Payload structs mirror what a client may send: every field is optional so
//! that "not supplied" stays distinguishable from "supplied but invalid".

use crate::error::{AppError, FieldErrors, Result};
use crate::models::bucket::{BucketChanges, NewBucket, Period};
use crate::models::transaction::NewTransaction;
use crate::operations::import::{parse_amount_value, parse_date_value};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use uuid::Uuid;

const MAX_NAME_LEN: usize = 100;

/// A numeric field that clients may send either as a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(serde_json::Number),
    Text(String),
}

impl NumberOrText {
    fn to_decimal(&self) -> Option<Decimal> {
        let raw = match self {
            NumberOrText::Number(n) => n.to_string(),
            NumberOrText::Text(s) => s.trim().to_string(),
        };
        Decimal::from_str(&raw)
            .or_else(|_| Decimal::from_scientific(&raw))
            .ok()
    }

    fn as_raw(&self) -> String {
        match self {
            NumberOrText::Number(n) => n.to_string(),
            NumberOrText::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BucketPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<NumberOrText>,
    #[serde(default)]
    pub period: Option<String>,
}

/// `bucket_id` is `None` when the field is absent and `Some(None)` when it is
/// an explicit null.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentPayload {
    #[serde(default, deserialize_with = "present")]
    pub bucket_id: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPayload {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<NumberOrText>,
    #[serde(default)]
    pub bucket_id: Option<String>,
}

fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn push(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

fn finish<T>(errors: FieldErrors, value: impl FnOnce() -> T) -> Result<T> {
    if errors.is_empty() {
        Ok(value())
    } else {
        Err(AppError::Validation { errors })
    }
}

fn check_name(errors: &mut FieldErrors, name: &str) -> Option<String> {
    if name.is_empty() {
        push(errors, "name", "Name is required");
        None
    } else if name.chars().count() > MAX_NAME_LEN {
        push(errors, "name", "Name too long");
        None
    } else {
        Some(name.to_string())
    }
}

fn check_size(errors: &mut FieldErrors, size: &NumberOrText) -> Option<Decimal> {
    match size.to_decimal() {
        None => {
            push(errors, "size", "Invalid number");
            None
        }
        Some(value) if value <= Decimal::ZERO => {
            push(errors, "size", "Size must be positive");
            None
        }
        Some(value) => Some(value),
    }
}

fn check_period(errors: &mut FieldErrors, period: &str) -> Option<Period> {
    match Period::from_str(period) {
        Ok(period) => Some(period),
        Err(_) => {
            push(errors, "period", "Period must be either \"monthly\" or \"yearly\"");
            None
        }
    }
}

pub fn validate_new_bucket(payload: &BucketPayload) -> Result<NewBucket> {
    let mut errors = FieldErrors::new();

    let name = match payload.name {
        Some(ref name) => check_name(&mut errors, name),
        None => {
            push(&mut errors, "name", "Required");
            None
        }
    };
    let size = match payload.size {
        Some(ref size) => check_size(&mut errors, size),
        None => {
            push(&mut errors, "size", "Required");
            None
        }
    };
    let period = match payload.period {
        Some(ref period) => check_period(&mut errors, period),
        None => {
            push(&mut errors, "period", "Required");
            None
        }
    };

    match (name, size, period) {
        (Some(name), Some(size), Some(period)) if errors.is_empty() => {
            Ok(NewBucket { name, size, period })
        }
        _ => Err(AppError::Validation { errors }),
    }
}

/// Only supplied fields are checked and carried into the changes.
pub fn validate_bucket_changes(payload: &BucketPayload) -> Result<BucketChanges> {
    let mut errors = FieldErrors::new();

    let name = payload
        .name
        .as_deref()
        .and_then(|name| check_name(&mut errors, name));
    let size = payload
        .size
        .as_ref()
        .and_then(|size| check_size(&mut errors, size));
    let period = payload
        .period
        .as_deref()
        .and_then(|period| check_period(&mut errors, period));

    finish(errors, || BucketChanges { name, size, period })
}

fn check_bucket_id(errors: &mut FieldErrors, raw: &str) -> Option<String> {
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id.to_string()),
        Err(_) => {
            push(errors, "bucketId", "Invalid uuid");
            None
        }
    }
}

/// The target bucket of an assignment; `Ok(None)` means "unassign".
/// The field itself is required, null is a meaningful value, and an empty
/// string is read as null.
pub fn validate_assignment(payload: &AssignmentPayload) -> Result<Option<String>> {
    let mut errors = FieldErrors::new();

    let target = match payload.bucket_id {
        None => {
            push(&mut errors, "bucketId", "Required");
            None
        }
        Some(None) => None,
        Some(Some(ref raw)) if raw.trim().is_empty() => None,
        Some(Some(ref raw)) => check_bucket_id(&mut errors, raw.trim()),
    };

    finish(errors, || target)
}

pub fn validate_new_transaction(payload: &TransactionPayload) -> Result<NewTransaction> {
    let mut errors = FieldErrors::new();

    let date = match payload.date.as_deref().map(str::trim) {
        None | Some("") => {
            push(&mut errors, "date", "Required");
            None
        }
        Some(raw) => {
            let parsed = parse_date_value(raw);
            if parsed.is_none() {
                push(&mut errors, "date", format!("Invalid date: {}", raw));
            }
            parsed
        }
    };

    let amount = match payload.amount {
        None => {
            push(&mut errors, "amount", "Required");
            None
        }
        Some(ref raw) => {
            let raw = raw.as_raw();
            match parse_amount_value(&raw) {
                Ok(amount) => Some(amount.abs()),
                Err(e) => {
                    push(&mut errors, "amount", e.message(&raw));
                    None
                }
            }
        }
    };

    let bucket_id = match payload.bucket_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => check_bucket_id(&mut errors, raw),
    };

    match (date, amount) {
        (Some(date), Some(amount)) if errors.is_empty() => Ok(NewTransaction {
            date,
            description: payload.description.clone().unwrap_or_default(),
            amount,
            bucket_id,
        }),
        _ => Err(AppError::Validation { errors }),
    }
}
