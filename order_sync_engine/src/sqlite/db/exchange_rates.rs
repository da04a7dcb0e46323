use chrono::NaiveDate;
use sqlx::SqliteConnection;

use crate::{db_types::ExchangeRate, traits::ExchangeRateError};

pub async fn fetch_rate_at(
    ledger: &str,
    date: NaiveDate,
    conn: &mut SqliteConnection,
) -> Result<ExchangeRate, ExchangeRateError> {
    let result: ExchangeRate = sqlx::query_as(
        r#"SELECT ledger, rate, effective_date, created_at
           FROM exchange_rates
           WHERE ledger = $1 AND effective_date <= $2
           ORDER BY effective_date DESC, id DESC LIMIT 1"#,
    )
    .bind(ledger)
    .bind(date)
    .fetch_optional(conn)
    .await
    .map_err(|e| ExchangeRateError::DatabaseError(e.to_string()))?
    .ok_or_else(|| ExchangeRateError::RateDoesNotExist(format!("{ledger} on or before {date}")))?;
    Ok(result)
}

pub async fn fetch_last_rate(ledger: &str, conn: &mut SqliteConnection) -> Result<ExchangeRate, ExchangeRateError> {
    let result: ExchangeRate = sqlx::query_as(
        r#"SELECT ledger, rate, effective_date, created_at
           FROM exchange_rates
           WHERE ledger = $1
           ORDER BY effective_date DESC, id DESC LIMIT 1"#,
    )
    .bind(ledger)
    .fetch_optional(conn)
    .await
    .map_err(|e| ExchangeRateError::DatabaseError(e.to_string()))?
    .ok_or_else(|| ExchangeRateError::RateDoesNotExist(ledger.to_string()))?;
    Ok(result)
}

pub async fn set_exchange_rate(rate: &ExchangeRate, conn: &mut SqliteConnection) -> Result<(), ExchangeRateError> {
    sqlx::query("INSERT INTO exchange_rates (ledger, rate, effective_date) VALUES ($1, $2, $3)")
        .bind(&rate.ledger)
        .bind(rate.rate)
        .bind(rate.effective_date)
        .execute(conn)
        .await
        .map_err(|e| ExchangeRateError::DatabaseError(e.to_string()))?;
    Ok(())
}

pub async fn has_rates(ledger: &str, conn: &mut SqliteConnection) -> Result<bool, ExchangeRateError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM exchange_rates WHERE ledger = $1")
        .bind(ledger)
        .fetch_one(conn)
        .await
        .map_err(|e| ExchangeRateError::DatabaseError(e.to_string()))?;
    Ok(count > 0)
}
