use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use stl_common::{Currency, MinorUnits};

use crate::{
    db_types::{OrderId, PushTransaction, TenantId},
    push_payment::PushStatus,
    stl_api::errors::StoreError,
};

#[derive(FromRow)]
struct PushTransactionRow {
    transaction_id: String,
    tenant_id: String,
    provider_id: String,
    payer_reference: String,
    order_id: String,
    amount: i64,
    currency: String,
    status: String,
    raw_code: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PushTransactionRow> for PushTransaction {
    type Error = StoreError;

    fn try_from(row: PushTransactionRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<PushStatus>()
            .map_err(|e| StoreError::CorruptRecord(format!("push transaction {}. {e}", row.transaction_id)))?;
        let currency = row
            .currency
            .parse::<Currency>()
            .map_err(|e| StoreError::CorruptRecord(format!("push transaction {}. {e}", row.transaction_id)))?;
        Ok(Self {
            transaction_id: row.transaction_id,
            tenant_id: TenantId(row.tenant_id),
            provider_id: row.provider_id,
            payer_reference: row.payer_reference,
            order_id: OrderId(row.order_id),
            amount: MinorUnits::from(row.amount),
            currency,
            status,
            raw_code: row.raw_code,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_PUSH_TRANSACTION: &str = r#"
    SELECT transaction_id, tenant_id, provider_id, payer_reference, order_id, amount, currency, status, raw_code,
           created_at, updated_at
    FROM push_transactions
"#;

pub async fn insert(transaction: &PushTransaction, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    sqlx::query(
        r#"
            INSERT INTO push_transactions (
                transaction_id,
                tenant_id,
                provider_id,
                payer_reference,
                order_id,
                amount,
                currency,
                status,
                raw_code,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(transaction.transaction_id.as_str())
    .bind(transaction.tenant_id.as_str())
    .bind(transaction.provider_id.as_str())
    .bind(transaction.payer_reference.as_str())
    .bind(transaction.order_id.as_str())
    .bind(transaction.amount.value())
    .bind(transaction.currency.as_str())
    .bind(transaction.status.as_str())
    .bind(transaction.raw_code.as_deref())
    .bind(transaction.created_at)
    .bind(transaction.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch(transaction_id: &str, conn: &mut SqliteConnection) -> Result<Option<PushTransaction>, StoreError> {
    let query = format!("{SELECT_PUSH_TRANSACTION} WHERE transaction_id = $1");
    let row = sqlx::query_as::<_, PushTransactionRow>(&query).bind(transaction_id).fetch_optional(conn).await?;
    row.map(PushTransaction::try_from).transpose()
}

/// Sets the status of the transaction if it is still `expected`. When `raw_code` is `None` the previous raw code is
/// kept.
pub async fn update_status(
    transaction_id: &str,
    expected: PushStatus,
    status: PushStatus,
    raw_code: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
            UPDATE push_transactions
            SET status = $1, raw_code = COALESCE($2, raw_code), updated_at = $3
            WHERE transaction_id = $4 AND status = $5
        "#,
    )
    .bind(status.as_str())
    .bind(raw_code)
    .bind(Utc::now())
    .bind(transaction_id)
    .bind(expected.as_str())
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return match fetch(transaction_id, conn).await? {
            Some(current) => Err(StoreError::StatusChanged {
                transaction_id: transaction_id.to_string(),
                expected,
                actual: current.status,
            }),
            None => Err(StoreError::NotFound(format!("push transaction {transaction_id}"))),
        };
    }
    Ok(())
}

pub async fn fetch_open(conn: &mut SqliteConnection) -> Result<Vec<PushTransaction>, StoreError> {
    let query = format!("{SELECT_PUSH_TRANSACTION} WHERE status IN ($1, $2, $3) ORDER BY created_at ASC");
    let rows = sqlx::query_as::<_, PushTransactionRow>(&query)
        .bind(PushStatus::Initiated.as_str())
        .bind(PushStatus::Pending.as_str())
        .bind(PushStatus::Unknown.as_str())
        .fetch_all(conn)
        .await?;
    rows.into_iter().map(PushTransaction::try_from).collect()
}
