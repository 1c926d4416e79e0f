//! PostgreSQL implementation of PaymentRepository.
//!
//! Provides persistent storage for payment records using PostgreSQL.
//! The ordering invariant is enforced by a conditional UPDATE: the
//! timestamp comparison and the write are one statement, so competing
//! consumers cannot interleave between check and write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, ExternalReference, PaymentId, Timestamp,
};
use crate::domain::payment::{PaymentRecord, PaymentStatus, StatusChange};
use crate::ports::{PaymentRepository, UpdateOutcome};

/// PostgreSQL implementation of the `PaymentRepository` port.
///
/// Uses sqlx with connection pooling. Expects a `payments` table with
/// columns matching `PaymentRow`; `metadata` is stored as a JSON text
/// column.
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    /// Creates a new repository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payment record.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    external_reference: String,
    external_payment_id: Option<String>,
    amount_cents: i64,
    currency: String,
    status: String,
    status_detail: Option<String>,
    created_at: DateTime<Utc>,
    last_updated_at: DateTime<Utc>,
    payer_email: String,
    metadata: String,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let status = parse_status(&row.status)?;
        let metadata = serde_json::from_str(&row.metadata).map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid metadata JSON: {}", e),
            )
        })?;

        Ok(PaymentRecord {
            id: PaymentId::from_uuid(row.id),
            external_reference: ExternalReference::from_string(row.external_reference),
            external_payment_id: row.external_payment_id,
            amount_cents: row.amount_cents,
            currency: row.currency,
            status,
            status_detail: row.status_detail,
            created_at: Timestamp::from_datetime(row.created_at),
            last_updated_at: Timestamp::from_datetime(row.last_updated_at),
            payer_email: row.payer_email,
            metadata,
        })
    }
}

fn parse_status(s: &str) -> Result<PaymentStatus, DomainError> {
    match s {
        "unknown" => Ok(PaymentStatus::Unknown),
        other => PaymentStatus::parse(other).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid status value: {}", other),
            )
        }),
    }
}

fn db_error(e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Database error: {}", e))
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert(&self, record: &PaymentRecord) -> Result<(), DomainError> {
        let metadata = serde_json::to_string(&record.metadata).map_err(|e| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("Metadata serialization failed: {}", e),
            )
        })?;

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, external_reference, external_payment_id, amount_cents,
                currency, status, status_detail, created_at, last_updated_at,
                payer_email, metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.external_reference.as_str())
        .bind(&record.external_payment_id)
        .bind(record.amount_cents)
        .bind(&record.currency)
        .bind(record.status.as_str())
        .bind(&record.status_detail)
        .bind(record.created_at.as_datetime())
        .bind(record.last_updated_at.as_datetime())
        .bind(&record.payer_email)
        .bind(metadata)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn find_by_external_payment_id(
        &self,
        external_payment_id: &str,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, external_reference, external_payment_id, amount_cents,
                   currency, status, status_detail, created_at, last_updated_at,
                   payer_email, metadata
            FROM payments
            WHERE external_payment_id = $1
            "#,
        )
        .bind(external_payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(PaymentRecord::try_from).transpose()
    }

    async fn find_by_reference(
        &self,
        reference: &ExternalReference,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, external_reference, external_payment_id, amount_cents,
                   currency, status, status_detail, created_at, last_updated_at,
                   payer_email, metadata
            FROM payments
            WHERE external_reference = $1
            "#,
        )
        .bind(reference.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(PaymentRecord::try_from).transpose()
    }

    async fn update_if_newer(&self, change: &StatusChange) -> Result<UpdateOutcome, DomainError> {
        // One conditional statement: the WHERE clause is the CAS.
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $2,
                status_detail = $3,
                last_updated_at = $4,
                external_payment_id = COALESCE(external_payment_id, $5)
            WHERE id = $1 AND last_updated_at <= $4
            "#,
        )
        .bind(change.payment_id.as_uuid())
        .bind(change.new_status.as_str())
        .bind(&change.status_detail)
        .bind(change.effective_at.as_datetime())
        .bind(&change.external_payment_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() > 0 {
            return Ok(UpdateOutcome::Applied);
        }

        // Distinguish "record is newer" from "record does not exist".
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM payments WHERE id = $1")
            .bind(change.payment_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        if exists.is_some() {
            Ok(UpdateOutcome::Stale)
        } else {
            Ok(UpdateOutcome::NotFound)
        }
    }
}
