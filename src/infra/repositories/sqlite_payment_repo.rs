use crate::domain::models::booking::{status, Booking};
use crate::domain::models::payment::{ApprovalLink, PaymentRecord};
use crate::domain::ports::PaymentRepository;
use crate::domain::services::reconciliation::unit_suffix;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

pub struct SqlitePaymentRepo {
    pool: SqlitePool,
}

impl SqlitePaymentRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepo {
    async fn upsert(&self, record: &PaymentRecord) -> Result<(PaymentRecord, bool), AppError> {
        // Keyed by the external invoice id: re-delivery of the same event
        // must neither duplicate nor alter the recorded row.
        let result = sqlx::query(
            "INSERT INTO payment_records (id, invoice_id, client_id, unit, fee_type, period, paid_at, dismissed, dismissed_reason, dismissed_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(invoice_id) DO NOTHING",
        )
        .bind(&record.id)
        .bind(&record.invoice_id)
        .bind(&record.client_id)
        .bind(&record.unit)
        .bind(&record.fee_type)
        .bind(&record.period)
        .bind(record.paid_at)
        .bind(record.dismissed)
        .bind(&record.dismissed_reason)
        .bind(record.dismissed_at)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        let inserted = result.rows_affected() > 0;

        let stored = sqlx::query_as::<_, PaymentRecord>(
            "SELECT * FROM payment_records WHERE invoice_id = ?",
        )
        .bind(&record.invoice_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok((stored, inserted))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<PaymentRecord>, AppError> {
        sqlx::query_as::<_, PaymentRecord>("SELECT * FROM payment_records WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self) -> Result<Vec<PaymentRecord>, AppError> {
        sqlx::query_as::<_, PaymentRecord>(
            "SELECT * FROM payment_records ORDER BY paid_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn list_matchable(&self) -> Result<Vec<PaymentRecord>, AppError> {
        sqlx::query_as::<_, PaymentRecord>(
            "SELECT p.* FROM payment_records p
             WHERE p.dismissed = 0
               AND p.fee_type != 'unknown'
               AND NOT EXISTS (SELECT 1 FROM approval_links l WHERE l.invoice_id = p.invoice_id)
             ORDER BY p.paid_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn set_fee_type(&self, id: &str, fee_type: &str) -> Result<Option<PaymentRecord>, AppError> {
        sqlx::query_as::<_, PaymentRecord>(
            "UPDATE payment_records SET fee_type = ? WHERE id = ? RETURNING *",
        )
        .bind(fee_type)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn dismiss(&self, id: &str, reason: &str) -> Result<Option<PaymentRecord>, AppError> {
        sqlx::query_as::<_, PaymentRecord>(
            "UPDATE payment_records
             SET dismissed = 1, dismissed_reason = ?, dismissed_at = ?
             WHERE id = ? RETURNING *",
        )
        .bind(reason)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn restore(&self, id: &str) -> Result<Option<PaymentRecord>, AppError> {
        sqlx::query_as::<_, PaymentRecord>(
            "UPDATE payment_records
             SET dismissed = 0, dismissed_reason = NULL, dismissed_at = NULL
             WHERE id = ? RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn has_link_for_invoice(&self, invoice_id: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM approval_links WHERE invoice_id = ?")
            .bind(invoice_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(row.get::<i64, _>("count") > 0)
    }

    async fn find_candidate_booking(
        &self,
        unit: &str,
        booking_type: &str,
        statuses: &[&str],
        period: Option<&str>,
    ) -> Result<Option<Booking>, AppError> {
        // Statuses come from internal constants, never from input.
        let status_list = statuses
            .iter()
            .map(|s| format!("'{}'", s))
            .collect::<Vec<_>>()
            .join(", ");

        // Unit tolerance: "T4-1105" and "1105" refer to the same suite.
        // Either the stored unit matches the extracted one directly, ends
        // with "-<extracted>", or equals the extracted unit's own suffix.
        let mut sql = format!(
            "SELECT * FROM bookings
             WHERE (unit = ?1 OR unit LIKE '%-' || ?1 OR unit = ?2)
               AND booking_type = ?3
               AND status IN ({})",
            status_list
        );
        if period.is_some() {
            sql.push_str(" AND substr(start_time, 1, 7) = ?4");
        }
        sql.push_str(" ORDER BY start_time ASC LIMIT 1");

        let suffix = unit_suffix(unit).unwrap_or(unit);

        let mut query = sqlx::query_as::<_, Booking>(&sql)
            .bind(unit)
            .bind(suffix)
            .bind(booking_type);
        if let Some(p) = period {
            query = query.bind(p);
        }

        query.fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn approve_with_link(
        &self,
        booking_id: &str,
        record: &PaymentRecord,
        approver: &str,
    ) -> Result<bool, AppError> {
        let link = ApprovalLink::new(booking_id, record);
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        // The invoice-unique index makes a duplicate match attempt lose
        // here; that payment already approved something, so not a failure.
        let insert = sqlx::query(
            "INSERT INTO approval_links (id, booking_id, client_id, invoice_id, period, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&link.id)
        .bind(&link.booking_id)
        .bind(&link.client_id)
        .bind(&link.invoice_id)
        .bind(&link.period)
        .bind(link.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = insert {
            let err = AppError::Database(e);
            if err.is_unique_violation() {
                return Ok(false);
            }
            return Err(err);
        }

        // Status guard re-verified at the moment of update: a concurrent
        // manual approval wins and this transaction rolls back.
        let result = sqlx::query(
            "UPDATE bookings SET status = ?, approved_by = ?, approved_at = ?
             WHERE id = ? AND status IN ('SUBMITTED', 'PENDING')",
        )
        .bind(status::APPROVED)
        .bind(approver)
        .bind(Utc::now())
        .bind(booking_id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(true)
    }

    async fn attach_link(&self, booking_id: &str, record: &PaymentRecord) -> Result<bool, AppError> {
        let link = ApprovalLink::new(booking_id, record);
        let result = sqlx::query(
            "INSERT INTO approval_links (id, booking_id, client_id, invoice_id, period, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(invoice_id) DO NOTHING",
        )
        .bind(&link.id)
        .bind(&link.booking_id)
        .bind(&link.client_id)
        .bind(&link.invoice_id)
        .bind(&link.period)
        .bind(link.created_at)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
