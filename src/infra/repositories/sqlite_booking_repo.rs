use crate::domain::models::booking::Booking;
use crate::domain::ports::BookingRepository;
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{Row, SqlitePool};

pub struct SqliteBookingRepo {
    pool: SqlitePool,
}

impl SqliteBookingRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const INSERT_SQL: &str =
    "INSERT INTO bookings (id, requester_name, requester_email, requester_phone, unit, unit_display, booking_type, start_time, end_time, elevator_required, loading_bay_required, notes, status, created_by, approved_by, approved_at, last_reminder_at, created_at)
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
     RETURNING *";

fn bind_insert<'q>(
    query: sqlx::query::QueryAs<'q, sqlx::Sqlite, Booking, sqlx::sqlite::SqliteArguments<'q>>,
    booking: &'q Booking,
) -> sqlx::query::QueryAs<'q, sqlx::Sqlite, Booking, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(&booking.id)
        .bind(&booking.requester_name)
        .bind(&booking.requester_email)
        .bind(&booking.requester_phone)
        .bind(&booking.unit)
        .bind(&booking.unit_display)
        .bind(&booking.booking_type)
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(booking.elevator_required)
        .bind(booking.loading_bay_required)
        .bind(&booking.notes)
        .bind(&booking.status)
        .bind(&booking.created_by)
        .bind(&booking.approved_by)
        .bind(booking.approved_at)
        .bind(booking.last_reminder_at)
        .bind(booking.created_at)
}

/// Buffered overlap count against calendar-occupying elevator bookings,
/// optionally excluding one booking id (time edits).
async fn count_elevator_overlap(
    executor: &mut sqlx::SqliteConnection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    buffer_min: i64,
    exclude_id: Option<&str>,
) -> Result<i64, AppError> {
    let buffer = Duration::minutes(buffer_min);
    let row = sqlx::query(
        "SELECT COUNT(*) as count FROM bookings
         WHERE elevator_required = 1
           AND status IN ('SUBMITTED', 'PENDING', 'APPROVED')
           AND start_time < ?
           AND end_time > ?
           AND id != ?",
    )
    .bind(end + buffer)
    .bind(start - buffer)
    .bind(exclude_id.unwrap_or(""))
    .fetch_one(executor)
    .await
    .map_err(AppError::Database)?;
    Ok(row.get::<i64, _>("count"))
}

#[async_trait]
impl BookingRepository for SqliteBookingRepo {
    async fn create_checked(&self, booking: &Booking, buffer_min: i64) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        // The conflict read and the insert share one transaction so a
        // concurrent writer cannot land an overlapping booking in between.
        if booking.elevator_required {
            let overlap = count_elevator_overlap(
                &mut *tx,
                booking.start_time,
                booking.end_time,
                buffer_min,
                None,
            )
            .await?;
            if overlap > 0 {
                return Err(AppError::Conflict(format!(
                    "Another elevator booking is within {} minutes of the requested time",
                    buffer_min
                )));
            }
        }

        let created = bind_insert(sqlx::query_as::<_, Booking>(INSERT_SQL), booking)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }

    async fn create(&self, booking: &Booking) -> Result<Booking, AppError> {
        bind_insert(sqlx::query_as::<_, Booking>(INSERT_SQL), booking)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings ORDER BY start_time ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_active_by_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings
             WHERE status IN ('SUBMITTED', 'PENDING', 'APPROVED')
               AND start_time < ? AND end_time > ?",
        )
        .bind(end)
        .bind(start)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn update_decided(
        &self,
        booking: &Booking,
        buffer_min: i64,
        enforce_conflict: bool,
    ) -> Result<Option<Booking>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        if enforce_conflict && booking.elevator_required {
            let overlap = count_elevator_overlap(
                &mut *tx,
                booking.start_time,
                booking.end_time,
                buffer_min,
                Some(&booking.id),
            )
            .await?;
            if overlap > 0 {
                return Err(AppError::Conflict(format!(
                    "Another elevator booking is within {} minutes of the requested time",
                    buffer_min
                )));
            }
        }

        let updated = sqlx::query_as::<_, Booking>(
            "UPDATE bookings
             SET start_time = ?, end_time = ?, status = ?, approved_by = ?, approved_at = ?
             WHERE id = ? AND status IN ('SUBMITTED', 'PENDING')
             RETURNING *",
        )
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(&booking.status)
        .bind(&booking.approved_by)
        .bind(booking.approved_at)
        .bind(&booking.id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(updated)
    }

    async fn transition_status(
        &self,
        id: &str,
        to: &str,
        approver: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = ?, approved_by = ?, approved_at = ?
             WHERE id = ? AND status IN ('SUBMITTED', 'PENDING')
             RETURNING *",
        )
        .bind(to)
        .bind(approver)
        .bind(at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn list_stale_undecided(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings
             WHERE status IN ('SUBMITTED', 'PENDING') AND created_at < ?
             ORDER BY created_at ASC",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        // Audit rows must never point at a missing booking: null the
        // reference and keep the original id inside the metadata blob.
        sqlx::query(
            "UPDATE audit_log
             SET metadata = json_set(metadata, '$.orphaned_subject_id', subject_id),
                 subject_id = NULL
             WHERE subject_id = ?",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let result = sqlx::query("DELETE FROM bookings WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Booking not found".into()));
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }
}
