pub mod sqlite_audit_repo;
pub mod sqlite_booking_repo;
pub mod sqlite_payment_repo;
