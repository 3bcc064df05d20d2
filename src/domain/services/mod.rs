pub mod conflict;
pub mod notifications;
pub mod reconciliation;
pub mod slot_policy;
