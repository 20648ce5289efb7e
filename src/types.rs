//! Closed domain vocabularies, stored as TEXT columns.
//!
//! Every enum here round-trips through serde, sqlx and string parsing with
//! the exact SCREAMING_SNAKE_CASE spelling persisted in the database.

use serde::{Deserialize, Serialize};

/// The fixed set of caller roles. A user's role is immutable once created.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Top-level administrator, exempt from school-level filtering.
    Admin,
    /// Administrator of at most one school.
    SchoolAdmin,
    /// Canteen staff attached to their own school.
    CanteenStaff,
    /// Parent of zero or more enrolled students.
    Parent,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MealType {
    Breakfast,
    Lunch,
    Snack,
    Dinner,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MenuStatus {
    Pending,
    Approved,
    Rejected,
}

/// Derived by the payment sync rule; only an explicit admin edit sets it
/// through any other path.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
    PendingPayment,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    WaitingAdminValidation,
    Completed,
    Failed,
    Refunded,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    MobileMoney,
    Card,
    BankTransfer,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    MenuPublished,
    MenuApproved,
    MenuRejected,
    MenuUpdated,
    MenuDeleted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trips_as_screaming_snake_case() {
        assert_eq!(Role::SchoolAdmin.to_string(), "SCHOOL_ADMIN");
        assert_eq!(Role::from_str("CANTEEN_STAFF").unwrap(), Role::CanteenStaff);
        assert!(Role::from_str("TEACHER").is_err());
    }

    #[test]
    fn subscription_status_spellings_match_persisted_values() {
        assert_eq!(
            SubscriptionStatus::PendingPayment.to_string(),
            "PENDING_PAYMENT"
        );
        assert_eq!(
            serde_json::to_value(PaymentStatus::WaitingAdminValidation).unwrap(),
            serde_json::json!("WAITING_ADMIN_VALIDATION")
        );
    }
}
