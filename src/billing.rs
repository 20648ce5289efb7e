//! Payment-outcome normalization and subscription synchronization.
//!
//! Payments enter the system from several sources (manual admin action,
//! simulated confirmation, gateway callbacks) that do not share a status
//! vocabulary. Everything folds down to two canonical terminal outcomes
//! before it is allowed to touch a subscription.

use rand::Rng;
use sqlx::SqlitePool;

use crate::error::AppError;
use crate::queries::subscription::set_subscription_status;
use crate::types::{PaymentStatus, SubscriptionStatus};

/// Canonical terminal payment outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Completed,
    Failed,
}

impl PaymentOutcome {
    pub fn payment_status(self) -> PaymentStatus {
        match self {
            PaymentOutcome::Completed => PaymentStatus::Completed,
            PaymentOutcome::Failed => PaymentStatus::Failed,
        }
    }

    pub fn subscription_status(self) -> SubscriptionStatus {
        match self {
            PaymentOutcome::Completed => SubscriptionStatus::Active,
            PaymentOutcome::Failed => SubscriptionStatus::PendingPayment,
        }
    }
}

/// Fold a raw status string into a canonical outcome. `None` means the
/// vocabulary is unrecognized and the request must be rejected.
pub fn normalize_outcome(raw: &str) -> Option<PaymentOutcome> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "COMPLETED" | "SUCCESS" | "VALIDATED" | "APPROVED" => Some(PaymentOutcome::Completed),
        "FAILED" | "REJECTED" | "DECLINED" => Some(PaymentOutcome::Failed),
        _ => None,
    }
}

/// Short verification code handed out for non-cash payments.
pub fn generate_verification_code() -> String {
    let mut rng = rand::rng();
    format!("{:04}", rng.random_range(0..10_000))
}

/// Propagate a canonical outcome onto the owning subscription.
///
/// The write is an unconditional overwrite regardless of the subscription's
/// prior status: COMPLETED activates it, FAILED parks it back on
/// PENDING_PAYMENT. Concurrent verifications race and the last writer wins.
pub async fn sync_subscription_for_payment(
    pool: &SqlitePool,
    subscription_id: &str,
    outcome: PaymentOutcome,
) -> Result<(), AppError> {
    let status = outcome.subscription_status();
    let affected = set_subscription_status(pool, subscription_id, status).await?;
    if affected == 0 {
        return Err(AppError::not_found("Subscription"));
    }

    tracing::info!(
        subscription_id,
        status = %status,
        "Subscription status synced from payment outcome"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_vocabulary_folds_to_completed() {
        for raw in ["COMPLETED", "SUCCESS", "VALIDATED", "APPROVED", "success"] {
            assert_eq!(normalize_outcome(raw), Some(PaymentOutcome::Completed), "{raw}");
        }
    }

    #[test]
    fn failed_vocabulary_folds_to_failed() {
        for raw in ["FAILED", "REJECTED", "DECLINED", "declined"] {
            assert_eq!(normalize_outcome(raw), Some(PaymentOutcome::Failed), "{raw}");
        }
    }

    #[test]
    fn unknown_vocabulary_is_rejected() {
        assert_eq!(normalize_outcome("WHATEVER"), None);
        assert_eq!(normalize_outcome(""), None);
        assert_eq!(normalize_outcome("REFUNDED"), None);
    }

    #[test]
    fn outcome_maps_deterministically() {
        assert_eq!(
            PaymentOutcome::Completed.subscription_status(),
            SubscriptionStatus::Active
        );
        assert_eq!(
            PaymentOutcome::Failed.subscription_status(),
            SubscriptionStatus::PendingPayment
        );
        assert_eq!(PaymentOutcome::Completed.payment_status(), PaymentStatus::Completed);
        assert_eq!(PaymentOutcome::Failed.payment_status(), PaymentStatus::Failed);
    }

    #[test]
    fn verification_code_is_four_digits() {
        for _ in 0..100 {
            let code = generate_verification_code();
            assert_eq!(code.len(), 4);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
