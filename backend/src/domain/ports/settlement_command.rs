//! Driving port for settling confirmed payments.

use async_trait::async_trait;

use crate::domain::{Error, Principal, SettlementOutcome, SettlementRequest};

/// Driving port for the settlement workflow.
///
/// # Idempotency
///
/// The request's transaction reference keys the settlement:
/// 1. A reference already settled for the same buyer and class list returns
///    the recorded receipt with `replayed: true` and writes nothing.
/// 2. A reference already settled for a different buyer or class list is a
///    conflict.
/// 3. Otherwise the settlement is applied and `replayed` is `false`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettlementCommand: Send + Sync {
    /// Settle a confirmed payment on behalf of `principal`.
    ///
    /// # Errors
    ///
    /// - `forbidden` when the principal is neither the buyer nor an admin.
    /// - `invalid_request` for an empty or duplicated class list.
    /// - `not_found` when a purchased class does not exist.
    /// - `insufficient_capacity` when a purchased class has no seats left.
    /// - `conflict` when the reference was settled with another payload.
    /// - `service_unavailable` on connection loss or timeout.
    async fn settle(
        &self,
        principal: &Principal,
        request: SettlementRequest,
    ) -> Result<SettlementOutcome, Error>;
}
