//! Append-only ledger records: payments and the enrollments they buy.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::class::ClassId;
use super::user::UserEmail;

/// Maximum accepted transaction reference length.
pub const TRANSACTION_REF_MAX: usize = 255;

/// Validation errors for [`TransactionRef`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionRefValidationError {
    Empty,
    TooLong { max: usize },
    Whitespace,
}

impl fmt::Display for TransactionRefValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "transaction reference must not be empty"),
            Self::TooLong { max } => {
                write!(f, "transaction reference must be at most {max} characters")
            }
            Self::Whitespace => write!(f, "transaction reference must not contain whitespace"),
        }
    }
}

impl std::error::Error for TransactionRefValidationError {}

/// Gateway-issued reference of a confirmed payment.
///
/// The reference is the settlement idempotency key: storage enforces its
/// uniqueness on the payments collection.
///
/// # Examples
/// ```
/// use marketplace::domain::TransactionRef;
///
/// let reference = TransactionRef::new("pi_3Nq").expect("valid reference");
/// assert_eq!(reference.as_ref(), "pi_3Nq");
/// assert!(TransactionRef::new("  ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionRef(String);

impl TransactionRef {
    /// Validate and construct a [`TransactionRef`].
    pub fn new(reference: impl Into<String>) -> Result<Self, TransactionRefValidationError> {
        let reference = reference.into();
        if reference.trim().is_empty() {
            return Err(TransactionRefValidationError::Empty);
        }
        if reference.chars().any(char::is_whitespace) {
            return Err(TransactionRefValidationError::Whitespace);
        }
        if reference.chars().count() > TRANSACTION_REF_MAX {
            return Err(TransactionRefValidationError::TooLong {
                max: TRANSACTION_REF_MAX,
            });
        }
        Ok(Self(reference))
    }
}

impl AsRef<str> for TransactionRef {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for TransactionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<TransactionRef> for String {
    fn from(value: TransactionRef) -> Self {
        value.0
    }
}

impl TryFrom<String> for TransactionRef {
    type Error = TransactionRefValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Amount charged by the gateway, in minor currency units.
///
/// The core records the amount verbatim and never derives it from prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// Wrap an amount in minor units.
    pub fn from_minor_units(value: u64) -> Self {
        Self(value)
    }

    /// Amount in minor units.
    pub fn minor_units(self) -> u64 {
        self.0
    }
}

/// Identifier shared by the ledger record types.
macro_rules! ledger_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap a UUID loaded from storage.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

ledger_id!(
    /// Stable enrollment identifier.
    EnrollmentId
);
ledger_id!(
    /// Stable payment identifier.
    PaymentId
);

/// Binding of a user to the classes bought in one settlement.
///
/// `class_ids` keeps purchase order; enrollments are immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub user_email: UserEmail,
    pub class_ids: Vec<ClassId>,
    pub transaction_ref: TransactionRef,
    pub enrolled_at: DateTime<Utc>,
}

/// Payment ledger entry for one settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub user_email: UserEmail,
    pub class_ids: Vec<ClassId>,
    pub amount: Amount,
    pub transaction_ref: TransactionRef,
    pub paid_at: DateTime<Utc>,
}
