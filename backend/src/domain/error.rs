//! Domain-level error types.
//!
//! These errors are transport agnostic. Whatever sits in front of the core
//! (HTTP handlers, queue consumers, a CLI) maps them onto its own envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{
    ClassValidationError, PurchaseValidationError, TransactionRefValidationError,
    UserValidationError,
};

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// The principal's role or ownership does not permit the operation.
    Forbidden,
    /// A referenced class, user, or cart item does not exist.
    NotFound,
    /// A class has no seats left to sell.
    InsufficientCapacity,
    /// The request clashes with state already recorded under the same key.
    Conflict,
    /// Storage is unreachable or timed out; the caller may retry.
    ServiceUnavailable,
    /// An unexpected error occurred inside the domain or an adapter.
    InternalError,
}

/// Domain error payload.
///
/// ## Invariants
/// - `message` must be non-empty once trimmed of whitespace.
///
/// # Examples
/// ```
/// use marketplace::domain::{Error, ErrorCode};
///
/// let err = Error::not_found("class missing");
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// assert!(!err.is_retryable());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
#[serde(try_from = "ErrorDto", into = "ErrorDto")]
pub struct Error {
    code: ErrorCode,
    message: String,
    details: Option<Value>,
}

/// Validation errors emitted by the constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorValidationError {
    EmptyMessage,
}

impl std::fmt::Display for ErrorValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "error message must not be empty"),
        }
    }
}

impl std::error::Error for ErrorValidationError {}

impl Error {
    /// Create a new error, panicking if validation fails.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        match Self::try_new(code, message) {
            Ok(value) => value,
            Err(err) => panic!("error messages must satisfy validation: {err}"),
        }
    }

    /// Fallible constructor that validates the message content.
    pub fn try_new(code: ErrorCode, message: impl Into<String>) -> Result<Self, ErrorValidationError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ErrorValidationError::EmptyMessage);
        }
        Ok(Self {
            code,
            message,
            details: None,
        })
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message returned to adapters.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Supplementary error details for adapters.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Only storage outages and timeouts qualify; settlement retries must
    /// reuse the original transaction reference.
    pub fn is_retryable(&self) -> bool {
        self.code == ErrorCode::ServiceUnavailable
    }

    /// Attach structured details to the error.
    ///
    /// # Examples
    /// ```
    /// use marketplace::domain::{Error, ErrorCode};
    /// use serde_json::json;
    ///
    /// let err = Error::new(ErrorCode::InvalidRequest, "bad")
    ///     .with_details(json!({ "field": "price" }));
    /// assert!(err.details().is_some());
    /// ```
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// [`ErrorCode::InvalidRequest`] naming the offending field in
    /// `details.field`.
    ///
    /// # Examples
    /// ```
    /// use marketplace::domain::{Error, TransactionRef};
    /// use serde_json::json;
    ///
    /// let violation = TransactionRef::new("").expect_err("empty reference");
    /// let err = Error::from(violation);
    /// assert_eq!(
    ///     err.details().and_then(|d| d.get("field")),
    ///     Some(&json!("transactionRef"))
    /// );
    /// ```
    pub fn invalid_field(violation: &impl FieldViolation) -> Self {
        Self::invalid_request(violation.to_string()).with_details(json!({ "field": violation.field() }))
    }

    /// Convenience constructor for [`ErrorCode::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::InsufficientCapacity`].
    pub fn insufficient_capacity(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InsufficientCapacity, message)
    }

    /// Convenience constructor for [`ErrorCode::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Convenience constructor for [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

/// A validation failure tied to one request field.
pub trait FieldViolation: std::fmt::Display {
    /// camelCase name of the rejected field.
    fn field(&self) -> &'static str;
}

impl FieldViolation for ClassValidationError {
    fn field(&self) -> &'static str {
        match self {
            Self::EmptyName | Self::NameTooLong { .. } => "name",
            Self::NegativePrice { .. } => "priceCents",
            Self::NegativeSeats { .. } | Self::SeatsOutOfRange { .. } => "availableSeats",
            Self::MissingRejectionReason | Self::RejectionReasonTooLong { .. } => "reason",
            Self::UnknownStatus { .. } => "status",
        }
    }
}

impl FieldViolation for UserValidationError {
    fn field(&self) -> &'static str {
        match self {
            Self::EmptyEmail | Self::EmailTooLong { .. } | Self::MalformedEmail => "email",
            Self::EmptyDisplayName | Self::DisplayNameTooLong { .. } => "displayName",
            Self::UnknownRole { .. } => "role",
        }
    }
}

impl FieldViolation for PurchaseValidationError {
    fn field(&self) -> &'static str {
        "classIds"
    }
}

impl FieldViolation for TransactionRefValidationError {
    fn field(&self) -> &'static str {
        "transactionRef"
    }
}

macro_rules! invalid_request_from {
    ($($violation:ty),* $(,)?) => {
        $(
            impl From<$violation> for Error {
                fn from(violation: $violation) -> Self {
                    Self::invalid_field(&violation)
                }
            }
        )*
    };
}

invalid_request_from!(
    ClassValidationError,
    UserValidationError,
    PurchaseValidationError,
    TransactionRefValidationError,
);

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDto {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl From<Error> for ErrorDto {
    fn from(value: Error) -> Self {
        Self {
            code: value.code,
            message: value.message,
            details: value.details,
        }
    }
}

impl TryFrom<ErrorDto> for Error {
    type Error = ErrorValidationError;

    fn try_from(value: ErrorDto) -> Result<Self, Self::Error> {
        let ErrorDto {
            code,
            message,
            details,
        } = value;

        let mut error = Error::try_new(code, message)?;
        error.details = details;
        Ok(error)
    }
}

#[cfg(test)]
mod tests;
