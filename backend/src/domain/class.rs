//! Class listings and their review lifecycle.
//!
//! A class moves `pending → approved | rejected` under admin review and drops
//! back to `pending` whenever its instructor edits it. Seat and enrollment
//! counters are owned by settlement; catalog edits may only overwrite
//! `available_seats` with an explicit non-negative value.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserEmail;

/// Maximum allowed length for a class name.
pub const CLASS_NAME_MAX: usize = 120;
/// Maximum allowed length for a rejection reason.
pub const REJECTION_REASON_MAX: usize = 500;

/// Validation errors raised while building class values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassValidationError {
    EmptyName,
    NameTooLong { max: usize },
    NegativePrice { value: i64 },
    NegativeSeats { value: i64 },
    SeatsOutOfRange { value: i64 },
    MissingRejectionReason,
    RejectionReasonTooLong { max: usize },
    UnknownStatus { value: String },
}

impl fmt::Display for ClassValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "class name must not be empty"),
            Self::NameTooLong { max } => write!(f, "class name must be at most {max} characters"),
            Self::NegativePrice { value } => write!(f, "price must not be negative (got {value})"),
            Self::NegativeSeats { value } => {
                write!(f, "available seats must not be negative (got {value})")
            }
            Self::SeatsOutOfRange { value } => write!(f, "available seats out of range: {value}"),
            Self::MissingRejectionReason => write!(f, "rejecting a class requires a reason"),
            Self::RejectionReasonTooLong { max } => {
                write!(f, "rejection reason must be at most {max} characters")
            }
            Self::UnknownStatus { value } => write!(f, "unknown class status: {value}"),
        }
    }
}

impl std::error::Error for ClassValidationError {}

/// Stable class identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(Uuid);

impl ClassId {
    /// Generate a new random [`ClassId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap a UUID loaded from storage or supplied by a client.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Review status of a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassStatus {
    Pending,
    Approved,
    Rejected,
}

impl ClassStatus {
    /// Storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for ClassStatus {
    type Err = ClassValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(ClassValidationError::UnknownStatus {
                value: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for ClassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unvalidated class fields as supplied by an instructor.
///
/// Numeric fields are signed so that negative input reaches validation and
/// is reported rather than failing deserialisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDraft {
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub available_seats: i64,
    pub video_url: String,
}

/// Validated editable class fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDetails {
    pub name: String,
    pub description: String,
    pub price_cents: u64,
    pub available_seats: u32,
    pub video_url: String,
}

impl TryFrom<ClassDraft> for ClassDetails {
    type Error = ClassValidationError;

    fn try_from(draft: ClassDraft) -> Result<Self, Self::Error> {
        let name = draft.name.trim().to_owned();
        if name.is_empty() {
            return Err(ClassValidationError::EmptyName);
        }
        if name.chars().count() > CLASS_NAME_MAX {
            return Err(ClassValidationError::NameTooLong {
                max: CLASS_NAME_MAX,
            });
        }
        let price_cents = u64::try_from(draft.price_cents).map_err(|_| {
            ClassValidationError::NegativePrice {
                value: draft.price_cents,
            }
        })?;
        if draft.available_seats < 0 {
            return Err(ClassValidationError::NegativeSeats {
                value: draft.available_seats,
            });
        }
        let available_seats = u32::try_from(draft.available_seats).map_err(|_| {
            ClassValidationError::SeatsOutOfRange {
                value: draft.available_seats,
            }
        })?;

        Ok(Self {
            name,
            description: draft.description.trim().to_owned(),
            price_cents,
            available_seats,
            video_url: draft.video_url.trim().to_owned(),
        })
    }
}

/// Validated review decision: a status plus the reason it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    status: ClassStatus,
    reason: Option<String>,
}

impl StatusChange {
    /// Validate a review decision.
    ///
    /// Rejections must explain themselves; any other status clears a
    /// previously recorded reason.
    pub fn new(status: ClassStatus, reason: Option<String>) -> Result<Self, ClassValidationError> {
        let reason = reason
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty());
        match (status, reason) {
            (ClassStatus::Rejected, None) => Err(ClassValidationError::MissingRejectionReason),
            (ClassStatus::Rejected, Some(text)) if text.chars().count() > REJECTION_REASON_MAX => {
                Err(ClassValidationError::RejectionReasonTooLong {
                    max: REJECTION_REASON_MAX,
                })
            }
            (ClassStatus::Rejected, Some(text)) => Ok(Self {
                status,
                reason: Some(text),
            }),
            (other, _) => Ok(Self {
                status: other,
                reason: None,
            }),
        }
    }

    /// Target status.
    pub fn status(&self) -> ClassStatus {
        self.status
    }

    /// Reason recorded alongside the status.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

/// Class listing as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: ClassId,
    pub instructor_email: UserEmail,
    pub instructor_name: String,
    pub name: String,
    pub description: String,
    pub price_cents: u64,
    pub status: ClassStatus,
    pub rejection_reason: Option<String>,
    pub available_seats: u32,
    pub total_enrolled: u32,
    pub video_url: String,
    pub created_at: DateTime<Utc>,
}

impl Class {
    /// Create a freshly submitted class awaiting review.
    pub fn submit(
        id: ClassId,
        instructor_email: UserEmail,
        instructor_name: impl Into<String>,
        details: ClassDetails,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            instructor_email,
            instructor_name: instructor_name.into(),
            name: details.name,
            description: details.description,
            price_cents: details.price_cents,
            status: ClassStatus::Pending,
            rejection_reason: None,
            available_seats: details.available_seats,
            total_enrolled: 0,
            video_url: details.video_url,
            created_at,
        }
    }

    /// Whether at least one seat can still be sold.
    pub fn has_seat(&self) -> bool {
        self.available_seats > 0
    }

    /// Move one seat from available to enrolled.
    ///
    /// Returns `false` and leaves the counters untouched when no seat is
    /// left.
    pub fn reserve_seat(&mut self) -> bool {
        if !self.has_seat() {
            return false;
        }
        self.available_seats -= 1;
        self.total_enrolled = self.total_enrolled.saturating_add(1);
        true
    }

    /// Overwrite the editable fields and send the class back to review.
    pub fn apply_details(&mut self, details: &ClassDetails) {
        self.name.clone_from(&details.name);
        self.description.clone_from(&details.description);
        self.price_cents = details.price_cents;
        self.available_seats = details.available_seats;
        self.video_url.clone_from(&details.video_url);
        self.status = ClassStatus::Pending;
        self.rejection_reason = None;
    }

    /// Record a review decision.
    pub fn apply_status(&mut self, change: &StatusChange) {
        self.status = change.status();
        self.rejection_reason = change.reason().map(str::to_owned);
    }

    /// Post-settlement counters for this class.
    pub fn counters(&self) -> SeatCounters {
        SeatCounters {
            class_id: self.id,
            available_seats: self.available_seats,
            total_enrolled: self.total_enrolled,
        }
    }
}

/// Seat and enrollment counters of one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatCounters {
    pub class_id: ClassId,
    pub available_seats: u32,
    pub total_enrolled: u32,
}

#[cfg(test)]
mod tests {
    //! Regression coverage for class validation and lifecycle helpers.
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn draft() -> ClassDraft {
        ClassDraft {
            name: " Morning Flow ".to_owned(),
            description: "Gentle vinyasa".to_owned(),
            price_cents: 2500,
            available_seats: 2,
            video_url: "https://video.test/flow".to_owned(),
        }
    }

    fn submitted(draft: ClassDraft) -> Class {
        let details = ClassDetails::try_from(draft).expect("valid draft");
        Class::submit(
            ClassId::random(),
            UserEmail::new("tutor@studio.test").expect("valid email"),
            "Tutor",
            details,
            Utc::now(),
        )
    }

    #[rstest]
    fn draft_is_trimmed_and_converted(draft: ClassDraft) {
        let details = ClassDetails::try_from(draft).expect("valid draft");
        assert_eq!(details.name, "Morning Flow");
        assert_eq!(details.price_cents, 2500);
        assert_eq!(details.available_seats, 2);
    }

    #[rstest]
    #[case(-1, 2, ClassValidationError::NegativePrice { value: -1 })]
    #[case(100, -3, ClassValidationError::NegativeSeats { value: -3 })]
    #[case(100, i64::from(u32::MAX) + 1, ClassValidationError::SeatsOutOfRange { value: i64::from(u32::MAX) + 1 })]
    fn negative_numbers_are_rejected(
        mut draft: ClassDraft,
        #[case] price: i64,
        #[case] seats: i64,
        #[case] expected: ClassValidationError,
    ) {
        draft.price_cents = price;
        draft.available_seats = seats;
        assert_eq!(ClassDetails::try_from(draft), Err(expected));
    }

    #[rstest]
    fn blank_name_is_rejected(mut draft: ClassDraft) {
        draft.name = "  ".to_owned();
        assert_eq!(
            ClassDetails::try_from(draft),
            Err(ClassValidationError::EmptyName)
        );
    }

    #[rstest]
    fn submitted_class_starts_pending_with_no_enrollments(draft: ClassDraft) {
        let class = submitted(draft);
        assert_eq!(class.status, ClassStatus::Pending);
        assert_eq!(class.total_enrolled, 0);
        assert_eq!(class.available_seats, 2);
    }

    #[rstest]
    fn reserve_seat_stops_at_zero(draft: ClassDraft) {
        let mut class = submitted(draft);
        assert!(class.reserve_seat());
        assert!(class.reserve_seat());
        assert!(!class.reserve_seat());
        assert_eq!(class.available_seats, 0);
        assert_eq!(class.total_enrolled, 2);
    }

    #[rstest]
    fn editing_demotes_to_pending_and_keeps_enrollments(draft: ClassDraft) {
        let mut class = submitted(draft.clone());
        class.reserve_seat();
        class.apply_status(&StatusChange::new(ClassStatus::Approved, None).expect("valid"));

        let mut edit = draft;
        edit.available_seats = 10;
        class.apply_details(&ClassDetails::try_from(edit).expect("valid draft"));

        assert_eq!(class.status, ClassStatus::Pending);
        assert_eq!(class.available_seats, 10);
        assert_eq!(class.total_enrolled, 1);
    }

    #[rstest]
    fn rejection_requires_reason() {
        assert_eq!(
            StatusChange::new(ClassStatus::Rejected, Some("  ".to_owned())),
            Err(ClassValidationError::MissingRejectionReason)
        );
        let change = StatusChange::new(ClassStatus::Rejected, Some("blurry video".to_owned()))
            .expect("valid rejection");
        assert_eq!(change.reason(), Some("blurry video"));
    }

    #[rstest]
    fn approval_clears_reason() {
        let change = StatusChange::new(ClassStatus::Approved, Some("ignored".to_owned()))
            .expect("valid approval");
        assert_eq!(change.reason(), None);
    }

    #[rstest]
    fn status_parses_from_storage() {
        assert_eq!("approved".parse::<ClassStatus>(), Ok(ClassStatus::Approved));
        assert!("archived".parse::<ClassStatus>().is_err());
    }
}
