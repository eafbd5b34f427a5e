//! Tests for domain error construction and serialisation.

use super::*;
use rstest::rstest;
use serde_json::json;

#[rstest]
fn invalid_request_constructor_sets_code() {
    let err = Error::invalid_request("bad");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(err.message(), "bad");
}

#[rstest]
fn try_new_rejects_empty_messages() {
    let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
#[case(Error::service_unavailable("pool exhausted"), true)]
#[case(Error::insufficient_capacity("sold out"), false)]
#[case(Error::conflict("reused reference"), false)]
#[case(Error::internal("boom"), false)]
fn only_storage_outages_are_retryable(#[case] error: Error, #[case] expected: bool) {
    assert_eq!(error.is_retryable(), expected);
}

#[rstest]
fn serialises_code_in_snake_case_and_skips_missing_details() {
    let err = Error::insufficient_capacity("sold out");
    let value = serde_json::to_value(&err).expect("serialise error");

    assert_eq!(
        value,
        json!({ "code": "insufficient_capacity", "message": "sold out" })
    );
}

#[rstest]
fn deserialising_rejects_blank_messages() {
    let payload = json!({ "code": "not_found", "message": " " });
    let result: Result<Error, _> = serde_json::from_value(payload);
    assert!(result.is_err());
}

#[rstest]
fn details_survive_a_serde_round_trip() {
    let err = Error::conflict("reference reused").with_details(json!({ "transactionRef": "t1" }));
    let value = serde_json::to_value(&err).expect("serialise error");
    let decoded: Error = serde_json::from_value(value).expect("deserialise error");

    assert_eq!(decoded, err);
}

#[rstest]
#[case(ClassValidationError::NegativePrice { value: -1 }.into(), "priceCents")]
#[case(ClassValidationError::MissingRejectionReason.into(), "reason")]
#[case(UserValidationError::MalformedEmail.into(), "email")]
#[case(PurchaseValidationError::NoClasses.into(), "classIds")]
#[case(TransactionRefValidationError::Whitespace.into(), "transactionRef")]
fn validation_failures_name_their_field(#[case] err: Error, #[case] field: &str) {
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(err.details().and_then(|d| d.get("field")), Some(&json!(field)));
}
