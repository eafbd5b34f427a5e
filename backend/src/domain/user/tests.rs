//! Tests for the domain user model.

use super::*;
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn instructor_email() -> UserEmail {
    UserEmail::new("teacher@studio.test").expect("valid email")
}

#[rstest]
#[case("Ada@Example.com", "ada@example.com")]
#[case("  bob@x.io  ", "bob@x.io")]
fn email_is_trimmed_and_lower_cased(#[case] raw: &str, #[case] expected: &str) {
    let email = UserEmail::new(raw).expect("valid email");
    assert_eq!(email.as_ref(), expected);
}

#[rstest]
#[case("", UserValidationError::EmptyEmail)]
#[case("   ", UserValidationError::EmptyEmail)]
#[case("no-at-sign", UserValidationError::MalformedEmail)]
#[case("@domain.test", UserValidationError::MalformedEmail)]
#[case("local@", UserValidationError::MalformedEmail)]
#[case("a@b@c", UserValidationError::MalformedEmail)]
#[case("spaced out@x.io", UserValidationError::MalformedEmail)]
fn malformed_emails_are_rejected(#[case] raw: &str, #[case] expected: UserValidationError) {
    assert_eq!(UserEmail::new(raw), Err(expected));
}

#[rstest]
fn overlong_email_is_rejected() {
    let raw = format!("{}@x.io", "a".repeat(EMAIL_MAX));
    assert_eq!(
        UserEmail::new(raw),
        Err(UserValidationError::EmailTooLong { max: EMAIL_MAX })
    );
}

#[rstest]
fn email_deserialises_through_validation() {
    let decoded: UserEmail = serde_json::from_value(json!("Mixed@Case.io")).expect("decode");
    assert_eq!(decoded.as_ref(), "mixed@case.io");

    let rejected: Result<UserEmail, _> = serde_json::from_value(json!("nope"));
    assert!(rejected.is_err());
}

#[rstest]
#[case("student", Role::Student)]
#[case("instructor", Role::Instructor)]
#[case("admin", Role::Admin)]
fn roles_parse_from_storage_strings(#[case] raw: &str, #[case] expected: Role) {
    assert_eq!(raw.parse::<Role>(), Ok(expected));
    assert_eq!(expected.as_str(), raw);
}

#[rstest]
fn unknown_role_is_reported() {
    let err = "owner".parse::<Role>().expect_err("unknown role");
    assert_eq!(err.to_string(), "unknown role: owner");
}

#[rstest]
fn only_instructors_and_admins_publish() {
    assert!(!Role::Student.can_publish());
    assert!(Role::Instructor.can_publish());
    assert!(Role::Admin.can_publish());
}

#[rstest]
fn user_rejects_blank_display_name(instructor_email: UserEmail) {
    let result = User::new(UserId::random(), instructor_email, Role::Instructor, "   ");
    assert_eq!(result, Err(UserValidationError::EmptyDisplayName));
}

#[rstest]
fn user_trims_display_name(instructor_email: UserEmail) {
    let user = User::new(UserId::random(), instructor_email, Role::Instructor, " Jane Doe ")
        .expect("valid user")
        .with_photo_url("https://img.test/jane.png");

    assert_eq!(user.display_name(), "Jane Doe");
    assert_eq!(user.photo_url(), Some("https://img.test/jane.png"));
}

#[rstest]
fn principal_acts_for_itself_or_as_admin(instructor_email: UserEmail) {
    let other = UserEmail::new("someone@else.test").expect("valid email");
    let instructor = Principal::new(instructor_email.clone(), Role::Instructor);
    let admin = Principal::new(other.clone(), Role::Admin);

    assert!(instructor.acts_for(&instructor_email));
    assert!(!instructor.acts_for(&other));
    assert!(admin.acts_for(&instructor_email));
}
