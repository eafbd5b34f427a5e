//! Read-side projections joined from the normalised ledger collections.
//!
//! Everything here is pure: services load the rows and these functions join,
//! group and rank them. Missing join targets are skipped, never reported.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::class::{Class, ClassId, ClassStatus};
use super::ledger::Enrollment;
use super::user::{User, UserEmail};

/// A class a student is enrolled in, joined to its instructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledClassView {
    pub class: Class,
    pub instructor: User,
}

/// Instructor ranked by the enrollments across all of their classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructorPopularity {
    pub instructor: User,
    pub total_enrolled: u64,
    pub class_count: u64,
}

/// Admin dashboard counters read from one storage snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub approved_classes: u64,
    pub pending_classes: u64,
    pub rejected_classes: u64,
    pub instructors: u64,
    pub total_classes: u64,
    pub total_enrollments: u64,
}

impl AdminStats {
    /// Count one class under its review status.
    pub fn record_class(&mut self, status: ClassStatus) {
        self.record_classes(status, 1);
    }

    /// Count `count` classes sharing one review status.
    pub fn record_classes(&mut self, status: ClassStatus, count: u64) {
        self.total_classes += count;
        match status {
            ClassStatus::Approved => self.approved_classes += count,
            ClassStatus::Pending => self.pending_classes += count,
            ClassStatus::Rejected => self.rejected_classes += count,
        }
    }
}

/// Expand a student's enrollments into joined class views.
///
/// Enrollments are visited oldest first and each id list in purchase order.
/// Ids without a class, and classes without an instructor record, are
/// omitted.
pub fn enrolled_classes(
    enrollments: &[Enrollment],
    classes: &HashMap<ClassId, Class>,
    instructors: &HashMap<UserEmail, User>,
) -> Vec<EnrolledClassView> {
    let mut ordered: Vec<&Enrollment> = enrollments.iter().collect();
    ordered.sort_by_key(|enrollment| enrollment.enrolled_at);

    ordered
        .into_iter()
        .flat_map(|enrollment| enrollment.class_ids.iter())
        .filter_map(|class_id| classes.get(class_id))
        .filter_map(|class| {
            instructors
                .get(&class.instructor_email)
                .map(|instructor| EnrolledClassView {
                    class: class.clone(),
                    instructor: instructor.clone(),
                })
        })
        .collect()
}

/// Order classes by enrollment, most enrolled first.
///
/// `classes` must arrive in insertion order; the sort is stable so ties keep
/// it.
pub fn rank_classes(mut classes: Vec<Class>, limit: usize) -> Vec<Class> {
    classes.sort_by(|a, b| b.total_enrolled.cmp(&a.total_enrolled));
    classes.truncate(limit);
    classes
}

/// Group classes by instructor, sum their enrollments and rank the groups.
///
/// `classes` must arrive in insertion order: ties keep the order in which
/// each instructor's first class appeared. Groups whose instructor is not in
/// `users` are dropped.
pub fn rank_instructors(
    classes: &[Class],
    users: &HashMap<UserEmail, User>,
    limit: usize,
) -> Vec<InstructorPopularity> {
    let mut positions: HashMap<&UserEmail, usize> = HashMap::new();
    let mut groups: Vec<(&UserEmail, u64, u64)> = Vec::new();

    for class in classes {
        let email = &class.instructor_email;
        let index = *positions.entry(email).or_insert_with(|| {
            groups.push((email, 0, 0));
            groups.len() - 1
        });
        if let Some(group) = groups.get_mut(index) {
            group.1 += u64::from(class.total_enrolled);
            group.2 += 1;
        }
    }

    let mut ranked: Vec<InstructorPopularity> = groups
        .into_iter()
        .filter_map(|(email, total_enrolled, class_count)| {
            users.get(email).map(|instructor| InstructorPopularity {
                instructor: instructor.clone(),
                total_enrolled,
                class_count,
            })
        })
        .collect();
    ranked.sort_by(|a, b| b.total_enrolled.cmp(&a.total_enrolled));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    //! Ordering and join behaviour of the projections.
    use super::*;
    use crate::domain::class::ClassDetails;
    use crate::domain::ledger::{EnrollmentId, TransactionRef};
    use crate::domain::user::{Role, UserId};
    use chrono::{Duration, TimeZone, Utc};
    use rstest::rstest;

    fn email(raw: &str) -> UserEmail {
        UserEmail::new(raw).expect("valid email")
    }

    fn instructor(raw: &str) -> User {
        User::new(UserId::random(), email(raw), Role::Instructor, raw).expect("valid user")
    }

    fn class(instructor: &str, name: &str, total_enrolled: u32) -> Class {
        let details = ClassDetails {
            name: name.to_owned(),
            description: String::new(),
            price_cents: 1000,
            available_seats: 10,
            video_url: String::new(),
        };
        let mut class = Class::submit(
            ClassId::random(),
            email(instructor),
            instructor,
            details,
            Utc::now(),
        );
        class.total_enrolled = total_enrolled;
        class
    }

    fn enrollment(student: &str, class_ids: Vec<ClassId>, minutes: i64) -> Enrollment {
        let base = Utc
            .with_ymd_and_hms(2026, 1, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp");
        Enrollment {
            id: EnrollmentId::random(),
            user_email: email(student),
            class_ids,
            transaction_ref: TransactionRef::new(format!("t{minutes}")).expect("valid reference"),
            enrolled_at: base + Duration::minutes(minutes),
        }
    }

    fn by_id(classes: &[Class]) -> HashMap<ClassId, Class> {
        classes.iter().map(|c| (c.id, c.clone())).collect()
    }

    fn by_email(users: &[User]) -> HashMap<UserEmail, User> {
        users.iter().map(|u| (u.email().clone(), u.clone())).collect()
    }

    #[rstest]
    fn enrolled_classes_follow_enrollment_then_purchase_order() {
        let a = class("ann@x.com", "A", 0);
        let b = class("ann@x.com", "B", 0);
        let c = class("bob@x.com", "C", 0);
        let enrollments = vec![
            enrollment("s@x.com", vec![c.id], 30),
            enrollment("s@x.com", vec![b.id, a.id], 5),
        ];
        let users = by_email(&[instructor("ann@x.com"), instructor("bob@x.com")]);

        let views = enrolled_classes(&enrollments, &by_id(&[a.clone(), b.clone(), c.clone()]), &users);

        let names: Vec<&str> = views.iter().map(|v| v.class.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
        assert_eq!(views[2].instructor.email(), &email("bob@x.com"));
    }

    #[rstest]
    fn enrolled_classes_skip_missing_classes_and_instructors() {
        let kept = class("ann@x.com", "kept", 0);
        let orphan = class("gone@x.com", "orphan", 0);
        let enrollments = vec![enrollment(
            "s@x.com",
            vec![ClassId::random(), orphan.id, kept.id],
            0,
        )];
        let users = by_email(&[instructor("ann@x.com")]);

        let views = enrolled_classes(&enrollments, &by_id(&[kept.clone(), orphan]), &users);

        assert_eq!(views.len(), 1);
        assert_eq!(views[0].class.id, kept.id);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(2, 2)]
    #[case(10, 4)]
    fn rank_classes_truncates_to_limit(#[case] limit: usize, #[case] expected: usize) {
        let classes = vec![
            class("a@x.com", "one", 1),
            class("a@x.com", "two", 2),
            class("a@x.com", "three", 3),
            class("a@x.com", "four", 4),
        ];
        assert_eq!(rank_classes(classes, limit).len(), expected);
    }

    #[rstest]
    fn rank_classes_is_stable_on_ties() {
        let classes = vec![
            class("a@x.com", "first", 2),
            class("a@x.com", "top", 9),
            class("a@x.com", "second", 2),
            class("a@x.com", "third", 2),
        ];
        let names: Vec<String> = rank_classes(classes, 10)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["top", "first", "second", "third"]);
    }

    #[rstest]
    fn rank_instructors_sums_and_drops_unknown_users() {
        let classes = vec![
            class("ann@x.com", "a1", 3),
            class("bob@x.com", "b1", 5),
            class("ann@x.com", "a2", 4),
            class("ghost@x.com", "g1", 100),
        ];
        let users = by_email(&[instructor("ann@x.com"), instructor("bob@x.com")]);

        let ranked = rank_instructors(&classes, &users, 10);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].instructor.email(), &email("ann@x.com"));
        assert_eq!(ranked[0].total_enrolled, 7);
        assert_eq!(ranked[0].class_count, 2);
        assert_eq!(ranked[1].total_enrolled, 5);
    }

    #[rstest]
    fn rank_instructors_ties_keep_first_class_order() {
        let classes = vec![
            class("bob@x.com", "b1", 2),
            class("ann@x.com", "a1", 1),
            class("ann@x.com", "a2", 1),
        ];
        let users = by_email(&[instructor("ann@x.com"), instructor("bob@x.com")]);

        let ranked = rank_instructors(&classes, &users, 1);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].instructor.email(), &email("bob@x.com"));
    }

    #[rstest]
    fn admin_stats_count_by_status() {
        let mut stats = AdminStats::default();
        stats.record_class(ClassStatus::Approved);
        stats.record_class(ClassStatus::Pending);
        stats.record_class(ClassStatus::Pending);
        stats.record_class(ClassStatus::Rejected);

        assert_eq!(stats.total_classes, 4);
        assert_eq!(stats.pending_classes, 2);
        assert_eq!(stats.approved_classes, 1);
        assert_eq!(stats.rejected_classes, 1);
    }
}
