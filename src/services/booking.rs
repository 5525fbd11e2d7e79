use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::booking::{
    Booking, BookingDetails, CreateBookingData, EmergencyData, ParentData, StudentData,
    GENDERS, STATUS_ATTENDED, STATUS_CANCELLED, STATUS_NOT_ATTENDED, STATUS_PENDING,
    STATUS_WAITING_LIST, TYPE_FREE, TYPE_PAID, TYPE_WAITING_LIST,
};
use crate::models::class_schedule::ClassSchedule;
use crate::models::notification::{
    Notification, CATEGORY_CANCELLED_MEMBERSHIPS, CATEGORY_FREE_TRIALS,
    CATEGORY_MEMBER_ACQUISITION,
};
use crate::models::payment_plan::PaymentPlan;
use crate::models::Admin;
use crate::services::validation::{trimmed, FormValidator};

pub const MAX_STUDENTS_PER_BOOKING: usize = 3;

/// Statuses an admin may set by hand on a free trial
pub const FREE_TRIAL_STATUSES: &[&str] = &[
    STATUS_PENDING,
    STATUS_ATTENDED,
    STATUS_NOT_ATTENDED,
    STATUS_CANCELLED,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingKind {
    FreeTrial,
    WaitingList,
}

impl BookingKind {
    fn booking_type(self) -> &'static str {
        match self {
            BookingKind::FreeTrial => TYPE_FREE,
            BookingKind::WaitingList => TYPE_WAITING_LIST,
        }
    }

    fn initial_status(self) -> &'static str {
        match self {
            BookingKind::FreeTrial => STATUS_PENDING,
            BookingKind::WaitingList => STATUS_WAITING_LIST,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBookingRequest {
    pub class_schedule_id: Uuid,
    pub trial_date: Option<NaiveDate>,
    pub source: Option<String>,
    pub students: Vec<StudentData>,
    pub parents: Vec<ParentData>,
    pub emergency: EmergencyData,
}

pub fn validate_new_booking(req: &NewBookingRequest, kind: BookingKind) -> Result<()> {
    let mut v = FormValidator::new();

    if kind == BookingKind::FreeTrial {
        v.required_some("Trial date", req.trial_date.as_ref());
    }

    v.check(
        !req.students.is_empty() && req.students.len() <= MAX_STUDENTS_PER_BOOKING,
        "A booking needs between 1 and 3 students",
    );
    for (i, student) in req.students.iter().enumerate() {
        let n = i + 1;
        v.required(&format!("Student {} first name", n), &student.first_name)
            .required(&format!("Student {} last name", n), &student.last_name)
            .one_of(&format!("Student {} gender", n), &student.gender, GENDERS);
    }

    v.check(!req.parents.is_empty(), "At least one parent is required");
    for (i, parent) in req.parents.iter().enumerate() {
        let n = i + 1;
        v.required(&format!("Parent {} first name", n), &parent.first_name)
            .required(&format!("Parent {} last name", n), &parent.last_name)
            .required(&format!("Parent {} email", n), &parent.email)
            .email(&format!("Parent {} email", n), &parent.email)
            .required(&format!("Parent {} phone", n), &parent.phone)
            .required(&format!("Parent {} relation", n), &parent.relation);
    }

    v.required("Emergency contact first name", &req.emergency.first_name)
        .required("Emergency contact last name", &req.emergency.last_name)
        .required("Emergency contact phone", &req.emergency.phone)
        .required("Emergency contact relation", &req.emergency.relation);

    v.finish()
}

/// Checks a (locked) class can take this booking
pub fn check_class_accepts(class: &ClassSchedule, kind: BookingKind, students: i32) -> Result<()> {
    if !class.is_active() {
        return Err(AppError::Conflict("Class is not active".to_string()));
    }

    if kind == BookingKind::FreeTrial {
        if !class.allow_free_trial {
            return Err(AppError::Conflict(
                "Class does not accept free trials".to_string(),
            ));
        }
        if class.capacity < students {
            return Err(AppError::Conflict(format!(
                "Not enough free seats: {} requested, {} available",
                students, class.capacity
            )));
        }
    }

    Ok(())
}

/// Seats a conversion must take from the class. Trials already hold theirs.
pub fn conversion_seats(booking: &Booking, student_count: i32, plan_students: i32) -> Result<i32> {
    if booking.status == STATUS_CANCELLED {
        return Err(AppError::Conflict(
            "Cancelled bookings cannot be converted".to_string(),
        ));
    }
    if student_count > plan_students {
        return Err(AppError::Validation(format!(
            "Payment plan covers {} students but booking has {}",
            plan_students, student_count
        )));
    }

    match booking.booking_type.as_str() {
        TYPE_FREE => Ok(0),
        TYPE_WAITING_LIST => Ok(student_count),
        _ => Err(AppError::Conflict(
            "Booking is already a membership".to_string(),
        )),
    }
}

/// Seats given back to the class when a booking is cancelled
pub fn seats_released(booking: &Booking, student_count: i32) -> i32 {
    if booking.holds_seats() {
        student_count
    } else {
        0
    }
}

/// Creates a booking with its students, parents and emergency contact in one
/// transaction, taking seats for free trials.
pub async fn create_booking(
    pool: &PgPool,
    admin: &Admin,
    scope: &[Uuid],
    kind: BookingKind,
    req: NewBookingRequest,
) -> Result<BookingDetails> {
    validate_new_booking(&req, kind)?;

    // Visibility check before taking the row lock
    ClassSchedule::find_in_scope(pool, req.class_schedule_id, scope)
        .await?
        .ok_or_else(|| AppError::NotFound("Class not found".to_string()))?;

    let student_count = req.students.len() as i32;
    let mut tx = pool.begin().await?;

    let class = ClassSchedule::lock_for_update(&mut *tx, req.class_schedule_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Class not found".to_string()))?;
    check_class_accepts(&class, kind, student_count)?;

    let booking = Booking::insert(
        &mut *tx,
        &CreateBookingData {
            booking_type: kind.booking_type().to_string(),
            status: kind.initial_status().to_string(),
            venue_id: class.venue_id,
            class_schedule_id: class.id,
            trial_date: if kind == BookingKind::FreeTrial {
                req.trial_date
            } else {
                None
            },
            source: trimmed(req.source),
            booked_by: admin.id,
        },
    )
    .await?;

    let mut students = Vec::with_capacity(req.students.len());
    for student in &req.students {
        students.push(Booking::insert_student(&mut *tx, booking.id, student).await?);
    }

    let mut parents = Vec::with_capacity(req.parents.len());
    for parent in &req.parents {
        parents.push(Booking::insert_parent(&mut *tx, booking.id, parent).await?);
    }

    let emergency = Booking::insert_emergency(&mut *tx, booking.id, &req.emergency).await?;

    if kind == BookingKind::FreeTrial {
        ClassSchedule::adjust_capacity(&mut *tx, class.id, -student_count).await?;

        Notification::create(
            &mut *tx,
            CATEGORY_FREE_TRIALS,
            "New free trial booked",
            &format!(
                "{} booked a free trial for {} student(s) in {}",
                admin.full_name(),
                student_count,
                class.class_name
            ),
            admin.id,
        )
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        booking_id = %booking.id,
        class_schedule_id = %class.id,
        booking_type = %booking.booking_type,
        students = student_count,
        "Booking created"
    );

    Ok(BookingDetails {
        booking,
        students,
        parents,
        emergency: Some(emergency),
    })
}

pub async fn update_free_trial_status(
    pool: &PgPool,
    scope: &[Uuid],
    admin_id: Uuid,
    id: Uuid,
    status: &str,
) -> Result<Booking> {
    let mut v = FormValidator::new();
    v.one_of("Status", status, FREE_TRIAL_STATUSES).finish()?;

    Booking::find_in_scope(pool, id, scope)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    if status == STATUS_CANCELLED {
        return cancel_booking(pool, scope, admin_id, id, "Cancelled by admin", None).await;
    }

    // Checked on the locked row so a concurrent cancel cannot be undone
    let mut tx = pool.begin().await?;
    let booking = Booking::lock_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;
    check_trial_status_change(&booking)?;

    let booking = Booking::set_status(&mut *tx, id, status).await?;
    tx.commit().await?;

    tracing::info!(booking_id = %id, status = %status, "Free trial status updated");

    Ok(booking)
}

/// A trial's status can be set by hand until it is cancelled or converted
pub fn check_trial_status_change(booking: &Booking) -> Result<()> {
    if booking.booking_type != TYPE_FREE {
        return Err(AppError::Conflict(
            "Only free trial bookings can change status here".to_string(),
        ));
    }
    if booking.status == STATUS_CANCELLED {
        return Err(AppError::Conflict(
            "Cancelled bookings cannot be reopened".to_string(),
        ));
    }
    Ok(())
}

/// Cancels a booking and gives its seats back to the class
pub async fn cancel_booking(
    pool: &PgPool,
    scope: &[Uuid],
    admin_id: Uuid,
    id: Uuid,
    reason: &str,
    note: Option<&str>,
) -> Result<Booking> {
    let mut v = FormValidator::new();
    v.required("Cancellation reason", reason).finish()?;

    Booking::find_in_scope(pool, id, scope)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    let mut tx = pool.begin().await?;

    let booking = Booking::lock_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    if booking.status == STATUS_CANCELLED {
        return Err(AppError::Conflict("Booking is already cancelled".to_string()));
    }

    let student_count = Booking::count_students(&mut *tx, id).await? as i32;
    let released = seats_released(&booking, student_count);
    if released > 0 {
        ClassSchedule::lock_for_update(&mut *tx, booking.class_schedule_id).await?;
        ClassSchedule::adjust_capacity(&mut *tx, booking.class_schedule_id, released).await?;
    }

    let cancelled = Booking::mark_cancelled(&mut *tx, id, reason.trim(), note).await?;

    if booking.booking_type == TYPE_PAID {
        Notification::create(
            &mut *tx,
            CATEGORY_CANCELLED_MEMBERSHIPS,
            "Membership cancelled",
            &format!("Membership cancelled: {}", reason.trim()),
            admin_id,
        )
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        booking_id = %id,
        seats_released = released,
        reason = %reason.trim(),
        "Booking cancelled"
    );

    Ok(cancelled)
}

/// Converts a free trial or waiting-list booking into a paid membership
pub async fn convert_to_membership(
    pool: &PgPool,
    scope: &[Uuid],
    admin: &Admin,
    id: Uuid,
    payment_plan_id: Uuid,
    start_date: NaiveDate,
) -> Result<Booking> {
    Booking::find_in_scope(pool, id, scope)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    let plan = PaymentPlan::find_in_scope(pool, payment_plan_id, scope)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment plan not found".to_string()))?;

    let mut tx = pool.begin().await?;

    let booking = Booking::lock_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    let student_count = Booking::count_students(&mut *tx, id).await? as i32;
    let seats = conversion_seats(&booking, student_count, plan.students)?;

    if seats > 0 {
        let class = ClassSchedule::lock_for_update(&mut *tx, booking.class_schedule_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Class not found".to_string()))?;
        if !class.is_active() {
            return Err(AppError::Conflict("Class is not active".to_string()));
        }
        if class.capacity < seats {
            return Err(AppError::Conflict(format!(
                "Not enough free seats: {} requested, {} available",
                seats, class.capacity
            )));
        }
        ClassSchedule::adjust_capacity(&mut *tx, class.id, -seats).await?;
    }

    let converted_from = booking.booking_type.clone();
    let converted =
        Booking::mark_converted(&mut *tx, id, plan.id, start_date, &converted_from).await?;

    Notification::create(
        &mut *tx,
        CATEGORY_MEMBER_ACQUISITION,
        "New membership",
        &format!(
            "{} converted a {} booking to the {} plan",
            admin.full_name(),
            converted_from,
            plan.title
        ),
        admin.id,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        booking_id = %id,
        payment_plan_id = %plan.id,
        converted_from = %converted_from,
        "Booking converted to membership"
    );

    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc};

    fn request() -> NewBookingRequest {
        NewBookingRequest {
            class_schedule_id: Uuid::new_v4(),
            trial_date: NaiveDate::from_ymd_opt(2025, 3, 8),
            source: Some("Facebook".to_string()),
            students: vec![StudentData {
                first_name: "Ava".to_string(),
                last_name: "Smith".to_string(),
                date_of_birth: NaiveDate::from_ymd_opt(2017, 5, 1).unwrap(),
                gender: "female".to_string(),
                medical_information: None,
            }],
            parents: vec![ParentData {
                first_name: "Kim".to_string(),
                last_name: "Smith".to_string(),
                email: "kim@example.com".to_string(),
                phone: "07700900000".to_string(),
                relation: "Mother".to_string(),
            }],
            emergency: EmergencyData {
                first_name: "Lee".to_string(),
                last_name: "Smith".to_string(),
                phone: "07700900001".to_string(),
                relation: "Uncle".to_string(),
            },
        }
    }

    fn class(capacity: i32, allow_free_trial: bool, status: &str) -> ClassSchedule {
        ClassSchedule {
            id: Uuid::new_v4(),
            venue_id: Uuid::new_v4(),
            class_name: "U8 Saturday".to_string(),
            day: "Saturday".to_string(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            capacity,
            total_capacity: 12,
            allow_free_trial,
            status: status.to_string(),
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
            deleted_by: None,
        }
    }

    fn booking(booking_type: &str, status: &str) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            booking_type: booking_type.to_string(),
            status: status.to_string(),
            venue_id: Uuid::new_v4(),
            class_schedule_id: Uuid::new_v4(),
            payment_plan_id: None,
            trial_date: None,
            start_date: None,
            source: None,
            converted_from: None,
            converted_at: None,
            cancel_reason: None,
            cancel_note: None,
            cancelled_at: None,
            booked_by: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_valid_free_trial_request() {
        assert!(validate_new_booking(&request(), BookingKind::FreeTrial).is_ok());
    }

    #[test]
    fn test_trial_date_only_required_for_trials() {
        let mut req = request();
        req.trial_date = None;
        assert!(validate_new_booking(&req, BookingKind::FreeTrial).is_err());
        assert!(validate_new_booking(&req, BookingKind::WaitingList).is_ok());
    }

    #[test]
    fn test_student_limits() {
        let mut req = request();
        req.students.clear();
        assert!(validate_new_booking(&req, BookingKind::FreeTrial).is_err());

        let mut req = request();
        let student = req.students[0].clone();
        req.students = vec![student; 4];
        assert!(validate_new_booking(&req, BookingKind::FreeTrial).is_err());
    }

    #[test]
    fn test_parent_email_checked() {
        let mut req = request();
        req.parents[0].email = "kim-at-example".to_string();
        match validate_new_booking(&req, BookingKind::FreeTrial) {
            Err(AppError::Validation(msg)) => assert!(msg.contains("Parent 1 email")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_class_accepts_trial() {
        assert!(check_class_accepts(&class(2, true, "active"), BookingKind::FreeTrial, 2).is_ok());
        assert!(matches!(
            check_class_accepts(&class(1, true, "active"), BookingKind::FreeTrial, 2),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            check_class_accepts(&class(5, false, "active"), BookingKind::FreeTrial, 1),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            check_class_accepts(&class(5, true, "cancelled"), BookingKind::FreeTrial, 1),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_waiting_list_ignores_capacity() {
        let full = class(0, false, "active");
        assert!(check_class_accepts(&full, BookingKind::WaitingList, 3).is_ok());
    }

    #[test]
    fn test_conversion_seats() {
        assert_eq!(conversion_seats(&booking(TYPE_FREE, STATUS_ATTENDED), 2, 2).unwrap(), 0);
        assert_eq!(
            conversion_seats(&booking(TYPE_WAITING_LIST, STATUS_WAITING_LIST), 2, 3).unwrap(),
            2
        );
        assert!(matches!(
            conversion_seats(&booking(TYPE_PAID, "active"), 1, 1),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            conversion_seats(&booking(TYPE_FREE, STATUS_CANCELLED), 1, 1),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            conversion_seats(&booking(TYPE_FREE, STATUS_PENDING), 3, 2),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_seats_released() {
        assert_eq!(seats_released(&booking(TYPE_FREE, STATUS_PENDING), 2), 2);
        assert_eq!(seats_released(&booking(TYPE_PAID, "active"), 1), 1);
        assert_eq!(seats_released(&booking(TYPE_WAITING_LIST, STATUS_WAITING_LIST), 2), 0);
        assert_eq!(seats_released(&booking(TYPE_FREE, STATUS_CANCELLED), 2), 0);
    }

    #[test]
    fn test_trial_status_change_rules() {
        assert!(check_trial_status_change(&booking(TYPE_FREE, STATUS_PENDING)).is_ok());
        assert!(check_trial_status_change(&booking(TYPE_FREE, STATUS_ATTENDED)).is_ok());

        let cancelled = booking(TYPE_FREE, STATUS_CANCELLED);
        let err = check_trial_status_change(&cancelled).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = check_trial_status_change(&booking(TYPE_PAID, "active")).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
