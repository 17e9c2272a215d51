//! Client-side rules applied to drafts before anything is sent. Every function
//! here is pure: it takes the draft plus whatever loaded collection it needs
//! and returns either a payload ready to send or the first rule that failed.
//! The service remains the authority; these checks only catch what the
//! currently loaded data can prove.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::models::{
    Course, CoursePayload, Enrollment, EnrollmentPayload, Student, StudentPayload,
};

pub const MIN_STUDENT_AGE: u32 = 5;
pub const MAX_STUDENT_AGE: u32 = 80;
pub const PHONE_DIGITS: usize = 10;
pub const COURSE_NAME_MIN: usize = 3;
pub const COURSE_DESCRIPTION_MIN: usize = 10;
pub const COURSE_DESCRIPTION_MAX: usize = 255;
pub const MIN_CREDITS: i64 = 1;
pub const MAX_CREDITS: i64 = 10;

/// Whether a submitted draft creates a new record or replaces an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Creating,
    Editing(i64),
}

impl EditMode {
    pub fn editing_id(self) -> Option<i64> {
        match self {
            EditMode::Creating => None,
            EditMode::Editing(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("All fields are required.")]
    MissingFields,
    #[error("Birth date must be a valid date (YYYY-MM-DD).")]
    InvalidBirthDate,
    #[error("Student age must be between 5 and 80 years.")]
    AgeOutOfRange,
    #[error("Enter a valid email address.")]
    InvalidEmail,
    #[error("Phone must contain exactly 10 digits.")]
    InvalidPhone,
    #[error("A student with this email already exists.")]
    DuplicateEmail,
    #[error("Course name must be at least 3 characters.")]
    CourseNameTooShort,
    #[error("Course description must be at least 10 characters.")]
    DescriptionTooShort,
    #[error("Course description must be at most 255 characters.")]
    DescriptionTooLong,
    #[error("Credits must be a whole number between 1 and 10.")]
    InvalidCredits,
    #[error("A course with this name already exists.")]
    DuplicateCourseName,
    #[error("Please select a student.")]
    MissingStudent,
    #[error("Please select a course.")]
    MissingCourse,
    #[error("The selected ids are not valid.")]
    InvalidIds,
    #[error("This enrollment already exists.")]
    DuplicateEnrollment,
}

/// Raw text of the student form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birth_date: String,
    pub phone: String,
}

impl StudentDraft {
    pub fn from_student(student: &Student) -> Self {
        Self {
            first_name: student.first_name.clone(),
            last_name: student.last_name.clone(),
            email: student.email.clone(),
            birth_date: date_prefix(&student.birth_date).to_string(),
            phone: student.phone.clone(),
        }
    }
}

/// Raw text of the course form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseDraft {
    pub name: String,
    pub description: String,
    pub credits: String,
}

impl CourseDraft {
    pub fn from_course(course: &Course) -> Self {
        Self {
            name: course.name.clone(),
            description: course.description.clone(),
            credits: course.credits.to_string(),
        }
    }
}

/// Raw text of the enrollment form: the two foreign keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollmentDraft {
    pub student_id: String,
    pub course_id: String,
}

/// `YYYY-MM-DD` part of a date or timestamp string.
pub fn date_prefix(raw: &str) -> &str {
    let raw = raw.trim();
    raw.get(..10).unwrap_or(raw)
}

/// Equal after trimming and Unicode lowercasing. Emails and course names are
/// unique under this comparison.
pub fn eq_folded(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

pub fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date_prefix(raw), "%Y-%m-%d").ok()
}

/// Completed years between `birth` and `today`; `None` for future dates.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    today.years_since(birth)
}

pub fn is_valid_email(email: &str) -> bool {
    static RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));
    RE.is_match(email)
}

pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == PHONE_DIGITS && phone.bytes().all(|b| b.is_ascii_digit())
}

/// Check a student draft against the loaded students. `today` anchors the age
/// rule so callers (and tests) control the clock.
pub fn validate_student(
    draft: &StudentDraft,
    mode: EditMode,
    existing: &[Student],
    today: NaiveDate,
) -> Result<StudentPayload, ValidationError> {
    let first_name = draft.first_name.trim();
    let last_name = draft.last_name.trim();
    let email = draft.email.trim();
    let birth_date = draft.birth_date.trim();
    let phone = draft.phone.trim();

    if [first_name, last_name, email, birth_date, phone]
        .iter()
        .any(|value| value.is_empty())
    {
        return Err(ValidationError::MissingFields);
    }

    let birth = parse_birth_date(birth_date).ok_or(ValidationError::InvalidBirthDate)?;
    match age_on(birth, today) {
        Some(age) if (MIN_STUDENT_AGE..=MAX_STUDENT_AGE).contains(&age) => {}
        _ => return Err(ValidationError::AgeOutOfRange),
    }

    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }
    if !is_valid_phone(phone) {
        return Err(ValidationError::InvalidPhone);
    }

    let editing = mode.editing_id();
    let duplicate = existing
        .iter()
        .any(|student| Some(student.id) != editing && eq_folded(&student.email, email));
    if duplicate {
        return Err(ValidationError::DuplicateEmail);
    }

    Ok(StudentPayload {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email.to_string(),
        birth_date: birth.format("%Y-%m-%d").to_string(),
        phone: phone.to_string(),
    })
}

/// Check a course draft against the loaded courses.
pub fn validate_course(
    draft: &CourseDraft,
    mode: EditMode,
    existing: &[Course],
) -> Result<CoursePayload, ValidationError> {
    let name = draft.name.trim();
    let description = draft.description.trim();
    let credits = draft.credits.trim();

    if name.is_empty() || description.is_empty() || credits.is_empty() {
        return Err(ValidationError::MissingFields);
    }
    if name.chars().count() < COURSE_NAME_MIN {
        return Err(ValidationError::CourseNameTooShort);
    }
    let description_len = description.chars().count();
    if description_len < COURSE_DESCRIPTION_MIN {
        return Err(ValidationError::DescriptionTooShort);
    }
    if description_len > COURSE_DESCRIPTION_MAX {
        return Err(ValidationError::DescriptionTooLong);
    }
    let credits = credits
        .parse::<i64>()
        .ok()
        .filter(|c| (MIN_CREDITS..=MAX_CREDITS).contains(c))
        .ok_or(ValidationError::InvalidCredits)?;

    let editing = mode.editing_id();
    let duplicate = existing
        .iter()
        .any(|course| Some(course.id) != editing && eq_folded(&course.name, name));
    if duplicate {
        return Err(ValidationError::DuplicateCourseName);
    }

    Ok(CoursePayload {
        name: name.to_string(),
        description: description.to_string(),
        credits,
    })
}

/// First loaded enrollment linking the same pair, ignoring `excluding`.
pub fn find_duplicate_enrollment(
    existing: &[Enrollment],
    student_id: i64,
    course_id: i64,
    excluding: Option<i64>,
) -> Option<&Enrollment> {
    existing.iter().find(|enrollment| {
        enrollment.student_id == Some(student_id)
            && enrollment.course_id == Some(course_id)
            && Some(enrollment.id) != excluding
    })
}

/// Check an enrollment draft. The duplicate-pair rule only runs on create;
/// an edit that lands on an existing pair is left for the service to reject.
pub fn validate_enrollment(
    draft: &EnrollmentDraft,
    mode: EditMode,
    existing: &[Enrollment],
) -> Result<EnrollmentPayload, ValidationError> {
    let student_raw = draft.student_id.trim();
    if student_raw.is_empty() {
        return Err(ValidationError::MissingStudent);
    }
    let course_raw = draft.course_id.trim();
    if course_raw.is_empty() {
        return Err(ValidationError::MissingCourse);
    }

    let (Ok(student_id), Ok(course_id)) = (student_raw.parse::<i64>(), course_raw.parse::<i64>())
    else {
        return Err(ValidationError::InvalidIds);
    };

    if mode == EditMode::Creating
        && find_duplicate_enrollment(existing, student_id, course_id, None).is_some()
    {
        return Err(ValidationError::DuplicateEnrollment);
    }

    Ok(EnrollmentPayload {
        student_id,
        course_id,
    })
}
