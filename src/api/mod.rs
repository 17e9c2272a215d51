//! Client side of the student and course services, split by resource.

mod courses;
mod enrollments;
mod envelope;
mod students;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use courses::{create_course, delete_course, fetch_courses, update_course};
pub use enrollments::{
    create_enrollment, delete_enrollment, fetch_enrollments, update_enrollment,
};
pub use envelope::{decode_list, normalize_list, Listed};
pub use students::{create_student, delete_student, fetch_students, update_student};
pub use transport::{Endpoints, HttpTransport, Resource, Transport};

pub use crate::error::ApiError;
