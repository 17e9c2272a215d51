use serde_json::Value;

use crate::error::ApiError;
use crate::models::{Course, CoursePayload};

use super::envelope::{decode_list, Listed};
use super::transport::{Resource, Transport};

/// Retrieve every course.
pub fn fetch_courses(api: &dyn Transport) -> Result<Listed<Course>, ApiError> {
    decode_list(api.list(Resource::Courses)?)
}

pub fn create_course(api: &dyn Transport, payload: &CoursePayload) -> Result<Value, ApiError> {
    api.create(Resource::Courses, &serde_json::to_value(payload)?)
}

pub fn update_course(
    api: &dyn Transport,
    id: i64,
    payload: &CoursePayload,
) -> Result<Value, ApiError> {
    api.update(Resource::Courses, id, &serde_json::to_value(payload)?)
}

/// The service answers 400 while enrollments still reference the course.
pub fn delete_course(api: &dyn Transport, id: i64) -> Result<Value, ApiError> {
    api.delete(Resource::Courses, id)
}
